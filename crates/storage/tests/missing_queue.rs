#![forbid(unsafe_code)]

use bi_core::ids::{BranchName, RequestId, Revision};
use bi_core::{JobCategory, JobRecord, JobResult};
use bi_storage::{MissingEnqueueOutcome, SqliteStore, StoreError};

fn job(request_id: i64, category: JobCategory) -> JobRecord {
    JobRecord {
        request_id: RequestId::try_new(request_id).expect("request id"),
        category,
        branch: BranchName::try_new("mozilla-central").expect("branch"),
        revision: Revision::try_new("222222222222").expect("revision"),
        build_name: "WINNT 5.2 mozilla-central build".to_string(),
        result: JobResult::Unknown,
        submit_timestamp: 1378292160,
        start_timestamp: 0,
        end_timestamp: 0,
    }
}

#[test]
fn enqueue_keeps_one_entry_per_request() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = SqliteStore::open(dir.path()).expect("open store");

    assert_eq!(
        store.missing_enqueue(&job(1, JobCategory::Pending)).expect("enqueue"),
        MissingEnqueueOutcome::Queued
    );
    assert_eq!(
        store.missing_enqueue(&job(1, JobCategory::Pending)).expect("enqueue"),
        MissingEnqueueOutcome::Unchanged
    );
    assert_eq!(
        store.missing_enqueue(&job(1, JobCategory::Running)).expect("enqueue"),
        MissingEnqueueOutcome::Refreshed
    );
    assert_eq!(
        store.missing_enqueue(&job(1, JobCategory::Pending)).expect("enqueue"),
        MissingEnqueueOutcome::Unchanged
    );

    let queued = store.missing_list(10).expect("list");
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].job.category, JobCategory::Running);
    assert_eq!(queued[0].attempts, 0);
}

#[test]
fn attempts_accumulate_until_removed() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = SqliteStore::open(dir.path()).expect("open store");
    let id = RequestId::try_new(5).expect("request id");
    store.missing_enqueue(&job(5, JobCategory::Completed)).expect("enqueue");
    store.missing_enqueue(&job(6, JobCategory::Completed)).expect("enqueue");

    assert_eq!(store.missing_record_attempt(id).expect("attempt"), 1);
    assert_eq!(store.missing_record_attempt(id).expect("attempt"), 2);
    store.missing_enqueue(&job(5, JobCategory::Completed)).expect("enqueue");
    assert_eq!(store.missing_list(10).expect("list")[0].attempts, 2);

    assert!(store.missing_remove(id).expect("remove"));
    assert!(!store.missing_remove(id).expect("remove again"));
    assert!(matches!(store.missing_record_attempt(id), Err(StoreError::UnknownId)));
    assert_eq!(store.missing_count().expect("count"), 1);
}
