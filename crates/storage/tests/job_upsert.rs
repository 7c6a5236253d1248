#![forbid(unsafe_code)]

use bi_core::ids::{BranchName, RequestId, Revision};
use bi_core::{Changeset, JobCategory, JobRecord, JobResult, JobState, Push};
use bi_storage::{JobUpsertOutcome, JobUpsertRequest, JobsListRequest, SqliteStore};

const TIP: &str = "45f8637cb9f78f19cb8463ff174e81756805d8cf";

fn setup() -> (tempfile::TempDir, SqliteStore, i64) {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut store = SqliteStore::open(dir.path()).expect("open store");
    let repo = BranchName::try_new("mozilla-central").expect("branch");
    store
        .repository_upsert(&repo, "https://hg.mozilla.org/mozilla-central")
        .expect("register repository");
    let push = Push::try_new(
        repo,
        1,
        "jdoe@mozilla.com",
        1378288232,
        vec![Changeset {
            node: Revision::try_new(TIP).expect("revision"),
            author: "John Doe <jdoe@mozilla.com>".to_string(),
            description: "bug 1 - things".to_string(),
            branch: Some("default".to_string()),
            tags: Vec::new(),
        }],
    )
    .expect("push");
    let resultset_id = store.push_insert(&push).expect("insert push").id;
    (dir, store, resultset_id)
}

fn job(request_id: i64, category: JobCategory) -> JobRecord {
    JobRecord {
        request_id: RequestId::try_new(request_id).expect("request id"),
        category,
        branch: BranchName::try_new("mozilla-central").expect("branch"),
        revision: Revision::try_new(&TIP[..12]).expect("revision"),
        build_name: "Linux x86-64 mozilla-central build".to_string(),
        result: match category {
            JobCategory::Completed => JobResult::Success,
            _ => JobResult::Unknown,
        },
        submit_timestamp: 1378292160,
        start_timestamp: if category == JobCategory::Pending { 0 } else { 1378292170 },
        end_timestamp: if category == JobCategory::Completed { 1378293000 } else { 0 },
    }
}

fn upsert(store: &mut SqliteStore, job: JobRecord, resultset_id: i64) -> JobUpsertOutcome {
    store
        .job_upsert(JobUpsertRequest { job, resultset_id })
        .expect("upsert job")
}

#[test]
fn first_sighting_inserts_and_repeat_is_skipped() {
    let (_dir, mut store, rs) = setup();

    assert_eq!(upsert(&mut store, job(100, JobCategory::Pending), rs), JobUpsertOutcome::Inserted);
    assert_eq!(
        upsert(&mut store, job(100, JobCategory::Pending), rs),
        JobUpsertOutcome::Skipped { current: JobState::Pending }
    );
    assert_eq!(store.jobs_count(None).expect("count"), 1);
}

#[test]
fn lifecycle_moves_forward_in_place() {
    let (_dir, mut store, rs) = setup();
    let id = RequestId::try_new(200).expect("request id");

    upsert(&mut store, job(200, JobCategory::Pending), rs);
    assert_eq!(
        upsert(&mut store, job(200, JobCategory::Running), rs),
        JobUpsertOutcome::Updated { from: JobState::Pending }
    );
    let running = store.job_get(id).expect("get").expect("row");
    assert_eq!(running.state, JobState::Running);
    assert_eq!(running.job.start_timestamp, 1378292170);

    assert_eq!(
        upsert(&mut store, job(200, JobCategory::Completed), rs),
        JobUpsertOutcome::Updated { from: JobState::Running }
    );
    let completed = store.job_get(id).expect("get").expect("row");
    assert_eq!(completed.state, JobState::Completed);
    assert_eq!(completed.job.result, JobResult::Success);
    assert_eq!(completed.created_at_ms, running.created_at_ms);
    assert_eq!(store.jobs_count(None).expect("count"), 1);
}

#[test]
fn completed_is_terminal_and_backward_moves_are_skipped() {
    let (_dir, mut store, rs) = setup();

    upsert(&mut store, job(300, JobCategory::Completed), rs);
    assert_eq!(
        upsert(&mut store, job(300, JobCategory::Running), rs),
        JobUpsertOutcome::Skipped { current: JobState::Completed }
    );
    assert_eq!(
        upsert(&mut store, job(300, JobCategory::Pending), rs),
        JobUpsertOutcome::Skipped { current: JobState::Completed }
    );

    upsert(&mut store, job(301, JobCategory::Running), rs);
    assert_eq!(
        upsert(&mut store, job(301, JobCategory::Pending), rs),
        JobUpsertOutcome::Skipped { current: JobState::Running }
    );

    let row = store
        .job_get(RequestId::try_new(300).expect("request id"))
        .expect("get")
        .expect("row");
    assert_eq!(row.state, JobState::Completed);
}

#[test]
fn list_filters_by_state_and_revision() {
    let (_dir, mut store, rs) = setup();
    upsert(&mut store, job(1, JobCategory::Pending), rs);
    upsert(&mut store, job(2, JobCategory::Running), rs);
    upsert(&mut store, job(3, JobCategory::Completed), rs);
    upsert(&mut store, job(4, JobCategory::Completed), rs);

    let completed = store
        .jobs_list(JobsListRequest {
            state: Some(JobState::Completed),
            ..Default::default()
        })
        .expect("list");
    let ids: Vec<i64> = completed.iter().map(|row| row.job.request_id.get()).collect();
    assert_eq!(ids, vec![3, 4]);

    let by_revision = store
        .jobs_list(JobsListRequest {
            revision: Some(TIP[..12].to_ascii_uppercase()),
            limit: 2,
            ..Default::default()
        })
        .expect("list");
    assert_eq!(by_revision.len(), 2);

    let mut full = job(5, JobCategory::Completed);
    full.revision = Revision::try_new(TIP).expect("revision");
    upsert(&mut store, full, rs);
    let by_full_revision = store
        .jobs_list(JobsListRequest {
            revision: Some(TIP.to_string()),
            ..Default::default()
        })
        .expect("list");
    let ids: Vec<i64> = by_full_revision.iter().map(|row| row.job.request_id.get()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    assert_eq!(store.jobs_count(Some(JobState::Pending)).expect("count"), 1);
    assert_eq!(store.jobs_count(Some(JobState::Completed)).expect("count"), 3);
}

#[test]
fn blank_build_name_is_rejected() {
    let (_dir, mut store, rs) = setup();
    let mut bad = job(9, JobCategory::Pending);
    bad.build_name = "   ".to_string();
    assert!(store.job_upsert(JobUpsertRequest { job: bad, resultset_id: rs }).is_err());
    assert_eq!(store.jobs_count(None).expect("count"), 0);
}
