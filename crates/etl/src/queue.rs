#![forbid(unsafe_code)]

use crate::error::ResolveError;
use crate::pushlog::PushSource;
use crate::reconcile::Reconciler;
use crate::resolver::resolve;
use bi_core::JobRecord;
use bi_storage::{MissingEnqueueOutcome, MissingResultsetRow, SqliteStore, StoreError};
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries whose push was found; their job went to the reconciler.
    pub resolved: usize,
    /// Entries still waiting for their push.
    pub retained: usize,
    /// Entries dropped because their branch is not a known repository.
    pub discarded: usize,
    /// Entries dropped because they ran out of attempts.
    pub expired: usize,
    /// Pushes newly stored from the pushlog.
    pub pushes_stored: usize,
}

/// Jobs waiting for a push that was not stored when they arrived.
#[derive(Clone, Copy, Debug)]
pub struct MissingResultsetQueue {
    max_attempts: u32,
    drain_limit: usize,
}

impl MissingResultsetQueue {
    pub fn new(max_attempts: u32, drain_limit: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            drain_limit,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn enqueue(
        &self,
        store: &mut SqliteStore,
        job: &JobRecord,
    ) -> Result<MissingEnqueueOutcome, StoreError> {
        let outcome = store.missing_enqueue(job)?;
        debug!(
            request_id = %job.request_id,
            branch = %job.branch,
            revision = %job.revision,
            ?outcome,
            "queued job with unknown push"
        );
        Ok(outcome)
    }

    /// Retries up to `drain_limit` entries, oldest first.
    pub fn drain(
        &self,
        store: &mut SqliteStore,
        pushes: &impl PushSource,
        reconciler: &mut Reconciler,
    ) -> Result<DrainReport, StoreError> {
        let mut report = DrainReport::default();
        for entry in store.missing_list(self.drain_limit)? {
            self.drain_entry(store, pushes, reconciler, entry, &mut report)?;
        }
        if report != DrainReport::default() {
            info!(
                resolved = report.resolved,
                retained = report.retained,
                discarded = report.discarded,
                expired = report.expired,
                pushes_stored = report.pushes_stored,
                "drained missing-resultset queue"
            );
        }
        Ok(report)
    }

    fn drain_entry(
        &self,
        store: &mut SqliteStore,
        pushes: &impl PushSource,
        reconciler: &mut Reconciler,
        entry: MissingResultsetRow,
        report: &mut DrainReport,
    ) -> Result<(), StoreError> {
        let job = entry.job;
        let mut outcome = resolve(store, &job.branch, &job.revision);
        if matches!(outcome, Err(ResolveError::ResultsetNotFound { .. })) {
            report.pushes_stored += fetch_and_store_pushes(store, pushes, &job)?;
            outcome = resolve(store, &job.branch, &job.revision);
        }

        match outcome {
            Ok(resultset_id) => {
                reconciler.ingest(store, &job, resultset_id)?;
                store.missing_remove(job.request_id)?;
                report.resolved += 1;
            }
            Err(ResolveError::BranchNotFound { branch }) => {
                debug!(request_id = %job.request_id, %branch, "dropping queued job for unknown branch");
                store.missing_remove(job.request_id)?;
                report.discarded += 1;
            }
            Err(ResolveError::ResultsetNotFound { .. }) => {
                let attempts = store.missing_record_attempt(job.request_id)?;
                if attempts >= self.max_attempts {
                    warn!(
                        request_id = %job.request_id,
                        branch = %job.branch,
                        revision = %job.revision,
                        attempts,
                        "giving up on job whose push never appeared"
                    );
                    store.missing_remove(job.request_id)?;
                    report.expired += 1;
                } else {
                    report.retained += 1;
                }
            }
            Err(ResolveError::Store(err)) => return Err(err),
        }
        Ok(())
    }
}

/// Asks the pushlog for the full revision, then for the short one, and
/// stores whatever the first non-empty answer holds. A fetch failure counts
/// the same as an empty answer.
fn fetch_and_store_pushes(
    store: &mut SqliteStore,
    pushes: &impl PushSource,
    job: &JobRecord,
) -> Result<usize, StoreError> {
    let Some(repository) = store.repository_get(job.branch.as_str())? else {
        return Ok(0);
    };
    let mut candidates = vec![job.revision.as_str()];
    if job.revision.is_full() {
        candidates.push(job.revision.short());
    }

    for revision in candidates {
        let fetched = match pushes.fetch_pushes(&repository, revision) {
            Ok(fetched) => fetched,
            Err(error) => {
                warn!(repository = %repository.name, %revision, %error, "pushlog fetch failed");
                continue;
            }
        };
        if fetched.is_empty() {
            continue;
        }
        let mut stored = 0;
        for push in &fetched {
            if store.push_insert(push)?.created {
                stored += 1;
            }
        }
        return Ok(stored);
    }
    Ok(0)
}
