#![forbid(unsafe_code)]

use bi_core::JobRecord;
use bi_storage::{JobUpsertOutcome, JobUpsertRequest, SqliteStore, StoreError};
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl ReconcileStats {
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.updated > 0
    }
}

/// Writes resolved jobs to the store and counts what each write did.
#[derive(Debug, Default)]
pub struct Reconciler {
    stats: ReconcileStats,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(
        &mut self,
        store: &mut SqliteStore,
        job: &JobRecord,
        resultset_id: i64,
    ) -> Result<JobUpsertOutcome, StoreError> {
        let outcome = store.job_upsert(JobUpsertRequest {
            job: job.clone(),
            resultset_id,
        })?;
        match outcome {
            JobUpsertOutcome::Inserted => self.stats.inserted += 1,
            JobUpsertOutcome::Updated { from } => {
                debug!(request_id = %job.request_id, %from, to = %job.state(), "job advanced");
                self.stats.updated += 1;
            }
            JobUpsertOutcome::Skipped { current } => {
                debug!(request_id = %job.request_id, %current, incoming = %job.state(), "job unchanged");
                self.stats.skipped += 1;
            }
        }
        Ok(outcome)
    }

    /// Returns true when any job in the batch was inserted or moved forward.
    pub fn run<'a>(
        &mut self,
        store: &mut SqliteStore,
        batch: impl IntoIterator<Item = (&'a JobRecord, i64)>,
    ) -> Result<bool, StoreError> {
        let mut changed = false;
        for (job, resultset_id) in batch {
            changed |= self.ingest(store, job, resultset_id)?.changed();
        }
        Ok(changed)
    }

    pub fn stats(&self) -> ReconcileStats {
        self.stats
    }
}
