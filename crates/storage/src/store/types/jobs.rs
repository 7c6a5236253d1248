#![forbid(unsafe_code)]

use bi_core::{JobRecord, JobState};

#[derive(Clone, Debug)]
pub struct JobRow {
    pub job: JobRecord,
    pub state: JobState,
    pub resultset_id: i64,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct JobUpsertRequest {
    pub job: JobRecord,
    pub resultset_id: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobUpsertOutcome {
    Inserted,
    Updated { from: JobState },
    Skipped { current: JobState },
}

impl JobUpsertOutcome {
    pub fn changed(self) -> bool {
        !matches!(self, Self::Skipped { .. })
    }
}

#[derive(Clone, Debug, Default)]
pub struct JobsListRequest {
    pub state: Option<JobState>,
    pub revision: Option<String>,
    pub limit: usize,
}
