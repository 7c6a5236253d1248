#![forbid(unsafe_code)]

use bi_core::JobRecord;

#[derive(Clone, Debug)]
pub struct MissingResultsetRow {
    pub job: JobRecord,
    pub attempts: u32,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissingEnqueueOutcome {
    Queued,
    /// An entry for the same request id existed; its payload now reflects the newer state.
    Refreshed,
    /// An entry at the same or a later state already existed.
    Unchanged,
}
