#![forbid(unsafe_code)]

use crate::buildapi::{parse_builds4h, parse_pending, parse_running};
use crate::error::FetchError;
use bi_core::{JobCategory, JobRecord};
use serde_json::Value as JsonValue;

/// One buildapi feed: which category it fills and how its document decodes.
pub trait JobsProcess {
    fn category(&self) -> JobCategory;

    /// Fails only when the document as a whole has the wrong shape.
    fn transform(&self, document: &JsonValue) -> Result<Vec<JobRecord>, FetchError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PendingJobsProcess;

#[derive(Clone, Copy, Debug, Default)]
pub struct RunningJobsProcess;

#[derive(Clone, Copy, Debug, Default)]
pub struct Builds4hJobsProcess;

impl JobsProcess for PendingJobsProcess {
    fn category(&self) -> JobCategory {
        JobCategory::Pending
    }

    fn transform(&self, document: &JsonValue) -> Result<Vec<JobRecord>, FetchError> {
        parse_pending(document)
    }
}

impl JobsProcess for RunningJobsProcess {
    fn category(&self) -> JobCategory {
        JobCategory::Running
    }

    fn transform(&self, document: &JsonValue) -> Result<Vec<JobRecord>, FetchError> {
        parse_running(document)
    }
}

impl JobsProcess for Builds4hJobsProcess {
    fn category(&self) -> JobCategory {
        JobCategory::Completed
    }

    fn transform(&self, document: &JsonValue) -> Result<Vec<JobRecord>, FetchError> {
        parse_builds4h(document)
    }
}

pub fn process_for(category: JobCategory) -> Box<dyn JobsProcess> {
    match category {
        JobCategory::Pending => Box::new(PendingJobsProcess),
        JobCategory::Running => Box::new(RunningJobsProcess),
        JobCategory::Completed => Box::new(Builds4hJobsProcess),
    }
}
