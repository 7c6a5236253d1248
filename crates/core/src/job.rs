#![forbid(unsafe_code)]

use crate::ids::{BranchName, RequestId, Revision};

/// Which buildapi feed a job document came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobCategory {
    Pending,
    Running,
    /// The builds4h feed: builds finished within the last four hours.
    Completed,
}

impl JobCategory {
    pub const ALL: [JobCategory; 3] = [Self::Pending, Self::Running, Self::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" | "complete" | "builds4h" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Key under which the ids ingested by the latest run of this feed are cached.
    pub fn cache_key(self) -> &'static str {
        match self {
            Self::Pending => "buildapi:pending",
            Self::Running => "buildapi:running",
            Self::Completed => "buildapi:complete",
        }
    }

    pub fn state(self) -> JobState {
        match self {
            Self::Pending => JobState::Pending,
            Self::Running => JobState::Running,
            Self::Completed => JobState::Completed,
        }
    }
}

impl std::fmt::Display for JobCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobState {
    Pending,
    Running,
    Completed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Completed
    }

    /// States only move forward; `Completed` has no successors.
    pub fn can_advance_to(self, next: JobState) -> bool {
        next > self
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobResult {
    Success,
    TestFailed,
    Busted,
    Skipped,
    Exception,
    Retry,
    UserCancel,
    Unknown,
}

impl JobResult {
    /// Maps a buildbot result code.
    pub fn from_buildbot_code(code: i64) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::TestFailed,
            2 => Self::Busted,
            3 => Self::Skipped,
            4 => Self::Exception,
            5 => Self::Retry,
            6 => Self::UserCancel,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::TestFailed => "testfailed",
            Self::Busted => "busted",
            Self::Skipped => "skipped",
            Self::Exception => "exception",
            Self::Retry => "retry",
            Self::UserCancel => "usercancel",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "success" => Some(Self::Success),
            "testfailed" => Some(Self::TestFailed),
            "busted" => Some(Self::Busted),
            "skipped" => Some(Self::Skipped),
            "exception" => Some(Self::Exception),
            "retry" => Some(Self::Retry),
            "usercancel" => Some(Self::UserCancel),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// A job as read from one buildapi document, before it is tied to a push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobRecord {
    pub request_id: RequestId,
    pub category: JobCategory,
    pub branch: BranchName,
    pub revision: Revision,
    pub build_name: String,
    pub result: JobResult,
    pub submit_timestamp: i64,
    pub start_timestamp: i64,
    pub end_timestamp: i64,
}

impl JobRecord {
    pub fn state(&self) -> JobState {
        self.category.state()
    }
}
