#![forbid(unsafe_code)]

pub mod job;
pub mod push;

pub use job::{JobCategory, JobRecord, JobResult, JobState};
pub use push::{Changeset, Push, PushError};

pub mod ids {
    /// Number of leading hex digits buildapi uses for abbreviated revisions.
    pub const SHORT_REVISION_LEN: usize = 12;
    pub const FULL_REVISION_LEN: usize = 40;

    /// Buildapi request id; the external identity of a job.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct RequestId(i64);

    impl RequestId {
        pub fn get(self) -> i64 {
            self.0
        }

        pub fn try_new(value: i64) -> Result<Self, RequestIdError> {
            if value <= 0 {
                return Err(RequestIdError::NotPositive);
            }
            Ok(Self(value))
        }
    }

    impl std::fmt::Display for RequestId {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum RequestIdError {
        NotPositive,
    }

    /// A changeset hash, either full (40 hex digits) or abbreviated (12..40).
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Revision(String);

    impl Revision {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, RevisionError> {
            let value = value.into().trim().to_ascii_lowercase();
            validate_revision(&value)?;
            Ok(Self(value))
        }

        pub fn is_full(&self) -> bool {
            self.0.len() == FULL_REVISION_LEN
        }

        pub fn short(&self) -> &str {
            &self.0[..SHORT_REVISION_LEN]
        }
    }

    impl std::fmt::Display for Revision {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum RevisionError {
        Empty,
        TooShort,
        TooLong,
        InvalidChar { ch: char, index: usize },
    }

    fn validate_revision(value: &str) -> Result<(), RevisionError> {
        if value.is_empty() {
            return Err(RevisionError::Empty);
        }
        if value.len() < SHORT_REVISION_LEN {
            return Err(RevisionError::TooShort);
        }
        if value.len() > FULL_REVISION_LEN {
            return Err(RevisionError::TooLong);
        }
        for (index, ch) in value.chars().enumerate() {
            if !ch.is_ascii_hexdigit() {
                return Err(RevisionError::InvalidChar { ch, index });
            }
        }
        Ok(())
    }

    /// Buildapi branch name. Doubles as the repository name in the store.
    #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct BranchName(String);

    impl BranchName {
        pub fn as_str(&self) -> &str {
            &self.0
        }

        pub fn try_new(value: impl Into<String>) -> Result<Self, BranchNameError> {
            let value = value.into().trim().to_string();
            validate_branch_name(&value)?;
            Ok(Self(value))
        }
    }

    impl std::fmt::Display for BranchName {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum BranchNameError {
        Empty,
        TooLong,
        InvalidFirstChar,
        InvalidChar { ch: char, index: usize },
    }

    fn validate_branch_name(value: &str) -> Result<(), BranchNameError> {
        if value.is_empty() {
            return Err(BranchNameError::Empty);
        }
        if value.len() > 128 {
            return Err(BranchNameError::TooLong);
        }
        let Some(first) = value.chars().next() else {
            return Err(BranchNameError::Empty);
        };
        if !first.is_ascii_alphanumeric() {
            return Err(BranchNameError::InvalidFirstChar);
        }
        for (index, ch) in value.chars().enumerate().skip(1) {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '/' | '-') {
                continue;
            }
            return Err(BranchNameError::InvalidChar { ch, index });
        }
        Ok(())
    }
}
