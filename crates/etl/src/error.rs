#![forbid(unsafe_code)]

use bi_core::JobCategory;
use bi_storage::StoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported url {0:?} (expected file://, http:// or https://)")]
    UnsupportedUrl(String),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid json from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("repository name {0:?} is not a valid branch name")]
    InvalidRepository(String),
    #[error("buildapi document has no `{root}` {expected}")]
    Shape {
        root: &'static str,
        expected: &'static str,
    },
}

/// Why a job could not be tied to a push.
///
/// `BranchNotFound` is permanent and the job is dropped; `ResultsetNotFound`
/// is retried through the missing-resultset queue.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("branch {branch} is not a known repository")]
    BranchNotFound { branch: String },
    #[error("no push for revision {revision} on {branch}")]
    ResultsetNotFound { branch: String, revision: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResolveError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ResultsetNotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("cached value under {key} is not an id set: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("buildapi {category} source unavailable: {source}")]
    SourceUnavailable {
        category: JobCategory,
        #[source]
        source: FetchError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}
