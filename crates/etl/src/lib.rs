#![forbid(unsafe_code)]

//! buildapi job ingestion: reads the pending, running and builds4h feeds,
//! ties each job to its push and keeps one row per build request.

pub mod buildapi;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod process;
pub mod pushlog;
pub mod queue;
pub mod reconcile;
pub mod resolver;

pub use cache::{CacheBackend, DedupCache, MemoryCache, SqliteCache};
pub use config::{BuildapiUrls, EtlConfig, HttpConfig, RepositoryConfig};
pub use error::{CacheError, ConfigError, FetchError, IngestError, ResolveError};
pub use fetch::{BuildapiSource, Fetcher, JobSource};
pub use ingest::{IngestOptions, Ingestor, RunReport};
pub use process::{
    Builds4hJobsProcess, JobsProcess, PendingJobsProcess, RunningJobsProcess, process_for,
};
pub use pushlog::{HgPushlogSource, PushSource, parse_pushlog, pushlog_url};
pub use queue::{DrainReport, MissingResultsetQueue};
pub use reconcile::{ReconcileStats, Reconciler};
pub use resolver::resolve;
