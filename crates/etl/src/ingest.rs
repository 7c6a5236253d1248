#![forbid(unsafe_code)]

use crate::cache::{CacheBackend, DedupCache};
use crate::config::EtlConfig;
use crate::error::{IngestError, ResolveError};
use crate::fetch::JobSource;
use crate::process::JobsProcess;
use crate::pushlog::PushSource;
use crate::queue::{DrainReport, MissingResultsetQueue};
use crate::reconcile::Reconciler;
use crate::resolver::resolve;
use bi_core::JobCategory;
use bi_storage::SqliteStore;
use std::time::Duration;
use tracing::{debug, error, info, info_span};

#[derive(Clone, Copy, Debug)]
pub struct IngestOptions {
    /// `None` keeps dedup sets until the next run overwrites them.
    pub cache_ttl: Option<Duration>,
    pub max_resolve_attempts: u32,
    pub drain_limit: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            cache_ttl: Some(Duration::from_secs(4 * 60 * 60)),
            max_resolve_attempts: 5,
            drain_limit: 100,
        }
    }
}

impl IngestOptions {
    pub fn from_config(config: &EtlConfig) -> Self {
        Self {
            cache_ttl: Some(config.cache_ttl()),
            max_resolve_attempts: config.max_resolve_attempts,
            drain_limit: config.drain_limit,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub category: JobCategory,
    /// Records decoded from the document.
    pub fetched: usize,
    /// Records whose request id was already ingested.
    pub duplicates: usize,
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Records parked until their push is known.
    pub queued: usize,
    /// Records on branches that are not tracked.
    pub dropped: usize,
    /// At least one request id was new to this feed.
    pub new_jobs: bool,
    pub drain: DrainReport,
}

impl RunReport {
    fn new(category: JobCategory, fetched: usize) -> Self {
        Self {
            category,
            fetched,
            duplicates: 0,
            inserted: 0,
            updated: 0,
            skipped: 0,
            queued: 0,
            dropped: 0,
            new_jobs: false,
            drain: DrainReport::default(),
        }
    }
}

/// Runs one buildapi feed end to end: fetch, decode, dedup, resolve, store,
/// then drain the missing-resultset queue.
pub struct Ingestor<S, P, C> {
    store: SqliteStore,
    source: S,
    pushes: P,
    cache: C,
    queue: MissingResultsetQueue,
    options: IngestOptions,
}

impl<S, P, C> Ingestor<S, P, C>
where
    S: JobSource,
    P: PushSource,
    C: CacheBackend,
{
    pub fn new(store: SqliteStore, source: S, pushes: P, cache: C, options: IngestOptions) -> Self {
        let queue = MissingResultsetQueue::new(options.max_resolve_attempts, options.drain_limit);
        Self {
            store,
            source,
            pushes,
            cache,
            queue,
            options,
        }
    }

    /// Returns true when the feed held at least one request id that the
    /// previous run of the same feed had not seen.
    pub fn run(&mut self, process: &dyn JobsProcess) -> Result<bool, IngestError> {
        Ok(self.run_with_report(process)?.new_jobs)
    }

    pub fn run_with_report(&mut self, process: &dyn JobsProcess) -> Result<RunReport, IngestError> {
        let category = process.category();
        let span = info_span!("ingest", %category);
        let _guard = span.enter();

        // Nothing is written when the document cannot be read.
        let document = match self.source.fetch(category) {
            Ok(document) => document,
            Err(source) => {
                error!(error = %source, "buildapi fetch failed; aborting run");
                return Err(IngestError::SourceUnavailable { category, source });
            }
        };
        let jobs = match process.transform(&document) {
            Ok(jobs) => jobs,
            Err(source) => {
                error!(error = %source, "buildapi document has the wrong shape; aborting run");
                return Err(IngestError::SourceUnavailable { category, source });
            }
        };
        drop(document);

        let mut report = RunReport::new(category, jobs.len());
        let mut dedup = DedupCache::load(&mut self.cache, category)?;
        let mut reconciler = Reconciler::new();

        for job in &jobs {
            let seen = dedup.has_seen(job.request_id);
            dedup.mark_seen(job.request_id);
            if seen {
                debug!(request_id = %job.request_id, "already ingested");
                report.duplicates += 1;
                continue;
            }

            match resolve(&self.store, &job.branch, &job.revision) {
                Ok(resultset_id) => {
                    reconciler.ingest(&mut self.store, job, resultset_id)?;
                }
                Err(ResolveError::BranchNotFound { branch }) => {
                    debug!(request_id = %job.request_id, %branch, "dropping job for unknown branch");
                    report.dropped += 1;
                }
                Err(ResolveError::ResultsetNotFound { .. }) => {
                    self.queue.enqueue(&mut self.store, job)?;
                    report.queued += 1;
                }
                Err(ResolveError::Store(err)) => return Err(err.into()),
            }
        }

        report.new_jobs = dedup.commit(&mut self.cache, self.options.cache_ttl)?;
        report.drain = self
            .queue
            .drain(&mut self.store, &self.pushes, &mut reconciler)?;

        let stats = reconciler.stats();
        report.inserted = stats.inserted;
        report.updated = stats.updated;
        report.skipped = stats.skipped;

        info!(
            fetched = report.fetched,
            duplicates = report.duplicates,
            inserted = report.inserted,
            updated = report.updated,
            skipped = report.skipped,
            queued = report.queued,
            dropped = report.dropped,
            new_jobs = report.new_jobs,
            "run finished"
        );
        Ok(report)
    }

    /// Retries queued jobs without fetching any feed.
    pub fn drain_missing(&mut self) -> Result<DrainReport, IngestError> {
        let mut reconciler = Reconciler::new();
        Ok(self
            .queue
            .drain(&mut self.store, &self.pushes, &mut reconciler)?)
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SqliteStore {
        &mut self.store
    }

    pub fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    pub fn pushes(&self) -> &P {
        &self.pushes
    }

    pub fn into_store(self) -> SqliteStore {
        self.store
    }
}
