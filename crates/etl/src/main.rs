#![forbid(unsafe_code)]

//! bi_etl - ingests buildapi job feeds into the local job store.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bi_core::ids::BranchName;
use bi_core::{JobCategory, JobState};
use bi_etl::{
    BuildapiSource, EtlConfig, Fetcher, HgPushlogSource, IngestOptions, Ingestor, SqliteCache,
    process_for,
};
use bi_storage::{JobsListRequest, SqliteStore};

#[derive(Parser)]
#[command(name = "bi_etl", about = "Ingest buildapi job feeds")]
struct Cli {
    /// TOML config file.
    #[arg(long, env = "BI_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the SQLite database. Overrides the config file.
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the pending feed.
    Pending,
    /// Ingest the running feed.
    Running,
    /// Ingest the builds4h (completed) feed.
    Builds4h,
    /// Ingest pending, running and builds4h in that order.
    All,
    /// Retry jobs waiting for their push.
    Drain,
    /// List stored jobs.
    Jobs {
        /// pending, running or completed.
        #[arg(long)]
        state: Option<String>,

        /// Only jobs on this revision.
        #[arg(long)]
        revision: Option<String>,

        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bi_etl=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = EtlConfig::load(cli.config.as_deref()).context("loading config")?;
    config.apply_env().context("reading BI_* overrides")?;
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = dir;
    }
    config.validate()?;

    match cli.command {
        Commands::Pending => run_feeds(&config, &[JobCategory::Pending])?,
        Commands::Running => run_feeds(&config, &[JobCategory::Running])?,
        Commands::Builds4h => run_feeds(&config, &[JobCategory::Completed])?,
        Commands::All => run_feeds(&config, &JobCategory::ALL)?,
        Commands::Drain => drain(&config)?,
        Commands::Jobs {
            state,
            revision,
            limit,
        } => list_jobs(&config, state.as_deref(), revision, limit)?,
    }

    Ok(())
}

type ProductionIngestor = Ingestor<BuildapiSource, HgPushlogSource, SqliteCache>;

fn build_ingestor(config: &EtlConfig) -> Result<ProductionIngestor> {
    let mut store = SqliteStore::open(&config.storage_dir)
        .with_context(|| format!("opening store in {}", config.storage_dir.display()))?;
    for repository in &config.repositories {
        let name = BranchName::try_new(repository.name.as_str())
            .map_err(|err| anyhow::anyhow!("repository {:?}: {err:?}", repository.name))?;
        store.repository_upsert(&name, &repository.url)?;
    }

    let fetcher = Fetcher::new(&config.http)?;
    let source = BuildapiSource::new(fetcher.clone(), config.buildapi.clone());
    let pushes = HgPushlogSource::new(fetcher);
    let cache = SqliteCache::open(&config.storage_dir)?;
    Ok(Ingestor::new(
        store,
        source,
        pushes,
        cache,
        IngestOptions::from_config(config),
    ))
}

fn run_feeds(config: &EtlConfig, categories: &[JobCategory]) -> Result<()> {
    let mut ingestor = build_ingestor(config)?;
    let mut failed = Vec::new();
    for &category in categories {
        let process = process_for(category);
        match ingestor.run_with_report(process.as_ref()) {
            Ok(report) => println!(
                "{category}: {} fetched, {} new, {} updated, {} queued, {} dropped",
                report.fetched, report.inserted, report.updated, report.queued, report.dropped
            ),
            Err(err) => {
                error!(%category, error = %err, "run failed");
                failed.push(category);
            }
        }
    }
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|c| c.as_str()).collect();
        bail!("ingest failed for: {}", names.join(", "));
    }
    Ok(())
}

fn drain(config: &EtlConfig) -> Result<()> {
    let mut ingestor = build_ingestor(config)?;
    let report = ingestor.drain_missing()?;
    info!(remaining = ingestor.store().missing_count()?, "drain finished");
    println!(
        "{} resolved, {} waiting, {} discarded, {} expired",
        report.resolved, report.retained, report.discarded, report.expired
    );
    Ok(())
}

fn list_jobs(
    config: &EtlConfig,
    state: Option<&str>,
    revision: Option<String>,
    limit: usize,
) -> Result<()> {
    let state = match state {
        Some(raw) => match JobState::parse(raw) {
            Some(state) => Some(state),
            None => bail!("unknown job state {raw:?}"),
        },
        None => None,
    };
    let store = SqliteStore::open(&config.storage_dir)?;
    let rows = store.jobs_list(JobsListRequest {
        state,
        revision,
        limit,
    })?;
    for row in rows {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            row.job.request_id,
            row.state,
            row.job.branch,
            row.job.revision,
            row.job.result.as_str(),
            row.job.build_name
        );
    }
    Ok(())
}
