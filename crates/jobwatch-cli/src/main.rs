use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use jobwatch_client::{ClientNotifier, ReqwestFetcher, SelectorExtractor};
use jobwatch_core::{
    Fingerprint, JobMonitor, JobStatus, JobStore, MemoryJobStore, MonitorConfig, RunReport,
    SourceResult, StatusLifecycle, TracingMonitorReporter,
};
use jobwatch_db::{Database, DatabaseConfig, JobRepository};

#[derive(Parser)]
#[command(name = "jobwatch", version, about = "Job listing monitor")]
struct Cli {
    /// Path to the monitor configuration (JSON)
    #[arg(short, long, global = true, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape every configured source once and notify about new matching jobs
    Run {
        /// Use an in-memory store instead of the database
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Webhook receiving new jobs (overrides the config file)
        #[arg(long, env = "JOBWATCH_WEBHOOK_URL")]
        webhook_url: Option<String>,
    },

    /// Run the monitor repeatedly until interrupted
    Watch {
        /// Seconds between the end of one run and the start of the next
        #[arg(short, long, default_value_t = 3600)]
        interval_secs: u64,

        /// Webhook receiving new jobs (overrides the config file)
        #[arg(long, env = "JOBWATCH_WEBHOOK_URL")]
        webhook_url: Option<String>,
    },

    /// List tracked jobs, newest first
    List {
        /// Only jobs in this status
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of jobs to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one job and its status history
    Show {
        /// Job fingerprint (64 hex characters)
        fingerprint: String,
    },

    /// Change a job's application status
    Update {
        /// Job fingerprint (64 hex characters)
        fingerprint: String,

        /// New status: new, applied, interviewed, offered, rejected, withdrawn
        #[arg(short, long)]
        status: String,

        /// Free-text notes recorded with the change
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Count tracked jobs per status
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobwatch=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            dry_run,
            webhook_url,
        } => {
            let config = load_config(&cli.config, webhook_url)?;
            let report = if dry_run {
                tracing::info!("Dry run: using in-memory store");
                run_once(&config, MemoryJobStore::new()).await?
            } else {
                run_once(&config, connect_db().await?).await?
            };
            print_report(&report);
        }
        Commands::Watch {
            interval_secs,
            webhook_url,
        } => {
            let config = load_config(&cli.config, webhook_url)?;
            let repo = connect_db().await?;
            cmd_watch(&config, repo, Duration::from_secs(interval_secs)).await?;
        }
        Commands::List { status, limit } => {
            let status = status
                .as_deref()
                .map(str::parse::<JobStatus>)
                .transpose()
                .map_err(|e| anyhow::anyhow!(e))?;
            cmd_list(&connect_db().await?, status, limit).await?;
        }
        Commands::Show { fingerprint } => {
            let fingerprint = parse_fingerprint(&fingerprint)?;
            cmd_show(&connect_db().await?, &fingerprint).await?;
        }
        Commands::Update {
            fingerprint,
            status,
            notes,
        } => {
            let fingerprint = parse_fingerprint(&fingerprint)?;
            cmd_update(&connect_db().await?, &fingerprint, &status, notes.as_deref()).await?;
        }
        Commands::Summary => {
            cmd_summary(&connect_db().await?).await?;
        }
    }

    Ok(())
}

fn load_config(path: &Path, webhook_url: Option<String>) -> Result<MonitorConfig> {
    let mut config = MonitorConfig::from_file(path)
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    if webhook_url.is_some() {
        config.webhook_url = webhook_url;
    }
    Ok(config)
}

/// Connect to PostgreSQL using DATABASE_URL and apply migrations.
async fn connect_db() -> Result<JobRepository> {
    let config = DatabaseConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;
    let db = Database::open(&config)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to open the job store")?;
    Ok(db.job_repo())
}

fn parse_fingerprint(raw: &str) -> Result<Fingerprint> {
    Fingerprint::parse(raw)
        .map_err(|_| anyhow::anyhow!("'{raw}' is not a job fingerprint (expected 64 hex characters)"))
}

fn build_monitor<S: JobStore>(
    config: &MonitorConfig,
    store: S,
) -> Result<JobMonitor<ReqwestFetcher, SelectorExtractor, S, ClientNotifier>> {
    let fetcher = ReqwestFetcher::with_timeout(config.fetch_timeout())
        .context("Failed to create HTTP client")?;
    let notifier = ClientNotifier::from_webhook_url(config.webhook_url.as_deref())
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok(JobMonitor::new(
        fetcher,
        SelectorExtractor::new(),
        store,
        notifier,
        config,
    ))
}

async fn run_once<S: JobStore>(config: &MonitorConfig, store: S) -> Result<RunReport> {
    let monitor = build_monitor(config, store)?;
    Ok(monitor.run_once(&TracingMonitorReporter).await)
}

async fn cmd_watch(config: &MonitorConfig, repo: JobRepository, interval: Duration) -> Result<()> {
    let monitor = build_monitor(config, repo)?;
    let cancel_token = CancellationToken::new();

    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, stopping after the current run");
            signal_token.cancel();
        }
    });

    tracing::info!(interval_secs = interval.as_secs(), "Watching job sources");
    loop {
        let report = monitor.run_once(&TracingMonitorReporter).await;
        print_report(&report);

        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = cancel_token.cancelled() => break,
        }
    }

    tracing::info!("Watch stopped");
    Ok(())
}

fn print_report(report: &RunReport) {
    println!(
        "Run {} finished: {} source(s) ok, {} failed",
        report.run_id,
        report.succeeded(),
        report.failed()
    );
    for outcome in &report.outcomes {
        match &outcome.result {
            SourceResult::Scraped {
                records,
                dropped,
                new_jobs,
                notify_worthy,
                notify_error,
            } => {
                println!(
                    "  {:<20} {records} job(s), {new_jobs} new, {} matching, {dropped} dropped",
                    outcome.source,
                    notify_worthy.len()
                );
                for job in notify_worthy {
                    println!("    + {} ({})", job.title, job.url);
                }
                if let Some(error) = notify_error {
                    println!("    ! notification failed: {error}");
                }
            }
            SourceResult::Failed {
                error,
                notify_worthy,
                notify_error,
            } => {
                println!("  {:<20} FAILED: {error}", outcome.source);
                for job in notify_worthy {
                    println!("    + {} ({})", job.title, job.url);
                }
                if let Some(error) = notify_error {
                    println!("    ! notification failed: {error}");
                }
            }
        }
    }
}

async fn cmd_list(repo: &JobRepository, status: Option<JobStatus>, limit: Option<usize>) -> Result<()> {
    let jobs = repo
        .list(status, limit)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    if jobs.is_empty() {
        println!("No jobs tracked yet");
        return Ok(());
    }

    for job in &jobs {
        println!(
            "{}  {:<11}  {}  {:<20}  {}",
            job.fingerprint.short(),
            job.status,
            job.first_seen.format("%Y-%m-%d"),
            job.company,
            job.title
        );
    }
    println!("\nTotal: {} job(s)", jobs.len());
    Ok(())
}

async fn cmd_show(repo: &JobRepository, fingerprint: &Fingerprint) -> Result<()> {
    let job = repo
        .lookup(fingerprint)
        .await
        .map_err(|e| anyhow::anyhow!(e))?
        .with_context(|| format!("No job with fingerprint {fingerprint}"))?;
    let history = StatusLifecycle::new(repo.clone())
        .history(fingerprint)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    println!("{}", job.title);
    println!("  company:      {}", job.company);
    println!("  url:          {}", job.url);
    if let Some(location) = &job.location {
        println!("  location:     {location}");
    }
    if let Some(department) = &job.department {
        println!("  department:   {department}");
    }
    if let Some(employment_type) = &job.employment_type {
        println!("  type:         {employment_type}");
    }
    println!("  status:       {}", job.status);
    println!("  first seen:   {}", job.first_seen.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  last updated: {}", job.last_updated.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  fingerprint:  {}", job.fingerprint);

    println!("\nHistory:");
    for entry in &history {
        println!(
            "  {}  {:<11}  {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            entry.status,
            entry.notes.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn cmd_update(
    repo: &JobRepository,
    fingerprint: &Fingerprint,
    status: &str,
    notes: Option<&str>,
) -> Result<()> {
    let job = StatusLifecycle::new(repo.clone())
        .update_status(fingerprint, status, notes)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    println!("{} -> {}", job.title, job.status);
    Ok(())
}

async fn cmd_summary(repo: &JobRepository) -> Result<()> {
    let counts = repo
        .count_by_status()
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    let total: i64 = counts.iter().map(|(_, n)| n).sum();

    println!("Jobs by status:");
    for (status, count) in &counts {
        println!("  {status:<11} {count}");
    }
    println!("  {:<11} {total}", "total");
    Ok(())
}
