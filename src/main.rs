use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use job_scout::config::LoggingConfig;
use job_scout::scraper::page_source_from_config;
use job_scout::web::{self, AppState, RunDiagnostics};
use job_scout::{
    AppConfig, Pipeline, RawRecord, RunOptions, RunOutcome, ScoutScheduler, SeenStore,
};

#[derive(Parser)]
#[command(name = "job-scout", version, about = "Scrape job boards and send new listings to chat")]
struct Cli {
    /// Directory holding default.toml and friends
    #[arg(long, global = true, default_value = "config")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP trigger (and the cron schedule, when configured)
    Serve,
    /// Run the pipeline once and print the result
    Run(RunArgs),
    /// Forget every delivered link
    Reset,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, default_value = "")]
    include: String,
    #[arg(long, default_value = "")]
    exclude: String,
    #[arg(long)]
    max: Option<usize>,
    /// Print a sample instead of sending a message; seen state is left alone
    #[arg(long)]
    test: bool,
    #[arg(long)]
    no_dedupe: bool,
    /// Clear the seen state before running
    #[arg(long)]
    reset: bool,
    /// Print run diagnostics as JSON
    #[arg(long)]
    debug: bool,
}

impl From<RunArgs> for RunOptions {
    fn from(args: RunArgs) -> Self {
        RunOptions {
            include: args.include.to_lowercase(),
            exclude: args.exclude.to_lowercase(),
            max: args.max,
            debug: args.debug,
            dedupe: !args.no_dedupe,
            reset: args.reset,
            test: args.test,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    let _log_guard = init_tracing(&config.logging)?;

    info!(sources = config.sources.len(), "Starting job scout");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Run(args) => run_once(config, args.into()).await,
        Command::Reset => {
            let store = SeenStore::new(&config.dedupe.state_path);
            store.reset()?;
            println!("Seen state cleared ({}).", store.path().display());
            Ok(())
        }
    }
}

/// Console output always; daily rolling files too when `logging.directory` is set.
fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid logging.level")?;

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "job-scout.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn build_pipeline(config: &AppConfig) -> Result<Arc<Pipeline>> {
    let scraper_config = config.scraper.clone();
    // Launching Chrome blocks until the browser is up.
    let page_source = tokio::task::spawn_blocking(move || page_source_from_config(&scraper_config))
        .await??;
    info!(engine = page_source.engine(), "Page source ready");

    Ok(Arc::new(Pipeline::from_config(config, page_source).await?))
}

async fn serve(config: AppConfig) -> Result<()> {
    let pipeline = build_pipeline(&config).await?;

    let mut scheduler = ScoutScheduler::new(Arc::clone(&pipeline), config.scheduler.clone()).await?;
    scheduler.start().await?;

    let mut state = AppState::new(pipeline);
    if scheduler.is_enabled() {
        state = state.with_scheduler(scheduler.status());
    }
    let result = web::serve(&config.server, state).await;

    if scheduler.is_enabled() {
        scheduler.shutdown().await?;
    }
    info!("Shutting down...");
    result
}

async fn run_once(config: AppConfig, options: RunOptions) -> Result<()> {
    let pipeline = build_pipeline(&config).await?;
    let debug = options.debug;

    let diagnostics = |message: String, outcome: &RunOutcome, sample: Option<Vec<RawRecord>>| {
        RunDiagnostics {
            message,
            report: outcome.report().clone(),
            sample,
        }
    };

    let outcome = pipeline.run(options).await?;
    match &outcome {
        RunOutcome::NoNewItems(_) if !debug => println!("No new items found."),
        RunOutcome::NoNewItems(_) => {
            let body = diagnostics("No new items found.".into(), &outcome, None);
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        RunOutcome::TestSample(_, sample) => {
            let body = diagnostics(
                "Test mode: returning items without sending a notification.".into(),
                &outcome,
                Some(sample.clone()),
            );
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        RunOutcome::Delivered(_, records, receipt) => {
            println!("Message sent via {} ({} listings).", receipt.channel, records.len());
            if debug {
                let body = diagnostics(format!("Message sent via {}.", receipt.channel), &outcome, None);
                println!("{}", serde_json::to_string_pretty(&body)?);
            }
        }
    }

    Ok(())
}
