use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::pipeline::{Pipeline, RunOptions, RunOutcome};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub cron: Option<String>,
    pub job_id: Option<Uuid>,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub uptime_seconds: u64,
}

/// Read-only view of the scheduler's counters, shareable with the web layer.
#[derive(Clone)]
pub struct SchedulerStatus {
    stats: Arc<RwLock<SchedulerStats>>,
    start_time: DateTime<Utc>,
}

impl SchedulerStatus {
    pub async fn snapshot(&self) -> SchedulerStats {
        let mut stats = self.stats.read().await.clone();
        let uptime = Utc::now().signed_duration_since(self.start_time);
        stats.uptime_seconds = uptime.num_seconds().max(0) as u64;
        stats
    }
}

/// Runs the pipeline on the configured cron schedule. Run failures are logged
/// and counted; they never stop the schedule.
pub struct ScoutScheduler {
    scheduler: JobScheduler,
    pipeline: Arc<Pipeline>,
    config: SchedulerConfig,
    status: SchedulerStatus,
}

impl ScoutScheduler {
    pub async fn new(pipeline: Arc<Pipeline>, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;
        let stats = SchedulerStats {
            cron: config.cron.clone(),
            ..SchedulerStats::default()
        };

        Ok(Self {
            scheduler,
            pipeline,
            config,
            status: SchedulerStatus {
                stats: Arc::new(RwLock::new(stats)),
                start_time: Utc::now(),
            },
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.cron.is_some()
    }

    /// Options every scheduled run uses.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            include: self.config.include.to_lowercase(),
            exclude: self.config.exclude.to_lowercase(),
            max: self.config.max,
            ..RunOptions::default()
        }
    }

    /// Register the cron job (when configured) and start ticking.
    pub async fn start(&mut self) -> Result<()> {
        let Some(cron) = self.config.cron.clone() else {
            tracing::info!("No scheduler.cron configured, periodic runs disabled");
            return Ok(());
        };

        let pipeline = Arc::clone(&self.pipeline);
        let stats = Arc::clone(&self.status.stats);
        let options = self.run_options();

        let job = Job::new_async(cron.as_str(), move |_uuid, _l| {
            let pipeline = Arc::clone(&pipeline);
            let stats = Arc::clone(&stats);
            let options = options.clone();

            Box::pin(async move {
                Self::execute_run(&pipeline, options, &stats).await;
            })
        })?;

        let job_id = self.scheduler.add(job).await?;
        self.status.stats.write().await.job_id = Some(job_id);
        self.scheduler.start().await?;

        tracing::info!(cron = %cron, job = %job_id, "Scout scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        tracing::info!("Scout scheduler shutdown");
        Ok(())
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status.clone()
    }

    pub async fn get_stats(&self) -> SchedulerStats {
        self.status.snapshot().await
    }

    async fn execute_run(
        pipeline: &Pipeline,
        options: RunOptions,
        stats: &RwLock<SchedulerStats>,
    ) {
        tracing::info!("Scheduled run starting");
        let result = pipeline.run(options).await;

        let mut stats = stats.write().await;
        stats.run_count += 1;
        stats.last_run = Some(Utc::now());

        match result {
            Ok(outcome) => {
                stats.success_count += 1;
                stats.last_error = None;
                match outcome {
                    RunOutcome::Delivered(_, records, _) => {
                        tracing::info!(records = records.len(), "Scheduled run delivered listings")
                    }
                    RunOutcome::NoNewItems(_) => tracing::info!("Scheduled run found no new items"),
                    RunOutcome::TestSample(..) => {}
                }
            }
            Err(e) => {
                stats.error_count += 1;
                stats.last_error = Some(e.to_string());
                tracing::error!(error = %e, "Scheduled run failed");
            }
        }
    }
}
