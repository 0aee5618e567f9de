//! Scheduled execution of the posting pipeline.

use crate::config::ScheduleConfig;
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Run the pipeline on the configured cron schedule until Ctrl-C.
///
/// Runs never overlap: a tick that fires while the previous run is still in
/// flight is skipped, not queued. Skipped ticks are logged so a stuck run
/// shows up in the logs as a stream of skips.
pub async fn run_forever(pipeline: Pipeline, schedule: &ScheduleConfig) -> Result<()> {
    let pipeline = Arc::new(Mutex::new(pipeline));

    if schedule.run_at_start {
        info!("running once at startup");
        run_guarded(&pipeline).await;
    }

    let mut sched = JobScheduler::new().await.context("creating scheduler")?;
    let cron = schedule.cron.clone();
    let job_pipeline = pipeline.clone();
    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pipeline = job_pipeline.clone();
        Box::pin(async move {
            run_guarded(&pipeline).await;
        })
    })
    .with_context(|| format!("creating scheduler job for cron '{cron}'"))?;
    sched.add(job).await.context("adding scheduler job")?;
    sched.start().await.context("starting scheduler")?;

    info!(cron = %schedule.cron, "scheduler running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");
    sched.shutdown().await.context("stopping scheduler")?;
    Ok(())
}

/// One guarded tick. `try_lock` keeps runs from ever overlapping.
async fn run_guarded(pipeline: &Arc<Mutex<Pipeline>>) {
    let Ok(guard) = pipeline.try_lock() else {
        warn!("previous run still in progress, skipping this tick");
        return;
    };
    match guard.run_once().await {
        Ok(report) => {
            info!(run = %report.run_id, state = ?report.state, "run finished");
        }
        Err(e) => {
            error!(error = %e, "run failed");
        }
    }
}
