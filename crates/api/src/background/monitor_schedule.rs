//! In-process scheduler for the monitoring pass.
//!
//! Runs [`MonitorService::run_pass`] on a fixed interval. Passes never
//! overlap within this task; an external cron hitting `/monitor/run` at the
//! same time only finds busy instances and skips them.

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use flowwatch_monitor::MonitorService;

/// Run the monitoring loop until `cancel` is triggered.
///
/// The first pass starts immediately.
pub async fn run(monitor: MonitorService, cancel: CancellationToken) {
    let period = monitor.config().interval;
    tracing::info!(
        interval_secs = period.as_secs(),
        max_concurrency = monitor.config().max_concurrency,
        "Monitor schedule started"
    );

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Monitor schedule stopping");
                break;
            }
            _ = interval.tick() => {
                match monitor.run_pass().await {
                    Ok(report) => {
                        if report.failed > 0 {
                            tracing::warn!(failed = report.failed, "Monitor pass had failing instances");
                        } else {
                            tracing::debug!(instances = report.instances, "Monitor pass finished");
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Monitor pass failed");
                    }
                }
            }
        }
    }
}
