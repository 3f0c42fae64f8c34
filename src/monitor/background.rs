//! Background monitor scheduler.
//!
//! Spawns a thread that runs the critical-value monitor every `interval`.
//! Runs are not serialized against externally triggered ones.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{run_monitor, MonitorThresholds};
use crate::store::RecordStore;

/// Sleep granularity for shutdown responsiveness.
const SLEEP_GRANULARITY: Duration = Duration::from_millis(250);

/// Handle for the monitor thread. Dropping it stops and joins the thread.
pub struct MonitorSchedulerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl MonitorSchedulerHandle {
    /// Request shutdown. A run in progress completes first.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for MonitorSchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

pub fn start_monitor_scheduler(
    store: Arc<RecordStore>,
    thresholds: MonitorThresholds,
    interval: Duration,
) -> MonitorSchedulerHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();

    let handle = std::thread::spawn(move || {
        tracing::info!(interval_secs = interval.as_secs(), "Monitor scheduler started");
        scheduler_loop(&store, &thresholds, interval, &flag);
        tracing::info!("Monitor scheduler shutting down");
    });

    MonitorSchedulerHandle {
        shutdown,
        handle: Some(handle),
    }
}

fn scheduler_loop(
    store: &RecordStore,
    thresholds: &MonitorThresholds,
    interval: Duration,
    shutdown: &AtomicBool,
) {
    loop {
        let due = Instant::now() + interval;
        while Instant::now() < due {
            if shutdown.load(Ordering::Relaxed) {
                return;
            }
            std::thread::sleep(SLEEP_GRANULARITY.min(due.saturating_duration_since(Instant::now())));
        }
        if shutdown.load(Ordering::Relaxed) {
            return;
        }

        match run_monitor(store, thresholds) {
            Ok(report) if report.has_failures() => {
                tracing::warn!(
                    notifications = report.notifications_created(),
                    "Scheduled monitor run finished with rule failures"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Scheduled monitor run failed"),
        }
    }
}
