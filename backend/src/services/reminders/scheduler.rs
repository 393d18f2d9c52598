//! Periodic executor for reminder jobs
//!
//! Each scheduler owns one tokio task. The task runs a tick immediately,
//! then waits for either the interval or a stop signal. A stop never
//! interrupts a tick in flight; [`ReminderScheduler::stop`] waits for it.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Counters reported by one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Users or token sets a notification went out to
    pub notified: usize,
    /// Users with nothing to send
    pub skipped: usize,
    /// Users whose processing failed and was logged
    pub failed: usize,
    pub tokens_pruned: u64,
}

/// One kind of reminder, run once per tick
#[async_trait]
pub trait ReminderJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Errors here are logged by the scheduler; the loop keeps going
    async fn run_tick(&self) -> Result<TickSummary>;
}

/// Scheduler state exposed on the readiness endpoint
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub name: &'static str,
    pub enabled: bool,
    pub running: bool,
    pub interval_secs: u64,
}

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct ReminderScheduler {
    interval: Duration,
    enabled: bool,
    job: Arc<dyn ReminderJob>,
    running: Mutex<Option<Running>>,
}

impl ReminderScheduler {
    pub fn new(job: Arc<dyn ReminderJob>, interval: Duration, enabled: bool) -> Self {
        Self {
            interval,
            enabled,
            job,
            running: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.job.name()
    }

    /// Spawn the worker task
    ///
    /// Returns `false` when disabled or already running.
    pub async fn start(&self) -> bool {
        if !self.enabled {
            info!(scheduler = self.name(), "Reminder scheduler disabled; not starting");
            return false;
        }

        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(Arc::clone(&self.job), self.interval, stop_rx));
        *running = Some(Running { stop_tx, handle });
        true
    }

    /// Signal the worker and wait for it to exit
    pub async fn stop(&self) {
        let Some(running) = self.running.lock().await.take() else {
            return;
        };
        // Receiver is gone only if the task already exited
        let _ = running.stop_tx.send(true);
        if let Err(e) = running.handle.await {
            warn!(scheduler = self.name(), error = %e, "Reminder scheduler task ended abnormally");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            name: self.name(),
            enabled: self.enabled,
            running: self.is_running().await,
            interval_secs: self.interval.as_secs(),
        }
    }
}

async fn run_loop(job: Arc<dyn ReminderJob>, interval: Duration, mut stop_rx: watch::Receiver<bool>) {
    let name = job.name();
    info!(scheduler = name, interval_secs = interval.as_secs(), "Reminder scheduler started");

    loop {
        if *stop_rx.borrow() {
            break;
        }

        // A panicking tick takes down only its own task
        let tick_job = Arc::clone(&job);
        match tokio::spawn(async move { tick_job.run_tick().await }).await {
            Ok(Ok(summary)) => info!(
                scheduler = name,
                notified = summary.notified,
                skipped = summary.skipped,
                failed = summary.failed,
                tokens_pruned = summary.tokens_pruned,
                "Reminder tick finished"
            ),
            Ok(Err(e)) => error!(scheduler = name, error = %e, "Reminder tick failed"),
            Err(e) => error!(scheduler = name, error = %e, "Reminder tick panicked"),
        }

        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!(scheduler = name, "Reminder scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_secs(60);

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail,
        Panic,
        Sleep(Duration),
    }

    struct CountingJob {
        ticks: AtomicUsize,
        completed: AtomicUsize,
        behavior: Behavior,
    }

    impl CountingJob {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                ticks: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                behavior,
            })
        }

        fn ticks(&self) -> usize {
            self.ticks.load(Ordering::SeqCst)
        }

        fn completed(&self) -> usize {
            self.completed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReminderJob for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run_tick(&self) -> Result<TickSummary> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => {}
                Behavior::Fail => anyhow::bail!("tick exploded"),
                Behavior::Panic => panic!("tick panicked"),
                Behavior::Sleep(duration) => tokio::time::sleep(duration).await,
            }
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(TickSummary::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_scheduler_never_starts() {
        let job = CountingJob::new(Behavior::Succeed);
        let scheduler = ReminderScheduler::new(job.clone(), INTERVAL, false);

        assert!(!scheduler.start().await);
        tokio::time::sleep(INTERVAL * 3).await;

        assert_eq!(job.ticks(), 0);
        assert!(!scheduler.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let job = CountingJob::new(Behavior::Succeed);
        let scheduler = ReminderScheduler::new(job.clone(), INTERVAL, true);

        assert!(scheduler.start().await);
        assert!(!scheduler.start().await);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(job.ticks(), 1);
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_immediately_then_every_interval() {
        let job = CountingJob::new(Behavior::Succeed);
        let scheduler = ReminderScheduler::new(job.clone(), INTERVAL, true);
        scheduler.start().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(job.ticks(), 1);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(job.ticks(), 2);

        scheduler.stop().await;
        tokio::time::sleep(INTERVAL * 5).await;
        assert_eq!(job.ticks(), 2);
        assert!(!scheduler.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_right_after_start_runs_at_most_one_tick() {
        let job = CountingJob::new(Behavior::Succeed);
        let scheduler = ReminderScheduler::new(job.clone(), INTERVAL, true);

        scheduler.start().await;
        scheduler.stop().await;
        tokio::time::sleep(INTERVAL * 3).await;

        assert!(job.ticks() <= 1);
        assert!(!scheduler.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_tick_keeps_loop_alive() {
        let job = CountingJob::new(Behavior::Fail);
        let scheduler = ReminderScheduler::new(job.clone(), INTERVAL, true);
        scheduler.start().await;

        tokio::time::sleep(INTERVAL * 2 + Duration::from_secs(1)).await;

        assert_eq!(job.ticks(), 3);
        assert!(scheduler.is_running().await);
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let job = CountingJob::new(Behavior::Succeed);
        let scheduler = ReminderScheduler::new(job.clone(), INTERVAL, true);

        scheduler.start().await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        scheduler.stop().await;
        assert!(scheduler.start().await);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(job.ticks(), 2);
        assert_eq!(scheduler.status().await.name, "counting");
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_tick_in_flight() {
        let job = CountingJob::new(Behavior::Sleep(Duration::from_secs(5)));
        let scheduler = ReminderScheduler::new(job.clone(), INTERVAL, true);
        scheduler.start().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(job.ticks(), 1);
        assert_eq!(job.completed(), 0);

        scheduler.stop().await;

        assert_eq!(job.completed(), 1);
        assert!(!scheduler.is_running().await);
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(job.ticks(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_tick_keeps_loop_alive() {
        let job = CountingJob::new(Behavior::Panic);
        let scheduler = ReminderScheduler::new(job.clone(), INTERVAL, true);
        scheduler.start().await;

        tokio::time::sleep(INTERVAL * 2 + Duration::from_secs(1)).await;

        assert_eq!(job.ticks(), 3);
        assert_eq!(job.completed(), 0);
        assert!(scheduler.is_running().await);
        scheduler.stop().await;
    }
}
