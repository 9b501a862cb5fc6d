//! Job scheduler infrastructure for background tasks.
//!
//! The scheduler owns the process-wide background loop. Its running state
//! lives behind the same handle that exposes start, stop and status, so
//! HTTP handlers and `main` share one lifecycle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// Job frequency for scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFrequency {
    /// Run every N seconds.
    Seconds(u64),
    /// Run every N minutes.
    Minutes(u64),
}

impl JobFrequency {
    /// Get the duration between job executions.
    pub fn duration(&self) -> Duration {
        match self {
            JobFrequency::Seconds(secs) => Duration::from_secs(*secs),
            JobFrequency::Minutes(mins) => Duration::from_secs(mins.saturating_mul(60)),
        }
    }
}

/// Trait for implementing background jobs.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// The name of this job (used for logging).
    fn name(&self) -> &'static str;

    /// The frequency at which this job should run.
    fn frequency(&self) -> JobFrequency;

    /// Execute the job. Returns Ok(()) on success, Err with message on failure.
    async fn execute(&self) -> Result<(), String>;
}

/// A registered job as reported by [`JobScheduler::status`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub name: &'static str,
    pub interval_seconds: u64,
}

/// Snapshot of the scheduler lifecycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub jobs: Vec<JobStatus>,
}

struct RunningJobs {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
    started_at: DateTime<Utc>,
}

/// Background job scheduler.
pub struct JobScheduler {
    jobs: Vec<Arc<dyn Job>>,
    running: Mutex<Option<RunningJobs>>,
}

impl JobScheduler {
    /// Create a new job scheduler.
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            running: Mutex::new(None),
        }
    }

    /// Register a job with the scheduler.
    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.jobs.push(Arc::new(job));
    }

    fn state(&self) -> MutexGuard<'_, Option<RunningJobs>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.state().is_some()
    }

    pub fn status(&self) -> SchedulerStatus {
        let started_at = self.state().as_ref().map(|r| r.started_at);
        SchedulerStatus {
            running: started_at.is_some(),
            started_at,
            jobs: self
                .jobs
                .iter()
                .map(|job| JobStatus {
                    name: job.name(),
                    interval_seconds: job.frequency().duration().as_secs(),
                })
                .collect(),
        }
    }

    /// Start all registered jobs.
    ///
    /// Returns `false`, with a warning, when the scheduler is already running.
    pub fn start(&self) -> bool {
        let mut state = self.state();
        if state.is_some() {
            warn!("Job scheduler already running, start ignored");
            return false;
        }

        info!("Starting job scheduler with {} jobs", self.jobs.len());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = self
            .jobs
            .iter()
            .map(|job| tokio::spawn(run_job(Arc::clone(job), shutdown_rx.clone())))
            .collect();

        *state = Some(RunningJobs {
            shutdown_tx,
            handles,
            started_at: Utc::now(),
        });
        true
    }

    /// Signals every job to stop and waits for them up to `timeout`.
    ///
    /// A job in the middle of an execution finishes it first. Returns
    /// `false`, with a warning, when the scheduler was not running.
    pub async fn stop(&self, timeout: Duration) -> bool {
        let Some(running) = self.state().take() else {
            warn!("Job scheduler not running, stop ignored");
            return false;
        };

        info!("Initiating job scheduler shutdown");
        let _ = running.shutdown_tx.send(true);

        let shutdown_future = async {
            for handle in running.handles {
                if let Err(e) = handle.await {
                    warn!("Job task panicked: {}", e);
                }
            }
        };

        match tokio::time::timeout(timeout, shutdown_future).await {
            Ok(()) => info!("All jobs completed gracefully"),
            Err(_) => warn!("Job shutdown timed out after {:?}", timeout),
        }
        true
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_job(job: Arc<dyn Job>, mut shutdown_rx: watch::Receiver<bool>) {
    let name = job.name();
    let frequency = job.frequency();
    let mut interval = tokio::time::interval(frequency.duration());
    // A slow execution delays the next wake instead of bursting to catch up
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first immediate tick
    interval.tick().await;

    info!(job = name, frequency = ?frequency, "Job scheduled");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let start = std::time::Instant::now();
                info!(job = name, "Job starting");

                match job.execute().await {
                    Ok(()) => info!(
                        job = name,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Job completed successfully"
                    ),
                    Err(e) => error!(
                        job = name,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        error = %e,
                        "Job failed"
                    ),
                }
            }
            _ = shutdown_rx.changed() => {
                info!(job = name, "Job shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestJob {
        run_count: Arc<AtomicUsize>,
        should_fail: bool,
    }

    #[async_trait::async_trait]
    impl Job for TestJob {
        fn name(&self) -> &'static str {
            "test_job"
        }

        fn frequency(&self) -> JobFrequency {
            JobFrequency::Seconds(1)
        }

        async fn execute(&self) -> Result<(), String> {
            self.run_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err("Test failure".to_string())
            } else {
                Ok(())
            }
        }
    }

    fn scheduler_with(run_count: &Arc<AtomicUsize>, should_fail: bool) -> JobScheduler {
        let mut scheduler = JobScheduler::new();
        scheduler.register(TestJob {
            run_count: Arc::clone(run_count),
            should_fail,
        });
        scheduler
    }

    #[test]
    fn test_job_frequency_duration() {
        assert_eq!(JobFrequency::Seconds(30).duration(), Duration::from_secs(30));
        assert_eq!(JobFrequency::Minutes(15).duration(), Duration::from_secs(900));
    }

    #[test]
    fn test_status_lists_registered_jobs() {
        let scheduler = scheduler_with(&Arc::new(AtomicUsize::new(0)), false);
        let status = scheduler.status();

        assert!(!status.running);
        assert!(status.started_at.is_none());
        assert_eq!(status.jobs.len(), 1);
        assert_eq!(status.jobs[0].name, "test_job");
        assert_eq!(status.jobs[0].interval_seconds, 1);
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let scheduler = scheduler_with(&Arc::new(AtomicUsize::new(0)), false);

        assert!(scheduler.start());
        assert!(!scheduler.start());
        assert!(scheduler.is_running());
        assert!(scheduler.status().started_at.is_some());

        assert!(scheduler.stop(Duration::from_secs(2)).await);
        assert!(!scheduler.stop(Duration::from_secs(2)).await);
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let scheduler = scheduler_with(&Arc::new(AtomicUsize::new(0)), false);

        assert!(scheduler.start());
        assert!(scheduler.stop(Duration::from_secs(2)).await);
        assert!(scheduler.start());
        assert!(scheduler.stop(Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn test_jobs_run_after_first_interval() {
        let run_count = Arc::new(AtomicUsize::new(0));
        let scheduler = scheduler_with(&run_count, false);

        scheduler.start();
        // First tick is skipped, so nothing runs immediately
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(run_count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1400)).await;
        scheduler.stop(Duration::from_secs(2)).await;
        assert!(run_count.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_failing_job_keeps_running() {
        let run_count = Arc::new(AtomicUsize::new(0));
        let scheduler = scheduler_with(&run_count, true);

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(2300)).await;
        scheduler.stop(Duration::from_secs(2)).await;
        assert!(run_count.load(Ordering::SeqCst) >= 2);
    }
}
