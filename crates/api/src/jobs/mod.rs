//! Background job scheduler and job implementations.

mod attendance_alerts;
mod pool_metrics;
mod scheduler;

pub use attendance_alerts::AttendanceAlertsJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler, JobStatus, SchedulerStatus};
