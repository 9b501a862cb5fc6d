//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod attendance_record;
pub mod employee;
pub mod project;
pub mod task_assignment;

pub use attendance_record::AttendanceRecordEntity;
pub use employee::EmployeeEntity;
pub use project::ProjectEntity;
pub use task_assignment::TaskAssignmentEntity;
