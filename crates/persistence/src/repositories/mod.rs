//! Repository implementations for database operations.

pub mod attendance;
pub mod employee;
pub mod project;
pub mod task_assignment;

pub use attendance::AttendanceRepository;
pub use employee::EmployeeRepository;
pub use project::ProjectRepository;
pub use task_assignment::TaskAssignmentRepository;
