//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod attendance_repo;
pub mod class_repo;
pub mod notification_repo;
pub mod role_repo;
pub mod school_repo;
pub mod session_repo;
pub mod student_repo;
pub mod user_repo;

pub use attendance_repo::AttendanceRepo;
pub use class_repo::ClassRepo;
pub use notification_repo::NotificationRepo;
pub use role_repo::RoleRepo;
pub use school_repo::SchoolRepo;
pub use session_repo::SessionRepo;
pub use student_repo::StudentRepo;
pub use user_repo::UserRepo;
