//! Notification routing.
//!
//! [`AttendanceNotificationRouter`] subscribes to the event bus and turns
//! confirmed attendance into in-app notices and parent emails.

pub mod router;

pub use router::{AttendanceConfirmed, AttendanceNotificationRouter, StudentStatus};
