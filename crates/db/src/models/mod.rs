//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts

pub mod attendance;
pub mod class;
pub mod notification;
pub mod school;
pub mod session;
pub mod status;
pub mod student;
pub mod user;
