//! Domain types and pure logic shared by every SchoolHub crate.

pub mod attendance;
pub mod crypto;
pub mod encoding;
pub mod error;
pub mod roles;
pub mod types;
pub mod upload;
