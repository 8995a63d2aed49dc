//! Well-known role name constants.
//!
//! These must match the seed data in `20260101000002_create_users.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_PRINCIPAL: &str = "principal";
pub const ROLE_TEACHER: &str = "teacher";
pub const ROLE_PARENT: &str = "parent";

/// Roles allowed to run the face-recognition attendance flow.
pub const STAFF_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_PRINCIPAL, ROLE_TEACHER];

/// Whether `role` may take attendance and manage face encodings.
pub fn is_staff(role: &str) -> bool {
    STAFF_ROLES.contains(&role)
}
