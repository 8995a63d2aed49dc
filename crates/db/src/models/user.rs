//! User entity model and DTOs.

use serde::Deserialize;
use sqlx::FromRow;
use schoolhub_core::types::{DbId, Timestamp};

use crate::models::status::StatusId;

/// Full user row from the `users` table.
///
/// Contains the password hash -- never serialize this to API responses.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub school_id: DbId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role_id: StatusId,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub school_id: DbId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role_id: StatusId,
}

/// Minimal recipient info used by notification fan-out.
#[derive(Debug, Clone, FromRow)]
pub struct Recipient {
    pub id: DbId,
    pub email: String,
    pub full_name: String,
}
