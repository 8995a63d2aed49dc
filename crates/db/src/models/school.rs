//! School entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use schoolhub_core::types::{DbId, Timestamp};

/// A row from the `schools` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct School {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a school.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSchool {
    pub name: String,
}
