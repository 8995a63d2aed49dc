//! Class (roster grouping) entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use schoolhub_core::types::{DbId, Timestamp};

/// A row from the `classes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: DbId,
    pub school_id: DbId,
    pub name: String,
    pub section: Option<String>,
    pub teacher_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Class {
    /// Display name, e.g. `"Grade 5 - B"`.
    pub fn display_name(&self) -> String {
        match &self.section {
            Some(section) => format!("{} - {section}", self.name),
            None => self.name.clone(),
        }
    }
}

/// DTO for creating a class.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateClass {
    pub school_id: DbId,
    pub name: String,
    pub section: Option<String>,
    pub teacher_id: Option<DbId>,
}
