//! Student entity model and DTOs.
//!
//! The encrypted `face_encoding` blob is never part of [`Student`]; only
//! [`StudentFaceRecord`] carries it, and only the mark-attendance flow
//! loads that struct.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use schoolhub_core::types::{DbId, Timestamp};

/// A row from the `students` table (without the encoding blob).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: DbId,
    pub school_id: DbId,
    pub class_id: DbId,
    pub roll_number: String,
    pub first_name: String,
    pub last_name: String,
    pub parent_email: Option<String>,
    pub is_active: bool,
    pub has_face_encoding: bool,
    pub reference_photo_path: Option<String>,
    pub face_registered_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// An active student together with the encrypted encoding, if any.
#[derive(Debug, Clone, FromRow)]
pub struct StudentFaceRecord {
    pub id: DbId,
    pub roll_number: String,
    pub first_name: String,
    pub last_name: String,
    pub face_encoding: Option<Vec<u8>>,
}

impl StudentFaceRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// DTO for creating a student.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudent {
    pub school_id: DbId,
    pub class_id: DbId,
    pub roll_number: String,
    pub first_name: String,
    pub last_name: String,
    pub parent_email: Option<String>,
}
