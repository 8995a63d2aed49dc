//! Attendance entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use schoolhub_core::types::{Date, DbId, Timestamp};

use crate::models::status::StatusId;

/// A row from the `attendance` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: DbId,
    pub student_id: DbId,
    pub class_id: DbId,
    pub teacher_id: Option<DbId>,
    pub date: Date,
    pub status_id: StatusId,
    pub method_id: StatusId,
    pub confidence: Option<f64>,
    pub remarks: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An attendance row joined with the student's roster fields.
#[derive(Debug, Clone, FromRow)]
pub struct ClassAttendanceRow {
    pub id: DbId,
    pub student_id: DbId,
    pub roll_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date: Date,
    pub status_id: StatusId,
    pub method_id: StatusId,
    pub confidence: Option<f64>,
    pub remarks: Option<String>,
    pub teacher_id: Option<DbId>,
    pub updated_at: Timestamp,
}

/// DTO for inserting or replacing the row for `(student_id, date)`.
#[derive(Debug, Clone)]
pub struct UpsertAttendance {
    pub student_id: DbId,
    pub class_id: DbId,
    pub teacher_id: Option<DbId>,
    pub date: Date,
    pub status_id: StatusId,
    pub method_id: StatusId,
    pub confidence: Option<f64>,
    pub remarks: Option<String>,
}
