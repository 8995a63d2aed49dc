//! Handlers for the `/attendance` resource (read-only history).

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use schoolhub_core::attendance::{parse_attendance_date, AttendanceMethod, AttendanceStatus};
use schoolhub_core::error::CoreError;
use schoolhub_core::roles::{is_staff, ROLE_PARENT};
use schoolhub_core::types::{Date, DbId, Timestamp};
use schoolhub_db::models::attendance::{Attendance, ClassAttendanceRow};
use schoolhub_db::models::status::StatusId;
use schoolhub_db::repositories::{AttendanceRepo, UserRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::{class_in_school, student_in_school};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireStaff;
use crate::query::{DateParams, DateRangeParams};
use crate::response::DataResponse;
use crate::state::AppState;

/// Default history window when `from` is omitted.
const DEFAULT_HISTORY_DAYS: i64 = 30;

/// Longest range a single history request may cover.
const MAX_HISTORY_DAYS: i64 = 366;

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A stored attendance row with lookup ids resolved to names.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: DbId,
    pub student_id: DbId,
    pub class_id: DbId,
    pub date: Date,
    pub status: AttendanceStatus,
    pub method: AttendanceMethod,
    pub confidence: Option<f64>,
    pub remarks: Option<String>,
    pub teacher_id: Option<DbId>,
    pub updated_at: Timestamp,
}

impl AttendanceRecord {
    pub fn from_row(row: Attendance) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            student_id: row.student_id,
            class_id: row.class_id,
            date: row.date,
            status: status_of(row.status_id)?,
            method: method_of(row.method_id)?,
            confidence: row.confidence,
            remarks: row.remarks,
            teacher_id: row.teacher_id,
            updated_at: row.updated_at,
        })
    }
}

/// One student's line in a class's attendance for a day.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAttendanceEntry {
    pub id: DbId,
    pub student_id: DbId,
    pub roll_number: String,
    pub name: String,
    pub status: AttendanceStatus,
    pub method: AttendanceMethod,
    pub confidence: Option<f64>,
    pub remarks: Option<String>,
    pub teacher_id: Option<DbId>,
    pub updated_at: Timestamp,
}

impl ClassAttendanceEntry {
    fn from_row(row: ClassAttendanceRow) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            student_id: row.student_id,
            name: format!("{} {}", row.first_name, row.last_name),
            roll_number: row.roll_number,
            status: status_of(row.status_id)?,
            method: method_of(row.method_id)?,
            confidence: row.confidence,
            remarks: row.remarks,
            teacher_id: row.teacher_id,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAttendanceResponse {
    pub class_id: DbId,
    pub class_name: String,
    pub date: Date,
    pub present: usize,
    pub absent: usize,
    pub records: Vec<ClassAttendanceEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentHistoryResponse {
    pub student_id: DbId,
    pub name: String,
    pub from: Date,
    pub to: Date,
    pub present: usize,
    pub absent: usize,
    pub records: Vec<AttendanceRecord>,
}

fn status_of(id: StatusId) -> AppResult<AttendanceStatus> {
    AttendanceStatus::from_id(id)
        .ok_or_else(|| AppError::InternalError(format!("Unknown attendance status id {id}")))
}

fn method_of(id: StatusId) -> AppResult<AttendanceMethod> {
    AttendanceMethod::from_id(id)
        .ok_or_else(|| AppError::InternalError(format!("Unknown attendance method id {id}")))
}

/// Present counts LATE; absent counts EXCUSED.
pub(crate) fn count_present_absent<I>(statuses: I) -> (usize, usize)
where
    I: IntoIterator<Item = AttendanceStatus>,
{
    statuses.into_iter().fold((0, 0), |(p, a), s| match s {
        AttendanceStatus::Present | AttendanceStatus::Late => (p + 1, a),
        AttendanceStatus::Absent | AttendanceStatus::Excused => (p, a + 1),
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/attendance/classes/{class_id}?date=YYYY-MM-DD
///
/// Stored attendance for a class on one day (today when `date` is omitted).
pub async fn class_attendance(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(class_id): Path<DbId>,
    Query(params): Query<DateParams>,
) -> AppResult<Json<DataResponse<ClassAttendanceResponse>>> {
    let date = match params.date.as_deref() {
        Some(d) => parse_attendance_date(d)?,
        None => Utc::now().date_naive(),
    };
    let class = class_in_school(&state, user.school_id, class_id).await?;

    let records = AttendanceRepo::list_by_class_and_date(&state.pool, class_id, date)
        .await?
        .into_iter()
        .map(ClassAttendanceEntry::from_row)
        .collect::<AppResult<Vec<_>>>()?;
    let (present, absent) = count_present_absent(records.iter().map(|r| r.status));

    Ok(Json(DataResponse {
        data: ClassAttendanceResponse {
            class_id,
            class_name: class.display_name(),
            date,
            present,
            absent,
            records,
        },
    }))
}

/// GET /api/v1/attendance/students/{student_id}?from=&to=
///
/// A student's history, newest first. Staff see any student of their
/// school; a parent sees students whose `parent_email` matches theirs.
pub async fn student_history(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
    Query(params): Query<DateRangeParams>,
) -> AppResult<Json<DataResponse<StudentHistoryResponse>>> {
    let student = student_in_school(&state, auth.school_id, student_id).await?;

    if !is_staff(&auth.role) {
        let allowed = auth.role == ROLE_PARENT && {
            let caller = UserRepo::find_by_id(&state.pool, auth.user_id).await?;
            match (caller, student.parent_email.as_deref()) {
                (Some(caller), Some(parent_email)) => caller.email.eq_ignore_ascii_case(parent_email),
                _ => false,
            }
        };
        if !allowed {
            return Err(AppError::Core(CoreError::Forbidden(
                "Not allowed to view this student's attendance".into(),
            )));
        }
    }

    let to = match params.to.as_deref() {
        Some(d) => parse_attendance_date(d)?,
        None => Utc::now().date_naive(),
    };
    let from = match params.from.as_deref() {
        Some(d) => parse_attendance_date(d)?,
        None => to - chrono::Duration::days(DEFAULT_HISTORY_DAYS),
    };
    if from > to {
        return Err(AppError::Core(CoreError::Validation(
            "'from' must not be after 'to'".into(),
        )));
    }
    if (to - from).num_days() > MAX_HISTORY_DAYS {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Date range must not exceed {MAX_HISTORY_DAYS} days"
        ))));
    }

    let records = AttendanceRepo::list_by_student(&state.pool, student_id, from, to)
        .await?
        .into_iter()
        .map(AttendanceRecord::from_row)
        .collect::<AppResult<Vec<_>>>()?;
    let (present, absent) = count_present_absent(records.iter().map(|r| r.status));

    Ok(Json(DataResponse {
        data: StudentHistoryResponse {
            student_id,
            name: student.full_name(),
            from,
            to,
            present,
            absent,
            records,
        },
    }))
}
