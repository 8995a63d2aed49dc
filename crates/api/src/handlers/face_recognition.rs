//! Handlers for the `/face-recognition` resource.
//!
//! Reference-photo enrolment, group-photo matching (a preview, nothing is
//! stored), and confirmation of the reviewed attendance. Also exposes the
//! face service's detect/compare endpoints and per-class enrolment status.
//!
//! All endpoints require a staff role and are scoped to the caller's school.

use std::collections::HashMap;
use std::time::Instant;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use futures::future::try_join_all;
use schoolhub_core::attendance::{
    merge_recognitions, parse_attendance_date, reconcile_roster, summarize, validate_confirm_entries,
    AttendanceMethod, AttendancePreview, AttendanceStatus, ConfirmEntry, PreviewSummary,
    Recognition, RosterEntry,
};
use schoolhub_core::encoding::{DEFAULT_MATCH_THRESHOLD, MAX_GROUP_PHOTOS};
use schoolhub_core::error::CoreError;
use schoolhub_core::types::{Date, DbId, Timestamp};
use schoolhub_db::models::attendance::UpsertAttendance;
use schoolhub_db::models::student::Student;
use schoolhub_db::repositories::{AttendanceRepo, StudentRepo};
use schoolhub_events::bus::EVENT_ATTENDANCE_CONFIRMED;
use schoolhub_events::PlatformEvent;
use schoolhub_facematch::{CompareResult, DetectedFace, KnownFace};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::attendance::{count_present_absent, AttendanceRecord};
use crate::handlers::{class_in_school, student_in_school};
use crate::middleware::rbac::RequireStaff;
use crate::notifications::{AttendanceConfirmed, StudentStatus};
use crate::response::DataResponse;
use crate::state::AppState;
use crate::uploads::{read_image_field, read_text_field, remove_stored_file, UploadedImage};

/// Longest accepted `session` label.
const MAX_SESSION_LEN: usize = 50;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceResponse {
    pub class_id: DbId,
    pub class_name: String,
    pub date: Date,
    /// Echoed from the request; not stored.
    pub session: Option<String>,
    pub photos_processed: usize,
    pub summary: PreviewSummary,
    pub faces_detected: u32,
    pub unrecognized_faces: u32,
    pub processing_time_ms: f64,
    pub students: Vec<AttendancePreview>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAttendanceRequest {
    pub class_id: DbId,
    pub date: String,
    pub attendance: Vec<ConfirmAttendanceItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAttendanceItem {
    pub student_id: DbId,
    pub status: String,
    pub confidence: Option<f64>,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAttendanceResponse {
    pub class_id: DbId,
    pub date: Date,
    pub saved: usize,
    pub present: usize,
    pub absent: usize,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceStatusEntry {
    pub student_id: DbId,
    pub roll_number: String,
    pub name: String,
    pub has_encoding: bool,
    pub face_registered_at: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassFaceStatus {
    pub class_id: DbId,
    pub class_name: String,
    pub total: usize,
    pub registered: usize,
    pub students: Vec<FaceStatusEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub face_count: usize,
    pub faces: Vec<DetectedFace>,
}

// ---------------------------------------------------------------------------
// Reference photo
// ---------------------------------------------------------------------------

/// POST /api/v1/face-recognition/upload-reference
///
/// Multipart `photo` + `studentId`. Encodes the single face in the photo,
/// stores the encrypted encoding, and keeps the photo. A rejected photo
/// leaves the stored encoding unchanged.
pub async fn upload_reference(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<Student>>> {
    let mut photo: Option<UploadedImage> = None;
    let mut student_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "photo" => photo = Some(read_image_field(field, state.config.max_upload_bytes).await?),
            "studentId" => student_id = Some(read_text_field(field).await?),
            _ => {}
        }
    }

    let student_id = parse_id_field("studentId", student_id)?;
    let photo = photo.ok_or_else(|| {
        AppError::Core(CoreError::Validation("Missing required 'photo' field".into()))
    })?;

    let student = student_in_school(&state, user.school_id, student_id).await?;

    let staged = photo.stage(&state.config.temp_upload_dir()).await?;
    let encoding = state.face_client.encode(photo.to_part()).await?;
    let sealed = state.cipher.encrypt(&encoding)?;

    let file_name = format!(
        "student_{student_id}_{}.{}",
        Utc::now().timestamp_millis(),
        photo.kind.extension()
    );
    let stored_path = staged
        .persist(&state.config.reference_photo_dir(), &file_name)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to store reference photo: {e}")))?;
    let stored_path = stored_path.to_string_lossy().to_string();

    if let Err(e) = StudentRepo::set_face_encoding(&state.pool, student_id, &sealed, &stored_path).await {
        remove_stored_file(&stored_path).await;
        return Err(e.into());
    }
    if let Some(previous) = student.reference_photo_path.as_deref() {
        if previous != stored_path {
            remove_stored_file(previous).await;
        }
    }

    tracing::info!(
        student_id,
        school_id = user.school_id,
        user_id = user.user_id,
        "Registered face encoding",
    );

    let updated = student_in_school(&state, user.school_id, student_id).await?;
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Group photo matching
// ---------------------------------------------------------------------------

/// POST /api/v1/face-recognition/mark-attendance
///
/// Multipart `photos` (1 to 5, `photo` also accepted) + `classId` + `date` +
/// optional `session`. Returns a per-student preview covering every active
/// student of the class; nothing is written.
pub async fn mark_attendance(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<MarkAttendanceResponse>>> {
    let mut photos: Vec<UploadedImage> = Vec::new();
    let mut class_id: Option<String> = None;
    let mut date: Option<String> = None;
    let mut session: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "photos" | "photo" => {
                if photos.len() == MAX_GROUP_PHOTOS {
                    return Err(AppError::Core(CoreError::Validation(format!(
                        "At most {MAX_GROUP_PHOTOS} photos may be submitted"
                    ))));
                }
                photos.push(read_image_field(field, state.config.max_upload_bytes).await?);
            }
            "classId" => class_id = Some(read_text_field(field).await?),
            "date" => date = Some(read_text_field(field).await?),
            "session" => session = Some(read_text_field(field).await?).filter(|s| !s.is_empty()),
            _ => {}
        }
    }

    let class_id = parse_id_field("classId", class_id)?;
    let date = match date.as_deref() {
        Some(d) if !d.is_empty() => parse_attendance_date(d)?,
        _ => {
            return Err(AppError::Core(CoreError::Validation(
                "Missing required 'date' field".into(),
            )))
        }
    };
    if photos.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "At least one photo is required".into(),
        )));
    }
    if session.as_ref().is_some_and(|s| s.chars().count() > MAX_SESSION_LEN) {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Session must be at most {MAX_SESSION_LEN} characters"
        ))));
    }

    let class = class_in_school(&state, user.school_id, class_id).await?;
    let records = StudentRepo::list_face_records(&state.pool, class_id).await?;

    let mut roster = Vec::with_capacity(records.len());
    let mut known = Vec::new();
    for record in &records {
        let name = record.full_name();
        if let Some(blob) = record.face_encoding.as_deref() {
            let encoding = state.cipher.decrypt(blob)?;
            known.push(KnownFace::new(record.id, record.roll_number.clone(), name.clone(), encoding));
        }
        roster.push(RosterEntry {
            student_id: record.id,
            roll_number: record.roll_number.clone(),
            name,
            has_encoding: record.face_encoding.is_some(),
        });
    }

    if known.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "No students in this class have registered face encodings".into(),
        )));
    }

    let started = Instant::now();
    // One request per photo, all in flight at once.
    let results = try_join_all(photos.iter().map(|photo| {
        state
            .face_client
            .recognize(photo.to_part(), &known, DEFAULT_MATCH_THRESHOLD)
    }))
    .await?;

    let mut batches: Vec<Vec<Recognition>> = Vec::with_capacity(results.len());
    let mut faces_detected = 0;
    let mut unrecognized_faces = 0;
    let mut service_time_ms = 0.0;
    for result in results {
        faces_detected += result.faces_detected;
        unrecognized_faces += result.unrecognized_count;
        service_time_ms += result.processing_time_ms;
        batches.push(result.matches);
    }

    let merged: HashMap<DbId, Recognition> = merge_recognitions(batches);
    let students = reconcile_roster(&roster, &merged);
    let summary = summarize(&students);

    tracing::info!(
        class_id,
        %date,
        photos = photos.len(),
        total = summary.total,
        present = summary.present,
        faces_detected,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Group photo matched",
    );

    Ok(Json(DataResponse {
        data: MarkAttendanceResponse {
            class_id,
            class_name: class.display_name(),
            date,
            session,
            photos_processed: photos.len(),
            summary,
            faces_detected,
            unrecognized_faces,
            processing_time_ms: service_time_ms,
            students,
        },
    }))
}

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

/// POST /api/v1/face-recognition/confirm-attendance
///
/// Upserts one row per `(student, date)` in a single transaction and
/// publishes `attendance.confirmed`. Re-confirming a day overwrites it.
pub async fn confirm_attendance(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<ConfirmAttendanceRequest>,
) -> AppResult<Json<DataResponse<ConfirmAttendanceResponse>>> {
    let date = parse_attendance_date(&input.date)?;

    let entries = input
        .attendance
        .into_iter()
        .map(|item| {
            Ok(ConfirmEntry {
                student_id: item.student_id,
                status: AttendanceStatus::parse(&item.status)?,
                confidence: item.confidence,
                remarks: item
                    .remarks
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty()),
            })
        })
        .collect::<Result<Vec<_>, CoreError>>()?;
    validate_confirm_entries(&entries)?;

    let class = class_in_school(&state, user.school_id, input.class_id).await?;

    let requested: Vec<DbId> = entries.iter().map(|e| e.student_id).collect();
    let members = StudentRepo::find_active_member_ids(&state.pool, class.id, &requested).await?;
    if let Some(missing) = requested.iter().find(|id| !members.contains(id)) {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Student",
            id: *missing,
        }));
    }

    let rows: Vec<UpsertAttendance> = entries
        .iter()
        .map(|e| UpsertAttendance {
            student_id: e.student_id,
            class_id: class.id,
            teacher_id: Some(user.user_id),
            date,
            status_id: e.status.id(),
            method_id: AttendanceMethod::for_confidence(e.confidence).id(),
            confidence: e.confidence,
            remarks: e.remarks.clone(),
        })
        .collect();

    let stored = AttendanceRepo::upsert_many(&state.pool, &rows).await?;
    let records = stored
        .into_iter()
        .map(AttendanceRecord::from_row)
        .collect::<AppResult<Vec<_>>>()?;
    let (present, absent) = count_present_absent(records.iter().map(|r| r.status));

    tracing::info!(
        class_id = class.id,
        %date,
        saved = records.len(),
        present,
        absent,
        teacher_id = user.user_id,
        "Attendance confirmed",
    );

    let payload = AttendanceConfirmed {
        class_id: class.id,
        class_name: class.display_name(),
        class_teacher_id: class.teacher_id,
        date,
        present,
        absent,
        statuses: entries
            .iter()
            .map(|e| StudentStatus {
                student_id: e.student_id,
                status: e.status,
            })
            .collect(),
    };
    match serde_json::to_value(&payload) {
        Ok(value) => state.event_bus.publish(
            PlatformEvent::new(EVENT_ATTENDANCE_CONFIRMED)
                .with_school(user.school_id)
                .with_source("class", class.id)
                .with_actor(user.user_id)
                .with_payload(value),
        ),
        Err(e) => tracing::error!(error = %e, "Failed to serialize attendance event"),
    }

    Ok(Json(DataResponse {
        data: ConfirmAttendanceResponse {
            class_id: class.id,
            date,
            saved: records.len(),
            present,
            absent,
            records,
        },
    }))
}

// ---------------------------------------------------------------------------
// Enrolment status
// ---------------------------------------------------------------------------

/// GET /api/v1/face-recognition/classes/{class_id}/status
pub async fn class_status(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(class_id): Path<DbId>,
) -> AppResult<Json<DataResponse<ClassFaceStatus>>> {
    let class = class_in_school(&state, user.school_id, class_id).await?;
    let students: Vec<FaceStatusEntry> = StudentRepo::list_active_by_class(&state.pool, class_id)
        .await?
        .into_iter()
        .map(|s| FaceStatusEntry {
            student_id: s.id,
            name: s.full_name(),
            roll_number: s.roll_number,
            has_encoding: s.has_face_encoding,
            face_registered_at: s.face_registered_at,
        })
        .collect();
    let registered = students.iter().filter(|s| s.has_encoding).count();

    Ok(Json(DataResponse {
        data: ClassFaceStatus {
            class_id,
            class_name: class.display_name(),
            total: students.len(),
            registered,
            students,
        },
    }))
}

/// DELETE /api/v1/face-recognition/students/{student_id}/encoding
///
/// 204 on success; 404 when the student has no stored encoding.
pub async fn clear_encoding(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let student = student_in_school(&state, user.school_id, student_id).await?;

    if !StudentRepo::clear_face_encoding(&state.pool, student_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Face encoding for student",
            id: student_id,
        }));
    }
    if let Some(path) = student.reference_photo_path.as_deref() {
        remove_stored_file(path).await;
    }

    tracing::info!(student_id, user_id = user.user_id, "Cleared face encoding");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Service passthroughs
// ---------------------------------------------------------------------------

/// POST /api/v1/face-recognition/detect
///
/// Multipart `photo`. Returns the face boxes found by the service.
pub async fn detect(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<DetectResponse>>> {
    let mut photo: Option<UploadedImage> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("photo") {
            photo = Some(read_image_field(field, state.config.max_upload_bytes).await?);
        }
    }
    let photo = photo.ok_or_else(|| {
        AppError::Core(CoreError::Validation("Missing required 'photo' field".into()))
    })?;

    let faces = state.face_client.detect(photo.to_part()).await?;

    Ok(Json(DataResponse {
        data: DetectResponse {
            face_count: faces.len(),
            faces,
        },
    }))
}

/// POST /api/v1/face-recognition/compare
///
/// Multipart `photo1` and `photo2`.
pub async fn compare(
    RequireStaff(_user): RequireStaff,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<CompareResult>>> {
    let mut first: Option<UploadedImage> = None;
    let mut second: Option<UploadedImage> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "photo1" => first = Some(read_image_field(field, state.config.max_upload_bytes).await?),
            "photo2" => second = Some(read_image_field(field, state.config.max_upload_bytes).await?),
            _ => {}
        }
    }
    let (Some(first), Some(second)) = (first, second) else {
        return Err(AppError::Core(CoreError::Validation(
            "Both 'photo1' and 'photo2' are required".into(),
        )));
    };

    let result = state
        .face_client
        .compare(first.to_part(), second.to_part())
        .await?;

    Ok(Json(DataResponse { data: result }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a required numeric id from a multipart text field.
fn parse_id_field(name: &str, value: Option<String>) -> AppResult<DbId> {
    let value = value.filter(|v| !v.is_empty()).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!("Missing required '{name}' field")))
    })?;
    value.parse::<DbId>().map_err(|_| {
        AppError::Core(CoreError::Validation(format!(
            "'{name}' must be a numeric id, got '{value}'"
        )))
    })
}
