//! Attendance statuses, methods, and roster reconciliation.
//!
//! `reconcile_roster` turns the matching service's recognized list into a
//! preview covering the whole class: every active student gets exactly one
//! entry with an explicit status, and absent students carry the reason they
//! were not marked present.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::encoding::FaceLocation;
use crate::error::CoreError;
use crate::types::{Date, DbId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of entries accepted by a single confirmation.
pub const MAX_CONFIRM_ENTRIES: usize = 500;

/// Maximum length of a per-student remark.
pub const MAX_REMARKS_LEN: usize = 500;

// ---------------------------------------------------------------------------
// AttendanceStatus
// ---------------------------------------------------------------------------

/// Attendance status of one student on one day.
///
/// Discriminant values match the seeded rows in `attendance_statuses`.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present = 1,
    Absent = 2,
    Late = 3,
    Excused = 4,
}

impl AttendanceStatus {
    /// Resolve a database status ID to the corresponding enum variant.
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Self::Present),
            2 => Some(Self::Absent),
            3 => Some(Self::Late),
            4 => Some(Self::Excused),
            _ => None,
        }
    }

    /// Return the database status ID.
    pub fn id(self) -> i16 {
        self as i16
    }

    /// Wire name, matching the `name` column in `attendance_statuses`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "PRESENT",
            Self::Absent => "ABSENT",
            Self::Late => "LATE",
            Self::Excused => "EXCUSED",
        }
    }

    /// Parse a wire name (case-insensitive).
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PRESENT" => Ok(Self::Present),
            "ABSENT" => Ok(Self::Absent),
            "LATE" => Ok(Self::Late),
            "EXCUSED" => Ok(Self::Excused),
            other => Err(CoreError::Validation(format!(
                "Invalid attendance status '{other}'. Must be one of: PRESENT, ABSENT, LATE, EXCUSED"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// AttendanceMethod
// ---------------------------------------------------------------------------

/// How an attendance row was taken.
///
/// Discriminant values match the seeded rows in `attendance_methods`.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceMethod {
    Manual = 1,
    FaceRecognition = 2,
}

impl AttendanceMethod {
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(Self::Manual),
            2 => Some(Self::FaceRecognition),
            _ => None,
        }
    }

    pub fn id(self) -> i16 {
        self as i16
    }

    /// A confirmed entry that still carries a match confidence came from the
    /// face-recognition preview; anything else was set by hand.
    pub fn for_confidence(confidence: Option<f64>) -> Self {
        if confidence.is_some() {
            Self::FaceRecognition
        } else {
            Self::Manual
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

/// Why a student was marked absent in a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbsenceReason {
    /// Has a stored encoding but was not matched in any submitted photo.
    NotDetected,
    /// Never had a reference encoding stored.
    NoEncoding,
}

impl AbsenceReason {
    /// Human-readable explanation shown to the reviewing teacher.
    pub fn message(self) -> &'static str {
        match self {
            Self::NotDetected => "not detected in photo",
            Self::NoEncoding => "no face encoding registered",
        }
    }
}

/// One active student of the class, as loaded for reconciliation.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub student_id: DbId,
    pub roll_number: String,
    pub name: String,
    pub has_encoding: bool,
}

/// A student the matching service reported in a photo.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub student_id: DbId,
    pub confidence: f64,
    pub location: Option<FaceLocation>,
}

/// Per-student line of a mark-attendance preview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePreview {
    pub student_id: DbId,
    pub roll_number: String,
    pub name: String,
    pub status: AttendanceStatus,
    pub confidence: Option<f64>,
    pub reason_code: Option<AbsenceReason>,
    pub reason: Option<&'static str>,
    pub location: Option<FaceLocation>,
}

/// Counts over a preview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub no_encoding: usize,
}

/// Merge recognized lists from several photos of the same class.
///
/// A student seen in more than one photo keeps the highest-confidence
/// sighting.
pub fn merge_recognitions<I>(batches: I) -> HashMap<DbId, Recognition>
where
    I: IntoIterator<Item = Vec<Recognition>>,
{
    let mut merged: HashMap<DbId, Recognition> = HashMap::new();
    for batch in batches {
        for rec in batch {
            match merged.get(&rec.student_id) {
                Some(existing) if existing.confidence >= rec.confidence => {}
                _ => {
                    merged.insert(rec.student_id, rec);
                }
            }
        }
    }
    merged
}

/// Build the preview for every student on `roster`, in roster order.
///
/// Recognized ids that are not on the roster are ignored. A student without
/// an encoding is absent even if the recognized list mentions them.
pub fn reconcile_roster(
    roster: &[RosterEntry],
    recognized: &HashMap<DbId, Recognition>,
) -> Vec<AttendancePreview> {
    roster
        .iter()
        .map(|entry| {
            let hit = recognized.get(&entry.student_id);
            let (status, reason, confidence, location) = match (entry.has_encoding, hit) {
                (false, _) => (
                    AttendanceStatus::Absent,
                    Some(AbsenceReason::NoEncoding),
                    None,
                    None,
                ),
                (true, Some(rec)) => (
                    AttendanceStatus::Present,
                    None,
                    Some(rec.confidence),
                    rec.location.clone(),
                ),
                (true, None) => (
                    AttendanceStatus::Absent,
                    Some(AbsenceReason::NotDetected),
                    None,
                    None,
                ),
            };
            AttendancePreview {
                student_id: entry.student_id,
                roll_number: entry.roll_number.clone(),
                name: entry.name.clone(),
                status,
                confidence,
                reason_code: reason,
                reason: reason.map(AbsenceReason::message),
                location,
            }
        })
        .collect()
}

/// Count present/absent/no-encoding entries in a preview.
pub fn summarize(preview: &[AttendancePreview]) -> PreviewSummary {
    preview.iter().fold(
        PreviewSummary {
            total: preview.len(),
            ..PreviewSummary::default()
        },
        |mut acc, p| {
            match p.status {
                AttendanceStatus::Present | AttendanceStatus::Late => acc.present += 1,
                AttendanceStatus::Absent | AttendanceStatus::Excused => acc.absent += 1,
            }
            if p.reason_code == Some(AbsenceReason::NoEncoding) {
                acc.no_encoding += 1;
            }
            acc
        },
    )
}

// ---------------------------------------------------------------------------
// Confirmation input
// ---------------------------------------------------------------------------

/// One validated line of a confirm-attendance request.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmEntry {
    pub student_id: DbId,
    pub status: AttendanceStatus,
    pub confidence: Option<f64>,
    pub remarks: Option<String>,
}

/// Validate a confirmation batch: non-empty, bounded, no duplicate students,
/// confidences within `[0.0, 1.0]`, remarks within length.
pub fn validate_confirm_entries(entries: &[ConfirmEntry]) -> Result<(), CoreError> {
    if entries.is_empty() {
        return Err(CoreError::Validation(
            "Attendance list must not be empty".into(),
        ));
    }
    if entries.len() > MAX_CONFIRM_ENTRIES {
        return Err(CoreError::Validation(format!(
            "Attendance list exceeds {MAX_CONFIRM_ENTRIES} entries"
        )));
    }

    let mut seen = std::collections::HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.student_id) {
            return Err(CoreError::Validation(format!(
                "Student {} appears more than once",
                entry.student_id
            )));
        }
        if let Some(confidence) = entry.confidence {
            if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
                return Err(CoreError::Validation(format!(
                    "Confidence for student {} must be between 0.0 and 1.0",
                    entry.student_id
                )));
            }
        }
        if let Some(remarks) = &entry.remarks {
            if remarks.chars().count() > MAX_REMARKS_LEN {
                return Err(CoreError::Validation(format!(
                    "Remarks for student {} exceed {MAX_REMARKS_LEN} characters",
                    entry.student_id
                )));
            }
        }
    }
    Ok(())
}

/// Parse an attendance date in `YYYY-MM-DD` form.
pub fn parse_attendance_date(value: &str) -> Result<Date, CoreError> {
    Date::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        CoreError::Validation(format!(
            "Invalid date '{value}'. Expected format: YYYY-MM-DD"
        ))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
