//! Event-to-notification routing for confirmed attendance.
//!
//! For each `attendance.confirmed` event the router:
//!
//! 1. writes a class summary notice to the class teacher and every active
//!    principal of the school;
//! 2. writes a per-student notice to the parent account whose email matches
//!    the student's `parent_email`;
//! 3. emails each student's `parent_email` when SMTP is configured.
//!
//! Delivery is best effort. Failures are logged per recipient and never
//! affect the stored attendance.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use schoolhub_core::attendance::AttendanceStatus;
use schoolhub_core::roles::{ROLE_PARENT, ROLE_PRINCIPAL};
use schoolhub_core::types::{Date, DbId};
use schoolhub_db::models::notification::CreateNotification;
use schoolhub_db::models::student::Student;
use schoolhub_db::repositories::{NotificationRepo, StudentRepo, UserRepo};
use schoolhub_db::DbPool;
use schoolhub_events::bus::EVENT_ATTENDANCE_CONFIRMED;
use schoolhub_events::{EmailDelivery, PlatformEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Notice kind for the per-class summary sent to staff.
pub const KIND_CLASS_SUMMARY: &str = "attendance.class_summary";

/// Notice kind for the per-student notice sent to parents.
pub const KIND_STUDENT_STATUS: &str = "attendance.student_status";

/// Payload of an `attendance.confirmed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceConfirmed {
    pub class_id: DbId,
    pub class_name: String,
    pub class_teacher_id: Option<DbId>,
    pub date: Date,
    pub present: usize,
    pub absent: usize,
    pub statuses: Vec<StudentStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentStatus {
    pub student_id: DbId,
    pub status: AttendanceStatus,
}

type RouteError = Box<dyn std::error::Error + Send + Sync>;

/// Routes attendance events to staff and parents.
pub struct AttendanceNotificationRouter {
    pool: DbPool,
    email: Option<Arc<EmailDelivery>>,
}

impl AttendanceNotificationRouter {
    /// `email` is `None` when SMTP is not configured.
    pub fn new(pool: DbPool, email: Option<Arc<EmailDelivery>>) -> Self {
        Self { pool, email }
    }

    /// Run until the event bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Route one event. Events other than `attendance.confirmed` are ignored.
    ///
    /// Staff and parent fan-outs run independently; a failure in one is
    /// logged and returned after the other has run.
    pub async fn route_event(&self, event: &PlatformEvent) -> Result<(), RouteError> {
        if event.event_type != EVENT_ATTENDANCE_CONFIRMED {
            return Ok(());
        }
        let school_id = event
            .school_id
            .ok_or("attendance.confirmed event without school scope")?;
        let payload: AttendanceConfirmed = serde_json::from_value(event.payload.clone())?;

        let staff = self.notify_staff(school_id, &payload).await;
        if let Err(e) = &staff {
            tracing::error!(error = %e, class_id = payload.class_id, "Class summary fan-out failed");
        }
        let parents = self.notify_parents(school_id, &payload).await;
        if let Err(e) = &parents {
            tracing::error!(error = %e, class_id = payload.class_id, "Parent fan-out failed");
        }
        staff.and(parents)
    }

    async fn notify_staff(
        &self,
        school_id: DbId,
        payload: &AttendanceConfirmed,
    ) -> Result<(), RouteError> {
        let mut recipients: BTreeSet<DbId> = UserRepo::list_active_by_role(&self.pool, school_id, ROLE_PRINCIPAL)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        if let Some(teacher_id) = payload.class_teacher_id {
            if UserRepo::find_recipient(&self.pool, teacher_id).await?.is_some() {
                recipients.insert(teacher_id);
            }
        }

        let (title, body) = class_summary_text(payload);
        let data = serde_json::json!({
            "class_id": payload.class_id,
            "date": payload.date,
            "present": payload.present,
            "absent": payload.absent,
        });

        for user_id in recipients {
            let input = CreateNotification {
                user_id,
                kind: KIND_CLASS_SUMMARY.to_string(),
                title: title.clone(),
                body: body.clone(),
                payload: data.clone(),
            };
            if let Err(e) = NotificationRepo::create(&self.pool, &input).await {
                tracing::error!(error = %e, user_id, "Failed to write class summary notice");
            }
        }
        Ok(())
    }

    async fn notify_parents(
        &self,
        school_id: DbId,
        payload: &AttendanceConfirmed,
    ) -> Result<(), RouteError> {
        let students: HashMap<DbId, Student> = StudentRepo::list_active_by_class(&self.pool, payload.class_id)
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        for entry in &payload.statuses {
            let Some(student) = students.get(&entry.student_id) else {
                continue;
            };
            let Some(parent_email) = student.parent_email.as_deref().filter(|e| !e.is_empty()) else {
                continue;
            };
            let (title, body) = student_status_text(student, entry.status, payload);

            match UserRepo::find_active_by_email(&self.pool, school_id, ROLE_PARENT, parent_email).await {
                Ok(Some(parent)) => {
                    let input = CreateNotification {
                        user_id: parent.id,
                        kind: KIND_STUDENT_STATUS.to_string(),
                        title: title.clone(),
                        body: body.clone(),
                        payload: serde_json::json!({
                            "student_id": student.id,
                            "date": payload.date,
                            "status": entry.status,
                        }),
                    };
                    if let Err(e) = NotificationRepo::create(&self.pool, &input).await {
                        tracing::error!(error = %e, student_id = student.id, "Failed to write parent notice");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, student_id = student.id, "Failed to look up parent account");
                }
            }

            if let Some(email) = &self.email {
                if let Err(e) = email.send(parent_email, &title, &body).await {
                    tracing::error!(error = %e, student_id = student.id, "Failed to email parent");
                }
            }
        }
        Ok(())
    }
}

fn class_summary_text(payload: &AttendanceConfirmed) -> (String, String) {
    (
        format!("Attendance recorded for {}", payload.class_name),
        format!(
            "Attendance for {} on {}: {} present, {} absent.",
            payload.class_name, payload.date, payload.present, payload.absent
        ),
    )
}

fn student_status_text(
    student: &Student,
    status: AttendanceStatus,
    payload: &AttendanceConfirmed,
) -> (String, String) {
    let name = student.full_name();
    let status = status.as_str().to_lowercase();
    (
        format!("Attendance for {name} on {}", payload.date),
        format!(
            "{name} (roll no. {}) was marked {status} in {} on {}.",
            student.roll_number, payload.class_name, payload.date
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> AttendanceConfirmed {
        AttendanceConfirmed {
            class_id: 4,
            class_name: "Grade 5 - A".into(),
            class_teacher_id: Some(2),
            date: Date::from_ymd_opt(2026, 1, 14).unwrap(),
            present: 1,
            absent: 2,
            statuses: vec![StudentStatus {
                student_id: 10,
                status: AttendanceStatus::Present,
            }],
        }
    }

    #[test]
    fn payload_survives_the_event_bus() {
        let value = serde_json::to_value(payload()).unwrap();
        assert_eq!(value["date"], "2026-01-14");
        assert_eq!(value["statuses"][0]["status"], "PRESENT");

        let back: AttendanceConfirmed = serde_json::from_value(value).unwrap();
        assert_eq!(back.statuses[0].student_id, 10);
    }

    #[test]
    fn summary_text_has_counts() {
        let (title, body) = class_summary_text(&payload());
        assert_eq!(title, "Attendance recorded for Grade 5 - A");
        assert_eq!(
            body,
            "Attendance for Grade 5 - A on 2026-01-14: 1 present, 2 absent."
        );
    }
}
