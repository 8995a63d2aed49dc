//! Repository for the `attendance` table.
//!
//! Rows are unique per `(student_id, date)` (`uq_attendance_student_date`).
//! Writes are upserts: re-confirming a day replaces the earlier row, and
//! concurrent confirmations resolve as last write wins.

use sqlx::{PgExecutor, PgPool};
use schoolhub_core::types::{Date, DbId};

use crate::models::attendance::{Attendance, ClassAttendanceRow, UpsertAttendance};

const COLUMNS: &str = "id, student_id, class_id, teacher_id, date, status_id, method_id, \
                       confidence, remarks, created_at, updated_at";

/// Provides attendance upserts and history queries.
pub struct AttendanceRepo;

impl AttendanceRepo {
    /// Insert or replace the row for `(input.student_id, input.date)`.
    pub async fn upsert(pool: &PgPool, input: &UpsertAttendance) -> Result<Attendance, sqlx::Error> {
        Self::upsert_with(pool, input).await
    }

    /// Upsert a batch of rows in one transaction, returning them in input order.
    pub async fn upsert_many(
        pool: &PgPool,
        inputs: &[UpsertAttendance],
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let mut rows = Vec::with_capacity(inputs.len());
        for input in inputs {
            rows.push(Self::upsert_with(&mut *tx, input).await?);
        }
        tx.commit().await?;
        Ok(rows)
    }

    async fn upsert_with<'e, E>(executor: E, input: &UpsertAttendance) -> Result<Attendance, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO attendance \
                (student_id, class_id, teacher_id, date, status_id, method_id, confidence, remarks) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT ON CONSTRAINT uq_attendance_student_date DO UPDATE SET \
                class_id = EXCLUDED.class_id, \
                teacher_id = EXCLUDED.teacher_id, \
                status_id = EXCLUDED.status_id, \
                method_id = EXCLUDED.method_id, \
                confidence = EXCLUDED.confidence, \
                remarks = EXCLUDED.remarks, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(input.student_id)
            .bind(input.class_id)
            .bind(input.teacher_id)
            .bind(input.date)
            .bind(input.status_id)
            .bind(input.method_id)
            .bind(input.confidence)
            .bind(&input.remarks)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_student_and_date(
        pool: &PgPool,
        student_id: DbId,
        date: Date,
    ) -> Result<Option<Attendance>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM attendance WHERE student_id = $1 AND date = $2");
        sqlx::query_as::<_, Attendance>(&query)
            .bind(student_id)
            .bind(date)
            .fetch_optional(pool)
            .await
    }

    /// All rows recorded for a class on a date, ordered by roll number.
    pub async fn list_by_class_and_date(
        pool: &PgPool,
        class_id: DbId,
        date: Date,
    ) -> Result<Vec<ClassAttendanceRow>, sqlx::Error> {
        sqlx::query_as::<_, ClassAttendanceRow>(
            "SELECT a.id, a.student_id, s.roll_number, s.first_name, s.last_name, a.date,
                    a.status_id, a.method_id, a.confidence, a.remarks, a.teacher_id, a.updated_at
             FROM attendance a
             JOIN students s ON s.id = a.student_id
             WHERE a.class_id = $1 AND a.date = $2
             ORDER BY s.roll_number ASC, s.id ASC",
        )
        .bind(class_id)
        .bind(date)
        .fetch_all(pool)
        .await
    }

    /// A student's rows within `[from, to]`, newest first.
    pub async fn list_by_student(
        pool: &PgPool,
        student_id: DbId,
        from: Date,
        to: Date,
    ) -> Result<Vec<Attendance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attendance
             WHERE student_id = $1 AND date BETWEEN $2 AND $3
             ORDER BY date DESC"
        );
        sqlx::query_as::<_, Attendance>(&query)
            .bind(student_id)
            .bind(from)
            .bind(to)
            .fetch_all(pool)
            .await
    }
}
