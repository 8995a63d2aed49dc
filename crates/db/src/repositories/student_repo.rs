//! Repository for the `students` table.
//!
//! `face_encoding` is an encrypted BYTEA blob. It is excluded from
//! [`COLUMNS`]; readers get a computed `has_face_encoding` flag instead, and
//! only [`StudentRepo::list_face_records`] returns the blob itself.

use sqlx::PgPool;
use schoolhub_core::types::DbId;

use crate::models::student::{CreateStudent, Student, StudentFaceRecord};

/// Column list shared across queries (excludes the `face_encoding` blob).
const COLUMNS: &str = "id, school_id, class_id, roll_number, first_name, last_name, \
                       parent_email, is_active, (face_encoding IS NOT NULL) AS has_face_encoding, \
                       reference_photo_path, face_registered_at, created_at, updated_at";

/// Provides student lookups and face-encoding storage.
pub struct StudentRepo;

impl StudentRepo {
    /// Insert a new student, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateStudent) -> Result<Student, sqlx::Error> {
        let query = format!(
            "INSERT INTO students (school_id, class_id, roll_number, first_name, last_name, parent_email)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(input.school_id)
            .bind(input.class_id)
            .bind(&input.roll_number)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.parent_email)
            .fetch_one(pool)
            .await
    }

    /// Find a student by id, scoped to a school.
    pub async fn find_in_school(
        pool: &PgPool,
        school_id: DbId,
        id: DbId,
    ) -> Result<Option<Student>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM students WHERE id = $1 AND school_id = $2");
        sqlx::query_as::<_, Student>(&query)
            .bind(id)
            .bind(school_id)
            .fetch_optional(pool)
            .await
    }

    /// List the active students of a class, ordered by roll number.
    pub async fn list_active_by_class(
        pool: &PgPool,
        class_id: DbId,
    ) -> Result<Vec<Student>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM students
             WHERE class_id = $1 AND is_active = true
             ORDER BY roll_number ASC, id ASC"
        );
        sqlx::query_as::<_, Student>(&query)
            .bind(class_id)
            .fetch_all(pool)
            .await
    }

    /// List the active students of a class with their encrypted encodings,
    /// ordered by roll number. Students without an encoding are included
    /// with `face_encoding = None`.
    pub async fn list_face_records(
        pool: &PgPool,
        class_id: DbId,
    ) -> Result<Vec<StudentFaceRecord>, sqlx::Error> {
        sqlx::query_as::<_, StudentFaceRecord>(
            "SELECT id, roll_number, first_name, last_name, face_encoding FROM students
             WHERE class_id = $1 AND is_active = true
             ORDER BY roll_number ASC, id ASC",
        )
        .bind(class_id)
        .fetch_all(pool)
        .await
    }

    /// Return the subset of `ids` that are active students of `class_id`.
    pub async fn find_active_member_ids(
        pool: &PgPool,
        class_id: DbId,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM students
             WHERE class_id = $1 AND is_active = true AND id = ANY($2)
             ORDER BY id",
        )
        .bind(class_id)
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Store (or overwrite) a student's encrypted encoding and reference photo
    /// path. Returns `true` if the row was updated.
    pub async fn set_face_encoding(
        pool: &PgPool,
        id: DbId,
        encrypted: &[u8],
        photo_path: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE students SET
                face_encoding = $2,
                reference_photo_path = $3,
                face_registered_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(encrypted)
        .bind(photo_path)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a student's encoding and reference photo path. Returns `true`
    /// if the student had an encoding.
    pub async fn clear_face_encoding(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE students SET
                face_encoding = NULL,
                reference_photo_path = NULL,
                face_registered_at = NULL
             WHERE id = $1 AND face_encoding IS NOT NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Return the raw encrypted encoding of a student, if stored.
    pub async fn find_face_encoding(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Vec<u8>>, sqlx::Error> {
        let row: Option<Option<Vec<u8>>> =
            sqlx::query_scalar("SELECT face_encoding FROM students WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(row.flatten())
    }
}
