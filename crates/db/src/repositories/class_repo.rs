//! Repository for the `classes` table.

use sqlx::PgPool;
use schoolhub_core::types::DbId;

use crate::models::class::{Class, CreateClass};

const COLUMNS: &str = "id, school_id, name, section, teacher_id, created_at, updated_at";

/// Provides CRUD operations for classes.
pub struct ClassRepo;

impl ClassRepo {
    /// Insert a new class, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateClass) -> Result<Class, sqlx::Error> {
        let query = format!(
            "INSERT INTO classes (school_id, name, section, teacher_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Class>(&query)
            .bind(input.school_id)
            .bind(&input.name)
            .bind(&input.section)
            .bind(input.teacher_id)
            .fetch_one(pool)
            .await
    }

    /// Find a class by id, scoped to a school.
    ///
    /// A class belonging to another school is reported as absent.
    pub async fn find_in_school(
        pool: &PgPool,
        school_id: DbId,
        id: DbId,
    ) -> Result<Option<Class>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM classes WHERE id = $1 AND school_id = $2");
        sqlx::query_as::<_, Class>(&query)
            .bind(id)
            .bind(school_id)
            .fetch_optional(pool)
            .await
    }
}
