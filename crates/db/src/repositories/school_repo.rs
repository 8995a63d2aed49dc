//! Repository for the `schools` table.

use sqlx::PgPool;
use schoolhub_core::types::DbId;

use crate::models::school::{CreateSchool, School};

const COLUMNS: &str = "id, name, created_at, updated_at";

/// Provides CRUD operations for schools.
pub struct SchoolRepo;

impl SchoolRepo {
    /// Insert a new school, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateSchool) -> Result<School, sqlx::Error> {
        let query = format!("INSERT INTO schools (name) VALUES ($1) RETURNING {COLUMNS}");
        sqlx::query_as::<_, School>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<School>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM schools WHERE id = $1");
        sqlx::query_as::<_, School>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
