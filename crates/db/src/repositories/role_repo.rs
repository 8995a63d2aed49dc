//! Repository for the `roles` lookup table.

use sqlx::PgPool;

use crate::models::status::StatusId;

/// Resolves role ids to names and back.
pub struct RoleRepo;

impl RoleRepo {
    /// Resolve a role id to its name. Fails with `RowNotFound` for unknown ids.
    pub async fn resolve_name(pool: &PgPool, role_id: StatusId) -> Result<String, sqlx::Error> {
        sqlx::query_scalar("SELECT name FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_one(pool)
            .await
    }

    /// Look up a role id by name.
    pub async fn find_id_by_name(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<StatusId>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await
    }
}
