//! Repository for the `users` table.

use sqlx::PgPool;
use schoolhub_core::types::{DbId, Timestamp};

use crate::models::user::{CreateUser, Recipient, User};

const COLUMNS: &str = "id, school_id, username, email, full_name, password_hash, role_id, \
                       is_active, last_login_at, failed_login_count, locked_until, \
                       created_at, updated_at";

/// Provides user lookups, login bookkeeping, and recipient queries.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (school_id, username, email, full_name, password_hash, role_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(input.school_id)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.full_name)
            .bind(&input.password_hash)
            .bind(input.role_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    pub async fn increment_failed_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET failed_login_count = failed_login_count + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn lock_account(
        pool: &PgPool,
        id: DbId,
        until: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET locked_until = $2 WHERE id = $1")
            .bind(id)
            .bind(until)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Reset the failure counter and lock, and stamp `last_login_at`.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET failed_login_count = 0, locked_until = NULL, last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Active users of a school holding the given role.
    pub async fn list_active_by_role(
        pool: &PgPool,
        school_id: DbId,
        role_name: &str,
    ) -> Result<Vec<Recipient>, sqlx::Error> {
        sqlx::query_as::<_, Recipient>(
            "SELECT u.id, u.email, u.full_name FROM users u
             JOIN roles r ON u.role_id = r.id
             WHERE u.school_id = $1 AND r.name = $2 AND u.is_active = true
             ORDER BY u.id",
        )
        .bind(school_id)
        .bind(role_name)
        .fetch_all(pool)
        .await
    }

    /// Active user of a school with the given role and email (case-insensitive).
    pub async fn find_active_by_email(
        pool: &PgPool,
        school_id: DbId,
        role_name: &str,
        email: &str,
    ) -> Result<Option<Recipient>, sqlx::Error> {
        sqlx::query_as::<_, Recipient>(
            "SELECT u.id, u.email, u.full_name FROM users u
             JOIN roles r ON u.role_id = r.id
             WHERE u.school_id = $1 AND r.name = $2 AND lower(u.email) = lower($3)
               AND u.is_active = true
             ORDER BY u.id
             LIMIT 1",
        )
        .bind(school_id)
        .bind(role_name)
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Recipient info for one active user.
    pub async fn find_recipient(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Recipient>, sqlx::Error> {
        sqlx::query_as::<_, Recipient>(
            "SELECT id, email, full_name FROM users WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
