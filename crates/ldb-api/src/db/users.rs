//! User lookups. Accounts are owned by the wider license database.

use sqlx::postgres::PgExecutor;

/// Resolve a username to its id.
pub async fn find_id<'e>(db: impl PgExecutor<'e>, username: &str) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(db)
        .await
}

/// Make sure `username` exists, returning its id.
///
/// Used at startup to register the development user when auth is disabled.
pub async fn ensure<'e>(db: impl PgExecutor<'e>, username: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "INSERT INTO users (username) VALUES ($1)
         ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
         RETURNING id",
    )
    .bind(username)
    .fetch_one(db)
    .await
}
