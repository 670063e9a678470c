//! Obligation to license links.

use sqlx::postgres::PgExecutor;

/// Link an obligation to the license with `shortname`.
///
/// Returns false when no such license exists.
pub async fn link<'e>(
    db: impl PgExecutor<'e>,
    obligation_id: i64,
    shortname: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO obligation_licenses (obligation_id, license_id)
         SELECT $1, id FROM licenses WHERE shortname = $2
         ON CONFLICT DO NOTHING",
    )
    .bind(obligation_id)
    .bind(shortname)
    .execute(db)
    .await?;

    Ok(result.rows_affected() > 0)
}
