//! Obligation persistence operations.
//!
//! Functions take any Postgres executor so they run equally against the
//! pool or inside a transaction (`&mut *tx`).

use ldb_core::{FieldUpdate, NewObligation, NullString, Obligation};
use sqlx::postgres::PgExecutor;
use sqlx::{Postgres, QueryBuilder};

const COLUMNS: &str = r#"id, topic, "type", text, classification, comment,
    modifications, active, text_updatable, text_digest"#;

/// Count obligations with the given `active` flag.
pub async fn count<'e>(db: impl PgExecutor<'e>, active: bool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM obligations WHERE active = $1")
        .bind(active)
        .fetch_one(db)
        .await
}

/// One page of obligations with the given `active` flag, ordered by id.
pub async fn list<'e>(
    db: impl PgExecutor<'e>,
    active: bool,
    limit: i64,
    offset: i64,
) -> Result<Vec<Obligation>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ObligationRow>(&format!(
        "SELECT {COLUMNS} FROM obligations WHERE active = $1 ORDER BY id LIMIT $2 OFFSET $3"
    ))
    .bind(active)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(ObligationRow::into_obligation).collect())
}

/// Fetch an obligation by topic.
pub async fn get_by_topic<'e>(
    db: impl PgExecutor<'e>,
    topic: &str,
) -> Result<Option<Obligation>, sqlx::Error> {
    let row = sqlx::query_as::<_, ObligationRow>(&format!(
        "SELECT {COLUMNS} FROM obligations WHERE topic = $1"
    ))
    .bind(topic)
    .fetch_optional(db)
    .await?;

    Ok(row.map(ObligationRow::into_obligation))
}

/// Fetch an obligation by topic and lock its row until the transaction ends.
pub async fn lock_by_topic<'e>(
    db: impl PgExecutor<'e>,
    topic: &str,
) -> Result<Option<Obligation>, sqlx::Error> {
    let row = sqlx::query_as::<_, ObligationRow>(&format!(
        "SELECT {COLUMNS} FROM obligations WHERE topic = $1 FOR UPDATE"
    ))
    .bind(topic)
    .fetch_optional(db)
    .await?;

    Ok(row.map(ObligationRow::into_obligation))
}

/// Whether any obligation already uses `topic` or `digest`.
pub async fn exists_with_topic_or_digest<'e>(
    db: impl PgExecutor<'e>,
    topic: &str,
    digest: &str,
) -> Result<bool, sqlx::Error> {
    let id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM obligations WHERE topic = $1 OR text_digest = $2 LIMIT 1",
    )
    .bind(topic)
    .bind(digest)
    .fetch_optional(db)
    .await?;

    Ok(id.is_some())
}

/// Insert a new obligation. `text_updatable` always starts false.
pub async fn insert<'e>(
    db: impl PgExecutor<'e>,
    new: &NewObligation,
) -> Result<Obligation, sqlx::Error> {
    let row = sqlx::query_as::<_, ObligationRow>(&format!(
        r#"INSERT INTO obligations (topic, "type", text, classification, comment,
         modifications, active, text_updatable, text_digest)
         VALUES ($1, $2, $3, $4, $5, $6, $7, FALSE, $8)
         RETURNING {COLUMNS}"#
    ))
    .bind(&new.topic)
    .bind(&new.obligation_type)
    .bind(&new.text)
    .bind(&new.classification)
    .bind(new.comment.as_deref())
    .bind(new.modifications)
    .bind(new.active)
    .bind(&new.digest)
    .fetch_one(db)
    .await?;

    Ok(row.into_obligation())
}

/// Write exactly the columns in `updates` and return the stored row.
///
/// `updates` must be non-empty.
pub async fn apply_updates<'e>(
    db: impl PgExecutor<'e>,
    id: i64,
    updates: &[FieldUpdate],
) -> Result<Obligation, sqlx::Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE obligations SET ");
    let mut set = query.separated(", ");
    for update in updates {
        set.push(format!("\"{}\" = ", update.column()));
        match update {
            FieldUpdate::Type(v)
            | FieldUpdate::Text(v)
            | FieldUpdate::Digest(v)
            | FieldUpdate::Classification(v) => set.push_bind_unseparated(v.clone()),
            FieldUpdate::Comment(v) => set.push_bind_unseparated(v.clone().into_inner()),
            FieldUpdate::Modifications(v)
            | FieldUpdate::Active(v)
            | FieldUpdate::TextUpdatable(v) => set.push_bind_unseparated(*v),
        };
    }
    query.push(" WHERE id = ");
    query.push_bind(id);
    query.push(format!(" RETURNING {COLUMNS}"));

    let row = query.build_query_as::<ObligationRow>().fetch_one(db).await?;
    Ok(row.into_obligation())
}

/// Clear the `active` flag. Returns false when no obligation has `topic`.
pub async fn deactivate<'e>(db: impl PgExecutor<'e>, topic: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE obligations SET active = FALSE WHERE topic = $1")
        .bind(topic)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct ObligationRow {
    id: i64,
    topic: String,
    #[sqlx(rename = "type")]
    obligation_type: String,
    text: String,
    classification: String,
    comment: Option<String>,
    modifications: bool,
    active: bool,
    text_updatable: bool,
    text_digest: String,
}

impl ObligationRow {
    fn into_obligation(self) -> Obligation {
        Obligation {
            id: self.id,
            topic: self.topic,
            obligation_type: self.obligation_type,
            text: self.text,
            classification: self.classification,
            comment: NullString::from(self.comment),
            modifications: self.modifications,
            active: self.active,
            text_updatable: self.text_updatable,
            digest: self.text_digest,
        }
    }
}
