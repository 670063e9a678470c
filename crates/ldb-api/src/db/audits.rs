//! Audit trail persistence operations.
//!
//! Operates on the `audits` and `change_logs` tables. A record and its
//! change log are written in the caller's transaction.

use chrono::{DateTime, Utc};
use ldb_core::{AuditRecord, ChangeLogEntry, NewAuditRecord};
use sqlx::PgConnection;

/// Insert an audit record and its change log entries, returning the record.
pub async fn insert(
    conn: &mut PgConnection,
    audit: NewAuditRecord,
) -> Result<AuditRecord, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"INSERT INTO audits (user_id, type_id, "type", timestamp)
         VALUES ($1, $2, $3, $4) RETURNING id"#,
    )
    .bind(audit.user_id)
    .bind(audit.type_id)
    .bind(audit.audit_type)
    .bind(audit.timestamp)
    .fetch_one(&mut *conn)
    .await?;

    for (position, entry) in audit.change_logs.iter().enumerate() {
        sqlx::query(
            "INSERT INTO change_logs (audit_id, position, field, old_value, updated_value)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(position as i32)
        .bind(&entry.field)
        .bind(&entry.old_value)
        .bind(&entry.updated_value)
        .execute(&mut *conn)
        .await?;
    }

    Ok(audit.into_record(id))
}

/// Count audit records for one subject.
pub async fn count(
    conn: &mut PgConnection,
    audit_type: &str,
    type_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(r#"SELECT COUNT(*) FROM audits WHERE "type" = $1 AND type_id = $2"#)
        .bind(audit_type)
        .bind(type_id)
        .fetch_one(&mut *conn)
        .await
}

/// One page of audit records for one subject, newest first, with change logs.
pub async fn list_for_subject(
    conn: &mut PgConnection,
    audit_type: &str,
    type_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<AuditRecord>, sqlx::Error> {
    let audits = sqlx::query_as::<_, AuditRow>(
        r#"SELECT id, user_id, type_id, "type", timestamp FROM audits
         WHERE "type" = $1 AND type_id = $2
         ORDER BY timestamp DESC, id DESC LIMIT $3 OFFSET $4"#,
    )
    .bind(audit_type)
    .bind(type_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;

    if audits.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = audits.iter().map(|a| a.id).collect();
    let entries = sqlx::query_as::<_, ChangeLogRow>(
        "SELECT audit_id, field, old_value, updated_value FROM change_logs
         WHERE audit_id = ANY($1) ORDER BY audit_id, position",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let records = audits
        .into_iter()
        .map(|audit| {
            let change_logs = entries
                .iter()
                .filter(|e| e.audit_id == audit.id)
                .map(ChangeLogRow::to_entry)
                .collect();
            AuditRecord {
                id: audit.id,
                user_id: audit.user_id,
                type_id: audit.type_id,
                timestamp: audit.timestamp,
                audit_type: audit.audit_type,
                change_logs,
            }
        })
        .collect();

    Ok(records)
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: i64,
    user_id: i64,
    type_id: i64,
    #[sqlx(rename = "type")]
    audit_type: String,
    timestamp: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ChangeLogRow {
    audit_id: i64,
    field: String,
    old_value: Option<String>,
    updated_value: Option<String>,
}

impl ChangeLogRow {
    fn to_entry(&self) -> ChangeLogEntry {
        ChangeLogEntry {
            field: self.field.clone(),
            old_value: self.old_value.clone(),
            updated_value: self.updated_value.clone(),
        }
    }
}
