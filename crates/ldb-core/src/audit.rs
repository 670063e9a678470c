//! # Field-Level Change Audit
//!
//! An update to an obligation is recorded as one [`AuditRecord`] holding a
//! [`ChangeLogEntry`] per field whose value differs between the snapshot
//! read before the write and the row returned by it.
//!
//! Fields are compared in a fixed order, and entries appear in that order:
//! `Topic`, `Type`, `Text`, `Classification`, `Modifications`, `Comment`,
//! `Active`, `TextUpdatable`. Booleans render as `"true"`/`"false"`; a null
//! comment renders as an absent value.
//!
//! [`diff_obligations`] is pure. Stores call it inside the transaction that
//! performs the update, so the write and its audit commit or roll back
//! together. An update that changes nothing produces no audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::obligation::Obligation;

/// Subject type tag recorded on obligation audits.
pub const OBLIGATION_AUDIT_TYPE: &str = "Obligation";

/// One changed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChangeLogEntry {
    pub field: String,
    pub old_value: Option<String>,
    pub updated_value: Option<String>,
}

impl ChangeLogEntry {
    fn text(field: &str, old: &str, new: &str) -> Self {
        Self {
            field: field.to_string(),
            old_value: Some(old.to_string()),
            updated_value: Some(new.to_string()),
        }
    }

    fn flag(field: &str, old: bool, new: bool) -> Self {
        Self {
            field: field.to_string(),
            old_value: Some(old.to_string()),
            updated_value: Some(new.to_string()),
        }
    }
}

/// A persisted audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuditRecord {
    pub id: i64,
    /// Internal id of the user who made the change.
    pub user_id: i64,
    /// Id of the audited entity.
    pub type_id: i64,
    pub timestamp: DateTime<Utc>,
    /// Kind of the audited entity, e.g. `"Obligation"`.
    #[serde(rename = "type")]
    pub audit_type: String,
    pub change_logs: Vec<ChangeLogEntry>,
}

/// An audit record that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditRecord {
    pub user_id: i64,
    pub type_id: i64,
    pub audit_type: &'static str,
    pub timestamp: DateTime<Utc>,
    pub change_logs: Vec<ChangeLogEntry>,
}

impl NewAuditRecord {
    /// Audit for an obligation update, or `None` when nothing changed.
    pub fn for_obligation(
        user_id: i64,
        obligation_id: i64,
        change_logs: Vec<ChangeLogEntry>,
    ) -> Option<Self> {
        if change_logs.is_empty() {
            return None;
        }
        Some(Self {
            user_id,
            type_id: obligation_id,
            audit_type: OBLIGATION_AUDIT_TYPE,
            timestamp: Utc::now(),
            change_logs,
        })
    }

    /// Attach the id assigned by the store.
    pub fn into_record(self, id: i64) -> AuditRecord {
        AuditRecord {
            id,
            user_id: self.user_id,
            type_id: self.type_id,
            timestamp: self.timestamp,
            audit_type: self.audit_type.to_string(),
            change_logs: self.change_logs,
        }
    }
}

/// Compare two snapshots of the same obligation field by field.
pub fn diff_obligations(before: &Obligation, after: &Obligation) -> Vec<ChangeLogEntry> {
    let mut changes = Vec::new();

    if before.topic != after.topic {
        changes.push(ChangeLogEntry::text("Topic", &before.topic, &after.topic));
    }
    if before.obligation_type != after.obligation_type {
        changes.push(ChangeLogEntry::text(
            "Type",
            &before.obligation_type,
            &after.obligation_type,
        ));
    }
    if before.text != after.text {
        changes.push(ChangeLogEntry::text("Text", &before.text, &after.text));
    }
    if before.classification != after.classification {
        changes.push(ChangeLogEntry::text(
            "Classification",
            &before.classification,
            &after.classification,
        ));
    }
    if before.modifications != after.modifications {
        changes.push(ChangeLogEntry::flag(
            "Modifications",
            before.modifications,
            after.modifications,
        ));
    }
    if before.comment != after.comment {
        changes.push(ChangeLogEntry {
            field: "Comment".to_string(),
            old_value: before.comment.as_deref().map(str::to_string),
            updated_value: after.comment.as_deref().map(str::to_string),
        });
    }
    if before.active != after.active {
        changes.push(ChangeLogEntry::flag("Active", before.active, after.active));
    }
    if before.text_updatable != after.text_updatable {
        changes.push(ChangeLogEntry::flag(
            "TextUpdatable",
            before.text_updatable,
            after.text_updatable,
        ));
    }

    changes
}
