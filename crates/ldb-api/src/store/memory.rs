//! In-memory obligation store.
//!
//! All tables live behind a single `parking_lot::Mutex`. Every operation
//! takes the lock once, works on clones, and writes back only after all
//! checks pass, which gives each call the all-or-nothing behavior of a
//! database transaction. The lock is never held across `.await`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use ldb_core::{
    apply_updates, diff_obligations, plan_update, AuditRecord, NewAuditRecord, NewObligation, Obligation,
    ObligationError, ObligationPatch, PageRequest, OBLIGATION_AUDIT_TYPE,
};
use parking_lot::Mutex;

use super::{ObligationStore, Page};

#[derive(Debug, Default)]
struct Tables {
    obligations: BTreeMap<i64, Obligation>,
    licenses: HashMap<String, i64>,
    users: HashMap<String, i64>,
    links: BTreeSet<(i64, i64)>,
    audits: Vec<AuditRecord>,
    last_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn by_topic(&self, topic: &str) -> Result<&Obligation, ObligationError> {
        self.obligations
            .values()
            .find(|o| o.topic == topic)
            .ok_or_else(|| ObligationError::topic_not_found(topic))
    }

    fn by_topic_mut(&mut self, topic: &str) -> Result<&mut Obligation, ObligationError> {
        self.obligations
            .values_mut()
            .find(|o| o.topic == topic)
            .ok_or_else(|| ObligationError::topic_not_found(topic))
    }
}

/// Thread-safe, cloneable in-memory implementation of [`ObligationStore`].
///
/// Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Self::add_user`].
    pub fn with_user(self, username: &str) -> Self {
        self.add_user(username);
        self
    }

    /// Builder-style [`Self::add_license`].
    pub fn with_license(self, shortname: &str) -> Self {
        self.add_license(shortname);
        self
    }

    /// Register a user, returning its id. Idempotent.
    pub fn add_user(&self, username: &str) -> i64 {
        let mut tables = self.tables.lock();
        if let Some(id) = tables.users.get(username) {
            return *id;
        }
        let id = tables.next_id();
        tables.users.insert(username.to_string(), id);
        id
    }

    /// Register a license shortname, returning its id. Idempotent.
    pub fn add_license(&self, shortname: &str) -> i64 {
        let mut tables = self.tables.lock();
        if let Some(id) = tables.licenses.get(shortname) {
            return *id;
        }
        let id = tables.next_id();
        tables.licenses.insert(shortname.to_string(), id);
        id
    }

    /// Shortnames of the licenses linked to the obligation with `topic`, sorted.
    pub fn linked_licenses(&self, topic: &str) -> Vec<String> {
        let tables = self.tables.lock();
        let Ok(obligation) = tables.by_topic(topic) else {
            return Vec::new();
        };
        let mut names: Vec<String> = tables
            .licenses
            .iter()
            .filter(|(_, id)| tables.links.contains(&(obligation.id, **id)))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Total number of obligation rows, active or not.
    pub fn obligation_count(&self) -> usize {
        self.tables.lock().obligations.len()
    }

    /// Total number of audit records.
    pub fn audit_count(&self) -> usize {
        self.tables.lock().audits.len()
    }
}

#[async_trait]
impl ObligationStore for MemoryStore {
    async fn list(&self, active: bool, page: PageRequest) -> Result<Page<Obligation>, ObligationError> {
        let tables = self.tables.lock();
        let matching: Vec<&Obligation> = tables
            .obligations
            .values()
            .filter(|o| o.active == active)
            .collect();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok(Page { items, total })
    }

    async fn get_by_topic(&self, topic: &str) -> Result<Obligation, ObligationError> {
        self.tables.lock().by_topic(topic).cloned()
    }

    async fn create(&self, new: NewObligation) -> Result<Obligation, ObligationError> {
        let mut tables = self.tables.lock();

        let taken = tables
            .obligations
            .values()
            .any(|o| o.topic == new.topic || o.digest == new.digest);
        if taken {
            return Err(ObligationError::duplicate(&new.topic, &new.text));
        }

        let id = tables.next_id();
        let obligation = new.to_obligation(id);
        tables.obligations.insert(id, obligation.clone());

        for shortname in &new.shortnames {
            match tables.licenses.get(shortname).copied() {
                Some(license_id) => {
                    tables.links.insert((id, license_id));
                }
                None => tracing::warn!(
                    topic = %obligation.topic,
                    shortname = %shortname,
                    "unknown license shortname, obligation not linked"
                ),
            }
        }

        Ok(obligation)
    }

    async fn update(
        &self,
        topic: &str,
        patch: &ObligationPatch,
        username: &str,
    ) -> Result<Obligation, ObligationError> {
        let mut tables = self.tables.lock();

        let current = tables.by_topic(topic)?.clone();
        let updates = plan_update(&current, patch)?;
        let next = apply_updates(&current, &updates);

        if next.digest != current.digest
            && tables
                .obligations
                .values()
                .any(|o| o.id != next.id && o.digest == next.digest)
        {
            return Err(ObligationError::duplicate(&next.topic, &next.text));
        }

        let user_id = tables.users.get(username).copied().ok_or_else(|| {
            ObligationError::Internal(format!("user '{username}' not found"))
        })?;

        let audit = NewAuditRecord::for_obligation(user_id, next.id, diff_obligations(&current, &next));

        // Commit.
        tables.obligations.insert(next.id, next.clone());
        if let Some(audit) = audit {
            let audit_id = tables.next_id();
            tables.audits.push(audit.into_record(audit_id));
        }

        Ok(next)
    }

    async fn deactivate(&self, topic: &str) -> Result<(), ObligationError> {
        let mut tables = self.tables.lock();
        tables.by_topic_mut(topic)?.active = false;
        Ok(())
    }

    async fn list_audits(
        &self,
        topic: &str,
        page: PageRequest,
    ) -> Result<Page<AuditRecord>, ObligationError> {
        let tables = self.tables.lock();
        let subject = tables.by_topic(topic)?.id;
        let matching: Vec<&AuditRecord> = tables
            .audits
            .iter()
            .rev()
            .filter(|a| a.type_id == subject && a.audit_type == OBLIGATION_AUDIT_TYPE)
            .collect();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok(Page { items, total })
    }

    async fn ping(&self) -> Result<(), ObligationError> {
        Ok(())
    }
}
