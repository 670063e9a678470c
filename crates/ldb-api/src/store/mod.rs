//! # Obligation Store
//!
//! The [`ObligationStore`] trait is the seam between the HTTP handlers and
//! persistence. Two backends implement it:
//!
//! - [`crate::db::PgObligationStore`]: PostgreSQL via SQLx, used when
//!   `DATABASE_URL` is set.
//! - [`memory::MemoryStore`]: process-local tables behind one mutex, used
//!   for development and tests.
//!
//! Both backends run the same domain logic from `ldb-core`
//! ([`ldb_core::plan_update`], [`ldb_core::diff_obligations`]) inside their
//! own atomic scope, so policy and audit behavior are identical.

pub mod memory;

use async_trait::async_trait;
use ldb_core::{AuditRecord, NewObligation, Obligation, ObligationError, ObligationPatch, PageRequest};

pub use memory::MemoryStore;

/// One page of results plus the unpaginated total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Persistence operations on obligations and their audit trail.
#[async_trait]
pub trait ObligationStore: Send + Sync + 'static {
    /// Obligations whose `active` flag equals `active`, ordered by id.
    ///
    /// A failing query is reported as `NotFound`; an empty page is not an error.
    async fn list(&self, active: bool, page: PageRequest) -> Result<Page<Obligation>, ObligationError>;

    /// The obligation with exactly this topic.
    async fn get_by_topic(&self, topic: &str) -> Result<Obligation, ObligationError>;

    /// Insert a new obligation unless its topic or text digest is taken,
    /// then link it to every known license in `new.shortnames`.
    async fn create(&self, new: NewObligation) -> Result<Obligation, ObligationError>;

    /// Apply `patch` to the obligation with `topic` on behalf of `username`,
    /// writing an audit record of the changed fields. All or nothing.
    async fn update(
        &self,
        topic: &str,
        patch: &ObligationPatch,
        username: &str,
    ) -> Result<Obligation, ObligationError>;

    /// Soft-delete: clear the `active` flag.
    async fn deactivate(&self, topic: &str) -> Result<(), ObligationError>;

    /// Audit records of the obligation with `topic`, newest first.
    async fn list_audits(
        &self,
        topic: &str,
        page: PageRequest,
    ) -> Result<Page<AuditRecord>, ObligationError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), ObligationError>;
}
