//! # ldb-core: Domain Types for the LicenseDB Obligations Service
//!
//! This crate holds everything about obligations that does not touch I/O.
//! The `ldb-api` crate owns persistence and HTTP; it calls into the pure
//! functions defined here from inside its transactions.
//!
//! ## Modules
//!
//! - [`optional`]: tri-state decoding wrappers ([`OptionalNullable`], [`Optional`])
//!   that tell "absent" from "null" from "zero value" in a JSON body.
//! - [`null_string`]: [`NullString`], the nullable string used for
//!   obligation comments on the wire.
//! - [`obligation`]: the [`Obligation`] entity, create/patch requests and
//!   the sparse update planner.
//! - [`audit`]: field-level diff of two obligation snapshots and the
//!   audit record model.
//! - [`digest`]: content digest of obligation text.
//! - [`pagination`]: page/limit normalization shared by every list query.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ldb-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod audit;
pub mod digest;
pub mod error;
pub mod null_string;
pub mod obligation;
pub mod optional;
pub mod pagination;

pub use audit::{diff_obligations, AuditRecord, ChangeLogEntry, NewAuditRecord, OBLIGATION_AUDIT_TYPE};
pub use digest::text_digest;
pub use error::ObligationError;
pub use null_string::NullString;
pub use obligation::{
    apply_updates, plan_update, CreateObligationRequest, FieldUpdate, NewObligation, Obligation,
    ObligationPatch,
};
pub use optional::{Optional, OptionalNullable};
pub use pagination::PageRequest;
