//! # API Route Modules
//!
//! - `obligations`: obligation CRUD and the per-obligation audit trail,
//!   mounted under `/api/v1/obligations`.

pub mod obligations;
