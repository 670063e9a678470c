//! # Obligations
//!
//! The [`Obligation`] entity, the request bodies that create and patch it,
//! and [`plan_update`], which turns a decoded patch into the sparse list of
//! column writes a store applies in one statement.
//!
//! ## Update Policy
//!
//! | Field                                   | Rule when present in the patch                 |
//! |-----------------------------------------|------------------------------------------------|
//! | `text`                                  | must be non-empty; a changed value requires the current row to be text-updatable; recomputes the digest |
//! | `type`, `classification`                | must be non-empty                              |
//! | `modifications`, `active`, `text_updatable` | written unconditionally                    |
//! | `comment`                               | `null` (or `""`) clears, any other value sets  |
//!
//! Absent fields are never written.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::digest::text_digest;
use crate::error::ObligationError;
use crate::null_string::NullString;
use crate::optional::{Optional, OptionalNullable};

/// A license-compliance requirement, identified by its unique topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Obligation {
    /// Storage identity. Not exposed on the wire.
    #[serde(skip)]
    pub id: i64,
    pub topic: String,
    #[serde(rename = "type")]
    pub obligation_type: String,
    pub text: String,
    pub classification: String,
    #[schema(value_type = Option<String>)]
    pub comment: NullString,
    pub modifications: bool,
    pub active: bool,
    pub text_updatable: bool,
    /// Digest of `text`, unique across obligations. Not exposed on the wire.
    #[serde(skip)]
    pub digest: String,
}

// -- Create -------------------------------------------------------------------

fn default_active() -> bool {
    true
}

/// Body of `POST /obligations`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateObligationRequest {
    pub topic: String,
    #[serde(rename = "type")]
    pub obligation_type: String,
    pub text: String,
    pub classification: String,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub comment: NullString,
    #[serde(default)]
    pub modifications: bool,
    #[serde(default = "default_active")]
    pub active: bool,
    /// License shortnames to associate the new obligation with.
    #[serde(default)]
    pub shortnames: Vec<String>,
}

impl CreateObligationRequest {
    /// Reject empty required fields.
    pub fn validate(&self) -> Result<(), ObligationError> {
        for (name, value) in [
            ("topic", &self.topic),
            ("type", &self.obligation_type),
            ("text", &self.text),
            ("classification", &self.classification),
        ] {
            if value.trim().is_empty() {
                return Err(ObligationError::Validation(format!(
                    "{name} must not be empty"
                )));
            }
        }
        Ok(())
    }

    /// Validate and compute the digest, producing the insertable record.
    pub fn into_new(self) -> Result<NewObligation, ObligationError> {
        self.validate()?;
        let digest = text_digest(&self.text);
        Ok(NewObligation {
            topic: self.topic,
            obligation_type: self.obligation_type,
            text: self.text,
            classification: self.classification,
            comment: self.comment,
            modifications: self.modifications,
            active: self.active,
            digest,
            shortnames: self.shortnames,
        })
    }
}

/// A validated obligation ready for insertion.
///
/// New obligations are never text-updatable; that flag can only be raised
/// later through a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObligation {
    pub topic: String,
    pub obligation_type: String,
    pub text: String,
    pub classification: String,
    pub comment: NullString,
    pub modifications: bool,
    pub active: bool,
    pub digest: String,
    pub shortnames: Vec<String>,
}

impl NewObligation {
    /// Materialize the stored entity once the backend has assigned an id.
    pub fn to_obligation(&self, id: i64) -> Obligation {
        Obligation {
            id,
            topic: self.topic.clone(),
            obligation_type: self.obligation_type.clone(),
            text: self.text.clone(),
            classification: self.classification.clone(),
            comment: self.comment.clone(),
            modifications: self.modifications,
            active: self.active,
            text_updatable: false,
            digest: self.digest.clone(),
        }
    }
}

// -- Patch --------------------------------------------------------------------

/// Body of `PATCH /obligations/{topic}`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ObligationPatch {
    #[serde(default, rename = "type", skip_serializing_if = "Optional::is_undefined")]
    #[schema(value_type = Option<String>)]
    pub obligation_type: Optional<String>,
    #[serde(default, skip_serializing_if = "Optional::is_undefined")]
    #[schema(value_type = Option<String>)]
    pub text: Optional<String>,
    #[serde(default, skip_serializing_if = "Optional::is_undefined")]
    #[schema(value_type = Option<String>)]
    pub classification: Optional<String>,
    #[serde(default, skip_serializing_if = "Optional::is_undefined")]
    #[schema(value_type = Option<bool>)]
    pub modifications: Optional<bool>,
    #[serde(default, skip_serializing_if = "OptionalNullable::is_undefined")]
    #[schema(value_type = Option<String>, nullable)]
    pub comment: OptionalNullable<String>,
    #[serde(default, skip_serializing_if = "Optional::is_undefined")]
    #[schema(value_type = Option<bool>)]
    pub active: Optional<bool>,
    #[serde(default, skip_serializing_if = "Optional::is_undefined")]
    #[schema(value_type = Option<bool>)]
    pub text_updatable: Optional<bool>,
}

/// One column write of a sparse update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Type(String),
    Text(String),
    Digest(String),
    Classification(String),
    Modifications(bool),
    Comment(NullString),
    Active(bool),
    TextUpdatable(bool),
}

impl FieldUpdate {
    /// Column the update writes.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Type(_) => "type",
            Self::Text(_) => "text",
            Self::Digest(_) => "text_digest",
            Self::Classification(_) => "classification",
            Self::Modifications(_) => "modifications",
            Self::Comment(_) => "comment",
            Self::Active(_) => "active",
            Self::TextUpdatable(_) => "text_updatable",
        }
    }

    /// Apply the write to an in-memory snapshot.
    pub fn apply(&self, obligation: &mut Obligation) {
        match self {
            Self::Type(v) => obligation.obligation_type = v.clone(),
            Self::Text(v) => obligation.text = v.clone(),
            Self::Digest(v) => obligation.digest = v.clone(),
            Self::Classification(v) => obligation.classification = v.clone(),
            Self::Modifications(v) => obligation.modifications = *v,
            Self::Comment(v) => obligation.comment = v.clone(),
            Self::Active(v) => obligation.active = *v,
            Self::TextUpdatable(v) => obligation.text_updatable = *v,
        }
    }
}

/// Build the sparse update for `patch` against the `current` row.
///
/// Only fields present in the patch produce writes. Policy violations are
/// reported as [`ObligationError::Validation`] before anything is written.
pub fn plan_update(
    current: &Obligation,
    patch: &ObligationPatch,
) -> Result<Vec<FieldUpdate>, ObligationError> {
    let mut updates = Vec::new();

    if let Some(text) = patch.text.as_present() {
        if text.is_empty() {
            return Err(ObligationError::Validation(
                "Text cannot be an empty string".to_string(),
            ));
        }
        if *text != current.text {
            if !current.text_updatable {
                return Err(ObligationError::Validation(
                    "Can not update obligation text".to_string(),
                ));
            }
            updates.push(FieldUpdate::Text(text.clone()));
            updates.push(FieldUpdate::Digest(text_digest(text)));
        }
    }

    if let Some(obligation_type) = patch.obligation_type.as_present() {
        if obligation_type.is_empty() {
            return Err(ObligationError::Validation(
                "Type cannot be an empty string".to_string(),
            ));
        }
        updates.push(FieldUpdate::Type(obligation_type.clone()));
    }

    if let Some(classification) = patch.classification.as_present() {
        if classification.is_empty() {
            return Err(ObligationError::Validation(
                "Classification cannot be an empty string".to_string(),
            ));
        }
        updates.push(FieldUpdate::Classification(classification.clone()));
    }

    if let Some(modifications) = patch.modifications.as_present() {
        updates.push(FieldUpdate::Modifications(*modifications));
    }

    if let Some(comment) = patch.comment.clone().into_patch() {
        updates.push(FieldUpdate::Comment(comment.into()));
    }

    if let Some(active) = patch.active.as_present() {
        updates.push(FieldUpdate::Active(*active));
    }

    if let Some(text_updatable) = patch.text_updatable.as_present() {
        updates.push(FieldUpdate::TextUpdatable(*text_updatable));
    }

    Ok(updates)
}

/// Snapshot of `current` after applying `updates`.
pub fn apply_updates(current: &Obligation, updates: &[FieldUpdate]) -> Obligation {
    let mut next = current.clone();
    for update in updates {
        update.apply(&mut next);
    }
    next
}
