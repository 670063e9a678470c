//! Nullable string with LicenseDB wire semantics.
//!
//! Encodes as the string when valid and `null` when invalid. Decodes `null`
//! *and* the empty string as invalid, so clients cannot store an empty
//! comment distinct from "no comment".

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A string that is either valid (carries a value) or invalid (absent).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NullString(Option<String>);

impl NullString {
    /// An invalid (absent) string.
    pub const fn null() -> Self {
        Self(None)
    }

    /// A valid string. Empty input yields an invalid string, matching decode.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Self(None)
        } else {
            Self(Some(value))
        }
    }

    /// Whether the string carries a value.
    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    /// Borrow the value, if valid.
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Take the storage representation.
    pub fn into_inner(self) -> Option<String> {
        self.0
    }
}

impl From<Option<String>> for NullString {
    fn from(value: Option<String>) -> Self {
        value.map(Self::new).unwrap_or_default()
    }
}

impl From<NullString> for Option<String> {
    fn from(value: NullString) -> Self {
        value.0
    }
}

impl fmt::Display for NullString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(s) => f.write_str(s),
            None => f.write_str("null"),
        }
    }
}

impl Serialize for NullString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self.0 {
            Some(s) => serializer.serialize_str(s),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for NullString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.into())
    }
}
