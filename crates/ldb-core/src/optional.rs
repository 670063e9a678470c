//! # Tri-State Field Decoding
//!
//! Plain `Option<T>` collapses two different client intents into `None`:
//! "I did not send this field" and "I sent `null`". A partial update needs
//! both, plus the present value, to drive different persistence behavior:
//!
//! | JSON input        | [`OptionalNullable<T>`] | [`Optional<T>`]      |
//! |-------------------|-------------------------|----------------------|
//! | key absent        | `Undefined`             | `Undefined`          |
//! | `"f": null`       | `Null`                  | decode error         |
//! | `"f": <value>`    | `Present(value)`        | `Present(value)`     |
//!
//! ## Usage
//!
//! Fields of these types **must** carry `#[serde(default)]`. serde only
//! invokes a field's `Deserialize` impl when the key is present; the
//! default supplies `Undefined` for an absent key. Without it serde routes
//! a missing key through `deserialize_option`, which would read as `Null`.
//!
//! ```
//! use ldb_core::{Optional, OptionalNullable};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Patch {
//!     #[serde(default)]
//!     comment: OptionalNullable<String>,
//!     #[serde(default)]
//!     active: Optional<bool>,
//! }
//!
//! let patch: Patch = serde_json::from_str(r#"{"comment": null}"#).unwrap();
//! assert!(patch.comment.is_null());
//! assert!(patch.active.is_undefined());
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error message for an explicit `null` sent to an [`Optional`] field.
pub const NULL_VALUE_MESSAGE: &str = "field value cannot be null";

// -- OptionalNullable ---------------------------------------------------------

/// A decoded field that may be absent, explicitly `null`, or carry a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OptionalNullable<T> {
    /// The key was not present in the input document.
    Undefined,
    /// The key was present with an explicit `null`.
    Null,
    /// The key was present with a value of type `T`.
    Present(T),
}

impl<T> OptionalNullable<T> {
    /// Whether the key was absent.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Whether the key was present with `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the key was present at all (null or value).
    pub fn is_defined(&self) -> bool {
        !self.is_undefined()
    }

    /// Borrow the value when present.
    pub fn as_present(&self) -> Option<&T> {
        match self {
            Self::Present(v) => Some(v),
            _ => None,
        }
    }

    /// Collapse into the nested-option form used by update builders.
    ///
    /// `Undefined` → `None` (leave unchanged), `Null` → `Some(None)` (clear),
    /// `Present(v)` → `Some(Some(v))` (set).
    pub fn into_patch(self) -> Option<Option<T>> {
        match self {
            Self::Undefined => None,
            Self::Null => Some(None),
            Self::Present(v) => Some(Some(v)),
        }
    }
}

impl<T> Default for OptionalNullable<T> {
    fn default() -> Self {
        Self::Undefined
    }
}

impl<T> From<Option<T>> for OptionalNullable<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Present(v),
            None => Self::Null,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OptionalNullable<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}

impl<T: Serialize> Serialize for OptionalNullable<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Present(v) => serializer.serialize_some(v),
            Self::Null | Self::Undefined => serializer.serialize_none(),
        }
    }
}

// -- Optional -----------------------------------------------------------------

/// A decoded field that may be absent or carry a value, but never `null`.
///
/// Used for fields that are required-if-present, such as booleans and
/// non-nullable text columns of a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Optional<T> {
    /// The key was not present in the input document.
    Undefined,
    /// The key was present with a value of type `T`.
    Present(T),
}

impl<T> Optional<T> {
    /// Whether the key was absent.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Whether the key was present.
    pub fn is_defined(&self) -> bool {
        !self.is_undefined()
    }

    /// Borrow the value when present.
    pub fn as_present(&self) -> Option<&T> {
        match self {
            Self::Present(v) => Some(v),
            Self::Undefined => None,
        }
    }

    /// Convert into a plain `Option`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Present(v) => Some(v),
            Self::Undefined => None,
        }
    }
}

impl<T> Default for Optional<T> {
    fn default() -> Self {
        Self::Undefined
    }
}

impl<T> From<T> for Optional<T> {
    fn from(value: T) -> Self {
        Self::Present(value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Optional<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<T>::deserialize(deserializer)? {
            Some(v) => Ok(Self::Present(v)),
            None => Err(D::Error::custom(NULL_VALUE_MESSAGE)),
        }
    }
}

impl<T: Serialize> Serialize for Optional<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Present(v) => serializer.serialize_some(v),
            Self::Undefined => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct NullableDoc {
        #[serde(default)]
        f: OptionalNullable<String>,
    }

    #[derive(Debug, Deserialize)]
    struct RequiredIfPresentDoc {
        #[serde(default)]
        f: Optional<String>,
    }

    #[derive(Debug, Deserialize)]
    struct CountDoc {
        #[serde(default)]
        n: OptionalNullable<i64>,
        #[serde(default)]
        flag: Optional<bool>,
    }

    #[test]
    fn absent_key_is_undefined() {
        let doc: NullableDoc = serde_json::from_str("{}").unwrap();
        assert_eq!(doc.f, OptionalNullable::Undefined);
    }

    #[test]
    fn explicit_null_is_null() {
        let doc: NullableDoc = serde_json::from_str(r#"{"f": null}"#).unwrap();
        assert_eq!(doc.f, OptionalNullable::Null);
    }

    #[test]
    fn value_is_present() {
        let doc: NullableDoc = serde_json::from_str(r#"{"f": "x"}"#).unwrap();
        assert_eq!(doc.f, OptionalNullable::Present("x".to_string()));
    }

    #[test]
    fn zero_values_are_present_not_undefined() {
        let doc: CountDoc = serde_json::from_str(r#"{"n": 0, "flag": false}"#).unwrap();
        assert_eq!(doc.n, OptionalNullable::Present(0));
        assert_eq!(doc.flag, Optional::Present(false));

        let doc: NullableDoc = serde_json::from_str(r#"{"f": ""}"#).unwrap();
        assert_eq!(doc.f, OptionalNullable::Present(String::new()));
    }

    #[test]
    fn type_mismatch_is_decode_error() {
        let err = serde_json::from_str::<NullableDoc>(r#"{"f": 12}"#).unwrap_err();
        assert!(err.is_data(), "got: {err}");

        let err = serde_json::from_str::<CountDoc>(r#"{"flag": "yes"}"#).unwrap_err();
        assert!(err.is_data(), "got: {err}");
    }

    #[test]
    fn optional_rejects_null() {
        let err = serde_json::from_str::<RequiredIfPresentDoc>(r#"{"f": null}"#).unwrap_err();
        assert!(err.to_string().contains(NULL_VALUE_MESSAGE), "got: {err}");
    }

    #[test]
    fn optional_absent_and_present() {
        let doc: RequiredIfPresentDoc = serde_json::from_str("{}").unwrap();
        assert!(doc.f.is_undefined());

        let doc: RequiredIfPresentDoc = serde_json::from_str(r#"{"f": "y"}"#).unwrap();
        assert_eq!(doc.f.into_option().as_deref(), Some("y"));
    }

    #[test]
    fn into_patch_maps_all_three_states() {
        assert_eq!(OptionalNullable::<u8>::Undefined.into_patch(), None);
        assert_eq!(OptionalNullable::<u8>::Null.into_patch(), Some(None));
        assert_eq!(OptionalNullable::Present(3u8).into_patch(), Some(Some(3)));
    }

    #[test]
    fn serializes_back_to_json() {
        let present = serde_json::to_string(&OptionalNullable::Present("a")).unwrap();
        assert_eq!(present, r#""a""#);
        let null = serde_json::to_string(&OptionalNullable::<String>::Null).unwrap();
        assert_eq!(null, "null");
        let set = serde_json::to_string(&Optional::Present(true)).unwrap();
        assert_eq!(set, "true");
    }
}
