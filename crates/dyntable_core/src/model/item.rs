//! Item domain model.
//!
//! # Responsibility
//! - Define the schema-less record shape stored in a table.
//! - Enforce the primary-key invariant before items cross the store seam.
//!
//! # Invariants
//! - Every item read or written has a non-empty string `"id"` field.
//! - Write paths must call `Item::validate()` before store mutations.

use crate::model::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Required unique primary-key field present on every item.
pub const ID_FIELD: &str = "id";

/// Validation failure for the item primary-key invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    /// The `"id"` field is absent.
    MissingId,
    /// The `"id"` field is present but empty.
    EmptyId,
    /// The `"id"` field holds a non-string value.
    NonTextId { actual: &'static str },
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "item is missing the required `{ID_FIELD}` field"),
            Self::EmptyId => write!(f, "item `{ID_FIELD}` field must not be empty"),
            Self::NonTextId { actual } => {
                write!(f, "item `{ID_FIELD}` field must be text, got {actual}")
            }
        }
    }
}

impl Error for ItemValidationError {}

/// One schema-less record, keyed by its `"id"` field.
///
/// Fields are kept in a sorted map so serialized documents and equality
/// checks are deterministic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item {
    fields: BTreeMap<String, Value>,
}

impl Item {
    /// Creates an empty item. The result is invalid until an id is set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an item carrying only the given id.
    pub fn with_id(id: impl Into<String>) -> Self {
        let mut item = Self::new();
        item.set(ID_FIELD, Value::Text(id.into()));
        item
    }

    /// Returns the primary key when present and well-formed.
    pub fn id(&self) -> Option<&str> {
        match self.fields.get(ID_FIELD) {
            Some(Value::Text(id)) if !id.is_empty() => Some(id.as_str()),
            _ => None,
        }
    }

    /// Checks the primary-key invariant.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        match self.fields.get(ID_FIELD) {
            None => Err(ItemValidationError::MissingId),
            Some(Value::Text(id)) if id.is_empty() => Err(ItemValidationError::EmptyId),
            Some(Value::Text(_)) => Ok(()),
            Some(other) => Err(ItemValidationError::NonTextId {
                actual: other.type_name(),
            }),
        }
    }

    /// Returns one field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets one field value, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Removes one field, returning its previous value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Number of fields on this item.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether this item carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, Value)> for Item {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Item, ItemValidationError};
    use crate::model::value::Value;

    #[test]
    fn with_id_passes_validation() {
        let item = Item::with_id("u1");
        assert_eq!(item.id(), Some("u1"));
        assert!(item.validate().is_ok());
    }

    #[test]
    fn missing_id_is_rejected() {
        let mut item = Item::new();
        item.set("status", "active");
        assert_eq!(item.validate(), Err(ItemValidationError::MissingId));
        assert_eq!(item.id(), None);
    }

    #[test]
    fn empty_id_is_rejected() {
        let item = Item::with_id("");
        assert_eq!(item.validate(), Err(ItemValidationError::EmptyId));
    }

    #[test]
    fn non_text_id_is_rejected() {
        let mut item = Item::new();
        item.set("id", 42i64);
        assert_eq!(
            item.validate(),
            Err(ItemValidationError::NonTextId { actual: "integer" })
        );
    }

    #[test]
    fn set_overwrites_previous_value() {
        let mut item = Item::with_id("u1");
        item.set("status", "active");
        item.set("status", "disabled");
        assert_eq!(item.get("status"), Some(&Value::from("disabled")));
        assert_eq!(item.len(), 2);
    }

    #[test]
    fn items_round_trip_through_json() {
        let mut item = Item::with_id("u1");
        item.set("age", 30i64);
        item.set("tags", vec!["a", "b"]);

        let doc = serde_json::to_string(&item).unwrap();
        let decoded: Item = serde_json::from_str(&doc).unwrap();
        assert_eq!(decoded, item);
    }
}
