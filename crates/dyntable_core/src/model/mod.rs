//! Domain model for schema-less table items.

pub mod item;
pub mod value;

pub use item::{Item, ItemValidationError, ID_FIELD};
pub use value::Value;
