//! Table repository facade.
//!
//! # Responsibility
//! - Expose the seven table operations (insert, batch insert, point lookup,
//!   conditional update, full scan, delete, substring search) over a bound
//!   table client.
//! - Centralize error mapping and table-scoped failure logging.
//!
//! # Invariants
//! - Every failure is logged with the table name and the store's code and
//!   message, then propagated unchanged; no operation swallows an error or
//!   substitutes a default value.
//! - Updates always require the target item to exist, on top of any caller
//!   condition.
//! - This layer holds no state beyond the table handle and performs no
//!   retries of its own.

use crate::model::{Item, ItemValidationError, Value};
use crate::store::{
    FilterExpression, ScanCursor, StoreClient, StoreError, TableClient, UpdateInput,
};
use log::error;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default page size for full-table scans.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Existence check conjoined into every update condition.
const ID_EXISTS_CONDITION: &str = "attribute_exists(id)";

/// Result type for repository operations.
pub type RepoResult<T> = Result<T, RepoError>;

/// Repository-level error for table operations.
#[derive(Debug)]
pub enum RepoError {
    /// No item with the given id exists. Synthesized locally after a
    /// successful-but-empty lookup, never reported by the store itself.
    NotFound { table: String, id: String },
    /// A conditional update failed its existence or caller condition.
    ConditionFailed {
        table: String,
        id: String,
        source: StoreError,
    },
    /// An item violated the primary-key invariant before reaching the store.
    InvalidItem(ItemValidationError),
    /// Any other failure reported by the store client.
    Store(StoreError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { table, id } => {
                write!(f, "item `{id}` not found in table `{table}`")
            }
            Self::ConditionFailed { table, id, source } => write!(
                f,
                "condition failed updating item `{id}` in table `{table}`: {source}"
            ),
            Self::InvalidItem(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound { .. } => None,
            Self::ConditionFailed { source, .. } => Some(source),
            Self::InvalidItem(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::InvalidItem(value)
    }
}

/// Caller-facing conditional update request.
///
/// The update expression, the optional condition expression and both
/// placeholder maps pass through to the store untouched; the repository
/// only conjoins its existence check onto the condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateRequest {
    /// Store-syntax update expression (`SET ... REMOVE ...`).
    pub expression: String,
    /// `:placeholder` substitutions referenced by the expressions.
    pub values: BTreeMap<String, Value>,
    /// Optional store-syntax condition the update must also satisfy.
    pub condition: Option<String>,
    /// `#placeholder` remappings for reserved-word field names.
    pub names: BTreeMap<String, String>,
}

impl UpdateRequest {
    /// Creates a request with the given update expression and fresh, empty
    /// placeholder maps. Maps are never shared between requests.
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            values: BTreeMap::new(),
            condition: None,
            names: BTreeMap::new(),
        }
    }

    /// Adds one `:placeholder` value substitution.
    pub fn value(mut self, placeholder: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(placeholder.into(), value.into());
        self
    }

    /// Adds one `#placeholder` field-name substitution.
    pub fn name(mut self, placeholder: impl Into<String>, field: impl Into<String>) -> Self {
        self.names.insert(placeholder.into(), field.into());
        self
    }

    /// Sets the caller condition expression.
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// Facade bound to one named table.
///
/// Holds only the bound table client; every call is an independent,
/// synchronous request against the store.
#[derive(Debug)]
pub struct TableRepository<C: TableClient> {
    table: C,
}

impl<C: TableClient> TableRepository<C> {
    /// Wraps an already-bound table client.
    pub fn new(table: C) -> Self {
        Self { table }
    }

    /// Binds a handle to `name` through the store client.
    ///
    /// Fails when the store is unreachable or the table is missing; the
    /// failure is logged and propagated, never swallowed.
    pub fn bind<S>(store: &S, name: &str) -> RepoResult<TableRepository<S::Table>>
    where
        S: StoreClient<Table = C>,
    {
        match store.bind_table(name) {
            Ok(table) => Ok(TableRepository::new(table)),
            Err(err) => {
                error!(
                    "event=bind_table_failed module=repo table={} code={} message={}",
                    name,
                    err.code(),
                    err.message()
                );
                Err(err.into())
            }
        }
    }

    /// Name of the bound table.
    pub fn table_name(&self) -> &str {
        self.table.table_name()
    }

    /// Writes a sequence of items through the store's batched-write
    /// facility, which partitions into bounded chunks and retries transient
    /// failures internally. Not atomic across chunks.
    pub fn insert_many(&self, items: &[Item]) -> RepoResult<()> {
        for item in items {
            item.validate()?;
        }

        self.table.batch_put(items).map_err(|err| {
            error!(
                "event=batch_insert_failed module=repo table={} count={} code={} message={}",
                self.table_name(),
                items.len(),
                err.code(),
                err.message()
            );
            RepoError::from(err)
        })
    }

    /// Writes a single item unconditionally, overwriting any existing item
    /// with the same id.
    pub fn insert(&self, item: &Item) -> RepoResult<()> {
        item.validate()?;
        let id = item.id().unwrap_or_default().to_string();

        self.table.put_item(item).map_err(|err| {
            error!(
                "event=insert_failed module=repo table={} id={} code={} message={}",
                self.table_name(),
                id,
                err.code(),
                err.message()
            );
            RepoError::from(err)
        })
    }

    /// Point lookup by primary key.
    ///
    /// # Errors
    /// - [`RepoError::NotFound`] when no item carries this id; absence is
    ///   always observable, never a silent sentinel.
    pub fn find_by_id(&self, id: &str) -> RepoResult<Item> {
        let found = self.table.get_item(id).map_err(|err| {
            error!(
                "event=find_by_id_failed module=repo table={} id={} code={} message={}",
                self.table_name(),
                id,
                err.code(),
                err.message()
            );
            RepoError::from(err)
        })?;

        found.ok_or_else(|| {
            error!(
                "event=item_not_found module=repo table={} id={}",
                self.table_name(),
                id
            );
            RepoError::NotFound {
                table: self.table_name().to_string(),
                id: id.to_string(),
            }
        })
    }

    /// Performs a conditional partial update.
    ///
    /// The effective condition is always `attribute_exists(id)` conjoined
    /// with the caller condition, so updating an absent id fails instead of
    /// creating the item. Returns only the attributes the update changed.
    ///
    /// # Errors
    /// - [`RepoError::ConditionFailed`] when the id does not exist or the
    ///   caller condition evaluates false.
    pub fn update(&self, id: &str, request: &UpdateRequest) -> RepoResult<Item> {
        let condition_expression = match request.condition.as_deref() {
            None => ID_EXISTS_CONDITION.to_string(),
            Some(condition) => format!("{ID_EXISTS_CONDITION} AND ({condition})"),
        };

        let input = UpdateInput {
            update_expression: request.expression.clone(),
            condition_expression: Some(condition_expression),
            values: request.values.clone(),
            names: request.names.clone(),
        };

        self.table.update_item(id, &input).map_err(|err| {
            error!(
                "event=update_failed module=repo table={} id={} code={} message={}",
                self.table_name(),
                id,
                err.code(),
                err.message()
            );
            if err.is_condition_failure() {
                RepoError::ConditionFailed {
                    table: self.table_name().to_string(),
                    id: id.to_string(),
                    source: err,
                }
            } else {
                RepoError::Store(err)
            }
        })
    }

    /// Full-table scan with the default page limit. See
    /// [`TableRepository::find_all_with_limit`].
    pub fn find_all(&self) -> RepoResult<Vec<Item>> {
        self.find_all_with_limit(DEFAULT_PAGE_LIMIT)
    }

    /// Full-table scan, following the continuation cursor until exhaustion
    /// and accumulating every page in scan order.
    ///
    /// Memory cost is proportional to the total item count; intended for
    /// small tables only.
    pub fn find_all_with_limit(&self, limit: u32) -> RepoResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut cursor: Option<ScanCursor> = None;

        loop {
            let page = self.table.scan(limit, cursor.as_ref()).map_err(|err| {
                error!(
                    "event=scan_failed module=repo table={} code={} message={}",
                    self.table_name(),
                    err.code(),
                    err.message()
                );
                RepoError::from(err)
            })?;

            items.extend(page.items);
            match page.cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(items)
    }

    /// Removes the item with the given id; deleting an absent id succeeds
    /// silently (idempotent no-op).
    pub fn delete(&self, id: &str) -> RepoResult<()> {
        self.table.delete_item(id).map_err(|err| {
            error!(
                "event=delete_failed module=repo table={} id={} code={} message={}",
                self.table_name(),
                id,
                err.code(),
                err.message()
            );
            RepoError::from(err)
        })
    }

    /// Returns every item on the first query page whose `field` contains
    /// `value` (substring for text fields, member equality for list fields).
    ///
    /// Known limitation carried over from the documented contract: the
    /// continuation cursor is not followed, so matches beyond one page are
    /// dropped. Callers needing complete results on large tables must use
    /// [`TableRepository::find_all`] and filter themselves.
    pub fn search(&self, field: &str, value: &str) -> RepoResult<Vec<Item>> {
        let mut filter = FilterExpression {
            expression: "contains(#f, :v)".to_string(),
            ..FilterExpression::default()
        };
        filter.names.insert("#f".to_string(), field.to_string());
        filter
            .values
            .insert(":v".to_string(), Value::from(value));

        let page = self.table.query(&filter).map_err(|err| {
            error!(
                "event=search_failed module=repo table={} field={} code={} message={}",
                self.table_name(),
                field,
                err.code(),
                err.message()
            );
            RepoError::from(err)
        })?;

        Ok(page.items)
    }
}
