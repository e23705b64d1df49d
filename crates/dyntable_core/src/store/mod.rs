//! Managed table-store client seam.
//!
//! # Responsibility
//! - Define the contract the repository layer consumes: bind-to-table,
//!   put, batch write, point get, conditional update, paginated scan,
//!   delete and filtered query.
//! - Define the store-level error shape (machine code + human message).
//!
//! # Invariants
//! - Update/condition/filter expressions are opaque pass-through strings at
//!   this boundary; only a concrete client evaluates them.
//! - `ScanCursor` contents are assigned by the issuing client and must not
//!   be interpreted elsewhere.

use crate::model::{Item, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod expression;
pub mod sqlite;

/// Result type for store-client operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Maximum number of items a single batch-write chunk may carry.
///
/// Inherited from the managed store ("25 items or 16 MB per batch,
/// whichever first"); clients partition larger sequences internally.
pub const BATCH_MAX_ITEMS: usize = 25;

/// Well-known machine-readable store error codes.
pub mod codes {
    /// A conditional write failed its condition check.
    pub const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailedException";
    /// The named table does not exist or is not active.
    pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";
    /// A request was malformed (bad expression, bad placeholder, bad item).
    pub const VALIDATION_ERROR: &str = "ValidationException";
    /// The store rejected the request due to throughput limits.
    pub const THROTTLING: &str = "ThrottlingException";
    /// The store failed internally while serving the request.
    pub const INTERNAL_ERROR: &str = "InternalServerError";
}

/// Failure reported by the store client.
///
/// Carries the store's machine-readable code and human-readable message
/// unchanged; callers branch on [`StoreError::code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    code: String,
    message: String,
}

impl StoreError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Machine-readable error code as reported by the store.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable error message as reported by the store.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether this error is a conditional-check failure.
    pub fn is_condition_failure(&self) -> bool {
        self.code == codes::CONDITIONAL_CHECK_FAILED
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Error for StoreError {}

/// Opaque scan continuation token.
///
/// Returned alongside a page when more pages exist; feeding it back into
/// [`TableClient::scan`] resumes after the page it came with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor(String);

impl ScanCursor {
    /// Wraps a client-issued token. Only the issuing client assigns meaning.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for the issuing client to decode.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of scan or query results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanPage {
    /// Items on this page, in the store's scan order.
    pub items: Vec<Item>,
    /// Continuation token; `None` means the scan is complete.
    pub cursor: Option<ScanCursor>,
}

/// Fully assembled conditional-update request as the store receives it.
///
/// The condition here is the effective one: the repository has already
/// conjoined its existence check with any caller condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateInput {
    /// Store-syntax update expression (`SET ... REMOVE ...`).
    pub update_expression: String,
    /// Store-syntax condition expression; the update fails when false.
    pub condition_expression: Option<String>,
    /// `:placeholder` substitutions referenced by the expressions.
    pub values: BTreeMap<String, Value>,
    /// `#placeholder` field-name substitutions for reserved words.
    pub names: BTreeMap<String, String>,
}

/// Store-syntax filter predicate for query calls.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterExpression {
    /// Store-syntax boolean expression evaluated per item.
    pub expression: String,
    /// `:placeholder` substitutions referenced by the expression.
    pub values: BTreeMap<String, Value>,
    /// `#placeholder` field-name substitutions for reserved words.
    pub names: BTreeMap<String, String>,
}

/// Store client able to bind table handles by name.
pub trait StoreClient {
    /// Bound table handle type issued by this client.
    type Table: TableClient;

    /// Resolves a handle to one named table.
    ///
    /// # Errors
    /// - [`codes::RESOURCE_NOT_FOUND`] when the table does not exist.
    fn bind_table(&self, name: &str) -> StoreResult<Self::Table>;
}

/// Client bound to one table, performing all actual I/O.
///
/// All operations are synchronous request/response; any retries for
/// transient failures happen inside the implementation, not above it.
pub trait TableClient {
    /// Name of the bound table.
    fn table_name(&self) -> &str;

    /// Writes one item unconditionally, replacing any same-id item.
    fn put_item(&self, item: &Item) -> StoreResult<()>;

    /// Writes many items, partitioning into chunks of at most
    /// [`BATCH_MAX_ITEMS`] internally. Not atomic across chunks.
    fn batch_put(&self, items: &[Item]) -> StoreResult<()>;

    /// Point lookup by primary key. `None` means no such item.
    fn get_item(&self, id: &str) -> StoreResult<Option<Item>>;

    /// Applies a conditional partial update, returning only the attributes
    /// the update changed.
    ///
    /// # Errors
    /// - [`codes::CONDITIONAL_CHECK_FAILED`] when the effective condition
    ///   evaluates false.
    fn update_item(&self, id: &str, input: &UpdateInput) -> StoreResult<Item>;

    /// Reads up to `limit` items starting after `start`, returning the page
    /// and a continuation cursor when more items remain.
    fn scan(&self, limit: u32, start: Option<&ScanCursor>) -> StoreResult<ScanPage>;

    /// Deletes the item with the given id; absent ids succeed silently.
    fn delete_item(&self, id: &str) -> StoreResult<()>;

    /// Returns one page of items matching the filter predicate.
    fn query(&self, filter: &FilterExpression) -> StoreResult<ScanPage>;
}
