//! SQLite-backed implementation of the store-client seam.
//!
//! # Responsibility
//! - Persist items as serialized documents keyed by `(table, id)`.
//! - Provide id-ordered scan pagination behind an opaque cursor.
//! - Evaluate the expression micro-DSL for updates and queries.
//!
//! # Invariants
//! - `bind_table` succeeds only for names registered in the catalog.
//! - A failed conditional update leaves the stored item untouched.
//! - Batch writes are chunked; chunks are independent, not atomic together.

use crate::model::{Item, ID_FIELD};
use crate::store::expression::{apply_update, eval_condition, eval_filter, ExpressionContext};
use crate::store::{
    codes, FilterExpression, ScanCursor, ScanPage, StoreClient, StoreError, StoreResult,
    TableClient, UpdateInput, BATCH_MAX_ITEMS,
};
use rusqlite::{params, Connection, OptionalExtension};

/// Largest window of items one `query` call examines before returning a
/// page, mirroring the managed store's bounded query page.
pub const QUERY_PAGE_ITEMS: usize = 100;

/// Local store client over one SQLite connection.
pub struct SqliteStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Registers a table in the catalog; registering twice is a no-op.
    pub fn create_table(&self, name: &str) -> StoreResult<()> {
        if name.is_empty() {
            return Err(StoreError::new(
                codes::VALIDATION_ERROR,
                "table name must not be empty",
            ));
        }
        self.conn
            .execute(
                "INSERT OR IGNORE INTO store_tables (name) VALUES (?1);",
                [name],
            )
            .map_err(internal)?;
        Ok(())
    }
}

impl<'conn> StoreClient for SqliteStore<'conn> {
    type Table = SqliteTableClient<'conn>;

    fn bind_table(&self, name: &str) -> StoreResult<Self::Table> {
        let registered: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM store_tables WHERE name = ?1;",
                [name],
                |row| row.get(0),
            )
            .optional()
            .map_err(internal)?;

        if registered.is_none() {
            return Err(StoreError::new(
                codes::RESOURCE_NOT_FOUND,
                format!("table `{name}` does not exist"),
            ));
        }

        Ok(SqliteTableClient {
            conn: self.conn,
            table: name.to_string(),
        })
    }
}

/// Table handle bound to one catalog entry.
#[derive(Debug)]
pub struct SqliteTableClient<'conn> {
    conn: &'conn Connection,
    table: String,
}

impl SqliteTableClient<'_> {
    fn require_id<'item>(&self, item: &'item Item) -> StoreResult<&'item str> {
        item.id().ok_or_else(|| {
            StoreError::new(
                codes::VALIDATION_ERROR,
                format!("item written to `{}` is missing a usable `{ID_FIELD}`", self.table),
            )
        })
    }

    fn write_item(&self, id: &str, item: &Item) -> StoreResult<()> {
        let doc = serde_json::to_string(item).map_err(internal)?;
        self.conn
            .execute(
                "INSERT INTO store_items (table_name, item_id, doc)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (table_name, item_id) DO UPDATE SET doc = excluded.doc;",
                params![self.table, id, doc],
            )
            .map_err(internal)?;
        Ok(())
    }

    fn read_page(&self, limit: usize, start: Option<&ScanCursor>) -> StoreResult<ScanPage> {
        let after = start.map(ScanCursor::as_str).unwrap_or("");
        let mut stmt = self
            .conn
            .prepare(
                "SELECT item_id, doc FROM store_items
                 WHERE table_name = ?1 AND item_id > ?2
                 ORDER BY item_id
                 LIMIT ?3;",
            )
            .map_err(internal)?;

        let mut rows = stmt
            .query(params![self.table, after, limit as i64])
            .map_err(internal)?;

        let mut items = Vec::new();
        let mut last_id = None;
        while let Some(row) = rows.next().map_err(internal)? {
            let id: String = row.get(0).map_err(internal)?;
            let doc: String = row.get(1).map_err(internal)?;
            items.push(decode_doc(&self.table, &id, &doc)?);
            last_id = Some(id);
        }

        // The cursor is handed out whenever the page filled up, even if the
        // table happens to end exactly at the boundary; the follow-up scan
        // then returns an empty, cursor-less page.
        let cursor = (items.len() == limit)
            .then(|| last_id.map(ScanCursor::new))
            .flatten();

        Ok(ScanPage { items, cursor })
    }
}

impl TableClient for SqliteTableClient<'_> {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn put_item(&self, item: &Item) -> StoreResult<()> {
        let id = self.require_id(item)?;
        self.write_item(id, item)
    }

    fn batch_put(&self, items: &[Item]) -> StoreResult<()> {
        for chunk in items.chunks(BATCH_MAX_ITEMS) {
            let tx = self.conn.unchecked_transaction().map_err(internal)?;
            for item in chunk {
                let id = self.require_id(item)?;
                self.write_item(id, item)?;
            }
            tx.commit().map_err(internal)?;
        }
        Ok(())
    }

    fn get_item(&self, id: &str) -> StoreResult<Option<Item>> {
        let doc: Option<String> = self
            .conn
            .query_row(
                "SELECT doc FROM store_items WHERE table_name = ?1 AND item_id = ?2;",
                params![self.table, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(internal)?;

        match doc {
            Some(doc) => Ok(Some(decode_doc(&self.table, id, &doc)?)),
            None => Ok(None),
        }
    }

    fn update_item(&self, id: &str, input: &UpdateInput) -> StoreResult<Item> {
        let existing = self.get_item(id)?;
        let ctx = ExpressionContext::new(&input.values, &input.names);

        if let Some(condition) = input.condition_expression.as_deref() {
            if !eval_condition(existing.as_ref(), condition, &ctx)? {
                return Err(StoreError::new(
                    codes::CONDITIONAL_CHECK_FAILED,
                    "The conditional request failed",
                ));
            }
        }

        // Without a condition the store upserts, so start from a bare item.
        let mut working = existing.unwrap_or_else(|| Item::with_id(id));
        let updated = apply_update(&mut working, &input.update_expression, &ctx)?;

        if updated.get(ID_FIELD).is_some() {
            return Err(StoreError::new(
                codes::VALIDATION_ERROR,
                format!("key attribute `{ID_FIELD}` cannot be updated"),
            ));
        }
        if working.validate().is_err() {
            return Err(StoreError::new(
                codes::VALIDATION_ERROR,
                format!("update would leave item `{id}` without a usable `{ID_FIELD}`"),
            ));
        }

        self.write_item(id, &working)?;
        Ok(updated)
    }

    fn scan(&self, limit: u32, start: Option<&ScanCursor>) -> StoreResult<ScanPage> {
        if limit == 0 {
            return Err(StoreError::new(
                codes::VALIDATION_ERROR,
                "scan limit must be at least 1",
            ));
        }
        self.read_page(limit as usize, start)
    }

    fn delete_item(&self, id: &str) -> StoreResult<()> {
        self.conn
            .execute(
                "DELETE FROM store_items WHERE table_name = ?1 AND item_id = ?2;",
                params![self.table, id],
            )
            .map_err(internal)?;
        Ok(())
    }

    fn query(&self, filter: &FilterExpression) -> StoreResult<ScanPage> {
        let page = self.read_page(QUERY_PAGE_ITEMS, None)?;
        let ctx = ExpressionContext::new(&filter.values, &filter.names);

        let mut items = Vec::new();
        for item in page.items {
            if eval_filter(&item, &filter.expression, &ctx)? {
                items.push(item);
            }
        }

        Ok(ScanPage {
            items,
            cursor: page.cursor,
        })
    }
}

fn decode_doc(table: &str, id: &str, doc: &str) -> StoreResult<Item> {
    serde_json::from_str(doc).map_err(|err| {
        StoreError::new(
            codes::INTERNAL_ERROR,
            format!("invalid stored document for `{id}` in `{table}`: {err}"),
        )
    })
}

fn internal(err: impl std::fmt::Display) -> StoreError {
    StoreError::new(codes::INTERNAL_ERROR, err.to_string())
}
