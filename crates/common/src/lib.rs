#[cfg(test)]
mod tests;

pub mod pretty;

use serde::{Deserialize, Serialize};
use std::{io, path::PathBuf};
use thiserror::Error;
use types::Value;

/// Identifier for a column within a table schema, by ordinal position.
pub type ColumnId = u16;

/// Logical identifier for a page within a single table file.
/// Examples:
/// - `let header_page: PageId = 0;`
/// - `let first_data_page: PageId = 1;`
pub type PageId = u32;

/// Fully-qualified, stable locator for a tuple within a table.
/// `(0, 0)` is the reserved invalid sentinel (see [`RecordId::invalid`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    pub const fn invalid() -> Self {
        RecordId { page_id: 0, slot: 0 }
    }

    pub fn is_valid(&self) -> bool {
        *self != Self::invalid()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Positional row representation backed by `types::Value`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
    #[serde(skip)]
    #[serde(default)]
    rid: Option<RecordId>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values, rid: None }
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self::new(values)
    }

    pub fn with_rid(mut self, rid: RecordId) -> Self {
        self.rid = Some(rid);
        self
    }

    pub fn set_rid(&mut self, rid: Option<RecordId>) {
        self.rid = rid;
    }

    pub fn rid(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Row::new(values)
    }
}

/// Rectangular result set carrying column labels and rows, as returned
/// from a SELECT to the REPL.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordBatch {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Canonical error type shared across every crate in the engine.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("parse: {0}")]
    Parser(String),
    #[error("catalog: {0}")]
    Catalog(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("buffer pool exhausted: no unpinned frame available")]
    PoolExhausted,
    #[error("type error: {0}")]
    TypeError(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Runtime configuration for the database components.
///
/// Page size is deliberately not configurable here: it is a compile-time
/// constant (`storage::PAGE_SIZE`) because variable page sizes are out of
/// scope for this engine.
///
/// # Example
/// ```
/// use common::Config;
/// use std::path::PathBuf;
///
/// let config = Config::builder()
///     .data_dir(PathBuf::from("./my_db"))
///     .buffer_pool_pages(512)
///     .build();
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct Config {
    /// Directory where table files and the catalog metadata file live.
    #[builder(default = PathBuf::from("."))]
    pub data_dir: PathBuf,
    /// Number of frames the buffer pool keeps resident, per table file.
    #[builder(default = 128)]
    pub buffer_pool_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            buffer_pool_pages: 128,
        }
    }
}

/// Convenient re-exports for downstream crates.
pub mod prelude {
    pub use crate::{Config, DbError, DbResult, RecordBatch, Row};
    pub use types::{SqlType, Value};
}
