//! Table-name → schema + heap + index mapping. Persists to a plain-text
//! `catalog.meta` file in the database directory:
//!
//! ```text
//! <table_count>
//! <name> <col_count> <index_col> <index_root_page>
//! <col_name> <col_type>          (x col_count)
//! ...                            (repeat per table)
//! ```
//!
//! `index_col` is the auto-indexed column's ordinal, or -1 if the table
//! carries no index. `CREATE TABLE` always auto-indexes column 0, so in
//! practice every table has one. `index_root_page` is rewritten to the
//! tree's live root on every call that can move it (inserts that split
//! the root), not just captured once at creation time.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use btree::BPlusTree;
use buffer::TableHeap;
use common::{DbError, DbResult};
use storage::PageManager;
use types::SqlType;

const CATALOG_FILE: &str = "catalog.meta";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub ty: SqlType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Column {
            name: name.into(),
            ty,
        }
    }
}

/// A live, open table: its declared schema plus the heap and (optional)
/// secondary index backing it on disk.
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub heap: TableHeap,
    pub index: Option<BPlusTree>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> DbResult<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| DbError::Catalog(format!("unknown column '{name}'")))
    }

    pub fn schema(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// The indexed column's ordinal, if this table has one. By
    /// convention it's always column 0 when present.
    pub fn index_column(&self) -> Option<usize> {
        self.index.as_ref().map(|_| 0)
    }
}

/// Open tables for one database directory, backed by `catalog.meta`.
pub struct Catalog {
    data_dir: PathBuf,
    buffer_pool_pages: usize,
    tables: HashMap<String, Table>,
}

impl Catalog {
    /// Opens (or creates) the catalog rooted at `data_dir`, reopening
    /// every table's heap and rebinding its index from the persisted
    /// root page id.
    pub fn open(data_dir: impl Into<PathBuf>, buffer_pool_pages: usize) -> DbResult<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;

        let mut catalog = Catalog {
            data_dir,
            buffer_pool_pages,
            tables: HashMap::new(),
        };

        let meta_path = catalog.data_dir.join(CATALOG_FILE);
        if meta_path.exists() {
            catalog.load(&meta_path)?;
        }
        Ok(catalog)
    }

    fn load(&mut self, meta_path: &std::path::Path) -> DbResult<()> {
        let text = fs::read_to_string(meta_path)?;
        let mut lines = text.lines();

        let table_count: usize = lines
            .next()
            .ok_or_else(|| DbError::Catalog("empty catalog.meta".into()))?
            .trim()
            .parse()
            .map_err(|_| DbError::Catalog("malformed catalog.meta header".into()))?;

        for _ in 0..table_count {
            let header = lines
                .next()
                .ok_or_else(|| DbError::Catalog("truncated catalog.meta".into()))?;
            let mut parts = header.split_whitespace();
            let name = parts
                .next()
                .ok_or_else(|| DbError::Catalog("missing table name".into()))?
                .to_string();
            let col_count: usize = parts
                .next()
                .ok_or_else(|| DbError::Catalog("missing column count".into()))?
                .parse()
                .map_err(|_| DbError::Catalog("malformed column count".into()))?;
            let index_col: i32 = parts
                .next()
                .ok_or_else(|| DbError::Catalog("missing index column".into()))?
                .parse()
                .map_err(|_| DbError::Catalog("malformed index column".into()))?;
            let index_root_page: u32 = parts
                .next()
                .ok_or_else(|| DbError::Catalog("missing index root page".into()))?
                .parse()
                .map_err(|_| DbError::Catalog("malformed index root page".into()))?;

            let mut columns = Vec::with_capacity(col_count);
            for _ in 0..col_count {
                let line = lines
                    .next()
                    .ok_or_else(|| DbError::Catalog("truncated column list".into()))?;
                let mut parts = line.split_whitespace();
                let col_name = parts
                    .next()
                    .ok_or_else(|| DbError::Catalog("missing column name".into()))?
                    .to_string();
                let ty_name = parts
                    .next()
                    .ok_or_else(|| DbError::Catalog("missing column type".into()))?;
                let ty = SqlType::from_name(ty_name)
                    .ok_or_else(|| DbError::Catalog(format!("unknown column type '{ty_name}'")))?;
                columns.push(Column::new(col_name, ty));
            }

            let manager = PageManager::open(self.table_path(&name))?;
            let heap = TableHeap::open(manager, self.buffer_pool_pages)?;
            let index = if index_col >= 0 {
                Some(BPlusTree::open(index_root_page))
            } else {
                None
            };

            self.tables.insert(
                name.to_lowercase(),
                Table {
                    name,
                    columns,
                    heap,
                    index,
                },
            );
        }

        Ok(())
    }

    /// Creates a table with a fresh backing file and auto-indexes its
    /// first column.
    pub fn create_table(&mut self, name: &str, columns: Vec<Column>) -> DbResult<()> {
        let key = name.to_lowercase();
        if self.tables.contains_key(&key) {
            return Err(DbError::Catalog(format!("table '{name}' already exists")));
        }
        if columns.is_empty() {
            return Err(DbError::Catalog(
                "table must have at least one column".into(),
            ));
        }

        let manager = PageManager::open(self.table_path(name))?;
        let mut heap = TableHeap::open(manager, self.buffer_pool_pages)?;
        let index = Some(BPlusTree::create(heap.pool_mut())?);

        self.tables.insert(
            key,
            Table {
                name: name.to_string(),
                columns,
                heap,
                index,
            },
        );
        self.persist()?;
        tracing::debug!(table = name, "created table");
        Ok(())
    }

    /// Unregisters the table, rewrites `catalog.meta`, and removes its
    /// backing `.db` file.
    pub fn drop_table(&mut self, name: &str) -> DbResult<()> {
        let key = name.to_lowercase();
        let table = self
            .tables
            .remove(&key)
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))?;
        let path = self.table_path(&table.name);
        drop(table);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        self.persist()?;
        tracing::debug!(table = name, "dropped table");
        Ok(())
    }

    pub fn table(&self, name: &str) -> DbResult<&Table> {
        self.tables
            .get(&name.to_lowercase())
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))
    }

    pub fn table_mut(&mut self, name: &str) -> DbResult<&mut Table> {
        self.tables
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| DbError::Catalog(format!("unknown table '{name}'")))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.values().map(|t| t.name.as_str())
    }

    /// Rewrites `catalog.meta` so every table's `index_root_page`
    /// reflects its tree's current root. Callers invoke this after any
    /// insert that may have split the root.
    pub fn sync_index_roots(&mut self) -> DbResult<()> {
        self.persist()
    }

    pub fn flush_all(&mut self) -> DbResult<()> {
        for table in self.tables.values_mut() {
            table.heap.flush_all()?;
        }
        Ok(())
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{name}.db"))
    }

    fn persist(&mut self) -> DbResult<()> {
        let mut out = String::new();
        out.push_str(&format!("{}\n", self.tables.len()));
        for table in self.tables.values() {
            let index_col: i32 = if table.index.is_some() { 0 } else { -1 };
            let index_root = table.index.as_ref().map(|t| t.root_page_id()).unwrap_or(0);
            out.push_str(&format!(
                "{} {} {} {}\n",
                table.name,
                table.columns.len(),
                index_col,
                index_root
            ));
            for col in &table.columns {
                out.push_str(&format!("{} {}\n", col.name, col.ty.name()));
            }
        }
        fs::write(self.data_dir.join(CATALOG_FILE), out)?;
        tracing::debug!(table_count = self.tables.len(), "persisted catalog");
        Ok(())
    }
}
