//! Top-level handle wiring the catalog, parser, and executor together
//! for a single on-disk database directory.


use catalog::Catalog;
use common::{Config, DbResult, RecordBatch};
use executor::ExecResult;

/// Outcome of running one statement through [`Database::execute`].
#[derive(Debug)]
pub enum QueryResult {
    Rows(RecordBatch),
    Created,
    Inserted(usize),
    Deleted(usize),
}

impl From<ExecResult> for QueryResult {
    fn from(result: ExecResult) -> Self {
        match result {
            ExecResult::Created => QueryResult::Created,
            ExecResult::Inserted(n) => QueryResult::Inserted(n),
            ExecResult::Deleted(n) => QueryResult::Deleted(n),
            ExecResult::Rows(batch) => QueryResult::Rows(batch),
        }
    }
}

/// A database directory: its catalog of open tables plus the config it
/// was opened with. Owns every heap file and index it has touched.
pub struct Database {
    catalog: Catalog,
}

impl Database {
    /// Opens (or creates) the database at `config.data_dir`, reopening
    /// every table the catalog finds there.
    pub fn open(config: Config) -> DbResult<Self> {
        let catalog = Catalog::open(config.data_dir, config.buffer_pool_pages)?;
        Ok(Database { catalog })
    }

    /// Parses `sql` and runs every statement it contains in order,
    /// returning the result of each.
    pub fn execute(&mut self, sql: &str) -> DbResult<Vec<QueryResult>> {
        let statements = parser::parse_sql(sql)?;
        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            tracing::debug!(?statement, "executing statement");
            results.push(executor::execute(statement, &mut self.catalog)?.into());
        }
        Ok(results)
    }

    /// Flushes every dirty page across every open table.
    pub fn flush_all(&mut self) -> DbResult<()> {
        self.catalog.flush_all()
    }

    /// Closes the database, flushing all open tables first.
    pub fn close(mut self) -> DbResult<()> {
        self.flush_all()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.catalog.table_names()
    }
}
