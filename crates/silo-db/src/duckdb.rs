//! DuckDB warehouse backend implementation
//!
//! Datasets map to DuckDB schemas. DuckDB's catalog is immediately
//! consistent, so the existence probes never lag here, but the trait contract
//! (poll-until-visible) is honored all the same.

use crate::error::{DbError, DbResult};
use crate::schema::{Field, FieldType, TableSchema};
use crate::traits::{QueryOutput, SqlParam, Warehouse};
use async_trait::async_trait;
use duckdb::{Connection, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// DuckDB warehouse backend
pub struct DuckDbWarehouse {
    conn: Mutex<Connection>,
}

/// Quote an identifier for DuckDB, doubling embedded quotes.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Render `dataset.table` with both parts quoted.
fn qualified(dataset: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(dataset), quote_ident(table))
}

/// Render a schema field's DuckDB type, including `[]` for repeated fields.
fn render_type(field: &Field) -> String {
    let base = match &field.field_type {
        FieldType::String => "VARCHAR".to_string(),
        FieldType::Timestamp => "TIMESTAMP".to_string(),
        FieldType::Record(fields) => {
            let inner: Vec<String> = fields
                .iter()
                .map(|f| format!("{} {}", quote_ident(&f.name), render_type(f)))
                .collect();
            format!("STRUCT({})", inner.join(", "))
        }
    };
    if field.repeated {
        format!("{base}[]")
    } else {
        base
    }
}

/// Render a full column list for CREATE TABLE.
///
/// `required` becomes NOT NULL on top-level columns only; DuckDB struct
/// members cannot carry constraints.
fn render_columns(schema: &TableSchema) -> String {
    let cols: Vec<String> = schema
        .fields
        .iter()
        .map(|f| {
            let mut col = format!("{} {}", quote_ident(&f.name), render_type(f));
            if f.required {
                col.push_str(" NOT NULL");
            }
            col
        })
        .collect();
    cols.join(", ")
}

/// Read a column value as a String, trying multiple DuckDB types.
fn get_column_as_string(row: &duckdb::Row<'_>, idx: usize) -> String {
    if let Ok(Some(s)) = row.get::<_, Option<String>>(idx) {
        return s;
    }
    if let Ok(Some(n)) = row.get::<_, Option<i64>>(idx) {
        return n.to_string();
    }
    if let Ok(Some(f)) = row.get::<_, Option<f64>>(idx) {
        return f.to_string();
    }
    if let Ok(Some(b)) = row.get::<_, Option<bool>>(idx) {
        return b.to_string();
    }
    "null".to_string()
}

impl DuckDbWarehouse {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute SQL synchronously
    fn execute_sync(&self, sql: &str, params: &[SqlParam]) -> DbResult<usize> {
        let conn = self.lock()?;
        let bound: Vec<&dyn ToSql> = params
            .iter()
            .map(|p| match p {
                SqlParam::Text(s) => s as &dyn ToSql,
                SqlParam::Int(i) => i as &dyn ToSql,
            })
            .collect();
        conn.execute(sql, bound.as_slice())
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    /// Query synchronously, stringifying every cell.
    ///
    /// DuckDB panics on `stmt.column_count()` before execution, so rows are
    /// collected via `query_map` first, then column metadata is read.
    fn query_sync(&self, sql: &str, params: &[SqlParam]) -> DbResult<QueryOutput> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?;
        let bound: Vec<&dyn ToSql> = params
            .iter()
            .map(|p| match p {
                SqlParam::Text(s) => s as &dyn ToSql,
                SqlParam::Int(i) => i as &dyn ToSql,
            })
            .collect();

        let rows: Vec<Vec<String>> = stmt
            .query_map(bound.as_slice(), |row| {
                let col_count = row.as_ref().column_count();
                Ok((0..col_count)
                    .map(|i| get_column_as_string(row, i))
                    .collect())
            })
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DbError::from)?;

        let columns: Vec<String> = (0..stmt.column_count())
            .map(|i| {
                stmt.column_name(i)
                    .map_or("?".to_string(), |v| v.to_string())
            })
            .collect();

        Ok(QueryOutput { columns, rows })
    }

    /// Count rows in an information_schema probe.
    fn probe_count(&self, sql: &str, params: &[SqlParam]) -> DbResult<bool> {
        let out = self.query_sync(sql, params)?;
        let cell = out
            .rows
            .first()
            .and_then(|r| r.first())
            .ok_or_else(|| DbError::UnexpectedShape("probe returned no rows".to_string()))?;
        let count: i64 = cell
            .parse()
            .map_err(|_| DbError::UnexpectedShape(format!("probe returned '{cell}'")))?;
        Ok(count > 0)
    }

    fn dataset_exists_sync(&self, dataset: &str) -> DbResult<bool> {
        self.probe_count(
            "SELECT COUNT(*) FROM information_schema.schemata WHERE schema_name = ?",
            &[SqlParam::Text(dataset.to_string())],
        )
    }

    fn table_exists_sync(&self, dataset: &str, table: &str) -> DbResult<bool> {
        self.probe_count(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = ? AND table_name = ?",
            &[
                SqlParam::Text(dataset.to_string()),
                SqlParam::Text(table.to_string()),
            ],
        )
    }

    fn routine_exists_sync(&self, routine: &str) -> DbResult<bool> {
        self.probe_count(
            "SELECT COUNT(*) FROM duckdb_functions() WHERE function_name = ?",
            &[SqlParam::Text(routine.to_string())],
        )
    }
}

#[async_trait]
impl Warehouse for DuckDbWarehouse {
    async fn create_dataset_if_absent(&self, dataset: &str) -> DbResult<()> {
        let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(dataset));
        self.execute_sync(&sql, &[])?;
        Ok(())
    }

    async fn create_table_if_absent(
        &self,
        dataset: &str,
        table: &str,
        schema: &TableSchema,
    ) -> DbResult<bool> {
        if self.table_exists_sync(dataset, table)? {
            return Ok(true);
        }
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            qualified(dataset, table),
            render_columns(schema)
        );
        self.execute_sync(&sql, &[])?;
        self.table_exists_sync(dataset, table)
    }

    async fn create_view_if_absent(&self, dataset: &str, view: &str, select: &str) -> DbResult<()> {
        if self.table_exists_sync(dataset, view)? {
            return Ok(());
        }
        let sql = format!("CREATE VIEW {} AS {}", qualified(dataset, view), select);
        self.execute_sync(&sql, &[])?;
        Ok(())
    }

    async fn create_routine_if_absent(
        &self,
        _dataset: &str,
        routine: &str,
        ddl: &str,
    ) -> DbResult<()> {
        if self.routine_exists_sync(routine)? {
            return Ok(());
        }
        self.execute_sync(ddl, &[])?;
        Ok(())
    }

    async fn dataset_exists(&self, dataset: &str) -> DbResult<bool> {
        self.dataset_exists_sync(dataset)
    }

    async fn table_exists(&self, dataset: &str, table: &str) -> DbResult<bool> {
        self.table_exists_sync(dataset, table)
    }

    async fn copy_table(&self, dataset: &str, src: &str, dst: &str) -> DbResult<()> {
        if !self.table_exists_sync(dataset, src)? {
            return Err(DbError::TableNotFound(qualified(dataset, src)));
        }
        let sql = format!(
            "CREATE OR REPLACE TABLE {} AS SELECT * FROM {}",
            qualified(dataset, dst),
            qualified(dataset, src)
        );
        self.execute_sync(&sql, &[])?;
        Ok(())
    }

    async fn delete_table(&self, dataset: &str, table: &str) -> DbResult<()> {
        let sql = format!("DROP TABLE {}", qualified(dataset, table));
        self.execute_sync(&sql, &[])?;
        Ok(())
    }

    async fn execute(&self, sql: &str, params: &[SqlParam]) -> DbResult<usize> {
        self.execute_sync(sql, params)
    }

    async fn query(&self, sql: &str, params: &[SqlParam]) -> DbResult<QueryOutput> {
        self.query_sync(sql, params)
    }

    fn warehouse_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
