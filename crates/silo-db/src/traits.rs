//! Warehouse trait definition

use crate::error::DbResult;
use crate::schema::TableSchema;
use async_trait::async_trait;

/// A parameter bound into a SQL statement.
///
/// Statements never interpolate caller-supplied values; anything that did not
/// originate inside this workspace is bound through one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

/// Result of a [`Warehouse::query`] call.
///
/// Cell values are stringified by the backend; callers that need typed values
/// parse them and treat parse failure as an error.
#[derive(Debug, Clone, Default)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryOutput {
    /// Total number of rows the query produced.
    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Warehouse gateway abstraction for Silo
///
/// Models the contract of a columnar warehouse's control plane: dataset and
/// table lifecycle, metadata existence probes, truncate-write table copies,
/// and parameterized SQL. Implementations must be Send + Sync for async
/// operation.
///
/// Metadata reads may lag object creation (eventual consistency); callers
/// that need a just-created object to be visible poll the existence probes.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Create a dataset if it does not already exist. Idempotent; a racing
    /// "already exists" response from the warehouse is not an error.
    async fn create_dataset_if_absent(&self, dataset: &str) -> DbResult<()>;

    /// Create a table with the given schema if it does not already exist.
    /// Returns whether the table exists after the call.
    async fn create_table_if_absent(
        &self,
        dataset: &str,
        table: &str,
        schema: &TableSchema,
    ) -> DbResult<bool>;

    /// Create a view from a SELECT statement if it does not already exist.
    async fn create_view_if_absent(&self, dataset: &str, view: &str, select: &str) -> DbResult<()>;

    /// Create a routine (table function) from its DDL if it does not already
    /// exist.
    async fn create_routine_if_absent(
        &self,
        dataset: &str,
        routine: &str,
        ddl: &str,
    ) -> DbResult<()>;

    /// Metadata probe: does the dataset exist? "Not found" is `Ok(false)`,
    /// never an error.
    async fn dataset_exists(&self, dataset: &str) -> DbResult<bool>;

    /// Metadata probe: does the table exist? "Not found" is `Ok(false)`,
    /// never an error.
    async fn table_exists(&self, dataset: &str, table: &str) -> DbResult<bool>;

    /// Copy `src` over `dst` within `dataset` with truncate-write semantics:
    /// any pre-existing `dst` is replaced. Returns only after the copy has
    /// completed, surfacing job-level failure.
    async fn copy_table(&self, dataset: &str, src: &str, dst: &str) -> DbResult<()>;

    /// Delete a table.
    async fn delete_table(&self, dataset: &str, table: &str) -> DbResult<()>;

    /// Execute a parameterized statement, returning affected rows.
    async fn execute(&self, sql: &str, params: &[SqlParam]) -> DbResult<usize>;

    /// Execute a parameterized query, returning all rows.
    async fn query(&self, sql: &str, params: &[SqlParam]) -> DbResult<QueryOutput>;

    /// Warehouse type identifier for logging
    fn warehouse_type(&self) -> &'static str;
}
