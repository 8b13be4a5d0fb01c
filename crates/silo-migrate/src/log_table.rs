//! Migration log: the fixed record layout and SQL used to track applied
//! migrations.
//!
//! Rows are append-only; the maximum numeric name prefix across all rows is
//! the resume point. `name` and `description` are always bound as query
//! parameters, never interpolated.

use crate::target::Target;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use silo_db::{Field, TableSchema};

/// Default dataset holding the migration log.
pub const DEFAULT_LOG_DATASET: &str = "migrations";

/// Default migration log table name.
pub const DEFAULT_LOG_TABLE: &str = "migrations";

/// One row of the migration log, read back for auditing.
///
/// `datasets` is the manifest as the warehouse renders it, kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationLogEntry {
    pub name: String,
    pub description: String,
    pub applied_at: DateTime<Utc>,
    pub datasets: String,
}

/// Fixed schema of the migration log table.
pub fn log_schema() -> TableSchema {
    TableSchema::new(vec![
        Field::string("name").required(),
        Field::string("description").required(),
        Field::timestamp("timestamp").required(),
        Field::record(
            "datasets",
            vec![
                Field::string("dataset").required(),
                Field::string("tables").required().repeated(),
            ],
        )
        .required()
        .repeated(),
    ])
}

/// Render `dataset.table` with both parts double-quoted.
fn full_table_name(dataset: &str, table: &str) -> String {
    format!("\"{}\".\"{}\"", escape_ident(dataset), escape_ident(table))
}

fn escape_ident(ident: &str) -> String {
    ident.replace('"', "\"\"")
}

fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}

/// Render a migration target as a typed struct-array literal for the
/// `datasets` column. The explicit cast keeps an empty manifest well-typed.
pub(crate) fn render_dataset_manifest(target: &Target) -> String {
    let datasets: Vec<String> = target
        .datasets
        .iter()
        .map(|d| {
            let tables: Vec<String> = d
                .tables
                .iter()
                .map(|t| format!("'{}'", escape_literal(t)))
                .collect();
            format!(
                "{{'dataset': '{}', 'tables': [{}]}}",
                escape_literal(&d.name),
                tables.join(", ")
            )
        })
        .collect();
    format!(
        "CAST([{}] AS STRUCT(dataset VARCHAR, tables VARCHAR[])[])",
        datasets.join(", ")
    )
}

/// INSERT for one log row; `name` and `description` are the two parameters,
/// the timestamp is assigned server-side.
pub(crate) fn insert_log_row_sql(dataset: &str, table: &str, target: &Target) -> String {
    format!(
        "INSERT INTO {} (name, description, timestamp, datasets) VALUES (?, ?, CURRENT_TIMESTAMP, {})",
        full_table_name(dataset, table),
        render_dataset_manifest(target)
    )
}

/// All recorded migration names; the resume point is computed from these.
pub(crate) fn names_sql(dataset: &str, table: &str) -> String {
    format!("SELECT name FROM {}", full_table_name(dataset, table))
}

/// Full log in applied order, timestamps as epoch milliseconds.
pub(crate) fn history_sql(dataset: &str, table: &str) -> String {
    format!(
        "SELECT name, description, epoch_ms(timestamp) AS applied_ms, \
         CAST(datasets AS VARCHAR) AS datasets FROM {} ORDER BY timestamp, name",
        full_table_name(dataset, table)
    )
}

#[cfg(test)]
#[path = "log_table_test.rs"]
mod tests;
