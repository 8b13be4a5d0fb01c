//! silo-db - Warehouse gateway for Silo
//!
//! This crate provides the `Warehouse` trait describing the control-plane and
//! data-plane operations the migration engine needs, a portable table-schema
//! description, and a DuckDB implementation that models datasets as schemas.

pub mod duckdb;
pub mod error;
pub mod schema;
pub mod traits;

pub use duckdb::DuckDbWarehouse;
pub use error::{DbError, DbResult};
pub use schema::{Field, FieldType, TableSchema};
pub use traits::{QueryOutput, SqlParam, Warehouse};
