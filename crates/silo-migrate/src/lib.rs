//! Migration engine for Silo.
//!
//! Applies an ordered sequence of irreversible schema/data migrations against
//! a columnar warehouse, tracking which have run in a migration-log table and
//! providing a best-effort backup-copy-and-revert safety net when a migration
//! fails partway through. The warehouse itself is reached through the
//! [`silo_db::Warehouse`] trait.
//!
//! Typical use: build a [`Registry`] at process start, register migrations,
//! hand the registry and a warehouse handle to a [`Migrator`], and call
//! [`Migrator::migrate`].

pub mod error;
pub mod log_table;
pub mod migration;
pub mod migrator;
pub mod registry;
pub mod retry;
pub mod target;

pub use error::{MigrateError, MigrateResult, Phase};
pub use log_table::MigrationLogEntry;
pub use migration::{
    parse_migration_number, HookFuture, Migration, MigrationInfo, RunFn, SetupFn, SetupFuture,
};
pub use migrator::{MigrateSummary, Migrator};
pub use registry::Registry;
pub use retry::{poll_until, PollOutcome};
pub use target::{Dataset, Target};
