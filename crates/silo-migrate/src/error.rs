//! Error types for the migration engine.

use silo_db::DbError;
use std::fmt;
use thiserror::Error;

/// Phase of the apply protocol a migration failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Setup,
    Backup,
    Execute,
    Record,
    Cleanup,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Setup => "setup",
            Phase::Backup => "backup",
            Phase::Execute => "execute",
            Phase::Record => "record",
            Phase::Cleanup => "cleanup",
        };
        f.write_str(s)
    }
}

/// Migration engine errors.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Malformed migration name (M001).
    #[error("[M001] Invalid migration name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Two registered migrations share a number (M002).
    #[error("[M002] Migration number {number} already registered by '{existing}'")]
    DuplicateNumber { number: u32, existing: String },

    /// A registered migration has no run hook (M003).
    #[error("[M003] Migration '{name}' has no run hook")]
    MissingRun { name: String },

    /// Warehouse failure outside any single migration (M004).
    #[error("[M004] Warehouse error: {0}")]
    Warehouse(#[from] DbError),

    /// A just-created object never became visible to metadata reads (M005).
    #[error("[M005] '{object}' not visible after {attempts} attempts")]
    VisibilityTimeout { object: String, attempts: u32 },

    /// A migration failed in a phase other than execute (M006).
    #[error("[M006] Migration '{name}' failed during {phase}: {source}")]
    PhaseFailed {
        name: String,
        phase: Phase,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The run hook failed and the backups were restored (M007).
    #[error("[M007] Migration '{name}' failed, backups restored: {run_error}")]
    ExecutionFailed {
        name: String,
        run_error: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A failure required restoring the backups and the restore failed too;
    /// the backup copies are left in place for manual recovery (M008).
    #[error(
        "[M008] Migration '{name}' failed and restoring backups failed, \
         backup copies retained: cause: {cause}; revert error: {revert_error}"
    )]
    RevertFailed {
        name: String,
        cause: Box<dyn std::error::Error + Send + Sync>,
        revert_error: DbError,
    },

    /// The migration log holds a row this engine cannot interpret (M009).
    #[error("[M009] Malformed migration log row: {0}")]
    MalformedLogRow(String),
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;
