//! Migration orchestration engine.
//!
//! Walks the registry in ascending numeric order and, for each migration not
//! yet recorded in the log, runs the setup -> backup -> execute -> record ->
//! cleanup protocol, reverting the touched tables from their backup copies
//! when the run hook or the log insert fails. The first failure aborts the
//! run; migrations after it are not attempted.

use crate::error::{MigrateError, MigrateResult, Phase};
use crate::log_table::{
    self, MigrationLogEntry, DEFAULT_LOG_DATASET, DEFAULT_LOG_TABLE,
};
use crate::migration::{parse_migration_number, Migration, RunFn};
use crate::registry::Registry;
use crate::retry::{poll_until, PollOutcome};
use crate::target::Target;
use serde::{Deserialize, Serialize};
use silo_db::{DbResult, SqlParam, Warehouse};
use std::sync::Arc;
use std::time::Duration;

/// Attempt budget for waiting on a just-created object to become visible.
const VISIBILITY_ATTEMPTS: u32 = 12;
const VISIBILITY_DELAY: Duration = Duration::from_secs(5);

/// What one `migrate` invocation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateSummary {
    /// Names of migrations applied by this invocation, in order.
    pub applied: Vec<String>,
    /// Names skipped because they were at or below the resume point.
    pub skipped: Vec<String>,
}

/// The orchestration engine.
///
/// Owns no durable state; everything durable lives in the warehouse. The
/// run is strictly sequential: later migrations may depend on earlier ones'
/// completed state.
pub struct Migrator {
    warehouse: Arc<dyn Warehouse>,
    registry: Registry,
    log_dataset: String,
    log_table: String,
}

impl Migrator {
    pub fn new(warehouse: Arc<dyn Warehouse>, registry: Registry) -> Self {
        Self {
            warehouse,
            registry,
            log_dataset: DEFAULT_LOG_DATASET.to_string(),
            log_table: DEFAULT_LOG_TABLE.to_string(),
        }
    }

    /// Override the dataset holding the migration log.
    pub fn with_log_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.log_dataset = dataset.into();
        self
    }

    /// Override the migration log table name.
    pub fn with_log_table(mut self, table: impl Into<String>) -> Self {
        self.log_table = table.into();
        self
    }

    /// Run every unapplied migration, in ascending numeric order.
    pub async fn migrate(&self) -> MigrateResult<MigrateSummary> {
        log::info!(
            "Preparing migration log {}.{} on {}",
            self.log_dataset,
            self.log_table,
            self.warehouse.warehouse_type()
        );
        self.bootstrap().await?;

        let resume = self.resume_point().await?;
        log::info!("Resume point: {resume}");

        let mut summary = MigrateSummary::default();
        for migration in self.registry.ordered() {
            if migration.number() <= resume {
                log::info!("{} already run", migration.name);
                summary.skipped.push(migration.name.clone());
                continue;
            }
            let Some(run) = migration.run.as_ref() else {
                return Err(MigrateError::MissingRun {
                    name: migration.name.clone(),
                });
            };
            self.apply(migration, run).await?;
            summary.applied.push(migration.name.clone());
        }
        Ok(summary)
    }

    /// The full migration log in applied order, for auditing.
    pub async fn history(&self) -> MigrateResult<Vec<MigrationLogEntry>> {
        let sql = log_table::history_sql(&self.log_dataset, &self.log_table);
        let out = self.warehouse.query(&sql, &[]).await?;
        if out.columns.as_slice() != ["name", "description", "applied_ms", "datasets"] {
            return Err(MigrateError::MalformedLogRow(format!(
                "unexpected history columns: {:?}",
                out.columns
            )));
        }

        let mut entries = Vec::with_capacity(out.rows.len());
        for row in &out.rows {
            let [name, description, applied_ms, datasets] = row.as_slice() else {
                return Err(MigrateError::MalformedLogRow(format!(
                    "expected 4 cells, got {}",
                    row.len()
                )));
            };
            let millis: i64 = applied_ms.parse().map_err(|_| {
                MigrateError::MalformedLogRow(format!("bad timestamp '{applied_ms}'"))
            })?;
            let applied_at = chrono::DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                MigrateError::MalformedLogRow(format!("timestamp out of range: {millis}"))
            })?;
            entries.push(MigrationLogEntry {
                name: name.clone(),
                description: description.clone(),
                applied_at,
                datasets: datasets.clone(),
            });
        }
        Ok(entries)
    }

    /// Ensure the log dataset and table exist and are visible to metadata
    /// reads before the first log query.
    async fn bootstrap(&self) -> MigrateResult<()> {
        let wh = self.warehouse.as_ref();

        wh.create_dataset_if_absent(&self.log_dataset).await?;
        self.wait_visible(&self.log_dataset, None).await?;

        let exists = wh
            .create_table_if_absent(&self.log_dataset, &self.log_table, &log_table::log_schema())
            .await?;
        if !exists {
            log::debug!(
                "{}.{} not yet reported by create, polling",
                self.log_dataset,
                self.log_table
            );
        }
        self.wait_visible(&self.log_dataset, Some(&self.log_table))
            .await
    }

    /// Poll the metadata probe for a dataset (or table) until it is visible.
    async fn wait_visible(&self, dataset: &str, table: Option<&str>) -> MigrateResult<()> {
        let wh = self.warehouse.as_ref();
        let outcome = poll_until(VISIBILITY_ATTEMPTS, VISIBILITY_DELAY, || async move {
            match table {
                Some(t) => wh.table_exists(dataset, t).await,
                None => wh.dataset_exists(dataset).await,
            }
        })
        .await;

        let object = match table {
            Some(t) => format!("{dataset}.{t}"),
            None => dataset.to_string(),
        };
        match outcome {
            PollOutcome::Satisfied { attempts } => {
                log::debug!("'{object}' visible after {attempts} attempt(s)");
                Ok(())
            }
            PollOutcome::Exhausted { attempts } => {
                Err(MigrateError::VisibilityTimeout { object, attempts })
            }
            PollOutcome::ProbeFailed(e) => Err(MigrateError::Warehouse(e)),
        }
    }

    /// Highest migration number recorded in the log, 0 when the log is empty.
    async fn resume_point(&self) -> MigrateResult<u32> {
        let sql = log_table::names_sql(&self.log_dataset, &self.log_table);
        let out = self.warehouse.query(&sql, &[]).await?;
        if out.columns.as_slice() != ["name"] {
            return Err(MigrateError::MalformedLogRow(format!(
                "expected a single name column, got {:?}",
                out.columns
            )));
        }

        let mut resume = 0;
        for row in &out.rows {
            let name = row.first().ok_or_else(|| {
                MigrateError::MalformedLogRow("empty log row".to_string())
            })?;
            let number = parse_migration_number(name)
                .map_err(|e| MigrateError::MalformedLogRow(e.to_string()))?;
            resume = resume.max(number);
        }
        Ok(resume)
    }

    /// Apply one migration: setup, backup, execute, record, cleanup.
    ///
    /// A failure in the execute or record phase reverts the touched tables
    /// from their backups; a cleanup failure does not (the migration is
    /// already recorded, only the `_copy` tables leak).
    async fn apply(&self, migration: &Migration, run: &RunFn) -> MigrateResult<()> {
        let name = migration.name.clone();

        // Setup may rewrite the target; everything after uses the result.
        let mut target = migration.target.clone();
        if let Some(setup) = &migration.setup {
            log::info!("Running migration setup: {name}");
            target = setup(Arc::clone(&self.warehouse), migration.info(&target))
                .await
                .map_err(|e| MigrateError::PhaseFailed {
                    name: name.clone(),
                    phase: Phase::Setup,
                    source: e.into(),
                })?;
        } else {
            log::debug!("No setup hook: {name}");
        }

        log::info!("Creating backup copies: {name}");
        for (dataset, table) in target.table_pairs() {
            self.warehouse
                .copy_table(dataset, table, &backup_table_name(table))
                .await
                .map_err(|e| MigrateError::PhaseFailed {
                    name: name.clone(),
                    phase: Phase::Backup,
                    source: Box::new(e),
                })?;
        }

        log::info!("Running migration: {name}");
        if let Err(run_error) = run(Arc::clone(&self.warehouse), migration.info(&target)).await {
            log::warn!("Migration {name} failed, reverting tables to their backups");
            return Err(match self.revert(&target).await {
                Ok(()) => MigrateError::ExecutionFailed {
                    name,
                    run_error: run_error.into(),
                },
                Err(revert_error) => MigrateError::RevertFailed {
                    name,
                    cause: run_error.into(),
                    revert_error,
                },
            });
        }

        log::info!("Recording migration in the log: {name}");
        let sql = log_table::insert_log_row_sql(&self.log_dataset, &self.log_table, &target);
        let recorded = self
            .warehouse
            .execute(
                &sql,
                &[
                    SqlParam::Text(migration.name.clone()),
                    SqlParam::Text(migration.description.clone()),
                ],
            )
            .await;
        // An unrecorded migration must not keep its effects: the log row is
        // the source of truth, so restore the originals and let a re-run
        // start from pre-migration state.
        if let Err(record_error) = recorded {
            log::warn!("Recording {name} failed, reverting tables to their backups");
            return Err(match self.revert(&target).await {
                Ok(()) => MigrateError::PhaseFailed {
                    name,
                    phase: Phase::Record,
                    source: Box::new(record_error),
                },
                Err(revert_error) => MigrateError::RevertFailed {
                    name,
                    cause: Box::new(record_error),
                    revert_error,
                },
            });
        }

        log::info!("Deleting backup copies: {name}");
        self.delete_backups(&target)
            .await
            .map_err(|e| MigrateError::PhaseFailed {
                name: name.clone(),
                phase: Phase::Cleanup,
                source: Box::new(e),
            })?;

        log::info!("Completed migration: {name}");
        Ok(())
    }

    /// Best-effort restore: copy every backup back over its original, then
    /// delete the backups. On failure the copies are deliberately retained
    /// for manual recovery.
    async fn revert(&self, target: &Target) -> DbResult<()> {
        for (dataset, table) in target.table_pairs() {
            self.warehouse
                .copy_table(dataset, &backup_table_name(table), table)
                .await?;
        }
        self.delete_backups(target).await
    }

    async fn delete_backups(&self, target: &Target) -> DbResult<()> {
        for (dataset, table) in target.table_pairs() {
            self.warehouse
                .delete_table(dataset, &backup_table_name(table))
                .await?;
        }
        Ok(())
    }
}

/// Sibling name of a table's backup copy.
pub(crate) fn backup_table_name(table: &str) -> String {
    format!("{table}_copy")
}

#[cfg(test)]
#[path = "migrator_test.rs"]
mod tests;
