//! Migration registry: an explicit, ordered collection of migrations.
//!
//! Built once during process setup and handed to the
//! [`Migrator`](crate::Migrator); not shared process-wide state, so tests can
//! hold independent registries.

use crate::error::{MigrateError, MigrateResult};
use crate::migration::{parse_migration_number, Migration};
use std::collections::BTreeMap;

/// Registry of migrations keyed by their derived number.
#[derive(Default)]
pub struct Registry {
    migrations: BTreeMap<u32, Migration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a migration.
    ///
    /// Fails with `[M001]` for a malformed name and `[M002]` when the derived
    /// number is already taken; in both cases the registry is unchanged and
    /// the first registrant of a number wins.
    pub fn register(&mut self, mut migration: Migration) -> MigrateResult<()> {
        let number = parse_migration_number(&migration.name)?;
        if let Some(existing) = self.migrations.get(&number) {
            return Err(MigrateError::DuplicateNumber {
                number,
                existing: existing.name.clone(),
            });
        }
        migration.number = number;
        self.migrations.insert(number, migration);
        Ok(())
    }

    /// All registered migrations, ascending by number.
    pub fn ordered(&self) -> impl Iterator<Item = &Migration> {
        self.migrations.values()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
