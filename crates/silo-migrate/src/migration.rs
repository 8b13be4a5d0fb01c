//! Migration model: a named, numbered, one-time transformation.

use crate::error::{MigrateError, MigrateResult};
use crate::target::Target;
use silo_db::Warehouse;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by migration hooks.
pub type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// Future returned by setup hooks; resolves to the (possibly rewritten)
/// target the rest of the apply protocol will use.
pub type SetupFuture = Pin<Box<dyn Future<Output = anyhow::Result<Target>> + Send>>;

/// Required transformation logic of a migration.
pub type RunFn = Box<dyn Fn(Arc<dyn Warehouse>, MigrationInfo) -> HookFuture + Send + Sync>;

/// Optional preparatory hook, run once before any backup is taken.
pub type SetupFn = Box<dyn Fn(Arc<dyn Warehouse>, MigrationInfo) -> SetupFuture + Send + Sync>;

/// Snapshot of a migration's definition handed to its hooks.
#[derive(Debug, Clone)]
pub struct MigrationInfo {
    pub name: String,
    pub description: String,
    pub target: Target,
}

/// A unit of change applied once against the warehouse.
///
/// `name` must match `NNNN_word(_word)*`: a 4-digit zero-padded ordinal
/// prefix followed by lowercase underscore-separated words. The prefix
/// defines the migration's position in the total order.
pub struct Migration {
    pub name: String,
    pub description: String,
    pub target: Target,
    pub setup: Option<SetupFn>,
    pub run: Option<RunFn>,
    pub(crate) number: u32,
}

impl Migration {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            target: Target::default(),
            setup: None,
            run: None,
            number: 0,
        }
    }

    /// Declare the datasets/tables this migration will touch; scopes the
    /// backup copies and the revert path.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Attach a setup hook, run before any backup. It receives the current
    /// definition and returns the target the apply protocol will use, so a
    /// migration can compute its blast radius dynamically.
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(Arc<dyn Warehouse>, MigrationInfo) -> SetupFuture + Send + Sync + 'static,
    {
        self.setup = Some(Box::new(setup));
        self
    }

    /// Attach the transformation logic. Required: a registered migration
    /// without a run hook fails the whole run before touching the warehouse.
    ///
    /// The engine records the migration only after this hook succeeds; if the
    /// process dies between success and record, the migration appears
    /// unapplied and will run again, so authors must keep this idempotent.
    pub fn with_run<F>(mut self, run: F) -> Self
    where
        F: Fn(Arc<dyn Warehouse>, MigrationInfo) -> HookFuture + Send + Sync + 'static,
    {
        self.run = Some(Box::new(run));
        self
    }

    /// The migration's position in the total order, derived from the name
    /// prefix at registration time.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// The definition snapshot hooks receive.
    pub(crate) fn info(&self, target: &Target) -> MigrationInfo {
        MigrationInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            target: target.clone(),
        }
    }
}

/// Parse the numeric prefix out of a migration name, validating the full
/// `NNNN_word(_word)*` pattern.
pub fn parse_migration_number(name: &str) -> MigrateResult<u32> {
    let invalid = |reason: &str| MigrateError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.len() < 4 {
        return Err(invalid("must be at least 4 characters long"));
    }
    if !name.is_char_boundary(4) {
        return Err(invalid("must start with a 4-digit prefix"));
    }

    let (prefix, rest) = name.split_at(4);
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("must start with a 4-digit prefix"));
    }

    // The remainder must be one or more `_word` groups of lowercase letters.
    let mut groups = rest.split('_');
    if groups.next() != Some("") {
        return Err(invalid("prefix must be followed by _word groups"));
    }
    let mut seen_group = false;
    for group in groups {
        if group.is_empty() || !group.bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(invalid("words must be non-empty lowercase letters"));
        }
        seen_group = true;
    }
    if !seen_group {
        return Err(invalid("prefix must be followed by _word groups"));
    }

    prefix
        .parse::<u32>()
        .map_err(|_| invalid("prefix is not a number"))
}

#[cfg(test)]
#[path = "migration_test.rs"]
mod tests;
