//! Target model: the declared blast radius of a migration.

use serde::{Deserialize, Serialize};

/// A warehouse dataset and the specific tables within it that a migration
/// will modify.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub tables: Vec<String>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, tables: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tables,
        }
    }
}

/// The set of datasets/tables a migration declares it will touch.
///
/// Drives the scope of the backup copies taken before the run hook executes
/// and of the revert path if it fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub project_id: String,
    pub datasets: Vec<Dataset>,
}

impl Target {
    pub fn new(project_id: impl Into<String>, datasets: Vec<Dataset>) -> Self {
        Self {
            project_id: project_id.into(),
            datasets,
        }
    }

    /// Iterate every `(dataset, table)` pair in declaration order.
    pub fn table_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.datasets.iter().flat_map(|d| {
            d.tables
                .iter()
                .map(move |t| (d.name.as_str(), t.as_str()))
        })
    }

    /// True when the migration touches no tables at all.
    pub fn is_empty(&self) -> bool {
        self.datasets.iter().all(|d| d.tables.is_empty())
    }
}
