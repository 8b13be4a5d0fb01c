//! Portable table-schema description.
//!
//! A [`TableSchema`] describes the layout of a warehouse table without
//! committing to any backend's DDL dialect. Backends render it themselves
//! (see [`crate::duckdb`]).

use serde::{Deserialize, Serialize};

/// Column type of a schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Variable-length text.
    String,
    /// Server-side timestamp.
    Timestamp,
    /// Nested record with its own fields.
    Record(Vec<Field>),
}

/// A single field in a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub repeated: bool,
}

impl Field {
    /// A string field, optional and scalar by default.
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::String,
            required: false,
            repeated: false,
        }
    }

    /// A timestamp field, optional and scalar by default.
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Timestamp,
            required: false,
            repeated: false,
        }
    }

    /// A nested record field with the given sub-fields.
    pub fn record(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Record(fields),
            required: false,
            repeated: false,
        }
    }

    /// Mark the field NOT NULL.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as an array of its type.
    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }
}

/// Ordered set of fields describing one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub fields: Vec<Field>,
}

impl TableSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }
}
