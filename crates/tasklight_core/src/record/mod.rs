//! Generic record representation exchanged with the remote store.
//!
//! # Responsibility
//! - Define the schema-loose record shape (identity + kind + flat field map)
//!   the store persists and queries.
//! - Define the stable field key namespace shared by mapper and store.
//!
//! # Invariants
//! - Flags are persisted as small integers (0/1), never native booleans.
//! - Timestamps are persisted as epoch-millisecond integers.
//! - Field keys are stable wire names; renames are schema changes.

pub mod mapper;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable record identifier, shared with the entity it represents.
pub type RecordId = Uuid;

/// Entity kinds known to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Task,
    Group,
}

impl RecordKind {
    /// Persisted kind discriminator.
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Group => "group",
        }
    }

    /// Decodes a persisted kind discriminator.
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "task" => Some(Self::Task),
            "group" => Some(Self::Group),
            _ => None,
        }
    }
}

/// Stable field key names for record payloads.
pub mod keys {
    pub const TITLE: &str = "title";
    pub const IS_COMPLETED: &str = "isCompleted";
    pub const NOTES: &str = "notes";
    pub const PRIORITY: &str = "priority";
    pub const DUE_DATE: &str = "dueDate";
    pub const CREATED_AT: &str = "createdAt";
    pub const MODIFIED_AT: &str = "modifiedAt";
    pub const IS_DELETED: &str = "isDeleted";
    pub const DELETED_AT: &str = "deletedDate";
    pub const PARENT_ID: &str = "parentID";
    pub const GROUP_ID: &str = "groupID";
    pub const HAS_CHILDREN: &str = "hasChildren";
}

/// Scalar value stored in a record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

/// Schema-loose record: stable identity, entity kind, flat field map.
///
/// Absent fields are represented by absent keys; the mapper owns default
/// construction on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub kind: RecordKind,
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// Creates an empty record of the given kind.
    pub fn new(id: RecordId, kind: RecordKind) -> Self {
        Self {
            id,
            kind,
            fields: BTreeMap::new(),
        }
    }

    /// Rebuilds a record from a persisted field map.
    pub fn from_fields(id: RecordId, kind: RecordKind, fields: BTreeMap<String, FieldValue>) -> Self {
        Self { id, kind, fields }
    }

    /// Sets a text field.
    pub fn set_text(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), FieldValue::Text(value.into()));
    }

    /// Sets an optional text field; `None` leaves the key absent.
    pub fn set_opt_text(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.set_text(key, value);
        }
    }

    /// Sets an integer field.
    pub fn set_integer(&mut self, key: &str, value: i64) {
        self.fields.insert(key.to_string(), FieldValue::Integer(value));
    }

    /// Sets an optional integer field; `None` leaves the key absent.
    pub fn set_opt_integer(&mut self, key: &str, value: Option<i64>) {
        if let Some(value) = value {
            self.set_integer(key, value);
        }
    }

    /// Sets a flag field using the 0/1 wire convention.
    pub fn set_flag(&mut self, key: &str, value: bool) {
        self.set_integer(key, i64::from(value));
    }

    /// Returns a text field when present with text type.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns an integer field when present with integer type.
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.fields.get(key) {
            Some(FieldValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    /// Decodes a flag field: exactly `1` is `true`, anything else `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.integer(key) == Some(1)
    }

    /// Full field map view, used by the store to persist the payload.
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }
}
