//! Entity mapper between domain entities and store records.
//!
//! # Responsibility
//! - Encode `Task`/`Group` into schema-loose records and decode them back.
//! - Own default-value construction for absent optional fields, so decode is
//!   total for any record that carries a title.
//!
//! # Invariants
//! - Encode validates the entity and always stamps a fresh `modifiedAt`.
//! - Decode fails only when the required title is missing; query paths drop
//!   such records instead of failing the whole result set.
//! - `deleted_at` is normalized on decode: `None` unless the tombstone flag
//!   is set, `Some(0)` when set without a stored timestamp.

use crate::model::group::{Group, GroupId};
use crate::model::task::{Priority, Task};
use crate::model::ValidationError;
use crate::record::{keys, Record, RecordId, RecordKind};
use uuid::Uuid;

/// Fixed decode default for absent timestamps.
pub const DEFAULT_TIMESTAMP: i64 = 0;

/// Mapper decode errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// Required title field is absent; the record is malformed.
    MissingTitle(RecordId),
    /// Record kind does not match the requested entity.
    KindMismatch {
        record_id: RecordId,
        expected: RecordKind,
        actual: RecordKind,
    },
    /// A reference field holds a value that is not a uuid.
    InvalidReference { record_id: RecordId, key: &'static str },
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTitle(id) => write!(f, "record {id} is missing required title"),
            Self::KindMismatch {
                record_id,
                expected,
                actual,
            } => write!(
                f,
                "record {record_id} has kind {actual:?}, expected {expected:?}"
            ),
            Self::InvalidReference { record_id, key } => {
                write!(f, "record {record_id} has non-uuid value in `{key}`")
            }
        }
    }
}

impl std::error::Error for MapError {}

/// Encodes a task into its record form, stamping `modifiedAt = now`.
pub fn task_to_record(task: &Task, now: i64) -> Result<Record, ValidationError> {
    task.validate()?;

    let mut record = Record::new(task.id, RecordKind::Task);
    record.set_text(keys::TITLE, task.title.as_str());
    record.set_flag(keys::IS_COMPLETED, task.is_completed);
    record.set_opt_text(keys::NOTES, task.notes.as_deref());
    record.set_integer(keys::PRIORITY, task.priority.as_db());
    record.set_opt_integer(keys::DUE_DATE, task.due_date);
    record.set_integer(keys::CREATED_AT, task.created_at);
    record.set_integer(keys::MODIFIED_AT, now);
    record.set_flag(keys::IS_DELETED, task.is_deleted);
    record.set_opt_integer(keys::DELETED_AT, task.deleted_at);
    record.set_opt_text(keys::PARENT_ID, task.parent_id.map(|id| id.to_string()).as_deref());
    record.set_opt_text(keys::GROUP_ID, task.group_id.map(|id| id.to_string()).as_deref());
    record.set_flag(keys::HAS_CHILDREN, task.has_children);
    Ok(record)
}

/// Decodes a task from its record form, applying fixed defaults.
pub fn task_from_record(record: &Record) -> Result<Task, MapError> {
    expect_kind(record, RecordKind::Task)?;
    let title = required_title(record)?;

    let is_deleted = record.flag(keys::IS_DELETED);
    let deleted_at = if is_deleted {
        Some(record.integer(keys::DELETED_AT).unwrap_or(DEFAULT_TIMESTAMP))
    } else {
        None
    };

    Ok(Task {
        id: record.id,
        title,
        is_completed: record.flag(keys::IS_COMPLETED),
        notes: record.text(keys::NOTES).map(str::to_string),
        priority: record
            .integer(keys::PRIORITY)
            .map(Priority::from_db)
            .unwrap_or_default(),
        due_date: record.integer(keys::DUE_DATE),
        created_at: record.integer(keys::CREATED_AT).unwrap_or(DEFAULT_TIMESTAMP),
        modified_at: record.integer(keys::MODIFIED_AT).unwrap_or(DEFAULT_TIMESTAMP),
        is_deleted,
        deleted_at,
        parent_id: reference(record, keys::PARENT_ID)?,
        group_id: reference(record, keys::GROUP_ID)?,
        has_children: record.flag(keys::HAS_CHILDREN),
    })
}

/// Encodes a group into its record form, stamping `modifiedAt = now`.
pub fn group_to_record(group: &Group, now: i64) -> Result<Record, ValidationError> {
    group.validate()?;

    let mut record = Record::new(group.id, RecordKind::Group);
    record.set_text(keys::TITLE, group.title.as_str());
    record.set_flag(keys::IS_COMPLETED, group.is_completed);
    record.set_integer(keys::CREATED_AT, group.created_at);
    record.set_integer(keys::MODIFIED_AT, now);
    record.set_flag(keys::IS_DELETED, group.is_deleted);
    record.set_opt_integer(keys::DELETED_AT, group.deleted_at);
    Ok(record)
}

/// Decodes a group from its record form, applying fixed defaults.
pub fn group_from_record(record: &Record) -> Result<Group, MapError> {
    expect_kind(record, RecordKind::Group)?;
    let title = required_title(record)?;

    let is_deleted = record.flag(keys::IS_DELETED);
    let deleted_at = if is_deleted {
        Some(record.integer(keys::DELETED_AT).unwrap_or(DEFAULT_TIMESTAMP))
    } else {
        None
    };

    Ok(Group {
        id: record.id,
        title,
        is_completed: record.flag(keys::IS_COMPLETED),
        created_at: record.integer(keys::CREATED_AT).unwrap_or(DEFAULT_TIMESTAMP),
        modified_at: record.integer(keys::MODIFIED_AT).unwrap_or(DEFAULT_TIMESTAMP),
        is_deleted,
        deleted_at,
    })
}

fn expect_kind(record: &Record, expected: RecordKind) -> Result<(), MapError> {
    if record.kind != expected {
        return Err(MapError::KindMismatch {
            record_id: record.id,
            expected,
            actual: record.kind,
        });
    }
    Ok(())
}

fn required_title(record: &Record) -> Result<String, MapError> {
    match record.text(keys::TITLE) {
        Some(title) if !title.trim().is_empty() => Ok(title.to_string()),
        _ => Err(MapError::MissingTitle(record.id)),
    }
}

fn reference(record: &Record, key: &'static str) -> Result<Option<GroupId>, MapError> {
    match record.text(key) {
        None => Ok(None),
        Some(value) => Uuid::parse_str(value)
            .map(Some)
            .map_err(|_| MapError::InvalidReference {
                record_id: record.id,
                key,
            }),
    }
}
