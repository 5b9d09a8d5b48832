//! Task domain model.
//!
//! # Responsibility
//! - Define the task entity shared by local state and the record store.
//! - Provide lifecycle helpers for the Active/SoftDeleted states.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - `deleted_at` is `Some` exactly when `is_deleted` is `true`.
//! - `parent_id` points at most one level up; a subtask is never itself a
//!   parent in modeled behavior.
//! - `has_children` is a cached flag maintained by the engine, not a
//!   continuously enforced derivation.

use crate::model::{now_epoch_ms, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a task.
pub type TaskId = Uuid;

/// Ordered task priority: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Persisted integer representation (store-side small int).
    pub fn as_db(self) -> i64 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Decodes a persisted value; out-of-range values fall back to `Medium`.
    pub fn from_db(value: i64) -> Self {
        match value {
            0 => Self::Low,
            2 => Self::High,
            _ => Self::Medium,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Canonical task entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable id used for store records, parent links and group membership.
    pub id: TaskId,
    /// Display title. Must be non-blank for persistence.
    pub title: String,
    pub is_completed: bool,
    pub notes: Option<String>,
    pub priority: Priority,
    /// Optional due timestamp in epoch milliseconds.
    pub due_date: Option<i64>,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
    /// Last modification timestamp in epoch milliseconds.
    pub modified_at: i64,
    /// Soft-delete tombstone flag.
    pub is_deleted: bool,
    /// Deletion timestamp; `Some` exactly when `is_deleted`.
    pub deleted_at: Option<i64>,
    /// Optional parent task (one nesting level).
    pub parent_id: Option<TaskId>,
    /// Optional owning group, by reference.
    pub group_id: Option<crate::model::group::GroupId>,
    /// Cached flag: at least one non-deleted child currently exists.
    pub has_children: bool,
}

/// Caller-supplied fields for creating a task.
///
/// Identity and timestamps are assigned by the engine at creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub notes: Option<String>,
    pub priority: Priority,
    pub due_date: Option<i64>,
    pub group_id: Option<crate::model::group::GroupId>,
}

impl TaskDraft {
    /// Creates a draft with default field values and the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

impl Task {
    /// Creates a new task with a freshly minted stable id and creation-time
    /// timestamps.
    pub fn new(draft: TaskDraft) -> Self {
        Self::with_id(Uuid::new_v4(), draft)
    }

    /// Creates a task with a caller-provided stable id.
    ///
    /// Used where identity already exists externally (decode paths, tests).
    pub fn with_id(id: TaskId, draft: TaskDraft) -> Self {
        let now = now_epoch_ms();
        Self {
            id,
            title: draft.title,
            is_completed: false,
            notes: draft.notes,
            priority: draft.priority,
            due_date: draft.due_date,
            created_at: now,
            modified_at: now,
            is_deleted: false,
            deleted_at: None,
            parent_id: None,
            group_id: draft.group_id,
            has_children: false,
        }
    }

    /// Marks this task as softly deleted at the given instant.
    pub fn soft_delete(&mut self, deleted_at: i64) {
        self.is_deleted = true;
        self.deleted_at = Some(deleted_at);
    }

    /// Clears the soft-delete tombstone.
    pub fn restore(&mut self) {
        self.is_deleted = false;
        self.deleted_at = None;
    }

    /// Returns whether this task should be considered visible/active.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Checks invariants required for persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }
}
