//! Task group domain model.
//!
//! A group owns tasks by reference only: membership lives on the task as
//! `group_id`, never as a child list on the group.

use crate::model::{now_epoch_ms, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a group.
pub type GroupId = Uuid;

/// Canonical group entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// Display title. Must be non-blank for persistence.
    pub title: String,
    /// Not derived from member state; only changed by direct toggles.
    pub is_completed: bool,
    pub created_at: i64,
    pub modified_at: i64,
    pub is_deleted: bool,
    /// Deletion timestamp; `Some` exactly when `is_deleted`.
    pub deleted_at: Option<i64>,
}

impl Group {
    /// Creates a new group with a freshly minted stable id.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), title)
    }

    /// Creates a group with a caller-provided stable id.
    pub fn with_id(id: GroupId, title: impl Into<String>) -> Self {
        let now = now_epoch_ms();
        Self {
            id,
            title: title.into(),
            is_completed: false,
            created_at: now,
            modified_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    /// Marks this group as softly deleted at the given instant.
    ///
    /// Group deletion is one-way: there is no group trash to restore from.
    pub fn soft_delete(&mut self, deleted_at: i64) {
        self.is_deleted = true;
        self.deleted_at = Some(deleted_at);
    }

    /// Checks invariants required for persistence.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Group;

    #[test]
    fn new_group_starts_incomplete_and_active() {
        let group = Group::new("Errands");
        assert!(!group.is_completed);
        assert!(!group.is_deleted);
        assert_eq!(group.deleted_at, None);
    }

    #[test]
    fn soft_delete_sets_tombstone_fields_together() {
        let mut group = Group::new("Errands");
        group.soft_delete(42);
        assert!(group.is_deleted);
        assert_eq!(group.deleted_at, Some(42));
    }
}
