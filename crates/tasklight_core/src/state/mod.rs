//! In-memory mirror of tasks and groups.
//!
//! # Responsibility
//! - Hold the flat collections the engine mutates optimistically: active
//!   tasks, soft-deleted tasks, and groups.
//! - Answer child/member lookups by filtering the flat task arena on demand;
//!   no denormalized child lists are kept.
//!
//! # Invariants
//! - A task id appears in at most one of the active/deleted collections.
//! - Mutation happens only through the reconciliation engine (single-writer
//!   rule enforced at the engine API boundary).

use crate::model::group::{Group, GroupId};
use crate::model::task::{Task, TaskId};

/// Flat in-memory mirror of store entities.
#[derive(Debug, Default, Clone)]
pub struct LocalState {
    active: Vec<Task>,
    deleted: Vec<Task>,
    groups: Vec<Group>,
}

impl LocalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// All active tasks in view order, including subtasks.
    pub fn tasks(&self) -> &[Task] {
        &self.active
    }

    /// Active tasks without a parent, in view order.
    pub fn root_tasks(&self) -> Vec<&Task> {
        self.active.iter().filter(|t| t.parent_id.is_none()).collect()
    }

    /// Active children of the given parent, computed from the flat arena.
    pub fn subtasks_for(&self, parent_id: TaskId) -> Vec<&Task> {
        self.active
            .iter()
            .filter(|t| t.parent_id == Some(parent_id))
            .collect()
    }

    /// Active member tasks of the given group.
    pub fn group_members(&self, group_id: GroupId) -> Vec<&Task> {
        self.active
            .iter()
            .filter(|t| t.group_id == Some(group_id))
            .collect()
    }

    /// Soft-deleted tasks in view order (most recently deleted first after a
    /// refresh).
    pub fn deleted_tasks(&self) -> &[Task] {
        &self.deleted
    }

    /// Non-deleted groups.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Looks up one active task.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.active.iter().find(|t| t.id == id)
    }

    /// Looks up one soft-deleted task.
    pub fn deleted_task(&self, id: TaskId) -> Option<&Task> {
        self.deleted.iter().find(|t| t.id == id)
    }

    /// Looks up one group.
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Inserts an active task at the front of the view order.
    pub fn insert_task_front(&mut self, task: Task) {
        self.active.insert(0, task);
    }

    /// Appends an active task at the back of the view order.
    pub fn push_task(&mut self, task: Task) {
        self.active.push(task);
    }

    /// Replaces a task in place, wherever it currently lives.
    ///
    /// Returns `false` when the id is unknown to either collection.
    pub fn replace_task(&mut self, task: Task) -> bool {
        if let Some(slot) = self.active.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
            return true;
        }
        if let Some(slot) = self.deleted.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
            return true;
        }
        false
    }

    /// Moves a task from the active collection into the deleted collection,
    /// applying the updated (tombstoned) value.
    pub fn move_task_to_deleted(&mut self, task: Task) {
        self.active.retain(|t| t.id != task.id);
        if let Some(slot) = self.deleted.iter_mut().find(|t| t.id == task.id) {
            *slot = task;
        } else {
            self.deleted.insert(0, task);
        }
    }

    /// Removes a task from both collections (hard removal).
    pub fn remove_task(&mut self, id: TaskId) {
        self.active.retain(|t| t.id != id);
        self.deleted.retain(|t| t.id != id);
    }

    /// Appends a group.
    pub fn push_group(&mut self, group: Group) {
        self.groups.push(group);
    }

    /// Replaces a group in place; `false` when the id is unknown.
    pub fn replace_group(&mut self, group: Group) -> bool {
        if let Some(slot) = self.groups.iter_mut().find(|g| g.id == group.id) {
            *slot = group;
            return true;
        }
        false
    }

    /// Removes a group from the mirror.
    pub fn remove_group(&mut self, id: GroupId) {
        self.groups.retain(|g| g.id != id);
    }

    /// Replaces the whole mirror with freshly fetched collections.
    pub fn replace_all(&mut self, active: Vec<Task>, deleted: Vec<Task>, groups: Vec<Group>) {
        self.active = active;
        self.deleted = deleted;
        self.groups = groups;
    }
}

#[cfg(test)]
mod tests {
    use super::LocalState;
    use crate::model::task::{Task, TaskDraft};

    #[test]
    fn subtasks_are_computed_from_the_flat_arena() {
        let mut state = LocalState::new();
        let parent = Task::new(TaskDraft::new("parent"));
        let mut child = Task::new(TaskDraft::new("child"));
        child.parent_id = Some(parent.id);
        let parent_id = parent.id;

        state.insert_task_front(parent);
        state.push_task(child);

        assert_eq!(state.root_tasks().len(), 1);
        assert_eq!(state.subtasks_for(parent_id).len(), 1);
        assert_eq!(state.tasks().len(), 2);
    }

    #[test]
    fn move_to_deleted_keeps_a_single_membership() {
        let mut state = LocalState::new();
        let mut task = Task::new(TaskDraft::new("bin me"));
        let id = task.id;
        state.insert_task_front(task.clone());

        task.soft_delete(10);
        state.move_task_to_deleted(task.clone());
        state.move_task_to_deleted(task);

        assert!(state.task(id).is_none());
        assert_eq!(state.deleted_tasks().len(), 1);
        assert_eq!(state.deleted_task(id).and_then(|t| t.deleted_at), Some(10));
    }
}
