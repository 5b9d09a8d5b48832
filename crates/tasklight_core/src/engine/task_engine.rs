//! Task reconciliation engine over a coarse-CRUD record store.
//!
//! # Responsibility
//! - Provide the mutating operations callers invoke with concrete entity
//!   values: add/update/toggle/soft-delete/restore/permanent-delete for
//!   tasks, plus the group-level mirrors and the full refresh.
//! - Keep parent `has_children` flags and derived completion state in sync
//!   after every cascade.
//!
//! # Invariants
//! - Single-writer: all operations take `&mut self`; overlapping cascades
//!   against one engine instance are impossible by construction. Callers
//!   that share an engine across threads must serialize access themselves.
//! - Each store call is an independent durable write; a cascade that fails
//!   midway is healed by `fetch_all`, the only operation guaranteed to leave
//!   local state consistent with the store.
//! - No operation retries automatically; every failure either leaves local
//!   state untouched (add paths) or triggers reconcile-by-refetch, and is
//!   then surfaced with a user-visible message in `last_error`.

use crate::model::group::{Group, GroupId};
use crate::model::task::{Task, TaskDraft, TaskId};
use crate::model::{now_epoch_ms, ValidationError};
use crate::record::mapper::{group_from_record, group_to_record, task_from_record, task_to_record};
use crate::record::RecordKind;
use crate::state::LocalState;
use crate::store::{RecordStore, SortField, SortKey, StoreError};
use log::{error, info, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level error taxonomy surfaced to callers.
#[derive(Debug)]
pub enum EngineError {
    /// Entity failed persistence validation (blank title).
    Validation(ValidationError),
    /// Remote store failure, availability errors included, surfaced verbatim.
    Store(StoreError),
    /// Subtask creation referenced an unknown or inactive parent.
    ParentNotFound(TaskId),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
            Self::ParentNotFound(id) => write!(f, "parent task not found: {id}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::ParentNotFound(_) => None,
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for EngineError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Reconciliation engine owning the store adapter and the local mirror.
pub struct TaskEngine<S: RecordStore> {
    store: S,
    state: LocalState,
    last_error: Option<String>,
}

impl<S: RecordStore> TaskEngine<S> {
    /// Creates an engine over the given store adapter.
    ///
    /// The adapter is injected rather than reached through a process-wide
    /// singleton so tests can substitute a fake store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: LocalState::new(),
            last_error: None,
        }
    }

    /// Read access to the local mirror. Optimistic values are visible here
    /// before remote confirmation.
    pub fn state(&self) -> &LocalState {
        &self.state
    }

    /// Last user-visible error message, if the previous operation failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Checks store availability. Failures are surfaced verbatim and never
    /// retried automatically.
    pub fn check_availability(&mut self) -> EngineResult<()> {
        match self.store.check_availability() {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(err) => Err(self.surface(EngineError::Store(err))),
        }
    }

    /// Queries both entity kinds, rebuilds derived state, and replaces the
    /// local mirror wholesale.
    ///
    /// This is the single source-of-truth refresh and the recovery mechanism
    /// for every partial-cascade or optimistic-update failure.
    pub fn fetch_all(&mut self) -> EngineResult<()> {
        match self.refresh_from_store() {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(err) => Err(self.surface(err)),
        }
    }

    /// Creates a task from a draft: mints identity and timestamps, writes to
    /// the store, then inserts into the local mirror.
    ///
    /// On failure the mirror is left unmodified for this entity.
    pub fn add_task(&mut self, draft: TaskDraft) -> EngineResult<TaskId> {
        let task = Task::new(draft);
        if let Err(err) = self.save_task_batch(&task) {
            return Err(self.surface(err));
        }

        let id = task.id;
        let grouped = task.group_id.is_some();
        if grouped {
            self.state.push_task(task);
        } else {
            // New root tasks surface at the front until the next refresh.
            self.state.insert_task_front(task);
        }
        info!("event=add_task module=engine status=ok task={id} grouped={grouped}");
        self.last_error = None;
        Ok(id)
    }

    /// Replaces a task optimistically, persists it, and re-derives the
    /// parent's completion flag for ungrouped subtasks.
    pub fn update_task(&mut self, task: Task) -> EngineResult<()> {
        self.state.replace_task(task.clone());
        if let Err(err) = self.persist_task(&task) {
            return Err(self.surface_with_refetch("update_task", err));
        }

        if let (Some(parent_id), None) = (task.parent_id, task.group_id) {
            if let Err(err) = self.reconcile_parent_completion(parent_id, true) {
                return Err(self.surface_with_refetch("update_task", err));
            }
        }
        self.last_error = None;
        Ok(())
    }

    /// Hard-removes a task: drops it from the mirror immediately and issues
    /// the remote delete. Distinct from soft delete; not recoverable.
    pub fn delete_task(&mut self, task: &Task) -> EngineResult<()> {
        self.state.remove_task(task.id);
        if let Err(err) = self.store.delete(task.id) {
            return Err(self.surface_with_refetch("delete_task", EngineError::Store(err)));
        }
        self.last_error = None;
        Ok(())
    }

    /// Flips a task's completion flag and runs the completion cascade:
    /// push-down to children for ungrouped parents, AND-of-siblings re-derive
    /// for subtasks (parent persisted only when the derived value changes).
    pub fn toggle_task_completion(&mut self, task: Task) -> EngineResult<()> {
        let mut toggled = task;
        toggled.is_completed = !toggled.is_completed;
        toggled.modified_at = now_epoch_ms();
        let new_value = toggled.is_completed;

        self.state.replace_task(toggled.clone());
        if let Err(err) = self.persist_task(&toggled) {
            return Err(self.surface_with_refetch("toggle_task", err));
        }

        if toggled.has_children && toggled.group_id.is_none() {
            let children: Vec<Task> = self
                .state
                .subtasks_for(toggled.id)
                .into_iter()
                .cloned()
                .collect();
            for mut child in children {
                child.is_completed = new_value;
                child.modified_at = now_epoch_ms();
                self.state.replace_task(child.clone());
                if let Err(err) = self.persist_task(&child) {
                    return Err(self.surface_with_refetch("toggle_task", err));
                }
            }
        }

        if let Some(parent_id) = toggled.parent_id {
            if let Err(err) = self.reconcile_parent_completion(parent_id, false) {
                return Err(self.surface_with_refetch("toggle_task", err));
            }
        }
        self.last_error = None;
        Ok(())
    }

    /// Soft-deletes a task and cascades: persists the tombstone first, moves
    /// it to the deleted collection, clears the parent's `has_children` flag
    /// when this was the last active child, then recursively soft-deletes the
    /// task's own children.
    ///
    /// Idempotent on deleted-set membership: deleting an already-deleted task
    /// is a no-op success.
    pub fn soft_delete_task(&mut self, task: Task) -> EngineResult<()> {
        if self.state.deleted_task(task.id).is_some() {
            return Ok(());
        }

        let now = now_epoch_ms();
        let mut tombstoned = task;
        tombstoned.soft_delete(now);
        tombstoned.modified_at = now;

        if let Err(err) = self.persist_task(&tombstoned) {
            return Err(self.surface_with_refetch("soft_delete_task", err));
        }
        self.state.move_task_to_deleted(tombstoned.clone());

        if let Some(parent_id) = tombstoned.parent_id {
            if self.state.subtasks_for(parent_id).is_empty() {
                // The parent may itself be deleted already; skipping quietly
                // is required, not an error.
                if let Some(mut parent) = self.state.task(parent_id).cloned() {
                    parent.has_children = false;
                    self.state.replace_task(parent.clone());
                    if let Err(err) = self.persist_task(&parent) {
                        return Err(self.surface_with_refetch("soft_delete_task", err));
                    }
                }
            }
        }

        let children: Vec<Task> = self
            .state
            .subtasks_for(tombstoned.id)
            .into_iter()
            .cloned()
            .collect();
        for child in children {
            self.soft_delete_task(child)?;
        }
        if tombstoned.has_children {
            // Cascade just tombstoned every child; keep the cached flag
            // honest in the local mirror. The next refetch recomputes it.
            tombstoned.has_children = false;
            self.state.replace_task(tombstoned.clone());
        }

        info!(
            "event=soft_delete_task module=engine status=ok task={}",
            tombstoned.id
        );
        self.last_error = None;
        Ok(())
    }

    /// Restores a soft-deleted task and its soft-deleted children, then runs
    /// a full refetch to rebuild derived state instead of incremental repair.
    pub fn restore_task(&mut self, task: Task) -> EngineResult<()> {
        let mut restored = task;
        restored.restore();
        restored.modified_at = now_epoch_ms();

        if let Err(err) = self.persist_task(&restored) {
            return Err(self.surface_with_refetch("restore_task", err));
        }
        self.state.replace_task(restored.clone());

        let children: Vec<Task> = self
            .state
            .deleted_tasks()
            .iter()
            .filter(|t| t.parent_id == Some(restored.id))
            .cloned()
            .collect();
        for mut child in children {
            child.restore();
            child.modified_at = now_epoch_ms();
            if let Err(err) = self.persist_task(&child) {
                return Err(self.surface_with_refetch("restore_task", err));
            }
            self.state.replace_task(child);
        }

        info!(
            "event=restore_task module=engine status=ok task={}",
            restored.id
        );
        self.fetch_all()
    }

    /// Permanently removes a task record, then refetches. Terminal state;
    /// orphaned children are promoted to root tasks by the refetch.
    pub fn permanently_delete_task(&mut self, task: &Task) -> EngineResult<()> {
        if let Err(err) = self.store.delete(task.id) {
            return Err(self.surface_with_refetch(
                "permanently_delete_task",
                EngineError::Store(err),
            ));
        }
        info!(
            "event=permanent_delete module=engine status=ok task={}",
            task.id
        );
        self.fetch_all()
    }

    /// Creates a subtask under an active parent: persists the subtask, then
    /// marks and persists the parent's `has_children` flag.
    pub fn add_subtask(&mut self, draft: TaskDraft, parent_id: TaskId) -> EngineResult<TaskId> {
        let Some(mut parent) = self.state.task(parent_id).cloned() else {
            return Err(self.surface(EngineError::ParentNotFound(parent_id)));
        };

        let mut subtask = Task::new(draft);
        subtask.parent_id = Some(parent_id);
        if let Err(err) = self.save_task_batch(&subtask) {
            return Err(self.surface(err));
        }
        let id = subtask.id;
        self.state.push_task(subtask);

        parent.has_children = true;
        self.state.replace_task(parent.clone());
        if let Err(err) = self.persist_task(&parent) {
            return Err(self.surface_with_refetch("add_subtask", err));
        }

        info!("event=add_subtask module=engine status=ok task={id} parent={parent_id}");
        self.last_error = None;
        Ok(id)
    }

    /// Creates a group, writes it to the store, then inserts it locally.
    pub fn add_group(&mut self, title: impl Into<String>) -> EngineResult<GroupId> {
        let group = Group::new(title);
        let record = match group_to_record(&group, now_epoch_ms()) {
            Ok(record) => record,
            Err(err) => return Err(self.surface(EngineError::Validation(err))),
        };
        if let Err(err) = self.store.save(&record) {
            return Err(self.surface(EngineError::Store(err)));
        }

        let id = group.id;
        self.state.push_group(group);
        info!("event=add_group module=engine status=ok group={id}");
        self.last_error = None;
        Ok(id)
    }

    /// Flips a group's completion flag and pushes the new value to every
    /// member task and, transitively, their children. With zero members only
    /// the group's own flag changes.
    pub fn toggle_group_completion(&mut self, group: Group) -> EngineResult<()> {
        let mut toggled = group;
        toggled.is_completed = !toggled.is_completed;
        toggled.modified_at = now_epoch_ms();
        let new_value = toggled.is_completed;

        self.state.replace_group(toggled.clone());
        if let Err(err) = self.persist_group(&toggled) {
            return Err(self.surface_with_refetch("toggle_group", err));
        }

        let members: Vec<Task> = self
            .state
            .group_members(toggled.id)
            .into_iter()
            .cloned()
            .collect();
        for mut member in members {
            member.is_completed = new_value;
            member.modified_at = now_epoch_ms();
            self.state.replace_task(member.clone());
            if let Err(err) = self.persist_task(&member) {
                return Err(self.surface_with_refetch("toggle_group", err));
            }

            let children: Vec<Task> = self
                .state
                .subtasks_for(member.id)
                .into_iter()
                .cloned()
                .collect();
            for mut child in children {
                child.is_completed = new_value;
                child.modified_at = now_epoch_ms();
                self.state.replace_task(child.clone());
                if let Err(err) = self.persist_task(&child) {
                    return Err(self.surface_with_refetch("toggle_group", err));
                }
            }
        }
        self.last_error = None;
        Ok(())
    }

    /// Soft-deletes a group: persists the group tombstone, drops the group
    /// from the mirror, then soft-deletes every member task (and their
    /// children) with the same per-record sequential write pattern.
    pub fn soft_delete_group(&mut self, group: Group) -> EngineResult<()> {
        let now = now_epoch_ms();
        let mut tombstoned = group;
        tombstoned.soft_delete(now);
        tombstoned.modified_at = now;

        if let Err(err) = self.persist_group(&tombstoned) {
            return Err(self.surface_with_refetch("soft_delete_group", err));
        }
        self.state.remove_group(tombstoned.id);

        let members: Vec<Task> = self
            .state
            .group_members(tombstoned.id)
            .into_iter()
            .cloned()
            .collect();
        for member in members {
            self.soft_delete_task(member)?;
        }

        info!(
            "event=soft_delete_group module=engine status=ok group={}",
            tombstoned.id
        );
        self.last_error = None;
        Ok(())
    }

    // ---- internals ----

    fn persist_task(&mut self, task: &Task) -> EngineResult<()> {
        let record = task_to_record(task, now_epoch_ms())?;
        self.store.save(&record)?;
        Ok(())
    }

    fn persist_group(&mut self, group: &Group) -> EngineResult<()> {
        let record = group_to_record(group, now_epoch_ms())?;
        self.store.save(&record)?;
        Ok(())
    }

    /// Saves one task through the batched endpoint, checking the per-record
    /// outcome (add paths use the batch shape of the store contract).
    fn save_task_batch(&mut self, task: &Task) -> EngineResult<()> {
        let record = task_to_record(task, now_epoch_ms())?;
        let results = self.store.save_many(std::slice::from_ref(&record))?;
        for (_, result) in results {
            result?;
        }
        Ok(())
    }

    /// Re-derives a parent's completion flag as the AND of its active
    /// children. Persists the parent always (`force`) or only when the
    /// derived value differs from the current one.
    fn reconcile_parent_completion(&mut self, parent_id: TaskId, force: bool) -> EngineResult<()> {
        let Some(parent) = self.state.task(parent_id).cloned() else {
            return Ok(());
        };
        let siblings = self.state.subtasks_for(parent_id);
        if siblings.is_empty() {
            return Ok(());
        }
        let derived = siblings.iter().all(|t| t.is_completed);

        if !force && derived == parent.is_completed {
            return Ok(());
        }
        let mut parent = parent;
        parent.is_completed = derived;
        parent.modified_at = now_epoch_ms();
        self.state.replace_task(parent.clone());
        self.persist_task(&parent)
    }

    /// Queries, decodes, partitions, and swaps in the authoritative state.
    fn refresh_from_store(&mut self) -> EngineResult<()> {
        let task_sort = [
            SortKey::descending(SortField::Priority),
            SortKey::descending(SortField::CreatedAt),
        ];
        let task_records = self.store.query(RecordKind::Task, &task_sort)?;
        let group_sort = [SortKey::descending(SortField::CreatedAt)];
        let group_records = self.store.query(RecordKind::Group, &group_sort)?;

        let mut tasks = Vec::with_capacity(task_records.len());
        for record in &task_records {
            match task_from_record(record) {
                Ok(task) => tasks.push(task),
                // Tolerable data skew: malformed records are skipped, not
                // surfaced.
                Err(err) => warn!(
                    "event=record_dropped module=engine kind=task record={} error={err}",
                    record.id
                ),
            }
        }

        let mut groups = Vec::with_capacity(group_records.len());
        for record in &group_records {
            match group_from_record(record) {
                Ok(group) => groups.push(group),
                Err(err) => warn!(
                    "event=record_dropped module=engine kind=group record={} error={err}",
                    record.id
                ),
            }
        }

        // Parents that were permanently deleted leave dangling references;
        // promote those tasks to root so they are never re-linked.
        let known_ids: HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();
        for task in &mut tasks {
            if let Some(parent_id) = task.parent_id {
                if !known_ids.contains(&parent_id) {
                    task.parent_id = None;
                }
            }
        }

        let (mut active, mut deleted): (Vec<Task>, Vec<Task>) =
            tasks.into_iter().partition(Task::is_active);
        deleted.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));

        // Rebuild the cached has-children flags from what actually exists.
        // Only non-deleted children count, but the flag must be honest on
        // both partitions: a tombstoned parent whose children were cascaded
        // into the trash has no children either.
        let parents_with_children: HashSet<TaskId> =
            active.iter().filter_map(|t| t.parent_id).collect();
        for task in active.iter_mut().chain(deleted.iter_mut()) {
            task.has_children = parents_with_children.contains(&task.id);
        }

        groups.retain(|g| !g.is_deleted);

        info!(
            "event=fetch_all module=engine status=ok active={} deleted={} groups={}",
            active.len(),
            deleted.len(),
            groups.len()
        );
        self.state.replace_all(active, deleted, groups);
        Ok(())
    }

    /// Records the user-visible message for a failure that left local state
    /// untouched.
    fn surface(&mut self, err: EngineError) -> EngineError {
        error!("event=op_failed module=engine error={err}");
        self.last_error = Some(err.to_string());
        err
    }

    /// Recovery for failures after an optimistic mutation or mid-cascade:
    /// discard local optimism by refetching authoritative state, then
    /// surface the original error.
    fn surface_with_refetch(&mut self, op: &str, err: EngineError) -> EngineError {
        warn!("event=reconcile_refetch module=engine op={op} trigger={err}");
        if let Err(refetch_err) = self.refresh_from_store() {
            error!("event=reconcile_refetch module=engine op={op} status=error error={refetch_err}");
        }
        self.last_error = Some(err.to_string());
        err
    }
}
