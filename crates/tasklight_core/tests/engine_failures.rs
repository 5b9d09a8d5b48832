//! Failure-path coverage: a programmable fake store injects write and
//! availability failures to exercise the reconcile-by-refetch recovery.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use tasklight_core::record::{keys, Record, RecordId, RecordKind};
use tasklight_core::store::{
    BatchResult, RecordStore, SortDirection, SortField, SortKey, StoreError, StoreResult,
};
use tasklight_core::{EngineError, TaskDraft, TaskEngine};

#[derive(Default)]
struct Inner {
    records: HashMap<RecordId, Record>,
    availability: Option<StoreError>,
    fail_saves: bool,
    fail_after_saves: Option<usize>,
    saves_seen: usize,
}

impl Inner {
    fn gate_save(&mut self) -> StoreResult<()> {
        self.saves_seen += 1;
        let over_limit = self
            .fail_after_saves
            .map_or(false, |limit| self.saves_seen > limit);
        if self.fail_saves || over_limit {
            return Err(StoreError::Backend("injected write failure".to_string()));
        }
        Ok(())
    }
}

/// In-memory store with programmable failures. Cloning shares the backing
/// state, so a test can keep a handle after the engine takes ownership.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: Rc<RefCell<Inner>>,
}

impl FlakyStore {
    fn fail_saves(&self, value: bool) {
        self.inner.borrow_mut().fail_saves = value;
    }

    /// Lets `extra` more saves through, then fails every save after that.
    fn fail_after_more_saves(&self, extra: usize) {
        let mut inner = self.inner.borrow_mut();
        inner.fail_after_saves = Some(inner.saves_seen + extra);
    }

    fn set_availability(&self, error: Option<StoreError>) {
        self.inner.borrow_mut().availability = error;
    }
}

fn sort_value(record: &Record, field: SortField) -> i64 {
    let key = match field {
        SortField::Priority => keys::PRIORITY,
        SortField::CreatedAt => keys::CREATED_AT,
        SortField::DeletedAt => keys::DELETED_AT,
    };
    record.integer(key).unwrap_or(0)
}

impl RecordStore for FlakyStore {
    fn check_availability(&self) -> StoreResult<()> {
        match &self.inner.borrow().availability {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn save(&mut self, record: &Record) -> StoreResult<()> {
        let mut inner = self.inner.borrow_mut();
        inner.gate_save()?;
        inner.records.insert(record.id, record.clone());
        Ok(())
    }

    fn fetch(&self, id: RecordId) -> StoreResult<Record> {
        self.inner
            .borrow()
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<()> {
        match self.inner.borrow_mut().records.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn save_many(&mut self, records: &[Record]) -> StoreResult<Vec<BatchResult>> {
        let mut inner = self.inner.borrow_mut();
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            let outcome = inner.gate_save();
            if outcome.is_ok() {
                inner.records.insert(record.id, record.clone());
            }
            results.push((record.id, outcome));
        }
        Ok(results)
    }

    fn query(&self, kind: RecordKind, sort: &[SortKey]) -> StoreResult<Vec<Record>> {
        let mut matched: Vec<Record> = self
            .inner
            .borrow()
            .records
            .values()
            .filter(|r| r.kind == kind)
            .filter(|r| r.text(keys::TITLE).map_or(false, |t| !t.is_empty()))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            for key in sort {
                let ordering = match key.direction {
                    SortDirection::Ascending => {
                        sort_value(a, key.field).cmp(&sort_value(b, key.field))
                    }
                    SortDirection::Descending => {
                        sort_value(b, key.field).cmp(&sort_value(a, key.field))
                    }
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.id.cmp(&b.id)
        });
        Ok(matched)
    }
}

fn flaky_engine() -> (TaskEngine<FlakyStore>, FlakyStore) {
    let store = FlakyStore::default();
    let handle = store.clone();
    (TaskEngine::new(store), handle)
}

#[test]
fn availability_errors_are_surfaced_verbatim() {
    let (mut engine, store) = flaky_engine();
    store.set_availability(Some(StoreError::AccountRestricted));

    let err = engine.check_availability().unwrap_err();
    assert!(matches!(
        err,
        EngineError::Store(StoreError::AccountRestricted)
    ));
    assert_eq!(engine.last_error(), Some("store account is restricted"));

    store.set_availability(None);
    engine.check_availability().unwrap();
    assert!(engine.last_error().is_none());
}

#[test]
fn failed_add_leaves_the_mirror_untouched() {
    let (mut engine, store) = flaky_engine();
    store.fail_saves(true);

    let err = engine.add_task(TaskDraft::new("never lands")).unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Backend(_))));
    assert!(engine.state().tasks().is_empty());
    assert!(engine.last_error().is_some());
}

#[test]
fn failed_update_is_reverted_by_the_recovery_refetch() {
    let (mut engine, store) = flaky_engine();
    let id = engine.add_task(TaskDraft::new("original")).unwrap();

    store.fail_saves(true);
    let mut renamed = engine.state().task(id).unwrap().clone();
    renamed.title = "renamed".to_string();
    assert!(engine.update_task(renamed).is_err());

    // The optimistic rename was discarded in favor of the stored value.
    assert_eq!(engine.state().task(id).unwrap().title, "original");
    assert!(engine.last_error().is_some());
}

#[test]
fn partial_toggle_cascade_settles_on_the_stored_state() {
    let (mut engine, store) = flaky_engine();
    let parent_id = engine.add_task(TaskDraft::new("release")).unwrap();
    let first = engine
        .add_subtask(TaskDraft::new("changelog"), parent_id)
        .unwrap();
    let second = engine.add_subtask(TaskDraft::new("tag"), parent_id).unwrap();

    // Parent and first child persist; the second child's write fails.
    store.fail_after_more_saves(2);
    let parent = engine.state().task(parent_id).unwrap().clone();
    let err = engine.toggle_task_completion(parent).unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Backend(_))));

    // After the recovery refetch the mirror matches the store exactly:
    // the writes that landed stay, the one that failed is rolled back.
    assert!(engine.state().task(parent_id).unwrap().is_completed);
    assert!(engine.state().task(first).unwrap().is_completed);
    assert!(!engine.state().task(second).unwrap().is_completed);
    assert!(engine.last_error().is_some());
}

#[test]
fn partial_soft_delete_cascade_keeps_unwritten_children_active() {
    let (mut engine, store) = flaky_engine();
    let parent_id = engine.add_task(TaskDraft::new("doomed")).unwrap();
    let child_id = engine
        .add_subtask(TaskDraft::new("survivor"), parent_id)
        .unwrap();

    // The parent tombstone lands; the child's cascade write fails.
    store.fail_after_more_saves(1);
    let parent = engine.state().task(parent_id).unwrap().clone();
    assert!(engine.soft_delete_task(parent).is_err());

    assert!(engine.state().deleted_task(parent_id).is_some());
    let child = engine.state().task(child_id).unwrap();
    assert!(!child.is_deleted);
    assert!(engine.last_error().is_some());
}

#[test]
fn a_later_success_clears_the_sticky_error_message() {
    let (mut engine, store) = flaky_engine();
    store.fail_saves(true);
    assert!(engine.add_task(TaskDraft::new("fails")).is_err());
    assert!(engine.last_error().is_some());

    store.fail_saves(false);
    engine.add_task(TaskDraft::new("lands")).unwrap();
    assert!(engine.last_error().is_none());
}
