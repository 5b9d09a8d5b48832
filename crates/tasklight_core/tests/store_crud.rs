use tasklight_core::db::{open_store_db, open_store_db_in_memory};
use tasklight_core::record::keys;
use tasklight_core::{
    task_to_record, Priority, Record, RecordKind, RecordStore, SortField, SortKey,
    SqliteRecordStore, StoreError, Task, TaskDraft,
};
use uuid::Uuid;

fn memory_store() -> SqliteRecordStore {
    let conn = open_store_db_in_memory().expect("in-memory store should open");
    SqliteRecordStore::try_new(conn).expect("migrated connection should be ready")
}

fn task_record(title: &str, priority: Priority, created_at: i64) -> Record {
    let mut task = Task::new(TaskDraft {
        title: title.to_string(),
        priority,
        ..TaskDraft::default()
    });
    task.created_at = created_at;
    task_to_record(&task, created_at).unwrap()
}

#[test]
fn save_and_fetch_roundtrip() {
    let mut store = memory_store();
    let record = task_record("first", Priority::Medium, 100);

    store.save(&record).unwrap();
    let loaded = store.fetch(record.id).unwrap();
    assert_eq!(loaded, record);
}

#[test]
fn save_is_an_idempotent_upsert() {
    let mut store = memory_store();
    let mut record = task_record("draft", Priority::Low, 100);
    store.save(&record).unwrap();

    record.set_text(keys::TITLE, "final");
    record.set_integer(keys::PRIORITY, Priority::High.as_db());
    store.save(&record).unwrap();
    store.save(&record).unwrap();

    let loaded = store.fetch(record.id).unwrap();
    assert_eq!(loaded.text(keys::TITLE), Some("final"));

    let all = store.query(RecordKind::Task, &[]).unwrap();
    assert_eq!(all.len(), 1);
}

#[test]
fn fetch_and_delete_missing_records_fail_with_not_found() {
    let mut store = memory_store();
    let id = Uuid::new_v4();

    assert!(matches!(store.fetch(id), Err(StoreError::NotFound(missing)) if missing == id));
    assert!(matches!(store.delete(id), Err(StoreError::NotFound(missing)) if missing == id));
}

#[test]
fn delete_removes_the_record() {
    let mut store = memory_store();
    let record = task_record("gone soon", Priority::Medium, 100);
    store.save(&record).unwrap();

    store.delete(record.id).unwrap();
    assert!(matches!(store.fetch(record.id), Err(StoreError::NotFound(_))));
}

#[test]
fn save_many_reports_per_record_results() {
    let mut store = memory_store();
    let a = task_record("a", Priority::Low, 1);
    let b = task_record("b", Priority::High, 2);

    let results = store.save_many(&[a.clone(), b.clone()]).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|(_, result)| result.is_ok()));
    assert!(store.fetch(a.id).is_ok());
    assert!(store.fetch(b.id).is_ok());
}

#[test]
fn query_sorts_by_priority_descending() {
    let mut store = memory_store();
    // Equal creation order; only priority should decide.
    store.save(&task_record("low", Priority::Low, 500)).unwrap();
    store.save(&task_record("high", Priority::High, 500)).unwrap();
    store.save(&task_record("medium", Priority::Medium, 500)).unwrap();

    let records = store
        .query(RecordKind::Task, &[SortKey::descending(SortField::Priority)])
        .unwrap();
    let titles: Vec<&str> = records.iter().filter_map(|r| r.text(keys::TITLE)).collect();
    assert_eq!(titles, vec!["high", "medium", "low"]);
}

#[test]
fn query_breaks_priority_ties_by_creation_time() {
    let mut store = memory_store();
    store.save(&task_record("older", Priority::Medium, 100)).unwrap();
    store.save(&task_record("newer", Priority::Medium, 200)).unwrap();

    let sort = [
        SortKey::descending(SortField::Priority),
        SortKey::descending(SortField::CreatedAt),
    ];
    let records = store.query(RecordKind::Task, &sort).unwrap();
    let titles: Vec<&str> = records.iter().filter_map(|r| r.text(keys::TITLE)).collect();
    assert_eq!(titles, vec!["newer", "older"]);
}

#[test]
fn query_excludes_records_with_empty_titles() {
    let mut store = memory_store();
    store.save(&task_record("kept", Priority::Medium, 100)).unwrap();

    let malformed = Record::new(Uuid::new_v4(), RecordKind::Task);
    store.save(&malformed).unwrap();

    let records = store.query(RecordKind::Task, &[]).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].text(keys::TITLE), Some("kept"));
}

#[test]
fn query_filters_by_entity_kind() {
    let mut store = memory_store();
    store.save(&task_record("a task", Priority::Medium, 100)).unwrap();

    let mut group = Record::new(Uuid::new_v4(), RecordKind::Group);
    group.set_text(keys::TITLE, "Errands");
    group.set_integer(keys::CREATED_AT, 100);
    store.save(&group).unwrap();

    assert_eq!(store.query(RecordKind::Task, &[]).unwrap().len(), 1);
    assert_eq!(store.query(RecordKind::Group, &[]).unwrap().len(), 1);
}

#[test]
fn availability_check_succeeds_on_open_connection() {
    let store = memory_store();
    store.check_availability().unwrap();
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let path = dir.path().join("tasklight.db");

    let record = task_record("durable", Priority::Medium, 100);
    {
        let conn = open_store_db(&path).unwrap();
        let mut store = SqliteRecordStore::try_new(conn).unwrap();
        store.save(&record).unwrap();
    }

    let conn = open_store_db(&path).unwrap();
    let store = SqliteRecordStore::try_new(conn).unwrap();
    let loaded = store.fetch(record.id).unwrap();
    assert_eq!(loaded.text(keys::TITLE), Some("durable"));
}
