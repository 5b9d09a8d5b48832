use tasklight_core::db::open_store_db_in_memory;
use tasklight_core::{GroupId, SqliteRecordStore, TaskDraft, TaskEngine};

fn engine() -> TaskEngine<SqliteRecordStore> {
    let conn = open_store_db_in_memory().expect("in-memory store should open");
    let store = SqliteRecordStore::try_new(conn).expect("store should be ready");
    TaskEngine::new(store)
}

fn grouped_draft(title: &str, group_id: GroupId) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        group_id: Some(group_id),
        ..TaskDraft::default()
    }
}

#[test]
fn toggling_an_empty_group_changes_only_the_group_flag() {
    let mut engine = engine();
    let group_id = engine.add_group("Errands").unwrap();

    let group = engine.state().group(group_id).unwrap().clone();
    engine.toggle_group_completion(group).unwrap();

    assert!(engine.state().group(group_id).unwrap().is_completed);
    assert!(engine.state().tasks().is_empty());
    assert!(engine.last_error().is_none());
}

#[test]
fn toggling_a_group_pushes_the_flag_to_members_and_their_children() {
    let mut engine = engine();
    let group_id = engine.add_group("Errands").unwrap();
    let member_a = engine.add_task(grouped_draft("post office", group_id)).unwrap();
    let member_b = engine.add_task(grouped_draft("groceries", group_id)).unwrap();
    let child = engine
        .add_subtask(TaskDraft::new("buy stamps"), member_a)
        .unwrap();
    let outsider = engine.add_task(TaskDraft::new("unrelated")).unwrap();

    let group = engine.state().group(group_id).unwrap().clone();
    engine.toggle_group_completion(group).unwrap();

    assert!(engine.state().group(group_id).unwrap().is_completed);
    assert!(engine.state().task(member_a).unwrap().is_completed);
    assert!(engine.state().task(member_b).unwrap().is_completed);
    assert!(engine.state().task(child).unwrap().is_completed);
    assert!(!engine.state().task(outsider).unwrap().is_completed);
}

#[test]
fn toggling_twice_returns_members_to_incomplete() {
    let mut engine = engine();
    let group_id = engine.add_group("Chores").unwrap();
    let member = engine.add_task(grouped_draft("dishes", group_id)).unwrap();

    let group = engine.state().group(group_id).unwrap().clone();
    engine.toggle_group_completion(group).unwrap();
    let group = engine.state().group(group_id).unwrap().clone();
    engine.toggle_group_completion(group).unwrap();

    assert!(!engine.state().group(group_id).unwrap().is_completed);
    assert!(!engine.state().task(member).unwrap().is_completed);
}

#[test]
fn soft_deleting_a_group_cascades_to_members_and_children() {
    let mut engine = engine();
    let group_id = engine.add_group("Errands").unwrap();
    let member_a = engine.add_task(grouped_draft("post office", group_id)).unwrap();
    let member_b = engine.add_task(grouped_draft("groceries", group_id)).unwrap();
    let child = engine
        .add_subtask(TaskDraft::new("buy stamps"), member_a)
        .unwrap();
    let outsider = engine.add_task(TaskDraft::new("unrelated")).unwrap();

    let group = engine.state().group(group_id).unwrap().clone();
    engine.soft_delete_group(group).unwrap();

    assert!(engine.state().group(group_id).is_none());
    assert!(engine.state().deleted_task(member_a).is_some());
    assert!(engine.state().deleted_task(member_b).is_some());
    assert!(engine.state().deleted_task(child).is_some());
    assert!(engine.state().task(outsider).is_some());
}

#[test]
fn deleted_groups_stay_out_of_the_mirror_after_refresh() {
    let mut engine = engine();
    let keep_id = engine.add_group("Keep").unwrap();
    let drop_id = engine.add_group("Drop").unwrap();

    let group = engine.state().group(drop_id).unwrap().clone();
    engine.soft_delete_group(group).unwrap();

    engine.fetch_all().unwrap();
    assert!(engine.state().group(keep_id).is_some());
    assert!(engine.state().group(drop_id).is_none());
}

#[test]
fn group_tombstone_keeps_member_tasks_deleted_across_refresh() {
    let mut engine = engine();
    let group_id = engine.add_group("Errands").unwrap();
    let member = engine.add_task(grouped_draft("groceries", group_id)).unwrap();

    let group = engine.state().group(group_id).unwrap().clone();
    engine.soft_delete_group(group).unwrap();

    engine.fetch_all().unwrap();
    let deleted = engine.state().deleted_task(member).unwrap();
    assert!(deleted.is_deleted);
    assert_eq!(deleted.group_id, Some(group_id));
}
