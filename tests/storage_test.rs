//! Map files on disk and the editing session around them

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rstest::rstest;
use tempfile::TempDir;

use mindmap::application::services::MapStorage;
use mindmap::application::{ApplicationError, SaveOutcome, Session};
use mindmap::domain::{DomainError, MindMap};
use mindmap::infrastructure::traits::RealFileSystem;
use mindmap::util::testing;

fn storage() -> MapStorage {
    testing::init_test_setup();
    MapStorage::new(Arc::new(RealFileSystem))
}

fn sample() -> MindMap {
    let mut map = MindMap::new("Trip");
    let tickets = map.add_node("Tickets", None).unwrap();
    map.add_node("Train", Some(&tickets)).unwrap();
    map.add_node("Hotel", None).unwrap();
    map
}

#[test]
fn given_map_when_saved_and_loaded_then_identical() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested").join("trip.json");
    let storage = storage();
    let map = sample();

    storage.save(&map, &path).unwrap();
    let loaded = storage.load(&path).unwrap();

    assert_eq!(loaded.to_document(), map.to_document());
    assert_eq!(loaded.title(), "Trip");
}

#[test]
fn given_saved_map_when_reading_file_then_is_versioned_json() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("trip.json");
    storage().save(&sample(), &path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(value["version"], 1);
    assert_eq!(value["title"], "Trip");
    assert_eq!(value["nodes"].as_array().unwrap().len(), 4);
    assert_eq!(value["nodes"][0]["text"], "Tickets");
    assert!(value["nodes"][0]["parent_id"].is_null());
}

#[test]
fn given_missing_file_when_loading_then_map_file_not_found() {
    let temp = TempDir::new().unwrap();
    let result = storage().load(&temp.path().join("nope.json"));
    assert!(matches!(result, Err(ApplicationError::MapFileNotFound(_))));
}

#[rstest]
#[case("")]
#[case("  \n")]
fn given_empty_file_when_loading_then_empty_map_named_after_file(#[case] content: &str) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("blank.json");
    fs::write(&path, content).unwrap();

    let map = storage().load(&path).unwrap();

    assert!(map.is_empty());
    assert_eq!(map.title(), "blank");
}

#[test]
fn given_invalid_json_when_loading_then_invalid_format() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.json");
    fs::write(&path, "{ not json").unwrap();

    let result = storage().load(&path);

    assert!(matches!(result, Err(ApplicationError::InvalidFormat { .. })));
}

#[rstest]
#[case::too_deep(
    r#"{"title":"t","nodes":[
        {"id":"00000000-0000-0000-0000-000000000001","text":"a","children":["00000000-0000-0000-0000-000000000002"]},
        {"id":"00000000-0000-0000-0000-000000000002","text":"b","parent_id":"00000000-0000-0000-0000-000000000001","children":["00000000-0000-0000-0000-000000000003"]},
        {"id":"00000000-0000-0000-0000-000000000003","text":"c","parent_id":"00000000-0000-0000-0000-000000000002","children":["00000000-0000-0000-0000-000000000004"]},
        {"id":"00000000-0000-0000-0000-000000000004","text":"d","parent_id":"00000000-0000-0000-0000-000000000003"}
    ]}"#
)]
#[case::missing_parent(
    r#"{"title":"t","nodes":[
        {"id":"00000000-0000-0000-0000-000000000001","text":"a","parent_id":"00000000-0000-0000-0000-000000000009"}
    ]}"#
)]
#[case::duplicate_id(
    r#"{"title":"t","nodes":[
        {"id":"00000000-0000-0000-0000-000000000001","text":"a"},
        {"id":"00000000-0000-0000-0000-000000000001","text":"b"}
    ]}"#
)]
#[case::future_version(r#"{"title":"t","version":99,"nodes":[]}"#)]
fn given_broken_document_when_loading_then_corrupt_data(#[case] content: &str) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.json");
    fs::write(&path, content).unwrap();

    let result = storage().load(&path);

    assert!(
        matches!(result, Err(ApplicationError::Domain(DomainError::CorruptData(_)))),
        "got {:?}",
        result.map(|m| m.len())
    );
}

#[test]
fn given_existing_file_when_creating_without_force_then_already_exists() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("trip.json");
    let storage = storage();
    storage.save(&sample(), &path).unwrap();

    let result = storage.create(&path, "Other", false);
    assert!(matches!(result, Err(ApplicationError::AlreadyExists(_))));
    assert_eq!(storage.load(&path).unwrap().len(), 4);

    storage.create(&path, "Other", true).unwrap();
    let replaced = storage.load(&path).unwrap();
    assert!(replaced.is_empty());
    assert_eq!(replaced.title(), "Other");
}

#[test]
fn given_data_dir_when_listing_maps_then_only_json_files_sorted() {
    let temp = TempDir::new().unwrap();
    for name in ["b.json", "a.json", "notes.txt"] {
        fs::write(temp.path().join(name), "").unwrap();
    }
    fs::create_dir(temp.path().join("sub.json")).unwrap();
    let storage = storage();

    let maps = storage.list_maps(temp.path()).unwrap();
    let names: Vec<String> = maps
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, vec!["a.json", "b.json"]);
    assert!(storage.list_maps(&temp.path().join("missing")).unwrap().is_empty());
}

#[test]
fn given_map_when_exporting_then_writes_text_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out").join("trip.txt");

    storage().export(&sample(), &path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Tickets (ID: "));
    assert!(text.contains("[CARD]"));
}

// ============================================================
// Session
// ============================================================

fn session(autosave: bool) -> Session {
    Session::new(storage(), autosave)
}

fn file_len(path: &Path) -> usize {
    storage().load(path).unwrap().len()
}

#[test]
fn given_no_map_when_mutating_then_no_map_loaded() {
    let mut session = session(true);

    assert!(matches!(session.map(), Err(ApplicationError::NoMapLoaded)));
    assert!(matches!(session.add_node("x", None), Err(ApplicationError::NoMapLoaded)));
    assert!(matches!(session.save(None), Err(ApplicationError::NoMapLoaded)));
}

#[test]
fn given_autosave_when_adding_then_file_is_updated() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("m.json");
    let mut session = session(true);
    session.new_map(&path, "M", false).unwrap();

    let (_, outcome) = session.add_node("card", None).unwrap();

    assert_eq!(outcome, SaveOutcome::Saved(path.clone()));
    assert!(!session.is_dirty());
    assert_eq!(file_len(&path), 1);
}

#[test]
fn given_autosave_off_when_adding_then_file_changes_only_on_save() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("m.json");
    let mut session = session(false);
    session.new_map(&path, "M", false).unwrap();

    let (_, outcome) = session.add_node("card", None).unwrap();
    assert_eq!(outcome, SaveOutcome::Pending);
    assert!(session.is_dirty());
    assert_eq!(file_len(&path), 0);

    session.save(None).unwrap();
    assert_eq!(file_len(&path), 1);
}

#[test]
fn given_failed_mutation_when_autosaving_then_nothing_changes() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("m.json");
    let mut session = session(true);
    session.new_map(&path, "M", false).unwrap();
    let before = fs::read_to_string(&path).unwrap();

    let result = session.add_node("  ", None);

    assert!(matches!(result, Err(ApplicationError::Domain(DomainError::Validation(_)))));
    assert!(!session.is_dirty());
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn given_unwritable_target_when_autosaving_then_change_is_rolled_back() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    let mut session = session(true);
    session.open_or_create(&blocker.join("map.json")).unwrap();

    let result = session.add_node("Card", None);

    assert!(result.is_err());
    assert!(session.map().unwrap().is_empty());
    assert!(session.is_dirty());
}

#[test]
fn given_directory_replaced_by_file_when_editing_then_text_is_kept() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("maps");
    let path = dir.join("m.json");
    let mut session = session(true);
    session.new_map(&path, "M", false).unwrap();
    let (card, _) = session.add_node("card", None).unwrap();
    fs::remove_dir_all(&dir).unwrap();
    fs::write(&dir, "").unwrap();

    let result = session.edit_node(&card, "renamed");

    assert!(result.is_err());
    assert_eq!(session.map().unwrap().node(&card).unwrap().text, "card");
    assert!(!session.is_dirty());
}

#[test]
fn given_missing_file_when_open_or_create_then_starts_unsaved_map() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("fresh.json");
    let mut session = session(true);

    assert!(session.open_or_create(&path).unwrap());
    assert!(session.is_dirty());
    assert!(!path.exists());

    session.add_node("first", None).unwrap();
    assert!(path.exists());
    assert_eq!(session.map().unwrap().title(), "fresh");
}

#[test]
fn given_save_as_when_saving_then_new_path_becomes_current() {
    let temp = TempDir::new().unwrap();
    let first = temp.path().join("first.json");
    let second = temp.path().join("second.json");
    let mut session = session(true);
    session.new_map(&first, "M", false).unwrap();

    session.save(Some(&second)).unwrap();
    session.add_node("card", None).unwrap();

    assert_eq!(session.path(), Some(second.as_path()));
    assert_eq!(file_len(&second), 1);
    assert_eq!(file_len(&first), 0);
}

#[test]
fn given_card_when_deleting_through_session_then_confirmation_is_enforced() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("m.json");
    let mut session = session(true);
    session.new_map(&path, "M", false).unwrap();
    let (card, _) = session.add_node("card", None).unwrap();

    let refused = session.delete_node(&card, false);
    assert!(matches!(
        refused,
        Err(ApplicationError::Domain(DomainError::ConfirmationRequired { .. }))
    ));
    assert_eq!(file_len(&path), 1);

    let (removed, _) = session.delete_node(&card, true).unwrap();
    assert_eq!(removed, vec![card]);
    assert_eq!(file_len(&path), 0);
}

#[test]
fn given_loaded_map_when_closing_then_nothing_loaded() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("m.json");
    let mut session = session(false);
    session.new_map(&path, "M", false).unwrap();
    session.add_node("unsaved", None).unwrap();

    session.close();

    assert!(!session.is_loaded());
    assert!(!session.is_dirty());
    assert_eq!(session.path(), None);
    assert_eq!(file_len(&path), 0);
}
