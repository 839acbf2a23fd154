//! End-to-end session save and restore

use cellsnap_core::{Cell, CellOptions, CellRegistry, LiveValue, ObservableRegistry, Value};
use cellsnap_session::{
    FileStore, KeyValueStore, MemoryStore, Session, SessionConfig, SessionError,
};
use serde_json::json;
use tempfile::TempDir;

const KEY: &str = "cellsnap/session";

fn stored_document(store: &impl KeyValueStore) -> serde_json::Value {
    let json = store.get_item(KEY).unwrap().expect("session stored");
    serde_json::from_str(&json).unwrap()
}

#[test]
fn test_save_stores_named_cells() {
    let mut session = Session::new(SessionConfig::default(), MemoryStore::new(), ObservableRegistry::new());
    session.registry().observable("Hello session", CellOptions::named("text"));
    session
        .registry()
        .observable(LiveValue::from(json!([0, 1, 2])), CellOptions::named("array"));

    session.save().unwrap();

    assert_eq!(
        stored_document(session.store()),
        json!({
            "nextId": 0,
            "observables": { "text": "Hello session", "array": [0, 1, 2] },
        })
    );
}

#[test]
fn test_restore_initializes_cells() {
    let mut store = MemoryStore::new();
    store
        .set_item(
            KEY,
            r#"{"nextId":0,"observables":{"text":"Hello session","array":[0,1,2]}}"#,
        )
        .unwrap();
    let mut session = Session::new(SessionConfig::default(), store, ObservableRegistry::new());

    session.restore().unwrap();

    let text = session
        .registry()
        .observable("will be overridden", CellOptions::named("text"));
    let array = session
        .registry()
        .observable(LiveValue::List(vec![]), CellOptions::named("array"));

    assert_eq!(text.get().as_str(), Some("Hello session"));
    assert_eq!(array.get().as_list().map(|items| items.len()), Some(3));
    assert!(text.ptr_eq(&session.registry().observable("again", CellOptions::named("text"))));
}

#[test]
fn test_restore_removes_stored_session() {
    let mut session = Session::new(SessionConfig::default(), MemoryStore::new(), ObservableRegistry::new());
    session.registry().observable(1i64, CellOptions::named("count"));
    session.save().unwrap();

    session.restore().unwrap();

    assert_eq!(session.store().get_item(KEY).unwrap(), None);
    let err = session.restore().unwrap_err();
    assert!(matches!(err, SessionError::NoSession));
}

#[test]
fn test_restore_without_session() {
    let mut session = Session::new(SessionConfig::default(), MemoryStore::new(), ObservableRegistry::new());

    let err = session.restore().unwrap_err();
    assert_eq!(err.to_string(), "No session to restore");
}

#[test]
fn test_save_restore_preserves_shared_anonymous_cells() {
    let mut session = Session::new(SessionConfig::default(), MemoryStore::new(), ObservableRegistry::new());
    let shared = session.registry().observable("shared", CellOptions::new());
    session.registry().observable(
        LiveValue::List(vec![shared.clone().into(), shared.into()]),
        CellOptions::named("pair"),
    );
    let saved = session.save().unwrap();

    let fresh = ObservableRegistry::new();
    let mut restored = Session::new(SessionConfig::default(), session.store().clone(), fresh);
    let cells = restored.restore().unwrap();

    let pair = cells["pair"].get();
    let items = pair.as_list().unwrap();
    assert!(items[0].as_cell().unwrap().ptr_eq(items[1].as_cell().unwrap()));
    assert_eq!(restored.id_base(), saved.next_id);

    let again = restored.create_snapshot().unwrap();
    assert_eq!(again.next_id, 2);
    assert_eq!(again.get("$1"), Some(&Value::from("shared")));
    assert_eq!(
        again.get("pair"),
        Some(&Value::from(json!([{ "$reference": "$1" }, { "$reference": "$1" }])))
    );
}

#[test]
fn test_repeated_restore_leaves_no_orphan_cells() {
    let mut config = SessionConfig::default();
    config.remove_after_restore = false;
    let mut session = Session::new(config, MemoryStore::new(), ObservableRegistry::new());
    let shared = Cell::observable("shared");
    session
        .registry()
        .observable(LiveValue::List(vec![shared.into()]), CellOptions::named("pair"));
    session.save().unwrap();

    session.restore().unwrap();
    session.restore().unwrap();
    let snapshot = session.create_snapshot().unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot.next_id, 2);
    assert_eq!(snapshot.get("$1"), Some(&Value::from("shared")));
    assert_eq!(
        snapshot.get("pair"),
        Some(&Value::from(json!([{ "$reference": "$1" }])))
    );
}

#[test]
fn test_diff_and_apply_between_saves() {
    let mut session = Session::new(SessionConfig::default(), MemoryStore::new(), ObservableRegistry::new());
    let text = session.registry().observable("first", CellOptions::named("text"));
    session.registry().observable(true, CellOptions::named("flag"));
    let before = session.create_snapshot().unwrap();

    text.set("second");
    let after = session.create_snapshot().unwrap();

    let patch = session.diff_snapshots(&before, &after);
    assert_eq!(
        Value::from(serde_json::to_value(&patch).unwrap()),
        Value::from(json!({ "u": { "observables": { "text": "second" } }, "d": "$del" }))
    );
    assert_eq!(session.apply_snapshot_diff(&before, &patch).unwrap(), after);
}

#[test]
fn test_file_store_session_from_config() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("cellsnap.yml");
    std::fs::write(&config_path, "storage_dir: state\npretty: true\n").unwrap();
    let config = SessionConfig::from_file(&config_path).unwrap();

    let mut session = Session::from_config_file(&config_path).unwrap();
    session.registry().observable("on disk", CellOptions::named("text"));
    session.save().unwrap();

    let on_disk = FileStore::new(temp.path().join("state"));
    let json = on_disk.get_item(KEY).unwrap().unwrap();
    assert!(json.contains('\n'));

    let mut reopened = Session::from_config(config);
    let cells = reopened.restore().unwrap();
    assert_eq!(cells["text"].get().as_str(), Some("on disk"));
    assert_eq!(reopened.registry().subscribables().len(), 1);
    assert_eq!(on_disk.get_item(KEY).unwrap(), None);
}
