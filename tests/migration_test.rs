//! Tests for loading persisted state in every supported layout
//!
//! Layouts:
//! - current: `documents_v2` (map by id, or array) + `ui_state_v2`
//! - unversioned: `documents`
//! - legacy: single `document` + `ui_state`
//!
//! Whatever the input, loading yields at least one document and a resolvable
//! active document.

use rstest::rstest;
use serde_json::json;

use treetext::application::migrator::{self, SchemaVersion};
use treetext::domain::{NodeId, View, DEFAULT_DOCUMENT_NAME};
use treetext::util::testing::init_test_setup;

fn persisted_doc(id: &str, name: &str, last_modified: i64) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "rootId": format!("{id}-root"),
        "lastModified": last_modified,
        "nodes": [
            [format!("{id}-root"), {
                "id": format!("{id}-root"),
                "title": name,
                "content": name,
                "childrenIds": [format!("{id}-c")],
                "parentId": null
            }],
            [format!("{id}-c"), {
                "id": format!("{id}-c"),
                "title": "Child",
                "content": "child text",
                "childrenIds": [],
                "parentId": format!("{id}-root")
            }]
        ]
    })
}

fn legacy_payload(root_title: &str) -> serde_json::Value {
    json!({
        "document": {
            "rootId": "r",
            "nodes": [
                ["r", {"id": "r", "title": root_title, "content": "", "childrenIds": ["x"], "parentId": null}],
                ["x", {"id": "x", "title": "X", "content": "x", "childrenIds": [], "parentId": "r"}]
            ]
        }
    })
}

fn load_json(value: serde_json::Value) -> migrator::Loaded {
    migrator::load(value.to_string().as_bytes())
}

// ============================================================
// Current layout
// ============================================================

#[test]
fn given_v2_map_with_ui_state_then_documents_and_session_restored() {
    init_test_setup();
    let raw = json!({
        "documents_v2": {
            "d1": persisted_doc("d1", "First", 100),
            "d2": persisted_doc("d2", "Second", 200),
        },
        "ui_state_v2": {
            "activeDocumentId": "d1",
            "focusedNodeId": "d1-c",
            "expandedNodeIds": ["d1-root"],
            "activeView": "preview"
        }
    });

    let loaded = load_json(raw);

    assert_eq!(loaded.source, SchemaVersion::V2);
    assert_eq!(loaded.registry.len(), 2);
    let active = loaded.registry.active().unwrap();
    assert_eq!(active.name, "First");
    assert_eq!(loaded.registry.focused_node_id(), Some(&NodeId::from("d1-c")));
    assert_eq!(loaded.registry.ui().active_view, View::Preview);
}

#[test]
fn given_v2_array_without_ui_state_then_most_recent_becomes_active() {
    init_test_setup();
    let raw = json!({
        "documents_v2": [persisted_doc("d1", "First", 100), persisted_doc("d2", "Second", 200)]
    });

    let loaded = load_json(raw);

    assert_eq!(loaded.source, SchemaVersion::V2);
    assert_eq!(loaded.registry.active().unwrap().name, "Second");
}

#[test]
fn given_unversioned_collection_then_loaded_as_unversioned() {
    init_test_setup();
    let raw = json!({ "documents": { "d1": persisted_doc("d1", "Old Collection", 5) } });

    let loaded = load_json(raw);

    assert_eq!(loaded.source, SchemaVersion::Unversioned);
    assert_eq!(loaded.registry.active().unwrap().name, "Old Collection");
}

#[test]
fn given_both_layouts_then_current_wins() {
    init_test_setup();
    let raw = json!({
        "documents": { "old": persisted_doc("old", "Old", 1) },
        "documents_v2": { "new": persisted_doc("new", "New", 2) }
    });

    let loaded = load_json(raw);

    assert_eq!(loaded.source, SchemaVersion::V2);
    assert_eq!(loaded.registry.len(), 1);
    assert_eq!(loaded.registry.active().unwrap().name, "New");
}

#[test]
fn given_active_id_pointing_nowhere_then_most_recent_selected() {
    init_test_setup();
    let raw = json!({
        "documents_v2": {
            "d1": persisted_doc("d1", "First", 300),
            "d2": persisted_doc("d2", "Second", 200),
        },
        "ui_state_v2": { "activeDocumentId": "d9", "focusedNodeId": "d9-root" }
    });

    let loaded = load_json(raw);

    let active = loaded.registry.active().unwrap();
    assert_eq!(active.name, "First");
    assert_eq!(loaded.registry.focused_node_id(), Some(active.root_id()));
}

// ============================================================
// Legacy layout
// ============================================================

#[test]
fn given_legacy_document_then_one_document_named_after_root() {
    init_test_setup();
    let loaded = load_json(legacy_payload("Thesis"));

    assert_eq!(loaded.source, SchemaVersion::V1);
    assert_eq!(loaded.registry.len(), 1);
    let doc = loaded.registry.active().unwrap();
    assert_eq!(doc.root_id(), &NodeId::from("r"));
    assert_eq!(doc.name, "Thesis");
    assert_eq!(doc.store.len(), 2);
    assert_eq!(loaded.registry.focused_node_id(), Some(&NodeId::from("r")));
    assert!(loaded.registry.ui().is_expanded(&NodeId::from("r")));
}

#[test]
fn given_legacy_document_with_blank_root_title_then_default_name() {
    init_test_setup();
    let loaded = load_json(legacy_payload(""));
    assert_eq!(loaded.registry.active().unwrap().name, DEFAULT_DOCUMENT_NAME);
}

#[test]
fn given_legacy_ui_state_then_focus_and_expansion_carried_over() {
    init_test_setup();
    let mut raw = legacy_payload("Thesis");
    raw["ui_state"] = json!({ "focusedNodeId": "x", "expandedNodeIds": ["r", "x"] });

    let loaded = load_json(raw);

    assert_eq!(loaded.registry.focused_node_id(), Some(&NodeId::from("x")));
    assert!(loaded.registry.ui().is_expanded(&NodeId::from("x")));
}

#[test]
fn given_legacy_doc_map_field_then_accepted() {
    init_test_setup();
    let raw = json!({
        "document": {
            "rootId": "r",
            "docMap": [["r", {"id": "r", "title": "Mapped", "childrenIds": []}]]
        }
    });

    let loaded = load_json(raw);

    assert_eq!(loaded.source, SchemaVersion::V1);
    assert_eq!(loaded.registry.active().unwrap().name, "Mapped");
}

#[test]
fn given_prefixed_current_keys_then_recognized() {
    init_test_setup();
    let raw = json!({
        "treetextllm_documents_v2": { "d1": persisted_doc("d1", "Prefixed", 1) }
    });

    let loaded = load_json(raw);

    assert_eq!(loaded.source, SchemaVersion::V2);
    assert_eq!(loaded.registry.active().unwrap().name, "Prefixed");
}

#[test]
fn given_one_unreadable_document_then_readable_siblings_kept() {
    init_test_setup();
    let mut broken = persisted_doc("d2", "Broken", 200);
    broken["nodes"][0][1]
        .as_object_mut()
        .unwrap()
        .remove("title");
    let mut good = persisted_doc("d1", "Good", 100);
    good["nodes"][0][1]["content"] = json!("precious");
    let raw = json!({ "documents_v2": { "d1": good, "d2": broken } });

    let loaded = load_json(raw);

    assert_eq!(loaded.source, SchemaVersion::V2);
    assert_eq!(loaded.registry.len(), 1);
    let doc = loaded.registry.active().unwrap();
    assert_eq!(doc.id.as_str(), "d1");
    assert_eq!(doc.store.root().unwrap().content, "precious");
}

#[test]
fn given_every_current_document_unreadable_then_legacy_layout_used() {
    init_test_setup();
    let mut raw = legacy_payload("Fallback");
    raw["documents_v2"] = json!([{ "id": "d1" }]);

    let loaded = load_json(raw);

    assert_eq!(loaded.source, SchemaVersion::V1);
    assert_eq!(loaded.registry.active().unwrap().name, "Fallback");
}

// ============================================================
// Unusable input
// ============================================================

#[rstest]
#[case::empty("")]
#[case::whitespace("  \n")]
#[case::not_json("{broken")]
#[case::not_an_object("[1, 2, 3]")]
#[case::no_known_keys(r#"{"something": 1}"#)]
#[case::wrong_shape(r#"{"documents_v2": 42}"#)]
#[case::empty_collection(r#"{"documents_v2": {}}"#)]
fn given_unusable_state_then_seed_document(#[case] raw: &str) {
    init_test_setup();
    let loaded = migrator::load(raw.as_bytes());

    assert_eq!(loaded.source, SchemaVersion::NoData);
    assert_eq!(loaded.registry.len(), 1);
    let doc = loaded.registry.active().unwrap();
    assert_eq!(doc.name, DEFAULT_DOCUMENT_NAME);
    assert_eq!(doc.store.len(), 2);
    assert!(doc.store.validate().is_empty());
}

// ============================================================
// Save / load
// ============================================================

#[test]
fn given_loaded_legacy_state_when_serialized_then_reloads_as_current_layout() {
    init_test_setup();
    let first = load_json(legacy_payload("Thesis"));

    let saved = migrator::serialize_state(&first.registry).unwrap();
    let second = migrator::load(saved.as_bytes());

    assert_eq!(second.source, SchemaVersion::V2);
    let (a, b) = (
        first.registry.active().unwrap(),
        second.registry.active().unwrap(),
    );
    assert_eq!(a.id, b.id);
    assert_eq!(a.name, b.name);
    assert_eq!(a.store, b.store);
    assert_eq!(first.registry.ui(), second.registry.ui());

    let value: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert!(value.get("documents_v2").is_some_and(|v| v.is_object()));
    assert!(value.get("ui_state_v2").is_some());
    assert!(value.get("document").is_none());
}
