//! Tests for validating imported documents
//!
//! A rejected import must leave the registry exactly as it was.

use rstest::rstest;

use treetext::application::{ApplicationError, DocumentRegistry};
use treetext::util::testing::init_test_setup;

const VALID: &str = r#"{
  "id": "doc-imported",
  "name": "Imported",
  "rootId": "r",
  "lastModified": 1,
  "nodes": [
    ["r", {"id": "r", "title": "Imported", "content": "top", "childrenIds": ["c"], "parentId": null}],
    ["c", {"id": "c", "title": "C", "content": "child", "childrenIds": [], "parentId": "r"}]
  ]
}"#;

fn registry() -> DocumentRegistry {
    let mut reg = DocumentRegistry::default();
    reg.create_document("Existing");
    reg
}

#[test]
fn given_valid_payload_when_importing_then_added_and_active() {
    init_test_setup();
    let mut reg = registry();

    let id = reg.import_document(VALID.as_bytes()).unwrap();

    assert_eq!(id.as_str(), "doc-imported");
    assert_eq!(reg.len(), 2);
    let doc = reg.active().unwrap();
    assert_eq!(doc.name, "Imported");
    assert_eq!(doc.store.len(), 2);
    assert!(doc.last_modified > 1, "import refreshes lastModified");
}

#[test]
fn given_doc_map_field_when_importing_then_accepted() {
    init_test_setup();
    let mut reg = registry();
    let payload = VALID.replace("\"nodes\"", "\"docMap\"");

    assert!(reg.import_document(payload.as_bytes()).is_ok());
}

#[test]
fn given_same_id_imported_twice_then_replaced_not_duplicated() {
    init_test_setup();
    let mut reg = registry();

    reg.import_document(VALID.as_bytes()).unwrap();
    reg.import_document(VALID.as_bytes()).unwrap();

    assert_eq!(reg.len(), 2);
}

#[rstest]
#[case::not_json("{oops")]
#[case::not_object(r#"["id", "name"]"#)]
#[case::missing_id(r#"{"name": "n", "rootId": "r", "nodes": []}"#)]
#[case::numeric_name(r#"{"id": "d", "name": 5, "rootId": "r", "nodes": []}"#)]
#[case::missing_root_id(r#"{"id": "d", "name": "n", "nodes": []}"#)]
#[case::nodes_not_array(r#"{"id": "d", "name": "n", "rootId": "r", "nodes": {}}"#)]
#[case::missing_nodes(r#"{"id": "d", "name": "n", "rootId": "r"}"#)]
#[case::root_not_among_nodes(
    r#"{"id": "d", "name": "n", "rootId": "r", "nodes": [["x", {"id": "x", "title": "X"}]]}"#
)]
#[case::root_listed_as_child(
    r#"{"id": "d", "name": "n", "rootId": "r", "nodes": [
        ["r", {"id": "r", "title": "R", "childrenIds": ["a"], "parentId": null}],
        ["a", {"id": "a", "title": "A", "childrenIds": ["r"], "parentId": "r"}]
    ]}"#
)]
#[case::parent_cycle(
    r#"{"id": "d", "name": "n", "rootId": "r", "nodes": [
        ["r", {"id": "r", "title": "R", "childrenIds": []}],
        ["a", {"id": "a", "title": "A", "childrenIds": ["b"], "parentId": "b"}],
        ["b", {"id": "b", "title": "B", "childrenIds": ["a"], "parentId": "a"}]
    ]}"#
)]
#[case::root_with_parent(
    r#"{"id": "d", "name": "n", "rootId": "r", "nodes": [
        ["r", {"id": "r", "title": "R", "childrenIds": ["a"], "parentId": "a"}],
        ["a", {"id": "a", "title": "A", "childrenIds": ["r"], "parentId": "r"}]
    ]}"#
)]
#[case::dangling_parent(
    r#"{"id": "d", "name": "n", "rootId": "r", "nodes": [
        ["r", {"id": "r", "title": "R", "childrenIds": []}],
        ["x", {"id": "x", "title": "X", "childrenIds": [], "parentId": "gone"}]
    ]}"#
)]
fn given_invalid_payload_when_importing_then_rejected_and_registry_unchanged(#[case] raw: &str) {
    init_test_setup();
    let mut reg = registry();
    let before_active = reg.ui().clone();

    let result = reg.import_document(raw.as_bytes());

    assert!(
        matches!(result, Err(ApplicationError::Validation(_))),
        "expected validation error, got {result:?}"
    );
    assert_eq!(reg.len(), 1);
    assert_eq!(reg.ui(), &before_active);
}
