//! Tests for read-only projections: full text, outline and preview blocks

use treetext::domain::editor;
use treetext::domain::projector::{self, PreviewBlock};
use treetext::domain::{NodeId, NodeStore};
use treetext::util::testing::{init_test_setup, tree};

fn sample() -> NodeStore {
    let store = tree("root", &[("root", "a"), ("a", "a1"), ("root", "b")]);
    let store = editor::set_content(&store, &NodeId::from("a"), "Alpha").unwrap();
    editor::rename(&store, &NodeId::from("a"), "Title A").unwrap()
}

#[test]
fn given_tree_when_rendering_full_text_then_contents_in_document_order() {
    init_test_setup();
    let text = projector::full_text(&sample());
    assert_eq!(text, "root\n\nAlpha\n\na1\n\nb\n\n");
}

#[test]
fn given_tree_when_rendering_outline_then_indented_titles_with_ids() {
    init_test_setup();
    let outline = projector::outline(&sample());
    assert_eq!(
        outline,
        "- root (id: root)\n  - Title A (id: a)\n    - a1 (id: a1)\n  - b (id: b)\n"
    );
}

#[test]
fn given_tree_when_previewing_then_one_block_per_node_with_source_id() {
    init_test_setup();
    let store = sample();

    let blocks: Vec<PreviewBlock> = projector::flat_preview(&store).collect();

    let ids: Vec<&str> = blocks.iter().map(|b| b.node_id.as_str()).collect();
    assert_eq!(ids, vec!["root", "a", "a1", "b"]);
    assert_eq!(blocks[1].text, "Alpha");
}

#[test]
fn given_preview_when_restarted_then_begins_at_root_again() {
    init_test_setup();
    let store = sample();

    let mut first = projector::flat_preview(&store);
    first.next();
    first.next();
    let resumed = first.clone();
    let rest: Vec<String> = resumed.map(|b| b.node_id.as_str().to_string()).collect();
    let fresh = projector::flat_preview(&store).next().unwrap();

    assert_eq!(rest, vec!["a1", "b"]);
    assert_eq!(fresh.node_id.as_str(), "root");
}

#[test]
fn given_walk_then_depths_follow_nesting() {
    init_test_setup();
    let store = sample();

    let depths: Vec<(usize, String)> = projector::walk(&store)
        .map(|(depth, node)| (depth, node.id.as_str().to_string()))
        .collect();

    assert_eq!(
        depths,
        vec![
            (0, "root".to_string()),
            (1, "a".to_string()),
            (2, "a1".to_string()),
            (1, "b".to_string()),
        ]
    );
}

#[test]
fn given_dangling_child_id_then_projections_skip_it() {
    init_test_setup();
    let store = tree("root", &[("root", "a"), ("root", "b")]);
    let store = store.without_nodes(&[NodeId::from("a")].into_iter().collect());

    assert_eq!(projector::full_text(&store), "root\n\nb\n\n");
    assert_eq!(projector::flat_preview(&store).count(), 2);
}
