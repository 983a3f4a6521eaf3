//! Helpers shared by unit and integration tests

use std::env;
use std::sync::Once;

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::editor;
use crate::domain::{Node, NodeId, NodeStore};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("treetext=debug")
    };

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Build a tree from `(parent, child)` edges, in order. Every node's title and
/// content are its id.
///
/// ```ignore
/// let store = tree("root", &[("root", "a"), ("a", "a1"), ("root", "b")]);
/// ```
pub fn tree(root: &str, edges: &[(&str, &str)]) -> NodeStore {
    edges.iter().fold(
        NodeStore::new(Node::new(NodeId::from(root), root)),
        |store, (parent, child)| {
            editor::create_node(&store, &NodeId::from(*parent), Node::new(NodeId::from(*child), *child))
        },
    )
}

/// Child ids of `id`, as plain strings.
pub fn child_ids(store: &NodeStore, id: &str) -> Vec<String> {
    store
        .get(&NodeId::from(id))
        .map(|n| n.children_ids.iter().map(|c| c.as_str().to_string()).collect())
        .unwrap_or_default()
}

/// Parent id of `id`, as a plain string.
pub fn parent_id(store: &NodeStore, id: &str) -> Option<String> {
    store
        .get(&NodeId::from(id))
        .and_then(|n| n.parent_id.as_ref())
        .map(|p| p.as_str().to_string())
}
