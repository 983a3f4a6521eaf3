//! Loading, upgrading and serializing persisted workspace state.
//!
//! Persisted state is a JSON object of storage keys. Three layouts exist and
//! are upgraded in one direction only, once, at load time:
//!
//! - legacy single document under `document` (plus optional `ui_state`)
//! - unversioned collection under `documents`
//! - current collection under `documents_v2` with session state in `ui_state_v2`
//!
//! Keys are also recognized with the `treetextllm_` prefix written by older
//! releases. Saving always writes the current layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::application::error_ext::JsonResultExt;
use crate::application::registry::DocumentRegistry;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::document::store_from_pairs;
use crate::domain::{
    now_millis, Document, DocumentId, Node, NodeId, PersistedDocument, UiState, Violation,
    DEFAULT_DOCUMENT_NAME,
};

pub const KEY_DOCUMENTS: &str = "documents_v2";
pub const KEY_UI_STATE: &str = "ui_state_v2";
pub const KEY_DOCUMENTS_UNVERSIONED: &str = "documents";
pub const KEY_LEGACY_DOCUMENT: &str = "document";
pub const KEY_LEGACY_UI_STATE: &str = "ui_state";

const LEGACY_KEY_PREFIX: &str = "treetextllm_";

/// Layout the state was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Nothing usable was found; a seed document was created.
    NoData,
    /// Single legacy document.
    V1,
    /// Unversioned document collection.
    Unversioned,
    V2,
}

/// Result of [`load`]: a registry that always holds at least one document
/// with a resolvable active document.
#[derive(Debug)]
pub struct Loaded {
    pub registry: DocumentRegistry,
    pub source: SchemaVersion,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyDocument {
    root_id: NodeId,
    #[serde(alias = "docMap")]
    nodes: Vec<(NodeId, Node)>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyUiState {
    focused_node_id: Option<NodeId>,
    expanded_node_ids: Option<Vec<NodeId>>,
}

#[derive(Debug, Serialize)]
struct PersistedState<'a> {
    #[serde(rename = "documents_v2")]
    documents: BTreeMap<&'a DocumentId, PersistedDocument>,
    #[serde(rename = "ui_state_v2")]
    ui: &'a UiState,
}

/// Read persisted state. Never fails: unreadable input yields the seed document.
#[instrument(level = "debug", skip(raw), fields(len = raw.len()))]
pub fn load(raw: &[u8]) -> Loaded {
    if raw.iter().all(u8::is_ascii_whitespace) {
        debug!("load: no persisted state");
        return seed();
    }
    let map = match serde_json::from_slice::<Map<String, Value>>(raw) {
        Ok(map) => map,
        Err(e) => {
            warn!("persisted state unreadable, starting fresh: {}", e);
            return seed();
        }
    };
    match load_map(&map) {
        Ok(loaded) => loaded,
        Err(e) => {
            warn!("persisted state invalid, starting fresh: {}", e);
            seed()
        }
    }
}

fn load_map(map: &Map<String, Value>) -> Result<Loaded, serde_json::Error> {
    let ui = match lookup(map, KEY_UI_STATE) {
        Some(v) => UiState::deserialize(v).unwrap_or_else(|e| {
            warn!("ignoring unreadable UI state: {}", e);
            UiState::default()
        }),
        None => UiState::default(),
    };

    for (key, source) in [
        (KEY_DOCUMENTS, SchemaVersion::V2),
        (KEY_DOCUMENTS_UNVERSIONED, SchemaVersion::Unversioned),
    ] {
        if let Some(value) = lookup(map, key) {
            let docs = parse_collection(key, value);
            if !docs.is_empty() {
                debug!("load: {} documents from {}", docs.len(), key);
                if source != SchemaVersion::V2 {
                    info!("upgrading document collection from '{}'", key);
                }
                return Ok(Loaded {
                    registry: DocumentRegistry::new(docs, ui),
                    source,
                });
            }
        }
    }

    if let Some(value) = lookup(map, KEY_LEGACY_DOCUMENT) {
        let legacy = LegacyDocument::deserialize(value)?;
        let legacy_ui = lookup(map, KEY_LEGACY_UI_STATE)
            .and_then(|v| LegacyUiState::deserialize(v).ok())
            .unwrap_or_default();
        info!("upgrading legacy single document");
        return Ok(migrate_legacy(legacy, legacy_ui));
    }

    Ok(seed())
}

fn lookup<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key)
        .or_else(|| map.get(&format!("{LEGACY_KEY_PREFIX}{key}")))
        .filter(|v| !v.is_null())
}

/// A collection is either `{id: document}` or `[document, ...]`.
///
/// Entries are read one by one; an unreadable entry is skipped with a warning
/// and does not affect its siblings.
fn parse_collection(key: &str, value: &Value) -> Vec<Document> {
    let entries: Vec<&Value> = match value {
        Value::Object(by_id) => by_id.values().collect(),
        Value::Array(items) => items.iter().collect(),
        other => {
            warn!("ignoring '{}': expected object or array, got {}", key, other);
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match PersistedDocument::deserialize(entry) {
            Ok(persisted) => {
                let doc = Document::from(persisted);
                warn_violations(&doc);
                Some(doc)
            }
            Err(e) => {
                warn!("skipping unreadable document #{} in '{}': {}", index, key, e);
                None
            }
        })
        .collect()
}

fn migrate_legacy(legacy: LegacyDocument, legacy_ui: LegacyUiState) -> Loaded {
    let root_id = legacy.root_id;
    let store = store_from_pairs(root_id.clone(), legacy.nodes);
    let name = store
        .root()
        .map(|root| root.title.clone())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string());

    let doc = Document {
        id: DocumentId::generate(),
        name,
        store,
        last_modified: now_millis(),
    };
    warn_violations(&doc);

    let ui = UiState {
        active_document_id: Some(doc.id.clone()),
        focused_node_id: Some(legacy_ui.focused_node_id.unwrap_or_else(|| root_id.clone())),
        expanded_node_ids: legacy_ui.expanded_node_ids.unwrap_or_else(|| vec![root_id]),
        ..UiState::default()
    };
    Loaded {
        registry: DocumentRegistry::new(vec![doc], ui),
        source: SchemaVersion::V1,
    }
}

fn seed() -> Loaded {
    let doc = Document::seed();
    let ui = UiState::for_document(doc.id.clone(), doc.root_id());
    Loaded {
        registry: DocumentRegistry::new(vec![doc], ui),
        source: SchemaVersion::NoData,
    }
}

fn warn_violations(doc: &Document) {
    for violation in doc.store.validate() {
        warn!("document {}: {}", doc.id, violation);
    }
}

/// Validate a single serialized document as produced by JSON export.
///
/// `id`, `name` and `rootId` must be strings and the node collection
/// (`nodes` or `docMap`) an array; the root must resolve among the nodes.
/// A cycle, a root that has a parent or is listed as a child, or a dangling
/// parent link rejects the payload; other violations are only logged.
pub fn parse_document_payload(raw: &[u8]) -> ApplicationResult<Document> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| ApplicationError::validation(format!("not valid JSON: {e}")))?;
    let Value::Object(map) = &value else {
        return Err(ApplicationError::validation("expected a JSON object"));
    };
    for field in ["id", "name", "rootId"] {
        if !map.get(field).is_some_and(Value::is_string) {
            return Err(ApplicationError::validation(format!(
                "missing or non-string field '{field}'"
            )));
        }
    }
    if !map
        .get("nodes")
        .or_else(|| map.get("docMap"))
        .is_some_and(Value::is_array)
    {
        return Err(ApplicationError::validation("missing node list 'nodes'"));
    }

    let persisted = PersistedDocument::deserialize(&value)
        .map_err(|e| ApplicationError::validation(e.to_string()))?;
    let doc = Document::from(persisted);
    if doc.store.root().is_none() {
        return Err(ApplicationError::validation(format!(
            "root node {} not found among nodes",
            doc.root_id()
        )));
    }
    let violations = doc.store.validate();
    if let Some(fatal) = violations.iter().find(|v| {
        matches!(
            v,
            Violation::Cycle(_)
                | Violation::RootAsChild { .. }
                | Violation::DanglingParent { .. }
                | Violation::RootHasParent(_)
        )
    }) {
        return Err(ApplicationError::validation(format!("malformed tree: {fatal}")));
    }
    for violation in violations {
        warn!("document {}: {}", doc.id, violation);
    }
    Ok(doc)
}

/// Serialize the registry in the current layout.
pub fn serialize_state(registry: &DocumentRegistry) -> ApplicationResult<String> {
    let state = PersistedState {
        documents: registry
            .documents()
            .iter()
            .map(|d| (&d.id, d.to_persisted()))
            .collect(),
        ui: registry.ui(),
    };
    serde_json::to_string_pretty(&state).with_json_context("serialize workspace state")
}
