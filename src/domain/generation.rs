//! Contract with the external text-generation backend.
//!
//! The tree model never talks to a backend itself. Callers build a
//! [`GenerationRequest`], hand it to a backend, and turn the reply into a
//! [`Suggestion`] or [`NodeDraft`] that may later be applied to the tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::domain::NodeId;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a writing assistant. A user will provide you with text, a prompt, and the document's outline for context. Modify the text based on the user's prompt. Return only the modified text.";

const JSON_ONLY_SYSTEM_PROMPT: &str = "You are an assistant that only responds in JSON.";

/// Title used when a generated node comes back without one.
pub const UNTITLED_NODE: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A conversation plus the optional "respond as a JSON object" directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub json_response: bool,
}

/// Failure of a backend exchange. Never mapped to empty content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("generation backend not configured: set backend.base_url")]
    NotConfigured,

    #[error("invalid generation backend url '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("could not connect to generation backend at {url}: {message}")]
    Connect { url: String, message: String },

    #[error("generation backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected generation backend response: {0}")]
    InvalidResponse(String),
}

/// Proposed replacement content for a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    /// The reply was not the expected JSON shape; `text` is the raw reply.
    pub malformed: bool,
}

/// Proposed title and content for a new node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDraft {
    pub title: String,
    pub content: String,
    pub malformed: bool,
}

/// Request asking the backend to rewrite `content` of `node_id` according to `prompt`.
///
/// When `outline` is non-empty it is included so the backend knows where the
/// node sits in the document.
pub fn rewrite_request(
    model: &str,
    system_prompt: &str,
    node_id: &NodeId,
    content: &str,
    prompt: &str,
    outline: &str,
) -> GenerationRequest {
    let mut message = format!(
        "A user has provided text from a document node and a prompt. Modify the text based on the user's prompt, keeping the overall document structure and context in mind.\n\n\
         User Prompt: {prompt}\n\
         Original Text (from node with ID: {node_id}):\n---\n{content}\n---\n\n\
         Return a JSON object with a single key \"suggestion\" containing only the modified text."
    );
    if !outline.is_empty() {
        message = format!(
            "You are editing a node within a larger document. Use the following document outline to understand the context of the node you are modifying. The user is currently focused on the node with ID: {node_id}.\n\n\
             Document Outline:\n---\n{outline}---\n\n{message}"
        );
    }
    GenerationRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(message)],
        json_response: true,
    }
}

/// Request asking the backend for a title and content of a new child of `parent_id`.
pub fn child_request(model: &str, parent_id: &NodeId, intent: &str) -> GenerationRequest {
    let message = format!(
        "You are a document creation assistant. Given a parent node ID and a description of the desired content, generate a relevant title and initial content for a new document node.\n\n\
         Parent Node ID: {parent_id}\n\
         Intent: {intent}\n\n\
         Return the result as a JSON object with two keys: \"title\" and \"content\"."
    );
    GenerationRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(JSON_ONLY_SYSTEM_PROMPT),
            ChatMessage::user(message),
        ],
        json_response: true,
    }
}

/// Interpret a rewrite reply. Anything other than `{"suggestion": "<text>"}`
/// falls back to the raw reply.
pub fn parse_suggestion(raw: &str) -> Suggestion {
    let raw = raw.trim();
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => match map.get("suggestion") {
            Some(Value::String(s)) if !s.is_empty() => Suggestion {
                text: s.clone(),
                malformed: false,
            },
            _ => raw_suggestion(raw),
        },
        _ => raw_suggestion(raw),
    }
}

fn raw_suggestion(raw: &str) -> Suggestion {
    warn!("backend reply is not a suggestion object, using raw output");
    Suggestion {
        text: raw.to_string(),
        malformed: true,
    }
}

/// Interpret a node-creation reply of the form `{"title": ..., "content": ...}`.
///
/// Missing title becomes `"Untitled"`, missing content becomes the title. A
/// reply that is not a JSON object is kept as the content of an untitled node.
pub fn parse_node_draft(raw: &str) -> NodeDraft {
    let raw = raw.trim();
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw) else {
        warn!("backend reply is not a node object, using raw output");
        let content = if raw.is_empty() { UNTITLED_NODE } else { raw };
        return NodeDraft {
            title: UNTITLED_NODE.to_string(),
            content: content.to_string(),
            malformed: true,
        };
    };

    let field = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let title = field("title").unwrap_or_else(|| UNTITLED_NODE.to_string());
    let content = field("content").unwrap_or_else(|| title.clone());
    NodeDraft {
        title,
        content,
        malformed: false,
    }
}
