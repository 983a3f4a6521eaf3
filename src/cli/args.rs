//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

use crate::domain::{Direction, View};

/// Hierarchical document editor: outline trees of content nodes, export, and assisted rewriting
#[derive(Parser, Debug)]
#[command(name = "treetext")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Workspace state file (overrides config)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub state: Option<PathBuf>,

    /// Extra config file, applied after the global one
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage documents
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },

    /// Edit nodes of the active document
    Node {
        #[command(subcommand)]
        command: NodeCommands,
    },

    /// Show the active document as a tree
    Tree {
        /// Ignore collapsed state and show every node
        #[arg(short, long)]
        all: bool,
    },

    /// Print the outline of the active document
    Outline,

    /// Print node contents in document order
    Preview {
        /// Prefix each block with its node id
        #[arg(long)]
        ids: bool,
    },

    /// Switch the active view
    View {
        /// outline, editor or preview
        view: View,
    },

    /// Export the active document
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },

    /// Import a document exported as JSON
    Import {
        /// JSON document file
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Add files as child nodes (title = file name without extension)
    BatchImport {
        /// Parent node (default: focused node)
        #[arg(short, long)]
        parent: Option<String>,

        /// Files or directories (directories contribute their files, not recursive)
        #[arg(required = true, value_hint = ValueHint::AnyPath)]
        paths: Vec<PathBuf>,
    },

    /// Ask the generation backend to rewrite a node
    Prompt {
        /// Instruction for the rewrite
        text: String,

        /// Node to rewrite (default: focused node)
        #[arg(short, long)]
        node: Option<String>,

        /// Apply the suggestion instead of only showing it
        #[arg(long)]
        accept: bool,
    },

    /// Create a child node from a description using the generation backend
    Generate {
        /// What the new node should contain
        intent: String,

        /// Parent node (default: focused node)
        #[arg(short, long)]
        parent: Option<String>,

        /// Show the proposed node without adding it
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show status
    Info,

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocCommands {
    /// List documents, most recently modified first
    List,

    /// Create a document and make it active
    New {
        /// Document name
        #[arg(default_value = crate::domain::UNTITLED_DOCUMENT_NAME)]
        name: String,
    },

    /// Make a document active (by id or exact name)
    Select {
        /// Document id or name
        document: String,
    },

    /// Delete a document (default: active document)
    Delete {
        /// Document id or name
        document: Option<String>,
    },

    /// Rename the active document (renames its root node)
    Rename {
        /// New name
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum NodeCommands {
    /// Add a child node and focus it
    Add {
        /// Node title
        #[arg(default_value = crate::domain::generation::UNTITLED_NODE)]
        title: String,

        /// Parent node (default: focused node)
        #[arg(short, long)]
        parent: Option<String>,

        /// Initial content (default: the title)
        #[arg(short, long)]
        content: Option<String>,
    },

    /// Delete a node and all of its descendants
    Delete {
        /// Node id
        id: String,
    },

    /// Change a node's title
    Rename {
        /// Node id
        id: String,
        /// New title
        title: String,
    },

    /// Replace a node's content (opens the editor without --text)
    Edit {
        /// Node id (default: focused node)
        id: Option<String>,

        /// New content
        #[arg(short, long)]
        text: Option<String>,
    },

    /// Move a node: up, down, left (outdent) or right (indent)
    Move {
        /// Node id
        id: String,
        /// Direction
        direction: Direction,
    },

    /// Focus a node
    Focus {
        /// Node id
        id: String,
    },

    /// Expand or collapse a node in the tree view
    Toggle {
        /// Node id
        id: String,
    },

    /// Show a node's details and content
    Show {
        /// Node id (default: focused node)
        id: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExportCommands {
    /// Concatenated node contents
    Markdown {
        /// Output file or directory (default: stdout)
        #[arg(short, long, value_hint = ValueHint::AnyPath)]
        out: Option<PathBuf>,
    },

    /// Document snapshot suitable for `import`
    Json {
        /// Output file or directory (default: stdout)
        #[arg(short, long, value_hint = ValueHint::AnyPath)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,

    /// Write a commented template to the global config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show config file locations
    Path,
}
