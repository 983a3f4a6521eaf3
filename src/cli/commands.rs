//! Command dispatch
//!
//! Each workspace command loads the state file, applies at most one change
//! to the registry and saves it again.

use std::collections::HashSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use clap::CommandFactory;
use colored::Colorize;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::registry::DocumentRegistry;
use crate::application::ApplicationError;
use crate::cli::args::{
    Cli, Commands, ConfigCommands, DocCommands, ExportCommands, NodeCommands,
};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::{
    line_diff, projector, Document, DocumentId, DomainError, LineChange, Node, NodeId,
    NodeStore,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::util::path::{json_export_name, markdown_export_name};

/// Execute a parsed command line.
pub fn execute(cli: Cli) -> CliResult<()> {
    match cli.command {
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Some(Commands::Config { command }) => {
            let settings = load_settings(cli.config.as_deref(), cli.state)?;
            cmd_config(&settings, command)
        }
        command => {
            let settings = load_settings(cli.config.as_deref(), cli.state)?;
            let container = ServiceContainer::new(settings);
            let mut session = Session::open(&container)?;
            match command {
                None | Some(Commands::Info) => cmd_info(&session),
                Some(Commands::Doc { command }) => cmd_doc(&mut session, command),
                Some(Commands::Node { command }) => cmd_node(&mut session, command),
                Some(Commands::Tree { all }) => cmd_tree(&session, all),
                Some(Commands::Outline) => {
                    print!("{}", projector::outline(&session.active()?.store));
                    Ok(())
                }
                Some(Commands::Preview { ids }) => cmd_preview(&session, ids),
                Some(Commands::View { view }) => {
                    session.registry.set_view(view);
                    session.save()?;
                    output::action("View", &view);
                    Ok(())
                }
                Some(Commands::Export { command }) => cmd_export(&session, command),
                Some(Commands::Import { file }) => cmd_import(&mut session, &file),
                Some(Commands::BatchImport { parent, paths }) => {
                    cmd_batch_import(&mut session, parent.as_deref(), &paths)
                }
                Some(Commands::Prompt { text, node, accept }) => {
                    cmd_prompt(&mut session, &text, node.as_deref(), accept)
                }
                Some(Commands::Generate {
                    intent,
                    parent,
                    dry_run,
                }) => cmd_generate(&mut session, &intent, parent.as_deref(), dry_run),
                Some(Commands::Completion { .. }) | Some(Commands::Config { .. }) => Ok(()),
            }
        }
    }
}

fn load_settings(config: Option<&Path>, state: Option<PathBuf>) -> CliResult<Settings> {
    let mut settings = Settings::load(config)?;
    if let Some(state) = state {
        settings.state_file = state;
    }
    debug!("state file: {}", settings.state_file.display());
    Ok(settings)
}

/// Loaded workspace plus the services that act on it.
struct Session<'a> {
    container: &'a ServiceContainer,
    registry: DocumentRegistry,
}

impl<'a> Session<'a> {
    fn open(container: &'a ServiceContainer) -> CliResult<Self> {
        let loaded = container.workspace.load()?;
        Ok(Self {
            container,
            registry: loaded.registry,
        })
    }

    fn save(&mut self) -> CliResult<()> {
        if let Some(id) = self.container.workspace.ensure_document(&mut self.registry) {
            output::action("Created", &format!("document {id}"));
        }
        self.container.workspace.save(&self.registry)?;
        Ok(())
    }

    fn active(&self) -> CliResult<&Document> {
        Ok(self.registry.active_or_err()?)
    }

    /// `arg` as a node id, or the focused node.
    fn node_or_focus(&self, arg: Option<&str>) -> CliResult<NodeId> {
        match arg {
            Some(id) => Ok(NodeId::from(id)),
            None => self
                .registry
                .focused_node_id()
                .cloned()
                .ok_or_else(|| ApplicationError::NoActiveDocument.into()),
        }
    }

    /// Document by id, falling back to an exact name match.
    fn find_document(&self, key: &str) -> CliResult<DocumentId> {
        let id = DocumentId::from(key);
        if self.registry.get(&id).is_some() {
            return Ok(id);
        }
        let matches: Vec<&Document> = self
            .registry
            .documents()
            .iter()
            .filter(|d| d.name == key)
            .collect();
        match matches.as_slice() {
            [doc] => Ok(doc.id.clone()),
            [] => Err(ApplicationError::DocumentNotFound(id).into()),
            _ => Err(CliError::InvalidArgs(format!(
                "{} documents are named '{}', select by id",
                matches.len(),
                key
            ))),
        }
    }
}

// ============================================================
// Status & documents
// ============================================================

fn cmd_info(session: &Session) -> CliResult<()> {
    output::header("treetext");
    output::detail(&format!(
        "state file: {}",
        session.container.workspace.state_file().display()
    ));
    output::detail(&format!("documents:  {}", session.registry.len()));
    match session.registry.active() {
        Some(doc) => {
            output::detail(&format!("active:     {} ({})", doc.name, doc.id));
            let focus = session.registry.ui().focus_in(&doc.store);
            if let Some(node) = doc.store.get(focus) {
                output::detail(&format!("focus:      {} ({})", node.title, node.id));
            }
        }
        None => output::detail("active:     none"),
    }
    output::detail(&format!("view:       {}", session.registry.ui().active_view));
    let backend = session
        .container
        .settings
        .backend
        .base_url
        .as_deref()
        .unwrap_or("not configured");
    output::detail(&format!("backend:    {backend}"));
    Ok(())
}

#[instrument(level = "debug", skip(session))]
fn cmd_doc(session: &mut Session, command: DocCommands) -> CliResult<()> {
    match command {
        DocCommands::List => {
            let active = session.registry.ui().active_document_id.clone();
            for doc in session.registry.documents_by_recency() {
                let marker = if Some(&doc.id) == active.as_ref() {
                    "*".green().bold().to_string()
                } else {
                    " ".to_string()
                };
                println!(
                    "{} {}  {}  {} nodes  {}",
                    marker,
                    doc.name.bold(),
                    doc.id.as_str().dimmed(),
                    doc.store.len(),
                    format_millis(doc.last_modified)
                );
            }
            Ok(())
        }
        DocCommands::New { name } => {
            let id = session.registry.create_document(name.as_str());
            session.save()?;
            output::success(&format!("Created document '{name}' ({id})"));
            Ok(())
        }
        DocCommands::Select { document } => {
            let id = session.find_document(&document)?;
            session.registry.select_active(&id);
            session.save()?;
            let name = session.active()?.name.clone();
            output::action("Active", &name);
            Ok(())
        }
        DocCommands::Delete { document } => {
            let id = match document {
                Some(key) => session.find_document(&key)?,
                None => session.active()?.id.clone(),
            };
            let name = session
                .registry
                .get(&id)
                .map(|d| d.name.clone())
                .unwrap_or_default();
            session.registry.delete_document(&id)?;
            output::success(&format!("Deleted document '{name}'"));
            session.save()
        }
        DocCommands::Rename { name } => {
            let root_id = session.active()?.root_id().clone();
            session.registry.rename_node(&root_id, &name)?;
            session.save()?;
            output::success(&format!("Renamed document to '{name}'"));
            Ok(())
        }
    }
}

// ============================================================
// Nodes
// ============================================================

#[instrument(level = "debug", skip(session))]
fn cmd_node(session: &mut Session, command: NodeCommands) -> CliResult<()> {
    match command {
        NodeCommands::Add {
            title,
            parent,
            content,
        } => {
            let parent_id = session.node_or_focus(parent.as_deref())?;
            let mut node = Node::new(NodeId::generate(), title.as_str());
            if let Some(content) = content {
                node = node.with_content(content);
            }
            let id = session.registry.add_node(&parent_id, node)?;
            session.save()?;
            output::success(&format!("Added '{title}' ({id})"));
            Ok(())
        }
        NodeCommands::Delete { id } => {
            let removed = session.registry.delete_node(&NodeId::from(id.as_str()))?;
            session.save()?;
            output::success(&format!(
                "Deleted {} node(s) under {}",
                removed.removed.len(),
                removed.former_parent
            ));
            Ok(())
        }
        NodeCommands::Rename { id, title } => {
            session
                .registry
                .rename_node(&NodeId::from(id.as_str()), &title)?;
            session.save()?;
            output::success(&format!("Renamed {id} to '{title}'"));
            Ok(())
        }
        NodeCommands::Edit { id, text } => {
            let node_id = session.node_or_focus(id.as_deref())?;
            let content = match text {
                Some(text) => text,
                None => {
                    let current = session
                        .active()?
                        .store
                        .get(&node_id)
                        .map(|n| n.content.clone())
                        .ok_or_else(|| {
                            ApplicationError::from(DomainError::NodeNotFound(node_id.clone()))
                        })?;
                    edit_in_editor(session.container, &current)?
                }
            };
            session.registry.set_node_content(&node_id, &content)?;
            session.save()?;
            output::success(&format!("Updated content of {node_id}"));
            Ok(())
        }
        NodeCommands::Move { id, direction } => {
            let moved = session
                .registry
                .move_node(&NodeId::from(id.as_str()), direction)?;
            if moved {
                session.save()?;
                output::success(&format!("Moved {id} {direction}"));
            } else {
                output::info(&format!("{id} cannot move {direction}"));
            }
            Ok(())
        }
        NodeCommands::Focus { id } => {
            session.registry.focus_node(&NodeId::from(id.as_str()))?;
            session.save()?;
            output::action("Focus", &id);
            Ok(())
        }
        NodeCommands::Toggle { id } => {
            let expanded = session
                .registry
                .toggle_expansion(&NodeId::from(id.as_str()))?;
            session.save()?;
            output::action(if expanded { "Expanded" } else { "Collapsed" }, &id);
            Ok(())
        }
        NodeCommands::Show { id } => {
            let node_id = session.node_or_focus(id.as_deref())?;
            let doc = session.active()?;
            let node = doc.store.get(&node_id).ok_or_else(|| {
                ApplicationError::from(DomainError::NodeNotFound(node_id.clone()))
            })?;
            output::header(&node.title);
            output::detail(&format!("id:       {}", node.id));
            if let Some(parent) = &node.parent_id {
                output::detail(&format!("parent:   {parent}"));
            }
            output::detail(&format!("children: {}", node.children_ids.len()));
            println!();
            println!("{}", node.content);
            Ok(())
        }
    }
}

/// Open `content` in the configured editor and return the edited text.
fn edit_in_editor(container: &ServiceContainer, content: &str) -> CliResult<String> {
    let mut tmp = tempfile::Builder::new()
        .prefix("treetext-")
        .suffix(".md")
        .tempfile()
        .map_err(|e| InfraError::io("create temp file", e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| InfraError::io("write temp file", e))?;

    container
        .editor
        .open(tmp.path())
        .map_err(|e| InfraError::Editor {
            message: e.to_string(),
        })?;

    let edited = container
        .fs
        .read_to_string(tmp.path())
        .map_err(|e| InfraError::io("read temp file", e))?;
    Ok(edited)
}

// ============================================================
// Views
// ============================================================

fn cmd_tree(session: &Session, all: bool) -> CliResult<()> {
    let doc = session.active()?;
    let focus = session.registry.ui().focus_in(&doc.store).clone();
    let expanded: HashSet<&NodeId> = session.registry.ui().expanded_node_ids.iter().collect();
    let mut visited = HashSet::new();
    match render_tree(&doc.store, doc.root_id(), &focus, &expanded, all, &mut visited) {
        Some(tree) => print!("{tree}"),
        None => output::warning(&format!("root node {} not found", doc.root_id())),
    }
    Ok(())
}

fn render_tree<'s>(
    store: &'s NodeStore,
    id: &'s NodeId,
    focus: &NodeId,
    expanded: &HashSet<&NodeId>,
    all: bool,
    visited: &mut HashSet<&'s NodeId>,
) -> Option<Tree<String>> {
    let node = store.get(id)?;
    if !visited.insert(id) {
        return None;
    }
    let mut label = format!("{} {}", node.title, format!("({})", node.id).dimmed());
    if id == focus {
        label = format!("{} {}", "▸".green().bold(), label);
    }

    let open = all || expanded.contains(id) || node.is_root();
    if !open && !node.children_ids.is_empty() {
        label = format!("{} {}", label, format!("[+{}]", node.children_ids.len()).yellow());
        return Some(Tree::new(label));
    }

    let leaves: Vec<Tree<String>> = node
        .children_ids
        .iter()
        .filter_map(|child| render_tree(store, child, focus, expanded, all, visited))
        .collect();
    Some(Tree::new(label).with_leaves(leaves))
}

fn cmd_preview(session: &Session, ids: bool) -> CliResult<()> {
    let doc = session.active()?;
    for block in projector::flat_preview(&doc.store) {
        if ids {
            println!("{}", format!("[{}]", block.node_id).cyan());
        }
        println!("{}\n", block.text);
    }
    Ok(())
}

// ============================================================
// Import / export
// ============================================================

fn cmd_export(session: &Session, command: ExportCommands) -> CliResult<()> {
    let doc = session.active()?;
    let workspace = &session.container.workspace;
    let (content, default_name, out) = match command {
        ExportCommands::Markdown { out } => (
            workspace.export_markdown(doc),
            markdown_export_name(&doc.name),
            out,
        ),
        ExportCommands::Json { out } => {
            (workspace.export_json(doc)?, json_export_name(&doc.name), out)
        }
    };

    match out {
        None => {
            print!("{content}");
            Ok(())
        }
        Some(path) => {
            let target = if path.is_dir() {
                path.join(default_name)
            } else {
                path
            };
            workspace.write_file(&target, &content)?;
            output::success(&format!("Exported to {}", target.display()));
            Ok(())
        }
    }
}

fn cmd_import(session: &mut Session, file: &Path) -> CliResult<()> {
    let raw = session.container.workspace.read_file(file)?;
    let id = session.registry.import_document(raw.as_bytes())?;
    session.save()?;
    let name = session.active()?.name.clone();
    output::success(&format!("Imported '{name}' ({id})"));
    Ok(())
}

fn cmd_batch_import(session: &mut Session, parent: Option<&str>, paths: &[PathBuf]) -> CliResult<()> {
    let parent_id = session.node_or_focus(parent)?;
    let files = session.container.workspace.collect_import_files(paths)?;
    if files.is_empty() {
        output::warning("no files to import");
        return Ok(());
    }
    let added = session.registry.batch_import(&parent_id, files)?;
    session.save()?;
    output::success(&format!("Added {} node(s) under {}", added.len(), parent_id));
    Ok(())
}

// ============================================================
// Generation
// ============================================================

#[instrument(level = "debug", skip(session, text))]
fn cmd_prompt(session: &mut Session, text: &str, node: Option<&str>, accept: bool) -> CliResult<()> {
    let node_id = session.node_or_focus(node)?;
    let generation = &session.container.generation;
    let edit = generation.propose_rewrite(session.active()?, &node_id, text)?;
    if edit.suggestion.malformed {
        output::warning("backend reply was not the expected JSON, showing it verbatim");
    }

    output::header(&format!("Suggestion for {node_id}"));
    print_diff(&line_diff(&edit.base_content, &edit.suggestion.text));

    if accept {
        generation.accept(&mut session.registry, &edit)?;
        session.save()?;
        output::success("Suggestion applied");
    }
    Ok(())
}

#[instrument(level = "debug", skip(session, intent))]
fn cmd_generate(
    session: &mut Session,
    intent: &str,
    parent: Option<&str>,
    dry_run: bool,
) -> CliResult<()> {
    let parent_id = session.node_or_focus(parent)?;
    let generation = &session.container.generation;
    let proposal = generation.propose_child(session.active()?, &parent_id, intent)?;
    if proposal.draft.malformed {
        output::warning("backend reply was not the expected JSON, using it as content");
    }

    if dry_run {
        output::header(&proposal.draft.title);
        println!("{}", proposal.draft.content);
        return Ok(());
    }
    let id = generation.accept_child(&mut session.registry, &proposal)?;
    session.save()?;
    output::success(&format!("Added '{}' ({id})", proposal.draft.title));
    Ok(())
}

fn print_diff(changes: &[LineChange]) {
    for change in changes {
        match change {
            LineChange::Same(line) => output::detail(line),
            LineChange::Added(line) => output::diff_add(line),
            LineChange::Removed(line) => output::diff_remove(line),
            LineChange::Changed { before, after } => {
                output::diff_remove(before);
                output::diff_add(after);
            }
        }
    }
}

// ============================================================
// Config
// ============================================================

fn cmd_config(settings: &Settings, command: ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Init { force } => {
            let path = global_config_path().ok_or_else(|| {
                CliError::Usage("cannot determine config directory".to_string())
            })?;
            if path.exists() && !force {
                return Err(CliError::Usage(format!(
                    "config file exists: {} (use --force to overwrite)",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| InfraError::io(format!("create {}", parent.display()), e))?;
            }
            std::fs::write(&path, Settings::template())
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("Wrote {}", path.display()));
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::info(&format!("global: {}", path.display())),
                None => output::info("global: unavailable"),
            }
            output::info(&format!("state:  {}", settings.state_file.display()));
            Ok(())
        }
    }
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
