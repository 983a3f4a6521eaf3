//! Workspace persistence, export and file import
//!
//! Handles reading and writing the state file and turning documents into
//! exportable text.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::error_ext::JsonResultExt;
use crate::application::migrator::{self, Loaded};
use crate::application::registry::DocumentRegistry;
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{projector, Document, DocumentId, UNTITLED_DOCUMENT_NAME};
use crate::infrastructure::traits::FileSystem;
use crate::util::path::PathExt;

/// A file read for batch import: display name and raw text.
pub type ImportFile = (String, String);

pub struct WorkspaceService {
    fs: Arc<dyn FileSystem>,
    state_file: PathBuf,
}

impl WorkspaceService {
    pub fn new(fs: Arc<dyn FileSystem>, state_file: PathBuf) -> Self {
        Self { fs, state_file }
    }

    pub fn state_file(&self) -> &Path {
        &self.state_file
    }

    /// Load the workspace. A missing state file yields the seed document.
    #[instrument(level = "debug", skip(self), fields(path = %self.state_file.display()))]
    pub fn load(&self) -> ApplicationResult<Loaded> {
        if !self.fs.exists(&self.state_file) {
            debug!("load: no state file yet");
            return Ok(migrator::load(b""));
        }
        let raw = self
            .fs
            .read_to_string(&self.state_file)
            .with_path_context("read state", &self.state_file)?;
        let loaded = migrator::load(raw.as_bytes());
        debug!(
            "load: {} documents (source {:?})",
            loaded.registry.len(),
            loaded.source
        );
        Ok(loaded)
    }

    /// Persist the workspace in the current layout.
    #[instrument(level = "debug", skip(self, registry))]
    pub fn save(&self, registry: &DocumentRegistry) -> ApplicationResult<()> {
        let json = migrator::serialize_state(registry)?;
        self.fs
            .write_atomic(&self.state_file, &json)
            .with_path_context("write state", &self.state_file)
    }

    /// Keep at least one document around: an empty registry gets a fresh
    /// untitled document, which becomes active.
    pub fn ensure_document(&self, registry: &mut DocumentRegistry) -> Option<DocumentId> {
        if !registry.is_empty() {
            return None;
        }
        info!("no documents left, creating '{}'", UNTITLED_DOCUMENT_NAME);
        Some(registry.create_document(UNTITLED_DOCUMENT_NAME))
    }

    pub fn export_markdown(&self, doc: &Document) -> String {
        projector::full_text(&doc.store)
    }

    /// Pretty-printed document snapshot, re-importable with `import`.
    pub fn export_json(&self, doc: &Document) -> ApplicationResult<String> {
        serde_json::to_string_pretty(&doc.to_persisted()).with_json_context("serialize document")
    }

    pub fn write_file(&self, path: &Path, content: &str) -> ApplicationResult<()> {
        self.fs
            .ensure_parent(path)
            .with_path_context("create directory for", path)?;
        self.fs.write(path, content).with_path_context("write", path)
    }

    pub fn read_file(&self, path: &Path) -> ApplicationResult<String> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::OperationFailed {
                context: format!("file not found: {}", path.display()),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "file does not exist",
                )),
            });
        }
        self.fs.read_to_string(path).with_path_context("read", path)
    }

    /// Read every file named in `paths`; directories contribute the files
    /// directly inside them.
    pub fn collect_import_files(&self, paths: &[PathBuf]) -> ApplicationResult<Vec<ImportFile>> {
        let mut files = Vec::new();
        for path in paths {
            let members = if self.fs.is_dir(path) {
                self.fs
                    .list_files(path)
                    .with_path_context("list directory", path)?
            } else {
                vec![path.clone()]
            };
            for member in members {
                let text = self.read_file(&member)?;
                files.push((member.file_name_lossy(), text));
            }
        }
        debug!("collect_import_files: {} files", files.len());
        Ok(files)
    }
}
