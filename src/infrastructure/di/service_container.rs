//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{GenerationService, WorkspaceService};
use crate::config::Settings;
use crate::infrastructure::backend::HttpGenerationBackend;
use crate::infrastructure::traits::{
    CommandEditor, Editor, FileSystem, GenerationBackend, RealFileSystem,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Editor for interactive content editing
    pub editor: Arc<dyn Editor>,

    pub workspace: WorkspaceService,
    pub generation: GenerationService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let backend = HttpGenerationBackend::new(
            settings.backend.base_url.clone(),
            settings.backend.timeout(),
        );
        let editor = CommandEditor::new(settings.editor.clone());
        Self::with_deps(
            settings,
            Arc::new(RealFileSystem),
            Arc::new(backend),
            Arc::new(editor),
        )
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        backend: Arc<dyn GenerationBackend>,
        editor: Arc<dyn Editor>,
    ) -> Self {
        let workspace = WorkspaceService::new(fs.clone(), settings.state_file.clone());
        let generation = GenerationService::new(backend, settings.backend.clone());
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            editor,
            workspace,
            generation,
        }
    }
}
