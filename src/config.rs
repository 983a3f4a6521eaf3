//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/treetext/treetext.toml`
//! 3. Explicit config file passed by the caller (`--config`)
//! 4. Environment variables: `TREETEXT_*` prefix, `__` between sections

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::generation::DEFAULT_SYSTEM_PROMPT;
use crate::util::path::expand_env_vars;

const APP_NAME: &str = "treetext";

/// Generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackendConfig {
    /// Server root, e.g. `http://localhost:1234`; generation is unavailable when unset
    pub base_url: Option<String>,
    pub model: String,
    /// System prompt for rewrite requests
    pub system_prompt: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            model: "local-model".into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            timeout_secs: 60,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Raw backend config: every field optional so a file only overrides what it names.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawBackendConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub state_file: Option<PathBuf>,
    pub editor: Option<String>,
    pub backend: RawBackendConfig,
}

/// Unified configuration for treetext.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Workspace state file (default: `<data_dir>/treetext/state.json`)
    pub state_file: PathBuf,
    /// Editor command for `node edit` (default: $VISUAL, $EDITOR or "vim")
    pub editor: String,
    pub backend: BackendConfig,
}

impl Default for Settings {
    fn default() -> Self {
        let editor = std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .unwrap_or_else(|_| "vim".into());

        Self {
            state_file: default_state_file(),
            editor,
            backend: BackendConfig::default(),
        }
    }
}

fn default_state_file() -> PathBuf {
    ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("state.json"))
        .unwrap_or_else(|| PathBuf::from("~/.treetext/state.json"))
}

/// Get the XDG config directory for treetext.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("treetext.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    ///
    /// Handles `~`, `$VAR`, and `${VAR}` syntax.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.state_file.to_string_lossy().as_ref());
        self.state_file = PathBuf::from(expanded);

        self.editor = expand_env_vars(&self.editor);
    }

    /// Overlay wins for every field it specifies.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let b = &overlay.backend;
        Self {
            state_file: overlay
                .state_file
                .clone()
                .unwrap_or_else(|| self.state_file.clone()),
            editor: overlay
                .editor
                .clone()
                .unwrap_or_else(|| self.editor.clone()),
            backend: BackendConfig {
                base_url: b.base_url.clone().or_else(|| self.backend.base_url.clone()),
                model: b.model.clone().unwrap_or_else(|| self.backend.model.clone()),
                system_prompt: b
                    .system_prompt
                    .clone()
                    .unwrap_or_else(|| self.backend.system_prompt.clone()),
                timeout_secs: b.timeout_secs.unwrap_or(self.backend.timeout_secs),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file, applied after the global one
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/treetext/treetext.toml`
    /// 3. `config_file`
    /// 4. Environment variables: `TREETEXT_*` prefix
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;

        current.expand_paths();

        Ok(current)
    }

    /// Apply TREETEXT_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // config crate only parses the environment here
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("TREETEXT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("state_file") {
            settings.state_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("editor") {
            settings.editor = val;
        }
        if let Ok(val) = config.get_string("backend.base_url") {
            settings.backend.base_url = Some(val);
        }
        if let Ok(val) = config.get_string("backend.model") {
            settings.backend.model = val;
        }
        if let Ok(val) = config.get_string("backend.system_prompt") {
            settings.backend.system_prompt = val;
        }
        if let Ok(val) = config.get_int("backend.timeout_secs") {
            settings.backend.timeout_secs = u64::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("backend.timeout_secs must be positive, got {val}"),
            })?;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# treetext configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/treetext/treetext.toml
#   Explicit: --config <file>
#   Env:    TREETEXT_* environment variables, e.g. TREETEXT_BACKEND__BASE_URL

# Workspace state file
# state_file = "~/.local/share/treetext/state.json"

# Editor for `treetext node edit`
# editor = "vim"

[backend]
# OpenAI-compatible server root; /v1/chat/completions is appended
# base_url = "http://localhost:1234"

# Model name sent with every request
# model = "local-model"

# System prompt for rewrite requests
# system_prompt = "You are a writing assistant. ..."

# Request timeout in seconds
# timeout_secs = 60
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
