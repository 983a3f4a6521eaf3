//! Integration tests for Settings loading with an explicit config file.
//!
//! Note: these tests assume no TREETEXT_BACKEND__* variables are set in the
//! environment running them.

use std::fs;

use tempfile::TempDir;

use treetext::application::ApplicationError;
use treetext::config::Settings;

// ============================================================
// Settings::load() with --config
// ============================================================

#[test]
fn given_explicit_config_file_when_load_then_values_override_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let state = dir.path().join("ws").join("state.json");
    let file = dir.path().join("treetext.toml");
    fs::write(
        &file,
        format!(
            r#"
state_file = "{}"

[backend]
model = "mistral-7b"
timeout_secs = 5
"#,
            state.display()
        ),
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(&file)).expect("load settings");

    // Assert
    assert_eq!(settings.state_file, state);
    assert_eq!(settings.backend.model, "mistral-7b");
    assert_eq!(settings.backend.timeout_secs, 5);
}

#[test]
fn given_config_without_backend_section_when_load_then_backend_defaults_kept() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("treetext.toml");
    fs::write(&file, "editor = \"nano\"\n").unwrap();

    let settings = Settings::load(Some(&file)).expect("load settings");

    assert_eq!(settings.editor, "nano");
    assert!(settings.backend.system_prompt.len() > 10);
    assert!(settings.backend.timeout_secs > 0);
}

#[test]
fn given_missing_config_file_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();

    let result = Settings::load(Some(&dir.path().join("absent.toml")));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_invalid_toml_when_load_then_config_error_names_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("broken.toml");
    fs::write(&file, "[backend\nmodel = ").unwrap();

    let err = Settings::load(Some(&file)).unwrap_err();

    match err {
        ApplicationError::Config { message } => assert!(message.contains("broken.toml")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn given_state_file_with_variable_when_load_then_expanded() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("treetext.toml");
    fs::write(&file, "state_file = \"$HOME/treetext-state.json\"\n").unwrap();

    let settings = Settings::load(Some(&file)).expect("load settings");

    let home = std::env::var("HOME").expect("HOME should be set");
    assert_eq!(
        settings.state_file,
        std::path::PathBuf::from(format!("{home}/treetext-state.json"))
    );
}

#[test]
fn given_settings_when_rendered_as_toml_then_parsable_again() {
    let settings = Settings::default();

    let rendered = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&rendered).unwrap();

    assert_eq!(parsed.backend, settings.backend);
}
