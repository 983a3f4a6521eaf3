//! End-to-end tests driving `cli::execute` against a temporary state file

use std::path::Path;

use clap::Parser;
use tempfile::TempDir;

use treetext::application::migrator;
use treetext::cli::{self, Cli, CliError};
use treetext::domain::NodeId;
use treetext::exitcode;
use treetext::util::testing::init_test_setup;

fn run(state: &Path, args: &[&str]) -> Result<(), CliError> {
    let state = state.to_string_lossy().to_string();
    let mut argv = vec!["treetext", "--state", state.as_str()];
    argv.extend_from_slice(args);
    cli::execute(Cli::try_parse_from(argv).expect("valid arguments"))
}

fn load(state: &Path) -> migrator::Loaded {
    migrator::load(&std::fs::read(state).unwrap())
}

#[test]
fn given_fresh_workspace_when_adding_node_then_state_file_written() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.json");

    run(&state, &["node", "add", "Intro", "--content", "Hello"]).unwrap();

    let loaded = load(&state);
    let doc = loaded.registry.active().unwrap();
    let focus = loaded.registry.focused_node_id().unwrap();
    let node = doc.store.get(focus).unwrap();
    assert_eq!(node.title, "Intro");
    assert_eq!(node.content, "Hello");
    assert_eq!(node.parent_id.as_ref(), Some(&NodeId::from("root")));
}

#[test]
fn given_documents_when_selecting_by_name_then_active_changes() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.json");

    run(&state, &["doc", "new", "Second"]).unwrap();
    run(&state, &["doc", "select", "My First Document"]).unwrap();

    let loaded = load(&state);
    assert_eq!(loaded.registry.len(), 2);
    assert_eq!(loaded.registry.active().unwrap().name, "My First Document");
}

#[test]
fn given_last_document_deleted_then_untitled_document_created() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.json");

    run(&state, &["doc", "delete"]).unwrap();

    let loaded = load(&state);
    assert_eq!(loaded.registry.len(), 1);
    assert_eq!(loaded.registry.active().unwrap().name, "Untitled Document");
}

#[test]
fn given_root_when_deleting_then_data_error_exit_code() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.json");

    let err = run(&state, &["node", "delete", "root"]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::DATAERR);
}

#[test]
fn given_unknown_document_when_selecting_then_noinput_exit_code() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.json");

    let err = run(&state, &["doc", "select", "nope"]).unwrap_err();

    assert_eq!(err.exit_code(), exitcode::NOINPUT);
}

#[test]
fn given_json_export_when_reimported_then_same_id_replaces_document() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.json");
    let out = temp.path().join("out");
    std::fs::create_dir_all(&out).unwrap();

    run(&state, &["export", "json", "--out", out.to_str().unwrap()]).unwrap();
    let exported = out.join("treetext-My_First_Document.json");
    assert!(exported.is_file());
    run(&state, &["import", exported.to_str().unwrap()]).unwrap();

    assert_eq!(load(&state).registry.len(), 1);
}

#[test]
fn given_directory_when_batch_importing_then_children_under_focus() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.json");
    let notes = temp.path().join("notes");
    std::fs::create_dir_all(&notes).unwrap();
    std::fs::write(notes.join("one.md"), "1").unwrap();
    std::fs::write(notes.join("two.md"), "2").unwrap();

    run(&state, &["batch-import", "--parent", "child1", notes.to_str().unwrap()]).unwrap();

    let loaded = load(&state);
    let store = &loaded.registry.active().unwrap().store;
    let titles: Vec<String> = store
        .children(&NodeId::from("child1"))
        .into_iter()
        .map(|n| n.title.clone())
        .collect();
    assert_eq!(titles, vec!["one", "two"]);
}

#[test]
fn given_no_backend_configured_when_prompting_then_config_exit_code() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.json");
    let config = temp.path().join("treetext.toml");
    std::fs::write(&config, "[backend]\nmodel = \"m\"\n").unwrap();

    let err = run(
        &state,
        &["--config", config.to_str().unwrap(), "prompt", "shorter"],
    )
    .unwrap_err();

    assert_eq!(err.exit_code(), exitcode::CONFIG);
}

#[test]
fn given_unparsable_backend_url_when_prompting_then_config_exit_code() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let state = temp.path().join("state.json");
    let config = temp.path().join("treetext.toml");
    std::fs::write(&config, "[backend]\nbase_url = \"not a url\"\n").unwrap();

    let err = run(
        &state,
        &["--config", config.to_str().unwrap(), "prompt", "shorter"],
    )
    .unwrap_err();

    assert_eq!(err.exit_code(), exitcode::CONFIG);
}
