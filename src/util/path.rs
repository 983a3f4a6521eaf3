use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

static LAST_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[^/.]+$").expect("valid extension pattern"));

pub trait PathExt {
    /// File name as displayed to the user, or the whole path if it has none.
    fn file_name_lossy(&self) -> String;
}

impl PathExt for Path {
    fn file_name_lossy(&self) -> String {
        self.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.to_string_lossy().into_owned())
    }
}

/// Expand `~` and `$VAR` / `${VAR}`; unknown variables are left as written.
pub fn expand_env_vars(path: &str) -> String {
    match shellexpand::full(path) {
        Ok(expanded) => expanded.into_owned(),
        Err(_) => shellexpand::tilde(path).into_owned(),
    }
}

/// Node title for an imported file: the name without its last extension.
/// The full name is kept if stripping would leave nothing.
pub fn title_from_file_name(name: &str) -> String {
    let stripped = LAST_EXTENSION.replace(name, "");
    if stripped.is_empty() {
        name.to_string()
    } else {
        stripped.into_owned()
    }
}

fn export_stem(name: &str) -> String {
    name.replace(' ', "_")
}

/// `My Doc` -> `My_Doc.md`; `document.md` for an empty name.
pub fn markdown_export_name(name: &str) -> String {
    if name.is_empty() {
        "document.md".to_string()
    } else {
        format!("{}.md", export_stem(name))
    }
}

/// `My Doc` -> `treetext-My_Doc.json`
pub fn json_export_name(name: &str) -> String {
    format!("treetext-{}.json", export_stem(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_file_names_then_last_extension_stripped() {
        assert_eq!(title_from_file_name("notes.md"), "notes");
        assert_eq!(title_from_file_name("archive.tar.gz"), "archive.tar");
        assert_eq!(title_from_file_name("README"), "README");
        assert_eq!(title_from_file_name(".env"), ".env");
        assert_eq!(title_from_file_name("trailing."), "trailing.");
    }

    #[test]
    fn given_dot_only_in_directory_then_name_unchanged() {
        let titles: Vec<String> = ["dir.v1/notes", "dir.v1/notes.md"]
            .iter()
            .map(|name| title_from_file_name(name))
            .collect();
        assert_eq!(titles, vec!["dir.v1/notes", "dir.v1/notes"]);
    }

    #[test]
    fn given_document_names_then_export_names_use_underscores() {
        assert_eq!(markdown_export_name("My First Document"), "My_First_Document.md");
        assert_eq!(markdown_export_name(""), "document.md");
        assert_eq!(json_export_name("Notes 2"), "treetext-Notes_2.json");
    }
}
