//! Directory enumeration for the two-level library tree
//!
//! The library convention is `<root>/<author>/<title>/...`; hidden and
//! system directories (names starting with `.` or `_`) are skipped at both
//! levels.

use std::io;
use std::path::Path;
use tracing::error;

/// Check that the configured library root exists and is a directory.
///
/// Fails closed: any stat error yields `false`. Never propagates.
pub fn validate_library_path(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => true,
        Ok(_) => {
            error!(path = %path.display(), "Library path is not a directory");
            false
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Library path validation failed");
            false
        }
    }
}

/// List the names of child directories of `path`, skipping hidden and
/// system entries.
///
/// Re-invoking re-reads disk state; ordering is filesystem-defined.
pub fn list_child_directories(path: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_hidden_or_system(&name) {
            continue;
        }
        if entry.file_type()?.is_dir() {
            names.push(name);
        }
    }
    Ok(names)
}

fn is_hidden_or_system(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn skips_hidden_and_system_names() {
        assert!(is_hidden_or_system(".git"));
        assert!(is_hidden_or_system("_trash"));
        assert!(!is_hidden_or_system("Asimov"));
        assert!(!is_hidden_or_system("a_b"));
    }

    #[test]
    fn lists_only_visible_directories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("Asimov")).unwrap();
        fs::create_dir(tmp.path().join(".hidden")).unwrap();
        fs::create_dir(tmp.path().join("_system")).unwrap();
        fs::write(tmp.path().join("stray.txt"), "not a directory").unwrap();

        let mut names = list_child_directories(tmp.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["Asimov"]);
    }

    #[test]
    fn validate_rejects_missing_and_non_directory_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        assert!(validate_library_path(tmp.path()));
        assert!(!validate_library_path(&file));
        assert!(!validate_library_path(&tmp.path().join("missing")));
    }
}
