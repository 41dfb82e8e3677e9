// Path resolution: symlink/`..` folding for paths that may no longer exist,
// `~` expansion, and slash-joined relative paths for glob matching.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Resolve `path` to an absolute, symlink-free form.
///
/// Unlike `canonicalize`, this works for paths that no longer exist (a
/// deleted file still resolves through its nearest existing ancestor).
/// Falls back to lexical normalization when no ancestor exists.
pub fn resolve_lossy(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }

    let mut tail: Vec<OsString> = Vec::new();
    let mut current = path;
    while let Some(parent) = current.parent() {
        let Some(name) = current.file_name() else {
            break;
        };
        tail.push(name.to_os_string());

        if let Ok(mut base) = parent.canonicalize() {
            for component in tail.iter().rev() {
                base.push(component);
            }
            return lexical_normalize(&base);
        }
        current = parent;
    }

    lexical_normalize(path)
}

/// Fold `.` and `..` components without touching the filesystem.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Expand a leading `~` to the current user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) if rest.as_os_str().is_empty() => home,
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// `path` relative to `base`, with components joined by `/`.
///
/// Returns `None` when `path` is not under `base`. `base` itself yields an
/// empty string.
pub fn relative_slash(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lexical_normalize_folds_dots() {
        assert_eq!(lexical_normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(lexical_normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn resolve_existing_path_canonicalizes() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("notes.txt");
        std::fs::write(&file, "x").unwrap();

        let resolved = resolve_lossy(&file);
        assert_eq!(resolved, file.canonicalize().unwrap());
    }

    #[test]
    fn resolve_deleted_file_goes_through_parent() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("gone").join("deep.txt");
        std::fs::create_dir_all(tmp.path().join("gone")).unwrap();

        let resolved = resolve_lossy(&missing);
        let expected = tmp.path().canonicalize().unwrap().join("gone").join("deep.txt");
        assert_eq!(resolved, expected);
    }

    #[test]
    fn resolve_missing_tree_keeps_missing_components() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("a").join("b").join("c.txt");

        let resolved = resolve_lossy(&missing);
        let expected = tmp.path().canonicalize().unwrap().join("a/b/c.txt");
        assert_eq!(resolved, expected);
    }

    #[test]
    fn relative_slash_joins_components() {
        let base = Path::new("/repo");
        assert_eq!(
            relative_slash(Path::new("/repo/src/build/x.txt"), base).as_deref(),
            Some("src/build/x.txt")
        );
        assert_eq!(relative_slash(Path::new("/repo"), base).as_deref(), Some(""));
        assert_eq!(relative_slash(Path::new("/elsewhere/x"), base), None);
        assert_eq!(relative_slash(Path::new("/repository/x"), base), None);
    }

    #[test]
    fn expand_home_only_touches_leading_tilde() {
        let home = dirs::home_dir().expect("home dir available in tests");
        assert_eq!(expand_home(Path::new("~/.dotfiles")), home.join(".dotfiles"));
        assert_eq!(expand_home(Path::new("~")), home);
        assert_eq!(expand_home(Path::new("/etc/~x")), PathBuf::from("/etc/~x"));
    }
}
