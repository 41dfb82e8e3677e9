// Layered ignore rules: global file, config patterns, extra rule files, and
// `.gitignore` files between a path and the watch root.

mod pattern;

pub use pattern::IgnorePattern;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use serde::Serialize;
use tracing::{trace, warn};
use watcher_common::config::WatcherConfig;
use watcher_common::path::{relative_slash, resolve_lossy};

const GITIGNORE: &str = ".gitignore";
const OUTSIDE_WATCH_DIRECTORY: &str = "outside watch directory";

/// Result of `IgnoreMatcher::test_pattern`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct IgnoreVerdict {
    pub ignored: bool,
    /// Every source that matched, e.g. `config: *.log`.
    pub matched_by: Vec<String>,
}

/// Loaded rules per source, for diagnostics.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct PatternListing {
    pub global: Vec<String>,
    pub config: Vec<String>,
    pub files: Vec<String>,
    /// `.gitignore` rules cached so far, keyed by directory.
    pub gitignore: BTreeMap<PathBuf, Vec<String>>,
}

struct CachedGitignore {
    modified: Option<SystemTime>,
    patterns: Arc<Vec<IgnorePattern>>,
}

/// Decides whether a path is excluded from auto-commit.
///
/// Global, config and rule-file patterns are fixed at construction.
/// `.gitignore` files are read lazily and re-read when their mtime changes.
pub struct IgnoreMatcher {
    watch_root: PathBuf,
    global: Vec<IgnorePattern>,
    config: Vec<IgnorePattern>,
    files: Vec<IgnorePattern>,
    respect_gitignore: bool,
    gitignores: Mutex<HashMap<PathBuf, CachedGitignore>>,
}

impl IgnoreMatcher {
    pub fn new(watch_root: &Path, respect_gitignore: bool) -> Self {
        Self {
            watch_root: resolve_lossy(watch_root),
            global: Vec::new(),
            config: Vec::new(),
            files: Vec::new(),
            respect_gitignore,
            gitignores: Mutex::new(HashMap::new()),
        }
    }

    /// Build the matcher for a config. `global_ignore` is the shared rule
    /// file; a missing file contributes nothing.
    pub fn from_config(config: &WatcherConfig, global_ignore: Option<&Path>) -> Self {
        let global = global_ignore.map(load_rule_file).unwrap_or_default();
        let files = config
            .ignore_files
            .iter()
            .flat_map(|path| load_rule_file(&resolve_lossy(path)))
            .collect::<Vec<_>>();

        Self::new(&config.watch_directory, config.respect_gitignore)
            .with_global(global)
            .with_config(config.ignore_patterns.iter())
            .with_files(files)
    }

    pub fn with_global<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, lines: I) -> Self {
        self.global = parse_all(lines);
        self
    }

    pub fn with_config<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, lines: I) -> Self {
        self.config = parse_all(lines);
        self
    }

    pub fn with_files<I: IntoIterator<Item = S>, S: AsRef<str>>(mut self, lines: I) -> Self {
        self.files = parse_all(lines);
        self
    }

    pub fn watch_root(&self) -> &Path {
        &self.watch_root
    }

    /// True if `path` is outside the watch root or any source matches it.
    pub fn should_ignore(&self, path: &Path) -> bool {
        let resolved = resolve_lossy(path);
        let Some(relative) = relative_slash(&resolved, &self.watch_root) else {
            trace!(path = %resolved.display(), "outside watch directory");
            return true;
        };

        let fixed = self.global.iter().chain(&self.config).chain(&self.files);
        for pattern in fixed {
            if pattern.matches(&relative) {
                trace!(path = %relative, pattern = pattern.as_str(), "ignored");
                return true;
            }
        }

        self.respect_gitignore
            && self.gitignore_scopes(&resolved).into_iter().any(|(dir, patterns)| {
                let Some(relative) = relative_slash(&resolved, &dir) else {
                    return false;
                };
                patterns.iter().any(|pattern| pattern.matches(&relative))
            })
    }

    /// Evaluate every source without short-circuiting and name each match.
    pub fn test_pattern(&self, path: &Path) -> IgnoreVerdict {
        let resolved = resolve_lossy(path);
        let Some(relative) = relative_slash(&resolved, &self.watch_root) else {
            return IgnoreVerdict {
                ignored: true,
                matched_by: vec![OUTSIDE_WATCH_DIRECTORY.to_string()],
            };
        };

        let mut matched_by = Vec::new();
        let sources =
            [("global", &self.global), ("config", &self.config), ("ignore file", &self.files)];
        for (label, patterns) in sources {
            for pattern in patterns.iter().filter(|pattern| pattern.matches(&relative)) {
                matched_by.push(format!("{label}: {}", pattern.as_str()));
            }
        }

        if self.respect_gitignore {
            for (dir, patterns) in self.gitignore_scopes(&resolved) {
                let Some(local) = relative_slash(&resolved, &dir) else {
                    continue;
                };
                let scope = match relative_slash(&dir, &self.watch_root) {
                    Some(scope) if !scope.is_empty() => scope,
                    _ => ".".to_string(),
                };
                for pattern in patterns.iter().filter(|pattern| pattern.matches(&local)) {
                    matched_by.push(format!("gitignore {scope}: {}", pattern.as_str()));
                }
            }
        }

        IgnoreVerdict { ignored: !matched_by.is_empty(), matched_by }
    }

    /// Read `dir/.gitignore` into the cache now. Returns whether it is in use.
    pub fn load_gitignore(&self, dir: &Path) -> bool {
        self.respect_gitignore && self.gitignore_for(&resolve_lossy(dir)).is_some()
    }

    /// Loaded rules per source. Only `.gitignore` files read so far are listed.
    pub fn patterns(&self) -> PatternListing {
        let texts = |patterns: &[IgnorePattern]| {
            patterns.iter().map(|pattern| pattern.as_str().to_string()).collect::<Vec<_>>()
        };
        let cache = self.gitignores.lock().unwrap_or_else(PoisonError::into_inner);
        PatternListing {
            global: texts(&self.global),
            config: texts(&self.config),
            files: texts(&self.files),
            gitignore: cache
                .iter()
                .map(|(dir, cached)| (dir.clone(), texts(&cached.patterns)))
                .collect(),
        }
    }

    /// `.gitignore` rule sets from the path's directory up to the watch root,
    /// nearest first.
    fn gitignore_scopes(&self, resolved: &Path) -> Vec<(PathBuf, Arc<Vec<IgnorePattern>>)> {
        let mut scopes = Vec::new();
        let mut current = resolved.parent();
        while let Some(dir) = current {
            if !dir.starts_with(&self.watch_root) {
                break;
            }
            if let Some(patterns) = self.gitignore_for(dir) {
                scopes.push((dir.to_path_buf(), patterns));
            }
            if dir == self.watch_root {
                break;
            }
            current = dir.parent();
        }
        scopes
    }

    fn gitignore_for(&self, dir: &Path) -> Option<Arc<Vec<IgnorePattern>>> {
        let file = dir.join(GITIGNORE);
        let mut cache = self.gitignores.lock().unwrap_or_else(PoisonError::into_inner);

        let metadata = match fs::metadata(&file) {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => {
                cache.remove(dir);
                return None;
            }
        };
        let modified = metadata.modified().ok();

        if let Some(cached) = cache.get(dir) {
            if modified.is_some() && cached.modified == modified {
                return Some(Arc::clone(&cached.patterns));
            }
        }

        let patterns = Arc::new(parse_all(load_rule_file(&file)));
        cache.insert(
            dir.to_path_buf(),
            CachedGitignore { modified, patterns: Arc::clone(&patterns) },
        );
        Some(patterns)
    }
}

/// Read a rule file: trimmed lines, blank and `#` lines dropped. A missing
/// file yields nothing; an unreadable one is logged and yields nothing.
pub fn load_rule_file(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect(),
        Err(error) if error.kind() == ErrorKind::NotFound => Vec::new(),
        Err(error) => {
            warn!(path = %path.display(), error = %error, "could not read ignore file");
            Vec::new()
        }
    }
}

fn parse_all<I: IntoIterator<Item = S>, S: AsRef<str>>(lines: I) -> Vec<IgnorePattern> {
    lines
        .into_iter()
        .map(|line| IgnorePattern::parse(line.as_ref()))
        .filter(|pattern| !pattern.is_inert() || pattern.as_str().starts_with('!'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        (tmp, root)
    }

    #[test]
    fn path_outside_root_is_ignored() {
        let (_tmp, root) = setup();
        let other = TempDir::new().unwrap();
        let matcher = IgnoreMatcher::new(&root, true);

        assert!(matcher.should_ignore(&other.path().join("file.txt")));
        let verdict = matcher.test_pattern(&other.path().join("file.txt"));
        assert!(verdict.ignored);
        assert_eq!(verdict.matched_by, vec!["outside watch directory"]);
    }

    #[test]
    fn plain_file_is_not_ignored() {
        let (_tmp, root) = setup();
        let matcher = IgnoreMatcher::new(&root, true).with_config(["*.log"]);

        assert!(!matcher.should_ignore(&root.join("notes.md")));
        assert!(matcher.should_ignore(&root.join("logs/app.log")));
    }

    #[test]
    fn sources_are_labelled() {
        let (_tmp, root) = setup();
        let matcher = IgnoreMatcher::new(&root, true)
            .with_global([".git/", "*.pyc"])
            .with_config(["cache/"])
            .with_files(["*.pyc"]);

        let verdict = matcher.test_pattern(&root.join("cache/mod.pyc"));

        assert!(verdict.ignored);
        assert_eq!(verdict.matched_by, vec!["global: *.pyc", "config: cache/", "ignore file: *.pyc"]);
    }

    #[test]
    fn git_directory_contents_ignored_by_seed_rules() {
        let (_tmp, root) = setup();
        let matcher = IgnoreMatcher::new(&root, false).with_global([".git/"]);

        assert!(matcher.should_ignore(&root.join(".git/index")));
        assert!(matcher.should_ignore(&root.join("vendor/lib/.git/HEAD")));
        assert!(!matcher.should_ignore(&root.join(".gitignore")));
    }

    #[test]
    fn nested_gitignore_is_relative_to_its_directory() {
        let (_tmp, root) = setup();
        fs::create_dir_all(root.join("app/src")).unwrap();
        fs::write(root.join("app/.gitignore"), "src/generated.rs\n").unwrap();
        fs::write(root.join(".gitignore"), "# top\n*.tmp\n").unwrap();
        let matcher = IgnoreMatcher::new(&root, true);

        assert!(matcher.should_ignore(&root.join("app/src/generated.rs")));
        assert!(!matcher.should_ignore(&root.join("src/generated.rs")));
        assert!(matcher.should_ignore(&root.join("app/src/scratch.tmp")));

        let verdict = matcher.test_pattern(&root.join("app/src/generated.rs"));
        assert_eq!(verdict.matched_by, vec!["gitignore app: src/generated.rs"]);
        let verdict = matcher.test_pattern(&root.join("x.tmp"));
        assert_eq!(verdict.matched_by, vec!["gitignore .: *.tmp"]);
    }

    #[test]
    fn gitignore_disabled() {
        let (_tmp, root) = setup();
        fs::write(root.join(".gitignore"), "*.tmp\n").unwrap();
        let matcher = IgnoreMatcher::new(&root, false);

        assert!(!matcher.should_ignore(&root.join("x.tmp")));
        assert!(!matcher.test_pattern(&root.join("x.tmp")).ignored);
    }

    #[test]
    fn gitignore_reloads_when_modified() {
        let (_tmp, root) = setup();
        let gitignore = root.join(".gitignore");
        fs::write(&gitignore, "*.tmp\n").unwrap();
        let matcher = IgnoreMatcher::new(&root, true);
        assert!(matcher.should_ignore(&root.join("a.tmp")));
        assert!(!matcher.should_ignore(&root.join("a.bak")));

        fs::write(&gitignore, "*.bak\n").unwrap();
        let later = SystemTime::now() + Duration::from_secs(5);
        fs::File::options().write(true).open(&gitignore).unwrap().set_modified(later).unwrap();

        assert!(matcher.should_ignore(&root.join("a.bak")));
        assert!(!matcher.should_ignore(&root.join("a.tmp")));
    }

    #[test]
    fn removed_gitignore_stops_matching() {
        let (_tmp, root) = setup();
        fs::write(root.join(".gitignore"), "*.tmp\n").unwrap();
        let matcher = IgnoreMatcher::new(&root, true);
        assert!(matcher.should_ignore(&root.join("a.tmp")));

        fs::remove_file(root.join(".gitignore")).unwrap();

        assert!(!matcher.should_ignore(&root.join("a.tmp")));
        assert!(matcher.patterns().gitignore.is_empty());
    }

    #[test]
    fn negation_does_not_unignore() {
        let (_tmp, root) = setup();
        let matcher = IgnoreMatcher::new(&root, true).with_config(["*.log", "!keep.log"]);

        assert!(matcher.should_ignore(&root.join("keep.log")));
        assert_eq!(matcher.patterns().config, vec!["*.log", "!keep.log"]);
    }

    #[test]
    fn deleted_file_resolves_through_parent() {
        let (_tmp, root) = setup();
        fs::create_dir_all(root.join("build")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        let matcher = IgnoreMatcher::new(&root, true).with_config(["build/"]);

        assert!(matcher.should_ignore(&root.join("build/gone.o")));
        assert!(matcher.should_ignore(&root.join("src/../build/gone.o")));
    }

    #[test]
    fn from_config_loads_rule_files() {
        let (_tmp, root) = setup();
        let rules = root.join("rules.ignore");
        fs::write(&rules, "# extra\n\n*.swp\n").unwrap();
        let global = root.join("global.ignore");
        fs::write(&global, ".git/\n").unwrap();

        let mut config = WatcherConfig::named("dotfiles");
        config.watch_directory = root.clone();
        config.ignore_patterns = vec!["*.log".to_string()];
        config.ignore_files = vec![rules, root.join("missing.ignore")];

        let matcher = IgnoreMatcher::from_config(&config, Some(&global));
        let listing = matcher.patterns();

        assert_eq!(listing.global, vec![".git/"]);
        assert_eq!(listing.config, vec!["*.log"]);
        assert_eq!(listing.files, vec!["*.swp"]);
        assert!(matcher.should_ignore(&root.join(".vimrc.swp")));
    }

    #[test]
    fn patterns_lists_cached_gitignores() {
        let (_tmp, root) = setup();
        fs::write(root.join(".gitignore"), "target/\n").unwrap();
        let matcher = IgnoreMatcher::new(&root, true);
        assert!(matcher.patterns().gitignore.is_empty());

        matcher.should_ignore(&root.join("src/lib.rs"));

        assert_eq!(matcher.patterns().gitignore.get(&root), Some(&vec!["target/".to_string()]));
    }

    #[test]
    fn load_gitignore_warms_cache() {
        let (_tmp, root) = setup();
        fs::write(root.join(".gitignore"), "*.o\n").unwrap();

        assert!(IgnoreMatcher::new(&root, true).load_gitignore(&root));
        assert!(!IgnoreMatcher::new(&root, false).load_gitignore(&root));
        assert!(!IgnoreMatcher::new(&root, true).load_gitignore(&root.join("missing")));

        let matcher = IgnoreMatcher::new(&root, true);
        matcher.load_gitignore(&root);
        assert_eq!(matcher.patterns().gitignore.len(), 1);
    }
}
