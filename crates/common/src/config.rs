// Watcher configuration files.
//
// Per-watcher config: `~/.config/watcher/<name>.toml`
// Global ignore rules: `~/.config/watcher/ignore`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::path::expand_home;

/// Name used when no config name is given on the command line.
pub const DEFAULT_CONFIG_NAME: &str = "config";
/// Default quiet period before a batch of changes is committed.
pub const DEFAULT_COMMIT_DELAY_SECS: i64 = 60;
/// Default remote polling interval.
pub const DEFAULT_FETCH_INTERVAL_SECS: i64 = 600;

const DEFAULT_DIRECTORY: &str = "~/.dotfiles";
const CONFIG_EXTENSION: &str = "toml";
const GLOBAL_IGNORE_SEED: &str = "\
# Global ignore patterns for watcher
# Add patterns here that should be ignored by all watchers

.git/
*.pyc
__pycache__/
";

// ── Watcher config ─────────────────────────────────────────────────

/// Configuration for a single watcher instance.
///
/// Every field has a default, so a partial file (or no file at all) yields a
/// usable config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatcherConfig {
    /// Config name, shown in notification titles.
    pub name: String,
    /// Directory whose events are observed.
    pub watch_directory: PathBuf,
    /// Root git repository that receives commits.
    pub repo_directory: PathBuf,
    /// Quiet period in seconds before committing (must be >= 0).
    pub commit_delay: i64,
    /// Remote polling interval in seconds (must be >= 0, 0 disables polling).
    pub fetch_interval: i64,
    pub enable_notifications: bool,
    pub notify_on_commit: bool,
    pub notify_on_remote_changes: bool,
    pub auto_push: bool,
    pub respect_gitignore: bool,
    /// Extra ignore patterns declared inline.
    pub ignore_patterns: Vec<String>,
    /// Extra ignore rule files.
    pub ignore_files: Vec<PathBuf>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_CONFIG_NAME.to_string(),
            watch_directory: PathBuf::from(DEFAULT_DIRECTORY),
            repo_directory: PathBuf::from(DEFAULT_DIRECTORY),
            commit_delay: DEFAULT_COMMIT_DELAY_SECS,
            fetch_interval: DEFAULT_FETCH_INTERVAL_SECS,
            enable_notifications: true,
            notify_on_commit: true,
            notify_on_remote_changes: true,
            auto_push: true,
            respect_gitignore: true,
            ignore_patterns: Vec::new(),
            ignore_files: Vec::new(),
        }
    }
}

impl WatcherConfig {
    /// Defaults with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Expand `~` in directory and ignore-file paths.
    pub fn expand_paths(mut self) -> Self {
        self.watch_directory = expand_home(&self.watch_directory);
        self.repo_directory = expand_home(&self.repo_directory);
        self.ignore_files = self.ignore_files.iter().map(|path| expand_home(path)).collect();
        self
    }

    /// Debounce window. Negative values clamp to zero; `validate` reports them.
    pub fn commit_delay(&self) -> Duration {
        Duration::from_secs(self.commit_delay.max(0).unsigned_abs())
    }

    /// Remote polling interval. Zero disables polling.
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval.max(0).unsigned_abs())
    }

    /// Whether commit notifications should be delivered.
    pub fn commit_notifications(&self) -> bool {
        self.enable_notifications && self.notify_on_commit
    }

    /// Whether remote-change notifications should be delivered.
    pub fn remote_notifications(&self) -> bool {
        self.enable_notifications && self.notify_on_remote_changes
    }

    /// Check the config against the filesystem before the engine starts.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if !self.watch_directory.exists() {
            report.errors.push(format!(
                "Watch directory does not exist: {}",
                self.watch_directory.display()
            ));
        }

        if !self.repo_directory.exists() {
            report.errors.push(format!(
                "Repository directory does not exist: {}",
                self.repo_directory.display()
            ));
        } else if !self.repo_directory.join(".git").exists() {
            report.errors.push(format!(
                "Repository directory is not a git repository: {}",
                self.repo_directory.display()
            ));
        }

        for ignore_file in &self.ignore_files {
            if !ignore_file.exists() {
                report
                    .warnings
                    .push(format!("Ignore file does not exist: {}", ignore_file.display()));
            }
        }

        if self.commit_delay < 0 {
            report.errors.push("commit_delay must be non-negative".to_string());
        }
        if self.fetch_interval < 0 {
            report.errors.push("fetch_interval must be non-negative".to_string());
        }

        report
    }
}

/// Result of `WatcherConfig::validate`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Values applied on top of the defaults by `ConfigStore::create`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub watch_directory: Option<PathBuf>,
    pub repo_directory: Option<PathBuf>,
    pub commit_delay: Option<i64>,
}

/// Outcome of `ConfigStore::create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(PathBuf),
    /// The file was already present and left untouched.
    AlreadyExists(PathBuf),
}

impl CreateOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(path) | Self::AlreadyExists(path) => path,
        }
    }
}

// ── Config store ───────────────────────────────────────────────────

/// Directory holding every watcher config plus the global ignore file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Store rooted at `~/.config/watcher/`.
    pub fn resolve() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::at(home.join(".config").join("watcher")))
    }

    /// Store rooted at an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<name>.toml`; a name already carrying the extension is kept as is.
    pub fn config_path(&self, name: &str) -> PathBuf {
        let suffix = format!(".{CONFIG_EXTENSION}");
        if name.ends_with(&suffix) {
            self.dir.join(name)
        } else {
            self.dir.join(format!("{name}{suffix}"))
        }
    }

    pub fn global_ignore_path(&self) -> PathBuf {
        self.dir.join("ignore")
    }

    pub fn exists(&self, name: &str) -> bool {
        self.config_path(name).exists()
    }

    /// Names of all configs in the store, sorted.
    pub fn list_configs(&self) -> Result<Vec<String>, ConfigError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|source| ConfigError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().and_then(|ext| ext.to_str()) == Some(CONFIG_EXTENSION)
            })
            .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Load `name`, falling back to defaults when the file is absent.
    ///
    /// A file without a `name` key takes the config's file stem as its name.
    /// `~` is expanded in every path field.
    pub fn load(&self, name: &str) -> Result<WatcherConfig, ConfigError> {
        let path = self.config_path(name);
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());

        if !path.exists() {
            return Ok(WatcherConfig::named(stem).expand_paths());
        }

        let contents = std::fs::read_to_string(&path)
            .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        let mut table: toml::Table = toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
        table.entry("name").or_insert_with(|| toml::Value::String(stem));

        let config: WatcherConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|source| ConfigError::Parse { path, source })?;
        Ok(config.expand_paths())
    }

    /// Write a new config from defaults plus `overrides`. Never overwrites.
    pub fn create(
        &self,
        name: &str,
        overrides: ConfigOverrides,
    ) -> Result<CreateOutcome, ConfigError> {
        let path = self.config_path(name);
        if path.exists() {
            return Ok(CreateOutcome::AlreadyExists(path));
        }
        self.ensure_dir()?;

        let mut config = WatcherConfig::named(
            path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default(),
        );
        if let Some(dir) = overrides.watch_directory {
            config.watch_directory = dir;
        }
        if let Some(dir) = overrides.repo_directory {
            config.repo_directory = dir;
        }
        if let Some(delay) = overrides.commit_delay {
            config.commit_delay = delay;
        }

        let contents = toml::to_string_pretty(&config).map_err(ConfigError::Serialize)?;
        std::fs::write(&path, contents)
            .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        Ok(CreateOutcome::Created(path))
    }

    /// Create the global ignore file with a basic seed if it is missing.
    pub fn ensure_global_ignore(&self) -> Result<PathBuf, ConfigError> {
        let path = self.global_ignore_path();
        if path.exists() {
            return Ok(path);
        }
        self.ensure_dir()?;
        std::fs::write(&path, GLOBAL_IGNORE_SEED)
            .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
        Ok(path)
    }

    fn ensure_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|source| ConfigError::Io { path: self.dir.clone(), source })
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("config I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config serialize error: {0}")]
    Serialize(toml::ser::Error),
}
