//! Discovery and loading of the packaged YAML settings file.
//!
//! Loading never fails from the caller's point of view: a missing, unreadable
//! or malformed file yields an empty [`LoadedConfig`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::environment::{EnvironmentDetector, ProcessEnvironment};

/// Package directory name searched for `files/<config>`.
pub const DEFAULT_PACKAGE: &str = "snowglue";

/// Files or directories that mark the top of a project checkout.
pub const PROJECT_MARKERS: [&str; 2] = ["Cargo.toml", ".git"];

/// Settings file name inside `files/`.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

// ── LoadedConfig ──────────────────────────────────────────────

/// Flat key-value mapping read from a YAML document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LoadedConfig(BTreeMap<String, serde_yaml::Value>);

impl LoadedConfig {
    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.0.get(key)
    }

    /// String value for `key`; `None` when absent or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Build from YAML text. Anything but a mapping is treated as empty.
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        let serde_yaml::Value::Mapping(mapping) = value else {
            return Ok(Self::default());
        };

        let entries = mapping
            .into_iter()
            .filter_map(|(k, v)| match k {
                serde_yaml::Value::String(k) => Some((k, v)),
                other => {
                    debug!(key = ?other, "Skipping non-string config key");
                    None
                }
            })
            .collect();
        Ok(Self(entries))
    }
}

/// Load a YAML config file, returning an empty mapping on any failure.
pub fn load_config(path: &Path) -> LoadedConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Config file not readable, using empty config");
            return LoadedConfig::default();
        }
    };

    match LoadedConfig::from_yaml_str(&content) {
        Ok(config) => {
            debug!(path = %path.display(), keys = config.len(), "Loaded config");
            config
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid YAML in config file, using empty config");
            LoadedConfig::default()
        }
    }
}

// ── ConfigLocator ─────────────────────────────────────────────

/// Resolves where the settings file lives for the current runtime.
///
/// Locally the search walks up from the search root looking for
/// `<package>/files/<file>` or `files/<file>`. The walk stops at the first
/// directory holding a project marker (`Cargo.toml` or `.git`), or after
/// `max_depth` parent steps when one is set. In the sandbox the staged
/// import directory is checked first, then the extraction directory under
/// the temp dir.
#[derive(Clone)]
pub struct ConfigLocator {
    package: String,
    file_name: String,
    search_root: PathBuf,
    extract_root: PathBuf,
    max_depth: Option<usize>,
    environment: Arc<dyn EnvironmentDetector>,
}

impl std::fmt::Debug for ConfigLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLocator")
            .field("package", &self.package)
            .field("file_name", &self.file_name)
            .field("search_root", &self.search_root)
            .field("extract_root", &self.extract_root)
            .field("max_depth", &self.max_depth)
            .field("sandbox", &self.environment.is_sandbox())
            .finish()
    }
}

impl Default for ConfigLocator {
    fn default() -> Self {
        Self::new(DEFAULT_PACKAGE)
    }
}

impl ConfigLocator {
    /// Locator for `package`, rooted at the process cwd and reading the
    /// sandbox flag from the process environment.
    pub fn new(package: impl Into<String>) -> Self {
        let package = package.into();
        let search_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let extract_root = std::env::temp_dir().join(&package);
        Self {
            package,
            file_name: DEFAULT_CONFIG_FILE.to_string(),
            search_root,
            extract_root,
            max_depth: None,
            environment: Arc::new(ProcessEnvironment),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_root = root.into();
        self
    }

    pub fn with_extract_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.extract_root = root.into();
        self
    }

    /// Limit the local walk to `depth` parent directories above the search
    /// root. `0` checks the search root only.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_environment(mut self, environment: Arc<dyn EnvironmentDetector>) -> Self {
        self.environment = environment;
        self
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn is_sandbox(&self) -> bool {
        self.environment.is_sandbox()
    }

    fn relative_path(&self) -> PathBuf {
        Path::new(&self.package).join("files").join(&self.file_name)
    }

    /// Canonical location of the settings file. May not exist.
    pub fn config_path(&self) -> PathBuf {
        if self.environment.is_sandbox() {
            self.extract_root.join(self.relative_path())
        } else {
            self.search_root.join(self.relative_path())
        }
    }

    /// Candidate locations in search order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let relative = self.relative_path();
        let flat = Path::new("files").join(&self.file_name);

        match self.environment.import_directory() {
            Some(import_dir) => vec![
                import_dir.join(&relative),
                import_dir.join(&flat),
                self.extract_root.join(&relative),
            ],
            None => self
                .search_dirs()
                .into_iter()
                .flat_map(|dir| [dir.join(&relative), dir.join(&flat)])
                .collect(),
        }
    }

    /// Search root and the ancestors the local walk is allowed to visit.
    fn search_dirs(&self) -> Vec<&Path> {
        let mut dirs = Vec::new();
        for (depth, dir) in self.search_root.ancestors().enumerate() {
            if self.max_depth.is_some_and(|max| depth > max) {
                break;
            }
            dirs.push(dir);
            if PROJECT_MARKERS.iter().any(|m| dir.join(m).exists()) {
                break;
            }
        }
        dirs
    }

    /// First existing candidate, or `None` when no settings file is present.
    pub fn find_config_file(&self) -> Option<PathBuf> {
        let found = self.candidates().into_iter().find(|p| p.is_file());
        match &found {
            Some(path) => debug!(path = %path.display(), "Found config file"),
            None => debug!(
                package = %self.package,
                sandbox = self.environment.is_sandbox(),
                "No config file found"
            ),
        }
        found
    }

    /// Locate and load in one step. Empty when nothing is found.
    pub fn load(&self) -> LoadedConfig {
        self.find_config_file()
            .map(|p| load_config(&p))
            .unwrap_or_default()
    }
}

// ── Tests ─────────────────────────────────────────────────────
