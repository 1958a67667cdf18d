use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;

/// Project-relative directory holding config and the default store.
pub const PROJECT_DIR: &str = ".sprintdash";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database path. Relative paths resolve against the project root.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Sprints to reconcile when `--sprint` is not given. Empty means all.
    #[serde(default)]
    pub sprints: Vec<String>,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_store_path() -> PathBuf {
    Path::new(PROJECT_DIR).join("sprintdash.db")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::InputReadError,
            Self::Parse { .. } => ErrorCode::ConfigParseError,
        }
    }
}

impl ProjectConfig {
    /// Absolute store path for a project rooted at `project_root`.
    #[must_use]
    pub fn store_path(&self, project_root: &Path) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            project_root.join(&self.store.path)
        }
    }
}

/// Load `.sprintdash/config.toml` under `project_root`.
///
/// A missing file yields the defaults.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig, ConfigError> {
    let path = project_root.join(PROJECT_DIR).join(CONFIG_FILE);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    toml::from_str::<ProjectConfig>(&content).map_err(|source| ConfigError::Parse { path, source })
}

/// Render a commented default config, as written by `sdash init`.
#[must_use]
pub fn default_config_toml() -> String {
    let path = default_store_path();
    format!(
        "[store]\n\
         path = \"{}\"\n\
         \n\
         [reconcile]\n\
         # Sprint ids to reconcile by default. Empty means every sprint.\n\
         sprints = []\n\
         dry_run = false\n",
        path.display()
    )
}
