pub mod burndown;
pub mod completions;
pub mod fix_counts;
pub mod import;
pub mod init;
pub mod rebuild;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use sprintdash_core::config::{ProjectConfig, load_project_config};
use sprintdash_core::reconcile::{ReconcileOptions, resolve_targets};
use sprintdash_core::store::SqliteStore;
use tracing::debug;

use crate::output::OutputMode;

/// Sprint selection shared by the batch commands.
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Sprint id to process. Repeat for several; defaults to the config list, then all sprints.
    #[arg(long = "sprint", value_name = "ID")]
    pub sprints: Vec<String>,
}

/// Arguments for the repairing commands.
#[derive(Args, Debug, Default)]
pub struct RepairArgs {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Report what would change without writing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Everything a command needs to find its project and store.
#[derive(Debug)]
pub struct Context {
    pub project_root: PathBuf,
    pub config: ProjectConfig,
    db_override: Option<PathBuf>,
    pub output: OutputMode,
}

impl Context {
    /// Load `.sprintdash/config.toml` under `project_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is unreadable or invalid.
    pub fn load(project_root: &Path, db_override: Option<PathBuf>, output: OutputMode) -> Result<Self> {
        let config = load_project_config(project_root).context("load project config")?;
        debug!(?config, "project config loaded");
        Ok(Self {
            project_root: project_root.to_path_buf(),
            config,
            db_override,
            output,
        })
    }

    /// Store path: `--db` if given, else `store.path` from config.
    pub fn store_path(&self) -> PathBuf {
        match &self.db_override {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.project_root.join(path),
            None => self.config.store_path(&self.project_root),
        }
    }

    /// Open the existing store. Never creates one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is missing, corrupt, or too new.
    pub fn open_store(&self) -> Result<SqliteStore> {
        let path = self.store_path();
        let conn = sprintdash_core::db::open_store(&path)?;
        debug!(path = %path.display(), "store opened");
        Ok(SqliteStore::new(conn))
    }

    /// Resolve which sprints to visit: flags, then config, then every sprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot enumerate sprints.
    pub fn targets(&self, store: &SqliteStore, args: &TargetArgs) -> Result<Vec<String>> {
        let requested = if args.sprints.is_empty() {
            &self.config.reconcile.sprints
        } else {
            &args.sprints
        };
        resolve_targets(store, requested).context("resolve target sprints")
    }

    pub const fn options(&self, args: &RepairArgs) -> ReconcileOptions {
        ReconcileOptions {
            dry_run: args.dry_run || self.config.reconcile.dry_run,
        }
    }
}
