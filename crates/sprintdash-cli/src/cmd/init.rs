use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use sprintdash_core::config::{CONFIG_FILE, PROJECT_DIR, default_config_toml};
use sprintdash_core::db::{create_store, migrations};

use super::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing `.sprintdash/config.toml` with the defaults.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
struct InitReport {
    store: String,
    config: String,
    config_written: bool,
    schema_version: u32,
}

/// Execute `sdash init`. Creates the project skeleton:
///
/// ```text
/// .sprintdash/
///   config.toml      (default project config)
///   sprintdash.db    (migrated SQLite store, unless --db points elsewhere)
/// ```
///
/// Re-running is safe: an existing store is migrated in place and an
/// existing config is kept unless `--force` is given.
///
/// # Errors
///
/// Returns an error if any filesystem or store operation fails.
pub fn run_init(args: &InitArgs, ctx: &Context) -> Result<()> {
    let project_dir = ctx.project_root.join(PROJECT_DIR);
    std::fs::create_dir_all(&project_dir)
        .with_context(|| format!("create {}", project_dir.display()))?;

    let config_path = project_dir.join(CONFIG_FILE);
    let config_written = args.force || !config_path.exists();
    if config_written {
        std::fs::write(&config_path, default_config_toml())
            .with_context(|| format!("write config {}", config_path.display()))?;
    }

    let store_path = ctx.store_path();
    let conn = create_store(&store_path)?;
    let schema_version = migrations::current_schema_version(&conn)
        .context("read store schema version")?;

    let report = InitReport {
        store: store_path.display().to_string(),
        config: config_path.display().to_string(),
        config_written,
        schema_version,
    };

    render_mode(
        ctx.output,
        &report,
        |r, w| writeln!(w, "init: store={} schema={}", r.store, r.schema_version),
        |r, w| {
            pretty_section(w, "Initialized sprintdash project")?;
            pretty_kv(w, "store", &r.store)?;
            pretty_kv(w, "schema", r.schema_version.to_string())?;
            let note = if r.config_written { "written" } else { "kept" };
            pretty_kv(w, "config", format!("{} ({note})", r.config))?;
            writeln!(w)?;
            writeln!(w, "Next steps:")?;
            writeln!(w, "  sdash import dump.json")?;
            writeln!(w, "  sdash validate")
        },
    )
}
