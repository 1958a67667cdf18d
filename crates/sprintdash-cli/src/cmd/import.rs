use anyhow::{Context as _, Result};
use clap::Args;
use sprintdash_core::import::{import_dump, load_dump, parse_dump};
use std::path::PathBuf;

use super::Context;
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON dump with `sprints`, `work_items` and `snapshots` arrays. Use `-` for stdin.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Upsert a JSON dump into the store.
///
/// # Errors
///
/// Returns an error if the store is missing, the dump is invalid, or any
/// write fails. A failed import leaves the store unchanged.
pub fn run_import(args: &ImportArgs, ctx: &Context) -> Result<()> {
    let dump = if args.file.as_os_str() == "-" {
        parse_dump(std::io::stdin().lock()).context("read dump from stdin")?
    } else {
        let path = if args.file.is_absolute() {
            args.file.clone()
        } else {
            ctx.project_root.join(&args.file)
        };
        load_dump(&path)?
    };

    let store = ctx.open_store()?;
    let report = import_dump(&store, &dump)?;

    render_mode(
        ctx.output,
        &report,
        |r, w| {
            writeln!(
                w,
                "import: sprints={} work_items={} snapshots={}",
                r.sprints, r.work_items, r.snapshots
            )
        },
        |r, w| {
            pretty_section(w, "Import")?;
            pretty_kv(w, "sprints", r.sprints.to_string())?;
            pretty_kv(w, "work items", r.work_items.to_string())?;
            pretty_kv(w, "snapshots", r.snapshots.to_string())?;
            if r.unordered_lifecycles > 0 {
                pretty_kv(
                    w,
                    "warning",
                    format!(
                        "{} item(s) with out-of-order lifecycle timestamps, imported as-is",
                        r.unordered_lifecycles
                    ),
                )?;
            }
            Ok(())
        },
    )
}
