use std::io::{self, Write};

use anyhow::Result;
use sprintdash_core::reconcile::fix_counts::{FixReport, fix_snapshot_counts};

use super::rebuild::write_change_row;
use super::{Context, RepairArgs};
use crate::output::{pretty_rule, pretty_section, render_mode};

/// Run `sdash fix-counts`: backfill all-zero snapshots from the first
/// snapshot with positive counts.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or any read/write fails.
pub fn run_fix_counts(args: &RepairArgs, ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    let targets = ctx.targets(&store, &args.targets)?;
    let report = fix_snapshot_counts(&mut store, &targets, ctx.options(args))?;

    render_mode(ctx.output, &report, render_text, render_pretty)
}

fn render_text(report: &FixReport, w: &mut dyn Write) -> io::Result<()> {
    for sprint in &report.sprints {
        if let Some(reason) = sprint.skipped {
            writeln!(w, "{}\tskipped\t{}", sprint.sprint_id, reason.code())?;
            continue;
        }
        for change in &sprint.changes {
            write_change_row(w, &sprint.sprint_id, change)?;
        }
    }
    writeln!(
        w,
        "fix-counts: sprints={} fixed={} dry_run={}",
        report.sprints.len(),
        report.snapshots_fixed(),
        report.dry_run
    )
}

fn render_pretty(report: &FixReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(
        w,
        if report.dry_run {
            "Zero-count backfill (dry run)"
        } else {
            "Zero-count backfill"
        },
    )?;

    for sprint in &report.sprints {
        let name = sprint.sprint_name.as_deref().unwrap_or(&sprint.sprint_id);
        match (sprint.skipped, sprint.reference) {
            (Some(reason), _) => writeln!(w, "{name}  skipped: {reason}")?,
            (None, Some(reference)) => {
                writeln!(
                    w,
                    "{name}  reference {} (#{}) total={}  fixed={}",
                    reference.snapshot_date,
                    reference.snapshot_id,
                    reference.total_items,
                    sprint.changes.len()
                )?;
                for change in &sprint.changes {
                    writeln!(
                        w,
                        "  {}  #{:<6} {} -> {}",
                        change.snapshot_date, change.snapshot_id, change.before, change.after
                    )?;
                }
            }
            (None, None) => writeln!(w, "{name}  nothing to do")?,
        }
    }

    pretty_rule(w)?;
    writeln!(
        w,
        "{} sprint(s), {} snapshot(s) {}",
        report.sprints.len(),
        report.snapshots_fixed(),
        if report.dry_run { "would be fixed" } else { "fixed" }
    )
}
