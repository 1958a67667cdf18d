use std::io::{self, Write};

use anyhow::Result;
use sprintdash_core::reconcile::SnapshotChange;
use sprintdash_core::reconcile::rebuild::{RebuildReport, rebuild_snapshots};

use super::{Context, RepairArgs};
use crate::output::{pretty_rule, pretty_section, render_mode};

/// Run `sdash rebuild`: recompute snapshot counts from work item timestamps.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or any read/write fails.
/// Missing sprints are reported, not treated as errors.
pub fn run_rebuild(args: &RepairArgs, ctx: &Context) -> Result<()> {
    let mut store = ctx.open_store()?;
    let targets = ctx.targets(&store, &args.targets)?;
    let report = rebuild_snapshots(&mut store, &targets, ctx.options(args))?;

    render_mode(ctx.output, &report, render_text, render_pretty)
}

pub fn write_change_row(
    w: &mut dyn Write,
    sprint_id: &str,
    change: &SnapshotChange,
) -> io::Result<()> {
    writeln!(
        w,
        "{sprint_id}\t{}\t{}\t{}\t{}",
        change.snapshot_date, change.snapshot_id, change.before, change.after
    )
}

fn render_text(report: &RebuildReport, w: &mut dyn Write) -> io::Result<()> {
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
        "rebuild: sprints={} examined={} updated={} dry_run={}",
        report.sprints.len(),
        report.snapshots_examined(),
        report.snapshots_updated(),
        report.dry_run
    )
}

fn render_pretty(report: &RebuildReport, w: &mut dyn Write) -> io::Result<()> {
    let heading = if report.dry_run {
        "Snapshot rebuild (dry run)"
    } else {
        "Snapshot rebuild"
    };
    pretty_section(w, heading)?;

    for sprint in &report.sprints {
        if let Some(reason) = sprint.skipped {
            writeln!(w, "{}  skipped: {reason}", sprint.sprint_id)?;
            continue;
        }
        writeln!(
            w,
            "{} [{}] {}  items={} snapshots={} updated={}",
            sprint.sprint_name.as_deref().unwrap_or("?"),
            sprint.sprint_id,
            sprint.project.as_deref().unwrap_or(""),
            sprint.work_item_count,
            sprint.snapshots_examined,
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

    pretty_rule(w)?;
    let verb = if report.dry_run { "would update" } else { "updated" };
    writeln!(
        w,
        "{} sprint(s), {} snapshot(s) examined, {verb} {} in {}ms",
        report.sprints.len(),
        report.snapshots_examined(),
        report.snapshots_updated(),
        report.elapsed_ms
    )
}
