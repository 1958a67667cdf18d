use std::io::{self, Write};

use anyhow::Result;
use sprintdash_core::reconcile::MismatchError;
use sprintdash_core::reconcile::validate::{ValidationReport, validate_snapshots};

use super::{Context, TargetArgs};
use crate::output::{pretty_rule, pretty_section, render_mode};

/// Run `sdash validate`. Read-only.
///
/// # Errors
///
/// Returns [`MismatchError`] after printing the report when any snapshot
/// disagrees with its sprint's live work item count, or a store error.
pub fn run_validate(args: &TargetArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let targets = ctx.targets(&store, args)?;
    let report = validate_snapshots(&store, &targets)?;

    render_mode(ctx.output, &report, render_text, render_pretty)?;

    if report.is_ok() {
        Ok(())
    } else {
        Err(MismatchError {
            mismatched: report.mismatch_count(),
            checked: report.checked_count(),
        }
        .into())
    }
}

fn render_text(report: &ValidationReport, w: &mut dyn Write) -> io::Result<()> {
    for sprint in &report.sprints {
        for check in &sprint.checks {
            let status = if check.matches { "OK  " } else { "FAIL" };
            writeln!(
                w,
                "{status} {}\t{}\ttotal={}\texpected={}",
                sprint.sprint_id, check.snapshot_date, check.actual_total, sprint.expected_total
            )?;
        }
    }
    for (sprint_id, reason) in &report.skipped {
        writeln!(w, "SKIP {sprint_id}\t{}", reason.code())?;
    }
    if report.is_ok() {
        writeln!(w, "validate: success")
    } else {
        writeln!(
            w,
            "validate: {} of {} snapshots mismatched",
            report.mismatch_count(),
            report.checked_count()
        )
    }
}

fn render_pretty(report: &ValidationReport, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, "Snapshot validation")?;

    for sprint in &report.sprints {
        let bad = sprint.mismatches().count();
        writeln!(
            w,
            "{} [{}]  expected total {}  {}/{} ok",
            sprint.sprint_name,
            sprint.sprint_id,
            sprint.expected_total,
            sprint.checks.len() - bad,
            sprint.checks.len()
        )?;
        for check in sprint.mismatches() {
            writeln!(
                w,
                "  FAIL {}  #{:<6} {} sums to {}",
                check.snapshot_date, check.snapshot_id, check.counts, check.actual_total
            )?;
        }
    }
    for (sprint_id, reason) in &report.skipped {
        writeln!(w, "{sprint_id}  skipped: {reason}")?;
    }

    pretty_rule(w)?;
    if report.is_ok() {
        writeln!(w, "All {} snapshot(s) match.", report.checked_count())
    } else {
        writeln!(
            w,
            "{} of {} snapshot(s) disagree with the live work item count.",
            report.mismatch_count(),
            report.checked_count()
        )
    }
}
