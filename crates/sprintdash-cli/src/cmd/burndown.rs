use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use sprintdash_core::reconcile::SprintNotFoundError;
use sprintdash_core::reconcile::burndown::{Burndown, load_burndown};

use super::Context;
use crate::output::{pretty_kv, pretty_rule, pretty_section, render_mode};

const BAR_WIDTH: u64 = 40;

#[derive(Args, Debug)]
pub struct BurndownArgs {
    /// Sprint id to chart.
    #[arg(value_name = "SPRINT")]
    pub sprint: String,
}

/// Print the remaining-work series for one sprint from its stored snapshots.
///
/// # Errors
///
/// Returns [`SprintNotFoundError`] for an unknown sprint, or a store error.
pub fn run_burndown(args: &BurndownArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let Some(burndown) = load_burndown(&store, &args.sprint)? else {
        return Err(SprintNotFoundError {
            sprint_id: args.sprint.clone(),
        }
        .into());
    };

    render_mode(ctx.output, &burndown, render_text, render_pretty)
}

fn render_text(burndown: &Burndown, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "date\tremaining\tdone\ttotal")?;
    for point in &burndown.points {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            point.date, point.remaining, point.done, point.total
        )?;
    }
    Ok(())
}

fn render_pretty(burndown: &Burndown, w: &mut dyn Write) -> io::Result<()> {
    let sprint = &burndown.sprint;
    pretty_section(w, &format!("Burndown: {} [{}]", sprint.name, sprint.id))?;
    pretty_kv(w, "project", &sprint.project)?;
    if let (Some(start), Some(finish)) = (sprint.start_date, sprint.finish_date) {
        pretty_kv(w, "dates", format!("{start} .. {finish}"))?;
    }
    if let Some(completion) = burndown.completion() {
        pretty_kv(w, "complete", format!("{:.0}%", completion * 100.0))?;
    }
    pretty_rule(w)?;

    if burndown.points.is_empty() {
        return writeln!(w, "(no snapshots)");
    }

    let peak = burndown
        .points
        .iter()
        .map(|p| p.total)
        .max()
        .unwrap_or(0)
        .max(1);
    for point in &burndown.points {
        let filled = usize::try_from(point.remaining * BAR_WIDTH / peak).unwrap_or(0);
        writeln!(
            w,
            "{} {:>4} {:<width$} done {}",
            point.date.format("%a %d %b"),
            point.remaining,
            "#".repeat(filled),
            point.done,
            width = usize::try_from(BAR_WIDTH).unwrap_or(0)
        )?;
    }
    Ok(())
}
