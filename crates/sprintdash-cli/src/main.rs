#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "sdash: sprint snapshot reconciliation",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Store database path (overrides `store.path` in config).
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Create and migrate the store",
        long_about = "Create .sprintdash/ with a default config and a migrated SQLite store.",
        after_help = "EXAMPLES:\n    # Initialize in the current directory\n    sdash init\n\n    # Keep the store somewhere else\n    sdash --db /var/lib/sprintdash.db init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Load mirrored sprint data",
        long_about = "Upsert sprints, work items and snapshots from a JSON dump in one transaction.",
        after_help = "EXAMPLES:\n    # Import a dump file\n    sdash import dump.json\n\n    # Import from stdin\n    cat dump.json | sdash import -"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        next_help_heading = "Repair",
        about = "Recompute snapshots from work items",
        long_about = "Recompute todo/in-progress/done for every stored snapshot from work item lifecycle timestamps.",
        after_help = "EXAMPLES:\n    # Rebuild every sprint\n    sdash rebuild\n\n    # Preview one sprint\n    sdash rebuild --sprint sprint-42 --dry-run\n\n    # Emit machine-readable output\n    sdash rebuild --json"
    )]
    Rebuild(cmd::RepairArgs),

    #[command(
        next_help_heading = "Repair",
        about = "Backfill all-zero snapshots",
        long_about = "Rewrite all-zero snapshots dated before the first positive snapshot as all-todo.",
        after_help = "EXAMPLES:\n    # Fix every sprint\n    sdash fix-counts\n\n    # Preview two sprints\n    sdash fix-counts --sprint s-1 --sprint s-2 --dry-run"
    )]
    FixCounts(cmd::RepairArgs),

    #[command(
        next_help_heading = "Read",
        about = "Check snapshot sums",
        long_about = "Report snapshots whose counts do not sum to the live work item count. Exits non-zero on mismatch.",
        after_help = "EXAMPLES:\n    # Validate every sprint\n    sdash validate\n\n    # Emit machine-readable output\n    sdash validate --json"
    )]
    Validate(cmd::TargetArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show a sprint burndown",
        long_about = "Print remaining and done work per snapshot day for one sprint.",
        after_help = "EXAMPLES:\n    # Chart a sprint\n    sdash burndown sprint-42\n\n    # Tab-separated for plotting\n    sdash burndown sprint-42 --format text"
    )]
    Burndown(cmd::burndown::BurndownArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    sdash completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("SDASH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if quiet {
            "error"
        } else if verbose || env::var("DEBUG").is_ok() {
            "sprintdash=debug,info"
        } else {
            "sprintdash=info,warn"
        })
    });

    let format = env::var("SDASH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: Cli, output: OutputMode) -> anyhow::Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let project_root = env::current_dir()?;
    let ctx = cmd::Context::load(&project_root, cli.db, output)?;
    debug!(store = %ctx.store_path().display(), ?output, "running command");

    match cli.command {
        Commands::Init(args) => cmd::init::run_init(&args, &ctx),
        Commands::Import(args) => cmd::import::run_import(&args, &ctx),
        Commands::Rebuild(args) => cmd::rebuild::run_rebuild(&args, &ctx),
        Commands::FixCounts(args) => cmd::fix_counts::run_fix_counts(&args, &ctx),
        Commands::Validate(args) => cmd::validate::run_validate(&args, &ctx),
        Commands::Burndown(args) => cmd::burndown::run_burndown(&args, &ctx),
        Commands::Completions(_) => Ok(()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let mode = cli.output_mode();

    if let Err(err) = run(cli, mode) {
        output::render_error(mode, &CliError::from(&err))?;
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["sdash", "validate", "--json", "--db", "x.db"]);
        assert!(cli.json);
        assert_eq!(cli.db, Some(PathBuf::from("x.db")));
        assert!(matches!(cli.command, Commands::Validate(_)));
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["sdash", "--format", "text", "rebuild"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn repeated_sprint_flags_collect() {
        let cli = Cli::parse_from([
            "sdash", "rebuild", "--sprint", "s-1", "--sprint", "s-2", "--dry-run",
        ]);
        let Commands::Rebuild(args) = cli.command else {
            panic!("expected rebuild");
        };
        assert_eq!(args.targets.sprints, vec!["s-1", "s-2"]);
        assert!(args.dry_run);
    }

    #[test]
    fn fix_counts_uses_kebab_case_name() {
        let cli = Cli::parse_from(["sdash", "fix-counts"]);
        assert!(matches!(cli.command, Commands::FixCounts(_)));
    }

    #[test]
    fn burndown_requires_sprint() {
        assert!(Cli::try_parse_from(["sdash", "burndown"]).is_err());
        let cli = Cli::parse_from(["sdash", "burndown", "s-1"]);
        assert!(matches!(cli.command, Commands::Burndown(_)));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["sdash", "-v", "-q", "validate"]).is_err());
    }

    #[test]
    fn all_subcommands_parse() {
        let subcommands = [
            vec!["sdash", "init"],
            vec!["sdash", "init", "--force"],
            vec!["sdash", "import", "dump.json"],
            vec!["sdash", "rebuild"],
            vec!["sdash", "fix-counts", "--dry-run"],
            vec!["sdash", "validate", "--sprint", "s-1"],
            vec!["sdash", "burndown", "s-1"],
            vec!["sdash", "completions", "zsh"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
