use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rtmirror::{
    Config, DesiredTaskState, ExecutionMode, ExistingTask, FilterBuilder, MemoryService,
    MirrorReport, PairOutcome, TaskMirror,
};

#[derive(Parser)]
#[command(name = "rtmirror", about = "Mirror a desired task list onto a task service")]
struct Cli {
    /// Config path (default: ~/.rtmirror/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Progress reporter that writes to stderr.
struct StderrProgress;

impl rtmirror::MirrorProgress for StderrProgress {
    fn on_plan(&self, to_delete: usize, matched: usize, to_add: usize) {
        eprintln!("Plan: {to_delete} to delete, {matched} matched, {to_add} to add");
    }

    fn on_deleted(&self, name: &str) {
        eprintln!("  Deleted {name}");
    }

    fn on_created(&self, name: &str) {
        eprintln!("  Created {name}");
    }

    fn on_mirrored(&self, name: &str, outcome: &PairOutcome) {
        if outcome.calls > 0 {
            eprintln!("  Updated {name} ({} calls)", outcome.calls);
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show the calls a mirror run would make against a snapshot
    Plan {
        /// JSON array of existing tasks
        #[arg(long)]
        existing: PathBuf,
        /// JSON array of desired task states
        #[arg(long)]
        desired: PathBuf,
        /// Run in concurrent mode regardless of config
        #[arg(long)]
        concurrent: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the desired states that reproduce a snapshot unchanged
    Snapshot {
        /// JSON array of existing tasks
        #[arg(long)]
        existing: PathBuf,
    },
    /// Build a search expression
    Filter {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        list: Option<String>,
        /// Required tag (repeatable)
        #[arg(long)]
        tag: Vec<String>,
        /// Completed tasks only
        #[arg(long, conflicts_with = "incomplete")]
        complete: bool,
        /// Incomplete tasks only
        #[arg(long)]
        incomplete: bool,
        /// Due after date (YYYY-MM-DD)
        #[arg(long)]
        due_after: Option<String>,
        /// Due before date (YYYY-MM-DD)
        #[arg(long)]
        due_before: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Plan {
            existing,
            desired,
            concurrent,
            json,
        } => {
            handle_plan(config, &existing, &desired, concurrent, json).await?;
        }
        Commands::Snapshot { existing } => {
            let tasks = read_existing(&existing)?;
            let desired: Vec<DesiredTaskState> =
                tasks.iter().map(DesiredTaskState::from_task).collect();
            println!("{}", serde_json::to_string_pretty(&desired)?);
        }
        Commands::Filter {
            name,
            list,
            tag,
            complete,
            incomplete,
            due_after,
            due_before,
        } => {
            let mut builder = FilterBuilder::new();
            if let Some(ref name) = name {
                builder = builder.name(name);
            }
            if let Some(ref list) = list {
                builder = builder.list(list);
            }
            for t in &tag {
                builder = builder.tag(t);
            }
            if complete {
                builder = builder.completed(true);
            } else if incomplete {
                builder = builder.completed(false);
            }
            if let Some(d) = parse_date(due_after.as_deref())? {
                builder = builder.due_after(d);
            }
            if let Some(d) = parse_date(due_before.as_deref())? {
                builder = builder.due_before(d);
            }
            println!("{}", builder.build());
        }
    }

    Ok(())
}

async fn handle_plan(
    config: Config,
    existing: &Path,
    desired: &Path,
    concurrent: bool,
    json: bool,
) -> anyhow::Result<()> {
    let existing = read_existing(existing)?;
    let desired: Vec<DesiredTaskState> = serde_json::from_str(&std::fs::read_to_string(desired)?)?;

    let mut options = config.mirror;
    if concurrent {
        options.mode = ExecutionMode::Concurrent;
    }
    let service = MemoryService::with_tasks(options.date_order_error_code, existing.clone());
    let tm = TaskMirror::new(service, options);
    let report = tm.mirror(existing, &desired, &StderrProgress).await?;
    let calls = tm.service().calls();

    if json {
        let out = serde_json::json!({ "calls": calls, "report": report });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for call in &calls {
            println!("{}", serde_json::to_string(call)?);
        }
        print_report(&report);
    }
    Ok(())
}

fn read_existing(path: &Path) -> anyhow::Result<Vec<ExistingTask>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn parse_date(s: Option<&str>) -> anyhow::Result<Option<chrono::NaiveDate>> {
    s.map(|s| {
        chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("invalid date {s:?}: {e}"))
    })
    .transpose()
}

fn print_report(report: &MirrorReport) {
    println!("Mirror:");
    println!("  Deleted:   {}", report.deleted);
    println!("  Created:   {}", report.created);
    println!("  Updated:   {}", report.updated);
    println!("  Unchanged: {}", report.unchanged);
    println!("  Calls:     {}", report.calls);
    if report.date_retries > 0 {
        println!("  Date order retries: {}", report.date_retries);
    }
}
