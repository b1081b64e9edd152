use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use cutflow::backend::{Action, Segment};
use cutflow::config::{BackendKind, Config};
use cutflow::executor::Executor;
use cutflow::planner::{KeywordPlanner, Planner};
use cutflow::report::{ReportStore, RunReport};
use cutflow::task::{Plan, Targets, TaskSpec};
use cutflow::verify;

#[derive(Debug, Parser)]
#[command(name = "cutflow", about = "Plan, run and verify video edits from a plain-language goal")]
struct Cli {
    /// Config file (default: ./cutflow.json, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Plan, execute and verify
    Run(RunArgs),
    /// Print the plan for a goal without executing it
    Plan(TaskArgs),
    /// List the actions a backend can run
    Actions {
        #[arg(long, value_enum)]
        backend: Option<BackendKind>,
    },
}

#[derive(Debug, Args)]
struct TaskArgs {
    /// Input video file
    #[arg(long)]
    input: PathBuf,
    /// Natural-language goal, e.g. "cold cinematic look with slow zoom"
    #[arg(long)]
    goal: String,
    /// Time range, e.g. 00:00:00-00:00:10
    #[arg(long)]
    segment: Option<String>,
    /// Background music for ducking
    #[arg(long)]
    music: Option<PathBuf>,
    /// LUT file for log footage
    #[arg(long)]
    lut: Option<PathBuf>,
    /// Preview quality: low, medium or high
    #[arg(long)]
    quality: Option<String>,
    /// Allow steps to write over the input file
    #[arg(long)]
    allow_overwrite: bool,
}

impl TaskArgs {
    fn to_task(&self) -> TaskSpec {
        let mut targets = Targets::new(&self.input);
        targets.segment = self.segment.clone();
        targets.music = self.music.clone();
        targets.lut = self.lut.clone();

        let mut task = TaskSpec::new(&self.goal, targets);
        task.constraints.non_destructive = !self.allow_overwrite;
        task.prefs.preview_quality = self.quality.clone();
        task
    }
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    task: TaskArgs,
    /// Output directory for step artifacts
    #[arg(long)]
    out_dir: Option<PathBuf>,
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,
    /// Per-step time limit in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Skip writing report.json
    #[arg(long)]
    no_report: bool,
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_plan(plan: &Plan) -> Result<()> {
    let json = serde_json::to_string_pretty(plan).context("Failed to serialize plan")?;
    println!("{}", json);
    Ok(())
}

fn run(args: RunArgs, mut config: Config) -> Result<ExitCode> {
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(out_dir) = args.out_dir {
        config.out_dir = out_dir;
    }
    if let Some(secs) = args.timeout_secs {
        config.ffmpeg.timeout_secs = secs;
    }
    config.validate().context("Invalid configuration")?;

    let task = args.task.to_task();
    let segment = task
        .targets
        .segment
        .as_deref()
        .map(str::parse::<Segment>)
        .transpose()
        .context("Invalid --segment")?;

    println!(">> Planning...");
    let plan = KeywordPlanner.plan(&task);
    print_plan(&plan)?;

    println!("\n>> Executing...");
    let backend = config.build_backend();
    let executor = Executor::new(backend.as_ref(), &config.out_dir)?
        .with_segment(segment)
        .non_destructive(task.constraints.non_destructive);
    let results = executor.execute(&plan, &task.targets.input);

    println!("\n>> Verifying outputs...");
    let verification = verify::verify(&results);
    if verification.ok {
        println!("All steps verified successfully");
    } else {
        println!("Issues detected:");
        for issue in &verification.issues {
            println!("  - {}: {}", issue.step_id, issue.message);
        }
    }

    println!("\nResults:");
    for r in &results {
        let file = r
            .artifact()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match r.error() {
            Some(err) => println!("{}: {} {} ({})", r.step_id, r.status().as_str(), r.action, err),
            None => println!("{}: {} {} -> {}", r.step_id, r.status().as_str(), r.action, file),
        }
    }

    let ok = verification.ok;
    let report = RunReport::new(backend.name(), task, plan, results, verification);
    info!(
        run_id = %report.id,
        succeeded = report.succeeded(),
        total = report.results.len(),
        "run finished"
    );
    if !args.no_report {
        let path = ReportStore::new(executor.out_dir()).save(&report)?;
        println!("\nReport: {}", path.display());
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run(args) => run(args, config),
        Command::Plan(args) => {
            print_plan(&KeywordPlanner.plan(&args.to_task()))?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Actions { backend } => {
            let mut config = config;
            if let Some(kind) = backend {
                config.backend = kind;
            }
            let backend = config.build_backend();
            println!("Backend: {}", backend.name());
            for action in Action::ALL {
                let mark = if backend.supports(action) { "x" } else { " " };
                println!("  [{}] {:<18} -> step_NN_{}.mp4", mark, action.as_str(), action.label());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
