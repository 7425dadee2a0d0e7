//! strata CLI - ground lifted planning tasks from the command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Write;
use strata_core::engine::EngineConfig;
use strata_core::planning::{
    format_action, ground_task_report, write_plan, HAdd, HFf, HMax, Heuristic, LiftedTask,
    SuccessorGenerator,
};
use strata_core::TaskInput;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Lifted planning grounder and relaxation heuristics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Worker threads for rule enumeration
    #[arg(short, long, global = true, default_value = "1")]
    threads: usize,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum HeuristicKind {
    Max,
    Add,
    Ff,
}

#[derive(Subcommand)]
enum Commands {
    /// Ground a task and report reachability counts
    Ground {
        /// Task file (JSON)
        task: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Evaluate a heuristic at the initial state
    Heuristic {
        /// Task file (JSON)
        task: String,

        /// Which heuristic
        #[arg(short, long, value_enum, default_value = "ff")]
        kind: HeuristicKind,

        /// Write the relaxed plan (ff only) to this file
        #[arg(long)]
        plan_out: Option<String>,
    },

    /// List the applicable actions of the initial state
    Successors {
        /// Task file (JSON)
        task: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("strata_core=debug")
            .init();
    }

    let config = EngineConfig {
        num_threads: cli.threads.max(1),
    };

    match cli.command {
        Commands::Ground { task, format } => ground_command(&task, config, format),
        Commands::Heuristic {
            task,
            kind,
            plan_out,
        } => heuristic_command(&task, config, kind, plan_out),
        Commands::Successors { task } => successors_command(&task, config),
    }
}

fn load_task(path: &str, config: EngineConfig) -> Result<LiftedTask> {
    let text = fs::read_to_string(path).with_context(|| format!("reading task file {path}"))?;
    let input: TaskInput =
        serde_json::from_str(&text).with_context(|| format!("parsing task file {path}"))?;
    LiftedTask::new(input, config).context("translating task")
}

fn ground_command(path: &str, config: EngineConfig, format: Format) -> Result<()> {
    let mut task = load_task(path, config)?;
    let report = ground_task_report(&mut task).context("grounding task")?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => {
            println!("objects:        {}", report.num_objects);
            println!("action schemas: {}", report.num_action_schemas);
            println!("axioms:         {}", report.num_axioms);
            println!("ground actions: {}", report.num_ground_actions);
            println!("fluent atoms:   {}", report.num_fluent_atoms);
            println!("derived atoms:  {}", report.num_derived_atoms);
        }
    }
    Ok(())
}

fn heuristic_command(
    path: &str,
    config: EngineConfig,
    kind: HeuristicKind,
    plan_out: Option<String>,
) -> Result<()> {
    let mut task = load_task(path, config)?;
    let init = task.init_state();

    let value = match kind {
        HeuristicKind::Max => {
            let mut h = HMax::new(&task)?;
            h.evaluate(&mut task, &init)
        }
        HeuristicKind::Add => {
            let mut h = HAdd::new(&task)?;
            h.evaluate(&mut task, &init)
        }
        HeuristicKind::Ff => {
            let mut h = HFf::new(&task)?;
            let value = h.evaluate(&mut task, &init);
            if let Some(out) = plan_out {
                let mut actions: Vec<_> = h.relaxed_plan().iter().copied().collect();
                actions.sort_unstable();
                let mut file =
                    fs::File::create(&out).with_context(|| format!("creating plan file {out}"))?;
                write_plan(&mut file, &task, &actions).context("writing relaxed plan")?;
                file.flush()?;
            }
            value
        }
    };

    if value.is_infinite() {
        println!("dead end");
    } else {
        println!("{value}");
    }
    Ok(())
}

fn successors_command(path: &str, config: EngineConfig) -> Result<()> {
    let mut task = load_task(path, config)?;
    let init = task.init_state();

    let mut generator = SuccessorGenerator::new(&task)?;
    let successors = generator.get_labeled_successor_nodes(&mut task, &init);

    let mut out = std::io::stdout().lock();
    for (action, successor) in &successors {
        writeln!(
            out,
            "{}  ; -> {} atoms",
            format_action(&task, *action),
            successor.num_atoms()
        )?;
    }
    writeln!(out, "; {} applicable actions", successors.len())?;
    Ok(())
}
