//! DDAR command-line solver
//!
//! Loads a problem file, runs an agent until the goals are proved or the
//! engine saturates, and prints the proof.

use anyhow::{Context, Result};
use clap::Parser;
use ddar_core::{
    load_problem, solve, AgentRegistry, ConstructionStep, Engine, ProofTrace, RunBudget, RunOutcome,
};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ddar-solve")]
#[command(about = "Prove geometry goals by deduction and algebraic chasing", long_about = None)]
struct Args {
    /// Input problem file (JSON)
    problem: PathBuf,

    /// Agent driving the run
    #[arg(long, default_value = "bfs")]
    agent: String,

    /// Maximum number of engine actions
    #[arg(long)]
    max_steps: Option<usize>,

    /// Wall-clock limit in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Skip a rule by name (repeatable)
    #[arg(long = "disable", value_name = "RULE")]
    disabled: Vec<String>,

    /// Auxiliary construction steps (JSON list) added if the first run saturates
    #[arg(long, value_name = "FILE")]
    aux: Option<PathBuf>,

    /// Write the proof trace as JSON to this file
    #[arg(long, value_name = "FILE")]
    proof: Option<PathBuf>,

    /// Print every registered statement instead of the proof only
    #[arg(long)]
    export: bool,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut problem = load_problem(&args.problem)
        .with_context(|| format!("loading {}", args.problem.display()))?;
    problem
        .config
        .get_or_insert_with(Default::default)
        .disabled_rules
        .extend(args.disabled.iter().cloned());

    let mut budget = RunBudget::default();
    if let Some(max_steps) = args.max_steps {
        budget.max_steps = max_steps;
    }
    budget.timeout_ms = args.timeout_ms;

    let registry = AgentRegistry::with_defaults();
    let mut engine = Engine::for_problem(&problem)?;
    engine.init(&problem.goals).context("seeding the construction")?;

    let mut outcome = solve(&mut engine, &registry, &args.agent, &budget)?;
    report(&problem.name, &outcome);

    if let (false, Some(path)) = (outcome.solved, &args.aux) {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let steps: Vec<ConstructionStep> = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        info!(steps = steps.len(), file = %path.display(), "retrying with auxiliary construction");
        engine.augment(steps).context("adding auxiliary points")?;
        outcome = solve(&mut engine, &registry, &args.agent, &budget)?;
        report(&format!("{} (augmented)", problem.name), &outcome);
    }

    let trace = if args.export {
        Some(engine.export())
    } else {
        outcome.proof.clone()
    };
    if let Some(trace) = &trace {
        print_trace(trace);
    }
    if let (Some(path), Some(proof)) = (&args.proof, &outcome.proof) {
        fs::write(path, proof.to_json()?).with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(if outcome.solved { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn report(name: &str, outcome: &RunOutcome) {
    let verdict = if outcome.solved {
        "proved"
    } else if outcome.exhausted {
        "budget exhausted"
    } else {
        "not proved"
    };
    println!(
        "{name}: {verdict} ({:?}, {} steps, {:.1?})",
        outcome.status, outcome.steps, outcome.elapsed
    );
}

fn print_trace(trace: &ProofTrace) {
    for record in &trace.records {
        let why: Vec<String> = record.why.iter().map(|id| id.to_string()).collect();
        if why.is_empty() {
            println!("{:>4}  {}  [{}]", record.id, record.statement, record.reason);
        } else {
            println!(
                "{:>4}  {}  [{}] <- {}",
                record.id,
                record.statement,
                record.reason,
                why.join(", ")
            );
        }
    }
}
