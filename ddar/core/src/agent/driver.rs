//! Budgeted driver loop

use super::{Agent, AgentRegistry, Engine, RunStatus};
use crate::config::RunBudget;
use crate::error::EngineResult;
use crate::ir::ProofTrace;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of one driver run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Whether every goal was proved
    pub solved: bool,

    /// Engine status when the loop ended
    pub status: RunStatus,

    /// Actions performed
    pub steps: usize,

    pub elapsed: Duration,

    /// The step or time budget ran out first
    pub exhausted: bool,

    /// Proof of the goals (if solved)
    pub proof: Option<ProofTrace>,
}

/// Alternate `agent` and `engine` until the run ends or the budget is spent
///
/// The engine must already be initialized. Budgets are checked between
/// steps, so the proof state is consistent whenever the loop returns.
pub fn run(engine: &mut Engine, agent: &mut dyn Agent, budget: &RunBudget) -> EngineResult<RunOutcome> {
    let start = Instant::now();
    let timeout = budget.timeout();
    let mut steps = 0;
    let mut exhausted = false;
    info!(agent = agent.name(), max_steps = budget.max_steps, "run started");

    while !engine.status().is_terminal() {
        if steps >= budget.max_steps || timeout.is_some_and(|t| start.elapsed() >= t) {
            exhausted = true;
            break;
        }
        let action = agent.act(engine);
        debug!(step = steps, ?action, "act");
        let feedback = engine.act(action)?;
        agent.observe(&feedback);
        steps += 1;
    }

    let status = engine.status();
    let solved = status == RunStatus::GoalFound;
    let outcome = RunOutcome {
        solved,
        status,
        steps,
        elapsed: start.elapsed(),
        exhausted,
        proof: if solved { engine.proof() } else { None },
    };
    info!(
        ?status,
        steps,
        exhausted,
        statements = engine.state().deps().len(),
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "run finished"
    );
    Ok(outcome)
}

/// Run the agent registered as `agent_name`
pub fn solve(
    engine: &mut Engine,
    registry: &AgentRegistry,
    agent_name: &str,
    budget: &RunBudget,
) -> EngineResult<RunOutcome> {
    let mut agent = registry.create(agent_name)?;
    run(engine, agent.as_mut(), budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::BreadthFirstAgent;
    use crate::config::EngineConfig;
    use crate::error::EngineError;
    use crate::loader::{ConstructionStep, PointSpec};
    use crate::rules::default_rules;

    /// Isosceles triangle o a b with the midpoint m of a b
    fn isosceles() -> Engine {
        let step = ConstructionStep::new(
            "isosceles",
            vec![
                PointSpec::new("a", 0.0, 0.0),
                PointSpec::new("b", 4.0, 0.0),
                PointSpec::new("o", 2.0, 3.0),
                PointSpec::new("m", 2.0, 0.0),
            ],
        )
        .premise("cong o a o b")
        .and_then(|s| s.premise("midp m a b"))
        .unwrap();
        Engine::new(vec![step], default_rules().unwrap(), EngineConfig::default())
    }

    #[test]
    fn test_bfs_proves_perpendicular_bisector() {
        let mut engine = isosceles();
        engine.init(&["perp o m a b".parse().unwrap()]).unwrap();

        let mut agent = BreadthFirstAgent::new();
        let outcome = run(&mut engine, &mut agent, &RunBudget::default()).unwrap();
        assert!(outcome.solved);
        assert_eq!(outcome.status, RunStatus::GoalFound);
        assert!(!outcome.exhausted);
        assert!(agent.added() > 0);

        let proof = outcome.proof.unwrap();
        assert!(proof.validate().is_ok());
        // the goal has the largest id among its ancestors
        let last = proof.records.last().unwrap();
        assert_eq!(last.predicate, crate::ir::Predicate::Perp);
        assert!(proof.records.iter().any(|r| r.reason == crate::ir::Reason::Premise));
    }

    #[test]
    fn test_step_budget() {
        let mut engine = isosceles();
        engine.init(&["perp o m a b".parse().unwrap()]).unwrap();
        let budget = RunBudget {
            max_steps: 1,
            timeout_ms: None,
        };
        let outcome = solve(&mut engine, &AgentRegistry::with_defaults(), "bfs", &budget).unwrap();
        assert_eq!(outcome.steps, 1);
        assert!(outcome.exhausted);
        assert!(!outcome.solved);
    }

    #[test]
    fn test_unknown_agent_name() {
        let mut engine = isosceles();
        engine.init(&[]).unwrap();
        let err = solve(&mut engine, &AgentRegistry::new(), "bfs", &RunBudget::default()).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_no_goals_runs_to_saturation() {
        let mut engine = isosceles();
        engine.init(&[]).unwrap();
        let outcome = solve(&mut engine, &AgentRegistry::with_defaults(), "bfs", &RunBudget::default()).unwrap();
        assert_eq!(outcome.status, RunStatus::Saturated);
        assert!(!outcome.solved);
        assert!(outcome.proof.is_none());
    }
}
