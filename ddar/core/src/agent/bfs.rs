//! Breadth-first reference agent

use super::{Action, Agent, Engine, Feedback, RunStatus};

/// Matches every rule, then applies the buffer oldest first
///
/// Each pass of the engine is one level of the breadth-first search over
/// derivations, so a goal is reached in the fewest passes.
#[derive(Debug, Clone, Default)]
pub struct BreadthFirstAgent {
    added: usize,
    rejected: usize,
}

impl BreadthFirstAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements registered by the actions this agent chose
    pub fn added(&self) -> usize {
        self.added
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

impl Agent for BreadthFirstAgent {
    fn name(&self) -> &str {
        "bfs"
    }

    fn act(&mut self, engine: &Engine) -> Action {
        match engine.status() {
            RunStatus::Matching(rule) => Action::MatchTheorem(rule),
            RunStatus::Applying(_) => match engine.pending().next() {
                Some(candidate) => Action::ApplyDependency(candidate.clone()),
                None => Action::DeriveAlgebra,
            },
            RunStatus::Saturated | RunStatus::GoalFound | RunStatus::Stopped => Action::Stop,
        }
    }

    fn observe(&mut self, feedback: &Feedback) {
        self.added += feedback.added.len();
        self.rejected += feedback.rejected;
    }
}
