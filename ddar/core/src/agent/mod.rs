//! Run loop: the action/feedback protocol between a strategy and the engine
//!
//! An [`Agent`] decides what to do next; the [`Engine`] performs one action
//! at a time against the proof state and reports a [`Feedback`]. The
//! [`run`] driver alternates the two under a step and time budget.

mod bfs;
mod driver;
mod protocol;
mod registry;

pub use bfs::BreadthFirstAgent;
pub use driver::{run, solve, RunOutcome};
pub use protocol::Engine;
pub use registry::{AgentFactory, AgentRegistry};

use crate::ir::{PointId, StatementId};
use crate::rules::Candidate;
use serde::{Deserialize, Serialize};

/// A request from an agent to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Match one rule (by index) and buffer its candidate conclusions
    MatchTheorem(usize),

    /// Apply one rule under an explicit variable mapping
    ApplyTheorem { rule: usize, mapping: Vec<PointId> },

    /// Apply a candidate, usually one taken from the buffer
    ApplyDependency(Candidate),

    /// Register pending closures of the algebraic tables
    DeriveAlgebra,

    Stop,
}

/// Where the run stands after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    /// Rule at this index has not been matched in the current pass
    Matching(usize),

    /// Every rule is matched; this many candidates wait in the buffer
    Applying(usize),

    /// Fixpoint reached without proving the goals
    Saturated,

    GoalFound,

    Stopped,
}

impl RunStatus {
    /// No further action can change the outcome
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Saturated | RunStatus::GoalFound | RunStatus::Stopped)
    }
}

/// What the engine reports back after an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub status: RunStatus,

    /// Candidates produced by a match
    pub candidates: Vec<Candidate>,

    /// Statements registered by the action, closures included
    pub added: Vec<StatementId>,

    /// Candidates dropped as numerically false, unprovable or contradictory
    pub rejected: usize,

    pub goals_found: bool,
}

impl Feedback {
    pub(crate) fn new(status: RunStatus) -> Self {
        Self {
            status,
            candidates: Vec::new(),
            added: Vec::new(),
            rejected: 0,
            goals_found: false,
        }
    }
}

/// A strategy choosing the next action
pub trait Agent {
    /// Name under which the agent is registered
    fn name(&self) -> &str;

    /// Next action given the current engine state
    fn act(&mut self, engine: &Engine) -> Action;

    /// Feedback from the action just performed
    fn observe(&mut self, _feedback: &Feedback) {}
}
