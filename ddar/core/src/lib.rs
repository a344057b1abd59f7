//! DDAR Core
//!
//! Deductive geometry prover: forward chaining over a rule library (DD)
//! combined with angle and ratio chasing in algebraic tables (AR), checked
//! at every step against the numeric coordinates of the construction.

pub mod agent;  // Action/feedback protocol, agents and the driver loop
pub mod ar;     // Algebraic tables (angle and ratio chasing)
pub mod config; // Engine configuration and run budgets
pub mod engine; // Proof state: adding, checking and enumerating statements
pub mod error;
pub mod graph;  // Symbol graph (line and circle classes)
pub mod ir;     // Intermediate representation (symbols, coords, statements, dependencies, proofs)
pub mod loader; // Problem loader (JSON constructions and goals)
pub mod rules;  // Deduction rules and the theorem matcher

pub use agent::{run, solve, Action, Agent, AgentRegistry, BreadthFirstAgent, Engine, Feedback, RunOutcome, RunStatus};
pub use config::{EngineConfig, RunBudget};
pub use engine::ProofState;
pub use error::{EngineError, EngineResult};
pub use ir::*;
pub use loader::{load_problem, load_problems, Clause, ConstructionStep, LoadError, LoadResult, PointSpec, Problem};
pub use rules::{default_rules, Candidate, Rule};
