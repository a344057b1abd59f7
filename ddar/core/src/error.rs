//! Errors raised while building and deriving the proof state

use crate::ir::StatementId;
use thiserror::Error;

/// Failure of a proof-state operation
///
/// Contradictions carry the rendered statement so they can be reported
/// without access to the symbol table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("numeric contradiction: `{statement}` does not hold at the given coordinates")]
    NumericContradiction { statement: String },

    #[error("algebraic contradiction in the {table} table: {detail}")]
    AlgebraicContradiction { table: &'static str, detail: String },

    #[error("graph inconsistency: {0}")]
    GraphInconsistency(String),

    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    #[error("unknown point `{0}`")]
    UnknownPoint(String),

    #[error("point `{0}` is already defined")]
    DuplicatePoint(String),

    #[error("invalid rule `{name}`: {detail}")]
    InvalidRule { name: String, detail: String },

    #[error("unknown rule #{0}")]
    UnknownRule(usize),

    #[error("justification refers to unregistered statement {0}")]
    DanglingJustification(StatementId),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// Contradictions that make the premises unusable
    pub fn is_contradiction(&self) -> bool {
        matches!(
            self,
            EngineError::NumericContradiction { .. }
                | EngineError::AlgebraicContradiction { .. }
                | EngineError::GraphInconsistency(_)
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
