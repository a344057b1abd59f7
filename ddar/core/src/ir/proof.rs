//! Proof traces and dependency-graph export
//!
//! A trace is a list of dependency records in registration order. The full
//! export contains every registered statement; a trace-back keeps only the
//! ancestors of one goal, which is the proof of that goal.

use super::dependency::{DependencyGraph, Reason, StatementId};
use super::statement::Predicate;
use super::symbols::SymbolTable;
use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Errors that can occur during proof trace operations
#[derive(Error, Debug)]
pub enum ProofError {
    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid proof record: {0}")]
    InvalidRecord(String),

    #[error("Statement not found: {0}")]
    StatementNotFound(StatementId),
}

/// Result type for proof operations
pub type ProofResult<T> = Result<T, ProofError>;

/// One registered statement with its justification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofRecord {
    pub id: StatementId,

    /// Rendered form, e.g. `perp a d b c`
    pub statement: String,

    pub predicate: Predicate,

    /// Point labels in canonical argument order
    pub points: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Rational64>,

    pub reason: Reason,

    /// Statements this one was derived from
    pub why: Vec<StatementId>,
}

/// Ordered list of proof records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProofTrace {
    pub records: Vec<ProofRecord>,

    /// Whether the trace ends in a proved goal
    pub solved: bool,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ProofTrace {
    /// Create a new empty proof trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Records for the given statements, in id order
    pub fn from_graph(graph: &DependencyGraph, symbols: &SymbolTable, ids: &[StatementId]) -> Self {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        let records = ids
            .into_iter()
            .filter_map(|id| {
                let statement = graph.statement(id)?;
                let dependency = graph.dependency(id)?;
                Some(ProofRecord {
                    id,
                    statement: statement.render(symbols),
                    predicate: statement.predicate(),
                    points: statement
                        .args()
                        .iter()
                        .map(|&p| symbols.display_point(p))
                        .collect(),
                    value: statement.value(),
                    reason: dependency.reason.clone(),
                    why: dependency.why.clone(),
                })
            })
            .collect();
        Self {
            records,
            solved: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Export of the whole dependency graph
    pub fn export(graph: &DependencyGraph, symbols: &SymbolTable) -> Self {
        let ids: Vec<StatementId> = (0..graph.len() as u32).map(StatementId).collect();
        Self::from_graph(graph, symbols, &ids)
    }

    /// Minimal sub-trace proving `goal`
    pub fn trace_back(
        graph: &DependencyGraph,
        symbols: &SymbolTable,
        goal: StatementId,
    ) -> ProofResult<Self> {
        if graph.statement(goal).is_none() {
            return Err(ProofError::StatementNotFound(goal));
        }
        let mut trace = Self::from_graph(graph, symbols, &graph.ancestors(goal));
        trace.solved = true;
        Ok(trace)
    }

    /// Get the number of records in the trace
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the trace is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn add_metadata(&mut self, key: &str, value: String) {
        self.metadata.insert(key.to_string(), value);
    }

    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }

    /// Get a record by statement id
    pub fn get(&self, id: StatementId) -> Option<&ProofRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Find the record of a rendered statement
    pub fn find(&self, statement: &str) -> Option<&ProofRecord> {
        self.records.iter().find(|r| r.statement == statement)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> ProofResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serialize to compact JSON string
    pub fn to_json_compact(&self) -> ProofResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> ProofResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check that ids are unique and every record only cites earlier records
    pub fn validate(&self) -> ProofResult<()> {
        let mut seen = HashSet::new();
        for record in &self.records {
            for cited in &record.why {
                if !seen.contains(cited) {
                    return Err(ProofError::InvalidRecord(format!(
                        "{} cites {} which does not precede it",
                        record.id, cited
                    )));
                }
            }
            if !seen.insert(record.id) {
                return Err(ProofError::InvalidRecord(format!(
                    "Duplicate statement ID: {}",
                    record.id
                )));
            }
        }
        Ok(())
    }

    /// Get statistics about the trace
    pub fn statistics(&self) -> ProofStatistics {
        let mut stats = ProofStatistics {
            num_records: self.records.len(),
            num_premises: 0,
            num_derived: 0,
            solved: self.solved,
            rules_used: BTreeMap::new(),
        };

        for record in &self.records {
            match &record.reason {
                Reason::Premise => stats.num_premises += 1,
                reason => {
                    stats.num_derived += 1;
                    *stats.rules_used.entry(reason.to_string()).or_insert(0) += 1;
                }
            }
        }

        stats
    }
}

/// Statistics about a proof trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofStatistics {
    pub num_records: usize,
    pub num_premises: usize,
    pub num_derived: usize,
    pub solved: bool,

    /// Count of derived records per rule or chase kind
    pub rules_used: BTreeMap<String, usize>,
}

impl ProofStatistics {
    /// Get the most frequently used rule
    pub fn most_used_rule(&self) -> Option<(&str, usize)> {
        self.rules_used
            .iter()
            .max_by_key(|(_, count)| *count)
            .map(|(rule, count)| (rule.as_str(), *count))
    }
}
