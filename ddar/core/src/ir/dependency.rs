//! Dependency graph: every registered statement with its justification
//!
//! Registration is first-writer-wins. A statement gets exactly one
//! dependency, and that dependency may only cite statements registered
//! before it, so the graph is acyclic by construction.

use super::statement::{Predicate, Statement};
use crate::error::{EngineError, EngineResult};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a registered statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StatementId(pub u32);

impl StatementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a statement holds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Reason {
    /// Given by the construction
    Premise,
    /// Checked against coordinates only (ncoll, npara, diff, sameside)
    Numerical,
    /// Conclusion of a named deduction rule
    Rule(String),
    /// Read off the angle table
    AngleChase,
    /// Read off the ratio table
    RatioChase,
    /// Read off line or circle membership
    Incidence,
    /// Unfolding of a composite predicate such as `midp` or `circle`
    Definition,
}

impl Reason {
    /// Rule name for rule-derived statements
    pub fn rule(&self) -> Option<&str> {
        match self {
            Reason::Rule(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Premise => f.write_str("premise"),
            Reason::Numerical => f.write_str("numerical check"),
            Reason::Rule(name) => f.write_str(name),
            Reason::AngleChase => f.write_str("angle chase"),
            Reason::RatioChase => f.write_str("ratio chase"),
            Reason::Incidence => f.write_str("incidence"),
            Reason::Definition => f.write_str("definition"),
        }
    }
}

/// Justification record of one statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub statement: StatementId,
    pub reason: Reason,
    pub why: Vec<StatementId>,
}

/// Outcome of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First time the statement was seen
    New(StatementId),
    /// Already registered; the earlier justification is kept
    Existing(StatementId),
}

impl Registration {
    pub fn id(self) -> StatementId {
        match self {
            Registration::New(id) | Registration::Existing(id) => id,
        }
    }

    pub fn is_new(self) -> bool {
        matches!(self, Registration::New(_))
    }
}

/// Arena of registered statements indexed by predicate
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    statements: Vec<Statement>,
    dependencies: Vec<Dependency>,
    index: FxHashMap<Statement, StatementId>,
    by_predicate: FxHashMap<Predicate, Vec<StatementId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a statement unless it is already present
    ///
    /// Every id in `why` must already be registered.
    pub fn register(
        &mut self,
        statement: Statement,
        reason: Reason,
        mut why: Vec<StatementId>,
    ) -> EngineResult<Registration> {
        if let Some(&id) = self.index.get(&statement) {
            return Ok(Registration::Existing(id));
        }
        if let Some(&missing) = why.iter().find(|w| w.index() >= self.statements.len()) {
            return Err(EngineError::DanglingJustification(missing));
        }
        why.sort_unstable();
        why.dedup();

        let id = StatementId(self.statements.len() as u32);
        self.by_predicate
            .entry(statement.predicate())
            .or_default()
            .push(id);
        self.index.insert(statement.clone(), id);
        self.statements.push(statement);
        self.dependencies.push(Dependency {
            statement: id,
            reason,
            why,
        });
        Ok(Registration::New(id))
    }

    pub fn get(&self, statement: &Statement) -> Option<StatementId> {
        self.index.get(statement).copied()
    }

    pub fn contains(&self, statement: &Statement) -> bool {
        self.index.contains_key(statement)
    }

    pub fn statement(&self, id: StatementId) -> Option<&Statement> {
        self.statements.get(id.index())
    }

    pub fn dependency(&self, id: StatementId) -> Option<&Dependency> {
        self.dependencies.get(id.index())
    }

    /// Registered statements of one predicate, in registration order
    pub fn of_predicate(&self, predicate: Predicate) -> &[StatementId] {
        self.by_predicate
            .get(&predicate)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All dependencies in registration order
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Ancestors of `goal` (inclusive) in dependency order
    pub fn ancestors(&self, goal: StatementId) -> Vec<StatementId> {
        let mut seen = vec![false; self.len()];
        let mut stack = vec![goal];
        while let Some(id) = stack.pop() {
            match seen.get_mut(id.index()) {
                Some(flag) if !*flag => *flag = true,
                _ => continue,
            }
            if let Some(dep) = self.dependency(id) {
                stack.extend(dep.why.iter().copied());
            }
        }
        // Ids grow with registration, so index order is a topological order.
        seen.iter()
            .enumerate()
            .filter(|(_, s)| **s)
            .map(|(i, _)| StatementId(i as u32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PointId;

    fn stmt(p: Predicate, ids: &[u32]) -> Statement {
        Statement::new(p, ids.iter().map(|&i| PointId(i)).collect()).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut graph = DependencyGraph::new();
        let s = stmt(Predicate::Para, &[0, 1, 2, 3]);

        let reg = graph.register(s.clone(), Reason::Premise, vec![]).unwrap();
        assert!(reg.is_new());
        assert_eq!(graph.get(&s), Some(reg.id()));
        assert_eq!(graph.statement(reg.id()), Some(&s));
        assert_eq!(graph.of_predicate(Predicate::Para), &[reg.id()]);
        assert!(graph.of_predicate(Predicate::Perp).is_empty());
    }

    #[test]
    fn test_first_writer_wins() {
        let mut graph = DependencyGraph::new();
        let a = graph
            .register(stmt(Predicate::Coll, &[0, 1, 2]), Reason::Premise, vec![])
            .unwrap()
            .id();
        let s = stmt(Predicate::Para, &[0, 1, 2, 3]);
        let first = graph.register(s.clone(), Reason::AngleChase, vec![a]).unwrap();
        let second = graph
            .register(stmt(Predicate::Para, &[3, 2, 1, 0]), Reason::Premise, vec![])
            .unwrap();

        assert_eq!(second, Registration::Existing(first.id()));
        assert_eq!(graph.dependency(first.id()).map(|d| &d.reason), Some(&Reason::AngleChase));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_dangling_justification_rejected() {
        let mut graph = DependencyGraph::new();
        let err = graph
            .register(stmt(Predicate::Coll, &[0, 1, 2]), Reason::Premise, vec![StatementId(5)])
            .unwrap_err();
        assert_eq!(err, EngineError::DanglingJustification(StatementId(5)));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_ancestors_in_dependency_order() {
        let mut graph = DependencyGraph::new();
        let a = graph.register(stmt(Predicate::Coll, &[0, 1, 2]), Reason::Premise, vec![]).unwrap().id();
        let b = graph.register(stmt(Predicate::Perp, &[0, 1, 3, 4]), Reason::Premise, vec![]).unwrap().id();
        let _unrelated = graph.register(stmt(Predicate::Cong, &[0, 1, 3, 4]), Reason::Premise, vec![]).unwrap().id();
        let c = graph
            .register(stmt(Predicate::Perp, &[0, 2, 3, 4]), Reason::AngleChase, vec![b, a, a])
            .unwrap()
            .id();

        assert_eq!(graph.dependency(c).map(|d| d.why.clone()), Some(vec![a, b]));
        assert_eq!(graph.ancestors(c), vec![a, b, c]);
    }
}
