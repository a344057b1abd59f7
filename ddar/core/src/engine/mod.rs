//! Proof state: symbol graph, algebraic tables and dependency graph
//!
//! The state is the single owner of everything the prover knows. Statements
//! enter through [`ProofState::add`], which filters them numerically, records
//! their justification and propagates their structural and algebraic effects.
//! Queries go through [`ProofState::holds`] (a fast yes/no) and
//! [`ProofState::justify`] (the statements a derivation rests on).

mod adder;
mod checker;
mod enumerate;

use crate::ar::{Angle, Ratio, Table};
use crate::error::{EngineError, EngineResult};
use crate::graph::SymbolGraph;
use crate::ir::{
    CoordinateStore, DependencyGraph, LineId, Point2D, PointId, Predicate, ProofTrace, Segment,
    Statement, StatementId, SymbolTable, Tolerance,
};
use num_rational::Rational64;

/// Everything known about one construction
#[derive(Debug, Clone)]
pub struct ProofState {
    symbols: SymbolTable,
    graph: SymbolGraph,
    angles: Table<LineId, Angle>,
    ratios: Table<Segment, Ratio>,
    deps: DependencyGraph,
    tolerance: Tolerance,
}

impl ProofState {
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            symbols: SymbolTable::new(),
            graph: SymbolGraph::new(tolerance),
            angles: Table::new("angle"),
            ratios: Table::new("ratio"),
            deps: DependencyGraph::new(),
            tolerance,
        }
    }

    /// Introduce a named point at the given coordinates
    pub fn add_point(&mut self, name: &str, at: Point2D) -> PointId {
        let id = self.symbols.get_or_intern_point(name);
        self.graph.add_point(id, at);
        id
    }

    pub fn point(&self, name: &str) -> EngineResult<PointId> {
        self.symbols
            .point_id(name)
            .ok_or_else(|| EngineError::UnknownPoint(name.to_string()))
    }

    /// Build a statement from point labels
    pub fn statement(
        &self,
        predicate: Predicate,
        names: &[&str],
        value: Option<Rational64>,
    ) -> EngineResult<Statement> {
        let args = names
            .iter()
            .map(|n| self.point(n))
            .collect::<EngineResult<Vec<_>>>()?;
        Statement::from_parts(predicate, args, value)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn graph(&self) -> &SymbolGraph {
        &self.graph
    }

    pub fn deps(&self) -> &DependencyGraph {
        &self.deps
    }

    pub fn coords(&self) -> &CoordinateStore {
        self.graph.coords()
    }

    pub fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    pub fn num_points(&self) -> usize {
        self.symbols.num_points()
    }

    pub fn points(&self) -> Vec<PointId> {
        self.symbols.points().collect()
    }

    pub fn render(&self, statement: &Statement) -> String {
        statement.render(&self.symbols)
    }

    /// Every registered statement with its justification
    pub fn export(&self) -> ProofTrace {
        ProofTrace::export(&self.deps, &self.symbols)
    }

    /// Proof of one registered statement
    pub fn trace_back(&self, goal: StatementId) -> crate::ir::ProofResult<ProofTrace> {
        ProofTrace::trace_back(&self.deps, &self.symbols, goal)
    }

    /// Line class through two points with the statements placing them on it
    fn line(&self, a: PointId, b: PointId) -> Option<(LineId, Vec<StatementId>)> {
        self.graph.line_through(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Reason;

    /// Unit square corners plus a third row: a b / c d / e f
    fn ladder() -> ProofState {
        let mut state = ProofState::new(Tolerance::default());
        for (name, x, y) in [
            ("a", 0.0, 0.0),
            ("b", 1.0, 0.0),
            ("c", 0.0, 1.0),
            ("d", 1.0, 1.0),
            ("e", 0.0, 2.0),
            ("f", 1.0, 2.0),
        ] {
            state.add_point(name, Point2D::new(x, y));
        }
        state
    }

    fn premise(state: &mut ProofState, predicate: Predicate, names: &[&str]) -> StatementId {
        let statement = state.statement(predicate, names, None).unwrap();
        state.add(statement, Reason::Premise, vec![]).unwrap()[0]
    }

    #[test]
    fn test_parallel_closure_is_registered() {
        let mut state = ladder();
        let p0 = premise(&mut state, Predicate::Para, &["a", "b", "c", "d"]);
        let second = state.statement(Predicate::Para, &["c", "d", "e", "f"], None).unwrap();
        let p1 = state.add(second, Reason::Premise, vec![]).unwrap();
        assert_eq!(p1.len(), 2, "premise plus one closed relation");

        let goal = state.statement(Predicate::Para, &["f", "e", "a", "b"], None).unwrap();
        let id = state.deps().get(&goal).unwrap();
        let dep = state.deps().dependency(id).unwrap();
        assert_eq!(dep.reason, Reason::AngleChase);
        assert_eq!(dep.why, vec![p0, p1[0]]);
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut state = ladder();
        premise(&mut state, Predicate::Perp, &["a", "b", "a", "c"]);
        let before = state.deps().len();

        let again = state.statement(Predicate::Perp, &["c", "a", "b", "a"], None).unwrap();
        assert!(state.add(again, Reason::Premise, vec![]).unwrap().is_empty());
        assert_eq!(state.deps().len(), before);
    }

    #[test]
    fn test_numeric_guard_rejects_false_statement() {
        let mut state = ladder();
        let wrong = state.statement(Predicate::Perp, &["a", "b", "c", "d"], None).unwrap();
        let err = state.add(wrong, Reason::Rule("bogus".into()), vec![]).unwrap_err();
        assert!(matches!(err, EngineError::NumericContradiction { .. }));
        assert!(state.deps().is_empty());
    }

    #[test]
    fn test_failed_add_leaves_no_trace() {
        let mut state = ProofState::new(Tolerance::default());
        state.add_point("a", Point2D::new(0.0, 0.0));
        state.add_point("b", Point2D::new(2.0, 0.0));
        state.add_point("m", Point2D::new(1.0, 0.0));
        // within tolerance of 1/2, but not equal to it
        let near_half = Rational64::new(49_999_999, 99_999_999);
        let rconst = state.statement(Predicate::RConst, &["m", "b", "a", "b"], Some(near_half)).unwrap();
        state.add(rconst, Reason::Premise, vec![]).unwrap();
        let before = state.deps().len();

        let midp = state.statement(Predicate::Midp, &["m", "a", "b"], None).unwrap();
        let err = state.add(midp.clone(), Reason::Rule("midpoint".into()), vec![]).unwrap_err();
        assert!(matches!(err, EngineError::AlgebraicContradiction { table: "ratio", .. }));

        assert!(!state.deps().contains(&midp));
        assert_eq!(state.deps().len(), before);
        let coll = state.statement(Predicate::Coll, &["a", "b", "m"], None).unwrap();
        assert!(!state.holds(&coll), "line merge rolled back");
        let [a, b, m] = ["a", "b", "m"].map(|n| state.point(n).unwrap());
        assert_eq!(state.ratio_between(m, a, m, b), None, "ratio edge rolled back");
        assert_eq!(state.ratio_between(m, b, a, b), Some(near_half));
    }

    #[test]
    fn test_unregistered_justification_is_rejected() {
        let mut state = ladder();
        let para = state.statement(Predicate::Para, &["a", "b", "c", "d"], None).unwrap();
        let err = state.add(para.clone(), Reason::Rule("bogus".into()), vec![StatementId(7)]).unwrap_err();
        assert_eq!(err, EngineError::DanglingJustification(StatementId(7)));
        assert!(!state.holds(&para));
    }

    #[test]
    fn test_collinearity_then_ncoll_is_inconsistent() {
        let mut state = ProofState::new(Tolerance::default());
        state.add_point("a", Point2D::new(0.0, 0.0));
        state.add_point("b", Point2D::new(1.0, 1.0));
        state.add_point("c", Point2D::new(2.0, 2.0));
        premise(&mut state, Predicate::Coll, &["a", "b", "c"]);

        let ncoll = state.statement(Predicate::Ncoll, &["c", "b", "a"], None).unwrap();
        let err = state.add(ncoll, Reason::Premise, vec![]).unwrap_err();
        assert!(err.is_contradiction());
    }

    #[test]
    fn test_holds_and_justify_through_tables() {
        let mut state = ladder();
        let p0 = premise(&mut state, Predicate::Perp, &["a", "b", "a", "c"]);
        let p1 = premise(&mut state, Predicate::Perp, &["b", "d", "a", "b"]);

        let eq = state
            .statement(Predicate::EqAngle, &["a", "b", "a", "c", "a", "b", "b", "d"], None)
            .unwrap();
        assert!(state.holds(&eq));
        let (reason, why) = state.justify(&eq).unwrap();
        assert_eq!(reason, Reason::AngleChase);
        assert_eq!(why, vec![p0, p1]);

        let para = state.statement(Predicate::Para, &["a", "c", "b", "d"], None).unwrap();
        assert!(state.holds(&para));
        let [a, b, c, d] = ["a", "b", "c", "d"].map(|n| state.point(n).unwrap());
        assert_eq!(state.angle_between(a, c, b, d), Some(Rational64::from_integer(0)));
    }

    #[test]
    fn test_justify_premise_registers_derivation() {
        let mut state = ladder();
        premise(&mut state, Predicate::Perp, &["a", "b", "a", "c"]);
        premise(&mut state, Predicate::Perp, &["b", "d", "a", "b"]);

        let eq = state
            .statement(Predicate::EqAngle, &["a", "c", "a", "b", "b", "d", "a", "b"], None)
            .unwrap();
        assert!(!state.deps().contains(&eq));
        let ids = state.justify_premise(&eq).unwrap().unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(state.deps().get(&eq), Some(ids[0]));

        let missing = state.statement(Predicate::Cong, &["a", "b", "c", "d"], None).unwrap();
        assert_eq!(state.justify_premise(&missing).unwrap(), None);
    }

    #[test]
    fn test_midpoint_definition() {
        let mut state = ProofState::new(Tolerance::default());
        state.add_point("a", Point2D::new(0.0, 0.0));
        state.add_point("b", Point2D::new(4.0, 2.0));
        state.add_point("m", Point2D::new(2.0, 1.0));
        premise(&mut state, Predicate::Midp, &["m", "a", "b"]);

        let cong = state.statement(Predicate::Cong, &["m", "a", "m", "b"], None).unwrap();
        assert!(state.holds(&cong));
        let coll = state.statement(Predicate::Coll, &["a", "b", "m"], None).unwrap();
        assert!(state.holds(&coll));

        let [a, b, m] = ["a", "b", "m"].map(|n| state.point(n).unwrap());
        assert_eq!(state.ratio_between(m, a, a, b), Some(Rational64::new(1, 2)));
    }

    #[test]
    fn test_enumerate_reads_line_classes_and_tables() {
        let mut state = ladder();
        premise(&mut state, Predicate::Para, &["a", "b", "c", "d"]);
        premise(&mut state, Predicate::Para, &["c", "d", "e", "f"]);
        premise(&mut state, Predicate::Coll, &["a", "c", "e"]);

        let [a, b, c, e, f] = ["a", "b", "c", "e", "f"].map(|n| state.point(n).unwrap());
        let colls = state.enumerate(Predicate::Coll).unwrap();
        assert_eq!(colls, vec![vec![a, c, e]]);

        let paras = state.enumerate(Predicate::Para).unwrap();
        assert!(paras.contains(&vec![a, b, e, f]) || paras.contains(&vec![e, f, a, b]));
        assert!(paras.iter().all(|t| t.len() == 4));
        assert!(!paras.iter().any(|t| t.contains(&c) && t.contains(&e) && t.contains(&a)));

        let angles = state.enumerate(Predicate::EqAngle).unwrap();
        assert!(angles.iter().all(|t| t.len() == 8));
        let across = [vec![a, b, a, c, e, f, a, c], vec![e, f, a, c, a, b, a, c]];
        assert!(across.iter().any(|t| angles.contains(t)));
        assert!(!angles.contains(&vec![a, b, e, f, a, b, a, c]));
    }

    #[test]
    fn test_enumerate_equal_angles_from_perpendiculars() {
        let mut state = ladder();
        premise(&mut state, Predicate::Perp, &["a", "b", "a", "c"]);
        premise(&mut state, Predicate::Perp, &["b", "d", "a", "b"]);

        let [a, b, c, d] = ["a", "b", "c", "d"].map(|n| state.point(n).unwrap());
        let angles = state.enumerate(Predicate::EqAngle).unwrap();
        let right = [vec![a, c, a, b, b, d, a, b], vec![b, d, a, b, a, c, a, b]];
        assert!(right.iter().any(|t| angles.contains(t)));
        // no line carries a third point
        assert!(!angles.iter().any(|t| t[0..2] == t[4..6] && t[2..4] == t[6..8]));
    }

    #[test]
    fn test_export_lists_every_registration() {
        let mut state = ladder();
        premise(&mut state, Predicate::Para, &["a", "b", "c", "d"]);
        premise(&mut state, Predicate::Para, &["c", "d", "e", "f"]);

        let trace = state.export();
        assert_eq!(trace.len(), state.deps().len());
        assert!(trace.validate().is_ok());
        assert_eq!(trace.records[0].statement, "para a b c d");
    }
}
