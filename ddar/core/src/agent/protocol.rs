//! The engine side of the run loop

use super::{Action, Feedback, RunStatus};
use crate::config::EngineConfig;
use crate::engine::ProofState;
use crate::error::{EngineError, EngineResult};
use crate::ir::{ProofTrace, Reason, Statement, StatementId};
use crate::loader::{Clause, ConstructionStep, Problem};
use crate::rules::{Candidate, Rule};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Proof state plus the bookkeeping of a forward-chaining run
///
/// Rules are matched in passes. A pass matches every enabled rule once,
/// buffering candidate conclusions, then applies the buffer. A pass that
/// registers nothing new ends the run as saturated.
pub struct Engine {
    state: ProofState,
    rules: Vec<Rule>,
    config: EngineConfig,
    construction: Vec<ConstructionStep>,
    goals: Vec<Statement>,
    buffer: VecDeque<Candidate>,
    queued: FxHashSet<Statement>,
    matched: Vec<bool>,
    pass_added: usize,
    passes: usize,
    status: RunStatus,
}

impl Engine {
    /// The engine stays idle until [`Engine::init`] seeds it
    pub fn new(construction: Vec<ConstructionStep>, rules: Vec<Rule>, config: EngineConfig) -> Self {
        let matched = rules.iter().map(|r| config.is_disabled(r.name())).collect();
        Self {
            state: ProofState::new(config.tolerance),
            rules,
            config,
            construction,
            goals: Vec::new(),
            buffer: VecDeque::new(),
            queued: FxHashSet::default(),
            matched,
            pass_added: 0,
            passes: 0,
            status: RunStatus::Stopped,
        }
    }

    /// Engine for a loaded problem, with its own rules and configuration
    pub fn for_problem(problem: &Problem) -> EngineResult<Self> {
        let config = problem.config.clone().unwrap_or_default();
        Ok(Self::new(problem.construction.clone(), problem.rules()?, config))
    }

    /// Seed the proof state with the construction and set the goals
    ///
    /// Premises that contradict each other or their coordinates abort
    /// initialization.
    pub fn init(&mut self, goals: &[Clause]) -> EngineResult<Feedback> {
        let before = self.state.deps().len();
        let steps = std::mem::take(&mut self.construction);
        let seeded = steps.iter().try_for_each(|step| self.seed(step));
        self.construction = steps;
        seeded?;

        self.goals = goals
            .iter()
            .map(|g| g.resolve(&self.state))
            .collect::<EngineResult<Vec<_>>>()?;
        for goal in &self.goals {
            if !goal.check_numerical(self.state.coords(), self.state.tolerance()) {
                warn!(goal = %self.state.render(goal), "goal is false at the given coordinates");
            }
        }
        info!(
            points = self.state.num_points(),
            premises = self.state.deps().len(),
            goals = self.goals.len(),
            rules = self.rules.len(),
            "engine initialized"
        );

        self.status = RunStatus::Matching(0);
        self.reset_pass();
        let mut feedback = Feedback::new(self.status);
        feedback.added = self.added_since(before);
        self.refresh(&mut feedback)?;
        Ok(feedback)
    }

    /// Perform one action
    pub fn act(&mut self, action: Action) -> EngineResult<Feedback> {
        let before = self.state.deps().len();
        let mut feedback = Feedback::new(self.status);

        match action {
            Action::MatchTheorem(index) => self.match_theorem(index, &mut feedback)?,
            Action::ApplyTheorem { rule, mapping } => {
                let candidates = self.rule(rule)?.instantiate(&mapping)?;
                debug!(rule = %self.rules[rule].name(), "apply theorem");
                for candidate in &candidates {
                    self.apply(candidate, &mut feedback)?;
                }
            }
            Action::ApplyDependency(candidate) => {
                if let Some(pos) = self.buffer.iter().position(|c| *c == candidate) {
                    self.buffer.remove(pos);
                    self.queued.remove(&candidate.conclusion);
                }
                self.apply(&candidate, &mut feedback)?;
            }
            Action::DeriveAlgebra => {
                self.state.resolve_closures();
            }
            Action::Stop => {
                info!(statements = self.state.deps().len(), "run stopped");
                self.status = RunStatus::Stopped;
            }
        }

        feedback.added = self.added_since(before);
        self.pass_added += feedback.added.len();
        self.refresh(&mut feedback)?;
        Ok(feedback)
    }

    /// Alias of [`Engine::act`]
    pub fn step(&mut self, action: Action) -> EngineResult<Feedback> {
        self.act(action)
    }

    /// Add construction steps to a live engine
    ///
    /// Everything derived so far is kept. Matching restarts from the first
    /// rule since new points open new matches.
    pub fn augment(&mut self, steps: Vec<ConstructionStep>) -> EngineResult<Feedback> {
        let before = self.state.deps().len();
        for step in &steps {
            self.seed(step)?;
        }
        info!(
            steps = steps.len(),
            points = self.state.num_points(),
            "construction augmented"
        );
        self.construction.extend(steps);

        self.buffer.clear();
        self.queued.clear();
        self.reset_pass();
        self.status = RunStatus::Matching(0);
        let mut feedback = Feedback::new(self.status);
        feedback.added = self.added_since(before);
        self.refresh(&mut feedback)?;
        Ok(feedback)
    }

    /// Do all goals follow from what is known?
    pub fn check_goals(&self) -> bool {
        !self.goals.is_empty() && self.goals.iter().all(|g| self.state.holds(g))
    }

    pub fn state(&self) -> &ProofState {
        &self.state
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn construction(&self) -> &[ConstructionStep] {
        &self.construction
    }

    pub fn goals(&self) -> &[Statement] {
        &self.goals
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Completed matching passes
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Candidates waiting to be applied, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &Candidate> + '_ {
        self.buffer.iter()
    }

    /// Every registered statement with its justification
    pub fn export(&self) -> ProofTrace {
        self.state.export()
    }

    /// Proof of all goals, once they are registered
    pub fn proof(&self) -> Option<ProofTrace> {
        if self.goals.is_empty() {
            return None;
        }
        let deps = self.state.deps();
        let mut ids = Vec::new();
        for goal in &self.goals {
            ids.extend(deps.ancestors(deps.get(goal)?));
        }
        let mut trace = ProofTrace::from_graph(deps, self.state.symbols(), &ids);
        trace.solved = true;
        let rendered: Vec<String> = self.goals.iter().map(|g| self.state.render(g)).collect();
        trace.add_metadata("goals", rendered.join("; "));
        Some(trace)
    }

    fn rule(&self, index: usize) -> EngineResult<&Rule> {
        self.rules.get(index).ok_or(EngineError::UnknownRule(index))
    }

    fn seed(&mut self, step: &ConstructionStep) -> EngineResult<()> {
        for point in &step.points {
            if self.state.point(&point.name).is_ok() {
                return Err(EngineError::DuplicatePoint(point.name.clone()));
            }
            self.state.add_point(&point.name, point.coords());
        }
        for clause in &step.premises {
            let statement = clause.resolve(&self.state)?;
            self.state.add(statement, Reason::Premise, Vec::new())?;
        }
        debug!(tag = %step.tag, points = step.points.len(), premises = step.premises.len(), "construction step");
        Ok(())
    }

    fn match_theorem(&mut self, index: usize, feedback: &mut Feedback) -> EngineResult<()> {
        let rule = self.rules.get(index).ok_or(EngineError::UnknownRule(index))?;
        if let Some(flag) = self.matched.get_mut(index) {
            *flag = true;
        }
        if self.config.is_disabled(rule.name()) {
            return Ok(());
        }

        let mut fresh = Vec::new();
        let mut bindings = 0;
        for binding in rule.matches(&self.state).take(self.config.max_matches_per_rule) {
            bindings += 1;
            for candidate in rule.instantiate(&binding)? {
                let conclusion = &candidate.conclusion;
                if conclusion.is_trivial()
                    || conclusion.is_degenerate()
                    || self.queued.contains(conclusion)
                    || self.state.holds(conclusion)
                {
                    continue;
                }
                if !conclusion.check_numerical(self.state.coords(), self.state.tolerance()) {
                    debug!(
                        rule = %rule.name(),
                        conclusion = %self.state.render(conclusion),
                        "conclusion is false at the given coordinates"
                    );
                    feedback.rejected += 1;
                    continue;
                }
                self.queued.insert(conclusion.clone());
                fresh.push(candidate);
            }
        }
        debug!(rule = %rule.name(), bindings, candidates = fresh.len(), "match theorem");

        self.buffer.extend(fresh.iter().cloned());
        feedback.candidates = fresh;
        Ok(())
    }

    /// Justify the premises of `candidate` and register its conclusion
    fn apply(&mut self, candidate: &Candidate, feedback: &mut Feedback) -> EngineResult<()> {
        let mut why: Vec<StatementId> = Vec::new();
        for premise in &candidate.premises {
            match self.state.justify_premise(premise) {
                Ok(Some(ids)) => why.extend(ids),
                Ok(None) => {
                    debug!(
                        rule = %candidate.rule,
                        premise = %self.state.render(premise),
                        "premise does not hold"
                    );
                    feedback.rejected += 1;
                    return Ok(());
                }
                Err(err) => return self.discard(candidate, err, feedback),
            }
        }
        why.sort_unstable();
        why.dedup();

        let reason = Reason::Rule(candidate.rule.clone());
        match self.state.add(candidate.conclusion.clone(), reason, why) {
            Ok(_) => Ok(()),
            Err(err) => self.discard(candidate, err, feedback),
        }
    }

    /// Drop a contradictory derived candidate; anything else is fatal
    fn discard(&self, candidate: &Candidate, err: EngineError, feedback: &mut Feedback) -> EngineResult<()> {
        match err {
            EngineError::NumericContradiction { .. } | EngineError::AlgebraicContradiction { .. } => {
                warn!(
                    rule = %candidate.rule,
                    conclusion = %self.state.render(&candidate.conclusion),
                    error = %err,
                    "candidate rejected"
                );
                feedback.rejected += 1;
                Ok(())
            }
            other => Err(other),
        }
    }

    fn reset_pass(&mut self) {
        for (flag, rule) in self.matched.iter_mut().zip(&self.rules) {
            *flag = self.config.is_disabled(rule.name());
        }
        self.pass_added = 0;
    }

    /// Move the status forward after an action
    fn refresh(&mut self, feedback: &mut Feedback) -> EngineResult<()> {
        if self.status != RunStatus::Stopped {
            self.status = self.next_status()?;
        }
        feedback.status = self.status;
        feedback.goals_found = self.status == RunStatus::GoalFound;
        Ok(())
    }

    fn next_status(&mut self) -> EngineResult<RunStatus> {
        if self.prove_goals()? {
            if self.status != RunStatus::GoalFound {
                info!(statements = self.state.deps().len(), passes = self.passes, "goal found");
            }
            return Ok(RunStatus::GoalFound);
        }
        if let Some(index) = self.matched.iter().position(|m| !m) {
            return Ok(RunStatus::Matching(index));
        }
        if !self.buffer.is_empty() {
            return Ok(RunStatus::Applying(self.buffer.len()));
        }
        if self.pass_added > 0 {
            self.passes += 1;
            debug!(pass = self.passes, added = self.pass_added, "pass complete");
            self.reset_pass();
            if let Some(index) = self.matched.iter().position(|m| !m) {
                return Ok(RunStatus::Matching(index));
            }
        }
        if self.status != RunStatus::Saturated {
            info!(statements = self.state.deps().len(), passes = self.passes, "saturated");
        }
        Ok(RunStatus::Saturated)
    }

    /// Register every goal once all of them follow
    fn prove_goals(&mut self) -> EngineResult<bool> {
        if !self.check_goals() {
            return Ok(false);
        }
        for goal in self.goals.clone() {
            if self.state.justify_premise(&goal)?.is_none() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn added_since(&self, before: usize) -> Vec<StatementId> {
        (before..self.state.deps().len())
            .map(|i| StatementId(i as u32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::PointSpec;
    use crate::rules::default_rules;

    fn right_triangle() -> Vec<ConstructionStep> {
        vec![ConstructionStep::new(
            "free",
            vec![
                PointSpec::new("a", 0.0, 0.0),
                PointSpec::new("b", 4.0, 0.0),
                PointSpec::new("c", 0.0, 2.0),
            ],
        )
        .premise("perp a b a c")
        .unwrap()]
    }

    fn goal(text: &str) -> Clause {
        text.parse().unwrap()
    }

    #[test]
    fn test_goal_already_known_at_init() {
        let mut engine = Engine::new(right_triangle(), default_rules().unwrap(), EngineConfig::default());
        let feedback = engine.init(&[goal("perp c a b a")]).unwrap();
        assert_eq!(feedback.status, RunStatus::GoalFound);
        assert!(feedback.goals_found);
        assert_eq!(feedback.added.len(), 1);
        assert!(engine.proof().unwrap().validate().is_ok());
    }

    #[test]
    fn test_match_buffers_candidates() {
        let mut engine = Engine::new(right_triangle(), default_rules().unwrap(), EngineConfig::default());
        let feedback = engine.init(&[goal("cong a b b c")]).unwrap();
        assert_eq!(feedback.status, RunStatus::Matching(0));

        let mut candidates = 0;
        while let RunStatus::Matching(index) = engine.status() {
            let feedback = engine.act(Action::MatchTheorem(index)).unwrap();
            assert!(feedback.added.is_empty(), "matching never registers");
            candidates += feedback.candidates.len();
        }
        assert_eq!(engine.pending().count(), candidates);
        if candidates > 0 {
            assert_eq!(engine.status(), RunStatus::Applying(candidates));
        }
    }

    #[test]
    fn test_unknown_rule_is_an_error() {
        let mut engine = Engine::new(right_triangle(), default_rules().unwrap(), EngineConfig::default());
        engine.init(&[]).unwrap();
        let err = engine.act(Action::MatchTheorem(999)).unwrap_err();
        assert_eq!(err, EngineError::UnknownRule(999));
    }

    #[test]
    fn test_false_candidate_is_rejected_not_fatal() {
        let mut engine = Engine::new(right_triangle(), default_rules().unwrap(), EngineConfig::default());
        engine.init(&[]).unwrap();
        let state = engine.state();
        let bogus = Candidate {
            rule: "bogus".into(),
            premises: vec![state.statement(crate::ir::Predicate::Perp, &["a", "b", "a", "c"], None).unwrap()],
            conclusion: state.statement(crate::ir::Predicate::Cong, &["a", "b", "a", "c"], None).unwrap(),
        };
        let before = engine.state().deps().len();
        let feedback = engine.act(Action::ApplyDependency(bogus)).unwrap();
        assert_eq!(feedback.rejected, 1);
        assert!(feedback.added.is_empty());
        assert_eq!(engine.state().deps().len(), before);
    }

    #[test]
    fn test_stop_is_sticky() {
        let mut engine = Engine::new(right_triangle(), default_rules().unwrap(), EngineConfig::default());
        engine.init(&[goal("cong a b b c")]).unwrap();
        let feedback = engine.act(Action::Stop).unwrap();
        assert_eq!(feedback.status, RunStatus::Stopped);
        let feedback = engine.act(Action::MatchTheorem(0)).unwrap();
        assert_eq!(feedback.status, RunStatus::Stopped);
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let rules = default_rules().unwrap();
        let names = rules.iter().map(|r| r.name().to_string()).collect();
        let config = EngineConfig {
            disabled_rules: names,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(right_triangle(), rules, config);
        let feedback = engine.init(&[goal("cong a b b c")]).unwrap();
        assert_eq!(feedback.status, RunStatus::Saturated);
    }

    #[test]
    fn test_duplicate_point_rejected() {
        let mut engine = Engine::new(right_triangle(), default_rules().unwrap(), EngineConfig::default());
        engine.init(&[]).unwrap();
        let again = ConstructionStep::new("free", vec![PointSpec::new("a", 1.0, 1.0)]);
        let err = engine.augment(vec![again]).unwrap_err();
        assert_eq!(err, EngineError::DuplicatePoint("a".into()));
    }
}
