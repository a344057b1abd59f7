//! Deduction rules over point variables
//!
//! A rule is a list of premise templates and conclusion templates sharing
//! point variables. Rules are built once, at which point the matcher's
//! premise order and the rule's automorphisms (variable permutations that
//! map the rule onto itself) are computed. The automorphisms let the matcher
//! keep a single representative of every geometrically identical match.

mod library;
mod matcher;

pub use library::default_rules;
pub use matcher::Matches;

use crate::engine::ProofState;
use crate::error::{EngineError, EngineResult};
use crate::ir::{permutations, PointId, Predicate, Statement};
use num_rational::Rational64;
use serde::{Deserialize, Serialize};

/// Rules with more variables skip automorphism detection
const MAX_SYMMETRY_VARS: usize = 8;

/// A predicate applied to rule variables
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Template {
    pub predicate: Predicate,
    pub vars: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Rational64>,
}

impl Template {
    /// Statement obtained by substituting `binding[v]` for each variable `v`
    pub fn instantiate(&self, binding: &[PointId]) -> EngineResult<Statement> {
        let args = self.vars.iter().map(|&v| binding[v]).collect();
        Statement::from_parts(self.predicate, args, self.value)
    }

    fn canonical(&self) -> Template {
        let (vars, value) = self.predicate.canonicalize(&self.vars, self.value);
        Template {
            predicate: self.predicate,
            vars,
            value,
        }
    }

    fn renamed(&self, permutation: &[usize]) -> Template {
        Template {
            predicate: self.predicate,
            vars: self.vars.iter().map(|&v| permutation[v]).collect(),
            value: self.value,
        }
        .canonical()
    }
}

/// A conclusion ready to be applied, with the premises it rests on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub rule: String,
    pub premises: Vec<Statement>,
    pub conclusion: Statement,
}

/// Deduction rule `premises => conclusions`
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    variables: Vec<String>,
    premises: Vec<Template>,
    conclusions: Vec<Template>,
    plan: Vec<usize>,
    automorphisms: Vec<Vec<usize>>,
}

impl Rule {
    pub fn builder(name: impl Into<String>) -> RuleBuilder {
        RuleBuilder {
            name: name.into(),
            variables: Vec::new(),
            premises: Vec::new(),
            conclusions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn premises(&self) -> &[Template] {
        &self.premises
    }

    pub fn conclusions(&self) -> &[Template] {
        &self.conclusions
    }

    /// Premise indexes in the order the matcher visits them
    pub fn plan(&self) -> &[usize] {
        &self.plan
    }

    /// Non-identity variable permutations mapping the rule onto itself
    pub fn automorphisms(&self) -> &[Vec<usize>] {
        &self.automorphisms
    }

    /// Lazily enumerate the bindings under which every premise holds
    pub fn matches<'a>(&'a self, state: &'a ProofState) -> Matches<'a> {
        Matches::new(self, state)
    }

    /// Is `binding` the smallest of its images under the automorphisms?
    pub fn is_representative(&self, binding: &[PointId]) -> bool {
        self.automorphisms.iter().all(|sigma| {
            let image: Vec<PointId> = sigma.iter().map(|&v| binding[v]).collect();
            binding <= image.as_slice()
        })
    }

    /// One candidate per conclusion of the rule under `binding`
    pub fn instantiate(&self, binding: &[PointId]) -> EngineResult<Vec<Candidate>> {
        if binding.len() != self.variables.len() {
            return Err(EngineError::InvalidRule {
                name: self.name.clone(),
                detail: format!(
                    "binding has {} points for {} variables",
                    binding.len(),
                    self.variables.len()
                ),
            });
        }
        let premises = self
            .premises
            .iter()
            .map(|t| t.instantiate(binding))
            .collect::<EngineResult<Vec<_>>>()?;
        self.conclusions
            .iter()
            .map(|t| {
                Ok(Candidate {
                    rule: self.name.clone(),
                    premises: premises.clone(),
                    conclusion: t.instantiate(binding)?,
                })
            })
            .collect()
    }
}

/// Incremental construction of a [`Rule`] from named variables
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    name: String,
    variables: Vec<String>,
    premises: Vec<Template>,
    conclusions: Vec<Template>,
}

impl RuleBuilder {
    /// Add a premise; `args` is a whitespace separated list of variable names
    pub fn premise(mut self, predicate: Predicate, args: &str) -> Self {
        let template = self.template(predicate, args, None);
        self.premises.push(template);
        self
    }

    pub fn premise_const(mut self, predicate: Predicate, args: &str, value: Rational64) -> Self {
        let template = self.template(predicate, args, Some(value));
        self.premises.push(template);
        self
    }

    pub fn conclusion(mut self, predicate: Predicate, args: &str) -> Self {
        let template = self.template(predicate, args, None);
        self.conclusions.push(template);
        self
    }

    pub fn conclusion_const(mut self, predicate: Predicate, args: &str, value: Rational64) -> Self {
        let template = self.template(predicate, args, Some(value));
        self.conclusions.push(template);
        self
    }

    fn template(&mut self, predicate: Predicate, args: &str, value: Option<Rational64>) -> Template {
        let vars = args
            .split_whitespace()
            .map(|name| match self.variables.iter().position(|v| v == name) {
                Some(v) => v,
                None => {
                    self.variables.push(name.to_string());
                    self.variables.len() - 1
                }
            })
            .collect();
        Template {
            predicate,
            vars,
            value,
        }
    }

    fn invalid(&self, detail: String) -> EngineError {
        EngineError::InvalidRule {
            name: self.name.clone(),
            detail,
        }
    }

    /// Validate the templates and precompute the matching plan
    pub fn build(self) -> EngineResult<Rule> {
        if self.premises.is_empty() || self.conclusions.is_empty() {
            return Err(self.invalid("needs at least one premise and one conclusion".into()));
        }
        for t in self.premises.iter().chain(&self.conclusions) {
            if t.vars.len() != t.predicate.arity() {
                return Err(self.invalid(format!(
                    "{} takes {} points, got {}",
                    t.predicate,
                    t.predicate.arity(),
                    t.vars.len()
                )));
            }
            if t.predicate.takes_value() != t.value.is_some() {
                return Err(self.invalid(format!("{} has a misplaced constant", t.predicate)));
            }
        }
        let mut bound = vec![false; self.variables.len()];
        for t in &self.premises {
            for &v in &t.vars {
                bound[v] = true;
            }
        }
        if let Some(v) = bound.iter().position(|b| !b) {
            return Err(self.invalid(format!(
                "variable `{}` appears only in conclusions",
                self.variables[v]
            )));
        }

        let plan = match_plan(&self.premises, self.variables.len());
        let automorphisms = automorphisms(&self.premises, &self.conclusions, self.variables.len());
        Ok(Rule {
            name: self.name,
            variables: self.variables,
            premises: self.premises,
            conclusions: self.conclusions,
            plan,
            automorphisms,
        })
    }
}

/// Whether the matcher can read instances of `predicate` from an index
fn indexed(predicate: Predicate) -> bool {
    matches!(
        predicate,
        Predicate::Coll
            | Predicate::Cyclic
            | Predicate::Para
            | Predicate::Perp
            | Predicate::Cong
            | Predicate::EqAngle
            | Predicate::SimTri
            | Predicate::SimTri2
    )
}

/// Greedy premise order: checks first, then indexed premises, then the
/// premise introducing the fewest new variables
fn match_plan(premises: &[Template], num_vars: usize) -> Vec<usize> {
    let mut bound = vec![false; num_vars];
    let mut remaining: Vec<usize> = (0..premises.len()).collect();
    let mut plan = Vec::with_capacity(premises.len());
    while !remaining.is_empty() {
        let Some(pos) = (0..remaining.len()).min_by_key(|&k| {
            let t = &premises[remaining[k]];
            let mut fresh: Vec<usize> = t.vars.iter().copied().filter(|&v| !bound[v]).collect();
            fresh.sort_unstable();
            fresh.dedup();
            let numeric_guess = t.predicate.is_numeric_only() && !fresh.is_empty();
            (!fresh.is_empty(), numeric_guess, !indexed(t.predicate), fresh.len(), remaining[k])
        }) else {
            break;
        };
        let next = remaining.remove(pos);
        for &v in &premises[next].vars {
            bound[v] = true;
        }
        plan.push(next);
    }
    plan
}

fn canonical_set(templates: &[Template], permutation: &[usize]) -> Vec<Template> {
    let mut set: Vec<Template> = templates.iter().map(|t| t.renamed(permutation)).collect();
    set.sort();
    set.dedup();
    set
}

fn automorphisms(premises: &[Template], conclusions: &[Template], num_vars: usize) -> Vec<Vec<usize>> {
    if num_vars > MAX_SYMMETRY_VARS {
        return Vec::new();
    }
    let identity: Vec<usize> = (0..num_vars).collect();
    let premise_set = canonical_set(premises, &identity);
    let conclusion_set = canonical_set(conclusions, &identity);
    permutations(num_vars)
        .into_iter()
        .filter(|p| *p != identity)
        .filter(|p| canonical_set(premises, p) == premise_set && canonical_set(conclusions, p) == conclusion_set)
        .collect()
}
