//! Problem loader
//!
//! Reads constructions whose coordinates are already solved, together with
//! goals and optional extra rules, from JSON. Clauses are written the way
//! statements render, e.g. `"perp a d b c"` or `"aconst a b c d 1/3"`.

use crate::config::EngineConfig;
use crate::engine::ProofState;
use crate::error::{EngineError, EngineResult};
use crate::ir::{Point2D, Predicate, Statement};
use crate::rules::{default_rules, Rule};
use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Problem loading errors
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid clause `{clause}`: {detail}")]
    InvalidClause { clause: String, detail: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Problem loader result
pub type LoadResult<T> = Result<T, LoadError>;

/// A named point with its solved coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSpec {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl PointSpec {
    pub fn new(name: &str, x: f64, y: f64) -> Self {
        Self {
            name: name.to_string(),
            x,
            y,
        }
    }

    pub fn coords(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// A predicate applied to names, with its constant when it takes one
///
/// Names are point labels in constructions and goals, and variable names
/// in rule specifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Clause {
    pub predicate: Predicate,
    pub args: Vec<String>,
    pub value: Option<Rational64>,
}

impl Clause {
    pub fn new(predicate: Predicate, args: &[&str]) -> Self {
        Self {
            predicate,
            args: args.iter().map(|a| a.to_string()).collect(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: Rational64) -> Self {
        self.value = Some(value);
        self
    }

    /// Statement over the points of `state` named by this clause
    pub fn resolve(&self, state: &ProofState) -> EngineResult<Statement> {
        let names: Vec<&str> = self.args.iter().map(String::as_str).collect();
        state.statement(self.predicate, &names, self.value)
    }
}

impl FromStr for Clause {
    type Err = LoadError;

    fn from_str(text: &str) -> LoadResult<Self> {
        let invalid = |detail: String| LoadError::InvalidClause {
            clause: text.to_string(),
            detail,
        };
        let mut tokens = text.split_whitespace();
        let name = tokens.next().ok_or_else(|| invalid("empty clause".into()))?;
        let predicate = Predicate::ALL
            .into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| invalid(format!("unknown predicate `{name}`")))?;

        let mut args: Vec<String> = tokens.map(str::to_string).collect();
        let mut value = None;
        if predicate.takes_value() && args.len() == predicate.arity() + 1 {
            let raw = args.pop().unwrap_or_default();
            let parsed = Rational64::from_str(&raw)
                .map_err(|e| invalid(format!("bad constant `{raw}`: {e}")))?;
            value = Some(parsed);
        }
        if args.len() != predicate.arity() {
            return Err(invalid(format!(
                "`{name}` takes {} points, got {}",
                predicate.arity(),
                args.len()
            )));
        }
        if predicate.takes_value() && value.is_none() {
            return Err(invalid(format!("`{name}` needs a constant")));
        }
        Ok(Self {
            predicate,
            args,
            value,
        })
    }
}

impl TryFrom<String> for Clause {
    type Error = LoadError;

    fn try_from(text: String) -> LoadResult<Self> {
        text.parse()
    }
}

impl From<Clause> for String {
    fn from(clause: Clause) -> String {
        clause.to_string()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate.name())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        if let Some(value) = self.value {
            write!(f, " {value}")?;
        }
        Ok(())
    }
}

/// One point-introduction step of a construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionStep {
    /// Constraint kind that placed the points, e.g. `on_line`, `foot`
    #[serde(default)]
    pub tag: String,

    pub points: Vec<PointSpec>,

    /// Facts the construction asserts about the new points
    #[serde(default)]
    pub premises: Vec<Clause>,
}

impl ConstructionStep {
    pub fn new(tag: &str, points: Vec<PointSpec>) -> Self {
        Self {
            tag: tag.to_string(),
            points,
            premises: Vec::new(),
        }
    }

    /// Add a premise given as clause text
    pub fn premise(mut self, clause: &str) -> LoadResult<Self> {
        self.premises.push(clause.parse()?);
        Ok(self)
    }
}

/// A rule given in problem files, in the clause syntax over variable names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub premises: Vec<Clause>,
    pub conclusions: Vec<Clause>,
}

impl RuleSpec {
    pub fn build(&self) -> EngineResult<Rule> {
        let mut builder = Rule::builder(self.name.clone());
        for clause in &self.premises {
            let args = clause.args.join(" ");
            builder = match clause.value {
                Some(value) => builder.premise_const(clause.predicate, &args, value),
                None => builder.premise(clause.predicate, &args),
            };
        }
        for clause in &self.conclusions {
            let args = clause.args.join(" ");
            builder = match clause.value {
                Some(value) => builder.conclusion_const(clause.predicate, &args, value),
                None => builder.conclusion(clause.predicate, &args),
            };
        }
        builder.build()
    }
}

/// A construction with the goals to prove
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub construction: Vec<ConstructionStep>,

    pub goals: Vec<Clause>,

    /// Replaces the default rule library when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<EngineConfig>,
}

impl Problem {
    pub fn from_json(json: &str) -> LoadResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> LoadResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The rule list this problem runs with
    pub fn rules(&self) -> EngineResult<Vec<Rule>> {
        if self.rules.is_empty() {
            return default_rules();
        }
        self.rules.iter().map(RuleSpec::build).collect()
    }
}

/// Load a single problem from a JSON file
pub fn load_problem<P: AsRef<Path>>(path: P) -> LoadResult<Problem> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Problem::from_json(&contents)
}

/// Load every `.json` problem in a directory, skipping unreadable ones
pub fn load_problems<P: AsRef<Path>>(dir: P) -> LoadResult<Vec<Problem>> {
    let dir = dir.as_ref();
    let io_error = |source| LoadError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut problems = Vec::new();
    for path in paths {
        match load_problem(&path) {
            Ok(problem) => problems.push(problem),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping problem"),
        }
    }
    Ok(problems)
}
