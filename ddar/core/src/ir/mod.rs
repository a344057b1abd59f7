//! Intermediate Representation (IR) module
//!
//! Core data structures shared by every layer of the prover:
//! - **symbols**: point interning and identifiers for lines, circles and segments
//! - **coords**: numeric coordinates and tolerance-aware geometric checks
//! - **statement**: predicates and canonical statements
//! - **dependency**: the dependency graph of registered statements
//! - **proof**: exported traces and trace-back of a goal
//!
//! # Example
//!
//! ```rust
//! use ddar_core::ir::*;
//!
//! let mut symbols = SymbolTable::new();
//! let a = symbols.get_or_intern_point("a");
//! let b = symbols.get_or_intern_point("b");
//! let c = symbols.get_or_intern_point("c");
//! let d = symbols.get_or_intern_point("d");
//!
//! // Canonicalization makes argument order irrelevant
//! let s1 = Statement::new(Predicate::Perp, vec![a, b, c, d]).unwrap();
//! let s2 = Statement::new(Predicate::Perp, vec![d, c, b, a]).unwrap();
//! assert_eq!(s1, s2);
//!
//! let mut graph = DependencyGraph::new();
//! let id = graph.register(s1, Reason::Premise, vec![]).unwrap().id();
//! assert_eq!(graph.get(&s2), Some(id));
//! ```

mod coords;
mod dependency;
mod proof;
mod statement;
mod symbols;

pub use coords::{ops, CoordinateStore, Point2D, Tolerance};
pub use dependency::{Dependency, DependencyGraph, Reason, Registration, StatementId};
pub use proof::{ProofError, ProofRecord, ProofResult, ProofStatistics, ProofTrace};
pub use statement::{rational_to_f64, Arrangement, Predicate, Statement};
pub(crate) use statement::permutations;
pub use symbols::{CircleId, LineId, PointId, Segment, SymbolTable};
