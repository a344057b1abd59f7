//! Algebraic reasoning over angles and ratios
//!
//! Every line gets an angle variable (its direction as a fraction of π) and
//! every segment a ratio variable (its length, multiplicatively). Parallel,
//! perpendicular, congruence and constant statements are pairwise
//! differences; `eqangle` and `eqratio` are four-term equations.

mod group;
mod table;
mod union_find;

pub use group::{Angle, Group, Ratio};
pub use table::{Closure, DifferenceClass, Table};
pub use union_find::{Conflict, Edge, Union, WeightedUnionFind};
