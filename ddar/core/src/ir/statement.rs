//! Predicates and canonical statements
//!
//! A statement is a predicate applied to an ordered tuple of points, with an
//! optional rational constant for `aconst`/`rconst`. Every constructor
//! canonicalizes: the argument tuple is replaced by the lexicographically
//! smallest tuple in the predicate's symmetry orbit, so two statements that
//! mean the same thing compare and hash equal.

use super::coords::{ops, CoordinateStore, Point2D, Tolerance};
use super::symbols::{PointId, SymbolTable};
use crate::error::EngineError;
use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Closed set of predicates understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Predicate {
    /// Three points lie on one line
    Coll,
    /// Line AB is parallel to line CD
    Para,
    /// Line AB is perpendicular to line CD
    Perp,
    /// |AB| = |CD|
    Cong,
    /// Four points lie on one circle
    Cyclic,
    /// M is the midpoint of AB
    Midp,
    /// O is the center of the circle through A, B, C
    Circle,
    /// ∠(AB, CD) = ∠(EF, GH) as directed angles modulo π
    EqAngle,
    /// |AB| / |CD| = |EF| / |GH|
    EqRatio,
    /// ∠(AB, CD) = r·π
    AConst,
    /// |AB| / |CD| = r
    RConst,
    /// Triangles ABC and PQR are similar with the same orientation
    SimTri,
    /// Triangles ABC and PQR are similar with opposite orientation
    SimTri2,
    /// Three points are not collinear
    Ncoll,
    /// Lines AB and CD are not parallel
    Npara,
    /// Two points are distinct
    Diff,
    /// A lies between B and C exactly when X lies between Y and Z
    SameSide,
}

/// One element of a predicate's symmetry group
///
/// `order[k]` is the index of the original argument placed at position `k`.
/// `flips_value` is set when the arrangement negates (`aconst`) or inverts
/// (`rconst`) the attached constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrangement {
    pub order: Vec<usize>,
    pub flips_value: bool,
}

const EQ_PAIR_ORDERS: [[usize; 4]; 8] = [
    [0, 1, 2, 3],
    [2, 3, 0, 1],
    [1, 0, 3, 2],
    [3, 2, 1, 0],
    [0, 2, 1, 3],
    [1, 3, 0, 2],
    [2, 0, 3, 1],
    [3, 1, 2, 0],
];

const TWO_PAIR_ORDERS: [[usize; 2]; 2] = [[0, 1], [1, 0]];

impl Predicate {
    pub const ALL: [Predicate; 17] = [
        Predicate::Coll,
        Predicate::Para,
        Predicate::Perp,
        Predicate::Cong,
        Predicate::Cyclic,
        Predicate::Midp,
        Predicate::Circle,
        Predicate::EqAngle,
        Predicate::EqRatio,
        Predicate::AConst,
        Predicate::RConst,
        Predicate::SimTri,
        Predicate::SimTri2,
        Predicate::Ncoll,
        Predicate::Npara,
        Predicate::Diff,
        Predicate::SameSide,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Predicate::Coll => "coll",
            Predicate::Para => "para",
            Predicate::Perp => "perp",
            Predicate::Cong => "cong",
            Predicate::Cyclic => "cyclic",
            Predicate::Midp => "midp",
            Predicate::Circle => "circle",
            Predicate::EqAngle => "eqangle",
            Predicate::EqRatio => "eqratio",
            Predicate::AConst => "aconst",
            Predicate::RConst => "rconst",
            Predicate::SimTri => "simtri",
            Predicate::SimTri2 => "simtri2",
            Predicate::Ncoll => "ncoll",
            Predicate::Npara => "npara",
            Predicate::Diff => "diff",
            Predicate::SameSide => "sameside",
        }
    }

    /// Number of point arguments
    pub fn arity(self) -> usize {
        match self {
            Predicate::Diff => 2,
            Predicate::Coll | Predicate::Ncoll | Predicate::Midp => 3,
            Predicate::Para
            | Predicate::Perp
            | Predicate::Cong
            | Predicate::Cyclic
            | Predicate::Circle
            | Predicate::AConst
            | Predicate::RConst
            | Predicate::Npara => 4,
            Predicate::SimTri | Predicate::SimTri2 | Predicate::SameSide => 6,
            Predicate::EqAngle | Predicate::EqRatio => 8,
        }
    }

    /// Whether the statement carries a rational constant
    pub fn takes_value(self) -> bool {
        matches!(self, Predicate::AConst | Predicate::RConst)
    }

    /// Predicates decided by coordinates alone, never derived symbolically
    pub fn is_numeric_only(self) -> bool {
        matches!(
            self,
            Predicate::Ncoll | Predicate::Npara | Predicate::Diff | Predicate::SameSide
        )
    }

    /// Number of point pairs for predicates built from pairs, 0 otherwise
    fn pair_count(self) -> usize {
        match self {
            Predicate::Para
            | Predicate::Perp
            | Predicate::Cong
            | Predicate::Npara
            | Predicate::AConst
            | Predicate::RConst => 2,
            Predicate::EqAngle | Predicate::EqRatio => 4,
            _ => 0,
        }
    }

    /// Full symmetry group of the argument tuple
    pub fn symmetry(self) -> Vec<Arrangement> {
        match self.pair_count() {
            2 => pair_group(&TWO_PAIR_ORDERS.map(|o| o.to_vec()), self.takes_value()),
            4 => pair_group(&EQ_PAIR_ORDERS.map(|o| o.to_vec()), false),
            _ => self.point_group(),
        }
    }

    fn point_group(self) -> Vec<Arrangement> {
        let plain = |order: Vec<usize>| Arrangement {
            order,
            flips_value: false,
        };
        match self {
            Predicate::Coll | Predicate::Ncoll => permutations(3).into_iter().map(plain).collect(),
            Predicate::Cyclic => permutations(4).into_iter().map(plain).collect(),
            Predicate::Diff => permutations(2).into_iter().map(plain).collect(),
            Predicate::Midp => vec![plain(vec![0, 1, 2]), plain(vec![0, 2, 1])],
            Predicate::Circle => permutations(3)
                .into_iter()
                .map(|p| plain(std::iter::once(0).chain(p.into_iter().map(|i| i + 1)).collect()))
                .collect(),
            Predicate::SimTri | Predicate::SimTri2 => {
                let mut group = Vec::with_capacity(12);
                for p in permutations(3) {
                    let first: Vec<usize> = p.clone();
                    let second: Vec<usize> = p.iter().map(|i| i + 3).collect();
                    group.push(plain([first.clone(), second.clone()].concat()));
                    group.push(plain([second, first].concat()));
                }
                group
            }
            Predicate::SameSide => {
                let mut group = Vec::with_capacity(8);
                for first in [[0, 1, 2], [0, 2, 1]] {
                    for second in [[3, 4, 5], [3, 5, 4]] {
                        group.push(plain([first, second].concat()));
                        group.push(plain([second, first].concat()));
                    }
                }
                group
            }
            _ => vec![plain((0..self.arity()).collect())],
        }
    }

    /// Canonical form of an argument tuple and its constant
    ///
    /// Generic over the element type so rule templates can canonicalize
    /// variable tuples with the same code as point tuples.
    pub fn canonicalize<T: Ord + Copy>(
        self,
        args: &[T],
        value: Option<Rational64>,
    ) -> (Vec<T>, Option<Rational64>) {
        let value = value.map(|v| self.normalize_value(v));
        match self.pair_count() {
            0 => {
                let mut best: Option<(Vec<T>, Option<Rational64>)> = None;
                for arrangement in self.symmetry() {
                    let candidate = (apply_order(args, &arrangement.order), value);
                    if best.as_ref().map_or(true, |b| candidate < *b) {
                        best = Some(candidate);
                    }
                }
                best.unwrap_or_else(|| (args.to_vec(), value))
            }
            n => {
                // Flips inside a pair act independently, so sorting each pair
                // first reduces the search to reorderings of whole pairs.
                let pairs: Vec<[T; 2]> = args
                    .chunks(2)
                    .map(|c| if c[0] <= c[1] { [c[0], c[1]] } else { [c[1], c[0]] })
                    .collect();
                let orders: Vec<Vec<usize>> = if n == 2 {
                    TWO_PAIR_ORDERS.iter().map(|o| o.to_vec()).collect()
                } else {
                    EQ_PAIR_ORDERS.iter().map(|o| o.to_vec()).collect()
                };
                let mut best: Option<(Vec<T>, Option<Rational64>)> = None;
                for order in orders {
                    let swapped = n == 2 && order[0] == 1;
                    let candidate_value = match value {
                        Some(v) if swapped => Some(self.flip_value(v)),
                        other => other,
                    };
                    let candidate_args: Vec<T> = order.iter().flat_map(|&i| pairs[i]).collect();
                    let candidate = (candidate_args, candidate_value);
                    if best.as_ref().map_or(true, |b| candidate < *b) {
                        best = Some(candidate);
                    }
                }
                best.unwrap_or_else(|| (args.to_vec(), value))
            }
        }
    }

    /// Every arrangement of `args` with the same meaning, canonical ones included
    pub fn orbit<T: Ord + Copy>(
        self,
        args: &[T],
        value: Option<Rational64>,
    ) -> Vec<(Vec<T>, Option<Rational64>)> {
        let value = value.map(|v| self.normalize_value(v));
        let mut out: Vec<(Vec<T>, Option<Rational64>)> = self
            .symmetry()
            .into_iter()
            .map(|a| {
                let v = match value {
                    Some(v) if a.flips_value => Some(self.flip_value(v)),
                    other => other,
                };
                (apply_order(args, &a.order), v)
            })
            .collect();
        out.sort();
        out.dedup();
        out
    }

    fn normalize_value(self, value: Rational64) -> Rational64 {
        match self {
            Predicate::AConst => value - value.floor(),
            _ => value,
        }
    }

    fn flip_value(self, value: Rational64) -> Rational64 {
        match self {
            Predicate::AConst => self.normalize_value(-value),
            Predicate::RConst => value.recip(),
            _ => value,
        }
    }
}

fn apply_order<T: Copy>(args: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|&i| args[i]).collect()
}

fn pair_group(pair_orders: &[Vec<usize>], value_sensitive: bool) -> Vec<Arrangement> {
    let n = pair_orders.first().map_or(0, Vec::len);
    let identity: Vec<usize> = (0..n).collect();
    let mut group = Vec::with_capacity(pair_orders.len() << n);
    for pair_order in pair_orders {
        for mask in 0..(1usize << n) {
            let order = pair_order
                .iter()
                .enumerate()
                .flat_map(|(k, &pair)| {
                    if mask & (1 << k) != 0 {
                        [2 * pair + 1, 2 * pair]
                    } else {
                        [2 * pair, 2 * pair + 1]
                    }
                })
                .collect();
            group.push(Arrangement {
                order,
                flips_value: value_sensitive && *pair_order != identity,
            });
        }
    }
    group
}

/// All permutations of `0..n` in lexicographic order
pub(crate) fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn extend(prefix: &mut Vec<usize>, used: &mut Vec<bool>, out: &mut Vec<Vec<usize>>) {
        if prefix.len() == used.len() {
            out.push(prefix.clone());
            return;
        }
        for i in 0..used.len() {
            if !used[i] {
                used[i] = true;
                prefix.push(i);
                extend(prefix, used, out);
                prefix.pop();
                used[i] = false;
            }
        }
    }
    let mut out = Vec::new();
    extend(&mut Vec::with_capacity(n), &mut vec![false; n], &mut out);
    out
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Predicate {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Predicate::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| EngineError::InvalidStatement(format!("unknown predicate `{s}`")))
    }
}

/// Canonical geometric statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    predicate: Predicate,
    args: Vec<PointId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<Rational64>,
}

impl Statement {
    /// Build a statement without a constant
    pub fn new(predicate: Predicate, args: Vec<PointId>) -> Result<Self, EngineError> {
        if predicate.takes_value() {
            return Err(EngineError::InvalidStatement(format!(
                "{predicate} requires a constant"
            )));
        }
        Self::build(predicate, args, None)
    }

    /// Build an `aconst`/`rconst` statement
    pub fn with_value(
        predicate: Predicate,
        args: Vec<PointId>,
        value: Rational64,
    ) -> Result<Self, EngineError> {
        if !predicate.takes_value() {
            return Err(EngineError::InvalidStatement(format!(
                "{predicate} does not take a constant"
            )));
        }
        if predicate == Predicate::RConst && value <= Rational64::from_integer(0) {
            return Err(EngineError::InvalidStatement(format!(
                "rconst ratio must be positive, got {value}"
            )));
        }
        Self::build(predicate, args, Some(value))
    }

    /// Build from parts, dispatching on whether a constant is present
    pub fn from_parts(
        predicate: Predicate,
        args: Vec<PointId>,
        value: Option<Rational64>,
    ) -> Result<Self, EngineError> {
        match value {
            Some(v) => Self::with_value(predicate, args, v),
            None => Self::new(predicate, args),
        }
    }

    fn build(
        predicate: Predicate,
        args: Vec<PointId>,
        value: Option<Rational64>,
    ) -> Result<Self, EngineError> {
        if args.len() != predicate.arity() {
            return Err(EngineError::InvalidStatement(format!(
                "{predicate} takes {} points, got {}",
                predicate.arity(),
                args.len()
            )));
        }
        let (args, value) = predicate.canonicalize(&args, value);
        Ok(Self {
            predicate,
            args,
            value,
        })
    }

    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    pub fn args(&self) -> &[PointId] {
        &self.args
    }

    pub fn value(&self) -> Option<Rational64> {
        self.value
    }

    /// A pair, triangle or circle collapses onto repeated points
    pub fn is_degenerate(&self) -> bool {
        let a = &self.args;
        match self.predicate {
            Predicate::Coll | Predicate::Cyclic | Predicate::Diff => false,
            Predicate::Ncoll => a[0] == a[1] || a[1] == a[2] || a[0] == a[2],
            Predicate::Midp => a[1] == a[2],
            Predicate::Circle => {
                a[0] == a[1] || a[0] == a[2] || a[0] == a[3] || has_repeats(&a[1..])
            }
            Predicate::SimTri | Predicate::SimTri2 => {
                has_repeats(&a[0..3]) || has_repeats(&a[3..6])
            }
            Predicate::SameSide => a[1] == a[2] || a[4] == a[5],
            _ => a.chunks(2).any(|c| c[0] == c[1]),
        }
    }

    /// True for every configuration, so carries no information
    pub fn is_trivial(&self) -> bool {
        let a = &self.args;
        match self.predicate {
            Predicate::Coll | Predicate::Cyclic => has_repeats(a),
            Predicate::Para | Predicate::Cong => a[0..2] == a[2..4],
            Predicate::EqAngle | Predicate::EqRatio => {
                (a[0..2] == a[2..4] && a[4..6] == a[6..8]) || (a[0..2] == a[4..6] && a[2..4] == a[6..8])
            }
            Predicate::SimTri => a[0..3] == a[3..6],
            Predicate::AConst => a[0..2] == a[2..4] && self.value == Some(Rational64::from_integer(0)),
            Predicate::RConst => a[0..2] == a[2..4] && self.value == Some(Rational64::from_integer(1)),
            _ => false,
        }
    }

    /// Evaluate the statement at the given coordinates
    pub fn check_numerical(&self, coords: &CoordinateStore, tol: &Tolerance) -> bool {
        let Some(p) = coords.resolve(&self.args) else {
            return false;
        };
        if self.is_trivial() {
            return true;
        }
        if self.is_degenerate() {
            return false;
        }
        match self.predicate {
            Predicate::Coll => ops::are_collinear(p[0], p[1], p[2], tol),
            Predicate::Ncoll => {
                !ops::are_collinear(p[0], p[1], p[2], tol)
                    && !ops::coincide(p[0], p[1], tol)
                    && !ops::coincide(p[1], p[2], tol)
                    && !ops::coincide(p[0], p[2], tol)
            }
            Predicate::Para => non_degenerate_pairs(&p, tol) && ops::are_parallel(p[0], p[1], p[2], p[3], tol),
            Predicate::Npara => {
                non_degenerate_pairs(&p, tol) && !ops::are_parallel(p[0], p[1], p[2], p[3], tol)
            }
            Predicate::Perp => {
                non_degenerate_pairs(&p, tol) && ops::are_perpendicular(p[0], p[1], p[2], p[3], tol)
            }
            Predicate::Cong => tol.close_enough(p[0].distance(&p[1]), p[2].distance(&p[3])),
            Predicate::Cyclic => ops::are_concyclic([p[0], p[1], p[2], p[3]], tol),
            Predicate::Midp => {
                !ops::coincide(p[1], p[2], tol) && ops::coincide(p[0], (p[1] + p[2]) * 0.5, tol)
            }
            Predicate::Circle => {
                let r = p[0].distance(&p[1]);
                !tol.is_zero(r)
                    && tol.close_enough(p[0].distance(&p[2]), r)
                    && tol.close_enough(p[0].distance(&p[3]), r)
            }
            Predicate::EqAngle => {
                non_degenerate_pairs(&p, tol)
                    && ops::angles_close(
                        ops::directed_angle(p[0], p[1], p[2], p[3]),
                        ops::directed_angle(p[4], p[5], p[6], p[7]),
                        tol,
                    )
            }
            Predicate::EqRatio => {
                non_degenerate_pairs(&p, tol)
                    && tol.close_enough(
                        p[0].distance(&p[1]) * p[6].distance(&p[7]),
                        p[2].distance(&p[3]) * p[4].distance(&p[5]),
                    )
            }
            Predicate::AConst => {
                let target = rational_to_f64(self.value.unwrap_or(Rational64::from_integer(0))) * PI;
                non_degenerate_pairs(&p, tol)
                    && ops::angles_close(ops::directed_angle(p[0], p[1], p[2], p[3]), target, tol)
            }
            Predicate::RConst => {
                let target = rational_to_f64(self.value.unwrap_or(Rational64::from_integer(0)));
                non_degenerate_pairs(&p, tol)
                    && tol.close_enough(p[0].distance(&p[1]), target * p[2].distance(&p[3]))
            }
            Predicate::SimTri | Predicate::SimTri2 => {
                let same = ops::orientation(p[0], p[1], p[2], tol)
                    * ops::orientation(p[3], p[4], p[5], tol);
                let wanted = if self.predicate == Predicate::SimTri { 1 } else { -1 };
                same == wanted && similar_sides(&p, tol)
            }
            Predicate::Diff => !ops::coincide(p[0], p[1], tol),
            Predicate::SameSide => {
                let s1 = (p[1] - p[0]).dot(&(p[2] - p[0]));
                let s2 = (p[4] - p[3]).dot(&(p[5] - p[3]));
                !tol.is_zero(s1) && !tol.is_zero(s2) && (s1 > 0.0) == (s2 > 0.0)
            }
        }
    }

    /// Human readable form using point labels
    pub fn render(&self, symbols: &SymbolTable) -> String {
        let mut out = self.predicate.name().to_string();
        for &p in &self.args {
            out.push(' ');
            out.push_str(&symbols.display_point(p));
        }
        if let Some(v) = self.value {
            out.push(' ');
            out.push_str(&v.to_string());
        }
        out
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.predicate)?;
        for p in &self.args {
            write!(f, " {p}")?;
        }
        if let Some(v) = self.value {
            write!(f, " {v}")?;
        }
        Ok(())
    }
}

/// Lossy conversion used only for numeric checks
pub fn rational_to_f64(value: Rational64) -> f64 {
    *value.numer() as f64 / *value.denom() as f64
}

fn has_repeats(points: &[PointId]) -> bool {
    points
        .iter()
        .enumerate()
        .any(|(i, p)| points[i + 1..].contains(p))
}

fn non_degenerate_pairs(points: &[Point2D], tol: &Tolerance) -> bool {
    points.chunks(2).all(|c| !ops::coincide(c[0], c[1], tol))
}

fn similar_sides(p: &[Point2D], tol: &Tolerance) -> bool {
    let ab = p[0].distance(&p[1]);
    let bc = p[1].distance(&p[2]);
    let ca = p[2].distance(&p[0]);
    let pq = p[3].distance(&p[4]);
    let qr = p[4].distance(&p[5]);
    let rp = p[5].distance(&p[3]);
    tol.close_enough(ab * qr, bc * pq) && tol.close_enough(bc * rp, ca * qr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(ids: &[u32]) -> Vec<PointId> {
        ids.iter().map(|&i| PointId(i)).collect()
    }

    fn square() -> CoordinateStore {
        let mut coords = CoordinateStore::new();
        coords.set(PointId(0), Point2D::new(0.0, 0.0));
        coords.set(PointId(1), Point2D::new(1.0, 0.0));
        coords.set(PointId(2), Point2D::new(1.0, 1.0));
        coords.set(PointId(3), Point2D::new(0.0, 1.0));
        coords
    }

    #[test]
    fn test_predicate_names_round_trip() {
        for p in Predicate::ALL {
            assert_eq!(p.name().parse::<Predicate>(), Ok(p));
        }
        assert!("tangent".parse::<Predicate>().is_err());
    }

    #[test]
    fn test_symmetry_group_sizes() {
        assert_eq!(Predicate::Coll.symmetry().len(), 6);
        assert_eq!(Predicate::Cyclic.symmetry().len(), 24);
        assert_eq!(Predicate::Para.symmetry().len(), 8);
        assert_eq!(Predicate::EqAngle.symmetry().len(), 128);
        assert_eq!(Predicate::SimTri.symmetry().len(), 12);
        assert_eq!(Predicate::Circle.symmetry().len(), 6);
    }

    #[test]
    fn test_para_normalization() {
        let s1 = Statement::new(Predicate::Para, pts(&[3, 2, 1, 0])).unwrap();
        let s2 = Statement::new(Predicate::Para, pts(&[0, 1, 2, 3])).unwrap();
        assert_eq!(s1, s2);
        assert_eq!(s1.args(), &pts(&[0, 1, 2, 3])[..]);
    }

    #[test]
    fn test_eqangle_orbit_canonicalizes_to_one_statement() {
        let base = pts(&[4, 1, 6, 2, 0, 7, 3, 5]);
        let canonical = Statement::new(Predicate::EqAngle, base.clone()).unwrap();
        for (args, _) in Predicate::EqAngle.orbit(&base, None) {
            assert_eq!(Statement::new(Predicate::EqAngle, args).unwrap(), canonical);
        }
    }

    #[test]
    fn test_eqangle_does_not_merge_distinct_statements() {
        // ∠(l0,l1) = ∠(l2,l3) differs from ∠(l0,l1) = ∠(l3,l2)
        let s1 = Statement::new(Predicate::EqAngle, pts(&[0, 1, 2, 3, 4, 5, 6, 7])).unwrap();
        let s2 = Statement::new(Predicate::EqAngle, pts(&[0, 1, 2, 3, 6, 7, 4, 5])).unwrap();
        assert_ne!(s1, s2);
    }

    #[test]
    fn test_aconst_swap_negates_constant() {
        let quarter = Rational64::new(1, 4);
        let s1 = Statement::with_value(Predicate::AConst, pts(&[2, 3, 0, 1]), quarter).unwrap();
        let s2 =
            Statement::with_value(Predicate::AConst, pts(&[0, 1, 2, 3]), Rational64::new(3, 4))
                .unwrap();
        assert_eq!(s1, s2);

        let wrapped =
            Statement::with_value(Predicate::AConst, pts(&[0, 1, 2, 3]), Rational64::new(7, 4))
                .unwrap();
        assert_eq!(wrapped, s2, "constants are taken modulo 1");
    }

    #[test]
    fn test_rconst_swap_inverts_constant() {
        let s1 =
            Statement::with_value(Predicate::RConst, pts(&[2, 3, 0, 1]), Rational64::new(2, 3))
                .unwrap();
        assert_eq!(s1.args(), &pts(&[0, 1, 2, 3])[..]);
        assert_eq!(s1.value(), Some(Rational64::new(3, 2)));
        assert!(Statement::with_value(Predicate::RConst, pts(&[0, 1, 2, 3]), Rational64::from_integer(0)).is_err());
    }

    #[test]
    fn test_arity_and_value_validation() {
        assert!(Statement::new(Predicate::Coll, pts(&[0, 1])).is_err());
        assert!(Statement::new(Predicate::AConst, pts(&[0, 1, 2, 3])).is_err());
        assert!(Statement::with_value(Predicate::Para, pts(&[0, 1, 2, 3]), Rational64::new(1, 2)).is_err());
    }

    #[test]
    fn test_trivial_and_degenerate() {
        assert!(Statement::new(Predicate::Coll, pts(&[0, 0, 1])).unwrap().is_trivial());
        assert!(Statement::new(Predicate::Cong, pts(&[1, 0, 0, 1])).unwrap().is_trivial());
        assert!(Statement::new(Predicate::EqAngle, pts(&[0, 1, 2, 3, 0, 1, 2, 3]))
            .unwrap()
            .is_trivial());
        assert!(Statement::new(Predicate::Para, pts(&[0, 0, 1, 2])).unwrap().is_degenerate());
        assert!(!Statement::new(Predicate::Perp, pts(&[0, 1, 2, 3])).unwrap().is_trivial());
    }

    #[test]
    fn test_numeric_checks_on_square() {
        let coords = square();
        let tol = Tolerance::default();
        let check = |p: Predicate, ids: &[u32]| {
            Statement::new(p, pts(ids)).unwrap().check_numerical(&coords, &tol)
        };

        assert!(check(Predicate::Para, &[0, 1, 3, 2]));
        assert!(check(Predicate::Perp, &[0, 1, 1, 2]));
        assert!(!check(Predicate::Perp, &[0, 1, 3, 2]));
        assert!(check(Predicate::Cong, &[0, 1, 1, 2]));
        assert!(check(Predicate::Cyclic, &[0, 1, 2, 3]));
        assert!(check(Predicate::Ncoll, &[0, 1, 2]));
        assert!(!check(Predicate::Coll, &[0, 1, 2]));
        assert!(check(Predicate::EqAngle, &[0, 1, 0, 2, 0, 2, 0, 3]));
        assert!(check(Predicate::EqRatio, &[0, 1, 0, 2, 1, 2, 1, 3]));
        assert!(check(Predicate::Diff, &[0, 1]));
        assert!(!check(Predicate::Para, &[0, 0, 1, 2]), "degenerate line");
    }

    #[test]
    fn test_numeric_constants() {
        let coords = square();
        let tol = Tolerance::default();

        let right = Statement::with_value(Predicate::AConst, pts(&[0, 1, 1, 2]), Rational64::new(1, 2)).unwrap();
        assert!(right.check_numerical(&coords, &tol));

        let eighth = Statement::with_value(Predicate::AConst, pts(&[0, 1, 0, 2]), Rational64::new(1, 4)).unwrap();
        assert!(eighth.check_numerical(&coords, &tol));

        let sqrt2 = Statement::with_value(Predicate::RConst, pts(&[0, 2, 0, 1]), Rational64::new(3, 2)).unwrap();
        assert!(!sqrt2.check_numerical(&coords, &tol));
    }

    #[test]
    fn test_simtri_orientation() {
        let mut coords = square();
        coords.set(PointId(4), Point2D::new(0.0, 0.0));
        coords.set(PointId(5), Point2D::new(2.0, 0.0));
        coords.set(PointId(6), Point2D::new(2.0, 2.0));
        coords.set(PointId(7), Point2D::new(2.0, -2.0));
        let tol = Tolerance::default();

        let same = Statement::new(Predicate::SimTri, pts(&[0, 1, 2, 4, 5, 6])).unwrap();
        let mirrored = Statement::new(Predicate::SimTri2, pts(&[0, 1, 2, 4, 5, 7])).unwrap();
        let wrong = Statement::new(Predicate::SimTri, pts(&[0, 1, 2, 4, 5, 7])).unwrap();

        assert!(same.check_numerical(&coords, &tol));
        assert!(mirrored.check_numerical(&coords, &tol));
        assert!(!wrong.check_numerical(&coords, &tol));
    }

    #[test]
    fn test_render_uses_labels() {
        let mut symbols = SymbolTable::new();
        for name in ["a", "b", "c", "d"] {
            symbols.get_or_intern_point(name);
        }
        let s = Statement::with_value(Predicate::AConst, pts(&[0, 1, 2, 3]), Rational64::new(1, 2)).unwrap();
        assert_eq!(s.render(&symbols), "aconst a b c d 1/2");
    }
}
