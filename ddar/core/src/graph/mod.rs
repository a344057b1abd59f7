//! Symbol graph: points, lines and circles
//!
//! Lines and circles are nodes of two union-find arenas. A node is created
//! from the points that define it (two for a line, three for a circle); a
//! collinearity or concyclicity statement merges every class that shares
//! enough points with it, and keeps merging while the grown class overlaps
//! further classes. Each class remembers which statements put which points
//! on it, so membership can be justified later.

use crate::error::{EngineError, EngineResult};
use crate::ir::{ops, CircleId, CoordinateStore, LineId, Point2D, PointId, StatementId, Tolerance};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// The two object kinds tracked by the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Line,
    Circle,
}

impl ObjectKind {
    /// Number of shared points that forces two objects to coincide
    pub fn threshold(self) -> usize {
        match self {
            ObjectKind::Line => 2,
            ObjectKind::Circle => 3,
        }
    }
}

/// Points placed on an object together with the statements placing them
#[derive(Debug, Clone, PartialEq)]
pub struct Incidence {
    pub points: BTreeSet<PointId>,
    pub why: Vec<StatementId>,
}

#[derive(Debug, Clone)]
struct ObjectNode {
    parent: usize,
    defining: Vec<PointId>,
    points: BTreeSet<PointId>,
    incidences: Vec<Incidence>,
}

/// Validated merge that has not been applied yet
#[derive(Debug, Clone)]
pub struct MergePlan {
    kind: ObjectKind,
    roots: Vec<usize>,
    points: BTreeSet<PointId>,
}

impl MergePlan {
    /// Every point of the class after the merge
    pub fn points(&self) -> &BTreeSet<PointId> {
        &self.points
    }

    /// Existing classes the merge touches
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }
}

/// Node pairs whose variables must now be equal
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub kept: u32,
    pub absorbed: u32,
    pub why: Vec<StatementId>,
}

#[derive(Debug, Clone)]
struct ObjectArena {
    kind: ObjectKind,
    nodes: Vec<ObjectNode>,
    memberships: FxHashMap<PointId, Vec<usize>>,
}

impl ObjectArena {
    fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
            memberships: FxHashMap::default(),
        }
    }

    fn find(&self, mut n: usize) -> usize {
        while self.nodes[n].parent != n {
            n = self.nodes[n].parent;
        }
        n
    }

    fn roots_of(&self, point: PointId) -> BTreeSet<usize> {
        self.memberships
            .get(&point)
            .map(|nodes| nodes.iter().map(|&n| self.find(n)).collect())
            .unwrap_or_default()
    }

    /// Class holding every one of `points`
    fn containing(&self, points: &[PointId]) -> Option<usize> {
        let (first, rest) = points.split_first()?;
        self.roots_of(*first)
            .into_iter()
            .find(|&r| rest.iter().all(|p| self.nodes[r].points.contains(p)))
    }

    fn create(&mut self, points: BTreeSet<PointId>, defining: Vec<PointId>, incidences: Vec<Incidence>) -> usize {
        let id = self.nodes.len();
        for &p in &points {
            self.memberships.entry(p).or_default().push(id);
        }
        self.nodes.push(ObjectNode {
            parent: id,
            defining,
            points,
            incidences,
        });
        id
    }

    /// Classes that must merge with `points`, transitively
    fn plan(&self, points: &[PointId]) -> MergePlan {
        let threshold = self.kind.threshold();
        let mut set: BTreeSet<PointId> = points.iter().copied().collect();
        let mut roots: Vec<usize> = Vec::new();
        loop {
            let candidates: BTreeSet<usize> = set.iter().flat_map(|&p| self.roots_of(p)).collect();
            let next = candidates.into_iter().find(|r| {
                !roots.contains(r) && self.nodes[*r].points.intersection(&set).count() >= threshold
            });
            match next {
                Some(r) => {
                    set.extend(self.nodes[r].points.iter().copied());
                    roots.push(r);
                }
                None => break,
            }
        }
        MergePlan {
            kind: self.kind,
            roots,
            points: set,
        }
    }

    fn commit(&mut self, plan: MergePlan, statement_points: &[PointId], why: Vec<StatementId>) -> (usize, Vec<Merge>) {
        // Every point of every absorbed class moves onto the merged object.
        let mut justification = why;
        for &r in &plan.roots {
            if let Some(extra) = self.why_on(r, &self.nodes[r].points) {
                justification.extend(extra);
            }
        }
        justification.sort_unstable();
        justification.dedup();

        let incidence = Incidence {
            points: plan.points.clone(),
            why: justification.clone(),
        };

        let Some(target) = plan
            .roots
            .iter()
            .copied()
            .max_by_key(|&r| (self.nodes[r].points.len(), std::cmp::Reverse(r)))
        else {
            let defining: Vec<PointId> = statement_points
                .iter()
                .copied()
                .take(self.kind.threshold())
                .collect();
            let id = self.create(plan.points, defining, vec![incidence]);
            return (id, Vec::new());
        };

        let mut merges = Vec::new();
        for &r in plan.roots.iter().filter(|&&r| r != target) {
            self.nodes[r].parent = target;
            let incidences = std::mem::take(&mut self.nodes[r].incidences);
            self.nodes[target].incidences.extend(incidences);
            merges.push(Merge {
                kept: target as u32,
                absorbed: r as u32,
                why: justification.clone(),
            });
        }
        let added: Vec<PointId> = plan
            .points
            .iter()
            .copied()
            .filter(|p| !self.nodes[target].points.contains(p))
            .collect();
        for p in added {
            self.nodes[target].points.insert(p);
            self.memberships.entry(p).or_default().push(target);
        }
        self.nodes[target].incidences.push(incidence);
        (target, merges)
    }

    /// Statements proving that `targets` lie on the class rooted at `root`
    ///
    /// Grows a covered set one incidence at a time; each incidence added
    /// must share at least `threshold` points with what is already covered.
    fn why_on(&self, root: usize, targets: &BTreeSet<PointId>) -> Option<Vec<StatementId>> {
        let threshold = self.kind.threshold();
        if targets.len() <= threshold {
            return Some(Vec::new());
        }
        let incidences = &self.nodes[root].incidences;
        let mut used = vec![false; incidences.len()];
        let mut covered: BTreeSet<PointId> = BTreeSet::new();
        let mut why: Vec<StatementId> = Vec::new();
        while !targets.is_subset(&covered) {
            let mut best: Option<(usize, (bool, std::cmp::Reverse<usize>, usize))> = None;
            for (i, inc) in incidences.iter().enumerate() {
                if used[i] {
                    continue;
                }
                if !covered.is_empty() && inc.points.intersection(&covered).count() < threshold {
                    continue;
                }
                let gain = inc
                    .points
                    .iter()
                    .filter(|p| targets.contains(p) && !covered.contains(p))
                    .count();
                let score = (gain > 0, std::cmp::Reverse(inc.why.len()), gain);
                if best.as_ref().map_or(true, |(_, s)| score > *s) {
                    best = Some((i, score));
                }
            }
            let (i, _) = best?;
            used[i] = true;
            covered.extend(incidences[i].points.iter().copied());
            why.extend(incidences[i].why.iter().copied());
        }
        why.sort_unstable();
        why.dedup();
        Some(why)
    }

    fn classes(&self) -> Vec<usize> {
        (0..self.nodes.len()).filter(|&n| self.nodes[n].parent == n).collect()
    }
}

/// Points with coordinates plus the line and circle classes over them
#[derive(Debug, Clone)]
pub struct SymbolGraph {
    coords: CoordinateStore,
    tolerance: Tolerance,
    lines: ObjectArena,
    circles: ObjectArena,
    ncoll: Vec<[PointId; 3]>,
}

impl SymbolGraph {
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            coords: CoordinateStore::new(),
            tolerance,
            lines: ObjectArena::new(ObjectKind::Line),
            circles: ObjectArena::new(ObjectKind::Circle),
            ncoll: Vec::new(),
        }
    }

    pub fn add_point(&mut self, point: PointId, at: Point2D) {
        self.coords.set(point, at);
    }

    pub fn coords(&self) -> &CoordinateStore {
        &self.coords
    }

    pub fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    fn arena(&self, kind: ObjectKind) -> &ObjectArena {
        match kind {
            ObjectKind::Line => &self.lines,
            ObjectKind::Circle => &self.circles,
        }
    }

    fn arena_mut(&mut self, kind: ObjectKind) -> &mut ObjectArena {
        match kind {
            ObjectKind::Line => &mut self.lines,
            ObjectKind::Circle => &mut self.circles,
        }
    }

    /// Line class through `a` and `b`, with the statements identifying it
    /// with the class's defining line
    pub fn line_through(&self, a: PointId, b: PointId) -> Option<(LineId, Vec<StatementId>)> {
        let root = self.lines.containing(&[a, b])?;
        let mut targets: BTreeSet<PointId> = [a, b].into_iter().collect();
        targets.extend(self.lines.nodes[root].defining.iter().copied());
        let why = self.lines.why_on(root, &targets)?;
        Some((LineId(root as u32), why))
    }

    /// Line class through `a` and `b`, without its justification
    pub fn find_line(&self, a: PointId, b: PointId) -> Option<LineId> {
        self.lines.containing(&[a, b]).map(|r| LineId(r as u32))
    }

    /// Existing line through `a` and `b`, or a fresh bare node
    pub fn ensure_line(&mut self, a: PointId, b: PointId) -> (LineId, Vec<StatementId>) {
        if let Some(found) = self.line_through(a, b) {
            return found;
        }
        let id = self.lines.create([a, b].into_iter().collect(), vec![a, b], Vec::new());
        (LineId(id as u32), Vec::new())
    }

    /// Class of a line node
    pub fn line_root(&self, line: LineId) -> LineId {
        LineId(self.lines.find(line.0 as usize) as u32)
    }

    pub fn same_line(&self, l1: LineId, l2: LineId) -> bool {
        self.line_root(l1) == self.line_root(l2)
    }

    /// Points defining a line node
    pub fn line_defining(&self, line: LineId) -> Option<(PointId, PointId)> {
        match self.lines.nodes.get(line.0 as usize)?.defining.as_slice() {
            [a, b, ..] => Some((*a, *b)),
            _ => None,
        }
    }

    /// Points on the class of `line`
    pub fn points_on(&self, line: LineId) -> &BTreeSet<PointId> {
        &self.lines.nodes[self.lines.find(line.0 as usize)].points
    }

    /// Line classes with their points
    pub fn line_classes(&self) -> Vec<(LineId, &BTreeSet<PointId>)> {
        self.lines
            .classes()
            .into_iter()
            .map(|r| (LineId(r as u32), &self.lines.nodes[r].points))
            .collect()
    }

    /// Circle classes with their points
    pub fn circle_classes(&self) -> Vec<(CircleId, &BTreeSet<PointId>)> {
        self.circles
            .classes()
            .into_iter()
            .map(|r| (CircleId(r as u32), &self.circles.nodes[r].points))
            .collect()
    }

    /// Check that `points` may be placed on one object
    pub fn plan(&self, kind: ObjectKind, points: &[PointId]) -> EngineResult<MergePlan> {
        let plan = self.arena(kind).plan(points);
        let coords = self
            .coords
            .resolve(&plan.points.iter().copied().collect::<Vec<_>>())
            .ok_or_else(|| EngineError::GraphInconsistency("point without coordinates".to_string()))?;
        let consistent = match kind {
            ObjectKind::Line => self.numerically_collinear(&coords),
            ObjectKind::Circle => self.numerically_concyclic(&coords),
        };
        if !consistent {
            return Err(EngineError::GraphInconsistency(format!(
                "{kind:?} through {} points is numerically inconsistent",
                plan.points.len()
            )));
        }
        if kind == ObjectKind::Line {
            if let Some(triple) = self.ncoll.iter().find(|t| t.iter().all(|p| plan.points.contains(p))) {
                return Err(EngineError::GraphInconsistency(format!(
                    "{} {} {} are registered as not collinear",
                    triple[0], triple[1], triple[2]
                )));
            }
        }
        Ok(plan)
    }

    /// Apply a plan produced by [`SymbolGraph::plan`]
    ///
    /// Returns the surviving class and the node pairs whose variables the
    /// algebraic tables must now identify.
    pub fn commit(&mut self, plan: MergePlan, statement_points: &[PointId], why: Vec<StatementId>) -> (u32, Vec<Merge>) {
        let kind = plan.kind;
        let (root, merges) = self.arena_mut(kind).commit(plan, statement_points, why);
        (root as u32, merges)
    }

    /// Remember three points that must never become collinear
    pub fn register_ncoll(&mut self, points: [PointId; 3]) -> EngineResult<()> {
        if self.lines.containing(&points).is_some() {
            return Err(EngineError::GraphInconsistency(format!(
                "{} {} {} already lie on one line",
                points[0], points[1], points[2]
            )));
        }
        self.ncoll.push(points);
        Ok(())
    }

    /// Symbolic collinearity
    pub fn are_collinear(&self, points: &[PointId]) -> bool {
        distinct(points).len() <= 2 || self.lines.containing(points).is_some()
    }

    pub fn why_collinear(&self, points: &[PointId]) -> Option<Vec<StatementId>> {
        self.why_on(ObjectKind::Line, points)
    }

    /// Symbolic concyclicity
    pub fn are_concyclic(&self, points: &[PointId]) -> bool {
        distinct(points).len() <= 3 || self.circles.containing(points).is_some()
    }

    pub fn why_concyclic(&self, points: &[PointId]) -> Option<Vec<StatementId>> {
        self.why_on(ObjectKind::Circle, points)
    }

    fn why_on(&self, kind: ObjectKind, points: &[PointId]) -> Option<Vec<StatementId>> {
        let targets = distinct(points);
        if targets.len() <= kind.threshold() {
            return Some(Vec::new());
        }
        let arena = self.arena(kind);
        let root = arena.containing(points)?;
        arena.why_on(root, &targets)
    }

    fn numerically_collinear(&self, coords: &[Point2D]) -> bool {
        let tol = &self.tolerance;
        let Some(&first) = coords.first() else {
            return true;
        };
        let Some(&second) = coords.iter().find(|p| !ops::coincide(first, **p, tol)) else {
            return true;
        };
        coords.iter().all(|&p| ops::are_collinear(first, second, p, tol))
    }

    fn numerically_concyclic(&self, coords: &[Point2D]) -> bool {
        let tol = &self.tolerance;
        if coords.len() < 4 {
            return true;
        }
        match ops::circumcenter(coords[0], coords[1], coords[2], tol) {
            Some(center) => {
                let r = center.distance(&coords[0]);
                coords.iter().all(|p| tol.close_enough(center.distance(p), r))
            }
            None => false,
        }
    }
}

fn distinct(points: &[PointId]) -> BTreeSet<PointId> {
    points.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Points 0..=4 on the x-axis, 5 and 6 off it, 7..=9 on the unit circle
    fn graph() -> SymbolGraph {
        let mut g = SymbolGraph::new(Tolerance::default());
        for i in 0..5 {
            g.add_point(PointId(i), Point2D::new(i as f64, 0.0));
        }
        g.add_point(PointId(5), Point2D::new(0.0, 1.0));
        g.add_point(PointId(6), Point2D::new(2.0, 3.0));
        g.add_point(PointId(7), Point2D::new(-1.0, 0.0));
        g.add_point(PointId(8), Point2D::new(0.6, 0.8));
        g.add_point(PointId(9), Point2D::new(0.0, -1.0));
        g
    }

    fn p(ids: &[u32]) -> Vec<PointId> {
        ids.iter().map(|&i| PointId(i)).collect()
    }

    fn coll(g: &mut SymbolGraph, ids: &[u32], why: u32) -> (u32, Vec<Merge>) {
        let points = p(ids);
        let plan = g.plan(ObjectKind::Line, &points).unwrap();
        g.commit(plan, &points, vec![StatementId(why)])
    }

    #[test]
    fn test_collinear_creates_class() {
        let mut g = graph();
        let (root, merges) = coll(&mut g, &[0, 1, 2], 0);

        assert!(merges.is_empty());
        assert!(g.are_collinear(&p(&[2, 0, 1])));
        assert_eq!(g.why_collinear(&p(&[0, 1, 2])), Some(vec![StatementId(0)]));
        assert_eq!(g.line_through(PointId(0), PointId(2)).map(|(l, _)| l.0), Some(root));
    }

    #[test]
    fn test_chaining_merges_classes() {
        let mut g = graph();
        coll(&mut g, &[0, 1, 2], 0);
        coll(&mut g, &[2, 3, 4], 1);
        assert!(!g.are_collinear(&p(&[0, 1, 4])), "one shared point is not enough");

        let (_, merges) = coll(&mut g, &[1, 2, 3], 2);
        assert_eq!(merges.len(), 1);
        assert!(g.are_collinear(&p(&[0, 1, 4])));
        assert_eq!(g.line_classes().len(), 1);

        let why = g.why_collinear(&p(&[0, 1, 4])).unwrap();
        assert!(why.contains(&StatementId(0)) && why.contains(&StatementId(1)));
    }

    #[test]
    fn test_bare_line_absorbed() {
        let mut g = graph();
        let (bare, why) = g.ensure_line(PointId(3), PointId(4));
        assert!(why.is_empty());

        let (root, merges) = coll(&mut g, &[2, 3, 4], 0);
        assert!(merges.is_empty() || merges[0].absorbed == bare.0 || merges[0].kept == bare.0);
        assert!(g.same_line(bare, LineId(root)));
        let (_, why) = g.line_through(PointId(2), PointId(4)).unwrap();
        assert_eq!(why, vec![StatementId(0)]);
    }

    #[test]
    fn test_numeric_inconsistency_rejected() {
        let g = graph();
        let err = g.plan(ObjectKind::Line, &p(&[0, 1, 5])).unwrap_err();
        assert!(matches!(err, EngineError::GraphInconsistency(_)));
    }

    #[test]
    fn test_ncoll_guard() {
        let mut g = graph();
        coll(&mut g, &[0, 1, 2], 0);
        assert!(g.register_ncoll([PointId(0), PointId(1), PointId(2)]).is_err());
        assert!(g.register_ncoll([PointId(0), PointId(1), PointId(5)]).is_ok());
    }

    #[test]
    fn test_concyclic_classes() {
        let mut g = graph();
        let circle = p(&[1, 5, 7, 8]);
        let plan = g.plan(ObjectKind::Circle, &circle).unwrap();
        g.commit(plan, &circle, vec![StatementId(3)]);

        let second = p(&[5, 7, 8, 9]);
        let plan = g.plan(ObjectKind::Circle, &second).unwrap();
        let (_, merges) = g.commit(plan, &second, vec![StatementId(4)]);
        assert_eq!(merges.len(), 0, "one class grows in place");

        assert!(g.are_concyclic(&p(&[1, 7, 8, 9])));
        assert_eq!(
            g.why_concyclic(&p(&[1, 7, 8, 9])),
            Some(vec![StatementId(3), StatementId(4)])
        );
        assert!(g.plan(ObjectKind::Circle, &p(&[1, 5, 7, 6])).is_err());
    }
}
