//! Argument tuples for which a predicate is known to hold

use super::ProofState;
use crate::ar::{Angle, DifferenceClass, Group, Ratio};
use crate::ir::{LineId, PointId, Predicate};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

impl ProofState {
    /// Known instances of `predicate`, read off the graph and the tables
    ///
    /// Returns `None` for predicates that have no compact index; callers
    /// fall back to trying point tuples against [`ProofState::holds`]. The
    /// tuples returned are in no particular arrangement of their symmetry
    /// group.
    pub fn enumerate(&self, predicate: Predicate) -> Option<Vec<Vec<PointId>>> {
        match predicate {
            Predicate::Coll => Some(
                self.graph
                    .line_classes()
                    .into_iter()
                    .flat_map(|(_, points)| subsets(points, 3))
                    .collect(),
            ),
            Predicate::Cyclic => Some(
                self.graph
                    .circle_classes()
                    .into_iter()
                    .flat_map(|(_, points)| subsets(points, 4))
                    .collect(),
            ),
            Predicate::Para => Some(self.line_pairs(Angle::zero())),
            Predicate::Perp => Some(self.line_pairs(Angle::right())),
            Predicate::Cong => Some(self.equal_segments()),
            Predicate::EqAngle => Some(self.equal_angles()),
            Predicate::SimTri | Predicate::SimTri2 => Some(
                self.deps
                    .of_predicate(predicate)
                    .iter()
                    .filter_map(|&id| self.deps.statement(id))
                    .map(|s| s.args().to_vec())
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Point pairs on two distinct line classes at angle `target`
    fn line_pairs(&self, target: Angle) -> Vec<Vec<PointId>> {
        let mut out = Vec::new();
        for component in self.angles.components() {
            // Every node of a class carries the offset of the class.
            let mut classes: Vec<(LineId, Angle)> = Vec::new();
            for (line, offset) in component {
                let root = self.graph.line_root(line);
                if !classes.iter().any(|(r, _)| *r == root) {
                    classes.push((root, offset));
                }
            }
            for (i, &(l1, o1)) in classes.iter().enumerate() {
                for &(l2, o2) in &classes[i + 1..] {
                    if o2.difference(&o1) != target {
                        continue;
                    }
                    let first = subsets(self.graph.points_on(l1), 2);
                    let second = subsets(self.graph.points_on(l2), 2);
                    for p in &first {
                        for q in &second {
                            out.push([p.as_slice(), q.as_slice()].concat());
                        }
                    }
                }
            }
        }
        out
    }

    /// Tuples `a b c d e f g h` with ∠(ab, cd) = ∠(ef, gh)
    ///
    /// Angles between distinct line classes are grouped by their class in
    /// the angle table and confirmed pairwise. An angle compared with itself
    /// only yields non-trivial tuples when one of its lines has a third
    /// point, so other lines are skipped there.
    fn equal_angles(&self) -> Vec<Vec<PointId>> {
        let mut out = Vec::new();
        let classes = self.graph.line_classes();

        for (i, &(_, p1)) in classes.iter().enumerate() {
            for &(_, p2) in &classes[i + 1..] {
                if p1.len() > 2 || p2.len() > 2 {
                    push_angle_tuples([p1, p2, p1, p2], &mut out);
                }
            }
        }

        let lines: Vec<LineId> = classes
            .iter()
            .map(|&(line, _)| line)
            .filter(|line| self.angles.lookup(line).is_some())
            .collect();
        // ∠(l1, l2) reads x_l2 - x_l1
        let mut groups: FxHashMap<DifferenceClass<Angle>, Vec<(LineId, LineId)>> = FxHashMap::default();
        for &l1 in &lines {
            for &l2 in &lines {
                if l1 == l2 {
                    continue;
                }
                if let Some(class) = self.angles.difference_class(&l2, &l1) {
                    groups.entry(class).or_default().push((l1, l2));
                }
            }
        }
        for pairs in groups.values() {
            for (i, &(l1, l2)) in pairs.iter().enumerate() {
                for &(l3, l4) in &pairs[i + 1..] {
                    if !self.angles.holds4([&l2, &l1, &l4, &l3]) {
                        continue;
                    }
                    let points = [l1, l2, l3, l4].map(|l| self.graph.points_on(l));
                    push_angle_tuples(points, &mut out);
                }
            }
        }
        out
    }

    /// Pairs of segments with equal length
    fn equal_segments(&self) -> Vec<Vec<PointId>> {
        let mut out = Vec::new();
        for component in self.ratios.components() {
            let mut by_offset: FxHashMap<Ratio, Vec<(PointId, PointId)>> = FxHashMap::default();
            for (segment, offset) in component {
                by_offset.entry(offset).or_default().push(segment.endpoints());
            }
            for segments in by_offset.values() {
                for (i, &(a, b)) in segments.iter().enumerate() {
                    for &(c, d) in &segments[i + 1..] {
                        out.push(vec![a, b, c, d]);
                    }
                }
            }
        }
        out
    }
}

/// Every choice of a point pair on each of four lines
fn push_angle_tuples(lines: [&BTreeSet<PointId>; 4], out: &mut Vec<Vec<PointId>>) {
    let [p1, p2, p3, p4] = lines.map(|points| subsets(points, 2));
    for p in &p1 {
        for q in &p2 {
            for r in &p3 {
                for s in &p4 {
                    out.push([p.as_slice(), q.as_slice(), r.as_slice(), s.as_slice()].concat());
                }
            }
        }
    }
}

/// All `k`-element subsets in increasing order
fn subsets(points: &BTreeSet<PointId>, k: usize) -> Vec<Vec<PointId>> {
    fn extend(points: &[PointId], k: usize, start: usize, prefix: &mut Vec<PointId>, out: &mut Vec<Vec<PointId>>) {
        if prefix.len() == k {
            out.push(prefix.clone());
            return;
        }
        for i in start..points.len() {
            prefix.push(points[i]);
            extend(points, k, i + 1, prefix, out);
            prefix.pop();
        }
    }
    let points: Vec<PointId> = points.iter().copied().collect();
    let mut out = Vec::new();
    extend(&points, k, 0, &mut Vec::with_capacity(k), &mut out);
    out
}
