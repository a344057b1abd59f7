//! Weighted union-find over group-valued potentials
//!
//! Variable `i` stores its offset to its parent, so `x_i - x_root` is the sum
//! of offsets up the parent chain. Alongside the forest, every successful
//! union keeps its original edge with its justification; those edges form a
//! spanning tree of each component and are walked to explain a difference.

use super::group::Group;
use crate::ir::StatementId;
use std::collections::VecDeque;

/// A stated difference `x_from - x_to = offset`
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<G> {
    pub from: usize,
    pub to: usize,
    pub offset: G,
    pub why: Vec<StatementId>,
}

/// Two different offsets implied for the same pair
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict<G> {
    pub known: G,
    pub stated: G,
}

/// Result of a successful union
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Union {
    /// The components were joined
    Merged,
    /// Both variables already shared a component with this offset
    Redundant,
}

#[derive(Debug, Clone)]
pub struct WeightedUnionFind<G: Group> {
    parent: Vec<usize>,
    potential: Vec<G>,
    members: Vec<Vec<usize>>,
    adjacency: Vec<Vec<usize>>,
    edges: Vec<Edge<G>>,
    fresh: Vec<(usize, usize)>,
}

impl<G: Group> Default for WeightedUnionFind<G> {
    fn default() -> Self {
        Self {
            parent: Vec::new(),
            potential: Vec::new(),
            members: Vec::new(),
            adjacency: Vec::new(),
            edges: Vec::new(),
            fresh: Vec::new(),
        }
    }
}

impl<G: Group> WeightedUnionFind<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh singleton variable
    pub fn add_var(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        self.potential.push(G::identity());
        self.members.push(vec![id]);
        self.adjacency.push(Vec::new());
        id
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Root of `i` and `x_i - x_root`
    pub fn find(&self, mut i: usize) -> (usize, G) {
        let mut acc = G::identity();
        while self.parent[i] != i {
            acc = acc.combine(&self.potential[i]);
            i = self.parent[i];
        }
        (i, acc)
    }

    /// `x_i - x_j` when both share a component
    pub fn difference(&self, i: usize, j: usize) -> Option<G> {
        let (ri, pi) = self.find(i);
        let (rj, pj) = self.find(j);
        (ri == rj).then(|| pi.difference(&pj))
    }

    pub fn same_component(&self, i: usize, j: usize) -> bool {
        self.find(i).0 == self.find(j).0
    }

    /// Would `x_i - x_j = offset` contradict what is known?
    pub fn check(&self, i: usize, j: usize, offset: G) -> Result<(), Conflict<G>> {
        match self.difference(i, j) {
            Some(known) if known != offset => Err(Conflict {
                known,
                stated: offset,
            }),
            _ => Ok(()),
        }
    }

    /// Record `x_i - x_j = offset`
    pub fn union(
        &mut self,
        i: usize,
        j: usize,
        offset: G,
        why: Vec<StatementId>,
    ) -> Result<Union, Conflict<G>> {
        let (ri, pi) = self.find(i);
        let (rj, pj) = self.find(j);
        if ri == rj {
            let known = pi.difference(&pj);
            return if known == offset {
                Ok(Union::Redundant)
            } else {
                Err(Conflict {
                    known,
                    stated: offset,
                })
            };
        }

        // x_ri - x_rj = offset - pi + pj
        let root_offset = offset.difference(&pi).combine(&pj);
        let (child, parent, child_offset) = if self.members[ri].len() <= self.members[rj].len() {
            (ri, rj, root_offset)
        } else {
            (rj, ri, root_offset.inverse())
        };

        for &a in &self.members[child] {
            for &b in &self.members[parent] {
                self.fresh.push((a, b));
            }
        }
        let moved = std::mem::take(&mut self.members[child]);
        self.members[parent].extend(moved);
        self.parent[child] = parent;
        self.potential[child] = child_offset;

        let edge = self.edges.len();
        self.edges.push(Edge {
            from: i,
            to: j,
            offset,
            why,
        });
        self.adjacency[i].push(edge);
        self.adjacency[j].push(edge);
        Ok(Union::Merged)
    }

    /// Spanning-tree edges connecting `i` to `j`
    pub fn path(&self, i: usize, j: usize) -> Option<Vec<&Edge<G>>> {
        if i == j {
            return Some(Vec::new());
        }
        if !self.same_component(i, j) {
            return None;
        }
        let mut via: Vec<Option<usize>> = vec![None; self.len()];
        let mut visited = vec![false; self.len()];
        let mut queue = VecDeque::from([i]);
        visited[i] = true;
        while let Some(v) = queue.pop_front() {
            if v == j {
                break;
            }
            for &e in &self.adjacency[v] {
                let edge = &self.edges[e];
                let next = if edge.from == v { edge.to } else { edge.from };
                if !visited[next] {
                    visited[next] = true;
                    via[next] = Some(e);
                    queue.push_back(next);
                }
            }
        }
        let mut out = Vec::new();
        let mut v = j;
        while v != i {
            let e = via[v]?;
            let edge = &self.edges[e];
            out.push(edge);
            v = if edge.to == v { edge.from } else { edge.to };
        }
        out.reverse();
        Some(out)
    }

    /// `x_i - x_j` with the statements it rests on
    pub fn explain(&self, i: usize, j: usize) -> Option<(G, Vec<StatementId>)> {
        let offset = self.difference(i, j)?;
        let mut why: Vec<StatementId> = self
            .path(i, j)?
            .into_iter()
            .flat_map(|e| e.why.iter().copied())
            .collect();
        why.sort_unstable();
        why.dedup();
        Some((offset, why))
    }

    /// Pairs that became related since the last drain
    pub fn drain_fresh(&mut self) -> Vec<(usize, usize)> {
        std::mem::take(&mut self.fresh)
    }

    /// Forget pending pairs without reporting them
    pub fn clear_fresh(&mut self) {
        self.fresh.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::super::group::Angle;
    use super::*;
    use num_rational::Rational64;

    fn angle(n: i64, d: i64) -> Angle {
        Angle::new(Rational64::new(n, d))
    }

    #[test]
    fn test_union_and_difference() {
        let mut uf = WeightedUnionFind::<Angle>::new();
        let (a, b, c) = (uf.add_var(), uf.add_var(), uf.add_var());

        assert_eq!(uf.union(a, b, angle(1, 2), vec![StatementId(0)]), Ok(Union::Merged));
        assert_eq!(uf.union(b, c, angle(1, 3), vec![StatementId(1)]), Ok(Union::Merged));

        assert_eq!(uf.difference(a, c), Some(angle(5, 6)));
        assert_eq!(uf.difference(c, a), Some(angle(1, 6)));
        assert!(uf.same_component(a, c));
    }

    #[test]
    fn test_conflict_leaves_state_untouched() {
        let mut uf = WeightedUnionFind::<Angle>::new();
        let (a, b) = (uf.add_var(), uf.add_var());
        uf.union(a, b, angle(1, 2), vec![]).unwrap();

        assert!(uf.check(a, b, angle(1, 4)).is_err());
        assert_eq!(
            uf.union(a, b, angle(1, 4), vec![]),
            Err(Conflict {
                known: angle(1, 2),
                stated: angle(1, 4)
            })
        );
        assert_eq!(uf.union(a, b, angle(1, 2), vec![]), Ok(Union::Redundant));
        assert_eq!(uf.difference(a, b), Some(angle(1, 2)));
    }

    #[test]
    fn test_explain_walks_spanning_tree() {
        let mut uf = WeightedUnionFind::<Angle>::new();
        let vars: Vec<usize> = (0..4).map(|_| uf.add_var()).collect();
        uf.union(vars[0], vars[1], angle(1, 2), vec![StatementId(7)]).unwrap();
        uf.union(vars[2], vars[3], angle(0, 1), vec![StatementId(8)]).unwrap();
        uf.union(vars[1], vars[3], angle(1, 2), vec![StatementId(9)]).unwrap();

        let (offset, why) = uf.explain(vars[0], vars[2]).unwrap();
        assert_eq!(offset, angle(0, 1));
        assert_eq!(why, vec![StatementId(7), StatementId(8), StatementId(9)]);

        let (_, short) = uf.explain(vars[2], vars[3]).unwrap();
        assert_eq!(short, vec![StatementId(8)]);
    }

    #[test]
    fn test_fresh_pairs_cover_cross_product() {
        let mut uf = WeightedUnionFind::<Angle>::new();
        let vars: Vec<usize> = (0..4).map(|_| uf.add_var()).collect();
        uf.union(vars[0], vars[1], angle(0, 1), vec![]).unwrap();
        uf.drain_fresh();
        uf.union(vars[2], vars[3], angle(0, 1), vec![]).unwrap();
        uf.drain_fresh();
        uf.union(vars[1], vars[2], angle(0, 1), vec![]).unwrap();

        assert_eq!(uf.drain_fresh().len(), 4);
        assert!(uf.drain_fresh().is_empty());
    }
}
