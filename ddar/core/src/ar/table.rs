//! Keyed table of variables with pairwise and four-term equations
//!
//! Level one is a weighted union-find over the variables. Level two is a
//! congruence over *terms*, differences `x_a - x_b` and sums `x_a + x_b` of
//! level-one roots, built from every stored equation `x_a - x_b = x_c - x_d`.
//! Two terms that end up related and share a root collapse into a new
//! level-one edge, and the table settles by alternating both levels until no
//! level-one component changes.

use super::group::Group;
use super::union_find::{Conflict, Union, WeightedUnionFind};
use crate::error::{EngineError, EngineResult};
use crate::ir::StatementId;
use rustc_hash::FxHashMap;
use std::hash::Hash;

/// A relation between two keys that became derivable
#[derive(Debug, Clone, PartialEq)]
pub struct Closure<K, G> {
    pub a: K,
    pub b: K,
    /// `x_a - x_b`
    pub offset: G,
    pub why: Vec<StatementId>,
}

#[derive(Debug, Clone)]
struct Equation {
    vars: [usize; 4],
    why: Vec<StatementId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TermKey {
    /// `x_a - x_b` with `a < b`
    Diff(usize, usize),
    /// `x_a + x_b` with `a <= b`
    Sum(usize, usize),
}

/// Level-one view of `x_a - x_b - x_c + x_d = rhs` over component roots
#[derive(Debug, Clone, Copy)]
struct Reduced<G> {
    roots: [usize; 4],
    rhs: G,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Every root cancels
    Constant,
    /// `x_pos - x_neg` remains
    Pair(usize, usize),
    General,
}

impl<G: Group> Reduced<G> {
    fn shape(&self) -> Shape {
        let [a, b, c, d] = self.roots;
        let mut coeffs: Vec<(usize, i32)> = Vec::with_capacity(4);
        for (root, sign) in [(a, 1), (b, -1), (c, -1), (d, 1)] {
            match coeffs.iter_mut().find(|(r, _)| *r == root) {
                Some((_, k)) => *k += sign,
                None => coeffs.push((root, sign)),
            }
        }
        coeffs.retain(|(_, k)| *k != 0);
        match coeffs.as_slice() {
            [] => Shape::Constant,
            [(p, 1), (n, -1)] | [(n, -1), (p, 1)] => Shape::Pair(*p, *n),
            _ => Shape::General,
        }
    }

    /// Term pairs `(t1, t2)` with `t1 - t2 = rhs`
    fn arrangements(&self) -> Vec<(TermKey, TermKey)> {
        let [a, b, c, d] = self.roots;
        let mut out = vec![(sum(a, d), sum(b, c))];
        // (x_a - x_b) - (x_c - x_d) and (x_a - x_c) - (x_b - x_d)
        for (p, q, r, s) in [(a, b, c, d), (a, c, b, d)] {
            if p == q || r == s {
                continue;
            }
            if p < q && r < s {
                out.push((TermKey::Diff(p, q), TermKey::Diff(r, s)));
            } else if p > q && r > s {
                out.push((TermKey::Diff(s, r), TermKey::Diff(q, p)));
            }
        }
        out
    }
}

fn sum(a: usize, b: usize) -> TermKey {
    TermKey::Sum(a.min(b), a.max(b))
}

#[derive(Debug, Clone)]
struct Terms<G: Group> {
    index: FxHashMap<TermKey, usize>,
    keys: Vec<TermKey>,
    uf: WeightedUnionFind<G>,
}

impl<G: Group> Default for Terms<G> {
    fn default() -> Self {
        Self {
            index: FxHashMap::default(),
            keys: Vec::new(),
            uf: WeightedUnionFind::new(),
        }
    }
}

impl<G: Group> Terms<G> {
    fn node(&mut self, key: TermKey) -> usize {
        if let Some(&n) = self.index.get(&key) {
            return n;
        }
        let n = self.uf.add_var();
        self.index.insert(key, n);
        self.keys.push(key);
        n
    }
}

/// Value class of a difference `x_a - x_b`
///
/// Two differences with equal classes are equal. The converse only holds
/// for `Known` values and for term classes built from plain differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DifferenceClass<G> {
    /// Both keys share a component
    Known(G),
    /// `±t + offset`, where `t` is a class of related root differences
    Term { class: usize, negated: bool, offset: G },
    /// `±(x_s - x_t) + offset` for two unrelated roots `s < t`
    Free { s: usize, t: usize, negated: bool, offset: G },
}

/// Variables keyed by geometric objects, with their known differences
#[derive(Debug, Clone)]
pub struct Table<K, G: Group> {
    name: &'static str,
    keys: Vec<K>,
    index: FxHashMap<K, usize>,
    uf: WeightedUnionFind<G>,
    equations: Vec<Equation>,
    terms: Terms<G>,
}

impl<K: Clone + Eq + Hash, G: Group> Table<K, G> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            keys: Vec::new(),
            index: FxHashMap::default(),
            uf: WeightedUnionFind::new(),
            equations: Vec::new(),
            terms: Terms::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Variable of `key`, created on first use
    pub fn var(&mut self, key: K) -> usize {
        if let Some(&v) = self.index.get(&key) {
            return v;
        }
        let v = self.uf.add_var();
        self.index.insert(key.clone(), v);
        self.keys.push(key);
        v
    }

    pub fn lookup(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn contradiction(&self, conflict: Conflict<G>) -> EngineError {
        EngineError::AlgebraicContradiction {
            table: self.name,
            detail: format!("known difference {} but {} was stated", conflict.known, conflict.stated),
        }
    }

    /// Would `x_a - x_b = offset` contradict the table?
    pub fn check(&self, a: &K, b: &K, offset: G) -> EngineResult<()> {
        match (self.lookup(a), self.lookup(b)) {
            (Some(i), Some(j)) => self.uf.check(i, j, offset).map_err(|c| self.contradiction(c)),
            _ => Ok(()),
        }
    }

    /// Record `x_a - x_b = offset`; returns whether two components merged
    ///
    /// A conflict found while settling the four-term equations leaves the
    /// table as it was.
    pub fn ingest(&mut self, a: K, b: K, offset: G, why: Vec<StatementId>) -> EngineResult<bool> {
        self.check(&a, &b, offset)?;
        if self.equations.is_empty() {
            return self.union_keys(a, b, offset, why);
        }
        self.atomically(|table| {
            let merged = table.union_keys(a, b, offset, why)?;
            if merged {
                table.settle()?;
            }
            Ok(merged)
        })
    }

    fn union_keys(&mut self, a: K, b: K, offset: G, why: Vec<StatementId>) -> EngineResult<bool> {
        let i = self.var(a);
        let j = self.var(b);
        match self.uf.union(i, j, offset, why) {
            Ok(Union::Merged) => Ok(true),
            Ok(Union::Redundant) => Ok(false),
            Err(c) => Err(self.contradiction(c)),
        }
    }

    /// Apply `change`, restoring the table if it fails
    fn atomically<T>(&mut self, change: impl FnOnce(&mut Self) -> EngineResult<T>) -> EngineResult<T> {
        let saved = self.clone();
        let result = change(self);
        if result.is_err() {
            *self = saved;
        }
        result
    }

    /// Would `x_a - x_b = x_c - x_d` contradict the table?
    pub fn check4(&self, keys: [&K; 4]) -> EngineResult<()> {
        let reduced = self.reduce_keys(keys);
        match reduced.shape() {
            Shape::Constant if !reduced.rhs.is_identity() => Err(self.contradiction(Conflict {
                known: G::identity(),
                stated: reduced.rhs,
            })),
            _ => Ok(()),
        }
    }

    /// Record `x_a - x_b = x_c - x_d`
    ///
    /// Rejected, with the table unchanged, when the equation contradicts a
    /// known difference directly or once the equations are settled.
    pub fn ingest4(&mut self, keys: [K; 4], why: Vec<StatementId>) -> EngineResult<()> {
        self.check4([&keys[0], &keys[1], &keys[2], &keys[3]])?;
        self.atomically(|table| {
            let [a, b, c, d] = keys;
            let vars = [table.var(a), table.var(b), table.var(c), table.var(d)];
            table.equations.push(Equation { vars, why });
            table.settle()
        })
    }

    /// Known `x_a - x_b`
    pub fn difference(&self, a: &K, b: &K) -> Option<G> {
        if a == b {
            return Some(G::identity());
        }
        self.uf.difference(self.lookup(a)?, self.lookup(b)?)
    }

    /// Class of `x_a - x_b`, for grouping equal differences
    pub fn difference_class(&self, a: &K, b: &K) -> Option<DifferenceClass<G>> {
        let (ra, pa) = self.uf.find(self.lookup(a)?);
        let (rb, pb) = self.uf.find(self.lookup(b)?);
        // x_a - x_b = x_ra - x_rb + (p_a - p_b)
        let delta = pa.difference(&pb);
        if ra == rb {
            return Some(DifferenceClass::Known(delta));
        }
        let (s, t, negated) = if ra < rb { (ra, rb, false) } else { (rb, ra, true) };
        let Some(&node) = self.terms.index.get(&TermKey::Diff(s, t)) else {
            return Some(DifferenceClass::Free { s, t, negated, offset: delta });
        };
        // x_s - x_t = x_class + p_node
        let (class, p) = self.terms.uf.find(node);
        let offset = if negated { delta.difference(&p) } else { p.combine(&delta) };
        Some(DifferenceClass::Term { class, negated, offset })
    }

    /// Known `x_a - x_b` with its justification
    pub fn explain(&self, a: &K, b: &K) -> Option<(G, Vec<StatementId>)> {
        if a == b {
            return Some((G::identity(), Vec::new()));
        }
        self.uf.explain(self.lookup(a)?, self.lookup(b)?)
    }

    /// Does `x_a - x_b = x_c - x_d` follow from the table?
    pub fn holds4(&self, keys: [&K; 4]) -> bool {
        self.witness(keys).is_some()
    }

    /// Justification of `x_a - x_b = x_c - x_d`
    pub fn explain4(&self, keys: [&K; 4]) -> Option<Vec<StatementId>> {
        let witness = self.witness(keys)?;
        let mut why = Vec::new();
        for key in keys {
            if let Some(v) = self.lookup(key) {
                why.extend(self.anchor(v));
            }
        }
        if let Some((n1, n2)) = witness {
            let (_, path) = self.terms.uf.explain(n1, n2)?;
            why.extend(path);
        }
        why.sort_unstable();
        why.dedup();
        Some(why)
    }

    /// `Some(None)` when the equation cancels at level one,
    /// `Some(Some((t1, t2)))` when two related terms prove it
    fn witness(&self, keys: [&K; 4]) -> Option<Option<(usize, usize)>> {
        let reduced = self.reduce_keys(keys);
        if reduced.shape() == Shape::Constant {
            return reduced.rhs.is_identity().then_some(None);
        }
        reduced.arrangements().into_iter().find_map(|(k1, k2)| {
            let n1 = *self.terms.index.get(&k1)?;
            let n2 = *self.terms.index.get(&k2)?;
            (self.terms.uf.difference(n1, n2)? == reduced.rhs).then_some(Some((n1, n2)))
        })
    }

    /// Relations discovered since the last drain
    pub fn drain_closures(&mut self) -> Vec<Closure<K, G>> {
        let fresh = self.uf.drain_fresh();
        fresh
            .into_iter()
            .filter_map(|(i, j)| {
                let (offset, why) = self.uf.explain(i, j)?;
                Some(Closure {
                    a: self.keys.get(i)?.clone(),
                    b: self.keys.get(j)?.clone(),
                    offset,
                    why,
                })
            })
            .collect()
    }

    /// Components with each member's offset to the component root
    pub fn components(&self) -> Vec<Vec<(K, G)>> {
        let mut by_root: FxHashMap<usize, Vec<(K, G)>> = FxHashMap::default();
        let mut order = Vec::new();
        for (v, key) in self.keys.iter().enumerate() {
            let (root, offset) = self.uf.find(v);
            by_root
                .entry(root)
                .or_insert_with(|| {
                    order.push(root);
                    Vec::new()
                })
                .push((key.clone(), offset));
        }
        order
            .into_iter()
            .filter_map(|root| by_root.remove(&root))
            .collect()
    }

    /// Path from a variable to its current root
    fn anchor(&self, v: usize) -> Vec<StatementId> {
        let (root, _) = self.uf.find(v);
        self.uf.explain(v, root).map(|(_, why)| why).unwrap_or_default()
    }

    fn reduce_vars(&self, vars: [usize; 4]) -> Reduced<G> {
        let found = vars.map(|v| self.uf.find(v));
        self.reduce_found(found)
    }

    fn reduce_keys(&self, keys: [&K; 4]) -> Reduced<G> {
        // Unknown keys are isolated; equal unknown keys share a placeholder root.
        let mut found = [(0usize, G::identity()); 4];
        for (slot, key) in keys.iter().enumerate() {
            found[slot] = match self.lookup(key) {
                Some(v) => self.uf.find(v),
                None => {
                    let first = keys.iter().position(|k| k == key).unwrap_or(slot);
                    (usize::MAX - first, G::identity())
                }
            };
        }
        self.reduce_found(found)
    }

    fn reduce_found(&self, found: [(usize, G); 4]) -> Reduced<G> {
        let [(ra, pa), (rb, pb), (rc, pc), (rd, pd)] = found;
        // x_a - x_b - x_c + x_d = 0 with x_v = x_root + p_v
        let eps = pa.difference(&pb).difference(&pc).combine(&pd);
        Reduced {
            roots: [ra, rb, rc, rd],
            rhs: eps.inverse(),
        }
    }

    /// Alternate term rebuilding and promotion until level one is stable
    fn settle(&mut self) -> EngineResult<()> {
        loop {
            self.rebuild_terms()?;
            let promotions = self.promotions()?;
            let mut merged = false;
            for (p, n, offset, why) in promotions {
                match self.uf.union(p, n, offset, why) {
                    Ok(Union::Merged) => merged = true,
                    Ok(Union::Redundant) => {}
                    Err(conflict) => {
                        tracing::debug!(table = self.name, "promoted relation contradicts a known difference");
                        return Err(self.contradiction(conflict));
                    }
                }
            }
            if !merged {
                return Ok(());
            }
        }
    }

    fn rebuild_terms(&mut self) -> EngineResult<()> {
        let mut terms = Terms::default();
        for eq in &self.equations {
            let reduced = self.reduce_vars(eq.vars);
            if reduced.shape() != Shape::General {
                continue;
            }
            let mut why = eq.why.clone();
            for &v in &eq.vars {
                why.extend(self.anchor(v));
            }
            why.sort_unstable();
            why.dedup();
            for (k1, k2) in reduced.arrangements() {
                let n1 = terms.node(k1);
                let n2 = terms.node(k2);
                if let Err(conflict) = terms.uf.union(n1, n2, reduced.rhs, why.clone()) {
                    return Err(self.contradiction(conflict));
                }
            }
        }
        terms.uf.clear_fresh();
        self.terms = terms;
        Ok(())
    }

    /// Level-one edges implied by the equations and the term classes
    fn promotions(&self) -> EngineResult<Vec<(usize, usize, G, Vec<StatementId>)>> {
        let mut out = Vec::new();

        for eq in &self.equations {
            let reduced = self.reduce_vars(eq.vars);
            match reduced.shape() {
                Shape::Pair(p, n) => {
                    let mut why = eq.why.clone();
                    for &v in &eq.vars {
                        why.extend(self.anchor(v));
                    }
                    why.sort_unstable();
                    why.dedup();
                    out.push((p, n, reduced.rhs, why));
                }
                Shape::Constant if !reduced.rhs.is_identity() => {
                    return Err(self.contradiction(Conflict {
                        known: G::identity(),
                        stated: reduced.rhs,
                    }));
                }
                _ => {}
            }
        }

        // Two related terms sharing a root leave a plain difference behind.
        let mut seen: FxHashMap<(usize, u8, usize), usize> = FxHashMap::default();
        for (node, key) in self.terms.keys.iter().enumerate() {
            let (component, _) = self.terms.uf.find(node);
            let sides: Vec<(u8, usize, usize)> = match *key {
                TermKey::Diff(a, b) => vec![(0, a, b), (1, b, a)],
                TermKey::Sum(a, b) => vec![(2, a, b), (2, b, a)],
            };
            for (side, shared, other) in sides {
                let first = match seen.get(&(component, side, shared)).copied() {
                    Some(first) => first,
                    None => {
                        seen.insert((component, side, shared), node);
                        continue;
                    }
                };
                let Some((delta, why)) = self.terms.uf.explain(first, node) else {
                    continue;
                };
                let first_other = match self.terms.keys[first] {
                    TermKey::Diff(a, b) => {
                        if side == 0 {
                            b
                        } else {
                            a
                        }
                    }
                    TermKey::Sum(a, b) => {
                        if a == shared {
                            b
                        } else {
                            a
                        }
                    }
                };
                // side 0: (x_s - x_f) - (x_s - x_o) = x_o - x_f
                // side 1: (x_f - x_s) - (x_o - x_s) = x_f - x_o
                // sums:   (x_s + x_f) - (x_s + x_o) = x_f - x_o
                let (p, n) = if side == 0 {
                    (other, first_other)
                } else {
                    (first_other, other)
                };
                if p == n {
                    continue;
                }
                match self.uf.difference(p, n) {
                    Some(known) if known != delta => {
                        return Err(self.contradiction(Conflict { known, stated: delta }));
                    }
                    Some(_) => {}
                    None => out.push((p, n, delta, why)),
                }
            }
        }
        Ok(out)
    }
}
