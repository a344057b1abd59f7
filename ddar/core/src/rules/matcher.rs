//! Backtracking search for rule bindings
//!
//! Premises are visited in the rule's plan order. Each level binds the
//! variables its premise introduces, either by unifying the premise with
//! known instances read from the proof state or, for predicates without an
//! index, by trying every point for each new variable. Bindings need not be
//! injective; degenerate instances are filtered when conclusions are built.

use super::{indexed, Rule, Template};
use crate::engine::ProofState;
use crate::ir::{PointId, Predicate, Statement};
use rustc_hash::FxHashMap;

struct Frame {
    depth: usize,
    fresh: Vec<usize>,
    options: Vec<Vec<PointId>>,
    next: usize,
}

/// Lazy iterator over complete bindings of a rule
pub struct Matches<'a> {
    rule: &'a Rule,
    state: &'a ProofState,
    points: Vec<PointId>,
    instances: FxHashMap<Predicate, Vec<Vec<PointId>>>,
    binding: Vec<Option<PointId>>,
    stack: Vec<Frame>,
    started: bool,
}

impl<'a> Matches<'a> {
    pub(super) fn new(rule: &'a Rule, state: &'a ProofState) -> Self {
        let mut instances = FxHashMap::default();
        for t in &rule.premises {
            if indexed(t.predicate) && !instances.contains_key(&t.predicate) {
                let arrangements = state
                    .enumerate(t.predicate)
                    .unwrap_or_default()
                    .into_iter()
                    .flat_map(|args| t.predicate.orbit(&args, None))
                    .map(|(args, _)| args)
                    .collect::<Vec<_>>();
                instances.insert(t.predicate, dedup(arrangements));
            }
        }
        Self {
            rule,
            state,
            points: state.points(),
            instances,
            binding: vec![None; rule.variables.len()],
            stack: Vec::new(),
            started: false,
        }
    }

    fn template(&self, depth: usize) -> &'a Template {
        &self.rule.premises[self.rule.plan[depth]]
    }

    fn frame(&self, depth: usize) -> Frame {
        let template = self.template(depth);
        let mut fresh: Vec<usize> = Vec::new();
        for &v in &template.vars {
            if self.binding[v].is_none() && !fresh.contains(&v) {
                fresh.push(v);
            }
        }
        let options = if fresh.is_empty() {
            if self.premise_holds(template, &self.binding) {
                vec![Vec::new()]
            } else {
                Vec::new()
            }
        } else if let Some(known) = self.instances.get(&template.predicate) {
            self.unify_all(template, &fresh, known)
        } else {
            self.brute_force(template, &fresh)
        };
        Frame {
            depth,
            fresh,
            options,
            next: 0,
        }
    }

    /// Values for `fresh` that make `template` match one of `known`
    fn unify_all(&self, template: &Template, fresh: &[usize], known: &[Vec<PointId>]) -> Vec<Vec<PointId>> {
        let mut out = Vec::new();
        'tuples: for args in known {
            let mut local = self.binding.clone();
            for (&v, &p) in template.vars.iter().zip(args) {
                match local[v] {
                    Some(q) if q != p => continue 'tuples,
                    Some(_) => {}
                    None => local[v] = Some(p),
                }
            }
            if let Some(values) = fresh.iter().map(|&v| local[v]).collect::<Option<Vec<_>>>() {
                out.push(values);
            }
        }
        dedup(out)
    }

    /// Every assignment of points to `fresh` under which `template` holds
    fn brute_force(&self, template: &Template, fresh: &[usize]) -> Vec<Vec<PointId>> {
        let n = self.points.len();
        let mut out = Vec::new();
        if n == 0 {
            return out;
        }
        let mut digits = vec![0usize; fresh.len()];
        let mut local = self.binding.clone();
        loop {
            for (&v, &d) in fresh.iter().zip(&digits) {
                local[v] = Some(self.points[d]);
            }
            if self.premise_holds(template, &local) {
                out.push(digits.iter().map(|&d| self.points[d]).collect());
            }
            // odometer increment
            let mut k = 0;
            loop {
                if k == digits.len() {
                    return out;
                }
                digits[k] += 1;
                if digits[k] < n {
                    break;
                }
                digits[k] = 0;
                k += 1;
            }
        }
    }

    fn premise_holds(&self, template: &Template, binding: &[Option<PointId>]) -> bool {
        let Some(args) = template.vars.iter().map(|&v| binding[v]).collect::<Option<Vec<_>>>() else {
            return false;
        };
        match Statement::from_parts(template.predicate, args, template.value) {
            Ok(statement) => self.state.holds(&statement),
            Err(_) => false,
        }
    }

    /// Bind or release the variables of a frame option
    fn assign(&mut self, fresh: &[usize], values: Option<&[PointId]>) {
        for (k, &v) in fresh.iter().enumerate() {
            self.binding[v] = values.map(|vals| vals[k]);
        }
    }
}

impl<'a> Iterator for Matches<'a> {
    type Item = Vec<PointId>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            if self.rule.plan.is_empty() {
                return None;
            }
            let root = self.frame(0);
            self.stack.push(root);
        }
        loop {
            let frame = self.stack.last_mut()?;
            if frame.next >= frame.options.len() {
                let fresh = std::mem::take(&mut frame.fresh);
                self.stack.pop();
                self.assign(&fresh, None);
                continue;
            }
            let values = frame.options[frame.next].clone();
            frame.next += 1;
            let depth = frame.depth;
            let fresh = frame.fresh.clone();
            self.assign(&fresh, Some(&values));

            if depth + 1 < self.rule.plan.len() {
                let child = self.frame(depth + 1);
                self.stack.push(child);
                continue;
            }
            let Some(binding) = self.binding.iter().copied().collect::<Option<Vec<_>>>() else {
                continue;
            };
            if self.rule.is_representative(&binding) {
                return Some(binding);
            }
        }
    }
}

fn dedup<T: Ord>(mut items: Vec<T>) -> Vec<T> {
    items.sort();
    items.dedup();
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Point2D, Reason, Tolerance};

    /// Rectangle a b c d with centre m
    fn rectangle() -> ProofState {
        let mut state = ProofState::new(Tolerance::default());
        for (name, x, y) in [
            ("a", 0.0, 0.0),
            ("b", 4.0, 0.0),
            ("c", 4.0, 2.0),
            ("d", 0.0, 2.0),
            ("m", 2.0, 1.0),
        ] {
            state.add_point(name, Point2D::new(x, y));
        }
        state
    }

    fn add(state: &mut ProofState, predicate: Predicate, names: &[&str]) {
        let statement = state.statement(predicate, names, None).unwrap();
        state.add(statement, Reason::Premise, vec![]).unwrap();
    }

    #[test]
    fn test_indexed_premises_unify() {
        let mut state = rectangle();
        add(&mut state, Predicate::Coll, &["a", "m", "c"]);
        add(&mut state, Predicate::Coll, &["b", "m", "d"]);

        let rule = Rule::builder("two_lines")
            .premise(Predicate::Coll, "x y z")
            .premise(Predicate::Coll, "x u v")
            .conclusion(Predicate::Diff, "y u")
            .build()
            .unwrap();
        let bindings: Vec<Vec<PointId>> = rule.matches(&state).collect();
        assert!(!bindings.is_empty());
        // every binding shares its first point between the two lines
        for b in &bindings {
            let on_first = [b[0], b[1], b[2]];
            let on_second = [b[0], b[3], b[4]];
            let coll = |ps: [PointId; 3]| state.holds(&Statement::new(Predicate::Coll, ps.to_vec()).unwrap());
            assert!(coll(on_first) && coll(on_second));
        }
        let m = state.point("m").unwrap();
        assert!(bindings.iter().any(|b| b[0] == m));
    }

    #[test]
    fn test_brute_force_premise() {
        let mut state = rectangle();
        add(&mut state, Predicate::Midp, &["m", "a", "c"]);

        let rule = Rule::builder("midpoint")
            .premise(Predicate::Midp, "m a b")
            .conclusion(Predicate::Cong, "m a m b")
            .build()
            .unwrap();
        let bindings: Vec<Vec<PointId>> = rule.matches(&state).collect();
        let [a, c, m] = ["a", "c", "m"].map(|n| state.point(n).unwrap());
        // m is also the midpoint of b d numerically, but not symbolically;
        // swapping the endpoints is an automorphism of the rule
        assert_eq!(bindings, vec![vec![m, a, c]]);
    }

    #[test]
    fn test_symmetric_matches_reported_once() {
        let mut state = rectangle();
        add(&mut state, Predicate::Para, &["a", "b", "c", "d"]);

        let rule = Rule::builder("para_pair")
            .premise(Predicate::Para, "p q r s")
            .conclusion(Predicate::Npara, "p r q s")
            .build()
            .unwrap();
        let para = rule.matches(&state).count();

        let symmetric = Rule::builder("para_set")
            .premise(Predicate::Para, "p q r s")
            .conclusion(Predicate::Para, "p q r s")
            .build()
            .unwrap();
        assert_eq!(symmetric.automorphisms().len(), 7);
        assert_eq!(symmetric.matches(&state).count(), 1);
        assert!(para > 1);
    }

    #[test]
    fn test_no_match_without_facts() {
        let state = rectangle();
        let rule = Rule::builder("needs_cyclic")
            .premise(Predicate::Cyclic, "a b c d")
            .conclusion(Predicate::EqAngle, "c a c b d a d b")
            .build()
            .unwrap();
        assert_eq!(rule.matches(&state).count(), 0);
    }

    fn angle_swap() -> Rule {
        Rule::builder("angle_swap")
            .premise(Predicate::EqAngle, "a b c d e f g h")
            .conclusion(Predicate::EqAngle, "a b e f c d g h")
            .build()
            .unwrap()
    }

    #[test]
    fn test_equal_angles_read_from_index() {
        let mut state = ProofState::new(Tolerance::default());
        for i in 0..12 {
            let t = i as f64;
            state.add_point(&format!("p{i}"), Point2D::new(t * 1.3, t * t * 0.7 - t));
        }
        // eight free slots over twelve points stay cheap
        assert_eq!(angle_swap().matches(&state).count(), 0);
    }

    #[test]
    fn test_equal_angles_from_parallels() {
        let mut state = rectangle();
        add(&mut state, Predicate::Para, &["a", "b", "c", "d"]);
        add(&mut state, Predicate::Para, &["a", "d", "b", "c"]);

        let bindings: Vec<Vec<PointId>> = angle_swap().matches(&state).collect();
        assert!(!bindings.is_empty());
        for b in &bindings {
            let eq = Statement::new(Predicate::EqAngle, b.clone()).unwrap();
            assert!(state.holds(&eq), "{b:?}");
        }
        let [a, b, c, d] = ["a", "b", "c", "d"].map(|n| state.point(n).unwrap());
        let line = |p: &[PointId], x: PointId, y: PointId| p == [x, y] || p == [y, x];
        assert!(bindings.iter().any(|t| {
            let sides = [&t[0..2], &t[2..4], &t[4..6], &t[6..8]];
            sides.iter().any(|s| line(s, a, b)) && sides.iter().any(|s| line(s, c, d))
        }));
        // m lies on no line yet
        let m = state.point("m").unwrap();
        assert!(bindings.iter().all(|t| !t.contains(&m)));
    }
}
