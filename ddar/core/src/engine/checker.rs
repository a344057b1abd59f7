//! Symbolic truth of statements that may not be registered yet

use super::ProofState;
use crate::ar::{Angle, Ratio};
use crate::error::EngineResult;
use crate::ir::{PointId, Predicate, Reason, Segment, Statement, StatementId};
use num_rational::Rational64;

impl ProofState {
    /// Does `statement` follow from what is known?
    ///
    /// Cheaper than [`ProofState::justify`] since no justification is built.
    pub fn holds(&self, statement: &Statement) -> bool {
        statement.is_trivial() || self.deps.contains(statement) || self.derive(statement, false).is_some()
    }

    /// How `statement` follows from the graph and the tables
    ///
    /// Registered statements are not consulted, so a statement only known
    /// as a premise or a rule conclusion yields `None` here.
    pub fn justify(&self, statement: &Statement) -> Option<(Reason, Vec<StatementId>)> {
        self.derive(statement, true)
    }

    /// Registered ids standing for `statement`, registering it from its
    /// justification first when needed
    ///
    /// `Ok(None)` means the statement does not follow.
    pub fn justify_premise(&mut self, statement: &Statement) -> EngineResult<Option<Vec<StatementId>>> {
        if statement.is_trivial() {
            return Ok(Some(Vec::new()));
        }
        if let Some(id) = self.deps.get(statement) {
            return Ok(Some(vec![id]));
        }
        let Some((reason, why)) = self.justify(statement) else {
            return Ok(None);
        };
        self.add(statement.clone(), reason, why)?;
        Ok(self.deps.get(statement).map(|id| vec![id]))
    }

    fn derive(&self, statement: &Statement, explain: bool) -> Option<(Reason, Vec<StatementId>)> {
        if statement.is_degenerate() {
            return None;
        }
        let a = statement.args();
        match statement.predicate() {
            Predicate::Coll => {
                if !self.graph.are_collinear(a) {
                    return None;
                }
                let why = if explain { self.graph.why_collinear(a)? } else { Vec::new() };
                Some((Reason::Incidence, why))
            }
            Predicate::Cyclic => {
                if !self.graph.are_concyclic(a) {
                    return None;
                }
                let why = if explain { self.graph.why_concyclic(a)? } else { Vec::new() };
                Some((Reason::Incidence, why))
            }
            Predicate::Para => self.derive_angle(a, Angle::zero(), explain),
            Predicate::Perp => self.derive_angle(a, Angle::right(), explain),
            Predicate::AConst => {
                let target = Angle::new(statement.value()?);
                self.derive_angle(a, target, explain)
            }
            Predicate::EqAngle => {
                let lines = [
                    self.graph.find_line(a[2], a[3])?,
                    self.graph.find_line(a[0], a[1])?,
                    self.graph.find_line(a[6], a[7])?,
                    self.graph.find_line(a[4], a[5])?,
                ];
                let keys = [&lines[0], &lines[1], &lines[2], &lines[3]];
                if !explain {
                    return self.angles.holds4(keys).then(|| (Reason::AngleChase, Vec::new()));
                }
                let mut why = self.angles.explain4(keys)?;
                for pair in a.chunks(2) {
                    why.extend(self.line(pair[0], pair[1])?.1);
                }
                Some((Reason::AngleChase, normalized(why)))
            }
            Predicate::Cong => self.derive_ratio(a, Ratio::one(), explain),
            Predicate::RConst => {
                let target = Ratio::new(statement.value()?)?;
                self.derive_ratio(a, target, explain)
            }
            Predicate::EqRatio => {
                let segments = [
                    Segment::new(a[0], a[1]),
                    Segment::new(a[2], a[3]),
                    Segment::new(a[4], a[5]),
                    Segment::new(a[6], a[7]),
                ];
                let keys = [&segments[0], &segments[1], &segments[2], &segments[3]];
                if !explain {
                    return self.ratios.holds4(keys).then(|| (Reason::RatioChase, Vec::new()));
                }
                Some((Reason::RatioChase, self.ratios.explain4(keys)?))
            }
            Predicate::Midp => {
                let (m, p, q) = (a[0], a[1], a[2]);
                if !statement.check_numerical(self.graph.coords(), &self.tolerance) {
                    return None;
                }
                let (_, on_line) = self.derive(&Statement::new(Predicate::Coll, vec![m, p, q]).ok()?, explain)?;
                let (_, equal) = self.derive_ratio(&[m, p, m, q], Ratio::one(), explain)?;
                Some((Reason::Definition, normalized([on_line, equal].concat())))
            }
            Predicate::Circle => {
                let o = a[0];
                let mut why = Vec::new();
                for &p in &a[2..] {
                    why.extend(self.derive_ratio(&[o, a[1], o, p], Ratio::one(), explain)?.1);
                }
                Some((Reason::Definition, normalized(why)))
            }
            Predicate::SimTri | Predicate::SimTri2 => None,
            Predicate::Ncoll | Predicate::Npara | Predicate::Diff | Predicate::SameSide => statement
                .check_numerical(self.graph.coords(), &self.tolerance)
                .then(|| (Reason::Numerical, Vec::new())),
        }
    }

    /// Angle from line `a0 a1` to line `a2 a3` equals `target`
    fn derive_angle(&self, a: &[PointId], target: Angle, explain: bool) -> Option<(Reason, Vec<StatementId>)> {
        let l1 = self.graph.find_line(a[0], a[1])?;
        let l2 = self.graph.find_line(a[2], a[3])?;
        if self.graph.same_line(l1, l2) {
            if target != Angle::zero() {
                return None;
            }
            let why = if explain { self.graph.why_collinear(a)? } else { Vec::new() };
            return Some((Reason::Incidence, why));
        }
        if self.angles.difference(&l2, &l1)? != target {
            return None;
        }
        if !explain {
            return Some((Reason::AngleChase, Vec::new()));
        }
        let (_, mut why) = self.angles.explain(&l2, &l1)?;
        why.extend(self.line(a[0], a[1])?.1);
        why.extend(self.line(a[2], a[3])?.1);
        Some((Reason::AngleChase, normalized(why)))
    }

    /// `|a0 a1| / |a2 a3|` equals `target`
    fn derive_ratio(&self, a: &[PointId], target: Ratio, explain: bool) -> Option<(Reason, Vec<StatementId>)> {
        let s1 = Segment::new(a[0], a[1]);
        let s2 = Segment::new(a[2], a[3]);
        if !explain {
            return (self.ratios.difference(&s1, &s2)? == target).then(|| (Reason::RatioChase, Vec::new()));
        }
        let (ratio, why) = self.ratios.explain(&s1, &s2)?;
        (ratio == target).then(|| (Reason::RatioChase, why))
    }

    /// Known angle from line `a b` to line `c d`, as a multiple of π
    pub fn angle_between(&self, a: PointId, b: PointId, c: PointId, d: PointId) -> Option<Rational64> {
        let l1 = self.graph.find_line(a, b)?;
        let l2 = self.graph.find_line(c, d)?;
        if self.graph.same_line(l1, l2) {
            return Some(Rational64::from_integer(0));
        }
        self.angles.difference(&l2, &l1).map(|angle| angle.value())
    }

    /// Known ratio `|a b| / |c d|`
    pub fn ratio_between(&self, a: PointId, b: PointId, c: PointId, d: PointId) -> Option<Rational64> {
        self.ratios
            .difference(&Segment::new(a, b), &Segment::new(c, d))
            .map(|ratio| ratio.value())
    }
}

fn normalized(mut why: Vec<StatementId>) -> Vec<StatementId> {
    why.sort_unstable();
    why.dedup();
    why
}
