//! Adding statements to the proof state

use super::ProofState;
use crate::ar::{Angle, Group, Ratio};
use crate::error::{EngineError, EngineResult};
use crate::graph::{MergePlan, ObjectKind};
use crate::ir::{LineId, PointId, Predicate, Reason, Segment, Statement, StatementId};
use num_rational::Rational64;

/// Side effect of a statement, resolved and checked before registration
enum Effect {
    Merge {
        kind: ObjectKind,
        plan: MergePlan,
        points: Vec<PointId>,
    },
    Ncoll([PointId; 3]),
    /// `x_a - x_b = offset` over line directions
    Angle {
        a: LineId,
        b: LineId,
        offset: Angle,
        why: Vec<StatementId>,
    },
    Angle4 {
        lines: [LineId; 4],
        why: Vec<StatementId>,
    },
    /// `a / b = ratio`
    Ratio {
        a: Segment,
        b: Segment,
        ratio: Ratio,
    },
    Ratio4([Segment; 4]),
}

impl ProofState {
    /// Register `statement` and propagate everything it implies
    ///
    /// Trivial and already known statements are accepted without change.
    /// The statement is registered only once all of its effects are in
    /// place; a conflict leaves the state as it was. Returns the newly
    /// registered statements, `statement` itself first, followed by the
    /// relations the algebraic tables closed as a result.
    pub fn add(
        &mut self,
        statement: Statement,
        reason: Reason,
        why: Vec<StatementId>,
    ) -> EngineResult<Vec<StatementId>> {
        if statement.is_trivial() {
            return Ok(Vec::new());
        }
        if !statement.check_numerical(self.graph.coords(), &self.tolerance) {
            return Err(EngineError::NumericContradiction {
                statement: self.render(&statement),
            });
        }
        if self.deps.contains(&statement) {
            return Ok(Vec::new());
        }

        if let Some(&missing) = why.iter().find(|w| self.deps.statement(**w).is_none()) {
            return Err(EngineError::DanglingJustification(missing));
        }

        // Effects cite the id the statement gets once all of them succeed.
        let id = StatementId(self.deps.len() as u32);
        let saved = (self.graph.clone(), self.angles.clone(), self.ratios.clone());
        let staged = self
            .prepare(&statement)
            .and_then(|effects| effects.into_iter().try_for_each(|effect| self.apply(effect, id)));
        if let Err(err) = staged {
            (self.graph, self.angles, self.ratios) = saved;
            return Err(err);
        }
        let registered = self.deps.register(statement, reason, why)?.id();
        debug_assert_eq!(registered, id);

        let mut added = vec![id];
        added.extend(self.resolve_closures());
        Ok(added)
    }

    /// Resolve table keys and check every effect for conflicts
    fn prepare(&mut self, statement: &Statement) -> EngineResult<Vec<Effect>> {
        let a = statement.args();
        let mut effects = Vec::new();
        match statement.predicate() {
            Predicate::Coll => effects.push(self.prepare_merge(ObjectKind::Line, a)?),
            Predicate::Cyclic => effects.push(self.prepare_merge(ObjectKind::Circle, a)?),
            Predicate::Ncoll => {
                if self.graph.are_collinear(a) {
                    return Err(EngineError::GraphInconsistency(format!(
                        "{} contradicts a known collinearity",
                        self.render(statement)
                    )));
                }
                effects.push(Effect::Ncoll([a[0], a[1], a[2]]));
            }
            Predicate::Para | Predicate::Perp | Predicate::AConst => {
                let offset = match statement.predicate() {
                    Predicate::Para => Angle::zero(),
                    Predicate::Perp => Angle::right(),
                    _ => Angle::new(statement.value().unwrap_or(Rational64::from_integer(0))),
                };
                let (l1, w1) = self.graph.ensure_line(a[0], a[1]);
                let (l2, w2) = self.graph.ensure_line(a[2], a[3]);
                self.angles.check(&l2, &l1, offset)?;
                effects.push(Effect::Angle {
                    a: l2,
                    b: l1,
                    offset,
                    why: [w1, w2].concat(),
                });
            }
            Predicate::EqAngle => {
                let mut lines = Vec::with_capacity(4);
                let mut why = Vec::new();
                for pair in a.chunks(2) {
                    let (line, w) = self.graph.ensure_line(pair[0], pair[1]);
                    lines.push(line);
                    why.extend(w);
                }
                // ∠(l1, l2) = ∠(l3, l4) reads x_l2 - x_l1 = x_l4 - x_l3
                let lines = [lines[1], lines[0], lines[3], lines[2]];
                self.angles
                    .check4([&lines[0], &lines[1], &lines[2], &lines[3]])?;
                effects.push(Effect::Angle4 { lines, why });
            }
            Predicate::Cong => {
                effects.push(self.prepare_ratio(
                    Segment::new(a[0], a[1]),
                    Segment::new(a[2], a[3]),
                    Ratio::one(),
                )?);
            }
            Predicate::RConst => {
                let ratio = statement
                    .value()
                    .and_then(Ratio::new)
                    .ok_or_else(|| EngineError::InvalidStatement(self.render(statement)))?;
                effects.push(self.prepare_ratio(
                    Segment::new(a[0], a[1]),
                    Segment::new(a[2], a[3]),
                    ratio,
                )?);
            }
            Predicate::EqRatio => {
                let segments = [
                    Segment::new(a[0], a[1]),
                    Segment::new(a[2], a[3]),
                    Segment::new(a[4], a[5]),
                    Segment::new(a[6], a[7]),
                ];
                self.ratios
                    .check4([&segments[0], &segments[1], &segments[2], &segments[3]])?;
                effects.push(Effect::Ratio4(segments));
            }
            Predicate::Midp => {
                let (m, p, q) = (a[0], a[1], a[2]);
                effects.push(self.prepare_merge(ObjectKind::Line, a)?);
                effects.push(self.prepare_ratio(
                    Segment::new(m, p),
                    Segment::new(m, q),
                    Ratio::one(),
                )?);
                let half = Ratio::new(Rational64::new(1, 2))
                    .ok_or_else(|| EngineError::InvalidStatement(self.render(statement)))?;
                effects.push(self.prepare_ratio(Segment::new(m, p), Segment::new(p, q), half)?);
            }
            Predicate::Circle => {
                let o = a[0];
                for &p in &a[2..] {
                    effects.push(self.prepare_ratio(
                        Segment::new(o, a[1]),
                        Segment::new(o, p),
                        Ratio::one(),
                    )?);
                }
            }
            Predicate::SimTri
            | Predicate::SimTri2
            | Predicate::Npara
            | Predicate::Diff
            | Predicate::SameSide => {}
        }
        Ok(effects)
    }

    fn prepare_merge(&self, kind: ObjectKind, points: &[PointId]) -> EngineResult<Effect> {
        let plan = self.graph.plan(kind, points)?;
        if kind == ObjectKind::Line {
            if let Some((&first, rest)) = plan.roots().split_first() {
                let first = LineId(first as u32);
                for &other in rest {
                    self.angles.check(&first, &LineId(other as u32), Angle::zero())?;
                }
            }
        }
        Ok(Effect::Merge {
            kind,
            plan,
            points: points.to_vec(),
        })
    }

    fn prepare_ratio(&self, a: Segment, b: Segment, ratio: Ratio) -> EngineResult<Effect> {
        self.ratios.check(&a, &b, ratio)?;
        Ok(Effect::Ratio { a, b, ratio })
    }

    fn apply(&mut self, effect: Effect, id: StatementId) -> EngineResult<()> {
        match effect {
            Effect::Merge { kind, plan, points } => {
                let (_, merges) = self.graph.commit(plan, &points, vec![id]);
                if kind == ObjectKind::Line {
                    for merge in merges {
                        let kept = LineId(merge.kept);
                        let absorbed = LineId(merge.absorbed);
                        if self.angles.lookup(&kept).is_none() && self.angles.lookup(&absorbed).is_none() {
                            continue;
                        }
                        self.angles.ingest(kept, absorbed, Angle::zero(), merge.why)?;
                    }
                }
            }
            Effect::Ncoll(points) => self.graph.register_ncoll(points)?,
            Effect::Angle { a, b, offset, mut why } => {
                why.push(id);
                self.angles.ingest(a, b, offset, why)?;
            }
            Effect::Angle4 { lines, mut why } => {
                why.push(id);
                self.angles.ingest4(lines, why)?;
            }
            Effect::Ratio { a, b, ratio } => {
                self.ratios.ingest(a, b, ratio, vec![id])?;
            }
            Effect::Ratio4(segments) => self.ratios.ingest4(segments, vec![id])?,
        }
        Ok(())
    }

    /// Register the relations the tables closed since the last call
    pub(crate) fn resolve_closures(&mut self) -> Vec<StatementId> {
        let mut added = Vec::new();

        for closure in self.angles.drain_closures() {
            if self.graph.same_line(closure.a, closure.b) {
                continue;
            }
            let (Some((a1, a2)), Some((b1, b2))) = (
                self.graph.line_defining(closure.a),
                self.graph.line_defining(closure.b),
            ) else {
                continue;
            };
            // x_a - x_b is the angle from line b to line a
            let args = vec![b1, b2, a1, a2];
            let statement = if closure.offset.is_identity() {
                Statement::new(Predicate::Para, args)
            } else if closure.offset == Angle::right() {
                Statement::new(Predicate::Perp, args)
            } else {
                Statement::with_value(Predicate::AConst, args, closure.offset.value())
            };
            if let Ok(statement) = statement {
                added.extend(self.register_derived(statement, Reason::AngleChase, closure.why));
            }
        }

        for closure in self.ratios.drain_closures() {
            let (a1, a2) = closure.a.endpoints();
            let (b1, b2) = closure.b.endpoints();
            let args = vec![a1, a2, b1, b2];
            let statement = if closure.offset.is_identity() {
                Statement::new(Predicate::Cong, args)
            } else {
                Statement::with_value(Predicate::RConst, args, closure.offset.value())
            };
            if let Ok(statement) = statement {
                added.extend(self.register_derived(statement, Reason::RatioChase, closure.why));
            }
        }

        added
    }

    /// Record a statement whose content the tables already hold
    fn register_derived(
        &mut self,
        statement: Statement,
        reason: Reason,
        why: Vec<StatementId>,
    ) -> Option<StatementId> {
        if statement.is_trivial() || statement.is_degenerate() || self.deps.contains(&statement) {
            return None;
        }
        if !statement.check_numerical(self.graph.coords(), &self.tolerance) {
            tracing::warn!(
                statement = %self.render(&statement),
                %reason,
                "closure failed the numeric check"
            );
            return None;
        }
        match self.deps.register(statement, reason, why) {
            Ok(registration) if registration.is_new() => Some(registration.id()),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(error = %err, "closure could not be registered");
                None
            }
        }
    }
}
