//! Default rule library
//!
//! Angles are directed and taken modulo π, so `eqangle a b c d e f g h`
//! reads "the angle from line ab to line cd equals the angle from line ef to
//! line gh". Triangle rules come in a direct and a reflected form.

use super::Rule;
use crate::error::EngineResult;
use crate::ir::Predicate::*;

/// The rules every engine starts with, in matching order
pub fn default_rules() -> EngineResult<Vec<Rule>> {
    Ok(vec![
        // Incidence
        Rule::builder("para_shared_point_coll")
            .premise(Para, "a b a c")
            .conclusion(Coll, "a b c")
            .build()?,
        Rule::builder("circle_center_cyclic")
            .premise(Circle, "o a b c")
            .premise(Cong, "o a o d")
            .conclusion(Cyclic, "a b c d")
            .build()?,
        // Circles
        Rule::builder("cyclic_inscribed_angles")
            .premise(Cyclic, "a b p q")
            .conclusion(EqAngle, "p a p b q a q b")
            .build()?,
        Rule::builder("inscribed_angles_cyclic")
            .premise(EqAngle, "p a p b q a q b")
            .premise(Ncoll, "p a b")
            .premise(Ncoll, "q a b")
            .conclusion(Cyclic, "a b p q")
            .build()?,
        Rule::builder("diameter_right_angle")
            .premise(Circle, "o a b c")
            .premise(Coll, "o a c")
            .conclusion(Perp, "a b b c")
            .build()?,
        // Isosceles triangles
        Rule::builder("isosceles_base_angles")
            .premise(Cong, "o a o b")
            .premise(Ncoll, "o a b")
            .conclusion(EqAngle, "o a a b a b o b")
            .build()?,
        Rule::builder("base_angles_isosceles")
            .premise(EqAngle, "o a a b a b o b")
            .premise(Ncoll, "o a b")
            .conclusion(Cong, "o a o b")
            .build()?,
        Rule::builder("cong_cong_perp")
            .premise(Cong, "a p b p")
            .premise(Cong, "a q b q")
            .conclusion(Perp, "a b p q")
            .build()?,
        // Midpoints
        Rule::builder("midpoint_parallel")
            .premise(Midp, "e a b")
            .premise(Midp, "f a c")
            .conclusion(Para, "e f b c")
            .build()?,
        Rule::builder("midpoint_perp_cong")
            .premise(Midp, "m a b")
            .premise(Perp, "o m a b")
            .conclusion(Cong, "o a o b")
            .build()?,
        Rule::builder("right_angle_midpoint")
            .premise(Perp, "a b b c")
            .premise(Midp, "m a c")
            .conclusion(Cong, "a m b m")
            .build()?,
        Rule::builder("parallel_ratio")
            .premise(Para, "a b c d")
            .premise(Coll, "o a c")
            .premise(Coll, "o b d")
            .premise(Ncoll, "o a b")
            .conclusion(EqRatio, "o a o c o b o d")
            .build()?,
        // Similar triangles
        Rule::builder("aa_similarity")
            .premise(EqAngle, "b a b c q p q r")
            .premise(EqAngle, "c a c b r p r q")
            .premise(Ncoll, "a b c")
            .conclusion(SimTri, "a b c p q r")
            .build()?,
        Rule::builder("aa_similarity_reflected")
            .premise(EqAngle, "b a b c q r q p")
            .premise(EqAngle, "c a c b r q r p")
            .premise(Ncoll, "a b c")
            .conclusion(SimTri2, "a b c p q r")
            .build()?,
        Rule::builder("sas_similarity")
            .premise(EqRatio, "b a b c q p q r")
            .premise(EqAngle, "b a b c q p q r")
            .premise(Ncoll, "a b c")
            .conclusion(SimTri, "a b c p q r")
            .build()?,
        Rule::builder("sas_similarity_reflected")
            .premise(EqRatio, "b a b c q p q r")
            .premise(EqAngle, "b a b c q r q p")
            .premise(Ncoll, "a b c")
            .conclusion(SimTri2, "a b c p q r")
            .build()?,
        Rule::builder("simtri_angles")
            .premise(SimTri, "a b c p q r")
            .conclusion(EqAngle, "b a b c q p q r")
            .build()?,
        Rule::builder("simtri_ratios")
            .premise(SimTri, "a b c p q r")
            .conclusion(EqRatio, "b a b c q p q r")
            .build()?,
        Rule::builder("simtri2_angles")
            .premise(SimTri2, "a b c p q r")
            .conclusion(EqAngle, "b a b c q r q p")
            .build()?,
        Rule::builder("simtri2_ratios")
            .premise(SimTri2, "a b c p q r")
            .conclusion(EqRatio, "b a b c q p q r")
            .build()?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ProofState;
    use crate::ir::{Point2D, Predicate, Reason, Tolerance};

    #[test]
    fn test_library_builds() {
        let rules = default_rules().unwrap();
        assert_eq!(rules.len(), 20);
        let mut names: Vec<&str> = rules.iter().map(|r| r.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), rules.len(), "rule names are unique");
    }

    #[test]
    fn test_similarity_rules_have_triangle_symmetry() {
        let rules = default_rules().unwrap();
        let aa = rules.iter().find(|r| r.name() == "aa_similarity").unwrap();
        // exchanging the two matched vertices in both triangles; the
        // triangles themselves are not interchangeable since only the
        // first one is required to be non-degenerate
        assert_eq!(aa.automorphisms().len(), 1);
    }

    /// Every conclusion of a rule must hold numerically wherever its
    /// premises do; checked on an isosceles triangle.
    #[test]
    fn test_isosceles_rules_on_concrete_figure() {
        let mut state = ProofState::new(Tolerance::default());
        state.add_point("o", Point2D::new(1.0, 3.0));
        state.add_point("a", Point2D::new(0.0, 0.0));
        state.add_point("b", Point2D::new(2.0, 0.0));
        let cong = state.statement(Predicate::Cong, &["o", "a", "o", "b"], None).unwrap();
        state.add(cong, Reason::Premise, vec![]).unwrap();

        let rules = default_rules().unwrap();
        let rule = rules.iter().find(|r| r.name() == "isosceles_base_angles").unwrap();
        let bindings: Vec<_> = rule.matches(&state).collect();
        assert!(!bindings.is_empty());
        for binding in bindings {
            for candidate in rule.instantiate(&binding).unwrap() {
                assert!(candidate
                    .conclusion
                    .check_numerical(state.coords(), state.tolerance()));
            }
        }
    }
}
