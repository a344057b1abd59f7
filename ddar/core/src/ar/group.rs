//! Abelian groups the tables compute in

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Abelian group used for variable offsets
pub trait Group: Copy + PartialEq + fmt::Debug + fmt::Display {
    fn identity() -> Self;
    fn combine(&self, other: &Self) -> Self;
    fn inverse(&self) -> Self;

    /// `self - other` in additive notation
    fn difference(&self, other: &Self) -> Self {
        self.combine(&other.inverse())
    }

    fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

/// Directed line angle as a fraction of π, kept in `[0, 1)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Angle(Rational64);

impl Angle {
    pub fn new(value: Rational64) -> Self {
        Angle(value - value.floor())
    }

    pub fn zero() -> Self {
        Angle(Rational64::from_integer(0))
    }

    pub fn right() -> Self {
        Angle(Rational64::new(1, 2))
    }

    pub fn value(&self) -> Rational64 {
        self.0
    }
}

impl Group for Angle {
    fn identity() -> Self {
        Angle::zero()
    }

    fn combine(&self, other: &Self) -> Self {
        Angle::new(self.0 + other.0)
    }

    fn inverse(&self) -> Self {
        Angle::new(-self.0)
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}π", self.0)
    }
}

/// Positive length ratio under multiplication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ratio(Rational64);

impl Ratio {
    /// `None` unless the value is strictly positive
    pub fn new(value: Rational64) -> Option<Self> {
        (value > Rational64::from_integer(0)).then_some(Ratio(value))
    }

    pub fn one() -> Self {
        Ratio(Rational64::from_integer(1))
    }

    pub fn value(&self) -> Rational64 {
        self.0
    }
}

impl Group for Ratio {
    fn identity() -> Self {
        Ratio::one()
    }

    fn combine(&self, other: &Self) -> Self {
        Ratio(self.0 * other.0)
    }

    fn inverse(&self) -> Self {
        Ratio(self.0.recip())
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
