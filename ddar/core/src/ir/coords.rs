//! Coordinate geometry support
//!
//! Every point of a construction carries numeric coordinates. They are used
//! as the ground-truth filter for statements: nothing is added to the proof
//! state unless it also holds numerically.

use super::symbols::PointId;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, Mul, Sub};

/// 2D point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance to another point
    pub fn distance(&self, other: &Point2D) -> f64 {
        (*self - *other).norm()
    }

    /// Length of the point taken as a vector from the origin
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Dot product with another point (as vectors from origin)
    pub fn dot(&self, other: &Point2D) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Cross product z-component (for 2D)
    pub fn cross_z(&self, other: &Point2D) -> f64 {
        self.x * other.y - self.y * other.x
    }
}

impl Add for Point2D {
    type Output = Point2D;

    fn add(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2D {
    type Output = Point2D;

    fn sub(self, rhs: Point2D) -> Point2D {
        Point2D::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2D {
    type Output = Point2D;

    fn mul(self, rhs: f64) -> Point2D {
        Point2D::new(self.x * rhs, self.y * rhs)
    }
}

/// Absolute/relative tolerance pair used by every numeric comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub absolute: f64,
    pub relative: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            absolute: 1e-7,
            relative: 1e-7,
        }
    }
}

impl Tolerance {
    /// `a` and `b` agree within the absolute or the relative tolerance
    pub fn close_enough(&self, a: f64, b: f64) -> bool {
        let diff = (a - b).abs();
        diff <= self.absolute || diff <= self.relative * a.abs().max(b.abs())
    }

    pub fn is_zero(&self, value: f64) -> bool {
        value.abs() <= self.absolute
    }
}

/// Coordinate store - maps PointIds to coordinates
///
/// Point ids are dense, so coordinates live in a plain vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinateStore {
    coords: Vec<Point2D>,
}

impl CoordinateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set coordinates for a point, growing the store as needed
    pub fn set(&mut self, point: PointId, coords: Point2D) {
        let index = point.index();
        if index >= self.coords.len() {
            self.coords.resize(index + 1, Point2D::new(f64::NAN, f64::NAN));
        }
        self.coords[index] = coords;
    }

    /// Get coordinates for a point
    pub fn get(&self, point: PointId) -> Option<Point2D> {
        self.coords
            .get(point.index())
            .copied()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
    }

    /// Coordinates for a list of points, `None` if any is missing
    pub fn resolve(&self, points: &[PointId]) -> Option<Vec<Point2D>> {
        points.iter().map(|&p| self.get(p)).collect()
    }

    /// Number of points with coordinates
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

/// Geometric computations using coordinates
///
/// Direction-based checks normalize by the segment lengths, so the
/// tolerance applies to sines and cosines rather than raw products.
pub mod ops {
    use super::*;

    /// Two points closer than the absolute tolerance
    pub fn coincide(p: Point2D, q: Point2D, tol: &Tolerance) -> bool {
        tol.is_zero(p.distance(&q))
    }

    /// Direction angle of the line through `p` and `q`, in `[0, π)`
    pub fn line_angle(p: Point2D, q: Point2D) -> f64 {
        let d = q - p;
        d.y.atan2(d.x).rem_euclid(PI)
    }

    /// Directed angle from line `p1p2` to line `p3p4`, in `[0, π)`
    pub fn directed_angle(p1: Point2D, p2: Point2D, p3: Point2D, p4: Point2D) -> f64 {
        (line_angle(p3, p4) - line_angle(p1, p2)).rem_euclid(PI)
    }

    /// Two angles modulo π agree within tolerance
    pub fn angles_close(a: f64, b: f64, tol: &Tolerance) -> bool {
        let d = (a - b).rem_euclid(PI);
        tol.close_enough(d, 0.0) || tol.close_enough(d, PI)
    }

    /// Sine of the angle between `p1p2` and `p3p4`
    fn sine(p1: Point2D, p2: Point2D, p3: Point2D, p4: Point2D) -> Option<f64> {
        let v1 = p2 - p1;
        let v2 = p4 - p3;
        let n = v1.norm() * v2.norm();
        (n > 0.0).then(|| v1.cross_z(&v2) / n)
    }

    /// Cosine of the angle between `p1p2` and `p3p4`
    fn cosine(p1: Point2D, p2: Point2D, p3: Point2D, p4: Point2D) -> Option<f64> {
        let v1 = p2 - p1;
        let v2 = p4 - p3;
        let n = v1.norm() * v2.norm();
        (n > 0.0).then(|| v1.dot(&v2) / n)
    }

    /// Check if three points are collinear
    pub fn are_collinear(p1: Point2D, p2: Point2D, p3: Point2D, tol: &Tolerance) -> bool {
        if coincide(p1, p2, tol) || coincide(p1, p3, tol) {
            return true;
        }
        sine(p1, p2, p1, p3).map_or(true, |s| tol.is_zero(s))
    }

    /// Check if two lines are perpendicular
    pub fn are_perpendicular(
        p1: Point2D,
        p2: Point2D,
        p3: Point2D,
        p4: Point2D,
        tol: &Tolerance,
    ) -> bool {
        cosine(p1, p2, p3, p4).map_or(false, |c| tol.is_zero(c))
    }

    /// Check if two lines are parallel
    pub fn are_parallel(p1: Point2D, p2: Point2D, p3: Point2D, p4: Point2D, tol: &Tolerance) -> bool {
        sine(p1, p2, p3, p4).map_or(false, |s| tol.is_zero(s))
    }

    /// Center of the circle through three points, `None` when collinear
    pub fn circumcenter(a: Point2D, b: Point2D, c: Point2D, tol: &Tolerance) -> Option<Point2D> {
        let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
        if tol.is_zero(d) {
            return None;
        }
        let a2 = a.dot(&a);
        let b2 = b.dot(&b);
        let c2 = c.dot(&c);
        Some(Point2D::new(
            (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d,
            (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d,
        ))
    }

    /// Check if four points lie on one circle
    pub fn are_concyclic(points: [Point2D; 4], tol: &Tolerance) -> bool {
        let [a, b, c, d] = points;
        match circumcenter(a, b, c, tol) {
            Some(center) => {
                let r = center.distance(&a);
                tol.close_enough(center.distance(&d), r)
            }
            None => false,
        }
    }

    /// Signed area orientation of a triangle: +1, -1 or 0 when degenerate
    pub fn orientation(a: Point2D, b: Point2D, c: Point2D, tol: &Tolerance) -> i8 {
        match sine(a, b, a, c) {
            Some(s) if !tol.is_zero(s) => {
                if s > 0.0 {
                    1
                } else {
                    -1
                }
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ops::*;
    use super::*;

    #[test]
    fn test_point_ops() {
        let p1 = Point2D::new(0.0, 0.0);
        let p2 = Point2D::new(3.0, 4.0);

        assert_eq!(p1.distance(&p2), 5.0);
        assert_eq!(p2 - p1, p2);
        assert_eq!((p2 * 2.0).x, 6.0);
    }

    #[test]
    fn test_tolerance() {
        let tol = Tolerance::default();
        assert!(tol.close_enough(1.0, 1.0 + 1e-9));
        assert!(tol.close_enough(1e9, 1e9 + 1.0));
        assert!(!tol.close_enough(1.0, 1.001));
    }

    #[test]
    fn test_coordinate_store() {
        let mut store = CoordinateStore::new();
        let p = PointId(2);

        store.set(p, Point2D::new(1.0, 2.0));

        assert!(store.get(PointId(0)).is_none(), "gaps stay unset");
        assert_eq!(store.get(p), Some(Point2D::new(1.0, 2.0)));
        assert!(store.resolve(&[PointId(0), p]).is_none());
    }

    #[test]
    fn test_collinear() {
        let tol = Tolerance::default();
        let p1 = Point2D::new(0.0, 0.0);
        let p2 = Point2D::new(1.0, 1.0);
        let p3 = Point2D::new(2.0, 2.0);
        let p4 = Point2D::new(1.0, 0.0);

        assert!(are_collinear(p1, p2, p3, &tol));
        assert!(!are_collinear(p1, p2, p4, &tol));
    }

    #[test]
    fn test_perpendicular_and_parallel() {
        let tol = Tolerance::default();
        let o = Point2D::new(0.0, 0.0);
        let x = Point2D::new(2.0, 0.0);
        let y = Point2D::new(0.0, 5.0);
        let x2 = Point2D::new(-1.0, 3.0);
        let x3 = Point2D::new(4.0, 3.0);

        assert!(are_perpendicular(o, x, o, y, &tol));
        assert!(are_parallel(o, x, x2, x3, &tol));
        assert!(!are_parallel(o, x, o, y, &tol));
        assert!(!are_perpendicular(o, x, o, o, &tol), "degenerate line");
    }

    #[test]
    fn test_directed_angle() {
        let tol = Tolerance::default();
        let o = Point2D::new(0.0, 0.0);
        let x = Point2D::new(1.0, 0.0);
        let d = Point2D::new(1.0, 1.0);

        assert!(angles_close(directed_angle(o, x, o, d), PI / 4.0, &tol));
        assert!(angles_close(directed_angle(o, d, o, x), 3.0 * PI / 4.0, &tol));
        assert!(angles_close(0.0, PI - 1e-12, &tol), "angles wrap modulo π");
    }

    #[test]
    fn test_concyclic() {
        let tol = Tolerance::default();
        let pts = [
            Point2D::new(1.0, 0.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(-1.0, 0.0),
            Point2D::new(0.0, -1.0),
        ];
        assert!(are_concyclic(pts, &tol));

        let off = [pts[0], pts[1], pts[2], Point2D::new(0.0, -2.0)];
        assert!(!are_concyclic(off, &tol));

        let center = circumcenter(pts[0], pts[1], pts[2], &tol);
        assert!(center.map_or(false, |c| coincide(c, Point2D::new(0.0, 0.0), &tol)));
    }

    #[test]
    fn test_orientation() {
        let tol = Tolerance::default();
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(1.0, 0.0);
        let c = Point2D::new(0.0, 1.0);

        assert_eq!(orientation(a, b, c, &tol), 1);
        assert_eq!(orientation(a, c, b, &tol), -1);
        assert_eq!(orientation(a, b, Point2D::new(2.0, 0.0), &tol), 0);
    }
}
