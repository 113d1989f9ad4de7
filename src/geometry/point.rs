//! Two-dimensional points on the periodic domain.
//!
//! Positions are plain `f64` pairs. Points stored in a mesh always carry their
//! canonical coordinates in `[0, size)²`; coordinates outside that square only
//! appear after a point has been lifted into a neighbouring chunk.

#![forbid(unsafe_code)]

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// =============================================================================
// POINT STRUCT DEFINITION
// =============================================================================

/// A point (or displacement vector) in the plane.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::geometry::point::Point2;
///
/// let p = Point2::new(1.0, 2.0);
/// let q = Point2::new(4.0, 6.0);
/// assert_eq!(p.distance(q), 5.0);
/// assert_eq!((q - p).coords(), [3.0, 4.0]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2 {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

// =============================================================================
// PUBLIC API
// =============================================================================

impl Point2 {
    /// The origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Creates a point from its coordinates.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the coordinates as an array.
    #[inline]
    #[must_use]
    pub const fn coords(self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Dot product, treating both points as vectors.
    #[inline]
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x.mul_add(other.x, self.y * other.y)
    }

    /// z-component of the 3D cross product, treating both points as vectors.
    #[inline]
    #[must_use]
    pub fn cross(self, other: Self) -> f64 {
        self.x.mul_add(other.y, -(self.y * other.x))
    }

    #[inline]
    #[must_use]
    pub fn squared_norm(self) -> f64 {
        self.dot(self)
    }

    #[inline]
    #[must_use]
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Squared Euclidean distance, without any periodic wrapping.
    #[inline]
    #[must_use]
    pub fn squared_distance(self, other: Self) -> f64 {
        (other - self).squared_norm()
    }

    /// Euclidean distance, without any periodic wrapping.
    #[inline]
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (other - self).norm()
    }

    /// Linear interpolation: `t = 0` gives `self`, `t = 1` gives `other`.
    #[inline]
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self + (other - self) * t
    }

    /// Returns `true` if both coordinates are finite.
    #[inline]
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// =============================================================================
// CONVERSIONS AND OPERATORS
// =============================================================================

impl From<[f64; 2]> for Point2 {
    #[inline]
    fn from(coords: [f64; 2]) -> Self {
        Self::new(coords[0], coords[1])
    }
}

impl From<(f64, f64)> for Point2 {
    #[inline]
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl From<Point2> for [f64; 2] {
    #[inline]
    fn from(p: Point2) -> Self {
        p.coords()
    }
}

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Add for Point2 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point2 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point2 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Point2 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point2 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_arithmetic() {
        let a = Point2::new(1.0, 2.0);
        let b = Point2::new(-3.0, 0.5);

        assert_eq!(a + b, Point2::new(-2.0, 2.5));
        assert_eq!(a - b, Point2::new(4.0, 1.5));
        assert_eq!(a * 2.0, Point2::new(2.0, 4.0));
        assert_eq!(-a, Point2::new(-1.0, -2.0));

        let mut c = a;
        c += b;
        c -= b;
        assert_eq!(c, a);
    }

    #[test]
    fn point_products_and_norms() {
        let a = Point2::new(3.0, 0.0);
        let b = Point2::new(0.0, 4.0);

        assert_relative_eq!(a.dot(b), 0.0);
        assert_relative_eq!(a.cross(b), 12.0);
        assert_relative_eq!(b.cross(a), -12.0);
        assert_relative_eq!(a.distance(b), 5.0);
        assert_relative_eq!(a.squared_distance(b), 25.0);
        assert_relative_eq!((a - b).norm(), 5.0);
    }

    #[test]
    fn point_lerp_and_conversions() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(2.0, -4.0);
        let mid = a.lerp(b, 0.5);
        assert_relative_eq!(mid.x, 1.0);
        assert_relative_eq!(mid.y, -2.0);

        assert_eq!(Point2::from([1.5, 2.5]), Point2::new(1.5, 2.5));
        assert_eq!(Point2::from((1.5, 2.5)), Point2::new(1.5, 2.5));
        let arr: [f64; 2] = Point2::new(7.0, 8.0).into();
        assert_eq!(arr, [7.0, 8.0]);
        assert_eq!(format!("{}", Point2::new(1.0, 2.0)), "(1, 2)");
    }

    #[test]
    fn point_finiteness() {
        assert!(Point2::new(1.0, 2.0).is_finite());
        assert!(!Point2::new(f64::NAN, 2.0).is_finite());
        assert!(!Point2::new(1.0, f64::INFINITY).is_finite());
    }
}
