//! Toroidal space with a square fundamental domain.
//!
//! Positions live in `[0, size)²`. A copy of the domain shifted by an integer
//! [`ChunkOffset`] is called a chunk. Lifting a canonical position into chunk
//! `(i, j)` adds `(i·size, j·size)`.

use crate::core::local_point::ChunkOffset;
use crate::geometry::point::Point2;

/// Errors raised when a toroidal space is configured with an unusable period.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum ToroidalSpaceError {
    /// The period must be finite and strictly positive.
    #[error("Invalid toroidal period {period}: must be finite and > 0")]
    InvalidPeriod {
        /// The rejected period.
        period: f64,
    },
}

/// A 2-torus with equal periods along both axes.
///
/// A 2-torus (T²) has Euler characteristic χ = 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToroidalSpace {
    size: f64,
}

impl ToroidalSpace {
    /// Creates a toroidal space with the given period.
    ///
    /// # Errors
    ///
    /// Returns [`ToroidalSpaceError::InvalidPeriod`] if `size` is not finite and
    /// positive.
    pub fn new(size: f64) -> Result<Self, ToroidalSpaceError> {
        if size.is_finite() && size > 0.0 {
            Ok(Self { size })
        } else {
            Err(ToroidalSpaceError::InvalidPeriod { period: size })
        }
    }

    /// The period along each axis.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> f64 {
        self.size
    }

    /// Wraps one coordinate into `[0, size)`.
    #[inline]
    #[must_use]
    pub fn wrap_coord(&self, c: f64) -> f64 {
        let wrapped = c.rem_euclid(self.size);
        // rem_euclid can round up to exactly `size` for tiny negative inputs.
        if wrapped >= self.size { 0.0 } else { wrapped }
    }

    /// Wraps a position into the fundamental domain.
    #[inline]
    #[must_use]
    pub fn canonicalize(&self, p: Point2) -> Point2 {
        Point2::new(self.wrap_coord(p.x), self.wrap_coord(p.y))
    }

    /// Clamps a position into the fundamental domain.
    ///
    /// Coordinates below zero become zero. Coordinates at or above `size`
    /// become the largest representable value below `size`.
    #[must_use]
    pub fn clamp(&self, p: Point2) -> Point2 {
        let below = largest_below(self.size);
        Point2::new(p.x.clamp(0.0, below), p.y.clamp(0.0, below))
    }

    /// Returns `true` if `p` is already inside `[0, size)²`.
    #[inline]
    #[must_use]
    pub fn contains(&self, p: Point2) -> bool {
        (0.0..self.size).contains(&p.x) && (0.0..self.size).contains(&p.y)
    }

    /// The translation vector of a chunk offset.
    #[inline]
    #[must_use]
    pub fn translation(&self, offset: ChunkOffset) -> Point2 {
        Point2::new(
            f64::from(offset.x) * self.size,
            f64::from(offset.y) * self.size,
        )
    }

    /// Lifts a canonical position into the chunk at `offset`.
    #[inline]
    #[must_use]
    pub fn lift(&self, p: Point2, offset: ChunkOffset) -> Point2 {
        p + self.translation(offset)
    }

    /// The chunk a (possibly lifted) position falls into.
    #[must_use]
    pub fn chunk_of(&self, p: Point2) -> ChunkOffset {
        let cx = num_traits::cast::<f64, i32>((p.x / self.size).floor()).unwrap_or(0);
        let cy = num_traits::cast::<f64, i32>((p.y / self.size).floor()).unwrap_or(0);
        ChunkOffset::new(cx, cy)
    }

    /// Shortest displacement from `a` to `b` on the torus.
    ///
    /// Each component lies in `[-size/2, size/2)`.
    #[must_use]
    pub fn delta(&self, a: Point2, b: Point2) -> Point2 {
        let half = self.size * 0.5;
        let wrap = |d: f64| (d + half).rem_euclid(self.size) - half;
        Point2::new(wrap(b.x - a.x), wrap(b.y - a.y))
    }

    /// Squared periodic distance between two positions.
    #[inline]
    #[must_use]
    pub fn distance_squared(&self, a: Point2, b: Point2) -> f64 {
        self.delta(a, b).squared_norm()
    }
}

fn largest_below(size: f64) -> f64 {
    // `size` is finite and positive, so stepping the bit pattern down by one
    // yields the previous representable value.
    f64::from_bits(size.to_bits() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_rejects_bad_periods() {
        assert!(ToroidalSpace::new(10.0).is_ok());
        assert_eq!(
            ToroidalSpace::new(0.0),
            Err(ToroidalSpaceError::InvalidPeriod { period: 0.0 })
        );
        assert!(ToroidalSpace::new(-1.0).is_err());
        assert!(ToroidalSpace::new(f64::INFINITY).is_err());
        assert!(ToroidalSpace::new(f64::NAN).is_err());
    }

    #[test]
    fn test_canonicalize_wraps_into_domain() {
        let space = ToroidalSpace::new(2.0).unwrap();
        let p = space.canonicalize(Point2::new(2.5, -0.5));
        assert_relative_eq!(p.x, 0.5);
        assert_relative_eq!(p.y, 1.5);

        let edge = space.canonicalize(Point2::new(-1e-300, 2.0));
        assert!(space.contains(edge));
    }

    #[test]
    fn test_clamp_stays_inside() {
        let space = ToroidalSpace::new(10.0).unwrap();
        let p = space.clamp(Point2::new(-3.0, 10.0));
        assert_relative_eq!(p.x, 0.0);
        assert!(p.y < 10.0);
        assert!(space.contains(p));

        let q = space.clamp(Point2::new(3.0, 4.0));
        assert_eq!(q, Point2::new(3.0, 4.0));
    }

    #[test]
    fn test_lift_and_chunk_of() {
        let space = ToroidalSpace::new(10.0).unwrap();
        let lifted = space.lift(Point2::new(1.0, 2.0), ChunkOffset::new(-1, 2));
        assert_relative_eq!(lifted.x, -9.0);
        assert_relative_eq!(lifted.y, 22.0);
        assert_eq!(space.chunk_of(lifted), ChunkOffset::new(-1, 2));
        assert_eq!(space.chunk_of(Point2::new(0.0, 9.99)), ChunkOffset::ZERO);
    }

    #[test]
    fn test_delta_takes_short_way_round() {
        let space = ToroidalSpace::new(10.0).unwrap();
        let d = space.delta(Point2::new(9.0, 1.0), Point2::new(1.0, 9.0));
        assert_relative_eq!(d.x, 2.0);
        assert_relative_eq!(d.y, -2.0);
        assert_relative_eq!(
            space.distance_squared(Point2::new(9.0, 1.0), Point2::new(1.0, 9.0)),
            8.0
        );
        assert_relative_eq!(
            space.distance_squared(Point2::new(2.0, 2.0), Point2::new(3.0, 2.0)),
            1.0
        );
    }
}
