//! Chunk offsets and chunk-relative point references.
//!
//! A stored point always sits in the fundamental domain. Edges and triangles
//! that cross the domain border refer to some of their vertices "in a
//! neighbouring chunk": a [`LocalPoint`] pairs a point key with the integer
//! translation to apply to it.

use crate::core::periodic_mesh::PointKey;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Integer translation between copies of the fundamental domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkOffset {
    pub x: i32,
    pub y: i32,
}

impl ChunkOffset {
    /// No translation.
    pub const ZERO: Self = Self::new(0, 0);

    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.x == 0 && self.y == 0
    }

    /// Picks one of `±self` so that `v` and `-v` map to the same value.
    ///
    /// The result is lexicographically non-negative: `x > 0`, or `x == 0` and
    /// `y >= 0`.
    #[must_use]
    pub const fn canonical_sign(self) -> Self {
        if self.x < 0 || (self.x == 0 && self.y < 0) {
            Self::new(-self.x, -self.y)
        } else {
            self
        }
    }

    #[inline]
    #[must_use]
    pub const fn scaled(self, factor: i32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Largest absolute component.
    #[inline]
    #[must_use]
    pub const fn chebyshev_norm(self) -> i32 {
        let ax = self.x.abs();
        let ay = self.y.abs();
        if ax > ay { ax } else { ay }
    }
}

impl From<(i32, i32)> for ChunkOffset {
    #[inline]
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for ChunkOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

impl Add for ChunkOffset {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for ChunkOffset {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for ChunkOffset {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for ChunkOffset {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for ChunkOffset {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

/// A point key together with the chunk it is viewed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalPoint {
    pub point: PointKey,
    pub offset: ChunkOffset,
}

impl LocalPoint {
    #[inline]
    #[must_use]
    pub const fn new(point: PointKey, offset: ChunkOffset) -> Self {
        Self { point, offset }
    }

    /// The same point in the untranslated chunk.
    #[inline]
    #[must_use]
    pub const fn at_origin(point: PointKey) -> Self {
        Self::new(point, ChunkOffset::ZERO)
    }

    /// Translates the reference by `by`.
    #[inline]
    #[must_use]
    pub fn shifted(self, by: ChunkOffset) -> Self {
        Self::new(self.point, self.offset + by)
    }
}
