//! Buffer aliases sized for typical 2D mesh adjacency.
//!
//! A vertex in a planar Delaunay triangulation has six neighbours on average,
//! so eight inline slots cover most stars without allocating.

use super::SmallBuffer;
use crate::core::periodic_mesh::{EdgeKey, TriangleKey};

/// Inline capacity for per-point adjacency lists.
pub const STAR_INLINE_CAPACITY: usize = 8;

/// Inline capacity for cavity-sized scratch buffers.
pub const CAVITY_INLINE_CAPACITY: usize = 16;

/// Edges incident to one point.
pub type PointEdgeBuffer = SmallBuffer<EdgeKey, STAR_INLINE_CAPACITY>;

/// Triangles incident to one point.
pub type PointTriangleBuffer = SmallBuffer<TriangleKey, STAR_INLINE_CAPACITY>;

/// Triangle keys collected during a cavity search or a removal.
pub type TriangleKeyBuffer = SmallBuffer<TriangleKey, CAVITY_INLINE_CAPACITY>;
