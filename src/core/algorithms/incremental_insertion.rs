//! Incremental Bowyer–Watson insertion into a periodic mesh.
//!
//! Inserting a point locates the triangle that contains it, collects the
//! conflict region (see [`find_conflict_region`]), removes those triangles and
//! connects the new point to every border edge of the hole. The region search
//! runs before anything is mutated, so a failed insertion leaves the mesh
//! untouched.

use crate::core::algorithms::locate::{
    ConflictError, ConflictRegion, LocateError, find_conflict_region, locate,
};
use crate::core::local_point::LocalPoint;
use crate::core::periodic_mesh::{PeriodicMesh, PointKey};
use crate::geometry::point::Point2;

/// Two points closer than this fraction of the domain size are treated as
/// the same point.
pub const DUPLICATE_TOLERANCE: f64 = 1e-10;

/// Error during incremental insertion.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum InsertionError {
    /// The position has a NaN or infinite coordinate.
    #[error("Cannot insert non-finite point {point}")]
    NonFinitePoint {
        /// The rejected position.
        point: Point2,
    },

    /// The position coincides with a corner of the triangle containing it.
    #[error("Point {point} duplicates existing point {existing:?}")]
    DuplicatePoint {
        /// The rejected position (after clamping).
        point: Point2,
        /// The point it coincides with.
        existing: PointKey,
    },

    /// Point location failed
    #[error("Location error: {0}")]
    Location(#[from] LocateError),

    /// Conflict region finding failed
    #[error("Conflict region error: {0}")]
    ConflictRegion(#[from] ConflictError),
}

/// Counters describing one insertion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InsertionStats {
    /// Triangles removed.
    pub cavity_triangles: usize,
    /// Triangles created.
    pub created_triangles: usize,
    /// Triangles added to the region by the star-shape guard.
    pub widened: usize,
}

/// Inserts `position` into `mesh`, keeping it Delaunay.
///
/// The position is clamped into the fundamental domain first.
///
/// # Errors
///
/// Returns [`InsertionError`] if the position is not finite, duplicates a
/// corner of its containing triangle, cannot be located, or yields an
/// unusable conflict region. The mesh is unchanged in every error case.
pub fn insert_point(
    mesh: &mut PeriodicMesh,
    position: Point2,
) -> Result<(PointKey, InsertionStats), InsertionError> {
    let (position, region) = find_insertion_region(mesh, position)?;
    let (key, stats) = fill_cavity(mesh, position, &region);
    if stats.widened > 0 {
        tracing::debug!(
            %position,
            widened = stats.widened,
            "insertion needed a widened conflict region"
        );
    }
    Ok((key, stats))
}

/// Runs every check of [`insert_point`] without touching the mesh.
///
/// Returns the clamped position and the conflict region to hand to
/// [`fill_cavity`].
///
/// # Errors
///
/// Same as [`insert_point`].
pub fn find_insertion_region(
    mesh: &PeriodicMesh,
    position: Point2,
) -> Result<(Point2, ConflictRegion), InsertionError> {
    if !position.is_finite() {
        return Err(InsertionError::NonFinitePoint { point: position });
    }
    let position = mesh.space().clamp(position);
    let (start, frame) = locate(mesh, position)?;

    let tolerance = DUPLICATE_TOLERANCE * mesh.domain_size();
    let duplicate = mesh
        .triangle_view_at(start, frame)
        .points()
        .into_iter()
        .find(|corner| corner.position().squared_distance(position) <= tolerance * tolerance)
        .map(|corner| corner.key());
    if let Some(existing) = duplicate {
        return Err(InsertionError::DuplicatePoint {
            point: position,
            existing,
        });
    }

    let region = find_conflict_region(mesh, position, start, frame)?;
    Ok((position, region))
}

/// Replaces the region's triangles with a fan around a new point.
///
/// `region` must have been computed for `position` against the current state
/// of `mesh`.
pub fn fill_cavity(
    mesh: &mut PeriodicMesh,
    position: Point2,
    region: &ConflictRegion,
) -> (PointKey, InsertionStats) {
    for &(triangle, _) in &region.triangles {
        mesh.remove_triangle(triangle);
    }
    let apex = LocalPoint::at_origin(mesh.insert_point(position));
    for border in &region.border {
        mesh.add_triangle_unchecked(border.from, border.to, apex);
    }
    let stats = InsertionStats {
        cavity_triangles: region.triangles.len(),
        created_triangles: region.border.len(),
        widened: region.widened,
    };
    (apex.point, stats)
}
