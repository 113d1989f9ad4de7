//! Brute-force check of the empty-circumcircle property on a periodic mesh.
//!
//! Every triangle's circumcircle is tested against every image of every
//! point that can reach it, so the cost is `O(T · V)`. Meant for tests and
//! debugging on small meshes.

#![forbid(unsafe_code)]

use crate::core::local_point::ChunkOffset;
use crate::core::periodic_mesh::{PeriodicMesh, PointKey, TriangleKey};
use crate::geometry::predicates::{InSphere, circumcircle, incircle};
use thiserror::Error;

/// Default relative tolerance on the squared circumradius.
pub const DEFAULT_DELAUNAY_TOLERANCE: f64 = 1e-9;

/// Errors reported by [`validate_delaunay`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DelaunayValidationError {
    /// A point image lies strictly inside a triangle's circumcircle.
    #[error("Triangle {triangle:?} has point {point:?} (image {offset}) inside its circumcircle")]
    DelaunayViolation {
        /// The offending triangle.
        triangle: TriangleKey,
        /// The point inside the circle.
        point: PointKey,
        /// Which image of the point, relative to the triangle's first corner.
        offset: ChunkOffset,
    },

    /// A triangle is too flat to have a circumcircle.
    #[error("Triangle {triangle:?} is degenerate")]
    DegenerateTriangle {
        /// The flat triangle.
        triangle: TriangleKey,
    },
}

/// One point image found inside a circumcircle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelaunayViolation {
    pub triangle: TriangleKey,
    pub point: PointKey,
    pub offset: ChunkOffset,
}

/// Finds every `(triangle, point image)` pair breaking the Delaunay property.
///
/// `tolerance` is relative to the squared circumradius; images within it of
/// the circle count as on the circle and are not reported. The triangle's
/// own corners are skipped. Degenerate triangles are skipped as well; use
/// [`validate_delaunay`] to have them reported.
#[must_use]
pub fn find_delaunay_violations(mesh: &PeriodicMesh, tolerance: f64) -> Vec<DelaunayViolation> {
    let mut violations = Vec::new();
    for (key, _) in mesh.triangles() {
        scan_triangle(mesh, key, tolerance, &mut |violation| violations.push(violation));
    }
    if !violations.is_empty() {
        tracing::debug!(count = violations.len(), "found Delaunay violations");
    }
    violations
}

/// Checks the empty-circumcircle property with the default tolerance.
///
/// # Errors
///
/// Returns the first [`DelaunayValidationError`] found.
pub fn validate_delaunay(mesh: &PeriodicMesh) -> Result<(), DelaunayValidationError> {
    for (key, triangle) in mesh.triangles() {
        let [a, b, c] = mesh.triangle_positions(triangle, ChunkOffset::ZERO);
        if circumcircle(a, b, c).is_none() {
            return Err(DelaunayValidationError::DegenerateTriangle { triangle: key });
        }
        let mut first = None;
        scan_triangle(mesh, key, DEFAULT_DELAUNAY_TOLERANCE, &mut |violation| {
            first.get_or_insert(violation);
        });
        if let Some(v) = first {
            return Err(DelaunayValidationError::DelaunayViolation {
                triangle: v.triangle,
                point: v.point,
                offset: v.offset,
            });
        }
    }
    Ok(())
}

fn scan_triangle(
    mesh: &PeriodicMesh,
    key: TriangleKey,
    tolerance: f64,
    report: &mut impl FnMut(DelaunayViolation),
) {
    let triangle = mesh.triangle(key);
    let [a, b, c] = mesh.triangle_positions(triangle, ChunkOffset::ZERO);
    let Some((center, radius2)) = circumcircle(a, b, c) else {
        return;
    };
    let radius = radius2.sqrt();
    let size = mesh.domain_size();
    let corners = triangle.points();

    for (point, data) in mesh.points() {
        let pos = data.position();
        let xs = image_range(center.x - radius - pos.x, center.x + radius - pos.x, size);
        let ys = image_range(center.y - radius - pos.y, center.y + radius - pos.y, size);
        for oy in ys {
            for ox in xs.clone() {
                let offset = ChunkOffset::new(ox, oy);
                if corners.iter().any(|lp| lp.point == point && lp.offset == offset) {
                    continue;
                }
                let image = mesh.point_position(point, offset);
                if incircle(a, b, c, image, tolerance) == InSphere::INSIDE {
                    report(DelaunayViolation {
                        triangle: key,
                        point,
                        offset,
                    });
                }
            }
        }
    }
}

/// Integer translations `k` with `lo <= k * size <= hi`, padded by one.
fn image_range(lo: f64, hi: f64, size: f64) -> std::ops::RangeInclusive<i32> {
    let first = num_traits::cast::<f64, i32>((lo / size).floor()).unwrap_or(0) - 1;
    let last = num_traits::cast::<f64, i32>((hi / size).ceil()).unwrap_or(0) + 1;
    first..=last
}
