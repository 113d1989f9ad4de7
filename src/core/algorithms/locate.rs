//! Point location and conflict-region search on a periodic mesh.
//!
//! Location goes through the mesh's chunk grid (see
//! [`PeriodicMesh::triangle_at`]). The conflict region of a new point is the
//! set of triangles whose circumcircle strictly contains it; it is found by a
//! breadth-first walk from the triangle that contains the point.
//!
//! # Periodic walk
//!
//! Every triangle reached by the walk is recorded together with the frame it
//! was reached in, and border edges are identified by `(edge key, frame)`. On a
//! torus the same stored edge can bound the region twice in two different
//! frames, so the key alone is not enough.
//!
//! # References
//!
//! - A. Bowyer, "Computing Dirichlet tessellations", The Computer Journal, 1981.
//! - D. F. Watson, "Computing the n-dimensional Delaunay tessellation with
//!   application to Voronoi polytopes", The Computer Journal, 1981.

use crate::core::local_point::{ChunkOffset, LocalPoint};
use crate::core::periodic_mesh::{EdgeKey, PeriodicMesh, TriangleKey};
use crate::geometry::point::Point2;
use crate::geometry::predicates::{circumcircle, signed_area2};

/// Error during point location.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum LocateError {
    /// The query has a NaN or infinite coordinate.
    #[error("Cannot locate non-finite point {point}")]
    NonFinitePoint {
        /// The rejected query.
        point: Point2,
    },

    /// No triangle covers the query (empty or untriangulated mesh).
    #[error("No triangle covers {point}")]
    NotCovered {
        /// The query.
        point: Point2,
    },
}

/// Error during conflict region finding.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConflictError {
    /// Starting triangle is not in the mesh.
    #[error("Invalid starting triangle: {triangle:?}")]
    InvalidStartTriangle {
        /// The stale key.
        triangle: TriangleKey,
    },

    /// The region is not a topological disk (it wraps around the torus or
    /// encloses a vertex).
    #[error(
        "Conflict region is not a disk: {triangles} triangles bounded by {border_edges} edges"
    )]
    NonDiskCavity {
        /// Number of triangles in the region.
        triangles: usize,
        /// Number of border edges found.
        border_edges: usize,
    },

    /// The new point does not see a border edge from inside, so connecting
    /// it would create an inverted triangle.
    #[error("Conflict region is not star-shaped around the new point at edge {edge:?}")]
    NotStarShaped {
        /// The offending border edge.
        edge: EdgeKey,
    },
}

/// One side of the conflict region's boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BorderEdge {
    /// Stored edge.
    pub edge: EdgeKey,
    /// Frame of the edge in the walk's coordinates.
    pub frame: ChunkOffset,
    /// Region triangle on the inner side.
    pub inner: TriangleKey,
    /// Start corner, counter-clockwise as seen from `inner`.
    pub from: LocalPoint,
    /// End corner, counter-clockwise as seen from `inner`.
    pub to: LocalPoint,
}

/// Triangles to remove and the boundary to re-triangulate.
#[derive(Clone, Debug, Default)]
pub struct ConflictRegion {
    /// Region triangles and the frame each was reached in.
    pub triangles: Vec<(TriangleKey, ChunkOffset)>,
    /// Boundary edges, counter-clockwise around the region.
    pub border: Vec<BorderEdge>,
    /// Triangles pulled in because the new point was not strictly inside
    /// the boundary, rather than by the circumcircle test.
    pub widened: usize,
}

/// Locates the triangle covering `point`.
///
/// Returns the triangle key and the frame in which its resolved corners
/// contain `point`.
///
/// # Errors
///
/// Returns [`LocateError`] for non-finite input or when nothing covers the
/// point.
pub fn locate(
    mesh: &PeriodicMesh,
    point: Point2,
) -> Result<(TriangleKey, ChunkOffset), LocateError> {
    if !point.is_finite() {
        return Err(LocateError::NonFinitePoint { point });
    }
    mesh.triangle_at(point)
        .map(|(view, offset)| (view.key(), offset))
        .ok_or(LocateError::NotCovered { point })
}

/// Finds every triangle whose circumcircle strictly contains `point`.
///
/// The walk starts at `start` (viewed from `frame`, which must contain
/// `point`) and crosses every border edge whose neighbour, placed in the
/// walk's frame, has `point` strictly inside its circumcircle. A neighbour
/// that fails the test is added anyway when the point is not strictly on the
/// inner side of the border edge leading to it.
///
/// # Errors
///
/// Returns [`ConflictError`] if `start` is stale or the region found is not a
/// disk that is star-shaped around `point`.
pub fn find_conflict_region(
    mesh: &PeriodicMesh,
    point: Point2,
    start: TriangleKey,
    frame: ChunkOffset,
) -> Result<ConflictRegion, ConflictError> {
    if !mesh.contains_triangle(start) {
        return Err(ConflictError::InvalidStartTriangle { triangle: start });
    }

    let mut region = ConflictRegion::default();
    let mut queue: Vec<(EdgeKey, ChunkOffset)> = Vec::new();
    register(mesh, start, frame, &mut region, &mut queue);

    while let Some((edge, edge_frame)) = queue.pop() {
        let Some(slot) = region
            .border
            .iter()
            .position(|b| b.edge == edge && b.frame == edge_frame)
        else {
            continue;
        };
        let border = region.border[slot];
        let Some(outer) = mesh.edge(edge).other_triangle(border.inner) else {
            continue;
        };
        let Some((_, outer_frame)) = mesh.triangle_frame_across(outer, edge, edge_frame) else {
            continue;
        };
        if region.triangles.iter().any(|&(t, _)| t == outer) {
            continue;
        }

        let visible = signed_area2(mesh.resolve(border.from), mesh.resolve(border.to), point) > 0.0;
        let in_circle = circle_contains(mesh, outer, outer_frame, point);
        if in_circle || !visible {
            if !in_circle {
                region.widened += 1;
                tracing::warn!(
                    ?outer,
                    %point,
                    "widening conflict region past a border edge the point does not see"
                );
            }
            register(mesh, outer, outer_frame, &mut region, &mut queue);
        }
    }

    check_region_shape(mesh, point, &region)?;

    tracing::trace!(
        triangles = region.triangles.len(),
        border = region.border.len(),
        widened = region.widened,
        "conflict region found"
    );
    Ok(region)
}

/// Checks that `region` is a disk and that `point` sees every border edge
/// from inside.
fn check_region_shape(
    mesh: &PeriodicMesh,
    point: Point2,
    region: &ConflictRegion,
) -> Result<(), ConflictError> {
    // A disk of n triangles without interior vertices has n + 2 sides.
    if region.border.len() != region.triangles.len() + 2 {
        return Err(ConflictError::NonDiskCavity {
            triangles: region.triangles.len(),
            border_edges: region.border.len(),
        });
    }
    if let Some(bad) = region.border.iter().find(|b| {
        signed_area2(mesh.resolve(b.from), mesh.resolve(b.to), point) <= 0.0
    }) {
        return Err(ConflictError::NotStarShaped { edge: bad.edge });
    }
    Ok(())
}

/// Adds a triangle to the region and toggles its sides on the border.
fn register(
    mesh: &PeriodicMesh,
    triangle: TriangleKey,
    frame: ChunkOffset,
    region: &mut ConflictRegion,
    queue: &mut Vec<(EdgeKey, ChunkOffset)>,
) {
    region.triangles.push((triangle, frame));
    let data = mesh.triangle(triangle);
    let corners = data.points();
    for (i, &edge) in data.edges().iter().enumerate() {
        let edge_frame = mesh.edge_frame_in_triangle(data, i, frame);
        if let Some(pos) = region
            .border
            .iter()
            .position(|b| b.edge == edge && b.frame == edge_frame)
        {
            // Shared with a triangle already in the region.
            region.border.remove(pos);
        } else {
            region.border.push(BorderEdge {
                edge,
                frame: edge_frame,
                inner: triangle,
                from: corners[i].shifted(frame),
                to: corners[(i + 1) % 3].shifted(frame),
            });
            queue.push((edge, edge_frame));
        }
    }
}

fn circle_contains(
    mesh: &PeriodicMesh,
    triangle: TriangleKey,
    frame: ChunkOffset,
    point: Point2,
) -> bool {
    let [a, b, c] = mesh.triangle_positions(mesh.triangle(triangle), frame);
    circumcircle(a, b, c).is_some_and(|(center, radius2)| center.squared_distance(point) < radius2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_point_torus() -> PeriodicMesh {
        let mut mesh = PeriodicMesh::new(10.0).unwrap();
        let p = mesh.add_point(Point2::new(0.0, 0.0)).key();
        let lp = |x, y| LocalPoint::new(p, ChunkOffset::new(x, y));
        mesh.add_triangle_unchecked(lp(0, 0), lp(1, 0), lp(1, 1));
        mesh.add_triangle_unchecked(lp(0, 0), lp(1, 1), lp(0, 1));
        mesh
    }

    #[test]
    fn test_locate_errors() {
        let empty = PeriodicMesh::new(10.0).unwrap();
        assert_eq!(
            locate(&empty, Point2::new(1.0, 1.0)),
            Err(LocateError::NotCovered {
                point: Point2::new(1.0, 1.0)
            })
        );
        assert!(matches!(
            locate(&empty, Point2::new(f64::NAN, 1.0)),
            Err(LocateError::NonFinitePoint { .. })
        ));
    }

    #[test]
    fn test_conflict_region_covers_whole_one_point_torus() {
        let mesh = one_point_torus();
        let point = Point2::new(3.0, 6.0);
        let (start, frame) = locate(&mesh, point).unwrap();
        let region = find_conflict_region(&mesh, point, start, frame).unwrap();

        assert_eq!(region.triangles.len(), 2);
        assert_eq!(region.border.len(), 4);
        assert_eq!(region.widened, 0);
        for border in &region.border {
            let a = mesh.resolve(border.from);
            let b = mesh.resolve(border.to);
            assert!(signed_area2(a, b, point) > 0.0);
        }
    }

    /// A triangle `(a, b, c)` above `y = 10` sitting on a sliver `(a, m, b)`
    /// whose middle corner is `drop` below the shared side.
    fn triangle_on_sliver(drop: f64) -> (PeriodicMesh, TriangleKey, [LocalPoint; 4]) {
        let mut mesh = PeriodicMesh::new(100.0).unwrap();
        let mut at = |x, y| LocalPoint::at_origin(mesh.add_point(Point2::new(x, y)).key());
        let a = at(10.0, 10.0);
        let b = at(30.0, 10.0);
        let c = at(20.0, 20.0);
        let m = at(20.0, 10.0 - drop);
        let top = mesh.add_triangle_unchecked(a, b, c);
        mesh.add_triangle_unchecked(a, m, b);
        (mesh, top, [a, b, c, m])
    }

    #[test]
    fn test_sliver_behind_border_widens_region() {
        // The sliver is too flat for a circumcircle, and the point on the
        // shared side does not see it strictly from inside.
        let (mesh, top, _) = triangle_on_sliver(1e-14);
        let point = Point2::new(25.0, 10.0);
        let region = find_conflict_region(&mesh, point, top, ChunkOffset::ZERO).unwrap();

        assert_eq!(region.widened, 1);
        assert_eq!(region.triangles.len(), 2);
        assert_eq!(region.border.len(), 4);
    }

    #[test]
    fn test_collinear_sliver_is_not_star_shaped() {
        let (mesh, top, [a, _, _, m]) = triangle_on_sliver(0.0);
        let point = Point2::new(25.0, 10.0);
        let err = find_conflict_region(&mesh, point, top, ChunkOffset::ZERO).unwrap_err();

        assert_eq!(
            err,
            ConflictError::NotStarShaped {
                edge: mesh.find_edge(a, m).unwrap()
            }
        );
    }

    #[test]
    fn test_region_without_border_is_not_a_disk() {
        let mesh = one_point_torus();
        let region = ConflictRegion {
            triangles: mesh
                .triangle_keys()
                .map(|key| (key, ChunkOffset::ZERO))
                .collect(),
            border: Vec::new(),
            widened: 0,
        };

        assert_eq!(
            check_region_shape(&mesh, Point2::new(3.0, 6.0), &region),
            Err(ConflictError::NonDiskCavity {
                triangles: 2,
                border_edges: 0,
            })
        );
    }

    #[test]
    fn test_stale_start_triangle() {
        let mut mesh = one_point_torus();
        let (start, frame) = locate(&mesh, Point2::new(3.0, 6.0)).unwrap();
        mesh.remove_triangle(start);
        assert_eq!(
            find_conflict_region(&mesh, Point2::new(3.0, 6.0), start, frame).unwrap_err(),
            ConflictError::InvalidStartTriangle { triangle: start }
        );
    }
}
