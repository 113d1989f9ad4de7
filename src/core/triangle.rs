//! Mesh triangles and triangle views.
//!
//! Corners are stored counter-clockwise with the first corner at offset
//! `(0, 0)`. Side `i` joins corner `i` to corner `(i + 1) % 3`.

use crate::core::collections::SmallBuffer;
use crate::core::edge::EdgeView;
use crate::core::local_point::{ChunkOffset, LocalPoint};
use crate::core::periodic_mesh::{EdgeKey, PeriodicMesh, PointKey, TriangleKey};
use crate::core::vertex::PointView;
use crate::geometry::point::Point2;
use crate::geometry::predicates::{
    barycentric, is_on_triangle, segment_intersection, signed_area2, triangle_omega,
};

// =============================================================================
// STORED TRIANGLE
// =============================================================================

/// Stored triangle record.
#[derive(Clone, Debug)]
pub struct MeshTriangle {
    points: [LocalPoint; 3],
    edges: [EdgeKey; 3],
}

impl MeshTriangle {
    pub(crate) const fn new(points: [LocalPoint; 3], edges: [EdgeKey; 3]) -> Self {
        Self { points, edges }
    }

    #[inline]
    #[must_use]
    pub const fn points(&self) -> [LocalPoint; 3] {
        self.points
    }

    #[inline]
    #[must_use]
    pub const fn edges(&self) -> [EdgeKey; 3] {
        self.edges
    }

    #[must_use]
    pub fn contains_point(&self, key: PointKey) -> bool {
        self.points.iter().any(|lp| lp.point == key)
    }

    /// Corner index of `key`, if it is a corner.
    #[must_use]
    pub fn corner_of(&self, key: PointKey) -> Option<usize> {
        self.points.iter().position(|lp| lp.point == key)
    }
}

// =============================================================================
// TRIANGLE VIEW
// =============================================================================

/// A triangle seen from a particular chunk.
#[derive(Clone, Copy, Debug)]
pub struct TriangleView<'m> {
    mesh: &'m PeriodicMesh,
    key: TriangleKey,
    offset: ChunkOffset,
}

impl<'m> TriangleView<'m> {
    pub(crate) const fn new(mesh: &'m PeriodicMesh, key: TriangleKey, offset: ChunkOffset) -> Self {
        Self { mesh, key, offset }
    }

    #[inline]
    #[must_use]
    pub const fn key(&self) -> TriangleKey {
        self.key
    }

    /// Translation applied to the stored corners.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> ChunkOffset {
        self.offset
    }

    #[must_use]
    pub fn data(&self) -> &'m MeshTriangle {
        self.mesh.triangle(self.key)
    }

    /// Corner `index` as a chunk-relative point in this view's frame.
    #[must_use]
    pub fn local(&self, index: usize) -> LocalPoint {
        self.data().points()[index].shifted(self.offset)
    }

    #[must_use]
    pub fn point(&self, index: usize) -> PointView<'m> {
        let corner = self.local(index);
        PointView::new(self.mesh, corner.point, corner.offset)
    }

    #[must_use]
    pub fn points(&self) -> [PointView<'m>; 3] {
        [self.point(0), self.point(1), self.point(2)]
    }

    #[must_use]
    pub fn positions(&self) -> [Point2; 3] {
        self.mesh.triangle_positions(self.data(), self.offset)
    }

    /// Side `index`, in this view's frame.
    #[must_use]
    pub fn edge(&self, index: usize) -> EdgeView<'m> {
        let data = self.data();
        let frame = self.mesh.edge_frame_in_triangle(data, index, self.offset);
        EdgeView::new(self.mesh, data.edges()[index], frame)
    }

    #[must_use]
    pub fn edges(&self) -> [EdgeView<'m>; 3] {
        [self.edge(0), self.edge(1), self.edge(2)]
    }

    /// Side index of `edge`, if it is a side of this triangle.
    #[must_use]
    pub fn edge_index(&self, edge: EdgeKey) -> Option<usize> {
        self.data().edges().iter().position(|&e| e == edge)
    }

    /// Triangle across side `index`, placed so the shared side coincides.
    #[must_use]
    pub fn neighbor(&self, index: usize) -> Option<TriangleView<'m>> {
        let side = self.edge(index);
        let other = side.data().other_triangle(self.key)?;
        let (_, frame) = self
            .mesh
            .triangle_frame_across(other, side.key(), side.offset())?;
        Some(TriangleView::new(self.mesh, other, frame))
    }

    #[must_use]
    pub fn neighbors(&self) -> [Option<TriangleView<'m>>; 3] {
        [self.neighbor(0), self.neighbor(1), self.neighbor(2)]
    }

    #[must_use]
    pub fn centroid(&self) -> Point2 {
        let [a, b, c] = self.positions();
        (a + b + c) * (1.0 / 3.0)
    }

    /// Circumcenter; `None` for a degenerate triangle.
    #[must_use]
    pub fn circumcenter(&self) -> Option<Point2> {
        let [a, b, c] = self.positions();
        triangle_omega(a, b, c)
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        let [a, b, c] = self.positions();
        0.5 * signed_area2(a, b, c)
    }

    /// `pos` lies inside or on the boundary of the resolved triangle.
    #[must_use]
    pub fn contains(&self, pos: Point2) -> bool {
        let [a, b, c] = self.positions();
        is_on_triangle(pos, a, b, c)
    }

    /// Barycentric weights of `pos`, in corner order.
    #[must_use]
    pub fn barycentric(&self, pos: Point2) -> Option<[f64; 3]> {
        let [a, b, c] = self.positions();
        barycentric(pos, a, b, c)
    }

    /// Crossings of the segment `from → to` with the triangle's sides, as
    /// `(side index, point)` pairs.
    #[must_use]
    pub fn intersect_segment(&self, from: Point2, to: Point2) -> SmallBuffer<(usize, Point2), 3> {
        let corners = self.positions();
        (0..3)
            .filter_map(|i| {
                segment_intersection(from, to, corners[i], corners[(i + 1) % 3]).map(|p| (i, p))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_view_geometry() {
        let mut mesh = PeriodicMesh::new(10.0).unwrap();
        let a = LocalPoint::at_origin(mesh.add_point(Point2::new(9.0, 1.0)).key());
        let b = LocalPoint::new(
            mesh.add_point(Point2::new(1.0, 1.0)).key(),
            ChunkOffset::new(1, 0),
        );
        let c = LocalPoint::new(
            mesh.add_point(Point2::new(0.0, 3.0)).key(),
            ChunkOffset::new(1, 0),
        );
        let t = mesh.add_triangle_unchecked(a, b, c);
        let view = mesh.triangle_view(t);

        let [pa, pb, pc] = view.positions();
        assert_relative_eq!(pa.x, 9.0);
        assert_relative_eq!(pb.x, 11.0);
        assert_relative_eq!(pc.x, 10.0);
        assert_relative_eq!(view.area(), 2.0);
        let centroid = view.centroid();
        assert_relative_eq!(centroid.x, 10.0);
        assert_relative_eq!(centroid.y, 5.0 / 3.0);
        assert!(view.contains(centroid));

        let center = view.circumcenter().unwrap();
        assert_relative_eq!(center.distance(pa), center.distance(pc), epsilon = 1e-12);

        let w = view.barycentric(pa).unwrap();
        assert_relative_eq!(w[0], 1.0, epsilon = 1e-12);

        let hits = view.intersect_segment(Point2::new(8.0, 1.5), Point2::new(12.0, 1.5));
        assert_eq!(hits.len(), 2);

        // Every side's frame reproduces the triangle's own corners.
        for (i, side) in view.edges().iter().enumerate() {
            let ends = side.positions();
            let corners = view.positions();
            let from = corners[i];
            let to = corners[(i + 1) % 3];
            assert!(
                (ends[0] == from && ends[1] == to) || (ends[0] == to && ends[1] == from),
                "side {i} misplaced"
            );
        }

        let shifted = mesh.triangle_view_at(t, ChunkOffset::new(-1, 0));
        assert_relative_eq!(shifted.positions()[0].x, -1.0);
        assert!(shifted.neighbors().iter().all(Option::is_none));
    }
}
