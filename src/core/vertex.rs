//! Mesh points and point views.
//!
//! A [`MeshPoint`] is the stored record: a canonical position plus adjacency
//! lists. A [`PointView`] borrows the mesh and adds the chunk the point is seen
//! from, so its [`position`](PointView::position) may lie outside the domain.

use crate::core::collections::{PointEdgeBuffer, PointTriangleBuffer};
use crate::core::edge::EdgeView;
use crate::core::local_point::{ChunkOffset, LocalPoint};
use crate::core::periodic_mesh::{EdgeKey, PeriodicMesh, PointKey, TriangleKey};
use crate::core::triangle::TriangleView;
use crate::geometry::point::Point2;

// =============================================================================
// STORED POINT
// =============================================================================

/// Stored point record.
#[derive(Clone, Debug)]
pub struct MeshPoint {
    position: Point2,
    edges: PointEdgeBuffer,
    triangles: PointTriangleBuffer,
}

impl MeshPoint {
    pub(crate) fn new(position: Point2) -> Self {
        Self {
            position,
            edges: PointEdgeBuffer::new(),
            triangles: PointTriangleBuffer::new(),
        }
    }

    /// Canonical position in `[0, size)²`.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> Point2 {
        self.position
    }

    /// Incident edges, each listed once.
    #[inline]
    #[must_use]
    pub fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }

    /// Incident triangles, each listed once.
    #[inline]
    #[must_use]
    pub fn triangles(&self) -> &[TriangleKey] {
        &self.triangles
    }

    pub(crate) fn link_edge(&mut self, edge: EdgeKey) {
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    pub(crate) fn unlink_edge(&mut self, edge: EdgeKey) {
        self.edges.retain(|e| *e != edge);
    }

    pub(crate) fn link_triangle(&mut self, triangle: TriangleKey) {
        if !self.triangles.contains(&triangle) {
            self.triangles.push(triangle);
        }
    }

    pub(crate) fn unlink_triangle(&mut self, triangle: TriangleKey) {
        self.triangles.retain(|t| *t != triangle);
    }
}

// =============================================================================
// POINT VIEW
// =============================================================================

/// A point seen from a particular chunk.
///
/// Edges and triangles reached through the view are composed into the same
/// frame, so their positions line up with [`position`](Self::position).
#[derive(Clone, Copy, Debug)]
pub struct PointView<'m> {
    mesh: &'m PeriodicMesh,
    key: PointKey,
    offset: ChunkOffset,
}

impl<'m> PointView<'m> {
    pub(crate) const fn new(mesh: &'m PeriodicMesh, key: PointKey, offset: ChunkOffset) -> Self {
        Self { mesh, key, offset }
    }

    #[inline]
    #[must_use]
    pub const fn key(&self) -> PointKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub const fn offset(&self) -> ChunkOffset {
        self.offset
    }

    #[inline]
    #[must_use]
    pub const fn local(&self) -> LocalPoint {
        LocalPoint::new(self.key, self.offset)
    }

    #[inline]
    #[must_use]
    pub const fn mesh(&self) -> &'m PeriodicMesh {
        self.mesh
    }

    fn data(&self) -> &'m MeshPoint {
        self.mesh.point(self.key)
    }

    /// Canonical position, ignoring the view's offset.
    #[must_use]
    pub fn base_position(&self) -> Point2 {
        self.data().position()
    }

    /// Position lifted into the view's chunk.
    #[must_use]
    pub fn position(&self) -> Point2 {
        self.mesh.point_position(self.key, self.offset)
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.data().edges().len()
    }

    /// Incident edge `index`, in this view's frame.
    ///
    /// # Panics
    ///
    /// Panics if `index >= edge_count()`.
    #[must_use]
    pub fn edge(&self, index: usize) -> EdgeView<'m> {
        let key = self.data().edges()[index];
        let [first, second] = self.mesh.edge(key).points();
        let own = if first.point == self.key { first } else { second };
        EdgeView::new(self.mesh, key, self.offset - own.offset)
    }

    pub fn edges(self) -> impl Iterator<Item = EdgeView<'m>> {
        (0..self.edge_count()).map(move |i| self.edge(i))
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.data().triangles().len()
    }

    /// Incident triangle `index`, in this view's frame.
    ///
    /// # Panics
    ///
    /// Panics if `index >= triangle_count()`.
    #[must_use]
    pub fn triangle(&self, index: usize) -> TriangleView<'m> {
        let key = self.data().triangles()[index];
        let own = self
            .mesh
            .triangle(key)
            .points()
            .into_iter()
            .find(|lp| lp.point == self.key)
            .map_or(ChunkOffset::ZERO, |lp| lp.offset);
        TriangleView::new(self.mesh, key, self.offset - own)
    }

    pub fn triangles(self) -> impl Iterator<Item = TriangleView<'m>> {
        (0..self.triangle_count()).map(move |i| self.triangle(i))
    }

    /// The far endpoint of every incident edge, in this view's frame.
    pub fn neighbors(self) -> impl Iterator<Item = PointView<'m>> {
        self.edges().map(move |edge| edge.opposite(self.key))
    }
}
