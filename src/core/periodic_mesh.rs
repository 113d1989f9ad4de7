//! Periodic triangle mesh on a square torus.
//!
//! [`PeriodicMesh`] owns three slotmap arenas (points, edges, triangles), an
//! index from [`EdgeSignature`] to edge key, and a [`ChunkGrid`] used to find
//! the triangle covering a position.
//!
//! # Chunk-relative references
//!
//! Every stored point has canonical coordinates in `[0, size)²`. Edges and
//! triangles refer to their corners through [`LocalPoint`]s; the offset of the
//! first corner is always `(0, 0)` and the other offsets say in which copy of
//! the domain the corner sits relative to the first one.
//!
//! # Views
//!
//! [`PointView`], [`EdgeView`] and [`TriangleView`] borrow the mesh and carry an
//! extra frame offset, so walking from a triangle to its neighbour keeps the
//! geometry continuous across the domain border. The borrow checker keeps a
//! view from outliving a mutation of the mesh.
//!
//! # Invariants
//!
//! - Triangles are stored counter-clockwise in resolved coordinates.
//! - Each edge is shared by at most two triangles; an edge left with no
//!   triangle by [`PeriodicMesh::remove_triangle`] is deleted.
//! - Point, edge and triangle adjacency lists agree with each other.
//! - Every triangle is registered in each chunk its bounding box touches.

use crate::core::collections::{
    ChunkGrid, FastHashMap, PointEdgeBuffer, StorageMap, TriangleKeyBuffer,
    fast_hash_map_with_capacity,
};
use crate::core::edge::{EdgeSignature, EdgeView, MeshEdge};
use crate::core::local_point::{ChunkOffset, LocalPoint};
use crate::core::triangle::{MeshTriangle, TriangleView};
use crate::core::vertex::{MeshPoint, PointView};
use crate::geometry::point::Point2;
use crate::geometry::predicates::{is_on_triangle, signed_area2};
use crate::topology::spaces::toroidal::{ToroidalSpace, ToroidalSpaceError};
use slotmap::new_key_type;

// =============================================================================
// KEYS
// =============================================================================

new_key_type! {
    /// Key of a point in a [`PeriodicMesh`].
    pub struct PointKey;
}

new_key_type! {
    /// Key of an edge in a [`PeriodicMesh`].
    pub struct EdgeKey;
}

new_key_type! {
    /// Key of a triangle in a [`PeriodicMesh`].
    pub struct TriangleKey;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors reported by the checked mutation paths.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MeshError {
    /// A key does not refer to a live point.
    #[error("Stale point key {point:?}")]
    StalePoint {
        /// The stale key.
        point: PointKey,
    },
    /// Adding the triangle would give an edge a third triangle.
    #[error("Edge {edge:?} already has two triangles")]
    NonManifoldEdge {
        /// The saturated edge.
        edge: EdgeKey,
    },
}

// =============================================================================
// VALIDATION TYPES
// =============================================================================

/// Structural inconsistencies detected by [`PeriodicMesh::is_valid`].
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MeshValidationError {
    /// A point's position or adjacency lists are inconsistent.
    #[error("Point {point:?}: {message}")]
    InconsistentPoint {
        /// The offending point.
        point: PointKey,
        /// What went wrong.
        message: String,
    },
    /// An edge's endpoints or triangle slots are inconsistent.
    #[error("Edge {edge:?}: {message}")]
    InconsistentEdge {
        /// The offending edge.
        edge: EdgeKey,
        /// What went wrong.
        message: String,
    },
    /// A triangle's corners, edges or orientation are inconsistent.
    #[error("Triangle {triangle:?}: {message}")]
    InconsistentTriangle {
        /// The offending triangle.
        triangle: TriangleKey,
        /// What went wrong.
        message: String,
    },
    /// The signature index disagrees with the edge arena.
    #[error("Edge index out of sync: {message}")]
    EdgeIndex {
        /// What went wrong.
        message: String,
    },
}

/// Classifies invariants for diagnostic reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// Point positions lie in the fundamental domain.
    PointPosition,
    /// Point adjacency lists match edges and triangles.
    PointAdjacency,
    /// Edge triangle slots match triangles; no orphaned edges.
    EdgeAdjacency,
    /// Triangle corners, edges, offsets and orientation.
    TriangleStructure,
    /// Signature index matches the edge arena.
    EdgeIndex,
    /// Triangles are registered in every chunk they overlap.
    ChunkRegistration,
}

/// A single invariant violation recorded during validation diagnostics.
#[derive(Clone, Debug)]
pub struct InvariantViolation {
    /// The kind of invariant that failed.
    pub kind: InvariantKind,
    /// The detailed validation error explaining the failure.
    pub error: MeshValidationError,
}

/// Aggregate report of one or more validation failures.
#[derive(Clone, Debug, Default)]
pub struct MeshValidationReport {
    /// The ordered list of invariant violations that occurred.
    pub violations: Vec<InvariantViolation>,
}

impl MeshValidationReport {
    /// Returns `true` if no violations were recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    fn push(&mut self, kind: InvariantKind, error: MeshValidationError) {
        self.violations.push(InvariantViolation { kind, error });
    }
}

// =============================================================================
// MESH STRUCT
// =============================================================================

/// Periodic triangle mesh on a square torus of side `domain_size`.
#[derive(Clone, Debug)]
pub struct PeriodicMesh {
    space: ToroidalSpace,
    points: StorageMap<PointKey, MeshPoint>,
    edges: StorageMap<EdgeKey, MeshEdge>,
    triangles: StorageMap<TriangleKey, MeshTriangle>,
    edge_index: FastHashMap<EdgeSignature, EdgeKey>,
    chunks: ChunkGrid,
    generation: u64,
}

impl PeriodicMesh {
    /// Creates an empty mesh.
    ///
    /// # Errors
    ///
    /// Returns an error if `domain_size` is not finite and positive.
    pub fn new(domain_size: f64) -> Result<Self, ToroidalSpaceError> {
        Self::with_capacity(domain_size, 0)
    }

    /// Creates an empty mesh with arenas and chunk grid sized for about
    /// `point_hint` points.
    ///
    /// # Errors
    ///
    /// Returns an error if `domain_size` is not finite and positive.
    pub fn with_capacity(domain_size: f64, point_hint: usize) -> Result<Self, ToroidalSpaceError> {
        Self::with_chunk_size(domain_size, point_hint, None)
    }

    /// Like [`with_capacity`](Self::with_capacity), with an explicit chunk size
    /// for the spatial index.
    ///
    /// # Errors
    ///
    /// Returns an error if `domain_size` is not finite and positive.
    pub fn with_chunk_size(
        domain_size: f64,
        point_hint: usize,
        chunk_size: Option<f64>,
    ) -> Result<Self, ToroidalSpaceError> {
        let space = ToroidalSpace::new(domain_size)?;
        let chunks = match chunk_size {
            Some(size) => ChunkGrid::with_chunk_size(domain_size, size),
            None => ChunkGrid::for_point_count(domain_size, point_hint),
        };
        Ok(Self {
            space,
            points: StorageMap::with_capacity_and_key(point_hint),
            edges: StorageMap::with_capacity_and_key(3 * point_hint),
            triangles: StorageMap::with_capacity_and_key(2 * point_hint),
            edge_index: fast_hash_map_with_capacity(3 * point_hint),
            chunks,
            generation: 0,
        })
    }

    /// Empty mesh on the same domain, with the same chunk resolution and
    /// room for as many points.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        let points = self.points.len();
        Self {
            space: self.space,
            points: StorageMap::with_capacity_and_key(points),
            edges: StorageMap::with_capacity_and_key(points),
            triangles: StorageMap::with_key(),
            edge_index: fast_hash_map_with_capacity(points),
            chunks: self.chunks.empty_like(),
            generation: 0,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[inline]
    #[must_use]
    pub const fn space(&self) -> &ToroidalSpace {
        &self.space
    }

    #[inline]
    #[must_use]
    pub const fn domain_size(&self) -> f64 {
        self.space.size()
    }

    #[must_use]
    pub fn number_of_points(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn number_of_edges(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn number_of_triangles(&self) -> usize {
        self.triangles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Counter bumped by every structural change.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn points(&self) -> impl Iterator<Item = (PointKey, &MeshPoint)> {
        self.points.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeKey, &MeshEdge)> {
        self.edges.iter()
    }

    pub fn triangles(&self) -> impl Iterator<Item = (TriangleKey, &MeshTriangle)> {
        self.triangles.iter()
    }

    pub fn point_keys(&self) -> impl Iterator<Item = PointKey> {
        self.points.keys()
    }

    pub fn triangle_keys(&self) -> impl Iterator<Item = TriangleKey> {
        self.triangles.keys()
    }

    #[must_use]
    pub fn get_point(&self, key: PointKey) -> Option<&MeshPoint> {
        self.points.get(key)
    }

    #[must_use]
    pub fn get_edge(&self, key: EdgeKey) -> Option<&MeshEdge> {
        self.edges.get(key)
    }

    #[must_use]
    pub fn get_triangle(&self, key: TriangleKey) -> Option<&MeshTriangle> {
        self.triangles.get(key)
    }

    #[must_use]
    pub fn contains_point(&self, key: PointKey) -> bool {
        self.points.contains_key(key)
    }

    #[must_use]
    pub fn contains_edge(&self, key: EdgeKey) -> bool {
        self.edges.contains_key(key)
    }

    #[must_use]
    pub fn contains_triangle(&self, key: TriangleKey) -> bool {
        self.triangles.contains_key(key)
    }

    /// The point behind `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is stale.
    #[must_use]
    pub fn point(&self, key: PointKey) -> &MeshPoint {
        &self.points[key]
    }

    /// The edge behind `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is stale.
    #[must_use]
    pub fn edge(&self, key: EdgeKey) -> &MeshEdge {
        &self.edges[key]
    }

    /// The triangle behind `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is stale.
    #[must_use]
    pub fn triangle(&self, key: TriangleKey) -> &MeshTriangle {
        &self.triangles[key]
    }

    /// Looks up the edge joining two chunk-relative points.
    #[must_use]
    pub fn find_edge(&self, a: LocalPoint, b: LocalPoint) -> Option<EdgeKey> {
        self.find_edge_by_signature(&EdgeSignature::new(a, b))
    }

    #[must_use]
    pub fn find_edge_by_signature(&self, signature: &EdgeSignature) -> Option<EdgeKey> {
        self.edge_index.get(signature).copied()
    }

    pub(crate) const fn chunk_grid(&self) -> &ChunkGrid {
        &self.chunks
    }

    // =========================================================================
    // POSITIONS
    // =========================================================================

    /// Position of `key` lifted into the chunk at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is stale.
    #[inline]
    #[must_use]
    pub fn point_position(&self, key: PointKey, offset: ChunkOffset) -> Point2 {
        self.space.lift(self.points[key].position(), offset)
    }

    #[inline]
    #[must_use]
    pub fn resolve(&self, local: LocalPoint) -> Point2 {
        self.point_position(local.point, local.offset)
    }

    /// Corner positions of `triangle` viewed from `frame`.
    #[must_use]
    pub fn triangle_positions(&self, triangle: &MeshTriangle, frame: ChunkOffset) -> [Point2; 3] {
        triangle.points().map(|lp| self.resolve(lp.shifted(frame)))
    }

    fn triangle_bounds(&self, triangle: &MeshTriangle) -> (Point2, Point2) {
        bounds(&self.triangle_positions(triangle, ChunkOffset::ZERO))
    }

    // =========================================================================
    // VIEWS
    // =========================================================================

    /// View of a point in the untranslated chunk.
    ///
    /// # Panics
    ///
    /// Panics if `key` is stale.
    #[must_use]
    pub fn point_view(&self, key: PointKey) -> PointView<'_> {
        self.point_view_at(key, ChunkOffset::ZERO)
    }

    /// # Panics
    ///
    /// Panics if `key` is stale.
    #[must_use]
    pub fn point_view_at(&self, key: PointKey, offset: ChunkOffset) -> PointView<'_> {
        assert!(self.points.contains_key(key), "stale point key {key:?}");
        PointView::new(self, key, offset)
    }

    /// # Panics
    ///
    /// Panics if `key` is stale.
    #[must_use]
    pub fn edge_view(&self, key: EdgeKey) -> EdgeView<'_> {
        self.edge_view_at(key, ChunkOffset::ZERO)
    }

    /// # Panics
    ///
    /// Panics if `key` is stale.
    #[must_use]
    pub fn edge_view_at(&self, key: EdgeKey, offset: ChunkOffset) -> EdgeView<'_> {
        assert!(self.edges.contains_key(key), "stale edge key {key:?}");
        EdgeView::new(self, key, offset)
    }

    /// # Panics
    ///
    /// Panics if `key` is stale.
    #[must_use]
    pub fn triangle_view(&self, key: TriangleKey) -> TriangleView<'_> {
        self.triangle_view_at(key, ChunkOffset::ZERO)
    }

    /// # Panics
    ///
    /// Panics if `key` is stale.
    #[must_use]
    pub fn triangle_view_at(&self, key: TriangleKey, offset: ChunkOffset) -> TriangleView<'_> {
        assert!(self.triangles.contains_key(key), "stale triangle key {key:?}");
        TriangleView::new(self, key, offset)
    }

    // =========================================================================
    // FRAME COMPOSITION
    // =========================================================================

    /// Frame of edge `index` of `triangle` when the triangle is viewed from
    /// `frame`.
    ///
    /// Edge `index` joins corners `index` and `index + 1`. The stored edge may
    /// run in either direction, and its first endpoint may correspond to either
    /// corner.
    pub(crate) fn edge_frame_in_triangle(
        &self,
        triangle: &MeshTriangle,
        index: usize,
        frame: ChunkOffset,
    ) -> ChunkOffset {
        let corners = triangle.points();
        let from = corners[index];
        let to = corners[(index + 1) % 3];
        let [ea, eb] = self.edges[triangle.edges()[index]].points();
        if ea.point == from.point
            && eb.point == to.point
            && eb.offset - ea.offset == to.offset - from.offset
        {
            frame + from.offset - ea.offset
        } else {
            frame + to.offset - ea.offset
        }
    }

    /// Finds `edge` among the sides of `triangle` and returns the side index
    /// together with the frame in which that side coincides with `edge` viewed
    /// from `edge_frame`.
    pub(crate) fn triangle_frame_across(
        &self,
        triangle: TriangleKey,
        edge: EdgeKey,
        edge_frame: ChunkOffset,
    ) -> Option<(usize, ChunkOffset)> {
        let tri = self.triangles.get(triangle)?;
        let index = tri.edges().iter().position(|&e| e == edge)?;
        let own = self.edge_frame_in_triangle(tri, index, ChunkOffset::ZERO);
        Some((index, edge_frame - own))
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    #[inline]
    const fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Adds a point, clamping `pos` into the fundamental domain.
    ///
    /// The returned view has offset `(0, 0)`.
    pub fn add_point(&mut self, pos: Point2) -> PointView<'_> {
        let key = self.insert_point(pos);
        self.point_view(key)
    }

    pub(crate) fn insert_point(&mut self, pos: Point2) -> PointKey {
        debug_assert!(pos.is_finite(), "non-finite point {pos}");
        let key = self.points.insert(MeshPoint::new(self.space.clamp(pos)));
        self.bump_generation();
        key
    }

    /// Removes a point together with every triangle and edge touching it.
    ///
    /// # Panics
    ///
    /// Panics if `key` is stale.
    pub fn remove_point(&mut self, key: PointKey) {
        assert!(self.points.contains_key(key), "remove_point: stale key {key:?}");
        let touching: TriangleKeyBuffer = self.points[key].triangles().iter().copied().collect();
        for triangle in touching {
            self.remove_triangle(triangle);
        }
        // Whatever is left is not part of any triangle.
        let dangling: PointEdgeBuffer = self.points[key].edges().iter().copied().collect();
        for edge in dangling {
            self.remove_edge_entity(edge);
        }
        self.points.remove(key);
        self.bump_generation();
    }

    /// Adds a triangle without checking for an identical existing triangle.
    ///
    /// Offsets are normalized so the first corner sits at `(0, 0)`, and the
    /// winding is flipped if needed so the triangle is counter-clockwise. Edges
    /// are looked up by signature and created when missing.
    ///
    /// # Panics
    ///
    /// Panics if a corner key is stale, or if an edge of the new triangle
    /// already has two triangles.
    pub fn add_triangle_unchecked(
        &mut self,
        a: LocalPoint,
        b: LocalPoint,
        c: LocalPoint,
    ) -> TriangleKey {
        for corner in [a, b, c] {
            assert!(
                self.points.contains_key(corner.point),
                "add_triangle: stale point key {:?}",
                corner.point
            );
        }
        let base = a.offset;
        let mut corners = [a, b, c].map(|lp| lp.shifted(-base));
        let pos = corners.map(|lp| self.resolve(lp));
        if signed_area2(pos[0], pos[1], pos[2]) < 0.0 {
            corners.swap(1, 2);
        }

        let edges = [0, 1, 2].map(|i| self.find_or_create_edge(corners[i], corners[(i + 1) % 3]));
        let triangle = MeshTriangle::new(corners, edges);
        let (min, max) = self.triangle_bounds(&triangle);
        let key = self.triangles.insert(triangle);

        for edge in edges {
            let attached = self.edges[edge].attach_triangle(key);
            assert!(attached, "edge {edge:?} already has two triangles");
        }
        for corner in corners {
            self.points[corner.point].link_triangle(key);
        }
        self.chunks.insert(key, min, max);
        self.bump_generation();
        key
    }

    /// Adds a triangle unless one with the same corners (up to rotation and a
    /// common translation) already exists, in which case that one is returned.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::StalePoint`] for a dead corner key and
    /// [`MeshError::NonManifoldEdge`] if a side is already shared by two
    /// triangles. The mesh is unchanged on error.
    pub fn add_triangle(
        &mut self,
        a: LocalPoint,
        b: LocalPoint,
        c: LocalPoint,
    ) -> Result<TriangleKey, MeshError> {
        let corners = [a, b, c];
        if let Some(stale) = corners.iter().find(|lp| !self.points.contains_key(lp.point)) {
            return Err(MeshError::StalePoint { point: stale.point });
        }

        let wanted = canonical_corner_set(corners);
        let existing = self.points[a.point]
            .triangles()
            .iter()
            .copied()
            .find(|&t| canonical_corner_set(self.triangles[t].points()) == wanted);
        if let Some(key) = existing {
            return Ok(key);
        }

        for i in 0..3 {
            let signature = EdgeSignature::new(corners[i], corners[(i + 1) % 3]);
            if let Some(edge) = self.find_edge_by_signature(&signature)
                && self.edges[edge].triangle_count() == 2
            {
                return Err(MeshError::NonManifoldEdge { edge });
            }
        }
        Ok(self.add_triangle_unchecked(a, b, c))
    }

    /// Removes a triangle; edges left without any triangle are deleted too.
    ///
    /// # Panics
    ///
    /// Panics if `key` is stale.
    pub fn remove_triangle(&mut self, key: TriangleKey) {
        assert!(
            self.triangles.contains_key(key),
            "remove_triangle: stale key {key:?}"
        );
        let Some(triangle) = self.triangles.remove(key) else {
            return;
        };
        let (min, max) = self.triangle_bounds(&triangle);
        self.chunks.remove(key, min, max);

        for corner in triangle.points() {
            if let Some(point) = self.points.get_mut(corner.point) {
                point.unlink_triangle(key);
            }
        }
        for edge in triangle.edges() {
            let orphaned = self.edges.get_mut(edge).is_some_and(|e| {
                e.detach_triangle(key);
                e.is_orphan()
            });
            if orphaned {
                self.remove_edge_entity(edge);
            }
        }
        self.bump_generation();
    }

    /// Adds (or finds) an edge that need not belong to any triangle.
    ///
    /// Used for graph-style meshes.
    ///
    /// # Panics
    ///
    /// Panics if either key is stale.
    pub fn add_edge(&mut self, a: LocalPoint, b: LocalPoint) -> EdgeKey {
        assert!(
            self.points.contains_key(a.point) && self.points.contains_key(b.point),
            "add_edge: stale point key"
        );
        let key = self.find_or_create_edge(a, b);
        self.bump_generation();
        key
    }

    fn find_or_create_edge(&mut self, a: LocalPoint, b: LocalPoint) -> EdgeKey {
        let signature = EdgeSignature::new(a, b);
        if let Some(&key) = self.edge_index.get(&signature) {
            return key;
        }
        let key = self.edges.insert(MeshEdge::from_signature(signature));
        self.edge_index.insert(signature, key);
        self.points[signature.first()].link_edge(key);
        self.points[signature.second()].link_edge(key);
        key
    }

    fn remove_edge_entity(&mut self, key: EdgeKey) {
        let Some(edge) = self.edges.remove(key) else {
            return;
        };
        self.edge_index.remove(&edge.signature());
        for end in edge.points() {
            if let Some(point) = self.points.get_mut(end.point) {
                point.unlink_edge(key);
            }
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Triangle covering `pos`, together with the translation under which it
    /// covers it.
    ///
    /// `pos` may lie outside the fundamental domain. The returned view's frame
    /// (equal to the returned offset) is chosen so that its resolved corners
    /// contain `pos` itself. Returns `None` if no triangle covers the position
    /// (empty or graph-only mesh).
    #[must_use]
    pub fn triangle_at(&self, pos: Point2) -> Option<(TriangleView<'_>, ChunkOffset)> {
        if !pos.is_finite() {
            return None;
        }
        let size = self.domain_size();
        let wrapped = self.space.canonicalize(pos);
        let shift = ChunkOffset::new(
            round_to_i32((pos.x - wrapped.x) / size),
            round_to_i32((pos.y - wrapped.y) / size),
        );

        for &key in self.chunks.candidates(wrapped) {
            let corners = self.triangle_positions(&self.triangles[key], ChunkOffset::ZERO);
            let (min, max) = bounds(&corners);
            let xs = round_down_to_i32((wrapped.x - max.x) / size)
                ..=round_up_to_i32((wrapped.x - min.x) / size);
            for oy in round_down_to_i32((wrapped.y - max.y) / size)
                ..=round_up_to_i32((wrapped.y - min.y) / size)
            {
                for ox in xs.clone() {
                    let offset = ChunkOffset::new(ox, oy);
                    let query = wrapped - self.space.translation(offset);
                    if is_on_triangle(query, corners[0], corners[1], corners[2]) {
                        let frame = offset + shift;
                        return Some((TriangleView::new(self, key, frame), frame));
                    }
                }
            }
        }
        None
    }

    /// Point nearest to `pos`, viewed from the frame in which it is nearest.
    ///
    /// Walks greedily over edges from the corners of the covering triangle.
    /// Falls back to a linear scan when no triangle covers `pos`.
    #[must_use]
    pub fn nearest_point(&self, pos: Point2) -> Option<PointView<'_>> {
        let dist = |p: &PointView<'_>| p.position().squared_distance(pos);
        if let Some((triangle, _)) = self.triangle_at(pos) {
            let mut best = triangle
                .points()
                .into_iter()
                .min_by(|a, b| dist(a).total_cmp(&dist(b)))?;
            loop {
                let current = dist(&best);
                let closer = best
                    .neighbors()
                    .filter(|n| dist(n) < current)
                    .min_by(|a, b| dist(a).total_cmp(&dist(b)));
                match closer {
                    Some(next) => best = next,
                    None => return Some(best),
                }
            }
        }

        let size = self.domain_size();
        self.points
            .iter()
            .min_by(|(_, a), (_, b)| {
                self.space
                    .distance_squared(a.position(), pos)
                    .total_cmp(&self.space.distance_squared(b.position(), pos))
            })
            .map(|(key, point)| {
                let nearest_image = pos - self.space.delta(point.position(), pos);
                let offset = ChunkOffset::new(
                    round_to_i32((nearest_image.x - point.position().x) / size),
                    round_to_i32((nearest_image.y - point.position().y) / size),
                );
                PointView::new(self, key, offset)
            })
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Checks every structural invariant and returns the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first [`MeshValidationError`] found.
    pub fn is_valid(&self) -> Result<(), MeshValidationError> {
        match self.validation_report().violations.into_iter().next() {
            Some(violation) => Err(violation.error),
            None => Ok(()),
        }
    }

    /// Checks every structural invariant and collects all failures.
    #[must_use]
    pub fn validation_report(&self) -> MeshValidationReport {
        let mut report = MeshValidationReport::default();
        self.check_points(&mut report);
        self.check_edges(&mut report);
        self.check_triangles(&mut report);
        if report.is_empty() {
            tracing::trace!(
                points = self.points.len(),
                edges = self.edges.len(),
                triangles = self.triangles.len(),
                "periodic mesh validated"
            );
        } else {
            tracing::debug!(
                violations = report.violations.len(),
                "periodic mesh validation failed"
            );
        }
        report
    }

    fn check_points(&self, report: &mut MeshValidationReport) {
        for (key, point) in &self.points {
            let fail = |message: String| MeshValidationError::InconsistentPoint {
                point: key,
                message,
            };
            if !self.space.contains(point.position()) {
                report.push(
                    InvariantKind::PointPosition,
                    fail(format!("position {} outside the domain", point.position())),
                );
            }
            for &edge in point.edges() {
                let linked = self
                    .edges
                    .get(edge)
                    .is_some_and(|e| e.points().iter().any(|lp| lp.point == key));
                if !linked {
                    report.push(
                        InvariantKind::PointAdjacency,
                        fail(format!("lists edge {edge:?} which does not end at it")),
                    );
                }
            }
            for &triangle in point.triangles() {
                let linked = self
                    .triangles
                    .get(triangle)
                    .is_some_and(|t| t.contains_point(key));
                if !linked {
                    report.push(
                        InvariantKind::PointAdjacency,
                        fail(format!("lists triangle {triangle:?} which does not use it")),
                    );
                }
            }
        }
    }

    fn check_edges(&self, report: &mut MeshValidationReport) {
        let has_triangles = !self.triangles.is_empty();
        for (key, edge) in &self.edges {
            let fail = |message: String| MeshValidationError::InconsistentEdge { edge: key, message };
            for end in edge.points() {
                let linked = self
                    .points
                    .get(end.point)
                    .is_some_and(|p| p.edges().contains(&key));
                if !linked {
                    report.push(
                        InvariantKind::PointAdjacency,
                        fail(format!("endpoint {:?} does not list the edge", end.point)),
                    );
                }
            }
            for triangle in edge.triangles().into_iter().flatten() {
                let linked = self
                    .triangles
                    .get(triangle)
                    .is_some_and(|t| t.edges().contains(&key));
                if !linked {
                    report.push(
                        InvariantKind::EdgeAdjacency,
                        fail(format!("slot holds triangle {triangle:?} which lacks the edge")),
                    );
                }
            }
            if has_triangles && edge.is_orphan() {
                report.push(
                    InvariantKind::EdgeAdjacency,
                    fail("edge has no incident triangle".to_string()),
                );
            }
            if self.edge_index.get(&edge.signature()) != Some(&key) {
                report.push(
                    InvariantKind::EdgeIndex,
                    MeshValidationError::EdgeIndex {
                        message: format!("signature of {key:?} does not map back to it"),
                    },
                );
            }
        }
        if self.edge_index.len() != self.edges.len() {
            report.push(
                InvariantKind::EdgeIndex,
                MeshValidationError::EdgeIndex {
                    message: format!(
                        "{} signatures for {} edges",
                        self.edge_index.len(),
                        self.edges.len()
                    ),
                },
            );
        }
    }

    fn check_triangles(&self, report: &mut MeshValidationReport) {
        for (key, triangle) in &self.triangles {
            let fail = |message: String| MeshValidationError::InconsistentTriangle {
                triangle: key,
                message,
            };
            let corners = triangle.points();
            if !corners[0].offset.is_zero() {
                report.push(
                    InvariantKind::TriangleStructure,
                    fail(format!("first corner offset is {}", corners[0].offset)),
                );
            }
            if corners.iter().any(|c| !self.points.contains_key(c.point)) {
                report.push(
                    InvariantKind::TriangleStructure,
                    fail("references a missing point".to_string()),
                );
                continue;
            }
            for corner in corners {
                if !self.points[corner.point].triangles().contains(&key) {
                    report.push(
                        InvariantKind::PointAdjacency,
                        fail(format!("corner {:?} does not list the triangle", corner.point)),
                    );
                }
            }
            for (i, &edge) in triangle.edges().iter().enumerate() {
                let Some(stored) = self.edges.get(edge) else {
                    report.push(
                        InvariantKind::TriangleStructure,
                        fail(format!("side {i} references missing edge {edge:?}")),
                    );
                    continue;
                };
                if !stored.triangles().contains(&Some(key)) {
                    report.push(
                        InvariantKind::EdgeAdjacency,
                        fail(format!("edge {edge:?} does not list the triangle")),
                    );
                }
                if stored.signature() != EdgeSignature::new(corners[i], corners[(i + 1) % 3]) {
                    report.push(
                        InvariantKind::TriangleStructure,
                        fail(format!("side {i} is not joined by edge {edge:?}")),
                    );
                }
            }
            let pos = self.triangle_positions(triangle, ChunkOffset::ZERO);
            if signed_area2(pos[0], pos[1], pos[2]) < 0.0 {
                report.push(
                    InvariantKind::TriangleStructure,
                    fail("stored clockwise".to_string()),
                );
            }
            let (min, max) = bounds(&pos);
            if !self.chunks.is_registered(key, min, max) {
                report.push(
                    InvariantKind::ChunkRegistration,
                    fail("missing from a chunk it overlaps".to_string()),
                );
            }
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn bounds(points: &[Point2]) -> (Point2, Point2) {
    points.iter().fold(
        (
            Point2::new(f64::INFINITY, f64::INFINITY),
            Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        ),
        |(min, max), p| {
            (
                Point2::new(min.x.min(p.x), min.y.min(p.y)),
                Point2::new(max.x.max(p.x), max.y.max(p.y)),
            )
        },
    )
}

fn round_to_i32(v: f64) -> i32 {
    num_traits::cast::<f64, i32>(v.round()).unwrap_or(0)
}

fn round_down_to_i32(v: f64) -> i32 {
    num_traits::cast::<f64, i32>(v.floor()).unwrap_or(0)
}

fn round_up_to_i32(v: f64) -> i32 {
    num_traits::cast::<f64, i32>(v.ceil()).unwrap_or(0)
}

/// Corner set of a triangle up to rotation, order and common translation.
fn canonical_corner_set(corners: [LocalPoint; 3]) -> [LocalPoint; 3] {
    corners
        .iter()
        .map(|anchor| {
            let mut shifted = corners.map(|lp| lp.shifted(-anchor.offset));
            shifted.sort_unstable();
            shifted
        })
        .min()
        .unwrap_or(corners)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A single point wrapped into two triangles: the smallest periodic mesh.
    fn one_point_torus(size: f64, at: Point2) -> (PeriodicMesh, PointKey) {
        let mut mesh = PeriodicMesh::new(size).unwrap();
        let p = mesh.add_point(at).key();
        let lp = |x, y| LocalPoint::new(p, ChunkOffset::new(x, y));
        mesh.add_triangle_unchecked(lp(0, 0), lp(1, 0), lp(1, 1));
        mesh.add_triangle_unchecked(lp(0, 0), lp(1, 1), lp(0, 1));
        (mesh, p)
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = PeriodicMesh::new(10.0).unwrap();
        assert!(mesh.is_empty());
        assert_eq!(mesh.number_of_triangles(), 0);
        assert!(mesh.triangle_at(Point2::new(1.0, 1.0)).is_none());
        assert!(mesh.nearest_point(Point2::new(1.0, 1.0)).is_none());
        assert!(mesh.is_valid().is_ok());
        assert!(PeriodicMesh::new(-1.0).is_err());
    }

    #[test]
    fn test_add_point_clamps() {
        let mut mesh = PeriodicMesh::new(10.0).unwrap();
        let view = mesh.add_point(Point2::new(-2.0, 12.0));
        assert_eq!(view.offset(), ChunkOffset::ZERO);
        let pos = view.position();
        assert_relative_eq!(pos.x, 0.0);
        assert!(pos.y < 10.0 && pos.y > 9.999);
    }

    #[test]
    fn test_one_point_torus_structure() {
        let (mesh, p) = one_point_torus(10.0, Point2::new(2.0, 3.0));
        assert_eq!(mesh.number_of_points(), 1);
        assert_eq!(mesh.number_of_edges(), 3);
        assert_eq!(mesh.number_of_triangles(), 2);
        assert_eq!(mesh.point(p).edges().len(), 3);
        assert_eq!(mesh.point(p).triangles().len(), 2);
        for (_, edge) in mesh.edges() {
            assert_eq!(edge.triangle_count(), 2);
        }
        mesh.is_valid().unwrap();
    }

    #[test]
    fn test_add_triangle_normalizes_offsets_and_winding() {
        let mut mesh = PeriodicMesh::new(10.0).unwrap();
        let a = mesh.add_point(Point2::new(9.0, 1.0)).key();
        let b = mesh.add_point(Point2::new(1.0, 1.0)).key();
        let c = mesh.add_point(Point2::new(0.5, 2.0)).key();
        // Clockwise, first corner not at the origin chunk.
        let t = mesh.add_triangle_unchecked(
            LocalPoint::new(a, ChunkOffset::new(-1, 0)),
            LocalPoint::new(c, ChunkOffset::ZERO),
            LocalPoint::new(b, ChunkOffset::ZERO),
        );
        let tri = mesh.triangle(t);
        assert_eq!(tri.points()[0], LocalPoint::new(a, ChunkOffset::ZERO));
        assert_eq!(tri.points()[1], LocalPoint::new(b, ChunkOffset::new(1, 0)));
        assert_eq!(tri.points()[2], LocalPoint::new(c, ChunkOffset::new(1, 0)));
        let pos = mesh.triangle_positions(tri, ChunkOffset::ZERO);
        assert!(signed_area2(pos[0], pos[1], pos[2]) > 0.0);
    }

    #[test]
    fn test_add_triangle_dedups() {
        let mut mesh = PeriodicMesh::new(10.0).unwrap();
        let a = LocalPoint::at_origin(mesh.add_point(Point2::new(1.0, 1.0)).key());
        let b = LocalPoint::at_origin(mesh.add_point(Point2::new(3.0, 1.0)).key());
        let c = LocalPoint::at_origin(mesh.add_point(Point2::new(2.0, 3.0)).key());
        let first = mesh.add_triangle(a, b, c).unwrap();
        let shift = ChunkOffset::new(2, -1);
        let again = mesh
            .add_triangle(c.shifted(shift), a.shifted(shift), b.shifted(shift))
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(mesh.number_of_triangles(), 1);
    }

    #[test]
    fn test_checked_add_triangle_errors() {
        let (mut mesh, p) = one_point_torus(10.0, Point2::new(2.0, 3.0));
        let lp = |x, y| LocalPoint::new(p, ChunkOffset::new(x, y));
        let before = mesh.generation();
        assert!(matches!(
            mesh.add_triangle(lp(0, 0), lp(1, 0), lp(0, 1)),
            Err(MeshError::NonManifoldEdge { .. })
        ));
        assert_eq!(mesh.generation(), before);

        let q = mesh.add_point(Point2::new(5.0, 5.0)).key();
        mesh.remove_point(q);
        assert_eq!(
            mesh.add_triangle(lp(0, 0), LocalPoint::at_origin(q), lp(0, 1)),
            Err(MeshError::StalePoint { point: q })
        );
    }

    #[test]
    #[should_panic(expected = "already has two triangles")]
    fn test_third_triangle_on_edge_panics() {
        let (mut mesh, p) = one_point_torus(10.0, Point2::new(2.0, 3.0));
        let lp = |x, y| LocalPoint::new(p, ChunkOffset::new(x, y));
        mesh.add_triangle_unchecked(lp(0, 0), lp(1, 0), lp(0, 1));
    }

    #[test]
    fn test_remove_triangle_collects_orphaned_edges() {
        let mut mesh = PeriodicMesh::new(10.0).unwrap();
        let a = LocalPoint::at_origin(mesh.add_point(Point2::new(1.0, 1.0)).key());
        let b = LocalPoint::at_origin(mesh.add_point(Point2::new(3.0, 1.0)).key());
        let c = LocalPoint::at_origin(mesh.add_point(Point2::new(2.0, 3.0)).key());
        let d = LocalPoint::at_origin(mesh.add_point(Point2::new(4.0, 3.0)).key());
        let t1 = mesh.add_triangle_unchecked(a, b, c);
        let t2 = mesh.add_triangle_unchecked(b, d, c);
        assert_eq!(mesh.number_of_edges(), 5);

        let before = mesh.generation();
        mesh.remove_triangle(t1);
        assert!(mesh.generation() > before);
        assert_eq!(mesh.number_of_edges(), 3);
        assert!(mesh.find_edge(a, b).is_none());
        assert!(mesh.find_edge(b, c).is_some());
        assert!(mesh.point(a.point).triangles().is_empty());
        assert!(mesh.point(a.point).edges().is_empty());
        assert!(!mesh.contains_triangle(t1));
        assert!(mesh.contains_triangle(t2));
    }

    #[test]
    fn test_remove_point_cascades() {
        let (mut mesh, p) = one_point_torus(10.0, Point2::new(2.0, 3.0));
        mesh.remove_point(p);
        assert!(mesh.is_empty());
        assert_eq!(mesh.number_of_edges(), 0);
        assert_eq!(mesh.number_of_triangles(), 0);
        assert_eq!(mesh.chunk_grid().registrations(), 0);
    }

    #[test]
    fn test_graph_edges() {
        let mut mesh = PeriodicMesh::new(10.0).unwrap();
        let a = mesh.add_point(Point2::new(9.5, 5.0)).key();
        let b = mesh.add_point(Point2::new(0.5, 5.0)).key();
        let e = mesh.add_edge(
            LocalPoint::at_origin(a),
            LocalPoint::new(b, ChunkOffset::new(1, 0)),
        );
        // Same edge seen from the other side.
        let again = mesh.add_edge(
            LocalPoint::at_origin(b),
            LocalPoint::new(a, ChunkOffset::new(-1, 0)),
        );
        assert_eq!(e, again);
        assert_relative_eq!(mesh.edge_view(e).length(), 1.0, epsilon = 1e-12);
        mesh.is_valid().unwrap();

        mesh.remove_point(b);
        assert_eq!(mesh.number_of_edges(), 0);
        assert!(mesh.point(a).edges().is_empty());
    }

    #[test]
    fn test_triangle_at_any_position() {
        let (mesh, _) = one_point_torus(10.0, Point2::new(2.0, 3.0));
        for &(x, y) in &[
            (5.0, 5.0),
            (0.0, 0.0),
            (2.0, 3.0),
            (9.99, 0.01),
            (-4.0, 27.5),
            (12.0, 3.0),
        ] {
            let pos = Point2::new(x, y);
            let (view, offset) = mesh
                .triangle_at(pos)
                .unwrap_or_else(|| panic!("no triangle at {pos}"));
            assert_eq!(view.offset(), offset);
            assert!(view.contains(pos), "view at {pos} does not contain it");
        }
        assert!(mesh.triangle_at(Point2::new(f64::NAN, 1.0)).is_none());
    }

    #[test]
    fn test_nearest_point_wraps() {
        let mut mesh = PeriodicMesh::new(10.0).unwrap();
        let a = mesh.add_point(Point2::new(0.5, 5.0)).key();
        mesh.add_point(Point2::new(5.0, 5.0));
        let nearest = mesh.nearest_point(Point2::new(9.8, 5.0)).unwrap();
        assert_eq!(nearest.key(), a);
        assert_eq!(nearest.offset(), ChunkOffset::new(1, 0));
        assert_relative_eq!(nearest.position().x, 10.5);
    }

    #[test]
    fn test_validation_report_flags_corruption() {
        let (mut mesh, _) = one_point_torus(10.0, Point2::new(2.0, 3.0));
        let edge = mesh.edges().next().map(|(k, _)| k).unwrap();
        mesh.edge_index.clear();
        let report = mesh.validation_report();
        assert!(!report.is_empty());
        assert!(
            report
                .violations
                .iter()
                .any(|v| v.kind == InvariantKind::EdgeIndex)
        );
        assert!(matches!(
            mesh.is_valid(),
            Err(MeshValidationError::EdgeIndex { .. })
        ));
        assert!(mesh.contains_edge(edge));
    }
}
