//! Nine-copy bootstrap grid and its reduction to a single periodic copy.
//!
//! While the point set is sparse, a Delaunay triangulation of the torus may
//! connect a point to one of its own images, or to the same neighbour along two
//! wrap paths. [`ImageGrid`] avoids both by triangulating a 3×3 tiling of the
//! domain on a torus three times as large: every logical point is inserted
//! nine times, once per tile, so circumcircle tests near the seam see real
//! Euclidean geometry.
//!
//! Once every point's neighbourhood is free of self- and repeated adjacency,
//! [`ImageGrid::plan_reduction`] folds the nine copies together. Each triangle
//! of the big torus maps to a triangle of the small one through
//! `reduced offset = tile + 3 * offset`; the folded triangles are deduplicated
//! through a packed [`TriangleSignature`].
//!
//! # Signature limits
//!
//! A [`TriangleSignature`] stores three 16-bit logical ids and two 4-bit
//! signed offsets per axis, so grids with more than [`SIGNATURE_ID_LIMIT`]
//! points are never reduced.

use crate::core::algorithms::incremental_insertion::{
    InsertionError, InsertionStats, fill_cavity, find_insertion_region, insert_point,
};
use crate::core::collections::{
    FastHashMap, FastHashSet, KeyedMap, fast_hash_map_with_capacity, fast_hash_set_with_capacity,
};
use crate::core::local_point::{ChunkOffset, LocalPoint};
use crate::core::periodic_mesh::{PeriodicMesh, PointKey, TriangleKey};
use crate::geometry::point::Point2;
use crate::topology::spaces::toroidal::{ToroidalSpace, ToroidalSpaceError};
use std::fmt;

/// Tiles per side of the bootstrap tiling.
const TILES_PER_SIDE: i32 = 3;

/// Number of copies of every logical point.
pub const COPY_COUNT: usize = 9;

/// Largest number of logical points a [`TriangleSignature`] can address.
pub const SIGNATURE_ID_LIMIT: usize = 1 << 16;

/// Fewest vertices of a triangulated torus without self- or repeated adjacency.
pub const MIN_REDUCIBLE_POINTS: usize = 7;

const DELTA_MIN: i32 = -8;
const DELTA_MAX: i32 = 7;

// =============================================================================
// LOGICAL POINT IDS
// =============================================================================

/// Identifier of a logical point, stable across the bootstrap-to-reduced
/// transition. Ids are handed out in insertion order starting at zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(usize);

impl PointId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Insertion index of the point.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Reasons a bootstrap grid cannot be folded yet.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReductionError {
    /// Not enough points for a simplicial torus.
    #[error("Only {points} points; at least {required} are needed to reduce")]
    TooFewPoints {
        /// Logical points inserted so far.
        points: usize,
        /// Minimum required.
        required: usize,
    },

    /// Logical ids no longer fit in a packed signature.
    #[error("{points} points exceed the triangle signature limit of {limit}")]
    SignatureOverflow {
        /// Logical points inserted so far.
        points: usize,
        /// Largest supported count.
        limit: usize,
    },

    /// A copy of a point is adjacent to another copy of the same point.
    #[error("Point {point} is adjacent to one of its own images")]
    SelfAdjacent {
        /// The logical point.
        point: PointId,
    },

    /// A point reaches the same neighbour along two wrap paths.
    #[error("Point {point} reaches neighbour {neighbor} more than once")]
    RepeatedNeighbor {
        /// The logical point.
        point: PointId,
        /// The neighbour seen twice.
        neighbor: PointId,
    },

    /// A folded triangle spans more than a signature's offset range.
    #[error("Triangle {triangle:?} spans too many tiles to fold")]
    OffsetOutOfRange {
        /// The bootstrap triangle.
        triangle: TriangleKey,
    },

    /// The nine copies were triangulated differently.
    #[error("Folding {total} triangles gave {unique} distinct ones; expected {expected}")]
    InconsistentCopies {
        /// Triangles in the bootstrap grid.
        total: usize,
        /// Distinct folded triangles.
        unique: usize,
        /// `total / 9`.
        expected: usize,
    },

    /// A folded edge does not have exactly two triangles.
    #[error("Folded edge between {first} and {second} has {triangles} triangles")]
    UnpairedEdge {
        /// Lower logical endpoint.
        first: PointId,
        /// Higher logical endpoint.
        second: PointId,
        /// Incident triangle count.
        triangles: usize,
    },

    /// The folded complex is not a torus.
    #[error("Folded grid has Euler characteristic {chi}, expected 0")]
    NotATorus {
        /// `V - E + T` of the folded grid.
        chi: isize,
    },
}

// =============================================================================
// TRIANGLE SIGNATURE
// =============================================================================

/// Packed, translation- and rotation-invariant identity of a folded triangle.
///
/// Layout, from the most significant bit: three 16-bit logical ids, then the
/// `x` and `y` offsets of the second and third corners relative to the first,
/// four signed bits each. The first corner is the one with the smallest
/// `(id, offset)` pair, so rotating a triangle or translating all of its
/// corners yields the same signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleSignature(u64);

impl TriangleSignature {
    /// Packs a triangle given its corners' logical ids and offsets.
    ///
    /// Returns `None` if an id does not fit in 16 bits or a relative offset
    /// falls outside `[-8, 7]`.
    #[must_use]
    pub fn pack(ids: [usize; 3], offsets: [ChunkOffset; 3]) -> Option<Self> {
        if ids.iter().any(|&id| id >= SIGNATURE_ID_LIMIT) {
            return None;
        }
        let rotation = (0..3)
            .min_by_key(|&r| {
                let deltas = [1, 2].map(|k| offsets[(r + k) % 3] - offsets[r]);
                ([ids[r], ids[(r + 1) % 3], ids[(r + 2) % 3]], deltas)
            })
            .unwrap_or(0);
        let id = |k: usize| u64::try_from(ids[(rotation + k) % 3]).unwrap_or(0);
        let anchor = offsets[rotation];
        let d1 = offsets[(rotation + 1) % 3] - anchor;
        let d2 = offsets[(rotation + 2) % 3] - anchor;

        let mut packed = (id(0) << 48) | (id(1) << 32) | (id(2) << 16);
        for (shift, value) in [(12, d1.x), (8, d1.y), (4, d2.x), (0, d2.y)] {
            packed |= u64::from(nibble(value)?) << shift;
        }
        Some(Self(packed))
    }

    /// Logical ids and offsets of the corners; the first offset is zero.
    #[must_use]
    pub fn unpack(self) -> ([usize; 3], [ChunkOffset; 3]) {
        let id = |shift: u32| usize::try_from((self.0 >> shift) & 0xFFFF).unwrap_or(0);
        let delta = |shift: u32| {
            let raw = i32::try_from((self.0 >> shift) & 0xF).unwrap_or(0);
            if raw > DELTA_MAX { raw - 16 } else { raw }
        };
        (
            [id(48), id(32), id(16)],
            [
                ChunkOffset::ZERO,
                ChunkOffset::new(delta(12), delta(8)),
                ChunkOffset::new(delta(4), delta(0)),
            ],
        )
    }

    /// The raw packed value.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }
}

fn nibble(value: i32) -> Option<u8> {
    if (DELTA_MIN..=DELTA_MAX).contains(&value) {
        u8::try_from(value & 0xF).ok()
    } else {
        None
    }
}

// =============================================================================
// REDUCTION PLAN
// =============================================================================

/// Folded triangle set produced by [`ImageGrid::plan_reduction`].
#[derive(Clone, Debug)]
pub struct ReductionPlan {
    triangles: Vec<TriangleSignature>,
    edges: usize,
    generation: u64,
}

impl ReductionPlan {
    /// Distinct folded triangles, in first-seen order.
    #[must_use]
    pub fn triangles(&self) -> &[TriangleSignature] {
        &self.triangles
    }

    /// Number of edges the reduced grid will have.
    #[must_use]
    pub const fn edge_count(&self) -> usize {
        self.edges
    }
}

// =============================================================================
// IMAGE GRID
// =============================================================================

#[derive(Clone, Copy, Debug)]
struct Image {
    id: PointId,
    tile: ChunkOffset,
}

/// Bootstrap triangulation holding nine copies of every point.
#[derive(Clone, Debug)]
pub struct ImageGrid {
    space: ToroidalSpace,
    mesh: PeriodicMesh,
    template: PeriodicMesh,
    positions: Vec<Point2>,
    copies: Vec<[PointKey; COPY_COUNT]>,
    images: KeyedMap<PointKey, Image>,
}

impl ImageGrid {
    /// Creates an empty bootstrap grid for a domain of side `domain_size`.
    ///
    /// `point_hint` and `chunk_size` size the reduced grid; the bootstrap mesh
    /// gets nine times the capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if `domain_size` is not finite and positive.
    pub fn new(
        domain_size: f64,
        point_hint: usize,
        chunk_size: Option<f64>,
    ) -> Result<Self, ToroidalSpaceError> {
        let space = ToroidalSpace::new(domain_size)?;
        let mesh = PeriodicMesh::with_chunk_size(
            f64::from(TILES_PER_SIDE) * domain_size,
            COPY_COUNT * point_hint,
            chunk_size,
        )?;
        let template = PeriodicMesh::with_chunk_size(domain_size, point_hint, chunk_size)?;
        Ok(Self {
            space,
            mesh,
            template,
            positions: Vec::with_capacity(point_hint),
            copies: Vec::with_capacity(point_hint),
            images: KeyedMap::with_capacity(COPY_COUNT * point_hint),
        })
    }

    /// Side of the logical domain.
    #[inline]
    #[must_use]
    pub const fn domain_size(&self) -> f64 {
        self.space.size()
    }

    /// The bootstrap mesh, on a torus of side `3 * domain_size`.
    #[inline]
    #[must_use]
    pub const fn mesh(&self) -> &PeriodicMesh {
        &self.mesh
    }

    /// Number of logical points.
    #[must_use]
    pub fn number_of_points(&self) -> usize {
        self.positions.len()
    }

    /// Position of a logical point in the fundamental domain.
    #[must_use]
    pub fn position(&self, id: PointId) -> Option<Point2> {
        self.positions.get(id.index()).copied()
    }

    /// Logical id of a bootstrap mesh point.
    #[must_use]
    pub fn point_id(&self, key: PointKey) -> Option<PointId> {
        self.images.get(key).map(|image| image.id)
    }

    /// Key of the copy of `id` in the central tile.
    #[must_use]
    pub fn central_copy(&self, id: PointId) -> Option<PointKey> {
        self.copies.get(id.index()).map(|keys| keys[tile_index(1, 1)])
    }

    /// Maps a position in the logical domain to the central tile.
    #[must_use]
    pub fn to_image(&self, pos: Point2) -> Point2 {
        pos + self.space.translation(ChunkOffset::new(1, 1))
    }

    /// Inverse of [`to_image`](Self::to_image).
    #[must_use]
    pub fn from_image(&self, pos: Point2) -> Point2 {
        pos - self.space.translation(ChunkOffset::new(1, 1))
    }

    /// Inserts a logical point into all nine tiles.
    ///
    /// The first point seeds a 3×3 lattice of its copies split into 18
    /// triangles. On failure the grid is restored to its previous state.
    ///
    /// # Errors
    ///
    /// Returns [`InsertionError`] if any copy cannot be inserted.
    pub fn insert(&mut self, position: Point2) -> Result<(PointId, InsertionStats), InsertionError> {
        if !position.is_finite() {
            return Err(InsertionError::NonFinitePoint { point: position });
        }
        let base = self.space.clamp(position);
        let id = PointId::new(self.positions.len());

        if self.positions.is_empty() {
            let keys = self.seed(base);
            self.register(id, base, keys);
            let stats = InsertionStats {
                created_triangles: self.mesh.number_of_triangles(),
                ..InsertionStats::default()
            };
            return Ok((id, stats));
        }

        let mut undo: Vec<CopyUndo> = Vec::with_capacity(COPY_COUNT);
        let mut keys = [PointKey::default(); COPY_COUNT];
        let mut stats = InsertionStats::default();
        for (index, tile) in tiles().enumerate() {
            match insert_copy(&mut self.mesh, base + self.space.translation(tile)) {
                Ok((copy_undo, copy_stats)) => {
                    keys[index] = copy_undo.apex;
                    undo.push(copy_undo);
                    stats.cavity_triangles += copy_stats.cavity_triangles;
                    stats.created_triangles += copy_stats.created_triangles;
                    stats.widened += copy_stats.widened;
                }
                Err(err) => {
                    if !undo.is_empty() {
                        tracing::debug!(%id, copy = index, "rolling back partial bootstrap insertion");
                    }
                    for copy_undo in undo.into_iter().rev() {
                        copy_undo.revert(&mut self.mesh);
                    }
                    return Err(err);
                }
            }
        }
        self.register(id, base, keys);
        Ok((id, stats))
    }

    fn seed(&mut self, base: Point2) -> [PointKey; COPY_COUNT] {
        let mut keys = [PointKey::default(); COPY_COUNT];
        for (index, tile) in tiles().enumerate() {
            keys[index] = self.mesh.insert_point(base + self.space.translation(tile));
        }
        let corner = |x: i32, y: i32| {
            let wrapped = tile_index(x % TILES_PER_SIDE, y % TILES_PER_SIDE);
            LocalPoint::new(
                keys[wrapped],
                ChunkOffset::new(x / TILES_PER_SIDE, y / TILES_PER_SIDE),
            )
        };
        for tile in tiles() {
            let (x, y) = (tile.x, tile.y);
            self.mesh
                .add_triangle_unchecked(corner(x, y), corner(x + 1, y), corner(x + 1, y + 1));
            self.mesh
                .add_triangle_unchecked(corner(x, y), corner(x + 1, y + 1), corner(x, y + 1));
        }
        keys
    }

    fn register(&mut self, id: PointId, base: Point2, keys: [PointKey; COPY_COUNT]) {
        for (key, tile) in keys.iter().zip(tiles()) {
            self.images.insert(*key, Image { id, tile });
        }
        self.positions.push(base);
        self.copies.push(keys);
    }

    // =========================================================================
    // REDUCTION
    // =========================================================================

    /// `true` if the grid can be folded into a single copy.
    #[must_use]
    pub fn can_reduce(&self) -> bool {
        match self.plan_reduction() {
            Ok(_) => true,
            Err(reason) => {
                tracing::debug!(%reason, points = self.positions.len(), "grid not reducible yet");
                false
            }
        }
    }

    /// Checks the grid and computes its folded triangle set.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReductionError`] that prevents folding.
    pub fn plan_reduction(&self) -> Result<ReductionPlan, ReductionError> {
        let points = self.positions.len();
        if points < MIN_REDUCIBLE_POINTS {
            return Err(ReductionError::TooFewPoints {
                points,
                required: MIN_REDUCIBLE_POINTS,
            });
        }
        if points > SIGNATURE_ID_LIMIT {
            return Err(ReductionError::SignatureOverflow {
                points,
                limit: SIGNATURE_ID_LIMIT,
            });
        }
        self.check_neighborhoods()?;

        let total = self.mesh.number_of_triangles();
        let expected = total / COPY_COUNT;
        let mut seen: FastHashSet<TriangleSignature> = fast_hash_set_with_capacity(expected);
        let mut triangles = Vec::with_capacity(expected);
        for (key, triangle) in self.mesh.triangles() {
            let corners = triangle.points();
            let ids = corners.map(|lp| self.images[lp.point].id.index());
            let offsets = corners.map(|lp| self.fold(lp));
            let signature = TriangleSignature::pack(ids, offsets)
                .ok_or(ReductionError::OffsetOutOfRange { triangle: key })?;
            if seen.insert(signature) {
                triangles.push(signature);
            }
        }
        if triangles.len() * COPY_COUNT != total {
            return Err(ReductionError::InconsistentCopies {
                total,
                unique: triangles.len(),
                expected,
            });
        }

        let edges = count_folded_edges(&triangles)?;
        let chi = isize::try_from(points).unwrap_or(isize::MAX)
            - isize::try_from(edges).unwrap_or(isize::MAX)
            + isize::try_from(triangles.len()).unwrap_or(isize::MAX);
        if chi != 0 {
            return Err(ReductionError::NotATorus { chi });
        }

        Ok(ReductionPlan {
            triangles,
            edges,
            generation: self.mesh.generation(),
        })
    }

    /// Offset of a bootstrap corner in units of the logical domain.
    fn fold(&self, corner: LocalPoint) -> ChunkOffset {
        self.images[corner.point].tile + corner.offset.scaled(TILES_PER_SIDE)
    }

    fn check_neighborhoods(&self) -> Result<(), ReductionError> {
        let mut neighbors: FastHashSet<PointId> = FastHashSet::default();
        for (key, image) in &self.images {
            neighbors.clear();
            for neighbor in self.mesh.point_view(key).neighbors() {
                let other = self.images[neighbor.key()].id;
                if other == image.id {
                    return Err(ReductionError::SelfAdjacent { point: image.id });
                }
                if !neighbors.insert(other) {
                    return Err(ReductionError::RepeatedNeighbor {
                        point: image.id,
                        neighbor: other,
                    });
                }
            }
        }
        Ok(())
    }

    /// Builds the single-copy grid described by `plan`.
    ///
    /// # Panics
    ///
    /// Panics if the grid changed since `plan` was computed.
    #[must_use]
    pub fn reduce(&self, plan: &ReductionPlan) -> ReducedGrid {
        assert_eq!(
            plan.generation,
            self.mesh.generation(),
            "reduction plan is stale"
        );
        let mut mesh = self.template.clone();
        let keys: Vec<PointKey> = self
            .positions
            .iter()
            .map(|&pos| mesh.insert_point(pos))
            .collect();
        for signature in &plan.triangles {
            let (ids, offsets) = signature.unpack();
            let [a, b, c] = [0, 1, 2].map(|k| LocalPoint::new(keys[ids[k]], offsets[k]));
            mesh.add_triangle_unchecked(a, b, c);
        }
        tracing::debug!(
            points = mesh.number_of_points(),
            edges = mesh.number_of_edges(),
            triangles = mesh.number_of_triangles(),
            "folded bootstrap grid into a single copy"
        );
        ReducedGrid::from_parts(mesh, keys)
    }
}

/// Tiles in row-major order; tile `(x, y)` has index `3 * y + x`.
fn tiles() -> impl Iterator<Item = ChunkOffset> {
    (0..TILES_PER_SIDE)
        .flat_map(|y| (0..TILES_PER_SIDE).map(move |x| ChunkOffset::new(x, y)))
}

fn tile_index(x: i32, y: i32) -> usize {
    usize::try_from(y * TILES_PER_SIDE + x).unwrap_or(0)
}

fn count_folded_edges(triangles: &[TriangleSignature]) -> Result<usize, ReductionError> {
    let mut uses: FastHashMap<(usize, usize, ChunkOffset), usize> =
        fast_hash_map_with_capacity(3 * triangles.len() / 2);
    for signature in triangles {
        let (ids, offsets) = signature.unpack();
        for i in 0..3 {
            let j = (i + 1) % 3;
            let key = match ids[i].cmp(&ids[j]) {
                std::cmp::Ordering::Less => (ids[i], ids[j], offsets[j] - offsets[i]),
                std::cmp::Ordering::Greater => (ids[j], ids[i], offsets[i] - offsets[j]),
                std::cmp::Ordering::Equal => {
                    (ids[i], ids[j], (offsets[j] - offsets[i]).canonical_sign())
                }
            };
            *uses.entry(key).or_default() += 1;
        }
    }
    if let Some((&(first, second, _), &count)) = uses.iter().find(|&(_, &count)| count != 2) {
        return Err(ReductionError::UnpairedEdge {
            first: PointId::new(first),
            second: PointId::new(second),
            triangles: count,
        });
    }
    Ok(uses.len())
}

/// What it takes to undo one copy's insertion: the new point and the
/// corners of the triangles its cavity replaced.
#[derive(Debug)]
struct CopyUndo {
    apex: PointKey,
    removed: Vec<[LocalPoint; 3]>,
}

impl CopyUndo {
    /// Removes the apex with its fan and puts the cavity triangles back.
    fn revert(self, mesh: &mut PeriodicMesh) {
        mesh.remove_point(self.apex);
        for [a, b, c] in self.removed {
            mesh.add_triangle_unchecked(a, b, c);
        }
    }
}

/// Inserts one copy and records how to take it out again.
fn insert_copy(
    mesh: &mut PeriodicMesh,
    position: Point2,
) -> Result<(CopyUndo, InsertionStats), InsertionError> {
    let (position, region) = find_insertion_region(mesh, position)?;
    let removed = region
        .triangles
        .iter()
        .map(|&(triangle, _)| mesh.triangle(triangle).points())
        .collect();
    let (apex, stats) = fill_cavity(mesh, position, &region);
    Ok((CopyUndo { apex, removed }, stats))
}

// =============================================================================
// REDUCED GRID
// =============================================================================

/// Single-copy periodic triangulation with logical point ids.
#[derive(Clone, Debug)]
pub struct ReducedGrid {
    mesh: PeriodicMesh,
    keys: Vec<PointKey>,
    ids: KeyedMap<PointKey, PointId>,
}

impl ReducedGrid {
    fn from_parts(mesh: PeriodicMesh, keys: Vec<PointKey>) -> Self {
        let mut ids = KeyedMap::with_capacity(keys.len());
        for (index, &key) in keys.iter().enumerate() {
            ids.insert(key, PointId::new(index));
        }
        Self { mesh, keys, ids }
    }

    #[inline]
    #[must_use]
    pub const fn mesh(&self) -> &PeriodicMesh {
        &self.mesh
    }

    /// Consumes the grid, keeping only the mesh.
    #[must_use]
    pub fn into_mesh(self) -> PeriodicMesh {
        self.mesh
    }

    #[must_use]
    pub fn number_of_points(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn point_key(&self, id: PointId) -> Option<PointKey> {
        self.keys.get(id.index()).copied()
    }

    #[must_use]
    pub fn point_id(&self, key: PointKey) -> Option<PointId> {
        self.ids.get(key).copied()
    }

    /// Inserts a point directly into the single-copy mesh.
    ///
    /// # Errors
    ///
    /// Returns [`InsertionError`] if the point cannot be inserted; the grid is
    /// unchanged in that case.
    pub fn insert(&mut self, position: Point2) -> Result<(PointId, InsertionStats), InsertionError> {
        let (key, stats) = insert_point(&mut self.mesh, position)?;
        let id = PointId::new(self.keys.len());
        self.keys.push(key);
        self.ids.insert(key, id);
        Ok((id, stats))
    }
}
