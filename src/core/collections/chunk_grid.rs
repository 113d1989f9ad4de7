//! Torus-wrapped uniform grid used to locate triangles by position.
//!
//! The fundamental domain is split into `n × n` square chunks. Every triangle is
//! registered in each chunk its axis-aligned bounding box touches, with chunk
//! indices taken modulo `n`, so a triangle that pokes out of the domain is also
//! found from the chunks on the opposite side.
//!
//! The grid only stores keys. Callers recompute a triangle's bounding box from
//! its (immutable) vertex positions when unregistering it.

use super::SmallBuffer;
use crate::core::periodic_mesh::TriangleKey;
use crate::geometry::point::Point2;

/// Inline capacity of one chunk's key list.
const CHUNK_INLINE_CAPACITY: usize = 8;

/// Target number of triangles per chunk when sizing from a point count.
const TRIANGLES_PER_CHUNK: usize = 4;

/// Upper bound on chunks per side, keeps the table bounded for tiny chunk
/// sizes.
pub const MAX_CHUNKS_PER_SIDE: usize = 1024;

type ChunkBucket = SmallBuffer<TriangleKey, CHUNK_INLINE_CAPACITY>;

#[derive(Clone, Debug)]
pub struct ChunkGrid {
    domain_size: f64,
    chunk_size: f64,
    chunks_per_side: usize,
    chunks: Vec<ChunkBucket>,
}

impl ChunkGrid {
    /// Creates a grid whose chunks are as close to `chunk_hint` as an integer
    /// subdivision of the domain allows.
    ///
    /// Non-positive or non-finite hints give a single chunk.
    #[must_use]
    pub fn with_chunk_size(domain_size: f64, chunk_hint: f64) -> Self {
        let per_side = if chunk_hint.is_finite() && chunk_hint > 0.0 {
            num_traits::cast::<f64, usize>((domain_size / chunk_hint).floor()).unwrap_or(1)
        } else {
            1
        };
        Self::with_chunks_per_side(domain_size, per_side)
    }

    /// Sizes the grid for roughly `expected_points` points.
    ///
    /// A periodic triangulation has two triangles per point.
    #[must_use]
    pub fn for_point_count(domain_size: f64, expected_points: usize) -> Self {
        let target_chunks = (2 * expected_points).div_ceil(TRIANGLES_PER_CHUNK).max(1);
        let per_side = num_traits::cast::<f64, usize>(
            num_traits::cast::<usize, f64>(target_chunks)
                .unwrap_or(1.0)
                .sqrt()
                .ceil(),
        )
        .unwrap_or(1);
        Self::with_chunks_per_side(domain_size, per_side)
    }

    /// Empty grid with the same resolution.
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self::with_chunks_per_side(self.domain_size, self.chunks_per_side)
    }

    fn with_chunks_per_side(domain_size: f64, per_side: usize) -> Self {
        let chunks_per_side = per_side.clamp(1, MAX_CHUNKS_PER_SIDE);
        let chunk_size = domain_size / num_traits::cast::<usize, f64>(chunks_per_side).unwrap_or(1.0);
        Self {
            domain_size,
            chunk_size,
            chunks_per_side,
            chunks: vec![ChunkBucket::new(); chunks_per_side * chunks_per_side],
        }
    }

    #[inline]
    #[must_use]
    pub const fn chunk_size(&self) -> f64 {
        self.chunk_size
    }

    #[inline]
    #[must_use]
    pub const fn chunks_per_side(&self) -> usize {
        self.chunks_per_side
    }

    #[inline]
    #[must_use]
    pub const fn domain_size(&self) -> f64 {
        self.domain_size
    }

    /// Registers `key` in every chunk covered by the box `[min, max]`.
    pub fn insert(&mut self, key: TriangleKey, min: Point2, max: Point2) {
        self.for_each_chunk_in_box(min, max, |chunks, idx| chunks[idx].push(key));
    }

    /// Unregisters `key` from every chunk covered by the box `[min, max]`.
    pub fn remove(&mut self, key: TriangleKey, min: Point2, max: Point2) {
        self.for_each_chunk_in_box(min, max, |chunks, idx| {
            let bucket = &mut chunks[idx];
            if let Some(pos) = bucket.iter().position(|&k| k == key) {
                bucket.swap_remove(pos);
            }
        });
    }

    /// Returns `true` if `key` is registered in every chunk covered by the box.
    #[must_use]
    pub fn is_registered(&self, key: TriangleKey, min: Point2, max: Point2) -> bool {
        self.chunk_indices_in_box(min, max)
            .into_iter()
            .all(|idx| self.chunks[idx].contains(&key))
    }

    /// Triangles registered in the chunk containing `pos`.
    ///
    /// `pos` is expected to lie in the fundamental domain; anything else is
    /// wrapped first.
    #[must_use]
    pub fn candidates(&self, pos: Point2) -> &[TriangleKey] {
        let cx = self.wrap_index(self.chunk_coord(pos.x));
        let cy = self.wrap_index(self.chunk_coord(pos.y));
        &self.chunks[cy * self.chunks_per_side + cx]
    }

    /// Total number of (chunk, triangle) registrations.
    #[must_use]
    pub fn registrations(&self) -> usize {
        self.chunks.iter().map(ChunkBucket::len).sum()
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.chunks {
            bucket.clear();
        }
    }

    // =========================================================================
    // INTERNAL HELPERS
    // =========================================================================

    fn chunk_coord(&self, c: f64) -> i64 {
        num_traits::cast::<f64, i64>((c / self.chunk_size).floor()).unwrap_or(0)
    }

    fn wrap_index(&self, c: i64) -> usize {
        let n = i64::try_from(self.chunks_per_side).unwrap_or(1);
        usize::try_from(c.rem_euclid(n)).unwrap_or(0)
    }

    /// Wrapped chunk indices along one axis, without repeats.
    fn axis_range(&self, lo: f64, hi: f64) -> impl Iterator<Item = usize> + use<> {
        let n = self.chunks_per_side;
        let c0 = self.chunk_coord(lo);
        let c1 = self.chunk_coord(hi).max(c0);
        let span = usize::try_from(c1 - c0 + 1).unwrap_or(n);
        let (start, len) = if span >= n {
            (0, n)
        } else {
            (self.wrap_index(c0), span)
        };
        (0..len).map(move |i| (start + i) % n)
    }

    fn chunk_indices_in_box(&self, min: Point2, max: Point2) -> Vec<usize> {
        let n = self.chunks_per_side;
        let ys: Vec<usize> = self.axis_range(min.y, max.y).collect();
        self.axis_range(min.x, max.x)
            .flat_map(|cx| ys.iter().map(move |&cy| cy * n + cx))
            .collect()
    }

    fn for_each_chunk_in_box<F>(&mut self, min: Point2, max: Point2, mut f: F)
    where
        F: FnMut(&mut [ChunkBucket], usize),
    {
        for idx in self.chunk_indices_in_box(min, max) {
            f(&mut self.chunks, idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn keys(n: usize) -> Vec<TriangleKey> {
        let mut map: SlotMap<TriangleKey, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_sizing() {
        let grid = ChunkGrid::with_chunk_size(10.0, 2.5);
        assert_eq!(grid.chunks_per_side(), 4);
        assert!((grid.chunk_size() - 2.5).abs() < 1e-12);

        let single = ChunkGrid::with_chunk_size(10.0, 0.0);
        assert_eq!(single.chunks_per_side(), 1);

        let capped = ChunkGrid::with_chunk_size(10.0, 1e-9);
        assert_eq!(capped.chunks_per_side(), MAX_CHUNKS_PER_SIDE);

        let sized = ChunkGrid::for_point_count(10.0, 200);
        assert_eq!(sized.chunks_per_side(), 10);
    }

    #[test]
    fn test_insert_and_query() {
        let k = keys(2);
        let mut grid = ChunkGrid::with_chunk_size(10.0, 2.5);
        grid.insert(k[0], Point2::new(0.5, 0.5), Point2::new(2.0, 2.0));
        grid.insert(k[1], Point2::new(3.0, 3.0), Point2::new(6.0, 4.0));

        assert_eq!(grid.candidates(Point2::new(1.0, 1.0)), &[k[0]]);
        assert_eq!(grid.candidates(Point2::new(5.5, 3.5)), &[k[1]]);
        assert!(grid.candidates(Point2::new(9.0, 9.0)).is_empty());
        assert_eq!(grid.registrations(), 1 + 2);
        assert!(grid.is_registered(k[1], Point2::new(3.0, 3.0), Point2::new(6.0, 4.0)));
    }

    #[test]
    fn test_boxes_wrap_around_the_torus() {
        let k = keys(1);
        let mut grid = ChunkGrid::with_chunk_size(10.0, 2.5);
        // Pokes out past the right and top edges.
        grid.insert(k[0], Point2::new(9.0, 9.0), Point2::new(11.0, 10.5));

        assert_eq!(grid.candidates(Point2::new(9.5, 9.5)), &[k[0]]);
        assert_eq!(grid.candidates(Point2::new(0.5, 0.2)), &[k[0]]);
        assert_eq!(grid.candidates(Point2::new(9.5, 0.2)), &[k[0]]);
        assert_eq!(grid.registrations(), 4);

        grid.remove(k[0], Point2::new(9.0, 9.0), Point2::new(11.0, 10.5));
        assert_eq!(grid.registrations(), 0);
    }

    #[test]
    fn test_box_wider_than_domain_registers_everywhere_once() {
        let k = keys(1);
        let mut grid = ChunkGrid::with_chunk_size(10.0, 5.0);
        grid.insert(k[0], Point2::new(-3.0, -3.0), Point2::new(14.0, 1.0));
        // Two columns by at most two rows, each chunk once.
        assert_eq!(grid.registrations(), 4);
        grid.clear();
        assert_eq!(grid.registrations(), 0);
    }
}
