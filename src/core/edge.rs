//! Mesh edges, edge signatures and edge views.
//!
//! An edge is stored as `[A@(0,0), B@d]`. Two chunk-relative point pairs name
//! the same edge exactly when they have the same [`EdgeSignature`]: the
//! endpoint keys in sorted order plus the offset from the first to the second.
//! Edges whose endpoints are the same point (possible on very sparse meshes)
//! also fold `d` and `-d` together.

use crate::core::local_point::{ChunkOffset, LocalPoint};
use crate::core::periodic_mesh::{EdgeKey, PeriodicMesh, PointKey, TriangleKey};
use crate::core::triangle::TriangleView;
use crate::core::vertex::PointView;
use crate::geometry::point::Point2;

// =============================================================================
// SIGNATURE
// =============================================================================

/// Translation-invariant identity of an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeSignature {
    first: PointKey,
    second: PointKey,
    delta: ChunkOffset,
}

impl EdgeSignature {
    /// Signature of the edge from `p` to `q`; symmetric in its arguments.
    #[must_use]
    pub fn new(p: LocalPoint, q: LocalPoint) -> Self {
        if p.point < q.point {
            Self {
                first: p.point,
                second: q.point,
                delta: q.offset - p.offset,
            }
        } else if q.point < p.point {
            Self {
                first: q.point,
                second: p.point,
                delta: p.offset - q.offset,
            }
        } else {
            Self {
                first: p.point,
                second: p.point,
                delta: (q.offset - p.offset).canonical_sign(),
            }
        }
    }

    #[inline]
    #[must_use]
    pub const fn first(&self) -> PointKey {
        self.first
    }

    #[inline]
    #[must_use]
    pub const fn second(&self) -> PointKey {
        self.second
    }

    /// Offset of the second endpoint relative to the first.
    #[inline]
    #[must_use]
    pub const fn delta(&self) -> ChunkOffset {
        self.delta
    }

    /// Both endpoints are the same stored point.
    #[inline]
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.first == self.second
    }
}

// =============================================================================
// STORED EDGE
// =============================================================================

/// Stored edge record.
#[derive(Clone, Debug)]
pub struct MeshEdge {
    points: [LocalPoint; 2],
    triangles: [Option<TriangleKey>; 2],
}

impl MeshEdge {
    pub(crate) const fn from_signature(signature: EdgeSignature) -> Self {
        Self {
            points: [
                LocalPoint::at_origin(signature.first),
                LocalPoint::new(signature.second, signature.delta),
            ],
            triangles: [None, None],
        }
    }

    /// Endpoints; the first is always at offset `(0, 0)`.
    #[inline]
    #[must_use]
    pub const fn points(&self) -> [LocalPoint; 2] {
        self.points
    }

    /// Triangle slots.
    #[inline]
    #[must_use]
    pub const fn triangles(&self) -> [Option<TriangleKey>; 2] {
        self.triangles
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.iter().flatten().count()
    }

    /// No triangle uses this edge.
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.triangles.iter().all(Option::is_none)
    }

    #[must_use]
    pub fn signature(&self) -> EdgeSignature {
        EdgeSignature::new(self.points[0], self.points[1])
    }

    /// The triangle on the other side from `triangle`, if any.
    #[must_use]
    pub fn other_triangle(&self, triangle: TriangleKey) -> Option<TriangleKey> {
        match self.triangles {
            [Some(a), b] if a == triangle => b,
            [a, Some(b)] if b == triangle => a,
            _ => None,
        }
    }

    /// Fills a free triangle slot. Returns `false` if both are taken.
    pub(crate) fn attach_triangle(&mut self, triangle: TriangleKey) -> bool {
        match self.triangles.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(triangle);
                true
            }
            None => false,
        }
    }

    pub(crate) fn detach_triangle(&mut self, triangle: TriangleKey) {
        for slot in &mut self.triangles {
            if *slot == Some(triangle) {
                *slot = None;
            }
        }
    }
}

// =============================================================================
// EDGE VIEW
// =============================================================================

/// An edge seen from a particular chunk.
#[derive(Clone, Copy, Debug)]
pub struct EdgeView<'m> {
    mesh: &'m PeriodicMesh,
    key: EdgeKey,
    offset: ChunkOffset,
}

impl<'m> EdgeView<'m> {
    pub(crate) const fn new(mesh: &'m PeriodicMesh, key: EdgeKey, offset: ChunkOffset) -> Self {
        Self { mesh, key, offset }
    }

    #[inline]
    #[must_use]
    pub const fn key(&self) -> EdgeKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub const fn offset(&self) -> ChunkOffset {
        self.offset
    }

    #[must_use]
    pub fn data(&self) -> &'m MeshEdge {
        self.mesh.edge(self.key)
    }

    /// Endpoint `index` (0 or 1) in this view's frame.
    #[must_use]
    pub fn point(&self, index: usize) -> PointView<'m> {
        let end = self.data().points()[index];
        PointView::new(self.mesh, end.point, self.offset + end.offset)
    }

    #[must_use]
    pub fn points(&self) -> [PointView<'m>; 2] {
        [self.point(0), self.point(1)]
    }

    /// The endpoint that is not `key`. For self-loops, the second endpoint.
    #[must_use]
    pub fn opposite(&self, key: PointKey) -> PointView<'m> {
        if self.data().points()[0].point == key {
            self.point(1)
        } else {
            self.point(0)
        }
    }

    #[must_use]
    pub fn positions(&self) -> [Point2; 2] {
        self.points().map(|p| p.position())
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        let [a, b] = self.positions();
        a.distance(b)
    }

    #[must_use]
    pub fn midpoint(&self) -> Point2 {
        let [a, b] = self.positions();
        a.lerp(b, 0.5)
    }

    #[must_use]
    pub fn signature(&self) -> EdgeSignature {
        self.data().signature()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.data().triangle_count()
    }

    /// Triangle in slot `index`, placed so its copy of this edge coincides with
    /// the view.
    #[must_use]
    pub fn triangle(&self, index: usize) -> Option<TriangleView<'m>> {
        let key = self.data().triangles()[index]?;
        let (_, frame) = self.mesh.triangle_frame_across(key, self.key, self.offset)?;
        Some(TriangleView::new(self.mesh, key, frame))
    }

    pub fn triangles(self) -> impl Iterator<Item = TriangleView<'m>> {
        (0..2).filter_map(move |i| self.triangle(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn point_keys() -> (PointKey, PointKey) {
        let mut map: SlotMap<PointKey, ()> = SlotMap::with_key();
        (map.insert(()), map.insert(()))
    }

    #[test]
    fn test_signature_is_symmetric() {
        let (a, b) = point_keys();
        let p = LocalPoint::new(a, ChunkOffset::new(1, 0));
        let q = LocalPoint::new(b, ChunkOffset::new(0, -1));
        assert_eq!(EdgeSignature::new(p, q), EdgeSignature::new(q, p));
        assert_eq!(EdgeSignature::new(p, q).delta(), ChunkOffset::new(-1, -1));

        // Translating both ends does not change the edge.
        let shift = ChunkOffset::new(3, 5);
        assert_eq!(
            EdgeSignature::new(p.shifted(shift), q.shifted(shift)),
            EdgeSignature::new(p, q)
        );
        assert!(!EdgeSignature::new(p, q).is_self_loop());
    }

    #[test]
    fn test_self_loop_signature_folds_direction() {
        let (a, _) = point_keys();
        let p = LocalPoint::at_origin(a);
        let q = LocalPoint::new(a, ChunkOffset::new(-1, 0));
        let sig = EdgeSignature::new(p, q);
        assert!(sig.is_self_loop());
        assert_eq!(sig, EdgeSignature::new(q, p));
        assert_eq!(sig.delta(), ChunkOffset::new(1, 0));
    }

    #[test]
    fn test_triangle_slots() {
        let (a, b) = point_keys();
        let mut tris: SlotMap<TriangleKey, ()> = SlotMap::with_key();
        let t1 = tris.insert(());
        let t2 = tris.insert(());
        let t3 = tris.insert(());

        let mut edge = MeshEdge::from_signature(EdgeSignature::new(
            LocalPoint::at_origin(a),
            LocalPoint::at_origin(b),
        ));
        assert!(edge.is_orphan());
        assert!(edge.attach_triangle(t1));
        assert!(edge.attach_triangle(t2));
        assert!(!edge.attach_triangle(t3));
        assert_eq!(edge.triangle_count(), 2);
        assert_eq!(edge.other_triangle(t1), Some(t2));
        assert_eq!(edge.other_triangle(t2), Some(t1));
        assert_eq!(edge.other_triangle(t3), None);

        edge.detach_triangle(t1);
        assert_eq!(edge.other_triangle(t2), None);
        edge.detach_triangle(t2);
        assert!(edge.is_orphan());
    }
}
