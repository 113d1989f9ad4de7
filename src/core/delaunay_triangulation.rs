//! Incremental periodic Delaunay triangulation.
//!
//! [`PeriodicDelaunay`] owns the current grid and moves through two states:
//!
//! - [`GridState::Bootstrapping`]: every point is inserted into the nine tiles
//!   of an [`ImageGrid`]. After every `reduce_check_interval` insertions the
//!   grid is checked and, once it passes, folded into a single copy.
//! - [`GridState::Reduced`]: points go straight into a one-copy
//!   [`ReducedGrid`].
//!
//! The transition happens once and replaces the grid wholesale. Logical
//! [`PointId`]s stay valid across it; mesh keys and views do not.
//!
//! Queries take and return positions in the caller's frame. In the bootstrap
//! state they are mapped to and from the central tile of the image grid.
//!
//! # Examples
//!
//! ```rust
//! use periodic_delaunay::prelude::*;
//!
//! let mut dt = PeriodicDelaunay::new(10.0, 4);
//! let id = dt.insert(Point2::new(5.0, 5.0)).unwrap();
//! assert_eq!(id.index(), 0);
//! assert!(!dt.is_reduced());
//!
//! // The first point is mirrored into all nine tiles.
//! assert_eq!(dt.grid().number_of_points(), 9);
//! assert_eq!(dt.grid().number_of_triangles(), 18);
//! assert!(dt.triangle_at(Point2::new(5.0, 5.0)).is_some());
//! ```

use crate::core::algorithms::incremental_insertion::{InsertionError, InsertionStats};
use crate::core::builder::{ConfigError, PeriodicDelaunayConfig};
use crate::core::image_grid::{ImageGrid, PointId, ReducedGrid, ReductionError};
use crate::core::periodic_mesh::{MeshValidationError, PeriodicMesh, PointKey};
use crate::core::triangle::TriangleView;
use crate::core::vertex::PointView;
use crate::geometry::point::Point2;

// =============================================================================
// STATE
// =============================================================================

/// The grid a [`PeriodicDelaunay`] currently inserts into.
#[derive(Clone, Debug)]
pub enum GridState {
    /// Nine copies of every point on a torus three times as large.
    Bootstrapping(ImageGrid),
    /// One copy of every point.
    Reduced(ReducedGrid),
}

impl GridState {
    #[must_use]
    pub const fn mesh(&self) -> &PeriodicMesh {
        match self {
            Self::Bootstrapping(grid) => grid.mesh(),
            Self::Reduced(grid) => grid.mesh(),
        }
    }
}

// =============================================================================
// TRIANGULATION
// =============================================================================

/// Incremental Delaunay triangulation of a point set on a square torus.
#[derive(Clone, Debug)]
pub struct PeriodicDelaunay {
    config: PeriodicDelaunayConfig,
    state: GridState,
    insertions_since_check: usize,
    /// Set once the point count outgrows triangle signatures; the grid can
    /// never be folded after that.
    signature_overflow: bool,
}

impl PeriodicDelaunay {
    /// Creates an empty triangulation of a domain of side `domain_size`,
    /// presized for about `point_hint` points.
    ///
    /// # Panics
    ///
    /// Panics if `domain_size` is not finite and positive. Use
    /// [`with_config`](Self::with_config) to handle that as an error.
    #[must_use]
    pub fn new(domain_size: f64, point_hint: usize) -> Self {
        let config = PeriodicDelaunayConfig::builder()
            .domain_size(domain_size)
            .point_hint(point_hint)
            .build();
        match config.and_then(Self::with_config) {
            Ok(triangulation) => triangulation,
            Err(err) => panic!("invalid periodic triangulation settings: {err}"),
        }
    }

    /// Creates an empty triangulation from validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDomainSize`] if the domain size is not
    /// finite and positive.
    pub fn with_config(config: PeriodicDelaunayConfig) -> Result<Self, ConfigError> {
        let grid = ImageGrid::new(config.domain_size(), config.point_hint(), config.chunk_size())
            .map_err(|_| ConfigError::InvalidDomainSize {
                size: config.domain_size(),
            })?;
        Ok(Self {
            config,
            state: GridState::Bootstrapping(grid),
            insertions_since_check: 0,
            signature_overflow: false,
        })
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &PeriodicDelaunayConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub const fn domain_size(&self) -> f64 {
        self.config.domain_size()
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> &GridState {
        &self.state
    }

    #[must_use]
    pub const fn is_reduced(&self) -> bool {
        matches!(self.state, GridState::Reduced(_))
    }

    /// The current mesh: the nine-copy grid while bootstrapping, the folded
    /// grid afterwards.
    ///
    /// Before reduction this is the image mesh on a torus three times the
    /// domain size, holding nine copies of every point. Check
    /// [`is_reduced`](Self::is_reduced) before handing it to code that
    /// expects one copy per point, such as
    /// [`make_graph`](crate::core::algorithms::grouping::make_graph).
    #[must_use]
    pub const fn grid(&self) -> &PeriodicMesh {
        self.state.mesh()
    }

    /// Consumes the triangulation and returns its mesh.
    #[must_use]
    pub fn into_grid(self) -> PeriodicMesh {
        match self.state {
            GridState::Bootstrapping(grid) => grid.mesh().clone(),
            GridState::Reduced(grid) => grid.into_mesh(),
        }
    }

    /// Number of logical points.
    #[must_use]
    pub fn number_of_points(&self) -> usize {
        match &self.state {
            GridState::Bootstrapping(grid) => grid.number_of_points(),
            GridState::Reduced(grid) => grid.number_of_points(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.number_of_points() == 0
    }

    /// Logical id of a mesh point.
    #[must_use]
    pub fn point_id(&self, key: PointKey) -> Option<PointId> {
        match &self.state {
            GridState::Bootstrapping(grid) => grid.point_id(key),
            GridState::Reduced(grid) => grid.point_id(key),
        }
    }

    /// Mesh key standing for a logical point; the central copy while
    /// bootstrapping.
    #[must_use]
    pub fn point_key(&self, id: PointId) -> Option<PointKey> {
        match &self.state {
            GridState::Bootstrapping(grid) => grid.central_copy(id),
            GridState::Reduced(grid) => grid.point_key(id),
        }
    }

    // =========================================================================
    // INSERTION
    // =========================================================================

    /// Inserts a point, returning its logical id.
    ///
    /// The position is clamped into the fundamental domain. On failure the
    /// triangulation is unchanged and the caller decides whether to retry.
    ///
    /// # Errors
    ///
    /// Returns [`InsertionError`] if the point duplicates an existing one,
    /// cannot be located, or produces an unusable cavity.
    pub fn insert(&mut self, position: Point2) -> Result<PointId, InsertionError> {
        self.insert_with_stats(position).map(|(id, _)| id)
    }

    /// Like [`insert`](Self::insert), also returning cavity statistics.
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert).
    pub fn insert_with_stats(
        &mut self,
        position: Point2,
    ) -> Result<(PointId, InsertionStats), InsertionError> {
        let result = match &mut self.state {
            GridState::Bootstrapping(grid) => grid.insert(position),
            GridState::Reduced(grid) => grid.insert(position),
        };
        let (id, stats) = result.inspect_err(|err| {
            tracing::warn!(%position, error = %err, "point insertion failed");
        })?;
        tracing::debug!(
            %id,
            %position,
            cavity = stats.cavity_triangles,
            created = stats.created_triangles,
            reduced = self.is_reduced(),
            "inserted point"
        );

        if !self.is_reduced() && !self.signature_overflow {
            self.insertions_since_check += 1;
            if self.insertions_since_check >= self.config.reduce_check_interval() {
                self.insertions_since_check = 0;
                // Not reducible yet is the normal case while sparse.
                let _ = self.reduce();
            }
        }
        Ok((id, stats))
    }

    /// Folds the bootstrap grid into a single copy if it is reducible.
    /// Does nothing once reduced.
    ///
    /// # Errors
    ///
    /// Returns the [`ReductionError`] that keeps the grid in bootstrap mode.
    pub fn reduce(&mut self) -> Result<(), ReductionError> {
        let GridState::Bootstrapping(grid) = &self.state else {
            return Ok(());
        };
        let plan = match grid.plan_reduction() {
            Ok(plan) => plan,
            Err(reason) => {
                let points = grid.number_of_points();
                self.note_reduction_failure(&reason, points);
                return Err(reason);
            }
        };
        let reduced = grid.reduce(&plan);
        self.state = GridState::Reduced(reduced);
        Ok(())
    }

    /// Logs why the grid stayed in bootstrap mode. A signature overflow is
    /// permanent: it is reported once and stops the periodic checks.
    fn note_reduction_failure(&mut self, reason: &ReductionError, points: usize) {
        if !matches!(reason, ReductionError::SignatureOverflow { .. }) {
            tracing::debug!(%reason, points, "grid not reducible yet");
        } else if !self.signature_overflow {
            self.signature_overflow = true;
            tracing::warn!(
                %reason,
                points,
                "too many points to pack triangle signatures; staying in bootstrap mode"
            );
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    fn to_mesh_frame(&self, pos: Point2) -> Point2 {
        match &self.state {
            GridState::Bootstrapping(grid) => grid.to_image(pos),
            GridState::Reduced(_) => pos,
        }
    }

    fn to_caller_frame(&self, pos: Point2) -> Point2 {
        match &self.state {
            GridState::Bootstrapping(grid) => grid.from_image(pos),
            GridState::Reduced(_) => pos,
        }
    }

    /// Triangle covering `pos`. Use [`point_position`](Self::point_position)
    /// and [`triangle_center`](Self::triangle_center) to read it back in the
    /// caller's frame.
    #[must_use]
    pub fn triangle_at(&self, pos: Point2) -> Option<TriangleView<'_>> {
        self.grid()
            .triangle_at(self.to_mesh_frame(pos))
            .map(|(view, _)| view)
    }

    /// Alias of [`triangle_at`](Self::triangle_at).
    #[must_use]
    pub fn nearest_triangle(&self, pos: Point2) -> Option<TriangleView<'_>> {
        self.triangle_at(pos)
    }

    /// Position of a point view in the caller's frame.
    #[must_use]
    pub fn point_position(&self, view: PointView<'_>) -> Point2 {
        self.to_caller_frame(view.position())
    }

    /// Centroid of a triangle view in the caller's frame.
    #[must_use]
    pub fn triangle_center(&self, view: TriangleView<'_>) -> Point2 {
        self.to_caller_frame(view.centroid())
    }

    /// Logical point nearest to `pos` under the periodic metric.
    #[must_use]
    pub fn nearest_point(&self, pos: Point2) -> Option<PointId> {
        let view = self.grid().nearest_point(self.to_mesh_frame(pos))?;
        self.point_id(view.key())
    }

    /// Barycentric interpolation of per-point values at `pos`.
    ///
    /// Returns `None` if no triangle covers `pos`.
    pub fn interpolate<F>(&self, pos: Point2, value: F) -> Option<f64>
    where
        F: Fn(PointId) -> f64,
    {
        let query = self.to_mesh_frame(pos);
        let (triangle, _) = self.grid().triangle_at(query)?;
        let weights = triangle.barycentric(query)?;
        let mut total = 0.0;
        for (corner, weight) in triangle.points().into_iter().zip(weights) {
            total += weight * value(self.point_id(corner.key())?);
        }
        Some(total)
    }

    /// Structural check of the current grid.
    ///
    /// # Errors
    ///
    /// Returns the first [`MeshValidationError`] found.
    pub fn is_valid(&self) -> Result<(), MeshValidationError> {
        self.grid().is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::image_grid::SIGNATURE_ID_LIMIT;
    use approx::assert_relative_eq;

    fn lattice(n: i32, size: f64) -> Vec<Point2> {
        let step = size / f64::from(n);
        (0..n)
            .flat_map(|j| {
                (0..n).map(move |i| {
                    let seed = f64::from(i * 5 + j * 11);
                    Point2::new(
                        (f64::from(i) + 0.5 + 0.1 * seed.sin()) * step,
                        (f64::from(j) + 0.5 + 0.1 * (2.3 * seed).cos()) * step,
                    )
                })
            })
            .collect()
    }

    #[test]
    fn test_reduces_after_enough_points() {
        let mut dt = PeriodicDelaunay::new(20.0, 25);
        for (index, pos) in lattice(5, 20.0).into_iter().enumerate() {
            let id = dt.insert(pos).unwrap();
            assert_eq!(id.index(), index);
        }
        assert!(dt.is_reduced());
        assert_eq!(dt.number_of_points(), 25);
        assert_eq!(dt.grid().number_of_points(), 25);
        assert_eq!(dt.grid().number_of_triangles(), 50);
        dt.is_valid().unwrap();

        dt.insert(Point2::new(19.9, 0.05)).unwrap();
        assert_eq!(dt.grid().number_of_triangles(), 52);
    }

    #[test]
    fn test_queries_agree_across_states() {
        let points = lattice(5, 20.0);
        let mut bootstrap = PeriodicDelaunay::with_config(
            PeriodicDelaunayConfig::builder()
                .domain_size(20.0)
                .reduce_check_interval(1000)
                .build()
                .unwrap(),
        )
        .unwrap();
        let mut reduced = PeriodicDelaunay::new(20.0, 25);
        for &pos in &points {
            bootstrap.insert(pos).unwrap();
            reduced.insert(pos).unwrap();
        }
        assert!(!bootstrap.is_reduced());
        assert!(reduced.is_reduced());

        for query in [Point2::new(3.3, 7.1), Point2::new(19.5, 0.2), Point2::new(0.1, 12.0)] {
            assert_eq!(bootstrap.nearest_point(query), reduced.nearest_point(query));

            let a = bootstrap.triangle_at(query).unwrap();
            let b = reduced.triangle_at(query).unwrap();
            let mut ids_a: Vec<_> = a
                .points()
                .iter()
                .map(|p| bootstrap.point_id(p.key()).unwrap())
                .collect();
            let mut ids_b: Vec<_> = b
                .points()
                .iter()
                .map(|p| reduced.point_id(p.key()).unwrap())
                .collect();
            ids_a.sort();
            ids_b.sort();
            assert_eq!(ids_a, ids_b);

            let ca = bootstrap.triangle_center(a);
            let cb = reduced.triangle_center(b);
            assert_relative_eq!(ca.x, cb.x, epsilon = 1e-9);
            assert_relative_eq!(ca.y, cb.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_interpolate_reproduces_linear_field() {
        let mut dt = PeriodicDelaunay::new(20.0, 25);
        let points = lattice(5, 20.0);
        for &pos in &points {
            dt.insert(pos).unwrap();
        }
        // A constant field is reproduced exactly everywhere.
        let value = dt.interpolate(Point2::new(7.7, 3.2), |_| 2.5).unwrap();
        assert_relative_eq!(value, 2.5, epsilon = 1e-12);

        // At a data point the interpolant equals that point's value.
        let at = points[7];
        let value = dt
            .interpolate(at, |id| f64::from(u32::try_from(id.index()).unwrap()))
            .unwrap();
        assert_relative_eq!(value, 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_failed_insertion_is_reported() {
        let mut dt = PeriodicDelaunay::new(10.0, 0);
        dt.insert(Point2::new(2.0, 2.0)).unwrap();
        assert!(matches!(
            dt.insert(Point2::new(2.0, 2.0)),
            Err(InsertionError::DuplicatePoint { .. })
        ));
        assert!(matches!(
            dt.insert(Point2::new(f64::NAN, 2.0)),
            Err(InsertionError::NonFinitePoint { .. })
        ));
        assert_eq!(dt.number_of_points(), 1);
    }

    #[test]
    fn test_explicit_reduce_on_sparse_grid() {
        let mut dt = PeriodicDelaunay::new(10.0, 0);
        dt.insert(Point2::new(2.0, 2.0)).unwrap();
        assert!(matches!(
            dt.reduce(),
            Err(ReductionError::TooFewPoints { points: 1, .. })
        ));
        assert!(!dt.is_reduced());
    }

    #[test]
    fn test_signature_overflow_stops_reduction_checks() {
        let mut dt = PeriodicDelaunay::new(10.0, 0);
        let overflow = ReductionError::SignatureOverflow {
            points: SIGNATURE_ID_LIMIT + 1,
            limit: SIGNATURE_ID_LIMIT,
        };
        dt.note_reduction_failure(&overflow, SIGNATURE_ID_LIMIT + 1);
        assert!(dt.signature_overflow);
        dt.note_reduction_failure(&overflow, SIGNATURE_ID_LIMIT + 2);
        assert!(dt.signature_overflow);

        // Other reasons do not latch.
        let mut sparse = PeriodicDelaunay::new(10.0, 0);
        sparse.insert(Point2::new(2.0, 2.0)).unwrap();
        let _ = sparse.reduce();
        assert!(!sparse.signature_overflow);

        // Once latched, inserts no longer count towards a reduction check.
        for pos in lattice(3, 10.0) {
            dt.insert(pos).unwrap();
        }
        assert_eq!(dt.insertions_since_check, 0);
        assert!(!dt.is_reduced());
    }

    #[test]
    #[should_panic(expected = "invalid periodic triangulation settings")]
    fn test_new_rejects_bad_domain() {
        let _ = PeriodicDelaunay::new(0.0, 0);
    }
}
