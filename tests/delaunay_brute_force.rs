//! Brute-force checks of the empty-circumcircle property on small random sets.
//!
//! Every triangle's circumcircle is compared against the periodic images of
//! every other point. Most sets are stratified so no two points are closer
//! than a fraction of the cell size; the uniform sets have no such spacing.

use approx::assert_relative_eq;
use periodic_delaunay::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

const SIZE: f64 = 10.0;

/// One random point per cell of an `n × n` grid.
fn stratified(seed: u64, n: i32) -> Vec<Point2> {
    let mut rng = StdRng::seed_from_u64(seed);
    let step = SIZE / f64::from(n);
    let mut points = Vec::new();
    for j in 0..n {
        for i in 0..n {
            let dx: f64 = rng.random_range(0.15..0.85);
            let dy: f64 = rng.random_range(0.15..0.85);
            points.push(Point2::new(
                (f64::from(i) + dx) * step,
                (f64::from(j) + dy) * step,
            ));
        }
    }
    points
}

/// `count` points drawn uniformly from the whole domain.
fn uniform(seed: u64, count: usize) -> Vec<Point2> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Point2::new(rng.random_range(0.0..SIZE), rng.random_range(0.0..SIZE)))
        .collect()
}

/// Reports every `(triangle, point)` pair whose nearest image lies strictly
/// inside the circumcircle.
fn violations(mesh: &PeriodicMesh) -> Vec<(TriangleKey, PointKey)> {
    let space = ToroidalSpace::new(mesh.domain_size()).unwrap();
    let mut found = Vec::new();
    for (key, triangle) in mesh.triangles() {
        let [a, b, c] = mesh.triangle_positions(triangle, ChunkOffset::ZERO);
        let (center, radius2) = circumcircle(a, b, c).unwrap();
        assert!(
            radius2.sqrt() < 0.5 * mesh.domain_size(),
            "circumcircle too large for a nearest-image test"
        );
        for (point, data) in mesh.points() {
            if triangle.contains_point(point) {
                continue;
            }
            let d2 = space.distance_squared(center, data.position());
            if d2 < radius2 * (1.0 - 1e-9) {
                found.push((key, point));
            }
        }
    }
    found
}

#[test]
fn test_random_sets_are_delaunay() {
    for seed in [7_u64, 42, 1234, 9001] {
        let points = stratified(seed, 5);
        let mut dt = PeriodicDelaunay::new(SIZE, points.len());
        for &pos in &points {
            dt.insert(pos).unwrap();
        }
        assert!(dt.is_reduced(), "seed {seed} did not reduce");
        dt.is_valid().unwrap();

        let mesh = dt.grid();
        assert_eq!(mesh.number_of_triangles(), 2 * points.len());
        assert!(
            violations(mesh).is_empty(),
            "seed {seed}: {:?}",
            violations(mesh)
        );
        assert!(find_delaunay_violations(mesh, DEFAULT_DELAUNAY_TOLERANCE).is_empty());
    }
}

#[test]
fn test_every_prefix_is_delaunay() {
    let points = stratified(2024, 4);
    let mut dt = PeriodicDelaunay::new(SIZE, points.len());
    for (count, &pos) in points.iter().enumerate() {
        dt.insert(pos).unwrap();
        assert!(
            find_delaunay_violations(dt.grid(), DEFAULT_DELAUNAY_TOLERANCE).is_empty(),
            "violation after {} points",
            count + 1
        );
    }
}

#[test]
fn test_insertion_order_does_not_matter_for_counts() {
    let mut points = stratified(77, 5);
    let forward = PeriodicDelaunayBuilder::new(SIZE, &points).build().unwrap();
    points.reverse();
    let backward = PeriodicDelaunayBuilder::new(SIZE, &points).build().unwrap();

    assert!(forward.is_reduced() && backward.is_reduced());
    assert_eq!(
        forward.grid().number_of_edges(),
        backward.grid().number_of_edges()
    );
    // Both are the unique Delaunay triangulation of a generic set.
    let lengths = |dt: &PeriodicDelaunay| {
        let mut l: Vec<f64> = dt
            .grid()
            .edges()
            .map(|(key, _)| dt.grid().edge_view(key).length())
            .collect();
        l.sort_by(f64::total_cmp);
        l
    };
    let (a, b) = (lengths(&forward), lengths(&backward));
    for (x, y) in a.iter().zip(&b) {
        assert_relative_eq!(*x, *y, epsilon = 1e-9);
    }
}

#[test]
fn test_uniform_random_sets_are_delaunay() {
    for seed in 0_u64..40 {
        let points = uniform(seed, 30);
        let mut dt = PeriodicDelaunay::new(SIZE, points.len());
        for (count, &pos) in points.iter().enumerate() {
            dt.insert(pos)
                .unwrap_or_else(|err| panic!("seed {seed}, point {count}: {err}"));
        }
        dt.is_valid().unwrap();

        let found = find_delaunay_violations(dt.grid(), DEFAULT_DELAUNAY_TOLERANCE);
        assert!(
            found.is_empty(),
            "seed {seed} (reduced: {}): {found:?}",
            dt.is_reduced()
        );
    }
}
