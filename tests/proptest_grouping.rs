//! Property-based tests for edge grouping.
//!
//! - Groups never exceed the size cap.
//! - Each point belongs to at most one group.
//! - Every group is a simple path: `k` points joined by `k - 1` edges.

use periodic_delaunay::prelude::*;
use proptest::prelude::*;

const SIZE: f64 = 20.0;

fn triangulation(seed: u32) -> PeriodicDelaunay {
    let n = 5_u32;
    let step = SIZE / f64::from(n);
    let points: Vec<Point2> = (0..n * n)
        .map(|k| {
            let phase = f64::from(k * 17 + seed);
            Point2::new(
                (f64::from(k % n) + 0.5 + 0.2 * phase.sin()) * step,
                (f64::from(k / n) + 0.5 + 0.2 * (1.3 * phase).cos()) * step,
            )
        })
        .collect();
    PeriodicDelaunayBuilder::new(SIZE, &points).build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_groups_are_bounded_paths(seed in 0_u32..1000, cap in 0_usize..8) {
        let dt = triangulation(seed);
        let graph = make_graph(dt.grid(), cap);

        prop_assert_eq!(graph.grid.number_of_points(), dt.grid().number_of_points());
        prop_assert_eq!(graph.grid.number_of_triangles(), 0);

        let mut seen = FastHashSet::default();
        for group in &graph.groups {
            prop_assert!(group.len() <= cap);
            prop_assert!(group.len() >= 2);
            for &point in group.points() {
                prop_assert!(seen.insert(point), "point {:?} in two groups", point);
                prop_assert!(graph.grid.contains_point(point));
            }
        }

        let path_edges: usize = graph.groups.iter().map(|g| g.len() - 1).sum();
        prop_assert_eq!(graph.grid.number_of_edges(), path_edges);
        for (_, point) in graph.grid.points() {
            prop_assert!(point.edges().len() <= 2);
        }
    }
}
