//! Euler characteristic of periodic meshes.
//!
//! χ = Σ(-1)^k · `f_k`, where `f_k` is the number of `k`-simplices. A closed
//! triangulation of the 2-torus has χ = 0, so `V - E + T == 0` holds for every
//! complete periodic Delaunay mesh.
//!
//! # Examples
//!
//! ```rust
//! use periodic_delaunay::prelude::*;
//! use periodic_delaunay::topology::characteristics::euler;
//!
//! let mut dt = PeriodicDelaunay::new(10.0, 16);
//! dt.insert(Point2::new(5.0, 5.0)).unwrap();
//!
//! let counts = euler::count_simplices(dt.grid());
//! assert_eq!(counts.by_dim, vec![9, 27, 18]);
//! assert_eq!(euler::euler_characteristic(&counts), 0);
//! ```

use crate::core::periodic_mesh::PeriodicMesh;

/// Counts of `k`-simplices for `0 ≤ k ≤ 2`.
///
/// In the topology literature this is commonly called the **f-vector**:
/// - `f₀` = points
/// - `f₁` = edges
/// - `f₂` = triangles
///
/// Trailing zero dimensions are dropped, so a graph-only mesh has two
/// entries and an empty mesh has none.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::topology::characteristics::euler::FVector;
///
/// let counts = FVector {
///     by_dim: vec![4, 12, 8],
/// };
///
/// assert_eq!(counts.count(0), 4);
/// assert_eq!(counts.count(2), 8);
/// assert_eq!(counts.count(3), 0);
/// assert_eq!(counts.dimension(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FVector {
    /// `by_dim[k]` = `f_k` = number of `k`-simplices
    pub by_dim: Vec<usize>,
}

impl FVector {
    /// Number of `k`-simplices; 0 if `k` is out of range.
    #[must_use]
    #[inline]
    pub fn count(&self, k: usize) -> usize {
        self.by_dim.get(k).copied().unwrap_or(0)
    }

    /// Highest dimension with a recorded count.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.by_dim.len().saturating_sub(1)
    }
}

/// Global shape of a periodic mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyClassification {
    /// No points.
    Empty,

    /// Points and edges only, as produced by the grouping pass.
    Graph,

    /// Every edge bounds exactly two triangles: a closed surface on the
    /// torus.
    Torus,

    /// Some edge bounds a single triangle.
    OpenSurface,

    /// Triangles mixed with orphan edges.
    Unknown,
}

/// Counts points, edges and triangles.
#[must_use]
pub fn count_simplices(mesh: &PeriodicMesh) -> FVector {
    let mut by_dim = vec![
        mesh.number_of_points(),
        mesh.number_of_edges(),
        mesh.number_of_triangles(),
    ];
    while by_dim.last() == Some(&0) {
        by_dim.pop();
    }
    FVector { by_dim }
}

/// χ = Σ(-1)^k · `f_k`.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::topology::characteristics::euler::{FVector, euler_characteristic};
///
/// // Graph: a path of 3 points.
/// assert_eq!(euler_characteristic(&FVector { by_dim: vec![3, 2] }), 1);
/// // Minimal two-point torus.
/// assert_eq!(euler_characteristic(&FVector { by_dim: vec![2, 6, 4] }), 0);
/// ```
#[must_use]
pub fn euler_characteristic(counts: &FVector) -> isize {
    counts
        .by_dim
        .iter()
        .enumerate()
        .map(|(k, &f_k)| {
            let f_k = isize::try_from(f_k).unwrap_or(isize::MAX);
            if k % 2 == 0 { f_k } else { -f_k }
        })
        .sum()
}

/// Classifies `mesh` from its edge-to-triangle incidences.
#[must_use]
pub fn classify_mesh(mesh: &PeriodicMesh) -> TopologyClassification {
    if mesh.is_empty() {
        return TopologyClassification::Empty;
    }
    if mesh.number_of_triangles() == 0 {
        return TopologyClassification::Graph;
    }

    let mut boundary = false;
    for (_, edge) in mesh.edges() {
        match edge.triangle_count() {
            0 => return TopologyClassification::Unknown,
            1 => boundary = true,
            _ => {}
        }
    }
    if boundary {
        TopologyClassification::OpenSurface
    } else {
        TopologyClassification::Torus
    }
}

/// Expected χ for a classification; `None` when it depends on the mesh.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::topology::characteristics::euler::{
///     TopologyClassification, expected_chi_for,
/// };
///
/// assert_eq!(expected_chi_for(&TopologyClassification::Torus), Some(0));
/// assert_eq!(expected_chi_for(&TopologyClassification::Graph), None);
/// ```
#[must_use]
pub const fn expected_chi_for(classification: &TopologyClassification) -> Option<isize> {
    match classification {
        TopologyClassification::Empty | TopologyClassification::Torus => Some(0),
        TopologyClassification::Graph
        | TopologyClassification::OpenSurface
        | TopologyClassification::Unknown => None,
    }
}
