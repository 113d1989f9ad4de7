//! Euler characteristic checks for periodic meshes.
//!
//! Combines simplex counting, classification, and the expected χ into one
//! report.

use crate::core::periodic_mesh::PeriodicMesh;
use crate::topology::characteristics::euler::{
    FVector, TopologyClassification, classify_mesh, count_simplices, euler_characteristic,
    expected_chi_for,
};

/// Result of Euler characteristic validation.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::topology::characteristics::{euler::*, validation::TopologyCheckResult};
///
/// let valid_result = TopologyCheckResult {
///     chi: 0,
///     expected: Some(0),
///     classification: TopologyClassification::Torus,
///     counts: FVector { by_dim: vec![2, 6, 4] },
///     notes: vec![],
/// };
/// assert!(valid_result.is_valid());
///
/// let invalid_result = TopologyCheckResult {
///     chi: 1,
///     expected: Some(0),
///     classification: TopologyClassification::Torus,
///     counts: FVector { by_dim: vec![3, 6, 4] },
///     notes: vec!["Mismatch".to_string()],
/// };
/// assert!(!invalid_result.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyCheckResult {
    /// Computed Euler characteristic.
    pub chi: isize,

    /// Expected χ based on classification (None if it cannot be predicted).
    pub expected: Option<isize>,

    /// Topological classification.
    pub classification: TopologyClassification,

    /// Full simplex counts (f-vector).
    pub counts: FVector,

    /// Diagnostic notes.
    pub notes: Vec<String>,
}

impl TopologyCheckResult {
    /// Returns `true` if χ matches expectation, or if nothing was expected.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.expected.is_none_or(|exp| self.chi == exp)
    }
}

/// Counts, classifies, and checks χ of `mesh`.
///
/// # Examples
///
/// ```rust
/// use periodic_delaunay::prelude::*;
/// use periodic_delaunay::topology::characteristics::validation;
///
/// let mut dt = PeriodicDelaunay::new(10.0, 16);
/// for &(x, y) in &[(5.0, 5.0), (2.0, 7.0), (8.5, 1.5)] {
///     dt.insert(Point2::new(x, y)).unwrap();
/// }
///
/// let result = validation::validate_mesh_euler(dt.grid());
/// assert_eq!(result.chi, 0);
/// assert!(result.is_valid());
/// ```
#[must_use]
pub fn validate_mesh_euler(mesh: &PeriodicMesh) -> TopologyCheckResult {
    let counts = count_simplices(mesh);
    let chi = euler_characteristic(&counts);
    let classification = classify_mesh(mesh);
    let expected = expected_chi_for(&classification);

    let mut notes = Vec::new();
    if let Some(exp) = expected
        && chi != exp
    {
        notes.push(format!(
            "Euler characteristic mismatch: computed χ={chi}, expected χ={exp} for {classification:?}"
        ));
    }
    if classification == TopologyClassification::OpenSurface {
        notes.push("Mesh has edges with a single triangle; it does not cover the torus".to_string());
    }
    if !notes.is_empty() {
        tracing::debug!(chi, ?expected, ?classification, "topology check flagged the mesh");
    }

    TopologyCheckResult {
        chi,
        expected,
        classification,
        counts,
        notes,
    }
}
