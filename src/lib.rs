//! # periodic-delaunay
//!
//! Incremental Delaunay triangulation of 2D point sets on a periodic square
//! domain, a torus whose opposite edges are identified.
//!
//! # Features
//!
//! - Bowyer–Watson insertion that works across the domain seam
//! - Arena mesh store with stable keys, chunk offsets, and lightweight views
//! - Torus-wrapped chunk index for triangle location
//! - Nine-copy bootstrap that folds into a one-copy periodic grid
//! - Kruskal-style grouping of edges into bounded chains
//! - Structural, Delaunay, and Euler characteristic validation
//!
//! # Basic Usage
//!
//! ```rust
//! use periodic_delaunay::prelude::*;
//!
//! let mut dt = PeriodicDelaunay::new(100.0, 64);
//! for j in 0..8 {
//!     for i in 0..8 {
//!         let seed = f64::from(i * 5 + j * 11);
//!         let x = (f64::from(i) + 0.5 + 0.1 * seed.sin()) * 12.5;
//!         let y = (f64::from(j) + 0.5 + 0.1 * (2.3 * seed).cos()) * 12.5;
//!         dt.insert(Point2::new(x, y)).unwrap();
//!     }
//! }
//!
//! // Once enough points are in, the nine copies fold into one.
//! assert!(dt.is_reduced());
//! assert_eq!(dt.number_of_points(), 64);
//! assert_eq!(dt.grid().number_of_triangles(), 128);
//!
//! let triangle = dt.triangle_at(Point2::new(99.9, 0.1)).unwrap();
//! assert!(triangle.contains(Point2::new(99.9, 0.1)));
//! ```
//!
//! Points may be given anywhere; they are clamped into `[0, size)²`.
//!
//! # Topology
//!
//! A complete periodic triangulation covers the torus, so
//! `V - E + T == 0` and every edge bounds exactly two triangles. See
//! [`topology::characteristics`] for the checks.
//!
//! # Grouping
//!
//! ```rust
//! use periodic_delaunay::prelude::*;
//!
//! let mut dt = PeriodicDelaunay::new(100.0, 64);
//! for j in 0..8 {
//!     for i in 0..8 {
//!         let seed = f64::from(i * 5 + j * 11);
//!         let x = (f64::from(i) + 0.5 + 0.1 * seed.sin()) * 12.5;
//!         let y = (f64::from(j) + 0.5 + 0.1 * (2.3 * seed).cos()) * 12.5;
//!         dt.insert(Point2::new(x, y)).unwrap();
//!     }
//! }
//!
//! // Group the folded grid; before reduction `grid()` holds nine copies of
//! // every point.
//! assert!(dt.is_reduced());
//! let graph = make_graph(dt.grid(), 4);
//! assert!(graph.groups.iter().all(|group| group.len() <= 4));
//! assert!(graph.grid.number_of_points() <= 64);
//! assert_eq!(graph.grid.number_of_triangles(), 0);
//! ```

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// The `core` module contains the periodic mesh store, the insertion
/// algorithms, and the two-phase triangulation built on them.
pub mod core {
    /// Triangulation algorithms for insertion, location, and edge grouping
    pub mod algorithms {
        /// Edge chains for fault generation
        pub mod grouping;
        /// Periodic Bowyer–Watson insertion
        pub mod incremental_insertion;
        /// Point location and conflict regions
        pub mod locate;
    }
    /// Configuration and batch construction
    pub mod builder;
    /// Collection types used by the mesh store
    pub mod collections;
    pub mod delaunay_triangulation;
    pub mod edge;
    /// Nine-copy bootstrap grid and its reduction
    pub mod image_grid;
    pub mod local_point;
    pub mod periodic_mesh;
    pub mod triangle;
    /// Validation helpers that sit on top of the mesh store
    pub mod util {
        pub mod delaunay_validation;
        pub use delaunay_validation::*;
    }
    pub mod vertex;

    // Re-export the `core` modules.
    pub use builder::*;
    pub use delaunay_triangulation::*;
    pub use edge::*;
    pub use image_grid::*;
    pub use local_point::*;
    pub use periodic_mesh::*;
    pub use triangle::*;
    pub use vertex::*;
    // Note: collections module not re-exported here to avoid namespace pollution
    // Import specific types via prelude or use crate::core::collections::
}

/// Contains the `Point2` value type and the floating-point predicates used by
/// insertion and location.
pub mod geometry {
    pub mod point;
    pub mod predicates;
    pub use point::*;
    pub use predicates::*;
}

/// Topological spaces and global topology checks.
pub mod topology {
    /// Euler characteristic and classification
    pub mod characteristics {
        pub mod euler;
        pub mod validation;
        pub use euler::*;
        pub use validation::*;
    }
    /// Spaces the mesh can live in
    pub mod spaces {
        pub mod toroidal;
        pub use toroidal::*;
    }
}

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    // Re-export from core
    pub use crate::core::{
        algorithms::{
            grouping::{FaultGraph, Group, make_graph},
            incremental_insertion::{InsertionError, InsertionStats, insert_point},
            locate::{ConflictError, LocateError},
        },
        builder::*,
        delaunay_triangulation::*,
        edge::*,
        image_grid::{ImageGrid, PointId, ReducedGrid, ReductionError, ReductionPlan},
        local_point::*,
        periodic_mesh::*,
        triangle::*,
        util::*,
        vertex::*,
    };

    // Re-export commonly used collection types from core::collections
    pub use crate::core::collections::{
        FastHashMap, FastHashSet, SmallBuffer, fast_hash_map_with_capacity,
        fast_hash_set_with_capacity,
    };

    // Re-export from geometry and topology
    pub use crate::geometry::{point::*, predicates::*};
    pub use crate::topology::{
        characteristics::{euler::*, validation::*},
        spaces::toroidal::*,
    };
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
