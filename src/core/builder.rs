//! Configuration and fluent construction of [`PeriodicDelaunay`].
//!
//! [`PeriodicDelaunayConfig`] holds the construction-time settings and is
//! built with the derived [`PeriodicDelaunayConfigBuilder`], which validates
//! its input. [`PeriodicDelaunayBuilder`] wraps a config builder together with
//! an initial point slice and inserts the points on
//! [`build`](PeriodicDelaunayBuilder::build).
//!
//! # Examples
//!
//! ```rust
//! use periodic_delaunay::core::builder::PeriodicDelaunayConfig;
//!
//! let config = PeriodicDelaunayConfig::builder()
//!     .domain_size(64.0)
//!     .point_hint(500)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.reduce_check_interval(), 1);
//! assert!(config.chunk_size().is_none());
//! ```
//!
//! ```rust
//! use periodic_delaunay::core::builder::PeriodicDelaunayBuilder;
//! use periodic_delaunay::geometry::point::Point2;
//!
//! let points = [
//!     Point2::new(1.0, 1.0),
//!     Point2::new(6.0, 2.0),
//!     Point2::new(3.0, 7.0),
//! ];
//! let dt = PeriodicDelaunayBuilder::new(10.0, &points).build().unwrap();
//! assert_eq!(dt.number_of_points(), 3);
//! ```

use crate::core::algorithms::incremental_insertion::InsertionError;
use crate::core::delaunay_triangulation::PeriodicDelaunay;
use crate::geometry::point::Point2;
use derive_builder::UninitializedFieldError;

// =============================================================================
// ERRORS
// =============================================================================

/// Invalid construction settings.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required setting was not provided.
    #[error("Missing required setting `{field}`")]
    MissingField {
        /// Name of the setting.
        field: &'static str,
    },

    /// The domain side is not finite and positive.
    #[error("Invalid domain size {size}; expected a finite value > 0")]
    InvalidDomainSize {
        /// The rejected size.
        size: f64,
    },

    /// The chunk side is not finite and positive.
    #[error("Invalid chunk size {size}; expected a finite value > 0")]
    InvalidChunkSize {
        /// The rejected size.
        size: f64,
    },

    /// Reduction would never be attempted.
    #[error("Reduce check interval must be at least 1")]
    ZeroCheckInterval,
}

impl From<UninitializedFieldError> for ConfigError {
    fn from(err: UninitializedFieldError) -> Self {
        Self::MissingField {
            field: err.field_name(),
        }
    }
}

/// Failure while building a triangulation from a point slice.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum PeriodicDelaunayBuildError {
    /// The settings were rejected.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// An input point could not be inserted.
    #[error("Failed to insert point {index}: {source}")]
    Insertion {
        /// Position of the point in the input slice.
        index: usize,
        /// Why it failed.
        source: InsertionError,
    },
}

// =============================================================================
// CONFIG
// =============================================================================

/// Construction-time settings of a [`PeriodicDelaunay`].
#[derive(Builder, Clone, Copy, Debug, PartialEq)]
#[builder(derive(Debug), build_fn(validate = "Self::validate", error = "ConfigError"))]
pub struct PeriodicDelaunayConfig {
    /// Side of the square fundamental domain.
    domain_size: f64,
    /// Expected number of points; presizes arenas and the chunk grid.
    #[builder(default)]
    point_hint: usize,
    /// Side of a spatial-index chunk. Derived from `point_hint` when unset.
    #[builder(default, setter(strip_option))]
    chunk_size: Option<f64>,
    /// Number of bootstrap insertions between reduction attempts.
    #[builder(default = "1")]
    reduce_check_interval: usize,
}

impl PeriodicDelaunayConfigBuilder {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(size) = self.domain_size
            && !(size.is_finite() && size > 0.0)
        {
            return Err(ConfigError::InvalidDomainSize { size });
        }
        if let Some(Some(size)) = self.chunk_size
            && !(size.is_finite() && size > 0.0)
        {
            return Err(ConfigError::InvalidChunkSize { size });
        }
        if self.reduce_check_interval == Some(0) {
            return Err(ConfigError::ZeroCheckInterval);
        }
        Ok(())
    }
}

impl PeriodicDelaunayConfig {
    #[must_use]
    pub fn builder() -> PeriodicDelaunayConfigBuilder {
        PeriodicDelaunayConfigBuilder::default()
    }

    /// Config with default settings for a domain of side `domain_size`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDomainSize`] if `domain_size` is not
    /// finite and positive.
    pub fn new(domain_size: f64) -> Result<Self, ConfigError> {
        Self::builder().domain_size(domain_size).build()
    }

    #[inline]
    #[must_use]
    pub const fn domain_size(&self) -> f64 {
        self.domain_size
    }

    #[inline]
    #[must_use]
    pub const fn point_hint(&self) -> usize {
        self.point_hint
    }

    #[inline]
    #[must_use]
    pub const fn chunk_size(&self) -> Option<f64> {
        self.chunk_size
    }

    #[inline]
    #[must_use]
    pub const fn reduce_check_interval(&self) -> usize {
        self.reduce_check_interval
    }
}

// =============================================================================
// TRIANGULATION BUILDER
// =============================================================================

/// Builds a [`PeriodicDelaunay`] from a slice of points.
///
/// The point hint defaults to the slice length.
#[derive(Clone, Debug)]
pub struct PeriodicDelaunayBuilder<'p> {
    points: &'p [Point2],
    config: PeriodicDelaunayConfigBuilder,
}

impl<'p> PeriodicDelaunayBuilder<'p> {
    #[must_use]
    pub fn new(domain_size: f64, points: &'p [Point2]) -> Self {
        let mut config = PeriodicDelaunayConfig::builder();
        config.domain_size(domain_size).point_hint(points.len());
        Self { points, config }
    }

    #[must_use]
    pub fn point_hint(mut self, hint: usize) -> Self {
        self.config.point_hint(hint);
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, size: f64) -> Self {
        self.config.chunk_size(size);
        self
    }

    #[must_use]
    pub fn reduce_check_interval(mut self, interval: usize) -> Self {
        self.config.reduce_check_interval(interval);
        self
    }

    /// Validates the settings and inserts every point in order.
    ///
    /// # Errors
    ///
    /// Returns [`PeriodicDelaunayBuildError::Config`] for invalid settings and
    /// [`PeriodicDelaunayBuildError::Insertion`] for the first point that
    /// cannot be inserted.
    pub fn build(self) -> Result<PeriodicDelaunay, PeriodicDelaunayBuildError> {
        let config = self.config.build()?;
        let mut triangulation = PeriodicDelaunay::with_config(config)?;
        for (index, &point) in self.points.iter().enumerate() {
            triangulation
                .insert(point)
                .map_err(|source| PeriodicDelaunayBuildError::Insertion { index, source })?;
        }
        Ok(triangulation)
    }
}
