//! Error types for validmask.
//!
//! Uses thiserror for structured errors with context. Errors are designed to:
//! - Carry enough structure (kind, message, wrapped cause) for a UI to render
//! - Abort the current build or transform entirely; nothing is retried here
//! - Chain their root cause through `std::error::Error::source`

use crate::core::types::{Extent, PixelKind};
use thiserror::Error;

/// Top-level error type for validmask.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum ValidMaskError {
    #[error("Mask build error: {0}")]
    MaskBuild(#[from] MaskBuildError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Raster error: {0}")]
    Raster(#[from] RasterError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by the tile engine itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("Region {x},{y} {width}x{height} lies outside the {extent} raster")]
    RegionOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        extent: Extent,
    },

    #[error("Tile ({tile_x}, {tile_y}) does not exist")]
    TileOutOfBounds { tile_x: u32, tile_y: u32 },

    #[error("Buffer holds {actual} samples but the region needs {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("Expected {expected} samples, got {actual}")]
    KindMismatch {
        expected: PixelKind,
        actual: PixelKind,
    },

    #[error("Raster extent {actual} does not match {expected}")]
    ExtentMismatch { expected: Extent, actual: Extent },

    #[error("Band '{0}' already exists")]
    DuplicateBand(String),

    #[error("{0}")]
    Other(String),
}

/// Errors from building a composite validity mask.
///
/// Expression, geometry and shapefile problems are detected when the builder
/// materializes its sources. WKT text is the exception: it is parsed when added.
#[derive(Error, Debug)]
pub enum MaskBuildError {
    #[error("Invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("Invalid WKT geometry: {reason}")]
    InvalidWkt { reason: String },

    #[error("Geometry must not be empty: {0}")]
    NullGeometry(String),

    #[error("Cannot load shapefile '{location}'")]
    ShapefileLoad {
        location: String,
        #[source]
        source: ShapeStoreError,
    },

    #[error("Mask extent {actual} does not match scene extent {expected}")]
    ExtentMismatch { expected: Extent, actual: Extent },

    #[error("Cannot reproject geometry into the scene system")]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Errors from the per-pixel transforms.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Operand extents differ: source is {source_extent}, mask is {mask_extent}")]
    ExtentMismatch {
        source_extent: Extent,
        mask_extent: Extent,
    },

    #[error("Unsupported pixel kind {0}; expected float32 or float64")]
    UnsupportedPixelKind(PixelKind),

    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Errors from reading an external shape store.
#[derive(Error, Debug)]
pub enum ShapeStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Malformed shapefile: {0}")]
    Format(String),

    #[error("Unsupported shape store: {0}")]
    Unsupported(String),

    #[error("Cannot reproject features")]
    Projection(#[from] ProjectionError),
}

/// Errors from moving coordinates between reference systems.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("Reprojection from {from} to {to} needs the `proj` feature")]
    ProjNotAvailable { from: String, to: String },

    #[error("Cannot create transformation from {from} to {to}: {reason}")]
    Setup { from: String, to: String, reason: String },

    #[error("Cannot transform ({x}, {y}): {reason}")]
    Coordinate { x: f64, y: f64, reason: String },
}

/// Errors from loading configuration or mask specs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid mask spec: {0}")]
    Invalid(String),
}

// ============================================================================
// Error Utilities
// ============================================================================

impl MaskBuildError {
    /// Whether the caller can fix the input and try again.
    ///
    /// Extent mismatches and tile-engine failures are programming errors.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MaskBuildError::InvalidExpression { .. }
                | MaskBuildError::InvalidWkt { .. }
                | MaskBuildError::NullGeometry(_)
                | MaskBuildError::ShapefileLoad { .. }
        )
    }

    /// Get suggestion for fixing this error.
    pub fn suggested_fix(&self) -> Option<String> {
        match self {
            MaskBuildError::InvalidExpression { .. } => {
                Some("Check the band names and operator syntax of the expression".to_string())
            }
            MaskBuildError::InvalidWkt { .. } => {
                Some("Provide a POLYGON or MULTIPOLYGON in WKT notation".to_string())
            }
            MaskBuildError::ShapefileLoad { location, .. } => {
                Some(format!("Check that the shapefile '{}' exists and is readable", location))
            }
            MaskBuildError::ExtentMismatch { expected, .. } => {
                Some(format!("Provide a mask raster of size {}", expected))
            }
            MaskBuildError::Projection(ProjectionError::ProjNotAvailable { .. }) => {
                Some("Build with the `proj` feature to reproject between these systems".to_string())
            }
            _ => None,
        }
    }
}

impl TransformError {
    /// Transform errors are configuration mistakes; none is recoverable.
    pub fn is_recoverable(&self) -> bool {
        false
    }
}

/// Result type alias for validmask operations.
pub type ValidMaskResult<T> = Result<T, ValidMaskError>;

/// Result type alias for tile engine operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// Result type alias for mask building.
pub type MaskBuildResult<T> = Result<T, MaskBuildError>;

/// Result type alias for transforms.
pub type TransformResult<T> = Result<T, TransformError>;
