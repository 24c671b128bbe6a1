//! Core types of the validmask tile engine.
//!
//! This module contains the foundational pieces every mask and transform is
//! built from:
//! - Pixel kinds, extents, tile sizes and join operators
//! - Tile regions and grids
//! - Typed per-tile sample buffers
//! - The lazy, tile-caching [`Raster`] handle
//! - Error types

pub mod buffer;
pub mod error;
pub mod raster;
pub mod tile;
pub mod types;

// Re-export commonly used types
pub use buffer::{PixelBuffer, Sample, SampleData};
pub use error::{
    ConfigError, MaskBuildError, RasterError, ShapeStoreError, TransformError, ValidMaskError, ValidMaskResult,
};
pub use raster::{Raster, RasterLayout, RasterSource};
pub use tile::{TileGrid, TileIterator, TileRegion};
pub use types::{Extent, FillValue, JoinOp, PixelKind, TileSize, INVALID, VALID};
