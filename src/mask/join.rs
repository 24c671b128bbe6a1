//! Pixel-wise AND/OR of two masks.

use crate::core::buffer::PixelBuffer;
use crate::core::error::{RasterError, RasterResult};
use crate::core::raster::{Raster, RasterLayout, RasterSource};
use crate::core::tile::TileRegion;
use crate::core::types::{JoinOp, PixelKind, TileSize};

/// Lazily joins two masks of equal extent. Any non-zero sample counts as
/// valid, NaN included; the result is 0 or 255.
pub struct JoinImage {
    layout: RasterLayout,
    left: Raster,
    right: Raster,
    op: JoinOp,
}

impl JoinImage {
    /// Join `left` with `right`, tiled like `tile_size`.
    pub fn new(left: Raster, right: Raster, op: JoinOp, tile_size: TileSize) -> RasterResult<Self> {
        if left.extent() != right.extent() {
            return Err(RasterError::ExtentMismatch {
                expected: left.extent(),
                actual: right.extent(),
            });
        }
        Ok(Self {
            layout: RasterLayout::new(left.width(), left.height(), PixelKind::UInt8, tile_size),
            left,
            right,
            op,
        })
    }

    /// Wrap into a lazily evaluated raster.
    pub fn into_raster(self) -> Raster {
        Raster::new(self)
    }
}

impl RasterSource for JoinImage {
    fn layout(&self) -> &RasterLayout {
        &self.layout
    }

    fn compute_tile(&self, region: TileRegion) -> RasterResult<PixelBuffer> {
        let left = self.left.region(region)?.nonzero_mask();
        let right = self.right.region(region)?.nonzero_mask();
        let joined = left
            .into_iter()
            .zip(right)
            .map(|(l, r)| self.op.apply(l as u8, r as u8))
            .collect();
        PixelBuffer::from_vec(region, joined)
    }

    fn name(&self) -> &str {
        match self.op {
            JoinOp::And => "join-and",
            JoinOp::Or => "join-or",
        }
    }
}
