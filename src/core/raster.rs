//! Lazily evaluated, tile-partitioned rasters.
//!
//! # Architecture
//!
//! A raster is described by a [`RasterLayout`] and computed by a
//! [`RasterSource`], one tile at a time:
//! - Nothing is computed until a tile or region is requested
//! - Each tile is computed at most once and shared as `Arc<PixelBuffer>`
//! - Regions spanning several tiles are assembled from the cached tiles
//! - Tiles are independent, so [`Raster::compute_all`] can fan out over rayon
//!
//! # Example
//!
//! ```ignore
//! let raster = Raster::from_fn(512, 512, TileSize::square(128), |x, y| (x * y) as f32);
//! let tile = raster.tile(1, 2)?;
//! let whole = raster.materialize()?;
//! ```

use crate::core::buffer::{PixelBuffer, Sample};
use crate::core::error::{RasterError, RasterResult};
use crate::core::tile::{TileGrid, TileRegion};
use crate::core::types::{Extent, PixelKind, TileSize, INVALID, VALID};
use image::GrayImage;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;

/// Shape, kind and tiling of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterLayout {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Element kind of every sample
    pub kind: PixelKind,
    /// Nominal tile size
    pub tile_size: TileSize,
}

impl RasterLayout {
    /// Create a new layout.
    pub fn new(width: u32, height: u32, kind: PixelKind, tile_size: TileSize) -> Self {
        Self {
            width,
            height,
            kind,
            tile_size,
        }
    }

    /// Width and height.
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// Region covering the whole raster.
    pub fn bounds(&self) -> TileRegion {
        TileRegion::of_extent(self.extent())
    }

    /// Tile grid for this layout.
    pub fn grid(&self) -> TileGrid {
        TileGrid::new(self.extent(), self.tile_size)
    }

    /// Same layout with another kind.
    pub fn with_kind(mut self, kind: PixelKind) -> Self {
        self.kind = kind;
        self
    }

    /// Same layout with another tile size.
    pub fn with_tile_size(mut self, tile_size: TileSize) -> Self {
        self.tile_size = tile_size;
        self
    }
}

/// Producer of raster tiles.
///
/// Implementations must be pure: computing the same region twice yields the
/// same samples. The returned buffer must cover exactly `region` and hold
/// samples of `layout().kind`.
pub trait RasterSource: Send + Sync {
    /// Layout of the produced raster.
    fn layout(&self) -> &RasterLayout;

    /// Compute the samples of one tile.
    fn compute_tile(&self, region: TileRegion) -> RasterResult<PixelBuffer>;

    /// Short name used in log output.
    fn name(&self) -> &str {
        "raster"
    }
}

struct RasterInner {
    source: Box<dyn RasterSource>,
    layout: RasterLayout,
    tiles: Vec<Mutex<Option<Arc<PixelBuffer>>>>,
}

/// Cheap-to-clone handle to a lazily computed raster.
#[derive(Clone)]
pub struct Raster {
    inner: Arc<RasterInner>,
}

impl Raster {
    /// Wrap a tile source.
    pub fn new<S: RasterSource + 'static>(source: S) -> Self {
        let layout = *source.layout();
        let tiles = (0..layout.grid().tile_count()).map(|_| Mutex::new(None)).collect();
        Self {
            inner: Arc::new(RasterInner {
                source: Box::new(source),
                layout,
                tiles,
            }),
        }
    }

    /// Raster backed by an in-memory buffer anchored at the origin.
    pub fn from_buffer(buffer: PixelBuffer, tile_size: TileSize) -> RasterResult<Self> {
        Ok(Self::new(BufferImage::new(buffer, tile_size)?))
    }

    /// Raster from row-major samples, tiled with the fallback tile size.
    pub fn from_vec<T: Sample>(width: u32, height: u32, values: Vec<T>) -> RasterResult<Self> {
        let buffer = PixelBuffer::from_vec(TileRegion::new(0, 0, width, height), values)?;
        Self::from_buffer(buffer, TileSize::FALLBACK)
    }

    /// Raster whose samples are given by `f(x, y)`, evaluated eagerly.
    pub fn from_fn<T, F>(width: u32, height: u32, tile_size: TileSize, f: F) -> Self
    where
        T: Sample,
        F: Fn(u32, u32) -> T,
    {
        let buffer = PixelBuffer::from_fn(TileRegion::new(0, 0, width, height), f);
        Self::new(BufferImage {
            layout: RasterLayout::new(width, height, T::KIND, tile_size),
            buffer: Arc::new(buffer),
        })
    }

    /// Raster with every sample equal to `value`.
    pub fn constant(extent: Extent, kind: PixelKind, value: f64, tile_size: TileSize) -> Self {
        Self::new(ConstantImage {
            layout: RasterLayout::new(extent.width, extent.height, kind, tile_size),
            value,
        })
    }

    /// Mask raster from an 8-bit grayscale image, samples copied verbatim.
    pub fn from_gray_image(image: &GrayImage, tile_size: TileSize) -> RasterResult<Self> {
        let region = TileRegion::new(0, 0, image.width(), image.height());
        let buffer = PixelBuffer::from_vec(region, image.as_raw().clone())?;
        Self::from_buffer(buffer, tile_size)
    }

    /// Render the raster as an 8-bit grayscale image, non-zero samples white.
    pub fn to_gray_image(&self) -> RasterResult<GrayImage> {
        let buffer = self.materialize()?;
        let pixels: Vec<u8> = (0..buffer.region().len())
            .map(|i| match buffer.data().get_f64(i) {
                Some(v) if v != 0.0 => VALID,
                _ => INVALID,
            })
            .collect();
        GrayImage::from_raw(self.width(), self.height(), pixels)
            .ok_or_else(|| RasterError::Other("image buffer size mismatch".to_string()))
    }

    /// Layout of this raster.
    pub fn layout(&self) -> &RasterLayout {
        &self.inner.layout
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.inner.layout.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.inner.layout.height
    }

    /// Width and height.
    pub fn extent(&self) -> Extent {
        self.inner.layout.extent()
    }

    /// Element kind.
    pub fn kind(&self) -> PixelKind {
        self.inner.layout.kind
    }

    /// Nominal tile size.
    pub fn tile_size(&self) -> TileSize {
        self.inner.layout.tile_size
    }

    /// Tile grid.
    pub fn grid(&self) -> TileGrid {
        self.inner.layout.grid()
    }

    /// Number of tiles computed so far.
    pub fn computed_tiles(&self) -> usize {
        self.inner.tiles.iter().filter(|slot| slot.lock().is_some()).count()
    }

    /// Get a tile, computing it on first access.
    pub fn tile(&self, tile_x: u32, tile_y: u32) -> RasterResult<Arc<PixelBuffer>> {
        let grid = self.grid();
        let (Some(index), Some(region)) = (grid.tile_index(tile_x, tile_y), grid.tile_region(tile_x, tile_y)) else {
            return Err(RasterError::TileOutOfBounds { tile_x, tile_y });
        };

        // The slot lock is held while computing so each tile runs exactly once.
        let mut slot = self.inner.tiles[index].lock();
        if let Some(tile) = slot.as_ref() {
            return Ok(Arc::clone(tile));
        }

        log::trace!("computing {} tile ({}, {})", self.inner.source.name(), tile_x, tile_y);
        let buffer = self.inner.source.compute_tile(region)?;
        if buffer.region() != region {
            return Err(RasterError::Other(format!(
                "{} produced region {:?} for tile {:?}",
                self.inner.source.name(),
                buffer.region(),
                region
            )));
        }
        if buffer.kind() != self.kind() {
            return Err(RasterError::KindMismatch {
                expected: self.kind(),
                actual: buffer.kind(),
            });
        }

        let tile = Arc::new(buffer);
        *slot = Some(Arc::clone(&tile));
        Ok(tile)
    }

    /// Assemble an arbitrary region from the tiles it overlaps.
    pub fn region(&self, region: TileRegion) -> RasterResult<PixelBuffer> {
        if !region.is_within_bounds(self.width(), self.height()) {
            return Err(RasterError::RegionOutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                extent: self.extent(),
            });
        }

        let grid = self.grid();
        let tiles = grid.tiles_overlapping(&region);
        if let [(tx, ty)] = tiles[..] {
            let tile = self.tile(tx, ty)?;
            if tile.region() == region {
                return Ok(tile.as_ref().clone());
            }
            return tile.crop(region);
        }

        let mut out = PixelBuffer::zeroed(region, self.kind());
        for (tx, ty) in tiles {
            let tile = self.tile(tx, ty)?;
            out.copy_from(&tile)?;
        }
        Ok(out)
    }

    /// Single sample widened to `f64`.
    pub fn sample_f64(&self, x: u32, y: u32) -> RasterResult<f64> {
        let (tx, ty) = self.grid().tile_of(x, y).ok_or(RasterError::RegionOutOfBounds {
            x,
            y,
            width: 1,
            height: 1,
            extent: self.extent(),
        })?;
        let tile = self.tile(tx, ty)?;
        tile.sample_f64(x, y)
            .ok_or_else(|| RasterError::Other(format!("pixel ({}, {}) missing from its tile", x, y)))
    }

    /// Compute every tile, optionally in parallel.
    pub fn compute_all(&self, parallel: bool) -> RasterResult<()> {
        let grid = self.grid();
        let count = grid.tile_count();
        if parallel {
            (0..count).into_par_iter().try_for_each(|index| {
                let (tx, ty) = grid.tile_coords(index);
                self.tile(tx, ty).map(|_| ())
            })
        } else {
            grid.iter().try_for_each(|((tx, ty), _)| self.tile(tx, ty).map(|_| ()))
        }
    }

    /// Compute all tiles in parallel and assemble the full raster.
    pub fn materialize(&self) -> RasterResult<PixelBuffer> {
        self.materialize_with(true)
    }

    /// Like [`Raster::materialize`] with explicit control over parallelism.
    pub fn materialize_with(&self, parallel: bool) -> RasterResult<PixelBuffer> {
        self.compute_all(parallel)?;
        self.region(self.layout().bounds())
    }

    /// Same samples served with another tile size.
    pub fn retiled(&self, tile_size: TileSize) -> Raster {
        if tile_size == self.tile_size() {
            return self.clone();
        }
        Raster::new(RetiledImage {
            layout: self.layout().with_tile_size(tile_size),
            source: self.clone(),
        })
    }
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("source", &self.inner.source.name())
            .field("layout", &self.inner.layout)
            .finish()
    }
}

/// In-memory raster anchored at the origin.
pub struct BufferImage {
    layout: RasterLayout,
    buffer: Arc<PixelBuffer>,
}

impl BufferImage {
    /// Wrap a buffer whose region starts at (0, 0).
    pub fn new(buffer: PixelBuffer, tile_size: TileSize) -> RasterResult<Self> {
        let region = buffer.region();
        if region.x != 0 || region.y != 0 {
            return Err(RasterError::Other(format!(
                "buffer must start at the origin, starts at ({}, {})",
                region.x, region.y
            )));
        }
        Ok(Self {
            layout: RasterLayout::new(region.width, region.height, buffer.kind(), tile_size),
            buffer: Arc::new(buffer),
        })
    }
}

impl RasterSource for BufferImage {
    fn layout(&self) -> &RasterLayout {
        &self.layout
    }

    fn compute_tile(&self, region: TileRegion) -> RasterResult<PixelBuffer> {
        self.buffer.crop(region)
    }

    fn name(&self) -> &str {
        "buffer"
    }
}

/// Raster with one value everywhere.
pub struct ConstantImage {
    layout: RasterLayout,
    value: f64,
}

impl RasterSource for ConstantImage {
    fn layout(&self) -> &RasterLayout {
        &self.layout
    }

    fn compute_tile(&self, region: TileRegion) -> RasterResult<PixelBuffer> {
        Ok(PixelBuffer::filled(region, self.layout.kind, self.value))
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Another raster's samples re-partitioned into a different tile size.
pub struct RetiledImage {
    layout: RasterLayout,
    source: Raster,
}

impl RasterSource for RetiledImage {
    fn layout(&self) -> &RasterLayout {
        &self.layout
    }

    fn compute_tile(&self, region: TileRegion) -> RasterResult<PixelBuffer> {
        self.source.region(region)
    }

    fn name(&self) -> &str {
        "retiled"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingImage {
        layout: RasterLayout,
        calls: Arc<AtomicUsize>,
    }

    impl RasterSource for CountingImage {
        fn layout(&self) -> &RasterLayout {
            &self.layout
        }

        fn compute_tile(&self, region: TileRegion) -> RasterResult<PixelBuffer> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(PixelBuffer::from_fn(region, |x, y| (x + 100 * y) as i32))
        }
    }

    fn counting(width: u32, height: u32, tile: u32) -> (Raster, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let raster = Raster::new(CountingImage {
            layout: RasterLayout::new(width, height, PixelKind::Int32, TileSize::square(tile)),
            calls: Arc::clone(&calls),
        });
        (raster, calls)
    }

    #[test]
    fn test_tiles_are_lazy_and_computed_once() {
        let (raster, calls) = counting(10, 10, 4);
        assert_eq!(raster.computed_tiles(), 0);

        let first = raster.tile(1, 1).unwrap();
        let again = raster.tile(1, 1).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.region(), TileRegion::new(4, 4, 4, 4));

        raster.compute_all(true).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 9);
        assert_eq!(raster.computed_tiles(), 9);
    }

    #[test]
    fn test_region_spans_tiles() {
        let (raster, _) = counting(10, 10, 4);
        let region = raster.region(TileRegion::new(3, 3, 3, 2)).unwrap();
        assert_eq!(region.as_slice::<i32>().unwrap(), &[303, 304, 305, 403, 404, 405]);
        assert!(raster.region(TileRegion::new(8, 8, 4, 4)).is_err());
        assert_eq!(raster.sample_f64(9, 9).unwrap(), 909.0);
    }

    #[test]
    fn test_tile_out_of_bounds() {
        let (raster, _) = counting(10, 10, 4);
        assert_eq!(
            raster.tile(3, 0).unwrap_err(),
            RasterError::TileOutOfBounds { tile_x: 3, tile_y: 0 }
        );
    }

    #[test]
    fn test_retiled_keeps_samples() {
        let raster = Raster::from_fn(9, 7, TileSize::square(4), |x, y| (x * y) as f32);
        let retiled = raster.retiled(TileSize::new(3, 5));
        assert_eq!(retiled.tile_size(), TileSize::new(3, 5));
        assert_eq!(retiled.grid().tile_count(), 6);
        assert_eq!(retiled.materialize().unwrap(), raster.materialize().unwrap());
    }

    #[test]
    fn test_constant_raster() {
        let raster = Raster::constant(Extent::new(5, 3), PixelKind::UInt8, 255.0, TileSize::FALLBACK);
        let buffer = raster.materialize_with(false).unwrap();
        assert!(buffer.as_slice::<u8>().unwrap().iter().all(|&v| v == 255));
    }

    #[test]
    fn test_gray_image_round_trip() {
        let mut image = GrayImage::new(4, 2);
        image.put_pixel(1, 1, image::Luma([1]));
        let raster = Raster::from_gray_image(&image, TileSize::square(2)).unwrap();
        assert_eq!(raster.kind(), PixelKind::UInt8);
        assert_eq!(raster.sample_f64(1, 1).unwrap(), 1.0);

        let rendered = raster.to_gray_image().unwrap();
        assert_eq!(rendered.get_pixel(1, 1).0, [VALID]);
        assert_eq!(rendered.get_pixel(0, 0).0, [INVALID]);
    }

    #[test]
    fn test_buffer_image_requires_origin() {
        let buffer = PixelBuffer::zeroed(TileRegion::new(1, 0, 2, 2), PixelKind::UInt8);
        assert!(Raster::from_buffer(buffer, TileSize::FALLBACK).is_err());
    }
}
