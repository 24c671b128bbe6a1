//! Tile geometry: regions, tile grids and tile iteration.
//!
//! Rasters are divided into rectangular tiles, the unit of lazy and
//! parallel computation:
//! - Tiles are laid out left to right, top to bottom, from the origin
//! - Edge tiles are truncated to the raster bounds
//! - Any pixel belongs to exactly one tile

use crate::core::types::{Extent, TileSize};

/// Represents a rectangular region within a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileRegion {
    /// X offset from the raster origin
    pub x: u32,
    /// Y offset from the raster origin
    pub y: u32,
    /// Width of the region
    pub width: u32,
    /// Height of the region
    pub height: u32,
}

impl TileRegion {
    /// Create a new tile region.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Region covering a whole raster of the given extent.
    pub fn of_extent(extent: Extent) -> Self {
        Self::new(0, 0, extent.width, extent.height)
    }

    /// Get the right edge coordinate (exclusive).
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Get the bottom edge coordinate (exclusive).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Calculate the area of this region in pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Number of samples a buffer for this region holds.
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether the region covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the pixel lies inside this region.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Overlap of two regions, if any.
    pub fn intersection(&self, other: &TileRegion) -> Option<TileRegion> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(TileRegion::new(x, y, right - x, bottom - y))
    }

    /// Check if this region is entirely within the given bounds.
    pub fn is_within_bounds(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }
}

/// Partitioning of a raster extent into tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    extent: Extent,
    tile_size: TileSize,
}

impl TileGrid {
    /// Create a grid for the given extent and tile size. Zero sides are
    /// raised to one pixel.
    pub fn new(extent: Extent, tile_size: TileSize) -> Self {
        Self {
            extent,
            tile_size: TileSize::new(tile_size.width, tile_size.height),
        }
    }

    /// Extent being partitioned.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Nominal tile size; edge tiles may be smaller.
    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    /// Number of tile columns.
    pub fn tiles_x(&self) -> u32 {
        self.extent.width.div_ceil(self.tile_size.width)
    }

    /// Number of tile rows.
    pub fn tiles_y(&self) -> u32 {
        self.extent.height.div_ceil(self.tile_size.height)
    }

    /// Get the total number of tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles_x() as usize * self.tiles_y() as usize
    }

    /// Linear index of a tile, row-major.
    pub fn tile_index(&self, tile_x: u32, tile_y: u32) -> Option<usize> {
        if tile_x >= self.tiles_x() || tile_y >= self.tiles_y() {
            return None;
        }
        Some(tile_y as usize * self.tiles_x() as usize + tile_x as usize)
    }

    /// Tile coordinates of a linear index.
    pub fn tile_coords(&self, index: usize) -> (u32, u32) {
        let tiles_x = self.tiles_x().max(1) as usize;
        ((index % tiles_x) as u32, (index / tiles_x) as u32)
    }

    /// Pixel region covered by a tile, truncated at the raster edge.
    pub fn tile_region(&self, tile_x: u32, tile_y: u32) -> Option<TileRegion> {
        self.tile_index(tile_x, tile_y)?;
        let x = tile_x * self.tile_size.width;
        let y = tile_y * self.tile_size.height;
        Some(TileRegion::new(
            x,
            y,
            self.tile_size.width.min(self.extent.width - x),
            self.tile_size.height.min(self.extent.height - y),
        ))
    }

    /// Tile containing the given pixel.
    pub fn tile_of(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        if x >= self.extent.width || y >= self.extent.height {
            return None;
        }
        Some((x / self.tile_size.width, y / self.tile_size.height))
    }

    /// Tiles overlapping a region, in row-major order.
    pub fn tiles_overlapping(&self, region: &TileRegion) -> Vec<(u32, u32)> {
        if region.is_empty() {
            return Vec::new();
        }
        let Some((x0, y0)) = self.tile_of(region.x, region.y) else {
            return Vec::new();
        };
        let right = region.right().min(self.extent.width);
        let bottom = region.bottom().min(self.extent.height);
        let x1 = (right - 1) / self.tile_size.width;
        let y1 = (bottom - 1) / self.tile_size.height;
        let mut tiles = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
        for ty in y0..=y1 {
            for tx in x0..=x1 {
                tiles.push((tx, ty));
            }
        }
        tiles
    }

    /// Iterate over all tiles in row-major order.
    pub fn iter(&self) -> TileIterator {
        TileIterator { grid: *self, next: 0 }
    }
}

/// Row-major walk over the tiles of a [`TileGrid`], yielding each tile's
/// coordinates together with its pixel region.
pub struct TileIterator {
    grid: TileGrid,
    next: usize,
}

impl Iterator for TileIterator {
    type Item = ((u32, u32), TileRegion);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.grid.tile_count() {
            return None;
        }
        let (tile_x, tile_y) = self.grid.tile_coords(self.next);
        self.next += 1;
        let region = self.grid.tile_region(tile_x, tile_y)?;
        Some(((tile_x, tile_y), region))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.grid.tile_count().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for TileIterator {}
