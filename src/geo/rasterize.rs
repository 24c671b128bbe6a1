//! Scan conversion of polygons into mask tiles.
//!
//! A pixel is inside when its centre is inside: for each row the scanline at
//! `y + 0.5` is intersected with every polygon edge, crossings are sorted and
//! the spans between pairs are filled. Rings of one polygon are filled with
//! the even-odd rule so holes punch through; separate polygons are unioned.

use crate::core::buffer::PixelBuffer;
use crate::core::error::RasterResult;
use crate::core::raster::{Raster, RasterLayout, RasterSource};
use crate::core::tile::TileRegion;
use crate::core::types::{PixelKind, TileSize, INVALID, VALID};
use crate::geo::geometry::{Bounds, Coord, FeatureCollection};
use crate::scene::Scene;

/// One polygon in pixel space.
struct PixelPolygon {
    rings: Vec<Vec<Coord>>,
    bounds: Bounds,
}

/// Raster that scan-converts a feature collection tile by tile.
pub struct VectorMaskImage {
    layout: RasterLayout,
    polygons: Vec<PixelPolygon>,
}

impl VectorMaskImage {
    /// Prepare the features for rasterization against `scene`.
    ///
    /// Coordinates are map coordinates of the scene geocoding; a scene
    /// without geocoding treats them as pixel coordinates.
    pub fn new(scene: &Scene, features: &FeatureCollection, tile_size: TileSize) -> Self {
        let to_pixel = |c: Coord| match scene.geocoding() {
            Some(geocoding) => geocoding.map_to_pixel(c),
            None => c,
        };
        let polygons = features
            .polygons()
            .filter(|p| !p.is_empty())
            .filter_map(|p| {
                let rings: Vec<Vec<Coord>> = p
                    .rings()
                    .map(|r| r.coords().iter().map(|c| to_pixel(*c)).collect::<Vec<_>>())
                    .filter(|r: &Vec<Coord>| r.len() >= 3)
                    .collect();
                let bounds = Bounds::of_coords(rings.first()?.iter())?;
                Some(PixelPolygon { rings, bounds })
            })
            .collect();
        Self {
            layout: RasterLayout::new(scene.width(), scene.height(), PixelKind::UInt8, tile_size),
            polygons,
        }
    }

    /// Number of polygons that will be drawn.
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Wrap into a lazily evaluated raster.
    pub fn into_raster(self) -> Raster {
        Raster::new(self)
    }
}

impl RasterSource for VectorMaskImage {
    fn layout(&self) -> &RasterLayout {
        &self.layout
    }

    fn compute_tile(&self, region: TileRegion) -> RasterResult<PixelBuffer> {
        let mut samples = vec![INVALID; region.len()];
        let tile_bounds = Bounds {
            min_x: region.x as f64,
            min_y: region.y as f64,
            max_x: region.right() as f64,
            max_y: region.bottom() as f64,
        };
        let stride = region.width as usize;

        // Reused per scanline
        let mut crossings: Vec<f64> = Vec::new();
        for polygon in self.polygons.iter().filter(|p| p.bounds.intersects(&tile_bounds)) {
            for y in region.y..region.bottom() {
                let yc = y as f64 + 0.5;
                if yc < polygon.bounds.min_y || yc > polygon.bounds.max_y {
                    continue;
                }
                crossings.clear();
                for ring in &polygon.rings {
                    let n = ring.len();
                    for i in 0..n {
                        let a = ring[i];
                        let b = ring[(i + 1) % n];
                        if (a.y <= yc && b.y > yc) || (b.y <= yc && a.y > yc) {
                            crossings.push(a.x + (yc - a.y) / (b.y - a.y) * (b.x - a.x));
                        }
                    }
                }
                crossings.sort_unstable_by(|a, b| a.total_cmp(b));

                let row = (y - region.y) as usize * stride;
                for pair in crossings.chunks_exact(2) {
                    // Columns whose centre lies in [pair[0], pair[1])
                    let first = (pair[0] - 0.5).ceil().max(region.x as f64);
                    let end = (pair[1] - 0.5).ceil().min(region.right() as f64);
                    if end <= first {
                        continue;
                    }
                    let start = row + (first as u32 - region.x) as usize;
                    let stop = row + (end as u32 - region.x) as usize;
                    samples[start..stop].fill(VALID);
                }
            }
        }
        PixelBuffer::from_vec(region, samples)
    }

    fn name(&self) -> &str {
        "vector-mask"
    }
}
