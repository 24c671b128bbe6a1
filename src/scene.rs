//! Scene: the raster product masks are built for.
//!
//! A scene fixes the grid every mask and band shares, names its bands for
//! expressions, suggests a tile size and optionally carries the geocoding
//! that places vector data on the grid.

use crate::core::error::{RasterError, RasterResult};
use crate::core::raster::Raster;
use crate::core::types::{Extent, TileSize};
use crate::geo::crs::{Crs, GeoCoding};
use crate::geo::geometry::Bounds;
use indexmap::IndexMap;
use std::fmt;

/// A named grid with bands and optional geocoding.
#[derive(Clone)]
pub struct Scene {
    name: String,
    width: u32,
    height: u32,
    preferred_tile_size: Option<TileSize>,
    geocoding: Option<GeoCoding>,
    bands: IndexMap<String, Raster>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            preferred_tile_size: None,
            geocoding: None,
            bands: IndexMap::new(),
        }
    }

    /// Set the tile size rasters of this scene prefer.
    pub fn with_preferred_tile_size(mut self, tile_size: TileSize) -> Self {
        self.preferred_tile_size = Some(tile_size);
        self
    }

    /// Attach a geocoding.
    pub fn with_geocoding(mut self, geocoding: GeoCoding) -> Self {
        self.geocoding = Some(geocoding);
        self
    }

    /// Add a band, builder style.
    pub fn with_band(mut self, name: impl Into<String>, raster: Raster) -> RasterResult<Self> {
        self.add_band(name, raster)?;
        Ok(self)
    }

    /// Add a band. It must cover the scene grid and its name must be new.
    pub fn add_band(&mut self, name: impl Into<String>, raster: Raster) -> RasterResult<()> {
        let name = name.into();
        if raster.extent() != self.extent() {
            return Err(RasterError::ExtentMismatch {
                expected: self.extent(),
                actual: raster.extent(),
            });
        }
        if self.bands.contains_key(&name) {
            return Err(RasterError::DuplicateBand(name));
        }
        self.bands.insert(name, raster);
        Ok(())
    }

    /// Scene name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width and height.
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    /// Preferred tile size, if any.
    pub fn preferred_tile_size(&self) -> Option<TileSize> {
        self.preferred_tile_size
    }

    /// Geocoding, if any.
    pub fn geocoding(&self) -> Option<&GeoCoding> {
        self.geocoding.as_ref()
    }

    /// System map coordinates are expressed in; WGS84 without geocoding.
    pub fn crs(&self) -> Crs {
        self.geocoding.map(|g| g.crs).unwrap_or_default()
    }

    /// Look a band up by name.
    pub fn band(&self, name: &str) -> Option<&Raster> {
        self.bands.get(name)
    }

    /// Band names in insertion order.
    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    /// Number of bands.
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Map-space bounds of the grid; pixel-space bounds without geocoding.
    pub fn map_bounds(&self) -> Bounds {
        match &self.geocoding {
            Some(geocoding) => geocoding.bounds(self.width, self.height),
            None => Bounds {
                min_x: 0.0,
                min_y: 0.0,
                max_x: self.width as f64,
                max_y: self.height as f64,
            },
        }
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("extent", &self.extent())
            .field("preferred_tile_size", &self.preferred_tile_size)
            .field("geocoding", &self.geocoding)
            .field("bands", &self.bands.keys().collect::<Vec<_>>())
            .finish()
    }
}
