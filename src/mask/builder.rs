//! Composite validity mask builder.
//!
//! The builder records sources together with the join mode active when each
//! was added. Nothing is parsed, loaded or rasterized until [`MaskBuilder::build`],
//! so failures in expression, geometry and shapefile sources surface there.
//! WKT text is the exception: [`MaskBuilder::add_wkt`] parses it on the spot.
//!
//! ```rust,ignore
//! let mut builder = MaskBuilder::new(&scene);
//! builder.add_expression("X == 10.5").or().add_expression("Y == 3.5");
//! let mask = builder.build()?;
//! ```

use crate::config::ProcessingConfig;
use crate::core::buffer::PixelBuffer;
use crate::core::error::{MaskBuildError, MaskBuildResult};
use crate::core::raster::Raster;
use crate::core::types::{JoinOp, PixelKind, TileSize, VALID};
use crate::geo::crs::{CrsProvider, Wgs84CrsProvider};
use crate::geo::geometry::Geometry;
use crate::geo::shapefile::{FileShapeStore, ShapeLocation, ShapeStore};
use crate::geo::wkt::parse_wkt;
use crate::mask::join::JoinImage;
use crate::mask::source::{MaskSource, MaskSourceKind, MaterializeContext};
use crate::scene::Scene;
use std::fmt;
use std::sync::Arc;

/// Builds a validity mask for a scene from any number of sources.
pub struct MaskBuilder<'a> {
    scene: &'a Scene,
    sources: Vec<MaskSource>,
    join: JoinOp,
    tile_size: Option<TileSize>,
    config: ProcessingConfig,
    shape_store: Arc<dyn ShapeStore>,
    crs_provider: Arc<dyn CrsProvider>,
}

impl<'a> MaskBuilder<'a> {
    /// Create a builder with the default configuration.
    pub fn new(scene: &'a Scene) -> Self {
        Self::with_config(scene, ProcessingConfig::default())
    }

    /// Create a builder with an explicit configuration.
    pub fn with_config(scene: &'a Scene, config: ProcessingConfig) -> Self {
        Self {
            scene,
            sources: Vec::new(),
            join: JoinOp::default(),
            tile_size: None,
            config,
            shape_store: Arc::new(FileShapeStore::new()),
            crs_provider: Arc::new(Wgs84CrsProvider::new(config.clip_shapes_to_bounds)),
        }
    }

    /// Scene the mask is built for.
    pub fn scene(&self) -> &'a Scene {
        self.scene
    }

    /// Active configuration.
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Join mode applied to sources added from now on.
    pub fn set_join_mode(&mut self, op: JoinOp) -> &mut Self {
        self.join = op;
        self
    }

    /// Current join mode.
    pub fn join_mode(&self) -> JoinOp {
        self.join
    }

    /// Shorthand for `set_join_mode(JoinOp::And)`.
    pub fn and(&mut self) -> &mut Self {
        self.set_join_mode(JoinOp::And)
    }

    /// Shorthand for `set_join_mode(JoinOp::Or)`.
    pub fn or(&mut self) -> &mut Self {
        self.set_join_mode(JoinOp::Or)
    }

    fn push(&mut self, kind: MaskSourceKind) -> &mut Self {
        self.sources.push(MaskSource::new(kind, self.join));
        self
    }

    /// Add a ready-made mask. `None` is ignored.
    pub fn add_mask_image(&mut self, mask: Option<Raster>) -> &mut Self {
        match mask {
            Some(raster) => self.push(MaskSourceKind::ExplicitImage(raster)),
            None => self,
        }
    }

    /// Add a band-maths expression. Blank text is ignored.
    pub fn add_expression(&mut self, expression: &str) -> &mut Self {
        if expression.trim().is_empty() {
            return self;
        }
        self.push(MaskSourceKind::Expression(expression.to_string()))
    }

    /// Add a WGS84 region of interest. `None` is ignored.
    pub fn add_geometry(&mut self, geometry: Option<Geometry>) -> &mut Self {
        match geometry {
            Some(geometry) => self.push(MaskSourceKind::Geometry(geometry)),
            None => self,
        }
    }

    /// Parse a WKT polygon and add it as a region of interest. Blank text is
    /// ignored.
    pub fn add_wkt(&mut self, wkt: &str) -> MaskBuildResult<&mut Self> {
        if wkt.trim().is_empty() {
            return Ok(self);
        }
        let geometry = parse_wkt(wkt).map_err(|e| MaskBuildError::InvalidWkt { reason: e.to_string() })?;
        Ok(self.push(MaskSourceKind::Geometry(geometry)))
    }

    /// Add a shapefile region of interest. `None` is ignored.
    pub fn add_shapefile(&mut self, location: Option<ShapeLocation>) -> &mut Self {
        match location {
            Some(location) => self.push(MaskSourceKind::Shapefile(location)),
            None => self,
        }
    }

    /// Add a shapefile given as path or URL text. Blank text is ignored.
    pub fn add_shapefile_path(&mut self, location: &str) -> &mut Self {
        self.add_shapefile(ShapeLocation::parse(location))
    }

    /// Override the tile size of every mask built from now on.
    pub fn with_tile_size(&mut self, tile_size: TileSize) -> &mut Self {
        self.tile_size = Some(tile_size);
        self
    }

    /// Replace the reader used for shapefile sources.
    pub fn with_shape_store(&mut self, store: Arc<dyn ShapeStore>) -> &mut Self {
        self.shape_store = store;
        self
    }

    /// Replace the coordinate system policy used for shapefile sources.
    pub fn with_crs_provider(&mut self, provider: Arc<dyn CrsProvider>) -> &mut Self {
        self.crs_provider = provider;
        self
    }

    /// Tile size of the next build: the override, else the scene's
    /// preferred size, else the configured fallback.
    pub fn effective_tile_size(&self) -> TileSize {
        self.tile_size
            .or(self.scene.preferred_tile_size())
            .unwrap_or(self.config.fallback_tile_size)
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no source was added.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Sources in fold order.
    pub fn sources(&self) -> &[MaskSource] {
        &self.sources
    }

    /// Build the composite mask.
    ///
    /// Without sources every pixel is valid. Otherwise the first source's
    /// mask seeds the result and each later source is folded in with the join
    /// mode it was added under. The result is computed lazily per tile; the
    /// builder is left unchanged and can be built again.
    pub fn build(&self) -> MaskBuildResult<Raster> {
        let tile_size = self.effective_tile_size();
        log::debug!(
            "building mask for scene '{}' ({}) from {} source(s), tile size {}",
            self.scene.name(),
            self.scene.extent(),
            self.sources.len(),
            tile_size
        );

        let Some((first, rest)) = self.sources.split_first() else {
            return Ok(Raster::constant(self.scene.extent(), PixelKind::UInt8, VALID as f64, tile_size));
        };

        let ctx = MaterializeContext {
            scene: self.scene,
            tile_size,
            shape_store: self.shape_store.as_ref(),
            crs_provider: self.crs_provider.as_ref(),
        };
        log::debug!("seeding mask with {}", first.describe());
        let mut mask = first.materialize(&ctx)?;
        for source in rest {
            log::debug!("folding {} with {}", source.describe(), source.join);
            let next = source.materialize(&ctx)?;
            mask = JoinImage::new(mask, next, source.join, tile_size)?.into_raster();
        }
        Ok(mask)
    }

    /// Build the mask and compute every tile, in parallel when configured.
    pub fn build_materialized(&self) -> MaskBuildResult<PixelBuffer> {
        let mask = self.build()?;
        Ok(mask.materialize_with(self.config.parallel)?)
    }
}

impl fmt::Debug for MaskBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MaskBuilder")
            .field("scene", &self.scene.name())
            .field("sources", &self.sources)
            .field("join", &self.join)
            .field("tile_size", &self.tile_size)
            .field("config", &self.config)
            .finish()
    }
}
