//! Mask sources: the individual inputs a composite mask is folded from.
//!
//! Sources keep only what they need to produce their mask later. All
//! parsing, loading and rasterization happens in [`MaskSource::materialize`].

use crate::core::error::{MaskBuildError, MaskBuildResult};
use crate::core::raster::Raster;
use crate::core::types::{JoinOp, TileSize};
use crate::expression::{ExprError, Expression, ExpressionImage};
use crate::geo::clip::clip_collection;
use crate::geo::crs::{Crs, CrsProvider};
use crate::geo::geometry::{Feature, FeatureCollection, Geometry};
use crate::geo::rasterize::VectorMaskImage;
use crate::geo::shapefile::{load_features_for_scene, ShapeLocation, ShapeStore};
use crate::scene::Scene;
use std::fmt;

/// What a source produces its mask from.
#[derive(Clone)]
pub enum MaskSourceKind {
    /// A ready-made mask raster
    ExplicitImage(Raster),
    /// Band-maths expression evaluated per pixel
    Expression(String),
    /// Region of interest in WGS84 coordinates
    Geometry(Geometry),
    /// Region of interest read from a shapefile
    Shapefile(ShapeLocation),
}

impl fmt::Debug for MaskSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskSourceKind::ExplicitImage(raster) => f.debug_tuple("ExplicitImage").field(&raster.extent()).finish(),
            MaskSourceKind::Expression(text) => f.debug_tuple("Expression").field(text).finish(),
            MaskSourceKind::Geometry(geometry) => f
                .debug_tuple("Geometry")
                .field(&geometry.polygons().len())
                .finish(),
            MaskSourceKind::Shapefile(location) => f.debug_tuple("Shapefile").field(location).finish(),
        }
    }
}

/// A source together with the operator that folds it into the composite.
#[derive(Debug, Clone)]
pub struct MaskSource {
    /// Input
    pub kind: MaskSourceKind,
    /// Operator applied against the masks before it
    pub join: JoinOp,
}

/// Everything a source needs to materialize.
pub struct MaterializeContext<'a> {
    /// Scene providing extent, bands and geocoding
    pub scene: &'a Scene,
    /// Tile size of the produced mask
    pub tile_size: TileSize,
    /// Reader used by shapefile sources
    pub shape_store: &'a dyn ShapeStore,
    /// Coordinate system policy used by shapefile sources
    pub crs_provider: &'a dyn CrsProvider,
}

impl MaskSource {
    /// Create a source.
    pub fn new(kind: MaskSourceKind, join: JoinOp) -> Self {
        Self { kind, join }
    }

    /// Short label for log output.
    pub fn describe(&self) -> String {
        match &self.kind {
            MaskSourceKind::ExplicitImage(raster) => format!("mask image {}", raster.extent()),
            MaskSourceKind::Expression(text) => format!("expression '{}'", text),
            MaskSourceKind::Geometry(geometry) => format!("geometry of {} polygon(s)", geometry.polygons().len()),
            MaskSourceKind::Shapefile(location) => format!("shapefile {}", location),
        }
    }

    /// Produce this source's mask for the scene in `ctx`.
    pub fn materialize(&self, ctx: &MaterializeContext<'_>) -> MaskBuildResult<Raster> {
        match &self.kind {
            MaskSourceKind::ExplicitImage(raster) => {
                if raster.extent() != ctx.scene.extent() {
                    return Err(MaskBuildError::ExtentMismatch {
                        expected: ctx.scene.extent(),
                        actual: raster.extent(),
                    });
                }
                Ok(raster.retiled(ctx.tile_size))
            }
            MaskSourceKind::Expression(text) => {
                let invalid = |e: ExprError| MaskBuildError::InvalidExpression {
                    expression: text.clone(),
                    reason: e.to_string(),
                };
                let bound = Expression::parse(text).and_then(|e| e.bind(ctx.scene)).map_err(invalid)?;
                Ok(ExpressionImage::new(ctx.scene, bound, ctx.tile_size).into_raster())
            }
            MaskSourceKind::Geometry(geometry) => {
                if geometry.is_empty() {
                    return Err(MaskBuildError::NullGeometry(
                        "the geometry encloses no area".to_string(),
                    ));
                }
                let geometry = Crs::Wgs84.transform_geometry(geometry, ctx.scene.crs())?;
                let features = FeatureCollection::single(Feature::new("roi", geometry));
                let features = clip_collection(&features, &ctx.scene.map_bounds());
                Ok(VectorMaskImage::new(ctx.scene, &features, ctx.tile_size).into_raster())
            }
            MaskSourceKind::Shapefile(location) => {
                let features = load_features_for_scene(ctx.shape_store, location, ctx.scene, ctx.crs_provider)
                    .map_err(|source| MaskBuildError::ShapefileLoad {
                        location: location.display_path(),
                        source,
                    })?;
                Ok(VectorMaskImage::new(ctx.scene, &features, ctx.tile_size).into_raster())
            }
        }
    }
}
