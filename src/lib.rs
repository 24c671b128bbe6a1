//! # Validmask - Tiled Validity Masks for Rasters
//!
//! Validmask builds boolean validity masks over a raster scene and applies
//! per-pixel transforms to typed rasters. Everything is computed lazily, one
//! tile at a time, and every tile is computed at most once.
//!
//! ## Features
//!
//! - **Composite Masks**: Fold explicit masks, band-maths expressions, WKT
//!   geometries and shapefiles together with AND/OR
//! - **Typed Rasters**: UInt8, Int32, Float32 and Float64 samples behind one
//!   tile engine
//! - **Transforms**: Masked value substitution and NaN replacement
//! - **Parallel Execution**: Tiles fan out over rayon on request
//! - **Declarative Specs**: Describe masks in TOML or JSON
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use validmask::prelude::*;
//!
//! let scene = Scene::new("scene", 512, 512)
//!     .with_band("B4", Raster::from_vec(512, 512, reflectance)?)?;
//!
//! // Valid where B4 is bright or inside the area of interest
//! let mut builder = MaskBuilder::new(&scene);
//! builder
//!     .add_expression("B4 > 0.1")
//!     .or()
//!     .add_wkt("POLYGON ((10 10, 200 10, 200 200, 10 200, 10 10))")?;
//! let mask = builder.build()?;
//!
//! // Blank out invalid pixels, then patch remaining holes
//! let masked = masked_substitution(scene.band("B4").unwrap(), &mask, FillValue::nan())?;
//! let filled = replace_nan(&masked, 0.0)?;
//! let pixels = filled.materialize()?;
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: Tile engine, typed buffers and error types
//! - [`scene`]: The grid, bands and geocoding masks are built for
//! - [`expression`]: Band-maths parser and evaluator
//! - [`geo`]: Geometry, WKT, CRS, clipping, rasterization and shapefiles
//! - [`mask`]: Mask sources and the composite mask builder
//! - [`ops`]: Masked substitution and NaN replacement
//! - [`config`]: Processing configuration and mask specs

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod expression;
pub mod geo;
pub mod mask;
pub mod ops;
pub mod scene;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use validmask::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{Extent, FillValue, JoinOp, PixelKind, TileSize, INVALID, VALID};
    pub use crate::core::buffer::{PixelBuffer, Sample, SampleData};
    pub use crate::core::raster::{Raster, RasterLayout, RasterSource};
    pub use crate::core::tile::{TileGrid, TileRegion};

    // Errors
    pub use crate::core::error::{
        ConfigError, MaskBuildError, ProjectionError, RasterError, ShapeStoreError, TransformError, ValidMaskError,
        ValidMaskResult,
    };

    // Scene
    pub use crate::scene::Scene;

    // Vector support
    pub use crate::geo::{
        parse_wkt, Bounds, Coord, Crs, CrsProvider, Feature, FeatureCollection, FileShapeStore, GeoCoding, Geometry,
        Polygon, Ring, ShapeLocation, ShapeStore, Wgs84CrsProvider,
    };

    // Masks
    pub use crate::mask::{MaskBuilder, MaskSource, MaskSourceKind};

    // Transforms
    pub use crate::ops::{masked_substitution, replace_nan};

    // Configuration
    pub use crate::config::{MaskSpec, ProcessingConfig, SourceSpec};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::geo::shapefile::tests::{encode_shapefile, outer};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// 120 x 90 scene with 1/12 degree pixels and its upper-left corner at
    /// 0°E 0°N.
    fn geocoded_scene() -> Scene {
        let step = 1.0 / 12.0;
        Scene::new("geocoded", 120, 90).with_geocoding(GeoCoding::new(Crs::Wgs84, 0.0, 0.0, step, -step))
    }

    fn valid(mask: &Raster, x: u32, y: u32) -> bool {
        mask.sample_f64(x, y).unwrap() == VALID as f64
    }

    const AREA_WKT: &str = "POLYGON ((3.3258594917787736 -0.7772795216741405, 6.225710014947682 -0.7772795216741405, \n\
        6.225710014947682 -3.8863976083707024, 3.3258594917787736 -3.8863976083707024, \n\
        3.3258594917787736 -0.7772795216741405))";

    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
        assert_eq!(super::NAME, "validmask");
    }

    #[test]
    fn test_expression_mask_selects_one_column() {
        init_logging();
        let scene = geocoded_scene();
        let mut builder = MaskBuilder::new(&scene);
        builder.add_expression("X == 10.5");
        let mask = builder.build().unwrap();
        assert!(valid(&mask, 10, 0));
        assert!(valid(&mask, 10, 60));
        assert!(!valid(&mask, 9, 0));
        assert!(!valid(&mask, 11, 0));
        assert!(!valid(&mask, 9, 60));
        assert!(!valid(&mask, 11, 60));
    }

    #[test]
    fn test_wkt_mask_covers_rectangle() {
        init_logging();
        let scene = geocoded_scene();
        let mut builder = MaskBuilder::new(&scene);
        builder.add_wkt(AREA_WKT).unwrap();
        let mask = builder.build().unwrap();

        // Rectangle from (40, 9) to (74, 46)
        assert!(valid(&mask, 40, 9));
        assert!(valid(&mask, 45, 9));
        assert!(valid(&mask, 53, 30));
        assert!(valid(&mask, 74, 46));
        assert!(!valid(&mask, 39, 9));
        assert!(!valid(&mask, 75, 46));
        assert!(!valid(&mask, 40, 8));
        assert!(!valid(&mask, 40, 47));
        assert!(!valid(&mask, 10, 0));
        assert!(!valid(&mask, 85, 60));
    }

    #[test]
    fn test_shapefile_mask_matches_polygon() {
        init_logging();
        let scene = geocoded_scene();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("geometry_Polygon.shp");
        // Pixel rectangle from (27, 28) to (60, 64)
        let step = 1.0 / 12.0;
        let bytes = encode_shapefile(&[vec![outer(27.2 * step, -64.8 * step, 60.8 * step, -28.2 * step)]]);
        std::fs::write(&path, bytes).unwrap();

        let mut builder = MaskBuilder::new(&scene);
        builder.add_shapefile(Some(ShapeLocation::Path(path)));
        let mask = builder.build().unwrap();
        assert!(valid(&mask, 27, 28));
        assert!(valid(&mask, 45, 46));
        assert!(valid(&mask, 55, 63));
        assert!(valid(&mask, 60, 64));
        assert!(!valid(&mask, 26, 28));
        assert!(!valid(&mask, 27, 27));
        assert!(!valid(&mask, 61, 64));
        assert!(!valid(&mask, 10, 0));
        assert!(!valid(&mask, 30, 80));
    }

    #[test]
    fn test_explicit_mask_round_trips() {
        let scene = geocoded_scene();
        let mut inner = MaskBuilder::new(&scene);
        inner.add_expression("X == 100.5 || Y == 80.5");
        let lines = inner.build().unwrap();

        let mut builder = MaskBuilder::new(&scene);
        builder.add_mask_image(Some(lines.clone())).with_tile_size(TileSize::square(32));
        let mask = builder.build().unwrap();
        assert_eq!(mask.tile_size(), TileSize::square(32));
        assert!(valid(&mask, 100, 80));
        assert!(valid(&mask, 100, 46));
        assert!(valid(&mask, 55, 80));
        assert!(!valid(&mask, 10, 0));
        assert!(!valid(&mask, 30, 70));
        assert_eq!(mask.materialize().unwrap(), lines.retiled(TileSize::square(32)).materialize().unwrap());
    }

    #[test]
    fn test_all_sources_combined_with_or() {
        init_logging();
        let scene = geocoded_scene();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("area.shp");
        let step = 1.0 / 12.0;
        std::fs::write(
            &path,
            encode_shapefile(&[vec![outer(27.2 * step, -64.8 * step, 60.8 * step, -28.2 * step)]]),
        )
        .unwrap();
        let mut lines = MaskBuilder::new(&scene);
        lines.add_expression("X == 100.5 || Y == 80.5");

        let mut builder = MaskBuilder::new(&scene);
        builder.or().add_expression("X == 10.5");
        builder.add_wkt(AREA_WKT).unwrap();
        builder
            .add_shapefile_path(path.to_str().unwrap())
            .add_mask_image(Some(lines.build().unwrap()));
        let mask = builder.build().unwrap();

        for (x, y) in [(10, 0), (10, 60), (45, 9), (53, 30), (74, 46), (27, 28), (45, 46), (55, 63), (100, 80), (100, 46), (55, 80)] {
            assert!(valid(&mask, x, y), "({x}, {y}) should be valid");
        }
        assert!(!valid(&mask, 9, 0));
        assert!(!valid(&mask, 30, 70));
    }

    #[test]
    fn test_masked_substitution_of_product() {
        let source = Raster::from_fn(5, 5, TileSize::FALLBACK, |x, y| (x * y) as f32);
        let mask = Raster::from_fn(5, 5, TileSize::FALLBACK, |x, _| if x % 2 == 0 { VALID } else { INVALID });
        let out = masked_substitution(&source, &mask, FillValue::nan()).unwrap().materialize().unwrap();
        for y in 0..5 {
            for x in 0..5 {
                let v = out.sample_f64(x, y).unwrap();
                if x % 2 == 0 {
                    assert_eq!(v, (x * y) as f64);
                } else {
                    assert!(v.is_nan());
                }
            }
        }
    }

    #[test]
    fn test_mask_then_replace_nan() {
        let scene = Scene::new("chain", 4, 1)
            .with_band("B1", Raster::from_vec(4, 1, vec![1.0f32, f32::NAN, 5.0, 7.0]).unwrap())
            .unwrap();
        let mut builder = MaskBuilder::new(&scene);
        builder.add_expression("X < 3");
        let mask = builder.build().unwrap();

        let band = scene.band("B1").unwrap();
        let masked = masked_substitution(band, &mask, FillValue::nan()).unwrap();
        let filled = replace_nan(&masked, 42.0).unwrap().materialize().unwrap();
        assert_eq!(filled.as_slice::<f32>().unwrap(), &[1.0, 42.0, 5.0, 42.0]);
    }

    #[test]
    fn test_mask_spec_file() {
        let scene = geocoded_scene();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.json");
        std::fs::write(
            &path,
            r#"{"tile_size": {"width": 40, "height": 30},
                "sources": [{"type": "expression", "expression": "X == 10.5"},
                            {"type": "expression", "expression": "Y == 3.5", "join": "and"}]}"#,
        )
        .unwrap();

        let spec = MaskSpec::from_file(&path).unwrap();
        let mut builder = MaskBuilder::new(&scene);
        spec.apply(&mut builder).unwrap();
        let mask = builder.build().unwrap();
        assert_eq!(mask.tile_size(), TileSize::new(40, 30));
        assert!(valid(&mask, 10, 3));
        assert!(!valid(&mask, 10, 4));
        assert!(!valid(&mask, 11, 3));
    }

    #[test]
    fn test_gray_image_export() {
        let scene = Scene::new("png", 8, 8);
        let mut builder = MaskBuilder::new(&scene);
        builder.add_expression("X > 5");
        let image = builder.build().unwrap().to_gray_image().unwrap();
        assert_eq!(image.dimensions(), (8, 8));
        assert_eq!(image.get_pixel(5, 0).0, [VALID]);
        assert_eq!(image.get_pixel(4, 0).0, [INVALID]);
    }
}
