//! Vector support for geometry and shapefile masks.
//!
//! This module contains:
//! - A polygon geometry model and a WKT reader
//! - Coordinate reference systems and scene geocoding
//! - Clipping to scene bounds and scanline rasterization
//! - Shapefile loading behind the [`ShapeStore`] trait

pub mod clip;
pub mod crs;
pub mod geometry;
pub mod rasterize;
pub mod shapefile;
pub mod wkt;

pub use clip::{clip_collection, clip_geometry};
pub use crs::{Crs, CrsProvider, CrsTransform, GeoCoding, Wgs84CrsProvider};
pub use geometry::{Bounds, Coord, Feature, FeatureCollection, Geometry, Polygon, Ring};
pub use rasterize::VectorMaskImage;
pub use shapefile::{load_features_for_scene, FileShapeStore, ShapeLocation, ShapeStore};
pub use wkt::{parse_wkt, WktError};
