//! Coordinate reference systems and scene geocoding.
//!
//! Features are interpreted in WGS84 unless a [`CrsProvider`] says
//! otherwise. With the `proj` feature any pair of EPSG systems can be
//! transformed through PROJ; without it only WGS84 and spherical Web
//! Mercator convert into each other, in closed form.

use crate::core::error::ProjectionError;
use crate::geo::geometry::{Bounds, Coord, Geometry};
use crate::scene::Scene;
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(feature = "proj")]
use proj::Proj;

/// Earth radius used by spherical Web Mercator, in metres.
#[cfg(not(feature = "proj"))]
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of Web Mercator.
#[cfg(not(feature = "proj"))]
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Coordinate reference system, identified by EPSG code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crs {
    /// Geographic longitude/latitude on WGS84 (EPSG:4326)
    #[default]
    Wgs84,
    /// Spherical Web Mercator (EPSG:3857)
    WebMercator,
    /// Any other EPSG system
    Epsg(u32),
}

impl Crs {
    /// EPSG code.
    pub const fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
            Crs::Epsg(code) => *code,
        }
    }

    /// System for an EPSG code; well-known codes map to their named variant.
    pub fn from_epsg(code: u32) -> Crs {
        match code {
            4326 => Crs::Wgs84,
            3857 | 900913 => Crs::WebMercator,
            other => Crs::Epsg(other),
        }
    }

    /// Parse strings such as `EPSG:4326`.
    pub fn parse(text: &str) -> Option<Crs> {
        let upper = text.trim().to_uppercase();
        match upper.as_str() {
            "WGS84" | "WGS 84" | "CRS:84" => Some(Crs::Wgs84),
            _ => upper.strip_prefix("EPSG:")?.parse().ok().map(Crs::from_epsg),
        }
    }

    /// Whether both values name the same system.
    pub fn same_as(&self, other: &Crs) -> bool {
        Crs::from_epsg(self.epsg()) == Crs::from_epsg(other.epsg())
    }

    /// Transform a coordinate from this system into `target`.
    pub fn transform(&self, coord: Coord, target: Crs) -> Result<Coord, ProjectionError> {
        CrsTransform::new(*self, target)?.convert(coord)
    }

    /// Transform every vertex of a geometry into `target`.
    pub fn transform_geometry(&self, geometry: &Geometry, target: Crs) -> Result<Geometry, ProjectionError> {
        if self.same_as(&target) {
            return Ok(geometry.clone());
        }
        CrsTransform::new(*self, target)?.convert_geometry(geometry)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// A prepared transformation between two systems, reusable across many
/// coordinates.
pub struct CrsTransform {
    from: Crs,
    to: Crs,
    #[cfg(feature = "proj")]
    proj: Option<Proj>,
}

impl CrsTransform {
    /// Prepare a transformation from `from` into `to`.
    pub fn new(from: Crs, to: Crs) -> Result<Self, ProjectionError> {
        let (from, to) = (Crs::from_epsg(from.epsg()), Crs::from_epsg(to.epsg()));
        if from == to {
            return Ok(Self {
                from,
                to,
                #[cfg(feature = "proj")]
                proj: None,
            });
        }
        Self::between(from, to)
    }

    #[cfg(feature = "proj")]
    fn between(from: Crs, to: Crs) -> Result<Self, ProjectionError> {
        let proj = Proj::new_known_crs(&from.to_string(), &to.to_string(), None).map_err(|e| {
            ProjectionError::Setup {
                from: from.to_string(),
                to: to.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            from,
            to,
            proj: Some(proj),
        })
    }

    #[cfg(not(feature = "proj"))]
    fn between(from: Crs, to: Crs) -> Result<Self, ProjectionError> {
        match (from, to) {
            (Crs::Wgs84, Crs::WebMercator) | (Crs::WebMercator, Crs::Wgs84) => Ok(Self { from, to }),
            _ => Err(ProjectionError::ProjNotAvailable {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }

    /// Source system.
    pub fn source(&self) -> Crs {
        self.from
    }

    /// Target system.
    pub fn target(&self) -> Crs {
        self.to
    }

    /// Transform one coordinate.
    #[cfg(feature = "proj")]
    pub fn convert(&self, coord: Coord) -> Result<Coord, ProjectionError> {
        let Some(proj) = &self.proj else {
            return Ok(coord);
        };
        let (x, y) = proj.convert((coord.x, coord.y)).map_err(|e| ProjectionError::Coordinate {
            x: coord.x,
            y: coord.y,
            reason: e.to_string(),
        })?;
        Ok(Coord::new(x, y))
    }

    /// Transform one coordinate.
    #[cfg(not(feature = "proj"))]
    pub fn convert(&self, coord: Coord) -> Result<Coord, ProjectionError> {
        Ok(match (self.from, self.to) {
            (Crs::Wgs84, Crs::WebMercator) => lon_lat_to_mercator(coord),
            (Crs::WebMercator, Crs::Wgs84) => mercator_to_lon_lat(coord),
            _ => coord,
        })
    }

    /// Transform every vertex of a geometry.
    pub fn convert_geometry(&self, geometry: &Geometry) -> Result<Geometry, ProjectionError> {
        geometry.try_map_coords(&|c| self.convert(c))
    }
}

impl fmt::Debug for CrsTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrsTransform")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

#[cfg(not(feature = "proj"))]
fn lon_lat_to_mercator(coord: Coord) -> Coord {
    let lat = coord.y.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = EARTH_RADIUS * coord.x.to_radians();
    let y = EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    Coord::new(x, y)
}

#[cfg(not(feature = "proj"))]
fn mercator_to_lon_lat(coord: Coord) -> Coord {
    let lon = (coord.x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (coord.y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    Coord::new(lon, lat)
}

/// North-up affine mapping between pixel and map coordinates.
///
/// `map = origin + pixel * pixel_size`, per axis. For a north-up grid
/// `pixel_height` is negative. Pixel coordinates address corners, so the
/// centre of pixel (x, y) is (x + 0.5, y + 0.5).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoding {
    /// System the map coordinates are expressed in
    pub crs: Crs,
    /// Map x of the upper-left corner
    pub origin_x: f64,
    /// Map y of the upper-left corner
    pub origin_y: f64,
    /// Map units per pixel along x
    pub pixel_width: f64,
    /// Map units per pixel along y, negative for north-up
    pub pixel_height: f64,
}

impl GeoCoding {
    /// Create a geocoding.
    pub fn new(crs: Crs, origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            crs,
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Map coordinate of a pixel-space position.
    pub fn pixel_to_map(&self, pixel: Coord) -> Coord {
        Coord::new(
            self.origin_x + pixel.x * self.pixel_width,
            self.origin_y + pixel.y * self.pixel_height,
        )
    }

    /// Pixel-space position of a map coordinate.
    pub fn map_to_pixel(&self, map: Coord) -> Coord {
        Coord::new(
            (map.x - self.origin_x) / self.pixel_width,
            (map.y - self.origin_y) / self.pixel_height,
        )
    }

    /// Map-space bounds of a `width` x `height` grid.
    pub fn bounds(&self, width: u32, height: u32) -> Bounds {
        Bounds::from_corners(
            self.pixel_to_map(Coord::new(0.0, 0.0)),
            self.pixel_to_map(Coord::new(width as f64, height as f64)),
        )
    }
}

/// Decides which system loaded features are interpreted in, and whether
/// they are clipped to the scene before rasterization.
pub trait CrsProvider: Send + Sync {
    /// System of the features loaded for `scene`.
    fn feature_crs(&self, scene: &Scene) -> Crs;

    /// Whether features are clipped to the scene bounds.
    fn clip_to_scene_bounds(&self) -> bool;
}

/// Provider that always answers WGS84.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wgs84CrsProvider {
    clip: bool,
}

impl Wgs84CrsProvider {
    /// Create a provider with the given clip flag.
    pub fn new(clip_to_bounds: bool) -> Self {
        Self { clip: clip_to_bounds }
    }
}

impl Default for Wgs84CrsProvider {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CrsProvider for Wgs84CrsProvider {
    fn feature_crs(&self, _scene: &Scene) -> Crs {
        Crs::Wgs84
    }

    fn clip_to_scene_bounds(&self) -> bool {
        self.clip
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_provider() {
        let scene = Scene::new("s", 4, 4);
        let provider = Wgs84CrsProvider::new(true);
        assert_eq!(provider.feature_crs(&scene), Crs::Wgs84);
        assert!(provider.clip_to_scene_bounds());
        assert!(!Wgs84CrsProvider::new(false).clip_to_scene_bounds());
    }

    #[test]
    fn test_crs_parse() {
        assert_eq!(Crs::parse("EPSG:4326"), Some(Crs::Wgs84));
        assert_eq!(Crs::parse("epsg:3857"), Some(Crs::WebMercator));
        assert_eq!(Crs::parse("EPSG:32633"), Some(Crs::Epsg(32633)));
        assert_eq!(Crs::parse("EPSG:utm"), None);
        assert_eq!(Crs::WebMercator.to_string(), "EPSG:3857");
        assert_eq!(Crs::Epsg(32633).to_string(), "EPSG:32633");
        assert!(Crs::Epsg(4326).same_as(&Crs::Wgs84));
    }

    #[test]
    fn test_mercator_round_trip() {
        let original = Coord::new(13.4, 52.5);
        let projected = Crs::Wgs84.transform(original, Crs::WebMercator).unwrap();
        assert!((projected.x - 1_491_681.0).abs() < 10.0);
        let back = Crs::WebMercator.transform(projected, Crs::Wgs84).unwrap();
        assert!((back.x - original.x).abs() < 1e-7);
        assert!((back.y - original.y).abs() < 1e-7);
    }

    #[test]
    fn test_identity_transform() {
        let coord = Coord::new(500_000.0, 5_800_000.0);
        assert_eq!(Crs::Epsg(32633).transform(coord, Crs::Epsg(32633)).unwrap(), coord);
        let transform = CrsTransform::new(Crs::Epsg(4326), Crs::Wgs84).unwrap();
        assert_eq!(transform.convert(coord).unwrap(), coord);
    }

    #[cfg(not(feature = "proj"))]
    #[test]
    fn test_other_systems_need_proj() {
        let result = Crs::Wgs84.transform(Coord::new(15.0, 52.0), Crs::Epsg(32633));
        assert!(matches!(result, Err(ProjectionError::ProjNotAvailable { .. })));

        let geometry = Geometry::Polygon(crate::geo::geometry::Polygon::rectangle(Bounds::from_corners(
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 1.0),
        )));
        assert!(Crs::Epsg(32633).transform_geometry(&geometry, Crs::WebMercator).is_err());
    }

    #[cfg(feature = "proj")]
    #[test]
    fn test_utm_through_proj() {
        // 15°E is the central meridian of UTM zone 33N.
        let utm = Crs::Wgs84.transform(Coord::new(15.0, 52.0), Crs::Epsg(32633)).unwrap();
        assert!((utm.x - 500_000.0).abs() < 1e-3);
        assert!((utm.y - 5_762_000.0).abs() < 5_000.0);

        let back = Crs::Epsg(32633).transform(utm, Crs::Wgs84).unwrap();
        assert!((back.x - 15.0).abs() < 1e-7);
        assert!((back.y - 52.0).abs() < 1e-7);
    }

    #[test]
    fn test_geocoding_round_trip() {
        let geocoding = GeoCoding::new(Crs::Wgs84, 0.0, 0.0, 0.1, -0.1);
        let map = geocoding.pixel_to_map(Coord::new(40.5, 9.5));
        assert!((map.x - 4.05).abs() < 1e-12);
        assert!((map.y + 0.95).abs() < 1e-12);
        let pixel = geocoding.map_to_pixel(map);
        assert!((pixel.x - 40.5).abs() < 1e-9);
        let bounds = geocoding.bounds(100, 50);
        assert!((bounds.min_y + 5.0).abs() < 1e-12);
        assert!((bounds.max_x - 10.0).abs() < 1e-12);
        assert_eq!(bounds.max_y, 0.0);
    }
}
