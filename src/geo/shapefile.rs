//! ESRI shapefile polygon reader and shape store abstraction.
//!
//! Only the geometry file (`.shp`) is read. The main header and each record
//! header are big-endian; everything else is little-endian. Polygon records
//! (types 5, 15 and 25) become features, null records are skipped and other
//! shape types are skipped with a warning.

use crate::core::error::ShapeStoreError;
use crate::geo::clip::clip_collection;
use crate::geo::crs::{CrsProvider, CrsTransform};
use crate::geo::geometry::{Coord, Feature, FeatureCollection, Geometry, Polygon, Ring};
use crate::scene::Scene;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

const FILE_CODE: i32 = 9994;
const HEADER_LEN: usize = 100;

const SHAPE_NULL: i32 = 0;
const SHAPE_POLYGON: i32 = 5;
const SHAPE_POLYGON_Z: i32 = 15;
const SHAPE_POLYGON_M: i32 = 25;

/// Where a shapefile lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeLocation {
    /// Local filesystem path
    Path(PathBuf),
    /// Remote `http://` or `https://` URL
    Url(String),
}

impl ShapeLocation {
    /// Parse user input into a location. Blank input means "no location".
    ///
    /// `file://` URLs become paths; other URL schemes are kept as URLs.
    pub fn parse(text: &str) -> Option<ShapeLocation> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some(path) = text.strip_prefix("file://") {
            return Some(ShapeLocation::Path(PathBuf::from(path)));
        }
        if text.starts_with("http://") || text.starts_with("https://") {
            return Some(ShapeLocation::Url(text.to_string()));
        }
        Some(ShapeLocation::Path(PathBuf::from(text)))
    }

    /// Text for showing the location to a user; paths are made absolute.
    pub fn display_path(&self) -> String {
        match self {
            ShapeLocation::Path(path) => std::path::absolute(path)
                .unwrap_or_else(|_| path.clone())
                .display()
                .to_string(),
            ShapeLocation::Url(url) => url.clone(),
        }
    }
}

impl fmt::Display for ShapeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeLocation::Path(path) => write!(f, "{}", path.display()),
            ShapeLocation::Url(url) => f.write_str(url),
        }
    }
}

impl From<PathBuf> for ShapeLocation {
    fn from(path: PathBuf) -> Self {
        ShapeLocation::Path(path)
    }
}

impl From<&Path> for ShapeLocation {
    fn from(path: &Path) -> Self {
        ShapeLocation::Path(path.to_path_buf())
    }
}

/// Source of feature collections.
pub trait ShapeStore: Send + Sync {
    /// Load every feature stored at `location`.
    fn load(&self, location: &ShapeLocation) -> Result<FeatureCollection, ShapeStoreError>;
}

/// Store reading `.shp` files from disk or over HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileShapeStore;

impl FileShapeStore {
    /// Create a store.
    pub fn new() -> Self {
        Self
    }
}

impl ShapeStore for FileShapeStore {
    fn load(&self, location: &ShapeLocation) -> Result<FeatureCollection, ShapeStoreError> {
        let features = match location {
            ShapeLocation::Path(path) => read_shapefile(BufReader::new(File::open(path)?))?,
            ShapeLocation::Url(url) => {
                let response = ureq::get(url)
                    .call()
                    .map_err(|e| ShapeStoreError::Http(e.to_string()))?;
                read_shapefile(response.into_reader())?
            }
        };
        log::info!("loaded {} features from {}", features.len(), location);
        Ok(features)
    }
}

/// Read the polygon features of a `.shp` stream.
pub fn read_shapefile<R: Read>(mut reader: R) -> Result<FeatureCollection, ShapeStoreError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse_shapefile(&bytes)
}

/// Parse the polygon features of an in-memory `.shp` file.
pub fn parse_shapefile(bytes: &[u8]) -> Result<FeatureCollection, ShapeStoreError> {
    let mut cursor = ByteCursor::new(bytes);
    if bytes.len() < HEADER_LEN {
        return Err(ShapeStoreError::Format(format!("file is {} bytes, shorter than its header", bytes.len())));
    }
    let code = cursor.i32_be()?;
    if code != FILE_CODE {
        return Err(ShapeStoreError::Format(format!("bad file code {}", code)));
    }
    cursor.seek(24)?;
    let file_len = word_count_to_bytes(cursor.i32_be()?)
        .ok_or_else(|| ShapeStoreError::Format("invalid file length in header".to_string()))?;
    let version = cursor.i32_le()?;
    if version != 1000 {
        return Err(ShapeStoreError::Format(format!("unsupported version {}", version)));
    }
    let file_type = cursor.i32_le()?;
    log::debug!("shapefile of type {} and {} bytes", file_type, file_len);

    let end = file_len.min(bytes.len());
    let mut features = FeatureCollection::new();
    cursor.seek(HEADER_LEN)?;
    while cursor.pos + 8 <= end {
        let number = cursor.i32_be()?;
        let content_len = word_count_to_bytes(cursor.i32_be()?);
        let content_start = cursor.pos;
        let content_end = content_len
            .and_then(|len| content_start.checked_add(len))
            .ok_or_else(|| ShapeStoreError::Format(format!("record {} has an invalid length", number)))?;
        if content_end > end {
            return Err(ShapeStoreError::Format(format!("record {} runs past end of file", number)));
        }
        let mut record = ByteCursor::new(&bytes[content_start..content_end]);
        let shape_type = record.i32_le()?;
        match shape_type {
            SHAPE_NULL => {}
            SHAPE_POLYGON | SHAPE_POLYGON_Z | SHAPE_POLYGON_M => {
                if let Some(geometry) = read_polygon_record(&mut record)? {
                    features.push(Feature::new(number.to_string(), geometry));
                }
            }
            other => log::warn!("skipping record {} with non-polygon shape type {}", number, other),
        }
        cursor.seek(content_end)?;
    }
    Ok(features)
}

/// Lengths in the headers count 16-bit words. `None` for negative or
/// overflowing values.
fn word_count_to_bytes(words: i32) -> Option<usize> {
    usize::try_from(words).ok()?.checked_mul(2)
}

/// Record body after the shape type, read from a cursor bounded to the
/// record. Z and M blocks that follow the points are ignored.
fn read_polygon_record(cursor: &mut ByteCursor<'_>) -> Result<Option<Geometry>, ShapeStoreError> {
    cursor.skip(32)?; // bounding box
    let num_parts = usize::try_from(cursor.i32_le()?);
    let num_points = usize::try_from(cursor.i32_le()?);
    let (Ok(num_parts), Ok(num_points)) = (num_parts, num_points) else {
        return Err(ShapeStoreError::Format("negative part or point count".to_string()));
    };
    let needed = num_parts
        .checked_mul(4)
        .zip(num_points.checked_mul(16))
        .and_then(|(parts, points)| parts.checked_add(points));
    match needed {
        Some(needed) if needed <= cursor.remaining() => {}
        _ => {
            return Err(ShapeStoreError::Format(format!(
                "{} parts and {} points do not fit in a {} byte record body",
                num_parts,
                num_points,
                cursor.remaining()
            )))
        }
    }
    let mut starts = Vec::with_capacity(num_parts);
    for _ in 0..num_parts {
        let start = cursor.i32_le()?;
        if start < 0 || start as usize > num_points {
            return Err(ShapeStoreError::Format(format!("part index {} out of range", start)));
        }
        starts.push(start as usize);
    }
    let mut points = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        let x = cursor.f64_le()?;
        let y = cursor.f64_le()?;
        points.push(Coord::new(x, y));
    }

    let rings = starts.iter().enumerate().map(|(i, &start)| {
        let end = starts.get(i + 1).copied().unwrap_or(num_points).max(start);
        Ring::new(points[start..end].to_vec())
    });
    let polygons = assemble_polygons(rings);
    Ok(match polygons.len() {
        0 => None,
        1 => polygons.into_iter().next().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(polygons)),
    })
}

/// Outer rings are clockwise, holes counter-clockwise and belong to the
/// closest preceding outer ring.
fn assemble_polygons(rings: impl Iterator<Item = Ring>) -> Vec<Polygon> {
    let mut polygons: Vec<Polygon> = Vec::new();
    for ring in rings.filter(|r| !r.is_degenerate()) {
        let is_hole = ring.signed_area() > 0.0;
        match polygons.last_mut() {
            Some(polygon) if is_hole => polygon.interiors.push(ring),
            _ => polygons.push(Polygon::new(ring, Vec::new())),
        }
    }
    polygons
}

struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ShapeStoreError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos.saturating_add(N))
            .ok_or_else(|| ShapeStoreError::Format(format!("unexpected end of data at byte {}", self.pos)))?;
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn seek(&mut self, pos: usize) -> Result<(), ShapeStoreError> {
        if pos > self.bytes.len() {
            return Err(ShapeStoreError::Format(format!("offset {} past end of data", pos)));
        }
        self.pos = pos;
        Ok(())
    }

    fn skip(&mut self, n: usize) -> Result<(), ShapeStoreError> {
        self.seek(self.pos.saturating_add(n))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn i32_be(&mut self) -> Result<i32, ShapeStoreError> {
        Ok(i32::from_be_bytes(self.take()?))
    }

    fn i32_le(&mut self) -> Result<i32, ShapeStoreError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    fn f64_le(&mut self) -> Result<f64, ShapeStoreError> {
        Ok(f64::from_le_bytes(self.take()?))
    }
}

/// Load features and bring them into the scene's map coordinates.
///
/// Features are interpreted in the provider's system, reprojected into the
/// scene geocoding system when the scene has one, and clipped to the scene
/// bounds when the provider asks for it.
pub fn load_features_for_scene(
    store: &dyn ShapeStore,
    location: &ShapeLocation,
    scene: &Scene,
    provider: &dyn CrsProvider,
) -> Result<FeatureCollection, ShapeStoreError> {
    let mut features = store.load(location)?;
    let source_crs = provider.feature_crs(scene);
    if let Some(geocoding) = scene.geocoding() {
        if !geocoding.crs.same_as(&source_crs) {
            log::debug!("reprojecting {} features from {} to {}", features.len(), source_crs, geocoding.crs);
            let transform = CrsTransform::new(source_crs, geocoding.crs)?;
            for feature in &mut features.features {
                feature.geometry = transform.convert_geometry(&feature.geometry)?;
            }
        }
    }
    if provider.clip_to_scene_bounds() {
        let before = features.len();
        features = clip_collection(&features, &scene.map_bounds());
        if features.len() < before {
            log::debug!("clipping dropped {} features outside the scene", before - features.len());
        }
    }
    Ok(features)
}
