//! Minimal polygonal geometry model.
//!
//! Only areal geometries can carve a region out of a raster, so the model is
//! limited to polygons with holes and collections of them.

use serde::{Deserialize, Serialize};

/// A 2-D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    /// Easting or longitude
    pub x: f64,
    /// Northing or latitude
    pub y: f64,
}

impl Coord {
    /// Create a coordinate.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum x
    pub min_x: f64,
    /// Minimum y
    pub min_y: f64,
    /// Maximum x
    pub max_x: f64,
    /// Maximum y
    pub max_y: f64,
}

impl Bounds {
    /// Create bounds from two corners in any order.
    pub fn from_corners(a: Coord, b: Coord) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    /// Bounds of a set of coordinates, `None` if empty.
    pub fn of_coords<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds::from_corners(*first, *first);
        for c in iter {
            bounds.min_x = bounds.min_x.min(c.x);
            bounds.min_y = bounds.min_y.min(c.y);
            bounds.max_x = bounds.max_x.max(c.x);
            bounds.max_y = bounds.max_y.max(c.y);
        }
        Some(bounds)
    }

    /// Smallest bounds containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Whether the two boxes share any area or edge.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// A closed ring of coordinates. The closing point may or may not repeat
/// the first one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ring(pub Vec<Coord>);

impl Ring {
    /// Create a ring, dropping a duplicated closing point.
    pub fn new(mut coords: Vec<Coord>) -> Self {
        if coords.len() > 1 && coords.first() == coords.last() {
            coords.pop();
        }
        Self(coords)
    }

    /// Vertices without the closing duplicate.
    pub fn coords(&self) -> &[Coord] {
        &self.0
    }

    /// A ring needs three distinct vertices to enclose area.
    pub fn is_degenerate(&self) -> bool {
        self.0.len() < 3 || self.signed_area() == 0.0
    }

    /// Shoelace area; positive for counter-clockwise rings in a y-up system.
    pub fn signed_area(&self) -> f64 {
        let n = self.0.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.0[i];
            let b = self.0[(i + 1) % n];
            sum += a.x * b.y - b.x * a.y;
        }
        sum / 2.0
    }

    /// Apply a coordinate mapping to every vertex.
    pub fn try_map_coords<E>(&self, f: &impl Fn(Coord) -> Result<Coord, E>) -> Result<Ring, E> {
        Ok(Ring(self.0.iter().map(|c| f(*c)).collect::<Result<_, _>>()?))
    }
}

/// A polygon with an outer boundary and optional holes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polygon {
    /// Outer boundary
    pub exterior: Ring,
    /// Holes
    pub interiors: Vec<Ring>,
}

impl Polygon {
    /// Create a polygon.
    pub fn new(exterior: Ring, interiors: Vec<Ring>) -> Self {
        Self { exterior, interiors }
    }

    /// Axis-aligned rectangle.
    pub fn rectangle(bounds: Bounds) -> Self {
        Self::new(
            Ring::new(vec![
                Coord::new(bounds.min_x, bounds.min_y),
                Coord::new(bounds.max_x, bounds.min_y),
                Coord::new(bounds.max_x, bounds.max_y),
                Coord::new(bounds.min_x, bounds.max_y),
            ]),
            Vec::new(),
        )
    }

    /// All rings, exterior first.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    /// Whether the outer boundary encloses no area.
    pub fn is_empty(&self) -> bool {
        self.exterior.is_degenerate()
    }

    /// Bounding box of the exterior.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::of_coords(self.exterior.coords())
    }

    /// Apply a coordinate mapping to every ring.
    pub fn try_map_coords<E>(&self, f: &impl Fn(Coord) -> Result<Coord, E>) -> Result<Polygon, E> {
        Ok(Polygon {
            exterior: self.exterior.try_map_coords(f)?,
            interiors: self.interiors.iter().map(|r| r.try_map_coords(f)).collect::<Result<_, _>>()?,
        })
    }
}

/// An areal geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "polygons")]
pub enum Geometry {
    /// A single polygon
    Polygon(Polygon),
    /// Several polygons treated as a union
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// Polygons making up the geometry.
    pub fn polygons(&self) -> &[Polygon] {
        match self {
            Geometry::Polygon(p) => std::slice::from_ref(p),
            Geometry::MultiPolygon(ps) => ps,
        }
    }

    /// Whether no polygon encloses any area.
    pub fn is_empty(&self) -> bool {
        self.polygons().iter().all(Polygon::is_empty)
    }

    /// Bounding box of all polygons.
    pub fn bounds(&self) -> Option<Bounds> {
        self.polygons()
            .iter()
            .filter_map(Polygon::bounds)
            .reduce(|a, b| a.union(&b))
    }

    /// Apply a coordinate mapping to every vertex.
    pub fn try_map_coords<E>(&self, f: &impl Fn(Coord) -> Result<Coord, E>) -> Result<Geometry, E> {
        Ok(match self {
            Geometry::Polygon(p) => Geometry::Polygon(p.try_map_coords(f)?),
            Geometry::MultiPolygon(ps) => {
                Geometry::MultiPolygon(ps.iter().map(|p| p.try_map_coords(f)).collect::<Result<_, _>>()?)
            }
        })
    }
}

impl From<Polygon> for Geometry {
    fn from(polygon: Polygon) -> Self {
        Geometry::Polygon(polygon)
    }
}

/// A geometry with an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature identifier
    pub id: String,
    /// Areal geometry
    pub geometry: Geometry,
}

impl Feature {
    /// Create a feature.
    pub fn new(id: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }
}

/// An ordered set of features sharing one coordinate system.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureCollection {
    /// The features
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection holding one feature.
    pub fn single(feature: Feature) -> Self {
        Self {
            features: vec![feature],
        }
    }

    /// Append a feature.
    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Bounding box of all features.
    pub fn bounds(&self) -> Option<Bounds> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounds())
            .reduce(|a, b| a.union(&b))
    }

    /// All polygons of all features.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.features.iter().flat_map(|f| f.geometry.polygons())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Polygon {
        Polygon::rectangle(Bounds::from_corners(Coord::new(x0, y0), Coord::new(x0 + size, y0 + size)))
    }

    #[test]
    fn test_ring_drops_closing_point() {
        let ring = Ring::new(vec![
            Coord::new(0.0, 0.0),
            Coord::new(1.0, 0.0),
            Coord::new(1.0, 1.0),
            Coord::new(0.0, 0.0),
        ]);
        assert_eq!(ring.coords().len(), 3);
        assert_eq!(ring.signed_area(), 0.5);
    }

    #[test]
    fn test_degenerate_geometry_is_empty() {
        let line = Polygon::new(
            Ring::new(vec![Coord::new(0.0, 0.0), Coord::new(1.0, 1.0), Coord::new(2.0, 2.0)]),
            Vec::new(),
        );
        assert!(Geometry::Polygon(line).is_empty());
        assert!(Geometry::MultiPolygon(Vec::new()).is_empty());
        assert!(!Geometry::Polygon(square(0.0, 0.0, 1.0)).is_empty());
    }

    #[test]
    fn test_bounds_union() {
        let geometry = Geometry::MultiPolygon(vec![square(0.0, 0.0, 1.0), square(3.0, -2.0, 1.0)]);
        let bounds = geometry.bounds().unwrap();
        assert_eq!(bounds, Bounds { min_x: 0.0, min_y: -2.0, max_x: 4.0, max_y: 1.0 });
        let collection = FeatureCollection::single(Feature::new("a", geometry));
        assert_eq!(collection.bounds(), Some(bounds));
        assert_eq!(collection.polygons().count(), 2);
    }
}
