//! Clipping of polygons to rectangular bounds.
//!
//! Sutherland-Hodgman against each of the four box edges. The result may
//! contain zero-width slivers along the box edge where a concave polygon
//! leaves and re-enters; they enclose no pixel centre and are harmless for
//! rasterization.

use crate::geo::geometry::{Bounds, Coord, Feature, FeatureCollection, Geometry, Polygon, Ring};

#[derive(Clone, Copy)]
enum Edge {
    Left(f64),
    Right(f64),
    Bottom(f64),
    Top(f64),
}

impl Edge {
    fn inside(&self, c: Coord) -> bool {
        match *self {
            Edge::Left(x) => c.x >= x,
            Edge::Right(x) => c.x <= x,
            Edge::Bottom(y) => c.y >= y,
            Edge::Top(y) => c.y <= y,
        }
    }

    fn intersect(&self, a: Coord, b: Coord) -> Coord {
        match *self {
            Edge::Left(x) | Edge::Right(x) => {
                let t = (x - a.x) / (b.x - a.x);
                Coord::new(x, a.y + t * (b.y - a.y))
            }
            Edge::Bottom(y) | Edge::Top(y) => {
                let t = (y - a.y) / (b.y - a.y);
                Coord::new(a.x + t * (b.x - a.x), y)
            }
        }
    }
}

/// Clip a ring to the box. Returns an empty ring if nothing remains.
pub fn clip_ring(ring: &Ring, bounds: &Bounds) -> Ring {
    let edges = [
        Edge::Left(bounds.min_x),
        Edge::Right(bounds.max_x),
        Edge::Bottom(bounds.min_y),
        Edge::Top(bounds.max_y),
    ];
    let mut output: Vec<Coord> = ring.coords().to_vec();
    for edge in edges {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        let mut prev = input[input.len() - 1];
        for &current in &input {
            match (edge.inside(current), edge.inside(prev)) {
                (true, true) => output.push(current),
                (true, false) => {
                    output.push(edge.intersect(prev, current));
                    output.push(current);
                }
                (false, true) => output.push(edge.intersect(prev, current)),
                (false, false) => {}
            }
            prev = current;
        }
    }
    Ring::new(output)
}

/// Clip a polygon, dropping holes that vanish. `None` if the exterior vanishes.
pub fn clip_polygon(polygon: &Polygon, bounds: &Bounds) -> Option<Polygon> {
    let exterior = clip_ring(&polygon.exterior, bounds);
    if exterior.is_degenerate() {
        return None;
    }
    let interiors = polygon
        .interiors
        .iter()
        .map(|r| clip_ring(r, bounds))
        .filter(|r| !r.is_degenerate())
        .collect();
    Some(Polygon::new(exterior, interiors))
}

/// Clip a geometry. `None` if it lies entirely outside.
pub fn clip_geometry(geometry: &Geometry, bounds: &Bounds) -> Option<Geometry> {
    match geometry.bounds() {
        Some(b) if b.intersects(bounds) => {}
        _ => return None,
    }
    let mut polygons: Vec<Polygon> = geometry
        .polygons()
        .iter()
        .filter_map(|p| clip_polygon(p, bounds))
        .collect();
    match (geometry, polygons.len()) {
        (_, 0) => None,
        (Geometry::Polygon(_), 1) => polygons.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(polygons)),
    }
}

/// Clip every feature, dropping those entirely outside.
pub fn clip_collection(collection: &FeatureCollection, bounds: &Bounds) -> FeatureCollection {
    FeatureCollection {
        features: collection
            .features
            .iter()
            .filter_map(|f| clip_geometry(&f.geometry, bounds).map(|g| Feature::new(f.id.clone(), g)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Bounds {
        Bounds { min_x, min_y, max_x, max_y }
    }

    #[test]
    fn test_clip_overlapping_square() {
        let polygon = Polygon::rectangle(rect(-5.0, -5.0, 5.0, 5.0));
        let clipped = clip_polygon(&polygon, &rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert_eq!(clipped.exterior.signed_area().abs(), 25.0);
        assert_eq!(clipped.bounds().unwrap(), rect(0.0, 0.0, 5.0, 5.0));
    }

    #[test]
    fn test_clip_inside_is_unchanged() {
        let polygon = Polygon::rectangle(rect(1.0, 1.0, 2.0, 2.0));
        let clipped = clip_polygon(&polygon, &rect(0.0, 0.0, 10.0, 10.0)).unwrap();
        assert_eq!(clipped.exterior.signed_area().abs(), 1.0);
    }

    #[test]
    fn test_clip_outside_vanishes() {
        let geometry = Geometry::Polygon(Polygon::rectangle(rect(20.0, 20.0, 30.0, 30.0)));
        assert!(clip_geometry(&geometry, &rect(0.0, 0.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn test_clip_collection_drops_outside_features() {
        let mut collection = FeatureCollection::new();
        collection.push(Feature::new("in", Polygon::rectangle(rect(1.0, 1.0, 3.0, 3.0)).into()));
        collection.push(Feature::new("out", Polygon::rectangle(rect(50.0, 1.0, 60.0, 3.0)).into()));
        let clipped = clip_collection(&collection, &rect(0.0, 0.0, 10.0, 10.0));
        assert_eq!(clipped.len(), 1);
        assert_eq!(clipped.features[0].id, "in");
    }
}
