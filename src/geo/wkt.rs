//! Reader for the areal subset of Well-Known Text.
//!
//! Supports `POLYGON` and `MULTIPOLYGON` (case-insensitive), including the
//! `EMPTY` forms and optional `Z`/`M`/`ZM` dimension tags whose extra
//! ordinates are dropped.

use crate::geo::geometry::{Coord, Geometry, Polygon, Ring};
use std::fmt;

/// Error from parsing WKT text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WktError {
    /// Byte offset of the problem
    pub offset: usize,
    /// What went wrong
    pub message: String,
}

impl WktError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl fmt::Display for WktError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WKT error at byte {}: {}", self.offset, self.message)
    }
}

impl std::error::Error for WktError {}

/// Parse a WKT polygon or multipolygon.
pub fn parse_wkt(text: &str) -> Result<Geometry, WktError> {
    let mut reader = WktReader { src: text, pos: 0 };
    let keyword = reader.word()?.to_ascii_uppercase();
    let geometry = match keyword.as_str() {
        "POLYGON" => {
            reader.skip_dimension_tag();
            if reader.empty_tag() {
                Geometry::Polygon(Polygon::default())
            } else {
                Geometry::Polygon(reader.polygon()?)
            }
        }
        "MULTIPOLYGON" => {
            reader.skip_dimension_tag();
            if reader.empty_tag() {
                Geometry::MultiPolygon(Vec::new())
            } else {
                let mut polygons = Vec::new();
                reader.expect('(')?;
                loop {
                    polygons.push(reader.polygon()?);
                    if !reader.consume(',') {
                        break;
                    }
                }
                reader.expect(')')?;
                Geometry::MultiPolygon(polygons)
            }
        }
        other => {
            return Err(WktError::new(0, format!("unsupported geometry type '{}'", other)));
        }
    };
    reader.skip_ws();
    if reader.pos != reader.src.len() {
        return Err(WktError::new(reader.pos, "trailing characters"));
    }
    Ok(geometry)
}

struct WktReader<'a> {
    src: &'a str,
    pos: usize,
}

impl WktReader<'_> {
    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn consume(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), WktError> {
        if self.consume(c) {
            Ok(())
        } else {
            Err(WktError::new(self.pos, format!("expected '{}'", c)))
        }
    }

    fn word(&mut self) -> Result<&str, WktError> {
        self.skip_ws();
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(self.rest().len());
        if len == 0 {
            return Err(WktError::new(start, "expected a keyword"));
        }
        self.pos += len;
        Ok(&self.src[start..self.pos])
    }

    fn peek_word(&mut self) -> Option<String> {
        let saved = self.pos;
        let word = self.word().ok().map(|w| w.to_ascii_uppercase());
        self.pos = saved;
        word
    }

    fn skip_dimension_tag(&mut self) {
        if let Some(word) = self.peek_word() {
            if matches!(word.as_str(), "Z" | "M" | "ZM") {
                let _ = self.word();
            }
        }
    }

    fn empty_tag(&mut self) -> bool {
        if self.peek_word().as_deref() == Some("EMPTY") {
            let _ = self.word();
            true
        } else {
            false
        }
    }

    fn number(&mut self) -> Result<f64, WktError> {
        self.skip_ws();
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E')))
            .unwrap_or(self.rest().len());
        let text = &self.src[start..start + len];
        let value = text
            .parse::<f64>()
            .map_err(|_| WktError::new(start, format!("invalid number '{}'", text)))?;
        self.pos += len;
        Ok(value)
    }

    fn coord(&mut self) -> Result<Coord, WktError> {
        let x = self.number()?;
        let y = self.number()?;
        // Drop Z and M ordinates.
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.') {
            self.number()?;
        }
        Ok(Coord::new(x, y))
    }

    fn ring(&mut self) -> Result<Ring, WktError> {
        let start = self.pos;
        self.expect('(')?;
        let mut coords = vec![self.coord()?];
        while self.consume(',') {
            coords.push(self.coord()?);
        }
        self.expect(')')?;
        if coords.len() < 4 {
            return Err(WktError::new(start, "a ring needs at least four points"));
        }
        if coords.first() != coords.last() {
            return Err(WktError::new(start, "ring is not closed"));
        }
        Ok(Ring::new(coords))
    }

    fn polygon(&mut self) -> Result<Polygon, WktError> {
        self.expect('(')?;
        let exterior = self.ring()?;
        let mut interiors = Vec::new();
        while self.consume(',') {
            interiors.push(self.ring()?);
        }
        self.expect(')')?;
        Ok(Polygon::new(exterior, interiors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_polygon() {
        let geometry = parse_wkt(
            "POLYGON ((3.32 -0.77, 6.22 -0.77, \n 6.22 -3.88, 3.32 -3.88, 3.32 -0.77))",
        )
        .unwrap();
        let polygon = &geometry.polygons()[0];
        assert_eq!(polygon.exterior.coords().len(), 4);
        assert_eq!(polygon.exterior.coords()[2], Coord::new(6.22, -3.88));
        assert!(polygon.interiors.is_empty());
    }

    #[test]
    fn test_parse_polygon_with_hole() {
        let geometry = parse_wkt(
            "polygon((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 4, 2 2))",
        )
        .unwrap();
        assert_eq!(geometry.polygons()[0].interiors.len(), 1);
    }

    #[test]
    fn test_parse_multipolygon_and_z() {
        let geometry = parse_wkt(
            "MULTIPOLYGON Z (((0 0 1, 1 0 1, 1 1 1, 0 0 1)), ((5 5 0, 6 5 0, 6 6 0, 5 5 0)))",
        )
        .unwrap();
        assert_eq!(geometry.polygons().len(), 2);
        assert_eq!(geometry.polygons()[1].exterior.coords()[0], Coord::new(5.0, 5.0));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_wkt("POLYGON EMPTY").unwrap().is_empty());
        assert!(parse_wkt("MULTIPOLYGON EMPTY").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_wkt("POINT (1 2)").is_err());
        assert!(parse_wkt("POLYGON ((0 0, 1 0, 1 1))").is_err());
        assert!(parse_wkt("POLYGON ((0 0, 1 0, 1 1, 0 1))").is_err());
        assert!(parse_wkt("POLYGON ((0 0, 1 0, 1 1, 0 0)) junk").is_err());
        assert!(parse_wkt("POLYGON ((0 0, 1 x, 1 1, 0 0))").is_err());
    }
}
