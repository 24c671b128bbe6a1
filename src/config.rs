//! Configuration and declarative mask specifications.
//!
//! [`ProcessingConfig`] tunes how masks are computed; [`MaskSpec`] describes
//! a composite mask in TOML or JSON so it can be stored next to a scene:
//!
//! ```toml
//! tile_size = { width = 256, height = 256 }
//!
//! [[sources]]
//! type = "expression"
//! expression = "B4 > 0.1"
//!
//! [[sources]]
//! type = "wkt"
//! join = "or"
//! wkt = "POLYGON ((0 0, 1 0, 1 1, 0 1, 0 0))"
//! ```

use crate::core::error::{ConfigError, MaskBuildResult};
use crate::core::types::{JoinOp, TileSize};
use crate::geo::shapefile::ShapeLocation;
use crate::mask::MaskBuilder;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings that control mask computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Tile size used when neither the builder nor the scene names one.
    pub fallback_tile_size: TileSize,
    /// Whether full materialization fans tiles out over the thread pool.
    pub parallel: bool,
    /// Whether shapefile features are clipped to the scene bounds.
    pub clip_shapes_to_bounds: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            fallback_tile_size: TileSize::FALLBACK,
            parallel: true,
            clip_shapes_to_bounds: true,
        }
    }
}

impl ProcessingConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback tile size.
    pub fn with_fallback_tile_size(mut self, tile_size: TileSize) -> Self {
        self.fallback_tile_size = tile_size;
        self
    }

    /// Enable or disable parallel materialization.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enable or disable clipping of shapefile features.
    pub fn with_clip_shapes_to_bounds(mut self, clip: bool) -> Self {
        self.clip_shapes_to_bounds = clip;
        self
    }

    /// Parse TOML; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

/// One entry of a [`MaskSpec`].
///
/// `join` switches the builder's join mode before the source is added; when
/// absent the mode set by earlier entries stays in effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceSpec {
    /// Band-maths expression
    Expression {
        /// Expression text
        expression: String,
        /// Join mode switch
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<JoinOp>,
    },
    /// WKT polygon in WGS84
    Wkt {
        /// Geometry text
        wkt: String,
        /// Join mode switch
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<JoinOp>,
    },
    /// Shapefile path or URL
    Shapefile {
        /// Location text, see [`ShapeLocation::parse`]
        location: String,
        /// Join mode switch
        #[serde(default, skip_serializing_if = "Option::is_none")]
        join: Option<JoinOp>,
    },
}

impl SourceSpec {
    fn join(&self) -> Option<JoinOp> {
        match self {
            SourceSpec::Expression { join, .. } | SourceSpec::Wkt { join, .. } | SourceSpec::Shapefile { join, .. } => {
                *join
            }
        }
    }
}

/// Serializable description of a composite mask.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskSpec {
    /// Tile size override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<TileSize>,
    /// Sources in fold order
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl MaskSpec {
    /// Parse a TOML spec.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Parse a JSON spec.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a spec file; `.json` files are JSON, everything else TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Add every source to `builder`, in order.
    ///
    /// WKT is parsed here, so malformed geometry fails immediately; other
    /// problems surface when the builder is built.
    pub fn apply(&self, builder: &mut MaskBuilder<'_>) -> MaskBuildResult<()> {
        if let Some(tile_size) = self.tile_size {
            builder.with_tile_size(tile_size);
        }
        for source in &self.sources {
            if let Some(join) = source.join() {
                builder.set_join_mode(join);
            }
            match source {
                SourceSpec::Expression { expression, .. } => {
                    builder.add_expression(expression);
                }
                SourceSpec::Wkt { wkt, .. } => {
                    builder.add_wkt(wkt)?;
                }
                SourceSpec::Shapefile { location, .. } => {
                    builder.add_shapefile(ShapeLocation::parse(location));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;

    const SPEC: &str = r#"
tile_size = { width = 8, height = 4 }

[[sources]]
type = "expression"
expression = "X == 10.5"

[[sources]]
type = "expression"
join = "or"
expression = "Y == 3.5"

[[sources]]
type = "shapefile"
location = ""
"#;

    #[test]
    fn test_processing_config_defaults() {
        let config = ProcessingConfig::from_toml_str("parallel = false").unwrap();
        assert!(!config.parallel);
        assert!(config.clip_shapes_to_bounds);
        assert_eq!(config.fallback_tile_size, TileSize::FALLBACK);

        let config = ProcessingConfig::from_toml_str("fallback_tile_size = { width = 64, height = 32 }").unwrap();
        assert_eq!(config.fallback_tile_size, TileSize::new(64, 32));
    }

    #[test]
    fn test_processing_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validmask.toml");
        std::fs::write(&path, "clip_shapes_to_bounds = false\n").unwrap();
        assert!(!ProcessingConfig::from_file(&path).unwrap().clip_shapes_to_bounds);
        assert!(matches!(
            ProcessingConfig::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
        assert!(matches!(ProcessingConfig::from_toml_str("parallel = 3"), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_mask_spec_parse() {
        let spec = MaskSpec::from_toml_str(SPEC).unwrap();
        assert_eq!(spec.tile_size, Some(TileSize::new(8, 4)));
        assert_eq!(spec.sources.len(), 3);
        assert_eq!(spec.sources[1].join(), Some(JoinOp::Or));
        assert_eq!(spec.sources[0].join(), None);
    }

    #[test]
    fn test_mask_spec_json() {
        let spec = MaskSpec::from_json_str(
            r#"{"sources": [{"type": "wkt", "wkt": "POLYGON ((0 0, 2 0, 2 2, 0 2, 0 0))", "join": "and"}]}"#,
        )
        .unwrap();
        assert_eq!(spec.tile_size, None);
        assert!(matches!(&spec.sources[0], SourceSpec::Wkt { join: Some(JoinOp::And), .. }));
        assert!(matches!(MaskSpec::from_json_str("{\"sources\": 1}"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_zero_tile_size_rejected() {
        assert!(matches!(
            ProcessingConfig::from_toml_str("fallback_tile_size = { width = 0, height = 0 }"),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            MaskSpec::from_toml_str("tile_size = { width = 16, height = 0 }\nsources = []"),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            MaskSpec::from_json_str(r#"{"tile_size": {"width": 0, "height": 4}, "sources": []}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_mask_spec_apply() {
        let scene = Scene::new("s", 20, 10);
        let spec = MaskSpec::from_toml_str(SPEC).unwrap();
        let mut builder = MaskBuilder::new(&scene);
        spec.apply(&mut builder).unwrap();
        // The blank shapefile location is a no-op.
        assert_eq!(builder.len(), 2);
        assert_eq!(builder.effective_tile_size(), TileSize::new(8, 4));

        let mask = builder.build().unwrap();
        assert_eq!(mask.sample_f64(10, 0).unwrap(), 255.0);
        assert_eq!(mask.sample_f64(0, 3).unwrap(), 255.0);
        assert_eq!(mask.sample_f64(0, 0).unwrap(), 0.0);
    }
}
