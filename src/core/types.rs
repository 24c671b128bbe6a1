//! Core value types shared by the raster engine.
//!
//! The sample kinds form a closed set, so they are modelled as a plain enum:
//! - Exhaustive matching catches a missing kind at compile time
//! - Dispatch on the kind happens once per tile, never per sample
//! - serde handles the enum natively for declarative mask specs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sample value written for a valid mask pixel.
pub const VALID: u8 = 255;

/// Sample value written for an invalid mask pixel.
pub const INVALID: u8 = 0;

/// Element kind of the samples stored in a raster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PixelKind {
    /// Unsigned 8-bit integer; every mask produced by this crate uses it.
    UInt8,
    /// Signed 32-bit integer.
    Int32,
    /// 32-bit IEEE 754 float.
    Float32,
    /// 64-bit IEEE 754 float.
    Float64,
}

impl PixelKind {
    /// Whether samples of this kind can hold NaN.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Size of one sample in bytes.
    #[inline]
    pub const fn bytes_per_sample(&self) -> usize {
        match self {
            Self::UInt8 => 1,
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Short lowercase name, as used in configuration files.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UInt8 => "uint8",
            Self::Int32 => "int32",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

impl fmt::Display for PixelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Width and height of a raster in pixels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Extent {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Extent {
    /// Create a new extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels covered.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Dimensions of the tiles a raster is partitioned into.
///
/// Both sides are at least one pixel; deserializing a zero side fails.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "RawTileSize")]
pub struct TileSize {
    /// Tile width in pixels
    pub width: u32,
    /// Tile height in pixels
    pub height: u32,
}

impl TileSize {
    /// Tile size used when neither the caller nor the scene asks for one.
    pub const FALLBACK: TileSize = TileSize {
        width: 128,
        height: 128,
    };

    /// Create a tile size. Zero dimensions are raised to one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Create a square tile size.
    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }
}

#[derive(Deserialize)]
struct RawTileSize {
    width: u32,
    height: u32,
}

impl TryFrom<RawTileSize> for TileSize {
    type Error = String;

    fn try_from(raw: RawTileSize) -> Result<Self, Self::Error> {
        if raw.width == 0 || raw.height == 0 {
            return Err(format!("tile size {}x{} has a zero side", raw.width, raw.height));
        }
        Ok(TileSize {
            width: raw.width,
            height: raw.height,
        })
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for TileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Boolean combinator used to fold a mask source into the running composite.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JoinOp {
    /// Pixel is valid only if valid in both operands.
    #[default]
    And,
    /// Pixel is valid if valid in either operand.
    Or,
}

impl JoinOp {
    /// Combine two mask samples. Any non-zero sample counts as valid.
    #[inline]
    pub fn apply(self, left: u8, right: u8) -> u8 {
        let valid = match self {
            JoinOp::And => left != 0 && right != 0,
            JoinOp::Or => left != 0 || right != 0,
        };
        if valid {
            VALID
        } else {
            INVALID
        }
    }

    /// Upper-case operator name.
    pub const fn name(&self) -> &'static str {
        match self {
            JoinOp::And => "AND",
            JoinOp::Or => "OR",
        }
    }
}

impl fmt::Display for JoinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value written where a mask is false.
///
/// Stored as `f64` and coerced to the destination kind when a transform is
/// applied: integer kinds truncate toward zero and saturate (NaN becomes 0),
/// float kinds narrow or widen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FillValue(pub f64);

impl FillValue {
    /// A NaN fill, the usual choice for float rasters.
    pub const fn nan() -> Self {
        Self(f64::NAN)
    }

    /// The raw value before coercion.
    pub const fn value(&self) -> f64 {
        self.0
    }
}

impl From<f64> for FillValue {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl From<f32> for FillValue {
    fn from(value: f32) -> Self {
        Self(value as f64)
    }
}

impl From<i32> for FillValue {
    fn from(value: i32) -> Self {
        Self(value as f64)
    }
}
