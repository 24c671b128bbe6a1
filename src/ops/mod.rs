//! Per-pixel raster transforms.
//!
//! Both transforms are lazy: they return a [`Raster`](crate::core::raster::Raster)
//! whose tiles are computed on first access, one kind dispatch per tile.

pub mod masked;
pub mod replace_nan;

pub use masked::{masked_substitution, MaskedImage};
pub use replace_nan::{replace_nan, ReplaceNanImage};
