//! Composite validity masks.
//!
//! A mask is a UInt8 raster holding 255 for valid and 0 for invalid pixels.
//! [`MaskBuilder`] folds any number of [`MaskSource`]s into one such mask.

pub mod builder;
pub mod join;
pub mod source;

pub use builder::MaskBuilder;
pub use join::JoinImage;
pub use source::{MaskSource, MaskSourceKind, MaterializeContext};
