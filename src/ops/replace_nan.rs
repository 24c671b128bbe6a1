//! NaN replacement for floating-point rasters.

use crate::core::buffer::{PixelBuffer, SampleData};
use crate::core::error::{RasterError, RasterResult, TransformError, TransformResult};
use crate::core::raster::{Raster, RasterLayout, RasterSource};
use crate::core::tile::TileRegion;

/// Lazily replaces NaN samples of a Float32 or Float64 raster.
pub struct ReplaceNanImage {
    layout: RasterLayout,
    source: Raster,
    replacement: f64,
}

impl ReplaceNanImage {
    /// Wrap `source`, which must hold floating-point samples.
    pub fn new(source: Raster, replacement: f64) -> TransformResult<Self> {
        if !source.kind().is_float() {
            return Err(TransformError::UnsupportedPixelKind(source.kind()));
        }
        Ok(Self {
            layout: *source.layout(),
            source,
            replacement,
        })
    }
}

impl RasterSource for ReplaceNanImage {
    fn layout(&self) -> &RasterLayout {
        &self.layout
    }

    fn compute_tile(&self, region: TileRegion) -> RasterResult<PixelBuffer> {
        let mut out = self.source.region(region)?;
        match out.data_mut() {
            SampleData::F32(values) => {
                let replacement = self.replacement as f32;
                values.iter_mut().filter(|v| v.is_nan()).for_each(|v| *v = replacement);
            }
            SampleData::F64(values) => {
                values.iter_mut().filter(|v| v.is_nan()).for_each(|v| *v = self.replacement);
            }
            other => {
                return Err(RasterError::KindMismatch {
                    expected: self.layout.kind,
                    actual: other.kind(),
                })
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "replace-nan"
    }
}

/// Replace every NaN sample of `source` with `replacement`.
///
/// Other samples pass through unchanged; the result has the layout of
/// `source`. Integer rasters are rejected with
/// [`TransformError::UnsupportedPixelKind`].
pub fn replace_nan(source: &Raster, replacement: f64) -> TransformResult<Raster> {
    Ok(Raster::new(ReplaceNanImage::new(source.clone(), replacement)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Extent, PixelKind, TileSize};
    use proptest::prelude::*;

    #[test]
    fn test_replaces_nan_in_float32() {
        let source = Raster::from_vec(3, 1, vec![1.0f32, f32::NAN, 5.0]).unwrap();
        let out = replace_nan(&source, 42.0).unwrap().materialize().unwrap();
        assert_eq!(out.as_slice::<f32>().unwrap(), &[1.0, 42.0, 5.0]);
    }

    #[test]
    fn test_replaces_nan_in_float64() {
        let source = Raster::from_vec(2, 2, vec![f64::NAN, -0.5, f64::NAN, f64::INFINITY]).unwrap();
        let out = replace_nan(&source, -1.0).unwrap().materialize().unwrap();
        assert_eq!(out.as_slice::<f64>().unwrap(), &[-1.0, -0.5, -1.0, f64::INFINITY]);
    }

    #[test]
    fn test_rejects_integer_kinds() {
        for kind in [PixelKind::Int32, PixelKind::UInt8] {
            let source = Raster::constant(Extent::new(2, 2), kind, 1.0, TileSize::FALLBACK);
            let err = replace_nan(&source, 0.0).unwrap_err();
            assert!(matches!(err, TransformError::UnsupportedPixelKind(k) if k == kind));
        }
    }

    #[test]
    fn test_nan_replacement_keeps_nan() {
        let source = Raster::from_vec(2, 1, vec![f32::NAN, 3.0]).unwrap();
        let out = replace_nan(&source, f64::NAN).unwrap().materialize().unwrap();
        let samples = out.as_slice::<f32>().unwrap();
        assert!(samples[0].is_nan());
        assert_eq!(samples[1], 3.0);
    }

    fn sample_strategy() -> impl Strategy<Value = f32> {
        prop_oneof![Just(f32::NAN), -1.0e6f32..1.0e6]
    }

    proptest! {
        #[test]
        fn prop_replace_nan_is_idempotent(
            values in proptest::collection::vec(sample_strategy(), 20),
            replacement in -100.0f64..100.0,
            tile in 1u32..6,
        ) {
            let source = Raster::from_vec(5, 4, values.clone()).unwrap().retiled(TileSize::square(tile));
            let once = replace_nan(&source, replacement).unwrap();
            let twice = replace_nan(&once, replacement).unwrap();
            let once = once.materialize().unwrap();
            let twice = twice.materialize().unwrap();
            prop_assert_eq!(&once, &twice);

            let samples = once.as_slice::<f32>().unwrap();
            for (out, input) in samples.iter().zip(&values) {
                if input.is_nan() {
                    prop_assert_eq!(*out, replacement as f32);
                } else {
                    prop_assert_eq!(out, input);
                }
            }
        }
    }
}
