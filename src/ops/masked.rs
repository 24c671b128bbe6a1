//! Masked value substitution.
//!
//! Output keeps the source sample where the mask is non-zero and holds the
//! fill value, coerced to the source kind, everywhere else.

use crate::core::buffer::{PixelBuffer, Sample, SampleData};
use crate::core::error::{RasterResult, TransformError, TransformResult};
use crate::core::raster::{Raster, RasterLayout, RasterSource};
use crate::core::tile::TileRegion;
use crate::core::types::FillValue;

/// Lazily substitutes masked-out samples of a source raster.
pub struct MaskedImage {
    layout: RasterLayout,
    source: Raster,
    mask: Raster,
    fill: FillValue,
}

impl MaskedImage {
    /// Pair `source` with `mask`. Extents must match; tilings may differ.
    pub fn new(source: Raster, mask: Raster, fill: FillValue) -> TransformResult<Self> {
        if source.extent() != mask.extent() {
            return Err(TransformError::ExtentMismatch {
                source_extent: source.extent(),
                mask_extent: mask.extent(),
            });
        }
        Ok(Self {
            layout: *source.layout(),
            source,
            mask,
            fill,
        })
    }
}

fn substitute<T: Sample>(samples: &mut [T], valid: &[bool], fill: T) {
    for (sample, &keep) in samples.iter_mut().zip(valid) {
        if !keep {
            *sample = fill;
        }
    }
}

impl RasterSource for MaskedImage {
    fn layout(&self) -> &RasterLayout {
        &self.layout
    }

    fn compute_tile(&self, region: TileRegion) -> RasterResult<PixelBuffer> {
        let valid = self.mask.region(region)?.nonzero_mask();
        let mut out = self.source.region(region)?;
        let fill = self.fill.value();
        match out.data_mut() {
            SampleData::U8(v) => substitute(v, &valid, u8::from_f64(fill)),
            SampleData::I32(v) => substitute(v, &valid, i32::from_f64(fill)),
            SampleData::F32(v) => substitute(v, &valid, f32::from_f64(fill)),
            SampleData::F64(v) => substitute(v, &valid, fill),
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "masked"
    }
}

/// Replace every sample of `source` whose `mask` sample is zero with `fill`.
///
/// The result has the extent, kind and tiling of `source`. Fails with
/// [`TransformError::ExtentMismatch`] when the extents differ.
pub fn masked_substitution(source: &Raster, mask: &Raster, fill: impl Into<FillValue>) -> TransformResult<Raster> {
    let image = MaskedImage::new(source.clone(), mask.clone(), fill.into())?;
    Ok(Raster::new(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Extent, PixelKind, TileSize};
    use proptest::prelude::*;

    #[test]
    fn test_even_columns_kept() {
        let source = Raster::from_fn(5, 5, TileSize::square(2), |x, y| (x * y) as f32);
        let mask = Raster::from_fn(5, 5, TileSize::square(3), |x, _| if x % 2 == 0 { 255u8 } else { 0 });
        let out = masked_substitution(&source, &mask, FillValue::nan()).unwrap();
        assert_eq!(out.kind(), PixelKind::Float32);
        assert_eq!(out.tile_size(), TileSize::square(2));

        let buffer = out.materialize().unwrap();
        for y in 0..5 {
            for x in 0..5 {
                let v = buffer.sample_f64(x, y).unwrap();
                if x % 2 == 0 {
                    assert_eq!(v, (x * y) as f64);
                } else {
                    assert!(v.is_nan());
                }
            }
        }
    }

    #[test]
    fn test_fill_is_coerced_for_int32() {
        let source = Raster::from_vec(3, 1, vec![7i32, 8, 9]).unwrap();
        let mask = Raster::from_vec(3, 1, vec![0u8, 255, 0]).unwrap();

        let nan = masked_substitution(&source, &mask, FillValue::nan()).unwrap().materialize().unwrap();
        assert_eq!(nan.as_slice::<i32>().unwrap(), &[0, 8, 0]);

        let truncated = masked_substitution(&source, &mask, -2.7).unwrap().materialize().unwrap();
        assert_eq!(truncated.as_slice::<i32>().unwrap(), &[-2, 8, -2]);

        let saturated = masked_substitution(&source, &mask, 1e12).unwrap().materialize().unwrap();
        assert_eq!(saturated.as_slice::<i32>().unwrap(), &[i32::MAX, 8, i32::MAX]);
    }

    #[test]
    fn test_float64_and_float_mask() {
        let source = Raster::from_vec(2, 2, vec![1.0f64, 2.0, 3.0, 4.0]).unwrap();
        let mask = Raster::from_vec(2, 2, vec![0.0f32, 0.25, -1.0, 0.0]).unwrap();
        let out = masked_substitution(&source, &mask, 9.5).unwrap().materialize().unwrap();
        assert_eq!(out.as_slice::<f64>().unwrap(), &[9.5, 2.0, 3.0, 9.5]);
    }

    #[test]
    fn test_extent_mismatch() {
        let source = Raster::constant(Extent::new(4, 4), PixelKind::Float32, 1.0, TileSize::FALLBACK);
        let mask = Raster::constant(Extent::new(4, 3), PixelKind::UInt8, 255.0, TileSize::FALLBACK);
        let err = masked_substitution(&source, &mask, 0.0).unwrap_err();
        assert!(matches!(err, TransformError::ExtentMismatch { .. }));
        assert!(!err.is_recoverable());
    }

    proptest! {
        #[test]
        fn prop_substitution_matches_mask(
            values in proptest::collection::vec(-1000.0f32..1000.0, 24),
            mask in proptest::collection::vec(any::<bool>(), 24),
            fill in -50.0f32..50.0,
            tile in 1u32..7,
        ) {
            let source = Raster::from_vec(6, 4, values.clone()).unwrap().retiled(TileSize::square(tile));
            let mask_raster = Raster::from_vec(6, 4, mask.iter().map(|&m| if m { 255u8 } else { 0 }).collect::<Vec<_>>()).unwrap();
            let out = masked_substitution(&source, &mask_raster, fill).unwrap().materialize().unwrap();
            let samples = out.as_slice::<f32>().unwrap();
            for i in 0..24 {
                let expected = if mask[i] { values[i] } else { fill };
                prop_assert_eq!(samples[i], expected);
            }
        }
    }
}
