//! Typed sample buffers for one tile.
//!
//! A [`PixelBuffer`] is a row-major block of samples covering a
//! [`TileRegion`]. Samples are held in a closed [`SampleData`] enum so the
//! element kind is matched once per buffer; the [`Sample`] trait lets the
//! per-pixel kernels be written once as generics and instantiated per kind.

use crate::core::error::{RasterError, RasterResult};
use crate::core::tile::TileRegion;
use crate::core::types::PixelKind;
use std::fmt;

/// A numeric sample type a raster can store.
pub trait Sample: bytemuck::Pod + PartialEq + PartialOrd + Send + Sync + fmt::Debug + 'static {
    /// Kind tag matching this type.
    const KIND: PixelKind;

    /// Coerce from `f64`. Integer targets truncate and saturate; NaN maps to 0.
    fn from_f64(value: f64) -> Self;

    /// Widen to `f64`.
    fn to_f64(self) -> f64;

    /// Whether the sample is non-zero, the validity rule for masks.
    fn is_nonzero(self) -> bool;

    /// Borrow the samples if `data` holds this type.
    fn slice(data: &SampleData) -> Option<&[Self]>;

    /// Mutably borrow the samples if `data` holds this type.
    fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]>;

    /// Wrap a vector into the matching [`SampleData`] variant.
    fn into_data(values: Vec<Self>) -> SampleData;
}

macro_rules! impl_sample {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl Sample for $ty {
            const KIND: PixelKind = PixelKind::$kind;

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn is_nonzero(self) -> bool {
                self != (0 as $ty)
            }

            fn slice(data: &SampleData) -> Option<&[Self]> {
                match data {
                    SampleData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]> {
                match data {
                    SampleData::$variant(values) => Some(values),
                    _ => None,
                }
            }

            fn into_data(values: Vec<Self>) -> SampleData {
                SampleData::$variant(values)
            }
        }
    };
}

impl_sample!(u8, UInt8, U8);
impl_sample!(i32, Int32, I32);
impl_sample!(f32, Float32, F32);
impl_sample!(f64, Float64, F64);

/// Raw sample storage, one variant per [`PixelKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    /// Unsigned bytes (masks)
    U8(Vec<u8>),
    /// Signed 32-bit integers
    I32(Vec<i32>),
    /// Single-precision floats
    F32(Vec<f32>),
    /// Double-precision floats
    F64(Vec<f64>),
}

impl SampleData {
    /// Allocate `len` samples of the given kind, all set to `value`.
    pub fn filled(kind: PixelKind, len: usize, value: f64) -> Self {
        match kind {
            PixelKind::UInt8 => SampleData::U8(vec![u8::from_f64(value); len]),
            PixelKind::Int32 => SampleData::I32(vec![i32::from_f64(value); len]),
            PixelKind::Float32 => SampleData::F32(vec![f32::from_f64(value); len]),
            PixelKind::Float64 => SampleData::F64(vec![value; len]),
        }
    }

    /// Allocate `len` zeroed samples.
    pub fn zeroed(kind: PixelKind, len: usize) -> Self {
        Self::filled(kind, len, 0.0)
    }

    /// Element kind of the stored samples.
    pub fn kind(&self) -> PixelKind {
        match self {
            SampleData::U8(_) => PixelKind::UInt8,
            SampleData::I32(_) => PixelKind::Int32,
            SampleData::F32(_) => PixelKind::Float32,
            SampleData::F64(_) => PixelKind::Float64,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            SampleData::U8(v) => v.len(),
            SampleData::I32(v) => v.len(),
            SampleData::F32(v) => v.len(),
            SampleData::F64(v) => v.len(),
        }
    }

    /// Whether no samples are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at a linear index, widened to `f64`.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match self {
            SampleData::U8(v) => v.get(index).map(|s| s.to_f64()),
            SampleData::I32(v) => v.get(index).map(|s| s.to_f64()),
            SampleData::F32(v) => v.get(index).map(|s| s.to_f64()),
            SampleData::F64(v) => v.get(index).copied(),
        }
    }

    /// View the samples as native-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            SampleData::U8(v) => v,
            SampleData::I32(v) => bytemuck::cast_slice(v),
            SampleData::F32(v) => bytemuck::cast_slice(v),
            SampleData::F64(v) => bytemuck::cast_slice(v),
        }
    }

    /// Decode native-endian bytes into samples of the given kind.
    pub fn from_bytes(kind: PixelKind, bytes: &[u8]) -> RasterResult<Self> {
        let size = kind.bytes_per_sample();
        if bytes.len() % size != 0 {
            return Err(RasterError::Other(format!(
                "{} bytes is not a whole number of {} samples",
                bytes.len(),
                kind
            )));
        }
        // pod_collect_to_vec copies, so the input needs no particular alignment
        Ok(match kind {
            PixelKind::UInt8 => SampleData::U8(bytes.to_vec()),
            PixelKind::Int32 => SampleData::I32(bytemuck::pod_collect_to_vec(bytes)),
            PixelKind::Float32 => SampleData::F32(bytemuck::pod_collect_to_vec(bytes)),
            PixelKind::Float64 => SampleData::F64(bytemuck::pod_collect_to_vec(bytes)),
        })
    }
}

/// A rectangular tile of samples in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    region: TileRegion,
    data: SampleData,
}

impl PixelBuffer {
    /// Wrap existing samples; the sample count must match the region.
    pub fn new(region: TileRegion, data: SampleData) -> RasterResult<Self> {
        if data.len() != region.len() {
            return Err(RasterError::BufferSizeMismatch {
                expected: region.len(),
                actual: data.len(),
            });
        }
        Ok(Self { region, data })
    }

    /// Wrap a typed vector.
    pub fn from_vec<T: Sample>(region: TileRegion, values: Vec<T>) -> RasterResult<Self> {
        Self::new(region, T::into_data(values))
    }

    /// Allocate a buffer with every sample set to `value`.
    pub fn filled(region: TileRegion, kind: PixelKind, value: f64) -> Self {
        Self {
            region,
            data: SampleData::filled(kind, region.len(), value),
        }
    }

    /// Allocate a zeroed buffer.
    pub fn zeroed(region: TileRegion, kind: PixelKind) -> Self {
        Self::filled(region, kind, 0.0)
    }

    /// Build a buffer by evaluating `f` at absolute pixel coordinates.
    pub fn from_fn<T, F>(region: TileRegion, f: F) -> Self
    where
        T: Sample,
        F: Fn(u32, u32) -> T,
    {
        let mut values = Vec::with_capacity(region.len());
        for y in region.y..region.bottom() {
            for x in region.x..region.right() {
                values.push(f(x, y));
            }
        }
        Self {
            region,
            data: T::into_data(values),
        }
    }

    /// Decode native-endian bytes.
    pub fn from_bytes(region: TileRegion, kind: PixelKind, bytes: &[u8]) -> RasterResult<Self> {
        Self::new(region, SampleData::from_bytes(kind, bytes)?)
    }

    /// Region covered, in raster coordinates.
    pub fn region(&self) -> TileRegion {
        self.region
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.region.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.region.height
    }

    /// Element kind.
    pub fn kind(&self) -> PixelKind {
        self.data.kind()
    }

    /// Samples between the starts of consecutive rows.
    pub fn line_stride(&self) -> usize {
        self.region.width as usize
    }

    /// Samples between horizontally adjacent pixels.
    pub fn pixel_stride(&self) -> usize {
        1
    }

    /// Raw storage.
    pub fn data(&self) -> &SampleData {
        &self.data
    }

    /// Mutable raw storage.
    pub fn data_mut(&mut self) -> &mut SampleData {
        &mut self.data
    }

    /// Take the raw storage.
    pub fn into_data(self) -> SampleData {
        self.data
    }

    /// Typed view of the samples, if `T` matches the kind.
    pub fn as_slice<T: Sample>(&self) -> Option<&[T]> {
        T::slice(&self.data)
    }

    /// Typed mutable view of the samples, if `T` matches the kind.
    pub fn as_mut_slice<T: Sample>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(&mut self.data)
    }

    /// Native-endian byte view.
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_bytes()
    }

    /// Linear index of an absolute pixel coordinate.
    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if !self.region.contains(x, y) {
            return None;
        }
        let row = (y - self.region.y) as usize;
        let col = (x - self.region.x) as usize;
        Some(row * self.line_stride() + col * self.pixel_stride())
    }

    /// Sample at an absolute pixel coordinate, widened to `f64`.
    pub fn sample_f64(&self, x: u32, y: u32) -> Option<f64> {
        self.index_of(x, y).and_then(|i| self.data.get_f64(i))
    }

    /// Per-sample validity under the mask rule: any non-zero sample is valid.
    pub fn nonzero_mask(&self) -> Vec<bool> {
        fn scan<T: Sample>(values: &[T]) -> Vec<bool> {
            values.iter().map(|v| v.is_nonzero()).collect()
        }
        match &self.data {
            SampleData::U8(v) => scan(v),
            SampleData::I32(v) => scan(v),
            SampleData::F32(v) => scan(v),
            SampleData::F64(v) => scan(v),
        }
    }

    /// Copy the part of `source` that overlaps this buffer.
    ///
    /// Both buffers must hold the same kind. Returns the region copied.
    pub fn copy_from(&mut self, source: &PixelBuffer) -> RasterResult<Option<TileRegion>> {
        let kind_mismatch = RasterError::KindMismatch {
            expected: self.kind(),
            actual: source.kind(),
        };
        let Some(overlap) = self.region.intersection(&source.region) else {
            return Ok(None);
        };
        let dst_region = self.region;
        let src_region = source.region;
        match (&mut self.data, &source.data) {
            (SampleData::U8(d), SampleData::U8(s)) => copy_rows(d, dst_region, s, src_region, overlap),
            (SampleData::I32(d), SampleData::I32(s)) => copy_rows(d, dst_region, s, src_region, overlap),
            (SampleData::F32(d), SampleData::F32(s)) => copy_rows(d, dst_region, s, src_region, overlap),
            (SampleData::F64(d), SampleData::F64(s)) => copy_rows(d, dst_region, s, src_region, overlap),
            _ => return Err(kind_mismatch),
        }
        Ok(Some(overlap))
    }

    /// Extract a sub-region into a new buffer.
    pub fn crop(&self, region: TileRegion) -> RasterResult<PixelBuffer> {
        if region.intersection(&self.region) != Some(region) {
            return Err(RasterError::RegionOutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                extent: crate::core::types::Extent::new(self.region.right(), self.region.bottom()),
            });
        }
        let mut out = PixelBuffer::zeroed(region, self.kind());
        out.copy_from(self)?;
        Ok(out)
    }
}

/// Row-wise copy of `overlap` between two row-major buffers.
fn copy_rows<T: Copy>(
    dst: &mut [T],
    dst_region: TileRegion,
    src: &[T],
    src_region: TileRegion,
    overlap: TileRegion,
) {
    let width = overlap.width as usize;
    for y in overlap.y..overlap.bottom() {
        let d = (y - dst_region.y) as usize * dst_region.width as usize + (overlap.x - dst_region.x) as usize;
        let s = (y - src_region.y) as usize * src_region.width as usize + (overlap.x - src_region.x) as usize;
        dst[d..d + width].copy_from_slice(&src[s..s + width]);
    }
}
