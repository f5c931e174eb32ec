//! Small value types shared by windows, tensor metadata and kernels.

use crate::dimensions::{Coordinates, TensorShape, MAX_DIMS};

/// Margin around a tensor's logical extents, in elements.
///
/// Used both for a kernel's declared border (how far outside the input it
/// reads) and for a tensor's allocated padding; see [`PaddingSize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BorderSize {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// Allocated margin around a tensor.
pub type PaddingSize = BorderSize;

impl BorderSize {
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub const fn empty() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub const fn uniform(size: u32) -> Self {
        Self::new(size, size, size, size)
    }

    pub const fn symmetric(top_bottom: u32, left_right: u32) -> Self {
        Self::new(top_bottom, left_right, top_bottom, left_right)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    /// Clamp every edge to at most `limit`'s.
    pub fn limit(&mut self, limit: &BorderSize) {
        self.top = self.top.min(limit.top);
        self.right = self.right.min(limit.right);
        self.bottom = self.bottom.min(limit.bottom);
        self.left = self.left.min(limit.left);
    }

    /// Per-edge maximum.
    pub fn max(&self, other: &BorderSize) -> BorderSize {
        BorderSize::new(
            self.top.max(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
            self.left.max(other.left),
        )
    }

    /// Scale every edge, truncating toward zero.
    pub fn scaled(&self, factor: f32) -> BorderSize {
        let scale = |v: u32| (v as f32 * factor) as u32;
        BorderSize::new(scale(self.top), scale(self.right), scale(self.bottom), scale(self.left))
    }
}

/// How out-of-bounds reads are served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BorderMode {
    /// Border pixels hold garbage; outputs depending on them are invalid.
    #[default]
    Undefined,
    /// Border is filled with a constant value.
    Constant,
    /// Border repeats the nearest edge pixel.
    Replicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    /// Storage-only half precision.
    F16,
    F32,
}

impl DataType {
    pub const fn element_size(self) -> usize {
        match self {
            DataType::U8 | DataType::S8 => 1,
            DataType::U16 | DataType::S16 | DataType::F16 => 2,
            DataType::U32 | DataType::S32 | DataType::F32 => 4,
        }
    }
}

/// A constant pixel, convertible to the bytes of any [`DataType`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelValue {
    Unsigned(u32),
    Signed(i32),
    Float(f32),
}

impl Default for PixelValue {
    fn default() -> Self {
        PixelValue::Unsigned(0)
    }
}

impl PixelValue {
    /// Little-endian bytes of this value converted (saturating) to `data_type`.
    pub fn to_bytes(self, data_type: DataType) -> Vec<u8> {
        let as_f64 = match self {
            PixelValue::Unsigned(v) => v as f64,
            PixelValue::Signed(v) => v as f64,
            PixelValue::Float(v) => v as f64,
        };
        match data_type {
            DataType::U8 => vec![as_f64.clamp(0.0, u8::MAX as f64) as u8],
            DataType::S8 => (as_f64.clamp(i8::MIN as f64, i8::MAX as f64) as i8).to_le_bytes().to_vec(),
            DataType::U16 => (as_f64.clamp(0.0, u16::MAX as f64) as u16).to_le_bytes().to_vec(),
            DataType::S16 => (as_f64.clamp(i16::MIN as f64, i16::MAX as f64) as i16)
                .to_le_bytes()
                .to_vec(),
            DataType::U32 => (as_f64.clamp(0.0, u32::MAX as f64) as u32).to_le_bytes().to_vec(),
            DataType::S32 => (as_f64.clamp(i32::MIN as f64, i32::MAX as f64) as i32)
                .to_le_bytes()
                .to_vec(),
            DataType::F16 => f32_to_f16_bits(as_f64 as f32).to_le_bytes().to_vec(),
            DataType::F32 => (as_f64 as f32).to_le_bytes().to_vec(),
        }
    }
}

/// Round-toward-zero binary16 conversion; enough for border constants.
fn f32_to_f16_bits(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xff) as i32;
    let mantissa = bits & 0x007f_ffff;

    if exponent == 0xff {
        let nan = if mantissa != 0 { 0x0200 } else { 0 };
        return sign | 0x7c00 | nan;
    }
    let half_exp = exponent - 127 + 15;
    if half_exp >= 0x1f {
        sign | 0x7c00
    } else if half_exp <= 0 {
        if half_exp < -10 {
            return sign;
        }
        let m = mantissa | 0x0080_0000;
        sign | (m >> (14 - half_exp)) as u16
    } else {
        sign | ((half_exp as u16) << 10) | (mantissa >> 13) as u16
    }
}

/// Sub-rectangle of a tensor that holds defined values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ValidRegion {
    pub anchor: Coordinates,
    pub shape: TensorShape,
}

impl ValidRegion {
    pub fn new(anchor: Coordinates, shape: TensorShape) -> Self {
        Self { anchor, shape }
    }

    /// The whole of `shape`, anchored at the origin.
    pub fn from_shape(shape: TensorShape) -> Self {
        let anchor = Coordinates::new(&[0; MAX_DIMS][..shape.num_dimensions()]);
        Self { anchor, shape }
    }

    /// Number of axes described.
    pub fn num_dimensions(&self) -> usize {
        self.anchor.num_dimensions().max(self.shape.num_dimensions())
    }

    /// First valid index along `dim`.
    pub fn start(&self, dim: usize) -> i32 {
        self.anchor[dim]
    }

    /// One past the last valid index along `dim`.
    pub fn end(&self, dim: usize) -> i32 {
        self.anchor[dim] + self.shape[dim] as i32
    }

    /// Restrict `dim` to `[start, start + size)`.
    pub fn set(&mut self, dim: usize, start: i32, size: usize) -> &mut Self {
        self.anchor.set(dim, start);
        self.shape.set(dim, size);
        self
    }

    pub fn is_empty(&self) -> bool {
        (0..self.num_dimensions()).any(|d| self.shape[d] == 0)
    }
}

/// Resampling rule of a scale kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpolationPolicy {
    NearestNeighbor,
    Bilinear,
    /// Output pixel averages the input pixels it covers.
    Area,
}

/// Where inside a pixel its sample point sits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SamplingPolicy {
    #[default]
    Center,
    TopLeft,
}

impl SamplingPolicy {
    /// Offset of the sample point from the pixel's top-left corner.
    pub fn offset(self) -> f32 {
        match self {
            SamplingPolicy::Center => 0.5,
            SamplingPolicy::TopLeft => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_limit_and_max() {
        let mut border = BorderSize::new(3, 1, 0, 5);
        border.limit(&BorderSize::uniform(2));
        assert_eq!(border, BorderSize::new(2, 1, 0, 2));
        assert_eq!(border.max(&BorderSize::symmetric(1, 4)), BorderSize::new(2, 4, 1, 4));
        assert!(BorderSize::empty().is_empty());
        assert_eq!(BorderSize::uniform(4).scaled(0.5), BorderSize::uniform(2));
    }

    #[test]
    fn test_element_sizes() {
        assert_eq!(DataType::U8.element_size(), 1);
        assert_eq!(DataType::F16.element_size(), 2);
        assert_eq!(DataType::F32.element_size(), 4);
    }

    #[test]
    fn test_pixel_value_bytes() {
        assert_eq!(PixelValue::Signed(-1).to_bytes(DataType::U8), vec![0]);
        assert_eq!(PixelValue::Unsigned(300).to_bytes(DataType::U8), vec![255]);
        assert_eq!(PixelValue::Signed(-2).to_bytes(DataType::S16), (-2i16).to_le_bytes().to_vec());
        assert_eq!(PixelValue::Float(1.5).to_bytes(DataType::F32), 1.5f32.to_le_bytes().to_vec());
        assert_eq!(PixelValue::Float(1.0).to_bytes(DataType::F16), 0x3c00u16.to_le_bytes().to_vec());
        assert_eq!(PixelValue::Float(-2.0).to_bytes(DataType::F16), 0xc000u16.to_le_bytes().to_vec());
    }

    #[test]
    fn test_valid_region_bounds() {
        let mut region = ValidRegion::from_shape(TensorShape::from([10, 6]));
        assert_eq!(region.anchor.as_slice(), &[0, 0]);
        assert_eq!(region.end(0), 10);
        region.set(1, 2, 3);
        assert_eq!(region.start(1), 2);
        assert_eq!(region.end(1), 5);
        assert!(!region.is_empty());
        region.set(0, 4, 0);
        assert!(region.is_empty());
    }
}
