//! Sample data types and chunk sample buffers.

use std::fmt;

use crate::error::SourceError;

/// Element type of a Zarr array, as far as display is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Bool,
    UInt8,
    Int8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    UInt64,
    Int64,
    Float32,
    Float64,
}

impl DataType {
    /// Map the data type `zarrs` resolved from the array metadata.
    ///
    /// Half floats, complex numbers, strings and raw bits are not displayable.
    pub fn from_zarrs(dtype: &zarrs::array::DataType) -> Result<Self, SourceError> {
        use zarrs::array::DataType as Z;

        Ok(match dtype {
            Z::Bool => DataType::Bool,
            Z::UInt8 => DataType::UInt8,
            Z::Int8 => DataType::Int8,
            Z::UInt16 => DataType::UInt16,
            Z::Int16 => DataType::Int16,
            Z::UInt32 => DataType::UInt32,
            Z::Int32 => DataType::Int32,
            Z::UInt64 => DataType::UInt64,
            Z::Int64 => DataType::Int64,
            Z::Float32 => DataType::Float32,
            Z::Float64 => DataType::Float64,
            other => return Err(SourceError::UnsupportedDataType(format!("{:?}", other))),
        })
    }

    /// Whether samples are already display bytes and need no rescaling.
    pub const fn is_u8(&self) -> bool {
        matches!(self, DataType::UInt8)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::UInt8 => "uint8",
            DataType::Int8 => "int8",
            DataType::UInt16 => "uint16",
            DataType::Int16 => "int16",
            DataType::UInt32 => "uint32",
            DataType::Int32 => "int32",
            DataType::UInt64 => "uint64",
            DataType::Int64 => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// SampleBuffer
// =============================================================================

/// Dense samples in C order.
///
/// 8-bit unsigned data stays as bytes; every other type is widened to `f64`
/// so extraction can rescale it.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleBuffer {
    U8(Vec<u8>),
    Wide(Vec<f64>),
}

impl SampleBuffer {
    /// A buffer of `len` samples set to `value`, in the representation `dtype` uses.
    pub fn filled(dtype: DataType, len: usize, value: f64) -> Self {
        if dtype.is_u8() {
            let v = if value.is_finite() { value.clamp(0.0, 255.0) as u8 } else { 0 };
            SampleBuffer::U8(vec![v; len])
        } else {
            SampleBuffer::Wide(vec![value; len])
        }
    }

    pub fn zeros(dtype: DataType, len: usize) -> Self {
        Self::filled(dtype, len, 0.0)
    }

    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::U8(v) => v.len(),
            SampleBuffer::Wide(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index` as `f64`.
    pub fn get(&self, index: usize) -> f64 {
        match self {
            SampleBuffer::U8(v) => v[index] as f64,
            SampleBuffer::Wide(v) => v[index],
        }
    }

    /// Largest non-NaN sample, or `None` when empty.
    pub fn max(&self) -> Option<f64> {
        match self {
            SampleBuffer::U8(v) => v.iter().max().map(|&m| m as f64),
            SampleBuffer::Wide(v) => v
                .iter()
                .copied()
                .filter(|x| !x.is_nan())
                .fold(None, |acc, x| Some(acc.map_or(x, |m: f64| m.max(x)))),
        }
    }

    /// Copy `len` contiguous samples from `src[src_offset..]` into `self[dst_offset..]`.
    ///
    /// Mixed representations are converted; u8 targets saturate.
    pub fn copy_run(&mut self, dst_offset: usize, src: &SampleBuffer, src_offset: usize, len: usize) {
        match (self, src) {
            (SampleBuffer::U8(d), SampleBuffer::U8(s)) => {
                d[dst_offset..dst_offset + len].copy_from_slice(&s[src_offset..src_offset + len]);
            }
            (SampleBuffer::Wide(d), SampleBuffer::Wide(s)) => {
                d[dst_offset..dst_offset + len].copy_from_slice(&s[src_offset..src_offset + len]);
            }
            (SampleBuffer::Wide(d), SampleBuffer::U8(s)) => {
                for i in 0..len {
                    d[dst_offset + i] = s[src_offset + i] as f64;
                }
            }
            (SampleBuffer::U8(d), SampleBuffer::Wide(s)) => {
                for i in 0..len {
                    d[dst_offset + i] = s[src_offset + i].clamp(0.0, 255.0) as u8;
                }
            }
        }
    }
}
