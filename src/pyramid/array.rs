//! Level arrays read through `zarrs`.
//!
//! `zarrs` owns metadata interpretation (v2 and v3), chunk keys, codecs and
//! fill values. This wrapper pins the display sample type at open time and
//! maps read failures onto [`SourceError`].

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use tracing::trace;
use zarrs::array::{Array, ArrayCreateError, ArrayError};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::StorageError;

use crate::error::SourceError;
use crate::format::{DataType, SampleBuffer};

use super::store::Backend;

/// One Zarr array inside a pyramid.
pub struct ZarrArray {
    /// Array path relative to the pyramid root (`""` for the root itself)
    path: String,
    dtype: DataType,
    inner: Array<Backend>,
}

impl ZarrArray {
    /// Open the array stored at `path` below the pyramid root.
    pub fn open(backend: Arc<Backend>, path: &str) -> Result<Self, SourceError> {
        let node_path = format!("/{}", path.trim_matches('/'));
        let inner = Array::open(backend, &node_path).map_err(|e| open_error(path, e))?;
        let dtype = DataType::from_zarrs(inner.data_type())?;

        Ok(Self {
            path: path.to_string(),
            dtype,
            inner,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw axis lengths.
    pub fn shape(&self) -> &[u64] {
        self.inner.shape()
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Read the hyper-rectangle `ranges` (one range per axis, all in bounds).
    ///
    /// Returns the samples in C order with dims equal to the range lengths.
    /// Chunks absent from the store read as the array's fill value.
    pub fn read(&self, ranges: &[Range<u64>]) -> Result<SampleBuffer, SourceError> {
        let subset = ArraySubset::new_with_ranges(ranges);
        trace!(path = %self.path, ?ranges, "reading array subset");

        macro_rules! wide {
            ($t:ty) => {
                SampleBuffer::Wide(
                    self.inner
                        .retrieve_array_subset_elements::<$t>(&subset)
                        .map_err(|e| read_error(&self.path, e))?
                        .into_iter()
                        .map(|v| v as f64)
                        .collect(),
                )
            };
        }

        Ok(match self.dtype {
            DataType::UInt8 => SampleBuffer::U8(
                self.inner
                    .retrieve_array_subset_elements::<u8>(&subset)
                    .map_err(|e| read_error(&self.path, e))?,
            ),
            DataType::Bool => SampleBuffer::Wide(
                self.inner
                    .retrieve_array_subset_elements::<bool>(&subset)
                    .map_err(|e| read_error(&self.path, e))?
                    .into_iter()
                    .map(|b| b as u8 as f64)
                    .collect(),
            ),
            DataType::Int8 => wide!(i8),
            DataType::UInt16 => wide!(u16),
            DataType::Int16 => wide!(i16),
            DataType::UInt32 => wide!(u32),
            DataType::Int32 => wide!(i32),
            DataType::UInt64 => wide!(u64),
            DataType::Int64 => wide!(i64),
            DataType::Float32 => wide!(f32),
            DataType::Float64 => wide!(f64),
        })
    }
}

impl fmt::Debug for ZarrArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZarrArray")
            .field("path", &self.path)
            .field("shape", &self.shape())
            .field("dtype", &self.dtype)
            .finish()
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

fn open_error(path: &str, err: ArrayCreateError) -> SourceError {
    let path = display_path(path);
    match err {
        ArrayCreateError::CodecsCreateError(e) => SourceError::UnsupportedCodec {
            path,
            codec: e.to_string(),
        },
        ArrayCreateError::StorageError(StorageError::IOError(e)) => SourceError::Storage {
            path,
            message: e.to_string(),
        },
        other => SourceError::InvalidMetadata {
            path,
            message: other.to_string(),
        },
    }
}

/// Undecodable chunks and values shorter than the chunk shape are corrupt;
/// store I/O failures are storage errors.
fn read_error(path: &str, err: ArrayError) -> SourceError {
    let path = display_path(path);
    match err {
        ArrayError::StorageError(StorageError::IOError(e)) => SourceError::Storage {
            path,
            message: e.to_string(),
        },
        ArrayError::StorageError(e) => SourceError::CorruptChunk {
            path,
            message: e.to_string(),
        },
        ArrayError::CodecError(e) => SourceError::CorruptChunk {
            path,
            message: e.to_string(),
        },
        other => SourceError::Storage {
            path,
            message: other.to_string(),
        },
    }
}
