use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use bytes::Bytes;

use super::RangeReader;
use crate::error::IoError;

/// Range reader over a local file.
///
/// Reads seek and fill under a mutex, so one handle can be shared between the
/// render thread and a background worker.
pub struct FileRangeReader {
    file: Mutex<File>,
    size: u64,
    identifier: String,
}

impl FileRangeReader {
    /// Open a file for positioned reads.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let identifier = path.display().to_string();
        let file = File::open(path).map_err(|e| IoError::read(identifier.clone(), e))?;
        let size = file
            .metadata()
            .map_err(|e| IoError::read(identifier.clone(), e))?
            .len();

        Ok(Self {
            file: Mutex::new(file),
            size,
            identifier,
        })
    }
}

impl RangeReader for FileRangeReader {
    fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        if offset.checked_add(len as u64).map_or(true, |end| end > self.size) {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.size,
            });
        }

        let mut buf = vec![0u8; len];
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| IoError::read(self.identifier.clone(), e))?;
        file.read_exact(&mut buf)
            .map_err(|e| IoError::read(self.identifier.clone(), e))?;

        Ok(Bytes::from(buf))
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
