//! Storage backends behind a pyramid source.
//!
//! The set of backends is closed, so they are dispatched through an enum
//! rather than a trait object. Archive root locating is a private detail of
//! the archive variant. [`Backend`] implements the `zarrs` readable-storage
//! trait, so level arrays read their metadata and chunks through it.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;
use zarrs::storage::byte_range::ByteRange;
use zarrs::storage::{ReadableStorageTraits, StorageError, StoreKey};

use crate::error::{IoError, SourceError};
use crate::format::{detect_container, locate_archive_root, ContainerKind, ZipIndex};
use crate::io::{BlockCache, FileRangeReader, RangeReader};

/// A named annotation document and its bytes (or the error reading them).
pub type RawDocument = (String, Result<Bytes, SourceError>);

// =============================================================================
// DirectoryStore
// =============================================================================

/// Zarr hierarchy stored as a plain directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the file at `key`; a missing file is `None`.
    pub fn get(&self, key: &str) -> Result<Option<Bytes>, IoError> {
        let path = self.root.join(key);
        match fs::read(&path) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) if path.is_dir() => {
                debug!(key, error = %e, "key names a directory");
                Ok(None)
            }
            Err(e) => Err(IoError::read(path.display().to_string(), e)),
        }
    }

    /// Size in bytes of the file at `key`; a missing file is `None`.
    pub fn size(&self, key: &str) -> Result<Option<u64>, IoError> {
        let path = self.root.join(key);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(meta.len())),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(IoError::read(path.display().to_string(), e)),
        }
    }

    /// Loose `.geojson` files (sorted), then `.json` files (sorted), directly in the root.
    fn annotation_documents(&self) -> Vec<RawDocument> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![(
                    self.root.display().to_string(),
                    Err(IoError::read(self.root.display().to_string(), e).into()),
                )]
            }
        };

        let mut geojson = Vec::new();
        let mut json = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match path.extension().and_then(|e| e.to_str()) {
                Some("geojson") => geojson.push(path),
                Some("json") => json.push(path),
                _ => {}
            }
        }
        geojson.sort();
        json.sort();

        geojson
            .into_iter()
            .chain(json)
            .map(|path| {
                let name = path.display().to_string();
                let data = fs::read(&path)
                    .map(Bytes::from)
                    .map_err(|e| IoError::read(name.clone(), e).into());
                (name, data)
            })
            .collect()
    }
}

// =============================================================================
// ArchiveStore
// =============================================================================

/// Zarr hierarchy stored inside a ZIP archive.
///
/// Only the central directory is parsed up front; entries are read on demand
/// through the block cache.
pub struct ArchiveStore<R: RangeReader = BlockCache<FileRangeReader>> {
    reader: R,
    index: ZipIndex,
    /// Prefix of the Zarr root inside the archive, without trailing slash
    root: String,
}

impl ArchiveStore {
    /// Open a ZIP archive on the local file system.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let reader = BlockCache::new(FileRangeReader::open(path)?);
        Self::from_reader(reader)
    }
}

impl<R: RangeReader> ArchiveStore<R> {
    /// Parse the central directory behind `reader` and locate the Zarr root.
    pub fn from_reader(reader: R) -> Result<Self, SourceError> {
        let index = ZipIndex::read(&reader)?;
        let root = locate_archive_root(index.entries().iter().map(|e| e.name.as_str()));

        debug!(
            archive = reader.identifier(),
            entries = index.len(),
            root = %root,
            "archive index loaded"
        );

        Ok(Self {
            reader,
            index,
            root,
        })
    }

    /// Zarr root prefix inside the archive (`""` for the archive top level).
    pub fn root(&self) -> &str {
        &self.root
    }

    fn full_name(&self, key: &str) -> String {
        if self.root.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.root, key)
        }
    }

    /// Read the entry at `key` relative to the Zarr root; a missing entry is `None`.
    pub fn get(&self, key: &str) -> Result<Option<Bytes>, SourceError> {
        match self.index.get(&self.full_name(key)) {
            Some(entry) => Ok(Some(self.index.read_entry(&self.reader, entry)?)),
            None => Ok(None),
        }
    }

    /// Inflated size of the entry at `key`; a missing entry is `None`.
    pub fn size(&self, key: &str) -> Option<u64> {
        self.index
            .get(&self.full_name(key))
            .filter(|e| !e.is_dir())
            .map(|e| e.uncompressed_size)
    }

    /// Every `.geojson` entry, and every `.json` entry whose name mentions
    /// annotations, anywhere in the archive.
    fn annotation_documents(&self) -> Vec<RawDocument> {
        self.index
            .entries()
            .iter()
            .filter(|e| !e.is_dir())
            .filter(|e| {
                let lower = e.name.to_lowercase();
                e.name.ends_with(".geojson") || (e.name.ends_with(".json") && lower.contains("annot"))
            })
            .map(|e| {
                let data = self
                    .index
                    .read_entry(&self.reader, e)
                    .map_err(SourceError::from);
                (e.name.clone(), data)
            })
            .collect()
    }
}

// =============================================================================
// Backend
// =============================================================================

/// The storage backend of an opened pyramid.
pub enum Backend {
    Directory(DirectoryStore),
    Archive(ArchiveStore),
}

impl Backend {
    /// Open a locator as a directory or archive backend.
    pub fn open(locator: &Path) -> Result<Self, SourceError> {
        match detect_container(locator)? {
            ContainerKind::Directory => Ok(Backend::Directory(DirectoryStore::new(locator))),
            ContainerKind::ZipArchive => Ok(Backend::Archive(ArchiveStore::open(locator)?)),
        }
    }

    pub fn kind(&self) -> ContainerKind {
        match self {
            Backend::Directory(_) => ContainerKind::Directory,
            Backend::Archive(_) => ContainerKind::ZipArchive,
        }
    }

    /// Read a key relative to the Zarr root.
    pub fn read(&self, key: &str) -> Result<Option<Bytes>, SourceError> {
        match self {
            Backend::Directory(store) => Ok(store.get(key)?),
            Backend::Archive(store) => store.get(key),
        }
    }

    /// Size of the value at a key relative to the Zarr root.
    pub fn value_size(&self, key: &str) -> Result<Option<u64>, SourceError> {
        match self {
            Backend::Directory(store) => Ok(store.size(key)?),
            Backend::Archive(store) => Ok(store.size(key)),
        }
    }

    /// Sidecar annotation documents stored alongside the image.
    pub fn annotation_documents(&self) -> Vec<RawDocument> {
        match self {
            Backend::Directory(store) => store.annotation_documents(),
            Backend::Archive(store) => store.annotation_documents(),
        }
    }
}

// =============================================================================
// zarrs Storage
// =============================================================================

fn storage_error(err: SourceError) -> StorageError {
    StorageError::IOError(std::io::Error::other(err.to_string()))
}

/// Slice `range` out of a whole value.
///
/// A range past the end means the stored value is shorter than the array
/// metadata implies; it is reported as `StorageError::Other`.
fn slice_range(key: &StoreKey, data: &Bytes, range: &ByteRange) -> Result<Bytes, StorageError> {
    let len = data.len() as u64;
    let (start, end) = match *range {
        ByteRange::FromStart(offset, None) => (offset, Some(len)),
        ByteRange::FromStart(offset, Some(n)) => (offset, offset.checked_add(n)),
        ByteRange::Suffix(n) => (len.saturating_sub(n), (n <= len).then_some(len)),
    };
    match end {
        Some(end) if start <= end && end <= len => Ok(data.slice(start as usize..end as usize)),
        _ => Err(StorageError::Other(format!(
            "byte range {:?} exceeds the {} bytes stored at {}",
            range,
            len,
            key.as_str()
        ))),
    }
}

impl ReadableStorageTraits for Backend {
    fn get(&self, key: &StoreKey) -> Result<Option<Bytes>, StorageError> {
        self.read(key.as_str()).map_err(storage_error)
    }

    fn get_partial_values_key(
        &self,
        key: &StoreKey,
        byte_ranges: &[ByteRange],
    ) -> Result<Option<Vec<Bytes>>, StorageError> {
        let Some(data) = self.read(key.as_str()).map_err(storage_error)? else {
            return Ok(None);
        };
        byte_ranges
            .iter()
            .map(|range| slice_range(key, &data, range))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        self.value_size(key.as_str()).map_err(storage_error)
    }
}
