//! Container detection for multi-resolution images.
//!
//! This module decides how a locator is opened by examining the file system
//! entry and, for files, the leading magic bytes:
//!
//! - **Directory**: a plain hierarchical Zarr layout
//! - **ZIP archive**: a Zarr hierarchy stored in a single archive, opened
//!   with random-access reads
//!
//! Anything else is rejected with [`SourceError::NotAContainer`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{IoError, SourceError};

use super::metadata::{ZARR_JSON, ZATTRS, ZGROUP};
use super::zip::{EOCD_SIGNATURE, LOCAL_HEADER_SIGNATURE};

// =============================================================================
// ContainerKind
// =============================================================================

/// Detected storage layout of a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Plain directory tree
    Directory,

    /// ZIP archive holding the hierarchy
    ZipArchive,
}

impl ContainerKind {
    /// Get a human-readable name for the container kind.
    pub const fn name(&self) -> &'static str {
        match self {
            ContainerKind::Directory => "directory",
            ContainerKind::ZipArchive => "zip archive",
        }
    }
}

/// Detect the container kind of a locator.
///
/// # Format Detection Logic
///
/// 1. A directory is always a directory container; whether it holds a
///    pyramid is decided when its metadata is read
/// 2. A file must start with a ZIP local header (or be an empty archive)
/// 3. Everything else is not a container
pub fn detect_container(locator: &Path) -> Result<ContainerKind, SourceError> {
    let display = locator.display().to_string();
    let meta = match std::fs::metadata(locator) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SourceError::NotAContainer {
                locator: display,
                reason: "path does not exist".to_string(),
            })
        }
        Err(e) => return Err(IoError::read(display, e).into()),
    };

    if meta.is_dir() {
        return Ok(ContainerKind::Directory);
    }

    if !meta.is_file() {
        return Err(SourceError::NotAContainer {
            locator: display,
            reason: "neither a directory nor a regular file".to_string(),
        });
    }

    let mut magic = [0u8; 4];
    let mut file = File::open(locator).map_err(|e| IoError::read(display.clone(), e))?;
    let read = file
        .read(&mut magic)
        .map_err(|e| IoError::read(display.clone(), e))?;

    if read == 4 && is_zip_magic(&magic) {
        Ok(ContainerKind::ZipArchive)
    } else {
        Err(SourceError::NotAContainer {
            locator: display,
            reason: "file is not a ZIP archive".to_string(),
        })
    }
}

/// Check whether bytes start a ZIP archive (non-empty or empty).
pub fn is_zip_magic(bytes: &[u8]) -> bool {
    if bytes.len() < 4 {
        return false;
    }
    let sig = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    sig == LOCAL_HEADER_SIGNATURE || sig == EOCD_SIGNATURE
}

// =============================================================================
// Archive Root Locating
// =============================================================================

/// Locate the Zarr root inside an archive from its entry names.
///
/// Archives are often created by zipping the `.zarr` directory itself, so the
/// hierarchy sits below one or more leading path components. The root is:
///
/// 1. the parent of the first entry named `zarr.json`, `.zgroup` or `.zattrs`
/// 2. otherwise the components before the first `0` component (a level
///    directory) when it is not the leading component
/// 3. otherwise the archive root
///
/// Returns the root prefix without a trailing slash (`""` for the archive root).
pub fn locate_archive_root<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    for name in names.clone() {
        let normalized = name.replace('\\', "/");
        if normalized.ends_with(ZARR_JSON) || normalized.ends_with(ZGROUP) || normalized.ends_with(ZATTRS) {
            let parts: Vec<&str> = normalized.split('/').collect();
            return parts[..parts.len() - 1].join("/");
        }
    }

    for name in names {
        let normalized = name.replace('\\', "/");
        let parts: Vec<&str> = normalized.split('/').collect();
        if let Some(idx) = parts.iter().position(|p| *p == "0") {
            return if idx > 0 { parts[..idx].join("/") } else { String::new() };
        }
    }

    String::new()
}
