//! Container formats for multi-resolution images.
//!
//! This module provides what is needed to locate OME-Zarr hierarchies, either
//! in a directory tree or inside a single ZIP archive. Array metadata and
//! chunk codecs are handled by `zarrs`.
//!
//! # Format Detection
//!
//! Use [`detect::detect_container`] to identify how a locator is stored.
//! Currently supported containers:
//!
//! - **Directory**: plain Zarr v2/v3 hierarchy
//! - **ZIP archive**: the same hierarchy inside an archive (stored or deflated entries)

pub mod detect;
pub mod dtype;
pub mod metadata;
pub mod zip;

pub use detect::{detect_container, is_zip_magic, locate_archive_root, ContainerKind};
pub use dtype::{DataType, SampleBuffer};
pub use zip::{ZipEntry, ZipIndex};
