//! Opened multi-resolution image.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::SourceError;
use crate::format::metadata::{is_array_node, node_attributes, parse_object, ZARRAY, ZARR_JSON, ZATTRS};
use crate::format::{ContainerKind, DataType, SampleBuffer};

use super::array::ZarrArray;
use super::level::{AxisLayout, ImageExtent, PyramidLevel};
use super::store::{Backend, RawDocument};

// =============================================================================
// RawRegion
// =============================================================================

/// Samples read from one level, before display conversion.
///
/// `dims` follows the level's axes with time and z squeezed out:
/// `[H, W]`, `[C, H, W]` or `[H, W, C]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRegion {
    pub layout: AxisLayout,
    pub dims: Vec<usize>,
    pub samples: SampleBuffer,
}

impl RawRegion {
    fn dims_for(layout: AxisLayout, channels: usize, height: usize, width: usize) -> Vec<usize> {
        match layout {
            AxisLayout::Planar2D => vec![height, width],
            AxisLayout::ChannelLast3D => vec![height, width, channels],
            _ => vec![channels, height, width],
        }
    }

    /// All-zero region of the requested size.
    pub fn zeros(level: &PyramidLevel, height: usize, width: usize) -> Self {
        let dims = Self::dims_for(level.layout, level.channels(), height, width);
        let len = dims.iter().product();
        Self {
            layout: level.layout,
            dims,
            samples: SampleBuffer::zeros(level.dtype, len),
        }
    }

    /// (height, width, channels) regardless of layout.
    pub fn hwc(&self) -> (usize, usize, usize) {
        match (self.layout, self.dims.as_slice()) {
            (AxisLayout::Planar2D, &[h, w]) => (h, w, 1),
            (AxisLayout::ChannelLast3D, &[h, w, c]) => (h, w, c),
            (_, &[c, h, w]) => (h, w, c),
            _ => (0, 0, 0),
        }
    }

    /// Sample at row `y`, column `x`, channel `c`.
    pub fn sample(&self, y: usize, x: usize, c: usize) -> f64 {
        let (_, w, channels) = self.hwc();
        let index = if self.layout.is_channel_last() || self.layout == AxisLayout::Planar2D {
            (y * w + x) * channels + c
        } else {
            let h = self.dims[1];
            (c * h + y) * w + x
        };
        self.samples.get(index)
    }
}

// =============================================================================
// PyramidSource
// =============================================================================

/// An opened OME-Zarr pyramid in a directory or ZIP archive.
///
/// Level metadata is immutable after open. Region reads take `&self`, so a
/// source can be shared with background readers.
pub struct PyramidSource {
    locator: PathBuf,
    identity: Arc<str>,
    backend: Arc<Backend>,
    levels: Vec<PyramidLevel>,
    arrays: Vec<ZarrArray>,
    attributes: Map<String, Value>,
}

impl PyramidSource {
    /// Open the pyramid at `locator`.
    pub fn open(locator: impl AsRef<Path>) -> Result<Self, SourceError> {
        let locator = locator.as_ref();
        let backend = Arc::new(Backend::open(locator)?);
        let shown = locator.display().to_string();

        let attributes = read_root_attributes(&backend)?;
        let paths = match multiscale_paths(&attributes) {
            Some(paths) => paths,
            None => scan_level_paths(&backend)?,
        };

        let mut arrays = Vec::with_capacity(paths.len());
        for path in paths {
            if !has_array(&backend, &path)? {
                return Err(SourceError::InvalidMetadata {
                    path,
                    message: "level listed in multiscales has no array metadata".to_string(),
                });
            }
            arrays.push(ZarrArray::open(Arc::clone(&backend), &path)?);
        }
        if arrays.is_empty() && has_array(&backend, "")? {
            arrays.push(ZarrArray::open(Arc::clone(&backend), "")?);
        }
        if arrays.is_empty() {
            return Err(SourceError::NoLevels(shown));
        }

        let mut levels = Vec::with_capacity(arrays.len());
        for (index, array) in arrays.iter().enumerate() {
            let shape = array.shape().to_vec();
            levels.push(PyramidLevel {
                index,
                path: array.path().to_string(),
                layout: AxisLayout::from_shape(index, &shape)?,
                shape,
                dtype: array.dtype(),
            });
        }
        check_level_order(&levels)?;

        let identity: Arc<str> = std::fs::canonicalize(locator)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| shown.clone())
            .into();

        info!(
            locator = %shown,
            container = backend.kind().name(),
            levels = levels.len(),
            extent = %levels[0].extent(),
            dtype = %levels[0].dtype,
            "opened pyramid"
        );

        Ok(Self {
            locator: locator.to_path_buf(),
            identity,
            backend,
            levels,
            arrays,
            attributes,
        })
    }

    pub fn locator(&self) -> &Path {
        &self.locator
    }

    /// Stable identity of the underlying image, used in cache keys.
    pub fn identity(&self) -> &Arc<str> {
        &self.identity
    }

    /// File or directory name of the locator.
    pub fn name(&self) -> String {
        self.locator
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.locator.display().to_string())
    }

    pub fn container_kind(&self) -> ContainerKind {
        self.backend.kind()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    pub fn level(&self, level: usize) -> Result<&PyramidLevel, SourceError> {
        self.levels.get(level).ok_or(SourceError::InvalidLevel {
            level,
            count: self.levels.len(),
        })
    }

    /// Displayed (height, width) of a level.
    pub fn level_shape(&self, level: usize) -> Result<(u64, u64), SourceError> {
        let extent = self.level(level)?.extent();
        Ok((extent.height, extent.width))
    }

    pub fn level_extent(&self, level: usize) -> Result<ImageExtent, SourceError> {
        Ok(self.level(level)?.extent())
    }

    /// Sample type of the full-resolution level.
    pub fn dtype(&self) -> DataType {
        self.levels[0].dtype
    }

    /// Root group attributes (OME metadata, embedded annotations).
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Sidecar annotation documents found next to the image data.
    pub fn annotation_documents(&self) -> Vec<RawDocument> {
        self.backend.annotation_documents()
    }

    /// `"name | W×H | dtype | N levels"`
    pub fn summary(&self) -> String {
        format!(
            "{} | {} | {} | {} levels",
            self.name(),
            self.levels[0].extent(),
            self.dtype(),
            self.levels.len()
        )
    }

    /// Read a `height × width` rectangle whose top-left corner is (`y`, `x`).
    ///
    /// The rectangle may extend past the level in any direction; samples
    /// outside the level are zero. A rectangle entirely outside the level
    /// returns zeros without touching storage.
    pub fn read_region(
        &self,
        level: usize,
        y: i64,
        x: i64,
        height: usize,
        width: usize,
    ) -> Result<RawRegion, SourceError> {
        let info = self.level(level)?;
        let extent = info.extent();

        let y0 = y.max(0);
        let x0 = x.max(0);
        let y1 = (y + height as i64).min(extent.height as i64);
        let x1 = (x + width as i64).min(extent.width as i64);

        let mut region = RawRegion::zeros(info, height, width);
        if y0 >= y1 || x0 >= x1 {
            debug!(level, y, x, height, width, "region outside level, zero fill");
            return Ok(region);
        }

        let ranges = info
            .layout
            .selection(&info.shape, y0 as u64..y1 as u64, x0 as u64..x1 as u64);
        let samples = self.arrays[level].read(&ranges)?;

        let (rows, cols) = ((y1 - y0) as usize, (x1 - x0) as usize);
        let (top, left) = ((y0 - y) as usize, (x0 - x) as usize);
        if rows == height && cols == width {
            region.samples = samples;
            return Ok(region);
        }

        let channels = info.channels();
        if info.layout.is_channel_last() || info.layout == AxisLayout::Planar2D {
            let run = cols * channels;
            for r in 0..rows {
                let dst = ((top + r) * width + left) * channels;
                region.samples.copy_run(dst, &samples, r * run, run);
            }
        } else {
            for c in 0..channels {
                for r in 0..rows {
                    let dst = (c * height + top + r) * width + left;
                    let src = (c * rows + r) * cols;
                    region.samples.copy_run(dst, &samples, src, cols);
                }
            }
        }

        Ok(region)
    }
}

impl std::fmt::Debug for PyramidSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PyramidSource")
            .field("locator", &self.locator)
            .field("container", &self.backend.kind())
            .field("levels", &self.levels)
            .finish()
    }
}

// =============================================================================
// Discovery
// =============================================================================

fn join_key(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", path, name)
    }
}

/// Root group (or root array) attributes; a root without any reads as empty.
fn read_root_attributes(backend: &Backend) -> Result<Map<String, Value>, SourceError> {
    if let Some(bytes) = backend.read(ZARR_JSON)? {
        return Ok(node_attributes(parse_object(ZARR_JSON, &bytes)?));
    }
    match backend.read(ZATTRS)? {
        Some(bytes) => parse_object(ZATTRS, &bytes),
        None => Ok(Map::new()),
    }
}

/// Whether `path` holds array metadata (v3 node or v2 `.zarray`).
fn has_array(backend: &Backend, path: &str) -> Result<bool, SourceError> {
    let key = join_key(path, ZARR_JSON);
    if let Some(bytes) = backend.read(&key)? {
        return Ok(is_array_node(&parse_object(&key, &bytes)?));
    }
    Ok(backend.value_size(&join_key(path, ZARRAY))?.is_some())
}

/// Dataset paths of the first multiscale image, if the attributes declare one.
///
/// OME-Zarr 0.5 nests the metadata under an `ome` key.
fn multiscale_paths(attributes: &Map<String, Value>) -> Option<Vec<String>> {
    let multiscales = attributes
        .get("multiscales")
        .or_else(|| attributes.get("ome")?.get("multiscales"))?;

    let paths: Vec<String> = multiscales
        .get(0)?
        .get("datasets")?
        .as_array()?
        .iter()
        .filter_map(|d| d.get("path")?.as_str().map(str::to_string))
        .collect();

    (!paths.is_empty()).then_some(paths)
}

fn scan_level_paths(backend: &Backend) -> Result<Vec<String>, SourceError> {
    let mut paths = Vec::new();
    loop {
        let path = paths.len().to_string();
        if !has_array(backend, &path)? {
            break;
        }
        paths.push(path);
    }
    debug!(levels = paths.len(), "found numbered levels");
    Ok(paths)
}

fn check_level_order(levels: &[PyramidLevel]) -> Result<(), SourceError> {
    for pair in levels.windows(2) {
        let (a, b) = (pair[0].extent(), pair[1].extent());
        if b.width > a.width || b.height > a.height {
            return Err(SourceError::InvalidMetadata {
                path: pair[1].path.clone(),
                message: format!(
                    "level {} ({}) is larger than level {} ({})",
                    pair[1].index, b, pair[0].index, a
                ),
            });
        }
    }
    Ok(())
}
