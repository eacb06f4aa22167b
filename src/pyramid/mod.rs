//! Multi-resolution image sources.
//!
//! A [`PyramidSource`] opens an OME-Zarr hierarchy stored either as a plain
//! directory or inside a ZIP archive and exposes its ordered resolution
//! levels:
//!
//! ```text
//! PyramidSource
//!     ├── Backend (Directory | Archive)
//!     ├── PyramidLevel 0 (full resolution) ── ZarrArray
//!     ├── PyramidLevel 1                   ── ZarrArray
//!     └── ...
//! ```
//!
//! Region reads are rectangular, may extend past the level edge, and return
//! raw samples in the level's own axis order.

mod array;
mod level;
mod source;
mod store;

pub use array::ZarrArray;
pub use level::{AxisLayout, ImageExtent, PyramidLevel};
pub use source::{PyramidSource, RawRegion};
pub use store::{ArchiveStore, Backend, DirectoryStore, RawDocument};
