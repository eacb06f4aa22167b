use thiserror::Error;

/// I/O errors that can occur when reading from local storage
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from the underlying file system
    #[error("Read error on {path}: {message}")]
    Read { path: String, message: String },

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Object not found
    #[error("Object not found: {0}")]
    NotFound(String),
}

impl IoError {
    pub(crate) fn read(path: impl Into<String>, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            IoError::NotFound(path.into())
        } else {
            IoError::Read {
                path: path.into(),
                message: err.to_string(),
            }
        }
    }
}

/// Errors that can occur when parsing ZIP archives
#[derive(Debug, Clone, Error)]
pub enum ArchiveError {
    /// I/O error while reading the archive
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// No end-of-central-directory record in the archive tail
    #[error("End of central directory record not found")]
    MissingEndOfCentralDirectory,

    /// A record did not start with its expected signature
    #[error("Invalid {record} signature: 0x{found:08X}")]
    InvalidSignature { record: &'static str, found: u32 },

    /// A record is shorter than its declared size
    #[error("Truncated {0}")]
    Truncated(&'static str),

    /// Entry uses a compression method other than stored/deflate
    #[error("Unsupported compression method {method} for entry {name}")]
    UnsupportedCompression { name: String, method: u16 },

    /// Deflate stream could not be inflated
    #[error("Failed to inflate entry {name}: {message}")]
    Inflate { name: String, message: String },
}

/// A pyramid level whose axis rank falls outside the supported set
#[derive(Debug, Clone, Error)]
pub enum LayoutError {
    #[error("Unsupported layout at level {level}: rank {rank} (expected 2 to 5 axes)")]
    UnsupportedRank { level: usize, rank: usize },
}

/// Errors raised when opening a multi-resolution container
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// I/O error while reading the container
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// ZIP archive could not be parsed
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Level axis layout is not displayable
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// The locator is neither a directory nor a ZIP archive
    #[error("Not a multi-resolution container: {locator} ({reason})")]
    NotAContainer { locator: String, reason: String },

    /// The container holds no readable pyramid level
    #[error("No pyramid levels found in {0}")]
    NoLevels(String),

    /// Metadata document is missing a field or fails to parse
    #[error("Invalid metadata in {path}: {message}")]
    InvalidMetadata { path: String, message: String },

    /// Chunk codec, filter or memory order is not supported
    #[error("Unsupported codec in {path}: {codec}")]
    UnsupportedCodec { path: String, codec: String },

    /// Sample data type is not supported
    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// Stored chunk bytes do not decode to the declared chunk shape
    #[error("Corrupt chunk data in {path}: {message}")]
    CorruptChunk { path: String, message: String },

    /// Store failure surfaced while the array reader fetched a key
    #[error("Storage error in {path}: {message}")]
    Storage { path: String, message: String },

    /// Level index beyond the pyramid
    #[error("Invalid level: {level} (pyramid has {count} levels)")]
    InvalidLevel { level: usize, count: usize },
}

/// Errors from region extraction
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Raw region dims do not match the level layout
    #[error("Unexpected region shape {dims:?} for level {level}")]
    UnexpectedShape { level: usize, dims: Vec<usize> },
}

/// A malformed annotation document; recovered by skipping the document
#[derive(Debug, Clone, Error)]
pub enum AnnotationParseError {
    #[error("Invalid JSON in {document}: {message}")]
    Json { document: String, message: String },

    #[error("Invalid annotation level record in {document}: {message}")]
    LevelRecord { document: String, message: String },

    #[error("Invalid feature in {document}: {message}")]
    Feature { document: String, message: String },
}

/// Errors from producing a display frame
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("No image loaded")]
    NoImageLoaded,

    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// Frame channel count outside {1, 3, 4}
    #[error("Unexpected channel count: {0}")]
    UnexpectedChannels(usize),

    /// Frame buffer length does not match its dimensions
    #[error("Frame buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}
