//! ZIP central directory parsing for random-access archive reads.
//!
//! Only the archive tail and the central directory are read at open time.
//! Entry payloads are fetched on demand with two range reads (local header,
//! then data), so a multi-gigabyte archive is never decompressed as a whole.
//!
//! # Supported Subset
//!
//! - Single-disk archives, with or without ZIP64 records
//! - Stored (method 0) and deflated (method 8) entries
//! - CRC-32 values are carried but not verified

use std::collections::HashMap;
use std::io::Read;

use bytes::Bytes;
use flate2::read::DeflateDecoder;

use crate::error::ArchiveError;
use crate::io::{read_u16_le, read_u32_le, read_u64_le, RangeReader};

// =============================================================================
// Record Signatures and Sizes
// =============================================================================

/// Local file header signature ("PK\x03\x04")
pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4B50;

/// Central directory file header signature ("PK\x01\x02")
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4B50;

/// End of central directory signature ("PK\x05\x06")
pub const EOCD_SIGNATURE: u32 = 0x0605_4B50;

/// ZIP64 end of central directory record signature
const ZIP64_EOCD_SIGNATURE: u32 = 0x0606_4B50;

/// ZIP64 end of central directory locator signature
const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4B50;

const LOCAL_HEADER_SIZE: usize = 30;
const CENTRAL_HEADER_SIZE: usize = 46;
const EOCD_SIZE: usize = 22;
const ZIP64_LOCATOR_SIZE: usize = 20;
const ZIP64_EOCD_SIZE: usize = 56;

/// Largest possible archive comment
const MAX_COMMENT_SIZE: usize = u16::MAX as usize;

/// Extra field header id carrying 64-bit sizes and offsets
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Upper bound on the buffer reserved before inflating an entry
const MAX_PREALLOCATION: u64 = 4 * 1024 * 1024;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

// =============================================================================
// ZipEntry
// =============================================================================

/// One file recorded in the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    /// Entry name with `/` separators
    pub name: String,

    /// Compression method (0 = stored, 8 = deflate)
    pub method: u16,

    /// Size of the payload as stored in the archive
    pub compressed_size: u64,

    /// Size of the payload after inflation
    pub uncompressed_size: u64,

    /// Offset of the entry's local file header
    pub local_header_offset: u64,
}

impl ZipEntry {
    /// Whether this entry names a directory rather than a file.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

// =============================================================================
// ZipIndex
// =============================================================================

/// Parsed central directory of a ZIP archive.
#[derive(Debug, Clone, Default)]
pub struct ZipIndex {
    entries: Vec<ZipEntry>,
    by_name: HashMap<String, usize>,
}

impl ZipIndex {
    /// Parse the central directory of the archive behind `reader`.
    pub fn read<R: RangeReader + ?Sized>(reader: &R) -> Result<Self, ArchiveError> {
        let size = reader.size();
        if size < EOCD_SIZE as u64 {
            return Err(ArchiveError::Truncated("archive"));
        }

        let tail_len = std::cmp::min(size, (EOCD_SIZE + MAX_COMMENT_SIZE) as u64) as usize;
        let tail_offset = size - tail_len as u64;
        let tail = reader.read_exact_at(tail_offset, tail_len)?;

        let eocd_pos = find_eocd(&tail).ok_or(ArchiveError::MissingEndOfCentralDirectory)?;
        let eocd = &tail[eocd_pos..];

        let mut entry_count = read_u16_le(&eocd[10..]) as u64;
        let mut cd_size = read_u32_le(&eocd[12..]) as u64;
        let mut cd_offset = read_u32_le(&eocd[16..]) as u64;

        let needs_zip64 =
            entry_count == 0xFFFF || cd_size == 0xFFFF_FFFF || cd_offset == 0xFFFF_FFFF;
        let eocd_abs = tail_offset + eocd_pos as u64;
        if needs_zip64 && eocd_abs >= ZIP64_LOCATOR_SIZE as u64 {
            let locator =
                reader.read_exact_at(eocd_abs - ZIP64_LOCATOR_SIZE as u64, ZIP64_LOCATOR_SIZE)?;
            if read_u32_le(&locator) == ZIP64_LOCATOR_SIGNATURE {
                let record_offset = read_u64_le(&locator[8..]);
                let record = reader.read_exact_at(record_offset, ZIP64_EOCD_SIZE)?;
                let signature = read_u32_le(&record);
                if signature != ZIP64_EOCD_SIGNATURE {
                    return Err(ArchiveError::InvalidSignature {
                        record: "zip64 end of central directory",
                        found: signature,
                    });
                }
                entry_count = read_u64_le(&record[32..]);
                cd_size = read_u64_le(&record[40..]);
                cd_offset = read_u64_le(&record[48..]);
            }
        }

        if cd_offset.checked_add(cd_size).map_or(true, |end| end > size) {
            return Err(ArchiveError::Truncated("central directory"));
        }

        let directory = reader.read_exact_at(cd_offset, cd_size as usize)?;
        let entries = parse_central_directory(&directory, entry_count)?;

        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();

        Ok(Self { entries, by_name })
    }

    /// Entries in central-directory order.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// Look up an entry by exact name.
    pub fn get(&self, name: &str) -> Option<&ZipEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read and, when deflated, inflate an entry's payload.
    pub fn read_entry<R: RangeReader + ?Sized>(
        &self,
        reader: &R,
        entry: &ZipEntry,
    ) -> Result<Bytes, ArchiveError> {
        let header = reader.read_exact_at(entry.local_header_offset, LOCAL_HEADER_SIZE)?;
        let signature = read_u32_le(&header);
        if signature != LOCAL_HEADER_SIGNATURE {
            return Err(ArchiveError::InvalidSignature {
                record: "local file header",
                found: signature,
            });
        }

        let name_len = read_u16_le(&header[26..]) as u64;
        let extra_len = read_u16_le(&header[28..]) as u64;
        let data_offset = entry
            .local_header_offset
            .checked_add(LOCAL_HEADER_SIZE as u64 + name_len + extra_len)
            .ok_or(ArchiveError::Truncated("local file header"))?;
        let data_end = data_offset
            .checked_add(entry.compressed_size)
            .ok_or(ArchiveError::Truncated("entry payload"))?;
        if data_end > reader.size() {
            return Err(ArchiveError::Truncated("entry payload"));
        }

        let payload = reader.read_exact_at(data_offset, entry.compressed_size as usize)?;

        match entry.method {
            METHOD_STORED => Ok(payload),
            METHOD_DEFLATED => {
                // Size fields are untrusted; the inflated stream bounds the buffer
                let capacity = entry
                    .uncompressed_size
                    .min(payload.len() as u64 * 4)
                    .min(MAX_PREALLOCATION) as usize;
                let mut out = Vec::with_capacity(capacity);
                DeflateDecoder::new(&payload[..])
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut out)
                    .map_err(|e| ArchiveError::Inflate {
                        name: entry.name.clone(),
                        message: e.to_string(),
                    })?;
                if out.len() as u64 > entry.uncompressed_size {
                    return Err(ArchiveError::Inflate {
                        name: entry.name.clone(),
                        message: format!(
                            "inflates past its declared size of {} bytes",
                            entry.uncompressed_size
                        ),
                    });
                }
                Ok(Bytes::from(out))
            }
            method => Err(ArchiveError::UnsupportedCompression {
                name: entry.name.clone(),
                method,
            }),
        }
    }
}

/// Find the last end-of-central-directory signature in the archive tail.
fn find_eocd(tail: &[u8]) -> Option<usize> {
    if tail.len() < EOCD_SIZE {
        return None;
    }
    (0..=tail.len() - EOCD_SIZE)
        .rev()
        .find(|&i| read_u32_le(&tail[i..]) == EOCD_SIGNATURE)
}

fn parse_central_directory(data: &[u8], entry_count: u64) -> Result<Vec<ZipEntry>, ArchiveError> {
    let mut entries = Vec::with_capacity(entry_count.min(1 << 20) as usize);
    let mut pos = 0usize;

    for _ in 0..entry_count {
        if pos + CENTRAL_HEADER_SIZE > data.len() {
            return Err(ArchiveError::Truncated("central directory header"));
        }
        let header = &data[pos..];
        let signature = read_u32_le(header);
        if signature != CENTRAL_HEADER_SIGNATURE {
            return Err(ArchiveError::InvalidSignature {
                record: "central directory header",
                found: signature,
            });
        }

        let method = read_u16_le(&header[10..]);
        let mut compressed_size = read_u32_le(&header[20..]) as u64;
        let mut uncompressed_size = read_u32_le(&header[24..]) as u64;
        let name_len = read_u16_le(&header[28..]) as usize;
        let extra_len = read_u16_le(&header[30..]) as usize;
        let comment_len = read_u16_le(&header[32..]) as usize;
        let mut local_header_offset = read_u32_le(&header[42..]) as u64;

        let record_len = CENTRAL_HEADER_SIZE + name_len + extra_len + comment_len;
        if pos + record_len > data.len() {
            return Err(ArchiveError::Truncated("central directory header"));
        }

        let name_bytes = &header[CENTRAL_HEADER_SIZE..CENTRAL_HEADER_SIZE + name_len];
        let name = String::from_utf8_lossy(name_bytes).replace('\\', "/");

        let extra = &header[CENTRAL_HEADER_SIZE + name_len..CENTRAL_HEADER_SIZE + name_len + extra_len];
        apply_zip64_extra(
            extra,
            &mut uncompressed_size,
            &mut compressed_size,
            &mut local_header_offset,
        );

        entries.push(ZipEntry {
            name,
            method,
            compressed_size,
            uncompressed_size,
            local_header_offset,
        });

        pos += record_len;
    }

    Ok(entries)
}

/// Replace saturated 32-bit fields with their ZIP64 extra field values.
///
/// The extra field lists only the saturated fields, in fixed order.
fn apply_zip64_extra(
    mut extra: &[u8],
    uncompressed_size: &mut u64,
    compressed_size: &mut u64,
    local_header_offset: &mut u64,
) {
    while extra.len() >= 4 {
        let id = read_u16_le(extra);
        let len = read_u16_le(&extra[2..]) as usize;
        if extra.len() < 4 + len {
            return;
        }
        let mut field = &extra[4..4 + len];

        if id == ZIP64_EXTRA_ID {
            for target in [uncompressed_size, compressed_size, local_header_offset] {
                if *target == 0xFFFF_FFFF && field.len() >= 8 {
                    *target = read_u64_le(field);
                    field = &field[8..];
                }
            }
            return;
        }

        extra = &extra[4 + len..];
    }
}
