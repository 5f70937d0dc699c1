//! Binary persistence for the event store.
//!
//! File layout (all integers little-endian):
//!
//! ```text
//! magic:        u32 = 0x00415041
//! version:      u32 = 1
//! event_count:  u32
//! event_count × timestamp: i64 (seconds since epoch), oldest first
//! ```
//!
//! Readers reject an unknown magic or version but accept a body shorter than
//! declared, keeping whatever whole entries are present.

use crate::core::store::{ActivityRecord, EventStore};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

/// Identifies an APM data file.
pub const MAGIC: u32 = 0x0041_5041;

/// Current (and only) format version.
pub const FORMAT_VERSION: u32 = 1;

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 12;

/// Size of one encoded record in bytes.
pub const RECORD_LEN: usize = 8;

/// Most records reserved up front while decoding.
const PREALLOC_LIMIT: usize = 64 * 1024;

/// File header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: u32,
    pub version: u32,
    pub event_count: u32,
}

impl FileHeader {
    pub fn new(event_count: u32) -> Self {
        Self {
            magic: MAGIC,
            version: FORMAT_VERSION,
            event_count,
        }
    }

    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.event_count.to_le_bytes());
        buf
    }

    fn from_bytes(buf: &[u8; HEADER_LEN]) -> Self {
        let word = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
        Self {
            magic: word(0),
            version: word(4),
            event_count: word(8),
        }
    }

    /// Check magic and version.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.magic != MAGIC {
            return Err(FormatError::BadMagic(self.magic));
        }
        if self.version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The file was written with this many records
    Written(usize),
    /// The store was empty, nothing was written
    SkippedEmpty,
}

/// Write the store to `path`, creating the parent directory if needed.
///
/// An empty store is a no-op and leaves any existing file untouched. An
/// existing file is overwritten in place.
pub fn save(store: &EventStore, path: &Path) -> Result<SaveOutcome, PersistError> {
    if store.is_empty() {
        return Ok(SaveOutcome::SkippedEmpty);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    let written = encode(store, &mut writer)?;
    writer.flush()?;

    Ok(SaveOutcome::Written(written))
}

/// Encode the store into `writer`. Returns the number of records written.
pub fn encode<W: Write>(store: &EventStore, writer: &mut W) -> Result<usize, PersistError> {
    let count = u32::try_from(store.len()).map_err(|_| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("{} events do not fit in the file header", store.len()),
        )
    })?;

    writer.write_all(&FileHeader::new(count).to_bytes())?;
    for record in store.chronological() {
        writer.write_all(&record.timestamp.to_le_bytes())?;
    }

    Ok(store.len())
}

/// Read records from `path`, keeping at most the newest `capacity`.
///
/// A missing file yields an empty list.
pub fn load(path: &Path, capacity: usize) -> Result<Vec<ActivityRecord>, PersistError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    decode(&mut BufReader::new(file), capacity)
}

/// Decode a data file from `reader`, keeping at most the newest `capacity`
/// records. A body that ends early is not an error.
pub fn decode<R: Read>(
    reader: &mut R,
    capacity: usize,
) -> Result<Vec<ActivityRecord>, PersistError> {
    let mut header_buf = [0u8; HEADER_LEN];
    reader.read_exact(&mut header_buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => PersistError::Format(FormatError::TruncatedHeader),
        _ => PersistError::Io(e),
    })?;

    let header = FileHeader::from_bytes(&header_buf);
    header.validate()?;

    let declared = header.event_count as usize;
    // The declared count is untrusted; grow as entries actually arrive.
    let mut kept: VecDeque<ActivityRecord> =
        VecDeque::with_capacity(declared.min(capacity).min(PREALLOC_LIMIT));
    let mut entry = [0u8; RECORD_LEN];

    for _ in 0..declared {
        match reader.read_exact(&mut entry) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                tracing::warn!(
                    declared,
                    read = kept.len(),
                    "Data file ends before its declared event count"
                );
                break;
            }
            Err(e) => return Err(e.into()),
        }

        if capacity == 0 {
            continue;
        }
        if kept.len() == capacity {
            kept.pop_front();
        }
        kept.push_back(ActivityRecord::new(i64::from_le_bytes(entry)));
    }

    Ok(kept.into())
}

/// Load `path` into `store`, replacing its contents.
///
/// On any error the store is left untouched. Returns the number of records
/// now held.
pub fn restore(store: &mut EventStore, path: &Path) -> Result<usize, PersistError> {
    let records = load(path, store.capacity())?;
    store.replace_all(records);
    Ok(store.len())
}

/// Delete the data file. A missing file counts as success.
pub fn remove(path: &Path) -> Result<bool, PersistError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Reasons a data file is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    BadMagic(u32),
    UnsupportedVersion(u32),
    /// The file is shorter than its header
    TruncatedHeader,
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::BadMagic(m) => write!(f, "invalid data file format (magic {m:#010x})"),
            FormatError::UnsupportedVersion(v) => write!(f, "unsupported data file version: {v}"),
            FormatError::TruncatedHeader => write!(f, "data file header is truncated"),
        }
    }
}

impl std::error::Error for FormatError {}

/// Persistence errors.
#[derive(Debug)]
pub enum PersistError {
    Io(io::Error),
    Format(FormatError),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "IO error: {e}"),
            PersistError::Format(e) => write!(f, "Format error: {e}"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Io(e) => Some(e),
            PersistError::Format(e) => Some(e),
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(e: io::Error) -> Self {
        PersistError::Io(e)
    }
}

impl From<FormatError> for PersistError {
    fn from(e: FormatError) -> Self {
        PersistError::Format(e)
    }
}
