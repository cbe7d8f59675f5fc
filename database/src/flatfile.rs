use crate::{
    db::DB,
    errors::{StoreError, StoreResult},
    item::CachedDbItem,
    registry::DatabaseStorePrefixes,
    writer::DbWriter,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

/// Size of the per-record header: magic (4) | size (4) | crc32c (4)
pub const RECORD_HEADER_SIZE: u32 = 12;

/// A serialized handle pointing at a single record within the flat-file store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatFileLocation {
    pub file_index: u32,
    pub offset: u32,
    pub length: u32,
    pub checksum: u32,
}

/// The durable write position. Only advanced through a keyed-store batch which
/// also commits the metadata referencing any location before the cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
struct WriteCursor {
    file_index: u32,
    offset: u32,
}

struct CurrentFile {
    file: File,
    index: u32,
    offset: u32,
}

/// An append-only store of raw byte records split over rotating segment files.
/// Records are prefixed with the network magic, their length and a CRC32C
/// checksum so that torn writes are detectable on restart.
pub struct FlatFileStore {
    base_dir: PathBuf,
    magic: u32,
    max_file_size: u32,
    current: Mutex<CurrentFile>,
    cursor_item: Mutex<CachedDbItem<WriteCursor>>,
}

fn file_path(base_dir: &Path, index: u32) -> PathBuf {
    base_dir.join(format!("{:09}.fdb", index))
}

impl FlatFileStore {
    /// Opens the store rooted at `base_dir/name`, reconciling any bytes
    /// written after the committed cursor (a crash mid-append leaves them)
    pub fn open(db: Arc<DB>, base_dir: &Path, name: &str, magic: u32, max_file_size: u32) -> StoreResult<Self> {
        let base_dir = base_dir.join(name);
        std::fs::create_dir_all(&base_dir)?;

        let mut key = vec![DatabaseStorePrefixes::FlatFileCursors.into()];
        key.extend_from_slice(name.as_bytes());
        let cursor_item = CachedDbItem::<WriteCursor>::new(db, key);

        let cursor = match cursor_item.read() {
            Ok(cursor) => cursor,
            Err(StoreError::KeyNotFound(_)) => WriteCursor::default(),
            Err(e) => return Err(e),
        };

        Self::reconcile(&base_dir, cursor)?;

        let mut file = OpenOptions::new().create(true).read(true).append(true).open(file_path(&base_dir, cursor.file_index))?;
        file.seek(SeekFrom::Start(cursor.offset as u64))?;

        Ok(Self {
            base_dir,
            magic,
            max_file_size,
            current: Mutex::new(CurrentFile { file, index: cursor.file_index, offset: cursor.offset }),
            cursor_item: Mutex::new(cursor_item),
        })
    }

    /// Truncates any on-disk data past the committed cursor. Data *behind* the
    /// cursor is never touched; its absence indicates real corruption.
    fn reconcile(base_dir: &Path, cursor: WriteCursor) -> StoreResult<()> {
        // Drop whole files beyond the cursor file
        let mut index = cursor.file_index + 1;
        loop {
            let path = file_path(base_dir, index);
            if !path.exists() {
                break;
            }
            log::warn!("flat-file reconcile: removing uncommitted segment {}", path.display());
            std::fs::remove_file(path)?;
            index += 1;
        }

        let current_path = file_path(base_dir, cursor.file_index);
        let on_disk_len = if current_path.exists() { std::fs::metadata(&current_path)?.len() } else { 0 };
        match on_disk_len.cmp(&(cursor.offset as u64)) {
            std::cmp::Ordering::Greater => {
                log::warn!(
                    "flat-file reconcile: truncating {} from {} to committed cursor {}",
                    current_path.display(),
                    on_disk_len,
                    cursor.offset
                );
                let file = OpenOptions::new().write(true).open(&current_path)?;
                file.set_len(cursor.offset as u64)?;
            }
            std::cmp::Ordering::Less => {
                return Err(StoreError::FlatFileError(format!(
                    "segment {} is shorter ({}) than the committed cursor ({})",
                    current_path.display(),
                    on_disk_len,
                    cursor.offset
                )));
            }
            std::cmp::Ordering::Equal => {}
        }
        Ok(())
    }

    /// Appends a record, returning its location handle. The record is durable
    /// on disk when this returns, but only citable once the caller commits the
    /// cursor (see [`Self::commit_cursor`]) in the same batch as its metadata.
    pub fn append(&self, data: &[u8]) -> StoreResult<FlatFileLocation> {
        let mut current = self.current.lock();

        let record_len = RECORD_HEADER_SIZE + data.len() as u32;
        // Rotate when the record would overflow the segment (a single oversized
        // record still gets a fresh segment of its own)
        if current.offset > 0 && current.offset + record_len > self.max_file_size {
            let next_index = current.index + 1;
            let file = OpenOptions::new().create(true).read(true).append(true).open(file_path(&self.base_dir, next_index))?;
            *current = CurrentFile { file, index: next_index, offset: 0 };
        }

        let checksum = crc32c::crc32c(data);
        let mut header = [0u8; RECORD_HEADER_SIZE as usize];
        header[0..4].copy_from_slice(&self.magic.to_le_bytes());
        header[4..8].copy_from_slice(&(data.len() as u32).to_le_bytes());
        header[8..12].copy_from_slice(&checksum.to_le_bytes());

        let location = FlatFileLocation { file_index: current.index, offset: current.offset, length: record_len, checksum };

        current.file.write_all(&header)?;
        current.file.write_all(data)?;
        current.file.flush()?;
        current.offset += record_len;

        Ok(location)
    }

    /// Persists the in-memory write position through the given writer. Must be
    /// part of the same batch committing references to appended locations.
    pub fn commit_cursor(&self, writer: impl DbWriter) -> StoreResult<()> {
        let current = self.current.lock();
        let cursor = WriteCursor { file_index: current.index, offset: current.offset };
        self.cursor_item.lock().write(writer, &cursor)
    }

    /// Reads a record back, verifying magic and checksum
    pub fn read(&self, location: FlatFileLocation) -> StoreResult<Vec<u8>> {
        if location.length < RECORD_HEADER_SIZE {
            return Err(StoreError::FlatFileError(format!("record length {} is below the header size", location.length)));
        }
        let mut file = File::open(file_path(&self.base_dir, location.file_index))?;
        file.seek(SeekFrom::Start(location.offset as u64))?;

        let mut header = [0u8; RECORD_HEADER_SIZE as usize];
        file.read_exact(&mut header)?;
        let magic = u32::from_le_bytes(header[0..4].try_into().expect("slice is exactly 4 bytes"));
        let size = u32::from_le_bytes(header[4..8].try_into().expect("slice is exactly 4 bytes"));
        let checksum = u32::from_le_bytes(header[8..12].try_into().expect("slice is exactly 4 bytes"));

        if magic != self.magic {
            return Err(StoreError::FlatFileError(format!("wrong record magic {:#x}, expected {:#x}", magic, self.magic)));
        }
        if size != location.length - RECORD_HEADER_SIZE {
            return Err(StoreError::FlatFileError(format!(
                "record size mismatch: header says {} while the location says {}",
                size,
                location.length - RECORD_HEADER_SIZE
            )));
        }

        let mut data = vec![0u8; size as usize];
        file.read_exact(&mut data)?;
        if crc32c::crc32c(&data) != checksum || checksum != location.checksum {
            return Err(StoreError::FlatFileError("record checksum mismatch".to_string()));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{create_temp_db, DirectDbWriter};

    #[test]
    fn test_append_read_round_trip() {
        let (_lifetime, db) = create_temp_db();
        let tempdir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::open(db.clone(), tempdir.path(), "blocks", 0xdeadbeef, 1 << 20).unwrap();

        let loc1 = store.append(b"first block bytes").unwrap();
        let loc2 = store.append(b"second block bytes").unwrap();
        store.commit_cursor(DirectDbWriter::new(&db)).unwrap();

        assert_eq!(store.read(loc1).unwrap(), b"first block bytes");
        assert_eq!(store.read(loc2).unwrap(), b"second block bytes");
        assert!(loc2.offset > loc1.offset);
    }

    #[test]
    fn test_rotation() {
        let (_lifetime, db) = create_temp_db();
        let tempdir = tempfile::tempdir().unwrap();
        // Max size fits a single small record only
        let store = FlatFileStore::open(db.clone(), tempdir.path(), "blocks", 7, 40).unwrap();

        let loc1 = store.append(&[1u8; 16]).unwrap();
        let loc2 = store.append(&[2u8; 16]).unwrap();
        assert_eq!(loc1.file_index, 0);
        assert_eq!(loc2.file_index, 1);
        assert_eq!(store.read(loc2).unwrap(), vec![2u8; 16]);
    }

    #[test]
    fn test_reconcile_truncates_uncommitted_tail() {
        let (_lifetime, db) = create_temp_db();
        let tempdir = tempfile::tempdir().unwrap();

        let committed_loc = {
            let store = FlatFileStore::open(db.clone(), tempdir.path(), "blocks", 7, 1 << 20).unwrap();
            let committed = store.append(b"committed").unwrap();
            store.commit_cursor(DirectDbWriter::new(&db)).unwrap();
            // Appended but never committed - emulates a crash between the file
            // write and the metadata commit
            let _uncommitted = store.append(b"uncommitted").unwrap();
            committed
        };

        // Reopen: the store must roll back to the committed cursor
        let store = FlatFileStore::open(db.clone(), tempdir.path(), "blocks", 7, 1 << 20).unwrap();
        assert_eq!(store.read(committed_loc).unwrap(), b"committed");

        // A fresh append lands exactly where the uncommitted record once was
        let fresh = store.append(b"fresh").unwrap();
        assert_eq!(fresh.offset, committed_loc.offset + committed_loc.length);
        assert_eq!(store.read(fresh).unwrap(), b"fresh");
    }

    #[test]
    fn test_checksum_detection() {
        let (_lifetime, db) = create_temp_db();
        let tempdir = tempfile::tempdir().unwrap();
        let store = FlatFileStore::open(db.clone(), tempdir.path(), "blocks", 7, 1 << 20).unwrap();
        let loc = store.append(b"payload").unwrap();

        // A location citing a wrong checksum must be rejected
        let bad = FlatFileLocation { checksum: loc.checksum ^ 1, ..loc };
        assert!(matches!(store.read(bad), Err(StoreError::FlatFileError(_))));
    }
}
