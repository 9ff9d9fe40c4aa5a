//! Filesystem backend implementation.
//!
//! [`FileBackend`] persists its records as one archive file at
//! `<directory>/<relative_path>/storage_file`. The directory chain is created
//! when the backend is opened; the file itself is created lazily by the first
//! write, and a missing or empty file reads as an empty record list.
//!
//! Writes go to a sibling temp file that is renamed over the storage file, so
//! a reader never sees a half-written archive.
//!
//! ```no_run
//! use local_storage::{FileBackend, JsonEncoder, Storage};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut backend = FileBackend::open("/var/lib/app", "users")?;
//! backend.append(&"Karl".to_owned(), &JsonEncoder::new())?;
//! # Ok(())
//! # }
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use bytes::Bytes;
use tracing::{debug, instrument};

use crate::{
    archive,
    backend::{Backend, Record},
    error::{StorageError, StorageResult},
    storage::Storage,
};

/// Name of the archive file inside the storage directory.
pub const STORAGE_FILE_NAME: &str = "storage_file";

/// Writes `contents` to `path` through a temp file and a rename.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> StorageResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents).map_err(|e| StorageError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

/// Reads `path`, treating a missing file as empty.
pub(crate) fn read_or_empty(path: &Path) -> StorageResult<Bytes> {
    match fs::read(path) {
        Ok(contents) => Ok(Bytes::from(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Bytes::new()),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

/// Record list persisted in a single file.
#[derive(Debug, Clone)]
pub struct FileBackend {
    file: PathBuf,
    path: String,
}

impl FileBackend {
    /// Opens (creating directories as needed) the storage below `directory`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidPath`] if `relative_path` is empty, if a regular file sits where
    ///   the storage directory belongs, or if a directory sits where the storage file belongs.
    /// - [`StorageError::Io`] if the directories cannot be created.
    #[instrument(skip_all, fields(relative_path = %relative_path.as_ref().display()))]
    pub fn open(directory: impl AsRef<Path>, relative_path: impl AsRef<Path>) -> StorageResult<Self> {
        let relative_path = relative_path.as_ref();
        if relative_path.as_os_str().is_empty() {
            return Err(StorageError::invalid_path(relative_path, "relative path must not be empty"));
        }

        let storage_dir = directory.as_ref().join(relative_path);
        if storage_dir.exists() && !storage_dir.is_dir() {
            return Err(StorageError::invalid_path(&storage_dir, "a file exists where the storage directory belongs"));
        }
        fs::create_dir_all(&storage_dir).map_err(|e| StorageError::io(&storage_dir, e))?;

        let file = storage_dir.join(STORAGE_FILE_NAME);
        if file.is_dir() {
            return Err(StorageError::invalid_path(&file, "a directory exists where the storage file belongs"));
        }

        debug!(file = %file.display(), "opened file storage");
        let path = file.display().to_string();
        Ok(Self { file, path })
    }

    /// Returns the location of the archive file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Deletes the archive file from disk.
    ///
    /// The backend stays usable; the next write recreates the file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file exists but cannot be removed.
    pub fn delete(&self) -> StorageResult<()> {
        match fs::remove_file(&self.file) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&self.file, e)),
        }
    }
}

impl Backend for FileBackend {
    fn path(&self) -> &str {
        &self.path
    }

    fn raw_data(&self) -> StorageResult<Vec<Record>> {
        archive::decode(&self.path, read_or_empty(&self.file)?)
    }

    #[instrument(skip_all, fields(file = %self.path, records = records.len()))]
    fn set_raw_data(&mut self, records: Vec<Record>) -> StorageResult<()> {
        write_atomically(&self.file, &archive::encode(&self.path, &records)?)
    }
}

impl Storage for FileBackend {}
