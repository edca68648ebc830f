//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Suffix of the scratch file used by [`FileBackend::replace`].
const TEMP_SUFFIX: &str = ".tmp";

/// A file-based storage backend.
///
/// # Durability
///
/// - `append` writes straight to the file; `sync()` makes it durable
/// - `replace` writes `<file>.tmp`, syncs it, then renames it over the
///   target, so a crash mid-write never leaves a truncated file behind
///
/// # Example
///
/// ```no_run
/// use komaldb_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("database.json")).unwrap();
/// backend.replace(br#"{"k":"v"}"#).unwrap();
/// assert_eq!(backend.read_all().unwrap(), br#"{"k":"v"}"#);
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    file: File,
    size: u64,
}

impl FileBackend {
    /// Opens or creates a file backend at the given path.
    ///
    /// Existing content is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if path.file_name().is_none() {
            return Err(StorageError::InvalidPath {
                path: path.to_path_buf(),
            });
        }
        let file = Self::open_file(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
        })
    }

    /// Opens or creates a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or file cannot be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Self::open(path)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_file(path: &Path) -> StorageResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(TEMP_SUFFIX);
        self.path.with_file_name(name)
    }
}

impl StorageBackend for FileBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))?;
        let mut buffer = Vec::with_capacity(usize::try_from(self.size).unwrap_or(0));
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.size;
        if data.is_empty() {
            return Ok(offset);
        }

        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(data)?;
        self.size += data.len() as u64;

        Ok(offset)
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        let temp = self.temp_path();
        {
            let mut scratch = File::create(&temp)?;
            scratch.write_all(data)?;
            scratch.sync_all()?;
        }
        if let Err(e) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        // The old handle still points at the unlinked inode.
        self.file = Self::open_file(&self.path)?;
        self.size = data.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.size)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
