//! A synchronous single-file store.

use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use thiserror::Error;

use crate::byte_range::{ByteOffset, ByteRange, InvalidByteRangeError};
use crate::{Bytes, ReadableStorageTraits, StorageError, WritableStorageTraits};

/// How a [`FileStore`] opens its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStoreOpenMode {
    /// Create the file, truncating it if it exists.
    Create,
    /// Open an existing file for reading and writing.
    ReadWrite,
    /// Open an existing file for reading only.
    ReadOnly,
}

/// A synchronous store backed by one file.
///
/// All reads and writes go through a single handle guarded by a mutex,
/// so the file position is never shared between concurrent callers.
/// Once [closed](WritableStorageTraits::close), every operation returns [`StorageError::Closed`].
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    readonly: bool,
    file: Mutex<Option<File>>,
}

impl FileStore {
    /// Create (or truncate) the file at `path`.
    ///
    /// # Errors
    /// Returns a [`FileStoreCreateError`] if the path is not valid or the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, FileStoreCreateError> {
        Self::new_with_mode(path, FileStoreOpenMode::Create)
    }

    /// Open the existing file at `path` for reading and writing.
    ///
    /// # Errors
    /// Returns a [`FileStoreCreateError`] if the path is not valid or the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FileStoreCreateError> {
        Self::new_with_mode(path, FileStoreOpenMode::ReadWrite)
    }

    /// Open the existing file at `path` for reading only.
    ///
    /// # Errors
    /// Returns a [`FileStoreCreateError`] if the path is not valid or the file cannot be opened.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, FileStoreCreateError> {
        Self::new_with_mode(path, FileStoreOpenMode::ReadOnly)
    }

    /// Open the file at `path` with the given `mode`.
    ///
    /// # Errors
    /// Returns a [`FileStoreCreateError`] if the path is not valid or the file cannot be opened.
    pub fn new_with_mode<P: AsRef<Path>>(
        path: P,
        mode: FileStoreOpenMode,
    ) -> Result<Self, FileStoreCreateError> {
        let path = path.as_ref().to_path_buf();
        if path.to_str().is_none() || path.as_os_str().is_empty() {
            return Err(FileStoreCreateError::InvalidPath(path));
        }

        let mut flags = OpenOptions::new();
        match mode {
            FileStoreOpenMode::Create => flags.read(true).write(true).create(true).truncate(true),
            FileStoreOpenMode::ReadWrite => flags.read(true).write(true),
            FileStoreOpenMode::ReadOnly => flags.read(true),
        };
        let file = flags
            .open(&path)
            .map_err(|source| FileStoreCreateError::IOError {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            readonly: mode == FileStoreOpenMode::ReadOnly,
            file: Mutex::new(Some(file)),
        })
    }

    /// Return the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if the store was opened read only.
    #[must_use]
    pub const fn readonly(&self) -> bool {
        self.readonly
    }

    fn file(&self) -> Result<MappedMutexGuard<'_, File>, StorageError> {
        MutexGuard::try_map(self.file.lock(), Option::as_mut).map_err(|_| StorageError::Closed)
    }
}

/// Close `file`, returning any error reported by the operating system.
///
/// Dropping a [`File`] discards the result of `close(2)`,
/// which is where some filesystems report deferred write errors.
///
/// # Errors
/// Returns an [`std::io::Error`] if the file cannot be closed.
pub fn close_file(file: File) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::fd::IntoRawFd;

        let fd = file.into_raw_fd();
        // SAFETY: `fd` is owned and closed exactly once
        if unsafe { libc::close(fd) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        drop(file);
        Ok(())
    }
}

impl ReadableStorageTraits for FileStore {
    fn get_byte_range(&self, byte_range: ByteRange) -> Result<Bytes, StorageError> {
        let mut file = self.file()?;
        let size = file.metadata()?.len();
        if !byte_range.is_valid(size) {
            return Err(InvalidByteRangeError::new(byte_range, size).into());
        }
        let range = byte_range.to_range(size);
        let length = usize::try_from(range.end - range.start).map_err(|err| err.to_string())?;
        file.seek(SeekFrom::Start(range.start))?;
        let mut buffer = vec![0; length];
        file.read_exact(&mut buffer)?;
        Ok(Bytes::from(buffer))
    }

    fn size(&self) -> Result<u64, StorageError> {
        Ok(self.file()?.metadata()?.len())
    }
}

impl WritableStorageTraits for FileStore {
    fn set_partial(&self, offset: ByteOffset, value: &[u8]) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        let mut file = self.file()?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(value)?;
        Ok(())
    }

    fn set_size(&self, size: u64) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        self.file()?.set_len(size)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        let mut file = self.file()?;
        if !self.readonly {
            file.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        let Some(file) = self.file.lock().take() else {
            return Ok(());
        };
        close_file(file)?;
        Ok(())
    }
}

/// A file store creation error.
#[derive(Debug, Error)]
pub enum FileStoreCreateError {
    /// An IO error.
    #[error("failed to open {path}: {source}")]
    IOError {
        /// The path that failed to open.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
    /// The path is not valid on this system.
    #[error("path {0} is not valid")]
    InvalidPath(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_invalid_path() {
        assert!(matches!(
            FileStore::create(""),
            Err(FileStoreCreateError::InvalidPath(_))
        ));
    }

    #[test]
    fn file_store_read_only_rejects_writes() -> Result<(), Box<dyn std::error::Error>> {
        let file = tempfile::NamedTempFile::new()?;
        let store = FileStore::open_read_only(file.path())?;
        assert!(store.readonly());
        assert!(matches!(
            store.set_partial(0, &[1]),
            Err(StorageError::ReadOnly)
        ));
        assert!(matches!(store.set_size(4), Err(StorageError::ReadOnly)));
        Ok(())
    }

    #[test]
    fn file_store_close() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("value.bin");
        let store = FileStore::create(&path)?;
        store.set_partial(0, &[1, 2, 3])?;
        store.close()?;

        assert!(matches!(store.size(), Err(StorageError::Closed)));
        assert!(matches!(store.set_partial(0, &[4]), Err(StorageError::Closed)));
        assert!(matches!(store.flush(), Err(StorageError::Closed)));
        // closing twice is a no-op
        store.close()?;
        assert_eq!(std::fs::read(&path)?, vec![1, 2, 3]);
        Ok(())
    }

    #[test]
    fn close_file_reports_success() -> Result<(), Box<dyn std::error::Error>> {
        let file = tempfile::tempfile()?;
        close_file(file)?;
        Ok(())
    }
}
