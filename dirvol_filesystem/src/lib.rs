//! A filesystem store for the `dirvol` crate.
//!
//! Node paths map directly onto the filesystem beneath a base directory: directories are directories and values are regular files.
//! Values are replaced by writing a sibling staging file and renaming it over the target, so a value is never observed half written.
//!
//! ## Licence
//! `dirvol_filesystem` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.

use dirvol_storage::{
    Bytes, DirEntries, DirEntry, EntryKind, EraseFailure, ListableStorageTraits, MaybeBytes,
    NodePath, ReadableStorageTraits, StorageError, StorageLock, StorageLockGuard,
    WritableStorageTraits,
};

use itertools::Itertools;
use thiserror::Error;
use walkdir::WalkDir;

use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

/// The suffix of the staging files written by [`FilesystemStore`] before they are renamed over their target.
const STAGING_SUFFIX: &str = ".staging";

/// Options for use with [`FilesystemStore`]
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct FilesystemStoreOptions {
    sync_on_write: bool,
}

impl FilesystemStoreOptions {
    /// Set whether or not to flush written values to the storage device before they replace their target.
    pub fn sync_on_write(&mut self, sync_on_write: bool) -> &mut Self {
        self.sync_on_write = sync_on_write;
        self
    }
}

/// A synchronous file system store.
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
    readonly: bool,
    options: FilesystemStoreOptions,
}

impl FilesystemStore {
    /// Create a new file system store at a given `base_path`.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_directory`:
    ///   - is not valid, or
    ///   - it points to an existing file rather than a directory.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, FilesystemStoreCreateError> {
        Self::new_with_options(base_path, FilesystemStoreOptions::default())
    }

    /// Create a new file system store at a given `base_path` and `options`.
    ///
    /// The base directory is created if it does not exist.
    ///
    /// # Errors
    /// Returns a [`FilesystemStoreCreateError`] if `base_directory`:
    ///   - is not valid, or
    ///   - it points to an existing file rather than a directory.
    pub fn new_with_options<P: AsRef<Path>>(
        base_path: P,
        options: FilesystemStoreOptions,
    ) -> Result<Self, FilesystemStoreCreateError> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }

        let readonly = if base_path.exists() {
            // the path already exists, check it is a directory and if it is read only
            let md = std::fs::metadata(&base_path)?;
            if !md.is_dir() {
                return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
            }
            md.permissions().readonly()
        } else {
            // the path does not exist, so try and create it. If this succeeds, the filesystem is not read only
            std::fs::create_dir_all(&base_path)?;
            false
        };

        Ok(Self {
            base_path,
            readonly,
            options,
        })
    }

    /// Returns the base path of the store.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Maps a [`NodePath`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn node_to_fspath(&self, path: &NodePath) -> PathBuf {
        let mut fspath = self.base_path.clone();
        fspath.extend(path.segments());
        fspath
    }

    /// Maps a filesystem path beneath the base path to a displayable store path.
    fn fspath_to_string(&self, fspath: &Path) -> String {
        pathdiff::diff_paths(fspath, &self.base_path)
            .unwrap_or_else(|| fspath.to_path_buf())
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.readonly {
            Err(StorageError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// The sibling staging file used when replacing `fspath`.
    fn staging_fspath(fspath: &Path) -> PathBuf {
        let mut name = std::ffi::OsString::from(".");
        name.push(fspath.file_name().unwrap_or_default());
        name.push(STAGING_SUFFIX);
        fspath.with_file_name(name)
    }

    fn is_staging_name(name: &str) -> bool {
        name.starts_with('.') && name.ends_with(STAGING_SUFFIX)
    }

    fn write_file(&self, file: &mut File, value: &[u8]) -> std::io::Result<()> {
        file.write_all(value)?;
        if self.options.sync_on_write {
            file.sync_all()?;
        }
        Ok(())
    }
}

struct FilesystemLockGuard(File);

impl StorageLockGuard for FilesystemLockGuard {
    fn release(self: Box<Self>) -> Result<(), StorageError> {
        self.0.unlock()?;
        Ok(())
    }
}

impl ReadableStorageTraits for FilesystemStore {
    fn get(&self, path: &NodePath) -> Result<MaybeBytes, StorageError> {
        match std::fs::read(self.node_to_fspath(path)) {
            Ok(value) => Ok(Some(Bytes::from(value))),
            Err(err) => match err.kind() {
                ErrorKind::NotFound | ErrorKind::IsADirectory | ErrorKind::NotADirectory => {
                    Ok(None)
                }
                _ => Err(err.into()),
            },
        }
    }

    fn entry_kind(&self, path: &NodePath) -> Result<Option<EntryKind>, StorageError> {
        match std::fs::metadata(self.node_to_fspath(path)) {
            Ok(md) if md.is_dir() => Ok(Some(EntryKind::Directory)),
            Ok(_) => Ok(Some(EntryKind::File)),
            Err(err) => match err.kind() {
                ErrorKind::NotFound | ErrorKind::NotADirectory => Ok(None),
                _ => Err(err.into()),
            },
        }
    }
}

impl WritableStorageTraits for FilesystemStore {
    fn set(&self, path: &NodePath, value: Bytes) -> Result<(), StorageError> {
        self.check_writable()?;

        let fspath = self.node_to_fspath(path);
        let staging = Self::staging_fspath(&fspath);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&staging)
            .map_err(|err| StorageError::from_io(err, path))?;
        let written = self
            .write_file(&mut file, &value)
            .and_then(|()| std::fs::rename(&staging, &fspath));
        drop(file);
        if let Err(err) = written {
            if let Err(remove_err) = std::fs::remove_file(&staging) {
                log::warn!(
                    "Failed to remove staging file {}: {remove_err}",
                    staging.display()
                );
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn create_new(&self, path: &NodePath, value: Bytes) -> Result<(), StorageError> {
        self.check_writable()?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.node_to_fspath(path))
            .map_err(|err| StorageError::from_io(err, path))?;
        self.write_file(&mut file, &value)?;
        Ok(())
    }

    fn create_dir(&self, path: &NodePath) -> Result<(), StorageError> {
        self.check_writable()?;

        std::fs::create_dir(self.node_to_fspath(path))
            .map_err(|err| StorageError::from_io(err, path))
    }

    fn create_dir_all(&self, path: &NodePath) -> Result<(), StorageError> {
        self.check_writable()?;

        std::fs::create_dir_all(self.node_to_fspath(path))?;
        Ok(())
    }

    fn erase_tree(&self, path: &NodePath) -> Result<(), StorageError> {
        self.check_writable()?;

        let root = self.node_to_fspath(path);
        match std::fs::symlink_metadata(&root) {
            Ok(md) if md.is_dir() => {}
            Ok(_) => {
                return std::fs::remove_file(&root).map_err(|err| StorageError::from_io(err, path));
            }
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        // deepest entries first, never leaving the root's filesystem or following links out of the tree
        let mut failures = Vec::new();
        for entry in WalkDir::new(&root)
            .contents_first(true)
            .same_file_system(true)
            .follow_links(false)
        {
            match entry {
                Ok(entry) => {
                    let removed = if entry.file_type().is_dir() {
                        std::fs::remove_dir(entry.path())
                    } else {
                        std::fs::remove_file(entry.path())
                    };
                    if let Err(err) = removed {
                        log::warn!("Could not remove {}: {err}", entry.path().display());
                        failures.push(EraseFailure::new(
                            self.fspath_to_string(entry.path()),
                            err,
                        ));
                    }
                }
                Err(err) => {
                    let failed_path = err
                        .path()
                        .map_or_else(|| path.to_string(), |p| self.fspath_to_string(p));
                    log::warn!("Could not visit {failed_path}: {err}");
                    let err = err
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                    failures.push(EraseFailure::new(failed_path, err));
                }
            }
        }

        if failures.is_empty() {
            log::debug!("Erased {}", root.display());
            Ok(())
        } else {
            Err(StorageError::IncompleteErase {
                path: path.clone(),
                failures,
            })
        }
    }

    fn lock(&self, path: &NodePath) -> Result<StorageLock, StorageError> {
        let file = File::open(self.node_to_fspath(path))
            .map_err(|err| StorageError::from_io(err, path))?;
        match file.try_lock() {
            Ok(()) => Ok(StorageLock::new(path.clone(), FilesystemLockGuard(file))),
            Err(std::fs::TryLockError::WouldBlock) => Err(StorageError::Locked(path.clone())),
            Err(std::fs::TryLockError::Error(err)) => Err(err.into()),
        }
    }
}

impl ListableStorageTraits for FilesystemStore {
    fn list_dir(&self, path: &NodePath) -> Result<DirEntries, StorageError> {
        let dir = std::fs::read_dir(self.node_to_fspath(path))
            .map_err(|err| StorageError::from_io(err, path))?;
        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                log::warn!(
                    "Ignoring {} in {path}, its name is not valid UTF-8.",
                    entry.path().display()
                );
                continue;
            };
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            // staging files are always regular files
            if kind == EntryKind::File && Self::is_staging_name(&name) {
                continue;
            }
            entries.push(DirEntry::new(name, kind));
        }
        Ok(entries
            .into_iter()
            .sorted_by(|a, b| a.name().cmp(b.name()))
            .collect())
    }
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The path is not valid on this system.
    #[error("base path {0} is not valid")]
    InvalidBasePath(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_fspath() {
        let staging = FilesystemStore::staging_fspath(Path::new("/base/file.h5tut/dset/dset.data"));
        assert_eq!(staging, Path::new("/base/file.h5tut/dset/.dset.data.staging"));
        assert!(FilesystemStore::is_staging_name(".dset.data.staging"));
        assert!(!FilesystemStore::is_staging_name("dset.data"));
    }

    #[test]
    fn node_to_fspath() {
        let store = FilesystemStore {
            base_path: PathBuf::from("/base"),
            readonly: false,
            options: FilesystemStoreOptions::default(),
        };
        let path = NodePath::new("file.h5tut/group/dset").unwrap();
        assert_eq!(
            store.node_to_fspath(&path),
            Path::new("/base/file.h5tut/group/dset")
        );
        assert_eq!(
            store.fspath_to_string(Path::new("/base/file.h5tut/group")),
            "file.h5tut/group"
        );
    }
}
