//! Files.
//!
//! A [`File`] binds a storage root at a location to its root [`Group`].
//! A location is a storage root if it holds a [`MARKER_FILE_NAME`] marker file.

use std::sync::Arc;

use dirvol_storage::{
    resolve, NodeName, NodePath, NodePathError, ReadableStorageTraits, StorageError,
    WritableStorageTraits,
};
use thiserror::Error;

use crate::{
    config::Config,
    group::{Group, GroupError},
};

/// The name of the marker file identifying a storage root.
pub const MARKER_FILE_NAME: &str = "TUTORIAL_VOL_CONNECTOR_FILE";

/// The path of the marker file of a storage root at `location`.
pub(crate) fn marker_path(location: &NodePath) -> Result<NodePath, StorageError> {
    Ok(resolve(location, &NodeName::new(MARKER_FILE_NAME)?, None))
}

/// A file error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum FileError {
    /// A storage root already exists at the location.
    #[error("storage root {0} already exists")]
    AlreadyExists(NodePath),
    /// There is no storage root at the location.
    #[error("storage root {0} not found")]
    NotFound(NodePath),
    /// An invalid location.
    #[error(transparent)]
    InvalidLocation(#[from] NodePathError),
    /// A storage error.
    #[error(transparent)]
    StorageError(StorageError),
}

impl From<StorageError> for FileError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists(path) => Self::AlreadyExists(path),
            StorageError::NotFound(path) => Self::NotFound(path),
            err => Self::StorageError(err),
        }
    }
}

impl From<GroupError> for FileError {
    fn from(err: GroupError) -> Self {
        match err {
            GroupError::AlreadyExists(path) => Self::AlreadyExists(path),
            GroupError::NotFound(path) | GroupError::NotAGroup(path) => Self::NotFound(path),
            GroupError::InvalidName(err) => Self::StorageError(err.into()),
            GroupError::StorageError(err) => Self::StorageError(err),
        }
    }
}

/// An open file.
pub struct File<TStorage: ?Sized> {
    root: Group<TStorage>,
}

impl<TStorage: ?Sized> std::fmt::Debug for File<TStorage> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File").field("root", &self.root).finish()
    }
}

impl<TStorage: ?Sized> File<TStorage> {
    /// Return the root group.
    #[must_use]
    pub fn root(&self) -> &Group<TStorage> {
        &self.root
    }

    /// Return the location of the storage root.
    #[must_use]
    pub fn location(&self) -> &NodePath {
        self.root.path()
    }

    /// Close the file and its root group.
    pub fn close(self) {
        let location = self.location().clone();
        self.root.close();
        log::debug!("Closed file {location}");
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits + WritableStorageTraits> File<TStorage> {
    /// Create a storage root at `location` and return the open file.
    ///
    /// # Errors
    /// Returns a [`FileError`] if
    ///  - `location` is not a valid node path,
    ///  - a storage root already exists at `location`, or
    ///  - there is an underlying store error.
    pub fn create(storage: Arc<TStorage>, location: &str, config: Config) -> Result<Self, FileError> {
        let location = NodePath::new(location)?;
        let root = Group::create_root(storage, &location, config)?;
        Ok(Self { root })
    }

    /// Recursively delete everything at `location`, deepest entries first.
    ///
    /// Deletion is best effort: entries that cannot be removed are skipped and reported together.
    /// A missing `location` is not an error.
    ///
    /// # Errors
    /// Returns a [`FileError`] if
    ///  - `location` is not a valid node path,
    ///  - some entries could not be removed ([`StorageError::IncompleteErase`]), or
    ///  - there is an underlying store error.
    pub fn delete(storage: &TStorage, location: &str) -> Result<(), FileError> {
        let location = NodePath::new(location)?;
        storage.erase_tree(&location)?;
        log::debug!("Deleted file {location}");
        Ok(())
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> File<TStorage> {
    /// Open the storage root at `location`.
    ///
    /// # Errors
    /// Returns a [`FileError`] if
    ///  - `location` is not a valid node path,
    ///  - there is no storage root at `location`, or
    ///  - there is an underlying store error.
    pub fn open(storage: Arc<TStorage>, location: &str, config: Config) -> Result<Self, FileError> {
        let location = NodePath::new(location)?;
        let root = Group::open_root(storage, &location, config)?;
        Ok(Self { root })
    }

    /// Returns true if `location` is a storage root.
    ///
    /// Nothing is opened.
    ///
    /// # Errors
    /// Returns a [`FileError`] if
    ///  - `location` is not a valid node path, or
    ///  - there is an underlying store error.
    pub fn is_accessible(storage: &TStorage, location: &str) -> Result<bool, FileError> {
        let location = NodePath::new(location)?;
        Ok(storage.exists(&marker_path(&location)?)?)
    }
}
