use auto_impl::auto_impl;

use super::{
    Bytes, DirEntries, EntryKind, MaybeBytes, NodePath, StorageError, StorageLock,
};

/// Readable storage traits.
#[auto_impl(Arc)]
pub trait ReadableStorageTraits: Send + Sync {
    /// Retrieve the value (bytes) of the file at `path`.
    ///
    /// Returns [`None`] if there is no file at `path`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn get(&self, path: &NodePath) -> Result<MaybeBytes, StorageError>;

    /// Return the kind of the entry at `path`.
    ///
    /// Returns [`None`] if there is no entry at `path`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn entry_kind(&self, path: &NodePath) -> Result<Option<EntryKind>, StorageError>;

    /// Returns true if there is an entry of any kind at `path`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if there is an underlying storage error.
    fn exists(&self, path: &NodePath) -> Result<bool, StorageError> {
        Ok(self.entry_kind(path)?.is_some())
    }
}

/// Writable storage traits.
#[auto_impl(Arc)]
pub trait WritableStorageTraits: Send + Sync {
    /// Replace the value of the file at `path` with `value`, creating the file if it does not exist.
    ///
    /// The replacement is atomic: a concurrent reader observes either the old or the new value, never a mix.
    ///
    /// # Errors
    /// Returns [`StorageError::NotFound`] if the parent directory does not exist, or another [`StorageError`] on an underlying storage error.
    fn set(&self, path: &NodePath, value: Bytes) -> Result<(), StorageError>;

    /// Create a new file at `path` holding `value`.
    ///
    /// # Errors
    /// Returns [`StorageError::AlreadyExists`] if there is already an entry at `path`, [`StorageError::NotFound`] if the parent directory does not exist, or another [`StorageError`] on an underlying storage error.
    fn create_new(&self, path: &NodePath, value: Bytes) -> Result<(), StorageError>;

    /// Create a directory at `path` if and only if there is no entry there.
    ///
    /// # Errors
    /// Returns [`StorageError::AlreadyExists`] if there is already an entry at `path`, [`StorageError::NotFound`] if the parent directory does not exist, or another [`StorageError`] on an underlying storage error.
    fn create_dir(&self, path: &NodePath) -> Result<(), StorageError>;

    /// Create a directory at `path` and any missing ancestors.
    ///
    /// An existing directory is not an error.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if a file is in the way or on an underlying storage error.
    fn create_dir_all(&self, path: &NodePath) -> Result<(), StorageError>;

    /// Remove the entry at `path` and, if it is a directory, everything beneath it, deepest entries first.
    ///
    /// Removal is best effort: an entry that cannot be removed does not stop the removal of the others.
    /// A missing `path` is not an error.
    ///
    /// # Errors
    /// Returns [`StorageError::IncompleteErase`] listing every entry that could not be removed.
    fn erase_tree(&self, path: &NodePath) -> Result<(), StorageError>;

    /// Take an exclusive advisory lock on the entry at `path`.
    ///
    /// The lock is held until the returned [`StorageLock`] is released or dropped.
    ///
    /// # Errors
    /// Returns [`StorageError::Locked`] if the lock is held by another handle, [`StorageError::NotFound`] if there is no entry at `path`, or another [`StorageError`] on an underlying storage error.
    fn lock(&self, path: &NodePath) -> Result<StorageLock, StorageError>;
}

/// Listable storage traits.
#[auto_impl(Arc)]
pub trait ListableStorageTraits: Send + Sync {
    /// Retrieve the direct children of the directory at `path`, sorted by name.
    ///
    /// # Errors
    /// Returns [`StorageError::NotFound`] if there is no directory at `path`, or another [`StorageError`] on an underlying storage error.
    fn list_dir(&self, path: &NodePath) -> Result<DirEntries, StorageError>;
}

/// A supertrait of [`ReadableStorageTraits`], [`WritableStorageTraits`], and [`ListableStorageTraits`].
pub trait ReadableWritableListableStorageTraits:
    ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits
{
}

impl<T> ReadableWritableListableStorageTraits for T where
    T: ReadableStorageTraits + WritableStorageTraits + ListableStorageTraits + ?Sized
{
}
