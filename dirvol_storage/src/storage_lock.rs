use crate::{NodePath, StorageError};

/// A store specific lock guard held by a [`StorageLock`].
pub trait StorageLockGuard: Send + Sync {
    /// Release the lock.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the underlying lock could not be released.
    fn release(self: Box<Self>) -> Result<(), StorageError>;
}

/// An exclusive lock on a store entry, see [`WritableStorageTraits::lock`](crate::WritableStorageTraits::lock).
///
/// The lock is held until [`StorageLock::release`] is called or the lock is dropped.
pub struct StorageLock {
    path: NodePath,
    guard: Option<Box<dyn StorageLockGuard>>,
}

impl StorageLock {
    /// Create a new [`StorageLock`] on `path` held by `guard`.
    #[must_use]
    pub fn new(path: NodePath, guard: impl StorageLockGuard + 'static) -> Self {
        Self {
            path,
            guard: Some(Box::new(guard)),
        }
    }

    /// Returns the locked path.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Release the lock.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the underlying lock could not be released.
    pub fn release(mut self) -> Result<(), StorageError> {
        match self.guard.take() {
            Some(guard) => guard.release(),
            None => Ok(()),
        }
    }
}

impl Drop for StorageLock {
    fn drop(&mut self) {
        if let Some(guard) = self.guard.take() {
            if let Err(err) = guard.release() {
                log::warn!("Failed to release the lock on {}: {err}", self.path);
            }
        }
    }
}

impl std::fmt::Debug for StorageLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageLock")
            .field("path", &self.path)
            .field("held", &self.guard.is_some())
            .finish()
    }
}
