//! A synchronous in-memory store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    Bytes, DirEntries, DirEntry, EntryKind, ListableStorageTraits, MaybeBytes, NodePath,
    ReadableStorageTraits, StorageError, StorageLock, StorageLockGuard, WritableStorageTraits,
};

#[derive(Debug, Clone)]
enum MemoryEntry {
    File(Bytes),
    Directory,
}

/// A synchronous in-memory store.
///
/// Top level entries have an implicit, always present, parent directory.
#[derive(Debug)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<NodePath, MemoryEntry>>,
    locks: Arc<Mutex<BTreeSet<NodePath>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::default(),
            locks: Arc::default(),
        }
    }

    /// Check that the parent of `path` is a directory.
    fn check_parent(
        entries: &BTreeMap<NodePath, MemoryEntry>,
        path: &NodePath,
    ) -> Result<(), StorageError> {
        match path.parent() {
            None => Ok(()),
            Some(parent) => match entries.get(&parent) {
                Some(MemoryEntry::Directory) => Ok(()),
                Some(MemoryEntry::File(_)) => {
                    Err(StorageError::Other(format!("{parent} is not a directory")))
                }
                None => Err(StorageError::NotFound(path.clone())),
            },
        }
    }
}

struct MemoryLockGuard {
    locks: Arc<Mutex<BTreeSet<NodePath>>>,
    path: NodePath,
}

impl StorageLockGuard for MemoryLockGuard {
    fn release(self: Box<Self>) -> Result<(), StorageError> {
        self.locks.lock().remove(&self.path);
        Ok(())
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self, path: &NodePath) -> Result<MaybeBytes, StorageError> {
        let entries = self.entries.lock();
        match entries.get(path) {
            Some(MemoryEntry::File(bytes)) => Ok(Some(bytes.clone())),
            Some(MemoryEntry::Directory) | None => Ok(None),
        }
    }

    fn entry_kind(&self, path: &NodePath) -> Result<Option<EntryKind>, StorageError> {
        let entries = self.entries.lock();
        Ok(entries.get(path).map(|entry| match entry {
            MemoryEntry::File(_) => EntryKind::File,
            MemoryEntry::Directory => EntryKind::Directory,
        }))
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, path: &NodePath, value: Bytes) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        Self::check_parent(&entries, path)?;
        if let Some(MemoryEntry::Directory) = entries.get(path) {
            return Err(StorageError::Other(format!("{path} is a directory")));
        }
        entries.insert(path.clone(), MemoryEntry::File(value));
        Ok(())
    }

    fn create_new(&self, path: &NodePath, value: Bytes) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        Self::check_parent(&entries, path)?;
        if entries.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.clone()));
        }
        entries.insert(path.clone(), MemoryEntry::File(value));
        Ok(())
    }

    fn create_dir(&self, path: &NodePath) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        Self::check_parent(&entries, path)?;
        if entries.contains_key(path) {
            return Err(StorageError::AlreadyExists(path.clone()));
        }
        entries.insert(path.clone(), MemoryEntry::Directory);
        Ok(())
    }

    fn create_dir_all(&self, path: &NodePath) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        let mut ancestor = String::new();
        for segment in path.segments() {
            if !ancestor.is_empty() {
                ancestor.push('/');
            }
            ancestor.push_str(segment);
            let ancestor_path = NodePath::new(ancestor.as_str())?;
            match entries.get(&ancestor_path) {
                Some(MemoryEntry::Directory) => {}
                Some(MemoryEntry::File(_)) => {
                    return Err(StorageError::Other(format!(
                        "{ancestor_path} is not a directory"
                    )));
                }
                None => {
                    entries.insert(ancestor_path, MemoryEntry::Directory);
                }
            }
        }
        Ok(())
    }

    fn erase_tree(&self, path: &NodePath) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(path));
        log::debug!("Erased {} entries under {path}", before - entries.len());
        Ok(())
    }

    fn lock(&self, path: &NodePath) -> Result<StorageLock, StorageError> {
        if !self.entries.lock().contains_key(path) {
            return Err(StorageError::NotFound(path.clone()));
        }
        if !self.locks.lock().insert(path.clone()) {
            return Err(StorageError::Locked(path.clone()));
        }
        Ok(StorageLock::new(
            path.clone(),
            MemoryLockGuard {
                locks: self.locks.clone(),
                path: path.clone(),
            },
        ))
    }
}

impl ListableStorageTraits for MemoryStore {
    fn list_dir(&self, path: &NodePath) -> Result<DirEntries, StorageError> {
        let entries = self.entries.lock();
        match entries.get(path) {
            Some(MemoryEntry::Directory) => {}
            Some(MemoryEntry::File(_)) => {
                return Err(StorageError::Other(format!("{path} is not a directory")));
            }
            None => return Err(StorageError::NotFound(path.clone())),
        }
        let prefix = format!("{path}/");
        Ok(entries
            .iter()
            .filter_map(|(key, entry)| {
                key.as_str()
                    .strip_prefix(prefix.as_str())
                    .map(|name| (name, entry))
            })
            .filter(|(name, _)| !name.contains('/'))
            .map(|(name, entry)| {
                let kind = match entry {
                    MemoryEntry::File(_) => EntryKind::File,
                    MemoryEntry::Directory => EntryKind::Directory,
                };
                DirEntry::new(name.to_string(), kind)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store_test;

    #[test]
    fn memory_store() -> Result<(), Box<dyn std::error::Error>> {
        let store = MemoryStore::new();
        store_test::store_write(&store)?;
        store_test::store_read(&store)?;
        store_test::store_list(&store)?;
        store_test::store_erase(&store)?;
        store_test::store_lock(&store)?;
        Ok(())
    }
}
