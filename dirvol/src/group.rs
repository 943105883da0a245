//! Groups.
//!
//! A [`Group`] is a namespace node backed by a directory.
//! Its children are the child groups and datasets stored in that directory; the directory itself is the index.
//! A group keeps no open directory handle: each operation on it goes through the store, so [`Group::close`] releases nothing beyond the handle itself.
//!
//! The root group of a [`File`](crate::file::File) is identified by a marker file, see [`MARKER_FILE_NAME`](crate::file::MARKER_FILE_NAME).

use std::sync::Arc;

use dirvol_storage::{
    resolve, Bytes, EntryKind, ListableStorageTraits, NodeName, NodeNameError, NodePath,
    ReadableStorageTraits, StorageError, WritableStorageTraits,
};
use thiserror::Error;

use crate::{
    config::Config,
    dataset::is_dataset,
    file::marker_path,
    node::{Node, NodeKind},
};

/// A group error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum GroupError {
    /// The group, or a storage root at the location, already exists.
    #[error("{0} already exists")]
    AlreadyExists(NodePath),
    /// The group, or a storage root at the location, does not exist.
    #[error("{0} not found")]
    NotFound(NodePath),
    /// The node exists but is not a group.
    #[error("{0} is not a group")]
    NotAGroup(NodePath),
    /// An invalid group name.
    #[error(transparent)]
    InvalidName(#[from] NodeNameError),
    /// A storage error.
    #[error(transparent)]
    StorageError(StorageError),
}

impl From<StorageError> for GroupError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists(path) => Self::AlreadyExists(path),
            StorageError::NotFound(path) => Self::NotFound(path),
            err => Self::StorageError(err),
        }
    }
}

/// An open group.
pub struct Group<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    path: NodePath,
    config: Config,
}

impl<TStorage: ?Sized> std::fmt::Debug for Group<TStorage> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<TStorage: ?Sized> Group<TStorage> {
    /// Return the underlying storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<TStorage> {
        &self.storage
    }

    /// Return the group path.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Return the group name, the last segment of its path.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.file_name()
    }

    /// Return the configuration inherited by children of this group.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Close the group.
    ///
    /// The group holds no store resources, so this only consumes the handle.
    /// Children opened through this group remain open.
    pub fn close(self) {
        log::debug!("Closed group {}", self.path);
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits + WritableStorageTraits> Group<TStorage> {
    /// Create the root group of a storage root at `location`, writing its marker.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if
    ///  - a storage root already exists at `location`, or
    ///  - there is an underlying store error.
    pub fn create_root(
        storage: Arc<TStorage>,
        location: &NodePath,
        config: Config,
    ) -> Result<Self, GroupError> {
        let marker = marker_path(location)?;
        if storage.exists(&marker)? {
            return Err(GroupError::AlreadyExists(location.clone()));
        }
        storage.create_dir_all(location)?;
        storage
            .create_new(&marker, Bytes::new())
            .map_err(|err| match err {
                StorageError::AlreadyExists(_) => GroupError::AlreadyExists(location.clone()),
                err => err.into(),
            })?;
        log::debug!("Created root group {location}");
        Ok(Self {
            storage,
            path: location.clone(),
            config,
        })
    }

    /// Create the child group `name`.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if
    ///  - `name` is not a valid node name,
    ///  - a child `name` already exists, or
    ///  - there is an underlying store error.
    pub fn create_child(&self, name: &str) -> Result<Self, GroupError> {
        let name = NodeName::new(name)?;
        let path = resolve(&self.path, &name, None);
        self.storage.create_dir(&path)?;
        log::debug!("Created group {path}");
        Ok(self.child(path))
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits> Group<TStorage> {
    /// Open the root group of the storage root at `location`.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if
    ///  - there is no storage root at `location`, or
    ///  - there is an underlying store error.
    pub fn open_root(
        storage: Arc<TStorage>,
        location: &NodePath,
        config: Config,
    ) -> Result<Self, GroupError> {
        if !storage.exists(&marker_path(location)?)? {
            return Err(GroupError::NotFound(location.clone()));
        }
        log::debug!("Opened root group {location}");
        Ok(Self {
            storage,
            path: location.clone(),
            config,
        })
    }

    /// Open the existing child group `name`.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if
    ///  - `name` is not a valid node name,
    ///  - there is no child `name`,
    ///  - the child is a dataset or a file, or
    ///  - there is an underlying store error.
    pub fn open_child(&self, name: &str) -> Result<Self, GroupError> {
        let name = NodeName::new(name)?;
        let path = resolve(&self.path, &name, None);
        match self.storage.entry_kind(&path)? {
            None => Err(GroupError::NotFound(path)),
            Some(EntryKind::File) => Err(GroupError::NotAGroup(path)),
            Some(EntryKind::Directory) => {
                if is_dataset(&*self.storage, &path, &name)? {
                    return Err(GroupError::NotAGroup(path));
                }
                log::debug!("Opened group {path}");
                Ok(self.child(path))
            }
        }
    }

    fn child(&self, path: NodePath) -> Self {
        Self {
            storage: self.storage.clone(),
            path,
            config: self.config.clone(),
        }
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits> Group<TStorage> {
    /// Return the child groups and datasets, sorted by name.
    ///
    /// Plain files in the group directory, such as the storage root marker, are not children.
    ///
    /// # Errors
    /// Returns a [`GroupError`] if there is an underlying store error.
    pub fn children(&self) -> Result<Vec<Node>, GroupError> {
        let mut children = Vec::new();
        for entry in self.storage.list_dir(&self.path)? {
            if entry.kind() != EntryKind::Directory {
                continue;
            }
            let name = NodeName::new(entry.name())?;
            let path = resolve(&self.path, &name, None);
            let kind = if is_dataset(&*self.storage, &path, &name)? {
                NodeKind::Dataset
            } else {
                NodeKind::Group
            };
            children.push(Node::new(name, path, kind));
        }
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use dirvol_storage::store::MemoryStore;

    use super::*;
    use crate::dataset::{Dataset, ElementType};

    fn root() -> Group<MemoryStore> {
        Group::create_root(
            Arc::new(MemoryStore::new()),
            &NodePath::new("file.h5tut").unwrap(),
            Config::default(),
        )
        .unwrap()
    }

    #[test]
    fn group_root() {
        let storage = Arc::new(MemoryStore::new());
        let location = NodePath::new("file.h5tut").unwrap();
        assert!(matches!(
            Group::open_root(storage.clone(), &location, Config::default()),
            Err(GroupError::NotFound(_))
        ));
        let root = Group::create_root(storage.clone(), &location, Config::default()).unwrap();
        assert_eq!(root.path(), &location);
        assert_eq!(root.name(), "file.h5tut");
        assert!(matches!(
            Group::create_root(storage.clone(), &location, Config::default()),
            Err(GroupError::AlreadyExists(_))
        ));
        root.close();
        Group::open_root(storage, &location, Config::default()).unwrap();
    }

    #[test]
    fn group_children() {
        let root = root();
        let a = root.create_child("a").unwrap();
        assert_eq!(a.path().as_str(), "file.h5tut/a");
        let b = a.create_child("b").unwrap();
        assert_eq!(b.path().as_str(), "file.h5tut/a/b");
        assert!(matches!(
            root.create_child("a"),
            Err(GroupError::AlreadyExists(_))
        ));
        assert!(matches!(
            root.create_child(".."),
            Err(GroupError::InvalidName(_))
        ));
        assert!(matches!(
            root.open_child("missing"),
            Err(GroupError::NotFound(_))
        ));
        assert_eq!(root.open_child("a").unwrap().open_child("b").unwrap().path(), b.path());
    }

    #[test]
    fn group_list_children() {
        let root = root();
        root.create_child("z").unwrap();
        root.create_child("a").unwrap();
        Dataset::create(&root, "d", 1, ElementType::Int32, 0).unwrap();

        let children: Vec<_> = root
            .children()
            .unwrap()
            .into_iter()
            .map(|node| (node.name().to_string(), node.kind()))
            .collect();
        assert_eq!(
            children,
            [
                ("a".to_string(), NodeKind::Group),
                ("d".to_string(), NodeKind::Dataset),
                ("z".to_string(), NodeKind::Group),
            ]
        );
        assert!(matches!(
            root.open_child("d"),
            Err(GroupError::NotAGroup(_))
        ));
        assert!(matches!(
            root.open_child("TUTORIAL_VOL_CONNECTOR_FILE"),
            Err(GroupError::NotAGroup(_))
        ));
    }
}
