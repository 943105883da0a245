//! The host-facing connector.
//!
//! A [`Connector`] serves a host that addresses open objects by integer [`ObjectId`]s rather than by owned handles.
//! It keeps a table of open [`ObjectRecord`]s over a single storage.
//!
//! An identifier is valid from the call that opened or created its object until the matching close call.
//! Using an unknown or closed identifier is a [`ConnectorError::InvalidHandle`] error, and using an identifier of the wrong kind is a [`ConnectorError::WrongKind`] error.
//! Closing an object does not close objects opened through it.

use std::collections::BTreeMap;

use derive_more::{Display, From};
use dirvol_storage::{ReadableWritableListableStorage, ReadableWritableListableStorageTraits};
use thiserror::Error;

use crate::{
    config::Config,
    dataset::{Dataset, DatasetError, ElementType},
    file::{File, FileError},
    group::{Group, GroupError},
};

type Storage = dyn ReadableWritableListableStorageTraits;

/// The identifier of an open object in a [`Connector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From)]
#[display("{_0}")]
pub struct ObjectId(u64);

/// The kind of an open object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum ObjectKind {
    /// A file.
    #[display("file")]
    File,
    /// A group.
    #[display("group")]
    Group,
    /// A dataset.
    #[display("dataset")]
    Dataset,
}

/// An open object.
#[derive(Debug)]
pub enum ObjectRecord {
    /// An open file.
    File(File<Storage>),
    /// An open group.
    Group(Group<Storage>),
    /// An open dataset.
    Dataset(Dataset<Storage>),
}

impl ObjectRecord {
    /// Return the object kind.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::File(_) => ObjectKind::File,
            Self::Group(_) => ObjectKind::Group,
            Self::Dataset(_) => ObjectKind::Dataset,
        }
    }
}

/// A connector error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ConnectorError {
    /// The identifier is not an open object.
    #[error("{0} is not an open object")]
    InvalidHandle(ObjectId),
    /// The object is of a kind that cannot be used in the operation.
    #[error("object {id} is a {kind}, which cannot be used here")]
    WrongKind {
        /// The object identifier.
        id: ObjectId,
        /// The object kind.
        kind: ObjectKind,
    },
    /// A file error.
    #[error(transparent)]
    FileError(#[from] FileError),
    /// A group error.
    #[error(transparent)]
    GroupError(#[from] GroupError),
    /// A dataset error.
    #[error(transparent)]
    DatasetError(#[from] DatasetError),
}

/// A table of open objects over a storage.
pub struct Connector {
    storage: ReadableWritableListableStorage,
    config: Config,
    objects: BTreeMap<ObjectId, ObjectRecord>,
    next_id: u64,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("config", &self.config)
            .field("objects", &self.objects)
            .finish_non_exhaustive()
    }
}

impl Connector {
    /// Create a connector over `storage` with no open objects.
    #[must_use]
    pub fn new(storage: ReadableWritableListableStorage, config: Config) -> Self {
        Self {
            storage,
            config,
            objects: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Return the underlying storage.
    #[must_use]
    pub fn storage(&self) -> &ReadableWritableListableStorage {
        &self.storage
    }

    /// Return the configuration applied to opened files.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Return the number of open objects.
    #[must_use]
    pub fn open_objects(&self) -> usize {
        self.objects.len()
    }

    /// Return the kind of the open object `id`.
    ///
    /// # Errors
    /// Returns [`ConnectorError::InvalidHandle`] if `id` is not an open object.
    pub fn kind(&self, id: ObjectId) -> Result<ObjectKind, ConnectorError> {
        Ok(self.object(id)?.kind())
    }

    /// Return the open object `id`.
    ///
    /// # Errors
    /// Returns [`ConnectorError::InvalidHandle`] if `id` is not an open object.
    pub fn object(&self, id: ObjectId) -> Result<&ObjectRecord, ConnectorError> {
        self.objects
            .get(&id)
            .ok_or(ConnectorError::InvalidHandle(id))
    }

    /// Return the open dataset `id`.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if `id` is not an open dataset.
    pub fn dataset(&self, id: ObjectId) -> Result<&Dataset<Storage>, ConnectorError> {
        match self.object(id)? {
            ObjectRecord::Dataset(dataset) => Ok(dataset),
            record => Err(ConnectorError::WrongKind {
                id,
                kind: record.kind(),
            }),
        }
    }

    fn dataset_mut(&mut self, id: ObjectId) -> Result<&mut Dataset<Storage>, ConnectorError> {
        match self.objects.get_mut(&id) {
            Some(ObjectRecord::Dataset(dataset)) => Ok(dataset),
            Some(record) => Err(ConnectorError::WrongKind {
                id,
                kind: record.kind(),
            }),
            None => Err(ConnectorError::InvalidHandle(id)),
        }
    }

    /// The group that children of `parent` are created in: the root group of a file, or a group.
    fn parent_group(&self, parent: ObjectId) -> Result<&Group<Storage>, ConnectorError> {
        match self.object(parent)? {
            ObjectRecord::File(file) => Ok(file.root()),
            ObjectRecord::Group(group) => Ok(group),
            ObjectRecord::Dataset(_) => Err(ConnectorError::WrongKind {
                id: parent,
                kind: ObjectKind::Dataset,
            }),
        }
    }

    fn insert(&mut self, record: ObjectRecord) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        self.objects.insert(id, record);
        id
    }

    fn remove(&mut self, id: ObjectId, kind: ObjectKind) -> Result<ObjectRecord, ConnectorError> {
        let found = self.object(id)?.kind();
        if found != kind {
            return Err(ConnectorError::WrongKind { id, kind: found });
        }
        self.objects
            .remove(&id)
            .ok_or(ConnectorError::InvalidHandle(id))
    }

    /// Create a storage root at `location` and open it.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if the file cannot be created, see [`File::create`].
    pub fn file_create(&mut self, location: &str) -> Result<ObjectId, ConnectorError> {
        let file = File::create(self.storage.clone(), location, self.config.clone())?;
        Ok(self.insert(ObjectRecord::File(file)))
    }

    /// Open the storage root at `location`.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if the file cannot be opened, see [`File::open`].
    pub fn file_open(&mut self, location: &str) -> Result<ObjectId, ConnectorError> {
        let file = File::open(self.storage.clone(), location, self.config.clone())?;
        Ok(self.insert(ObjectRecord::File(file)))
    }

    /// Close the file `id`.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if `id` is not an open file.
    pub fn file_close(&mut self, id: ObjectId) -> Result<(), ConnectorError> {
        if let ObjectRecord::File(file) = self.remove(id, ObjectKind::File)? {
            file.close();
        }
        Ok(())
    }

    /// Returns true if `location` is a storage root.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if `location` is invalid or there is an underlying store error.
    pub fn file_is_accessible(&self, location: &str) -> Result<bool, ConnectorError> {
        Ok(File::is_accessible(&*self.storage, location)?)
    }

    /// Recursively delete everything at `location`.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if the deletion fails, see [`File::delete`].
    pub fn file_delete(&self, location: &str) -> Result<(), ConnectorError> {
        Ok(File::delete(&*self.storage, location)?)
    }

    /// Create the group `name` in `parent`, a file or group.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if
    ///  - `parent` is not an open file or group, or
    ///  - the group cannot be created, see [`Group::create_child`].
    pub fn group_create(&mut self, parent: ObjectId, name: &str) -> Result<ObjectId, ConnectorError> {
        let group = self.parent_group(parent)?.create_child(name)?;
        Ok(self.insert(ObjectRecord::Group(group)))
    }

    /// Open the group `name` in `parent`, a file or group.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if
    ///  - `parent` is not an open file or group, or
    ///  - the group cannot be opened, see [`Group::open_child`].
    pub fn group_open(&mut self, parent: ObjectId, name: &str) -> Result<ObjectId, ConnectorError> {
        let group = self.parent_group(parent)?.open_child(name)?;
        Ok(self.insert(ObjectRecord::Group(group)))
    }

    /// Close the group `id`.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if `id` is not an open group.
    pub fn group_close(&mut self, id: ObjectId) -> Result<(), ConnectorError> {
        if let ObjectRecord::Group(group) = self.remove(id, ObjectKind::Group)? {
            group.close();
        }
        Ok(())
    }

    /// Create the dataset `name` in `parent`, a file or group.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if
    ///  - `parent` is not an open file or group, or
    ///  - the dataset cannot be created, see [`Dataset::create`].
    pub fn dataset_create(
        &mut self,
        parent: ObjectId,
        name: &str,
        extent: u64,
        element_type: ElementType,
        fill_value: i32,
    ) -> Result<ObjectId, ConnectorError> {
        let dataset = Dataset::create(
            self.parent_group(parent)?,
            name,
            extent,
            element_type,
            fill_value,
        )?;
        Ok(self.insert(ObjectRecord::Dataset(dataset)))
    }

    /// Open the dataset `name` in `parent`, a file or group.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if
    ///  - `parent` is not an open file or group, or
    ///  - the dataset cannot be opened, see [`Dataset::open`].
    pub fn dataset_open(&mut self, parent: ObjectId, name: &str) -> Result<ObjectId, ConnectorError> {
        let dataset = Dataset::open(self.parent_group(parent)?, name)?;
        Ok(self.insert(ObjectRecord::Dataset(dataset)))
    }

    /// Read all elements of the dataset `id` into the start of `elements`.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if
    ///  - `id` is not an open dataset, or
    ///  - the read fails, see [`Dataset::read`].
    pub fn dataset_read(&self, id: ObjectId, elements: &mut [i32]) -> Result<(), ConnectorError> {
        Ok(self.dataset(id)?.read(elements)?)
    }

    /// Replace the contents of the dataset `id` with `count` elements, or `count` fill values if `elements` is [`None`].
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if
    ///  - `id` is not an open dataset, or
    ///  - the write fails, see [`Dataset::write`].
    pub fn dataset_write(
        &mut self,
        id: ObjectId,
        count: u64,
        elements: Option<&[i32]>,
    ) -> Result<(), ConnectorError> {
        Ok(self.dataset_mut(id)?.write(count, elements)?)
    }

    /// Close the dataset `id`, releasing its lock.
    ///
    /// # Errors
    /// Returns a [`ConnectorError`] if
    ///  - `id` is not an open dataset, or
    ///  - the lock cannot be released.
    pub fn dataset_close(&mut self, id: ObjectId) -> Result<(), ConnectorError> {
        if let ObjectRecord::Dataset(dataset) = self.remove(id, ObjectKind::Dataset)? {
            dataset.close()?;
        }
        Ok(())
    }
}
