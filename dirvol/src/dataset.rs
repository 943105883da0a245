//! Datasets.
//!
//! A [`Dataset`] is a named, typed, resizable one-dimensional array of elements with a fill value.
//! It is stored as a directory within its parent group holding four artifacts, see [`ArtifactKind`]:
//! ```text
//! <name>/
//!   <name>.dataspace   the element count
//!   <name>.datatype    the element type tag
//!   <name>.fillval     the fill value
//!   <name>.data        one element per line
//! ```
//!
//! An open [`Dataset`] holds an exclusive lock on its directory, so at most one handle can read or write a dataset at a time.
//! Writes replace the whole data artifact and then the dataspace artifact, each with an atomic store [`set`](dirvol_storage::WritableStorageTraits::set).

mod artifact;
mod dataset_errors;
mod element_type;

pub use artifact::{ArtifactDecodeError, ArtifactKind};
pub use dataset_errors::DatasetError;
pub use element_type::ElementType;

use std::sync::Arc;

use dirvol_storage::{
    resolve, Bytes, EntryKind, MaybeBytes, NodeName, NodePath, ReadableStorageTraits,
    StorageLock, WritableStorageTraits,
};

use crate::{
    config::{Config, TypeTagPolicy},
    group::Group,
};

use artifact::{
    decode_element_type_tag, decode_elements_into, decode_extent, decode_fill_value,
    encode_element_type, encode_elements, encode_extent, encode_fill_value,
};

/// An open dataset.
///
/// The dataset directory lock is released when the dataset is [closed](Dataset::close) or dropped.
pub struct Dataset<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    name: NodeName,
    path: NodePath,
    element_type: ElementType,
    fill_value: i32,
    extent: u64,
    config: Config,
    lock: StorageLock,
}

impl<TStorage: ?Sized> std::fmt::Debug for Dataset<TStorage> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("element_type", &self.element_type)
            .field("fill_value", &self.fill_value)
            .field("extent", &self.extent)
            .field("config", &self.config)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}

impl<TStorage: ?Sized> Dataset<TStorage> {
    /// Return the dataset name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Return the dataset path.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// Return the number of elements in the dataset.
    #[must_use]
    pub fn extent(&self) -> u64 {
        self.extent
    }

    /// Return the declared element type.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Return the fill value.
    #[must_use]
    pub fn fill_value(&self) -> i32 {
        self.fill_value
    }

    fn artifact_path(&self, artifact: ArtifactKind) -> NodePath {
        artifact.path(&self.path, &self.name)
    }

    fn extent_usize(&self) -> Result<usize, DatasetError> {
        usize::try_from(self.extent).map_err(|_| DatasetError::ExtentTooLarge(self.extent))
    }

    /// Close the dataset, releasing its lock.
    ///
    /// The artifacts are left exactly as last written.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if the lock cannot be released.
    pub fn close(self) -> Result<(), DatasetError> {
        let Self { path, lock, .. } = self;
        lock.release()?;
        log::debug!("Closed dataset {path}");
        Ok(())
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits + WritableStorageTraits> Dataset<TStorage> {
    /// Create a dataset `name` in `parent` with `extent` elements of `element_type`, all set to `fill_value`.
    ///
    /// Artifacts are written in the order datatype, fill value, dataspace, data.
    /// If creation fails after the dataset directory was made, the directory is erased unless disabled with [`Config::set_cleanup_failed_create`].
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if
    ///  - `name` is not a valid node name,
    ///  - the dataset directory already exists, or
    ///  - there is an underlying store error.
    pub fn create(
        parent: &Group<TStorage>,
        name: &str,
        extent: u64,
        element_type: ElementType,
        fill_value: i32,
    ) -> Result<Self, DatasetError> {
        let name = NodeName::new(name)?;
        let storage = parent.storage().clone();
        let path = resolve(parent.path(), &name, None);
        storage.create_dir(&path)?;

        let config = parent.config().clone();
        let cleanup = config.cleanup_failed_create();
        let lock = match storage.lock(&path) {
            Ok(lock) => lock,
            Err(err) => {
                if cleanup {
                    Self::erase_failed_create(&*storage, &path);
                }
                return Err(err.into());
            }
        };
        let dataset = Self {
            storage: storage.clone(),
            name,
            path: path.clone(),
            element_type,
            fill_value,
            extent,
            config,
            lock,
        };
        match dataset.write_new_artifacts() {
            Ok(()) => {
                log::debug!("Created dataset {path} with {extent} {element_type} elements");
                Ok(dataset)
            }
            Err(err) => {
                drop(dataset);
                if cleanup {
                    Self::erase_failed_create(&*storage, &path);
                }
                Err(err)
            }
        }
    }

    fn write_new_artifacts(&self) -> Result<(), DatasetError> {
        let fill_value = self.fill_value;
        self.storage.set(
            &self.artifact_path(ArtifactKind::Datatype),
            encode_element_type(self.element_type),
        )?;
        self.storage.set(
            &self.artifact_path(ArtifactKind::FillValue),
            encode_fill_value(fill_value),
        )?;
        self.storage.set(
            &self.artifact_path(ArtifactKind::Dataspace),
            encode_extent(self.extent),
        )?;
        self.storage.set(
            &self.artifact_path(ArtifactKind::Data),
            encode_elements((0..self.extent).map(|_| fill_value)),
        )?;
        Ok(())
    }

    fn erase_failed_create(storage: &TStorage, path: &NodePath) {
        match storage.erase_tree(path) {
            Ok(()) => log::debug!("Erased partially created dataset {path}"),
            Err(err) => log::warn!("Failed to erase partially created dataset {path}: {err}"),
        }
    }

    /// Open the existing dataset `name` in `parent`.
    ///
    /// The dataspace, fill value, and datatype artifacts are read in that order.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if
    ///  - `name` is not a valid node name,
    ///  - the dataset directory or any artifact is missing,
    ///  - the dataset is open elsewhere,
    ///  - an artifact is corrupt, or
    ///  - there is an underlying store error.
    pub fn open(parent: &Group<TStorage>, name: &str) -> Result<Self, DatasetError> {
        let name = NodeName::new(name)?;
        let storage = parent.storage().clone();
        let path = resolve(parent.path(), &name, None);
        if storage.entry_kind(&path)? != Some(EntryKind::Directory) {
            return Err(DatasetError::NotFound(path));
        }
        let lock = storage.lock(&path)?;
        let config = parent.config().clone();

        let extent = load_artifact(&*storage, &path, &name, ArtifactKind::Dataspace, decode_extent)?;
        let fill_value = load_artifact(
            &*storage,
            &path,
            &name,
            ArtifactKind::FillValue,
            decode_fill_value,
        )?;
        let tag = load_artifact(&*storage, &path, &name, ArtifactKind::Datatype, |bytes| {
            decode_element_type_tag(bytes).map(str::to_string)
        })?;
        let element_type = match ElementType::from_tag(&tag) {
            Some(element_type) => element_type,
            None => {
                let datatype_path = ArtifactKind::Datatype.path(&path, &name);
                match config.type_tag_policy() {
                    TypeTagPolicy::Strict => {
                        return Err(DatasetError::CorruptMetadata {
                            path: datatype_path,
                            tag,
                        });
                    }
                    TypeTagPolicy::Lenient => {
                        log::warn!(
                            "Unrecognised element type tag {tag:?} in {datatype_path}, reading as {}",
                            ElementType::Float32
                        );
                        ElementType::Float32
                    }
                }
            }
        };

        let data_path = ArtifactKind::Data.path(&path, &name);
        if storage.entry_kind(&data_path)? != Some(EntryKind::File) {
            return Err(DatasetError::NotFound(data_path));
        }

        log::debug!("Opened dataset {path} with {extent} {element_type} elements");
        Ok(Self {
            storage,
            name,
            path,
            element_type,
            fill_value,
            extent,
            config,
            lock,
        })
    }

    /// Read all elements into the start of `elements`.
    ///
    /// Elements beyond the dataset [extent](Dataset::extent) are left untouched.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if
    ///  - `elements` is shorter than the dataset extent,
    ///  - the data artifact is missing or does not hold exactly the extent of elements, or
    ///  - there is an underlying store error.
    pub fn read(&self, elements: &mut [i32]) -> Result<(), DatasetError> {
        let extent = self.extent_usize()?;
        if elements.len() < extent {
            return Err(DatasetError::BufferTooSmall {
                required: self.extent,
                capacity: elements.len(),
            });
        }
        let path = self.artifact_path(ArtifactKind::Data);
        let bytes = self
            .storage
            .get(&path)?
            .ok_or_else(|| DatasetError::NotFound(path.clone()))?;
        decode_elements_into(&bytes, &mut elements[..extent]).map_err(|source| {
            DatasetError::CorruptArtifact {
                artifact: ArtifactKind::Data,
                path,
                source,
            }
        })
    }

    /// Read all elements into a new [`Vec`].
    ///
    /// # Errors
    /// See [`Dataset::read`].
    pub fn read_vec(&self) -> Result<Vec<i32>, DatasetError> {
        let mut elements = vec![0; self.extent_usize()?];
        self.read(&mut elements)?;
        Ok(elements)
    }

    /// Replace the dataset contents with `count` elements.
    ///
    /// The elements are taken from `elements`, or are all the fill value if `elements` is [`None`].
    /// The dataset is resized to `count`.
    /// If the dataspace cannot be written after the data, the previous data is put back so the dataset keeps its previous contents.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if
    ///  - the length of `elements` is not `count`, or
    ///  - there is an underlying store error.
    pub fn write(&mut self, count: u64, elements: Option<&[i32]>) -> Result<(), DatasetError> {
        let data: Bytes = match elements {
            Some(elements) => {
                if elements.len() as u64 != count {
                    return Err(DatasetError::InvalidDataLength {
                        expected: count,
                        got: elements.len(),
                    });
                }
                encode_elements(elements.iter().copied())
            }
            None => {
                let fill_value = self.fill_value;
                encode_elements((0..count).map(|_| fill_value))
            }
        };

        let data_path = self.artifact_path(ArtifactKind::Data);
        let previous = self.storage.get(&data_path)?;
        self.storage.set(&data_path, data)?;
        if let Err(err) = self
            .storage
            .set(&self.artifact_path(ArtifactKind::Dataspace), encode_extent(count))
        {
            self.restore_data(&data_path, previous);
            return Err(err.into());
        }
        if count != self.extent {
            log::debug!(
                "Resized dataset {} from {} to {count} elements",
                self.path,
                self.extent
            );
        }
        self.extent = count;
        Ok(())
    }

    /// Put back the data artifact replaced by a write whose dataspace could not be written.
    fn restore_data(&self, data_path: &NodePath, previous: MaybeBytes) {
        let restored = match previous {
            Some(previous) => self.storage.set(data_path, previous),
            None => self.storage.erase_tree(data_path),
        };
        match restored {
            Ok(()) => log::debug!("Restored {data_path} after a failed write"),
            Err(err) => log::warn!("Failed to restore {data_path} after a failed write: {err}"),
        }
    }

    /// Replace the dataset contents with `elements`, resizing to their length.
    ///
    /// # Errors
    /// Returns a [`DatasetError`] if there is an underlying store error.
    pub fn store(&mut self, elements: &[i32]) -> Result<(), DatasetError> {
        self.write(elements.len() as u64, Some(elements))
    }
}

fn load_artifact<TStorage: ?Sized + ReadableStorageTraits, T>(
    storage: &TStorage,
    dataset_path: &NodePath,
    name: &NodeName,
    artifact: ArtifactKind,
    decode: impl FnOnce(&[u8]) -> Result<T, ArtifactDecodeError>,
) -> Result<T, DatasetError> {
    let path = artifact.path(dataset_path, name);
    let Some(bytes) = storage.get(&path)? else {
        return Err(DatasetError::NotFound(path));
    };
    decode(&bytes[..]).map_err(|source| DatasetError::CorruptArtifact {
        artifact,
        path,
        source,
    })
}

/// Returns true if `path` holds a dataset named `name`.
pub(crate) fn is_dataset<TStorage: ?Sized + ReadableStorageTraits>(
    storage: &TStorage,
    path: &NodePath,
    name: &NodeName,
) -> Result<bool, dirvol_storage::StorageError> {
    storage.exists(&ArtifactKind::Dataspace.path(path, name))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use dirvol_storage::{store::MemoryStore, StorageError};

    use super::*;
    use crate::file::File;

    fn memory_file() -> File<MemoryStore> {
        File::create(Arc::new(MemoryStore::new()), "file.h5tut", Config::default()).unwrap()
    }

    #[test]
    fn dataset_create_fill() {
        let file = memory_file();
        let dataset = Dataset::create(file.root(), "d", 10, ElementType::Int32, 1234).unwrap();
        assert_eq!(dataset.name(), "d");
        assert_eq!(dataset.path().as_str(), "file.h5tut/d");
        assert_eq!(dataset.extent(), 10);
        assert_eq!(dataset.element_type(), ElementType::Int32);
        assert_eq!(dataset.fill_value(), 1234);
        assert_eq!(dataset.read_vec().unwrap(), vec![1234; 10]);
    }

    #[test]
    fn dataset_write_read_resize() {
        let file = memory_file();
        let mut dataset = Dataset::create(file.root(), "d", 10, ElementType::Int32, 0).unwrap();
        let elements: Vec<i32> = (0..10).collect();
        dataset.write(10, Some(&elements)).unwrap();
        assert_eq!(dataset.read_vec().unwrap(), elements);

        dataset.store(&[5, -6]).unwrap();
        assert_eq!(dataset.extent(), 2);
        assert_eq!(dataset.read_vec().unwrap(), vec![5, -6]);

        dataset.write(4, None).unwrap();
        assert_eq!(dataset.read_vec().unwrap(), vec![0; 4]);

        dataset.write(0, Some(&[])).unwrap();
        assert!(dataset.read_vec().unwrap().is_empty());
    }

    #[test]
    fn dataset_read_buffer() {
        let file = memory_file();
        let dataset = Dataset::create(file.root(), "d", 3, ElementType::Int32, 9).unwrap();
        let mut small = [0; 2];
        assert!(matches!(
            dataset.read(&mut small),
            Err(DatasetError::BufferTooSmall {
                required: 3,
                capacity: 2
            })
        ));
        let mut large = [-1; 5];
        dataset.read(&mut large).unwrap();
        assert_eq!(large, [9, 9, 9, -1, -1]);
    }

    #[test]
    fn dataset_write_length_mismatch() {
        let file = memory_file();
        let mut dataset = Dataset::create(file.root(), "d", 3, ElementType::Int32, 9).unwrap();
        assert!(matches!(
            dataset.write(3, Some(&[1, 2])),
            Err(DatasetError::InvalidDataLength {
                expected: 3,
                got: 2
            })
        ));
        assert_eq!(dataset.read_vec().unwrap(), vec![9; 3]);
    }

    #[test]
    fn dataset_create_existing() {
        let file = memory_file();
        Dataset::create(file.root(), "d", 1, ElementType::Int32, 0)
            .unwrap()
            .close()
            .unwrap();
        assert!(matches!(
            Dataset::create(file.root(), "d", 1, ElementType::Int32, 0),
            Err(DatasetError::AlreadyExists(_))
        ));
        assert!(matches!(
            Dataset::create(file.root(), "a/b", 1, ElementType::Int32, 0),
            Err(DatasetError::InvalidName(_))
        ));
    }

    #[test]
    fn dataset_open_reopen() {
        let file = memory_file();
        let mut dataset = Dataset::create(file.root(), "d", 2, ElementType::Float32, -7).unwrap();
        dataset.store(&[1, 2, 3]).unwrap();
        dataset.close().unwrap();

        let dataset = Dataset::open(file.root(), "d").unwrap();
        assert_eq!(dataset.extent(), 3);
        assert_eq!(dataset.element_type(), ElementType::Float32);
        assert_eq!(dataset.fill_value(), -7);
        assert_eq!(dataset.read_vec().unwrap(), vec![1, 2, 3]);

        assert!(matches!(
            Dataset::open(file.root(), "missing"),
            Err(DatasetError::NotFound(_))
        ));
    }

    #[test]
    fn dataset_single_handle() {
        let file = memory_file();
        let dataset = Dataset::create(file.root(), "d", 1, ElementType::Int32, 0).unwrap();
        assert!(matches!(
            Dataset::open(file.root(), "d"),
            Err(DatasetError::Locked(_))
        ));
        dataset.close().unwrap();
        let dataset = Dataset::open(file.root(), "d").unwrap();
        drop(dataset);
        Dataset::open(file.root(), "d").unwrap();
    }

    #[test]
    fn dataset_open_missing_artifact() {
        let file = memory_file();
        Dataset::create(file.root(), "d", 1, ElementType::Int32, 0)
            .unwrap()
            .close()
            .unwrap();
        let storage = file.root().storage().clone();
        storage
            .erase_tree(&NodePath::new("file.h5tut/d/d.fillval").unwrap())
            .unwrap();
        let Err(DatasetError::NotFound(path)) = Dataset::open(file.root(), "d") else {
            panic!("expected a missing fill value artifact");
        };
        assert_eq!(path.as_str(), "file.h5tut/d/d.fillval");
    }

    #[test]
    fn dataset_corrupt_data() {
        let file = memory_file();
        let dataset = Dataset::create(file.root(), "d", 3, ElementType::Int32, 0).unwrap();
        let storage = file.root().storage().clone();
        storage
            .set(&NodePath::new("file.h5tut/d/d.data").unwrap(), "1\n2\n".into())
            .unwrap();
        assert!(matches!(
            dataset.read_vec(),
            Err(DatasetError::CorruptArtifact {
                artifact: ArtifactKind::Data,
                ..
            })
        ));
    }

    /// A memory store that fails to set artifacts with `extension` once armed.
    struct FailingStore {
        inner: MemoryStore,
        extension: &'static str,
        armed: AtomicBool,
    }

    impl FailingStore {
        fn new(extension: &'static str, armed: bool) -> Self {
            Self {
                inner: MemoryStore::new(),
                extension,
                armed: AtomicBool::new(armed),
            }
        }

        fn arm(&self) {
            self.armed.store(true, Ordering::SeqCst);
        }
    }

    impl ReadableStorageTraits for FailingStore {
        fn get(&self, path: &NodePath) -> Result<MaybeBytes, StorageError> {
            self.inner.get(path)
        }

        fn entry_kind(&self, path: &NodePath) -> Result<Option<EntryKind>, StorageError> {
            self.inner.entry_kind(path)
        }
    }

    impl WritableStorageTraits for FailingStore {
        fn set(&self, path: &NodePath, value: Bytes) -> Result<(), StorageError> {
            if self.armed.load(Ordering::SeqCst) && path.as_str().ends_with(self.extension) {
                Err(format!("failed to write {path}").into())
            } else {
                self.inner.set(path, value)
            }
        }

        fn create_new(&self, path: &NodePath, value: Bytes) -> Result<(), StorageError> {
            self.inner.create_new(path, value)
        }

        fn create_dir(&self, path: &NodePath) -> Result<(), StorageError> {
            self.inner.create_dir(path)
        }

        fn create_dir_all(&self, path: &NodePath) -> Result<(), StorageError> {
            self.inner.create_dir_all(path)
        }

        fn erase_tree(&self, path: &NodePath) -> Result<(), StorageError> {
            self.inner.erase_tree(path)
        }

        fn lock(&self, path: &NodePath) -> Result<StorageLock, StorageError> {
            self.inner.lock(path)
        }
    }

    #[test]
    fn dataset_create_cleanup() {
        let storage = Arc::new(FailingStore::new(".data", true));
        let file = File::create(storage.clone(), "file.h5tut", Config::default()).unwrap();
        assert!(matches!(
            Dataset::create(file.root(), "d", 2, ElementType::Int32, 0),
            Err(DatasetError::StorageError(StorageError::Other(_)))
        ));
        let path = NodePath::new("file.h5tut/d").unwrap();
        assert!(!storage.exists(&path).unwrap());

        let mut config = Config::default();
        config.set_cleanup_failed_create(false);
        let file = File::open(storage.clone(), "file.h5tut", config).unwrap();
        assert!(Dataset::create(file.root(), "d", 2, ElementType::Int32, 0).is_err());
        assert!(storage.exists(&path).unwrap());
        assert!(storage
            .exists(&NodePath::new("file.h5tut/d/d.dataspace").unwrap())
            .unwrap());
        assert!(matches!(
            Dataset::create(file.root(), "d", 2, ElementType::Int32, 0),
            Err(DatasetError::AlreadyExists(_))
        ));
    }

    #[test]
    fn dataset_write_dataspace_failure() {
        let storage = Arc::new(FailingStore::new(".dataspace", false));
        let file = File::create(storage.clone(), "file.h5tut", Config::default()).unwrap();
        let mut dataset = Dataset::create(file.root(), "d", 3, ElementType::Int32, 7).unwrap();

        storage.arm();
        assert!(matches!(
            dataset.write(5, Some(&[1, 2, 3, 4, 5])),
            Err(DatasetError::StorageError(StorageError::Other(_)))
        ));
        assert_eq!(dataset.extent(), 3);
        assert_eq!(dataset.read_vec().unwrap(), [7, 7, 7]);
        dataset.close().unwrap();

        let dataset = Dataset::open(file.root(), "d").unwrap();
        assert_eq!(dataset.extent(), 3);
        assert_eq!(dataset.read_vec().unwrap(), [7, 7, 7]);
    }

    #[test]
    fn dataset_type_tag_policy() {
        let storage = Arc::new(MemoryStore::new());
        let file = File::create(storage.clone(), "file.h5tut", Config::default()).unwrap();
        Dataset::create(file.root(), "d", 1, ElementType::Int32, 0)
            .unwrap()
            .close()
            .unwrap();
        storage
            .set(
                &NodePath::new("file.h5tut/d/d.datatype").unwrap(),
                "TUTORIAL_DATA_TYPE_DOUBLE\n".into(),
            )
            .unwrap();
        assert!(matches!(
            Dataset::open(file.root(), "d"),
            Err(DatasetError::CorruptMetadata { tag, .. }) if tag == "TUTORIAL_DATA_TYPE_DOUBLE"
        ));
        file.close();

        testing_logger::setup();
        let mut config = Config::default();
        config.set_type_tag_policy(TypeTagPolicy::Lenient);
        let file = File::open(storage, "file.h5tut", config).unwrap();
        let dataset = Dataset::open(file.root(), "d").unwrap();
        assert_eq!(dataset.element_type(), ElementType::Float32);
        testing_logger::validate(|captured_logs| {
            let warnings: Vec<_> = captured_logs
                .iter()
                .filter(|log| log.level == log::Level::Warn)
                .collect();
            assert_eq!(warnings.len(), 1);
            assert_eq!(
                warnings[0].body,
                "Unrecognised element type tag \"TUTORIAL_DATA_TYPE_DOUBLE\" in file.h5tut/d/d.datatype, reading as float32"
            );
        });
    }
}
