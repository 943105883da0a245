//! The connector registry.
//!
//! A [`ConnectorRegistry`] holds a catalogue of available [`ConnectorClass`]es and tracks which of them are registered.
//! It is an explicit object constructed once by the host and passed to where it is needed; there is no process-wide registration state.
//!
//! Registering a connector that is already registered returns the same [`ConnectorId`] and increments its reference count.
//! The connector is unregistered once every registration has been [unregistered](ConnectorRegistry::unregister) or [closed](ConnectorRegistry::close).
//!
//! With the `filesystem` feature, [`ConnectorRegistry::new`] includes the builtin filesystem connector named [`TUTORIAL_VOL_CONNECTOR_NAME`] with value [`TUTORIAL_VOL_CONNECTOR_VALUE`].

use std::{collections::BTreeMap, path::Path, sync::Arc};

use derive_more::{Display, From};
use dirvol_storage::{ReadableWritableListableStorage, StorageError};
use parking_lot::RwLock;
use thiserror::Error;

use crate::{config::Config, connector::Connector};

/// The name of the builtin filesystem connector.
pub const TUTORIAL_VOL_CONNECTOR_NAME: &str = "tutorial_vol_connector";

/// The value of the builtin filesystem connector.
pub const TUTORIAL_VOL_CONNECTOR_VALUE: i32 = 198;

/// The version of the builtin filesystem connector.
pub const TUTORIAL_VOL_CONNECTOR_VERSION: u32 = 0;

/// A function that creates the storage of a connector from a base path.
pub type ConnectorStorageBuilder =
    Arc<dyn Fn(&Path) -> Result<ReadableWritableListableStorage, StorageError> + Send + Sync>;

/// An available connector.
#[derive(Clone)]
pub struct ConnectorClass {
    name: String,
    value: i32,
    version: u32,
    builder: ConnectorStorageBuilder,
}

impl std::fmt::Debug for ConnectorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorClass")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl ConnectorClass {
    /// Create a new connector class.
    pub fn new<F>(name: impl Into<String>, value: i32, version: u32, builder: F) -> Self
    where
        F: Fn(&Path) -> Result<ReadableWritableListableStorage, StorageError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            value,
            version,
            builder: Arc::new(builder),
        }
    }

    /// Return the connector name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the connector value.
    #[must_use]
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Return the connector version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Create the connector storage at `base_path`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the storage cannot be created.
    pub fn build(&self, base_path: &Path) -> Result<ReadableWritableListableStorage, StorageError> {
        (self.builder)(base_path)
    }
}

#[cfg(feature = "filesystem")]
/// The builtin connector, storing hierarchies with a [`FilesystemStore`](crate::filesystem::FilesystemStore).
#[must_use]
pub fn filesystem_connector_class() -> ConnectorClass {
    ConnectorClass::new(
        TUTORIAL_VOL_CONNECTOR_NAME,
        TUTORIAL_VOL_CONNECTOR_VALUE,
        TUTORIAL_VOL_CONNECTOR_VERSION,
        |base_path| {
            let store = dirvol_filesystem::FilesystemStore::new(base_path)
                .map_err(|err| StorageError::Other(err.to_string()))?;
            let storage: ReadableWritableListableStorage = Arc::new(store);
            Ok(storage)
        },
    )
}

/// The identifier of a registered connector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From)]
#[display("{_0}")]
pub struct ConnectorId(u64);

/// A connector registry error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// No available connector has the name.
    #[error("no connector named {0:?} is available")]
    UnknownName(String),
    /// No available connector has the value.
    #[error("no connector with value {0} is available")]
    UnknownValue(i32),
    /// The identifier is not a registered connector.
    #[error("{0} is not a registered connector identifier")]
    InvalidId(ConnectorId),
    /// An available connector already has the name.
    #[error("a connector named {0:?} is already available")]
    NameInUse(String),
    /// An available connector already has the value.
    #[error("a connector with value {0} is already available")]
    ValueInUse(i32),
    /// The connector storage could not be created.
    #[error(transparent)]
    StorageError(#[from] StorageError),
}

#[derive(Debug)]
struct Registration {
    class: ConnectorClass,
    count: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    classes: Vec<ConnectorClass>,
    registered: BTreeMap<ConnectorId, Registration>,
    next_id: u64,
}

impl RegistryState {
    fn register(&mut self, predicate: impl Fn(&ConnectorClass) -> bool) -> Option<ConnectorId> {
        if let Some((id, registration)) = self
            .registered
            .iter_mut()
            .find(|(_, registration)| predicate(&registration.class))
        {
            registration.count += 1;
            return Some(*id);
        }
        let class = self.classes.iter().find(|class| predicate(class))?.clone();
        self.next_id += 1;
        let id = ConnectorId(self.next_id);
        log::debug!("Registered connector {} as {id}", class.name());
        self.registered
            .insert(id, Registration { class, count: 1 });
        Some(id)
    }

    fn registration(&self, id: ConnectorId) -> Result<&Registration, RegistryError> {
        self.registered
            .get(&id)
            .ok_or(RegistryError::InvalidId(id))
    }
}

/// A connector registry.
#[derive(Debug)]
pub struct ConnectorRegistry {
    state: RwLock<RegistryState>,
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectorRegistry {
    /// Create a registry with the builtin connectors available and none registered.
    #[must_use]
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut classes = Vec::new();
        #[cfg(feature = "filesystem")]
        classes.push(filesystem_connector_class());
        Self {
            state: RwLock::new(RegistryState {
                classes,
                ..RegistryState::default()
            }),
        }
    }

    /// Create a registry with no connectors available.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Make `class` available for registration.
    ///
    /// # Errors
    /// Returns a [`RegistryError`] if an available connector has the same name or value.
    pub fn add_class(&self, class: ConnectorClass) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        if state.classes.iter().any(|c| c.name() == class.name()) {
            return Err(RegistryError::NameInUse(class.name));
        }
        if state.classes.iter().any(|c| c.value() == class.value()) {
            return Err(RegistryError::ValueInUse(class.value));
        }
        state.classes.push(class);
        Ok(())
    }

    /// Register the available connector named `name`.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownName`] if no available connector is named `name`.
    pub fn register_by_name(&self, name: &str) -> Result<ConnectorId, RegistryError> {
        self.state
            .write()
            .register(|class| class.name() == name)
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))
    }

    /// Register the available connector with value `value`.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownValue`] if no available connector has value `value`.
    pub fn register_by_value(&self, value: i32) -> Result<ConnectorId, RegistryError> {
        self.state
            .write()
            .register(|class| class.value() == value)
            .ok_or(RegistryError::UnknownValue(value))
    }

    /// Returns true if the connector named `name` is registered.
    #[must_use]
    pub fn is_registered_by_name(&self, name: &str) -> bool {
        self.connector_id_by_name(name).is_some()
    }

    /// Returns true if the connector with value `value` is registered.
    #[must_use]
    pub fn is_registered_by_value(&self, value: i32) -> bool {
        self.state
            .read()
            .registered
            .values()
            .any(|registration| registration.class.value() == value)
    }

    /// Return the identifier of the registered connector named `name`.
    ///
    /// The reference count is not changed.
    #[must_use]
    pub fn connector_id_by_name(&self, name: &str) -> Option<ConnectorId> {
        self.state
            .read()
            .registered
            .iter()
            .find(|(_, registration)| registration.class.name() == name)
            .map(|(id, _)| *id)
    }

    /// Return the name of the registered connector `id`.
    ///
    /// # Errors
    /// Returns [`RegistryError::InvalidId`] if `id` is not registered.
    pub fn connector_name(&self, id: ConnectorId) -> Result<String, RegistryError> {
        Ok(self.state.read().registration(id)?.class.name().to_string())
    }

    /// Return the value of the registered connector `id`.
    ///
    /// # Errors
    /// Returns [`RegistryError::InvalidId`] if `id` is not registered.
    pub fn connector_value(&self, id: ConnectorId) -> Result<i32, RegistryError> {
        Ok(self.state.read().registration(id)?.class.value())
    }

    /// Return the number of outstanding registrations of connector `id`.
    ///
    /// # Errors
    /// Returns [`RegistryError::InvalidId`] if `id` is not registered.
    pub fn reference_count(&self, id: ConnectorId) -> Result<usize, RegistryError> {
        Ok(self.state.read().registration(id)?.count)
    }

    /// Release one registration of connector `id`.
    ///
    /// The connector is unregistered when its last registration is released.
    ///
    /// # Errors
    /// Returns [`RegistryError::InvalidId`] if `id` is not registered.
    pub fn unregister(&self, id: ConnectorId) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        let Some(registration) = state.registered.get_mut(&id) else {
            return Err(RegistryError::InvalidId(id));
        };
        registration.count -= 1;
        if registration.count == 0 {
            if let Some(registration) = state.registered.remove(&id) {
                log::debug!("Unregistered connector {} ({id})", registration.class.name());
            }
        }
        Ok(())
    }

    /// Release one registration of connector `id`.
    ///
    /// Equivalent to [`ConnectorRegistry::unregister`].
    ///
    /// # Errors
    /// Returns [`RegistryError::InvalidId`] if `id` is not registered.
    pub fn close(&self, id: ConnectorId) -> Result<(), RegistryError> {
        self.unregister(id)
    }

    /// Create a [`Connector`] with the storage of connector `id` at `base_path`.
    ///
    /// # Errors
    /// Returns a [`RegistryError`] if
    ///  - `id` is not registered, or
    ///  - the connector storage cannot be created.
    pub fn connector(
        &self,
        id: ConnectorId,
        base_path: &Path,
        config: Config,
    ) -> Result<Connector, RegistryError> {
        let class = self.state.read().registration(id)?.class.clone();
        let storage = class.build(base_path)?;
        Ok(Connector::new(storage, config))
    }
}

#[cfg(test)]
mod tests {
    use dirvol_storage::store::MemoryStore;

    use super::*;

    fn memory_class(name: &str, value: i32) -> ConnectorClass {
        ConnectorClass::new(name, value, 1, |_| {
            let storage: ReadableWritableListableStorage = Arc::new(MemoryStore::new());
            Ok(storage)
        })
    }

    #[test]
    fn registry_register_counts() {
        let registry = ConnectorRegistry::empty();
        registry.add_class(memory_class("memory", 500)).unwrap();
        assert!(!registry.is_registered_by_name("memory"));

        let id = registry.register_by_name("memory").unwrap();
        assert_eq!(registry.register_by_value(500).unwrap(), id);
        assert_eq!(registry.reference_count(id).unwrap(), 2);
        assert_eq!(registry.connector_name(id).unwrap(), "memory");
        assert_eq!(registry.connector_value(id).unwrap(), 500);
        assert_eq!(registry.connector_id_by_name("memory"), Some(id));

        registry.unregister(id).unwrap();
        assert!(registry.is_registered_by_value(500));
        registry.close(id).unwrap();
        assert!(!registry.is_registered_by_value(500));
        assert!(matches!(
            registry.unregister(id),
            Err(RegistryError::InvalidId(_))
        ));

        let id_again = registry.register_by_value(500).unwrap();
        assert_ne!(id_again, id);
    }

    #[test]
    fn registry_unknown() {
        let registry = ConnectorRegistry::empty();
        assert!(matches!(
            registry.register_by_name("missing"),
            Err(RegistryError::UnknownName(_))
        ));
        assert!(matches!(
            registry.register_by_value(1),
            Err(RegistryError::UnknownValue(1))
        ));
        assert_eq!(registry.connector_id_by_name("missing"), None);
    }

    #[test]
    fn registry_add_class_clash() {
        let registry = ConnectorRegistry::empty();
        registry.add_class(memory_class("memory", 500)).unwrap();
        assert!(matches!(
            registry.add_class(memory_class("memory", 501)),
            Err(RegistryError::NameInUse(_))
        ));
        assert!(matches!(
            registry.add_class(memory_class("other", 500)),
            Err(RegistryError::ValueInUse(500))
        ));
    }

    #[test]
    fn registry_connector() {
        let registry = ConnectorRegistry::empty();
        registry.add_class(memory_class("memory", 500)).unwrap();
        let id = registry.register_by_name("memory").unwrap();
        let mut connector = registry
            .connector(id, Path::new("unused"), Config::default())
            .unwrap();
        let file = connector.file_create("f").unwrap();
        connector.file_close(file).unwrap();
    }
}
