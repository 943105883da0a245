//! `dirvol` configuration.
//!
//! A [`Config`] is supplied when a [`File`](crate::file::File) is created or opened and is cloned into every group and dataset handle beneath it.
//! There is no process-wide configuration.
//!
//! ## Type Tag Policy
//! > default: [`TypeTagPolicy::Strict`]
//!
//! Controls how an unrecognised datatype artifact is treated when a dataset is opened.
//! See [`TypeTagPolicy`].
//!
//! ## Cleanup Failed Create
//! > default: [`true`]
//!
//! If a dataset cannot be fully created, erase its partially written directory before returning the error.
//! If disabled, the incomplete directory is left in place for inspection.

/// How an unrecognised element type tag is handled when opening a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeTagPolicy {
    /// An unrecognised tag is a [`DatasetError::CorruptMetadata`](crate::dataset::DatasetError::CorruptMetadata) error.
    #[default]
    Strict,
    /// An unrecognised tag is read as [`ElementType::Float32`](crate::dataset::ElementType::Float32) and a warning is logged.
    ///
    /// This matches the behaviour of older readers of the format.
    Lenient,
}

/// Configuration for `dirvol` handles.
#[derive(Debug, Clone)]
pub struct Config {
    type_tag_policy: TypeTagPolicy,
    cleanup_failed_create: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            type_tag_policy: TypeTagPolicy::default(),
            cleanup_failed_create: true,
        }
    }
}

impl Config {
    /// Get the [type tag policy](#type-tag-policy) configuration.
    #[must_use]
    pub fn type_tag_policy(&self) -> TypeTagPolicy {
        self.type_tag_policy
    }

    /// Set the [type tag policy](#type-tag-policy) configuration.
    pub fn set_type_tag_policy(&mut self, type_tag_policy: TypeTagPolicy) -> &mut Self {
        self.type_tag_policy = type_tag_policy;
        self
    }

    /// Get the [cleanup failed create](#cleanup-failed-create) configuration.
    #[must_use]
    pub fn cleanup_failed_create(&self) -> bool {
        self.cleanup_failed_create
    }

    /// Set the [cleanup failed create](#cleanup-failed-create) configuration.
    pub fn set_cleanup_failed_create(&mut self, cleanup_failed_create: bool) -> &mut Self {
        self.cleanup_failed_create = cleanup_failed_create;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.type_tag_policy(), TypeTagPolicy::Strict);
        assert!(config.cleanup_failed_create());
    }

    #[test]
    fn config_setters_chain() {
        let mut config = Config::default();
        config
            .set_type_tag_policy(TypeTagPolicy::Lenient)
            .set_cleanup_failed_create(false);
        assert_eq!(config.type_tag_policy(), TypeTagPolicy::Lenient);
        assert!(!config.cleanup_failed_create());
    }
}
