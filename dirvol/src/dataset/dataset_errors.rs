use dirvol_storage::{NodeNameError, NodePath, StorageError};
use thiserror::Error;

use super::{ArtifactDecodeError, ArtifactKind};

/// A dataset error.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum DatasetError {
    /// The dataset directory already exists.
    #[error("dataset {0} already exists")]
    AlreadyExists(NodePath),
    /// The dataset directory or one of its artifacts is missing.
    #[error("{0} not found")]
    NotFound(NodePath),
    /// The dataset is held by another open handle.
    #[error("dataset {0} is open elsewhere")]
    Locked(NodePath),
    /// An invalid dataset name.
    #[error(transparent)]
    InvalidName(#[from] NodeNameError),
    /// An artifact could not be decoded.
    #[error("{artifact} artifact {path} is corrupt: {source}")]
    CorruptArtifact {
        /// The artifact kind.
        artifact: ArtifactKind,
        /// The artifact path.
        path: NodePath,
        /// The decoding error.
        source: ArtifactDecodeError,
    },
    /// The datatype artifact holds an unrecognised element type tag.
    #[error("datatype artifact {path} holds an unrecognised tag {tag:?}")]
    CorruptMetadata {
        /// The artifact path.
        path: NodePath,
        /// The unrecognised tag.
        tag: String,
    },
    /// The destination buffer cannot hold the dataset elements.
    #[error("buffer with capacity {capacity} cannot hold {required} elements")]
    BufferTooSmall {
        /// The dataset extent.
        required: u64,
        /// The buffer capacity.
        capacity: usize,
    },
    /// The source buffer length does not match the element count.
    #[error("data has {got} elements, expected {expected}")]
    InvalidDataLength {
        /// The element count.
        expected: u64,
        /// The source buffer length.
        got: usize,
    },
    /// The dataset extent does not fit in memory.
    #[error("extent {0} exceeds the addressable size")]
    ExtentTooLarge(u64),
    /// A storage error.
    #[error(transparent)]
    StorageError(StorageError),
}

impl From<StorageError> for DatasetError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AlreadyExists(path) => Self::AlreadyExists(path),
            StorageError::NotFound(path) => Self::NotFound(path),
            StorageError::Locked(path) => Self::Locked(path),
            err => Self::StorageError(err),
        }
    }
}
