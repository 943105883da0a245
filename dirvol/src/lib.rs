//! `dirvol` is a Rust library for storing typed, resizable one-dimensional datasets in a hierarchy of groups, laid out as plain directories and text files.
//!
//! A storage root ([`File`](crate::file::File)) is a directory holding a marker file.
//! Groups ([`Group`](crate::group::Group)) are directories, and datasets ([`Dataset`](crate::dataset::Dataset)) are directories holding four text artifacts: the element count, the element type, the fill value, and the elements themselves.
//!
//! ```text
//! <location>/
//!   TUTORIAL_VOL_CONNECTOR_FILE
//!   <group>/
//!   <dataset>/
//!     <dataset>.dataspace
//!     <dataset>.datatype
//!     <dataset>.fillval
//!     <dataset>.data
//! ```
//!
//! ## Storage Support
//! `dirvol` reads and writes through the [`dirvol_storage`] API, re-exported as [`storage`].
//! - [`FilesystemStore`](crate::filesystem::FilesystemStore) (requires the `filesystem` feature, enabled by default) stores a hierarchy beneath a base directory.
//!   Values are replaced atomically by renaming a staging file over them, and datasets are locked with advisory directory locks.
//! - [`MemoryStore`](crate::storage::store::MemoryStore) stores a hierarchy in memory.
//!
//! ## Concurrency
//! All operations are synchronous.
//! An open [`Dataset`](crate::dataset::Dataset) holds an exclusive lock on its directory, so a second handle to the same dataset cannot be opened until the first is closed.
//!
//! ## Hosts
//! A host that addresses objects by integer identifiers can use a [`Connector`](crate::connector::Connector), obtained from a [`ConnectorRegistry`](crate::registry::ConnectorRegistry).
//!
//! ## Logging
//! `dirvol` logs information and warnings using the [`log`] crate.
//! A logging implementation must be enabled to capture logs.
//! See the [`log`] crate documentation for more details.
//!
//! ## Examples
//! ```rust
//! # use std::sync::Arc;
//! use dirvol::{config::Config, dataset::{Dataset, ElementType}, file::File};
//!
//! let storage = Arc::new(dirvol::storage::store::MemoryStore::new());
//! let file = File::create(storage, "example.h5tut", Config::default())?;
//! let group = file.root().create_child("group")?;
//!
//! let mut dataset = Dataset::create(&group, "dataset", 4, ElementType::Int32, -1)?;
//! assert_eq!(dataset.read_vec()?, [-1, -1, -1, -1]);
//!
//! dataset.store(&[1, 2, 3, 4, 5])?;
//! assert_eq!(dataset.extent(), 5);
//! assert_eq!(dataset.read_vec()?, [1, 2, 3, 4, 5]);
//!
//! dataset.close()?;
//! group.close();
//! file.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Licence
//! `dirvol` is licensed under either of
//! - the Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> or
//! - the MIT license <http://opensource.org/licenses/MIT>, at your option.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod connector;
pub mod dataset;
pub mod file;
pub mod group;
pub mod node;
pub mod registry;

pub use dirvol_storage as storage;

#[cfg(feature = "filesystem")]
pub use dirvol_filesystem as filesystem;
