//! Store conformance checks.
//!
//! Run in order: [`store_write`], [`store_read`], [`store_list`], [`store_erase`], [`store_lock`].
#![allow(missing_docs)]

use std::error::Error;

use crate::{
    Bytes, EntryKind, ListableStorageTraits, NodePath, ReadableStorageTraits, StorageError,
    WritableStorageTraits,
};

fn path(path: &str) -> Result<NodePath, StorageError> {
    Ok(NodePath::new(path)?)
}

pub fn store_write<T: WritableStorageTraits + ReadableStorageTraits>(
    store: &T,
) -> Result<(), Box<dyn Error>> {
    store.create_dir(&path("a")?)?;
    assert!(matches!(
        store.create_dir(&path("a")?),
        Err(StorageError::AlreadyExists(_))
    ));
    assert!(matches!(
        store.create_dir(&path("x/y")?),
        Err(StorageError::NotFound(_))
    ));

    store.create_new(&path("a/f")?, "1\n".into())?;
    assert!(matches!(
        store.create_new(&path("a/f")?, "3\n".into()),
        Err(StorageError::AlreadyExists(_))
    ));
    assert!(matches!(
        store.create_new(&path("a")?, Bytes::new()),
        Err(StorageError::AlreadyExists(_))
    ));

    store.set(&path("a/f")?, "2\n".into())?;
    store.set(&path("a/g")?, Bytes::new())?;
    assert!(matches!(
        store.set(&path("missing/f")?, Bytes::new()),
        Err(StorageError::NotFound(_))
    ));

    store.create_dir_all(&path("a/b/c")?)?;
    store.create_dir_all(&path("a/b/c")?)?;
    assert!(store.create_dir_all(&path("a/f/z")?).is_err());
    Ok(())
}

pub fn store_read<T: ReadableStorageTraits>(store: &T) -> Result<(), Box<dyn Error>> {
    assert_eq!(store.get(&path("a/f")?)?, Some("2\n".into()));
    assert_eq!(store.get(&path("a/g")?)?, Some(Bytes::new()));
    assert_eq!(store.get(&path("a/missing")?)?, None);
    assert_eq!(store.get(&path("a")?)?, None);

    assert_eq!(store.entry_kind(&path("a")?)?, Some(EntryKind::Directory));
    assert_eq!(store.entry_kind(&path("a/b/c")?)?, Some(EntryKind::Directory));
    assert_eq!(store.entry_kind(&path("a/f")?)?, Some(EntryKind::File));
    assert_eq!(store.entry_kind(&path("a/missing")?)?, None);
    assert!(store.exists(&path("a/g")?)?);
    assert!(!store.exists(&path("b")?)?);
    Ok(())
}

pub fn store_list<T: ListableStorageTraits>(store: &T) -> Result<(), Box<dyn Error>> {
    let entries = store.list_dir(&path("a")?)?;
    let entries: Vec<_> = entries
        .iter()
        .map(|entry| (entry.name(), entry.kind()))
        .collect();
    assert_eq!(
        entries,
        [
            ("b", EntryKind::Directory),
            ("f", EntryKind::File),
            ("g", EntryKind::File)
        ]
    );
    assert!(store.list_dir(&path("a/b/c")?)?.is_empty());
    assert!(matches!(
        store.list_dir(&path("nope")?),
        Err(StorageError::NotFound(_))
    ));
    Ok(())
}

pub fn store_erase<T: WritableStorageTraits + ReadableStorageTraits>(
    store: &T,
) -> Result<(), Box<dyn Error>> {
    store.create_dir_all(&path("e/x/y")?)?;
    store.set(&path("e/x/y/z")?, "z\n".into())?;
    store.set(&path("e/x/w")?, "w\n".into())?;
    store.set(&path("e/v")?, "v\n".into())?;
    store.erase_tree(&path("e")?)?;
    assert!(!store.exists(&path("e")?)?);
    assert!(!store.exists(&path("e/x/y/z")?)?);

    // missing trees are not an error
    store.erase_tree(&path("e")?)?;

    // siblings survive
    store.erase_tree(&path("a/b")?)?;
    assert!(!store.exists(&path("a/b")?)?);
    assert_eq!(store.get(&path("a/f")?)?, Some("2\n".into()));
    Ok(())
}

pub fn store_lock<T: WritableStorageTraits>(store: &T) -> Result<(), Box<dyn Error>> {
    store.create_dir(&path("l")?)?;
    let lock = store.lock(&path("l")?)?;
    assert_eq!(lock.path(), &path("l")?);
    assert!(matches!(
        store.lock(&path("l")?),
        Err(StorageError::Locked(_))
    ));
    lock.release()?;

    let lock = store.lock(&path("l")?)?;
    drop(lock);
    let _lock = store.lock(&path("l")?)?;

    assert!(matches!(
        store.lock(&path("unlocked")?),
        Err(StorageError::NotFound(_))
    ));
    Ok(())
}
