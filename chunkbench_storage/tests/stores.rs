#![allow(missing_docs)]

use std::error::Error;

use chunkbench_storage::byte_range::ByteRange;
use chunkbench_storage::store::{FileStore, MemoryStore};
use chunkbench_storage::{ReadableStorageTraits, StorageError, WritableStorageTraits};

fn store_write_read<T: ReadableStorageTraits + WritableStorageTraits>(
    store: &T,
) -> Result<(), Box<dyn Error>> {
    assert_eq!(store.size()?, 0);

    store.set_partial(0, &[0, 1, 2, 3])?;
    store.set_partial(8, &[8, 9])?;
    assert_eq!(store.size()?, 10);
    assert_eq!(store.get()?.as_ref(), &[0, 1, 2, 3, 0, 0, 0, 0, 8, 9]);

    store.set_partial(2, &[20, 30])?;
    assert_eq!(
        store.get_byte_range(ByteRange::FromStart(1, Some(3)))?.as_ref(),
        &[1, 20, 30]
    );
    assert_eq!(store.get_byte_range(ByteRange::Suffix(2))?.as_ref(), &[8, 9]);
    assert_eq!(store.get_byte_range((4..8).into())?.as_ref(), &[0; 4]);

    assert!(matches!(
        store.get_byte_range(ByteRange::FromStart(9, Some(2))),
        Err(StorageError::InvalidByteRangeError(_))
    ));

    store.set_size(4)?;
    assert_eq!(store.get()?.as_ref(), &[0, 1, 20, 30]);
    store.flush()?;
    Ok(())
}

#[test]
fn memory_store() -> Result<(), Box<dyn Error>> {
    let store = MemoryStore::new();
    store_write_read(&store)
}

#[test]
#[cfg_attr(miri, ignore)]
fn file_store() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("value.bin");
    let store = FileStore::create(&path)?;
    store_write_read(&store)?;
    store.close()?;

    // Reopening sees what was written
    let store = FileStore::open_read_only(&path)?;
    assert_eq!(store.get()?.as_ref(), &[0, 1, 20, 30]);
    assert_eq!(std::fs::metadata(&path)?.len(), 4);

    // Creating again truncates
    let store = FileStore::create(&path)?;
    assert_eq!(store.size()?, 0);
    Ok(())
}

#[test]
fn file_store_open_missing() {
    let dir = tempfile::TempDir::new().unwrap();
    assert!(FileStore::open(dir.path().join("missing.bin")).is_err());
}
