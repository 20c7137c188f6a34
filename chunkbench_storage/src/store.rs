//! Stores.

mod file_store;
mod memory_store;

pub use file_store::{close_file, FileStore, FileStoreCreateError, FileStoreOpenMode};
pub use memory_store::MemoryStore;
