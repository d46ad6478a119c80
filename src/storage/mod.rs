pub mod base;
pub mod file_storage;
pub mod memory_storage;

// Re-export the primary Storage items so code outside can do
// "use crate::storage::{Storage, create_storage};"
pub use base::{create_storage, Storage};
pub use file_storage::FileStorage;
pub use memory_storage::MemoryStorage;
