//! Storage implementations.
//!
//! Available backends:
//! - `MemoryStore` - In-memory storage (tests, development)
//! - `FileStore` - One JSON document per source on disk, atomic replace

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;
