//! MaculaCutis Storage Layer
//!
//! A `Store` trait describing the persistence primitives, an in-memory
//! implementation, and typed query helpers over a shared `DbPool`.

pub mod memory;
pub mod pool;
pub mod queries;

pub use memory::MemoryStore;
pub use pool::{DbError, DbPool, DbResult, Store};

/// Initialize a pool backed by the in-memory store.
///
/// Records live until the last clone of the pool is dropped.
pub fn init_memory_pool() -> DbPool {
    std::sync::Arc::new(MemoryStore::new())
}
