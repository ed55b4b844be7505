//! Implementations of the [`Store`](crate::common::traits::Store) trait

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
