//! Pattern persistence
//!
//! - [`KeyValueStore`]: the storage collaborator, with in-memory and
//!   JSON-file implementations
//! - [`PatternPersistenceGateway`]: validated save/load/export on top of it

mod gateway;
mod store;

pub use gateway::{parse_storage_key, storage_key, PatternPersistenceGateway, StoredPattern};
pub use store::{FileStore, KeyValueStore, MemoryStore};
