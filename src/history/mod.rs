// src/history/mod.rs

//! Execution history: records, their persisted layout and the store.

pub mod codec;
pub mod record;
pub mod storage;
pub mod store;

pub use codec::{DecodeError, SCHEMA_VERSION};
pub use record::{ExecutionRecord, ExecutionRecordBuilder};
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use store::HistoryStore;
