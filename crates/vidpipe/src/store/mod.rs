//! Job status storage: cache store, durable store and the repository
//! that arbitrates between them.

pub mod cache;
pub mod durable;
pub mod record;
pub mod repository;

pub use cache::{CacheStore, MemoryCache};
pub use durable::{DurableStore, SqliteStore};
pub use record::{StatusRecord, StatusUpdate};
pub use repository::{StatusRepository, WriteOutcome};
