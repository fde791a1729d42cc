//! Card stores: the storage contract and its in-memory and SQLite implementations.

pub mod db;
pub mod memory;
pub mod store;

pub use db::SqliteStore;
pub use memory::MemoryStore;
pub use store::{CardStore, StoreError};
