pub mod config;
pub mod database;
pub mod models;
pub mod review;

pub use config::StoreConfig;
pub use database::{CardStore, MemoryStore, SqliteStore, StoreError};
pub use models::{CardId, CardSchedulingState, Quality};
pub use review::{ReviewApplier, ReviewError, apply_review};
