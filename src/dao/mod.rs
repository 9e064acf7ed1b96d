//! Persistence layer: store trait, entities, and the in-memory backend.

pub mod memory;
pub mod models;
pub mod storage;
pub mod store;
