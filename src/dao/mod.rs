//! Persistence interfaces and entity records shared across layers.

pub mod game_store;
pub mod models;
pub mod storage;
