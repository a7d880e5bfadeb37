//! SQLite CRUD operations.

pub mod chunks;
pub mod documents;
pub mod stats;
