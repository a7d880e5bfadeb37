//! Alexandria DB - Persistence of documents and chunks.
//!
//! The pipeline talks to a [`DocumentStore`]. Two backends exist:
//! - [`SupabaseStore`], the hosted Postgres corpus reached through PostgREST
//! - [`Database`], a local SQLite file used for offline runs and tests

mod database;
mod error;
mod migrations;
mod operations;
mod store;
mod supabase;

pub use database::Database;
pub use error::{DbError, DbResult};
pub use store::{open_store, DocumentStore};
pub use supabase::SupabaseStore;
