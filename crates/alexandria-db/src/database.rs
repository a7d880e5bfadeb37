//! SQLite connection and pool management.

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::store::DocumentStore;
use alexandria_core::{Chunk, CorpusSummary, Document, DocumentId, DocumentMetadata, StatusUpdate};
use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use tracing::info;

/// Type alias for connection pool.
pub type ConnectionPool = Pool<SqliteConnectionManager>;
pub type PooledConn = PooledConnection<SqliteConnectionManager>;

/// Local SQLite corpus.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open a database at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DbError::Other(e.to_string()))?;
        }

        info!("Opening database at: {}", path.display());

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(4).build(manager)?;

        {
            let conn = pool.get()?;
            migrations::initialize_schema(&conn)?;
        }

        Ok(Self { pool })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(1) // Memory DB only supports single connection
            .build(manager)?;

        {
            let conn = pool.get()?;
            migrations::initialize_schema(&conn)?;
        }

        Ok(Self { pool })
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> DbResult<PooledConn> {
        self.pool.get().map_err(DbError::from)
    }
}

#[async_trait]
impl DocumentStore for Database {
    async fn find_document(&self, storage_path: &str) -> DbResult<Option<Document>> {
        self.find_document_by_path(storage_path)
    }

    async fn find_document_by_doi(&self, doi: &str) -> DbResult<Option<Document>> {
        self.find_done_document_by_doi(doi)
    }

    async fn insert_document(&self, document: &Document) -> DbResult<()> {
        self.create_document(document)
    }

    async fn update_metadata(&self, id: &DocumentId, metadata: &DocumentMetadata) -> DbResult<()> {
        self.set_document_metadata(id, metadata)
    }

    async fn update_status(&self, id: &DocumentId, update: &StatusUpdate) -> DbResult<()> {
        self.set_document_status(id, update)
    }

    async fn delete_chunks(&self, document_id: &DocumentId) -> DbResult<u64> {
        self.delete_chunks_by_document(document_id)
    }

    async fn delete_document(&self, id: &DocumentId) -> DbResult<()> {
        self.remove_document(id)
    }

    async fn purge_document(&self, id: &DocumentId) -> DbResult<u64> {
        self.purge_document_tx(id)
    }

    async fn insert_chunks(&self, chunks: &[Chunk]) -> DbResult<()> {
        self.create_chunks(chunks)
    }

    async fn list_chunks(&self, document_id: &DocumentId) -> DbResult<Vec<Chunk>> {
        self.get_chunks_by_document(document_id)
    }

    async fn corpus_summary(&self) -> DbResult<CorpusSummary> {
        self.get_summary()
    }
}
