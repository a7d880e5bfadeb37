//! The persistence seam used by the ingestion pipeline.

use crate::database::Database;
use crate::error::DbResult;
use crate::supabase::SupabaseStore;
use alexandria_config::{StoreBackend, StoreConfig};
use alexandria_core::{Chunk, CorpusSummary, Document, DocumentId, DocumentMetadata, StatusUpdate};
use async_trait::async_trait;
use std::sync::Arc;

/// Row-oriented access to the `documents` and `chunks` record types.
///
/// Every call is a single request/response. Nothing here is transactional
/// across calls unless a backend says so.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Look up the document owning `storage_path`.
    async fn find_document(&self, storage_path: &str) -> DbResult<Option<Document>>;

    /// Look up a `done` document carrying `doi`. Rows in any other status
    /// are ignored.
    async fn find_document_by_doi(&self, doi: &str) -> DbResult<Option<Document>>;

    /// Insert a new document row.
    async fn insert_document(&self, document: &Document) -> DbResult<()>;

    /// Write recovered bibliographic fields onto an existing document.
    async fn update_metadata(&self, id: &DocumentId, metadata: &DocumentMetadata) -> DbResult<()>;

    /// Move a document to a new status, stamping `updated_at`.
    async fn update_status(&self, id: &DocumentId, update: &StatusUpdate) -> DbResult<()>;

    /// Delete every chunk owned by a document. Returns the number removed.
    async fn delete_chunks(&self, document_id: &DocumentId) -> DbResult<u64>;

    /// Delete a document row.
    async fn delete_document(&self, id: &DocumentId) -> DbResult<()>;

    /// Remove a document and all of its chunks, chunks first.
    async fn purge_document(&self, id: &DocumentId) -> DbResult<u64> {
        let removed = self.delete_chunks(id).await?;
        self.delete_document(id).await?;
        Ok(removed)
    }

    /// Insert chunks in the given order.
    async fn insert_chunks(&self, chunks: &[Chunk]) -> DbResult<()>;

    /// All chunks of a document, ordered by position.
    async fn list_chunks(&self, document_id: &DocumentId) -> DbResult<Vec<Chunk>>;

    /// Counts of done documents, chunks, and translated chunks.
    async fn corpus_summary(&self) -> DbResult<CorpusSummary>;
}

/// Open the store selected by configuration.
pub fn open_store(config: &StoreConfig) -> DbResult<Arc<dyn DocumentStore>> {
    match config.backend {
        StoreBackend::Supabase => {
            let credentials = config.supabase_credentials()?;
            Ok(Arc::new(SupabaseStore::new(&credentials, config.timeout_seconds)?))
        }
        StoreBackend::Sqlite => {
            let path = config
                .database_path
                .as_deref()
                .ok_or_else(|| crate::DbError::Other("store.database_path is not set".to_string()))?;
            Ok(Arc::new(Database::open(path)?))
        }
    }
}
