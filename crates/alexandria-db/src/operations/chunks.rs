//! Chunk CRUD operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use alexandria_core::{Chunk, DocumentId};
use rusqlite::params;

impl Database {
    /// Create multiple chunks in a transaction, in slice order.
    pub fn create_chunks(&self, chunks: &[Chunk]) -> DbResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO chunks (id, document_id, content, content_fr, position, page,
                                    section_title, embedding, embedding_fr)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )?;

            for chunk in chunks {
                stmt.execute(params![
                    chunk.id,
                    chunk.document_id,
                    chunk.content,
                    chunk.content_fr,
                    chunk.position,
                    chunk.page,
                    chunk.section_title,
                    vector_to_bytes(&chunk.embedding),
                    chunk.embedding_fr.as_deref().map(vector_to_bytes),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Get all chunks for a document, ordered by position.
    pub fn get_chunks_by_document(&self, document_id: &DocumentId) -> DbResult<Vec<Chunk>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, document_id, content, content_fr, position, page, section_title, embedding, embedding_fr
             FROM chunks WHERE document_id = ?1 ORDER BY position",
        )?;

        let chunks = stmt.query_map(params![document_id], |row| {
            let embedding: Vec<u8> = row.get(7)?;
            let embedding_fr: Option<Vec<u8>> = row.get(8)?;
            Ok(Chunk {
                id: row.get(0)?,
                document_id: row.get(1)?,
                content: row.get(2)?,
                content_fr: row.get(3)?,
                position: row.get(4)?,
                page: row.get(5)?,
                section_title: row.get(6)?,
                embedding: bytes_to_vector(&embedding),
                embedding_fr: embedding_fr.as_deref().map(bytes_to_vector),
            })
        })?;

        chunks.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Delete all chunks for a document.
    pub fn delete_chunks_by_document(&self, document_id: &DocumentId) -> DbResult<u64> {
        let conn = self.conn()?;
        let count = conn.execute("DELETE FROM chunks WHERE document_id = ?1", params![document_id])?;
        Ok(count as u64)
    }
}

/// Serialize a vector as little-endian f32 bytes.
pub(crate) fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn bytes_to_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
