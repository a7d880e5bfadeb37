//! Document CRUD operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use alexandria_core::{Document, DocumentId, DocumentMetadata, DocumentStatus, StatusUpdate};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};

const DOCUMENT_COLUMNS: &str = "id, title, authors, doi, journal, published_at, storage_path, status, \
                                error_message, ingestion_log, updated_at";

impl Database {
    /// Create a new document.
    pub fn create_document(&self, doc: &Document) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO documents (id, title, authors, doi, journal, published_at, storage_path,
                                   status, error_message, ingestion_log, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                doc.id,
                doc.title,
                serde_json::to_string(&doc.authors)?,
                doc.doi,
                doc.journal,
                doc.published_at.map(|d| d.format("%Y-%m-%d").to_string()),
                doc.storage_path,
                doc.status.as_str(),
                doc.error_message,
                doc.ingestion_log.as_ref().map(serde_json::to_string).transpose()?,
                doc.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find the document owning a storage path.
    pub fn find_document_by_path(&self, storage_path: &str) -> DbResult<Option<Document>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            &format!("SELECT {} FROM documents WHERE storage_path = ?1", DOCUMENT_COLUMNS),
            params![storage_path],
            row_to_document,
        );

        match result {
            Ok(doc) => Ok(Some(doc)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Find a done document carrying `doi`.
    pub fn find_done_document_by_doi(&self, doi: &str) -> DbResult<Option<Document>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            &format!(
                "SELECT {} FROM documents WHERE doi = ?1 AND status = ?2 ORDER BY updated_at LIMIT 1",
                DOCUMENT_COLUMNS
            ),
            params![doi, DocumentStatus::Done.as_str()],
            row_to_document,
        );

        match result {
            Ok(doc) => Ok(Some(doc)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Overwrite the bibliographic fields of a document.
    pub fn set_document_metadata(&self, id: &DocumentId, metadata: &DocumentMetadata) -> DbResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            r#"
            UPDATE documents
            SET title = ?2, authors = ?3, doi = ?4, journal = ?5, published_at = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                id,
                metadata.title,
                serde_json::to_string(&metadata.authors)?,
                metadata.doi,
                metadata.journal,
                metadata.published_at.map(|d| d.format("%Y-%m-%d").to_string()),
                Utc::now().to_rfc3339(),
            ],
        )?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Document not found: {}", id)));
        }

        Ok(())
    }

    /// Move a document to a new status.
    pub fn set_document_status(&self, id: &DocumentId, update: &StatusUpdate) -> DbResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute(
            r#"
            UPDATE documents
            SET status = ?2, error_message = ?3, ingestion_log = ?4, updated_at = ?5
            WHERE id = ?1
            "#,
            params![
                id,
                update.status.as_str(),
                update.error_message,
                serde_json::to_string(&update.ingestion_log)?,
                update.updated_at().to_rfc3339(),
            ],
        )?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Document not found: {}", id)));
        }

        Ok(())
    }

    /// Delete a document by ID. Its chunks go with it.
    pub fn remove_document(&self, id: &DocumentId) -> DbResult<()> {
        let conn = self.conn()?;
        let rows = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;

        if rows == 0 {
            return Err(DbError::NotFound(format!("Document not found: {}", id)));
        }

        Ok(())
    }

    /// Delete a document and its chunks in one transaction.
    pub fn purge_document_tx(&self, id: &DocumentId) -> DbResult<u64> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let chunks = tx.execute("DELETE FROM chunks WHERE document_id = ?1", params![id])?;
        tx.execute("DELETE FROM documents WHERE id = ?1", params![id])?;

        tx.commit()?;
        Ok(chunks as u64)
    }

    /// Number of document rows.
    pub fn document_count(&self) -> DbResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let authors: String = row.get(2)?;
    let published_at: Option<String> = row.get(5)?;
    let status: String = row.get(7)?;
    let ingestion_log: Option<String> = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        authors: serde_json::from_str(&authors).unwrap_or_default(),
        doi: row.get(3)?,
        journal: row.get(4)?,
        published_at: published_at.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        storage_path: row.get(6)?,
        status: status.parse().unwrap_or(DocumentStatus::Error),
        error_message: row.get(8)?,
        ingestion_log: ingestion_log.and_then(|s| serde_json::from_str(&s).ok()),
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}
