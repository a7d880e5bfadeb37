//! Corpus statistics.

use crate::database::Database;
use crate::error::DbResult;
use alexandria_core::CorpusSummary;

impl Database {
    /// Count done documents, all chunks, and chunks carrying a translation.
    pub fn get_summary(&self) -> DbResult<CorpusSummary> {
        let conn = self.conn()?;

        let documents_done: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE status = 'done'",
            [],
            |row| row.get(0),
        )?;

        let total_chunks: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;

        let translated_chunks: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE content_fr IS NOT NULL",
            [],
            |row| row.get(0),
        )?;

        Ok(CorpusSummary {
            documents_done,
            total_chunks,
            translated_chunks,
        })
    }
}
