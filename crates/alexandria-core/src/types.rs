//! Core domain types for Alexandria.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for documents.
pub type DocumentId = String;

/// Unique identifier for chunks.
pub type ChunkId = String;

/// Generate a new unique ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Replace characters the destination store rejects in text columns.
///
/// Postgres refuses NUL bytes inside `text` values, so they become spaces.
pub fn sanitize_for_store(text: &str) -> String {
    text.replace('\0', " ")
}

/// Ingestion status of a document.
///
/// `Done` and `Error` are terminal for a run. `Error` and `Processing` are
/// retryable: the next run purges the document and starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Processing,
    Done,
    Error,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Done => "done",
            DocumentStatus::Error => "error",
        }
    }

    /// Whether a document in this status must be purged and re-ingested.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DocumentStatus::Processing | DocumentStatus::Error)
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(DocumentStatus::Processing),
            "done" => Ok(DocumentStatus::Done),
            "error" => Ok(DocumentStatus::Error),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bibliographic metadata recovered from a document.
///
/// `journal` and `published_at` are part of the schema but no heuristic
/// fills them yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub doi: Option<String>,
    pub journal: Option<String>,
    pub published_at: Option<NaiveDate>,
}

/// Structured diagnostic record stored with each document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IngestionLog {
    Completed {
        title_extracted: bool,
        doi_extracted: bool,
        authors_extracted: bool,
        journal_extracted: bool,
        published_at_extracted: bool,
        chunks_count: usize,
        ocr_pages_count: usize,
        ingested_at: DateTime<Utc>,
    },
    Failed {
        error: String,
        ingested_at: DateTime<Utc>,
    },
}

impl IngestionLog {
    /// Record what a successful run recovered.
    pub fn completed(metadata: &DocumentMetadata, chunks_count: usize, ocr_pages_count: usize) -> Self {
        IngestionLog::Completed {
            title_extracted: metadata.title.is_some(),
            doi_extracted: metadata.doi.is_some(),
            authors_extracted: !metadata.authors.is_empty(),
            journal_extracted: metadata.journal.is_some(),
            published_at_extracted: metadata.published_at.is_some(),
            chunks_count,
            ocr_pages_count,
            ingested_at: Utc::now(),
        }
    }

    /// Record a failed run.
    pub fn failed(error: impl Into<String>) -> Self {
        IngestionLog::Failed {
            error: error.into(),
            ingested_at: Utc::now(),
        }
    }

    pub fn ingested_at(&self) -> DateTime<Utc> {
        match self {
            IngestionLog::Completed { ingested_at, .. } | IngestionLog::Failed { ingested_at, .. } => *ingested_at,
        }
    }
}

/// A source document in the corpus, keyed by its storage path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub doi: Option<String>,
    pub journal: Option<String>,
    pub published_at: Option<NaiveDate>,
    pub storage_path: String,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub ingestion_log: Option<IngestionLog>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// A fresh document entering the pipeline.
    pub fn new(storage_path: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            title: None,
            authors: Vec::new(),
            doi: None,
            journal: None,
            published_at: None,
            storage_path: storage_path.into(),
            status: DocumentStatus::Processing,
            error_message: None,
            ingestion_log: None,
            updated_at: Utc::now(),
        }
    }

    /// A document that failed before (or after) its row disappeared.
    pub fn failed(storage_path: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        let mut doc = Self::new(storage_path);
        doc.status = DocumentStatus::Error;
        doc.ingestion_log = Some(IngestionLog::failed(error.clone()));
        doc.error_message = Some(error);
        doc
    }
}

/// Status transition written back to a document row.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub ingestion_log: IngestionLog,
}

impl StatusUpdate {
    pub fn done(log: IngestionLog) -> Self {
        Self {
            status: DocumentStatus::Done,
            error_message: None,
            ingestion_log: log,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: DocumentStatus::Error,
            ingestion_log: IngestionLog::failed(message.clone()),
            error_message: Some(message),
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.ingestion_log.ingested_at()
    }
}

/// A chunk as emitted by a chunker, before embedding.
///
/// Its position is its index in the chunker's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    pub content: String,
    pub page: Option<u32>,
    pub section_title: Option<String>,
}

impl ChunkDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            page: None,
            section_title: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_section(mut self, section_title: Option<String>) -> Self {
        self.section_title = section_title;
        self
    }
}

/// A persisted, embedded chunk of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub document_id: DocumentId,
    pub content: String,
    pub content_fr: Option<String>,
    pub position: u32,
    pub page: Option<u32>,
    pub section_title: Option<String>,
    pub embedding: Vec<f32>,
    pub embedding_fr: Option<Vec<f32>>,
}

impl Chunk {
    pub fn from_draft(document_id: DocumentId, position: u32, draft: ChunkDraft, embedding: Vec<f32>) -> Self {
        Self {
            id: new_id(),
            document_id,
            content: sanitize_for_store(&draft.content),
            content_fr: None,
            position,
            page: draft.page,
            section_title: draft.section_title.map(|s| sanitize_for_store(&s)),
            embedding,
            embedding_fr: None,
        }
    }

    pub fn with_translation(mut self, content_fr: String, embedding_fr: Vec<f32>) -> Self {
        self.content_fr = Some(sanitize_for_store(&content_fr));
        self.embedding_fr = Some(embedding_fr);
        self
    }
}

/// Aggregate counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub documents_done: i64,
    pub total_chunks: i64,
    pub translated_chunks: i64,
}
