//! Alexandria Ingest - PDF to chunks + embeddings pipeline.
//!
//! This crate provides:
//! - Page-wise text extraction with OCR escalation for sparse pages
//! - Title/author/DOI heuristics
//! - Section-aware chunking with line-aligned overlap
//! - The per-document ingestion state machine ([`Ingestor`])

mod chunker;
mod error;
mod extractor;
mod ingestor;
mod metadata;
mod pdf;

pub use chunker::{ChunkConfig, ChunkStrategy, Chunker};
pub use error::{IngestError, IngestResult};
pub use extractor::{ExtractedText, PageOcr, TesseractOcr, TextExtractor};
pub use ingestor::{discover_pdfs, DocumentOutcome, Ingestor, Progress, RunReport};
pub use metadata::{HeuristicMetadataExtractor, MetadataStrategy};
pub use pdf::{DocumentInfo, DocumentLoader, LopdfDocument, LopdfLoader, PdfDocument};
