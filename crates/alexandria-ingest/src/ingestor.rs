//! Main ingestion logic.
//!
//! One document at a time, keyed by storage path:
//! done documents are skipped, processing/error documents are purged and
//! redone, and any failure is recorded on the document row without
//! stopping the run. A file whose DOI already belongs to a done document
//! is skipped too, leaving no row behind.

use crate::chunker::{ChunkConfig, ChunkStrategy, Chunker};
use crate::error::{IngestError, IngestResult};
use crate::extractor::{ExtractedText, TextExtractor};
use crate::metadata::{HeuristicMetadataExtractor, MetadataStrategy};
use crate::pdf::{DocumentInfo, DocumentLoader, LopdfLoader};
use alexandria_config::Config;
use alexandria_core::{
    sanitize_for_store, Chunk, ChunkDraft, CorpusSummary, Document, DocumentId, DocumentMetadata, IngestionLog,
    StatusUpdate,
};
use alexandria_db::DocumentStore;
use alexandria_models::{Embedder, ModelError, Translator};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// Already done in the store, by storage path or by DOI.
    Skipped,
    Completed {
        document_id: DocumentId,
        chunks: usize,
        translated: usize,
        ocr_pages: usize,
    },
    Failed {
        error: String,
    },
}

/// Aggregate of a directory run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub chunks_written: usize,
    pub translated_chunks: usize,
    /// Storage path and error of every failed document.
    pub failures: Vec<(String, String)>,
}

impl RunReport {
    pub fn record(&mut self, storage_path: &str, outcome: &DocumentOutcome) {
        match outcome {
            DocumentOutcome::Skipped => self.skipped += 1,
            DocumentOutcome::Completed { chunks, translated, .. } => {
                self.completed += 1;
                self.chunks_written += chunks;
                self.translated_chunks += translated;
            }
            DocumentOutcome::Failed { error } => {
                self.failed += 1;
                self.failures.push((storage_path.to_string(), error.clone()));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.completed + self.skipped + self.failed
    }
}

/// Per-document progress of a run.
#[derive(Debug, Clone, Copy)]
pub enum Progress<'a> {
    /// About to process the `index`-th of `total` files (0-based).
    Started {
        storage_path: &'a str,
        index: usize,
        total: usize,
    },
    Finished {
        storage_path: &'a str,
        outcome: &'a DocumentOutcome,
    },
}

/// Everything read out of one PDF before any model runs.
struct Extraction {
    info: DocumentInfo,
    text: ExtractedText,
}

/// Drives documents through extraction, metadata, chunking, translation,
/// embedding and persistence.
pub struct Ingestor {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    translator: Option<Arc<dyn Translator>>,
    loader: Box<dyn DocumentLoader>,
    extractor: TextExtractor,
    metadata: Box<dyn MetadataStrategy>,
    chunker: Box<dyn ChunkStrategy>,
    storage_prefix: String,
    insert_batch_size: usize,
}

impl Ingestor {
    /// Create an ingestor with the default heuristics. Translation is off
    /// until a translator is attached.
    pub fn new(config: &Config, store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            translator: None,
            loader: Box::new(LopdfLoader),
            extractor: TextExtractor::from_config(&config.extraction),
            metadata: Box::new(HeuristicMetadataExtractor::new(config.extraction.metadata_window)),
            chunker: Box::new(Chunker::new(ChunkConfig::from(&config.chunking))),
            storage_prefix: config.ingest.storage_prefix.clone(),
            insert_batch_size: config.ingest.insert_batch_size.max(1),
        }
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_loader(mut self, loader: Box<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_extractor(mut self, extractor: TextExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_metadata_strategy(mut self, strategy: Box<dyn MetadataStrategy>) -> Self {
        self.metadata = strategy;
        self
    }

    pub fn with_chunk_strategy(mut self, strategy: Box<dyn ChunkStrategy>) -> Self {
        self.chunker = strategy;
        self
    }

    /// The natural key of a file in the store: `<prefix>/<file name>`.
    pub fn storage_path_for(&self, path: &Path) -> String {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        let prefix = self.storage_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            file_name
        } else {
            format!("{}/{}", prefix, file_name)
        }
    }

    /// Ingest one PDF. Failures are recorded on the document, never returned.
    pub async fn ingest_file(&self, path: &Path) -> DocumentOutcome {
        let storage_path = self.storage_path_for(path);
        info!("Processing: {}", storage_path);

        match self.process(path, &storage_path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let error = e.to_string();
                warn!("Failed to ingest {}: {}", storage_path, error);
                self.record_failure(&storage_path, &error).await;
                DocumentOutcome::Failed { error }
            }
        }
    }

    /// Ingest every PDF directly inside `dir`, in file-name order.
    pub async fn ingest_directory(&self, dir: &Path) -> IngestResult<RunReport> {
        let paths = discover_pdfs(dir)?;
        Ok(self.ingest_paths(&paths, |_| {}).await)
    }

    /// Ingest `paths` in order, reporting each document to `on_progress`
    /// before and after it is processed.
    pub async fn ingest_paths<F>(&self, paths: &[PathBuf], mut on_progress: F) -> RunReport
    where
        F: FnMut(Progress<'_>),
    {
        let mut report = RunReport::default();
        let total = paths.len();

        for (index, path) in paths.iter().enumerate() {
            let storage_path = self.storage_path_for(path);
            on_progress(Progress::Started {
                storage_path: &storage_path,
                index,
                total,
            });

            let outcome = self.ingest_file(path).await;
            report.record(&storage_path, &outcome);
            on_progress(Progress::Finished {
                storage_path: &storage_path,
                outcome: &outcome,
            });
        }

        info!(
            "Run finished: {} completed, {} skipped, {} failed",
            report.completed, report.skipped, report.failed
        );
        report
    }

    /// Corpus counts read from the store; `None` if the store could not answer.
    pub async fn corpus_summary(&self) -> Option<CorpusSummary> {
        match self.store.corpus_summary().await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("Could not read corpus summary: {}", e);
                None
            }
        }
    }

    async fn process(&self, path: &Path, storage_path: &str) -> IngestResult<DocumentOutcome> {
        if let Some(existing) = self.store.find_document(storage_path).await? {
            if !existing.status.is_retryable() {
                info!("Already ingested, skipping: {}", storage_path);
                return Ok(DocumentOutcome::Skipped);
            }

            let removed = self.store.purge_document(&existing.id).await?;
            info!(
                "Re-ingesting {} (previous status: {}, {} chunks removed)",
                storage_path, existing.status, removed
            );
        }

        let document = Document::new(storage_path);
        self.store.insert_document(&document).await?;

        let Extraction { info, text } = self.extract(path)?;
        info!(
            "Extracted {} pages, {} characters, {} OCR pages",
            text.pages.len(),
            text.full_text.chars().count(),
            text.ocr_pages
        );

        let metadata = self.metadata.extract(&info, &text.full_text);
        log_metadata(&metadata);

        if let Some(doi) = metadata.doi.as_deref() {
            if let Some(original) = self.store.find_document_by_doi(doi).await? {
                info!(
                    "DOI {} already ingested as {}, skipping: {}",
                    doi, original.storage_path, storage_path
                );
                self.store.delete_document(&document.id).await?;
                return Ok(DocumentOutcome::Skipped);
            }
        }

        self.store.update_metadata(&document.id, &metadata).await?;

        let drafts = self.chunker.chunk(&text.full_text, Some(&text.pages));
        log_chunk_stats(&drafts);

        let chunks = self.embed_chunks(&document.id, drafts).await?;
        let translated = chunks.iter().filter(|c| c.content_fr.is_some()).count();

        self.insert_in_batches(&chunks).await?;

        let log = IngestionLog::completed(&metadata, chunks.len(), text.ocr_pages);
        self.store
            .update_status(&document.id, &StatusUpdate::done(log))
            .await?;

        info!(
            "Done: {} ({} chunks, {} translated, {} OCR pages)",
            storage_path,
            chunks.len(),
            translated,
            text.ocr_pages
        );

        Ok(DocumentOutcome::Completed {
            document_id: document.id,
            chunks: chunks.len(),
            translated,
            ocr_pages: text.ocr_pages,
        })
    }

    fn extract(&self, path: &Path) -> IngestResult<Extraction> {
        let doc = self.loader.open(path)?;
        let text = self.extractor.extract(doc.as_ref())?;
        Ok(Extraction { info: doc.info(), text })
    }

    async fn embed_chunks(&self, document_id: &DocumentId, drafts: Vec<ChunkDraft>) -> IngestResult<Vec<Chunk>> {
        let contents: Vec<String> = drafts.iter().map(|d| d.content.clone()).collect();

        info!("Embedding {} chunks", contents.len());
        let embeddings = self.embedder.embed(&contents).await?;
        expect_count(contents.len(), embeddings.len())?;

        let translations = match &self.translator {
            Some(translator) => {
                info!("Translating {} chunks", contents.len());
                let translated = translator.translate(&contents).await?;
                expect_count(contents.len(), translated.len())?;

                let translated: Vec<String> = translated.iter().map(|t| sanitize_for_store(t)).collect();
                let embeddings_fr = self.embedder.embed(&translated).await?;
                expect_count(translated.len(), embeddings_fr.len())?;

                Some(translated.into_iter().zip(embeddings_fr).collect::<Vec<_>>())
            }
            None => None,
        };

        let mut translations = translations.map(Vec::into_iter);
        let chunks = drafts
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(position, (draft, embedding))| {
                let chunk = Chunk::from_draft(document_id.clone(), position as u32, draft, embedding);
                match translations.as_mut().and_then(Iterator::next) {
                    Some((content_fr, embedding_fr)) => chunk.with_translation(content_fr, embedding_fr),
                    None => chunk,
                }
            })
            .collect();

        Ok(chunks)
    }

    async fn insert_in_batches(&self, chunks: &[Chunk]) -> IngestResult<()> {
        let total = chunks.len();
        let mut written = 0;

        for batch in chunks.chunks(self.insert_batch_size) {
            self.store.insert_chunks(batch).await?;
            written += batch.len();
            info!("Inserted {}/{} chunks", written, total);
        }

        Ok(())
    }

    async fn record_failure(&self, storage_path: &str, error: &str) {
        let result = match self.store.find_document(storage_path).await {
            Ok(Some(existing)) => self.store.update_status(&existing.id, &StatusUpdate::error(error)).await,
            Ok(None) => self.store.insert_document(&Document::failed(storage_path, error)).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!("Could not record failure for {}: {}", storage_path, e);
        }
    }
}

/// PDFs directly inside `dir`, hidden files excluded, sorted by file name.
///
/// A missing directory yields an empty list.
pub fn discover_pdfs(dir: &Path) -> IngestResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| IngestError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();

        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf {
            files.push(path.to_path_buf());
        } else {
            debug!("Skipping non-PDF file: {:?}", path);
        }
    }

    Ok(files)
}

fn expect_count(expected: usize, actual: usize) -> IngestResult<()> {
    if expected != actual {
        return Err(ModelError::CountMismatch { expected, actual }.into());
    }
    Ok(())
}

fn log_metadata(metadata: &DocumentMetadata) {
    info!(
        "Metadata: title={}, authors={}, doi={}",
        metadata.title.as_deref().map(|t| truncate_chars(t, 100)).unwrap_or_else(|| "(none)".to_string()),
        metadata.authors.len(),
        metadata.doi.as_deref().unwrap_or("(none)")
    );
    debug!("Authors: {:?}", metadata.authors);
}

fn log_chunk_stats(drafts: &[ChunkDraft]) {
    let with_page = drafts.iter().filter(|d| d.page.is_some()).count();
    let with_section = drafts.iter().filter(|d| d.section_title.is_some()).count();

    let mut sections: BTreeMap<&str, usize> = BTreeMap::new();
    for title in drafts.iter().filter_map(|d| d.section_title.as_deref()) {
        *sections.entry(title).or_default() += 1;
    }

    info!(
        "Chunking: {} chunks ({} with page, {} with section)",
        drafts.len(),
        with_page,
        with_section
    );
    debug!("Sections: {:?}", sections);
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::testing::{FakePdf, FixedOcr, MissingOcr};
    use crate::pdf::PdfDocument;
    use alexandria_core::DocumentStatus;
    use alexandria_db::{Database, DbError, DbResult};
    use alexandria_models::ModelResult;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves fake PDFs by file name.
    struct FakeLoader {
        docs: HashMap<String, Vec<String>>,
        info: DocumentInfo,
    }

    impl FakeLoader {
        fn new(docs: &[(&str, Vec<String>)]) -> Self {
            Self {
                docs: docs.iter().map(|(n, p)| (n.to_string(), p.clone())).collect(),
                info: DocumentInfo::default(),
            }
        }
    }

    impl DocumentLoader for FakeLoader {
        fn open(&self, path: &Path) -> IngestResult<Box<dyn PdfDocument>> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            let pages = self.docs.get(&name).ok_or_else(|| IngestError::Extraction {
                path: path.to_path_buf(),
                message: "Failed to load PDF: invalid file header".to_string(),
            })?;
            let refs: Vec<&str> = pages.iter().map(String::as_str).collect();
            let mut pdf = FakePdf::new(&refs);
            pdf.path = path.to_path_buf();
            pdf.info = self.info.clone();
            Ok(Box::new(pdf))
        }
    }

    /// Deterministic 3-dimensional embedding.
    struct FakeEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for FakeEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, texts: &[String]) -> ModelResult<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| vec![t.chars().count() as f32, 1.0, 0.0])
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, _texts: &[String]) -> ModelResult<Vec<Vec<f32>>> {
            Err(ModelError::ServerNotRunning {
                host: "http://localhost:11434".to_string(),
            })
        }
    }

    struct PrefixTranslator;

    #[async_trait]
    impl Translator for PrefixTranslator {
        async fn translate(&self, texts: &[String]) -> ModelResult<Vec<String>> {
            Ok(texts.iter().map(|t| format!("FR\0{}", t)).collect())
        }
    }

    /// SQLite store that records chunk batch sizes and can lose the
    /// document row while its metadata is written.
    struct RecordingStore {
        inner: Database,
        batches: Mutex<Vec<usize>>,
        vanish_on_metadata: bool,
    }

    impl RecordingStore {
        fn new(inner: Database) -> Self {
            Self {
                inner,
                batches: Mutex::new(Vec::new()),
                vanish_on_metadata: false,
            }
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        async fn find_document(&self, storage_path: &str) -> DbResult<Option<Document>> {
            self.inner.find_document(storage_path).await
        }

        async fn find_document_by_doi(&self, doi: &str) -> DbResult<Option<Document>> {
            self.inner.find_document_by_doi(doi).await
        }

        async fn insert_document(&self, document: &Document) -> DbResult<()> {
            self.inner.insert_document(document).await
        }

        async fn update_metadata(&self, id: &DocumentId, metadata: &DocumentMetadata) -> DbResult<()> {
            if self.vanish_on_metadata {
                self.inner.delete_document(id).await?;
                return Err(DbError::NotFound(format!("Document not found: {}", id)));
            }
            self.inner.update_metadata(id, metadata).await
        }

        async fn update_status(&self, id: &DocumentId, update: &StatusUpdate) -> DbResult<()> {
            self.inner.update_status(id, update).await
        }

        async fn delete_chunks(&self, document_id: &DocumentId) -> DbResult<u64> {
            self.inner.delete_chunks(document_id).await
        }

        async fn delete_document(&self, id: &DocumentId) -> DbResult<()> {
            self.inner.delete_document(id).await
        }

        async fn insert_chunks(&self, chunks: &[Chunk]) -> DbResult<()> {
            self.batches.lock().unwrap().push(chunks.len());
            self.inner.insert_chunks(chunks).await
        }

        async fn list_chunks(&self, document_id: &DocumentId) -> DbResult<Vec<Chunk>> {
            self.inner.list_chunks(document_id).await
        }

        async fn corpus_summary(&self) -> DbResult<CorpusSummary> {
            self.inner.corpus_summary().await
        }
    }

    fn page(text: &str) -> String {
        format!("{}\n{}", text, "Body text that is long enough to skip OCR entirely. ".repeat(3))
    }

    fn paper() -> Vec<String> {
        vec![
            format!(
                "A Study of Neural Ranking\n\nAlice Martin\nBob Stone\n\nAbstract\n{}\n10.1109/TPAMI.2020.1234567 is the identifier",
                "We study ranking. ".repeat(10)
            ),
            page("Introduction"),
            page("Results"),
        ]
    }

    fn setup(docs: &[(&str, Vec<String>)]) -> (Database, Ingestor) {
        let db = Database::open_in_memory().unwrap();
        let ingestor = Ingestor::new(
            &Config::default(),
            Arc::new(db.clone()),
            Arc::new(FakeEmbedder {
                calls: AtomicUsize::new(0),
            }),
        )
        .with_loader(Box::new(FakeLoader::new(docs)))
        .with_extractor(TextExtractor::new(50, Box::new(MissingOcr)));
        (db, ingestor)
    }

    async fn stored(db: &Database, storage_path: &str) -> (Document, Vec<Chunk>) {
        let doc = db.find_document_by_path(storage_path).unwrap().unwrap();
        let chunks = db.get_chunks_by_document(&doc.id).unwrap();
        (doc, chunks)
    }

    #[tokio::test]
    async fn test_ingest_completes_document() {
        let (db, ingestor) = setup(&[("paper.pdf", paper())]);

        let outcome = ingestor.ingest_file(Path::new("/in/paper.pdf")).await;
        let DocumentOutcome::Completed { chunks, translated, ocr_pages, .. } = outcome.clone() else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert!(chunks >= 3);
        assert_eq!(translated, 0);
        assert_eq!(ocr_pages, 0);

        let (doc, stored_chunks) = stored(&db, "data/pdfs/paper.pdf").await;
        assert_eq!(doc.status, DocumentStatus::Done);
        assert_eq!(doc.title.as_deref(), Some("A Study of Neural Ranking"));
        assert_eq!(doc.authors, vec!["Alice Martin", "Bob Stone"]);
        assert_eq!(doc.doi.as_deref(), Some("10.1109/TPAMI.2020.1234567"));
        assert!(matches!(
            doc.ingestion_log,
            Some(IngestionLog::Completed { title_extracted: true, doi_extracted: true, authors_extracted: true, journal_extracted: false, .. })
        ));

        // Positions are exactly 0..N-1
        let positions: Vec<u32> = stored_chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, (0..chunks as u32).collect::<Vec<_>>());
        assert!(stored_chunks.iter().all(|c| c.embedding.len() == 3 && c.content_fr.is_none()));

        let results = stored_chunks
            .iter()
            .find(|c| c.section_title.as_deref() == Some("Results"))
            .unwrap();
        assert_eq!(results.page, Some(3));
    }

    #[tokio::test]
    async fn test_done_document_is_skipped() {
        let (db, ingestor) = setup(&[("paper.pdf", paper())]);

        ingestor.ingest_file(Path::new("paper.pdf")).await;
        let (doc, chunks) = stored(&db, "data/pdfs/paper.pdf").await;

        let outcome = ingestor.ingest_file(Path::new("paper.pdf")).await;
        assert_eq!(outcome, DocumentOutcome::Skipped);

        let (again, chunks_again) = stored(&db, "data/pdfs/paper.pdf").await;
        assert_eq!(again.id, doc.id);
        assert_eq!(chunks_again.len(), chunks.len());
        assert_eq!(db.document_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_document_is_purged_and_retried() {
        let db = Database::open_in_memory().unwrap();
        let stale = Document::failed("data/pdfs/paper.pdf", "earlier failure");
        db.create_document(&stale).unwrap();
        db.create_chunks(&[Chunk::from_draft(stale.id.clone(), 0, ChunkDraft::new("old"), vec![0.0; 3])])
            .unwrap();

        let ingestor = Ingestor::new(
            &Config::default(),
            Arc::new(db.clone()),
            Arc::new(FakeEmbedder {
                calls: AtomicUsize::new(0),
            }),
        )
        .with_loader(Box::new(FakeLoader::new(&[("paper.pdf", paper())])))
        .with_extractor(TextExtractor::new(50, Box::new(MissingOcr)));

        let outcome = ingestor.ingest_file(Path::new("paper.pdf")).await;
        assert!(matches!(outcome, DocumentOutcome::Completed { .. }));

        let (doc, chunks) = stored(&db, "data/pdfs/paper.pdf").await;
        assert_ne!(doc.id, stale.id);
        assert_eq!(doc.status, DocumentStatus::Done);
        assert!(chunks.iter().all(|c| c.content != "old"));
        assert!(db.get_chunks_by_document(&stale.id).unwrap().is_empty());
        assert_eq!(db.document_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_interrupted_document_is_retried() {
        let (db, ingestor) = setup(&[("paper.pdf", paper())]);
        let stuck = Document::new("data/pdfs/paper.pdf");
        db.create_document(&stuck).unwrap();

        let outcome = ingestor.ingest_file(Path::new("paper.pdf")).await;
        assert!(matches!(outcome, DocumentOutcome::Completed { .. }));
        let (doc, _) = stored(&db, "data/pdfs/paper.pdf").await;
        assert_ne!(doc.id, stuck.id);
    }

    #[tokio::test]
    async fn test_translation_fills_both_languages() {
        let (db, ingestor) = setup(&[("paper.pdf", paper())]);
        let ingestor = ingestor.with_translator(Arc::new(PrefixTranslator));

        let outcome = ingestor.ingest_file(Path::new("paper.pdf")).await;
        let DocumentOutcome::Completed { chunks, translated, .. } = outcome.clone() else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(chunks, translated);

        let (_, stored_chunks) = stored(&db, "data/pdfs/paper.pdf").await;
        for chunk in &stored_chunks {
            let fr = chunk.content_fr.as_deref().unwrap();
            assert_eq!(fr, format!("FR {}", chunk.content));
            assert_eq!(chunk.embedding_fr.as_ref().unwrap()[0], fr.chars().count() as f32);
        }

        let summary = ingestor.corpus_summary().await.unwrap();
        assert_eq!(summary.documents_done, 1);
        assert_eq!(summary.total_chunks, stored_chunks.len() as i64);
        assert_eq!(summary.translated_chunks, stored_chunks.len() as i64);
    }

    #[tokio::test]
    async fn test_scanned_pages_count_as_ocr() {
        let db = Database::open_in_memory().unwrap();
        let ingestor = Ingestor::new(
            &Config::default(),
            Arc::new(db.clone()),
            Arc::new(FakeEmbedder {
                calls: AtomicUsize::new(0),
            }),
        )
        .with_loader(Box::new(FakeLoader::new(&[(
            "scan.pdf",
            vec!["".to_string(), "p2".to_string(), "   ".to_string()],
        )])))
        .with_extractor(TextExtractor::new(50, Box::new(FixedOcr("Recognized words".to_string()))));

        let outcome = ingestor.ingest_file(Path::new("scan.pdf")).await;
        assert!(matches!(outcome, DocumentOutcome::Completed { ocr_pages: 3, .. }));

        let (doc, _) = stored(&db, "data/pdfs/scan.pdf").await;
        assert!(matches!(doc.ingestion_log, Some(IngestionLog::Completed { ocr_pages_count: 3, .. })));
    }

    #[tokio::test]
    async fn test_empty_pdf_recorded_as_error() {
        let (db, ingestor) = setup(&[("empty.pdf", vec!["".to_string(), " ".to_string()])]);

        let outcome = ingestor.ingest_file(Path::new("empty.pdf")).await;
        let DocumentOutcome::Failed { error } = outcome.clone() else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert!(error.contains("no text extracted"));

        let (doc, chunks) = stored(&db, "data/pdfs/empty.pdf").await;
        assert_eq!(doc.status, DocumentStatus::Error);
        assert_eq!(doc.error_message.as_deref(), Some(error.as_str()));
        assert!(matches!(doc.ingestion_log, Some(IngestionLog::Failed { .. })));
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_isolated_to_document() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.pdf", "b.PDF", ".hidden.pdf", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let db = Database::open_in_memory().unwrap();
        let ingestor = Ingestor::new(&Config::default(), Arc::new(db.clone()), Arc::new(FailingEmbedder))
            .with_loader(Box::new(FakeLoader::new(&[("a.pdf", paper()), ("b.PDF", paper())])))
            .with_extractor(TextExtractor::new(50, Box::new(MissingOcr)));

        let report = ingestor.ingest_directory(dir.path()).await.unwrap();
        assert_eq!(report.failed, 2);
        assert_eq!(report.total(), 2);
        assert_eq!(report.failures[0].0, "data/pdfs/a.pdf");
        assert!(report.failures[0].1.contains("Processing error"));

        for path in ["data/pdfs/a.pdf", "data/pdfs/b.PDF"] {
            let (doc, chunks) = stored(&db, path).await;
            assert_eq!(doc.status, DocumentStatus::Error);
            assert!(chunks.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unreadable_file_does_not_stop_run() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a_broken.pdf", "b_paper.pdf"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let (db, ingestor) = setup(&[("b_paper.pdf", paper())]);
        let report = ingestor.ingest_directory(dir.path()).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.completed, 1);
        assert!(report.chunks_written >= 3);

        let (broken, _) = stored(&db, "data/pdfs/a_broken.pdf").await;
        assert_eq!(broken.status, DocumentStatus::Error);
        assert!(broken.error_message.unwrap().contains("invalid file header"));
    }

    #[tokio::test]
    async fn test_chunks_inserted_in_configured_batches() {
        let db = Database::open_in_memory().unwrap();
        let store = Arc::new(RecordingStore::new(db.clone()));
        let mut config = Config::default();
        config.ingest.insert_batch_size = 2;

        let ingestor = Ingestor::new(
            &config,
            store.clone(),
            Arc::new(FakeEmbedder {
                calls: AtomicUsize::new(0),
            }),
        )
        .with_loader(Box::new(FakeLoader::new(&[("paper.pdf", paper())])))
        .with_extractor(TextExtractor::new(50, Box::new(MissingOcr)));

        let outcome = ingestor.ingest_file(Path::new("paper.pdf")).await;
        let DocumentOutcome::Completed { chunks, .. } = outcome.clone() else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert!(chunks > 2);

        let batches = store.batches.lock().unwrap().clone();
        assert_eq!(batches.len(), chunks.div_ceil(2));
        assert!(batches.iter().all(|&n| n == 2 || n == chunks % 2));
        assert_eq!(batches.iter().sum::<usize>(), chunks);

        let (_, stored_chunks) = stored(&db, "data/pdfs/paper.pdf").await;
        let positions: Vec<u32> = stored_chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, (0..chunks as u32).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failure_after_row_vanished_inserts_error_row() {
        let db = Database::open_in_memory().unwrap();
        let mut store = RecordingStore::new(db.clone());
        store.vanish_on_metadata = true;

        let ingestor = Ingestor::new(
            &Config::default(),
            Arc::new(store),
            Arc::new(FakeEmbedder {
                calls: AtomicUsize::new(0),
            }),
        )
        .with_loader(Box::new(FakeLoader::new(&[("paper.pdf", paper())])))
        .with_extractor(TextExtractor::new(50, Box::new(MissingOcr)));

        let outcome = ingestor.ingest_file(Path::new("paper.pdf")).await;
        let DocumentOutcome::Failed { error } = outcome.clone() else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert!(error.contains("Document not found"));

        let (doc, chunks) = stored(&db, "data/pdfs/paper.pdf").await;
        assert_eq!(doc.status, DocumentStatus::Error);
        assert_eq!(doc.error_message.as_deref(), Some(error.as_str()));
        assert!(matches!(doc.ingestion_log, Some(IngestionLog::Failed { .. })));
        assert!(chunks.is_empty());
        assert_eq!(db.document_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_doi_skipped_without_row() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a_original.pdf", "b_copy.pdf"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let (db, ingestor) = setup(&[("a_original.pdf", paper()), ("b_copy.pdf", paper())]);
        let report = ingestor.ingest_directory(dir.path()).await.unwrap();
        assert_eq!(report.completed, 1);
        assert_eq!(report.skipped, 1);

        let (original, _) = stored(&db, "data/pdfs/a_original.pdf").await;
        assert_eq!(original.status, DocumentStatus::Done);
        assert!(db.find_document_by_path("data/pdfs/b_copy.pdf").unwrap().is_none());
        assert_eq!(db.document_count().unwrap(), 1);

        // A second run skips both, by path and by DOI
        let report = ingestor.ingest_directory(dir.path()).await.unwrap();
        assert_eq!(report.skipped, 2);
        assert_eq!(db.document_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingest_paths_reports_progress() {
        let (_, ingestor) = setup(&[("good.pdf", paper())]);
        let paths = vec![PathBuf::from("/in/bad.pdf"), PathBuf::from("/in/good.pdf")];

        let mut events = Vec::new();
        let report = ingestor
            .ingest_paths(&paths, |progress| match progress {
                Progress::Started { storage_path, index, total } => {
                    events.push(format!("start {storage_path} {index}/{total}"))
                }
                Progress::Finished { storage_path, outcome } => {
                    let kind = match outcome {
                        DocumentOutcome::Skipped => "skipped",
                        DocumentOutcome::Completed { .. } => "completed",
                        DocumentOutcome::Failed { .. } => "failed",
                    };
                    events.push(format!("{kind} {storage_path}"))
                }
            })
            .await;

        assert_eq!(
            events,
            vec![
                "start data/pdfs/bad.pdf 0/2",
                "failed data/pdfs/bad.pdf",
                "start data/pdfs/good.pdf 1/2",
                "completed data/pdfs/good.pdf",
            ]
        );
        assert_eq!(report.failed, 1);
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn test_discover_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", ".hidden.pdf", "c.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("d.pdf"), b"").unwrap();

        let names: Vec<String> = discover_pdfs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);

        assert!(discover_pdfs(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_storage_path() {
        let (_, ingestor) = setup(&[]);
        assert_eq!(ingestor.storage_path_for(Path::new("/tmp/x/paper.pdf")), "data/pdfs/paper.pdf");
    }

    #[test]
    fn test_run_report() {
        let mut report = RunReport::default();
        report.record("a", &DocumentOutcome::Skipped);
        report.record(
            "b",
            &DocumentOutcome::Completed {
                document_id: "id".to_string(),
                chunks: 4,
                translated: 4,
                ocr_pages: 0,
            },
        );
        report.record("c", &DocumentOutcome::Failed { error: "boom".to_string() });

        assert_eq!(report.total(), 3);
        assert_eq!(report.chunks_written, 4);
        assert_eq!(report.failures, vec![("c".to_string(), "boom".to_string())]);
    }
}
