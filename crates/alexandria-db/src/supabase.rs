//! Hosted corpus reached through Supabase's PostgREST API.

use crate::error::{DbError, DbResult};
use crate::store::DocumentStore;
use alexandria_config::SupabaseCredentials;
use alexandria_core::{
    Chunk, CorpusSummary, Document, DocumentId, DocumentMetadata, DocumentStatus, IngestionLog, StatusUpdate,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DOCUMENTS: &str = "documents";
const CHUNKS: &str = "chunks";

/// PostgREST client for the `documents` and `chunks` tables.
#[derive(Clone)]
pub struct SupabaseStore {
    client: Client,
    rest_url: String,
}

impl SupabaseStore {
    /// Create a store authenticated with the service-role key.
    pub fn new(credentials: &SupabaseCredentials, timeout_seconds: u64) -> DbResult<Self> {
        let key = HeaderValue::from_str(&credentials.service_role_key)
            .map_err(|e| DbError::Other(format!("Invalid service role key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credentials.service_role_key))
            .map_err(|e| DbError::Other(format!("Invalid service role key: {}", e)))?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", credentials.url.trim_end_matches('/')),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}/{}", self.rest_url, name)
    }

    async fn send(&self, request: RequestBuilder) -> DbResult<Response> {
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DbError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// Exact row count of a filtered table, read from `Content-Range`.
    async fn count(&self, table: &str, filters: &[(&str, &str)]) -> DbResult<i64> {
        let request = self
            .client
            .head(self.table(table))
            .query(&[("select", "id")])
            .query(filters)
            .header("Prefer", "count=exact");

        let response = self.send(request).await?;
        content_range_total(&response)
    }
}

/// Parse the total out of a `Content-Range` header such as `0-24/3573` or `*/0`.
fn content_range_total(response: &Response) -> DbResult<i64> {
    let header = response
        .headers()
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DbError::Other("Missing Content-Range header".to_string()))?;

    header
        .rsplit('/')
        .next()
        .and_then(|total| total.trim().parse().ok())
        .ok_or_else(|| DbError::Other(format!("Unexpected Content-Range: {}", header)))
}

#[async_trait]
impl DocumentStore for SupabaseStore {
    async fn find_document(&self, storage_path: &str) -> DbResult<Option<Document>> {
        debug!("Looking up document {}", storage_path);

        let request = self.client.get(self.table(DOCUMENTS)).query(&[
            ("select", "*".to_string()),
            ("storage_path", format!("eq.{}", storage_path)),
            ("limit", "1".to_string()),
        ]);

        let rows: Vec<DocumentRow> = self.send(request).await?.json().await?;
        Ok(rows.into_iter().next().map(Document::from))
    }

    async fn find_document_by_doi(&self, doi: &str) -> DbResult<Option<Document>> {
        debug!("Looking up done document with DOI {}", doi);

        let request = self.client.get(self.table(DOCUMENTS)).query(&[
            ("select", "*".to_string()),
            ("doi", format!("eq.{}", doi)),
            ("status", format!("eq.{}", DocumentStatus::Done.as_str())),
            ("limit", "1".to_string()),
        ]);

        let rows: Vec<DocumentRow> = self.send(request).await?.json().await?;
        Ok(rows.into_iter().next().map(Document::from))
    }

    async fn insert_document(&self, document: &Document) -> DbResult<()> {
        let request = self
            .client
            .post(self.table(DOCUMENTS))
            .header("Prefer", "return=minimal")
            .json(document);

        self.send(request).await?;
        Ok(())
    }

    async fn update_metadata(&self, id: &DocumentId, metadata: &DocumentMetadata) -> DbResult<()> {
        let patch = MetadataPatch {
            metadata,
            updated_at: Utc::now(),
        };

        let request = self
            .client
            .patch(self.table(DOCUMENTS))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(&patch);

        self.send(request).await?;
        Ok(())
    }

    async fn update_status(&self, id: &DocumentId, update: &StatusUpdate) -> DbResult<()> {
        let patch = StatusPatch {
            status: update.status,
            error_message: update.error_message.as_deref(),
            ingestion_log: &update.ingestion_log,
            updated_at: update.updated_at(),
        };

        let request = self
            .client
            .patch(self.table(DOCUMENTS))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(&patch);

        self.send(request).await?;
        Ok(())
    }

    async fn delete_chunks(&self, document_id: &DocumentId) -> DbResult<u64> {
        let request = self
            .client
            .delete(self.table(CHUNKS))
            .query(&[("document_id", format!("eq.{}", document_id))])
            .header("Prefer", "return=minimal, count=exact");

        let response = self.send(request).await?;
        // Older PostgREST versions omit the count on DELETE
        Ok(content_range_total(&response).map(|n| n.max(0) as u64).unwrap_or(0))
    }

    async fn delete_document(&self, id: &DocumentId) -> DbResult<()> {
        let request = self
            .client
            .delete(self.table(DOCUMENTS))
            .query(&[("id", format!("eq.{}", id))])
            .header("Prefer", "return=minimal");

        self.send(request).await?;
        Ok(())
    }

    async fn insert_chunks(&self, chunks: &[Chunk]) -> DbResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        debug!("Inserting {} chunks", chunks.len());
        let request = self
            .client
            .post(self.table(CHUNKS))
            .header("Prefer", "return=minimal")
            .json(chunks);

        self.send(request).await?;
        Ok(())
    }

    async fn list_chunks(&self, document_id: &DocumentId) -> DbResult<Vec<Chunk>> {
        let request = self.client.get(self.table(CHUNKS)).query(&[
            ("select", "*".to_string()),
            ("document_id", format!("eq.{}", document_id)),
            ("order", "position.asc".to_string()),
        ]);

        let rows: Vec<ChunkRow> = self.send(request).await?.json().await?;
        rows.into_iter().map(Chunk::try_from).collect()
    }

    async fn corpus_summary(&self) -> DbResult<CorpusSummary> {
        Ok(CorpusSummary {
            documents_done: self.count(DOCUMENTS, &[("status", "eq.done")]).await?,
            total_chunks: self.count(CHUNKS, &[]).await?,
            translated_chunks: self.count(CHUNKS, &[("content_fr", "not.is.null")]).await?,
        })
    }
}

#[derive(Serialize)]
struct MetadataPatch<'a> {
    #[serde(flatten)]
    metadata: &'a DocumentMetadata,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct StatusPatch<'a> {
    status: DocumentStatus,
    error_message: Option<&'a str>,
    ingestion_log: &'a IngestionLog,
    updated_at: DateTime<Utc>,
}

/// A `documents` row as PostgREST returns it. Nullable columns are tolerated.
#[derive(Deserialize)]
struct DocumentRow {
    id: DocumentId,
    title: Option<String>,
    authors: Option<Vec<String>>,
    doi: Option<String>,
    journal: Option<String>,
    published_at: Option<NaiveDate>,
    storage_path: String,
    status: Option<String>,
    error_message: Option<String>,
    ingestion_log: Option<serde_json::Value>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            title: row.title,
            authors: row.authors.unwrap_or_default(),
            doi: row.doi,
            journal: row.journal,
            published_at: row.published_at,
            storage_path: row.storage_path,
            status: row
                .status
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DocumentStatus::Error),
            error_message: row.error_message,
            ingestion_log: row.ingestion_log.and_then(|v| serde_json::from_value(v).ok()),
            updated_at: row.updated_at.unwrap_or_else(Utc::now),
        }
    }
}

/// pgvector columns come back either as JSON arrays or as `"[x,y,...]"` text.
#[derive(Deserialize)]
#[serde(untagged)]
enum VectorValue {
    Array(Vec<f32>),
    Text(String),
}

impl VectorValue {
    fn into_vec(self) -> DbResult<Vec<f32>> {
        match self {
            VectorValue::Array(v) => Ok(v),
            VectorValue::Text(s) => parse_vector_literal(&s),
        }
    }
}

fn parse_vector_literal(literal: &str) -> DbResult<Vec<f32>> {
    let inner = literal.trim().trim_start_matches('[').trim_end_matches(']');
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|e| DbError::Other(format!("Invalid vector component '{}': {}", part, e)))
        })
        .collect()
}

#[derive(Deserialize)]
struct ChunkRow {
    id: String,
    document_id: DocumentId,
    content: String,
    content_fr: Option<String>,
    position: u32,
    page: Option<u32>,
    section_title: Option<String>,
    embedding: VectorValue,
    embedding_fr: Option<VectorValue>,
}

impl TryFrom<ChunkRow> for Chunk {
    type Error = DbError;

    fn try_from(row: ChunkRow) -> DbResult<Self> {
        Ok(Chunk {
            id: row.id,
            document_id: row.document_id,
            content: row.content,
            content_fr: row.content_fr,
            position: row.position,
            page: row.page,
            section_title: row.section_title,
            embedding: row.embedding.into_vec()?,
            embedding_fr: row.embedding_fr.map(VectorValue::into_vec).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alexandria_core::ChunkDraft;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> SupabaseStore {
        let credentials = SupabaseCredentials {
            url: server.uri(),
            service_role_key: "service-key".to_string(),
        };
        SupabaseStore::new(&credentials, 5).unwrap()
    }

    #[test]
    fn test_parse_vector_literal() {
        assert_eq!(parse_vector_literal("[0.5,-1,2.25]").unwrap(), vec![0.5, -1.0, 2.25]);
        assert!(parse_vector_literal("[]").unwrap().is_empty());
        assert!(parse_vector_literal("[a,b]").is_err());
    }

    #[tokio::test]
    async fn test_find_document_sends_auth_and_filter() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/documents"))
            .and(query_param("storage_path", "eq.data/pdfs/a.pdf"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "doc-1",
                "title": "A Paper",
                "authors": null,
                "doi": null,
                "journal": null,
                "published_at": null,
                "storage_path": "data/pdfs/a.pdf",
                "status": "done",
                "error_message": null,
                "ingestion_log": {"error": "old failure", "ingested_at": "2024-01-01T00:00:00Z"},
                "updated_at": "2024-01-01T00:00:00+00:00"
            }])))
            .mount(&server)
            .await;

        let doc = store(&server).find_document("data/pdfs/a.pdf").await.unwrap().unwrap();
        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.status, DocumentStatus::Done);
        assert!(doc.authors.is_empty());
        assert!(matches!(doc.ingestion_log, Some(IngestionLog::Failed { .. })));
    }

    #[tokio::test]
    async fn test_find_document_absent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/documents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        assert!(store(&server).find_document("data/pdfs/none.pdf").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_document_by_doi_filters_done() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/documents"))
            .and(query_param("doi", "eq.10.1000/xyz"))
            .and(query_param("status", "eq.done"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "doc-7",
                "title": null,
                "authors": ["Doe, A."],
                "doi": "10.1000/xyz",
                "journal": null,
                "published_at": null,
                "storage_path": "data/pdfs/original.pdf",
                "status": "done",
                "error_message": null,
                "ingestion_log": null,
                "updated_at": "2024-01-01T00:00:00+00:00"
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let doc = store(&server).find_document_by_doi("10.1000/xyz").await.unwrap().unwrap();
        assert_eq!(doc.id, "doc-7");
        assert_eq!(doc.storage_path, "data/pdfs/original.pdf");
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/documents"))
            .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
            .mount(&server)
            .await;

        let err = store(&server)
            .insert_document(&Document::new("data/pdfs/a.pdf"))
            .await
            .unwrap_err();
        match err {
            DbError::Api { status, message } => {
                assert_eq!(status, 409);
                assert!(message.contains("duplicate"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_status_patches_by_id() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/rest/v1/documents"))
            .and(query_param("id", "eq.doc-1"))
            .and(body_partial_json(json!({"status": "error", "error_message": "boom"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        store(&server)
            .update_status(&"doc-1".to_string(), &StatusUpdate::error("boom"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_insert_chunks_posts_vectors_as_arrays() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/chunks"))
            .and(body_partial_json(json!([{"position": 0, "embedding": [0.5, 0.25]}])))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let chunk = Chunk::from_draft("doc-1".to_string(), 0, ChunkDraft::new("text"), vec![0.5, 0.25]);
        store(&server).insert_chunks(&[chunk]).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_chunks_accepts_text_vectors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/chunks"))
            .and(query_param("order", "position.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "c1",
                "document_id": "doc-1",
                "content": "hello",
                "content_fr": "bonjour",
                "position": 0,
                "page": 1,
                "section_title": null,
                "embedding": "[0.1,0.2]",
                "embedding_fr": [0.3, 0.4]
            }])))
            .mount(&server)
            .await;

        let chunks = store(&server).list_chunks(&"doc-1".to_string()).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].embedding, vec![0.1, 0.2]);
        assert_eq!(chunks[0].embedding_fr, Some(vec![0.3, 0.4]));
    }

    #[tokio::test]
    async fn test_corpus_summary_reads_counts() {
        let server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/rest/v1/documents"))
            .and(query_param("status", "eq.done"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "*/3"))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/rest/v1/chunks"))
            .and(query_param("content_fr", "not.is.null"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "*/7"))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/rest/v1/chunks"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "0-0/42"))
            .with_priority(2)
            .mount(&server)
            .await;

        let summary = store(&server).corpus_summary().await.unwrap();
        assert_eq!(summary.documents_done, 3);
        assert_eq!(summary.total_chunks, 42);
        assert_eq!(summary.translated_chunks, 7);
    }

    #[tokio::test]
    async fn test_purge_deletes_chunks_then_document() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/rest/v1/chunks"))
            .and(query_param("document_id", "eq.doc-1"))
            .respond_with(ResponseTemplate::new(204).insert_header("Content-Range", "*/5"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/documents"))
            .and(query_param("id", "eq.doc-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let removed = store(&server).purge_document(&"doc-1".to_string()).await.unwrap();
        assert_eq!(removed, 5);
    }
}
