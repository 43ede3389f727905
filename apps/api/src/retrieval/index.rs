//! Similarity-search index boundary.
//!
//! The index is an external HTTP service; this module defines the trait
//! surface the core depends on (`upsert` / `delete` / `search`) and the
//! production `reqwest`-backed client. Scores are normalized similarity in
//! [0,1], higher is more similar. Fragment ids are deterministic
//! (`{session_id}_chunk_{ordinal}`), which makes re-inserting a version's
//! fragments an overwrite rather than an accumulation.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("index API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// One fragment of a document version submitted for similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexFragment {
    pub fragment_id: String,
    pub session_id: Uuid,
    pub version: i32,
    pub ordinal: u32,
    pub text: String,
}

/// A search hit. `ordinal` is the fragment's position within its document,
/// used to restore document order when assembling an excerpt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredFragment {
    pub text: String,
    pub ordinal: u32,
    pub score: f32,
}

/// The external similarity index. Every access is keyed by session id, so
/// sessions can never observe each other's fragments.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    async fn upsert(&self, fragments: &[IndexFragment]) -> Result<(), IndexError>;

    /// Deletes all fragments owned by `(session_id, version)`.
    async fn delete(&self, session_id: Uuid, version: i32) -> Result<(), IndexError>;

    async fn search(
        &self,
        session_id: Uuid,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredFragment>, IndexError>;
}

/// Splits a document version into non-overlapping fragments of
/// `chunk_words` words, in document order. A document too short to fill a
/// single chunk becomes one fragment.
pub fn chunk_fragments(
    session_id: Uuid,
    version: i32,
    text: &str,
    chunk_words: usize,
) -> Vec<IndexFragment> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut fragments = Vec::new();

    for (ordinal, chunk) in words.chunks(chunk_words.max(1)).enumerate() {
        let chunk_text = chunk.join(" ");
        if chunk_text.is_empty() {
            continue;
        }
        fragments.push(IndexFragment {
            fragment_id: format!("{session_id}_chunk_{ordinal}"),
            session_id,
            version,
            ordinal: ordinal as u32,
            text: chunk_text,
        });
    }

    fragments
}

/// Production index client speaking the vector-index service's JSON API.
pub struct HttpVectorIndex {
    client: Client,
    base_url: String,
}

impl HttpVectorIndex {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, IndexError> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IndexError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    fragments: &'a [IndexFragment],
}

#[derive(Serialize)]
struct DeleteRequest {
    session_id: Uuid,
    version: i32,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    session_id: Uuid,
    query: &'a str,
    k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<ScoredFragment>,
}

#[async_trait]
impl SimilarityIndex for HttpVectorIndex {
    async fn upsert(&self, fragments: &[IndexFragment]) -> Result<(), IndexError> {
        self.post_json("/v1/fragments/upsert", &UpsertRequest { fragments })
            .await?;
        Ok(())
    }

    async fn delete(&self, session_id: Uuid, version: i32) -> Result<(), IndexError> {
        self.post_json(
            "/v1/fragments/delete",
            &DeleteRequest {
                session_id,
                version,
            },
        )
        .await?;
        Ok(())
    }

    async fn search(
        &self,
        session_id: Uuid,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredFragment>, IndexError> {
        let response = self
            .post_json(
                "/v1/fragments/search",
                &SearchRequest {
                    session_id,
                    query,
                    k,
                },
            )
            .await?;

        let parsed: SearchResponse = response.json().await?;
        Ok(parsed.results)
    }
}
