//! Context retrieval with full-document fallback.
//!
//! Most queries reference a small part of the document, so each turn first
//! tries a narrow excerpt from the similarity index. Insufficiency is a
//! normal outcome, not an error: the orchestrator then substitutes a bounded
//! prefix of the full document. Index failures are absorbed here for the
//! same reason; retrieval is an optimization, never a correctness
//! dependency.

pub mod index;

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::config::RetrievalTuning;
use crate::retrieval::index::{ScoredFragment, SimilarityIndex};

/// Where a turn's context slice came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextOrigin {
    Retrieved,
    FullDocumentFallback,
}

/// The text handed to a content handler for one turn.
#[derive(Debug, Clone)]
pub struct ContextSlice {
    pub text: String,
    pub origin: ContextOrigin,
    /// Similarity scores of the contributing fragments; empty on fallback.
    pub scores: Vec<f32>,
}

impl ContextSlice {
    pub fn retrieved(excerpt: RetrievedExcerpt) -> Self {
        Self {
            text: excerpt.text,
            origin: ContextOrigin::Retrieved,
            scores: excerpt.scores,
        }
    }

    /// Builds the fallback slice: a char-boundary-safe prefix of the full
    /// document, capped at `cap_chars`.
    pub fn full_document(text: &str, cap_chars: usize) -> Self {
        let capped = match text.char_indices().nth(cap_chars) {
            Some((byte_idx, _)) => &text[..byte_idx],
            None => text,
        };
        Self {
            text: capped.to_string(),
            origin: ContextOrigin::FullDocumentFallback,
            scores: Vec::new(),
        }
    }
}

/// A sufficient excerpt assembled from index fragments.
#[derive(Debug, Clone)]
pub struct RetrievedExcerpt {
    pub text: String,
    pub scores: Vec<f32>,
}

/// Why a retrieval attempt was judged insufficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsufficiencyReason {
    IndexUnavailable,
    NothingAboveFloor,
    ExcerptTooShort,
}

/// The retrieval result: sufficient or not, never an error.
#[derive(Debug, Clone)]
pub enum RetrievalOutcome {
    Sufficient(RetrievedExcerpt),
    Insufficient(InsufficiencyReason),
}

pub struct ContextRetriever {
    index: Arc<dyn SimilarityIndex>,
    top_k: usize,
    similarity_floor: f32,
    sufficiency_floor_chars: usize,
}

impl ContextRetriever {
    pub fn new(index: Arc<dyn SimilarityIndex>, tuning: &RetrievalTuning) -> Self {
        Self {
            index,
            top_k: tuning.top_k,
            similarity_floor: tuning.similarity_floor,
            sufficiency_floor_chars: tuning.sufficiency_floor_chars,
        }
    }

    /// Searches the session's fragments and assembles a relevant excerpt.
    pub async fn retrieve(&self, query: &str, session_id: Uuid) -> RetrievalOutcome {
        let hits = match self.index.search(session_id, query, self.top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!("Similarity search failed for session {session_id}: {e}");
                return RetrievalOutcome::Insufficient(InsufficiencyReason::IndexUnavailable);
            }
        };

        assemble_excerpt(hits, self.similarity_floor, self.sufficiency_floor_chars)
    }
}

/// Filters hits by the similarity floor, restores document order, and
/// applies the sufficiency floor.
fn assemble_excerpt(
    hits: Vec<ScoredFragment>,
    similarity_floor: f32,
    sufficiency_floor_chars: usize,
) -> RetrievalOutcome {
    let mut surviving: Vec<ScoredFragment> = hits
        .into_iter()
        .filter(|f| f.score >= similarity_floor)
        .collect();

    if surviving.is_empty() {
        return RetrievalOutcome::Insufficient(InsufficiencyReason::NothingAboveFloor);
    }

    // Within-document order, not similarity-rank order.
    surviving.sort_by_key(|f| f.ordinal);

    let scores: Vec<f32> = surviving.iter().map(|f| f.score).collect();
    let text = surviving
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.chars().count() < sufficiency_floor_chars {
        return RetrievalOutcome::Insufficient(InsufficiencyReason::ExcerptTooShort);
    }

    RetrievalOutcome::Sufficient(RetrievedExcerpt { text, scores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::index::{IndexError, IndexFragment};
    use async_trait::async_trait;

    fn hit(text: &str, ordinal: u32, score: f32) -> ScoredFragment {
        ScoredFragment {
            text: text.to_string(),
            ordinal,
            score,
        }
    }

    #[test]
    fn test_fragments_below_floor_are_discarded() {
        let long = "x".repeat(300);
        let outcome = assemble_excerpt(vec![hit(&long, 0, 0.95), hit("noise", 1, 0.4)], 0.8, 200);
        match outcome {
            RetrievalOutcome::Sufficient(excerpt) => {
                assert!(!excerpt.text.contains("noise"));
                assert_eq!(excerpt.scores, vec![0.95]);
            }
            other => panic!("expected sufficient excerpt, got {other:?}"),
        }
    }

    #[test]
    fn test_excerpt_preserves_document_order_not_rank_order() {
        let a = "a".repeat(150);
        let b = "b".repeat(150);
        // Higher-scoring fragment appears later in the document.
        let outcome = assemble_excerpt(vec![hit(&b, 7, 0.99), hit(&a, 2, 0.85)], 0.8, 200);
        match outcome {
            RetrievalOutcome::Sufficient(excerpt) => {
                let a_pos = excerpt.text.find('a').unwrap();
                let b_pos = excerpt.text.find('b').unwrap();
                assert!(a_pos < b_pos, "ordinal 2 must precede ordinal 7");
                assert_eq!(excerpt.scores, vec![0.85, 0.99]);
            }
            other => panic!("expected sufficient excerpt, got {other:?}"),
        }
    }

    #[test]
    fn test_short_excerpt_is_insufficient_despite_passing_floor() {
        // 150 chars at similarity 0.85: passes the floor, fails sufficiency.
        let text = "y".repeat(150);
        let outcome = assemble_excerpt(vec![hit(&text, 0, 0.85)], 0.8, 200);
        assert!(matches!(
            outcome,
            RetrievalOutcome::Insufficient(InsufficiencyReason::ExcerptTooShort)
        ));
    }

    #[test]
    fn test_nothing_above_floor_is_insufficient() {
        let outcome = assemble_excerpt(vec![hit("irrelevant", 0, 0.2)], 0.8, 200);
        assert!(matches!(
            outcome,
            RetrievalOutcome::Insufficient(InsufficiencyReason::NothingAboveFloor)
        ));
    }

    #[test]
    fn test_full_document_fallback_caps_at_char_boundary() {
        let text = "é".repeat(10);
        let slice = ContextSlice::full_document(&text, 4);
        assert_eq!(slice.text.chars().count(), 4);
        assert_eq!(slice.origin, ContextOrigin::FullDocumentFallback);
        assert!(slice.scores.is_empty());
    }

    #[test]
    fn test_full_document_shorter_than_cap_is_untruncated() {
        let slice = ContextSlice::full_document("short doc", 3000);
        assert_eq!(slice.text, "short doc");
    }

    struct FailingIndex;

    #[async_trait]
    impl SimilarityIndex for FailingIndex {
        async fn upsert(&self, _fragments: &[IndexFragment]) -> Result<(), IndexError> {
            Err(IndexError::Api {
                status: 500,
                message: "down".to_string(),
            })
        }

        async fn delete(&self, _session_id: Uuid, _version: i32) -> Result<(), IndexError> {
            Err(IndexError::Api {
                status: 500,
                message: "down".to_string(),
            })
        }

        async fn search(
            &self,
            _session_id: Uuid,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<ScoredFragment>, IndexError> {
            Err(IndexError::Api {
                status: 500,
                message: "down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_index_failure_is_insufficient_not_an_error() {
        let tuning = crate::config::RetrievalTuning::default();
        let retriever = ContextRetriever::new(Arc::new(FailingIndex), &tuning);
        let outcome = retriever.retrieve("anything", Uuid::new_v4()).await;
        assert!(matches!(
            outcome,
            RetrievalOutcome::Insufficient(InsufficiencyReason::IndexUnavailable)
        ));
    }
}
