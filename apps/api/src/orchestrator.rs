//! Query orchestration.
//!
//! Drives the full turn pipeline: route, retrieve (with full-document
//! fallback), dispatch the category's handler, separate artifact from
//! explanation, commit a new document version, and refresh the similarity
//! index with a replace-not-accumulate delta. Sequential, no internal
//! concurrency; the per-session lock in the route layer serializes turns.
//!
//! Failure policy: edges absorb their own failures. A failed handler call
//! yields a static apology and leaves the lineage untouched; a failed
//! reindex is logged and never affects the turn's outcome.

use std::sync::Arc;

use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RetrievalTuning;
use crate::docio::{self, ParsedUpload};
use crate::errors::AppError;
use crate::generation::{HandlerRegistry, HandlerRequest, SectionTarget};
use crate::models::document::{DocumentVersionRow, SectionSpan};
use crate::models::session::role;
use crate::retrieval::index::{chunk_fragments, IndexFragment, SimilarityIndex};
use crate::retrieval::{ContextRetriever, ContextSlice, RetrievalOutcome};
use crate::routing::{IntentRouter, QueryCategory, RoutedEntities};
use crate::separator;
use crate::sessions::versioning::NewVersion;
use crate::sessions::{self, versioning};

/// Static reply when a handler call fails. The current version stays
/// current; a failed turn must never corrupt the lineage.
pub const FALLBACK_REPLY: &str =
    "I ran into a problem while working on that request. Your resume has not \
     been changed. Please try again in a moment.";

/// Reply when the general handler produces nothing usable.
const GENERAL_FALLBACK_REPLY: &str = "I can help you optimize your resume in several ways:

1. **Company Optimization**: tailor your resume for a specific company (e.g., \"Optimize for Google\")
2. **Job Matching**: match your resume against a job description and close the gaps
3. **Section Enhancement**: strengthen a specific section with better language and quantification

What would you like to do?";

/// Queries longer than this are treated as containing an inline job
/// description when the router extracted none.
const JD_INLINE_THRESHOLD_CHARS: usize = 300;

/// Routing metadata surfaced with every reply.
#[derive(Debug, Clone, Serialize)]
pub struct RoutingSummary {
    pub category: QueryCategory,
    pub confidence: f32,
    pub used_retrieval: bool,
    pub used_fallback: bool,
}

/// The reindex instruction for one committed version: remove the replaced
/// version's fragments, insert the new version's. Returned with the turn so
/// callers can retry a failed refresh independently.
#[derive(Debug, Clone, Serialize)]
pub struct IndexDelta {
    pub session_id: Uuid,
    pub delete_version: i32,
    pub insert: Vec<IndexFragment>,
}

/// The normalized result of one turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub new_version: Option<DocumentVersionRow>,
    pub index_delta: Option<IndexDelta>,
    pub routing: RoutingSummary,
}

/// Result of starting a session from an upload.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStart {
    pub session_id: Uuid,
    pub version: DocumentVersionRow,
    pub file_name: String,
    pub word_count: usize,
}

pub struct Orchestrator {
    db: PgPool,
    s3: aws_sdk_s3::Client,
    s3_bucket: String,
    router: IntentRouter,
    retriever: ContextRetriever,
    registry: HandlerRegistry,
    index: Arc<dyn SimilarityIndex>,
    tuning: RetrievalTuning,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: PgPool,
        s3: aws_sdk_s3::Client,
        s3_bucket: String,
        router: IntentRouter,
        retriever: ContextRetriever,
        registry: HandlerRegistry,
        index: Arc<dyn SimilarityIndex>,
        tuning: RetrievalTuning,
    ) -> Self {
        Self {
            db,
            s3,
            s3_bucket,
            router,
            retriever,
            registry,
            index,
            tuning,
        }
    }

    /// Creates a session from a parsed upload: version 1 ("Original") is
    /// committed, indexed, and greeted.
    pub async fn start_session(&self, upload: ParsedUpload) -> Result<SessionStart, AppError> {
        let session = sessions::create_session(&self.db)
            .await
            .map_err(AppError::Internal)?;

        let version = versioning::append_version(
            &self.db,
            &self.s3,
            &self.s3_bucket,
            session.id,
            NewVersion {
                content: &upload.text,
                sections: &upload.sections,
                version_name: "Original",
            },
        )
        .await?;

        let delta = IndexDelta {
            session_id: session.id,
            delete_version: 0,
            insert: chunk_fragments(session.id, version.version, &upload.text, self.tuning.chunk_words),
        };
        apply_index_delta(self.index.as_ref(), &delta).await;

        sessions::add_message(
            &self.db,
            session.id,
            role::SYSTEM,
            "Resume loaded successfully. How can I help you optimize it?",
        )
        .await
        .map_err(AppError::Internal)?;

        info!(
            "Started session {} from {} ({} words, {} sections)",
            session.id,
            upload.file_name,
            upload.word_count,
            upload.sections.len()
        );

        Ok(SessionStart {
            session_id: session.id,
            version,
            file_name: upload.file_name,
            word_count: upload.word_count,
        })
    }

    /// Processes one user turn to completion.
    pub async fn handle_query(&self, session_id: Uuid, query: &str) -> Result<TurnOutcome, AppError> {
        let current = versioning::get_current_version(&self.db, session_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("No resume uploaded for this session yet".to_string())
            })?;

        // The window is read before the current query is appended, so it
        // holds prior turns only; the query itself travels separately.
        let recent = sessions::recent_messages(&self.db, session_id, self.tuning.history_window)
            .await
            .map_err(AppError::Internal)?;
        sessions::add_message(&self.db, session_id, role::USER, query)
            .await
            .map_err(AppError::Internal)?;

        let labels = current.canonical_labels();
        let routing = self.router.route(query, &recent, &labels).await;
        info!(
            "Routed query to {} (confidence {:.2})",
            routing.category.as_str(),
            routing.confidence
        );

        let (context, used_retrieval) = match self.retriever.retrieve(query, session_id).await {
            RetrievalOutcome::Sufficient(excerpt) => (ContextSlice::retrieved(excerpt), true),
            RetrievalOutcome::Insufficient(reason) => {
                debug!("Retrieval insufficient ({reason:?}); using full-document context");
                (
                    ContextSlice::full_document(
                        &current.content,
                        self.tuning.full_context_cap_chars,
                    ),
                    false,
                )
            }
        };

        let summary = RoutingSummary {
            category: routing.category,
            confidence: routing.confidence,
            used_retrieval,
            used_fallback: !used_retrieval,
        };

        let mut entities = routing.entities.clone();
        if let Some(ask) = clarification_request(routing.category, &mut entities, query, &labels) {
            return self.reply_only(session_id, ask, summary).await;
        }

        // Resolve the target span for a section-enhancement turn.
        let section_target: Option<(SectionSpan, String)> =
            if routing.category == QueryCategory::SectionEnhancement {
                let resolved = entities.section.as_deref().and_then(|label| {
                    current
                        .section_span(label)
                        .cloned()
                        .map(|span| (span, label.to_string()))
                });
                match resolved {
                    Some(target) => Some(target),
                    None => {
                        return self
                            .reply_only(session_id, unknown_section_reply(&labels), summary)
                            .await;
                    }
                }
            } else {
                None
            };

        let request = HandlerRequest {
            query,
            context: &context,
            entities: &entities,
            history: &recent,
            section: section_target.as_ref().map(|(span, label)| SectionTarget {
                label: label.as_str(),
                content: &current.content[span.start..span.end],
            }),
        };

        let raw = match self
            .registry
            .handler_for(routing.category)
            .generate(request)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "Handler {} failed: {e}; lineage untouched",
                    routing.category.as_str()
                );
                return self
                    .reply_only(session_id, FALLBACK_REPLY.to_string(), summary)
                    .await;
            }
        };

        // General turns are conversational and never version the document.
        if routing.category == QueryCategory::General {
            let trimmed = raw.trim();
            let reply = if trimmed.is_empty() {
                GENERAL_FALLBACK_REPLY.to_string()
            } else {
                trimmed.to_string()
            };
            return self.reply_only(session_id, reply, summary).await;
        }

        let separated = separator::separate(&raw);
        if !separated.separated {
            warn!("Handler output missing the delimiter contract; keeping the whole output as the artifact");
        }

        let artifact = separated.artifact.trim();
        if artifact.is_empty() {
            // Nothing to version; surface whatever explanation exists.
            let explanation = separated.explanation.trim();
            let reply = if explanation.is_empty() {
                FALLBACK_REPLY.to_string()
            } else {
                explanation.to_string()
            };
            return self.reply_only(session_id, reply, summary).await;
        }

        let (new_text, version_name) = revision_plan(
            routing.category,
            &entities,
            artifact,
            &current.content,
            section_target.as_ref(),
        );

        // Point of no return: row + pointer commit atomically.
        let new_sections = docio::detect_sections(&new_text);
        let new_version = versioning::append_version(
            &self.db,
            &self.s3,
            &self.s3_bucket,
            session_id,
            NewVersion {
                content: &new_text,
                sections: &new_sections,
                version_name: &version_name,
            },
        )
        .await?;

        let delta = IndexDelta {
            session_id,
            delete_version: current.version,
            insert: chunk_fragments(
                session_id,
                new_version.version,
                &new_text,
                self.tuning.chunk_words,
            ),
        };
        // Reindex failures degrade search quality, never the document.
        apply_index_delta(self.index.as_ref(), &delta).await;

        let reply = compose_reply(
            routing.category,
            &entities,
            separated.explanation.trim(),
            artifact,
            &version_name,
        );
        sessions::add_message(&self.db, session_id, role::ASSISTANT, &reply)
            .await
            .map_err(AppError::Internal)?;

        Ok(TurnOutcome {
            reply,
            new_version: Some(new_version),
            index_delta: Some(delta),
            routing: summary,
        })
    }

    /// Reverts by committing a new version that copies the target's content.
    /// Lineage is never rewritten.
    pub async fn revert_to_version(
        &self,
        session_id: Uuid,
        target: i32,
    ) -> Result<(DocumentVersionRow, IndexDelta), AppError> {
        let current = versioning::get_current_version(&self.db, session_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("No resume uploaded for this session yet".to_string())
            })?;
        let target_row = versioning::get_version(&self.db, session_id, target)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Version {target} not found")))?;

        let name = format!("Reverted to {}", target_row.version_name);
        let new_version = versioning::append_version(
            &self.db,
            &self.s3,
            &self.s3_bucket,
            session_id,
            NewVersion {
                content: &target_row.content,
                sections: &target_row.sections.0,
                version_name: &name,
            },
        )
        .await?;

        let delta = IndexDelta {
            session_id,
            delete_version: current.version,
            insert: chunk_fragments(
                session_id,
                new_version.version,
                &new_version.content,
                self.tuning.chunk_words,
            ),
        };
        apply_index_delta(self.index.as_ref(), &delta).await;

        sessions::add_message(&self.db, session_id, role::SYSTEM, &format!("{name}."))
            .await
            .map_err(AppError::Internal)?;

        Ok((new_version, delta))
    }

    async fn reply_only(
        &self,
        session_id: Uuid,
        reply: String,
        routing: RoutingSummary,
    ) -> Result<TurnOutcome, AppError> {
        sessions::add_message(&self.db, session_id, role::ASSISTANT, &reply)
            .await
            .map_err(AppError::Internal)?;
        Ok(TurnOutcome {
            reply,
            new_version: None,
            index_delta: None,
            routing,
        })
    }
}

/// Applies a reindex delta. The contract is replace-not-accumulate: after a
/// full application the session's fragments are exactly the new version's,
/// and re-applying the same delta is a no-op.
///
/// Physical order is insert-first, delete-second: fragment ids are
/// deterministic per ordinal, so the insert overwrites shared ids in place
/// and the trailing delete removes only fragments still owned by the
/// replaced version. A failure between the two calls leaves at worst a
/// union of old and new fragments, never an empty index, so a live document
/// always stays searchable.
pub async fn apply_index_delta(index: &dyn SimilarityIndex, delta: &IndexDelta) -> bool {
    if let Err(e) = index.upsert(&delta.insert).await {
        warn!(
            "Fragment insert failed for session {}: {e}; previous fragments retained",
            delta.session_id
        );
        return false;
    }

    if delta.delete_version > 0 {
        if let Err(e) = index.delete(delta.session_id, delta.delete_version).await {
            warn!(
                "Stale fragment cleanup failed for session {} version {}: {e}",
                delta.session_id, delta.delete_version
            );
            return false;
        }
    }

    true
}

/// Decides whether the turn must stop and ask the user for a missing
/// entity. May promote a long query into the job-description entity.
fn clarification_request(
    category: QueryCategory,
    entities: &mut RoutedEntities,
    query: &str,
    labels: &[String],
) -> Option<String> {
    match category {
        QueryCategory::CompanyOptimization if entities.company.is_none() => Some(
            "I'd be happy to optimize your resume for a company! Which company are you targeting?"
                .to_string(),
        ),
        QueryCategory::JobMatching if entities.job_description.is_none() => {
            if query.chars().count() > JD_INLINE_THRESHOLD_CHARS {
                // A long query is the job description itself.
                entities.job_description = Some(query.to_string());
                None
            } else {
                Some(
                    "Please provide the job description you'd like to match your resume against."
                        .to_string(),
                )
            }
        }
        QueryCategory::SectionEnhancement
            if entities.section.is_none() || !entities.section_resolved =>
        {
            match entities.section.as_deref() {
                Some(unresolved) => Some(format!(
                    "I couldn't find a section matching '{unresolved}'. Available sections: {}. Which one would you like to enhance?",
                    labels.join(", ")
                )),
                None => Some(format!(
                    "Which section would you like me to enhance? Available sections: {}.",
                    labels.join(", ")
                )),
            }
        }
        _ => None,
    }
}

fn unknown_section_reply(labels: &[String]) -> String {
    format!(
        "Which section would you like me to enhance? Available sections: {}.",
        labels.join(", ")
    )
}

/// Builds the new document text and version name for a mutating turn.
fn revision_plan(
    category: QueryCategory,
    entities: &RoutedEntities,
    artifact: &str,
    current_text: &str,
    section_target: Option<&(SectionSpan, String)>,
) -> (String, String) {
    match category {
        QueryCategory::SectionEnhancement => match section_target {
            Some((span, label)) => (
                splice_section(current_text, span, artifact),
                format!("Enhanced {label}"),
            ),
            None => (artifact.to_string(), "Updated".to_string()),
        },
        QueryCategory::CompanyOptimization => {
            let company = entities.company.as_deref().unwrap_or("Company");
            (artifact.to_string(), format!("Optimized for {company}"))
        }
        QueryCategory::JobMatching => (artifact.to_string(), "Job Description Match".to_string()),
        QueryCategory::General => (artifact.to_string(), "Updated".to_string()),
    }
}

/// Replaces a section body in place, leaving the heading and the rest of
/// the document untouched.
fn splice_section(text: &str, span: &SectionSpan, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..span.start]);
    out.push_str(replacement.trim());
    out.push('\n');
    if span.end < text.len() {
        out.push('\n');
        out.push_str(&text[span.end..]);
    }
    out
}

/// Composes the user-facing reply in the voice of each category.
fn compose_reply(
    category: QueryCategory,
    entities: &RoutedEntities,
    explanation: &str,
    artifact: &str,
    version_name: &str,
) -> String {
    match category {
        QueryCategory::CompanyOptimization => {
            let company = entities.company.as_deref().unwrap_or("the company");
            let mut reply = format!("I've optimized your resume for {company}.");
            if !explanation.is_empty() {
                reply.push_str(&format!("\n\n**Key Changes:**\n{explanation}"));
            }
            reply
        }
        QueryCategory::JobMatching => {
            if explanation.is_empty() {
                "I've optimized your resume to better match the job description.".to_string()
            } else {
                format!("**Match Analysis & Changes:**\n{explanation}")
            }
        }
        QueryCategory::SectionEnhancement => {
            let label = entities.section.as_deref().unwrap_or("requested");
            let mut reply = format!("I've enhanced your {label} section.");
            if !explanation.is_empty() {
                reply.push_str(&format!("\n\n**Improvements Made:**\n{explanation}"));
            }
            reply.push_str(&format!("\n\n**Enhanced Section:**\n{artifact}"));
            reply
        }
        QueryCategory::General => format!("I've updated your resume ({version_name})."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::index::{IndexError, ScoredFragment};
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ────────────────────────────────────────────────────────────────────
    // In-memory index fake
    // ────────────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct InMemoryIndex {
        fragments: Mutex<Vec<IndexFragment>>,
    }

    impl InMemoryIndex {
        fn snapshot(&self) -> Vec<IndexFragment> {
            self.fragments.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SimilarityIndex for InMemoryIndex {
        async fn upsert(&self, new: &[IndexFragment]) -> Result<(), IndexError> {
            let mut fragments = self.fragments.lock().unwrap();
            for fragment in new {
                match fragments
                    .iter_mut()
                    .find(|f| f.fragment_id == fragment.fragment_id)
                {
                    Some(existing) => *existing = fragment.clone(),
                    None => fragments.push(fragment.clone()),
                }
            }
            Ok(())
        }

        async fn delete(&self, session_id: Uuid, version: i32) -> Result<(), IndexError> {
            self.fragments
                .lock()
                .unwrap()
                .retain(|f| !(f.session_id == session_id && f.version == version));
            Ok(())
        }

        async fn search(
            &self,
            _session_id: Uuid,
            _query: &str,
            _k: usize,
        ) -> Result<Vec<ScoredFragment>, IndexError> {
            Ok(Vec::new())
        }
    }

    struct BrokenUpsertIndex(InMemoryIndex);

    #[async_trait]
    impl SimilarityIndex for BrokenUpsertIndex {
        async fn upsert(&self, _new: &[IndexFragment]) -> Result<(), IndexError> {
            Err(IndexError::Api {
                status: 503,
                message: "unavailable".to_string(),
            })
        }

        async fn delete(&self, session_id: Uuid, version: i32) -> Result<(), IndexError> {
            self.0.delete(session_id, version).await
        }

        async fn search(
            &self,
            session_id: Uuid,
            query: &str,
            k: usize,
        ) -> Result<Vec<ScoredFragment>, IndexError> {
            self.0.search(session_id, query, k).await
        }
    }

    fn delta_for(session_id: Uuid, old: i32, new: i32, text: &str) -> IndexDelta {
        IndexDelta {
            session_id,
            delete_version: old,
            insert: chunk_fragments(session_id, new, text, 5),
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Reindex protocol
    // ────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_reindex_replaces_not_accumulates() {
        let session_id = Uuid::new_v4();
        let index = InMemoryIndex::default();

        let v1 = delta_for(session_id, 0, 1, "one two three four five six seven eight");
        assert!(apply_index_delta(&index, &v1).await);
        assert_eq!(index.snapshot().len(), 2);

        let v2 = delta_for(session_id, 1, 2, "short now");
        assert!(apply_index_delta(&index, &v2).await);

        let remaining = index.snapshot();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().all(|f| f.version == 2));
    }

    #[tokio::test]
    async fn test_reindex_delta_is_idempotent() {
        let session_id = Uuid::new_v4();
        let index = InMemoryIndex::default();

        let v1 = delta_for(session_id, 0, 1, "alpha beta gamma delta epsilon zeta eta");
        apply_index_delta(&index, &v1).await;

        let v2 = delta_for(session_id, 1, 2, "fresh content for version two here now ok");
        apply_index_delta(&index, &v2).await;
        let first = index.snapshot();

        apply_index_delta(&index, &v2).await;
        let second = index.snapshot();

        assert_eq!(first, second, "re-applying the same delta must be a no-op");
        assert!(second.iter().all(|f| f.version == 2));
    }

    #[tokio::test]
    async fn test_consecutive_versions_leave_only_latest_fragments() {
        let session_id = Uuid::new_v4();
        let index = InMemoryIndex::default();

        apply_index_delta(&index, &delta_for(session_id, 0, 1, "v1 words here today")).await;
        apply_index_delta(&index, &delta_for(session_id, 1, 2, "v2 words here today")).await;
        apply_index_delta(&index, &delta_for(session_id, 2, 3, "v3 words here today")).await;

        let remaining = index.snapshot();
        assert!(!remaining.is_empty());
        assert!(remaining.iter().all(|f| f.version == 3));
    }

    #[tokio::test]
    async fn test_failed_insert_retains_previous_fragments() {
        let session_id = Uuid::new_v4();
        let inner = InMemoryIndex::default();
        apply_index_delta(&inner, &delta_for(session_id, 0, 1, "old fragments stay put")).await;

        let broken = BrokenUpsertIndex(inner);
        let applied = apply_index_delta(&broken, &delta_for(session_id, 1, 2, "new text")).await;

        assert!(!applied);
        let remaining = broken.0.snapshot();
        assert!(!remaining.is_empty(), "index must never be left empty");
        assert!(remaining.iter().all(|f| f.version == 1));
    }

    #[tokio::test]
    async fn test_sessions_do_not_contend_in_the_index() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let index = InMemoryIndex::default();

        apply_index_delta(&index, &delta_for(a, 0, 1, "session a resume")).await;
        apply_index_delta(&index, &delta_for(b, 0, 1, "session b resume")).await;
        apply_index_delta(&index, &delta_for(a, 1, 2, "session a updated")).await;

        let remaining = index.snapshot();
        assert!(remaining
            .iter()
            .filter(|f| f.session_id == b)
            .all(|f| f.version == 1));
        assert!(remaining
            .iter()
            .filter(|f| f.session_id == a)
            .all(|f| f.version == 2));
    }

    // ────────────────────────────────────────────────────────────────────
    // Entity gating
    // ────────────────────────────────────────────────────────────────────

    #[test]
    fn test_company_optimization_without_company_asks() {
        let mut entities = RoutedEntities::default();
        let ask = clarification_request(
            QueryCategory::CompanyOptimization,
            &mut entities,
            "optimize my resume",
            &[],
        );
        assert!(ask.unwrap().contains("Which company"));
    }

    #[test]
    fn test_short_job_matching_query_asks_for_jd() {
        let mut entities = RoutedEntities::default();
        let ask = clarification_request(
            QueryCategory::JobMatching,
            &mut entities,
            "match my resume",
            &[],
        );
        assert!(ask.unwrap().contains("job description"));
        assert!(entities.job_description.is_none());
    }

    #[test]
    fn test_long_query_is_promoted_to_inline_jd() {
        let mut entities = RoutedEntities::default();
        let long_query = "match my resume against this role: ".to_string() + &"x".repeat(300);
        let ask = clarification_request(
            QueryCategory::JobMatching,
            &mut entities,
            &long_query,
            &[],
        );
        assert!(ask.is_none());
        assert_eq!(entities.job_description.as_deref(), Some(long_query.as_str()));
    }

    #[test]
    fn test_unresolved_section_lists_available_labels() {
        let mut entities = RoutedEntities {
            section: Some("hobbies".to_string()),
            section_resolved: false,
            ..Default::default()
        };
        let labels = vec!["SUMMARY".to_string(), "EXPERIENCE".to_string()];
        let ask = clarification_request(
            QueryCategory::SectionEnhancement,
            &mut entities,
            "improve my hobbies",
            &labels,
        )
        .unwrap();
        assert!(ask.contains("hobbies"));
        assert!(ask.contains("SUMMARY, EXPERIENCE"));
    }

    #[test]
    fn test_resolved_section_passes_gating() {
        let mut entities = RoutedEntities {
            section: Some("EXPERIENCE".to_string()),
            section_resolved: true,
            ..Default::default()
        };
        assert!(clarification_request(
            QueryCategory::SectionEnhancement,
            &mut entities,
            "improve my experience",
            &[],
        )
        .is_none());
    }

    #[test]
    fn test_general_category_never_asks() {
        let mut entities = RoutedEntities::default();
        assert!(
            clarification_request(QueryCategory::General, &mut entities, "hello", &[]).is_none()
        );
    }

    // ────────────────────────────────────────────────────────────────────
    // Revision planning and replies
    // ────────────────────────────────────────────────────────────────────

    const DOC: &str = "Jane Doe\n\nSUMMARY\nOld summary.\n\nSKILLS\nRust\n";

    fn doc_span(label: &str) -> SectionSpan {
        crate::docio::detect_sections(DOC)
            .into_iter()
            .find(|s| s.label == label)
            .unwrap()
    }

    #[test]
    fn test_splice_replaces_only_the_target_section_body() {
        let span = doc_span("SUMMARY");
        let spliced = splice_section(DOC, &span, "New, sharper summary.");
        assert!(spliced.contains("SUMMARY\nNew, sharper summary.\n"));
        assert!(!spliced.contains("Old summary."));
        assert!(spliced.contains("SKILLS\nRust\n"));
        assert!(spliced.starts_with("Jane Doe\n"));
    }

    #[test]
    fn test_splice_of_last_section_keeps_document_end() {
        let span = doc_span("SKILLS");
        let spliced = splice_section(DOC, &span, "Rust, SQL, Kubernetes");
        assert!(spliced.ends_with("SKILLS\nRust, SQL, Kubernetes\n"));
    }

    #[test]
    fn test_revision_plan_names_company_version() {
        let entities = RoutedEntities {
            company: Some("Google".to_string()),
            ..Default::default()
        };
        let (text, name) = revision_plan(
            QueryCategory::CompanyOptimization,
            &entities,
            "new doc",
            DOC,
            None,
        );
        assert_eq!(text, "new doc");
        assert_eq!(name, "Optimized for Google");
    }

    #[test]
    fn test_revision_plan_names_job_match_version() {
        let (_, name) = revision_plan(
            QueryCategory::JobMatching,
            &RoutedEntities::default(),
            "new doc",
            DOC,
            None,
        );
        assert_eq!(name, "Job Description Match");
    }

    #[test]
    fn test_revision_plan_splices_section_turns() {
        let target = (doc_span("SUMMARY"), "SUMMARY".to_string());
        let entities = RoutedEntities {
            section: Some("SUMMARY".to_string()),
            section_resolved: true,
            ..Default::default()
        };
        let (text, name) = revision_plan(
            QueryCategory::SectionEnhancement,
            &entities,
            "Bright new summary.",
            DOC,
            Some(&target),
        );
        assert_eq!(name, "Enhanced SUMMARY");
        assert!(text.contains("Bright new summary."));
        assert!(text.contains("SKILLS"));
    }

    #[test]
    fn test_company_reply_includes_key_changes_when_present() {
        let entities = RoutedEntities {
            company: Some("Google".to_string()),
            ..Default::default()
        };
        let reply = compose_reply(
            QueryCategory::CompanyOptimization,
            &entities,
            "Emphasized scale.",
            "doc",
            "Optimized for Google",
        );
        assert!(reply.starts_with("I've optimized your resume for Google."));
        assert!(reply.contains("**Key Changes:**\nEmphasized scale."));
    }

    #[test]
    fn test_job_match_reply_without_explanation_is_generic() {
        let reply = compose_reply(
            QueryCategory::JobMatching,
            &RoutedEntities::default(),
            "",
            "doc",
            "Job Description Match",
        );
        assert_eq!(
            reply,
            "I've optimized your resume to better match the job description."
        );
    }

    #[test]
    fn test_section_reply_shows_the_enhanced_body() {
        let entities = RoutedEntities {
            section: Some("SKILLS".to_string()),
            section_resolved: true,
            ..Default::default()
        };
        let reply = compose_reply(
            QueryCategory::SectionEnhancement,
            &entities,
            "Grouped by category.",
            "Rust, SQL",
            "Enhanced SKILLS",
        );
        assert!(reply.contains("I've enhanced your SKILLS section."));
        assert!(reply.contains("**Improvements Made:**\nGrouped by category."));
        assert!(reply.contains("**Enhanced Section:**\nRust, SQL"));
    }
}
