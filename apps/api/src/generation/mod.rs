//! Content-generation handlers.
//!
//! One handler per routed category, behind the `ContentHandler` trait so the
//! orchestrator (and tests) never care which backend produced the text. The
//! category to handler mapping in `HandlerRegistry` is fixed and total:
//! every category has a configured handler and `general` doubles as the
//! universal fallback.
//!
//! Handlers return raw text. Document-mutating handlers are prompted to
//! honor the three-marker output contract, but the contract is not
//! guaranteed; the separator owns that problem.

pub mod prompts;

mod company;
mod general;
mod job_match;
mod section;

use std::sync::Arc;

use async_trait::async_trait;

pub use company::CompanyOptimizationHandler;
pub use general::GeneralQueryHandler;
pub use job_match::JobMatchingHandler;
pub use section::SectionEnhancementHandler;

use crate::errors::AppError;
use crate::llm_client::TextCompletion;
use crate::models::session::MessageRow;
use crate::retrieval::ContextSlice;
use crate::routing::{QueryCategory, RoutedEntities};

/// The resolved target of a section-enhancement turn: the canonical label
/// and the exact current body of that section.
#[derive(Debug, Clone, Copy)]
pub struct SectionTarget<'a> {
    pub label: &'a str,
    pub content: &'a str,
}

/// Everything a handler receives for one turn.
pub struct HandlerRequest<'a> {
    pub query: &'a str,
    pub context: &'a ContextSlice,
    pub entities: &'a RoutedEntities,
    pub history: &'a [MessageRow],
    /// Present only on section-enhancement turns.
    pub section: Option<SectionTarget<'a>>,
}

/// An external content-generation capability. Takes prompt plus context,
/// returns raw text.
#[async_trait]
pub trait ContentHandler: Send + Sync {
    async fn generate(&self, request: HandlerRequest<'_>) -> Result<String, AppError>;
}

/// Fixed, total category to handler mapping.
pub struct HandlerRegistry {
    company: Arc<dyn ContentHandler>,
    job_matching: Arc<dyn ContentHandler>,
    section: Arc<dyn ContentHandler>,
    general: Arc<dyn ContentHandler>,
}

impl HandlerRegistry {
    pub fn new(
        company: Arc<dyn ContentHandler>,
        job_matching: Arc<dyn ContentHandler>,
        section: Arc<dyn ContentHandler>,
        general: Arc<dyn ContentHandler>,
    ) -> Self {
        Self {
            company,
            job_matching,
            section,
            general,
        }
    }

    /// The production wiring: every handler backed by the LLM capability.
    pub fn llm_backed(llm: Arc<dyn TextCompletion>) -> Self {
        Self::new(
            Arc::new(CompanyOptimizationHandler::new(llm.clone())),
            Arc::new(JobMatchingHandler::new(llm.clone())),
            Arc::new(SectionEnhancementHandler::new(llm.clone())),
            Arc::new(GeneralQueryHandler::new(llm)),
        )
    }

    pub fn handler_for(&self, category: QueryCategory) -> &dyn ContentHandler {
        match category {
            QueryCategory::CompanyOptimization => self.company.as_ref(),
            QueryCategory::JobMatching => self.job_matching.as_ref(),
            QueryCategory::SectionEnhancement => self.section.as_ref(),
            QueryCategory::General => self.general.as_ref(),
        }
    }
}

pub(crate) fn format_history(history: &[MessageRow]) -> String {
    if history.is_empty() {
        return "(no previous context)".to_string();
    }
    history
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
