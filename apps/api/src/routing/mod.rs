//! Intent routing.
//!
//! One structured-completion call classifies the query into a closed set of
//! handler categories and extracts entities. The model's reply is validated
//! against the wire schema at the boundary; anything that fails to parse is
//! a classification failure and yields the deterministic default (general,
//! confidence 0, no entities). The rest of the pipeline never branches on
//! malformed external data.

pub mod prompts;
pub mod section_resolver;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::llm_client::{strip_json_fences, TextCompletion};
use crate::models::session::MessageRow;
use crate::routing::prompts::{ROUTING_PROMPT_TEMPLATE, ROUTING_SYSTEM};
use crate::routing::section_resolver::SectionResolver;

/// The closed set of handler categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    CompanyOptimization,
    JobMatching,
    SectionEnhancement,
    General,
}

impl QueryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::CompanyOptimization => "company_optimization",
            QueryCategory::JobMatching => "job_matching",
            QueryCategory::SectionEnhancement => "section_enhancement",
            QueryCategory::General => "general",
        }
    }
}

/// Entities extracted from the query. A closed record with explicit optional
/// fields per known entity kind, not an open-ended map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutedEntities {
    pub company: Option<String>,
    pub section: Option<String>,
    /// True once `section` has been normalized to a canonical label.
    /// An unresolved section entity must be treated as ambiguous downstream.
    #[serde(default)]
    pub section_resolved: bool,
    pub job_description: Option<String>,
    pub ambiguous: Option<String>,
}

/// The single ranked routing decision for one turn. Confidence is advisory:
/// it never gates routing, but callers may surface low values for
/// confirmation.
#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub category: QueryCategory,
    pub entities: RoutedEntities,
    pub confidence: f32,
}

impl RoutingDecision {
    /// The deterministic default used on any classification failure.
    pub fn fallback() -> Self {
        Self {
            category: QueryCategory::General,
            entities: RoutedEntities::default(),
            confidence: 0.0,
        }
    }
}

// Wire shape the completion must produce. Unknown categories or a missing
// confidence fail deserialization, which is exactly the "classification
// failure" path.
#[derive(Debug, Deserialize)]
struct RouteWire {
    category: QueryCategory,
    confidence: f32,
    #[serde(default)]
    entities: EntityWire,
}

#[derive(Debug, Default, Deserialize)]
struct EntityWire {
    company: Option<String>,
    section: Option<String>,
    job_description: Option<String>,
    ambiguous: Option<String>,
}

pub struct IntentRouter {
    llm: Arc<dyn TextCompletion>,
    resolver: SectionResolver,
    history_window: usize,
}

impl IntentRouter {
    pub fn new(llm: Arc<dyn TextCompletion>, history_window: usize) -> Self {
        let resolver = SectionResolver::new(llm.clone());
        Self {
            llm,
            resolver,
            history_window,
        }
    }

    /// Classifies a query given the trailing conversation window and the
    /// current document's canonical labels. Never fails: classification
    /// problems degrade to the `general` fallback decision.
    pub async fn route(
        &self,
        query: &str,
        recent_history: &[MessageRow],
        canonical_labels: &[String],
    ) -> RoutingDecision {
        let prompt = ROUTING_PROMPT_TEMPLATE
            .replace("{labels}", &canonical_labels.join(", "))
            .replace("{history}", &format_history(recent_history, self.history_window))
            .replace("{query}", query);

        let mut decision = match self.llm.complete(ROUTING_SYSTEM, &prompt).await {
            Ok(reply) => parse_decision(&reply).unwrap_or_else(|| {
                warn!("Routing reply failed schema validation; defaulting to general");
                RoutingDecision::fallback()
            }),
            Err(e) => {
                warn!("Routing completion failed: {e}; defaulting to general");
                RoutingDecision::fallback()
            }
        };

        // Normalize a section entity against the document's canonical labels.
        if decision.category == QueryCategory::SectionEnhancement {
            if let Some(raw_section) = decision.entities.section.clone() {
                match self.resolver.resolve(&raw_section, canonical_labels).await {
                    Some(matched) => {
                        debug!(
                            "Resolved section {raw_section:?} -> {:?} via {:?}",
                            matched.label, matched.tier
                        );
                        decision.entities.section = Some(matched.label);
                        decision.entities.section_resolved = true;
                    }
                    None => {
                        // Kept as given; downstream treats it as ambiguous.
                        decision.entities.section_resolved = false;
                    }
                }
            }
        }

        decision
    }
}

/// Parses and validates a routing reply. `None` means classification failure.
pub(crate) fn parse_decision(reply: &str) -> Option<RoutingDecision> {
    let wire: RouteWire = serde_json::from_str(strip_json_fences(reply)).ok()?;
    Some(RoutingDecision {
        category: wire.category,
        confidence: wire.confidence.clamp(0.0, 1.0),
        entities: RoutedEntities {
            company: non_empty(wire.entities.company),
            section: non_empty(wire.entities.section),
            section_resolved: false,
            job_description: non_empty(wire.entities.job_description),
            ambiguous: non_empty(wire.entities.ambiguous),
        },
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn format_history(recent: &[MessageRow], window: usize) -> String {
    let start = recent.len().saturating_sub(window);
    let lines: Vec<String> = recent[start..]
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect();
    if lines.is_empty() {
        "(no previous context)".to_string()
    } else {
        lines.join("\n")
    }
}
