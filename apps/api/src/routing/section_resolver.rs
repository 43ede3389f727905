//! Section-name resolution.
//!
//! Maps a user's free-form section reference ("work history") onto one of
//! the document's canonical labels ("EXPERIENCE"). Three tiers, evaluated in
//! order, first success wins: cheap exact containment checks avoid needless
//! model calls, the semantic tier handles paraphrase, and the lexical tier
//! is a deterministic safety net when the completion capability is
//! unavailable or answers off-list.
//!
//! Returning `None` is not an error: it means "ask the user to disambiguate".

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm_client::TextCompletion;
use crate::routing::prompts::{SECTION_MATCH_SYSTEM, SECTION_MATCH_TEMPLATE};

/// Which tier produced a match. First-class so the fallback order is a
/// testable property rather than incidental control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Substring,
    Semantic,
    Lexical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMatch {
    pub label: String,
    pub tier: MatchTier,
}

pub struct SectionResolver {
    llm: Arc<dyn TextCompletion>,
}

impl SectionResolver {
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self { llm }
    }

    /// Resolves a free-form section reference against the canonical labels.
    pub async fn resolve(&self, phrase: &str, labels: &[String]) -> Option<SectionMatch> {
        let phrase = phrase.trim();
        if phrase.is_empty() || labels.is_empty() {
            return None;
        }

        if let Some(label) = substring_match(phrase, labels) {
            return Some(SectionMatch {
                label,
                tier: MatchTier::Substring,
            });
        }

        if let Some(label) = self.semantic_match(phrase, labels).await {
            return Some(SectionMatch {
                label,
                tier: MatchTier::Semantic,
            });
        }

        lexical_match(phrase, labels).map(|label| SectionMatch {
            label,
            tier: MatchTier::Lexical,
        })
    }

    async fn semantic_match(&self, phrase: &str, labels: &[String]) -> Option<String> {
        let prompt = SECTION_MATCH_TEMPLATE
            .replace("{requested}", phrase)
            .replace("{available}", &labels.join(", "));

        match self.llm.complete(SECTION_MATCH_SYSTEM, &prompt).await {
            Ok(answer) => {
                let validated = validate_semantic_answer(&answer, labels);
                if validated.is_none() {
                    debug!("Semantic section match rejected answer: {answer:?}");
                }
                validated
            }
            Err(e) => {
                warn!("Semantic section match unavailable: {e}");
                None
            }
        }
    }
}

/// Tier 1: case-insensitive containment in either direction, first label in
/// document order wins.
pub(crate) fn substring_match(phrase: &str, labels: &[String]) -> Option<String> {
    let phrase_lower = phrase.to_lowercase();
    labels
        .iter()
        .find(|label| {
            let label_lower = label.to_lowercase();
            label_lower.contains(&phrase_lower) || phrase_lower.contains(&label_lower)
        })
        .cloned()
}

/// Accepts the model's answer only if it is a literal member of the
/// canonical set (case-insensitive). Anything else, including NONE, rejects.
pub(crate) fn validate_semantic_answer(answer: &str, labels: &[String]) -> Option<String> {
    let answer = answer.trim().trim_matches('"');
    if answer.eq_ignore_ascii_case("none") {
        return None;
    }
    labels
        .iter()
        .find(|label| label.eq_ignore_ascii_case(answer))
        .cloned()
}

/// Tier 3: the label sharing the most word stems with the phrase. Requires
/// at least one shared stem; ties break toward the earlier label.
pub(crate) fn lexical_match(phrase: &str, labels: &[String]) -> Option<String> {
    let phrase_stems = word_stems(phrase);
    if phrase_stems.is_empty() {
        return None;
    }

    let mut best: Option<(usize, &String)> = None;
    for label in labels {
        let shared = word_stems(label)
            .iter()
            .filter(|stem| phrase_stems.contains(stem))
            .count();
        if shared > 0 && best.map_or(true, |(count, _)| shared > count) {
            best = Some((shared, label));
        }
    }

    best.map(|(_, label)| label.clone())
}

fn word_stems(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| stem(&w.to_lowercase()).to_string())
        .collect()
}

/// Crude stemmer: trims a plural 's'. Enough to line up "skills"/"skill".
fn stem(word: &str) -> &str {
    if word.len() > 3 {
        word.strip_suffix('s').unwrap_or(word)
    } else {
        word
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use async_trait::async_trait;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    struct ScriptedCompletion(String);

    #[async_trait]
    impl TextCompletion for ScriptedCompletion {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    struct UnavailableCompletion;

    #[async_trait]
    impl TextCompletion for UnavailableCompletion {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::EmptyContent)
        }
    }

    #[test]
    fn test_substring_match_is_case_insensitive_both_directions() {
        let canon = labels(&["PROFESSIONAL SUMMARY", "EXPERIENCE", "SKILLS"]);
        // user phrase contained in label
        assert_eq!(
            substring_match("summary", &canon),
            Some("PROFESSIONAL SUMMARY".to_string())
        );
        // label contained in user phrase
        assert_eq!(
            substring_match("my skills section please", &canon),
            Some("SKILLS".to_string())
        );
    }

    #[test]
    fn test_substring_match_prefers_first_label_in_order() {
        let canon = labels(&["WORK EXPERIENCE", "EXPERIENCE"]);
        assert_eq!(
            substring_match("experience", &canon),
            Some("WORK EXPERIENCE".to_string())
        );
    }

    #[test]
    fn test_validate_semantic_answer_accepts_only_literal_members() {
        let canon = labels(&["SUMMARY", "EXPERIENCE", "SKILLS"]);
        assert_eq!(
            validate_semantic_answer("experience", &canon),
            Some("EXPERIENCE".to_string())
        );
        assert_eq!(validate_semantic_answer("NONE", &canon), None);
        assert_eq!(validate_semantic_answer("WORK HISTORY", &canon), None);
        assert_eq!(
            validate_semantic_answer("  \"SKILLS\"  ", &canon),
            Some("SKILLS".to_string())
        );
    }

    #[test]
    fn test_lexical_match_requires_a_shared_stem() {
        let canon = labels(&["TECHNICAL SKILLS", "EDUCATION"]);
        assert_eq!(
            lexical_match("my skill set", &canon),
            Some("TECHNICAL SKILLS".to_string())
        );
        assert_eq!(lexical_match("work history", &canon), None);
    }

    #[test]
    fn test_lexical_match_picks_highest_overlap() {
        let canon = labels(&["TECHNICAL SKILLS", "SOFT SKILLS AND TOOLS"]);
        assert_eq!(
            lexical_match("skills and tools", &canon),
            Some("SOFT SKILLS AND TOOLS".to_string())
        );
    }

    #[tokio::test]
    async fn test_exact_match_wins_without_consulting_the_model() {
        // The scripted model would answer SKILLS; the substring tier must win first.
        let resolver = SectionResolver::new(Arc::new(ScriptedCompletion("SKILLS".to_string())));
        let canon = labels(&["SUMMARY", "EXPERIENCE", "SKILLS"]);
        let matched = resolver.resolve("experience", &canon).await.unwrap();
        assert_eq!(matched.label, "EXPERIENCE");
        assert_eq!(matched.tier, MatchTier::Substring);
    }

    #[tokio::test]
    async fn test_paraphrase_resolves_through_semantic_tier() {
        let resolver = SectionResolver::new(Arc::new(ScriptedCompletion("EXPERIENCE".to_string())));
        let canon = labels(&["PROFESSIONAL SUMMARY", "EXPERIENCE", "SKILLS"]);
        let matched = resolver.resolve("work history", &canon).await.unwrap();
        assert_eq!(matched.label, "EXPERIENCE");
        assert_eq!(matched.tier, MatchTier::Semantic);
    }

    #[tokio::test]
    async fn test_off_list_model_answer_falls_through_to_lexical() {
        let resolver =
            SectionResolver::new(Arc::new(ScriptedCompletion("WORK HISTORY".to_string())));
        let canon = labels(&["TECHNICAL SKILLS", "EDUCATION"]);
        let matched = resolver.resolve("hone my skills", &canon).await.unwrap();
        assert_eq!(matched.label, "TECHNICAL SKILLS");
        assert_eq!(matched.tier, MatchTier::Lexical);
    }

    #[tokio::test]
    async fn test_model_outage_still_resolves_lexically() {
        let resolver = SectionResolver::new(Arc::new(UnavailableCompletion));
        let canon = labels(&["TECHNICAL SKILLS", "EDUCATION"]);
        let matched = resolver.resolve("sharpen my skills", &canon).await.unwrap();
        assert_eq!(matched.tier, MatchTier::Lexical);
    }

    #[tokio::test]
    async fn test_no_tier_matching_returns_none() {
        let resolver = SectionResolver::new(Arc::new(UnavailableCompletion));
        let canon = labels(&["EDUCATION"]);
        assert_eq!(resolver.resolve("hobbies", &canon).await, None);
    }

    #[tokio::test]
    async fn test_empty_inputs_resolve_to_none() {
        let resolver = SectionResolver::new(Arc::new(UnavailableCompletion));
        assert_eq!(resolver.resolve("  ", &labels(&["SKILLS"])).await, None);
        assert_eq!(resolver.resolve("skills", &[]).await, None);
    }
}
