use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::generation::prompts::{
    section_guidelines, OUTPUT_CONTRACT, SECTION_PROMPT_TEMPLATE, SECTION_SYSTEM,
};
use crate::generation::{ContentHandler, HandlerRequest};
use crate::llm_client::TextCompletion;

/// Rewrites one resume section body. The orchestrator resolves the section
/// label and slices its current body before dispatching here; the returned
/// artifact is the enhanced body only, which the orchestrator splices back
/// into the full document.
pub struct SectionEnhancementHandler {
    llm: Arc<dyn TextCompletion>,
}

impl SectionEnhancementHandler {
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentHandler for SectionEnhancementHandler {
    async fn generate(&self, request: HandlerRequest<'_>) -> Result<String, AppError> {
        let target = request.section.ok_or_else(|| {
            AppError::Validation("Section enhancement dispatched without a resolved section".into())
        })?;

        let prompt = SECTION_PROMPT_TEMPLATE
            .replace("{section_name}", target.label)
            .replace("{section_content}", target.content)
            .replace("{guidelines}", section_guidelines(target.label))
            .replace("{output_contract}", OUTPUT_CONTRACT);

        self.llm
            .complete(SECTION_SYSTEM, &prompt)
            .await
            .map_err(|e| AppError::Llm(format!("Section enhancement failed: {e}")))
    }
}
