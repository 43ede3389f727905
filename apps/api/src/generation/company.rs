use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::generation::prompts::{COMPANY_PROMPT_TEMPLATE, COMPANY_SYSTEM, OUTPUT_CONTRACT};
use crate::generation::{ContentHandler, HandlerRequest};
use crate::llm_client::TextCompletion;

/// Rewrites the resume to resonate with a specific company's culture and
/// values. The orchestrator guarantees a company entity is present before
/// dispatching here.
pub struct CompanyOptimizationHandler {
    llm: Arc<dyn TextCompletion>,
}

impl CompanyOptimizationHandler {
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentHandler for CompanyOptimizationHandler {
    async fn generate(&self, request: HandlerRequest<'_>) -> Result<String, AppError> {
        let company = request
            .entities
            .company
            .as_deref()
            .unwrap_or("the target company");

        let prompt = COMPANY_PROMPT_TEMPLATE
            .replace("{company}", company)
            .replace("{context}", &request.context.text)
            .replace("{output_contract}", OUTPUT_CONTRACT);

        self.llm
            .complete(COMPANY_SYSTEM, &prompt)
            .await
            .map_err(|e| AppError::Llm(format!("Company optimization failed: {e}")))
    }
}
