use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::generation::prompts::{JOB_MATCH_PROMPT_TEMPLATE, JOB_MATCH_SYSTEM, OUTPUT_CONTRACT};
use crate::generation::{ContentHandler, HandlerRequest};
use crate::llm_client::TextCompletion;

/// Optimizes the resume against a job description and reports the match
/// analysis in the improvement notes. The orchestrator guarantees a job
/// description entity is present before dispatching here.
pub struct JobMatchingHandler {
    llm: Arc<dyn TextCompletion>,
}

impl JobMatchingHandler {
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentHandler for JobMatchingHandler {
    async fn generate(&self, request: HandlerRequest<'_>) -> Result<String, AppError> {
        let job_description = request
            .entities
            .job_description
            .as_deref()
            .unwrap_or(request.query);

        let prompt = JOB_MATCH_PROMPT_TEMPLATE
            .replace("{job_description}", job_description)
            .replace("{context}", &request.context.text)
            .replace("{output_contract}", OUTPUT_CONTRACT);

        self.llm
            .complete(JOB_MATCH_SYSTEM, &prompt)
            .await
            .map_err(|e| AppError::Llm(format!("Job matching failed: {e}")))
    }
}
