use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::generation::prompts::{GENERAL_PROMPT_TEMPLATE, GENERAL_SYSTEM};
use crate::generation::{format_history, ContentHandler, HandlerRequest};
use crate::llm_client::TextCompletion;

/// Answers greetings, advice requests, and anything the specialized
/// handlers do not cover. Conversational: output is shown to the user
/// directly and never versions the document, so no output contract here.
pub struct GeneralQueryHandler {
    llm: Arc<dyn TextCompletion>,
}

impl GeneralQueryHandler {
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentHandler for GeneralQueryHandler {
    async fn generate(&self, request: HandlerRequest<'_>) -> Result<String, AppError> {
        let prompt = GENERAL_PROMPT_TEMPLATE
            .replace("{history}", &format_history(request.history))
            .replace("{context}", &request.context.text)
            .replace("{query}", request.query);

        self.llm
            .complete(GENERAL_SYSTEM, &prompt)
            .await
            .map_err(|e| AppError::Llm(format!("General query failed: {e}")))
    }
}
