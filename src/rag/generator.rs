use crate::llm::LLMClient;
use crate::rag::pipeline::{GenerationUpdate, PipelineState};
use crate::rag::prompt::PromptTemplate;
use crate::types::{AppError, Document, Result};
use std::sync::Arc;
use std::time::Instant;

/// Separator placed between retrieved fragments in the prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Join fragment contents in retrieval order.
pub fn format_context(documents: &[Document]) -> String {
    documents
        .iter()
        .map(|d| d.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Renders the prompt and asks the chat model for an answer.
pub struct Generator {
    llm: Arc<dyn LLMClient>,
    prompt: Arc<PromptTemplate>,
}

impl Generator {
    pub fn new(llm: Arc<dyn LLMClient>, prompt: Arc<PromptTemplate>) -> Self {
        Self { llm, prompt }
    }

    pub fn chat_model(&self) -> &str {
        self.llm.model_name()
    }

    pub fn prompt(&self) -> &PromptTemplate {
        &self.prompt
    }

    pub async fn generate(&self, state: &PipelineState) -> Result<GenerationUpdate> {
        let start = Instant::now();
        let context = format_context(state.context());
        let messages = self.prompt.render(state.question(), &context);

        let answer = self.llm.chat(&messages).await.map_err(|e| match e {
            AppError::GenerationFailed(_) => e,
            other => AppError::GenerationFailed(other.to_string()),
        })?;

        if answer.trim().is_empty() {
            return Err(AppError::GenerationFailed(format!(
                "{} returned an empty answer",
                self.llm.model_name()
            )));
        }

        tracing::info!(
            model = self.llm.model_name(),
            context_chars = context.len(),
            answer_chars = answer.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generated answer"
        );

        Ok(GenerationUpdate { answer })
    }
}
