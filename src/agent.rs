use crate::config::ServiceConfig;
use crate::config::prompt::{ build_completion_request, MOCK_VERDICT };
use crate::history::summarize_history;
use crate::llm::LlmError;
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::models::triage::TriageRequest;

use log::{ debug, info, warn, error };
use std::sync::Arc;

#[derive(Clone)]
pub struct TriageAgent {
    chat_client: Option<Arc<dyn ChatClient>>,
    mock_mode: bool,
    temperature: f32,
    max_tokens: u32,
}

impl TriageAgent {
    /// A missing or unusable provider configuration is not fatal: the agent
    /// starts without a client and every live request takes the fail-safe path.
    pub fn new(config: &ServiceConfig) -> Self {
        let chat_client = if config.mock_mode {
            info!("Mock mode enabled. The chat provider will not be called.");
            None
        } else {
            match new_chat_client(&config.llm) {
                Ok(client) => {
                    info!(
                        "Chat client configured: Type={}, Model={}, BaseURL={:?}",
                        config.llm.llm_type,
                        client.get_model(),
                        client.get_base_url().as_deref().unwrap_or("adapter default")
                    );
                    Some(client)
                }
                Err(LlmError::NotConfigured) => {
                    error!("Chat provider API key missing. Every /predict call will return the fail-safe verdict.");
                    None
                }
                Err(e) => {
                    error!("Failed to initialize chat client: {}", e);
                    None
                }
            }
        };

        Self::with_client(chat_client, config.mock_mode, config.temperature, config.max_tokens)
    }

    pub fn with_client(
        chat_client: Option<Arc<dyn ChatClient>>,
        mock_mode: bool,
        temperature: f32,
        max_tokens: u32
    ) -> Self {
        Self { chat_client, mock_mode, temperature, max_tokens }
    }

    pub fn is_mock(&self) -> bool {
        self.mock_mode
    }

    /// Produces the verdict text for a request that already passed validation.
    pub async fn analyze(&self, request: &TriageRequest) -> Result<String, LlmError> {
        if self.mock_mode {
            return Ok(MOCK_VERDICT.to_string());
        }

        let client = self.chat_client.as_ref().ok_or(LlmError::NotConfigured)?;

        let summary = summarize_history(request.history.as_deref());
        debug!(
            "Triage context: questions_asked={}, history_chars={}",
            summary.questions_asked,
            summary.transcript.len()
        );
        let completion = build_completion_request(
            request,
            &summary,
            self.temperature,
            self.max_tokens
        );

        let resp = client.complete(&completion).await?;
        let verdict = resp.response.trim();
        if verdict.is_empty() {
            warn!("Provider returned a blank verdict");
            return Err(LlmError::EmptyResponse("chat"));
        }

        Ok(verdict.to_string())
    }
}
