use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::time::Duration;

use super::{ ChatClient, ChatMessage, CompletionRequest, CompletionResponse };
use crate::llm::{ LlmConfig, LlmError, LlmType };

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

/// Client for any provider that serves the OpenAI chat-completions API.
/// The provider only decides the default model, endpoint and error label.
pub struct OpenAICompatibleChatClient {
    provider: LlmType,
    http: HttpClient,
    model: String,
    base_url: String,
}

impl OpenAICompatibleChatClient {
    pub fn new(
        provider: LlmType,
        api_key: &str,
        model: Option<String>,
        base_url: Option<String>,
        timeout: Duration
    ) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| LlmError::InvalidApiKey(e.to_string()))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            provider,
            http,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            base_url: base_url.unwrap_or_else(|| provider.default_base_url().to_string()),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::NotConfigured)?;

        Self::new(
            config.llm_type,
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.timeout
        )
    }
}

#[async_trait]
impl ChatClient for OpenAICompatibleChatClient {
    async fn complete(
        &self,
        request: &CompletionRequest
    ) -> Result<CompletionResponse, LlmError> {
        let provider = self.provider.provider_name();
        debug!(
            "{} completion request: model={}, messages={}",
            provider,
            self.model,
            request.messages.len()
        );

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status { provider, status: status.as_u16(), body });
        }

        let parsed = resp.json::<ChatCompletionResponse>().await?;
        let content = parsed.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse(provider))?;

        Ok(CompletionResponse { response: content })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
