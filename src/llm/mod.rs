pub mod chat;
use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    Groq,
    OpenAI,
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmType::Groq => write!(f, "groq"),
            LlmType::OpenAI => write!(f, "openai"),
        }
    }
}

impl LlmType {
    /// Name used in provider error messages and logs.
    pub fn provider_name(&self) -> &'static str {
        match self {
            LlmType::Groq => "Groq",
            LlmType::OpenAI => "OpenAI",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmType::Groq => "llama-3.3-70b-versatile",
            LlmType::OpenAI => "gpt-4o-mini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            LlmType::Groq => "https://api.groq.com/openai/v1",
            LlmType::OpenAI => "https://api.openai.com/v1",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseLlmTypeError {
    message: String,
}

impl fmt::Display for ParseLlmTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseLlmTypeError {}
impl FromStr for LlmType {
    type Err = ParseLlmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(LlmType::Groq),
            "openai" => Ok(LlmType::OpenAI),
            _ =>
                Err(ParseLlmTypeError {
                    message: format!("Invalid LLM type: '{}'", s),
                }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            llm_type: LlmType::Groq,
            api_key: None,
            completion_model: None,
            base_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Failures of the outbound chat collaborator. None of these reach the caller verbatim.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("chat client is not configured")]
    NotConfigured,
    #[error("invalid API key format: {0}")]
    InvalidApiKey(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{provider} API returned {status}: {body}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{0} API returned an empty completion")]
    EmptyResponse(&'static str),
}
