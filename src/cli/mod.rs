use clap::Parser;
use std::num::NonZeroU32;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for triage completions (groq, openai)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "groq")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., https://api.groq.com/openai/v1)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider
    #[arg(long, env = "GROQ_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., llama-3.3-70b-versatile, gpt-4o-mini)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    /// Sampling temperature sent with every triage completion.
    #[arg(long, env = "LLM_TEMPERATURE", default_value = "0.1")]
    pub llm_temperature: f32,

    /// Upper bound on generated tokens per triage completion.
    #[arg(long, env = "LLM_MAX_TOKENS", default_value = "600")]
    pub llm_max_tokens: u32,

    /// Network timeout in seconds for a single provider call.
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value = "30")]
    pub llm_timeout_secs: u64,

    // --- Triage Args ---
    /// Return a canned GREEN verdict instead of calling the provider. Only "true" (any case) enables it.
    #[arg(
        long,
        env = "ENABLE_MOCK_MODE",
        default_value = "false",
        action = clap::ArgAction::Set,
        value_parser = parse_bool_like
    )]
    pub enable_mock_mode: bool,

    /// Shared secret callers must send in the X-Service-Key header.
    #[arg(long, env = "SERVICE_SECRET_KEY", default_value = "default_insecure_key")]
    pub service_secret_key: String,

    // --- Server Args ---
    /// Interface the HTTP server binds to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Comma separated list of browser origins allowed by CORS.
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000,http://localhost:5173,http://localhost:4000,https://afya-pulse.vercel.app,https://afya-pulse-dashboard.vercel.app,https://afya-pulse-backend.onrender.com"
    )]
    pub allowed_origins: Vec<String>,

    /// Requests allowed per caller address per minute on /predict.
    #[arg(long, env = "RATE_LIMIT_PER_MINUTE", default_value = "30")]
    pub rate_limit_per_minute: NonZeroU32,

    /// Requests allowed per caller address per day on /predict.
    #[arg(long, env = "RATE_LIMIT_PER_DAY", default_value = "200")]
    pub rate_limit_per_day: NonZeroU32,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

/// Boolean-like switch: "true" in any letter case is on, everything else is off.
pub fn parse_bool_like(value: &str) -> Result<bool, String> {
    Ok(value.trim().eq_ignore_ascii_case("true"))
}
