pub mod prompt;

use crate::cli::Args;
use crate::llm::{ LlmConfig, LlmType };
use std::error::Error;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::time::Duration;

pub const DEFAULT_SERVICE_SECRET: &str = "default_insecure_key";

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub per_minute: NonZeroU32,
    pub per_day: NonZeroU32,
}

/// Process-wide settings, resolved once at start-up and handed to the server.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub mock_mode: bool,
    pub service_secret: String,
    pub llm: LlmConfig,
    pub temperature: f32,
    pub max_tokens: u32,
    pub rate_limit: RateLimitConfig,
    pub allowed_origins: Vec<String>,
    pub tls: Option<TlsConfig>,
}

impl ServiceConfig {
    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let llm_type: LlmType = args.chat_llm_type.parse()?;
        let bind_addr = format!("{}:{}", args.host, args.port)
            .parse::<SocketAddr>()
            .map_err(|e| format!("Invalid bind address '{}:{}': {}", args.host, args.port, e))?;

        let tls = if args.enable_tls {
            match (&args.tls_cert_path, &args.tls_key_path) {
                (Some(cert_path), Some(key_path)) => Some(TlsConfig {
                    cert_path: cert_path.clone(),
                    key_path: key_path.clone(),
                }),
                (Some(_), None) | (None, Some(_)) => {
                    return Err("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.".into());
                }
                (None, None) => {
                    return Err("TLS enabled without cert/key".into());
                }
            }
        } else {
            None
        };

        let allowed_origins = args.allowed_origins
            .iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Self {
            bind_addr,
            mock_mode: args.enable_mock_mode,
            service_secret: args.service_secret_key.clone(),
            llm: LlmConfig {
                llm_type,
                api_key: Some(args.chat_api_key.clone()).filter(|k| !k.trim().is_empty()),
                completion_model: args.chat_model.clone(),
                base_url: args.chat_base_url.clone(),
                timeout: Duration::from_secs(args.llm_timeout_secs),
            },
            temperature: args.llm_temperature,
            max_tokens: args.llm_max_tokens,
            rate_limit: RateLimitConfig {
                per_minute: args.rate_limit_per_minute,
                per_day: args.rate_limit_per_day,
            },
            allowed_origins,
            tls,
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.service_secret == DEFAULT_SERVICE_SECRET
    }
}
