pub mod api;
pub mod middleware;
pub mod rate_limit;

use crate::agent::TriageAgent;
use crate::config::ServiceConfig;
use self::api::AppState;
use self::rate_limit::FixedWindowRateLimiter;

use axum_server::tls_rustls::RustlsConfig;
use log::{ debug, info };
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const LIMITER_HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

pub struct Server {
    config: ServiceConfig,
    agent: Arc<TriageAgent>,
    limiter: Arc<FixedWindowRateLimiter>,
}

impl Server {
    pub fn new(config: ServiceConfig, agent: Arc<TriageAgent>) -> Self {
        let limiter = Arc::new(FixedWindowRateLimiter::new(config.rate_limit));
        Self { config, agent, limiter }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.spawn_limiter_housekeeping();

        let state = AppState {
            agent: self.agent.clone(),
            limiter: self.limiter.clone(),
            service_secret: Arc::from(self.config.service_secret.as_str()),
        };
        let app = api::app(state, &self.config.allowed_origins)
            .into_make_service_with_connect_info::<SocketAddr>();
        let addr = self.config.bind_addr;

        match &self.config.tls {
            Some(tls) => {
                info!(
                    "TLS enabled. Loading certificate from '{}' and key from '{}'",
                    tls.cert_path,
                    tls.key_path
                );
                let tls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await?;
                info!("Starting HTTPS triage server on: https://{}", addr);
                axum_server::bind_rustls(addr, tls_config).serve(app).await?;
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr).await
                    .map_err(|e| format!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e))?;
                info!("Starting HTTP triage server on: http://{}", addr);
                axum::serve(listener, app).await?;
            }
        }

        Ok(())
    }

    fn spawn_limiter_housekeeping(&self) {
        let limiter = self.limiter.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(LIMITER_HOUSEKEEPING_INTERVAL);
            loop {
                ticker.tick().await;
                limiter.retain_recent();
                debug!("Rate limiter tracking {} callers", limiter.tracked_callers());
            }
        });
    }
}
