use crate::agent::TriageAgent;
use crate::error::ApiError;
use crate::models::triage::{ HealthResponse, PredictResponse, TriageRequest };
use super::middleware::{ limit, require_service_key, CallerAddr };
use super::rate_limit::RateLimit;

use std::sync::Arc;
use axum::{
    body::Bytes,
    routing::{ get, post },
    Router,
    Json,
    extract::{ Extension, State },
    http::{ header::CONTENT_TYPE, HeaderName, HeaderValue, Method },
    middleware::from_fn_with_state,
};
use tower_http::cors::{ AllowOrigin, CorsLayer };
use log::{ error, warn };

const HEALTH_STATUS: &str = "AI Service Online";

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<TriageAgent>,
    pub limiter: Arc<dyn RateLimit>,
    pub service_secret: Arc<str>,
}

/// Health routes are open; `/predict` sits behind the rate limiter and then the
/// service key check.
pub fn build_router(state: AppState) -> Router {
    let predict = Router::new()
        .route("/predict", post(predict_handler))
        .route_layer(from_fn_with_state(state.clone(), require_service_key))
        .route_layer(from_fn_with_state(state.clone(), limit));

    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .merge(predict)
        .with_state(state)
}

pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-service-key")])
}

pub fn app(state: AppState, allowed_origins: &[String]) -> Router {
    build_router(state).layer(cors_layer(allowed_origins))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HEALTH_STATUS,
        mock_mode: state.agent.is_mock(),
    })
}

async fn predict_handler(
    State(state): State<AppState>,
    Extension(CallerAddr(caller)): Extension<CallerAddr>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let request = TriageRequest::from_json_slice(&body);
    if !request.has_symptoms() {
        return Err(ApiError::Validation("Symptoms required"));
    }

    match state.agent.analyze(&request).await {
        Ok(output) => Ok(Json(PredictResponse { output })),
        Err(e) => {
            error!("Triage provider failure for {}: {}", caller, e);
            Err(ApiError::Provider(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::ScriptedChatClient;
    use crate::config::RateLimitConfig;
    use crate::config::prompt::{ FAILSAFE_VERDICT, MOCK_VERDICT };
    use crate::server::middleware::SERVICE_KEY_HEADER;
    use crate::server::rate_limit::FixedWindowRateLimiter;
    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{ Request, StatusCode };
    use axum::response::Response;
    use serde_json::{ json, Value };
    use std::net::SocketAddr;
    use std::num::NonZeroU32;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";

    fn state_with(agent: TriageAgent, per_minute: u32) -> AppState {
        AppState {
            agent: Arc::new(agent),
            limiter: Arc::new(FixedWindowRateLimiter::new(RateLimitConfig {
                per_minute: NonZeroU32::new(per_minute).unwrap(),
                per_day: NonZeroU32::new(200).unwrap(),
            })),
            service_secret: Arc::from(SECRET),
        }
    }

    fn mock_state() -> AppState {
        state_with(TriageAgent::with_client(None, true, 0.1, 600), 30)
    }

    fn live_state(client: Arc<ScriptedChatClient>) -> AppState {
        state_with(TriageAgent::with_client(Some(client), false, 0.1, 600), 30)
    }

    fn predict_from(peer: [u8; 4], key: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/predict")
            .header("Content-Type", "application/json");
        if let Some(k) = key {
            builder = builder.header(SERVICE_KEY_HEADER, k);
        }
        let mut req = builder.body(Body::from(body.to_string())).unwrap();
        req.extensions_mut().insert(ConnectInfo(SocketAddr::from((peer, 40000))));
        req
    }

    fn predict(key: Option<&str>, body: Value) -> Request<Body> {
        predict_from([10, 0, 0, 1], key, &body.to_string())
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_open_on_both_paths() {
        let app = build_router(mock_state());

        for uri in ["/", "/health"] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                body_json(response).await,
                json!({ "status": "AI Service Online", "mock_mode": true })
            );
        }
    }

    #[tokio::test]
    async fn health_reports_live_mode() {
        let app = build_router(live_state(ScriptedChatClient::replying("x")));
        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(body_json(response).await["mock_mode"], json!(false));
    }

    #[tokio::test]
    async fn predict_requires_service_key() {
        let client = ScriptedChatClient::replying("RISK_LEVEL: GREEN");
        let app = build_router(live_state(client.clone()));

        for key in [None, Some("wrong"), Some("")] {
            let response = app
                .clone()
                .oneshot(predict(key, json!({ "symptoms": "headache" })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(body_json(response).await, json!({ "error": "Auth Verification Failed" }));
        }

        let response = app.oneshot(predict(None, json!({}))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn blank_symptoms_never_reach_the_provider() {
        let client = ScriptedChatClient::replying("RISK_LEVEL: GREEN");
        let app = build_router(live_state(client.clone()));

        let bodies = [
            json!({}).to_string(),
            json!({ "symptoms": "   " }).to_string(),
            json!({ "symptoms": "\n\t", "age": "40" }).to_string(),
            "not json at all".to_string(),
        ];
        for body in bodies {
            let response = app
                .clone()
                .oneshot(predict_from([10, 0, 0, 1], Some(SECRET), &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await, json!({ "error": "Symptoms required" }));
        }
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn mock_mode_returns_fixed_verdict() {
        let app = build_router(mock_state());

        for body in [
            json!({ "symptoms": "chest pain" }),
            json!({ "symptoms": "nina homa", "age": 7, "history": "junk" }),
        ] {
            let response = app.clone().oneshot(predict(Some(SECRET), body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await, json!({ "output": MOCK_VERDICT }));
        }
    }

    #[tokio::test]
    async fn returns_provider_verdict() {
        let client = ScriptedChatClient::replying("  ---\nRISK_LEVEL: YELLOW\n---\n");
        let app = build_router(live_state(client.clone()));

        let response = app
            .oneshot(predict(Some(SECRET), json!({
                "symptoms": "high fever for three days",
                "age": "34",
                "gender": "Male",
                "history": [
                    { "role": "user", "content": "I feel hot" },
                    { "role": "assistant", "content": "How long?" }
                ]
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "output": "---\nRISK_LEVEL: YELLOW\n---" }));

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let system = &calls[0].messages[0].content;
        assert!(system.contains("Age: 34"));
        assert!(system.contains("Questions already asked: 1"));
        assert!(system.contains("PATIENT: I feel hot\nAI: How long?"));
    }

    #[tokio::test]
    async fn provider_failure_returns_failsafe() {
        let app = build_router(live_state(ScriptedChatClient::failing()));
        let response = app
            .oneshot(predict(Some(SECRET), json!({ "symptoms": "dizziness" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body, json!({ "output": FAILSAFE_VERDICT }));
        assert!(!body.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn blank_provider_output_returns_failsafe() {
        let app = build_router(live_state(ScriptedChatClient::replying("   ")));
        let response = app
            .oneshot(predict(Some(SECRET), json!({ "symptoms": "rash" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await, json!({ "output": FAILSAFE_VERDICT }));
    }

    #[tokio::test]
    async fn unconfigured_provider_returns_failsafe() {
        let app = build_router(state_with(TriageAgent::with_client(None, false, 0.1, 600), 30));
        let response = app
            .oneshot(predict(Some(SECRET), json!({ "symptoms": "cough" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn rate_limit_applies_per_caller_before_auth() {
        let app = build_router(state_with(TriageAgent::with_client(None, true, 0.1, 600), 2));
        let body = json!({ "symptoms": "cough" }).to_string();

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(predict_from([10, 0, 0, 1], Some(SECRET), &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app
            .clone()
            .oneshot(predict_from([10, 0, 0, 1], Some("wrong"), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_json(response).await, json!({ "error": "Rate limit exceeded" }));

        let response = app
            .clone()
            .oneshot(predict_from([10, 0, 0, 2], Some(SECRET), &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_allows_configured_origins_only() {
        let origins = vec!["https://afya-pulse.vercel.app".to_string()];
        let app = super::app(mock_state(), &origins);

        let preflight = |origin: &str| {
            Request::builder()
                .method("OPTIONS")
                .uri("/predict")
                .header("Origin", origin)
                .header("Access-Control-Request-Method", "POST")
                .header("Access-Control-Request-Headers", "x-service-key")
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(preflight("https://afya-pulse.vercel.app")).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "https://afya-pulse.vercel.app"
        );

        let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }
}
