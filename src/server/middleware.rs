use axum::extract::{ ConnectInfo, Request, State };
use axum::middleware::Next;
use axum::response::{ IntoResponse, Response };
use log::warn;
use std::net::{ IpAddr, Ipv4Addr, SocketAddr };

use super::api::AppState;
use crate::error::ApiError;

pub const SERVICE_KEY_HEADER: &str = "X-Service-Key";

/// Caller address resolved by the rate limiter, available to handlers as an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerAddr(pub IpAddr);

/// Peer IP of the connection, or the unspecified address when the server was
/// built without connect info.
pub fn caller_addr(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn limit(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let caller = caller_addr(&req);
    if let Err(e) = state.limiter.check(caller) {
        warn!("Rate limit hit by {}: {}", caller, e);
        return ApiError::RateLimited.into_response();
    }

    req.extensions_mut().insert(CallerAddr(caller));
    next.run(req).await
}

pub async fn require_service_key(
    State(state): State<AppState>,
    req: Request,
    next: Next
) -> Response {
    let provided = req
        .headers()
        .get(SERVICE_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    if provided != Some(&*state.service_secret) {
        warn!("Auth failed: invalid service key from {}", caller_addr(&req));
        return ApiError::Unauthorized.into_response();
    }

    next.run(req).await
}
