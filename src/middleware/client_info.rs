use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::{HeaderMap, request::Parts};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use crate::db::models::ClientInfo;
use crate::router::AuthState;

/// Proxy headers consulted before the socket address, highest priority first.
const IP_HEADERS: &[&str] = &["x-real-ip", "x-forwarded-for"];

/// Client IP from proxy headers when they are trusted, falling back to the peer
/// address recorded by `into_make_service_with_connect_info`.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> Option<IpAddr> {
    if !trust_proxy {
        return peer.map(|addr| addr.ip());
    }
    for header in IP_HEADERS {
        let ip = headers
            .get(*header)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .and_then(|s| s.parse::<IpAddr>().ok());
        if ip.is_some() {
            return ip;
        }
    }
    peer.map(|addr| addr.ip())
}

impl<S> FromRequestParts<S> for ClientInfo
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let trust_proxy = AuthState::from_ref(state).trust_proxy_headers;
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        let user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(ClientInfo {
            ip: client_ip(&parts.headers, peer, trust_proxy).map(|ip| ip.to_string()),
            user_agent,
        })
    }
}
