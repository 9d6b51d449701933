//! Request context factory
//!
//! Collects the raw inputs the authorization guard needs from an HTTP request.
//! Nothing here decides access: a missing or bad token simply leaves the user
//! unset and the guard answers Unauthenticated.

use crate::domain::{AuthenticatedUser, RequestContext, SessionMetadata};
use crate::jwt::JwtManager;
use crate::middleware::metrics::REQUEST_ID_HEADER;
use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, HeaderMap, HeaderName};
use std::net::SocketAddr;
use tracing::debug;

pub fn request_context_from_parts(
    parts: &Parts,
    jwt_manager: &JwtManager,
    store_id_header: &HeaderName,
) -> RequestContext {
    let headers = &parts.headers;

    let (user, session_id) = match extract_bearer_token(headers) {
        Some(token) => match authenticate(jwt_manager, token) {
            Some((user, sid)) => (Some(user), sid),
            None => (None, None),
        },
        None => (None, None),
    };

    // Non-UTF-8 bytes survive as replacement characters so the value is
    // reported as malformed rather than missing.
    let raw_store_id = headers
        .get(store_id_header)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

    let session = SessionMetadata {
        request_id: header_str(headers, REQUEST_ID_HEADER),
        session_id,
        client_ip: client_ip(parts),
        user_agent: header_str(headers, header::USER_AGENT.as_str()),
    };

    RequestContext {
        raw_store_id,
        user,
        session,
    }
}

fn authenticate(jwt_manager: &JwtManager, token: &str) -> Option<(AuthenticatedUser, Option<String>)> {
    let claims = match jwt_manager.verify_identity_token(token) {
        Ok(claims) => claims,
        Err(_) => {
            debug!("Bearer token present but not a valid identity token");
            return None;
        }
    };
    match claims.authenticated_user() {
        Ok(user) => Some((user, claims.sid)),
        Err(_) => {
            debug!("Identity token subject is not a user id");
            None
        }
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
fn client_ip(parts: &Parts) -> Option<String> {
    if let Some(forwarded) = header_str(&parts.headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next().map(str::trim) {
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    header_str(&parts.headers, "x-real-ip").or_else(|| {
        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|addr| addr.0.ip().to_string())
    })
}
