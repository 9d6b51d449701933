//! TraceLayer span maker that keeps credentials out of the logs.

use axum::http::{header::AUTHORIZATION, Request};
use tower_http::trace::MakeSpan;
use tracing::Span;

/// Query parameter names whose values are redacted.
const SENSITIVE_PARAMS: &[&str] = &[
    "access_token",
    "id_token",
    "token",
    "api_key",
    "secret",
    "password",
];

/// Records method, sanitized URI and whether a bearer credential was sent.
/// The credential itself is never recorded.
#[derive(Clone, Debug)]
pub struct SanitizedMakeSpan;

impl<B> MakeSpan<B> for SanitizedMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let has_bearer = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("Bearer "));

        tracing::info_span!(
            "http",
            method = %request.method(),
            uri = %sanitize_uri(request.uri()),
            version = ?request.version(),
            bearer = has_bearer,
        )
    }
}

/// `/x?token=abc&page=2` becomes `/x?token=[REDACTED]&page=2`.
fn sanitize_uri(uri: &axum::http::Uri) -> String {
    let query = match uri.query() {
        Some(q) => q,
        None => return uri.path().to_string(),
    };

    let sanitized_pairs: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if SENSITIVE_PARAMS.contains(&key.to_ascii_lowercase().as_str()) => {
                format!("{key}=[REDACTED]")
            }
            _ => pair.to_string(),
        })
        .collect();

    format!("{}?{}", uri.path(), sanitized_pairs.join("&"))
}
