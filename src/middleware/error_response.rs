//! Error response normalization middleware
//!
//! Framework rejections (unknown route, wrong method, malformed body) come
//! back as text/plain. This rewrites them into the same `{error, message}`
//! JSON shape that `AppError` produces, without the framework's detail text.

use crate::error::ErrorKind;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

pub async fn normalize_error_response(request: Request<Body>, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    let status = response.status();

    // Probes answer in plain text on purpose.
    if path == "/health" || path == "/ready" {
        return response;
    }

    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    if is_json {
        return response;
    }

    generic_error_response(status)
}

fn generic_error_response(status: StatusCode) -> Response {
    let (error_type, message) = match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            (ErrorKind::BadRequest.as_str(), "Invalid request")
        }
        StatusCode::UNAUTHORIZED => (ErrorKind::Unauthenticated.as_str(), "Authentication required"),
        StatusCode::FORBIDDEN => (ErrorKind::Forbidden.as_str(), "Access denied"),
        StatusCode::NOT_FOUND => (ErrorKind::NotFound.as_str(), "Not found"),
        StatusCode::CONFLICT => (ErrorKind::Conflict.as_str(), "Resource conflict"),
        StatusCode::METHOD_NOT_ALLOWED => ("method_not_allowed", "Method not allowed"),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => ("unsupported_media_type", "Unsupported content type"),
        _ if status.is_client_error() => ("client_error", "Client error"),
        _ => (ErrorKind::Internal.as_str(), "An internal error occurred"),
    };

    let body = json!({
        "error": error_type,
        "message": message,
    });

    (status, axum::Json(body)).into_response()
}
