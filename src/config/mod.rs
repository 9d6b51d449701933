//! Configuration management for Storegate Core

use anyhow::{Context, Result};
use axum::http::HeaderName;
use std::collections::HashMap;
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Store scoping configuration
    pub tenancy: TenancyConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub identity_token_ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub struct TenancyConfig {
    /// Request header carrying the caller's store identifier
    pub store_id_header: HeaderName,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            store_id_header: HeaderName::from_static("x-store-id"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_format: LogFormat,
    pub metrics_enabled: bool,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            service_name: "storegate-core".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_vars(&vars)
    }

    fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).cloned();

        Ok(Self {
            http_host: get("HTTP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            http_port: get("HTTP_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: get("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: get("DATABASE_MAX_CONNECTIONS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
                min_connections: get("DATABASE_MIN_CONNECTIONS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2),
            },
            jwt: JwtConfig {
                secret: get("JWT_SECRET").context("JWT_SECRET is required")?,
                issuer: get("JWT_ISSUER")
                    .unwrap_or_else(|| "https://storegate.local".to_string()),
                identity_token_ttl_secs: get("JWT_IDENTITY_TOKEN_TTL_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(3600),
            },
            tenancy: TenancyConfig {
                store_id_header: match get("STORE_ID_HEADER") {
                    Some(name) => HeaderName::try_from(name.to_ascii_lowercase())
                        .context("Invalid STORE_ID_HEADER")?,
                    None => TenancyConfig::default().store_id_header,
                },
            },
            telemetry: TelemetryConfig {
                log_format: match get("LOG_FORMAT").as_deref() {
                    Some("json") => LogFormat::Json,
                    _ => LogFormat::Pretty,
                },
                metrics_enabled: get("METRICS_ENABLED")
                    .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                    .unwrap_or(false),
                service_name: get("SERVICE_NAME")
                    .unwrap_or_else(|| "storegate-core".to_string()),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
