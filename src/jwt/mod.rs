//! Identity token handling
//!
//! Storegate only consumes identity tokens: they establish who the caller is.
//! Which store the caller may act on is decided per request by the guard.

use crate::config::JwtConfig;
use crate::domain::{AuthenticatedUser, UserId};
use crate::error::{AppError, ErrorCause, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const IDENTITY_AUDIENCE: &str = "storegate";
const IDENTITY_TOKEN_TYPE: &str = "identity";

/// Identity Token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Session ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iss: String,
    pub aud: String,
    /// Token type discriminator
    #[serde(default)]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
}

impl IdentityClaims {
    /// The caller these claims identify. Fails when `sub` is not a UUID.
    pub fn authenticated_user(&self) -> Result<AuthenticatedUser> {
        let user_id = Uuid::parse_str(&self.sub).map_err(|_| invalid_token())?;
        let user = AuthenticatedUser::new(UserId::from(user_id));
        Ok(match &self.email {
            Some(email) => user.with_email(email.clone()),
            None => user,
        })
    }
}

fn invalid_token() -> AppError {
    AppError::Unauthenticated(
        ErrorCause::NotAuthenticated,
        "Invalid or expired token".to_string(),
    )
}

/// JWT token manager
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Tolerate 5 seconds of clock skew instead of the default 60.
    fn strict_validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.leeway = 5;
        v
    }

    pub fn create_identity_token(
        &self,
        user_id: UserId,
        email: Option<&str>,
        session_id: Option<Uuid>,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.identity_token_ttl_secs);

        let claims = IdentityClaims {
            sub: user_id.to_string(),
            sid: session_id.map(|id| id.to_string()),
            email: email.map(String::from),
            iss: self.config.issuer.clone(),
            aud: IDENTITY_AUDIENCE.to_string(),
            token_type: IDENTITY_TOKEN_TYPE.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(ErrorCause::Unexpected, e.into()))
    }

    /// Verify and decode an identity token
    pub fn verify_identity_token(&self, token: &str) -> Result<IdentityClaims> {
        let mut validation = self.strict_validation();
        validation.set_audience(&[IDENTITY_AUDIENCE]);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<IdentityClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Identity token rejected");
                invalid_token()
            })?;

        if token_data.claims.token_type != IDENTITY_TOKEN_TYPE {
            return Err(invalid_token());
        }
        Ok(token_data.claims)
    }
}
