//! JWT token handling

use crate::config::JwtConfig;
use crate::error::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The two token kinds issued by this service.
///
/// Access and refresh tokens share the same claim shape but are signed with
/// distinct secrets, so one kind never validates as the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Token claims carrying identity and tenant membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Tenant the user belongs to
    pub tenant_id: i32,
    /// Username, used as the audit actor downstream
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))
    }
}

/// JWT token manager.
///
/// Constructed once from configuration at startup and shared by reference;
/// both signing secrets are immutable afterwards.
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let access_encoding_key = EncodingKey::from_secret(config.access_secret.as_bytes());
        let access_decoding_key = DecodingKey::from_secret(config.access_secret.as_bytes());
        let refresh_encoding_key = EncodingKey::from_secret(config.refresh_secret.as_bytes());
        let refresh_decoding_key = DecodingKey::from_secret(config.refresh_secret.as_bytes());
        Self {
            config,
            access_encoding_key,
            access_decoding_key,
            refresh_encoding_key,
            refresh_decoding_key,
        }
    }

    /// Create a Validation with zero leeway instead of the default 60
    /// seconds. Expiry is an absolute deadline: a token is invalid the
    /// second after `exp`.
    fn strict_validation() -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.leeway = 0;
        v
    }

    /// Issue a short-lived access token
    pub fn issue_access_token(
        &self,
        user_id: Uuid,
        tenant_id: i32,
        username: &str,
    ) -> Result<String> {
        self.issue(
            user_id,
            tenant_id,
            username,
            self.config.access_token_ttl_secs,
            &self.access_encoding_key,
        )
    }

    /// Issue a long-lived refresh token, signed with the refresh secret
    pub fn issue_refresh_token(
        &self,
        user_id: Uuid,
        tenant_id: i32,
        username: &str,
    ) -> Result<String> {
        self.issue(
            user_id,
            tenant_id,
            username,
            self.config.refresh_token_ttl_secs,
            &self.refresh_encoding_key,
        )
    }

    fn issue(
        &self,
        user_id: Uuid,
        tenant_id: i32,
        username: &str,
        ttl_secs: i64,
        key: &EncodingKey,
    ) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(ttl_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            tenant_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, key).map_err(|e| AppError::Internal(e.into()))
    }

    /// Verify and decode a token of the expected kind.
    ///
    /// Rejects bad signatures, malformed structure and expired tokens.
    pub fn validate(&self, token: &str, expected_kind: TokenKind) -> Result<Claims> {
        let key = match expected_kind {
            TokenKind::Access => &self.access_decoding_key,
            TokenKind::Refresh => &self.refresh_decoding_key,
        };
        let validation = Self::strict_validation();
        let token_data = decode::<Claims>(token, key, &validation)?;
        Ok(token_data.claims)
    }

    /// Access token TTL in seconds
    pub fn access_token_ttl(&self) -> i64 {
        self.config.access_token_ttl_secs
    }
}
