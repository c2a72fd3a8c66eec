//! OAuth access tokens for the classification endpoint.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{AuthorizedUserKey, Credentials, ServiceAccountKey};
use crate::error::{MaculaError, MaculaResult};

/// Environment variable holding a pre-minted access token.
pub const ACCESS_TOKEN_ENV: &str = "MACULA_ACCESS_TOKEN";

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN_SECS: i64 = 60;
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

enum TokenSource {
    Fixed(String),
    ServiceAccount {
        key: ServiceAccountKey,
        signing_key: EncodingKey,
        token_uri: String,
    },
    AuthorizedUser {
        key: AuthorizedUserKey,
        token_uri: String,
    },
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

/// Mints and caches bearer tokens.
pub struct TokenProvider {
    source: TokenSource,
    client: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    /// A provider that always hands out the same token.
    pub fn fixed(token: &str) -> Self {
        Self {
            source: TokenSource::Fixed(token.to_string()),
            client: reqwest::Client::new(),
            cache: Mutex::new(None),
        }
    }

    /// Build a provider from parsed credentials.
    ///
    /// Service account keys are parsed here so a broken key fails at startup.
    pub fn from_credentials(credentials: &Credentials, client: reqwest::Client) -> MaculaResult<Self> {
        let token_uri = credentials.token_uri().to_string();
        let source = match credentials {
            Credentials::ServiceAccount(key) => {
                let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
                    .map_err(|e| MaculaError::startup(format!("credentials: invalid private key: {}", e)))?;
                TokenSource::ServiceAccount {
                    key: key.clone(),
                    signing_key,
                    token_uri,
                }
            }
            Credentials::AuthorizedUser(key) => TokenSource::AuthorizedUser {
                key: key.clone(),
                token_uri,
            },
        };

        Ok(Self {
            source,
            client,
            cache: Mutex::new(None),
        })
    }

    /// Prefer `MACULA_ACCESS_TOKEN` when set, otherwise use the credentials.
    pub fn from_env_or_credentials(credentials: &Credentials, client: reqwest::Client) -> MaculaResult<Self> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::fixed(token.trim())),
            _ => Self::from_credentials(credentials, client),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.source {
            TokenSource::Fixed(_) => "static",
            TokenSource::ServiceAccount { .. } => "service_account",
            TokenSource::AuthorizedUser { .. } => "authorized_user",
        }
    }

    /// Return a valid access token, refreshing it when close to expiry.
    pub async fn access_token(&self) -> MaculaResult<String> {
        if let TokenSource::Fixed(token) = &self.source {
            return Ok(token.clone());
        }

        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.expires_at > Utc::now() {
                return Ok(cached.value.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *cache = Some(fresh);
        Ok(value)
    }

    async fn fetch_token(&self) -> MaculaResult<CachedToken> {
        let (token_uri, form) = match &self.source {
            TokenSource::Fixed(token) => {
                return Ok(CachedToken {
                    value: token.clone(),
                    expires_at: DateTime::<Utc>::MAX_UTC,
                })
            }
            TokenSource::ServiceAccount {
                key,
                signing_key,
                token_uri,
            } => {
                let assertion = sign_assertion(key, signing_key, token_uri)?;
                (
                    token_uri,
                    vec![
                        ("grant_type", JWT_BEARER_GRANT.to_string()),
                        ("assertion", assertion),
                    ],
                )
            }
            TokenSource::AuthorizedUser { key, token_uri } => (
                token_uri,
                vec![
                    ("grant_type", "refresh_token".to_string()),
                    ("client_id", key.client_id.clone()),
                    ("client_secret", key.client_secret.clone()),
                    ("refresh_token", key.refresh_token.clone()),
                ],
            ),
        };

        debug!(token_uri = %token_uri, kind = self.kind(), "Requesting access token");
        let response = self
            .client
            .post(token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| MaculaError::classification(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MaculaError::classification(format!(
                "token endpoint rejected credentials (HTTP {}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MaculaError::classification(format!("malformed token response: {}", e)))?;

        let expires_at = Utc::now()
            .checked_add_signed(cache_lifetime(token.expires_in)?)
            .ok_or_else(|| MaculaError::classification("token expiry out of range"))?;
        Ok(CachedToken {
            value: token.access_token,
            expires_at,
        })
    }
}

/// How long a fresh token stays in the cache.
///
/// The reported lifetime is clamped to a day. Tokens that outlive the expiry
/// margin are dropped that much early; shorter ones are kept for their whole
/// lifetime.
fn cache_lifetime(expires_in: Option<i64>) -> MaculaResult<Duration> {
    let lifetime = expires_in
        .unwrap_or(ASSERTION_LIFETIME_SECS)
        .clamp(0, MAX_TOKEN_LIFETIME_SECS);
    let cached = if lifetime > EXPIRY_MARGIN_SECS {
        lifetime - EXPIRY_MARGIN_SECS
    } else {
        lifetime
    };
    Duration::try_seconds(cached)
        .ok_or_else(|| MaculaError::classification(format!("token lifetime out of range: {}s", cached)))
}

fn sign_assertion(
    key: &ServiceAccountKey,
    signing_key: &EncodingKey,
    token_uri: &str,
) -> MaculaResult<String> {
    let now = Utc::now().timestamp();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    jsonwebtoken::encode(&header, &claims, signing_key)
        .map_err(|e| MaculaError::classification(format!("failed to sign token assertion: {}", e)))
}
