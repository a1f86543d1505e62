//! Token issuance and caching
//!
//! The issuer exchanges RS256-signed JWT assertions for bearer tokens at
//! the OAuth2 token endpoint and caches the result until near expiry.
//!
//! # Refresh flow
//!
//! 1. `token()` returns the cached value while its expiry lies in the
//!    future.
//! 2. Once stale, the base claim set is stamped with a fresh `iat`/`exp`,
//!    signed, and posted as a JWT-bearer grant.
//! 3. An `id_token` response is cached until the token's own `exp` claim;
//!    an `access_token` response until `expires_in` minus a 60 second
//!    safety margin.
//!
//! The cache slot doubles as the refresh lock: callers arriving while an
//! exchange is in flight wait on it and observe the refreshed value, so
//! one refresh cycle costs exactly one endpoint call.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::jwt::{self, AssertionSigner, Claims, RsaSigner};
use crate::credentials::ServiceAccountKey;
use crate::{Error, Result};

/// Token endpoint used when neither the key file nor the caller pins one
pub const DEFAULT_TOKEN_URI: &str = "https://www.googleapis.com/oauth2/v4/token";

/// JWT-bearer grant type (RFC 7523)
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a signed assertion, in seconds
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Seconds subtracted from a declared token lifetime so the cache never
/// races true expiry
const EXPIRY_MARGIN_SECS: u64 = 60;

/// What the issuer asks the token endpoint for
///
/// Exactly one variant is active per issuer; the claim set carries either
/// `scope` or `target_audience`, never both.
#[derive(Debug, Clone)]
pub enum AuthorizationMode {
    /// An access token covering the given permission scopes
    Scopes(Vec<String>),
    /// An identity token asserting the account's identity to one audience
    TargetAudience(String),
}

impl AuthorizationMode {
    /// Build a mode from optional raw parts, rejecting ambiguity
    ///
    /// Exactly one of `scopes` / `target_audience` must be present.
    /// Supplying both, or neither, is a configuration error rather than a
    /// silent precedence.
    pub fn from_options(
        scopes: Option<Vec<String>>,
        target_audience: Option<String>,
    ) -> Result<Self> {
        match (scopes, target_audience) {
            (Some(scopes), None) => Ok(Self::Scopes(scopes)),
            (None, Some(audience)) => Ok(Self::TargetAudience(audience)),
            (Some(_), Some(_)) => Err(Error::Config(
                "both scopes and target_audience supplied; pick one".to_string(),
            )),
            (None, None) => Err(Error::Config(
                "either scopes or target_audience is required".to_string(),
            )),
        }
    }
}

/// Claim fields fixed at construction; only `iat`/`exp` vary per refresh.
/// `aud` is the token endpoint and is also where the exchange is posted.
#[derive(Debug, Clone)]
struct BaseClaims {
    aud: String,
    iss: String,
    scope: Option<String>,
    target_audience: Option<String>,
}

impl BaseClaims {
    fn new(aud: String, iss: String, mode: &AuthorizationMode) -> Self {
        let (scope, target_audience) = match mode {
            AuthorizationMode::Scopes(scopes) => (Some(scopes.join(" ")), None),
            AuthorizationMode::TargetAudience(audience) => (None, Some(audience.clone())),
        };
        Self {
            aud,
            iss,
            scope,
            target_audience,
        }
    }

    fn stamped(&self, iat: u64) -> Claims {
        Claims {
            aud: self.aud.clone(),
            iss: self.iss.clone(),
            scope: self.scope.clone(),
            target_audience: self.target_audience.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        }
    }
}

/// Wire shape of a token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Cached bearer token; replaced wholesale on every successful refresh
#[derive(Debug, Clone)]
struct CachedToken {
    /// Expiry in milliseconds since epoch
    expires_at_ms: u64,
    /// Bearer value
    value: String,
}

impl CachedToken {
    /// Epoch-zero entry, stale by construction: forces the first refresh
    fn stale() -> Self {
        Self {
            expires_at_ms: 0,
            value: String::new(),
        }
    }

    fn is_valid_at(&self, now_ms: u64) -> bool {
        now_ms < self.expires_at_ms
    }

    /// Derive a cache entry from a token endpoint response
    ///
    /// An identity token wins over an access token and carries its own
    /// expiry in its `exp` claim; an access token expires `expires_in`
    /// seconds from now, minus the safety margin. A response with neither
    /// is handed back to the caller as a [`Error::TokenExchange`].
    fn from_response(
        response: TokenResponse,
        status: u16,
        raw_body: &str,
        now_ms: u64,
    ) -> Result<Self> {
        if let Some(id_token) = response.id_token {
            let Some(exp_secs) = jwt::decode_expiry(&id_token) else {
                return Err(Error::TokenExchange {
                    status,
                    body: raw_body.to_string(),
                });
            };
            return Ok(Self {
                expires_at_ms: exp_secs.saturating_mul(1000),
                value: id_token,
            });
        }

        if let Some(access_token) = response.access_token {
            let lifetime_secs = response
                .expires_in
                .unwrap_or(0)
                .saturating_sub(EXPIRY_MARGIN_SECS);
            return Ok(Self {
                expires_at_ms: now_ms.saturating_add(lifetime_secs.saturating_mul(1000)),
                value: access_token,
            });
        }

        Err(Error::TokenExchange {
            status,
            body: raw_body.to_string(),
        })
    }
}

/// Issues and caches bearer tokens for one service account identity
pub struct TokenIssuer {
    /// HTTP client for the token exchange
    http: Client,
    /// Claim fields reused verbatim on every refresh
    base_claims: BaseClaims,
    /// Signing capability bound to the account's private key
    signer: Arc<dyn AssertionSigner>,
    /// Current token. The lock also serializes refreshes, so concurrent
    /// callers coalesce onto a single exchange per cycle.
    cache: Mutex<CachedToken>,
}

impl TokenIssuer {
    /// Build an issuer from a service account key
    ///
    /// The account's `client_email` becomes the `iss` claim and its
    /// private key backs an RS256 signer. A `token_uri` pinned in the key
    /// file overrides the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an empty `client_email`; unusable key
    /// material propagates as the signer's own error.
    pub fn from_credentials(key: &ServiceAccountKey, mode: AuthorizationMode) -> Result<Self> {
        if key.client_email.is_empty() {
            return Err(Error::Config(
                "credentials missing client_email".to_string(),
            ));
        }
        let signer = Arc::new(RsaSigner::from_pem(&key.private_key)?);
        let token_uri = key
            .token_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());
        Ok(Self::build(token_uri, key.client_email.clone(), signer, &mode))
    }

    /// Build an issuer around an existing signing capability
    ///
    /// For callers that already hold a live key handle rather than raw
    /// key bytes.
    pub fn with_signer(
        issuer: impl Into<String>,
        signer: Arc<dyn AssertionSigner>,
        mode: AuthorizationMode,
    ) -> Self {
        Self::build(DEFAULT_TOKEN_URI.to_string(), issuer.into(), signer, &mode)
    }

    fn build(
        token_uri: String,
        iss: String,
        signer: Arc<dyn AssertionSigner>,
        mode: &AuthorizationMode,
    ) -> Self {
        Self {
            http: Client::new(),
            base_claims: BaseClaims::new(token_uri, iss, mode),
            signer,
            cache: Mutex::new(CachedToken::stale()),
        }
    }

    /// Override the token endpoint (and with it the assertion `aud` claim)
    #[must_use]
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.base_claims.aud = token_uri.into();
        self
    }

    /// Use a caller-provided HTTP client for the exchange
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Current valid bearer token, refreshed when expired
    ///
    /// The cached value is returned untouched while it is still valid; no
    /// network call happens on that path. Otherwise one JWT-bearer
    /// exchange runs under the cache lock, and callers arriving meanwhile
    /// wait for it and share its result. A failed exchange leaves the
    /// previous cache entry in place; the next caller starts a fresh
    /// attempt.
    ///
    /// # Errors
    ///
    /// Signing, transport, and token-endpoint failures propagate
    /// unchanged; nothing is retried here.
    pub async fn token(&self) -> Result<String> {
        let mut cache = self.cache.lock().await;

        if cache.is_valid_at(epoch_millis()) {
            return Ok(cache.value.clone());
        }

        let fresh = self.exchange().await?;
        *cache = fresh;
        Ok(cache.value.clone())
    }

    /// Whether `token()` would currently be served from the cache
    pub async fn has_valid_token(&self) -> bool {
        self.cache.lock().await.is_valid_at(epoch_millis())
    }

    /// Run one assertion-signing + token-endpoint exchange
    async fn exchange(&self) -> Result<CachedToken> {
        let claims = self.base_claims.stamped(epoch_millis() / 1000);
        debug!(issuer = %claims.iss, endpoint = %claims.aud, "token cache stale, refreshing");

        let assertion = self.signer.sign(&claims).await?;

        let params = [("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())];
        let response = self
            .http
            .post(self.base_claims.aud.as_str())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::TokenExchange {
                status: status.as_u16(),
                body,
            });
        }

        let Ok(parsed) = serde_json::from_str::<TokenResponse>(&body) else {
            return Err(Error::TokenExchange {
                status: status.as_u16(),
                body,
            });
        };

        let token = CachedToken::from_response(parsed, status.as_u16(), &body, epoch_millis())?;
        info!(
            issuer = %self.base_claims.iss,
            expires_at_ms = token.expires_at_ms,
            "obtained bearer token"
        );
        Ok(token)
    }
}

fn epoch_millis() -> u64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX)
}
