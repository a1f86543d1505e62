//! Authenticated HTTP client
//!
//! Wraps a [`TokenIssuer`] and a `reqwest` transport; outgoing requests
//! get the current bearer token attached before dispatch.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, Request, Response};

use super::issuer::{AuthorizationMode, TokenIssuer};
use crate::Result;
use crate::credentials::ServiceAccountKey;

/// HTTP client that attaches a service account's bearer token to every
/// request it signs or dispatches
pub struct AuthenticatedClient {
    issuer: Arc<TokenIssuer>,
    http: Client,
}

impl fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedClient").finish_non_exhaustive()
    }
}

impl AuthenticatedClient {
    /// Wrap a ready-made issuer
    pub fn new(issuer: Arc<TokenIssuer>) -> Self {
        Self {
            issuer,
            http: Client::new(),
        }
    }

    /// Build a client (and its issuer) from a service account key
    pub fn from_credentials(key: &ServiceAccountKey, mode: AuthorizationMode) -> Result<Self> {
        Ok(Self::new(Arc::new(TokenIssuer::from_credentials(key, mode)?)))
    }

    /// Build a client from the JSON text of a service account key file
    pub fn from_json(json: &str, mode: AuthorizationMode) -> Result<Self> {
        Self::from_credentials(&ServiceAccountKey::from_json(json)?, mode)
    }

    /// Use a caller-provided transport for dispatch
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Current bearer token of the underlying issuer
    ///
    /// For callers that need the raw value without building an HTTP
    /// request, e.g. to put it on a non-HTTP channel.
    pub async fn token(&self) -> Result<String> {
        self.issuer.token().await
    }

    /// Attach `Authorization: Bearer <token>` to a request without
    /// dispatching it
    ///
    /// Consumes the request and returns the signed one; a caller keeping a
    /// reusable template should clone it first. Triggers a token refresh
    /// when the cache is stale.
    pub async fn sign(&self, mut request: Request) -> Result<Request> {
        let token = self.issuer.token().await?;
        let mut bearer = HeaderValue::from_str(&format!("Bearer {token}"))?;
        bearer.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, bearer);
        Ok(request)
    }

    /// Sign a request and dispatch it
    ///
    /// Signing, refresh, and transport failures propagate unchanged; no
    /// retry happens at this layer, and nothing is ever sent without a
    /// valid token.
    pub async fn fetch(&self, request: Request) -> Result<Response> {
        let request = self.sign(request).await?;
        Ok(self.http.execute(request).await?)
    }
}
