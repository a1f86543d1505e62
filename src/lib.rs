//! OAuth2 JWT-bearer grant client
//!
//! Issues and caches short-lived bearer tokens for a service account using
//! the JWT-bearer grant (RFC 7523), and wraps an HTTP client that attaches
//! the current token to outgoing requests.
//!
//! # Features
//!
//! - **Token issuance**: RS256-signed JWT assertions exchanged at the OAuth2
//!   token endpoint
//! - **Caching**: tokens reused until near expiry (60 second safety margin)
//! - **Refresh coalescing**: concurrent callers share a single in-flight
//!   exchange
//! - **Two authorization modes**: scoped access tokens, or identity tokens
//!   bound to a target audience
//! - **Authenticated requests**: `Authorization: Bearer` injection for
//!   outgoing `reqwest` requests
//!
//! # Example
//!
//! ```no_run
//! use jwt_bearer::{AuthenticatedClient, AuthorizationMode, ServiceAccountKey};
//!
//! # async fn run() -> jwt_bearer::Result<()> {
//! let key = ServiceAccountKey::from_file("service_account.json").await?;
//! let client = AuthenticatedClient::from_credentials(
//!     &key,
//!     AuthorizationMode::Scopes(vec!["https://www.googleapis.com/auth/pubsub".into()]),
//! )?;
//!
//! let request = reqwest::Client::new()
//!     .get("https://pubsub.googleapis.com/v1/projects/demo/topics")
//!     .build()?;
//! let response = client.fetch(request).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod credentials;
pub mod error;

pub use auth::{
    AssertionSigner, AuthenticatedClient, AuthorizationMode, Claims, RsaSigner, TokenIssuer,
};
pub use credentials::ServiceAccountKey;
pub use error::{Error, Result};
