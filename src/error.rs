//! Error types for the JWT-bearer client

use std::io;

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Failures while issuing tokens or dispatching authenticated requests
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error: ambiguous or missing authorization mode,
    /// unusable credentials. Raised at construction, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The token endpoint returned a response this client cannot use:
    /// a non-success status, unparseable JSON, or a body carrying neither
    /// an access token nor an identity token.
    #[error("Token exchange failed: HTTP {status} - {body}")]
    TokenExchange {
        /// Status returned by the token endpoint
        status: u16,
        /// Raw response body, kept for diagnostics
        body: String,
    },

    /// HTTP transport error, propagated unchanged
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JWT signing error (malformed key material, encode failure),
    /// propagated unchanged from the signer
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The issued token cannot be carried in an `Authorization` header
    #[error("Invalid bearer header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}
