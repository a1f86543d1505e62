//! OAuth2 JWT-bearer grant support
//!
//! Implements the service-account half of RFC 7523: a signed JWT assertion
//! is exchanged at the token endpoint for a short-lived bearer token, which
//! is cached until near expiry and attached to outgoing requests.
//!
//! Features:
//! - RS256 assertion signing over a claim set fixed at construction
//! - Token caching with transparent, coalesced refresh
//! - Scoped access tokens or audience-bound identity tokens
//! - `Authorization: Bearer` injection for outgoing requests

mod client;
mod issuer;
mod jwt;

pub use client::AuthenticatedClient;
pub use issuer::{AuthorizationMode, DEFAULT_TOKEN_URI, TokenIssuer};
pub use jwt::{AssertionSigner, Claims, RsaSigner};
