//! JWT assertion signing
//!
//! The issuer assembles the claim set; this module owns the signing seam
//! and the narrow unverified-payload parse used to read an identity
//! token's expiry.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Claim set of a JWT-bearer assertion
///
/// Exactly one of `scope` / `target_audience` is set, depending on the
/// issuer's authorization mode; the absent one is omitted from the
/// serialized payload.
#[derive(Debug, Clone, Serialize)]
pub struct Claims {
    /// Token endpoint the assertion is addressed to
    pub aud: String,
    /// Service account identity
    pub iss: String,
    /// Space-separated permission scopes (access-token mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Audience the identity token is minted for (identity-token mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    /// Issued-at, seconds since epoch
    pub iat: u64,
    /// Expiry, seconds since epoch
    pub exp: u64,
}

/// Signing capability bound to a private key
///
/// Implementations are read-only after construction and safe for
/// concurrent use. `sign` is async so implementations may defer key
/// loading until the first signature.
#[async_trait]
pub trait AssertionSigner: Send + Sync {
    /// Produce a compact signed token for the claim set
    async fn sign(&self, claims: &Claims) -> Result<String>;
}

/// RS256 signer over a PEM-encoded PKCS#8 private key
pub struct RsaSigner {
    key: EncodingKey,
    header: Header,
}

impl RsaSigner {
    /// Bind a PEM-encoded RSA private key
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM does not contain a usable RSA key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        Ok(Self {
            key: EncodingKey::from_rsa_pem(pem.as_bytes())?,
            header: Header::new(Algorithm::RS256),
        })
    }
}

#[async_trait]
impl AssertionSigner for RsaSigner {
    async fn sign(&self, claims: &Claims) -> Result<String> {
        Ok(jsonwebtoken::encode(&self.header, claims, &self.key)?)
    }
}

/// Read the `exp` claim (seconds since epoch) from a compact JWT without
/// verifying its signature.
///
/// This is a parse, not a security check: the token arrives straight from
/// the token endpoint over TLS, and verifying it is the relying party's
/// responsibility, never this client's.
pub(crate) fn decode_expiry(token: &str) -> Option<u64> {
    #[derive(Deserialize)]
    struct ExpClaim {
        exp: u64,
    }

    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: ExpClaim = serde_json::from_slice(&bytes).ok()?;
    Some(claims.exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &serde_json::Value) -> String {
        let encoded = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("eyJhbGciOiJSUzI1NiJ9.{encoded}.c2ln")
    }

    #[test]
    fn decode_expiry_reads_the_exp_claim() {
        let token = token_with_payload(&serde_json::json!({
            "iss": "https://accounts.google.com",
            "exp": 1_700_000_000u64,
        }));
        assert_eq!(decode_expiry(&token), Some(1_700_000_000));
    }

    #[test]
    fn decode_expiry_rejects_a_token_without_segments() {
        assert_eq!(decode_expiry("not-a-jwt"), None);
    }

    #[test]
    fn decode_expiry_rejects_an_undecodable_payload() {
        assert_eq!(decode_expiry("head.!!not-base64!!.sig"), None);
    }

    #[test]
    fn decode_expiry_rejects_a_payload_without_exp() {
        let token = token_with_payload(&serde_json::json!({"iss": "x"}));
        assert_eq!(decode_expiry(&token), None);
    }

    #[test]
    fn scope_mode_claims_omit_target_audience() {
        let claims = Claims {
            aud: "https://example.com/token".to_string(),
            iss: "svc@example.com".to_string(),
            scope: Some("a b".to_string()),
            target_audience: None,
            iat: 100,
            exp: 3700,
        };
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["scope"], "a b");
        assert!(value.get("target_audience").is_none());
    }

    #[test]
    fn audience_mode_claims_omit_scope() {
        let claims = Claims {
            aud: "https://example.com/token".to_string(),
            iss: "svc@example.com".to_string(),
            scope: None,
            target_audience: Some("https://my-service.example.com".to_string()),
            iat: 100,
            exp: 3700,
        };
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value["target_audience"], "https://my-service.example.com");
        assert!(value.get("scope").is_none());
    }

    #[test]
    fn rsa_signer_rejects_garbage_pem() {
        assert!(RsaSigner::from_pem("not a pem").is_err());
    }
}
