//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

use jwt_bearer::{AssertionSigner, AuthorizationMode, Claims, Result, TokenIssuer};

/// Assertion every test signer produces; the mock endpoint never verifies it
pub const STUB_ASSERTION: &str = "stub.signed.assertion";

/// Signer returning a fixed compact token
pub struct StaticSigner;

#[async_trait]
impl AssertionSigner for StaticSigner {
    async fn sign(&self, _claims: &Claims) -> Result<String> {
        Ok(STUB_ASSERTION.to_string())
    }
}

/// Scoped-mode issuer pointed at a test endpoint
pub fn issuer_for(token_uri: &str) -> TokenIssuer {
    TokenIssuer::with_signer(
        "svc@demo-project.iam.gserviceaccount.com",
        Arc::new(StaticSigner),
        AuthorizationMode::Scopes(vec!["https://www.googleapis.com/auth/pubsub".to_string()]),
    )
    .with_token_uri(token_uri)
}

/// Compact but unsigned identity token whose payload carries `exp`
pub fn id_token_with_exp(exp: u64) -> String {
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "exp": exp }).to_string());
    format!("eyJhbGciOiJSUzI1NiJ9.{payload}.c2ln")
}
