use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Access/refresh credential pair as issued by the `login/` endpoint.
/// Either half may be empty in a record written by an older client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub access: String,
    #[serde(default)]
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    /// Same refresh token, new access token. Refresh responses only carry
    /// `access`.
    pub fn with_access(&self, access: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: self.refresh.clone(),
        }
    }

    pub fn has_access(&self) -> bool {
        !self.access.trim().is_empty()
    }

    pub fn has_refresh(&self) -> bool {
        !self.refresh.trim().is_empty()
    }

    /// Expiry of the access token, read from its `exp` claim.
    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        AccessClaims::peek(&self.access).and_then(|claims| claims.expires_at())
    }
}

// Tokens are bearer secrets; keep them out of logs and debug output.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &redact(&self.access))
            .field("refresh", &redact(&self.refresh))
            .finish()
    }
}

fn redact(token: &str) -> String {
    if token.is_empty() {
        String::new()
    } else {
        format!("<{} chars>", token.len())
    }
}

/// Response body of `refresh/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Claims we care about inside a simplejwt access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl AccessClaims {
    /// Read the claims without verifying the signature. The client never
    /// holds the signing key; this is only used for display and scheduling,
    /// the server remains the authority on validity.
    pub fn peek(token: &str) -> Option<Self> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map(|data| data.claims)
            .ok()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}
