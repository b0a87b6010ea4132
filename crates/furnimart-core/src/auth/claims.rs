//! Unverified decoding of the access token payload.
//!
//! The client never validates signatures; it only peeks at `exp` to decide
//! whether a silent refresh is needed, and at `user_id` right after login.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    user_id: Option<Value>,
}

impl Claims {
    /// The `user_id` claim as a string; the API issues it as a number.
    pub fn user_id(&self) -> Option<String> {
        match self.user_id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Decode the payload segment of a JWT. Returns `None` for anything that is
/// not three dot-separated segments with a base64url JSON payload.
pub fn decode(token: &str) -> Option<Claims> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    // Some issuers keep the padding
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// True when the token cannot be trusted to still be valid at `now`.
///
/// Undecodable tokens and tokens without an `exp` claim count as expired.
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    match decode(token).and_then(|c| c.exp) {
        Some(exp) => exp <= now.timestamp(),
        None => true,
    }
}

pub fn user_id(token: &str) -> Option<String> {
    decode(token)?.user_id()
}

#[cfg(test)]
pub(crate) fn make_token(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}
