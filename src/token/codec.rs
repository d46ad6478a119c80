//! Reads the claims embedded in a bearer token.
//!
//! The signature is not checked; only expiry and identity are read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode_header, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::DecodeError;
use crate::models::Claims;

/// Helper struct to read claims from the token payload.
#[derive(Debug, Deserialize)]
struct RawClaims {
    exp: Option<Value>,
    user_id: Option<Value>,
    sub: Option<Value>,
    username: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

/// Parses the payload segment of `token` into [`Claims`].
pub fn decode(token: &str) -> Result<Claims, DecodeError> {
    let header = decode_header(token)
        .map_err(|e| DecodeError::Malformed(format!("Failed to decode token header: {}", e)))?;

    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let raw = jsonwebtoken::decode::<RawClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| DecodeError::Malformed(format!("Failed to decode token payload: {}", e)))?
        .claims;

    let expires_at_unix_seconds = raw
        .exp
        .as_ref()
        .and_then(|exp| exp.as_i64().or_else(|| exp.as_f64().map(|f| f.floor() as i64)))
        .ok_or(DecodeError::MissingClaim("exp"))?;

    // The backend puts the account id in `user_id`; standard issuers use `sub`.
    let subject_id = raw
        .user_id
        .or(raw.sub)
        .and_then(claim_to_string)
        .unwrap_or_default();

    Ok(Claims {
        subject_id,
        username: raw.username.unwrap_or_default(),
        expires_at_unix_seconds,
        extra: raw.extra,
    })
}

/// True when the token's expiry lies strictly before `now`, or when the
/// token cannot be read at all.
pub fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
    match decode(token) {
        Ok(claims) => claims.expires_at_unix_seconds.saturating_mul(1000) < now.timestamp_millis(),
        Err(_) => true,
    }
}

fn claim_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
