//! Third-party JWT decoding and verification.
//!
//! Two steps, kept apart on purpose: [`inspect`] reads the header and a couple of
//! payload claims without checking anything, so the caller can pick a
//! verification method; [`verify`] then checks signature, expiry, issuer and
//! audience with exactly one accepted algorithm.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};

/// Errors returned by token inspection and verification.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token rejected: {0}")]
    Rejected(&'static str),
}

/// Claims carried by an identity-provider token.
///
/// | Field | Meaning |
/// |-------|---------|
/// | `sub` | subject id, the user's id at the provider |
/// | `email` | optional; present for email/password identities |
/// | `role` | optional provider-side role string |
/// | `exp` | expiry, seconds since UNIX epoch |
/// | `aud` | string or array of strings |
/// | `iss` | issuer base URL |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

impl ExternalClaims {
    /// `aud` flattened to a list; a single string becomes a one-element list.
    pub fn audience(&self) -> Vec<String> {
        match &self.aud {
            Some(serde_json::Value::String(s)) => vec![s.clone()],
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Header and routing claims read without verification. Not a trust decision.
#[derive(Debug, Clone)]
pub struct Unverified {
    pub header: Header,
    pub iss: Option<String>,
    pub exp: Option<u64>,
}

#[derive(Deserialize)]
struct PeekClaims {
    iss: Option<String>,
    exp: Option<u64>,
}

/// Structural decode: header plus `iss`/`exp` from the payload.
pub fn inspect(token: &str) -> Result<Unverified, TokenError> {
    let header = decode_header(token).map_err(|_| TokenError::Malformed)?;

    let mut segments = token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed);
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| TokenError::Malformed)?;
    let peek: PeekClaims = serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)?;

    Ok(Unverified {
        header,
        iss: peek.iss,
        exp: peek.exp,
    })
}

/// What [`verify`] checks beyond the signature.
#[derive(Debug, Clone, Copy)]
pub struct Expectations<'a> {
    /// The only algorithm accepted. A token declaring anything else is rejected.
    pub algorithm: Algorithm,
    pub issuer: Option<&'a str>,
    pub audience: Option<&'a str>,
}

/// Verify signature, `exp`, and optionally `iss`/`aud`; return the claims.
///
/// Required claims: `exp` + `sub`. Default leeway = 60s.
pub fn verify(
    token: &str,
    key: &DecodingKey,
    expect: Expectations<'_>,
) -> Result<ExternalClaims, TokenError> {
    let mut validation = Validation::new(expect.algorithm);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);
    match expect.audience {
        Some(aud) => validation.set_audience(&[aud]),
        None => validation.validate_aud = false,
    }
    if let Some(iss) = expect.issuer {
        validation.set_issuer(&[iss]);
    }

    let data = decode::<ExternalClaims>(token, key, &validation).map_err(|e| {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_) => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => TokenError::Rejected("algorithm"),
            ErrorKind::InvalidIssuer => TokenError::Rejected("issuer"),
            ErrorKind::InvalidAudience => TokenError::Rejected("audience"),
            _ => TokenError::Malformed,
        }
    })?;

    Ok(data.claims)
}

/// HS256 shortcut over [`verify`] for the shared-secret signing mode.
pub fn verify_with_secret(
    token: &str,
    secret: &str,
    audience: Option<&str>,
) -> Result<ExternalClaims, TokenError> {
    verify(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        Expectations {
            algorithm: Algorithm::HS256,
            issuer: None,
            audience,
        },
    )
}
