//! Verification of tokens minted by the external identity provider.
//!
//! The provider signs either with a shared HS256 secret or with an asymmetric key
//! published at `{issuer}/.well-known/jwks.json`. Which one a given token uses is
//! read from its header, then exactly that algorithm is enforced.

use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use financehub_auth_types::token::{
    ExternalClaims, Expectations, TokenError, inspect, verify, verify_with_secret,
};

use crate::domain::repository::KeySetPort;
use crate::domain::types::Identity;
use crate::error::AuthServiceError;

/// How a token's signature is checked, decided by its declared algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SigningFamily<'a> {
    SharedSecret,
    Discovered {
        algorithm: Algorithm,
        issuer: &'a str,
    },
}

impl<'a> SigningFamily<'a> {
    fn of(algorithm: Algorithm, issuer: Option<&'a str>) -> Result<Self, TokenError> {
        match (algorithm, issuer) {
            (Algorithm::HS256, _) => Ok(Self::SharedSecret),
            (Algorithm::ES256 | Algorithm::RS256, Some(issuer)) => {
                Ok(Self::Discovered { algorithm, issuer })
            }
            (Algorithm::ES256 | Algorithm::RS256, None) => Err(TokenError::Rejected("issuer")),
            _ => Err(TokenError::Rejected("algorithm")),
        }
    }
}

#[derive(Clone)]
pub struct ExternalTokenValidator<K: KeySetPort> {
    /// HS256 secret. Shared-secret tokens are rejected when absent.
    pub secret: Option<String>,
    pub audience: Option<String>,
    /// Issuers whose key sets may be fetched, without trailing slash.
    pub trusted_issuers: Vec<String>,
    pub keys: K,
}

impl<K: KeySetPort> ExternalTokenValidator<K> {
    /// Verified identity, or `None` for any failure. Never errors.
    pub async fn validate(&self, token: &str) -> Option<Identity> {
        match self.try_validate(token).await {
            Ok(identity) => Some(identity),
            Err(reason) => {
                debug!(%reason, "third-party token rejected");
                None
            }
        }
    }

    async fn try_validate(&self, token: &str) -> Result<Identity, TokenError> {
        // 1. Structural decode only
        let unverified = inspect(token)?;

        // 2. Expired tokens never reach the network
        let exp = unverified.exp.ok_or(TokenError::Malformed)?;
        if exp <= now_secs() {
            return Err(TokenError::Expired);
        }

        // 3-5. Dispatch on the declared algorithm
        let claims = match SigningFamily::of(unverified.header.alg, unverified.iss.as_deref())? {
            SigningFamily::SharedSecret => {
                let secret = self
                    .secret
                    .as_deref()
                    .ok_or(TokenError::Rejected("no shared secret configured"))?;
                verify_with_secret(token, secret, self.audience.as_deref())?
            }
            SigningFamily::Discovered { algorithm, issuer } => {
                let jwks_url = self.jwks_url(issuer)?;
                let kid = unverified.header.kid.as_deref();
                let mut keys = self.keys.fetch(&jwks_url).await.map_err(key_set_unavailable)?;
                // Unknown kid: the provider may have rotated keys since caching
                if kid.is_some_and(|kid| keys.find(kid).is_none()) {
                    keys = self.keys.refresh(&jwks_url).await.map_err(key_set_unavailable)?;
                }
                let expect = Expectations {
                    algorithm,
                    issuer: Some(issuer),
                    audience: self.audience.as_deref(),
                };
                verify_with_key_set(token, kid, &keys, expect)?
            }
        };

        // 6. Normalized identity
        identity_from_claims(claims)
    }

    /// Key-set URL for a trusted issuer. Untrusted issuers are rejected here,
    /// before any request is made.
    fn jwks_url(&self, issuer: &str) -> Result<Url, TokenError> {
        let issuer = issuer.trim_end_matches('/');
        if !self.trusted_issuers.iter().any(|t| t == issuer) {
            return Err(TokenError::Rejected("untrusted issuer"));
        }
        Url::parse(&format!("{issuer}/.well-known/jwks.json")).map_err(|_| TokenError::Malformed)
    }
}

fn key_set_unavailable(e: AuthServiceError) -> TokenError {
    debug!(error = %e, "key set fetch failed");
    TokenError::Rejected("key set unavailable")
}

/// With a `kid`, only that key is tried; without one, every key in the set.
fn verify_with_key_set(
    token: &str,
    kid: Option<&str>,
    keys: &JwkSet,
    expect: Expectations<'_>,
) -> Result<ExternalClaims, TokenError> {
    let candidates: Vec<_> = match kid {
        Some(kid) => keys.find(kid).into_iter().collect(),
        None => keys.keys.iter().collect(),
    };

    let mut last = TokenError::Rejected("no matching key");
    for jwk in candidates {
        let Ok(key) = DecodingKey::from_jwk(jwk) else {
            continue;
        };
        match verify(token, &key, expect) {
            Ok(claims) => return Ok(claims),
            Err(e) => last = e,
        }
    }
    Err(last)
}

fn identity_from_claims(claims: ExternalClaims) -> Result<Identity, TokenError> {
    let subject = Uuid::parse_str(&claims.sub).map_err(|_| TokenError::Malformed)?;
    let expires_at = i64::try_from(claims.exp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .ok_or(TokenError::Malformed)?;
    let audience = claims.audience();
    Ok(Identity {
        subject,
        email: claims.email.filter(|e| !e.is_empty()),
        role: claims.role,
        expires_at,
        audience,
    })
}

fn now_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}
