//! Bearer-token extractor.

use axum::extract::{FromRequestParts, Query};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use http::StatusCode;
use http::request::Parts;
use serde::Deserialize;

/// Raw credential presented by the caller, either an opaque session token or a
/// third-party JWT. Telling the two apart is the session resolver's job.
///
/// Read from `Authorization: Bearer <token>`, falling back to the `token` query
/// parameter (used by download links that cannot set headers).
/// Returns 401 if neither is present or the value is empty.
#[derive(Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print the secret itself.
impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BearerToken").field(&"<redacted>").finish()
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn token_from_parts(parts: &Parts) -> Option<String> {
    let from_header = parts
        .headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().trim().to_owned());

    let token = from_header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.token)
            .map(|t| t.trim().to_owned())
    })?;

    (!token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let token = token_from_parts(parts);
        async move { token.map(Self).ok_or(StatusCode::UNAUTHORIZED) }
    }
}
