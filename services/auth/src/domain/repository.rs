#![allow(async_fn_in_trait)]

use jsonwebtoken::jwk::JwkSet;
use url::Url;
use uuid::Uuid;

use financehub_domain::user::UserRole;

use crate::domain::types::{AuthCode, EmailMessage, Session, SessionKey, User};
use crate::error::AuthServiceError;

/// Repository for local user profiles.
///
/// `Ok(None)` / empty vectors mean "not found"; `Err` is reserved for store failures.
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthServiceError>;

    /// Exact match on the normalized email. With duplicate rows, the most
    /// recently updated wins.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthServiceError>;

    /// Every row whose stored email equals `email` exactly.
    async fn find_all_by_email(&self, email: &str) -> Result<Vec<User>, AuthServiceError>;

    /// Every row whose stored email equals `email` ignoring case. Catches rows
    /// written before emails were normalized.
    async fn find_all_by_email_ci(&self, email: &str) -> Result<Vec<User>, AuthServiceError>;

    /// Insert unless a row with the same id or email exists.
    /// Returns `false` when the insert lost to a conflicting row.
    async fn insert_if_absent(&self, user: &User) -> Result<bool, AuthServiceError>;

    /// Set name and role, bump `updated_at`, return the stored row.
    async fn update_profile(
        &self,
        id: Uuid,
        nome: &str,
        role: UserRole,
    ) -> Result<User, AuthServiceError>;

    async fn touch_last_login(&self, id: Uuid) -> Result<(), AuthServiceError>;
}

/// Repository for one-time auth codes.
pub trait AuthCodeRepository: Send + Sync {
    /// Mark every unused, unexpired code for `email` as used. Returns rows touched.
    async fn invalidate_outstanding(&self, email: &str) -> Result<u64, AuthServiceError>;

    async fn insert(&self, code: &AuthCode) -> Result<(), AuthServiceError>;

    /// Most recent unused, unexpired code for `email` matching `code`.
    async fn find_latest_valid(
        &self,
        email: &str,
        code: &str,
    ) -> Result<Option<AuthCode>, AuthServiceError>;

    /// Flip `used` on a still-unused code. `false` means another caller
    /// consumed it first.
    async fn consume(&self, id: Uuid) -> Result<bool, AuthServiceError>;

    /// Add one failed attempt to every outstanding code for `email`.
    async fn increment_attempts(&self, email: &str) -> Result<u64, AuthServiceError>;

    /// Physically delete codes that are expired or used.
    async fn delete_expired_or_used(&self) -> Result<u64, AuthServiceError>;
}

/// Repository for opaque sessions.
pub trait SessionRepository: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<(), AuthServiceError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Session>, AuthServiceError>;

    async fn touch_activity(&self, id: Uuid) -> Result<(), AuthServiceError>;

    /// Returns the number of rows deleted (0 when nothing matched).
    async fn delete(&self, key: SessionKey<'_>) -> Result<u64, AuthServiceError>;

    async fn delete_expired(&self) -> Result<u64, AuthServiceError>;
}

/// Fetches an issuer's published signing keys.
pub trait KeySetPort: Send + Sync {
    async fn fetch(&self, jwks_url: &Url) -> Result<JwkSet, AuthServiceError>;

    /// Fetch past the cache, used when a token names a key the cached set
    /// lacks. Implementations may throttle and return the cached set.
    async fn refresh(&self, jwks_url: &Url) -> Result<JwkSet, AuthServiceError> {
        self.fetch(jwks_url).await
    }
}

/// Email delivery collaborator. Callers treat failures as best-effort.
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), AuthServiceError>;
}

/// Admin operations against the external identity provider.
pub trait IdentityProviderPort: Send + Sync {
    /// Create an already-confirmed email/password identity; returns its subject id.
    /// Fails with `EmailAlreadyRegistered` when the provider knows the address.
    async fn create_confirmed_user(
        &self,
        email: &str,
        password: &str,
        nome: &str,
        role: UserRole,
    ) -> Result<Uuid, AuthServiceError>;

    /// Mark the identity's email as confirmed.
    async fn confirm_email(&self, subject: Uuid) -> Result<(), AuthServiceError>;
}
