use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use financehub_domain::email::normalize_email;
use financehub_domain::user::UserRole;

use crate::domain::repository::{KeySetPort, SessionRepository, UserRepository};
use crate::domain::types::{Identity, PublicUser, Session, SessionInfo, SessionKey, SessionSource, User};
use crate::error::AuthServiceError;
use crate::usecase::external_token::ExternalTokenValidator;

/// Most recently updated active row, deduplicated by id.
///
/// Multiple lookup paths (id, exact email, case-insensitive email) can return the
/// same row, and legacy data can hold more than one row per email.
pub fn pick_authoritative(candidates: impl IntoIterator<Item = User>) -> Option<User> {
    let mut by_id: HashMap<_, User> = HashMap::new();
    for user in candidates.into_iter().filter(|u| u.ativo) {
        by_id.entry(user.id).or_insert(user);
    }
    by_id
        .into_values()
        .max_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)))
}

// ── ResolveSession ────────────────────────────────────────────────────────────

pub struct ResolveSessionUseCase<U, S, K>
where
    U: UserRepository,
    S: SessionRepository,
    K: KeySetPort,
{
    pub users: U,
    pub sessions: S,
    pub validator: ExternalTokenValidator<K>,
}

impl<U, S, K> ResolveSessionUseCase<U, S, K>
where
    U: UserRepository,
    S: SessionRepository,
    K: KeySetPort,
{
    pub async fn execute(&self, token: &str) -> Result<SessionInfo, AuthServiceError> {
        // Opaque path
        if let Some(session) = self.sessions.find_by_token(token).await? {
            return self.resolve_opaque(session).await;
        }

        // Third-party path
        let identity = self
            .validator
            .validate(token)
            .await
            .ok_or(AuthServiceError::InvalidSession)?;
        self.resolve_external(identity).await
    }

    async fn resolve_opaque(&self, session: Session) -> Result<SessionInfo, AuthServiceError> {
        let now = Utc::now();
        if session.is_expired(now) {
            self.sessions.delete(SessionKey::Id(session.id)).await?;
            info!(session_id = %session.id, "expired session removed");
            return Err(AuthServiceError::SessionExpired);
        }

        let user = self
            .users
            .find_by_id(session.user_id)
            .await?
            .ok_or(AuthServiceError::InvalidSession)?;
        if !user.ativo {
            return Err(AuthServiceError::UserInactive);
        }

        self.sessions.touch_activity(session.id).await?;

        Ok(SessionInfo {
            id: Some(session.id),
            user_id: user.id,
            expires_at: session.expires_at,
            last_activity: Some(now),
            user: user.public(),
            effective_owner_id: user.effective_owner_id(),
            source: SessionSource::Opaque,
            provisioned: true,
        })
    }

    async fn resolve_external(&self, identity: Identity) -> Result<SessionInfo, AuthServiceError> {
        let mut candidates = Vec::new();
        candidates.extend(self.users.find_by_id(identity.subject).await?);
        if let Some(email) = identity.email.as_deref() {
            let email = normalize_email(email);
            candidates.extend(self.users.find_all_by_email(&email).await?);
            candidates.extend(self.users.find_all_by_email_ci(&email).await?);
        }

        if candidates.is_empty() {
            info!(subject = %identity.subject, "third-party identity without local profile");
            return Ok(unprovisioned(identity));
        }

        let user = pick_authoritative(candidates).ok_or(AuthServiceError::UserInactive)?;
        if user.id != identity.subject {
            warn!(
                subject = %identity.subject,
                user_id = %user.id,
                "third-party subject resolved to a profile with a different id"
            );
        }

        Ok(SessionInfo {
            id: None,
            user_id: user.id,
            expires_at: identity.expires_at,
            last_activity: None,
            user: user.public(),
            effective_owner_id: user.effective_owner_id(),
            source: SessionSource::External,
            provisioned: true,
        })
    }
}

/// Minimal session for a verified identity that still needs a profile.
fn unprovisioned(identity: Identity) -> SessionInfo {
    SessionInfo {
        id: None,
        user_id: identity.subject,
        expires_at: identity.expires_at,
        last_activity: None,
        user: PublicUser {
            id: identity.subject,
            nome: String::new(),
            email: identity
                .email
                .as_deref()
                .map(normalize_email)
                .unwrap_or_default(),
            role: UserRole::default(),
        },
        effective_owner_id: identity.subject,
        source: SessionSource::External,
        provisioned: false,
    }
}

// ── Logout ────────────────────────────────────────────────────────────────────

pub struct LogoutUseCase<S: SessionRepository> {
    pub sessions: S,
}

impl<S: SessionRepository> LogoutUseCase<S> {
    /// Idempotent: an unknown token is not an error.
    pub async fn execute(&self, token: &str) -> Result<(), AuthServiceError> {
        let deleted = self.sessions.delete(SessionKey::Token(token)).await?;
        if deleted > 0 {
            info!(deleted, "session logged out");
        }
        Ok(())
    }
}
