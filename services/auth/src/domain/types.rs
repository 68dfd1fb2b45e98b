use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use financehub_core::serde::{opt_to_rfc3339_ms, to_rfc3339_ms};
use financehub_domain::user::UserRole;

/// Local user profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub nome: String,
    pub email: String,
    pub role: UserRole,
    pub ativo: bool,
    pub gerente_id: Option<Uuid>,
    pub ultimo_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Data scope the user operates in: the manager for sub-accounts, else itself.
    pub fn effective_owner_id(&self) -> Uuid {
        self.gerente_id.unwrap_or(self.id)
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            nome: self.nome.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// The only user fields that ever leave the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub nome: String,
    pub email: String,
    pub role: UserRole,
}

/// One-time code used for passwordless login.
#[derive(Debug, Clone)]
pub struct AuthCode {
    pub id: Uuid,
    pub email: String,
    pub code: String,
    pub used: bool,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AuthCode {
    /// Unused and not yet expired.
    pub fn is_outstanding(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.expires_at > now
    }
}

/// Opaque server-side session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Session lookup key for deletion.
#[derive(Debug, Clone, Copy)]
pub enum SessionKey<'a> {
    Id(Uuid),
    Token(&'a str),
}

/// Identity asserted by a verified third-party token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: Uuid,
    pub email: Option<String>,
    pub role: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub audience: Vec<String>,
}

/// Which credential produced a [`SessionInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    Opaque,
    External,
}

/// Normalized result of session resolution, whatever the token kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Row id for opaque sessions; `None` for third-party tokens.
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
    #[serde(serialize_with = "opt_to_rfc3339_ms")]
    pub last_activity: Option<DateTime<Utc>>,
    pub user: PublicUser,
    pub effective_owner_id: Uuid,
    pub source: SessionSource,
    /// `false` when a valid third-party identity has no local profile yet.
    /// Such a session carries an empty name and the default role; callers must
    /// provision the profile before trusting role or owner scope.
    pub provisioned: bool,
}

/// Outbound email handed to the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Auth code length in characters.
pub const AUTHCODE_LEN: usize = 6;

/// Auth code time-to-live in minutes.
pub const AUTHCODE_TTL_MINUTES: i64 = 10;

/// Failed checks after which an outstanding code is burned.
pub const MAX_CODE_ATTEMPTS: i32 = 5;

/// Opaque session lifetime in days.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Opaque session token length in hex characters (32 random bytes).
pub const SESSION_TOKEN_LEN: usize = 64;
