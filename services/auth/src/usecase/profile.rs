use anyhow::anyhow;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use financehub_domain::email::normalize_email;
use financehub_domain::user::UserRole;

use crate::domain::repository::{IdentityProviderPort, UserRepository};
use crate::domain::types::{PublicUser, User};
use crate::error::AuthServiceError;

/// Lookup/insert rounds before giving up on a contended profile.
const SYNC_ROUNDS: usize = 3;

pub struct SyncProfileInput {
    pub subject: Uuid,
    pub email: String,
    /// Keeps the stored name when `None`; new profiles default to the email's
    /// local part.
    pub nome: Option<String>,
    /// Keeps the stored role when `None`; new profiles default to `usuario`.
    pub role: Option<UserRole>,
}

/// Upsert order is id, then email, then insert. A conflicting insert from a
/// concurrent first login falls back to the lookups instead of failing.
async fn sync_profile<U: UserRepository>(
    users: &U,
    input: &SyncProfileInput,
) -> Result<User, AuthServiceError> {
    let email = normalize_email(&input.email);
    let nome = input
        .nome
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    for _ in 0..SYNC_ROUNDS {
        if let Some(user) = users.find_by_id(input.subject).await? {
            return update(users, &user, nome, input.role).await;
        }

        if let Some(user) = users.find_by_email(&email).await? {
            info!(
                subject = %input.subject,
                user_id = %user.id,
                "profile reconciled by email"
            );
            return update(users, &user, nome, input.role).await;
        }

        let now = Utc::now();
        let user = User {
            id: input.subject,
            nome: nome
                .map(str::to_owned)
                .unwrap_or_else(|| default_name(&email)),
            email: email.clone(),
            role: input.role.unwrap_or_default(),
            ativo: true,
            gerente_id: None,
            ultimo_login: None,
            created_at: now,
            updated_at: now,
        };
        if users.insert_if_absent(&user).await? {
            info!(user_id = %user.id, "profile created");
            return Ok(user);
        }
        warn!(subject = %input.subject, "profile insert lost a race, retrying lookups");
    }

    Err(AuthServiceError::Storage(anyhow!(
        "profile sync for {} did not converge",
        input.subject
    )))
}

async fn update<U: UserRepository>(
    users: &U,
    current: &User,
    nome: Option<&str>,
    role: Option<UserRole>,
) -> Result<User, AuthServiceError> {
    users
        .update_profile(
            current.id,
            nome.unwrap_or(current.nome.as_str()),
            role.unwrap_or(current.role),
        )
        .await
}

fn default_name(email: &str) -> String {
    email.split('@').next().unwrap_or_default().to_owned()
}

// ── SyncProfile ───────────────────────────────────────────────────────────────

pub struct SyncProfileUseCase<U: UserRepository> {
    pub users: U,
}

impl<U: UserRepository> SyncProfileUseCase<U> {
    pub async fn execute(&self, input: SyncProfileInput) -> Result<User, AuthServiceError> {
        sync_profile(&self.users, &input).await
    }
}

// ── RegisterWithPassword ──────────────────────────────────────────────────────

pub struct RegisterInput {
    pub nome: String,
    pub email: String,
    pub password: String,
}

pub struct RegisterWithPasswordUseCase<U, P>
where
    U: UserRepository,
    P: IdentityProviderPort,
{
    pub users: U,
    pub identity_provider: P,
}

impl<U, P> RegisterWithPasswordUseCase<U, P>
where
    U: UserRepository,
    P: IdentityProviderPort,
{
    pub async fn execute(&self, input: RegisterInput) -> Result<User, AuthServiceError> {
        let email = normalize_email(&input.email);

        // Self-registration never grants more than the default role.
        let subject = self
            .identity_provider
            .create_confirmed_user(&email, &input.password, input.nome.trim(), UserRole::Usuario)
            .await?;
        info!(subject = %subject, "identity registered");

        sync_profile(
            &self.users,
            &SyncProfileInput {
                subject,
                email,
                nome: Some(input.nome),
                role: Some(UserRole::Usuario),
            },
        )
        .await
    }
}

// ── ConfirmUserByEmail ────────────────────────────────────────────────────────

pub struct ConfirmUserByEmailUseCase<U, P>
where
    U: UserRepository,
    P: IdentityProviderPort,
{
    pub users: U,
    pub identity_provider: P,
}

impl<U, P> ConfirmUserByEmailUseCase<U, P>
where
    U: UserRepository,
    P: IdentityProviderPort,
{
    pub async fn execute(&self, email: &str) -> Result<PublicUser, AuthServiceError> {
        let email = normalize_email(email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;

        self.identity_provider.confirm_email(user.id).await?;
        info!(user_id = %user.id, "identity email confirmed");
        Ok(user.public())
    }
}
