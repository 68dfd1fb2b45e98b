use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use financehub_domain::email::normalize_email;

use crate::domain::email::auth_code_email;
use crate::domain::repository::{AuthCodeRepository, Mailer, UserRepository};
use crate::domain::types::{AUTHCODE_TTL_MINUTES, AuthCode};
use crate::error::AuthServiceError;
use crate::usecase::code::generate_code;

pub struct SendAuthCodeInput {
    pub email: String,
}

#[derive(Debug)]
pub struct SendAuthCodeOutput {
    /// The issued code. Always `None` in production.
    pub code: Option<String>,
    pub expires_at: DateTime<Utc>,
}

pub struct SendAuthCodeUseCase<U, A, M>
where
    U: UserRepository,
    A: AuthCodeRepository,
    M: Mailer,
{
    pub users: U,
    pub auth_codes: A,
    pub mailer: M,
    pub production: bool,
}

impl<U, A, M> SendAuthCodeUseCase<U, A, M>
where
    U: UserRepository,
    A: AuthCodeRepository,
    M: Mailer,
{
    pub async fn execute(
        &self,
        input: SendAuthCodeInput,
    ) -> Result<SendAuthCodeOutput, AuthServiceError> {
        let email = normalize_email(&input.email);

        // 1. Existing, active user only; no code row otherwise
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AuthServiceError::UserNotFound)?;
        if !user.ativo {
            return Err(AuthServiceError::UserInactive);
        }

        // 2. At most one live code per email
        let invalidated = self.auth_codes.invalidate_outstanding(&email).await?;

        // 3. New code
        let now = Utc::now();
        let code = AuthCode {
            id: Uuid::new_v4(),
            email: email.clone(),
            code: generate_code(),
            used: false,
            attempts: 0,
            expires_at: now + Duration::minutes(AUTHCODE_TTL_MINUTES),
            created_at: now,
        };
        self.auth_codes.insert(&code).await?;
        info!(user_id = %user.id, invalidated, "auth code issued");

        // 4. Best-effort delivery; the code stays valid if this fails
        if let Err(e) = self.mailer.send(&auth_code_email(&email, &code.code)).await {
            warn!(user_id = %user.id, error = %e, "auth code email delivery failed");
        }

        if self.production {
            return Ok(SendAuthCodeOutput {
                code: None,
                expires_at: code.expires_at,
            });
        }
        info!(email = %email, code = %code.code, "auth code (non-production)");
        Ok(SendAuthCodeOutput {
            code: Some(code.code),
            expires_at: code.expires_at,
        })
    }
}
