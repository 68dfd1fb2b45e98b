use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use financehub_domain::email::normalize_email;

use crate::domain::repository::{AuthCodeRepository, SessionRepository, UserRepository};
use crate::domain::types::{MAX_CODE_ATTEMPTS, PublicUser, SESSION_TTL_DAYS, Session};
use crate::error::AuthServiceError;
use crate::usecase::code::generate_token;

pub struct VerifyCodeInput {
    pub email: String,
    pub code: String,
}

#[derive(Debug)]
pub struct VerifyCodeOutput {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: PublicUser,
}

pub struct VerifyCodeUseCase<U, A, S>
where
    U: UserRepository,
    A: AuthCodeRepository,
    S: SessionRepository,
{
    pub users: U,
    pub auth_codes: A,
    pub sessions: S,
}

impl<U, A, S> VerifyCodeUseCase<U, A, S>
where
    U: UserRepository,
    A: AuthCodeRepository,
    S: SessionRepository,
{
    pub async fn execute(&self, input: VerifyCodeInput) -> Result<VerifyCodeOutput, AuthServiceError> {
        let email = normalize_email(&input.email);
        let supplied = input.code.trim();

        // 1. Most recent matching, unused, unexpired code
        let Some(code) = self.auth_codes.find_latest_valid(&email, supplied).await? else {
            // 2. Penalty applies to every outstanding code for the email
            let penalized = self.auth_codes.increment_attempts(&email).await?;
            warn!(penalized, "auth code mismatch");
            return Err(AuthServiceError::InvalidOrExpiredCode);
        };

        // 3. Burn codes that already hit the attempt ceiling
        if code.attempts >= MAX_CODE_ATTEMPTS {
            self.auth_codes.consume(code.id).await?;
            return Err(AuthServiceError::TooManyAttempts);
        }

        // 4. The user may have been deactivated since issuance
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .filter(|u| u.ativo)
            .ok_or(AuthServiceError::UserNotFoundOrInactive)?;

        // 5. Consume, open a session, record the login. Losing the consume
        //    race means a concurrent verify already redeemed this code.
        if !self.auth_codes.consume(code.id).await? {
            warn!(code_id = %code.id, "auth code already consumed");
            return Err(AuthServiceError::InvalidOrExpiredCode);
        }

        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id: user.id,
            token: generate_token(),
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
            last_activity: now,
            created_at: now,
        };
        self.sessions.insert(&session).await?;
        self.users.touch_last_login(user.id).await?;
        info!(user_id = %user.id, session_id = %session.id, "session created");

        Ok(VerifyCodeOutput {
            token: session.token,
            expires_at: session.expires_at,
            user: user.public(),
        })
    }
}
