use axum::extract::FromRef;
use sea_orm::DatabaseConnection;

use crate::error::AuthServiceError;
use crate::infra::db::{DbAuthCodeRepository, DbPendingEmailMailer, DbSessionRepository, DbUserRepository};
use crate::infra::idp::HttpIdentityProvider;
use crate::infra::jwks::HttpKeySetFetcher;
use crate::usecase::external_token::ExternalTokenValidator;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    /// Issued codes are never returned or logged when set.
    pub production: bool,
    pub validator: ExternalTokenValidator<HttpKeySetFetcher>,
    pub mail_from: String,
    /// `None` disables registration and email confirmation.
    pub identity_provider: Option<HttpIdentityProvider>,
    pub confirm_user_secret: Option<String>,
}

impl AppState {
    pub fn user_repo(&self) -> DbUserRepository {
        DbUserRepository {
            db: self.db.clone(),
        }
    }

    pub fn auth_code_repo(&self) -> DbAuthCodeRepository {
        DbAuthCodeRepository {
            db: self.db.clone(),
        }
    }

    pub fn session_repo(&self) -> DbSessionRepository {
        DbSessionRepository {
            db: self.db.clone(),
        }
    }

    pub fn mailer(&self) -> DbPendingEmailMailer {
        DbPendingEmailMailer {
            db: self.db.clone(),
            from: self.mail_from.clone(),
        }
    }

    pub fn token_validator(&self) -> ExternalTokenValidator<HttpKeySetFetcher> {
        self.validator.clone()
    }

    pub fn identity_provider(&self) -> Result<HttpIdentityProvider, AuthServiceError> {
        self.identity_provider
            .clone()
            .ok_or(AuthServiceError::NotConfigured("identity provider"))
    }
}

impl FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
