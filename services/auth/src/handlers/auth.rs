use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use financehub_auth_types::bearer::BearerToken;
use financehub_core::serde::to_rfc3339_ms;
use financehub_domain::email::{is_valid_email, normalize_email};

use crate::domain::types::{AUTHCODE_LEN, PublicUser, SessionInfo};
use crate::error::AuthServiceError;
use crate::state::AppState;
use crate::usecase::authcode::{SendAuthCodeInput, SendAuthCodeUseCase};
use crate::usecase::profile::{
    ConfirmUserByEmailUseCase, RegisterInput, RegisterWithPasswordUseCase, SyncProfileInput,
    SyncProfileUseCase,
};
use crate::usecase::session::{LogoutUseCase, ResolveSessionUseCase};
use crate::usecase::verify::{VerifyCodeInput, VerifyCodeUseCase};

/// Header carrying the shared secret for `POST /api/auth/confirm-user`.
pub const X_CONFIRM_SECRET: &str = "x-confirm-secret";

const PASSWORD_MIN_LEN: usize = 6;

fn require_email(raw: &str) -> Result<String, AuthServiceError> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(AuthServiceError::Validation("invalid email".to_owned()));
    }
    Ok(email)
}

fn require_code(raw: &str) -> Result<&str, AuthServiceError> {
    let code = raw.trim();
    if code.len() != AUTHCODE_LEN || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AuthServiceError::Validation(format!(
            "code must be {AUTHCODE_LEN} digits"
        )));
    }
    Ok(code)
}

// ── POST /api/auth/send-code ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeResponse {
    pub message: &'static str,
    /// Seconds until the code expires.
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

pub async fn send_code(
    State(state): State<AppState>,
    Json(body): Json<SendCodeRequest>,
) -> Result<Json<SendCodeResponse>, AuthServiceError> {
    let email = require_email(&body.email)?;

    let usecase = SendAuthCodeUseCase {
        users: state.user_repo(),
        auth_codes: state.auth_code_repo(),
        mailer: state.mailer(),
        production: state.production,
    };
    let output = usecase.execute(SendAuthCodeInput { email }).await?;

    Ok(Json(SendCodeResponse {
        message: "code sent",
        expires_in: (output.expires_at - Utc::now()).num_seconds().max(0),
        code: output.code,
    }))
}

// ── POST /api/auth/verify-code ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCodeResponse {
    pub token: String,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
    pub user: PublicUser,
}

pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, AuthServiceError> {
    let email = require_email(&body.email)?;
    let code = require_code(&body.code)?.to_owned();

    let usecase = VerifyCodeUseCase {
        users: state.user_repo(),
        auth_codes: state.auth_code_repo(),
        sessions: state.session_repo(),
    };
    let output = usecase.execute(VerifyCodeInput { email, code }).await?;

    Ok(Json(VerifyCodeResponse {
        token: output.token,
        expires_at: output.expires_at,
        user: output.user,
    }))
}

// ── GET /api/auth/validate ────────────────────────────────────────────────────

pub async fn validate_session(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<Json<SessionInfo>, AuthServiceError> {
    let usecase = ResolveSessionUseCase {
        users: state.user_repo(),
        sessions: state.session_repo(),
        validator: state.token_validator(),
    };
    let info = usecase.execute(token.as_str()).await?;
    Ok(Json(info))
}

// ── POST /api/auth/logout ─────────────────────────────────────────────────────

pub async fn logout(
    State(state): State<AppState>,
    token: BearerToken,
) -> Result<StatusCode, AuthServiceError> {
    let usecase = LogoutUseCase {
        sessions: state.session_repo(),
    };
    usecase.execute(token.as_str()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /api/auth/register ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub nome: String,
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let email = require_email(&body.email)?;
    if body.nome.trim().is_empty() {
        return Err(AuthServiceError::Validation("nome is required".to_owned()));
    }
    if body.password.chars().count() < PASSWORD_MIN_LEN {
        return Err(AuthServiceError::Validation(format!(
            "password must have at least {PASSWORD_MIN_LEN} characters"
        )));
    }

    let usecase = RegisterWithPasswordUseCase {
        users: state.user_repo(),
        identity_provider: state.identity_provider()?,
    };
    let user = usecase
        .execute(RegisterInput {
            nome: body.nome,
            email,
            password: body.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(user.public())))
}

// ── POST /api/auth/sync-profile ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SyncProfileRequest {
    pub nome: Option<String>,
}

/// Provision or refresh the caller's profile from a third-party token. Subject
/// and email come from the verified token; role is never taken from the caller.
pub async fn sync_profile(
    State(state): State<AppState>,
    token: BearerToken,
    body: Option<Json<SyncProfileRequest>>,
) -> Result<Json<PublicUser>, AuthServiceError> {
    let identity = state
        .token_validator()
        .validate(token.as_str())
        .await
        .ok_or(AuthServiceError::Unauthorized)?;
    let email = identity
        .email
        .ok_or_else(|| AuthServiceError::Validation("token carries no email".to_owned()))?;
    let nome = body.and_then(|Json(b)| b.nome);

    let usecase = SyncProfileUseCase {
        users: state.user_repo(),
    };
    let user = usecase
        .execute(SyncProfileInput {
            subject: identity.subject,
            email,
            nome,
            role: None,
        })
        .await?;

    Ok(Json(user.public()))
}

// ── POST /api/auth/confirm-user ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ConfirmUserRequest {
    pub email: String,
}

/// With a configured secret the header must match; without one the endpoint is
/// open outside production and disabled in production.
fn check_confirm_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AuthServiceError> {
    match state.confirm_user_secret.as_deref() {
        Some(expected) => {
            let supplied = headers
                .get(X_CONFIRM_SECRET)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if supplied != expected {
                return Err(AuthServiceError::Unauthorized);
            }
            Ok(())
        }
        None if state.production => Err(AuthServiceError::NotConfigured("confirm user secret")),
        None => Ok(()),
    }
}

pub async fn confirm_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ConfirmUserRequest>,
) -> Result<Json<PublicUser>, AuthServiceError> {
    check_confirm_secret(&state, &headers)?;
    let email = require_email(&body.email)?;

    let usecase = ConfirmUserByEmailUseCase {
        users: state.user_repo(),
        identity_provider: state.identity_provider()?,
    };
    let user = usecase.execute(&email).await?;
    Ok(Json(user))
}
