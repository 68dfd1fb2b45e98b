use std::time::Duration;

use anyhow::{Context as _, anyhow};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use financehub_domain::user::UserRole;

use crate::domain::repository::IdentityProviderPort;
use crate::error::AuthServiceError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the identity provider's admin user API, authenticated with the
/// service key.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

#[derive(Deserialize)]
struct CreatedUser {
    id: Uuid,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, service_key: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build identity provider http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            service_key: service_key.to_owned(),
        })
    }

    fn admin_users_url(&self) -> String {
        format!("{}/auth/v1/admin/users", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

impl IdentityProviderPort for HttpIdentityProvider {
    async fn create_confirmed_user(
        &self,
        email: &str,
        password: &str,
        nome: &str,
        role: UserRole,
    ) -> Result<Uuid, AuthServiceError> {
        let response = self
            .authorized(self.client.post(self.admin_users_url()))
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
                "user_metadata": { "nome": nome, "role": role.as_str() },
            }))
            .send()
            .await
            .context("identity provider: create user")?;

        let status = response.status();
        if status.is_success() {
            let created: CreatedUser = response
                .json()
                .await
                .context("identity provider: decode created user")?;
            return Ok(created.id);
        }

        let body = response.text().await.unwrap_or_default();
        let error = ProviderError::parse(&body);
        if error.is_duplicate_email() {
            return Err(AuthServiceError::EmailAlreadyRegistered);
        }
        if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY) {
            return Err(AuthServiceError::Validation(error.message()));
        }
        Err(anyhow!("identity provider: create user returned {status}: {body}").into())
    }

    async fn confirm_email(&self, subject: Uuid) -> Result<(), AuthServiceError> {
        let response = self
            .authorized(
                self.client
                    .put(format!("{}/{subject}", self.admin_users_url())),
            )
            .json(&json!({ "email_confirm": true }))
            .send()
            .await
            .context("identity provider: confirm email")?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(AuthServiceError::UserNotFound),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(anyhow!("identity provider: confirm email returned {s}: {body}").into())
            }
        }
    }
}

/// `error_code` values the provider uses for an email that already has an account.
const DUPLICATE_EMAIL_CODES: &[&str] = &["email_exists", "user_already_exists"];

/// Error body of the admin API.
#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    error_code: Option<String>,
    #[serde(alias = "message", alias = "error_description")]
    msg: Option<String>,
}

impl ProviderError {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn is_duplicate_email(&self) -> bool {
        self.error_code
            .as_deref()
            .is_some_and(|code| DUPLICATE_EMAIL_CODES.contains(&code))
    }

    fn message(self) -> String {
        self.msg
            .unwrap_or_else(|| "registration rejected by identity provider".to_owned())
    }
}
