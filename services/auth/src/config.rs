/// Auth service configuration loaded from environment variables.
#[derive(Debug)]
pub struct AuthConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on (default 3001). Env var: `AUTH_PORT`.
    pub auth_port: u16,
    /// False only for `APP_ENV=development`. Issued codes never leave the mail
    /// channel when set.
    pub production: bool,
    /// HS256 secret for third-party tokens. Env var: `EXTERNAL_JWT_SECRET`.
    pub external_jwt_secret: Option<String>,
    /// Expected `aud` of third-party tokens. Env var: `EXTERNAL_JWT_AUDIENCE`.
    pub external_jwt_audience: Option<String>,
    /// Issuers whose published key sets may be fetched. Env var: `TRUSTED_ISSUERS`
    /// (comma-separated).
    pub trusted_issuers: Vec<String>,
    /// Identity-provider base URL (e.g. "https://idp.example.com").
    pub identity_provider_url: Option<String>,
    /// Service key for the identity-provider admin API.
    pub identity_provider_service_key: Option<String>,
    /// Shared secret guarding `POST /api/auth/confirm-user`.
    pub confirm_user_secret: Option<String>,
    /// Sender address for outgoing mail (default "noreply@financehub.com").
    pub mail_from: String,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            auth_port: std::env::var("AUTH_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3001),
            production: is_production(std::env::var("APP_ENV").ok().as_deref()),
            external_jwt_secret: non_empty_var("EXTERNAL_JWT_SECRET"),
            external_jwt_audience: non_empty_var("EXTERNAL_JWT_AUDIENCE"),
            trusted_issuers: non_empty_var("TRUSTED_ISSUERS")
                .map(|v| parse_issuers(&v))
                .unwrap_or_default(),
            identity_provider_url: non_empty_var("IDENTITY_PROVIDER_URL"),
            identity_provider_service_key: non_empty_var("IDENTITY_PROVIDER_SERVICE_KEY"),
            confirm_user_secret: non_empty_var("CONFIRM_USER_SECRET"),
            mail_from: non_empty_var("MAIL_FROM")
                .unwrap_or_else(|| "noreply@financehub.com".to_owned()),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Anything other than an explicit development environment, unset included.
fn is_production(app_env: Option<&str>) -> bool {
    !app_env.is_some_and(|v| v.trim().eq_ignore_ascii_case("development"))
}

/// Split a comma list, trimming whitespace and trailing slashes.
fn parse_issuers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
