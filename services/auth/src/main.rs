use sea_orm::Database;
use tracing::info;

use financehub_auth::config::AuthConfig;
use financehub_auth::infra::idp::HttpIdentityProvider;
use financehub_auth::infra::jwks::{HttpKeySetFetcher, JWKS_CACHE_TTL};
use financehub_auth::router::build_router;
use financehub_auth::state::AppState;
use financehub_auth::usecase::external_token::ExternalTokenValidator;
use financehub_core::tracing::init_tracing;

#[tokio::main]
async fn main() {
    init_tracing("info,sqlx=warn,tower_http=info");

    let config = AuthConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let keys = HttpKeySetFetcher::new(JWKS_CACHE_TTL).expect("failed to build key set client");

    let identity_provider = match (
        config.identity_provider_url.as_deref(),
        config.identity_provider_service_key.as_deref(),
    ) {
        (Some(url), Some(key)) => Some(
            HttpIdentityProvider::new(url, key).expect("failed to build identity provider client"),
        ),
        _ => {
            info!("identity provider not configured; registration and confirmation disabled");
            None
        }
    };

    if config.external_jwt_secret.is_none() {
        info!("EXTERNAL_JWT_SECRET unset; HS256 third-party tokens will be rejected");
    }

    let state = AppState {
        db,
        production: config.production,
        validator: ExternalTokenValidator {
            secret: config.external_jwt_secret,
            audience: config.external_jwt_audience,
            trusted_issuers: config.trusted_issuers,
            keys,
        },
        mail_from: config.mail_from,
        identity_provider,
        confirm_user_secret: config.confirm_user_secret,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!(production = config.production, "auth service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
