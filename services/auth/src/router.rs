use axum::{
    Router,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use financehub_core::health::{healthz, readyz};
use financehub_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::auth::{
    confirm_user, logout, register, send_code, sync_profile, validate_session, verify_code,
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let auth = Router::new()
        // One-time code login
        .route("/send-code", post(send_code))
        .route("/verify-code", post(verify_code))
        // Session
        .route("/validate", get(validate_session))
        .route("/logout", post(logout))
        // Identity provider accounts
        .route("/register", post(register))
        .route("/sync-profile", post(sync_profile))
        .route("/confirm-user", post(confirm_user));

    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .nest("/api/auth", auth)
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
