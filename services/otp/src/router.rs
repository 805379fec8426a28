use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

use storefront_core::health::healthz;
use storefront_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    email_update::{confirm_email_update, request_email_update_code},
    health::readyz,
    password_reset::{
        complete_password_reset, request_password_reset_code, verify_password_reset_code,
    },
    registration::{complete_registration, request_registration_code},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Registration
        .route("/auth/registration/code", post(request_registration_code))
        .route("/auth/registration", post(complete_registration))
        // Password reset
        .route(
            "/auth/password-reset/code",
            post(request_password_reset_code),
        )
        .route(
            "/auth/password-reset/verification",
            post(verify_password_reset_code),
        )
        .route("/auth/password-reset", patch(complete_password_reset))
        // Email update
        .route("/accounts/@me/email/code", post(request_email_update_code))
        .route("/accounts/@me/email", patch(confirm_email_update))
        .layer(propagate_request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
