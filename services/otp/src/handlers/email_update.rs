use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use storefront_auth_types::identity::IdentityHeaders;

use crate::error::OtpServiceError;
use crate::handlers::IssuedResponse;
use crate::state::AppState;
use crate::usecase::email_update::{
    ConfirmEmailUpdateInput, ConfirmEmailUpdateUseCase, RequestEmailUpdateCodeInput,
    RequestEmailUpdateCodeUseCase,
};

// ── POST /accounts/@me/email/code ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestEmailUpdateCodeRequest {
    pub email: String,
}

pub async fn request_email_update_code(
    State(state): State<AppState>,
    identity: IdentityHeaders,
    Json(body): Json<RequestEmailUpdateCodeRequest>,
) -> Result<impl IntoResponse, OtpServiceError> {
    let usecase = RequestEmailUpdateCodeUseCase {
        accounts: state.account_repo(),
        flow: state.flow(),
    };
    let issued = usecase
        .execute(RequestEmailUpdateCodeInput {
            account_id: identity.account_id,
            new_email: body.email,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(IssuedResponse::from(issued))))
}

// ── PATCH /accounts/@me/email ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ConfirmEmailUpdateRequest {
    pub email: String,
    pub code: String,
    pub token: String,
}

pub async fn confirm_email_update(
    State(state): State<AppState>,
    identity: IdentityHeaders,
    Json(body): Json<ConfirmEmailUpdateRequest>,
) -> Result<StatusCode, OtpServiceError> {
    let usecase = ConfirmEmailUpdateUseCase {
        accounts: state.account_repo(),
        flow: state.flow(),
    };
    usecase
        .execute(ConfirmEmailUpdateInput {
            account_id: identity.account_id,
            new_email: body.email,
            code: body.code,
            token: body.token,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
