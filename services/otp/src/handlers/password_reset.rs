use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use storefront_auth_types::cookie::{clear_otp_token_cookie, set_otp_token_cookie};

use crate::domain::types::Purpose;
use crate::error::OtpServiceError;
use crate::handlers::{ContinuationResponse, IssuedResponse, resolve_token};
use crate::state::AppState;
use crate::usecase::password_reset::{
    CompletePasswordResetInput, CompletePasswordResetUseCase, RequestPasswordResetCodeUseCase,
    VerifyPasswordResetCodeInput, VerifyPasswordResetCodeUseCase,
};

const COOKIE_PATH: &str = "/auth/password-reset";

// ── POST /auth/password-reset/code ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestPasswordResetCodeRequest {
    pub email: String,
}

pub async fn request_password_reset_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RequestPasswordResetCodeRequest>,
) -> Result<impl IntoResponse, OtpServiceError> {
    let usecase = RequestPasswordResetCodeUseCase {
        accounts: state.account_repo(),
        flow: state.flow(),
    };
    let issued = usecase.execute(&body.email).await?;

    let max_age = state.settings.code_ttl(Purpose::PasswordReset).num_seconds();
    let jar = set_otp_token_cookie(
        jar,
        issued.token.clone(),
        state.cookie_domain.clone(),
        COOKIE_PATH,
        max_age,
    );
    Ok((StatusCode::CREATED, jar, Json(IssuedResponse::from(issued))))
}

// ── POST /auth/password-reset/verification ────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyPasswordResetCodeRequest {
    pub email: String,
    pub code: String,
    pub token: Option<String>,
}

pub async fn verify_password_reset_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<VerifyPasswordResetCodeRequest>,
) -> Result<impl IntoResponse, OtpServiceError> {
    let token = resolve_token(body.token, &jar)?;
    let usecase = VerifyPasswordResetCodeUseCase { flow: state.flow() };
    let continuation = usecase
        .execute(VerifyPasswordResetCodeInput {
            email: body.email,
            code: body.code,
            token,
        })
        .await?;

    let max_age = state.settings.password_reset_continuation_ttl.num_seconds();
    let jar = set_otp_token_cookie(
        jar,
        continuation.token.clone(),
        state.cookie_domain.clone(),
        COOKIE_PATH,
        max_age,
    );
    Ok((
        StatusCode::OK,
        jar,
        Json(ContinuationResponse::from(continuation)),
    ))
}

// ── PATCH /auth/password-reset ────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CompletePasswordResetRequest {
    pub email: String,
    pub token: Option<String>,
    pub new_password: String,
}

pub async fn complete_password_reset(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<CompletePasswordResetRequest>,
) -> Result<impl IntoResponse, OtpServiceError> {
    let token = resolve_token(body.token, &jar)?;
    let usecase = CompletePasswordResetUseCase {
        accounts: state.account_repo(),
        flow: state.flow(),
    };
    usecase
        .execute(CompletePasswordResetInput {
            email: body.email,
            token,
            new_password: body.new_password,
        })
        .await?;

    let jar = clear_otp_token_cookie(jar, state.cookie_domain.clone(), COOKIE_PATH);
    Ok((StatusCode::NO_CONTENT, jar))
}
