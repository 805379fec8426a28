use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_auth_types::cookie::{clear_otp_token_cookie, set_otp_token_cookie};
use storefront_core::serde::to_rfc3339_ms;

use crate::domain::types::Purpose;
use crate::error::OtpServiceError;
use crate::handlers::{IssuedResponse, resolve_token};
use crate::state::AppState;
use crate::usecase::registration::{
    CompleteRegistrationInput, CompleteRegistrationUseCase, RequestRegistrationCodeUseCase,
};

const COOKIE_PATH: &str = "/auth/registration";

// ── POST /auth/registration/code ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RequestRegistrationCodeRequest {
    pub email: String,
}

pub async fn request_registration_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RequestRegistrationCodeRequest>,
) -> Result<impl IntoResponse, OtpServiceError> {
    let usecase = RequestRegistrationCodeUseCase {
        accounts: state.account_repo(),
        flow: state.flow(),
    };
    let issued = usecase.execute(&body.email).await?;

    let max_age = state.settings.code_ttl(Purpose::Registration).num_seconds();
    let jar = set_otp_token_cookie(
        jar,
        issued.token.clone(),
        state.cookie_domain.clone(),
        COOKIE_PATH,
        max_age,
    );
    Ok((StatusCode::CREATED, jar, Json(IssuedResponse::from(issued))))
}

// ── POST /auth/registration ───────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CompleteRegistrationRequest {
    pub email: String,
    pub code: String,
    pub token: Option<String>,
    pub name: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

pub async fn complete_registration(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<CompleteRegistrationRequest>,
) -> Result<impl IntoResponse, OtpServiceError> {
    let token = resolve_token(body.token, &jar)?;
    let usecase = CompleteRegistrationUseCase {
        accounts: state.account_repo(),
        flow: state.flow(),
    };
    let account = usecase
        .execute(CompleteRegistrationInput {
            email: body.email,
            code: body.code,
            token,
            name: body.name,
            password: body.password,
        })
        .await?;

    let jar = clear_otp_token_cookie(jar, state.cookie_domain.clone(), COOKIE_PATH);
    let body = AccountResponse {
        id: account.id,
        email: account.email,
        name: account.name,
        created_at: account.created_at,
    };
    Ok((StatusCode::CREATED, jar, Json(body)))
}
