use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tracing::instrument;

use crate::{
    accounts::{
        dto::{
            LoginRequest, ModifyAccountRequest, PublicUser, RegisterRequest, ResetPasswordRequest,
            ServiceResult,
        },
        error::AccountError,
    },
    state::AppState,
};

type ApiResponse = (StatusCode, Json<ServiceResult>);

fn failure(err: AccountError) -> ApiResponse {
    (err.status(), Json(ServiceResult::from(&err)))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/confirm-email/:token", get(confirm_email))
        .route("/login", post(login))
        .route("/reset-password", post(request_password_reset))
        .route("/reset-password/:token", get(reset_password_from_link))
        .route("/account", put(modify_account))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse, ApiResponse> {
    let registration = state
        .accounts
        .register(payload.into())
        .await
        .map_err(failure)?;

    let result = match &registration.delivery_error {
        None => ServiceResult::ok("registration successful, check your inbox to confirm your email"),
        Some(warning) => ServiceResult::ok_with_warning(warning),
    }
    .with_details(json!({ "id": registration.user.id }));

    Ok((StatusCode::CREATED, Json(result)))
}

#[instrument(skip_all)]
pub async fn confirm_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<ApiResponse, ApiResponse> {
    state.accounts.confirm_email(&token).await.map_err(failure)?;
    Ok((StatusCode::OK, Json(ServiceResult::ok("email confirmed"))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse, ApiResponse> {
    let user = state
        .accounts
        .login(&payload.email, &payload.password)
        .await
        .map_err(failure)?;
    let result = ServiceResult::ok("login successful").with_details(PublicUser::from(&user));
    Ok((StatusCode::OK, Json(result)))
}

#[instrument(skip(state, payload))]
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<ApiResponse, ApiResponse> {
    state
        .accounts
        .request_password_reset(&payload.email)
        .await
        .map_err(failure)?;
    Ok((
        StatusCode::OK,
        Json(ServiceResult::ok("password reset email sent")),
    ))
}

#[instrument(skip_all)]
pub async fn reset_password_from_link(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<ApiResponse, ApiResponse> {
    state
        .accounts
        .complete_password_reset(&token)
        .await
        .map_err(failure)?;
    Ok((
        StatusCode::OK,
        Json(ServiceResult::ok("a new password has been sent by email")),
    ))
}

/// The account is looked up by email and authenticated by its current
/// password inside `modify_account`; an unknown email gets the same answer
/// as a wrong password.
#[instrument(skip(state, payload))]
pub async fn modify_account(
    State(state): State<AppState>,
    Json(payload): Json<ModifyAccountRequest>,
) -> Result<ApiResponse, ApiResponse> {
    let (email, changes) = payload.into_changes();
    let user = state
        .accounts
        .find_user_by_email(&email)
        .await
        .map_err(failure)?
        .ok_or_else(|| failure(AccountError::InvalidCurrentPassword))?;

    let outcome = state
        .accounts
        .modify_account(&user, changes)
        .await
        .map_err(failure)?;

    let message = if outcome.changed {
        "account updated"
    } else {
        "nothing to update"
    };
    let result = ServiceResult::ok(message).with_details(PublicUser::from(&outcome.user));
    Ok((StatusCode::OK, Json(result)))
}
