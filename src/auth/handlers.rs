use std::collections::BTreeMap;

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, JwtKeys, LoginRequest, PasswordResetConfirm, PasswordResetRequest,
            PublicUser, RefreshRequest, RegisterRequest, ResendCodeRequest, VerifyCodeRequest,
        },
        repo::User,
        services::{hash_password, is_valid_email, normalize_email, verify_password},
    },
    error::ApiError,
    state::AppState,
    users::repo::Profile,
    verification::generate_verification_code,
};

pub fn signup_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-code", post(verify_code))
        .route("/resend-code", post(resend_code))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn password_reset_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/password-reset/request", post(request_password_reset))
        .route("/auth/password-reset/confirm", post(confirm_password_reset))
}

/// Generate a fresh one-time code, store it as the user's outstanding token
/// (overwriting any prior one) and dispatch it. Single slot per user: a code
/// issued for one purpose clobbers a pending code for another.
pub(crate) async fn issue_code(
    state: &AppState,
    user_id: i64,
    to: &str,
    subject: &str,
) -> anyhow::Result<String> {
    let code = generate_verification_code(&mut rand::thread_rng());
    Profile::set_email_token(&state.db, user_id, &code).await?;
    state.mailer.send_code(to, subject, &code).await?;
    Ok(code)
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    payload.email = normalize_email(&payload.email);
    payload.username = payload.username.trim().to_string();

    let mut errors: BTreeMap<&'static str, String> = BTreeMap::new();
    if payload.first_name.trim().is_empty() {
        errors.insert("first_name", "This field is required.".into());
    }
    if payload.last_name.trim().is_empty() {
        errors.insert("last_name", "This field is required.".into());
    }
    if payload.username.is_empty() {
        errors.insert("username", "This field is required.".into());
    }
    if !is_valid_email(&payload.email) {
        errors.insert("email", "Enter a valid email address.".into());
    }
    if payload.password.len() < 8 {
        errors.insert("password", "Password must be at least 8 characters.".into());
    }
    if payload.password != payload.password2 {
        errors.insert("password2", "Passwords do not match.".into());
    }
    if errors.is_empty() {
        if User::find_by_email(&state.db, &payload.email).await?.is_some() {
            errors.insert("email", "A user with this email already exists.".into());
        }
        if User::username_taken(&state.db, &payload.username).await? {
            errors.insert("username", "A user with this username already exists.".into());
        }
    }
    if !errors.is_empty() {
        warn!(email = %payload.email, "register validation failed");
        return Err(ApiError::Validation(errors));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        &payload.username,
        &payload.email,
        &hash,
        payload.first_name.trim(),
        payload.last_name.trim(),
    )
    .await?;

    issue_code(&state, user.id, &user.email, "Verify your Circld account").await?;

    info!(user_id = user.id, email = %user.email, "user registered, verification code sent");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "detail": "Verification code sent to your email." })),
    ))
}

#[instrument(skip(state, payload))]
async fn verify_code(
    State(state): State<AppState>,
    Json(payload): Json<VerifyCodeRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = normalize_email(&payload.email);
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::not_found("No account with this email."))?;

    let profile = Profile::get(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("No account with this email."))?;
    if profile.email_token.is_empty() || profile.email_token != payload.code {
        warn!(user_id = user.id, "invalid signup verification code");
        return Err(ApiError::bad_request("Invalid verification code."));
    }

    let mut tx = state.db.begin().await?;
    sqlx::query("UPDATE users SET is_active = 1 WHERE id = ?")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE profiles SET email_token = '' WHERE user_id = ?")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(user_id = user.id, "account verified");
    Ok(Json(json!({ "message": "Email verified. You can now log in." })))
}

#[instrument(skip(state, payload))]
async fn resend_code(
    State(state): State<AppState>,
    Json(payload): Json<ResendCodeRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = normalize_email(&payload.email);
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::not_found("No account with this email."))?;
    if user.is_active {
        return Err(ApiError::bad_request("Account already verified."));
    }

    issue_code(&state, user.id, &user.email, "Verify your Circld account").await?;
    Ok(Json(json!({ "message": "A new verification code has been sent." })))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let identifier = payload.username.trim();
    let user = User::find_by_username_or_email(&state.db, identifier)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("Invalid credentials.".into()))?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(ApiError::Unauthenticated("Invalid credentials.".into()));
    }
    if !user.is_active {
        warn!(user_id = user.id, "login on unverified account");
        return Err(ApiError::Unauthenticated("Account not verified.".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: user.id,
            username: user.username,
            email: user.email,
        },
    }))
}

#[instrument(skip(state, payload))]
async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| ApiError::Unauthenticated(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("User not found.".into()))?;

    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: user.id,
            username: user.username,
            email: user.email,
        },
    }))
}

#[instrument(skip(state, payload))]
async fn request_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = normalize_email(&payload.email);
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::bad_request("No account with this email."))?;

    issue_code(&state, user.id, &user.email, "Circld password reset code").await?;
    info!(user_id = user.id, "password reset code sent");
    Ok(Json(json!({ "message": "Password reset code sent to your email." })))
}

#[instrument(skip(state, payload))]
async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetConfirm>,
) -> Result<Json<Value>, ApiError> {
    let email = normalize_email(&payload.email);
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| ApiError::bad_request("No account with this email."))?;

    let mut errors: BTreeMap<&'static str, String> = BTreeMap::new();
    if payload.new_password.len() < 8 {
        errors.insert("new_password", "Password must be at least 8 characters.".into());
    }
    if payload.new_password != payload.new_password2 {
        errors.insert("new_password2", "Passwords do not match.".into());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let profile = Profile::get(&state.db, user.id)
        .await?
        .ok_or_else(|| ApiError::bad_request("No account with this email."))?;
    if profile.email_token.is_empty() || profile.email_token != payload.token {
        // A stale code gets replaced rather than leaving the user stuck.
        issue_code(&state, user.id, &user.email, "Circld password reset code").await?;
        warn!(user_id = user.id, "invalid reset code, fresh code reissued");
        return Err(ApiError::bad_request(
            "Invalid or expired code. A new code has been sent to your email.",
        ));
    }

    let hash = hash_password(&payload.new_password)?;
    let mut tx = state.db.begin().await?;
    sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
        .bind(&hash)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE profiles SET email_token = '' WHERE user_id = ?")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(user_id = user.id, "password reset");
    Ok(Json(json!({ "message": "Password has been reset. You can now log in." })))
}
