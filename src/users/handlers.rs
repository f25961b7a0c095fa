use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        extractors::AuthUser,
        repo::User,
        services::{is_valid_email, normalize_email},
    },
    error::ApiError,
    groups,
    state::AppState,
    users::{
        dto::{ProfileResponse, RequestEmailChange, UpdateProfileRequest, VerifyEmailChange},
        repo::Profile,
    },
    verification::generate_verification_code,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile/delete", delete(delete_account))
        .route("/profile/request-email-change", post(request_email_change))
        .route("/profile/verify-email-change", post(verify_email_change))
}

async fn load_profile(state: &AppState, user_id: i64) -> Result<ProfileResponse, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("User not found.".into()))?;
    let profile = Profile::get(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("User not found.".into()))?;
    Ok(ProfileResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        avatar: profile.avatar,
        pending_email: profile.pending_email,
    })
}

#[instrument(skip(state))]
async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    Ok(Json(load_profile(&state, user_id).await?))
}

#[instrument(skip(state, payload))]
async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    if let Some(username) = payload.username.as_deref() {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::field("username", "This field may not be blank."));
        }
        let taken: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM users WHERE username = ? COLLATE NOCASE AND id != ?",
        )
        .bind(username)
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?;
        if taken.is_some() {
            return Err(ApiError::field(
                "username",
                "A user with this username already exists.",
            ));
        }
        sqlx::query("UPDATE users SET username = ? WHERE id = ?")
            .bind(username)
            .bind(user_id)
            .execute(&state.db)
            .await?;
    }
    if let Some(first_name) = payload.first_name.as_deref() {
        sqlx::query("UPDATE users SET first_name = ? WHERE id = ?")
            .bind(first_name.trim())
            .bind(user_id)
            .execute(&state.db)
            .await?;
    }
    if let Some(last_name) = payload.last_name.as_deref() {
        sqlx::query("UPDATE users SET last_name = ? WHERE id = ?")
            .bind(last_name.trim())
            .bind(user_id)
            .execute(&state.db)
            .await?;
    }
    if let Some(avatar) = payload.avatar.as_deref() {
        Profile::set_avatar(&state.db, user_id, avatar).await?;
    }

    Ok(Json(load_profile(&state, user_id).await?))
}

/// Deleting an account first runs the leave state machine on every group the
/// user owns, so no group is left ownerless; remaining memberships cascade
/// and authored expenses/messages survive with a null author.
#[instrument(skip(state))]
async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, ApiError> {
    groups::services::relinquish_all_owned(&state.db, user_id).await?;
    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(&state.db)
        .await?;
    info!(user_id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
async fn request_email_change(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RequestEmailChange>,
) -> Result<Json<Value>, ApiError> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        return Err(ApiError::field("email", "Enter a valid email address."));
    }
    if let Some(existing) = User::find_by_email(&state.db, &email).await? {
        if existing.id != user_id {
            return Err(ApiError::bad_request("A user with this email already exists."));
        }
    }

    let code = generate_verification_code(&mut rand::thread_rng());
    Profile::stage_email_change(&state.db, user_id, &email, &code).await?;
    // Code goes to the staged address, not the current one.
    state
        .mailer
        .send_code(&email, "Confirm your new Circld email", &code)
        .await?;

    info!(user_id, "email change requested");
    Ok(Json(json!({ "message": "Verification code sent to the new address." })))
}

#[instrument(skip(state, payload))]
async fn verify_email_change(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<VerifyEmailChange>,
) -> Result<Json<Value>, ApiError> {
    let profile = Profile::get(&state.db, user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthenticated("User not found.".into()))?;

    if profile.pending_email.is_empty()
        || profile.email_token.is_empty()
        || profile.email_token != payload.code
    {
        warn!(user_id, "invalid email change code");
        return Err(ApiError::bad_request("Invalid verification code."));
    }

    // Re-check uniqueness at commit time; another account may have claimed
    // the address since the request.
    if let Some(existing) = User::find_by_email(&state.db, &profile.pending_email).await? {
        if existing.id != user_id {
            return Err(ApiError::Conflict("A user with this email already exists.".into()));
        }
    }

    let mut tx = state.db.begin().await?;
    sqlx::query("UPDATE users SET email = ? WHERE id = ?")
        .bind(&profile.pending_email)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE profiles SET email_token = '', pending_email = '' WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(user_id, "email change confirmed");
    Ok(Json(json!({ "message": "Email address updated." })))
}
