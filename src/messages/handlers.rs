use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    groups::repo::Group,
    messages::{
        dto::{CreateMessageRequest, MessageQuery, MessageResponse},
        repo,
    },
    state::AppState,
};

pub fn message_routes() -> Router<AppState> {
    Router::new().route("/messages", get(list_messages).post(create_message))
}

#[instrument(skip(state))]
async fn list_messages(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    if Group::find_by_id(&state.db, query.group).await?.is_none() {
        return Err(ApiError::not_found("Group not found."));
    }
    let rows = repo::list_by_group(&state.db, query.group).await?;
    Ok(Json(rows.into_iter().map(MessageResponse::from).collect()))
}

/// The sender is always the authenticated caller, never taken from the body.
#[instrument(skip(state, payload))]
async fn create_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if payload.text.trim().is_empty() {
        return Err(ApiError::field("text", "This field may not be blank."));
    }
    if Group::find_by_id(&state.db, payload.group).await?.is_none() {
        return Err(ApiError::not_found("Group not found."));
    }
    let row = repo::create(&state.db, payload.group, user_id, &payload.text).await?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(row))))
}
