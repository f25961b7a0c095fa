use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser,
    error::ApiError,
    groups::{
        dto::{
            CreateGroupRequest, GroupResponse, JoinGroupRequest, MemberResponse,
            RemoveMemberRequest, RenameGroupRequest,
        },
        repo::Group,
        services::{self, LeaveOutcome},
    },
    state::AppState,
};

pub fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/join", post(join_group))
        .route("/groups/:id", get(get_group))
        .route("/groups/:id/members", get(list_members))
        .route("/groups/:id/leave", post(leave_group))
        .route("/groups/:id/remove_member", post(remove_member))
        .route("/groups/:id/rename", patch(rename_group))
}

async fn to_response(state: &AppState, group: Group) -> Result<GroupResponse, ApiError> {
    let members = Group::member_ids(&state.db, group.id).await?;
    Ok(GroupResponse::from_parts(group, members))
}

#[instrument(skip(state))]
async fn list_groups(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<GroupResponse>>, ApiError> {
    let groups = Group::list_visible(&state.db, user_id).await?;
    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        out.push(to_response(&state, group).await?);
    }
    Ok(Json(out))
}

#[instrument(skip(state, payload))]
async fn create_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<GroupResponse>), ApiError> {
    let group = services::create_group(&state.db, &payload.name, user_id).await?;
    Ok((StatusCode::CREATED, Json(to_response(&state, group).await?)))
}

#[instrument(skip(state, payload))]
async fn join_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<JoinGroupRequest>,
) -> Result<Json<GroupResponse>, ApiError> {
    let code = payload
        .invite_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::field("invite_code", "This field is required."))?;
    let group = services::join_by_code(&state.db, code, user_id).await?;
    Ok(Json(to_response(&state, group).await?))
}

#[instrument(skip(state))]
async fn get_group(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(group_id): Path<i64>,
) -> Result<Json<GroupResponse>, ApiError> {
    let group = Group::find_by_id(&state.db, group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found."))?;
    Ok(Json(to_response(&state, group).await?))
}

#[instrument(skip(state))]
async fn list_members(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(group_id): Path<i64>,
) -> Result<Json<Vec<MemberResponse>>, ApiError> {
    let group = Group::find_by_id(&state.db, group_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Group not found."))?;
    let members = Group::members(&state.db, group_id).await?;
    Ok(Json(
        members
            .into_iter()
            .map(|row| MemberResponse::from_row(row, group.owner_id))
            .collect(),
    ))
}

#[instrument(skip(state))]
async fn leave_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<i64>,
) -> Result<Response, ApiError> {
    match services::leave(&state.db, group_id, user_id).await? {
        LeaveOutcome::Left(group) => {
            Ok(Json(to_response(&state, group).await?).into_response())
        }
        LeaveOutcome::Deleted => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

#[instrument(skip(state, payload))]
async fn remove_member(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<i64>,
    Json(payload): Json<RemoveMemberRequest>,
) -> Result<StatusCode, ApiError> {
    services::remove_member(&state.db, group_id, user_id, payload.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
async fn rename_group(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(group_id): Path<i64>,
    Json(payload): Json<RenameGroupRequest>,
) -> Result<Json<GroupResponse>, ApiError> {
    let group = services::rename(&state.db, group_id, user_id, &payload.name).await?;
    Ok(Json(to_response(&state, group).await?))
}
