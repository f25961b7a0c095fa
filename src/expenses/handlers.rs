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
    expenses::{
        dto::{CreateExpenseRequest, ExpenseQuery, ExpenseResponse},
        repo,
    },
    groups::repo::Group,
    state::AppState,
};

pub fn expense_routes() -> Router<AppState> {
    Router::new().route("/expenses", get(list_expenses).post(create_expense))
}

#[instrument(skip(state))]
async fn list_expenses(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(query): Query<ExpenseQuery>,
) -> Result<Json<Vec<ExpenseResponse>>, ApiError> {
    if Group::find_by_id(&state.db, query.group).await?.is_none() {
        return Err(ApiError::not_found("Group not found."));
    }
    let rows = repo::list_by_group(&state.db, query.group).await?;
    Ok(Json(rows.into_iter().map(ExpenseResponse::from).collect()))
}

/// The payer is always the authenticated caller, never taken from the body.
#[instrument(skip(state, payload))]
async fn create_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    if Group::find_by_id(&state.db, payload.group).await?.is_none() {
        return Err(ApiError::not_found("Group not found."));
    }
    let row = repo::create(
        &state.db,
        payload.group,
        user_id,
        payload.amount_cents,
        payload.note.trim(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ExpenseResponse::from(row))))
}
