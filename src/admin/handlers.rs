use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{
        AdminEventQuery, AdminUser, EventSummaryList, NameQuery, RoleQuery, RoleUpdateRequest,
        RoleUpdated, UserList,
    },
    services,
};
use crate::{
    auth::{jwt::AuthUser, MessageResponse},
    error::{json_error, AppError},
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/search", get(search_users))
        .route("/admin/users/filter", get(filter_users))
        .route("/admin/user/:user_id/role", post(update_role))
        .route("/admin/user/:user_id", delete(delete_user))
        .route("/admin/events", get(list_events))
        .route("/admin/events/filter", get(filter_events))
        .route("/admin/event/:event_id", delete(delete_event))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserList>, AppError> {
    let users = services::list_users(&state, user_id).await?;
    Ok(Json(UserList::from_users(&users)))
}

#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<NameQuery>, QueryRejection>,
) -> Result<Json<UserList>, AppError> {
    let Query(q) = query?;
    let users = services::search_users(&state, user_id, q.name).await?;
    Ok(Json(UserList::from_users(&users)))
}

#[instrument(skip(state))]
pub async fn filter_users(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<RoleQuery>, QueryRejection>,
) -> Result<Json<UserList>, AppError> {
    let Query(q) = query?;
    let users = services::filter_users_by_role(&state, user_id, q.role).await?;
    Ok(Json(UserList::from_users(&users)))
}

#[instrument(skip(state, payload))]
pub async fn update_role(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(target): Path<String>,
    payload: Result<Json<RoleUpdateRequest>, JsonRejection>,
) -> Result<Json<RoleUpdated>, AppError> {
    let Json(req) = payload.map_err(|r| json_error(r, state.config.max_upload_mb()))?;
    let user = services::update_user_role(&state, user_id, &target, req.role).await?;
    Ok(Json(RoleUpdated {
        message: format!("User role updated to '{}'", user.role),
        user: AdminUser::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(target): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete_user(&state, user_id, &target).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<EventSummaryList>, AppError> {
    let events = services::list_events(&state, user_id).await?;
    Ok(Json(EventSummaryList::from_events(&events)))
}

#[instrument(skip(state))]
pub async fn filter_events(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<AdminEventQuery>, QueryRejection>,
) -> Result<Json<EventSummaryList>, AppError> {
    let Query(q) = query?;
    let events = services::filter_events(&state, user_id, q).await?;
    Ok(Json(EventSummaryList::from_events(&events)))
}

#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(target): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete_event(&state, user_id, &target).await?;
    Ok(Json(MessageResponse::new("Event deleted successfully")))
}
