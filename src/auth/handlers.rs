use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use tracing::instrument;

use super::{
    cookies::{clear_session, refresh_token, set_session},
    dto::{LoginRequest, MessageResponse, PublicUser, RegisterRequest, UserEnvelope},
    jwt::AuthUser,
    services,
};
use crate::{
    error::{json_error, AppError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserEnvelope>), AppError> {
    let Json(req) = payload.map_err(|r| json_error(r, state.config.max_upload_mb()))?;
    let user = services::register(&state, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserEnvelope {
            message: "User registered successfully",
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<UserEnvelope>), AppError> {
    let Json(req) = payload.map_err(|r| json_error(r, state.config.max_upload_mb()))?;
    let session = services::login(&state, req).await?;
    let jar = set_session(jar, &session.access, &session.refresh, state.config.cookie_secure);
    Ok((
        jar,
        Json(UserEnvelope {
            message: "Login successful",
            user: PublicUser::from(&session.user),
        }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    let session = services::refresh(&state, refresh_token(&jar)).await?;
    let jar = set_session(jar, &session.access, &session.refresh, state.config.cookie_secure);
    Ok((jar, Json(MessageResponse::new("Token rotated"))))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    services::logout(&state, user_id, refresh_token(&jar)).await?;
    Ok((clear_session(jar), Json(MessageResponse::new("Logged out successfully"))))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserEnvelope>, AppError> {
    let user = services::current_user(&state, user_id).await?;
    Ok(Json(UserEnvelope {
        message: "User fetched successfully",
        user: PublicUser::from(&user),
    }))
}
