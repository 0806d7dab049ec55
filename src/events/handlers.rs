use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, Multipart, Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{debug, instrument};

use super::{
    dto::{EventEnvelope, EventFilterQuery, EventForm, EventList, EventResponse},
    services,
};
use crate::{
    auth::{jwt::AuthUser, MessageResponse},
    error::{multipart_error, AppError},
    images::services::PosterUpload,
    state::AppState,
};

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/event/create", post(create_event))
        .route("/event/filter", get(list_events))
        .route("/event/my-events", get(my_events))
        .route(
            "/event/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
}

/// Reads the text fields and the optional `poster` file of an event form.
async fn read_event_form(
    mut mp: Multipart,
    max_upload_mb: usize,
) -> Result<(EventForm, Option<PosterUpload>), AppError> {
    let mut form = EventForm::default();
    let mut poster = None;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_upload_mb))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if name == "poster" {
            // browsers send an empty part when no file was picked
            if field.file_name().map_or(false, str::is_empty) {
                continue;
            }
            poster = Some(PosterUpload::spool(field, max_upload_mb).await?);
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(e, max_upload_mb))?;
            form.set(&name, value);
        }
    }

    debug!(has_poster = poster.is_some(), "event form read");
    Ok((form, poster))
}

#[instrument(skip(state, mp))]
pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<EventEnvelope>), AppError> {
    let (form, poster) = read_event_form(mp?, state.config.max_upload_mb()).await?;
    let event = services::create_event(&state, user_id, form, poster).await?;
    Ok((
        StatusCode::CREATED,
        Json(EventEnvelope {
            message: Some("Event created successfully"),
            event: EventResponse::from(&event),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    query: Result<Query<EventFilterQuery>, QueryRejection>,
) -> Result<Json<EventList>, AppError> {
    let Query(q) = query?;
    let events = services::list_events(&state, q).await?;
    Ok(Json(EventList::from_events(&events)))
}

#[instrument(skip(state))]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EventEnvelope>, AppError> {
    let details = services::get_event(&state, &id).await?;
    Ok(Json(EventEnvelope {
        message: None,
        event: EventResponse::from(&details),
    }))
}

#[instrument(skip(state))]
pub async fn my_events(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<EventList>, AppError> {
    let events = services::list_vendor_events(&state, user_id).await?;
    Ok(Json(EventList::from_events(&events)))
}

#[instrument(skip(state, mp))]
pub async fn update_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<EventEnvelope>, AppError> {
    let (form, poster) = read_event_form(mp?, state.config.max_upload_mb()).await?;
    let event = services::update_event(&state, user_id, &id, form, poster).await?;
    Ok(Json(EventEnvelope {
        message: Some("Event updated successfully"),
        event: EventResponse::from(&event),
    }))
}

#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete_event(&state, user_id, &id).await?;
    Ok(Json(MessageResponse::new("Event deleted successfully")))
}
