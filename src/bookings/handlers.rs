use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{BookingEnvelope, BookingList, BookingResponse, EventBookings},
    services,
};
use crate::{
    auth::{jwt::AuthUser, MessageResponse},
    error::AppError,
    state::AppState,
};

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/booking/my", get(my_bookings))
        .route("/booking/cancel/:booking_id", delete(cancel_booking))
        .route("/booking/event/:event_id", get(event_bookings))
        .route("/booking/:event_id", post(book_event))
}

#[instrument(skip(state))]
pub async fn book_event(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(event_id): Path<String>,
) -> Result<(StatusCode, Json<BookingEnvelope>), AppError> {
    let booking = services::book(&state, user_id, &event_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingEnvelope {
            message: "Booking successful",
            booking: BookingResponse::from(&booking),
        }),
    ))
}

#[instrument(skip(state))]
pub async fn my_bookings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<BookingList>, AppError> {
    let rows = services::list_my_bookings(&state, user_id).await?;
    Ok(Json(BookingList::from_details(&rows)))
}

#[instrument(skip(state))]
pub async fn cancel_booking(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(booking_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    services::cancel(&state, user_id, &booking_id).await?;
    Ok(Json(MessageResponse::new("Booking cancelled successfully")))
}

#[instrument(skip(state))]
pub async fn event_bookings(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(event_id): Path<String>,
) -> Result<Json<EventBookings>, AppError> {
    let (event, rows) = services::list_event_bookings(&state, user_id, &event_id).await?;
    Ok(Json(EventBookings::new(&event, &rows)))
}
