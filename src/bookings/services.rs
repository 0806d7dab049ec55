use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::repo_types::{BookingDetails, Reservation};
use crate::access::require_role;
use crate::auth::repo_types::Role;
use crate::error::{parse_id, AppError};
use crate::events::repo_types::Event;
use crate::state::AppState;

const BOOKING_NOT_FOUND: &str = "Booking not found or not yours";
const EVENT_NOT_OWNED: &str = "Event not found or not owned by you";

/// Takes one seat of the event for the calling customer.
#[instrument(skip(st))]
pub async fn book(st: &AppState, caller: Uuid, raw_event_id: &str) -> Result<BookingDetails, AppError> {
    let customer = require_role(st, caller, Role::Customer).await?;
    let event_id = parse_id(raw_event_id, "Event not found")?;

    match st.bookings.reserve(customer.id, event_id).await? {
        Reservation::Booked { booking, event } => {
            info!(
                booking_id = %booking.id,
                %event_id,
                seats_left = event.seats_available,
                "seat booked"
            );
            Ok(BookingDetails {
                booking_id: booking.id,
                booked_at: booking.booked_at,
                customer_id: customer.id,
                customer_name: customer.name,
                customer_email: customer.email,
                event,
            })
        }
        Reservation::EventNotFound => Err(AppError::not_found("Event not found")),
        Reservation::SoldOut => {
            warn!(%event_id, "booking on a full event");
            Err(AppError::Capacity("Event is fully booked".into()))
        }
        Reservation::AlreadyBooked => {
            warn!(%event_id, customer_id = %customer.id, "duplicate booking");
            Err(AppError::Conflict("You already booked this event".into()))
        }
    }
}

#[instrument(skip(st))]
pub async fn cancel(st: &AppState, caller: Uuid, raw_booking_id: &str) -> Result<(), AppError> {
    let customer = require_role(st, caller, Role::Customer).await?;
    let booking_id = parse_id(raw_booking_id, BOOKING_NOT_FOUND)?;

    let booking = st
        .bookings
        .cancel_booking(booking_id, customer.id)
        .await?
        .ok_or_else(|| AppError::not_found(BOOKING_NOT_FOUND))?;

    info!(booking_id = %booking.id, event_id = %booking.event_id, "booking cancelled");
    Ok(())
}

pub async fn list_my_bookings(st: &AppState, caller: Uuid) -> Result<Vec<BookingDetails>, AppError> {
    let customer = require_role(st, caller, Role::Customer).await?;
    Ok(st.bookings.list_for_customer(customer.id).await?)
}

pub async fn list_event_bookings(
    st: &AppState,
    caller: Uuid,
    raw_event_id: &str,
) -> Result<(Event, Vec<BookingDetails>), AppError> {
    let vendor = require_role(st, caller, Role::Vendor).await?;
    let event_id = parse_id(raw_event_id, EVENT_NOT_OWNED)?;

    let event = st
        .events
        .find_event(event_id)
        .await?
        .filter(|e| e.organizer_id == vendor.id)
        .ok_or_else(|| AppError::not_found(EVENT_NOT_OWNED))?;

    let bookings = st.bookings.list_for_event(event.id).await?;
    Ok((event, bookings))
}
