use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::events::repo_types::Event;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub event_id: Uuid,
    pub booked_at: OffsetDateTime,
}

/// Booking joined with its customer and its event.
#[derive(Debug, Clone, FromRow)]
pub struct BookingDetails {
    pub booking_id: Uuid,
    pub booked_at: OffsetDateTime,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    #[sqlx(flatten)]
    pub event: Event,
}

/// Outcome of an attempt to take a seat.
#[derive(Debug, Clone)]
pub enum Reservation {
    /// The booking and the event as it stands after the decrement.
    Booked { booking: Booking, event: Event },
    EventNotFound,
    SoldOut,
    AlreadyBooked,
}
