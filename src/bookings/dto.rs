use serde::Serialize;
use uuid::Uuid;

use super::repo_types::BookingDetails;
use crate::dates::format_minutes;
use crate::events::dto::EventResponse;
use crate::events::repo_types::Event;

#[derive(Debug, Serialize)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub customer: CustomerSummary,
    pub event: EventResponse,
    pub booked_at: String,
}

impl From<&BookingDetails> for BookingResponse {
    fn from(d: &BookingDetails) -> Self {
        Self {
            id: d.booking_id,
            customer: CustomerSummary {
                id: d.customer_id,
                name: d.customer_name.clone(),
                email: d.customer_email.clone(),
            },
            event: EventResponse::from(&d.event),
            booked_at: format_minutes(d.booked_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingEnvelope {
    pub message: &'static str,
    pub booking: BookingResponse,
}

#[derive(Debug, Serialize)]
pub struct BookingList {
    pub count: usize,
    pub bookings: Vec<BookingResponse>,
}

impl BookingList {
    pub fn from_details(rows: &[BookingDetails]) -> Self {
        Self {
            count: rows.len(),
            bookings: rows.iter().map(BookingResponse::from).collect(),
        }
    }
}

/// Bookings of one event as its organizer sees them.
#[derive(Debug, Serialize)]
pub struct EventBookings {
    pub event: EventResponse,
    pub count: usize,
    pub bookings: Vec<BookingResponse>,
}

impl EventBookings {
    pub fn new(event: &Event, rows: &[BookingDetails]) -> Self {
        let list = BookingList::from_details(rows);
        Self {
            event: EventResponse::from(event),
            count: list.count,
            bookings: list.bookings,
        }
    }
}
