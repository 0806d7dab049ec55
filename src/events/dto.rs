use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{Event, EventDetails};
use crate::dates::format_minutes;

#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub seats_available: i32,
    pub date: String,
    pub country: String,
    pub city: String,
    pub location: Option<String>,
    pub poster_url: Option<String>,
    pub organizer: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer_name: Option<String>,
}

impl From<&Event> for EventResponse {
    fn from(e: &Event) -> Self {
        Self {
            id: e.id,
            title: e.title.clone(),
            description: e.description.clone(),
            seats_available: e.seats_available,
            date: format_minutes(e.date),
            country: e.country.clone(),
            city: e.city.clone(),
            location: e.location.clone(),
            poster_url: e.poster_url.clone(),
            organizer: e.organizer_id,
            organizer_name: None,
        }
    }
}

impl From<&EventDetails> for EventResponse {
    fn from(d: &EventDetails) -> Self {
        Self {
            organizer_name: Some(d.organizer_name.clone()),
            ..EventResponse::from(&d.event)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub event: EventResponse,
}

#[derive(Debug, Serialize)]
pub struct EventList {
    pub count: usize,
    pub events: Vec<EventResponse>,
}

impl EventList {
    pub fn from_events(events: &[Event]) -> Self {
        Self {
            count: events.len(),
            events: events.iter().map(EventResponse::from).collect(),
        }
    }
}

/// Text fields of the create/update multipart form, exactly as submitted.
#[derive(Debug, Clone, Default)]
pub struct EventForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub location: Option<String>,
    pub seats_available: Option<String>,
}

impl EventForm {
    /// Records a text field; unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        let slot = match name {
            "title" => &mut self.title,
            "description" => &mut self.description,
            "date" => &mut self.date,
            "country" => &mut self.country,
            "city" => &mut self.city,
            "location" => &mut self.location,
            "seats_available" => &mut self.seats_available,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// Query of `GET /event/filter`.
#[derive(Debug, Default, Deserialize)]
pub struct EventFilterQuery {
    pub country: Option<String>,
    pub city: Option<String>,
    pub start_year: Option<i32>,
    pub start_month: Option<u8>,
    pub start_day: Option<u8>,
    pub end_year: Option<i32>,
    pub end_month: Option<u8>,
    pub end_day: Option<u8>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
