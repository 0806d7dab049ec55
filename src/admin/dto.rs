use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo_types::{Role, User};
use crate::dates::format_minutes;
use crate::events::repo_types::Event;

#[derive(Debug, Serialize)]
pub struct AdminUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

impl From<&User> for AdminUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            email: u.email.clone(),
            role: u.role,
            created_at: format_minutes(u.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub count: usize,
    pub users: Vec<AdminUser>,
}

impl UserList {
    pub fn from_users(users: &[User]) -> Self {
        Self {
            count: users.len(),
            users: users.iter().map(AdminUser::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleUpdated {
    pub message: String,
    pub user: AdminUser,
}

#[derive(Debug, Serialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub title: String,
    pub organizer: Uuid,
    pub date: String,
    pub city: String,
    pub country: String,
    pub seats_available: i32,
}

impl From<&Event> for EventSummary {
    fn from(e: &Event) -> Self {
        Self {
            id: e.id,
            title: e.title.clone(),
            organizer: e.organizer_id,
            date: format_minutes(e.date),
            city: e.city.clone(),
            country: e.country.clone(),
            seats_available: e.seats_available,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventSummaryList {
    pub count: usize,
    pub events: Vec<EventSummary>,
}

impl EventSummaryList {
    pub fn from_events(events: &[Event]) -> Self {
        Self {
            count: events.len(),
            events: events.iter().map(EventSummary::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    pub role: Option<String>,
}

/// Query of `GET /admin/events/filter`.
#[derive(Debug, Default, Deserialize)]
pub struct AdminEventQuery {
    pub organizer: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub hour: Option<u8>,
}
