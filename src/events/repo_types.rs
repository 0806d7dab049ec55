use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dates::DateRange;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: OffsetDateTime,
    pub country: String,
    pub city: String,
    pub location: Option<String>,
    pub poster_url: Option<String>,
    pub seats_available: i32,
    pub organizer_id: Uuid,
    pub created_at: OffsetDateTime,
}

/// Event joined with its organizer's display name.
#[derive(Debug, Clone, FromRow)]
pub struct EventDetails {
    #[sqlx(flatten)]
    pub event: Event,
    pub organizer_name: String,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub date: OffsetDateTime,
    pub country: String,
    pub city: String,
    pub location: Option<String>,
    pub poster_url: Option<String>,
    pub seats_available: i32,
    pub organizer_id: Uuid,
}

/// Partial update. `None` leaves a column untouched; for the nullable
/// columns `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub date: Option<OffsetDateTime>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub location: Option<Option<String>>,
    pub poster_url: Option<String>,
    pub seats_available: Option<i32>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        *self == EventPatch::default()
    }

    /// Applies the patch to an in-memory copy.
    pub fn apply(&self, event: &mut Event) {
        if let Some(v) = &self.title {
            event.title = v.clone();
        }
        if let Some(v) = &self.description {
            event.description = v.clone();
        }
        if let Some(v) = self.date {
            event.date = v;
        }
        if let Some(v) = &self.country {
            event.country = v.clone();
        }
        if let Some(v) = &self.city {
            event.city = v.clone();
        }
        if let Some(v) = &self.location {
            event.location = v.clone();
        }
        if let Some(v) = &self.poster_url {
            event.poster_url = Some(v.clone());
        }
        if let Some(v) = self.seats_available {
            event.seats_available = v;
        }
    }
}

/// Listing criteria shared by the public and the admin filters.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub organizer_id: Option<Uuid>,
    /// Case-insensitive exact match.
    pub country: Option<String>,
    /// Case-insensitive exact match.
    pub city: Option<String>,
    pub date: Option<DateRange>,
    pub limit: Option<i64>,
    pub offset: i64,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        self.organizer_id.map_or(true, |o| o == event.organizer_id)
            && self
                .country
                .as_deref()
                .map_or(true, |c| c.to_lowercase() == event.country.to_lowercase())
            && self
                .city
                .as_deref()
                .map_or(true, |c| c.to_lowercase() == event.city.to_lowercase())
            && self.date.map_or(true, |r| r.contains(event.date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::at;

    fn event() -> Event {
        Event {
            id: Uuid::new_v4(),
            title: "Jazz night".into(),
            description: Some("live".into()),
            date: at(2025, 6, 1, 20),
            country: "Germany".into(),
            city: "Berlin".into(),
            location: None,
            poster_url: None,
            seats_available: 10,
            organizer_id: Uuid::new_v4(),
            created_at: at(2025, 1, 1, 0),
        }
    }

    #[test]
    fn filter_matches_case_insensitively() {
        let e = event();
        let f = EventFilter {
            country: Some("germany".into()),
            city: Some("BERLIN".into()),
            ..Default::default()
        };
        assert!(f.matches(&e));
        let f = EventFilter {
            city: Some("Berl".into()),
            ..Default::default()
        };
        assert!(!f.matches(&e));
    }

    #[test]
    fn patch_only_touches_supplied_fields() {
        let mut e = event();
        let patch = EventPatch {
            title: Some("Blues night".into()),
            description: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut e);
        assert_eq!(e.title, "Blues night");
        assert_eq!(e.description, None);
        assert_eq!(e.city, "Berlin");
        assert_eq!(e.seats_available, 10);
    }
}
