use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{EventFilterQuery, EventForm};
use super::repo_types::{Event, EventDetails, EventFilter, EventPatch, NewEvent};
use crate::access::require_role;
use crate::auth::repo_types::Role;
use crate::auth::services::non_blank;
use crate::dates::{day_range, parse_event_date};
use crate::error::{parse_id, AppError};
use crate::images::services::{discard_poster, upload_poster, PosterUpload};
use crate::state::AppState;

const EVENT_NOT_FOUND: &str = "Event not found";
const MAX_PAGE: i64 = 100;

fn parse_seats(raw: &str, min: i32) -> Result<i32, AppError> {
    match raw.trim().parse::<i32>() {
        Ok(n) if n >= min => Ok(n),
        _ if min > 0 => Err(AppError::validation(
            "seats_available must be a positive integer",
        )),
        _ => Err(AppError::validation(
            "seats_available must be a non-negative integer",
        )),
    }
}

/// Blank clears the column, anything else sets it.
fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| Some(v.trim().to_owned()).filter(|v| !v.is_empty()))
}

#[instrument(skip(st, form, poster))]
pub async fn create_event(
    st: &AppState,
    caller: Uuid,
    form: EventForm,
    poster: Option<PosterUpload>,
) -> Result<Event, AppError> {
    let vendor = require_role(st, caller, Role::Vendor).await?;

    let (Some(title), Some(date), Some(country), Some(city)) = (
        non_blank(form.title),
        non_blank(form.date),
        non_blank(form.country),
        non_blank(form.city),
    ) else {
        return Err(AppError::validation(
            "Missing required fields: title, date, country, city",
        ));
    };
    let date = parse_event_date(&date)?;
    let seats_available = parse_seats(form.seats_available.as_deref().unwrap_or(""), 1)?;

    let poster_url = match poster {
        Some(p) => Some(upload_poster(st, vendor.id, p).await?),
        None => None,
    };

    let created = st
        .events
        .create_event(NewEvent {
            title,
            description: non_blank(form.description),
            date,
            country,
            city,
            location: non_blank(form.location),
            poster_url: poster_url.clone(),
            seats_available,
            organizer_id: vendor.id,
        })
        .await;

    match created {
        Ok(event) => {
            info!(event_id = %event.id, organizer_id = %vendor.id, "event created");
            Ok(event)
        }
        Err(e) => {
            if let Some(url) = poster_url {
                discard_poster(st, &url).await;
            }
            Err(e.into())
        }
    }
}

#[instrument(skip(st))]
pub async fn list_events(st: &AppState, q: EventFilterQuery) -> Result<Vec<Event>, AppError> {
    if let Some(limit) = q.limit {
        if !(1..=MAX_PAGE).contains(&limit) {
            return Err(AppError::validation("limit must be between 1 and 100"));
        }
    }
    let offset = q.offset.unwrap_or(0);
    if offset < 0 {
        return Err(AppError::validation("offset must not be negative"));
    }

    let date = match (
        q.start_year,
        q.start_month,
        q.start_day,
        q.end_year,
        q.end_month,
        q.end_day,
    ) {
        (Some(sy), Some(sm), Some(sd), Some(ey), Some(em), Some(ed)) => {
            Some(day_range((sy, sm, sd), (ey, em, ed))?)
        }
        _ => None,
    };

    let filter = EventFilter {
        organizer_id: None,
        country: non_blank(q.country),
        city: non_blank(q.city),
        date,
        limit: q.limit,
        offset,
    };
    Ok(st.events.list_events(&filter).await?)
}

pub async fn get_event(st: &AppState, raw_id: &str) -> Result<EventDetails, AppError> {
    let id = parse_id(raw_id, EVENT_NOT_FOUND)?;
    st.events
        .find_event_details(id)
        .await?
        .ok_or_else(|| AppError::not_found(EVENT_NOT_FOUND))
}

pub async fn list_vendor_events(st: &AppState, caller: Uuid) -> Result<Vec<Event>, AppError> {
    let vendor = require_role(st, caller, Role::Vendor).await?;
    Ok(st.events.list_by_organizer(vendor.id).await?)
}

/// Loads an event the calling vendor is allowed to change.
async fn owned_event(st: &AppState, caller: Uuid, raw_id: &str) -> Result<Event, AppError> {
    let vendor = require_role(st, caller, Role::Vendor).await?;
    let id = parse_id(raw_id, EVENT_NOT_FOUND)?;
    let event = st
        .events
        .find_event(id)
        .await?
        .ok_or_else(|| AppError::not_found(EVENT_NOT_FOUND))?;
    if event.organizer_id != vendor.id {
        warn!(event_id = %event.id, user_id = %caller, "event change by non-owner");
        return Err(AppError::forbidden("You can only modify your own events"));
    }
    Ok(event)
}

fn patch_from_form(form: EventForm) -> Result<EventPatch, AppError> {
    let required = |value: Option<String>, field: &str| -> Result<Option<String>, AppError> {
        match value {
            None => Ok(None),
            Some(v) if v.trim().is_empty() => {
                Err(AppError::validation(format!("{field} must not be empty")))
            }
            Some(v) => Ok(Some(v.trim().to_owned())),
        }
    };

    Ok(EventPatch {
        title: required(form.title, "title")?,
        description: clearable(form.description),
        date: form.date.as_deref().map(parse_event_date).transpose()?,
        country: required(form.country, "country")?,
        city: required(form.city, "city")?,
        location: clearable(form.location),
        poster_url: None,
        seats_available: form
            .seats_available
            .as_deref()
            .map(|s| parse_seats(s, 0))
            .transpose()?,
    })
}

#[instrument(skip(st, form, poster))]
pub async fn update_event(
    st: &AppState,
    caller: Uuid,
    raw_id: &str,
    form: EventForm,
    poster: Option<PosterUpload>,
) -> Result<Event, AppError> {
    let current = owned_event(st, caller, raw_id).await?;
    let mut patch = patch_from_form(form)?;

    if let Some(p) = poster {
        patch.poster_url = Some(upload_poster(st, caller, p).await?);
    }
    if patch.is_empty() {
        return Ok(current);
    }

    let updated = match st.events.update_event(current.id, &patch).await {
        Ok(Some(event)) => event,
        other => {
            if let Some(url) = &patch.poster_url {
                discard_poster(st, url).await;
            }
            return match other {
                Err(e) => Err(e.into()),
                Ok(_) => Err(AppError::not_found(EVENT_NOT_FOUND)),
            };
        }
    };

    if let (Some(_), Some(old)) = (&patch.poster_url, &current.poster_url) {
        discard_poster(st, old).await;
    }
    info!(event_id = %updated.id, "event updated");
    Ok(updated)
}

#[instrument(skip(st))]
pub async fn delete_event(st: &AppState, caller: Uuid, raw_id: &str) -> Result<(), AppError> {
    let event = owned_event(st, caller, raw_id).await?;
    let deleted = st
        .events
        .delete_event(event.id)
        .await?
        .ok_or_else(|| AppError::not_found(EVENT_NOT_FOUND))?;
    if let Some(url) = &deleted.poster_url {
        discard_poster(st, url).await;
    }
    info!(event_id = %deleted.id, "event deleted");
    Ok(())
}
