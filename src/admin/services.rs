//! Moderation over users and events. Every operation starts with the admin
//! check.

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::AdminEventQuery;
use crate::access::require_role;
use crate::auth::repo_types::{Role, User};
use crate::auth::services::non_blank;
use crate::dates::{explicit_range, period_range};
use crate::error::{parse_id, AppError};
use crate::events::repo_types::{Event, EventFilter};
use crate::images::services::discard_poster;
use crate::state::AppState;

const USER_NOT_FOUND: &str = "User not found";
const EVENT_NOT_FOUND: &str = "Event not found";

fn parse_role(raw: Option<String>) -> Result<Role, AppError> {
    raw.map(|r| r.trim().to_lowercase())
        .and_then(|r| r.parse().ok())
        .ok_or_else(|| AppError::validation("Invalid role. Must be admin, vendor, or customer."))
}

pub async fn list_users(st: &AppState, caller: Uuid) -> Result<Vec<User>, AppError> {
    require_role(st, caller, Role::Admin).await?;
    Ok(st.users.list_users().await?)
}

#[instrument(skip(st))]
pub async fn update_user_role(
    st: &AppState,
    caller: Uuid,
    raw_user_id: &str,
    role: Option<String>,
) -> Result<User, AppError> {
    require_role(st, caller, Role::Admin).await?;
    let role = parse_role(role)?;
    let user_id = parse_id(raw_user_id, USER_NOT_FOUND)?;

    let user = st
        .users
        .update_role(user_id, role)
        .await?
        .ok_or_else(|| AppError::not_found(USER_NOT_FOUND))?;
    info!(user_id = %user.id, %role, admin_id = %caller, "user role changed");
    Ok(user)
}

pub async fn search_users(st: &AppState, caller: Uuid, name: Option<String>) -> Result<Vec<User>, AppError> {
    require_role(st, caller, Role::Admin).await?;
    let name = non_blank(name).ok_or_else(|| AppError::validation("Please provide a name query"))?;
    Ok(st.users.search_users(&name).await?)
}

pub async fn filter_users_by_role(
    st: &AppState,
    caller: Uuid,
    role: Option<String>,
) -> Result<Vec<User>, AppError> {
    require_role(st, caller, Role::Admin).await?;
    let role = parse_role(role)?;
    Ok(st.users.list_users_by_role(role).await?)
}

#[instrument(skip(st))]
pub async fn delete_user(st: &AppState, caller: Uuid, raw_user_id: &str) -> Result<(), AppError> {
    require_role(st, caller, Role::Admin).await?;
    let user_id = parse_id(raw_user_id, USER_NOT_FOUND)?;

    // organized events vanish with the user; remember their posters first
    let posters: Vec<String> = st
        .events
        .list_by_organizer(user_id)
        .await?
        .into_iter()
        .filter_map(|e| e.poster_url)
        .collect();

    if !st.users.delete_user(user_id).await? {
        return Err(AppError::not_found(USER_NOT_FOUND));
    }
    for url in &posters {
        discard_poster(st, url).await;
    }
    if user_id == caller {
        warn!(admin_id = %caller, "admin deleted their own account");
    }
    info!(%user_id, admin_id = %caller, "user deleted");
    Ok(())
}

pub async fn list_events(st: &AppState, caller: Uuid) -> Result<Vec<Event>, AppError> {
    require_role(st, caller, Role::Admin).await?;
    Ok(st.events.list_events(&EventFilter::default()).await?)
}

#[instrument(skip(st))]
pub async fn delete_event(st: &AppState, caller: Uuid, raw_event_id: &str) -> Result<(), AppError> {
    require_role(st, caller, Role::Admin).await?;
    let event_id = parse_id(raw_event_id, EVENT_NOT_FOUND)?;

    let event = st
        .events
        .delete_event(event_id)
        .await?
        .ok_or_else(|| AppError::not_found(EVENT_NOT_FOUND))?;
    if let Some(url) = &event.poster_url {
        discard_poster(st, url).await;
    }
    info!(%event_id, admin_id = %caller, "event removed by admin");
    Ok(())
}

#[instrument(skip(st))]
pub async fn filter_events(
    st: &AppState,
    caller: Uuid,
    q: AdminEventQuery,
) -> Result<Vec<Event>, AppError> {
    require_role(st, caller, Role::Admin).await?;

    let organizer_id = match non_blank(q.organizer) {
        Some(raw) => Some(
            raw.parse::<Uuid>()
                .map_err(|_| AppError::validation("Invalid organizer ID"))?,
        ),
        None => None,
    };

    let date = match (non_blank(q.from), non_blank(q.to), q.year) {
        (Some(from), Some(to), _) => Some(explicit_range(&from, &to)?),
        (_, _, Some(year)) => Some(period_range(year, q.month, q.day, q.hour)?),
        _ => None,
    };

    let filter = EventFilter {
        organizer_id,
        country: non_blank(q.country),
        city: non_blank(q.city),
        date,
        limit: None,
        offset: 0,
    };
    Ok(st.events.list_events(&filter).await?)
}
