use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Event, EventDetails, EventFilter, EventPatch, NewEvent};
use crate::db::PgStore;

#[async_trait]
pub trait EventRepo: Send + Sync {
    async fn create_event(&self, new: NewEvent) -> anyhow::Result<Event>;
    async fn find_event(&self, id: Uuid) -> anyhow::Result<Option<Event>>;
    async fn find_event_details(&self, id: Uuid) -> anyhow::Result<Option<EventDetails>>;
    /// Matching events, earliest first.
    async fn list_events(&self, filter: &EventFilter) -> anyhow::Result<Vec<Event>>;
    /// Events of one organizer, latest first.
    async fn list_by_organizer(&self, organizer_id: Uuid) -> anyhow::Result<Vec<Event>>;
    async fn update_event(&self, id: Uuid, patch: &EventPatch) -> anyhow::Result<Option<Event>>;
    /// Deletes the event together with its bookings. `None` if absent.
    async fn delete_event(&self, id: Uuid) -> anyhow::Result<Option<Event>>;
}

pub(crate) const EVENT_COLUMNS: &str = "id, title, description, date, country, city, location, poster_url, \
                             seats_available, organizer_id, created_at";

#[async_trait]
impl EventRepo for PgStore {
    async fn create_event(&self, new: NewEvent) -> anyhow::Result<Event> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            INSERT INTO events (id, title, description, date, country, city, location,
                                poster_url, seats_available, organizer_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.date)
        .bind(&new.country)
        .bind(&new.city)
        .bind(&new.location)
        .bind(&new.poster_url)
        .bind(new.seats_available)
        .bind(new.organizer_id)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.pool)
        .await
        .context("insert event")?;
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> anyhow::Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find event")?;
        Ok(event)
    }

    async fn find_event_details(&self, id: Uuid) -> anyhow::Result<Option<EventDetails>> {
        let row = sqlx::query_as::<_, EventDetails>(
            r#"
            SELECT e.id, e.title, e.description, e.date, e.country, e.city, e.location,
                   e.poster_url, e.seats_available, e.organizer_id, e.created_at,
                   u.name AS organizer_name
              FROM events e
              JOIN users u ON u.id = e.organizer_id
             WHERE e.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find event details")?;
        Ok(row)
    }

    async fn list_events(&self, filter: &EventFilter) -> anyhow::Result<Vec<Event>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE TRUE"));
        if let Some(organizer_id) = filter.organizer_id {
            qb.push(" AND organizer_id = ").push_bind(organizer_id);
        }
        if let Some(country) = &filter.country {
            qb.push(" AND lower(country) = lower(").push_bind(country.clone()).push(")");
        }
        if let Some(city) = &filter.city {
            qb.push(" AND lower(city) = lower(").push_bind(city.clone()).push(")");
        }
        if let Some(range) = filter.date {
            qb.push(" AND date >= ").push_bind(range.from);
            qb.push(" AND date <= ").push_bind(range.to);
        }
        qb.push(" ORDER BY date ASC, id");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }
        if filter.offset > 0 {
            qb.push(" OFFSET ").push_bind(filter.offset);
        }

        let events = qb
            .build_query_as::<Event>()
            .fetch_all(&self.pool)
            .await
            .context("list events")?;
        Ok(events)
    }

    async fn list_by_organizer(&self, organizer_id: Uuid) -> anyhow::Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organizer_id = $1 ORDER BY date DESC"
        ))
        .bind(organizer_id)
        .fetch_all(&self.pool)
        .await
        .context("list events by organizer")?;
        Ok(events)
    }

    async fn update_event(&self, id: Uuid, patch: &EventPatch) -> anyhow::Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events SET
                title           = COALESCE($2, title),
                description     = CASE WHEN $3 THEN $4 ELSE description END,
                date            = COALESCE($5, date),
                country         = COALESCE($6, country),
                city            = COALESCE($7, city),
                location        = CASE WHEN $8 THEN $9 ELSE location END,
                poster_url      = COALESCE($10, poster_url),
                seats_available = COALESCE($11, seats_available)
            WHERE id = $1
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&patch.title)
        .bind(patch.description.is_some())
        .bind(patch.description.clone().flatten())
        .bind(patch.date)
        .bind(&patch.country)
        .bind(&patch.city)
        .bind(patch.location.is_some())
        .bind(patch.location.clone().flatten())
        .bind(&patch.poster_url)
        .bind(patch.seats_available)
        .fetch_optional(&self.pool)
        .await
        .context("update event")?;
        Ok(event)
    }

    async fn delete_event(&self, id: Uuid) -> anyhow::Result<Option<Event>> {
        // bookings go with it through ON DELETE CASCADE
        let event = sqlx::query_as::<_, Event>(&format!(
            "DELETE FROM events WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("delete event")?;
        Ok(event)
    }
}
