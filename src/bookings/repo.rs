use anyhow::Context;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Booking, BookingDetails, Reservation};
use crate::db::PgStore;
use crate::events::repo::EVENT_COLUMNS;
use crate::events::repo_types::Event;

#[async_trait]
pub trait BookingRepo: Send + Sync {
    /// Takes one seat of the event for the customer. The existence check,
    /// the seat check, the duplicate check, the insert and the decrement are
    /// one atomic step per event.
    async fn reserve(&self, customer_id: Uuid, event_id: Uuid) -> anyhow::Result<Reservation>;
    /// Removes the customer's booking and gives its seat back, atomically.
    async fn cancel_booking(&self, booking_id: Uuid, customer_id: Uuid) -> anyhow::Result<Option<Booking>>;
    /// Newest first.
    async fn list_for_customer(&self, customer_id: Uuid) -> anyhow::Result<Vec<BookingDetails>>;
    /// Newest first.
    async fn list_for_event(&self, event_id: Uuid) -> anyhow::Result<Vec<BookingDetails>>;
}

const DETAILS_SELECT: &str = r#"
    SELECT b.id AS booking_id, b.booked_at,
           c.id AS customer_id, c.name AS customer_name, c.email AS customer_email,
           e.id, e.title, e.description, e.date, e.country, e.city, e.location,
           e.poster_url, e.seats_available, e.organizer_id, e.created_at
      FROM bookings b
      JOIN users c ON c.id = b.customer_id
      JOIN events e ON e.id = b.event_id
"#;

#[async_trait]
impl BookingRepo for PgStore {
    async fn reserve(&self, customer_id: Uuid, event_id: Uuid) -> anyhow::Result<Reservation> {
        let mut tx = self.pool.begin().await.context("begin tx")?;

        // Customer row first, then the event: the same order `delete_user`
        // takes them in.
        let customer = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR KEY SHARE")
            .bind(customer_id)
            .fetch_optional(&mut *tx)
            .await
            .context("lock customer")?;
        if customer.is_none() {
            anyhow::bail!("customer {customer_id} no longer exists");
        }

        // Row lock serialises every reservation against this event.
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
        ))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await
        .context("lock event")?;

        let Some(event) = event else {
            return Ok(Reservation::EventNotFound);
        };
        if event.seats_available <= 0 {
            return Ok(Reservation::SoldOut);
        }

        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM bookings WHERE customer_id = $1 AND event_id = $2",
        )
        .bind(customer_id)
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await
        .context("check existing booking")?;
        if existing.is_some() {
            return Ok(Reservation::AlreadyBooked);
        }

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (id, customer_id, event_id, booked_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (customer_id, event_id) DO NOTHING
            RETURNING id, customer_id, event_id, booked_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(customer_id)
        .bind(event_id)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&mut *tx)
        .await
        .context("insert booking")?;
        let Some(booking) = booking else {
            return Ok(Reservation::AlreadyBooked);
        };

        let event = sqlx::query_as::<_, Event>(&format!(
            r#"
            UPDATE events SET seats_available = seats_available - 1
             WHERE id = $1 AND seats_available > 0
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await
        .context("decrement seats")?;
        let Some(event) = event else {
            // dropping the transaction rolls the insert back
            return Ok(Reservation::SoldOut);
        };

        tx.commit().await.context("commit tx")?;
        Ok(Reservation::Booked { booking, event })
    }

    async fn cancel_booking(&self, booking_id: Uuid, customer_id: Uuid) -> anyhow::Result<Option<Booking>> {
        let mut tx = self.pool.begin().await.context("begin tx")?;

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            DELETE FROM bookings
             WHERE id = $1 AND customer_id = $2
            RETURNING id, customer_id, event_id, booked_at
            "#,
        )
        .bind(booking_id)
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await
        .context("delete booking")?;
        let Some(booking) = booking else {
            return Ok(None);
        };

        sqlx::query("UPDATE events SET seats_available = seats_available + 1 WHERE id = $1")
            .bind(booking.event_id)
            .execute(&mut *tx)
            .await
            .context("release seat")?;

        tx.commit().await.context("commit tx")?;
        Ok(Some(booking))
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> anyhow::Result<Vec<BookingDetails>> {
        let rows = sqlx::query_as::<_, BookingDetails>(&format!(
            "{DETAILS_SELECT} WHERE b.customer_id = $1 ORDER BY b.booked_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .context("list bookings of customer")?;
        Ok(rows)
    }

    async fn list_for_event(&self, event_id: Uuid) -> anyhow::Result<Vec<BookingDetails>> {
        let rows = sqlx::query_as::<_, BookingDetails>(&format!(
            "{DETAILS_SELECT} WHERE b.event_id = $1 ORDER BY b.booked_at DESC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .context("list bookings of event")?;
        Ok(rows)
    }
}
