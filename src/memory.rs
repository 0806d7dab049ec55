//! In-process store behind the same repository traits as `PgStore`.
//!
//! One mutex guards every table, so each trait call is atomic the same way a
//! single Postgres transaction is.

use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::{RefreshTokenRepo, UserRepo};
use crate::auth::repo_types::{NewUser, RefreshToken, Role, User};
use crate::bookings::repo::BookingRepo;
use crate::bookings::repo_types::{Booking, BookingDetails, Reservation};
use crate::events::repo::EventRepo;
use crate::events::repo_types::{Event, EventDetails, EventFilter, EventPatch, NewEvent};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    events: Vec<Event>,
    bookings: Vec<Booking>,
    refresh_tokens: Vec<RefreshToken>,
}

impl Tables {
    fn details(&self, b: &Booking) -> Option<BookingDetails> {
        let customer = self.users.iter().find(|u| u.id == b.customer_id)?;
        let event = self.events.iter().find(|e| e.id == b.event_id)?;
        Some(BookingDetails {
            booking_id: b.id,
            booked_at: b.booked_at,
            customer_id: customer.id,
            customer_name: customer.name.clone(),
            customer_email: customer.email.clone(),
            event: event.clone(),
        })
    }

    fn bookings_where(&self, pred: impl Fn(&Booking) -> bool) -> Vec<BookingDetails> {
        let mut rows: Vec<_> = self
            .bookings
            .iter()
            .filter(|b| pred(b))
            .filter_map(|b| self.details(b))
            .collect();
        rows.sort_by(|a, b| b.booked_at.cmp(&a.booked_at));
        rows
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store poisoned"))
    }

    pub fn seats(&self, event_id: Uuid) -> Option<i32> {
        self.lock()
            .ok()?
            .events
            .iter()
            .find(|e| e.id == event_id)
            .map(|e| e.seats_available)
    }

    pub fn booking_count(&self) -> usize {
        self.lock().map(|t| t.bookings.len()).unwrap_or(0)
    }

    pub fn refresh_count(&self) -> usize {
        self.lock().map(|t| t.refresh_tokens.len()).unwrap_or(0)
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let mut t = self.lock()?;
        if t.users.iter().any(|u| u.email == new.email) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(Some(user))
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let mut users = self.lock()?.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn search_users(&self, needle: &str) -> anyhow::Result<Vec<User>> {
        let needle = needle.to_lowercase();
        let mut users: Vec<_> = self
            .lock()?
            .users
            .iter()
            .filter(|u| u.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn list_users_by_role(&self, role: Role) -> anyhow::Result<Vec<User>> {
        let mut users: Vec<_> = self
            .lock()?
            .users
            .iter()
            .filter(|u| u.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> anyhow::Result<Option<User>> {
        let mut t = self.lock()?;
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|u| {
            u.role = role;
            u.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut t = self.lock()?;
        if !t.users.iter().any(|u| u.id == id) {
            return Ok(false);
        }

        let released: Vec<Uuid> = t
            .bookings
            .iter()
            .filter(|b| b.customer_id == id)
            .map(|b| b.event_id)
            .collect();
        for event_id in released {
            if let Some(e) = t.events.iter_mut().find(|e| e.id == event_id) {
                e.seats_available += 1;
            }
        }

        let organized: Vec<Uuid> = t
            .events
            .iter()
            .filter(|e| e.organizer_id == id)
            .map(|e| e.id)
            .collect();
        t.bookings
            .retain(|b| b.customer_id != id && !organized.contains(&b.event_id));
        t.events.retain(|e| e.organizer_id != id);
        t.refresh_tokens.retain(|r| r.user_id != id);
        t.users.retain(|u| u.id != id);
        Ok(true)
    }
}

#[async_trait]
impl RefreshTokenRepo for MemoryStore {
    async fn insert_refresh(&self, token: RefreshToken) -> anyhow::Result<()> {
        let mut t = self.lock()?;
        anyhow::ensure!(
            !t.refresh_tokens.iter().any(|r| r.token == token.token),
            "duplicate refresh token"
        );
        t.refresh_tokens.push(token);
        Ok(())
    }

    async fn take_refresh(&self, token: &str, user_id: Uuid) -> anyhow::Result<Option<RefreshToken>> {
        let mut t = self.lock()?;
        let pos = t
            .refresh_tokens
            .iter()
            .position(|r| r.token == token && r.user_id == user_id);
        Ok(pos.map(|i| t.refresh_tokens.remove(i)))
    }

    async fn revoke_refresh(&self, token: &str, user_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.take_refresh(token, user_id).await?.is_some())
    }

    async fn prune_expired_refresh(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<u64> {
        let mut t = self.lock()?;
        let before = t.refresh_tokens.len();
        t.refresh_tokens
            .retain(|r| r.user_id != user_id || !r.is_expired(now));
        Ok((before - t.refresh_tokens.len()) as u64)
    }
}

#[async_trait]
impl EventRepo for MemoryStore {
    async fn create_event(&self, new: NewEvent) -> anyhow::Result<Event> {
        let mut t = self.lock()?;
        anyhow::ensure!(
            t.users.iter().any(|u| u.id == new.organizer_id),
            "organizer does not exist"
        );
        let event = Event {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            date: new.date,
            country: new.country,
            city: new.city,
            location: new.location,
            poster_url: new.poster_url,
            seats_available: new.seats_available,
            organizer_id: new.organizer_id,
            created_at: OffsetDateTime::now_utc(),
        };
        t.events.push(event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> anyhow::Result<Option<Event>> {
        Ok(self.lock()?.events.iter().find(|e| e.id == id).cloned())
    }

    async fn find_event_details(&self, id: Uuid) -> anyhow::Result<Option<EventDetails>> {
        let t = self.lock()?;
        let Some(event) = t.events.iter().find(|e| e.id == id) else {
            return Ok(None);
        };
        let organizer_name = t
            .users
            .iter()
            .find(|u| u.id == event.organizer_id)
            .map(|u| u.name.clone())
            .unwrap_or_default();
        Ok(Some(EventDetails {
            event: event.clone(),
            organizer_name,
        }))
    }

    async fn list_events(&self, filter: &EventFilter) -> anyhow::Result<Vec<Event>> {
        let mut events: Vec<_> = self
            .lock()?
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        let skip = filter.offset.max(0) as usize;
        let take = filter.limit.map_or(usize::MAX, |l| l.max(0) as usize);
        Ok(events.into_iter().skip(skip).take(take).collect())
    }

    async fn list_by_organizer(&self, organizer_id: Uuid) -> anyhow::Result<Vec<Event>> {
        let mut events: Vec<_> = self
            .lock()?
            .events
            .iter()
            .filter(|e| e.organizer_id == organizer_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(events)
    }

    async fn update_event(&self, id: Uuid, patch: &EventPatch) -> anyhow::Result<Option<Event>> {
        let mut t = self.lock()?;
        let Some(event) = t.events.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };
        let mut updated = event.clone();
        patch.apply(&mut updated);
        anyhow::ensure!(updated.seats_available >= 0, "seats_available check violated");
        *event = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_event(&self, id: Uuid) -> anyhow::Result<Option<Event>> {
        let mut t = self.lock()?;
        let Some(pos) = t.events.iter().position(|e| e.id == id) else {
            return Ok(None);
        };
        let event = t.events.remove(pos);
        t.bookings.retain(|b| b.event_id != id);
        Ok(Some(event))
    }
}

#[async_trait]
impl BookingRepo for MemoryStore {
    async fn reserve(&self, customer_id: Uuid, event_id: Uuid) -> anyhow::Result<Reservation> {
        let mut t = self.lock()?;
        let Some(pos) = t.events.iter().position(|e| e.id == event_id) else {
            return Ok(Reservation::EventNotFound);
        };
        if t.events[pos].seats_available <= 0 {
            return Ok(Reservation::SoldOut);
        }
        if t
            .bookings
            .iter()
            .any(|b| b.customer_id == customer_id && b.event_id == event_id)
        {
            return Ok(Reservation::AlreadyBooked);
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            customer_id,
            event_id,
            booked_at: OffsetDateTime::now_utc(),
        };
        t.bookings.push(booking.clone());
        t.events[pos].seats_available -= 1;
        Ok(Reservation::Booked {
            booking,
            event: t.events[pos].clone(),
        })
    }

    async fn cancel_booking(&self, booking_id: Uuid, customer_id: Uuid) -> anyhow::Result<Option<Booking>> {
        let mut t = self.lock()?;
        let Some(pos) = t
            .bookings
            .iter()
            .position(|b| b.id == booking_id && b.customer_id == customer_id)
        else {
            return Ok(None);
        };
        let booking = t.bookings.remove(pos);
        if let Some(e) = t.events.iter_mut().find(|e| e.id == booking.event_id) {
            e.seats_available += 1;
        }
        Ok(Some(booking))
    }

    async fn list_for_customer(&self, customer_id: Uuid) -> anyhow::Result<Vec<BookingDetails>> {
        Ok(self.lock()?.bookings_where(|b| b.customer_id == customer_id))
    }

    async fn list_for_event(&self, event_id: Uuid) -> anyhow::Result<Vec<BookingDetails>> {
        Ok(self.lock()?.bookings_where(|b| b.event_id == event_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::at;

    async fn user(store: &MemoryStore, name: &str, role: Role) -> User {
        store
            .create_user(NewUser {
                name: name.into(),
                email: format!("{name}@example.com"),
                password_hash: "h".into(),
                role,
            })
            .await
            .unwrap()
            .unwrap()
    }

    async fn event(store: &MemoryStore, organizer: Uuid, seats: i32) -> Event {
        store
            .create_event(NewEvent {
                title: "Show".into(),
                description: None,
                date: at(2025, 5, 5, 18),
                country: "Spain".into(),
                city: "Madrid".into(),
                location: None,
                poster_url: None,
                seats_available: seats,
                organizer_id: organizer,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_is_not_inserted() {
        let store = MemoryStore::default();
        user(&store, "ann", Role::Customer).await;
        let again = store
            .create_user(NewUser {
                name: "other".into(),
                email: "ann@example.com".into(),
                password_hash: "h".into(),
                role: Role::Vendor,
            })
            .await
            .unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn deleting_a_customer_gives_seats_back() {
        let store = MemoryStore::default();
        let vendor = user(&store, "vic", Role::Vendor).await;
        let customer = user(&store, "cat", Role::Customer).await;
        let e = event(&store, vendor.id, 2).await;

        assert!(matches!(
            store.reserve(customer.id, e.id).await.unwrap(),
            Reservation::Booked { .. }
        ));
        assert_eq!(store.seats(e.id), Some(1));

        assert!(store.delete_user(customer.id).await.unwrap());
        assert_eq!(store.seats(e.id), Some(2));
        assert_eq!(store.booking_count(), 0);
    }

    #[tokio::test]
    async fn deleting_a_vendor_drops_their_events() {
        let store = MemoryStore::default();
        let vendor = user(&store, "vic", Role::Vendor).await;
        let customer = user(&store, "cat", Role::Customer).await;
        let e = event(&store, vendor.id, 2).await;
        store.reserve(customer.id, e.id).await.unwrap();

        assert!(store.delete_user(vendor.id).await.unwrap());
        assert!(store.find_event(e.id).await.unwrap().is_none());
        assert_eq!(store.booking_count(), 0);
        assert!(!store.delete_user(vendor.id).await.unwrap());
    }
}
