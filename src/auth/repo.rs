use anyhow::Context;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{NewUser, RefreshToken, Role, User, UserRow};
use crate::db::{like_pattern, PgStore};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Inserts the user unless the email is taken; `None` means taken.
    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>>;
    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn list_users(&self) -> anyhow::Result<Vec<User>>;
    /// Case-insensitive substring match on the name.
    async fn search_users(&self, needle: &str) -> anyhow::Result<Vec<User>>;
    async fn list_users_by_role(&self, role: Role) -> anyhow::Result<Vec<User>>;
    async fn update_role(&self, id: Uuid, role: Role) -> anyhow::Result<Option<User>>;
    /// Removes the user with its sessions, bookings (giving their seats back)
    /// and organized events. `false` if no such user.
    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[async_trait]
pub trait RefreshTokenRepo: Send + Sync {
    async fn insert_refresh(&self, token: RefreshToken) -> anyhow::Result<()>;
    /// Deletes and returns the record, so a token can be consumed only once.
    async fn take_refresh(&self, token: &str, user_id: Uuid) -> anyhow::Result<Option<RefreshToken>>;
    async fn revoke_refresh(&self, token: &str, user_id: Uuid) -> anyhow::Result<bool>;
    /// Drops the user's records that expired before `now`; returns how many.
    async fn prune_expired_refresh(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<u64>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

fn into_users(rows: Vec<UserRow>) -> anyhow::Result<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

#[async_trait]
impl UserRepo for PgStore {
    async fn create_user(&self, new: NewUser) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.pool)
        .await
        .context("insert user")?;
        row.map(User::try_from).transpose()
    }

    async fn find_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("find user by id")?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("find user by email")?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .context("list users")?;
        into_users(rows)
    }

    async fn search_users(&self, needle: &str) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE name ILIKE $1 ORDER BY name"
        ))
        .bind(like_pattern(needle))
        .fetch_all(&self.pool)
        .await
        .context("search users by name")?;
        into_users(rows)
    }

    async fn list_users_by_role(&self, role: Role) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY created_at DESC"
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await
        .context("list users by role")?;
        into_users(rows)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("update user role")?;
        row.map(User::try_from).transpose()
    }

    async fn delete_user(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await.context("begin tx")?;

        // Blocks reservations for this customer (their booking insert needs a
        // key-share lock on the row) until the seats below are counted.
        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .context("lock user")?;
        if locked.is_none() {
            return Ok(false);
        }

        // Seats held by this user's bookings go back to the events first;
        // the FK cascades then drop bookings, tokens and organized events.
        sqlx::query(
            r#"
            UPDATE events e
               SET seats_available = e.seats_available + b.n
              FROM (SELECT event_id, COUNT(*)::int AS n
                      FROM bookings
                     WHERE customer_id = $1
                     GROUP BY event_id) b
             WHERE e.id = b.event_id
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("release seats of deleted user")?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete user")?
            .rows_affected();

        tx.commit().await.context("commit tx")?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl RefreshTokenRepo for PgStore {
    async fn insert_refresh(&self, token: RefreshToken) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&token.token)
        .bind(token.user_id)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .context("insert refresh token")?;
        Ok(())
    }

    async fn take_refresh(&self, token: &str, user_id: Uuid) -> anyhow::Result<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            DELETE FROM refresh_tokens
             WHERE token = $1 AND user_id = $2
            RETURNING token, user_id, created_at, expires_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("take refresh token")?;
        Ok(row)
    }

    async fn revoke_refresh(&self, token: &str, user_id: Uuid) -> anyhow::Result<bool> {
        let n = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1 AND user_id = $2")
            .bind(token)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("revoke refresh token")?
            .rows_affected();
        Ok(n > 0)
    }

    async fn prune_expired_refresh(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<u64> {
        let n = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND expires_at < $2")
            .bind(user_id)
            .bind(now)
            .execute(&self.pool)
            .await
            .context("prune expired refresh tokens")?
            .rows_affected();
        Ok(n)
    }
}
