use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{LoginRequest, RegisterRequest},
    jwt::{JwtKeys, SignedToken},
    password::{hash_password, password_matches},
    repo_types::{NewUser, RefreshToken, Role, User},
};
use crate::access::{require, Requirement};
use crate::error::AppError;
use crate::state::AppState;

const MAX_NAME_LEN: usize = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trimmed value, or `None` when absent or blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// A signed token pair for one user, with the refresh record already stored.
#[derive(Debug)]
pub struct Session {
    pub user: User,
    pub access: SignedToken,
    pub refresh: SignedToken,
}

#[instrument(skip(st, req))]
pub async fn register(st: &AppState, req: RegisterRequest) -> Result<User, AppError> {
    let (Some(name), Some(email), Some(password), Some(role)) = (
        non_blank(req.name),
        non_blank(req.email),
        req.password.filter(|p| !p.trim().is_empty()),
        non_blank(req.role),
    ) else {
        warn!("register with missing fields");
        return Err(AppError::validation("Missing or invalid fields"));
    };

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(AppError::validation("Invalid email format"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation("Name must be at most 100 characters"));
    }
    let role = match role.as_str() {
        "vendor" => Role::Vendor,
        "customer" => Role::Customer,
        other => {
            warn!(role = other, "register with invalid role");
            return Err(AppError::validation("Role must be vendor or customer"));
        }
    };

    let password_hash = hash_password(&password)?;
    let user = st
        .users
        .create_user(NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .await?
        .ok_or_else(|| AppError::Conflict("Email already exists".into()))?;

    info!(user_id = %user.id, role = %user.role, "user registered");
    Ok(user)
}

#[instrument(skip(st, req))]
pub async fn login(st: &AppState, req: LoginRequest) -> Result<Session, AppError> {
    let password = req.password.filter(|p| !p.trim().is_empty());
    let (Some(email), Some(password)) = (non_blank(req.email), password) else {
        return Err(AppError::validation("Email and password are required"));
    };

    let invalid = || AppError::Authentication("Invalid email or password".into());

    let Some(user) = st.users.find_user_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(invalid());
    };
    if !password_matches(&password, &user.password_hash) {
        warn!(user_id = %user.id, "login wrong password");
        return Err(invalid());
    }

    let session = issue_session(st, user).await?;
    info!(user_id = %session.user.id, "user logged in");
    Ok(session)
}

/// Consumes the presented refresh token and hands out a new pair.
#[instrument(skip_all)]
pub async fn refresh(st: &AppState, presented: Option<String>) -> Result<Session, AppError> {
    let invalid = || AppError::Authentication("Invalid or expired refresh token".into());

    let token = presented.ok_or_else(|| AppError::Authentication("Missing refresh token".into()))?;
    let claims = JwtKeys::from(&st.config.jwt)
        .verify_refresh(&token)
        .map_err(|e| {
            warn!(error = %e, "refresh token rejected");
            invalid()
        })?;

    let record = st
        .refresh_tokens
        .take_refresh(&claims.jti.to_string(), claims.sub)
        .await?;
    match record {
        Some(r) if !r.is_expired(OffsetDateTime::now_utc()) => {}
        Some(_) => {
            warn!(user_id = %claims.sub, "refresh record expired");
            return Err(invalid());
        }
        None => {
            warn!(user_id = %claims.sub, jti = %claims.jti, "refresh token reused or revoked");
            return Err(invalid());
        }
    }

    let Some(user) = st.users.find_user(claims.sub).await? else {
        return Err(invalid());
    };

    let session = issue_session(st, user).await?;
    info!(user_id = %session.user.id, "refresh token rotated");
    Ok(session)
}

/// Drops the stored record behind the presented refresh token. Safe to repeat.
#[instrument(skip(st, presented))]
pub async fn logout(st: &AppState, caller: Uuid, presented: Option<String>) -> Result<(), AppError> {
    let claims = presented.and_then(|t| JwtKeys::from(&st.config.jwt).peek_refresh(&t).ok());
    if let Some(claims) = claims.filter(|c| c.sub == caller) {
        let revoked = st
            .refresh_tokens
            .revoke_refresh(&claims.jti.to_string(), caller)
            .await?;
        info!(user_id = %caller, revoked, "user logged out");
    } else {
        info!(user_id = %caller, "logout without a usable refresh token");
    }
    Ok(())
}

pub async fn current_user(st: &AppState, caller: Uuid) -> Result<User, AppError> {
    require(st, caller, Requirement::Authenticated).await
}

async fn issue_session(st: &AppState, user: User) -> Result<Session, AppError> {
    let keys = JwtKeys::from(&st.config.jwt);
    let access = keys.sign_access(user.id)?;
    let refresh = keys.sign_refresh(user.id)?;
    let now = OffsetDateTime::now_utc();

    let pruned = st.refresh_tokens.prune_expired_refresh(user.id, now).await?;
    if pruned > 0 {
        debug!(user_id = %user.id, pruned, "expired refresh records dropped");
    }
    st.refresh_tokens
        .insert_refresh(RefreshToken {
            token: refresh.claims.jti.to_string(),
            user_id: user.id,
            created_at: now,
            expires_at: refresh.expires_at(),
        })
        .await?;

    Ok(Session {
        user,
        access,
        refresh,
    })
}
