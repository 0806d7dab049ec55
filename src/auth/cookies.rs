use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::OffsetDateTime;

use super::jwt::SignedToken;

pub const ACCESS_COOKIE: &str = "access_token_cookie";
pub const REFRESH_COOKIE: &str = "refresh_token_cookie";

fn session_cookie(name: &'static str, token: &SignedToken, secure: bool) -> Cookie<'static> {
    let max_age = token.expires_at() - OffsetDateTime::now_utc();
    Cookie::build((name, token.token.clone()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .max_age(max_age)
        .build()
}

/// Adds the access/refresh pair to the jar, replacing any previous session.
pub fn set_session(
    jar: CookieJar,
    access: &SignedToken,
    refresh: &SignedToken,
    secure: bool,
) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, access, secure))
        .add(session_cookie(REFRESH_COOKIE, refresh, secure))
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}

pub fn refresh_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE).map(|c| c.value().to_owned())
}
