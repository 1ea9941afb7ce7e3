//! Cookie-backed login sessions.
//!
//! The browser holds a signed `session` cookie whose value is a random id;
//! the `sessions` table maps that id to a user until it expires.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha512};
use tracing::{debug, warn};
use uuid::Uuid;

use cafe_types::models::User;

use crate::error::ApiError;
use crate::routes::AppState;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub ttl: Duration,
    pub secure_cookies: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(168),
            secure_cookies: false,
        }
    }
}

/// Stretches the configured secret to the 64 bytes the cookie signer needs.
pub fn cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(&digest[..])
}

/// The logged-in user for this request, if any. Never rejects: a missing,
/// tampered, unknown or expired session all resolve to `None`.
pub struct CurrentUser(pub Option<User>);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let Some(session_id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return Ok(CurrentUser(None));
        };

        let user = state
            .db(move |db| db.get_session_user(&session_id, Utc::now()))
            .await?;
        Ok(CurrentUser(user.map(User::from)))
    }
}

/// Creates a session for `user_id` and returns the jar carrying its cookie.
/// Any session the client already held is ended first.
pub(crate) async fn start_session(
    state: &AppState,
    jar: SignedCookieJar,
    user_id: i64,
) -> Result<SignedCookieJar, ApiError> {
    let jar = end_session(state, jar).await;

    let session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + state.session.ttl;
    let sid = session_id.clone();
    state
        .db(move |db| db.create_session(&sid, user_id, expires_at))
        .await?;
    debug!("Session started for user {}", user_id);

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.session.secure_cookies);
    Ok(jar.add(cookie))
}

/// Drops the client's session row (if any) and expires the cookie.
pub(crate) async fn end_session(state: &AppState, jar: SignedCookieJar) -> SignedCookieJar {
    let Some(session_id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
        return jar;
    };

    if let Err(e) = state.db(move |db| db.delete_session(&session_id)).await {
        warn!("Failed to delete session: {}", e);
    }
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_key_is_deterministic() {
        let a = cookie_key("secret");
        let b = cookie_key("secret");
        let c = cookie_key("other");
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }
}
