use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{Query, State},
    response::Redirect,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{info, warn};

use cafe_types::forms::{FormDefinition, FormSpec, LoginForm, RegisterForm};
use cafe_types::models::Role;

use crate::error::ApiError;
use crate::extractors::ValidatedForm;
use crate::routes::AppState;
use crate::session::{end_session, start_session};

/// Argon2id with a fresh random salt, encoded as a PHC string.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is unreadable: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Verified against when the username is unknown, so a miss costs the same
/// Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("cafe-directory-dummy").ok());

/// Checks `password` against the stored hash, or against `DUMMY_HASH` when
/// there is no such user. Blocking; call from `spawn_blocking`.
fn check_credentials(stored_hash: Option<&str>, password: &str) -> bool {
    match stored_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                verify_password(password, dummy);
            }
            false
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

/// Only same-site paths are honoured as a post-login target.
fn redirect_target(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => "/",
    }
}

pub async fn register_page() -> Json<FormSpec> {
    Json(RegisterForm::describe("/register"))
}

pub async fn register(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    ValidatedForm(form): ValidatedForm<RegisterForm>,
) -> Result<(SignedCookieJar, Redirect), ApiError> {
    let username = form.username;

    let lookup = username.clone();
    if state
        .db(move |db| db.get_user_by_username(&lookup))
        .await?
        .is_some()
    {
        return Err(ApiError::DuplicateUsername);
    }

    let name = username.clone();
    let password = form.password;
    let user_id = state
        .db(move |db| {
            let password_hash = hash_password(&password)?;
            db.create_user(&name, &password_hash, Role::User)
        })
        .await
        .map_err(|e| e.or_conflict(ApiError::DuplicateUsername))?;
    info!("Registered user {} (id {})", username, user_id);

    let jar = start_session(&state, jar, user_id).await?;
    Ok((jar, Redirect::to("/")))
}

pub async fn login_page() -> Json<FormSpec> {
    Json(LoginForm::describe("/login"))
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
    jar: SignedCookieJar,
    ValidatedForm(form): ValidatedForm<LoginForm>,
) -> Result<(SignedCookieJar, Redirect), ApiError> {
    let lookup = form.username.clone();
    let password = form.password;
    let user = state
        .db(move |db| {
            let user = db.get_user_by_username(&lookup)?;
            let ok = check_credentials(user.as_ref().map(|u| u.password.as_str()), &password);
            Ok(user.filter(|_| ok))
        })
        .await?;

    let Some(user) = user else {
        warn!("Failed login for {}", form.username);
        return Err(ApiError::InvalidCredentials);
    };

    let jar = start_session(&state, jar, user.id).await?;
    info!("User {} logged in", user.username);

    Ok((jar, Redirect::to(redirect_target(query.next.as_deref()))))
}

pub async fn logout(State(state): State<AppState>, jar: SignedCookieJar) -> (SignedCookieJar, Redirect) {
    let jar = end_session(&state, jar).await;
    info!("Session ended");
    (jar, Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted_and_verifies() {
        let a = hash_password("123").unwrap();
        let b = hash_password("123").unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("123"));
        assert!(verify_password("123", &a));
        assert!(!verify_password("abc", &a));
    }

    #[test]
    fn test_unknown_user_never_passes() {
        assert!(DUMMY_HASH.is_some());
        assert!(!check_credentials(None, "cafe-directory-dummy"));
        assert!(!check_credentials(None, ""));

        let hash = hash_password("latte").unwrap();
        assert!(check_credentials(Some(&hash), "latte"));
        assert!(!check_credentials(Some(&hash), "mocha"));
    }

    #[test]
    fn test_plaintext_never_verifies() {
        assert!(!verify_password("123", "123"));
    }

    #[test]
    fn test_redirect_target() {
        assert_eq!(redirect_target(None), "/");
        assert_eq!(redirect_target(Some("/add")), "/add");
        assert_eq!(redirect_target(Some("//evil.example")), "/");
        assert_eq!(redirect_target(Some("https://evil.example")), "/");
        assert_eq!(redirect_target(Some("/\\evil.example")), "/");
    }
}
