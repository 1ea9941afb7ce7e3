use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    middleware,
    routing::get,
};
use axum_extra::extract::cookie::Key;
use tracing::error;

use cafe_db::Database;

use crate::error::ApiError;
use crate::middleware::require_admin;
use crate::session::{SessionSettings, cookie_key};
use crate::{admin, auth, cafes};

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub cookie_key: Key,
    pub session: SessionSettings,
}

impl AppState {
    pub fn new(db: Database, secret_key: &str, session: SessionSettings) -> Self {
        Self {
            db: Arc::new(db),
            cookie_key: cookie_key(secret_key),
            session,
        }
    }

    /// Runs blocking DB work off the async runtime.
    pub(crate) async fn db<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(e.into())
            })?
            .map_err(ApiError::from)
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Every route except the static favicon, which the server binary mounts.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(cafes::list_cafes))
        .route("/cafe/{cafe_id}", get(cafes::get_cafe))
        .route("/random", get(cafes::random_cafe))
        .route("/search", get(cafes::search_page).post(cafes::search_by_location))
        .route("/choose-cafe", get(cafes::choose_cafe))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout));

    let admin_routes = Router::new()
        .route("/add", get(admin::add_cafe_page).post(admin::add_cafe))
        .route(
            "/update-price/{cafe_id}",
            get(admin::update_price_page)
                .post(admin::update_price)
                .patch(admin::update_price),
        )
        .route("/delete-cafe", get(admin::delete_cafe_page).post(admin::delete_cafe))
        .route("/delete-user", get(admin::delete_user_page).post(admin::delete_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .with_state(state)
}
