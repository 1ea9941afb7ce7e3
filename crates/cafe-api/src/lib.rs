pub mod admin;
pub mod auth;
pub mod cafes;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod session;

pub use error::ApiError;
pub use routes::{AppState, router};
pub use session::SessionSettings;
