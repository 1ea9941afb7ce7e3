use axum::{extract::Request, middleware::Next, response::Response};
use tracing::warn;

use cafe_types::models::{Role, User};

use crate::error::ApiError;
use crate::session::CurrentUser;

/// The one permission check: does `identity` hold (or outrank) `required`?
/// Anonymous callers never pass.
pub fn authorize(identity: Option<&User>, required: Role) -> Result<(), ApiError> {
    match identity {
        Some(user) if user.role.grants(required) => Ok(()),
        _ => Err(ApiError::Forbidden),
    }
}

/// Gate for admin routes. Runs before any extractor of the wrapped handler,
/// so a rejected request never parses its form or touches the store.
/// On success the acting user is available to the handler as `Extension<User>`.
pub async fn require_admin(
    CurrentUser(user): CurrentUser,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(e) = authorize(user.as_ref(), Role::Admin) {
        warn!(
            "Denied {} {} for {}",
            req.method(),
            req.uri().path(),
            user.as_ref().map_or("anonymous", |u| u.username.as_str())
        );
        return Err(e);
    }

    if let Some(user) = user {
        req.extensions_mut().insert(user);
    }
    Ok(next.run(req).await)
}
