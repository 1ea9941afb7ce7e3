use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use validator::ValidationErrors;

use cafe_db::is_unique_violation;
use cafe_types::api::ErrorResponse;

/// Everything a handler can fail with. Converted to a JSON body of the form
/// `{"error": "..."}` at the handler boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Username already exists. Please choose a different username.")]
    DuplicateUsername,

    #[error("A cafe with that name already exists. Please choose a different name.")]
    DuplicateName,

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn cafe_not_found(id: i64) -> Self {
        ApiError::NotFound(format!("Cafe with ID {id} not found in the database."))
    }

    pub fn user_not_found(id: i64) -> Self {
        ApiError::NotFound(format!("User with ID {id} not found in the database."))
    }

    /// Swaps a UNIQUE violation from the store for `conflict`. Used where a
    /// pre-insert existence check can lose a race to a concurrent insert.
    pub fn or_conflict(self, conflict: ApiError) -> Self {
        match self {
            ApiError::Internal(e) if is_unique_violation(&e) => conflict,
            other => other,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::DuplicateUsername | ApiError::DuplicateName | ApiError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reasons: Vec<String> = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(msg) => msg.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect();
                format!("{}: {}", field, reasons.join(", "))
            })
            .collect();
        fields.sort();
        ApiError::Validation(fields.join("; "))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(e) = &self {
            error!("Internal error: {:#}", e);
        }

        let status = self.status_code();
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
