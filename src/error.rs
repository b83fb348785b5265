//! Domain errors surfaced by the listing pipeline and HTTP handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListingError {
    /// No profile record exists for the requesting user.
    #[error("No {user_type} user found for {email}")]
    UserNotFound { user_type: String, email: String },

    /// The oracle call failed or its answer was not a JSON array of strings.
    #[error("Relevance oracle error: {0}")]
    RelevanceOracle(String),

    /// Only ever logged by the filter engine; a bad date query matches nothing.
    #[error("Invalid date format '{0}'. Please use MM-DD-YYYY.")]
    InvalidDateFormat(String),

    #[error("Missing required fields")]
    MissingFields(Vec<&'static str>),

    /// Store or messaging failure.
    #[error("{0}")]
    Downstream(String),
}

pub type Result<T, E = ListingError> = std::result::Result<T, E>;

impl ListingError {
    pub fn downstream(err: impl std::fmt::Display) -> Self {
        Self::Downstream(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields(_) => StatusCode::BAD_REQUEST,
            Self::UserNotFound { .. }
            | Self::RelevanceOracle(_)
            | Self::InvalidDateFormat(_)
            | Self::Downstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ListingError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::MissingFields(fields) => {
                tracing::warn!(?fields, "Rejected request with missing fields");
            }
            other => {
                tracing::error!(error = %other, "Request failed");
            }
        }
        (status, self.to_string()).into_response()
    }
}
