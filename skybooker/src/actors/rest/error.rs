use std::io;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{api, doc::ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {message}: {cause}")]
    IO { message: String, cause: io::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    ListFlights,
    CreateFlight,
    GetFlight,
    UpdateFlight,
    DeleteFlight,
    ListBookings,
    CreateBooking,
    Status,
}

impl Operation {
    fn failure_message(self) -> &'static str {
        match self {
            Self::ListFlights => "Failed to fetch flights",
            Self::CreateFlight => "Failed to create flight",
            Self::GetFlight => "Failed to fetch flight",
            Self::UpdateFlight => "Failed to update flight",
            Self::DeleteFlight => "Failed to delete flight",
            Self::ListBookings => "Failed to fetch bookings",
            Self::CreateBooking => "Failed to create booking",
            Self::Status => "Failed to fetch status",
        }
    }
}

/// A failed operation, rendered as `{"error": "<message>"}`.
///
/// Validation messages are returned as they are; not-found and storage
/// failures get a generic message and are logged with their cause.
#[derive(Debug)]
pub(crate) struct ApiFailure {
    operation: Operation,
    error: api::Error,
}

impl ApiFailure {
    pub(crate) fn new(operation: Operation, error: impl Into<api::Error>) -> Self {
        Self {
            operation,
            error: error.into(),
        }
    }

    pub(crate) fn rejected_body(operation: Operation, rejection: JsonRejection) -> Self {
        Self::new(
            operation,
            ValidationError::MalformedBody(rejection.body_text()),
        )
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let Self { operation, error } = self;
        let (status, message) = match &error {
            api::Error::Validation(e) => {
                warn!("{operation:?} rejected: {e}");
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            api::Error::NotFound { .. } => {
                info!("{operation:?}: {error}");
                (StatusCode::NOT_FOUND, "Flight not found".to_string())
            }
            api::Error::StorageUnavailable(e) => {
                error!("{operation:?} failed: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    operation.failure_message().to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
