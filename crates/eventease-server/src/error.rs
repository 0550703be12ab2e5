use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::qr::QrError;
use crate::token::TokenError;

/// API failure taxonomy. Every variant maps to a stable machine-readable
/// code so the scanning UI can render a precise message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Organizer role required")]
    InsufficientPermissions,

    #[error("You are not the organizer of this event")]
    EventNotAuthorized,

    #[error("Invalid QR token")]
    InvalidQrToken,

    #[error("QR token has expired")]
    QrTokenExpired,

    #[error("Event has not started yet")]
    FutureEvent,

    #[error("Registration is not active")]
    InvalidRegistrationStatus,

    #[error("Attendee is already marked present")]
    AlreadyPresent,

    #[error("Event not found")]
    EventNotFound,

    #[error("Registration not found")]
    RegistrationNotFound,

    #[error("QR encoding failed: {0}")]
    QrEncoding(#[from] QrError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotAuthenticated => "NOT_AUTHENTICATED",
            ApiError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ApiError::EventNotAuthorized => "EVENT_NOT_AUTHORIZED",
            ApiError::InvalidQrToken => "INVALID_QR_TOKEN",
            ApiError::QrTokenExpired => "QR_TOKEN_EXPIRED",
            ApiError::FutureEvent => "FUTURE_EVENT",
            ApiError::InvalidRegistrationStatus => "INVALID_REGISTRATION_STATUS",
            ApiError::AlreadyPresent => "ALREADY_PRESENT",
            ApiError::EventNotFound => "EVENT_NOT_FOUND",
            ApiError::RegistrationNotFound => "REGISTRATION_NOT_FOUND",
            ApiError::QrEncoding(_) => "QR_ENCODING_FAILED",
            ApiError::Database(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientPermissions | ApiError::EventNotAuthorized => {
                StatusCode::FORBIDDEN
            }
            ApiError::InvalidQrToken
            | ApiError::QrTokenExpired
            | ApiError::FutureEvent
            | ApiError::InvalidRegistrationStatus
            | ApiError::AlreadyPresent => StatusCode::BAD_REQUEST,
            ApiError::EventNotFound | ApiError::RegistrationNotFound => StatusCode::NOT_FOUND,
            ApiError::QrEncoding(_) | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::QrTokenExpired,
            _ => ApiError::InvalidQrToken,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details are logged server-side, never sent to the client.
        let message = if status.is_server_error() {
            error!("{self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({
            "error": message,
            "code": self.code(),
        });

        (status, Json(body)).into_response()
    }
}
