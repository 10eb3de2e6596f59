use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Request used a method the endpoint does not serve
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Invalid request data (missing or unparseable upload field)
    #[error("{message}")]
    BadRequest { message: String },

    /// Upload exceeded the configured size limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// Required storage credentials or folder settings are absent
    #[error("Server configuration error: {message}")]
    Configuration { message: String, hint: String },

    /// The configured folder is unreachable with the current identity
    #[error("Cannot access Google Drive folder")]
    StorageAccess { hint: String },

    /// Token exchange with the storage provider failed
    #[error("Failed to authenticate to Google Drive")]
    Authentication { message: String },

    /// Provider-side failure while creating the remote object
    #[error("Failed to upload file to Google Drive")]
    Upload { detail: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON body returned for every handler-boundary error.
///
/// `stack` is only populated when the server runs in development mode.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Configuration { .. }
            | Error::StorageAccess { .. }
            | Error::Authentication { .. }
            | Error::Upload { .. }
            | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Secondary detail shown to the caller alongside the primary message.
    pub fn details(&self) -> Option<String> {
        match self {
            Error::Configuration { hint, .. } | Error::StorageAccess { hint } => Some(hint.clone()),
            Error::Authentication { message } => Some(message.clone()),
            Error::Upload { detail } => Some(detail.clone()),
            _ => None,
        }
    }

    /// Convert into the JSON error response, optionally attaching the full
    /// error chain when running in development mode.
    pub fn into_error_response(self, development: bool) -> Response {
        match &self {
            Error::Other(_) | Error::Upload { .. } | Error::Authentication { .. } => {
                tracing::error!("Upload relay error: {:#}", self);
            }
            Error::Configuration { .. } | Error::StorageAccess { .. } => {
                tracing::error!("Configuration error: {}", self);
            }
            Error::BadRequest { .. } | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
            Error::MethodNotAllowed => {
                tracing::debug!("Method not allowed");
            }
        }

        let status = self.status_code();
        let stack = if development {
            match &self {
                Error::Other(inner) => Some(format!("{inner:#}")),
                other => Some(format!("{other:?}")),
            }
        } else {
            None
        };

        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
            stack,
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_error_response(false)
    }
}

/// Type alias for relay operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(Error::MethodNotAllowed.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            Error::BadRequest {
                message: "No PDF file provided".into()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::PayloadTooLarge { message: "too big".into() }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            Error::Configuration {
                message: "Missing Google Drive credentials".into(),
                hint: "set the variables".into()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::Upload { detail: "quota".into() }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn details_carry_the_remediation_hint() {
        let error = Error::StorageAccess {
            hint: "share the folder with the service account".into(),
        };
        assert_eq!(error.details().as_deref(), Some("share the folder with the service account"));
        assert!(Error::MethodNotAllowed.details().is_none());
    }
}
