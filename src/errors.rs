use axum::http::StatusCode;
use thiserror::Error;

/// Failures on the inbound side: host payloads and page regions.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("malformed contact payload: {0}")]
    MalformedInput(String),
    #[error("invalid case note payload: {0}")]
    InvalidCaseNote(String),
    #[error("page template has no `{0}` region")]
    MissingElement(&'static str),
}

/// Failures on the outbound host-script path. None of these reach the caller
/// of [`crate::bridge::HostBridge`].
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("no host integration available")]
    HostUnavailable,
    #[error("failed to serialize script parameters: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("host callback request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("host rejected script call with status {0}")]
    Rejected(u16),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::MissingElement(_) => Self::internal(err),
            _ => Self::bad_request(err.to_string()),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
