//! Normalized error contract for API calls.

use reqwest::StatusCode;

use crate::models::ErrorBody;

/// Error raised by every [`ApiClient`](super::ApiClient) operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Http {
        message: String,
        status: StatusCode,
        /// Parsed error body, when the backend sent one.
        payload: Option<ErrorBody>,
    },

    /// A 2xx body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Build the error for a non-2xx response from its raw body.
    ///
    /// The backend's `error` field wins; otherwise the message is synthesized
    /// from the status line.
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        let payload = serde_json::from_str::<ErrorBody>(body).ok();
        let message = payload
            .as_ref()
            .map(|p| p.error.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown Status")
                )
            });
        Self::Http {
            message,
            status,
            payload,
        }
    }

    /// HTTP status, when the backend answered.
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    /// Backend error body, when one was sent and parsed.
    pub const fn payload(&self) -> Option<&ErrorBody> {
        match self {
            Self::Http { payload, .. } => payload.as_ref(),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }

    /// Whether the backend rejected the credentials. The session has already
    /// been cleared when this is returned from an authenticated call.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
