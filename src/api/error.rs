use serde::Deserialize;
use thiserror::Error;

/// Failure taxonomy for everything the client does against the backend.
///
/// Flows pattern-match on the variant instead of inspecting status codes:
/// only `AuthFailure` invalidates the stored session, and nothing here is
/// fatal - every variant resolves to a user-visible message via
/// [`ApiError::user_message`].
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed or missing input, caught before any network call.
    #[error("{0}")]
    Validation(String),

    /// The backend rejected the credentials, the second factor, or an
    /// already-issued token (HTTP 401).
    #[error("Authentication failed: {}", .detail.as_deref().unwrap_or("rejected by server"))]
    AuthFailure { detail: Option<String> },

    /// Any other non-2xx response.
    #[error("Server error (status {status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Backend { status: u16, detail: Option<String> },

    /// The request could not complete (connect failure, timeout).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A 2xx response whose body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for backend-provided detail strings in messages
const MAX_DETAIL_LENGTH: usize = 300;

/// Error body shape used by the portal backend. Login and registration
/// report under `error`; DRF permission/auth failures use `detail`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl ApiError {
    /// Truncate a backend detail string to avoid flooding the UI or logs.
    /// The cut must land on a char boundary - localized detail strings
    /// carry multi-byte characters and a byte-offset slice would panic.
    fn truncate_detail(detail: &str) -> String {
        if detail.len() <= MAX_DETAIL_LENGTH {
            return detail.to_string();
        }
        let mut cut = MAX_DETAIL_LENGTH;
        while !detail.is_char_boundary(cut) {
            cut -= 1;
        }
        format!(
            "{}... (truncated, {} total bytes)",
            &detail[..cut],
            detail.len()
        )
    }

    /// Extract the backend's detail string from a failure response body.
    fn extract_detail(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        parsed
            .error
            .or(parsed.detail)
            .filter(|d| !d.is_empty())
            .map(|d| Self::truncate_detail(&d))
    }

    /// Classify a non-2xx response by status, carrying the backend's
    /// detail message through when one is present.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let detail = Self::extract_detail(body);
        match status.as_u16() {
            401 => ApiError::AuthFailure { detail },
            status => ApiError::Backend { status, detail },
        }
    }

    /// True for the failures that invalidate the stored session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::AuthFailure { .. })
    }

    /// The message shown to the user. Backend detail is passed through
    /// verbatim when present; network failures get a generic message (the
    /// underlying error goes to the log, not the screen).
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::AuthFailure { detail } => detail
                .clone()
                .unwrap_or_else(|| "Authentication failed. Please sign in again.".to_string()),
            ApiError::Backend { detail, .. } => detail
                .clone()
                .unwrap_or_else(|| "The server could not process the request.".to_string()),
            ApiError::Network(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::Network(_) => {
                "Unable to connect to the server. Check your connection.".to_string()
            }
            ApiError::InvalidResponse(_) => {
                "Unexpected response from the server.".to_string()
            }
        }
    }
}
