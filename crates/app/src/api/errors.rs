//! API errors.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::api::{ApiResponse, TransportError};

/// Every way a backend call can fail.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No usable response came back.
    #[error("backend unreachable")]
    Transport(#[from] TransportError),

    /// The backend refused the request (4xx other than 401).
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        body: Value,
    },

    /// The credential is missing, expired or invalid.
    #[error("not authorised: {message}")]
    Unauthorized { message: String },

    #[error("backend error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A successful reply did not have the expected shape.
    #[error("unexpected response from {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not encode request for {path}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Classify a non-2xx reply. Returns `None` for a success.
    pub fn from_response(response: &ApiResponse) -> Option<Self> {
        if response.is_success() {
            return None;
        }

        let status = response.status;
        let message = error_message(status, &response.body);

        Some(match status {
            401 => Self::Unauthorized { message },
            400..=499 => Self::Rejected {
                status,
                message,
                body: response.body.clone(),
            },
            _ => Self::Server { status, message },
        })
    }

    /// HTTP status, when a response came back.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Unauthorized { .. } => Some(401),
            Self::Transport(_) | Self::Decode { .. } | Self::Encode { .. } => None,
        }
    }

    /// Raw body of a rejection, e.g. a card decline payload.
    pub const fn body(&self) -> Option<&Value> {
        match self {
            Self::Rejected { body, .. } => Some(body),
            _ => None,
        }
    }

    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            Self::Unauthorized { message } => format!("please log in again ({message})"),
            Self::Transport(error) => format!("backend unreachable: {error}"),
            Self::Server { .. } | Self::Decode { .. } | Self::Encode { .. } => self.to_string(),
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Tries `error`, then `detail`, then DRF field errors flattened to `field: message`, and falls
/// back to the status reason.
pub fn error_message(status: u16, body: &Value) -> String {
    let text = |value: &Value| {
        value
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let found = match body {
        Value::Object(map) => map
            .get("error")
            .and_then(text)
            .or_else(|| map.get("detail").and_then(text))
            .or_else(|| field_errors(map)),
        Value::String(raw) if !raw.trim_start().starts_with('<') => text(body),
        _ => None,
    };

    found.unwrap_or_else(|| status_reason(status))
}

fn field_errors(map: &serde_json::Map<String, Value>) -> Option<String> {
    let parts: Vec<String> = map
        .iter()
        .filter_map(|(field, value)| {
            let messages: Vec<&str> = match value {
                Value::String(message) => vec![message.as_str()],
                Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };

            if messages.is_empty() {
                return None;
            }

            let joined = messages.join(" ");

            Some(if field == "non_field_errors" {
                joined
            } else {
                format!("{field}: {joined}")
            })
        })
        .collect();

    (!parts.is_empty()).then(|| parts.join("; "))
}

fn status_reason(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map_or_else(|| format!("HTTP {status}"), str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_field_wins_over_detail() {
        let body = json!({ "error": "Not enough stock. Available: 2, Requested: 3", "detail": "x" });

        assert_eq!(
            error_message(400, &body),
            "Not enough stock. Available: 2, Requested: 3"
        );
    }

    #[test]
    fn detail_is_used_when_error_is_missing() {
        let body = json!({ "detail": "Authentication credentials were not provided." });

        assert_eq!(
            error_message(401, &body),
            "Authentication credentials were not provided."
        );
    }

    #[test]
    fn field_errors_are_flattened() {
        let body = json!({
            "quantity": ["Ensure this value is greater than or equal to 1."],
            "non_field_errors": ["Invalid input."]
        });

        let message = error_message(400, &body);

        assert!(
            message.contains("quantity: Ensure this value is greater than or equal to 1."),
            "got {message}"
        );
        assert!(message.contains("Invalid input."), "got {message}");
    }

    #[test]
    fn html_and_empty_bodies_fall_back_to_status_reason() {
        assert_eq!(
            error_message(500, &json!("<html>Server Error</html>")),
            "Internal Server Error"
        );
        assert_eq!(error_message(404, &Value::Null), "Not Found");
    }

    #[test]
    fn responses_are_classified_by_status() {
        let unauthorized = ApiError::from_response(&ApiResponse::new(
            401,
            json!({ "error": "Authentication required" }),
        ));
        let rejected = ApiError::from_response(&ApiResponse::new(
            402,
            json!({ "error": "Card declined", "payment_id": 9 }),
        ));
        let server = ApiError::from_response(&ApiResponse::new(503, Value::Null));

        assert!(
            matches!(unauthorized, Some(ApiError::Unauthorized { ref message }) if message == "Authentication required"),
            "got {unauthorized:?}"
        );
        assert!(
            matches!(rejected, Some(ApiError::Rejected { status: 402, ref body, .. }) if body["payment_id"] == 9),
            "got {rejected:?}"
        );
        assert!(
            matches!(server, Some(ApiError::Server { status: 503, .. })),
            "got {server:?}"
        );
        assert!(
            ApiError::from_response(&ApiResponse::new(201, Value::Null)).is_none(),
            "success is not an error"
        );
    }
}
