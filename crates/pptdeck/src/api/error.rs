use serde::Deserialize;
use thiserror::Error;

use crate::http::TransportError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// No HTTP response at all.
    #[error(transparent)]
    Network(#[from] TransportError),

    #[error("HTTP {status}: {}", status_detail(.code, .message))]
    Status {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    /// A refresh was attempted after a 401 and did not succeed.
    #[error("session expired, please log in again")]
    SessionExpired,

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl ApiError {
    /// Builds a status error from a non-2xx response body of the form
    /// `{"code": "...", "message": "..."}`.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        Self::Status {
            status,
            code: parsed.code,
            message: parsed.message,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Status { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn is_auth(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_validation(&self) -> bool {
        self.status() == Some(400)
    }

    /// Message suitable for showing to a person: the server's message when
    /// present, otherwise a description of the error code.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } if !message.is_empty() => message.clone(),
            Self::Status { code: Some(code), .. } => message_for_code(code).to_string(),
            other => other.to_string(),
        }
    }
}

fn status_detail<'a>(code: &'a Option<String>, message: &'a Option<String>) -> &'a str {
    message
        .as_deref()
        .or(code.as_deref())
        .unwrap_or("request failed")
}

pub fn message_for_code(code: &str) -> &'static str {
    match code {
        "invalid_request" => "Invalid request. Please check your input.",
        "invalid_captcha" => "Invalid or expired captcha. Please try again.",
        "invalid_code" => "Invalid or expired verification code.",
        "email_exists" => "This email is already registered.",
        "invalid_credentials" => "Invalid email or password.",
        "session_not_found" => "Session expired. Please login again.",
        "rate_limited" => "Too many requests. Please try again later.",
        "too_many_attempts" => "Too many attempts. Please request a new code.",
        "server_error" => "Server error. Please try again later.",
        _ => "An error occurred",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_wins() {
        let err = ApiError::from_response(
            409,
            r#"{"code":"email_exists","message":"email already registered"}"#,
        );
        assert_eq!(err.user_message(), "email already registered");
        assert_eq!(err.code(), Some("email_exists"));
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_code_mapping_when_message_missing() {
        let err = ApiError::from_response(429, r#"{"code":"rate_limited"}"#);
        assert_eq!(
            err.user_message(),
            "Too many requests. Please try again later."
        );
        let err = ApiError::from_response(418, r#"{"code":"teapot"}"#);
        assert_eq!(err.user_message(), "An error occurred");
    }

    #[test]
    fn test_classification() {
        assert!(ApiError::from_response(401, "").is_auth());
        assert!(ApiError::SessionExpired.is_auth());
        assert!(ApiError::from_response(400, "not json").is_validation());
        let network = ApiError::Network(TransportError::Network {
            url: "http://x".into(),
            message: "refused".into(),
        });
        assert!(network.is_network());
        assert!(network.user_message().contains("refused"));
    }
}
