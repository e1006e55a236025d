//! Errors raised by the HTTP backends.
//!
//! Tools forward these messages to the client as-is, so every variant
//! names the service it came from.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Transport-level failure (DNS, TLS, connection reset, timeout).
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success HTTP status.
    #[error("{service} API error ({status}): {body}")]
    Status {
        service: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    /// The service answered 2xx but reported a failure in its envelope.
    #[error("{service} API error: {message}")]
    Api {
        service: &'static str,
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("{service} returned an unexpected response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    /// A required setting is missing for this call.
    #[error("{what} is not configured (set {hint})")]
    NotConfigured {
        what: &'static str,
        hint: &'static str,
    },
}

impl ServiceError {
    pub fn transport(service: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { service, source }
    }

    pub fn decode(service: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            service,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_message_includes_service_and_body() {
        let err = ServiceError::Status {
            service: "n8n",
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: "invalid api key".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("n8n API error (401"));
        assert!(msg.contains("invalid api key"));
    }

    #[test]
    fn api_message_forwards_description() {
        let err = ServiceError::Api {
            service: "telegram",
            message: "Bad Request: chat not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "telegram API error: Bad Request: chat not found"
        );
    }

    #[test]
    fn not_configured_names_the_hint() {
        let err = ServiceError::NotConfigured {
            what: "Airtable base",
            hint: "AIRTABLE_BASE_ID or pass base_id",
        };
        assert!(err.to_string().contains("AIRTABLE_BASE_ID"));
    }
}
