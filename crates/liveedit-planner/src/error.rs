//! Planner error types and transient/fatal classification.

use thiserror::Error;

use crate::retry::RetryClass;

pub type PlannerResult<T> = Result<T, PlannerError>;

/// Errors from the external AI service and its response handling.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("request to AI service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI service returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("no content in AI response")]
    EmptyResponse,

    #[error("failed to parse edit plan: {0}")]
    ParseFailed(String),

    #[error("GEMINI_API_KEY not set")]
    MissingApiKey,

    /// Retry attempts exhausted; the AI service stayed unavailable.
    #[error("AI service unavailable after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<PlannerError>,
    },
}

impl PlannerError {
    pub fn parse_failed(msg: impl Into<String>) -> Self {
        Self::ParseFailed(msg.into())
    }
}

impl RetryClass for PlannerError {
    /// Capacity, rate-limit and timeout failures are worth a delayed
    /// retry; auth and validation failures never are.
    fn is_retryable(&self) -> bool {
        match self {
            PlannerError::Http(e) => e.is_timeout() || e.is_connect(),
            PlannerError::Api { status, body } => match status {
                429 | 503 | 408 => true,
                400 | 401 | 403 | 404 => false,
                _ => {
                    let body = body.to_lowercase();
                    body.contains("unavailable")
                        || body.contains("overloaded")
                        || body.contains("deadline")
                        || body.contains("resource_exhausted")
                }
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_and_rate_limit_are_retryable() {
        for status in [429u16, 503, 408] {
            let err = PlannerError::Api {
                status,
                body: String::new(),
            };
            assert!(err.is_retryable(), "status {} should be retryable", status);
        }
    }

    #[test]
    fn test_auth_and_validation_are_fatal() {
        for status in [400u16, 401, 403, 404] {
            let err = PlannerError::Api {
                status,
                body: String::new(),
            };
            assert!(!err.is_retryable(), "status {} should be fatal", status);
        }
    }

    #[test]
    fn test_body_markers_classify_unknown_statuses() {
        let overloaded = PlannerError::Api {
            status: 500,
            body: "The model is overloaded. Please try again later.".into(),
        };
        assert!(overloaded.is_retryable());

        let internal = PlannerError::Api {
            status: 500,
            body: "internal error".into(),
        };
        assert!(!internal.is_retryable());
    }

    #[test]
    fn test_parse_failures_are_fatal() {
        assert!(!PlannerError::parse_failed("bad json").is_retryable());
        assert!(!PlannerError::EmptyResponse.is_retryable());
    }
}
