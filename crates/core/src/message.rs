//! Message-only response bodies.

use serde::{Deserialize, Serialize};

/// Success body for operations with nothing else to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of every error response.
///
/// `stack` carries diagnostic detail and is only populated outside
/// production.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_omits_missing_stack() {
        let body = ErrorBody {
            message: "Order not found".to_owned(),
            stack: None,
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"message":"Order not found"}"#
        );
    }

    #[test]
    fn test_error_body_parses_null_stack() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"message":"boom","stack":null}"#).unwrap();
        assert_eq!(body.stack, None);
    }
}
