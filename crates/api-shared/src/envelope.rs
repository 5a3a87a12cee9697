use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Success envelope wrapping every 2xx body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Failure envelope. `errors` is present only for field validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: None,
        }
    }

    pub fn with_errors(message: impl Into<String>, errors: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Some(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_omits_absent_field_errors() {
        let json = serde_json::to_value(ErrorBody::new("Invalid token")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "message": "Invalid token" })
        );

        let mut errors = BTreeMap::new();
        errors.insert("email".to_string(), vec!["Email is required".to_string()]);
        let json = serde_json::to_value(ErrorBody::with_errors("Validation failed", errors)).unwrap();
        assert_eq!(json["errors"]["email"][0], "Email is required");
    }

    #[test]
    fn test_success_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2], "Done")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": true, "message": "Done", "data": [1, 2] })
        );
    }
}
