//! API Response types
//!
//! Unified response envelope for every HTTP endpoint.

use serde::{Deserialize, Serialize};

/// Unified API response structure
///
/// All API responses follow this format:
/// ```json
/// {
///     "success": true,
///     "data": { ... }
/// }
/// ```
///
/// 错误时 `success` 为 false, `error` 携带可读信息。幂等回放的创建请求
/// 额外带 `idempotent: true`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when a create request was answered from the idempotency record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotent: Option<bool>,
    /// Non-fatal notice attached to an otherwise successful response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            idempotent: None,
            warning: None,
        }
    }

    /// Create a successful response answered from an idempotency record
    pub fn ok_idempotent(data: T) -> Self {
        Self {
            idempotent: Some(true),
            ..Self::ok(data)
        }
    }

    /// Create an error response
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            idempotent: None,
            warning: None,
        }
    }

    /// Attach a warning to this response
    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

impl<T: Serialize> axum::response::IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status = if self.success {
            http::StatusCode::OK
        } else {
            http::StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, axum::Json(self)).into_response()
    }
}
