//! 统一错误处理
//!
//! 提供应用级错误类型 [`AppError`]，其 Display 即对外错误消息，
//! 响应体统一为 `{"success": false, "error": "..."}` 信封。
//!
//! # 错误分类
//!
//! | 变体 | 状态码 | 说明 |
//! |------|--------|------|
//! | Unauthorized | 401 | 缺失或无效的令牌 |
//! | Forbidden | 403 | 角色无权执行操作 |
//! | NotFound | 404 | 资源不存在 |
//! | Validation | 400 | 请求体验证失败 |
//! | Internal | 500 | 存储或内部故障 (仅暴露端点级消息) |
//!
//! # 使用示例
//!
//! ```ignore
//! // 返回错误
//! Err(AppError::not_found("Order not found"))
//!
//! // 返回成功响应
//! Ok(Json(ApiResponse::ok(data)))
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::ApiResponse;
use tracing::error;

/// 应用错误枚举
///
/// 变体携带的字符串就是对外的 `error` 字段内容。
/// 内部故障的细节在产生处记录日志，不随响应暴露。
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    /// 未认证 (401)
    Unauthorized(String),

    #[error("Forbidden")]
    /// 无权限 (403)
    Forbidden,

    #[error("{0}")]
    /// 资源不存在 (404)
    NotFound(String),

    #[error("{0}")]
    /// 验证失败 (400)
    Validation(String),

    #[error("{0}")]
    /// 内部错误 (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "Internal error occurred");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ApiResponse::<()>::err(self.to_string()));
        (status, body).into_response()
    }
}

// ========== Helper Constructors ==========

impl AppError {
    /// 未认证错误 (401)
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// 资源不存在错误 (404)
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// 验证失败错误 (400)
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// 内部错误 (500)，`msg` 为端点级对外消息
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
