//! 健康检查路由
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 存活探测 | 无 |
//!
//! # 响应示例
//!
//! ```json
//! { "ok": true }
//! ```

use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::core::ServerState;

/// 健康检查路由 - 公共路由 (无需认证)
pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

/// 存活探测, 不触碰存储
async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}
