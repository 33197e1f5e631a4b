//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 订单接口 (创建、列表、状态、结算、支付方式修正)
//!
//! 除 /health 外所有路由都在 /api/ 前缀下, 由认证中间件保护.

pub mod health;
pub mod orders;

use axum::{Router, middleware};

use crate::core::ServerState;

/// HTTP 请求日志中间件
pub async fn log_request(
    request: http::Request<axum::body::Body>,
    next: middleware::Next,
) -> http::Response<axum::body::Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let status = response.status();

    tracing::info!(target: "http_access", "{} {} {}", method, uri, status);

    response
}

/// Build the Axum router (without state)
pub fn build_app() -> Router<ServerState> {
    Router::<ServerState>::new()
        .merge(health::router())
        .merge(orders::router())
}
