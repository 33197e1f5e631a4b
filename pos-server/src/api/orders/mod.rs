//! 订单 API
//!
//! # 路由列表
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders | GET | 订单列表 (角色决定分店范围) |
//! | /api/orders | POST | 创建订单 (clientRequestId 幂等) |
//! | /api/orders/{id}/status | PUT | 状态流转 |
//! | /api/orders/{id}/payment | POST | 结算 |
//! | /api/orders/{id}/payment-method | PUT | 支付方式修正 (admin / cashier) |
//!
//! 所有响应使用统一信封 `{ success, data?, error?, idempotent? }`.

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list_orders).post(handler::create_order))
        .route("/{id}/status", put(handler::update_status))
        .route("/{id}/payment", post(handler::complete_payment))
        .route("/{id}/payment-method", put(handler::update_payment_method))
}
