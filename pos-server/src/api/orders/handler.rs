//! 订单 API 处理函数
//!
//! 请求体统一用 `Result<Json<T>, JsonRejection>` 接收, 反序列化失败映射为
//! 信封包装的 400, 而不是 axum 默认的纯文本响应.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use shared::{
    ApiResponse, Order, OrderCreate, OrderStatusUpdate, PaymentComplete, PaymentMethodUpdate,
    Role,
};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::security_log;
use crate::utils::{AppError, AppResult};

/// 列表查询参数
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub branch_id: Option<String>,
}

/// GET /api/orders - 订单列表
pub async fn list_orders(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let service = state.order_service();
    let orders = service.list_orders(&user, query.branch_id.as_deref())?;
    Ok(Json(ApiResponse::ok(orders)))
}

/// POST /api/orders - 创建订单
///
/// 新建返回 201; clientRequestId 命中返回 200 + `idempotent: true`.
pub async fn create_order(
    State(state): State<ServerState>,
    user: CurrentUser,
    payload: Result<Json<OrderCreate>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    let service = state.order_service();
    let created = service.create_order(&user, payload).await?;

    let response = if created.idempotent {
        (
            StatusCode::OK,
            Json(ApiResponse::ok_idempotent(created.order)),
        )
            .into_response()
    } else {
        (StatusCode::CREATED, Json(ApiResponse::ok(created.order))).into_response()
    };
    Ok(response)
}

/// PUT /api/orders/{id}/status - 状态流转
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<OrderStatusUpdate>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let Json(payload) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    let service = state.order_service();
    let order = service.set_status(&id, payload.status).await?;
    Ok(Json(ApiResponse::ok(order)))
}

/// POST /api/orders/{id}/payment - 结算
pub async fn complete_payment(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    payload: Result<Json<PaymentComplete>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let Json(payload) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    let service = state.order_service();
    let order = service.settle_payment(&id, payload).await?;
    Ok(Json(ApiResponse::ok(order)))
}

/// PUT /api/orders/{id}/payment-method - 支付方式修正
///
/// 仅 admin / cashier; 角色检查先于请求体校验 (越权统一拿 403).
pub async fn update_payment_method(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    payload: Result<Json<PaymentMethodUpdate>, JsonRejection>,
) -> AppResult<Json<ApiResponse<Order>>> {
    if !user.has_any_role(&[Role::Admin, Role::Cashier]) {
        security_log!(
            "WARN",
            "payment_method_forbidden",
            user_id = user.id.as_str(),
            role = user.role.as_str(),
            order_id = id.as_str()
        );
        return Err(AppError::Forbidden);
    }

    let Json(payload) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    let service = state.order_service();
    let order = service.update_payment_method(&id, payload).await?;
    Ok(Json(ApiResponse::ok(order)))
}
