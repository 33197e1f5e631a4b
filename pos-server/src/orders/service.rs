//! 订单服务
//!
//! 串联校验、金额计算、持久化和实时推送. 每个请求由处理函数通过
//! `ServerState::order_service()` 构造一个服务实例, 服务本身无状态.
//!
//! # 推送语义
//!
//! 推送发生在存储提交之后; 推送失败只记日志, 绝不让已提交的请求失败.

use std::sync::Arc;

use chrono::Utc;
use shared::{
    Order, OrderCreate, OrderStatus, PaymentComplete, PaymentMethod, PaymentMethodUpdate,
};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::orders::money;
use crate::orders::store::{CreateOutcome, OrderStore, StorageError};
use crate::orders::transitions;
use crate::realtime::OrderNotifier;
use crate::utils::{AppError, AppResult};

/// 单号冲突时的最大尝试次数
const MAX_CREATE_ATTEMPTS: u32 = 3;

/// 创建结果, HTTP 层据此决定 201 还是 200 + idempotent
#[derive(Debug)]
pub struct CreatedOrder {
    pub order: Order,
    /// true 表示 clientRequestId 命中, 返回的是既有订单
    pub idempotent: bool,
}

/// Order application service
pub struct OrderService {
    store: Arc<OrderStore>,
    notifier: Arc<dyn OrderNotifier>,
    max_list: usize,
}

impl OrderService {
    pub fn new(store: Arc<OrderStore>, notifier: Arc<dyn OrderNotifier>, max_list: usize) -> Self {
        Self {
            store,
            notifier,
            max_list,
        }
    }

    /// 创建订单 (clientRequestId 幂等)
    ///
    /// 生效分店: 管理员用请求值 (缺省为无分店); 其他角色锁定在令牌分店,
    /// 仅当令牌不带分店时才退回请求值. 无分店订单是合法的.
    pub async fn create_order(
        &self,
        user: &CurrentUser,
        payload: OrderCreate,
    ) -> AppResult<CreatedOrder> {
        money::validate_items(&payload.items)?;

        let branch_id = Self::effective_branch(user, payload.branch_id.as_deref());
        let totals = money::calculate_totals(&payload.items);

        let order = Order {
            id: Uuid::new_v4().to_string(),
            // 占位, 真实单号由存储在事务内分配
            order_number: 0,
            branch_id,
            client_request_id: payload.client_request_id,
            status: OrderStatus::Pending,
            items: payload.items,
            table: payload.table,
            customer: payload.customer,
            customer_id: payload.customer_id,
            waiter: payload.waiter,
            waiter_user_id: payload.waiter_user_id,
            subtotal: totals.subtotal,
            tax: totals.tax,
            discount: 0.0,
            total: totals.total,
            payment_method: None,
            bank_type: None,
            created_at: Utc::now(),
            prepared_at: None,
            paid_at: None,
        };

        let mut attempt = 0;
        let outcome = loop {
            attempt += 1;
            match self.store.create_order(order.clone()) {
                Ok(outcome) => break outcome,
                Err(StorageError::NumberConflict(scope, number))
                    if attempt < MAX_CREATE_ATTEMPTS =>
                {
                    tracing::warn!(
                        target: "orders",
                        scope = %scope,
                        number,
                        attempt,
                        "order number conflict, retrying"
                    );
                }
                Err(e) => {
                    tracing::error!(target: "orders", error = %e, "order create failed");
                    return Err(AppError::internal("Failed to create order"));
                }
            }
        };

        match outcome {
            CreateOutcome::Created(order) => {
                tracing::info!(
                    target: "orders",
                    order_id = %order.id,
                    order_number = order.order_number,
                    branch = order.branch_id.as_deref().unwrap_or(""),
                    "order created"
                );
                self.notifier.order_created(&order).await;
                Ok(CreatedOrder {
                    order,
                    idempotent: false,
                })
            }
            // 重放不触发推送, 客户端第一次创建时已经收到过
            CreateOutcome::Existing(order) => Ok(CreatedOrder {
                order,
                idempotent: true,
            }),
        }
    }

    /// 状态流转 (进入 prepared / paid 时刷新时间戳)
    pub async fn set_status(&self, order_id: &str, status: OrderStatus) -> AppResult<Order> {
        let now = Utc::now();
        let updated = self
            .store
            .update_order(order_id, |order| {
                transitions::apply_status(order, status, now);
            })
            .map_err(|e| Self::store_error(e, "Failed to update order status"))?;

        self.notifier.order_updated(&updated).await;
        Ok(updated)
    }

    /// 结算: 写入支付方式/折扣, 用存储的 subtotal + tax 重算总额, 置为已支付
    ///
    /// 对订单当前状态不设前置条件, bankType 原样落库 (不限于银行支付).
    pub async fn settle_payment(
        &self,
        order_id: &str,
        payload: PaymentComplete,
    ) -> AppResult<Order> {
        money::validate_discount(payload.discount)?;

        let now = Utc::now();
        let updated = self
            .store
            .update_order(order_id, |order| {
                order.payment_method = Some(payload.payment_method);
                order.bank_type = payload.bank_type.clone();
                order.discount = payload.discount;
                order.total = money::settlement_total(order.subtotal, order.tax, payload.discount);
                transitions::apply_status(order, OrderStatus::Paid, now);
            })
            .map_err(|e| Self::store_error(e, "Failed to complete payment"))?;

        tracing::info!(
            target: "orders",
            order_id = %updated.id,
            method = %payload.payment_method,
            total = updated.total,
            "payment completed"
        );
        self.notifier.order_updated(&updated).await;
        Ok(updated)
    }

    /// 事后修正支付方式, 只动 paymentMethod 和 bankType 两个字段
    ///
    /// bankType: 改为 bank 时取请求值, 缺省保留原值; 改为其他方式时清空.
    pub async fn update_payment_method(
        &self,
        order_id: &str,
        payload: PaymentMethodUpdate,
    ) -> AppResult<Order> {
        let updated = self
            .store
            .update_order(order_id, |order| {
                let bank_type = if payload.payment_method == PaymentMethod::Bank {
                    payload.bank_type.clone().or_else(|| order.bank_type.clone())
                } else {
                    None
                };
                order.payment_method = Some(payload.payment_method);
                order.bank_type = bank_type;
            })
            .map_err(|e| Self::store_error(e, "Failed to update payment method"))?;

        self.notifier.order_updated(&updated).await;
        Ok(updated)
    }

    /// 订单列表
    ///
    /// 可见范围与创建时的生效分店同一条解析链; 解析结果为空则不过滤.
    pub fn list_orders(
        &self,
        user: &CurrentUser,
        requested_branch: Option<&str>,
    ) -> AppResult<Vec<Order>> {
        let scope = Self::effective_branch(user, requested_branch);
        self.store
            .list_orders(scope.as_deref(), self.max_list)
            .map_err(|e| Self::store_error(e, "Failed to fetch orders"))
    }

    /// 生效分店解析: admin -> 请求值; 其他 -> 令牌分店, 退回请求值
    fn effective_branch(user: &CurrentUser, requested: Option<&str>) -> Option<String> {
        if user.is_admin() {
            requested.map(str::to_string)
        } else {
            user.branch_id
                .clone()
                .or_else(|| requested.map(str::to_string))
        }
    }

    /// 存储错误映射: 未找到 -> 404, 其余只暴露端点级失败消息
    fn store_error(err: StorageError, failure_message: &str) -> AppError {
        match err {
            StorageError::OrderNotFound(_) => AppError::not_found("Order not found"),
            other => {
                tracing::error!(target: "orders", error = %other, "store operation failed");
                AppError::internal(failure_message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::RecordingNotifier;
    use shared::{OrderItem, Role};

    fn service() -> (OrderService, Arc<RecordingNotifier>) {
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let service = OrderService::new(store, notifier.clone(), 500);
        (service, notifier)
    }

    fn admin() -> CurrentUser {
        CurrentUser {
            id: "u-admin".to_string(),
            role: Role::Admin,
            branch_id: None,
            name: "Admin".to_string(),
        }
    }

    fn cashier(branch: Option<&str>) -> CurrentUser {
        CurrentUser {
            id: "u-cashier".to_string(),
            role: Role::Cashier,
            branch_id: branch.map(str::to_string),
            name: "Cashier".to_string(),
        }
    }

    fn create_payload(items: Vec<OrderItem>) -> OrderCreate {
        OrderCreate {
            items,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_computes_totals_and_notifies() {
        let (service, notifier) = service();
        let payload = create_payload(vec![OrderItem::new("Latte", 12.50, 2)]);

        let created = service.create_order(&admin(), payload).await.unwrap();
        assert!(!created.idempotent);

        let order = created.order;
        assert_eq!(order.order_number, 1);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(money::money_eq(order.subtotal, 25.0));
        assert!(money::money_eq(order.tax, 2.5));
        assert!(money::money_eq(order.total, 27.5));
        assert!(money::money_eq(order.discount, 0.0));

        assert_eq!(notifier.event_names(), vec!["order:created"]);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_items() {
        let (service, notifier) = service();

        let err = service
            .create_order(&admin(), create_payload(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = service
            .create_order(&admin(), create_payload(vec![OrderItem::new("Bad", 1.0, 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(notifier.event_names().is_empty());
    }

    #[tokio::test]
    async fn test_idempotent_replay_skips_notification() {
        let (service, notifier) = service();
        let mut payload = create_payload(vec![OrderItem::new("Latte", 4.5, 1)]);
        payload.client_request_id = Some("req-1".to_string());

        let first = service.create_order(&admin(), payload.clone()).await.unwrap();
        let replay = service.create_order(&admin(), payload).await.unwrap();

        assert!(!first.idempotent);
        assert!(replay.idempotent);
        assert_eq!(replay.order.id, first.order.id);
        assert_eq!(replay.order.order_number, first.order.order_number);

        // 重放不再推送
        assert_eq!(notifier.event_names(), vec!["order:created"]);
    }

    #[tokio::test]
    async fn test_effective_branch_rules() {
        let (service, _) = service();

        // 管理员随请求走
        let mut payload = create_payload(vec![OrderItem::new("A", 1.0, 1)]);
        payload.branch_id = Some("b9".to_string());
        let order = service.create_order(&admin(), payload).await.unwrap().order;
        assert_eq!(order.branch_id.as_deref(), Some("b9"));

        // 管理员不带分店 -> 无分店订单
        let payload = create_payload(vec![OrderItem::new("A", 1.0, 1)]);
        let order = service.create_order(&admin(), payload).await.unwrap().order;
        assert_eq!(order.branch_id, None);

        // 非管理员锁定在令牌分店, 请求值被忽略
        let mut payload = create_payload(vec![OrderItem::new("A", 1.0, 1)]);
        payload.branch_id = Some("b9".to_string());
        let order = service
            .create_order(&cashier(Some("b1")), payload)
            .await
            .unwrap()
            .order;
        assert_eq!(order.branch_id.as_deref(), Some("b1"));

        // 无分店令牌才退回请求值
        let mut payload = create_payload(vec![OrderItem::new("A", 1.0, 1)]);
        payload.branch_id = Some("b9".to_string());
        let order = service
            .create_order(&cashier(None), payload)
            .await
            .unwrap()
            .order;
        assert_eq!(order.branch_id.as_deref(), Some("b9"));
    }

    #[tokio::test]
    async fn test_set_status_stamps_timestamps() {
        let (service, notifier) = service();
        let order = service
            .create_order(&admin(), create_payload(vec![OrderItem::new("A", 1.0, 1)]))
            .await
            .unwrap()
            .order;

        let updated = service
            .set_status(&order.id, OrderStatus::Prepared)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Prepared);
        assert!(updated.prepared_at.is_some());
        assert!(updated.paid_at.is_none());

        let updated = service.set_status(&order.id, OrderStatus::Paid).await.unwrap();
        assert!(updated.paid_at.is_some());
        // 早先的 preparedAt 不被清除
        assert!(updated.prepared_at.is_some());

        assert_eq!(
            notifier.event_names(),
            vec!["order:created", "order:updated", "order:updated"]
        );
    }

    #[tokio::test]
    async fn test_set_status_missing_order_is_not_found() {
        let (service, _) = service();
        let err = service
            .set_status("missing", OrderStatus::Paid)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_settle_payment_recomputes_from_stored_totals() {
        let (service, _) = service();
        let order = service
            .create_order(&admin(), create_payload(vec![OrderItem::new("Set", 100.0, 1)]))
            .await
            .unwrap()
            .order;
        assert!(money::money_eq(order.total, 110.0));

        let settled = service
            .settle_payment(
                &order.id,
                PaymentComplete {
                    payment_method: PaymentMethod::Cash,
                    discount: 15.0,
                    bank_type: Some("BBVA".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(settled.status, OrderStatus::Paid);
        assert!(settled.paid_at.is_some());
        assert_eq!(settled.payment_method, Some(PaymentMethod::Cash));
        // 结算时 bankType 原样落库, 即便不是银行支付
        assert_eq!(settled.bank_type.as_deref(), Some("BBVA"));
        assert!(money::money_eq(settled.discount, 15.0));
        assert!(money::money_eq(settled.total, 95.0));
        // subtotal / tax 保持创建时的值
        assert!(money::money_eq(settled.subtotal, 100.0));
        assert!(money::money_eq(settled.tax, 10.0));
    }

    #[tokio::test]
    async fn test_settle_payment_rejects_negative_discount() {
        let (service, _) = service();
        let order = service
            .create_order(&admin(), create_payload(vec![OrderItem::new("A", 1.0, 1)]))
            .await
            .unwrap()
            .order;

        let err = service
            .settle_payment(
                &order.id,
                PaymentComplete {
                    payment_method: PaymentMethod::Cash,
                    discount: -1.0,
                    bank_type: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_payment_method_correction_bank_type_rules() {
        let (service, _) = service();
        let order = service
            .create_order(&admin(), create_payload(vec![OrderItem::new("A", 10.0, 1)]))
            .await
            .unwrap()
            .order;

        service
            .settle_payment(
                &order.id,
                PaymentComplete {
                    payment_method: PaymentMethod::Bank,
                    discount: 0.0,
                    bank_type: Some("Santander".to_string()),
                },
            )
            .await
            .unwrap();

        // bank -> bank, 不带 bankType: 保留原值
        let updated = service
            .update_payment_method(
                &order.id,
                PaymentMethodUpdate {
                    payment_method: PaymentMethod::Bank,
                    bank_type: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bank_type.as_deref(), Some("Santander"));

        // bank -> bank, 带新值: 覆盖
        let updated = service
            .update_payment_method(
                &order.id,
                PaymentMethodUpdate {
                    payment_method: PaymentMethod::Bank,
                    bank_type: Some("BBVA".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bank_type.as_deref(), Some("BBVA"));

        // bank -> card: 清空 bankType, 其余字段不动
        let updated = service
            .update_payment_method(
                &order.id,
                PaymentMethodUpdate {
                    payment_method: PaymentMethod::Card,
                    bank_type: Some("ignored".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.payment_method, Some(PaymentMethod::Card));
        assert_eq!(updated.bank_type, None);
        assert_eq!(updated.status, OrderStatus::Paid);
        assert!(money::money_eq(updated.total, 11.0));
    }

    #[tokio::test]
    async fn test_list_orders_scoping() {
        let (service, _) = service();

        let mut payload = create_payload(vec![OrderItem::new("A", 1.0, 1)]);
        payload.branch_id = Some("b1".to_string());
        service.create_order(&admin(), payload).await.unwrap();

        let mut payload = create_payload(vec![OrderItem::new("B", 1.0, 1)]);
        payload.branch_id = Some("b2".to_string());
        service.create_order(&admin(), payload).await.unwrap();

        service
            .create_order(&admin(), create_payload(vec![OrderItem::new("C", 1.0, 1)]))
            .await
            .unwrap();

        // 管理员不带过滤: 全部 (含无分店单)
        let all = service.list_orders(&admin(), None).unwrap();
        assert_eq!(all.len(), 3);

        // 管理员带过滤
        let b1 = service.list_orders(&admin(), Some("b1")).unwrap();
        assert_eq!(b1.len(), 1);
        assert_eq!(b1[0].branch_id.as_deref(), Some("b1"));

        // 非管理员锁定在自己分店, 请求过滤被忽略
        let scoped = service.list_orders(&cashier(Some("b2")), Some("b1")).unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].branch_id.as_deref(), Some("b2"));

        // 无分店令牌退回请求值
        let fallback = service.list_orders(&cashier(None), Some("b1")).unwrap();
        assert_eq!(fallback.len(), 1);

        // 无分店令牌且无请求值: 不过滤
        let unfiltered = service.list_orders(&cashier(None), None).unwrap();
        assert_eq!(unfiltered.len(), 3);
    }

    #[tokio::test]
    async fn test_list_orders_honors_cap() {
        let store = Arc::new(OrderStore::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let service = OrderService::new(store, notifier, 2);

        for _ in 0..3 {
            service
                .create_order(&admin(), create_payload(vec![OrderItem::new("A", 1.0, 1)]))
                .await
                .unwrap();
        }

        let listed = service.list_orders(&admin(), None).unwrap();
        assert_eq!(listed.len(), 2);
    }
}
