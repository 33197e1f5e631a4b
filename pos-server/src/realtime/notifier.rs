//! 订单事件推送接口
//!
//! 服务层在存储提交后调用; 实现负责吞掉自身的失败 (只记日志),
//! 推送永远不能反过来让请求失败.

use std::sync::Mutex;

use async_trait::async_trait;
use shared::Order;

/// 订单事件出口
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// 新订单已创建 (幂等重放不触发)
    async fn order_created(&self, order: &Order);

    /// 订单已变更 (状态、结算、支付方式修正)
    async fn order_updated(&self, order: &Order);
}

/// 空实现, 用于初始化阶段和不需要推送的场景
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl OrderNotifier for NoopNotifier {
    async fn order_created(&self, _order: &Order) {}

    async fn order_updated(&self, _order: &Order) {}
}

/// 记录型实现, 测试断言事件序列用
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(String, Order)>>,
}

impl RecordingNotifier {
    /// 已记录的 (事件名, 订单快照) 序列
    pub fn events(&self) -> Vec<(String, Order)> {
        self.events.lock().unwrap().clone()
    }

    /// 只取事件名
    pub fn event_names(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl OrderNotifier for RecordingNotifier {
    async fn order_created(&self, order: &Order) {
        self.events
            .lock()
            .unwrap()
            .push(("order:created".to_string(), order.clone()));
    }

    async fn order_updated(&self, order: &Order) {
        self.events
            .lock()
            .unwrap()
            .push(("order:updated".to_string(), order.clone()));
    }
}
