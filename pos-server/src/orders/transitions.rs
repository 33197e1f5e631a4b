//! 订单状态流转
//!
//! 状态机是宽松的: 六个状态之间任意切换, 原地重入也允许.
//! 唯一的副作用是时间戳: 进入 prepared / paid 时刷新对应时间戳,
//! 任何流转都不清除已有时间戳 (历史留痕).

use chrono::{DateTime, Utc};
use shared::{Order, OrderStatus};

/// 应用状态变更及其时间戳副作用
pub fn apply_status(order: &mut Order, status: OrderStatus, now: DateTime<Utc>) {
    order.status = status;
    match status {
        OrderStatus::Prepared => order.prepared_at = Some(now),
        OrderStatus::Paid => order.paid_at = Some(now),
        _ => {}
    }
}
