//! 订单域
//!
//! # 模块结构
//!
//! - [`money`] - 精确金额计算 (rust_decimal)
//! - [`transitions`] - 状态流转与时间戳副作用
//! - [`store`] - redb 持久化: 单号分配、唯一索引、幂等索引
//! - [`service`] - 应用服务: 创建、流转、结算、修正、查询

pub mod money;
pub mod service;
pub mod store;
pub mod transitions;

pub use service::{CreatedOrder, OrderService};
pub use store::{CreateOutcome, OrderStore, StorageError, StorageResult};
