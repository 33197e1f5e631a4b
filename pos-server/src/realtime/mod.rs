//! 实时推送
//!
//! - [`OrderNotifier`] - 服务层与推送之间的接缝 (trait)
//! - [`SocketIoNotifier`] - 生产实现: 分店房间 + 全局双路广播
//! - [`NoopNotifier`] / [`RecordingNotifier`] - 启动占位与测试替身

pub mod notifier;
pub mod socketio;

pub use notifier::{NoopNotifier, OrderNotifier, RecordingNotifier};
pub use socketio::{SocketIoNotifier, socketio_layer};
