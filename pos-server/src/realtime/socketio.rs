//! Socket.IO 接入层
//!
//! 客户端连上默认命名空间后 emit `join { branchId }` 进入分店房间
//! `branch:{id}`. 订单事件从 [`SocketIoNotifier`] 推出, 每个事件两路:
//! 分店房间 (订单有分店时) 和全局广播, 事件载荷都是完整订单快照.

use async_trait::async_trait;
use serde::Deserialize;
use shared::Order;
use socketioxide::{
    SocketIo,
    extract::{SocketRef, TryData},
    layer::SocketIoLayer,
};

use super::OrderNotifier;

/// `join` 事件载荷
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinPayload {
    #[serde(default)]
    branch_id: String,
}

/// 构建 Socket.IO 层并注册默认命名空间
pub async fn socketio_layer() -> (SocketIoLayer, SocketIo) {
    let (layer, io) = SocketIo::new_layer();
    let _ = io.ns("/", on_connect);
    (layer, io)
}

async fn on_connect(socket: SocketRef) {
    tracing::debug!(target: "realtime", sid = %socket.id, "socket connected");
    socket.on("join", on_join);
}

/// 加入分店房间; 载荷非法或 branchId 为空则静默忽略
async fn on_join(socket: SocketRef, TryData(payload): TryData<JoinPayload>) {
    let Ok(payload) = payload else {
        tracing::debug!(target: "realtime", sid = %socket.id, "join with malformed payload");
        return;
    };

    let branch = payload.branch_id.trim();
    if branch.is_empty() {
        return;
    }

    socket.join(format!("branch:{branch}"));
    tracing::debug!(target: "realtime", sid = %socket.id, branch = %branch, "joined branch room");
}

/// Socket.IO 订单事件推送
#[derive(Clone)]
pub struct SocketIoNotifier {
    io: SocketIo,
}

impl SocketIoNotifier {
    pub fn new(io: SocketIo) -> Self {
        Self { io }
    }

    /// 房间 + 全局双路推送; 失败只记日志
    async fn emit(&self, event: &str, order: &Order) {
        if let Some(branch) = order.branch_id.as_deref() {
            let room = format!("branch:{branch}");
            if let Err(e) = self.io.to(room).emit(event, order).await {
                tracing::warn!(target: "realtime", error = %e, event, "branch room emit failed");
            }
        }

        if let Err(e) = self.io.emit(event, order).await {
            tracing::warn!(target: "realtime", error = %e, event, "global emit failed");
        }
    }
}

#[async_trait]
impl OrderNotifier for SocketIoNotifier {
    async fn order_created(&self, order: &Order) {
        self.emit("order:created", order).await;
    }

    async fn order_updated(&self, order: &Order) {
        self.emit("order:updated", order).await;
    }
}
