//! Server Implementation
//!
//! HTTP + Socket.IO 服务器启动和管理

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;

use crate::api::{build_app, log_request};
use crate::auth::require_auth;
use crate::core::{Result, ServerError, ServerState};
use crate::realtime::{self, SocketIoNotifier};

/// HTTP Server
pub struct Server {
    state: ServerState,
}

impl Server {
    /// Create server with existing state
    pub fn with_state(state: ServerState) -> Self {
        Self { state }
    }

    pub async fn run(&self) -> Result<()> {
        // Socket.IO 层 (订单实时推送)
        let (socketio_layer, io) = realtime::socketio_layer().await;

        // 用 Socket.IO 推送器替换初始化时的 Noop
        let state = self
            .state
            .clone()
            .with_notifier(Arc::new(SocketIoNotifier::new(io)));

        let app = build_app()
            // JWT 认证中间件 - 在 Router 级别应用，require_auth 内部会跳过公共路由
            // 使用 from_fn_with_state 以便中间件可以访问 ServerState
            .layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state.clone())
            // Socket.IO 握手与传输 (/socket.io)
            .layer(socketio_layer)
            // Tower HTTP 中间件
            .layer(CorsLayer::permissive())
            .layer(CompressionLayer::new())
            // HTTP 请求日志中间件
            .layer(middleware::from_fn(log_request));

        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.http_port));
        tracing::info!("POS Server listening on {}", addr);

        let handle = axum_server::Handle::new();

        // Ctrl-C -> graceful shutdown
        let handle_clone = handle.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
            handle_clone.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
        });

        axum_server::bind(addr)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .map_err(|e| ServerError::Internal(e.into()))?;

        Ok(())
    }
}
