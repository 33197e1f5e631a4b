//! POS Server - 多分店销售点订单与结算服务
//!
//! # 架构概述
//!
//! 本模块是订单后端的主入口，提供以下核心功能：
//!
//! - **订单域** (`orders`): 金额计算、单号分配、幂等创建、状态流转、结算
//! - **持久化** (`orders::store`): 嵌入式 redb 存储
//! - **认证** (`auth`): JWT 校验与角色检查
//! - **实时推送** (`realtime`): Socket.IO 分店房间 + 全局广播
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! pos-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 认证、角色
//! ├── api/           # HTTP 路由和处理器
//! ├── orders/        # 订单域逻辑与存储
//! ├── realtime/      # Socket.IO 推送
//! └── utils/         # 错误、日志等工具
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod orders;
pub mod realtime;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use orders::{OrderService, OrderStore};
pub use realtime::OrderNotifier;
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 统一打到 security target
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境 (dotenv, 日志)
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present (ignored when missing)
    let _ = dotenv::dotenv();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    utils::logger::init_logger_with_file(log_level.as_deref(), None, log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ____  ____  _____
   / __ \/ __ \/ ___/
  / /_/ / / / /\__ \
 / ____/ /_/ /___/ /
/_/    \____//____/
   _____
  / ___/___  ______   _____  _____
  \__ \/ _ \/ ___/ | / / _ \/ ___/
 ___/ /  __/ /   | |/ /  __/ /
/____/\___/_/    |___/\___/_/
    "#
    );
}
