use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::JwtService;
use crate::core::Config;
use crate::orders::{OrderService, OrderStore};
use crate::realtime::{NoopNotifier, OrderNotifier};

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是服务器的核心数据结构，持有所有服务的共享引用。
/// 使用 Arc 实现浅拷贝，克隆成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | store | Arc<OrderStore> | 嵌入式订单存储 (redb) |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
/// | notifier | Arc<dyn OrderNotifier> | 订单事件推送 |
///
/// # 使用示例
///
/// ```ignore
/// // 在处理函数中按请求构造订单服务
/// let service = state.order_service();
/// let order = service.create_order(&user, payload).await?;
/// ```
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 订单存储 (redb)
    pub store: Arc<OrderStore>,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    /// 订单事件推送 (Socket.IO 或测试替身)
    pub notifier: Arc<dyn OrderNotifier>,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`ServerState::initialize`] 方法代替
    pub fn new(
        config: Config,
        store: Arc<OrderStore>,
        jwt_service: Arc<JwtService>,
        notifier: Arc<dyn OrderNotifier>,
    ) -> Self {
        Self {
            config,
            store,
            jwt_service,
            notifier,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构 (确保目录存在)
    /// 2. 订单存储 (work_dir/database/orders.redb)
    /// 3. JWT 服务
    ///
    /// 推送器初始为 [`NoopNotifier`]，`Server::run` 启动 Socket.IO 后
    /// 通过 [`ServerState::with_notifier`] 替换。
    ///
    /// # Panics
    ///
    /// 工作目录或数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        // 1. Open the order store
        let db_path = config.database_dir().join("orders.redb");
        let store = OrderStore::open(&db_path).expect("Failed to open order database");

        // 2. Initialize services
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Self::new(
            config.clone(),
            Arc::new(store),
            jwt_service,
            Arc::new(NoopNotifier),
        )
    }

    /// 替换订单事件推送器 (Socket.IO 接线、测试注入)
    pub fn with_notifier(mut self, notifier: Arc<dyn OrderNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// 按请求构造订单服务
    pub fn order_service(&self) -> OrderService {
        OrderService::new(
            self.store.clone(),
            self.notifier.clone(),
            self.config.max_list,
        )
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 获取工作目录
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }
}
