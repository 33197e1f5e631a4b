use std::path::{Path, PathBuf};

use crate::auth::JwtConfig;

/// 服务器配置 - POS 后端的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./pos-data | 工作目录 (数据库、日志) |
/// | HTTP_PORT (或 PORT) | 4000 | HTTP 服务端口 |
/// | JWT_SECRET | (开发密钥) | JWT 签名密钥，至少 16 字符 |
/// | ENVIRONMENT | development | 运行环境 |
/// | MAX_LIST | 500 | 订单列表单次返回上限 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/pos HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 订单列表单次返回上限
    pub max_list: usize,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值。
    /// `PORT` 作为 `HTTP_PORT` 的别名被接受。
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./pos-data".into()),
            http_port: std::env::var("HTTP_PORT")
                .or_else(|_| std::env::var("PORT"))
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            max_list: std::env::var("MAX_LIST")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(500),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库文件目录 (work_dir/database)
    pub fn database_dir(&self) -> PathBuf {
        Path::new(&self.work_dir).join("database")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        Ok(())
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
