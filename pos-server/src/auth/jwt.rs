//! JWT 令牌服务
//!
//! 处理 JWT 令牌的生成、验证和解析。
//!
//! 令牌由上游认证服务签发，本服务只做校验。载荷为 camelCase 字段
//! (`id`, `role`, `branchId`, `name`, `email`)，HS256 签名。

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use shared::Role;
use thiserror::Error;

/// JWT_SECRET 的最小长度
const MIN_SECRET_LEN: usize = 16;

/// 开发环境兜底密钥 (生产环境必须设置 JWT_SECRET)
const DEV_FALLBACK_SECRET: &str = "PosServerDevelopmentSecureKey2024!";

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// JWT 密钥 (至少 16 字符)
    pub secret: String,
    /// 令牌过期时间 (分钟)
    pub expiration_minutes: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        let secret = match load_jwt_secret() {
            Ok(secret) => secret,
            Err(e) => {
                #[cfg(debug_assertions)]
                {
                    tracing::warn!("JWT configuration error: {}, using development key", e);
                    DEV_FALLBACK_SECRET.to_string()
                }
                #[cfg(not(debug_assertions))]
                {
                    panic!("FATAL: JWT_SECRET configuration failed: {}", e);
                }
            }
        };

        Self {
            secret,
            expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1440), // 默认 24 小时
        }
    }
}

/// 从环境变量安全地加载 JWT 密钥
fn load_jwt_secret() -> Result<String, JwtError> {
    match std::env::var("JWT_SECRET") {
        Ok(secret) => {
            if secret.len() < MIN_SECRET_LEN {
                return Err(JwtError::ConfigError(format!(
                    "JWT_SECRET must be at least {} characters long",
                    MIN_SECRET_LEN
                )));
            }
            Ok(secret)
        }
        Err(_) => {
            #[cfg(debug_assertions)]
            {
                tracing::warn!("JWT_SECRET not set! Using development key.");
                Ok(DEV_FALLBACK_SECRET.to_string())
            }
            #[cfg(not(debug_assertions))]
            {
                Err(JwtError::ConfigError(
                    "JWT_SECRET environment variable must be set in production!".to_string(),
                ))
            }
        }
    }
}

/// 存储在令牌中的 JWT Claims
///
/// 与上游认证服务签发的载荷保持一致 (camelCase)。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// 员工 ID
    pub id: String,
    /// 角色
    pub role: Role,
    /// 所属分店 (管理员令牌可不带)
    #[serde(default)]
    pub branch_id: Option<String>,
    /// 显示名称
    #[serde(default)]
    pub name: Option<String>,
    /// 邮箱
    #[serde(default)]
    pub email: Option<String>,
    /// 过期时间戳
    pub exp: i64,
    /// 签发时间戳
    pub iat: i64,
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("无效令牌: {0}")]
    InvalidToken(String),

    #[error("令牌已过期")]
    ExpiredToken,

    #[error("无效签名")]
    InvalidSignature,

    #[error("令牌生成失败: {0}")]
    GenerationFailed(String),

    #[error("配置错误: {0}")]
    ConfigError(String),
}

/// JWT 令牌服务
#[derive(Debug, Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// 使用默认配置创建新的 JWT 服务
    pub fn new() -> Self {
        Self::with_config(JwtConfig::default())
    }

    /// 使用指定配置创建新的 JWT 服务
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为用户生成新令牌
    ///
    /// 生产环境令牌由上游认证服务签发；这里主要服务于测试和运维脚本。
    pub fn generate_token(
        &self,
        user_id: &str,
        role: Role,
        branch_id: Option<&str>,
        name: &str,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            id: user_id.to_string(),
            role,
            branch_id: branch_id.map(|b| b.to_string()),
            name: Some(name.to_string()),
            email: None,
            exp: expiration.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// 验证并解码令牌
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let validation = Validation::new(Algorithm::HS256);

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken(e.to_string()),
            })?;

        Ok(token_data.claims)
    }

    /// 从 Authorization 头提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

impl Default for JwtService {
    fn default() -> Self {
        Self::new()
    }
}

/// 当前用户上下文 (从 JWT Claims 解析)
///
/// 由认证中间件创建，注入到请求处理函数
///
/// # 示例
///
/// ```ignore
/// async fn handler(user: CurrentUser) -> Json<()> {
///     println!("用户: {}, 分店: {:?}", user.name, user.branch_id);
///     if user.is_admin() {
///         // 管理员可跨分店操作
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// 用户 ID
    pub id: String,
    /// 角色
    pub role: Role,
    /// 所属分店
    pub branch_id: Option<String>,
    /// 显示名称
    pub name: String,
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            role: claims.role,
            branch_id: claims.branch_id,
            name: claims.name.unwrap_or_default(),
        }
    }
}

impl CurrentUser {
    /// 是否管理员
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// 检查角色是否在允许列表中
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }
}
