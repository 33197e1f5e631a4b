//! 认证授权模块
//!
//! 提供 JWT 认证和中间件：
//! - [`JwtService`] - JWT 令牌服务 (仅校验，令牌由上游认证服务签发)
//! - [`CurrentUser`] - 当前用户上下文
//! - [`require_auth`] - 认证中间件

pub mod extractor;
pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::require_auth;
