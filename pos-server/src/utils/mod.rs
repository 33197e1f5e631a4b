//! 工具模块 - 通用工具函数和类型
//!
//! # 内容
//!
//! - [`AppError`] - 应用错误类型 (映射到统一响应信封)
//! - [`AppResult`] - 处理器 Result 别名
//! - 日志初始化工具

pub mod error;
pub mod logger;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
