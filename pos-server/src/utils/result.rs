//! Result 别名
//!
//! 处理函数和服务层统一返回 [`AppResult`], 错误经 `IntoResponse`
//! 映射为信封格式的响应.

use crate::AppError;

/// 请求级 Result: 成功携带响应数据, 失败携带 [`AppError`]
pub type AppResult<T> = Result<T, AppError>;
