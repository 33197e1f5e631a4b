use thiserror::Error;

/// 服务器级错误 - 启动与运行期故障
///
/// 请求级错误走 [`crate::utils::AppError`]；这里只覆盖 `Server::run`
/// 生命周期内的失败。
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部服务器错误: {0}")]
    Internal(#[from] anyhow::Error),
}

/// 服务器层的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
