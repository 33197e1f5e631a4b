//! 日志初始化
//!
//! fmt 订阅器, 过滤指令优先取 `RUST_LOG`, 未设置时回退到传入级别.
//! 配置了 `LOG_DIR` 时额外写按天滚动的日志文件.

use std::path::Path;

use tracing_subscriber::EnvFilter;

/// Initialize the logger with defaults (info, stdout only)
pub fn init_logger() {
    init_logger_with_file(None, None, None);
}

/// Initialize the logger
///
/// `log_level` 是 `RUST_LOG` 未设置时的回退级别; `log_dir` 指向的目录
/// 必须已存在, 否则只输出到 stdout.
pub fn init_logger_with_file(log_level: Option<&str>, _json: Option<bool>, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.unwrap_or("info")));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir
        && Path::new(dir).exists()
    {
        let file_appender = tracing_appender::rolling::daily(dir, "pos-server");
        subscriber.with_writer(file_appender).init();
        return;
    }

    subscriber.init();
}
