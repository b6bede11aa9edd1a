use tracing_subscriber::EnvFilter;

use crate::modules::config::LogLevel;

/// 初始化日志，`RUST_LOG` 优先于配置级别。重复调用无副作用
pub fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("duochat_lib={0},duochat={0}", level.as_str())));

    // 终端前端占用 stdout，日志写 stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
