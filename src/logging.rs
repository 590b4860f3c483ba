//! 运行日志初始化
//!
//! 日志统一输出到 stderr，stdout 留给事件流（每行一个 JSON 事件）。

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化 tracing 订阅器
///
/// 优先读取 `RUST_LOG`；未设置时 verbose 模式为 `debug`，否则为 `warn`。
///
/// ```bash
/// RUST_LOG=urban_orchestrator=debug urban-orchestrator --zones zones.json
/// ```
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
