//! 日志初始化

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志
///
/// `RUST_LOG` 控制级别（默认 `info`），例如 `RUST_LOG=plan_core=debug`。
/// `quiet` 时默认级别降为 `warn`，用于 `--json` 输出。
pub fn init(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}
