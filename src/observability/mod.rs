//! 可观测性

use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// 初始化日志：RUST_LOG 优先，未设置时使用 default_level（如 "info"、"warn"）
///
/// 日志写到 stderr，stdout 只输出运行结果。重复调用时忽略。
pub fn init(default_level: &str) {
    let level = default_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init("not-a-level");
        init("debug");
        tracing::info!("observability initialized");
    }
}
