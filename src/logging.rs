// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// 未设置 RUST_LOG 时默认: 全局 info, 本库 debug
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 未设置 RUST_LOG 时的默认过滤器
const DEFAULT_FILTER: &str = "info,maintenance_workorder=debug";

/// 初始化日志系统 (人读格式)
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器
///   例如: RUST_LOG=debug 或 RUST_LOG=maintenance_workorder=trace
///
/// # 示例
/// ```no_run
/// use maintenance_workorder::logging;
/// logging::init();
/// ```
pub fn init() {
    fmt()
        .with_env_filter(default_filter())
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// 初始化日志系统 (JSON 行格式, 供日志采集管道消费)
pub fn init_json() {
    fmt()
        .json()
        .with_env_filter(default_filter())
        .with_current_span(false)
        .init();
}

/// 初始化测试环境的日志系统
///
/// 只放大本库日志, 输出交给测试捕获
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("maintenance_workorder=debug"))
        .with_test_writer()
        .try_init();
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
