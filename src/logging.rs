// ==========================================
// 话机批量导入 - 日志初始化
// ==========================================
// 输出: stderr（stdout 保留给命令行 JSON 结果）
// 格式: text（默认）/ json（逐行 JSON,带当前 span 字段）
// 级别: RUST_LOG,默认 info
// ==========================================

use std::fmt;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// 日志格式环境变量
pub const LOG_FORMAT_ENV: &str = "PHONE_IMPORT_LOG_FORMAT";

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json, // 便于收集上传/提交的 session_id、row 等结构化字段
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("无效的日志格式: {}，应为 text/json", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl LogFormat {
    /// 从环境变量读取,未设置或无效时为 text
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

/// 初始化日志系统
///
/// # 参数
/// - format: 输出格式（命令行 --log-format 或 PHONE_IMPORT_LOG_FORMAT）
///
/// # 示例
/// ```no_run
/// use phone_import::logging::{self, LogFormat};
/// logging::init(LogFormat::Json);
/// ```
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().with_current_span(true).init(),
    }
}

/// 初始化测试环境的日志系统
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("phone_import=debug"))
        .with_test_writer()
        .try_init();
}
