// ==========================================
// 话机批量导入 - 命令行入口
// ==========================================
// 用法:
//   phone-import upload <file> --domain <domain>
//   phone-import commit <file> <decisions.json> --domain <domain>
//   phone-import set-config <scope> <key> <value>
//   phone-import batches [limit]
// 公共选项: --db <path>  --locale <en|zh-CN>  --log-format <text|json>
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use phone_import::app::{get_default_db_path, AppState};
use phone_import::domain::RowDecision;
use phone_import::logging::{self, LogFormat};
use phone_import::{i18n, ApiError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const USAGE: &str = "用法:
  phone-import upload <file> --domain <domain>
  phone-import commit <file> <decisions.json> --domain <domain>
  phone-import set-config <scope> <key> <value>
  phone-import batches [limit]
选项: --db <path>  --locale <en|zh-CN>  --log-format <text|json>";

/// 命令行参数（位置参数 + 选项）
struct CliArgs {
    positional: Vec<String>,
    db_path: Option<String>,
    domain: Option<String>,
    locale: Option<String>,
    log_format: Option<String>,
}

impl CliArgs {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = CliArgs {
            positional: Vec::new(),
            db_path: None,
            domain: None,
            locale: None,
            log_format: None,
        };

        let mut args = args.peekable();
        while let Some(arg) = args.next() {
            let slot = match arg.as_str() {
                "--db" => &mut parsed.db_path,
                "--domain" => &mut parsed.domain,
                "--locale" => &mut parsed.locale,
                "--log-format" => &mut parsed.log_format,
                _ => {
                    parsed.positional.push(arg);
                    continue;
                }
            };
            let value = args.next().ok_or_else(|| anyhow!("选项 {} 缺少取值", arg))?;
            *slot = Some(value);
        }

        Ok(parsed)
    }

    fn arg(&self, index: usize, name: &str) -> Result<&str> {
        self.positional
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("缺少参数 <{}>\n{}", name, USAGE))
    }

    fn log_format(&self) -> Result<LogFormat> {
        match &self.log_format {
            Some(raw) => raw.parse().map_err(|e: String| anyhow!(e)),
            None => Ok(LogFormat::from_env()),
        }
    }

    fn domain(&self) -> Result<&str> {
        self.domain
            .as_deref()
            .ok_or_else(|| anyhow!("缺少选项 --domain\n{}", USAGE))
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_file(path: &str) -> Result<(String, Vec<u8>)> {
    let bytes = std::fs::read(path).with_context(|| format!("无法读取文件: {}", path))?;
    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    Ok((file_name, bytes))
}

// 结构性错误带上响应码
fn api_error(err: ApiError) -> anyhow::Error {
    anyhow!("[{} {}] {}", err.status_code(), err.code(), err)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse(std::env::args().skip(1))?;
    logging::init(cli.log_format()?);
    if let Some(locale) = &cli.locale {
        i18n::set_locale(locale);
    }

    let command = cli.arg(0, "command")?.to_string();
    let db_path = cli.db_path.clone().unwrap_or_else(get_default_db_path);

    tracing::info!("{} v{}", phone_import::APP_NAME, phone_import::VERSION);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).await.map_err(|e| anyhow!(e))?;

    match command.as_str() {
        "upload" => {
            let (file_name, bytes) = read_file(cli.arg(1, "file")?)?;
            let response = state
                .import_api
                .upload_devices(&file_name, &bytes, cli.domain()?)
                .await
                .map_err(api_error)?;
            print_json(&response)?;
        }
        "commit" => {
            let (file_name, bytes) = read_file(cli.arg(1, "file")?)?;
            let decisions_path = cli.arg(2, "decisions.json")?;
            let decisions: Vec<RowDecision> = serde_json::from_slice(
                &std::fs::read(decisions_path)
                    .with_context(|| format!("无法读取决定文件: {}", decisions_path))?,
            )
            .context("决定文件格式错误（应为 [{\"row_index\": 2, \"action\": \"IMPORT\"}, ...]）")?;

            let upload = state
                .import_api
                .upload_devices(&file_name, &bytes, cli.domain()?)
                .await
                .map_err(api_error)?;

            // Ctrl-C 只在行间生效
            let cancel = Arc::new(AtomicBool::new(false));
            let cancel_flag = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("收到中断信号,当前行提交后停止");
                    cancel_flag.store(true, Ordering::SeqCst);
                }
            });

            let response = state
                .import_api
                .commit_devices(&upload.session_id, &decisions, &cancel)
                .await
                .map_err(api_error)?;
            print_json(&response)?;

            if response.status_code != 200 {
                std::process::exit(2);
            }
        }
        "set-config" => {
            let scope = cli.arg(1, "scope")?;
            let key = cli.arg(2, "key")?;
            let value = cli.arg(3, "value")?;
            state.config_manager.set_config_value(scope, key, value)?;
            println!("{}.{} = {}", scope, key, value);
        }
        "batches" => {
            let limit = match cli.positional.get(1) {
                Some(raw) => raw
                    .parse::<usize>()
                    .with_context(|| format!("limit 不是有效数字: {}", raw))?,
                None => 20,
            };
            let batches = state
                .import_api
                .list_recent_batches(limit)
                .map_err(api_error)?;
            print_json(&batches)?;
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}
