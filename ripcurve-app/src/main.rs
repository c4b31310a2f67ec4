use std::path::PathBuf;

use ripcurve_config::{AppConfig, ConfigError};
use ripcurve_frontend::CliOptions;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    select: Vec<String>,
}

fn main() {
    let args = parse_args();

    let config = load_configuration(args.config.clone());
    init_logging(&config);
    info!("启动 ripcurve");

    let mut options = CliOptions {
        session: config.session,
        history: config.history,
    };
    if let Some(input) = args.input {
        options.session.input = Some(input);
    }
    if let Some(output) = args.output {
        options.session.output = Some(output);
    }
    if !args.select.is_empty() {
        options.session.select = args.select;
    }

    match ripcurve_frontend::run_cli(&options) {
        Ok(report) => {
            info!(status = ?report.status, "会话结束");
        }
        Err(err) => {
            error!(error = %err, "执行 CLI 会话失败");
            std::process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut parsed = CliArgs::default();

    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--config" | "--input" | "--output" | "--select" => arg,
            other => {
                eprintln!("未知参数：{other}");
                std::process::exit(1);
            }
        };
        let Some(value) = args.next() else {
            eprintln!("`{slot}` 需要提供参数值");
            std::process::exit(1);
        };
        match slot.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value)),
            "--input" => parsed.input = Some(PathBuf::from(value)),
            "--output" => parsed.output = Some(PathBuf::from(value)),
            _ => parsed.select.push(value),
        }
    }

    parsed
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
