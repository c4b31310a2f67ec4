pub mod cli;
pub mod errors;
pub mod loader;

use std::path::PathBuf;

use cli::SessionReport;
use errors::FrontendError;
use ripcurve_config::{HistoryConfig, SessionConfig};
use tracing::info;

/// CLI 会话参数，命令行覆盖项已合并进来。
#[derive(Debug, Clone, Default)]
pub struct CliOptions {
    pub session: SessionConfig,
    pub history: HistoryConfig,
}

impl CliOptions {
    pub fn output(&self) -> Option<&PathBuf> {
        self.session.output.as_ref()
    }
}

/// 加载场景并执行一次撕裂会话。
pub fn run_cli(options: &CliOptions) -> Result<SessionReport, FrontendError> {
    info!("启动 CLI 前端");
    let loaded = loader::load_scene(&options.session, &options.history)?;
    cli::run_session(loaded, options.output().map(PathBuf::as_path))
}
