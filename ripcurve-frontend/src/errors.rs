use ripcurve_engine::errors::EngineError;
use ripcurve_io::IoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("文档读写失败: {0}")]
    Io(#[from] IoError),
    #[error("场景中不存在名为 `{0}` 的对象")]
    ObjectNotFound(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}
