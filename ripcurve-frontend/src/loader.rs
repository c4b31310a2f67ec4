use std::path::PathBuf;

use ripcurve_config::{HistoryConfig, SessionConfig};
use ripcurve_engine::scene::{DemoObjects, InteractionMode, Scene};
use ripcurve_io::{DocumentLoader, JsonFacade};
use tracing::{debug, info};

use crate::errors::FrontendError;

/// 文档来源，便于前端呈现加载信息。
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Json(PathBuf),
    Demo,
}

/// 统一封装加载后的场景与元信息。
#[derive(Debug)]
pub struct LoadedScene {
    pub scene: Scene,
    pub source: DocumentSource,
    pub demo_objects: Option<DemoObjects>,
}

/// 按会话配置构建场景：指定了输入文件时读取 JSON 文档，否则使用内置示例。
/// 随后按名称选中对象（未指定名称时全部选中），并按需进入编辑模式。
pub fn load_scene(
    session: &SessionConfig,
    history: &HistoryConfig,
) -> Result<LoadedScene, FrontendError> {
    let mut scene = Scene::with_history_depth(history.max_depth);

    let (source, demo_objects) = match &session.input {
        Some(path) => {
            let document = JsonFacade::new().load(path)?;
            info!(path = %path.display(), objects = document.object_count(), "从 JSON 加载文档成功");
            scene.load_document(document);
            (DocumentSource::Json(path.clone()), None)
        }
        None => {
            let demo = scene.populate_demo()?;
            info!("未指定输入文件，使用内置示例");
            (DocumentSource::Demo, Some(demo))
        }
    };

    select_objects(&mut scene, &session.select)?;

    if session.start_in_edit_mode {
        scene.set_mode(InteractionMode::Edit);
    }

    Ok(LoadedScene {
        scene,
        source,
        demo_objects,
    })
}

fn select_objects(scene: &mut Scene, names: &[String]) -> Result<(), FrontendError> {
    if names.is_empty() {
        scene.select_all();
        debug!(count = scene.selection_len(), "已选中全部对象");
        return Ok(());
    }

    for name in names {
        let id = scene
            .document()
            .find_object(name)
            .ok_or_else(|| FrontendError::ObjectNotFound(name.clone()))?;
        scene.select(id)?;
    }
    debug!(count = scene.selection_len(), "已按名称选中对象");
    Ok(())
}
