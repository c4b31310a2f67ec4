use std::path::{Path, PathBuf};

use ripcurve_core::document::{ObjectData, Spline};
use ripcurve_engine::command::{
    CommandBus, CommandContext, CommandRequest, CommandResponse, CommandStatus,
};
use ripcurve_engine::scene::{InteractionMode, Scene};
use ripcurve_io::{DocumentSaver, JsonFacade};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::{DocumentSource, LoadedScene};

/// 一次 CLI 会话的结果。
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub status: CommandStatus,
    pub message: Option<String>,
    pub saved_to: Option<PathBuf>,
}

/// 打印场景概览，对选中点执行一次撕裂，再次打印概览，并按需保存结果。
pub fn run_session(
    loaded: LoadedScene,
    output: Option<&Path>,
) -> Result<SessionReport, FrontendError> {
    let mut scene = loaded.scene;
    let command_bus = CommandBus::new();

    let mut commands: Vec<&str> = command_bus.available_commands().copied().collect();
    commands.sort_unstable();
    println!("支持的命令: {}", commands.join(", "));

    match &loaded.source {
        DocumentSource::Json(path) => println!("已从 JSON 加载文档：{}", path.display()),
        DocumentSource::Demo => {
            if let Some(ids) = &loaded.demo_objects {
                println!("已构建内置示例对象：");
                println!("  - 贝塞尔曲线 ID = {}", ids.bezier_curve.get());
                println!("  - 多段线曲线 ID = {}", ids.poly_curve.get());
                println!("  - 网格 ID = {}", ids.mesh.get());
            }
        }
    }

    println!("撕裂前：");
    for line in describe_scene(&scene) {
        println!("{line}");
    }

    let response = {
        let mut context = CommandContext { scene: &mut scene };
        match command_bus.poll("rip", &context) {
            Ok(()) => dispatch_cli_command(&command_bus, "rip", &mut context),
            Err(message) => {
                println!("[命令不可用] {message}");
                CommandResponse::cancelled(message)
            }
        }
    };

    if response.is_success() {
        println!("撕裂后：");
        for line in describe_scene(&scene) {
            println!("{line}");
        }
    }

    let saved_to = match output {
        Some(path) => {
            JsonFacade::new().save(scene.document(), path)?;
            info!(path = %path.display(), "已保存文档");
            Some(path.to_path_buf())
        }
        None => None,
    };

    Ok(SessionReport {
        status: response.status,
        message: response.message,
        saved_to,
    })
}

/// 场景的文字概览：每个对象一行，曲线对象的每条样条再各占一行。
pub fn describe_scene(scene: &Scene) -> Vec<String> {
    let mode = match scene.mode() {
        InteractionMode::Object => "对象模式",
        InteractionMode::Edit => "编辑模式",
    };
    let mut lines = vec![format!(
        "当前{mode}，选中 {} / {} 个对象",
        scene.selection_len(),
        scene.document().object_count()
    )];

    for (id, object) in scene.document().objects() {
        let marker = if scene.is_selected(id) { "*" } else { " " };
        lines.push(format!(
            "{marker} {} #{} ({})",
            object.name,
            id.get(),
            object.data.type_name()
        ));
        if let ObjectData::Curve(curve) = &object.data {
            for (spline_id, spline) in curve.splines() {
                lines.push(format!("    - 样条 #{}: {}", spline_id.get(), describe_spline(spline)));
            }
        }
    }
    lines
}

fn describe_spline(spline: &Spline) -> String {
    let selected: Vec<String> = spline
        .selected_indices()
        .iter()
        .map(|index| index.to_string())
        .collect();
    let selected = if selected.is_empty() {
        "无".to_string()
    } else {
        selected.join(", ")
    };
    format!(
        "{}, 点数={}, 闭合={}, 选中点=[{selected}]",
        spline.kind().label(),
        spline.len(),
        if spline.use_cyclic { "是" } else { "否" }
    )
}

fn dispatch_cli_command(
    bus: &CommandBus,
    name: &str,
    context: &mut CommandContext<'_>,
) -> CommandResponse {
    let request = CommandRequest::new(name);
    let response = bus.dispatch(&request, context);
    match response.status {
        CommandStatus::Finished => {
            if let Some(message) = &response.message {
                println!("[命令] {message}");
            }
        }
        CommandStatus::Cancelled => {
            let message = response.message.as_deref().unwrap_or("已取消");
            println!("[已取消] {message}");
        }
        CommandStatus::Failed => {
            let message = response.message.as_deref().unwrap_or("未知错误");
            warn!(command = name, "CLI 命令执行失败: {message}");
        }
    }
    response
}
