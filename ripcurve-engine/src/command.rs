use std::collections::HashMap;

use tracing::debug;

use crate::rip::{failcheck, rip_point};
use crate::scene::{InteractionMode, Scene};

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// 命令完成状态。`Cancelled` 表示输入校验未通过、未做任何修改。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Finished,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub status: CommandStatus,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Finished,
            message: Some(message.into()),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Cancelled,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Failed,
            message: Some(message.into()),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == CommandStatus::Finished
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// 命令当前是否可用；不可用时返回提示信息。
    fn poll(&self, _context: &CommandContext<'_>) -> Result<(), String> {
        Ok(())
    }

    /// 可撤销命令由命令总线在执行前记录文档快照。
    fn undoable(&self) -> bool {
        false
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub scene: &'a mut Scene,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(RipCommand);
        bus.register(ClearSelectionCommand);
        bus.register(DeselectPointsCommand);
        bus.register(EditModeCommand);
        bus.register(ObjectModeCommand);
        bus.register(UndoCommand);
        bus.register(RedoCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    /// 执行命令。可撤销命令在执行前记录快照，只要命令不是被取消就写入撤销栈，
    /// 执行中途失败的状态也可以通过撤销恢复。
    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(handler) = self.handlers.get(request.name.as_str()) else {
            return CommandResponse::err(format!("未知命令: {}", request.name));
        };

        if !handler.undoable() {
            return handler.execute(request, context);
        }

        let snapshot = context.scene.document().clone();
        let response = handler.execute(request, context);
        if response.status != CommandStatus::Cancelled {
            context.scene.record_undo_step(snapshot);
            debug!(command = handler.name(), "已记录撤销快照");
        }
        response
    }

    pub fn poll(&self, name: &str, context: &CommandContext<'_>) -> Result<(), String> {
        match self.handlers.get(name) {
            Some(handler) => handler.poll(context),
            None => Err(format!("未知命令: {name}")),
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// 在唯一选中的控制点处撕裂样条。
struct RipCommand;

impl CommandHandler for RipCommand {
    fn name(&self) -> &'static str {
        "rip"
    }

    fn poll(&self, context: &CommandContext<'_>) -> Result<(), String> {
        failcheck(context.scene)
            .map(|_| ())
            .map_err(|err| err.to_string())
    }

    fn undoable(&self) -> bool {
        true
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        // 选中状态可能在 poll 之后被修改，执行前重新检查
        let result = failcheck(context.scene).and_then(|target| rip_point(context.scene, &target));
        match result {
            Ok(outcome) => CommandResponse::ok(format!(
                "样条 #{} 已在第 {} 个控制点处撕裂，新样条 #{}",
                outcome.original.get(),
                outcome.split_index,
                outcome.new_spline.get()
            )),
            Err(err) if err.is_validation() => CommandResponse::cancelled(err.to_string()),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct ClearSelectionCommand;

impl CommandHandler for ClearSelectionCommand {
    fn name(&self) -> &'static str {
        "clear_selection"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.scene.clear_selection();
        CommandResponse::ok("对象选中集已清空")
    }
}

struct DeselectPointsCommand;

impl CommandHandler for DeselectPointsCommand {
    fn name(&self) -> &'static str {
        "deselect_points"
    }

    fn poll(&self, context: &CommandContext<'_>) -> Result<(), String> {
        require_edit_mode(context.scene)
    }

    fn undoable(&self) -> bool {
        true
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Err(message) = require_edit_mode(context.scene) {
            return CommandResponse::cancelled(message);
        }
        context.scene.deselect_all_points();
        CommandResponse::ok("控制点选中已清空")
    }
}

struct EditModeCommand;

impl CommandHandler for EditModeCommand {
    fn name(&self) -> &'static str {
        "edit_mode"
    }

    fn poll(&self, context: &CommandContext<'_>) -> Result<(), String> {
        if context.scene.has_selected_curve() {
            Ok(())
        } else {
            Err("没有选中的曲线对象".to_string())
        }
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Err(message) = self.poll(context) {
            return CommandResponse::cancelled(message);
        }
        context.scene.set_mode(InteractionMode::Edit);
        CommandResponse::ok("已进入编辑模式")
    }
}

struct ObjectModeCommand;

impl CommandHandler for ObjectModeCommand {
    fn name(&self) -> &'static str {
        "object_mode"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.scene.set_mode(InteractionMode::Object);
        CommandResponse::ok("已回到对象模式")
    }
}

struct UndoCommand;

impl CommandHandler for UndoCommand {
    fn name(&self) -> &'static str {
        "undo"
    }

    fn poll(&self, context: &CommandContext<'_>) -> Result<(), String> {
        if context.scene.history().can_undo() {
            Ok(())
        } else {
            Err("没有可撤销的操作".to_string())
        }
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if context.scene.undo() {
            CommandResponse::ok("已撤销")
        } else {
            CommandResponse::cancelled("没有可撤销的操作")
        }
    }
}

struct RedoCommand;

impl CommandHandler for RedoCommand {
    fn name(&self) -> &'static str {
        "redo"
    }

    fn poll(&self, context: &CommandContext<'_>) -> Result<(), String> {
        if context.scene.history().can_redo() {
            Ok(())
        } else {
            Err("没有可重做的操作".to_string())
        }
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if context.scene.redo() {
            CommandResponse::ok("已重做")
        } else {
            CommandResponse::cancelled("没有可重做的操作")
        }
    }
}

fn require_edit_mode(scene: &Scene) -> Result<(), String> {
    if scene.mode() == InteractionMode::Edit {
        Ok(())
    } else {
        Err("Not in Edit mode".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_in_edit_mode() -> (Scene, crate::scene::DemoObjects) {
        let mut scene = Scene::new();
        let ids = scene.populate_demo().expect("demo scene");
        scene.select_all();
        scene.set_mode(InteractionMode::Edit);
        (scene, ids)
    }

    #[test]
    fn rip_command_splits_and_can_be_undone() {
        let (mut scene, ids) = demo_in_edit_mode();
        let before = scene.document().clone();
        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        assert!(bus.poll("rip", &context).is_ok());
        let response = bus.dispatch(&CommandRequest::new("rip"), &mut context);
        assert!(response.is_success(), "{:?}", response.message);
        assert_eq!(
            context
                .scene
                .document()
                .curve(ids.bezier_curve)
                .unwrap()
                .spline_count(),
            3
        );

        let undo = bus.dispatch(&CommandRequest::new("undo"), &mut context);
        assert!(undo.is_success());
        assert!(context.scene.document().same_content(&before));

        let redo = bus.dispatch(&CommandRequest::new("redo"), &mut context);
        assert!(redo.is_success());
        assert_eq!(
            context
                .scene
                .document()
                .curve(ids.bezier_curve)
                .unwrap()
                .spline_count(),
            3
        );
    }

    #[test]
    fn rip_after_undo_allocates_fresh_ids() {
        let (mut scene, ids) = demo_in_edit_mode();
        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        let response = bus.dispatch(&CommandRequest::new("rip"), &mut context);
        assert!(response.is_success(), "{:?}", response.message);
        let (first_spline, first_duplicate) = {
            let curve = context.scene.document().curve(ids.bezier_curve).unwrap();
            let (id, spline) = curve.splines().last().unwrap();
            (id, spline.point_ids()[0])
        };

        let undo = bus.dispatch(&CommandRequest::new("undo"), &mut context);
        assert!(undo.is_success());

        let spline = context
            .scene
            .document_mut()
            .spline_mut(ids.bezier_curve, ids.bezier_spline)
            .unwrap();
        spline.deselect_all();
        spline.select_points(&[2]);
        let response = bus.dispatch(&CommandRequest::new("rip"), &mut context);
        assert!(response.is_success(), "{:?}", response.message);

        let curve = context.scene.document().curve(ids.bezier_curve).unwrap();
        let spline_ids: Vec<_> = curve.splines().map(|(id, _)| id).collect();
        assert_eq!(spline_ids.len(), 3);
        assert!(!spline_ids.contains(&first_spline));
        assert!(
            curve
                .splines()
                .all(|(_, spline)| spline.point_index(first_duplicate).is_none())
        );
    }

    struct FailingEditCommand;

    impl CommandHandler for FailingEditCommand {
        fn name(&self) -> &'static str {
            "failing_edit"
        }

        fn undoable(&self) -> bool {
            true
        }

        fn execute(
            &self,
            _request: &CommandRequest,
            context: &mut CommandContext<'_>,
        ) -> CommandResponse {
            context.scene.deselect_all_points();
            CommandResponse::err("中途失败")
        }
    }

    #[test]
    fn failed_undoable_command_records_snapshot_but_cancelled_does_not() {
        let (mut scene, ids) = demo_in_edit_mode();
        let mut bus = CommandBus::new();
        bus.register(FailingEditCommand);
        let mut context = CommandContext { scene: &mut scene };

        let response = bus.dispatch(&CommandRequest::new("failing_edit"), &mut context);
        assert_eq!(response.status, CommandStatus::Failed);
        assert_eq!(context.scene.history().undo_len(), 1);

        // 选中已被清空，撕裂被取消，不再记录快照
        let response = bus.dispatch(&CommandRequest::new("rip"), &mut context);
        assert_eq!(response.status, CommandStatus::Cancelled);
        assert_eq!(context.scene.history().undo_len(), 1);

        let undo = bus.dispatch(&CommandRequest::new("undo"), &mut context);
        assert!(undo.is_success());
        let spline = context
            .scene
            .document()
            .spline(ids.bezier_curve, ids.bezier_spline)
            .unwrap();
        assert_eq!(spline.selected_indices(), vec![1]);
    }

    #[test]
    fn rip_after_rip_reports_boundary_point() {
        let (mut scene, _) = demo_in_edit_mode();
        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        assert!(
            bus.dispatch(&CommandRequest::new("rip"), &mut context)
                .is_success()
        );
        // 拆分点现在是原样条的尾点
        let poll = bus.poll("rip", &context);
        assert_eq!(
            poll,
            Err("Ripping the last point in a curve will accomplish nothing.".to_string())
        );
        let again = bus.dispatch(&CommandRequest::new("rip"), &mut context);
        assert_eq!(again.status, CommandStatus::Cancelled);
        assert_eq!(again.message, poll.err());
        assert_eq!(context.scene.history().undo_len(), 1);
    }

    #[test]
    fn rip_is_unavailable_outside_edit_mode() {
        let (mut scene, _) = demo_in_edit_mode();
        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        let response = bus.dispatch(&CommandRequest::new("object_mode"), &mut context);
        assert!(response.is_success());
        assert_eq!(
            bus.poll("rip", &context),
            Err("Not in Edit mode".to_string())
        );
        let response = bus.dispatch(&CommandRequest::new("rip"), &mut context);
        assert_eq!(response.status, CommandStatus::Cancelled);
        assert!(!context.scene.history().can_undo());
    }

    #[test]
    fn poll_and_execute_agree_on_empty_selection() {
        let (mut scene, _) = demo_in_edit_mode();
        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        let response = bus.dispatch(&CommandRequest::new("deselect_points"), &mut context);
        assert!(response.is_success());
        assert_eq!(context.scene.history().undo_len(), 1);

        let poll = bus.poll("rip", &context);
        assert_eq!(poll, Err("No points selected.".to_string()));
        let response = bus.dispatch(&CommandRequest::new("rip"), &mut context);
        assert_eq!(response.status, CommandStatus::Cancelled);
        assert_eq!(response.message, poll.err());
    }

    #[test]
    fn mode_and_selection_commands_work() {
        let mut scene = Scene::new();
        scene.populate_demo().expect("demo scene");
        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        let response = bus.dispatch(&CommandRequest::new("edit_mode"), &mut context);
        assert_eq!(response.status, CommandStatus::Cancelled);
        assert_eq!(context.scene.mode(), InteractionMode::Object);

        context.scene.select_all();
        let response = bus.dispatch(&CommandRequest::new("edit_mode"), &mut context);
        assert!(response.is_success());
        assert_eq!(context.scene.mode(), InteractionMode::Edit);

        let response = bus.dispatch(&CommandRequest::new("clear_selection"), &mut context);
        assert!(response.is_success());
        assert_eq!(context.scene.selection_len(), 0);

        assert!(bus.poll("undo", &context).is_err());
        let response = bus.dispatch(&CommandRequest::new("undo"), &mut context);
        assert_eq!(response.status, CommandStatus::Cancelled);
    }

    #[test]
    fn unknown_command_fails() {
        let mut scene = Scene::new();
        let bus = CommandBus::new();
        let mut context = CommandContext { scene: &mut scene };

        let response = bus.dispatch(&CommandRequest::new("extrude"), &mut context);
        assert_eq!(response.status, CommandStatus::Failed);
        assert!(bus.poll("extrude", &context).is_err());
        assert_eq!(bus.available_commands().count(), 7);
    }
}
