pub mod command;
pub mod resolver;
pub mod rip;

pub mod errors {
    use std::fmt;

    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum EngineError {
        #[error("object with id {0} not found")]
        ObjectNotFound(u64),
        #[error("object with id {0} is not a curve")]
        NotACurve(u64),
        #[error("spline with id {0} not found")]
        SplineNotFound(u64),
        #[error("point with id {0} not found")]
        PointNotFound(u64),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SplineEnd {
        First,
        Last,
    }

    impl fmt::Display for SplineEnd {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                SplineEnd::First => f.write_str("first"),
                SplineEnd::Last => f.write_str("last"),
            }
        }
    }

    /// 撕裂命令的失败原因。除 `Engine` 外都属于输入校验失败，在任何修改之前报告。
    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum RipError {
        #[error("Not in Edit mode")]
        NotInEditMode,
        #[error("No points selected.")]
        NoSelection,
        #[error("This operator can only rip a single point. {count} are selected.")]
        AmbiguousSelection { count: usize },
        #[error("Ripping the {end} point in a curve will accomplish nothing.")]
        BoundaryPoint { end: SplineEnd },
        #[error(transparent)]
        Engine(#[from] EngineError),
    }

    impl RipError {
        #[inline]
        pub fn is_validation(&self) -> bool {
            !matches!(self, RipError::Engine(_))
        }
    }
}

pub mod scene {
    use indexmap::IndexSet;
    use ripcurve_core::document::{
        BezierPoint, Document, ObjectId, SplineId, SplinePoint,
    };
    use ripcurve_core::geometry::Point3;
    use tracing::debug;

    use crate::errors::EngineError;

    pub const DEFAULT_HISTORY_DEPTH: usize = 32;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum InteractionMode {
        #[default]
        Object,
        Edit,
    }

    /// 文档快照组成的撤销 / 重做栈，超过深度时丢弃最旧的记录。
    #[derive(Debug)]
    pub struct UndoHistory {
        undo: Vec<Document>,
        redo: Vec<Document>,
        max_depth: usize,
    }

    impl UndoHistory {
        pub fn new(max_depth: usize) -> Self {
            Self {
                undo: Vec::new(),
                redo: Vec::new(),
                max_depth,
            }
        }

        /// 记录修改前的快照；新的修改会使重做栈失效。
        pub fn record(&mut self, snapshot: Document) {
            if self.max_depth == 0 {
                return;
            }
            if self.undo.len() == self.max_depth {
                self.undo.remove(0);
            }
            self.undo.push(snapshot);
            self.redo.clear();
        }

        fn undo(&mut self, current: Document) -> Option<Document> {
            let previous = self.undo.pop()?;
            self.redo.push(current);
            Some(previous)
        }

        fn redo(&mut self, current: Document) -> Option<Document> {
            let next = self.redo.pop()?;
            self.undo.push(current);
            Some(next)
        }

        #[inline]
        pub fn can_undo(&self) -> bool {
            !self.undo.is_empty()
        }

        #[inline]
        pub fn can_redo(&self) -> bool {
            !self.redo.is_empty()
        }

        #[inline]
        pub fn undo_len(&self) -> usize {
            self.undo.len()
        }

        pub fn clear(&mut self) {
            self.undo.clear();
            self.redo.clear();
        }
    }

    impl Default for UndoHistory {
        fn default() -> Self {
            Self::new(DEFAULT_HISTORY_DEPTH)
        }
    }

    /// 引擎层负责维护 `Document` 和运行时状态（对象选中集、交互模式、撤销栈）。
    ///
    /// 控制点级别的选中标记存放在文档中，随快照一起撤销；对象选中集按插入顺序保存。
    #[derive(Debug)]
    pub struct Scene {
        document: Document,
        selected: IndexSet<ObjectId>,
        mode: InteractionMode,
        history: UndoHistory,
    }

    #[derive(Debug, Clone, Copy)]
    pub struct DemoObjects {
        pub bezier_curve: ObjectId,
        pub bezier_spline: SplineId,
        pub nurbs_spline: SplineId,
        pub poly_curve: ObjectId,
        pub poly_spline: SplineId,
        pub mesh: ObjectId,
    }

    impl Scene {
        pub fn new() -> Self {
            Self::with_history_depth(DEFAULT_HISTORY_DEPTH)
        }

        pub fn with_history_depth(max_depth: usize) -> Self {
            Self {
                document: Document::new(),
                selected: IndexSet::new(),
                mode: InteractionMode::default(),
                history: UndoHistory::new(max_depth),
            }
        }

        /// 使用现有文档初始化场景。
        pub fn with_document(document: Document) -> Self {
            let mut scene = Self::new();
            scene.load_document(document);
            scene
        }

        /// 替换当前文档并重置运行时状态。
        pub fn load_document(&mut self, document: Document) {
            self.document = document;
            self.selected.clear();
            self.mode = InteractionMode::Object;
            self.history.clear();
        }

        #[inline]
        pub fn selection_len(&self) -> usize {
            self.selected.len()
        }

        #[inline]
        pub fn is_selected(&self, id: ObjectId) -> bool {
            self.selected.contains(&id)
        }

        /// 选中指定对象。若对象不存在则返回错误；重复选中不改变顺序。
        pub fn select(&mut self, id: ObjectId) -> Result<(), EngineError> {
            if self.document.object(id).is_none() {
                return Err(EngineError::ObjectNotFound(id.get()));
            }
            self.selected.insert(id);
            Ok(())
        }

        /// 按文档顺序选中全部对象。
        pub fn select_all(&mut self) {
            let ids: Vec<ObjectId> = self.document.objects().map(|(id, _)| id).collect();
            self.selected.extend(ids);
        }

        #[inline]
        pub fn clear_selection(&mut self) {
            self.selected.clear();
        }

        /// 以选中顺序返回当前选中对象 ID。
        #[inline]
        pub fn selected_objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
            self.selected.iter().copied()
        }

        /// 选中集中是否至少有一个曲线对象。
        pub fn has_selected_curve(&self) -> bool {
            self.selected
                .iter()
                .any(|id| self.document.curve(*id).is_some())
        }

        /// 清空选中曲线对象内的所有控制点选中标记。
        pub fn deselect_all_points(&mut self) {
            for id in &self.selected {
                if let Some(curve) = self.document.curve_mut(*id) {
                    curve.deselect_all();
                }
            }
        }

        #[inline]
        pub fn mode(&self) -> InteractionMode {
            self.mode
        }

        #[inline]
        pub fn set_mode(&mut self, mode: InteractionMode) {
            self.mode = mode;
        }

        #[inline]
        pub fn document(&self) -> &Document {
            &self.document
        }

        #[inline]
        pub fn document_mut(&mut self) -> &mut Document {
            &mut self.document
        }

        #[inline]
        pub fn history(&self) -> &UndoHistory {
            &self.history
        }

        pub fn record_undo_step(&mut self, snapshot: Document) {
            self.history.record(snapshot);
        }

        /// 恢复上一份文档快照，返回是否执行了撤销。ID 计数器不随快照回退。
        pub fn undo(&mut self) -> bool {
            let current = self.document.clone();
            match self.history.undo(current) {
                Some(mut previous) => {
                    previous.reserve_ids_from(&self.document);
                    self.document = previous;
                    self.prune_selection();
                    true
                }
                None => false,
            }
        }

        pub fn redo(&mut self) -> bool {
            let current = self.document.clone();
            match self.history.redo(current) {
                Some(mut next) => {
                    next.reserve_ids_from(&self.document);
                    self.document = next;
                    self.prune_selection();
                    true
                }
                None => false,
            }
        }

        fn prune_selection(&mut self) {
            let document = &self.document;
            self.selected.retain(|id| document.object(*id).is_some());
        }

        /// 为 CLI / 快速验证填充一组示例对象，返回关键对象与样条 ID。
        ///
        /// 贝塞尔曲线的第二个控制点处于选中状态；同一对象里的 NURBS 样条也带有选中点，
        /// 但撕裂命令会忽略它。
        pub fn populate_demo(&mut self) -> Result<DemoObjects, EngineError> {
            self.clear_selection();

            let bezier_curve = self.document.add_curve("BezierCurve");
            let bezier_points = (0..4).map(|i| {
                let x = i as f64 * 2.0;
                let mut point = BezierPoint::new(
                    Point3::new(x, 0.0, 0.0),
                    Point3::new(x - 0.5, -0.5, 0.0),
                    Point3::new(x + 0.5, 0.5, 0.0),
                );
                point.select_control_point = i == 1;
                point
            });
            let nurbs_points = (0..4).map(|i| SplinePoint {
                select: i == 2,
                ..SplinePoint::new(Point3::new(i as f64, 3.0, 0.0))
            });
            let poly_curve = self.document.add_curve("PolyCurve");
            let poly_points =
                (0..3).map(|i| SplinePoint::new(Point3::new(i as f64, -2.0, 1.0)));
            let mesh = self.document.add_mesh("Cube");

            let bezier_spline = self
                .document
                .add_bezier_spline(bezier_curve, bezier_points)
                .ok_or(EngineError::NotACurve(bezier_curve.get()))?;
            let nurbs_spline = self
                .document
                .add_nurbs_spline(bezier_curve, nurbs_points)
                .ok_or(EngineError::NotACurve(bezier_curve.get()))?;
            let poly_spline = self
                .document
                .add_poly_spline(poly_curve, poly_points)
                .ok_or(EngineError::NotACurve(poly_curve.get()))?;
            let ids = DemoObjects {
                bezier_curve,
                bezier_spline,
                nurbs_spline,
                poly_curve,
                poly_spline,
                mesh,
            };

            debug!(
                bezier_curve = ids.bezier_curve.get(),
                poly_curve = ids.poly_curve.get(),
                mesh = ids.mesh.get(),
                "已创建演示对象"
            );

            Ok(ids)
        }
    }

    impl Default for Scene {
        fn default() -> Self {
            Self::new()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn demo_population_creates_objects() {
            let mut scene = Scene::new();
            let ids = scene.populate_demo().expect("demo scene");
            assert_eq!(scene.document().object_count(), 3);
            assert_eq!(
                scene.document().curve(ids.bezier_curve).unwrap().spline_count(),
                2
            );
            assert!(scene.document().curve(ids.mesh).is_none());
            assert_eq!(
                scene
                    .document()
                    .spline(ids.bezier_curve, ids.bezier_spline)
                    .unwrap()
                    .selected_indices(),
                vec![1]
            );
        }

        #[test]
        fn selection_keeps_insertion_order() {
            let mut scene = Scene::new();
            let ids = scene.populate_demo().expect("demo scene");

            scene.select(ids.mesh).unwrap();
            scene.select(ids.poly_curve).unwrap();
            scene.select(ids.bezier_curve).unwrap();
            scene.select(ids.mesh).unwrap();

            let order: Vec<_> = scene.selected_objects().collect();
            assert_eq!(order, vec![ids.mesh, ids.poly_curve, ids.bezier_curve]);

            scene.clear_selection();
            scene.select(ids.bezier_curve).unwrap();
            scene.select_all();
            let order: Vec<_> = scene.selected_objects().collect();
            assert_eq!(order, vec![ids.bezier_curve, ids.poly_curve, ids.mesh]);
        }

        #[test]
        fn selection_operations_work() {
            let mut scene = Scene::new();
            let ids = scene.populate_demo().expect("demo scene");

            assert_eq!(scene.selection_len(), 0);
            assert!(!scene.has_selected_curve());

            scene.select(ids.mesh).expect("select mesh");
            assert!(scene.is_selected(ids.mesh));
            assert!(!scene.has_selected_curve());

            scene.select_all();
            assert_eq!(scene.selection_len(), 3);
            assert!(scene.has_selected_curve());

            scene.clear_selection();
            assert_eq!(scene.selection_len(), 0);

            let missing = ObjectId::new(9_999);
            let err = scene.select(missing).unwrap_err();
            assert!(matches!(err, EngineError::ObjectNotFound(9_999)));
        }

        #[test]
        fn deselect_all_points_only_touches_selected_objects() {
            let mut scene = Scene::new();
            let ids = scene.populate_demo().expect("demo scene");
            scene
                .document_mut()
                .spline_mut(ids.poly_curve, ids.poly_spline)
                .unwrap()
                .select_points(&[0]);

            scene.select(ids.bezier_curve).unwrap();
            scene.deselect_all_points();

            let document = scene.document();
            let bezier = document.curve(ids.bezier_curve).unwrap();
            assert!(bezier.splines().all(|(_, s)| s.selected_indices().is_empty()));
            let poly = document.spline(ids.poly_curve, ids.poly_spline).unwrap();
            assert_eq!(poly.selected_indices(), vec![0]);
        }

        #[test]
        fn undo_and_redo_swap_snapshots() {
            let mut scene = Scene::new();
            let ids = scene.populate_demo().expect("demo scene");
            assert!(!scene.undo());

            let snapshot = scene.document().clone();
            scene.select(ids.bezier_curve).unwrap();
            scene.deselect_all_points();
            scene.record_undo_step(snapshot);
            assert!(scene.history().can_undo());

            assert!(scene.undo());
            let spline = scene
                .document()
                .spline(ids.bezier_curve, ids.bezier_spline)
                .unwrap();
            assert_eq!(spline.selected_indices(), vec![1]);
            assert!(scene.history().can_redo());

            assert!(scene.redo());
            let spline = scene
                .document()
                .spline(ids.bezier_curve, ids.bezier_spline)
                .unwrap();
            assert!(spline.selected_indices().is_empty());
            assert!(!scene.redo());
        }

        #[test]
        fn history_respects_max_depth() {
            let mut history = UndoHistory::new(2);
            history.record(Document::new());
            history.record(Document::new());
            history.record(Document::new());
            assert_eq!(history.undo_len(), 2);

            let mut disabled = UndoHistory::new(0);
            disabled.record(Document::new());
            assert!(!disabled.can_undo());
        }

        #[test]
        fn recording_after_undo_clears_redo() {
            let mut scene = Scene::new();
            let ids = scene.populate_demo().expect("demo scene");
            scene.select(ids.bezier_curve).unwrap();

            let snapshot = scene.document().clone();
            scene.deselect_all_points();
            scene.record_undo_step(snapshot);
            assert!(scene.undo());
            assert!(scene.history().can_redo());

            let snapshot = scene.document().clone();
            scene
                .document_mut()
                .spline_mut(ids.poly_curve, ids.poly_spline)
                .unwrap()
                .select_points(&[0]);
            scene.record_undo_step(snapshot);

            assert!(!scene.history().can_redo());
            assert!(!scene.redo());
            let poly = scene
                .document()
                .spline(ids.poly_curve, ids.poly_spline)
                .unwrap();
            assert_eq!(poly.selected_indices(), vec![0]);
        }

        #[test]
        fn undo_does_not_roll_back_id_counter() {
            let mut scene = Scene::new();
            scene.populate_demo().expect("demo scene");

            let snapshot = scene.document().clone();
            let discarded = scene.document_mut().allocate_spline_id();
            scene.record_undo_step(snapshot);
            assert!(scene.undo());

            let next = scene.document_mut().allocate_spline_id();
            assert!(next.get() > discarded.get());

            assert!(scene.redo());
            let after_redo = scene.document_mut().allocate_point_id();
            assert!(after_redo.get() > next.get());
        }

        #[test]
        fn load_document_resets_state() {
            let mut scene = Scene::new();
            let ids = scene.populate_demo().expect("demo scene");
            scene.select(ids.bezier_curve).unwrap();
            scene.set_mode(InteractionMode::Edit);
            scene.record_undo_step(Document::new());

            let mut document = Document::new();
            document.add_curve("Other");
            scene.load_document(document);

            assert_eq!(scene.selection_len(), 0);
            assert_eq!(scene.mode(), InteractionMode::Object);
            assert!(!scene.history().can_undo());
            assert_eq!(scene.document().object_count(), 1);
        }
    }
}
