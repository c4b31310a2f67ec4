//! 从选中对象中收集被选中的控制点。只读，不修改选中状态或几何数据。

use ripcurve_core::document::{ObjectId, PointId, SplineId};
use tracing::debug;

use crate::scene::Scene;

/// 一个被选中的控制点及其所属对象与样条。`index` 为解析时的序号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedPoint {
    pub object: ObjectId,
    pub spline: SplineId,
    pub point: PointId,
    pub index: usize,
}

/// 按「对象选中顺序 → 样条存储顺序 → 控制点存储顺序」列出所有被选中的控制点。
///
/// 非曲线对象与非贝塞尔 / 折线样条会被跳过并记录日志。
pub fn resolve_selected_points(scene: &Scene) -> Vec<SelectedPoint> {
    let document = scene.document();
    let mut resolved = Vec::new();

    for object_id in scene.selected_objects() {
        let Some(object) = document.object(object_id) else {
            debug!(object = object_id.get(), "选中集中的对象已不存在，跳过");
            continue;
        };
        let Some(curve) = object.as_curve() else {
            debug!(
                object = object_id.get(),
                kind = object.data.type_name(),
                "不支持的对象类型，跳过"
            );
            continue;
        };

        for (spline_id, spline) in curve.splines() {
            if !spline.kind().is_rip_supported() {
                debug!(
                    object = object_id.get(),
                    spline = spline_id.get(),
                    kind = spline.kind().label(),
                    "不支持的样条类型，跳过"
                );
                continue;
            }
            resolved.extend(
                spline
                    .points()
                    .enumerate()
                    .filter(|(_, point)| point.is_selected())
                    .map(|(index, point)| SelectedPoint {
                        object: object_id,
                        spline: spline_id,
                        point: point.id(),
                        index,
                    }),
            );
        }
    }

    debug!(count = resolved.len(), "已解析选中控制点");
    resolved
}
