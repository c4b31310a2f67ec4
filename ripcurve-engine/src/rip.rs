use ripcurve_core::document::{Document, ObjectId, PointId, Spline, SplineId};
use tracing::info;

use crate::errors::{EngineError, RipError, SplineEnd};
use crate::resolver::{SelectedPoint, resolve_selected_points};
use crate::scene::{InteractionMode, Scene};

/// 一次成功撕裂的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RipOutcome {
    pub object: ObjectId,
    pub original: SplineId,
    pub new_spline: SplineId,
    pub split_index: usize,
    /// 新样条首点，即拆分点的副本。
    pub duplicate: PointId,
}

/// 校验候选集：必须恰好一个控制点，且不能是样条的首点或尾点。
///
/// 纯函数，不修改任何状态；可用性检查与执行前检查都调用它。
pub fn check_eligible<'a>(
    document: &Document,
    candidates: &'a [SelectedPoint],
) -> Result<&'a SelectedPoint, RipError> {
    let target = match candidates {
        [] => return Err(RipError::NoSelection),
        [only] => only,
        _ => {
            return Err(RipError::AmbiguousSelection {
                count: candidates.len(),
            });
        }
    };
    let (spline, index) = locate(document, target)?;
    ensure_interior(index, spline.len())?;
    Ok(target)
}

/// 命令层的完整前置检查：交互模式、选中解析、候选校验。
pub fn failcheck(scene: &Scene) -> Result<SelectedPoint, RipError> {
    if scene.mode() != InteractionMode::Edit {
        return Err(RipError::NotInEditMode);
    }
    let candidates = resolve_selected_points(scene);
    check_eligible(scene.document(), &candidates).copied()
}

/// 在 `target` 处把样条一分为二。
///
/// 原样条保留 `[0..=i]`，新样条包含 `[i..n)` 并追加到同一曲线的末尾，拆分点在两侧各一份。
/// 完成后清空该对象的选中，只重新选中原样条上的第 `i` 个点。
/// 所有校验都在修改之前完成，失败时文档保持不变。
pub fn rip_point(scene: &mut Scene, target: &SelectedPoint) -> Result<RipOutcome, RipError> {
    let document = scene.document_mut();
    let (count, split_index) = {
        let (spline, index) = locate(document, target)?;
        (spline.len(), index)
    };
    ensure_interior(split_index, count)?;

    let duplicate = document.allocate_point_id();
    let new_spline = document.allocate_spline_id();
    let curve = document
        .curve_mut(target.object)
        .ok_or(EngineError::NotACurve(target.object.get()))?;
    let original = curve
        .spline_mut(target.spline)
        .ok_or(EngineError::SplineNotFound(target.spline.get()))?;
    let tail = original
        .split_off_at(split_index, duplicate)
        .ok_or(EngineError::PointNotFound(target.point.get()))?;
    curve.push_spline(new_spline, tail);

    curve.deselect_all();
    if let Some(original) = curve.spline_mut(target.spline) {
        original.select_points(&[split_index]);
    }

    info!(
        object = target.object.get(),
        spline = target.spline.get(),
        new_spline = new_spline.get(),
        split_index,
        point_count = count,
        "样条已撕裂"
    );

    Ok(RipOutcome {
        object: target.object,
        original: target.spline,
        new_spline,
        split_index,
        duplicate,
    })
}

/// 解析当前选中并撕裂唯一的候选点。
pub fn rip_selected(scene: &mut Scene) -> Result<RipOutcome, RipError> {
    let target = failcheck(scene)?;
    rip_point(scene, &target)
}

fn locate<'d>(
    document: &'d Document,
    target: &SelectedPoint,
) -> Result<(&'d Spline, usize), EngineError> {
    let object = document
        .object(target.object)
        .ok_or(EngineError::ObjectNotFound(target.object.get()))?;
    let curve = object
        .as_curve()
        .ok_or(EngineError::NotACurve(target.object.get()))?;
    let spline = curve
        .spline(target.spline)
        .ok_or(EngineError::SplineNotFound(target.spline.get()))?;
    // 解析后样条未变时序号仍然有效，否则按身份重新查找
    let index = match spline.point(target.index) {
        Some(point) if point.id() == target.point => target.index,
        _ => spline
            .point_index(target.point)
            .ok_or(EngineError::PointNotFound(target.point.get()))?,
    };
    Ok((spline, index))
}

fn ensure_interior(index: usize, count: usize) -> Result<(), RipError> {
    if index == 0 {
        Err(RipError::BoundaryPoint {
            end: SplineEnd::First,
        })
    } else if index + 1 >= count {
        Err(RipError::BoundaryPoint {
            end: SplineEnd::Last,
        })
    } else {
        Ok(())
    }
}
