pub mod geometry {
    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    /// 三维点，内部以 `glam::DVec3` 表示。曲线控制点与贝塞尔手柄共用该类型。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        pub const ORIGIN: Point3 = Point3(DVec3::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }
    }

    impl Default for Point3 {
        fn default() -> Self {
            Self::ORIGIN
        }
    }
}

pub mod document {
    use serde::{Deserialize, Serialize};

    use crate::geometry::Point3;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ObjectId(u64);

    impl ObjectId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct SplineId(u64);

    impl SplineId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    /// 控制点标识。点的身份只由 ID 决定，坐标相同的两个点仍是不同实体。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct PointId(u64);

    impl PointId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum SplineKind {
        Bezier,
        Poly,
        Nurbs,
    }

    impl SplineKind {
        /// 撕裂操作只支持贝塞尔与折线样条。
        #[inline]
        pub fn is_rip_supported(self) -> bool {
            matches!(self, SplineKind::Bezier | SplineKind::Poly)
        }

        pub fn label(self) -> &'static str {
            match self {
                SplineKind::Bezier => "bezier",
                SplineKind::Poly => "poly",
                SplineKind::Nurbs => "nurbs",
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum HandleType {
        Free,
        Vector,
        Aligned,
        #[default]
        Auto,
    }

    /// 贝塞尔控制点：中心点与左右两个手柄，三者各自拥有独立的选中标记。
    #[derive(Debug, Clone, PartialEq)]
    pub struct BezierPoint {
        pub co: Point3,
        pub handle_left: Point3,
        pub handle_right: Point3,
        pub handle_left_type: HandleType,
        pub handle_right_type: HandleType,
        pub tilt: f64,
        pub radius: f64,
        pub select_control_point: bool,
        pub select_left_handle: bool,
        pub select_right_handle: bool,
    }

    impl BezierPoint {
        pub fn new(co: Point3, handle_left: Point3, handle_right: Point3) -> Self {
            Self {
                co,
                handle_left,
                handle_right,
                handle_left_type: HandleType::default(),
                handle_right_type: HandleType::default(),
                tilt: 0.0,
                radius: 1.0,
                select_control_point: false,
                select_left_handle: false,
                select_right_handle: false,
            }
        }

        /// 中心点或任一手柄被选中即视为整个控制点被选中。
        #[inline]
        pub fn is_selected(&self) -> bool {
            self.select_control_point || self.select_left_handle || self.select_right_handle
        }

        #[inline]
        pub fn deselect(&mut self) {
            self.select_control_point = false;
            self.select_left_handle = false;
            self.select_right_handle = false;
        }
    }

    /// 折线 / NURBS 样条使用的普通控制点，只有一个选中标记。
    #[derive(Debug, Clone, PartialEq)]
    pub struct SplinePoint {
        pub co: Point3,
        pub weight: f64,
        pub tilt: f64,
        pub radius: f64,
        pub select: bool,
    }

    impl SplinePoint {
        pub fn new(co: Point3) -> Self {
            Self {
                co,
                weight: 1.0,
                tilt: 0.0,
                radius: 1.0,
                select: false,
            }
        }
    }

    /// 样条中某个控制点的只读视图，屏蔽贝塞尔点与普通点的差异。
    #[derive(Debug, Clone, Copy)]
    pub enum PointRef<'a> {
        Bezier(PointId, &'a BezierPoint),
        Plain(PointId, &'a SplinePoint),
    }

    impl<'a> PointRef<'a> {
        #[inline]
        pub fn id(&self) -> PointId {
            match self {
                PointRef::Bezier(id, _) | PointRef::Plain(id, _) => *id,
            }
        }

        #[inline]
        pub fn co(&self) -> Point3 {
            match self {
                PointRef::Bezier(_, point) => point.co,
                PointRef::Plain(_, point) => point.co,
            }
        }

        #[inline]
        pub fn is_selected(&self) -> bool {
            match self {
                PointRef::Bezier(_, point) => point.is_selected(),
                PointRef::Plain(_, point) => point.select,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum SplinePoints {
        Bezier(Vec<(PointId, BezierPoint)>),
        Plain(Vec<(PointId, SplinePoint)>),
    }

    /// 有序控制点序列。首尾由位置决定，顺序即拓扑。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Spline {
        kind: SplineKind,
        points: SplinePoints,
        pub use_cyclic: bool,
        pub order_u: u32,
        pub resolution_u: u32,
    }

    impl Spline {
        const DEFAULT_ORDER: u32 = 4;
        const DEFAULT_RESOLUTION: u32 = 12;

        fn with_points(kind: SplineKind, points: SplinePoints) -> Self {
            Self {
                kind,
                points,
                use_cyclic: false,
                order_u: Self::DEFAULT_ORDER,
                resolution_u: Self::DEFAULT_RESOLUTION,
            }
        }

        #[inline]
        pub fn kind(&self) -> SplineKind {
            self.kind
        }

        pub fn len(&self) -> usize {
            match &self.points {
                SplinePoints::Bezier(points) => points.len(),
                SplinePoints::Plain(points) => points.len(),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        /// 按存储顺序遍历控制点：贝塞尔样条返回贝塞尔点，其余返回普通点。
        pub fn points(&self) -> impl Iterator<Item = PointRef<'_>> + '_ {
            let (bezier, plain) = match &self.points {
                SplinePoints::Bezier(points) => (Some(points.iter()), None),
                SplinePoints::Plain(points) => (None, Some(points.iter())),
            };
            bezier
                .into_iter()
                .flatten()
                .map(|(id, point)| PointRef::Bezier(*id, point))
                .chain(
                    plain
                        .into_iter()
                        .flatten()
                        .map(|(id, point)| PointRef::Plain(*id, point)),
                )
        }

        pub fn point(&self, index: usize) -> Option<PointRef<'_>> {
            match &self.points {
                SplinePoints::Bezier(points) => points
                    .get(index)
                    .map(|(id, point)| PointRef::Bezier(*id, point)),
                SplinePoints::Plain(points) => points
                    .get(index)
                    .map(|(id, point)| PointRef::Plain(*id, point)),
            }
        }

        /// 贝塞尔点切片；非贝塞尔样条返回空切片。
        pub fn bezier_points(&self) -> &[(PointId, BezierPoint)] {
            match &self.points {
                SplinePoints::Bezier(points) => points,
                SplinePoints::Plain(_) => &[],
            }
        }

        /// 普通点切片；贝塞尔样条返回空切片。
        pub fn plain_points(&self) -> &[(PointId, SplinePoint)] {
            match &self.points {
                SplinePoints::Plain(points) => points,
                SplinePoints::Bezier(_) => &[],
            }
        }

        pub fn point_ids(&self) -> Vec<PointId> {
            self.points().map(|point| point.id()).collect()
        }

        /// 按身份线性查找控制点的序号。
        pub fn point_index(&self, id: PointId) -> Option<usize> {
            self.points().position(|point| point.id() == id)
        }

        pub fn selected_indices(&self) -> Vec<usize> {
            self.points()
                .enumerate()
                .filter(|(_, point)| point.is_selected())
                .map(|(index, _)| index)
                .collect()
        }

        /// 选中给定序号的控制点（贝塞尔样条只设置中心点标记）。
        ///
        /// `indices` 为空时选中全部控制点。该操作只会追加选中，不清除已有选中；
        /// 越界序号被忽略，不支持的样条类型直接返回。
        pub fn select_points(&mut self, indices: &[usize]) {
            if !self.kind.is_rip_supported() {
                return;
            }
            let count = self.len();
            let all: Vec<usize>;
            let targets: &[usize] = if indices.is_empty() {
                all = (0..count).collect();
                &all
            } else {
                indices
            };

            match &mut self.points {
                SplinePoints::Bezier(points) => {
                    for &index in targets {
                        if let Some((_, point)) = points.get_mut(index) {
                            point.select_control_point = true;
                        }
                    }
                }
                SplinePoints::Plain(points) => {
                    for &index in targets {
                        if let Some((_, point)) = points.get_mut(index) {
                            point.select = true;
                        }
                    }
                }
            }
        }

        pub fn deselect_all(&mut self) {
            match &mut self.points {
                SplinePoints::Bezier(points) => {
                    for (_, point) in points.iter_mut() {
                        point.deselect();
                    }
                }
                SplinePoints::Plain(points) => {
                    for (_, point) in points.iter_mut() {
                        point.select = false;
                    }
                }
            }
        }

        /// 在 `index` 处拆分样条：自身保留 `[0..=index]`，返回的新样条包含 `[index..]`。
        ///
        /// 拆分点在两侧各有一份：新样条的首点是它的副本，使用 `duplicate_id` 作为身份；
        /// 其后的点连同原身份一起移入新样条。其他属性（类型、闭合、阶数、精度）原样复制。
        /// 序号越界时返回 `None` 且不做任何修改。
        pub fn split_off_at(&mut self, index: usize, duplicate_id: PointId) -> Option<Spline> {
            if index >= self.len() {
                return None;
            }
            let tail = match &mut self.points {
                SplinePoints::Bezier(points) => {
                    SplinePoints::Bezier(split_keeping_pivot(points, index, duplicate_id))
                }
                SplinePoints::Plain(points) => {
                    SplinePoints::Plain(split_keeping_pivot(points, index, duplicate_id))
                }
            };
            Some(Spline {
                kind: self.kind,
                points: tail,
                use_cyclic: self.use_cyclic,
                order_u: self.order_u,
                resolution_u: self.resolution_u,
            })
        }
    }

    fn split_keeping_pivot<T: Clone>(
        points: &mut Vec<(PointId, T)>,
        index: usize,
        duplicate_id: PointId,
    ) -> Vec<(PointId, T)> {
        let mut tail = Vec::with_capacity(points.len() - index);
        tail.push((duplicate_id, points[index].1.clone()));
        tail.extend(points.drain(index + 1..));
        tail
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Curve {
        splines: Vec<(SplineId, Spline)>,
    }

    impl Curve {
        pub fn splines(&self) -> impl Iterator<Item = (SplineId, &Spline)> {
            self.splines.iter().map(|(id, spline)| (*id, spline))
        }

        #[inline]
        pub fn spline_count(&self) -> usize {
            self.splines.len()
        }

        pub fn spline(&self, id: SplineId) -> Option<&Spline> {
            self.splines
                .iter()
                .find(|(spline_id, _)| *spline_id == id)
                .map(|(_, spline)| spline)
        }

        pub fn spline_mut(&mut self, id: SplineId) -> Option<&mut Spline> {
            self.splines
                .iter_mut()
                .find(|(spline_id, _)| *spline_id == id)
                .map(|(_, spline)| spline)
        }

        /// 追加样条到末尾；ID 应由 [`Document`] 分配。
        pub fn push_spline(&mut self, id: SplineId, spline: Spline) {
            self.splines.push((id, spline));
        }

        /// 清空该对象内所有控制点与手柄的选中标记。
        pub fn deselect_all(&mut self) {
            for (_, spline) in &mut self.splines {
                spline.deselect_all();
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum ObjectData {
        Curve(Curve),
        Mesh,
        Empty,
    }

    impl ObjectData {
        pub fn type_name(&self) -> &'static str {
            match self {
                ObjectData::Curve(_) => "curve",
                ObjectData::Mesh => "mesh",
                ObjectData::Empty => "empty",
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct SceneObject {
        pub name: String,
        pub data: ObjectData,
    }

    impl SceneObject {
        #[inline]
        pub fn as_curve(&self) -> Option<&Curve> {
            match &self.data {
                ObjectData::Curve(curve) => Some(curve),
                _ => None,
            }
        }

        #[inline]
        pub fn as_curve_mut(&mut self) -> Option<&mut Curve> {
            match &mut self.data {
                ObjectData::Curve(curve) => Some(curve),
                _ => None,
            }
        }
    }

    /// 场景文档：持有全部对象，并统一分配对象、样条、控制点的 ID（单调递增，不复用）。
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Document {
        objects: Vec<(ObjectId, SceneObject)>,
        next_id: u64,
    }

    impl Document {
        pub fn new() -> Self {
            Self::default()
        }

        #[inline]
        fn next_raw_id(&mut self) -> u64 {
            let id = self.next_id;
            self.next_id += 1;
            id
        }

        pub fn allocate_spline_id(&mut self) -> SplineId {
            SplineId::new(self.next_raw_id())
        }

        pub fn allocate_point_id(&mut self) -> PointId {
            PointId::new(self.next_raw_id())
        }

        /// 让 ID 计数器不低于 `other` 的计数器，用于恢复旧快照后继续分配而不复用 ID。
        pub fn reserve_ids_from(&mut self, other: &Document) {
            self.next_id = self.next_id.max(other.next_id);
        }

        /// 比较对象内容，忽略 ID 计数器。
        pub fn same_content(&self, other: &Document) -> bool {
            self.objects == other.objects
        }

        fn add_object(&mut self, name: impl Into<String>, data: ObjectData) -> ObjectId {
            let id = ObjectId::new(self.next_raw_id());
            self.objects.push((
                id,
                SceneObject {
                    name: name.into(),
                    data,
                },
            ));
            id
        }

        pub fn add_curve(&mut self, name: impl Into<String>) -> ObjectId {
            self.add_object(name, ObjectData::Curve(Curve::default()))
        }

        pub fn add_mesh(&mut self, name: impl Into<String>) -> ObjectId {
            self.add_object(name, ObjectData::Mesh)
        }

        pub fn add_empty(&mut self, name: impl Into<String>) -> ObjectId {
            self.add_object(name, ObjectData::Empty)
        }

        /// 向曲线对象追加贝塞尔样条；对象不存在或不是曲线时返回 `None`。
        pub fn add_bezier_spline<I>(&mut self, object: ObjectId, points: I) -> Option<SplineId>
        where
            I: IntoIterator<Item = BezierPoint>,
        {
            self.curve(object)?;
            let points: Vec<_> = points
                .into_iter()
                .map(|point| (self.allocate_point_id(), point))
                .collect();
            self.push_new_spline(
                object,
                Spline::with_points(SplineKind::Bezier, SplinePoints::Bezier(points)),
            )
        }

        pub fn add_poly_spline<I>(&mut self, object: ObjectId, points: I) -> Option<SplineId>
        where
            I: IntoIterator<Item = SplinePoint>,
        {
            self.add_plain_spline(object, SplineKind::Poly, points)
        }

        pub fn add_nurbs_spline<I>(&mut self, object: ObjectId, points: I) -> Option<SplineId>
        where
            I: IntoIterator<Item = SplinePoint>,
        {
            self.add_plain_spline(object, SplineKind::Nurbs, points)
        }

        fn add_plain_spline<I>(
            &mut self,
            object: ObjectId,
            kind: SplineKind,
            points: I,
        ) -> Option<SplineId>
        where
            I: IntoIterator<Item = SplinePoint>,
        {
            self.curve(object)?;
            let points: Vec<_> = points
                .into_iter()
                .map(|point| (self.allocate_point_id(), point))
                .collect();
            self.push_new_spline(object, Spline::with_points(kind, SplinePoints::Plain(points)))
        }

        fn push_new_spline(&mut self, object: ObjectId, spline: Spline) -> Option<SplineId> {
            let id = self.allocate_spline_id();
            self.curve_mut(object)?.push_spline(id, spline);
            Some(id)
        }

        pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
            self.objects.iter().map(|(id, object)| (*id, object))
        }

        #[inline]
        pub fn object_count(&self) -> usize {
            self.objects.len()
        }

        pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
            self.objects
                .iter()
                .find(|(object_id, _)| *object_id == id)
                .map(|(_, object)| object)
        }

        pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
            self.objects
                .iter_mut()
                .find(|(object_id, _)| *object_id == id)
                .map(|(_, object)| object)
        }

        pub fn find_object(&self, name: &str) -> Option<ObjectId> {
            self.objects
                .iter()
                .find(|(_, object)| object.name == name)
                .map(|(id, _)| *id)
        }

        pub fn curve(&self, id: ObjectId) -> Option<&Curve> {
            self.object(id).and_then(SceneObject::as_curve)
        }

        pub fn curve_mut(&mut self, id: ObjectId) -> Option<&mut Curve> {
            self.object_mut(id).and_then(SceneObject::as_curve_mut)
        }

        pub fn spline(&self, object: ObjectId, spline: SplineId) -> Option<&Spline> {
            self.curve(object).and_then(|curve| curve.spline(spline))
        }

        pub fn spline_mut(&mut self, object: ObjectId, spline: SplineId) -> Option<&mut Spline> {
            self.curve_mut(object)
                .and_then(|curve| curve.spline_mut(spline))
        }
    }

}
