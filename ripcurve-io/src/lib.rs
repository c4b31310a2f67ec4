use std::fs;
use std::path::Path;

use ripcurve_core::{
    document::{
        BezierPoint, Document, HandleType, ObjectData, ObjectId, SplineKind, SplinePoint,
    },
    geometry::Point3,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse document: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

pub trait DocumentSaver {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError>;
}

/// JSON 文档读写。文件中不保存 ID，加载时由 `Document` 重新分配。
pub struct JsonFacade;

impl JsonFacade {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, data: &str) -> Result<Document, IoError> {
        let file: DocumentFile = serde_json::from_str(data).map_err(IoError::Parse)?;
        file.into_document()
    }

    pub fn to_json(&self, document: &Document) -> Result<String, IoError> {
        serde_json::to_string_pretty(&DocumentFile::from_document(document))
            .map_err(IoError::Serialize)
    }
}

impl Default for JsonFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLoader for JsonFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        self.parse(&data)
    }
}

impl DocumentSaver for JsonFacade {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError> {
        let data = self.to_json(document)?;
        fs::write(path, data).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DocumentFile {
    #[serde(default)]
    objects: Vec<ObjectRecord>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ObjectKind {
    Curve,
    Mesh,
    Empty,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectRecord {
    name: String,
    #[serde(rename = "type")]
    kind: ObjectKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    splines: Vec<SplineRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SplineRecord {
    #[serde(rename = "type")]
    kind: SplineKind,
    #[serde(default)]
    cyclic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order_u: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolution_u: Option<u32>,
    points: Vec<PointRecord>,
}

// 贝塞尔点必须带手柄，因此先尝试贝塞尔格式；两种格式都拒绝未知字段。
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PointRecord {
    Bezier(BezierPointRecord),
    Plain(PlainPointRecord),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BezierPointRecord {
    co: Point3,
    handle_left: Point3,
    handle_right: Point3,
    #[serde(default)]
    handle_left_type: HandleType,
    #[serde(default)]
    handle_right_type: HandleType,
    #[serde(default)]
    tilt: f64,
    #[serde(default = "default_radius")]
    radius: f64,
    #[serde(default)]
    select_control_point: bool,
    #[serde(default)]
    select_left_handle: bool,
    #[serde(default)]
    select_right_handle: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlainPointRecord {
    co: Point3,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    tilt: f64,
    #[serde(default = "default_radius")]
    radius: f64,
    #[serde(default)]
    select: bool,
}

fn default_radius() -> f64 {
    1.0
}

fn default_weight() -> f64 {
    1.0
}

impl From<BezierPointRecord> for BezierPoint {
    fn from(record: BezierPointRecord) -> Self {
        Self {
            co: record.co,
            handle_left: record.handle_left,
            handle_right: record.handle_right,
            handle_left_type: record.handle_left_type,
            handle_right_type: record.handle_right_type,
            tilt: record.tilt,
            radius: record.radius,
            select_control_point: record.select_control_point,
            select_left_handle: record.select_left_handle,
            select_right_handle: record.select_right_handle,
        }
    }
}

impl From<&BezierPoint> for BezierPointRecord {
    fn from(point: &BezierPoint) -> Self {
        Self {
            co: point.co,
            handle_left: point.handle_left,
            handle_right: point.handle_right,
            handle_left_type: point.handle_left_type,
            handle_right_type: point.handle_right_type,
            tilt: point.tilt,
            radius: point.radius,
            select_control_point: point.select_control_point,
            select_left_handle: point.select_left_handle,
            select_right_handle: point.select_right_handle,
        }
    }
}

impl From<PlainPointRecord> for SplinePoint {
    fn from(record: PlainPointRecord) -> Self {
        Self {
            co: record.co,
            weight: record.weight,
            tilt: record.tilt,
            radius: record.radius,
            select: record.select,
        }
    }
}

impl From<&SplinePoint> for PlainPointRecord {
    fn from(point: &SplinePoint) -> Self {
        Self {
            co: point.co,
            weight: point.weight,
            tilt: point.tilt,
            radius: point.radius,
            select: point.select,
        }
    }
}

impl DocumentFile {
    fn into_document(self) -> Result<Document, IoError> {
        let mut document = Document::new();
        for object in self.objects {
            match object.kind {
                ObjectKind::Mesh | ObjectKind::Empty if !object.splines.is_empty() => {
                    return Err(IoError::InvalidDocument(format!(
                        "object `{}` is not a curve but has splines",
                        object.name
                    )));
                }
                ObjectKind::Mesh => {
                    document.add_mesh(object.name);
                }
                ObjectKind::Empty => {
                    document.add_empty(object.name);
                }
                ObjectKind::Curve => {
                    let id = document.add_curve(object.name.as_str());
                    for (index, spline) in object.splines.into_iter().enumerate() {
                        add_spline(&mut document, id, spline).map_err(|message| {
                            IoError::InvalidDocument(format!(
                                "object `{}`, spline {index}: {message}",
                                object.name
                            ))
                        })?;
                    }
                }
            }
        }
        Ok(document)
    }

    fn from_document(document: &Document) -> Self {
        let objects = document
            .objects()
            .map(|(_, object)| match &object.data {
                ObjectData::Curve(curve) => ObjectRecord {
                    name: object.name.clone(),
                    kind: ObjectKind::Curve,
                    splines: curve
                        .splines()
                        .map(|(_, spline)| {
                            let points = match spline.kind() {
                                SplineKind::Bezier => spline
                                    .bezier_points()
                                    .iter()
                                    .map(|(_, point)| PointRecord::Bezier(point.into()))
                                    .collect(),
                                SplineKind::Poly | SplineKind::Nurbs => spline
                                    .plain_points()
                                    .iter()
                                    .map(|(_, point)| PointRecord::Plain(point.into()))
                                    .collect(),
                            };
                            SplineRecord {
                                kind: spline.kind(),
                                cyclic: spline.use_cyclic,
                                order_u: Some(spline.order_u),
                                resolution_u: Some(spline.resolution_u),
                                points,
                            }
                        })
                        .collect(),
                },
                ObjectData::Mesh => ObjectRecord {
                    name: object.name.clone(),
                    kind: ObjectKind::Mesh,
                    splines: Vec::new(),
                },
                ObjectData::Empty => ObjectRecord {
                    name: object.name.clone(),
                    kind: ObjectKind::Empty,
                    splines: Vec::new(),
                },
            })
            .collect();
        Self { objects }
    }
}

fn add_spline(
    document: &mut Document,
    object: ObjectId,
    record: SplineRecord,
) -> Result<(), String> {
    let spline = match record.kind {
        SplineKind::Bezier => {
            let points = record
                .points
                .into_iter()
                .map(|point| match point {
                    PointRecord::Bezier(point) => Ok(BezierPoint::from(point)),
                    PointRecord::Plain(_) => Err("bezier spline point is missing handles"),
                })
                .collect::<Result<Vec<_>, _>>()?;
            document.add_bezier_spline(object, points)
        }
        SplineKind::Poly | SplineKind::Nurbs => {
            let points = record
                .points
                .into_iter()
                .map(|point| match point {
                    PointRecord::Plain(point) => Ok(SplinePoint::from(point)),
                    PointRecord::Bezier(_) => Err("handles are only allowed on bezier splines"),
                })
                .collect::<Result<Vec<_>, _>>()?;
            if record.kind == SplineKind::Poly {
                document.add_poly_spline(object, points)
            } else {
                document.add_nurbs_spline(object, points)
            }
        }
    };

    let spline = spline
        .and_then(|id| document.spline_mut(object, id))
        .ok_or_else(|| "curve object disappeared while loading".to_string())?;
    spline.use_cyclic = record.cyclic;
    if let Some(order) = record.order_u {
        spline.order_u = order;
    }
    if let Some(resolution) = record.resolution_u {
        spline.resolution_u = resolution;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_document() {
        let document = JsonFacade::new()
            .parse(
                r#"{
                    "objects": [
                        { "name": "Lamp", "type": "empty" },
                        {
                            "name": "Wire",
                            "type": "curve",
                            "splines": [
                                {
                                    "type": "poly",
                                    "cyclic": true,
                                    "points": [
                                        { "co": [0.0, 0.0, 0.0] },
                                        { "co": [1.0, 0.0, 0.0], "select": true, "weight": 0.5 }
                                    ]
                                }
                            ]
                        }
                    ]
                }"#,
            )
            .expect("parse document");

        assert_eq!(document.object_count(), 2);
        let wire = document.find_object("Wire").unwrap();
        let curve = document.curve(wire).unwrap();
        let (_, spline) = curve.splines().next().unwrap();
        assert_eq!(spline.kind(), SplineKind::Poly);
        assert!(spline.use_cyclic);
        assert_eq!(spline.order_u, 4);
        assert_eq!(spline.selected_indices(), vec![1]);
        assert!((spline.plain_points()[1].1.weight - 0.5).abs() < f64::EPSILON);
        assert!((spline.plain_points()[0].1.radius - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bezier_spline_requires_handles() {
        let err = JsonFacade::new()
            .parse(
                r#"{ "objects": [ { "name": "C", "type": "curve", "splines": [
                    { "type": "bezier", "points": [ { "co": [0, 0, 0] } ] }
                ] } ] }"#,
            )
            .unwrap_err();
        assert!(matches!(err, IoError::InvalidDocument(message) if message.contains("handles")));
    }

    #[test]
    fn point_with_mixed_fields_is_rejected() {
        let err = JsonFacade::new()
            .parse(
                r#"{ "objects": [ { "name": "C", "type": "curve", "splines": [
                    { "type": "bezier", "points": [
                        { "co": [0, 0, 0], "handle_left": [-1, 0, 0], "handle_right": [1, 0, 0],
                          "select": true }
                    ] }
                ] } ] }"#,
            )
            .unwrap_err();
        assert!(matches!(err, IoError::Parse(_)));
    }

    #[test]
    fn mesh_with_splines_is_invalid() {
        let err = JsonFacade::new()
            .parse(
                r#"{ "objects": [ { "name": "M", "type": "mesh", "splines": [
                    { "type": "poly", "points": [] }
                ] } ] }"#,
            )
            .unwrap_err();
        assert!(matches!(err, IoError::InvalidDocument(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = JsonFacade::new().parse("{ objects: ").unwrap_err();
        assert!(matches!(err, IoError::Parse(_)));
    }
}
