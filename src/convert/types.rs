use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
};

use nalgebra::{Matrix4, Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, ConvertResult};

// ─── Constants ────────────────────────────────────────────────────────────────

/// Length substituted for bones whose end point coincides with their center
/// point. Zero-length bones cannot be represented by the target skeleton.
pub const MIN_BONE_LENGTH: f32 = 0.01;

/// Bone lengths at or below this value are treated as zero.
pub const BONE_LENGTH_EPSILON: f32 = 1e-6;

// ─── Options ──────────────────────────────────────────────────────────────────

/// Tunables for skeleton reconstruction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConvertOptions {
    /// Length used in place of a numerically zero bone length.
    pub min_bone_length: f32,
    /// Threshold under which a bone length counts as zero.
    pub bone_length_epsilon: f32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            min_bone_length: MIN_BONE_LENGTH,
            bone_length_epsilon: BONE_LENGTH_EPSILON,
        }
    }
}

impl ConvertOptions {
    /// Rejects limits that would let a bone end up with no length.
    pub fn validate(&self) -> ConvertResult<()> {
        if !self.min_bone_length.is_finite() || self.min_bone_length <= 0.0 {
            return Err(ConvertError::InvalidOptions(format!(
                "min_bone_length must be finite and positive, got {}",
                self.min_bone_length
            )));
        }
        if !self.bone_length_epsilon.is_finite() || self.bone_length_epsilon < 0.0 {
            return Err(ConvertError::InvalidOptions(format!(
                "bone_length_epsilon must be finite and non-negative, got {}",
                self.bone_length_epsilon
            )));
        }
        Ok(())
    }
}

// ─── Node records ─────────────────────────────────────────────────────────────

/// Kind of a scene-graph node as declared by the asset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Figure,
    Bone,
    Node,
    Camera,
    Light,
    #[serde(other)]
    Other,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Figure => "figure",
            NodeType::Bone => "bone",
            NodeType::Node => "node",
            NodeType::Camera => "camera",
            NodeType::Light => "light",
            NodeType::Other => "other",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coordinate axis of the asset space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Euler rotation order of a bone. The first axis is the bone's primary
/// (twist) axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum RotationOrder {
    #[default]
    #[serde(rename = "XYZ", alias = "xyz")]
    Xyz,
    #[serde(rename = "XZY", alias = "xzy")]
    Xzy,
    #[serde(rename = "YXZ", alias = "yxz")]
    Yxz,
    #[serde(rename = "YZX", alias = "yzx")]
    Yzx,
    #[serde(rename = "ZXY", alias = "zxy")]
    Zxy,
    #[serde(rename = "ZYX", alias = "zyx")]
    Zyx,
}

impl RotationOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationOrder::Xyz => "XYZ",
            RotationOrder::Xzy => "XZY",
            RotationOrder::Yxz => "YXZ",
            RotationOrder::Yzx => "YZX",
            RotationOrder::Zxy => "ZXY",
            RotationOrder::Zyx => "ZYX",
        }
    }

    /// First axis of the order.
    pub fn primary_axis(&self) -> Axis {
        match self {
            RotationOrder::Xyz | RotationOrder::Xzy => Axis::X,
            RotationOrder::Yxz | RotationOrder::Yzx => Axis::Y,
            RotationOrder::Zxy | RotationOrder::Zyx => Axis::Z,
        }
    }
}

impl fmt::Display for RotationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotationOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_uppercase().as_str() {
            "XYZ" => Ok(RotationOrder::Xyz),
            "XZY" => Ok(RotationOrder::Xzy),
            "YXZ" => Ok(RotationOrder::Yxz),
            "YZX" => Ok(RotationOrder::Yzx),
            "ZXY" => Ok(RotationOrder::Zxy),
            "ZYX" => Ok(RotationOrder::Zyx),
            other => Err(format!("unknown rotation order '{other}'")),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_orientation() -> Vector3<f32> {
    Vector3::zeros()
}

/// One entry of the asset's node hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetNode {
    /// Library id; used as the bone name.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Parent reference, possibly a full asset URL.
    #[serde(default)]
    pub parent: Option<String>,
    /// Joint position in asset world space.
    #[serde(default)]
    pub center_point: Option<Point3<f32>>,
    /// Bone end position in asset world space.
    #[serde(default)]
    pub end_point: Option<Point3<f32>>,
    /// Joint orientation in degrees, always evaluated in XYZ order.
    #[serde(default = "default_orientation")]
    pub orientation: Vector3<f32>,
    #[serde(default)]
    pub rotation_order: RotationOrder,
    #[serde(default = "default_true")]
    pub inherits_scale: bool,
}

// ─── Geometry records ─────────────────────────────────────────────────────────

/// Raw polygon geometry as loaded from the asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeometryRecord {
    pub id: String,
    pub vertices: Vec<Point3<f32>>,
    /// Variable-length vertex index lists, one per original face.
    pub polygons: Vec<Vec<usize>>,
    /// Material slot per original face, aligned with `polygons`.
    pub material_indices: Vec<usize>,
    #[serde(default)]
    pub material_names: Vec<String>,
}

/// Mesh rebuilt from a [`GeometryRecord`].
///
/// `faces`, `original_face_indices` and `material_indices` are aligned by
/// emitted position. Vertices keep their original indices.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReconstructedMesh {
    pub name: String,
    pub vertices: Vec<Point3<f32>>,
    pub faces: Vec<Vec<usize>>,
    pub original_face_indices: Vec<usize>,
    pub material_indices: Vec<usize>,
    pub material_names: Vec<String>,
    /// Original indices of polygons dropped as invalid.
    pub skipped_polygons: Vec<usize>,
}

impl ReconstructedMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn corner_count(&self) -> usize {
        self.faces.iter().map(Vec::len).sum()
    }

    /// Offset of each face's first corner in a flat per-corner buffer.
    pub fn corner_starts(&self) -> Vec<usize> {
        self.faces
            .iter()
            .scan(0usize, |offset, face| {
                let start = *offset;
                *offset += face.len();
                Some(start)
            })
            .collect()
    }
}

// ─── UV records ───────────────────────────────────────────────────────────────

/// UV set as stored in the asset file, before the hotswap table is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UvSetRecord {
    pub id: String,
    #[serde(rename = "vertex_count")]
    pub expected_vertex_count: usize,
    pub uv_coordinates: Vec<Point2<f32>>,
    /// `[polygon_index, vertex_index, uv_index]` overrides.
    #[serde(default)]
    pub polygon_vertex_indices: Vec<[usize; 3]>,
}

/// A validated UV set with its per-polygon hotswap table.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(try_from = "UvSetRecord")]
pub struct UvSet {
    pub(crate) id: String,
    pub(crate) expected_vertex_count: usize,
    pub(crate) uv_coordinates: Vec<Point2<f32>>,
    pub(crate) hotswap: BTreeMap<usize, HashMap<usize, usize>>,
}

impl TryFrom<UvSetRecord> for UvSet {
    type Error = ConvertError;

    fn try_from(record: UvSetRecord) -> Result<Self, Self::Error> {
        UvSet::new(
            record.id,
            record.expected_vertex_count,
            record.uv_coordinates,
            &record.polygon_vertex_indices,
        )
    }
}

/// Per-corner UV coordinates for a [`ReconstructedMesh`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UvAssignment {
    pub name: String,
    /// One entry per face corner, faces in emitted order.
    pub per_corner: Vec<Point2<f32>>,
    pub corner_starts: Vec<usize>,
}

// ─── Skeleton ─────────────────────────────────────────────────────────────────

/// Stable index of a bone inside a [`Skeleton`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoneHandle(pub usize);

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Bone {
    pub name: String,
    pub parent: Option<BoneHandle>,
    /// Bare parent id as declared, kept even when it did not resolve.
    pub declared_parent: Option<String>,
    /// Root-relative joint position.
    pub head: Point3<f32>,
    pub tail: Point3<f32>,
    pub length: f32,
    /// True when `length` was substituted for a zero-length bone.
    pub length_clamped: bool,
    /// Bind-pose transform relative to the skeleton root. The bone's length
    /// axis is local +Y.
    pub matrix: Matrix4<f32>,
    pub inherits_scale: bool,
    /// Pose-space rotation mode, set after all bones exist.
    pub rotation_order: Option<RotationOrder>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Skeleton {
    pub name: String,
    /// Asset-space position of the figure; bone heads are relative to it.
    pub root_offset: Point3<f32>,
    pub bones: Vec<Bone>,
    #[serde(skip)]
    pub(crate) by_name: HashMap<String, BoneHandle>,
}

impl Skeleton {
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone(&self, handle: BoneHandle) -> Option<&Bone> {
        self.bones.get(handle.0)
    }

    pub fn find(&self, name: &str) -> Option<BoneHandle> {
        self.by_name.get(name).copied()
    }

    pub fn roots(&self) -> impl Iterator<Item = BoneHandle> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, bone)| bone.parent.is_none())
            .map(|(index, _)| BoneHandle(index))
    }

    pub fn children(&self, handle: BoneHandle) -> impl Iterator<Item = BoneHandle> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(move |(_, bone)| bone.parent == Some(handle))
            .map(|(index, _)| BoneHandle(index))
    }
}

// ─── Skin binding ─────────────────────────────────────────────────────────────

/// A bone and the sparse set of vertices it deforms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightedJoint {
    /// Bone reference, possibly a full asset URL.
    #[serde(rename = "node")]
    pub bone_id: String,
    /// `(vertex_index, weight)` pairs in file order.
    #[serde(rename = "node_weights")]
    pub vertex_weights: Vec<(usize, f32)>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkinBinding {
    pub id: String,
    #[serde(default)]
    pub skeleton: Option<String>,
    #[serde(rename = "vertex_count")]
    pub expected_vertex_count: usize,
    #[serde(rename = "joints")]
    pub weighted_joints: Vec<WeightedJoint>,
}

/// Named vertex-weight group for one bone.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VertexGroup {
    pub name: String,
    pub weights: BTreeMap<usize, f32>,
}

/// Mesh-to-skeleton deformation link handed to the scene sink.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeformLink {
    pub name: String,
    pub preserve_volume: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkinAssignment {
    pub groups: Vec<VertexGroup>,
    pub deform: DeformLink,
    /// Number of weights clamped into `[0, 1]`.
    pub clamped_weights: usize,
}

// ─── Reports ──────────────────────────────────────────────────────────────────

/// Severity level used by validation issues.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single non-fatal finding produced during conversion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_lowercase_order_when_parsing_then_primary_axis_is_first_letter() {
        let order: RotationOrder = "zyx".parse().expect("valid order");
        assert_eq!(order, RotationOrder::Zyx);
        assert_eq!(order.primary_axis(), Axis::Z);
        assert!("XXY".parse::<RotationOrder>().is_err());
    }

    #[test]
    fn given_node_json_when_deserializing_then_defaults_are_applied() {
        let json = r#"{ "id": "hip", "type": "bone", "rotation_order": "YZX",
            "center_point": [0.0, 100.0, 0.0], "end_point": [0.0, 90.0, 0.0] }"#;
        let node: AssetNode = serde_json::from_str(json).expect("node json");
        assert_eq!(node.node_type, NodeType::Bone);
        assert_eq!(node.rotation_order, RotationOrder::Yzx);
        assert!(node.inherits_scale);
        assert_eq!(node.orientation, Vector3::zeros());
        assert!(node.parent.is_none());
    }

    #[test]
    fn given_unknown_node_type_when_deserializing_then_other_is_used() {
        let json = r#"{ "id": "prop", "type": "modifier" }"#;
        let node: AssetNode = serde_json::from_str(json).expect("node json");
        assert_eq!(node.node_type, NodeType::Other);
    }

    #[test]
    fn given_faces_when_computing_corner_starts_then_offsets_accumulate() {
        let mesh = ReconstructedMesh {
            name: "m".to_string(),
            vertices: vec![Point3::origin(); 5],
            faces: vec![vec![0, 1, 2], vec![0, 2, 3, 4], vec![1, 2, 3]],
            original_face_indices: vec![0, 1, 2],
            material_indices: vec![0, 0, 0],
            material_names: vec![],
            skipped_polygons: vec![],
        };
        assert_eq!(mesh.corner_starts(), vec![0, 3, 7]);
        assert_eq!(mesh.corner_count(), 10);
    }
}
