//! Reconstruction components: geometry, UV remapping, skeleton and skin
//! binding.
//!
//! Each component is a pure function over borrowed records. Geometry must run
//! before UV remapping and skin binding; the skeleton is independent.

mod geometry;
mod skeleton;
mod skinning;
mod types;
mod uv;
mod validation;

// Re-export public types for callers of this module.
pub use types::{
    AssetNode, Axis, BONE_LENGTH_EPSILON, Bone, BoneHandle, ConvertOptions, DeformLink,
    GeometryRecord, MIN_BONE_LENGTH, NodeType, ReconstructedMesh, RotationOrder, Severity,
    SkinAssignment, SkinBinding, Skeleton, UvAssignment, UvSet, UvSetRecord, ValidationIssue,
    VertexGroup, WeightedJoint,
};

pub use geometry::reconstruct;
pub use skeleton::{build, build_with_options};
pub use skinning::apply;
pub use uv::remap;
pub use validation::{collect_geometry_issues, collect_skeleton_issues, collect_skin_issues};
