use std::collections::BTreeMap;

use log::{info, warn};

use super::types::{DeformLink, SkinAssignment, SkinBinding, VertexGroup};
use crate::asset_url::strip_to_asset_id;
use crate::error::{ConvertError, ConvertResult};

// ─── Weight group assignment ─────────────────────────────────────────────────

/// Turn a skin binding into one named vertex-weight group per joint.
///
/// Group names are the bare bone ids of the joints. Within a group a later
/// weight for the same vertex replaces the earlier one. Finite weights outside
/// `[0, 1]` are clamped. The whole binding is rejected when the vertex count
/// disagrees, a vertex index is out of range or a weight is not finite.
pub fn apply(mesh_vertex_count: usize, binding: &SkinBinding) -> ConvertResult<SkinAssignment> {
    if binding.expected_vertex_count != mesh_vertex_count {
        return Err(ConvertError::VertexCountMismatch {
            context: "skin binding",
            expected: binding.expected_vertex_count,
            actual: mesh_vertex_count,
        });
    }

    let mut groups = Vec::<VertexGroup>::with_capacity(binding.weighted_joints.len());
    let mut clamped_weights = 0usize;

    for joint in &binding.weighted_joints {
        let name = strip_to_asset_id(&joint.bone_id).ok_or_else(|| {
            ConvertError::MalformedWeightRecord {
                bone: joint.bone_id.clone(),
                reason: "joint does not name a bone".to_string(),
            }
        })?;

        let mut weights = BTreeMap::<usize, f32>::new();
        for &(vertex_index, weight) in &joint.vertex_weights {
            if vertex_index >= mesh_vertex_count {
                return Err(ConvertError::MalformedWeightRecord {
                    bone: name,
                    reason: format!(
                        "vertex {vertex_index} out of range (mesh has {mesh_vertex_count})"
                    ),
                });
            }
            if !weight.is_finite() {
                return Err(ConvertError::MalformedWeightRecord {
                    bone: name,
                    reason: format!("non-finite weight for vertex {vertex_index}"),
                });
            }

            let clamped = weight.clamp(0.0, 1.0);
            if clamped != weight {
                clamped_weights += 1;
            }
            weights.insert(vertex_index, clamped);
        }

        groups.push(VertexGroup { name, weights });
    }

    if clamped_weights > 0 {
        warn!(
            "skin binding '{}': clamped {} weights into [0, 1]",
            binding.id, clamped_weights
        );
    }

    info!(
        "applied skin binding '{}': {} groups",
        binding.id,
        groups.len()
    );

    Ok(SkinAssignment {
        groups,
        deform: DeformLink {
            name: binding.id.clone(),
            preserve_volume: true,
        },
        clamped_weights,
    })
}
