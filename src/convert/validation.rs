use std::collections::HashSet;

use super::types::{ReconstructedMesh, Severity, SkinAssignment, Skeleton, ValidationIssue};

// ─── Non-fatal diagnostics ────────────────────────────────────────────────────

/// Report polygons dropped during reconstruction.
pub fn collect_geometry_issues(mesh: &ReconstructedMesh) -> Vec<ValidationIssue> {
    if mesh.skipped_polygons.is_empty() {
        return Vec::new();
    }

    let preview: Vec<String> = mesh
        .skipped_polygons
        .iter()
        .take(8)
        .map(ToString::to_string)
        .collect();
    let suffix = if mesh.skipped_polygons.len() > preview.len() {
        ", ..."
    } else {
        ""
    };

    vec![ValidationIssue {
        severity: Severity::Info,
        code: "INVALID_POLYGON_SKIPPED".to_string(),
        message: format!(
            "{} invalid polygons skipped in '{}' (original indices: {}{})",
            mesh.skipped_polygons.len(),
            mesh.name,
            preview.join(", "),
            suffix
        ),
    }]
}

/// Report unresolved parents and zero-length bones.
pub fn collect_skeleton_issues(skeleton: &Skeleton) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for bone in &skeleton.bones {
        if bone.parent.is_none()
            && let Some(parent_id) = &bone.declared_parent
            && parent_id != &skeleton.name
        {
            issues.push(ValidationIssue {
                severity: Severity::Warning,
                code: "UNRESOLVED_BONE_PARENT".to_string(),
                message: format!(
                    "bone '{}' declares parent '{}' outside the hierarchy; kept as root",
                    bone.name, parent_id
                ),
            });
        }

        if bone.length_clamped {
            issues.push(ValidationIssue {
                severity: Severity::Info,
                code: "ZERO_LENGTH_BONE".to_string(),
                message: format!(
                    "bone '{}' has zero length; clamped to {}",
                    bone.name, bone.length
                ),
            });
        }
    }

    issues
}

/// Report clamped weights, repeated joints and joints naming bones the
/// skeleton lacks.
pub fn collect_skin_issues(skin: &SkinAssignment, skeleton: &Skeleton) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if skin.clamped_weights > 0 {
        issues.push(ValidationIssue {
            severity: Severity::Warning,
            code: "WEIGHT_CLAMPED".to_string(),
            message: format!(
                "{} weights in '{}' were outside [0, 1] and clamped",
                skin.clamped_weights, skin.deform.name
            ),
        });
    }

    let mut seen = HashSet::new();
    for group in &skin.groups {
        if !seen.insert(group.name.as_str()) {
            issues.push(ValidationIssue {
                severity: Severity::Warning,
                code: "DUPLICATE_JOINT".to_string(),
                message: format!(
                    "several joints of '{}' name bone '{}'; their groups share that name",
                    skin.deform.name, group.name
                ),
            });
        }
        if skeleton.find(&group.name).is_none() {
            issues.push(ValidationIssue {
                severity: Severity::Warning,
                code: "UNKNOWN_JOINT".to_string(),
                message: format!(
                    "weight group '{}' does not match any bone of '{}'",
                    group.name, skeleton.name
                ),
            });
        }
    }

    issues
}
