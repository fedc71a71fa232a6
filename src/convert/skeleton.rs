use std::collections::HashMap;

use log::{debug, info, warn};
use nalgebra::Point3;

use super::types::{AssetNode, Bone, BoneHandle, ConvertOptions, NodeType, Skeleton};
use crate::asset_url::strip_to_asset_id;
use crate::correction::{
    bone_tail, compose_bone_matrix, direction_correction, flip_correction, orientation_matrix,
};
use crate::error::{ConvertError, ConvertResult};

// ─── Skeleton construction ────────────────────────────────────────────────────

/// Build a skeleton from a figure node and its bone hierarchy using default
/// options.
pub fn build(root: &AssetNode, hierarchy: &[AssetNode]) -> ConvertResult<Skeleton> {
    build_with_options(root, hierarchy, &ConvertOptions::default())
}

/// Build a skeleton from a figure node and its bone hierarchy.
///
/// Bone positions are made relative to the figure's center point. Each bone's
/// bind transform is `translation * orientation * direction * flip`, with the
/// bone's length running along local +Y. Parents resolve against bones
/// created earlier in `hierarchy`; unresolved parents leave the bone as a
/// root. Nothing is returned unless every bone could be built.
pub fn build_with_options(
    root: &AssetNode,
    hierarchy: &[AssetNode],
    options: &ConvertOptions,
) -> ConvertResult<Skeleton> {
    options.validate()?;
    validate_node_types(root, hierarchy)?;

    let origin = root.center_point.unwrap_or_else(Point3::origin);
    let mut bones = Vec::<Bone>::with_capacity(hierarchy.len());
    let mut by_name = HashMap::<String, BoneHandle>::with_capacity(hierarchy.len());

    for node in hierarchy {
        if by_name.contains_key(&node.id) {
            return Err(malformed(node, "duplicate bone id in hierarchy"));
        }

        // An unparsable reference is kept verbatim so it still shows up as
        // unresolved.
        let declared_parent = node
            .parent
            .as_deref()
            .map(str::trim)
            .filter(|parent| !parent.is_empty())
            .map(|parent| strip_to_asset_id(parent).unwrap_or_else(|| parent.to_string()));
        let parent = declared_parent
            .as_ref()
            .and_then(|parent_id| by_name.get(parent_id).copied());

        if parent.is_none()
            && let Some(parent_id) = &declared_parent
        {
            debug!(
                "bone '{}' parent '{}' is outside the hierarchy; kept as root",
                node.id, parent_id
            );
        }

        let bone = build_bone(node, &origin, parent, declared_parent, options)?;
        by_name.insert(node.id.clone(), BoneHandle(bones.len()));
        bones.push(bone);
    }

    // Pose-space rotation mode is separate from the bind pose and is only
    // assigned once the whole bind hierarchy exists.
    for (bone, node) in bones.iter_mut().zip(hierarchy) {
        bone.rotation_order = Some(node.rotation_order);
    }

    let skeleton = Skeleton {
        name: root.id.clone(),
        root_offset: origin,
        bones,
        by_name,
    };

    info!(
        "built skeleton '{}': {} bones, {} roots",
        skeleton.name,
        skeleton.len(),
        skeleton.roots().count()
    );

    Ok(skeleton)
}

fn validate_node_types(root: &AssetNode, hierarchy: &[AssetNode]) -> ConvertResult<()> {
    if root.node_type != NodeType::Figure {
        return Err(ConvertError::InvalidNodeType {
            id: root.id.clone(),
            expected: NodeType::Figure.as_str(),
            actual: root.node_type.to_string(),
        });
    }

    if let Some(node) = hierarchy.iter().find(|node| node.node_type != NodeType::Bone) {
        return Err(ConvertError::InvalidNodeType {
            id: node.id.clone(),
            expected: NodeType::Bone.as_str(),
            actual: node.node_type.to_string(),
        });
    }

    Ok(())
}

fn build_bone(
    node: &AssetNode,
    origin: &Point3<f32>,
    parent: Option<BoneHandle>,
    declared_parent: Option<String>,
    options: &ConvertOptions,
) -> ConvertResult<Bone> {
    let center_point = node
        .center_point
        .ok_or_else(|| malformed(node, "missing center point"))?;
    let end_point = node
        .end_point
        .ok_or_else(|| malformed(node, "missing end point"))?;

    if !is_finite(&center_point) || !is_finite(&end_point) {
        return Err(malformed(node, "non-finite center or end point"));
    }
    if !node.orientation.iter().all(|value| value.is_finite()) {
        return Err(malformed(node, "non-finite orientation"));
    }

    let mut length = (end_point - center_point).norm();
    let length_clamped = length <= options.bone_length_epsilon;
    if length_clamped {
        warn!(
            "bone '{}' has zero length; using {}",
            node.id, options.min_bone_length
        );
        length = options.min_bone_length;
    }

    let orientation = orientation_matrix(&node.orientation);
    let direction = direction_correction(node.rotation_order);
    let flip = flip_correction(node.rotation_order, &center_point, &end_point);
    let offset = center_point - origin;

    let matrix = compose_bone_matrix(&offset, &orientation, &direction, &flip);

    Ok(Bone {
        name: node.id.clone(),
        parent,
        declared_parent,
        head: Point3::from(offset),
        tail: bone_tail(&matrix, length),
        length,
        length_clamped,
        matrix,
        inherits_scale: node.inherits_scale,
        rotation_order: None,
    })
}

fn is_finite(point: &Point3<f32>) -> bool {
    point.iter().all(|value| value.is_finite())
}

fn malformed(node: &AssetNode, reason: &str) -> ConvertError {
    ConvertError::MalformedBoneRecord {
        id: node.id.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::types::RotationOrder;
    use nalgebra::{Matrix4, Vector3};

    fn figure(center: [f32; 3]) -> AssetNode {
        AssetNode {
            id: "Genesis8Female".to_string(),
            name: None,
            node_type: NodeType::Figure,
            parent: None,
            center_point: Some(Point3::from(center)),
            end_point: None,
            orientation: Vector3::zeros(),
            rotation_order: RotationOrder::Xyz,
            inherits_scale: true,
        }
    }

    fn bone(
        id: &str,
        parent: Option<&str>,
        center: [f32; 3],
        end: [f32; 3],
        order: RotationOrder,
    ) -> AssetNode {
        AssetNode {
            id: id.to_string(),
            name: None,
            node_type: NodeType::Bone,
            parent: parent.map(ToOwned::to_owned),
            center_point: Some(Point3::from(center)),
            end_point: Some(Point3::from(end)),
            orientation: Vector3::zeros(),
            rotation_order: order,
            inherits_scale: true,
        }
    }

    #[test]
    fn given_y_primary_bone_when_building_then_only_translation_is_applied() {
        let hierarchy = vec![bone(
            "hip",
            None,
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            RotationOrder::Yzx,
        )];

        let skeleton = build(&figure([0.0, 0.0, 0.0]), &hierarchy).expect("skeleton");
        let hip = &skeleton.bones[0];

        assert!((hip.matrix - Matrix4::identity()).norm() < 1e-6);
        assert!((hip.length - 1.0).abs() < 1e-6);
        assert!((hip.tail - Point3::new(0.0, 1.0, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn given_x_primary_bone_pointing_back_when_building_then_flip_is_applied() {
        let hierarchy = vec![bone(
            "rHand",
            None,
            [0.0, 0.0, 0.0],
            [-2.0, 0.0, 0.0],
            RotationOrder::Xyz,
        )];

        let skeleton = build(&figure([0.0, 0.0, 0.0]), &hierarchy).expect("skeleton");
        let hand = &skeleton.bones[0];

        let inverse = hand.matrix.try_inverse().expect("invertible");
        let local_end = inverse.transform_point(&Point3::new(-2.0, 0.0, 0.0));
        assert!(local_end.y > 0.0);
        assert!((hand.tail - Point3::new(-2.0, 0.0, 0.0)).norm() < 1e-5);
    }

    #[test]
    fn given_figure_offset_when_building_then_heads_are_root_relative() {
        let hierarchy = vec![bone(
            "hip",
            None,
            [1.0, 101.0, 2.0],
            [1.0, 91.0, 2.0],
            RotationOrder::Yzx,
        )];

        let skeleton = build(&figure([1.0, 1.0, 2.0]), &hierarchy).expect("skeleton");
        let hip = &skeleton.bones[0];

        assert!((hip.head - Point3::new(0.0, 100.0, 0.0)).norm() < 1e-5);
        assert!((hip.tail - Point3::new(0.0, 90.0, 0.0)).norm() < 1e-4);
        assert_eq!(skeleton.root_offset, Point3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn given_zero_length_bone_when_building_then_minimum_length_is_used() {
        let hierarchy = vec![bone(
            "environment",
            None,
            [0.5, 0.5, 0.5],
            [0.5, 0.5, 0.5],
            RotationOrder::Zyx,
        )];

        let skeleton = build(&figure([0.0, 0.0, 0.0]), &hierarchy).expect("skeleton");
        let node = &skeleton.bones[0];

        assert!(node.length_clamped);
        assert!((node.length - 0.01).abs() < 1e-7);
        assert!((node.tail - node.head).norm() > 0.0);
    }

    #[test]
    fn given_url_parents_when_building_then_links_resolve_by_bare_id() {
        let hierarchy = vec![
            bone("hip", Some("#Genesis8Female"), [0.0, 1.0, 0.0], [0.0, 0.9, 0.0], RotationOrder::Yzx),
            bone(
                "pelvis",
                Some("/data/DAZ%203D/Genesis%208/Female/Genesis8Female.dsf#hip"),
                [0.0, 1.0, 0.0],
                [0.0, 0.8, 0.0],
                RotationOrder::Yzx,
            ),
            bone("lThigh", Some("#pelvis"), [0.1, 0.9, 0.0], [0.1, 0.5, 0.0], RotationOrder::Yzx),
        ];

        let skeleton = build(&figure([0.0, 0.0, 0.0]), &hierarchy).expect("skeleton");

        let hip = skeleton.find("hip").expect("hip");
        let pelvis = skeleton.find("pelvis").expect("pelvis");
        let thigh = skeleton.find("lThigh").expect("thigh");

        assert_eq!(skeleton.bones[hip.0].parent, None);
        assert_eq!(
            skeleton.bones[hip.0].declared_parent.as_deref(),
            Some("Genesis8Female")
        );
        assert_eq!(skeleton.bones[pelvis.0].parent, Some(hip));
        assert_eq!(skeleton.bones[thigh.0].parent, Some(pelvis));
        assert_eq!(skeleton.roots().collect::<Vec<_>>(), vec![hip]);
        assert_eq!(skeleton.children(hip).collect::<Vec<_>>(), vec![pelvis]);
    }

    #[test]
    fn given_built_skeleton_when_inspecting_then_rotation_orders_are_assigned() {
        let hierarchy = vec![
            bone("hip", None, [0.0, 1.0, 0.0], [0.0, 0.9, 0.0], RotationOrder::Yzx),
            bone("lShldr", Some("#hip"), [0.2, 1.4, 0.0], [0.5, 1.4, 0.0], RotationOrder::Xyz),
        ];

        let skeleton = build(&figure([0.0, 0.0, 0.0]), &hierarchy).expect("skeleton");

        assert_eq!(skeleton.bones[0].rotation_order, Some(RotationOrder::Yzx));
        assert_eq!(skeleton.bones[1].rotation_order, Some(RotationOrder::Xyz));
    }

    #[test]
    fn given_non_figure_root_when_building_then_invalid_node_type_is_returned() {
        let mut root = figure([0.0, 0.0, 0.0]);
        root.node_type = NodeType::Bone;

        let result = build(&root, &[]);
        assert!(matches!(result, Err(ConvertError::InvalidNodeType { .. })));
    }

    #[test]
    fn given_non_bone_entry_when_building_then_build_aborts() {
        let mut prop = bone("prop", None, [0.0; 3], [0.0, 1.0, 0.0], RotationOrder::Yzx);
        prop.node_type = NodeType::Node;

        let result = build(&figure([0.0; 3]), &[prop]);
        assert_eq!(
            result.map(|skeleton| skeleton.len()),
            Err(ConvertError::InvalidNodeType {
                id: "prop".to_string(),
                expected: "bone",
                actual: "node".to_string(),
            })
        );
    }

    #[test]
    fn given_bone_without_end_point_when_building_then_malformed_record_is_returned() {
        let mut broken = bone("neck", None, [0.0; 3], [0.0, 1.0, 0.0], RotationOrder::Yzx);
        broken.end_point = None;
        let hierarchy = vec![
            bone("hip", None, [0.0; 3], [0.0, 1.0, 0.0], RotationOrder::Yzx),
            broken,
        ];

        let result = build(&figure([0.0; 3]), &hierarchy);
        assert!(matches!(
            result,
            Err(ConvertError::MalformedBoneRecord { ref id, .. }) if id == "neck"
        ));
    }

    #[test]
    fn given_duplicate_ids_when_building_then_malformed_record_is_returned() {
        let hierarchy = vec![
            bone("hip", None, [0.0; 3], [0.0, 1.0, 0.0], RotationOrder::Yzx),
            bone("hip", None, [0.0; 3], [0.0, 1.0, 0.0], RotationOrder::Yzx),
        ];

        assert!(matches!(
            build(&figure([0.0; 3]), &hierarchy),
            Err(ConvertError::MalformedBoneRecord { .. })
        ));
    }

    #[test]
    fn given_non_positive_min_length_when_building_then_invalid_options_are_returned() {
        let hierarchy = vec![bone(
            "environment",
            None,
            [1.0, 1.0, 1.0],
            [1.0, 1.0, 1.0],
            RotationOrder::Xyz,
        )];
        let options = ConvertOptions {
            min_bone_length: 0.0,
            bone_length_epsilon: -1.0,
        };

        let result = build_with_options(&figure([0.0; 3]), &hierarchy, &options);
        assert!(matches!(result, Err(ConvertError::InvalidOptions(_))));

        let options = ConvertOptions {
            bone_length_epsilon: f32::NAN,
            ..ConvertOptions::default()
        };
        let result = build_with_options(&figure([0.0; 3]), &hierarchy, &options);
        assert!(matches!(result, Err(ConvertError::InvalidOptions(_))));
    }

    #[test]
    fn given_unparsable_parent_when_building_then_raw_reference_is_kept() {
        let hierarchy = vec![bone(
            "lHand",
            Some("#l%2"),
            [0.0; 3],
            [0.0, 1.0, 0.0],
            RotationOrder::Yzx,
        )];

        let skeleton = build(&figure([0.0; 3]), &hierarchy).expect("skeleton");
        assert_eq!(skeleton.bones[0].parent, None);
        assert_eq!(skeleton.bones[0].declared_parent.as_deref(), Some("#l%2"));
    }
}
