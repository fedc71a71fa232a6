//! Hand-over of finished reconstruction results to a target scene.

use anyhow::{Result, bail};
use serde::Serialize;

use crate::convert::{
    DeformLink, ReconstructedMesh, SkinAssignment, Skeleton, UvAssignment, VertexGroup,
};

/// Everything one conversion run produces. Ownership passes to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct RigOutput {
    pub mesh: ReconstructedMesh,
    pub skeleton: Skeleton,
    pub uv: Option<UvAssignment>,
    pub skin: Option<SkinAssignment>,
}

/// Target scene seam. Called once per successful conversion run.
pub trait SceneSink {
    fn insert_rig(&mut self, rig: RigOutput) -> Result<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct DeformTarget {
    pub link: DeformLink,
    pub armature: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectData {
    Armature(Skeleton),
    Mesh {
        mesh: ReconstructedMesh,
        uv_layers: Vec<UvAssignment>,
        vertex_groups: Vec<VertexGroup>,
        deform: Option<DeformTarget>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneObject {
    pub name: String,
    pub parent: Option<String>,
    pub data: ObjectData,
}

/// A plain, serializable scene: a flat object list with parent links by name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SceneAssembly {
    pub objects: Vec<SceneObject>,
}

impl SceneAssembly {
    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }

    fn ensure_free(&self, name: &str) -> Result<()> {
        if self.object(name).is_some() {
            bail!("scene already contains an object named '{name}'");
        }
        Ok(())
    }
}

impl SceneSink for SceneAssembly {
    fn insert_rig(&mut self, rig: RigOutput) -> Result<()> {
        let armature_name = rig.skeleton.name.clone();
        let mesh_name = rig.mesh.name.clone();
        self.ensure_free(&armature_name)?;
        if mesh_name == armature_name {
            bail!("mesh and armature share the name '{mesh_name}'");
        }
        self.ensure_free(&mesh_name)?;

        // A skinned mesh lives under its armature; an unskinned one stays at
        // the scene root.
        let (vertex_groups, deform, parent) = match rig.skin {
            Some(skin) => (
                skin.groups,
                Some(DeformTarget {
                    link: skin.deform,
                    armature: armature_name.clone(),
                }),
                Some(armature_name.clone()),
            ),
            None => (Vec::new(), None, None),
        };

        self.objects.push(SceneObject {
            name: armature_name,
            parent: None,
            data: ObjectData::Armature(rig.skeleton),
        });
        self.objects.push(SceneObject {
            name: mesh_name,
            parent,
            data: ObjectData::Mesh {
                mesh: rig.mesh,
                uv_layers: rig.uv.into_iter().collect(),
                vertex_groups,
                deform,
            },
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{
        AssetNode, GeometryRecord, NodeType, RotationOrder, SkinBinding, WeightedJoint, apply,
        build, reconstruct,
    };
    use nalgebra::{Point3, Vector3};

    fn rig(with_skin: bool) -> RigOutput {
        let figure = AssetNode {
            id: "Figure".to_string(),
            name: None,
            node_type: NodeType::Figure,
            parent: None,
            center_point: Some(Point3::origin()),
            end_point: None,
            orientation: Vector3::zeros(),
            rotation_order: RotationOrder::Xyz,
            inherits_scale: true,
        };
        let mesh = reconstruct(&GeometryRecord {
            id: "geometry".to_string(),
            vertices: vec![Point3::origin(); 3],
            polygons: vec![vec![0, 1, 2]],
            material_indices: vec![0],
            material_names: vec![],
        })
        .expect("mesh");
        let skin = with_skin.then(|| {
            apply(
                3,
                &SkinBinding {
                    id: "SkinBinding".to_string(),
                    skeleton: None,
                    expected_vertex_count: 3,
                    weighted_joints: vec![WeightedJoint {
                        bone_id: "#hip".to_string(),
                        vertex_weights: vec![(0, 1.0)],
                    }],
                },
            )
            .expect("skin")
        });

        RigOutput {
            mesh,
            skeleton: build(&figure, &[]).expect("skeleton"),
            uv: None,
            skin,
        }
    }

    #[test]
    fn given_skinned_rig_when_inserting_then_mesh_is_parented_and_deformed() {
        let mut scene = SceneAssembly::default();
        scene.insert_rig(rig(true)).expect("insert");

        let mesh = scene.object("geometry").expect("mesh object");
        assert_eq!(mesh.parent.as_deref(), Some("Figure"));
        let ObjectData::Mesh {
            deform,
            vertex_groups,
            ..
        } = &mesh.data
        else {
            panic!("expected mesh data");
        };
        let deform = deform.as_ref().expect("deform link");
        assert_eq!(deform.armature, "Figure");
        assert_eq!(deform.link.name, "SkinBinding");
        assert_eq!(vertex_groups.len(), 1);
    }

    #[test]
    fn given_unskinned_rig_when_inserting_then_mesh_stays_at_root() {
        let mut scene = SceneAssembly::default();
        scene.insert_rig(rig(false)).expect("insert");

        assert!(scene.object("geometry").expect("mesh").parent.is_none());
    }

    #[test]
    fn given_existing_names_when_inserting_again_then_scene_is_unchanged() {
        let mut scene = SceneAssembly::default();
        scene.insert_rig(rig(true)).expect("first insert");

        assert!(scene.insert_rig(rig(true)).is_err());
        assert_eq!(scene.objects.len(), 2);
    }
}
