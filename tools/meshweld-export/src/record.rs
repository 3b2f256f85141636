//! Scene records
//!
//! Serialized form of assembled geometry, in the engine's camelCase JSON
//! layout. Attribute buffers are flattened to plain number arrays.

use meshweld_geometry::{Geometry, ShapeKey, ShapeKeyGroup, SubMesh};
use serde::Serialize;

/// One exported mesh
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshRecord {
    pub name: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skeleton_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_bone_influencers: Option<u8>,

    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uvs2: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<f32>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrices_weights: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrices_indices: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrices_weights_extra: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrices_indices_extra: Option<Vec<u32>>,

    pub indices: Vec<u32>,
    pub sub_meshes: Vec<SubMesh>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub morph_targets: Vec<MorphTargetRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shape_key_groups: Vec<ShapeKeyGroupRecord>,
}

/// One shape key as sparse position (and optional normal) deltas
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MorphTargetRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub state: String,
    pub indices: Vec<u32>,
    pub positions: Vec<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeKeyGroupRecord {
    pub name: String,
    pub affected_indices: Vec<u32>,
    pub basis_state: Vec<f32>,
    pub states: Vec<GroupStateRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStateRecord {
    pub name: String,
    pub position_deltas: Vec<f32>,
}

/// Everything written by one build
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneRecord {
    pub meshes: Vec<MeshRecord>,
}

/// Flatten `[f32; N]` elements into one contiguous array
fn flatten<const N: usize>(values: &[[f32; N]]) -> Vec<f32> {
    bytemuck::cast_slice::<[f32; N], f32>(values).to_vec()
}

impl From<&ShapeKey> for MorphTargetRecord {
    fn from(key: &ShapeKey) -> Self {
        let positions: Vec<[f32; 3]> = key.deltas.iter().map(|d| d.position).collect();
        // Normal deltas are written only when every affected vertex has one
        let normals: Option<Vec<[f32; 3]>> = key.deltas.iter().map(|d| d.normal).collect();

        Self {
            name: key.name.clone(),
            group: key.group.clone(),
            state: key.state.clone(),
            indices: key.affected_indices(),
            positions: flatten(&positions),
            normals: normals
                .filter(|n| !n.is_empty())
                .map(|n| flatten(&n)),
        }
    }
}

impl From<&ShapeKeyGroup> for ShapeKeyGroupRecord {
    fn from(group: &ShapeKeyGroup) -> Self {
        Self {
            name: group.name.clone(),
            affected_indices: group.affected_indices.clone(),
            basis_state: flatten(&group.basis_positions),
            states: group
                .states
                .iter()
                .map(|state| GroupStateRecord {
                    name: state.name.clone(),
                    position_deltas: flatten(&state.position_deltas),
                })
                .collect(),
        }
    }
}

impl MeshRecord {
    /// Build the record for a mesh exported under `id`
    pub fn new(id: &str, geometry: &Geometry, material_id: Option<String>) -> Self {
        let skin = geometry.skin.as_ref();
        let (morph_targets, shape_key_groups) = match &geometry.shape_keys {
            Some(keys) => (
                keys.keys.iter().map(MorphTargetRecord::from).collect(),
                keys.groups.iter().map(ShapeKeyGroupRecord::from).collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        Self {
            name: geometry.name.clone(),
            id: id.to_string(),
            material_id,
            skeleton_id: geometry.skeleton_id,
            num_bone_influencers: skin.map(|s| s.num_bone_influencers),
            positions: flatten(&geometry.positions),
            normals: flatten(&geometry.normals),
            uvs: geometry.uvs.as_deref().map(flatten),
            uvs2: geometry.uvs2.as_deref().map(flatten),
            colors: geometry.colors.as_deref().map(flatten),
            matrices_weights: skin.map(|s| s.weights.clone()),
            matrices_indices: skin.map(|s| s.indices.clone()),
            matrices_weights_extra: skin.and_then(|s| s.weights_extra.clone()),
            matrices_indices_extra: skin.and_then(|s| s.indices_extra.clone()),
            indices: geometry.indices.clone(),
            sub_meshes: geometry.sub_meshes.clone(),
            morph_targets,
            shape_key_groups,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshweld_geometry::{
        Corner, ExportConfig, Influence, MeshInput, ShapeKeyBlock, SkinInput, Triangle, assemble,
    };

    fn quad(uvs: bool) -> MeshInput {
        let p = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let corner = |v: u32| {
            let c = Corner::new(v, p[v as usize], [0.0, 0.0, 1.0]);
            if uvs {
                c.with_uv0([p[v as usize][0], p[v as usize][1]])
            } else {
                c
            }
        };
        MeshInput {
            name: "quad".to_string(),
            vertex_count: 4,
            triangles: vec![
                Triangle {
                    corners: [corner(0), corner(1), corner(2)],
                    material_index: 0,
                },
                Triangle {
                    corners: [corner(0), corner(2), corner(3)],
                    material_index: 0,
                },
            ],
            material_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_record_field_names() {
        let geometry = assemble(&quad(true), &ExportConfig::default()).unwrap();
        let record = MeshRecord::new("quad-1", &geometry, Some("Red".to_string()));
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["name"], "quad");
        assert_eq!(json["id"], "quad-1");
        assert_eq!(json["materialId"], "Red");
        assert_eq!(json["positions"].as_array().unwrap().len(), 12);
        assert_eq!(json["uvs"].as_array().unwrap().len(), 8);
        assert_eq!(json["indices"], serde_json::json!([0, 1, 2, 0, 2, 3]));
        assert_eq!(json["subMeshes"][0]["indexCount"], 6);
        assert_eq!(json["subMeshes"][0]["verticesCount"], 4);

        // Absent attributes are left out, not written as empty arrays
        for key in ["uvs2", "colors", "skeletonId", "matricesWeights", "morphTargets"] {
            assert!(json.get(key).is_none(), "{} should be absent", key);
        }
    }

    #[test]
    fn test_positions_flatten_in_vertex_order() {
        let geometry = assemble(&quad(false), &ExportConfig::default()).unwrap();
        let record = MeshRecord::new("quad", &geometry, None);
        assert_eq!(&record.positions[3..6], &[1.0, 0.0, 0.0]);
        assert!(record.uvs.is_none());
    }

    #[test]
    fn test_skinned_record() {
        let mut input = quad(false);
        input.skin = Some(SkinInput {
            skeleton_id: 5,
            influences: (0..4)
                .map(|v| [Influence::new(v, 1.0)].into_iter().collect())
                .collect(),
        });
        let geometry = assemble(&input, &ExportConfig::default()).unwrap();
        let json = serde_json::to_value(MeshRecord::new("quad", &geometry, None)).unwrap();

        assert_eq!(json["skeletonId"], 5);
        assert_eq!(json["numBoneInfluencers"], 1);
        assert_eq!(json["matricesWeights"].as_array().unwrap().len(), 16);
        assert_eq!(json["matricesIndices"], serde_json::json!([0, 1, 2, 3]));
        assert!(json.get("matricesWeightsExtra").is_none());
    }

    #[test]
    fn test_morph_targets() {
        let mut input = quad(false);
        let basis: Vec<[f32; 3]> = input
            .triangles
            .iter()
            .flat_map(|t| t.corners)
            .fold(vec![[0.0; 3]; 4], |mut acc, c| {
                acc[c.vertex as usize] = c.position;
                acc
            });
        let mut raised = basis.clone();
        raised[2][2] = 1.0;
        input.shape_keys = vec![
            ShapeKeyBlock {
                name: "Basis".to_string(),
                positions: basis,
                normals: None,
            },
            ShapeKeyBlock {
                name: "Raise".to_string(),
                positions: raised,
                normals: None,
            },
        ];

        let geometry = assemble(&input, &ExportConfig::default()).unwrap();
        let record = MeshRecord::new("quad", &geometry, None);

        assert_eq!(record.morph_targets.len(), 1);
        let target = &record.morph_targets[0];
        assert_eq!(target.name, "Raise");
        assert_eq!(target.indices, vec![2]);
        assert_eq!(target.positions, vec![0.0, 0.0, 1.0]);
        assert!(target.normals.is_none());
        assert!(record.shape_key_groups.is_empty());
    }
}
