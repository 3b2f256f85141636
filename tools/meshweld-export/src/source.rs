//! Host mesh dumps
//!
//! A dump is a JSON description of one host mesh: shared vertex positions,
//! triangles with per-corner attributes, and optional skin and shape keys.
//! Converting a dump resolves its skeleton and material names against the
//! scene and produces the assembler's [`MeshInput`].

use anyhow::{Context, Result};
use meshweld_geometry::{
    Corner, Diagnostics, GeometryError, Influence, Influences, MeshInput, ShapeKeyBlock, SkinInput,
    Triangle, Warning,
};
use serde::Deserialize;
use std::path::Path;

use crate::manifest::SkeletonTable;

/// One host mesh as dumped by the modelling tool
#[derive(Debug, Clone, Deserialize)]
pub struct SourceMesh {
    pub name: String,
    /// Material slot names; triangle material indices refer to these
    #[serde(default)]
    pub materials: Vec<String>,
    /// Source vertex positions
    pub vertices: Vec<[f32; 3]>,
    pub triangles: Vec<SourceTriangle>,
    #[serde(default)]
    pub merge_materials: bool,
    /// Armature this mesh is skinned to
    #[serde(default)]
    pub skeleton: Option<String>,
    /// Per-vertex `[bone, weight]` lists, one per source vertex
    #[serde(default)]
    pub groups: Vec<Vec<(u32, f32)>>,
    #[serde(default)]
    pub shape_keys: Vec<SourceShapeKey>,
    /// Per-mesh influencer cap, overrides the manifest setting
    ///
    /// Read wide so out-of-range values reach the clamp instead of failing
    /// the parse.
    #[serde(default)]
    pub max_influencers: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceTriangle {
    pub vertices: [u32; 3],
    #[serde(default)]
    pub material: u32,
    pub normals: [[f32; 3]; 3],
    #[serde(default)]
    pub uv0: Option<[[f32; 2]; 3]>,
    #[serde(default)]
    pub uv1: Option<[[f32; 2]; 3]>,
    #[serde(default)]
    pub colors: Option<[[f32; 4]; 3]>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceShapeKey {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub normals: Option<Vec<[f32; 3]>>,
}

/// A dump converted for the assembler, plus what the scene record needs
#[derive(Debug, Clone)]
pub struct PreparedMesh {
    pub input: MeshInput,
    pub material_id: Option<String>,
    pub max_influencers: Option<i64>,
    /// Warnings raised while resolving materials and skeleton
    pub diagnostics: Diagnostics,
}

/// Load a mesh dump from a JSON file
pub fn load_source(path: &Path) -> Result<SourceMesh> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mesh dump: {:?}", path))?;
    SourceMesh::from_json(&content)
        .with_context(|| format!("Failed to parse mesh dump: {:?}", path))
}

impl SourceMesh {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Material id written to the scene record
    ///
    /// A single material is referenced by name, several by a multi-material
    /// named after the mesh.
    pub fn material_id(&self, diagnostics: &mut Diagnostics) -> Option<String> {
        match self.materials.as_slice() {
            [] => {
                diagnostics.warn(&self.name, Warning::NoMaterials);
                None
            }
            [single] => Some(single.clone()),
            _ => Some(format!("{}.multimat", self.name)),
        }
    }

    /// Influence lists, when the mesh is bound to a known skeleton
    fn skin(&self, skeletons: &SkeletonTable, diagnostics: &mut Diagnostics) -> Option<SkinInput> {
        let name = self.skeleton.as_deref()?;
        let Some(&skeleton_id) = skeletons.get(name) else {
            diagnostics.warn(
                &self.name,
                Warning::SkeletonNotFound {
                    name: name.to_string(),
                },
            );
            return None;
        };

        let influences = self
            .groups
            .iter()
            .map(|groups| {
                groups
                    .iter()
                    .map(|&(bone, weight)| Influence::new(bone, weight))
                    .collect::<Influences>()
            })
            .collect();

        Some(SkinInput {
            skeleton_id,
            influences,
        })
    }

    fn corner(&self, triangle: usize, tri: &SourceTriangle, k: usize) -> Result<Corner> {
        let vertex = tri.vertices[k];
        let position = self.vertices.get(vertex as usize).copied().ok_or_else(|| {
            GeometryError::VertexOutOfRange {
                mesh: self.name.clone(),
                triangle,
                vertex,
                vertex_count: self.vertices.len(),
            }
        })?;

        Ok(Corner {
            vertex,
            position,
            normal: tri.normals[k],
            uv0: tri.uv0.map(|uv| uv[k]),
            uv1: tri.uv1.map(|uv| uv[k]),
            color: tri.colors.map(|c| c[k]),
        })
    }

    /// Build the assembler input, resolving the skeleton against `skeletons`
    pub fn prepare(&self, skeletons: &SkeletonTable) -> Result<PreparedMesh> {
        let triangles = self
            .triangles
            .iter()
            .enumerate()
            .map(|(i, tri)| {
                Ok(Triangle {
                    corners: [
                        self.corner(i, tri, 0)?,
                        self.corner(i, tri, 1)?,
                        self.corner(i, tri, 2)?,
                    ],
                    material_index: tri.material,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let shape_keys = self
            .shape_keys
            .iter()
            .map(|key| ShapeKeyBlock {
                name: key.name.clone(),
                positions: key.positions.clone(),
                normals: key.normals.clone(),
            })
            .collect();

        let mut diagnostics = Diagnostics::default();
        let input = MeshInput {
            name: self.name.clone(),
            vertex_count: self.vertices.len(),
            triangles,
            material_count: self.materials.len() as u32,
            merge_materials: self.merge_materials,
            skin: self.skin(skeletons, &mut diagnostics),
            shape_keys,
        };

        Ok(PreparedMesh {
            input,
            material_id: self.material_id(&mut diagnostics),
            max_influencers: self.max_influencers,
            diagnostics,
        })
    }
}
