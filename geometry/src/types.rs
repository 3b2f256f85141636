//! Mesh input and shared geometry types

use serde::Serialize;
use smallvec::SmallVec;

/// One (bone, weight) pair controlling skin deformation at a vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Influence {
    pub bone: u32,
    pub weight: f32,
}

impl Influence {
    pub fn new(bone: u32, weight: f32) -> Self {
        Self { bone, weight }
    }
}

/// Variable-length influence list for one vertex
///
/// Most vertices have at most 8 influences, which stay inline.
pub type Influences = SmallVec<[Influence; 8]>;

/// A face corner: one vertex-in-a-triangle occurrence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    /// Source mesh vertex id
    pub vertex: u32,
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv0: Option<[f32; 2]>,
    pub uv1: Option<[f32; 2]>,
    pub color: Option<[f32; 4]>,
}

impl Corner {
    /// Corner with only position and normal
    pub fn new(vertex: u32, position: [f32; 3], normal: [f32; 3]) -> Self {
        Self {
            vertex,
            position,
            normal,
            uv0: None,
            uv1: None,
            color: None,
        }
    }

    pub fn with_uv0(mut self, uv: [f32; 2]) -> Self {
        self.uv0 = Some(uv);
        self
    }

    pub fn with_uv1(mut self, uv: [f32; 2]) -> Self {
        self.uv1 = Some(uv);
        self
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = Some(color);
        self
    }
}

/// Triangle with its three corners in winding order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub corners: [Corner; 3],
    pub material_index: u32,
}

/// Per-source-vertex skin influences, already resolved to bone indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkinInput {
    pub skeleton_id: u32,
    /// One list per source vertex
    pub influences: Vec<Influences>,
}

/// Named alternate vertex positions, indexed by source vertex id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShapeKeyBlock {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
}

/// Name of the reference shape key that deltas are computed against
pub const BASIS_KEY_NAME: &str = "Basis";

/// Everything the assembler needs for one mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshInput {
    pub name: String,
    /// Number of source mesh vertices; corner ids must be below this
    pub vertex_count: usize,
    pub triangles: Vec<Triangle>,
    /// Number of material slots (at least one submesh is always produced)
    pub material_count: u32,
    /// Put every triangle into a single submesh regardless of material
    pub merge_materials: bool,
    pub skin: Option<SkinInput>,
    pub shape_keys: Vec<ShapeKeyBlock>,
}

/// Attribute presence flags, fixed once per mesh
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VertexLayout {
    pub uv0: bool,
    pub uv1: bool,
    pub color: bool,
    pub skin: bool,
}

/// Contiguous vertex and index range drawn with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubMesh {
    pub material_index: u32,
    pub vertices_start: u32,
    pub vertices_count: u32,
    pub index_start: u32,
    pub index_count: u32,
}

impl SubMesh {
    /// Welded indices this submesh may reference
    pub fn vertex_range(&self) -> std::ops::Range<u32> {
        self.vertices_start..self.vertices_start + self.vertices_count
    }

    /// Positions in the index buffer owned by this submesh
    pub fn index_range(&self) -> std::ops::Range<usize> {
        self.index_start as usize..(self.index_start + self.index_count) as usize
    }
}
