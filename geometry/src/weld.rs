//! Vertex welding and re-indexing
//!
//! Face corners are merged into output vertices when they originate from the
//! same source vertex and every present attribute matches within its epsilon.
//! Submeshes are welded one material at a time and never share output
//! vertices: a corner may only reuse a welded vertex emitted inside the
//! submesh currently being built.

use smallvec::SmallVec;

use crate::compare::same_vector;
use crate::config::Precision;
use crate::error::GeometryError;
use crate::influence::same_influences;
use crate::types::{Corner, Influences, MeshInput, SubMesh, VertexLayout};

/// For each source vertex, the welded indices it expanded into, in emission order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexIndexMap {
    slots: Vec<SmallVec<[u32; 4]>>,
}

impl VertexIndexMap {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            slots: vec![SmallVec::new(); vertex_count],
        }
    }

    /// Welded indices emitted for `vertex`, oldest first
    pub fn get(&self, vertex: u32) -> &[u32] {
        self.slots
            .get(vertex as usize)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    /// Number of source vertices tracked
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn record(&mut self, vertex: u32, welded: u32) {
        self.slots[vertex as usize].push(welded);
    }
}

/// Source vertex → welded vertex association, one entry per emitted vertex
///
/// Shape-key extraction walks these in welded order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOrderEntry {
    pub vertex: u32,
    pub welded: u32,
}

/// Index-aligned output attribute arrays
///
/// Absent attributes stay `None` instead of being zero-filled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeldedBuffers {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub uvs2: Option<Vec<[f32; 2]>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub influences: Option<Vec<Influences>>,
}

impl WeldedBuffers {
    pub fn new(layout: VertexLayout) -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            uvs: layout.uv0.then(Vec::new),
            uvs2: layout.uv1.then(Vec::new),
            colors: layout.color.then(Vec::new),
            influences: layout.skin.then(Vec::new),
        }
    }

    /// Number of welded vertices
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Check every present attribute array has one entry per vertex
    pub fn verify_aligned(&self, mesh: &str) -> Result<(), GeometryError> {
        let expected = self.positions.len();
        let lengths = [
            ("normals", Some(self.normals.len())),
            ("uvs", self.uvs.as_ref().map(Vec::len)),
            ("uvs2", self.uvs2.as_ref().map(Vec::len)),
            ("colors", self.colors.as_ref().map(Vec::len)),
            ("influences", self.influences.as_ref().map(Vec::len)),
        ];

        for (what, actual) in lengths {
            if let Some(actual) = actual
                && actual != expected
            {
                return Err(GeometryError::LengthMismatch {
                    mesh: mesh.to_string(),
                    what: format!("welded {}", what),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Result of welding one mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeldOutput {
    pub buffers: WeldedBuffers,
    pub indices: Vec<u32>,
    pub sub_meshes: Vec<SubMesh>,
    pub vertex_map: VertexIndexMap,
    pub key_order: Vec<KeyOrderEntry>,
    /// Triangles whose material index had no submesh
    pub skipped_triangles: usize,
}

struct Welder<'a> {
    precision: &'a Precision,
    skin: Option<&'a [Influences]>,
    vertex_map: VertexIndexMap,
    buffers: WeldedBuffers,
    indices: Vec<u32>,
    sub_meshes: Vec<SubMesh>,
    key_order: Vec<KeyOrderEntry>,
    vertices_start: u32,
    index_start: u32,
}

impl<'a> Welder<'a> {
    fn new(
        vertex_count: usize,
        layout: VertexLayout,
        precision: &'a Precision,
        skin: Option<&'a [Influences]>,
    ) -> Self {
        Self {
            precision,
            skin,
            vertex_map: VertexIndexMap::new(vertex_count),
            buffers: WeldedBuffers::new(layout),
            indices: Vec::new(),
            sub_meshes: Vec::new(),
            key_order: Vec::new(),
            vertices_start: 0,
            index_start: 0,
        }
    }

    fn vertex_count(&self) -> u32 {
        self.buffers.len() as u32
    }

    fn begin_submesh(&mut self) {
        self.vertices_start = self.vertex_count();
        self.index_start = self.indices.len() as u32;
    }

    fn end_submesh(&mut self, material_index: u32) {
        self.sub_meshes.push(SubMesh {
            material_index,
            vertices_start: self.vertices_start,
            vertices_count: self.vertex_count() - self.vertices_start,
            index_start: self.index_start,
            index_count: self.indices.len() as u32 - self.index_start,
        });
    }

    fn add_corner(&mut self, corner: &Corner) {
        let influences = self.skin.map(|skin| &skin[corner.vertex as usize]);

        let index = match self.find_match(corner, influences) {
            Some(index) => index,
            None => self.emit(corner, influences),
        };
        self.indices.push(index);
    }

    /// First earlier emission of this source vertex, inside the current submesh,
    /// whose attributes all match
    fn find_match(&self, corner: &Corner, influences: Option<&Influences>) -> Option<u32> {
        self.vertex_map
            .get(corner.vertex)
            .iter()
            .copied()
            .filter(|&index| index >= self.vertices_start)
            .find(|&index| self.matches(index as usize, corner, influences))
    }

    fn matches(&self, index: usize, corner: &Corner, influences: Option<&Influences>) -> bool {
        let p = self.precision;
        let b = &self.buffers;

        if !same_vector(&b.normals[index], &corner.normal, p.normal) {
            return false;
        }
        if let (Some(uvs), Some(uv)) = (&b.uvs, corner.uv0)
            && !same_vector(&uvs[index], &uv, p.uv)
        {
            return false;
        }
        if let (Some(uvs2), Some(uv)) = (&b.uvs2, corner.uv1)
            && !same_vector(&uvs2[index], &uv, p.uv)
        {
            return false;
        }
        if let (Some(colors), Some(color)) = (&b.colors, corner.color)
            && !same_vector(&colors[index], &color, p.color)
        {
            return false;
        }
        if let (Some(welded), Some(influences)) = (&b.influences, influences)
            && !same_influences(&welded[index], influences, p.weight)
        {
            return false;
        }
        true
    }

    fn emit(&mut self, corner: &Corner, influences: Option<&Influences>) -> u32 {
        let index = self.vertex_count();
        let b = &mut self.buffers;

        b.positions.push(corner.position);
        b.normals.push(corner.normal);
        if let (Some(uvs), Some(uv)) = (&mut b.uvs, corner.uv0) {
            uvs.push(uv);
        }
        if let (Some(uvs2), Some(uv)) = (&mut b.uvs2, corner.uv1) {
            uvs2.push(uv);
        }
        if let (Some(colors), Some(color)) = (&mut b.colors, corner.color) {
            colors.push(color);
        }
        if let (Some(welded), Some(influences)) = (&mut b.influences, influences) {
            welded.push(influences.clone());
        }

        self.vertex_map.record(corner.vertex, index);
        self.key_order.push(KeyOrderEntry {
            vertex: corner.vertex,
            welded: index,
        });
        index
    }

    fn finish(self, skipped_triangles: usize) -> WeldOutput {
        WeldOutput {
            buffers: self.buffers,
            indices: self.indices,
            sub_meshes: self.sub_meshes,
            vertex_map: self.vertex_map,
            key_order: self.key_order,
            skipped_triangles,
        }
    }
}

/// Weld a mesh's triangles into indexed buffers, one submesh per material
///
/// `layout` decides which attributes take part; input is assumed validated
/// (corner ids in range, attributes present wherever the layout says so).
pub fn weld(input: &MeshInput, layout: VertexLayout, precision: &Precision) -> WeldOutput {
    let skin = if layout.skin {
        input.skin.as_ref().map(|s| s.influences.as_slice())
    } else {
        None
    };
    let mut welder = Welder::new(input.vertex_count, layout, precision, skin);

    if input.merge_materials {
        welder.begin_submesh();
        for tri in &input.triangles {
            for corner in &tri.corners {
                welder.add_corner(corner);
            }
        }
        welder.end_submesh(0);
        return welder.finish(0);
    }

    let material_count = input.material_count.max(1);
    for material_index in 0..material_count {
        welder.begin_submesh();
        for tri in input
            .triangles
            .iter()
            .filter(|t| t.material_index == material_index)
        {
            for corner in &tri.corners {
                welder.add_corner(corner);
            }
        }
        welder.end_submesh(material_index);
    }

    let skipped = input
        .triangles
        .iter()
        .filter(|t| t.material_index >= material_count)
        .count();
    welder.finish(skipped)
}
