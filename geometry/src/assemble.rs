//! Geometry assembly: validate, weld, pack skin, extract shape keys

use crate::compare::same_vector;
use crate::config::ExportConfig;
use crate::error::{Diagnostics, GeometryError, Warning};
use crate::influence::{MAX_PACKED_BONE_INDEX, SkinBuffers, pack_skin};
use crate::shape_key::{ShapeKeys, extract_shape_keys};
use crate::types::{MeshInput, SubMesh, VertexLayout};
use crate::weld::weld;

/// Final per-mesh buffers, ready for serialization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub uvs2: Option<Vec<[f32; 2]>>,
    pub colors: Option<Vec<[f32; 4]>>,
    pub indices: Vec<u32>,
    pub sub_meshes: Vec<SubMesh>,
    pub skeleton_id: Option<u32>,
    pub skin: Option<SkinBuffers>,
    pub shape_keys: Option<ShapeKeys>,
    pub diagnostics: Diagnostics,
}

impl Geometry {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Check corner ids, attribute presence and per-vertex array lengths
///
/// Returns the attribute layout every corner agrees on.
pub fn validate(input: &MeshInput) -> Result<VertexLayout, GeometryError> {
    let mesh = &input.name;
    let total = input.triangles.len() * 3;
    let (mut uv0, mut uv1, mut color) = (0usize, 0usize, 0usize);

    for (t, tri) in input.triangles.iter().enumerate() {
        for corner in &tri.corners {
            if corner.vertex as usize >= input.vertex_count {
                return Err(GeometryError::VertexOutOfRange {
                    mesh: mesh.clone(),
                    triangle: t,
                    vertex: corner.vertex,
                    vertex_count: input.vertex_count,
                });
            }
            uv0 += corner.uv0.is_some() as usize;
            uv1 += corner.uv1.is_some() as usize;
            color += corner.color.is_some() as usize;
        }
    }

    let all_or_none = |attribute: &'static str, present: usize| {
        if present == 0 || present == total {
            Ok(present > 0)
        } else {
            Err(GeometryError::PartialAttribute {
                mesh: mesh.clone(),
                attribute,
                present,
                total,
            })
        }
    };

    let mut layout = VertexLayout {
        uv0: all_or_none("uv", uv0)?,
        uv1: all_or_none("uv2", uv1)?,
        color: all_or_none("color", color)?,
        skin: false,
    };

    if let Some(skin) = &input.skin {
        check_length(mesh, "skin influences", input.vertex_count, skin.influences.len())?;
        for (vertex, influences) in skin.influences.iter().enumerate() {
            if let Some(bad) = influences.iter().find(|i| i.bone > MAX_PACKED_BONE_INDEX) {
                return Err(GeometryError::BoneIndexOutOfRange {
                    mesh: mesh.clone(),
                    vertex,
                    bone: bad.bone,
                    max: MAX_PACKED_BONE_INDEX,
                });
            }
        }
        layout.skin = true;
    }

    for block in &input.shape_keys {
        check_length(
            mesh,
            &format!("shape key '{}' positions", block.name),
            input.vertex_count,
            block.positions.len(),
        )?;
        if let Some(normals) = &block.normals {
            check_length(
                mesh,
                &format!("shape key '{}' normals", block.name),
                input.vertex_count,
                normals.len(),
            )?;
        }
    }

    Ok(layout)
}

fn check_length(
    mesh: &str,
    what: &str,
    expected: usize,
    actual: usize,
) -> Result<(), GeometryError> {
    if expected == actual {
        Ok(())
    } else {
        Err(GeometryError::LengthMismatch {
            mesh: mesh.to_string(),
            what: what.to_string(),
            expected,
            actual,
        })
    }
}

/// Count triangles with two coincident corners
///
/// Diagnostic only; such faces are kept in the output.
pub fn count_zero_area_faces(positions: &[[f32; 3]], indices: &[u32], eps: f32) -> usize {
    indices
        .chunks_exact(3)
        .filter(|face| {
            let p1 = &positions[face[0] as usize];
            let p2 = &positions[face[1] as usize];
            let p3 = &positions[face[2] as usize];
            same_vector(p1, p2, eps) || same_vector(p1, p3, eps) || same_vector(p2, p3, eps)
        })
        .count()
}

/// Turn one host mesh into exportable geometry
///
/// Runs welding, then influence packing when the mesh is skinned, then
/// shape-key extraction when the mesh has keys. Any error is fatal for this
/// mesh only.
pub fn assemble(input: &MeshInput, config: &ExportConfig) -> Result<Geometry, GeometryError> {
    let mesh = input.name.as_str();
    let layout = validate(input)?;
    let mut diagnostics = Diagnostics::default();

    let mut welded = weld(input, layout, &config.precision);
    welded.buffers.verify_aligned(mesh)?;

    if welded.skipped_triangles > 0 {
        diagnostics.skipped_triangles = welded.skipped_triangles;
        diagnostics.warn(
            mesh,
            Warning::TrianglesOutsideMaterials {
                count: welded.skipped_triangles,
                material_count: input.material_count.max(1),
            },
        );
    }

    tracing::debug!(
        mesh,
        positions = welded.buffers.positions.len(),
        normals = welded.buffers.normals.len(),
        uvs = welded.buffers.uvs.as_ref().map_or(0, Vec::len),
        uvs2 = welded.buffers.uvs2.as_ref().map_or(0, Vec::len),
        colors = welded.buffers.colors.as_ref().map_or(0, Vec::len),
        indices = welded.indices.len(),
        "Welded"
    );

    let skin = welded
        .buffers
        .influences
        .as_deref()
        .map(|per_vertex| pack_skin(mesh, per_vertex, config.max_influencers, &mut diagnostics));

    let zero_area = count_zero_area_faces(
        &welded.buffers.positions,
        &welded.indices,
        config.precision.position,
    );
    if zero_area > 0 {
        diagnostics.zero_area_faces = zero_area;
        diagnostics.warn(mesh, Warning::ZeroAreaFaces { count: zero_area });
    }

    let shape_keys = extract_shape_keys(
        mesh,
        &input.shape_keys,
        &mut welded.key_order,
        config.precision.position,
        &config.shape_keys,
        &mut diagnostics,
    );

    let buffers = welded.buffers;
    Ok(Geometry {
        name: input.name.clone(),
        positions: buffers.positions,
        normals: buffers.normals,
        uvs: buffers.uvs,
        uvs2: buffers.uvs2,
        colors: buffers.colors,
        indices: welded.indices,
        sub_meshes: welded.sub_meshes,
        skeleton_id: skin.as_ref().and(input.skin.as_ref()).map(|s| s.skeleton_id),
        skin,
        shape_keys,
        diagnostics,
    })
}
