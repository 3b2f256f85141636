//! End-to-end properties of the welding pipeline

use meshweld_geometry::{
    Corner, ExportConfig, Influence, Influences, MeshInput, Precision, ShapeKeyBlock, SkinInput,
    Triangle, VertexLayout, assemble, unpack_bone_indices, weld,
};

/// Unit cube, 8 corners, 6 flat-shaded faces, 2 triangles each
fn flat_cube() -> MeshInput {
    let p: [[f32; 3]; 8] = [
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.0, 1.0, 1.0],
    ];
    let faces: [([u32; 4], [f32; 3]); 6] = [
        ([0, 3, 2, 1], [0.0, 0.0, -1.0]),
        ([4, 5, 6, 7], [0.0, 0.0, 1.0]),
        ([0, 1, 5, 4], [0.0, -1.0, 0.0]),
        ([2, 3, 7, 6], [0.0, 1.0, 0.0]),
        ([0, 4, 7, 3], [-1.0, 0.0, 0.0]),
        ([1, 2, 6, 5], [1.0, 0.0, 0.0]),
    ];

    let mut triangles = Vec::new();
    for (quad, normal) in faces {
        for tri in [[quad[0], quad[1], quad[2]], [quad[0], quad[2], quad[3]]] {
            triangles.push(Triangle {
                corners: tri.map(|v| Corner::new(v, p[v as usize], normal)),
                material_index: 0,
            });
        }
    }

    MeshInput {
        name: "cube".to_string(),
        vertex_count: 8,
        triangles,
        material_count: 1,
        ..Default::default()
    }
}

/// Smooth-shaded grid with a UV seam, colors, two materials, skin and shape keys,
/// each toggled by the bits of `features`
fn featured_grid(features: u8) -> MeshInput {
    let (with_uv0, with_uv1, with_color, with_skin, with_keys) = (
        features & 1 != 0,
        features & 2 != 0,
        features & 4 != 0,
        features & 8 != 0,
        features & 16 != 0,
    );

    const N: u32 = 4;
    let id = |x: u32, y: u32| y * N + x;
    let position = |v: u32| [(v % N) as f32, (v / N) as f32, 0.0];

    let mut triangles = Vec::new();
    for y in 0..N - 1 {
        for x in 0..N - 1 {
            let material_index = if x < 2 { 0 } else { 1 };
            let quad = [id(x, y), id(x + 1, y), id(x + 1, y + 1), id(x, y + 1)];
            for tri in [[quad[0], quad[1], quad[2]], [quad[0], quad[2], quad[3]]] {
                let corners = tri.map(|v| {
                    let mut c = Corner::new(v, position(v), [0.0, 0.0, 1.0]);
                    if with_uv0 {
                        // Seam between column 0 and the rest
                        let island = if x == 0 { 0.0 } else { 0.5 };
                        c.uv0 = Some([island + (v % N) as f32 * 0.1, (v / N) as f32 * 0.1]);
                    }
                    if with_uv1 {
                        c.uv1 = Some([(v % N) as f32 * 0.25, (v / N) as f32 * 0.25]);
                    }
                    if with_color {
                        let shade = if y == 0 { 1.0 } else { 0.5 };
                        c.color = Some([shade, shade, shade, 1.0]);
                    }
                    c
                });
                triangles.push(Triangle {
                    corners,
                    material_index,
                });
            }
        }
    }

    let vertex_count = (N * N) as usize;
    let skin = with_skin.then(|| SkinInput {
        skeleton_id: 0,
        influences: (0..vertex_count as u32)
            .map(|v| {
                (0..(v % 6 + 1))
                    .map(|k| Influence::new(v + k, 1.0 / (k + 1) as f32))
                    .collect::<Influences>()
            })
            .collect(),
    });

    let shape_keys = if with_keys {
        let basis: Vec<[f32; 3]> = (0..N * N).map(position).collect();
        let mut lifted = basis.clone();
        for (v, p) in lifted.iter_mut().enumerate() {
            if v % 3 == 0 {
                p[2] += 0.25;
            }
        }
        vec![
            ShapeKeyBlock {
                name: "Basis".to_string(),
                positions: basis,
                normals: None,
            },
            ShapeKeyBlock {
                name: "Lift".to_string(),
                positions: lifted,
                normals: None,
            },
        ]
    } else {
        Vec::new()
    };

    MeshInput {
        name: format!("grid-{features:02}"),
        vertex_count,
        triangles,
        material_count: 2,
        skin,
        shape_keys,
        ..Default::default()
    }
}

#[test]
fn test_flat_cube_corners_split_by_normal() {
    let geometry = assemble(&flat_cube(), &ExportConfig::default()).expect("cube");

    assert_eq!(geometry.vertex_count(), 24);
    assert_eq!(geometry.indices.len(), 36);
    assert_eq!(geometry.sub_meshes.len(), 1);

    let sub = geometry.sub_meshes[0];
    assert_eq!(sub.material_index, 0);
    assert_eq!(sub.vertices_start, 0);
    assert_eq!(sub.vertices_count, 24);
    assert_eq!(sub.index_start, 0);
    assert_eq!(sub.index_count, 36);
    assert!(geometry.uvs.is_none());
    assert!(geometry.uvs2.is_none());
    assert!(geometry.colors.is_none());
}

#[test]
fn test_winding_is_preserved() {
    let input = flat_cube();
    let geometry = assemble(&input, &ExportConfig::default()).expect("cube");

    for (tri, face) in input.triangles.iter().zip(geometry.indices.chunks_exact(3)) {
        for (corner, &index) in tri.corners.iter().zip(face) {
            assert_eq!(geometry.positions[index as usize], corner.position);
            assert_eq!(geometry.normals[index as usize], corner.normal);
        }
    }
}

#[test]
fn test_every_feature_combination() {
    for features in 0..32u8 {
        let input = featured_grid(features);
        let geometry = assemble(&input, &ExportConfig::default())
            .unwrap_or_else(|e| panic!("features {features}: {e}"));
        let n = geometry.vertex_count();

        // Arrays stay index-aligned, absent ones stay absent
        assert_eq!(geometry.normals.len(), n);
        assert_eq!(geometry.uvs.as_ref().map(Vec::len), (features & 1 != 0).then_some(n));
        assert_eq!(geometry.uvs2.as_ref().map(Vec::len), (features & 2 != 0).then_some(n));
        assert_eq!(geometry.colors.as_ref().map(Vec::len), (features & 4 != 0).then_some(n));

        // Submeshes partition the index buffer, ordered by material
        let total: u32 = geometry.sub_meshes.iter().map(|s| s.index_count).sum();
        assert_eq!(total as usize, geometry.indices.len());
        let mut next_index = 0;
        let mut next_vertex = 0;
        for (m, sub) in geometry.sub_meshes.iter().enumerate() {
            assert_eq!(sub.material_index, m as u32);
            assert_eq!(sub.index_start, next_index);
            assert_eq!(sub.vertices_start, next_vertex);
            next_index += sub.index_count;
            next_vertex += sub.vertices_count;

            // Every index stays inside its submesh's vertex range
            for &index in &geometry.indices[sub.index_range()] {
                assert!(sub.vertex_range().contains(&index), "features {features}");
            }
        }
        assert_eq!(next_vertex as usize, n);

        if let Some(skin) = &geometry.skin {
            assert_eq!(skin.weights.len(), 4 * n);
            assert_eq!(skin.indices.len(), n);
            assert_eq!(skin.num_bone_influencers, 6);
            assert_eq!(skin.weights_extra.as_ref().map(Vec::len), Some(4 * n));
            assert_eq!(skin.indices_extra.as_ref().map(Vec::len), Some(n));
        } else {
            assert_eq!(features & 8, 0);
        }

        match &geometry.shape_keys {
            Some(keys) => {
                for key in &keys.keys {
                    let affected = key.affected_indices();
                    assert!(!affected.is_empty());
                    assert!(affected.windows(2).all(|w| w[0] < w[1]), "features {features}");
                }
            }
            None => assert_eq!(features & 16, 0),
        }
    }
}

#[test]
fn test_materials_split_shared_vertices() {
    let geometry = assemble(&featured_grid(0), &ExportConfig::default()).expect("grid");

    // Column x = 2 is shared by both materials and gets emitted twice
    assert_eq!(geometry.sub_meshes[0].vertices_count, 12);
    assert_eq!(geometry.sub_meshes[1].vertices_count, 8);
    assert_eq!(geometry.vertex_count(), 20);
}

#[test]
fn test_uv_seam_adds_vertices() {
    let plain = assemble(&featured_grid(0), &ExportConfig::default()).expect("plain");
    let seamed = assemble(&featured_grid(1), &ExportConfig::default()).expect("seamed");

    // Column x = 1 appears on both sides of the seam in material 0
    assert_eq!(seamed.vertex_count(), plain.vertex_count() + 4);
}

#[test]
fn test_rewelding_is_identity() {
    let input = featured_grid(0b0_0111);
    let first = weld(
        &input,
        VertexLayout {
            uv0: true,
            uv1: true,
            color: true,
            skin: false,
        },
        &Precision::default(),
    );
    let b = &first.buffers;

    // Each welded vertex becomes its own source vertex
    let uvs = b.uvs.as_ref().expect("uvs");
    let uvs2 = b.uvs2.as_ref().expect("uvs2");
    let colors = b.colors.as_ref().expect("colors");
    let corner = |i: u32| {
        let i_ = i as usize;
        Corner::new(i, b.positions[i_], b.normals[i_])
            .with_uv0(uvs[i_])
            .with_uv1(uvs2[i_])
            .with_color(colors[i_])
    };

    let mut triangles = Vec::new();
    for sub in &first.sub_meshes {
        for face in first.indices[sub.index_range()].chunks_exact(3) {
            triangles.push(Triangle {
                corners: [corner(face[0]), corner(face[1]), corner(face[2])],
                material_index: sub.material_index,
            });
        }
    }
    let again = MeshInput {
        name: "again".to_string(),
        vertex_count: b.len(),
        triangles,
        material_count: input.material_count,
        ..Default::default()
    };
    let second = weld(
        &again,
        VertexLayout {
            uv0: true,
            uv1: true,
            color: true,
            skin: false,
        },
        &Precision::default(),
    );

    assert_eq!(second.buffers, first.buffers);
    assert_eq!(second.indices, first.indices);
    assert_eq!(second.sub_meshes, first.sub_meshes);
    for v in 0..b.len() as u32 {
        assert_eq!(second.vertex_map.get(v), &[v]);
    }
}

#[test]
fn test_attribute_change_beyond_epsilon_forces_new_vertex() {
    let precision = Precision::default();
    let base = Corner::new(0, [0.0; 3], [0.0, 0.0, 1.0])
        .with_uv0([0.5, 0.5])
        .with_uv1([0.5, 0.5])
        .with_color([1.0, 1.0, 1.0, 1.0]);
    let other = Corner::new(1, [1.0, 0.0, 0.0], [0.0, 0.0, 1.0])
        .with_uv0([0.5, 0.5])
        .with_uv1([0.5, 0.5])
        .with_color([1.0, 1.0, 1.0, 1.0]);
    let layout = VertexLayout {
        uv0: true,
        uv1: true,
        color: true,
        skin: false,
    };

    let within = |c: Corner| {
        let input = MeshInput {
            name: "pair".to_string(),
            vertex_count: 2,
            triangles: vec![
                Triangle {
                    corners: [base, other, other],
                    material_index: 0,
                },
                Triangle {
                    corners: [c, other, other],
                    material_index: 0,
                },
            ],
            material_count: 1,
            ..Default::default()
        };
        weld(&input, layout, &precision).buffers.len()
    };

    assert_eq!(within(base), 2);

    let tweaks: [fn(&mut Corner, f32); 4] = [
        |c, d| c.normal[0] += d,
        |c, d| c.uv0 = c.uv0.map(|uv| [uv[0] + d, uv[1]]),
        |c, d| c.uv1 = c.uv1.map(|uv| [uv[0], uv[1] + d]),
        |c, d| c.color = c.color.map(|rgba| [rgba[0], rgba[1], rgba[2], rgba[3] - d]),
    ];
    for tweak in tweaks {
        let mut near = base;
        tweak(&mut near, 1e-4);
        assert_eq!(within(near), 2, "small change should weld");

        let mut far = base;
        tweak(&mut far, 1e-2);
        assert_eq!(within(far), 3, "large change should split");
    }
}

#[test]
fn test_six_influences_capped_at_four() {
    let mut input = flat_cube();
    let weights = [0.4, 0.3, 0.1, 0.05, 0.05, 0.1];
    let mut influences: Vec<Influences> = (0..8)
        .map(|_| [Influence::new(0, 1.0)].into_iter().collect())
        .collect();
    influences[0] = weights
        .iter()
        .enumerate()
        .map(|(bone, &w)| Influence::new(bone as u32 + 10, w))
        .collect();
    input.skin = Some(SkinInput {
        skeleton_id: 1,
        influences,
    });

    let config = ExportConfig {
        max_influencers: 4,
        ..Default::default()
    };
    let geometry = assemble(&input, &config).expect("cube");
    let skin = geometry.skin.expect("skin");

    assert_eq!(skin.num_bone_influencers, 4);
    assert_eq!(skin.stats.highest_observed, 6);
    assert!(skin.weights_extra.is_none());

    // Source vertex 0 split into three welded copies (three face normals)
    let copies: Vec<usize> = geometry
        .positions
        .iter()
        .enumerate()
        .filter(|(_, p)| **p == [0.0, 0.0, 0.0])
        .map(|(i, _)| i)
        .collect();
    assert_eq!(copies.len(), 3);
    assert_eq!(skin.stats.truncated, 3);

    for i in copies {
        assert_eq!(&skin.weights[i * 4..i * 4 + 4], &[0.4, 0.3, 0.1, 0.1]);
        assert_eq!(unpack_bone_indices(skin.indices[i]), [10, 11, 12, 15]);
    }
}
