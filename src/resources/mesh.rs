use cgmath::InnerSpace;

use crate::data_structures::model::{Material, Mesh, MeshError, ModelVertex};

/**
 * Obj exports don't always carry normals, but the phong model can't shade
 * without them, so missing normals are reconstructed from the triangle
 * geometry before upload.
 */
pub fn load_meshes(
    models: &[tobj::Model],
    materials: &[Material],
    fallback: &Material,
    file_name: &str,
    device: &wgpu::Device,
) -> Vec<Result<Mesh, MeshError>> {
    models
        .iter()
        .map(|m| {
            let mut vertices = (0..m.mesh.positions.len() / 3)
                .map(|i| ModelVertex {
                    position: [
                        m.mesh.positions[i * 3],
                        m.mesh.positions[i * 3 + 1],
                        m.mesh.positions[i * 3 + 2],
                    ],
                    tex_coords: [
                        m.mesh.texcoords.get(i * 2).map_or(0.0, |f| *f),
                        1.0 - m.mesh.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
                    ],
                    normal: [
                        m.mesh.normals.get(i * 3).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                        m.mesh.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
                    ],
                })
                .collect::<Vec<_>>();

            if m.mesh.normals.is_empty() {
                reconstruct_normals(&mut vertices, &m.mesh.indices);
            }

            let material = m
                .mesh
                .material_id
                .and_then(|id| materials.get(id))
                .unwrap_or(fallback)
                .clone();

            Mesh::new(device, file_name, &vertices, &m.mesh.indices, material)
        })
        .collect::<Vec<_>>()
}

/// Average the area-weighted face normals of every triangle touching a
/// vertex. Triangles referencing vertices that don't exist are skipped here;
/// mesh validation reports them properly afterwards.
pub fn reconstruct_normals(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut touched = vec![false; vertices.len()];
    for c in indices.chunks(3) {
        if c.len() < 3 || c.iter().any(|&i| i as usize >= vertices.len()) {
            continue;
        }
        let p0: cgmath::Vector3<f32> = vertices[c[0] as usize].position.into();
        let p1: cgmath::Vector3<f32> = vertices[c[1] as usize].position.into();
        let p2: cgmath::Vector3<f32> = vertices[c[2] as usize].position.into();

        // Unnormalized cross product weighs large triangles heavier
        let face_normal = (p1 - p0).cross(p2 - p0);
        for &i in c {
            let i = i as usize;
            let sum = cgmath::Vector3::from(vertices[i].normal) + face_normal;
            vertices[i].normal = sum.into();
            touched[i] = true;
        }
    }

    for (vertex, touched) in vertices.iter_mut().zip(touched) {
        let normal = cgmath::Vector3::from(vertex.normal);
        if touched && normal.magnitude2() > 0.0 {
            vertex.normal = normal.normalize().into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::shapes;

    #[test]
    fn flat_quad_normals_point_along_z() {
        let (mut vertices, indices) = shapes::unit_quad();
        for v in &mut vertices {
            v.normal = [0.0; 3];
        }
        reconstruct_normals(&mut vertices, &indices);
        for v in &vertices {
            assert!((v.normal[2] - 1.0).abs() < 1e-6, "normal {:?}", v.normal);
        }
    }

    #[test]
    fn out_of_range_triangles_are_ignored() {
        let (mut vertices, _) = shapes::unit_quad();
        for v in &mut vertices {
            v.normal = [0.0; 3];
        }
        reconstruct_normals(&mut vertices, &[0, 1, 99]);
        // Nothing was touched, normals stay zeroed
        for v in &vertices {
            assert_eq!(v.normal, [0.0; 3]);
        }
    }
}
