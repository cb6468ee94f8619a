//! Generated reference geometry.
//!
//! Small shapes used by the demos, the light markers and the tests. All
//! generators return plain vertex/index vectors ready for
//! [`Mesh::new`](crate::data_structures::model::Mesh::new).

use crate::data_structures::model::ModelVertex;

/// A triangle in the z = 0 plane, facing +z.
pub fn first_triangle() -> (Vec<ModelVertex>, Vec<u32>) {
    let vertices = vec![
        ModelVertex {
            position: [-0.5, -0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
            tex_coords: [0.0, 1.0],
        },
        ModelVertex {
            position: [0.5, -0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
            tex_coords: [1.0, 1.0],
        },
        ModelVertex {
            position: [0.0, 0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
            tex_coords: [0.5, 0.0],
        },
    ];
    (vertices, vec![0, 1, 2])
}

/// A unit quad in the z = 0 plane, two triangles over a shared vertex pool.
pub fn unit_quad() -> (Vec<ModelVertex>, Vec<u32>) {
    let vertices = vec![
        ModelVertex {
            position: [-0.5, -0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
            tex_coords: [0.0, 1.0],
        },
        ModelVertex {
            position: [0.5, -0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
            tex_coords: [1.0, 1.0],
        },
        ModelVertex {
            position: [0.5, 0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
            tex_coords: [1.0, 0.0],
        },
        ModelVertex {
            position: [-0.5, 0.5, 0.0],
            normal: [0.0, 0.0, 1.0],
            tex_coords: [0.0, 0.0],
        },
    ];
    (vertices, vec![0, 1, 2, 2, 3, 0])
}

/// An axis-aligned cube centered at the origin with the given half extent.
///
/// Four vertices per face so every face gets a flat normal and its own
/// texture coordinates, 24 vertices and 36 indices in total.
pub fn cube(half_extent: f32) -> (Vec<ModelVertex>, Vec<u32>) {
    // (normal, right, up) per face; positions derive from the face basis
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, right, up) in faces {
        let base = vertices.len() as u32;
        let corners = [
            (-1.0, -1.0, [0.0, 1.0]),
            (1.0, -1.0, [1.0, 1.0]),
            (1.0, 1.0, [1.0, 0.0]),
            (-1.0, 1.0, [0.0, 0.0]),
        ];
        for (u, v, tex_coords) in corners {
            let position = [
                (normal[0] + right[0] * u + up[0] * v) * half_extent,
                (normal[1] + right[1] * u + up[1] * v) * half_extent,
                (normal[2] + right[2] * u + up[2] * v) * half_extent,
            ];
            vertices.push(ModelVertex {
                position,
                normal,
                tex_coords,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    (vertices, indices)
}

/// A unit cube, the shape used for light markers.
pub fn unit_cube() -> (Vec<ModelVertex>, Vec<u32>) {
    cube(0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::model::validate_geometry;

    #[test]
    fn quad_is_valid_indexed_geometry() {
        let (vertices, indices) = unit_quad();
        assert_eq!(indices.len(), 6);
        validate_geometry(&vertices, &indices).unwrap();
    }

    #[test]
    fn cube_has_a_flat_normal_per_face() {
        let (vertices, indices) = unit_cube();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        validate_geometry(&vertices, &indices).unwrap();
        for v in &vertices {
            let len = (v.normal[0].powi(2) + v.normal[1].powi(2) + v.normal[2].powi(2)).sqrt();
            assert!((len - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn cube_corners_sit_on_the_half_extent() {
        let (vertices, _) = cube(2.0);
        for v in &vertices {
            for c in v.position {
                assert!(c.abs() <= 2.0 + 1e-6);
            }
            assert!(v.position.iter().any(|c| (c.abs() - 2.0).abs() < 1e-6));
        }
    }
}
