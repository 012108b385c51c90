use std::collections::HashMap;

use glam::Vec3;

use super::MeshData;
use crate::error::GeometryError;

/// Deepest subdivision the generator accepts (20·4^8 triangles)
pub const MAX_TESSELLATIONS: i32 = 8;

const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

fn icosahedron_vertices() -> Vec<Vec3> {
    let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, phi, 0.0),
        Vec3::new(1.0, phi, 0.0),
        Vec3::new(-1.0, -phi, 0.0),
        Vec3::new(1.0, -phi, 0.0),
        Vec3::new(0.0, -1.0, phi),
        Vec3::new(0.0, 1.0, phi),
        Vec3::new(0.0, -1.0, -phi),
        Vec3::new(0.0, 1.0, -phi),
        Vec3::new(phi, 0.0, -1.0),
        Vec3::new(phi, 0.0, 1.0),
        Vec3::new(-phi, 0.0, -1.0),
        Vec3::new(-phi, 0.0, 1.0),
    ]
    .into_iter()
    .map(Vec3::normalize)
    .collect()
}

/// One subdivision pass. Each shared edge gets exactly one midpoint vertex.
struct MidpointCache<'a> {
    vertices: &'a mut Vec<Vec3>,
    edges: HashMap<(u32, u32), u32>,
}

impl<'a> MidpointCache<'a> {
    fn new(vertices: &'a mut Vec<Vec3>, expected_edges: usize) -> Self {
        Self {
            vertices,
            edges: HashMap::with_capacity(expected_edges),
        }
    }

    fn midpoint(&mut self, a: u32, b: u32) -> u32 {
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&index) = self.edges.get(&key) {
            return index;
        }

        let mid = (self.vertices[a as usize] + self.vertices[b as usize]).normalize();
        let index = self.vertices.len() as u32;
        self.vertices.push(mid);
        self.edges.insert(key, index);
        index
    }
}

fn subdivide(vertices: &mut Vec<Vec3>, faces: &[[u32; 3]]) -> Vec<[u32; 3]> {
    // A closed triangle mesh has 3F/2 edges
    let mut cache = MidpointCache::new(vertices, faces.len() * 3 / 2);
    let mut next = Vec::with_capacity(faces.len() * 4);

    for &[a, b, c] in faces {
        let ab = cache.midpoint(a, b);
        let bc = cache.midpoint(b, c);
        let ca = cache.midpoint(c, a);

        next.push([a, ab, ca]);
        next.push([b, bc, ab]);
        next.push([c, ca, bc]);
        next.push([ab, bc, ca]);
    }

    next
}

/// Generate a subdivided icosahedron
///
/// Vertex count is `10·4^t + 2` and triangle count `20·4^t`. Normals point
/// away from `center`.
pub fn icosphere(center: Vec3, radius: f32, tessellations: i32) -> Result<MeshData, GeometryError> {
    if !(0..=MAX_TESSELLATIONS).contains(&tessellations) {
        return Err(GeometryError::TessellationOutOfRange {
            level: tessellations,
            max: MAX_TESSELLATIONS,
        });
    }
    if !(radius.is_finite() && radius > 0.0) {
        return Err(GeometryError::InvalidRadius(radius));
    }

    let mut vertices = icosahedron_vertices();
    let mut faces = ICOSAHEDRON_FACES.to_vec();
    for _ in 0..tessellations {
        faces = subdivide(&mut vertices, &faces);
    }

    let indices = faces.into_iter().flatten().collect();
    Ok(MeshData::from_unit(&vertices, &vertices, indices, center, radius))
}

/// Closed-form vertex count for a tessellation level
pub const fn expected_vertex_count(tessellations: u32) -> usize {
    10 * 4usize.pow(tessellations) + 2
}

/// Closed-form triangle count for a tessellation level
pub const fn expected_triangle_count(tessellations: u32) -> usize {
    20 * 4usize.pow(tessellations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_zero_is_the_icosahedron() {
        let mesh = icosphere(Vec3::ZERO, 1.0, 0).unwrap();
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.triangle_count(), 20);
        assert_eq!(mesh.indices.len(), 60);
    }

    #[test]
    fn level_one_counts() {
        let mesh = icosphere(Vec3::ZERO, 1.0, 1).unwrap();
        assert_eq!(mesh.vertex_count(), 42);
        assert_eq!(mesh.triangle_count(), 80);
        assert_eq!(mesh.indices.len(), 240);
    }

    #[test]
    fn midpoints_are_shared_between_faces() {
        let mut vertices = icosahedron_vertices();
        let faces = subdivide(&mut vertices, &ICOSAHEDRON_FACES);
        // 30 edges in an icosahedron, one new vertex per edge
        assert_eq!(vertices.len(), 12 + 30);
        assert_eq!(faces.len(), 80);
    }

    #[test]
    fn vertices_lie_on_the_unit_sphere() {
        let mesh = icosphere(Vec3::ZERO, 1.0, 3).unwrap();
        for p in &mesh.positions {
            let len = Vec3::new(p[0], p[1], p[2]).length();
            assert!((len - 1.0).abs() < 1e-5, "vertex off sphere: {len}");
            assert_eq!(p[3], 1.0);
        }
    }

    #[test]
    fn normals_match_unit_positions() {
        let center = Vec3::new(2.0, -1.0, 0.5);
        let mesh = icosphere(center, 1.0, 2).unwrap();
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            let local = Vec3::new(p[0], p[1], p[2]) - center;
            let normal = Vec3::new(n[0], n[1], n[2]);
            assert!((local - normal).length() < 1e-5);
            assert_eq!(n[3], 0.0);
        }
    }

    #[test]
    fn radius_scales_positions() {
        let mesh = icosphere(Vec3::ZERO, 2.5, 1).unwrap();
        for p in &mesh.positions {
            let len = Vec3::new(p[0], p[1], p[2]).length();
            assert!((len - 2.5).abs() < 1e-4);
        }
    }

    #[test]
    fn rejects_out_of_range_levels() {
        assert!(matches!(
            icosphere(Vec3::ZERO, 1.0, -1),
            Err(GeometryError::TessellationOutOfRange { level: -1, .. })
        ));
        assert!(matches!(
            icosphere(Vec3::ZERO, 1.0, MAX_TESSELLATIONS + 1),
            Err(GeometryError::TessellationOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_bad_radius() {
        assert_eq!(icosphere(Vec3::ZERO, 0.0, 1), Err(GeometryError::InvalidRadius(0.0)));
        assert!(icosphere(Vec3::ZERO, f32::NAN, 1).is_err());
    }

    #[test]
    fn closed_form_counts() {
        assert_eq!(expected_vertex_count(0), 12);
        assert_eq!(expected_vertex_count(1), 42);
        assert_eq!(expected_triangle_count(2), 320);
    }
}
