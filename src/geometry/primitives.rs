use glam::Vec3;

use super::MeshData;

/// Unit square in the XY plane, facing +Z
pub fn square(center: Vec3) -> MeshData {
    let points = [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(-1.0, 1.0, 0.0),
    ];
    let normals = [Vec3::Z; 4];
    MeshData::from_unit(&points, &normals, vec![0, 1, 2, 0, 2, 3], center, 1.0)
}

// Per face: normal, then four corners in fan order
const CUBE_FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
    // front
    ([0.0, 0.0, 1.0], [[1.0, 1.0, 1.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0], [0.0, 1.0, 1.0]]),
    // right
    ([1.0, 0.0, 0.0], [[1.0, 1.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0]]),
    // left
    ([-1.0, 0.0, 0.0], [[0.0, 1.0, 1.0], [0.0, 0.0, 1.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]]),
    // back
    ([0.0, 0.0, -1.0], [[0.0, 1.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]),
    // top
    ([0.0, 1.0, 0.0], [[1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0]]),
    // bottom
    ([0.0, -1.0, 0.0], [[1.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]]),
];

/// Unit cube spanning `center .. center + 1` with flat per-face normals
pub fn cube(center: Vec3) -> MeshData {
    let mut points = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (face, (normal, corners)) in CUBE_FACES.iter().enumerate() {
        let base = face as u32 * 4;
        points.extend(corners.iter().map(|c| Vec3::from_array(*c)));
        normals.extend(std::iter::repeat(Vec3::from_array(*normal)).take(4));
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData::from_unit(&points, &normals, indices, center, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_layout() {
        let mesh = square(Vec3::new(0.0, 0.0, -1.0));
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(mesh.positions.iter().all(|p| p[2] == -1.0 && p[3] == 1.0));
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 0.0, 1.0, 0.0]));
    }

    #[test]
    fn cube_layout() {
        let mesh = cube(Vec3::ZERO);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.is_well_formed());
        assert_eq!(&mesh.indices[6..12], &[4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn cube_corners_lie_on_their_face_plane() {
        let mesh = cube(Vec3::ZERO);
        for (p, n) in mesh.positions.iter().zip(&mesh.normals) {
            let p = Vec3::new(p[0], p[1], p[2]);
            let n = Vec3::new(n[0], n[1], n[2]);
            // Offset of the face plane from the origin along its normal
            let plane = if n.max_element() > 0.0 { 1.0 } else { 0.0 };
            assert!((p.dot(n).abs() - plane).abs() < 1e-6);
        }
    }
}
