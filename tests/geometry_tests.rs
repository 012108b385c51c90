use glam::Vec3;
use fire_viewer::geometry::{generate, icosphere, MeshData, ShapeParams, MAX_TESSELLATIONS};

fn unit_sphere(level: i32) -> MeshData {
    icosphere(Vec3::ZERO, 1.0, level).unwrap()
}

#[cfg(test)]
mod icosphere_tests {
    use super::*;

    #[test]
    fn test_level_zero_is_the_icosahedron() {
        let mesh = unit_sphere(0);
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.triangle_count(), 20);
        assert_eq!(mesh.indices.len(), 60);
    }

    #[test]
    fn test_level_one_counts() {
        let mesh = unit_sphere(1);
        assert_eq!(mesh.vertex_count(), 42);
        assert_eq!(mesh.triangle_count(), 80);
        assert_eq!(mesh.indices.len(), 240);
    }

    #[test]
    fn test_counts_follow_closed_form_for_every_level() {
        for level in 0..=MAX_TESSELLATIONS {
            let mesh = unit_sphere(level);
            let growth = 4usize.pow(level as u32);
            assert_eq!(mesh.vertex_count(), 10 * growth + 2, "vertices at level {}", level);
            assert_eq!(mesh.triangle_count(), 20 * growth, "triangles at level {}", level);
            assert!(mesh.is_well_formed(), "level {} is malformed", level);
        }
    }

    #[test]
    fn test_vertices_lie_on_the_unit_sphere() {
        for level in [0, 3, MAX_TESSELLATIONS] {
            let mesh = unit_sphere(level);
            for p in &mesh.positions {
                let length = Vec3::new(p[0], p[1], p[2]).length();
                assert!((length - 1.0).abs() < 1e-5, "level {}: |p| = {}", level, length);
                assert_eq!(p[3], 1.0);
            }
        }
    }

    #[test]
    fn test_normals_are_unit_with_zero_w() {
        let mesh = icosphere(Vec3::new(3.0, -1.0, 2.0), 2.5, 2).unwrap();
        for n in &mesh.normals {
            assert!((Vec3::new(n[0], n[1], n[2]).length() - 1.0).abs() < 1e-5);
            assert_eq!(n[3], 0.0);
        }
    }

    #[test]
    fn test_translation_applies_after_normalisation() {
        let center = Vec3::new(1.0, 2.0, 3.0);
        let mesh = icosphere(center, 1.0, 2).unwrap();
        for p in &mesh.positions {
            let offset = Vec3::new(p[0], p[1], p[2]) - center;
            assert!((offset.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_generation_is_bit_identical() {
        let params = ShapeParams::Icosphere {
            center: Vec3::new(0.5, 0.0, -0.5),
            radius: 1.0,
            tessellations: 4,
        };
        let first = generate(&params).unwrap();
        let second = generate(&params).unwrap();

        let bytes = |m: &MeshData| {
            (
                bytemuck::cast_slice::<[f32; 4], u8>(&m.positions).to_vec(),
                bytemuck::cast_slice::<[f32; 4], u8>(&m.normals).to_vec(),
                m.indices.clone(),
            )
        };
        assert_eq!(bytes(&first), bytes(&second));
    }

    #[test]
    fn test_out_of_range_levels_are_rejected() {
        assert!(icosphere(Vec3::ZERO, 1.0, -1).is_err());
        assert!(icosphere(Vec3::ZERO, 1.0, MAX_TESSELLATIONS + 1).is_err());
    }
}

#[cfg(test)]
mod primitive_tests {
    use super::*;

    #[test]
    fn test_fixed_primitives_are_well_formed() {
        for params in [
            ShapeParams::Cube { center: Vec3::ZERO },
            ShapeParams::Square { center: Vec3::new(0.0, 0.0, -2.0) },
        ] {
            let mesh = generate(&params).unwrap();
            assert!(mesh.is_well_formed(), "{:?}", params.kind());
        }
    }
}
