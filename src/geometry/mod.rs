//! Pure geometry generators. Nothing in here touches the GPU.

pub mod icosphere;
pub mod primitives;

use glam::Vec3;

use crate::error::GeometryError;

pub use icosphere::{icosphere, MAX_TESSELLATIONS};
pub use primitives::{cube, square};

/// CPU-side vertex and index arrays for one renderable object
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Homogeneous positions, w = 1
    pub positions: Vec<[f32; 4]>,
    /// Normals parallel to `positions`, w = 0
    pub normals: Vec<[f32; 4]>,
    /// Triangle list
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check the structural invariants every generator must uphold
    pub fn is_well_formed(&self) -> bool {
        let vertices = self.positions.len() as u64;
        self.positions.len() == self.normals.len()
            && self.indices.len() % 3 == 0
            && self.indices.iter().all(|&i| (i as u64) < vertices)
    }

    /// Promote 3-component vertices to homogeneous form and move them to `center`
    pub(crate) fn from_unit(points: &[Vec3], normals: &[Vec3], indices: Vec<u32>, center: Vec3, scale: f32) -> Self {
        Self {
            positions: points
                .iter()
                .map(|p| (*p * scale + center).extend(1.0).to_array())
                .collect(),
            normals: normals.iter().map(|n| n.extend(0.0).to_array()).collect(),
            indices,
        }
    }
}

/// Parameters selecting one generator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeParams {
    Icosphere {
        center: Vec3,
        radius: f32,
        tessellations: i32,
    },
    Cube {
        center: Vec3,
    },
    Square {
        center: Vec3,
    },
}

impl ShapeParams {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeParams::Icosphere { .. } => ShapeKind::Icosphere,
            ShapeParams::Cube { .. } => ShapeKind::Cube,
            ShapeParams::Square { .. } => ShapeKind::Square,
        }
    }
}

/// Shape families the viewer can draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Icosphere,
    Cube,
    Square,
}

impl ShapeKind {
    pub fn label(self) -> &'static str {
        match self {
            ShapeKind::Icosphere => "icosphere",
            ShapeKind::Cube => "cube",
            ShapeKind::Square => "square",
        }
    }
}

/// Run the generator matching `shape`
pub fn generate(shape: &ShapeParams) -> Result<MeshData, GeometryError> {
    match *shape {
        ShapeParams::Icosphere {
            center,
            radius,
            tessellations,
        } => icosphere(center, radius, tessellations),
        ShapeParams::Cube { center } => Ok(cube(center)),
        ShapeParams::Square { center } => Ok(square(center)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_dispatches_by_kind() {
        let sphere = generate(&ShapeParams::Icosphere {
            center: Vec3::ZERO,
            radius: 1.0,
            tessellations: 0,
        })
        .unwrap();
        assert_eq!(sphere.vertex_count(), 12);

        let cube = generate(&ShapeParams::Cube { center: Vec3::ZERO }).unwrap();
        assert_eq!(cube.triangle_count(), 12);

        let square = generate(&ShapeParams::Square { center: Vec3::ZERO }).unwrap();
        assert_eq!(square.triangle_count(), 2);
    }

    #[test]
    fn generate_rejects_negative_level() {
        let result = generate(&ShapeParams::Icosphere {
            center: Vec3::ZERO,
            radius: 1.0,
            tessellations: -2,
        });
        assert_eq!(
            result,
            Err(GeometryError::TessellationOutOfRange { level: -2, max: MAX_TESSELLATIONS })
        );
    }

    #[test]
    fn well_formed_detects_bad_index() {
        let mut data = square(Vec3::ZERO);
        assert!(data.is_well_formed());
        data.indices[0] = 99;
        assert!(!data.is_well_formed());
    }
}
