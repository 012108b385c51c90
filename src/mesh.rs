use crate::error::{GeometryError, GpuError};
use crate::geometry::{self, MeshData, ShapeParams};
use crate::gpu::{BufferHandle, BufferKind, GraphicsContext, MeshBindings};

/// Anything the renderer can submit as one indexed draw
pub trait Drawable {
    fn bindings(&self) -> &MeshBindings;

    /// Number of indices to draw
    fn count(&self) -> u32;

    fn draw(&self, ctx: &mut dyn GraphicsContext) -> Result<(), GpuError> {
        ctx.draw_indexed(self.bindings(), self.count())
    }
}

/// CPU-side mesh, not yet uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffer {
    shape: ShapeParams,
    data: MeshData,
}

impl MeshBuffer {
    /// Populate the vertex arrays with the generator for `shape`
    pub fn new(shape: ShapeParams) -> Result<Self, GeometryError> {
        let data = geometry::generate(&shape)?;
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &ShapeParams {
        &self.shape
    }

    pub fn data(&self) -> &MeshData {
        &self.data
    }

    /// Upload the arrays and hand back the GPU-backed mesh
    ///
    /// Consumes `self`: a mesh is uploaded exactly once, new geometry needs a
    /// new `MeshBuffer`. On failure every buffer created so far is released.
    pub fn create(self, ctx: &mut dyn GraphicsContext) -> Result<RealizedMesh, GpuError> {
        let label = self.shape.kind().label();
        let mut created: Vec<BufferHandle> = Vec::with_capacity(3);

        let uploads: [(&str, BufferKind, &[u8]); 3] = [
            ("indices", BufferKind::Index, bytemuck::cast_slice(&self.data.indices)),
            ("positions", BufferKind::Vertex, bytemuck::cast_slice(&self.data.positions)),
            ("normals", BufferKind::Vertex, bytemuck::cast_slice(&self.data.normals)),
        ];

        for (attribute, kind, contents) in uploads {
            match ctx.create_buffer(&format!("{label} {attribute}"), kind, contents) {
                Ok(handle) => created.push(handle),
                Err(e) => {
                    for handle in created {
                        ctx.release_buffer(handle);
                    }
                    return Err(e);
                }
            }
        }

        let bindings = MeshBindings {
            index: created[0],
            position: created[1],
            normal: created[2],
        };
        let count = self.data.indices.len() as u32;

        log::info!(
            "Created {}: {} vertices, {} triangles",
            label,
            self.data.vertex_count(),
            self.data.triangle_count()
        );

        Ok(RealizedMesh {
            shape: self.shape,
            data: self.data,
            bindings,
            count,
            released: false,
        })
    }
}

/// Immutable mesh whose arrays live on the GPU
///
/// Must be handed back with `release`; dropping it while still realized leaks
/// the buffers and logs a warning.
#[derive(Debug)]
pub struct RealizedMesh {
    shape: ShapeParams,
    data: MeshData,
    bindings: MeshBindings,
    count: u32,
    released: bool,
}

impl RealizedMesh {
    pub fn shape(&self) -> &ShapeParams {
        &self.shape
    }

    pub fn data(&self) -> &MeshData {
        &self.data
    }

    pub fn release(mut self, ctx: &mut dyn GraphicsContext) {
        ctx.release_buffer(self.bindings.index);
        ctx.release_buffer(self.bindings.position);
        ctx.release_buffer(self.bindings.normal);
        self.released = true;
    }
}

impl Drawable for RealizedMesh {
    fn bindings(&self) -> &MeshBindings {
        &self.bindings
    }

    fn count(&self) -> u32 {
        self.count
    }
}

impl Drop for RealizedMesh {
    fn drop(&mut self) {
        if !self.released {
            log::warn!(
                "{} dropped without release; GPU buffers {}, {}, {} leaked",
                self.shape.kind().label(),
                self.bindings.index,
                self.bindings.position,
                self.bindings.normal
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingContext;
    use glam::Vec3;

    fn sphere(level: i32) -> ShapeParams {
        ShapeParams::Icosphere {
            center: Vec3::ZERO,
            radius: 1.0,
            tessellations: level,
        }
    }

    #[test]
    fn create_uploads_three_buffers() {
        let mut ctx = RecordingContext::new();
        let mesh = MeshBuffer::new(sphere(1)).unwrap().create(&mut ctx).unwrap();

        assert_eq!(mesh.count(), 240);
        assert_eq!(ctx.live_buffers(), 3);
        assert_eq!(ctx.buffer_len(mesh.bindings().index), Some(240 * 4));
        assert_eq!(ctx.buffer_len(mesh.bindings().position), Some(42 * 16));
        assert_eq!(ctx.buffer_len(mesh.bindings().normal), Some(42 * 16));

        mesh.release(&mut ctx);
        assert_eq!(ctx.live_buffers(), 0);
    }

    #[test]
    fn failed_upload_releases_partial_buffers() {
        let mut ctx = RecordingContext::new();
        ctx.fail_buffer_uploads_after(1);

        let result = MeshBuffer::new(sphere(0)).unwrap().create(&mut ctx);
        assert!(matches!(result, Err(GpuError::Upload { .. })));
        assert_eq!(ctx.live_buffers(), 0);
    }

    #[test]
    fn draw_submits_count_indices() {
        let mut ctx = RecordingContext::new();
        let program = ctx.fake_program(&["view", "proj"]);
        ctx.use_program(program).unwrap();

        let mesh = MeshBuffer::new(ShapeParams::Square { center: Vec3::ZERO })
            .unwrap()
            .create(&mut ctx)
            .unwrap();
        mesh.draw(&mut ctx).unwrap();

        assert_eq!(ctx.draws(), vec![(program, 6)]);
        mesh.release(&mut ctx);
    }

    #[test]
    fn bad_shape_never_reaches_the_gpu() {
        let err = MeshBuffer::new(sphere(-3)).unwrap_err();
        assert!(matches!(err, GeometryError::TessellationOutOfRange { level: -3, .. }));
    }
}
