use crate::camera::Camera;
use crate::error::GpuError;
use crate::gpu::GraphicsContext;
use crate::mesh::Drawable;
use crate::shader::ShaderProgram;

pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.2, 0.2, 0.2, 1.0];

/// Issues the per-frame clear and draw calls
#[derive(Debug, Clone)]
pub struct Renderer {
    clear_color: [f32; 4],
    width: u32,
    height: u32,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            clear_color: DEFAULT_CLEAR_COLOR,
            width,
            height,
        }
    }

    pub fn set_clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.clear_color = [r, g, b, a];
    }

    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Clear color and depth; once per frame, before any `render`
    pub fn clear(&self, ctx: &mut dyn GraphicsContext) {
        ctx.clear(self.clear_color);
    }

    /// Resize the backing surface
    ///
    /// Does not touch any camera: the caller updates the aspect ratio.
    pub fn set_size(&mut self, ctx: &mut dyn GraphicsContext, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        ctx.set_viewport(width, height);
    }

    /// Draw `meshes` in order with `program`
    ///
    /// Stops at the first failing draw; the caller drops the frame instead of
    /// presenting a partial one.
    pub fn render(
        &self,
        ctx: &mut dyn GraphicsContext,
        camera: &Camera,
        program: &ShaderProgram,
        meshes: &[&dyn Drawable],
    ) -> Result<(), GpuError> {
        program.activate(ctx)?;
        program.set_view_projection(ctx, &camera.view_matrix(), &camera.proj_matrix())?;

        for mesh in meshes {
            mesh.draw(ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ShapeParams;
    use crate::gpu::Uniform;
    use crate::mesh::MeshBuffer;
    use crate::shader::Shading;
    use crate::testing::{Call, RecordingContext};
    use glam::Vec3;

    #[test]
    fn render_draws_in_order() {
        let mut ctx = RecordingContext::new();
        let program = ShaderProgram::builtin(&mut ctx, Shading::Lambert).unwrap();
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO).unwrap();
        let square = MeshBuffer::new(ShapeParams::Square { center: Vec3::ZERO })
            .unwrap()
            .create(&mut ctx)
            .unwrap();
        let cube = MeshBuffer::new(ShapeParams::Cube { center: Vec3::ZERO })
            .unwrap()
            .create(&mut ctx)
            .unwrap();
        ctx.clear_log();

        let renderer = Renderer::new(800, 600);
        renderer.render(&mut ctx, &camera, &program, &[&cube, &square]).unwrap();

        assert_eq!(ctx.log()[0], Call::UseProgram(program.handle()));
        assert_eq!(ctx.uniform_writes(), vec![Uniform::View, Uniform::Projection]);
        assert_eq!(ctx.draws(), vec![(program.handle(), 36), (program.handle(), 6)]);
        assert_eq!(
            ctx.uniforms(program.handle()).unwrap().view,
            camera.view_matrix().to_cols_array_2d()
        );

        square.release(&mut ctx);
        cube.release(&mut ctx);
    }

    #[test]
    fn render_fails_on_released_buffers() {
        let mut ctx = RecordingContext::new();
        let program = ShaderProgram::builtin(&mut ctx, Shading::Fire).unwrap();
        let camera = Camera::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO).unwrap();
        let square = MeshBuffer::new(ShapeParams::Square { center: Vec3::ZERO })
            .unwrap()
            .create(&mut ctx)
            .unwrap();
        let index = square.bindings().index;
        ctx.release_buffer(index);

        let result = Renderer::new(1, 1).render(&mut ctx, &camera, &program, &[&square]);
        assert!(matches!(result, Err(GpuError::InvalidHandle(_))));
        square.release(&mut ctx);
    }

    #[test]
    fn clear_uses_configured_color() {
        let mut ctx = RecordingContext::new();
        let mut renderer = Renderer::new(1, 1);
        renderer.set_clear_color(0.1, 0.2, 0.3, 1.0);
        renderer.clear(&mut ctx);
        assert_eq!(ctx.log(), &[Call::Clear([0.1, 0.2, 0.3, 1.0])]);
    }

    #[test]
    fn zero_size_is_ignored() {
        let mut ctx = RecordingContext::new();
        let mut renderer = Renderer::new(800, 600);
        renderer.set_size(&mut ctx, 0, 400);
        assert_eq!(renderer.dimensions(), (800, 600));
        assert!(ctx.log().is_empty());

        renderer.set_size(&mut ctx, 1024, 768);
        assert_eq!(ctx.log(), &[Call::Viewport { width: 1024, height: 768 }]);
    }
}
