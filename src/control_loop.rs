//! Per-frame driver.
//!
//! One `tick` per display refresh: advance the clock, refresh the camera,
//! clear, act on whatever parameters changed since the last tick, push the
//! always-current uniforms, draw, then ask the host for the next tick.

use glam::Vec3;

use crate::camera::Camera;
use crate::config::{SceneConfig, ViewerConfig};
use crate::controls::{ControlState, Controls};
use crate::error::{CameraError, Result};
use crate::geometry::{ShapeKind, ShapeParams};
use crate::gpu::GraphicsContext;
use crate::mesh::{Drawable, MeshBuffer, RealizedMesh};
use crate::renderer::Renderer;
use crate::shader::{ShaderProgram, Shading};
use crate::texture::TextureLoader;

/// Host primitive that schedules the next tick
pub trait FrameScheduler {
    fn request_next_tick(&self);
}

/// What a single tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub frame: u64,
    /// Meshes rebuilt and re-uploaded this tick
    pub regenerated_meshes: usize,
    /// Tracked shading parameters pushed because they changed
    pub parameter_updates: usize,
    pub textures_bound: usize,
}

fn shape_params(kind: ShapeKind, scene: &SceneConfig, tessellations: i32) -> ShapeParams {
    let center = scene.center();
    match kind {
        ShapeKind::Icosphere => ShapeParams::Icosphere {
            center,
            radius: scene.radius,
            tessellations,
        },
        ShapeKind::Cube => ShapeParams::Cube { center },
        ShapeKind::Square => ShapeParams::Square { center },
    }
}

fn realize(ctx: &mut dyn GraphicsContext, params: ShapeParams) -> Result<RealizedMesh> {
    Ok(MeshBuffer::new(params)?.create(ctx)?)
}

pub struct ControlLoop {
    renderer: Renderer,
    camera: Camera,
    fire: ShaderProgram,
    lambert: ShaderProgram,
    scene: SceneConfig,
    meshes: Vec<RealizedMesh>,
    state: ControlState,
    textures: Option<TextureLoader>,
    time: f32,
    frame: u64,
}

impl ControlLoop {
    /// Compile both programs and realize the initial scene
    ///
    /// Any failure here is fatal for the session.
    pub fn new(ctx: &mut dyn GraphicsContext, config: &ViewerConfig) -> Result<Self> {
        let camera = Self::build_camera(config)?;

        let mut renderer = Renderer::new(config.window.width, config.window.height);
        let [r, g, b, a] = config.scene.clear_color;
        renderer.set_clear_color(r, g, b, a);

        let fire = ShaderProgram::builtin(ctx, Shading::Fire)?;
        let lambert = match ShaderProgram::builtin(ctx, Shading::Lambert) {
            Ok(program) => program,
            Err(e) => {
                fire.destroy(ctx);
                return Err(e.into());
            }
        };

        let state = ControlState::new(&config.controls);
        let tessellations = state.tessellations.current();

        let mut meshes = Vec::with_capacity(config.scene.shapes.len());
        for &kind in &config.scene.shapes {
            match realize(ctx, shape_params(kind, &config.scene, tessellations)) {
                Ok(mesh) => meshes.push(mesh),
                Err(e) => {
                    for mesh in meshes {
                        mesh.release(ctx);
                    }
                    fire.destroy(ctx);
                    lambert.destroy(ctx);
                    return Err(e);
                }
            }
        }

        let control_loop = Self {
            renderer,
            camera,
            fire,
            lambert,
            scene: config.scene.clone(),
            meshes,
            state,
            textures: None,
            time: 0.0,
            frame: 0,
        };
        control_loop.push_initial_uniforms(ctx, &config.controls)?;
        Ok(control_loop)
    }

    fn build_camera(config: &ViewerConfig) -> std::result::Result<Camera, CameraError> {
        let settings = &config.camera;
        let mut camera = Camera::new(Vec3::from_array(settings.position), Vec3::from_array(settings.target))?;
        camera.set_fov_y(settings.fov_y_degrees.to_radians());
        camera.set_clip_planes(settings.near, settings.far)?;
        let (width, height) = (config.window.width, config.window.height);
        if width > 0 && height > 0 {
            camera.set_aspect_ratio(width as f32 / height as f32)?;
        }
        camera.update();
        Ok(camera)
    }

    fn push_initial_uniforms(&self, ctx: &mut dyn GraphicsContext, controls: &Controls) -> Result<()> {
        for program in self.programs() {
            program.set_speed(ctx, self.state.speed.current())?;
            program.set_height(ctx, self.state.fire_height.current())?;
            program.set_geometry_color(ctx, controls.color_vec4())?;
            program.set_texture(ctx, 0)?;
        }
        Ok(())
    }

    /// Hand over a loader whose textures are bound as they finish decoding
    pub fn attach_textures(&mut self, loader: TextureLoader) {
        self.textures = Some(loader);
    }

    fn programs(&self) -> [&ShaderProgram; 2] {
        [&self.fire, &self.lambert]
    }

    pub fn program(&self, shading: Shading) -> &ShaderProgram {
        match shading {
            Shading::Fire => &self.fire,
            Shading::Lambert => &self.lambert,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn meshes(&self) -> &[RealizedMesh] {
        &self.meshes
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Run one frame and schedule the next
    ///
    /// The next tick is requested even when this one fails; the host decides
    /// whether to keep going.
    pub fn tick(
        &mut self,
        ctx: &mut dyn GraphicsContext,
        controls: &Controls,
        scheduler: &dyn FrameScheduler,
    ) -> Result<TickReport> {
        let result = self.run_tick(ctx, controls);
        scheduler.request_next_tick();
        result
    }

    fn run_tick(&mut self, ctx: &mut dyn GraphicsContext, controls: &Controls) -> Result<TickReport> {
        self.time += 1.0;
        self.frame += 1;
        let mut report = TickReport {
            frame: self.frame,
            ..TickReport::default()
        };

        self.camera.update();

        if let Some(loader) = self.textures.as_mut() {
            report.textures_bound = loader.poll(ctx);
            if loader.pending() == 0 {
                self.textures = None;
            }
        }

        self.renderer.clear(ctx);

        self.state.observe(controls);
        report.regenerated_meshes = self.apply_geometry_changes(ctx)?;
        report.parameter_updates = self.apply_shading_changes(ctx)?;

        let color = controls.color_vec4();
        for program in self.programs() {
            program.set_geometry_color(ctx, color)?;
            program.set_time(ctx, self.time)?;
        }

        let drawables: Vec<&dyn Drawable> = self.meshes.iter().map(|m| m as &dyn Drawable).collect();
        self.renderer
            .render(ctx, &self.camera, self.program(controls.shading), &drawables)?;

        Ok(report)
    }

    fn apply_geometry_changes(&mut self, ctx: &mut dyn GraphicsContext) -> Result<usize> {
        if let Some(generation) = self.state.reload.pending() {
            log::info!("Reloading scene (generation {})", generation);
            let rebuilt = self.rebuild(ctx, |_| true)?;
            self.state.reload.commit();
            self.state.tessellations.commit();
            return Ok(rebuilt);
        }

        if let Some(level) = self.state.tessellations.pending() {
            log::debug!(
                "tessellations {} -> {}",
                self.state.tessellations.previous(),
                level
            );
            let rebuilt = self.rebuild(ctx, |kind| kind == ShapeKind::Icosphere)?;
            self.state.tessellations.commit();
            return Ok(rebuilt);
        }

        Ok(0)
    }

    /// Replace every mesh whose kind matches `filter`
    ///
    /// The new mesh is realized before the old one is released, so a failed
    /// upload leaves the previous mesh drawable.
    fn rebuild(&mut self, ctx: &mut dyn GraphicsContext, filter: impl Fn(ShapeKind) -> bool) -> Result<usize> {
        let level = self.state.tessellations.current();
        let mut rebuilt = 0;
        for slot in self.meshes.iter_mut() {
            let kind = slot.shape().kind();
            if !filter(kind) {
                continue;
            }
            let fresh = realize(ctx, shape_params(kind, &self.scene, level))?;
            let stale = std::mem::replace(slot, fresh);
            stale.release(ctx);
            rebuilt += 1;
        }
        Ok(rebuilt)
    }

    fn apply_shading_changes(&mut self, ctx: &mut dyn GraphicsContext) -> Result<usize> {
        let mut updates = 0;

        if let Some(speed) = self.state.speed.pending() {
            log::debug!("speed {} -> {}", self.state.speed.previous(), speed);
            for program in self.programs() {
                program.set_speed(ctx, speed)?;
            }
            self.state.speed.commit();
            updates += 1;
        }

        if let Some(height) = self.state.fire_height.pending() {
            log::debug!("fireHeight {} -> {}", self.state.fire_height.previous(), height);
            for program in self.programs() {
                program.set_height(ctx, height)?;
            }
            self.state.fire_height.commit();
            updates += 1;
        }

        Ok(updates)
    }

    /// Resize the surface and keep the projection in step
    pub fn resize(&mut self, ctx: &mut dyn GraphicsContext, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.renderer.set_size(ctx, width, height);
        self.camera.set_aspect_ratio(width as f32 / height as f32)?;
        self.camera.update_projection_matrix();
        log::info!("Resized to {}x{}", width, height);
        Ok(())
    }

    /// Release every GPU resource the loop owns
    pub fn shutdown(self, ctx: &mut dyn GraphicsContext) {
        for mesh in self.meshes {
            mesh.release(ctx);
        }
        self.fire.destroy(ctx);
        self.lambert.destroy(ctx);
    }
}
