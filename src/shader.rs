use std::collections::HashMap;

use glam::{Mat4, Vec4};

use crate::error::{GpuError, ShaderError};
use crate::gpu::{GraphicsContext, ProgramHandle, ShaderStage, Uniform, UniformLocation, UniformValue, TEXTURE_UNITS};

pub const FIRE_VERT: &str = include_str!("shaders/fire.vert.wgsl");
pub const FIRE_FRAG: &str = include_str!("shaders/fire.frag.wgsl");
pub const LAMBERT_VERT: &str = include_str!("shaders/lambert.vert.wgsl");
pub const LAMBERT_FRAG: &str = include_str!("shaders/lambert.frag.wgsl");

/// Built-in shading models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Shading {
    #[default]
    Fire,
    Lambert,
}

impl Shading {
    pub const ALL: [Shading; 2] = [Shading::Fire, Shading::Lambert];

    pub fn label(self) -> &'static str {
        match self {
            Shading::Fire => "fire",
            Shading::Lambert => "lambert",
        }
    }

    /// (vertex, fragment) WGSL sources
    pub fn sources(self) -> (&'static str, &'static str) {
        match self {
            Shading::Fire => (FIRE_VERT, FIRE_FRAG),
            Shading::Lambert => (LAMBERT_VERT, LAMBERT_FRAG),
        }
    }
}

/// A linked vertex + fragment program and the uniforms it reads
///
/// Locations are resolved once at link time. Every setter activates the
/// program before writing; a uniform the program does not read is skipped.
#[derive(Debug)]
pub struct ShaderProgram {
    label: String,
    program: ProgramHandle,
    uniform_locations: HashMap<Uniform, UniformLocation>,
}

impl ShaderProgram {
    pub fn new(
        ctx: &mut dyn GraphicsContext,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, ShaderError> {
        let vertex = ctx.compile_stage(ShaderStage::Vertex, label, vertex_source)?;
        let fragment = match ctx.compile_stage(ShaderStage::Fragment, label, fragment_source) {
            Ok(fragment) => fragment,
            Err(e) => {
                ctx.release_stage(vertex);
                return Err(e);
            }
        };
        let program = ctx.link_program(label, vertex, fragment)?;

        let uniform_locations: HashMap<_, _> = Uniform::ALL
            .into_iter()
            .filter_map(|u| ctx.uniform_location(program, u.name()).map(|location| (u, location)))
            .collect();

        log::info!(
            "Linked shader program '{}' ({} active uniforms)",
            label,
            uniform_locations.len()
        );

        Ok(Self {
            label: label.to_string(),
            program,
            uniform_locations,
        })
    }

    /// Compile and link one of the built-in shading models
    pub fn builtin(ctx: &mut dyn GraphicsContext, shading: Shading) -> Result<Self, ShaderError> {
        let (vertex, fragment) = shading.sources();
        Self::new(ctx, shading.label(), vertex, fragment)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn handle(&self) -> ProgramHandle {
        self.program
    }

    pub fn uniform_locations(&self) -> &HashMap<Uniform, UniformLocation> {
        &self.uniform_locations
    }

    pub fn has_uniform(&self, uniform: Uniform) -> bool {
        self.uniform_locations.contains_key(&uniform)
    }

    pub fn activate(&self, ctx: &mut dyn GraphicsContext) -> Result<(), GpuError> {
        ctx.use_program(self.program)
    }

    fn set(&self, ctx: &mut dyn GraphicsContext, uniform: Uniform, value: UniformValue) -> Result<(), GpuError> {
        let Some(&location) = self.uniform_locations.get(&uniform) else {
            return Ok(());
        };
        ctx.use_program(self.program)?;
        ctx.set_uniform(location, value)
    }

    pub fn set_view_projection(&self, ctx: &mut dyn GraphicsContext, view: &Mat4, proj: &Mat4) -> Result<(), GpuError> {
        self.set(ctx, Uniform::View, UniformValue::Mat4(view.to_cols_array_2d()))?;
        self.set(ctx, Uniform::Projection, UniformValue::Mat4(proj.to_cols_array_2d()))
    }

    pub fn set_geometry_color(&self, ctx: &mut dyn GraphicsContext, color: Vec4) -> Result<(), GpuError> {
        self.set(ctx, Uniform::Color, UniformValue::Vec4(color.to_array()))
    }

    pub fn set_time(&self, ctx: &mut dyn GraphicsContext, time: f32) -> Result<(), GpuError> {
        self.set(ctx, Uniform::Time, UniformValue::Float(time))
    }

    pub fn set_speed(&self, ctx: &mut dyn GraphicsContext, speed: f32) -> Result<(), GpuError> {
        self.set(ctx, Uniform::Speed, UniformValue::Float(speed))
    }

    pub fn set_height(&self, ctx: &mut dyn GraphicsContext, height: f32) -> Result<(), GpuError> {
        self.set(ctx, Uniform::Height, UniformValue::Float(height))
    }

    /// Select which texture unit the program samples
    pub fn set_texture(&self, ctx: &mut dyn GraphicsContext, unit: u32) -> Result<(), GpuError> {
        if unit >= TEXTURE_UNITS {
            log::warn!("{}: texture unit {} out of range, ignored", self.label, unit);
            return Ok(());
        }
        self.set(ctx, Uniform::TextureUnit, UniformValue::UInt(unit))
    }

    pub fn destroy(self, ctx: &mut dyn GraphicsContext) {
        ctx.release_program(self.program);
    }
}
