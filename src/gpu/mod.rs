//! The seam between the viewer core and the graphics API.
//!
//! Everything that issues GPU work receives a `&mut dyn GraphicsContext`
//! explicitly; there is no global context. `WgpuContext` is the windowed
//! implementation, tests use recording mocks.

pub mod uniforms;
pub mod wgpu_context;

use std::fmt;

use crate::error::{GpuError, ShaderError};
use crate::texture::TextureImage;

pub use uniforms::{Uniform, UniformBlock, UniformLocation, UniformValue};
pub use wgpu_context::WgpuContext;

/// Number of texture units a program can sample from
pub const TEXTURE_UNITS: u32 = 2;

/// `max_texture_dimension_2d` of wgpu's default limits
pub const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Index,
    Vertex,
}

macro_rules! handle {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

handle!(BufferHandle);
handle!(StageHandle);
handle!(ProgramHandle);

/// The buffers one indexed draw reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBindings {
    pub index: BufferHandle,
    pub position: BufferHandle,
    pub normal: BufferHandle,
}

/// Host-surface collaborator
///
/// Draw calls are recorded against whichever program was last passed to
/// `use_program`; no binding is guaranteed to survive between frames.
pub trait GraphicsContext {
    /// Create a buffer initialised with `contents`
    fn create_buffer(&mut self, label: &str, kind: BufferKind, contents: &[u8]) -> Result<BufferHandle, GpuError>;

    /// Release a buffer. Unknown handles are ignored.
    fn release_buffer(&mut self, buffer: BufferHandle);

    fn compile_stage(&mut self, stage: ShaderStage, label: &str, source: &str) -> Result<StageHandle, ShaderError>;

    /// Drop a compiled stage that will never be linked. Unknown handles are ignored.
    fn release_stage(&mut self, stage: StageHandle);

    /// Link two stages. Both stage handles are consumed whether or not linking succeeds.
    fn link_program(&mut self, label: &str, vertex: StageHandle, fragment: StageHandle) -> Result<ProgramHandle, ShaderError>;

    /// Location of a uniform the linked program actually reads
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    fn release_program(&mut self, program: ProgramHandle);

    /// Make `program` the target of subsequent uniform writes and draws
    fn use_program(&mut self, program: ProgramHandle) -> Result<(), GpuError>;

    /// Write a uniform of the active program
    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), GpuError>;

    /// Upload a decoded image into a texture unit
    fn bind_texture(&mut self, unit: u32, image: &TextureImage) -> Result<(), GpuError>;

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Clear color and depth for the frame being recorded
    fn clear(&mut self, color: [f32; 4]);

    /// Indexed triangle-list draw of `count` indices with the active program
    fn draw_indexed(&mut self, mesh: &MeshBindings, count: u32) -> Result<(), GpuError>;
}
