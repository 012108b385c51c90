pub mod camera;
pub mod cli;
pub mod config;
pub mod control_loop;
pub mod controls;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod gpu;
pub mod mesh;
pub mod renderer;
pub mod shader;
pub mod testing;
pub mod texture;
pub mod ui;
pub mod window;

pub use camera::Camera;
pub use control_loop::{ControlLoop, FrameScheduler, TickReport};
pub use controls::Controls;
pub use error::{Result, ViewerError};
pub use mesh::{Drawable, MeshBuffer, RealizedMesh};
pub use renderer::Renderer;
pub use shader::{ShaderProgram, Shading};
