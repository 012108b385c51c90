// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::Parser;

use crate::geometry::ShapeKind;
use crate::shader::Shading;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "fire-viewer")]
#[command(about = "Animated procedural fire on a tessellated icosphere", long_about = None)]
pub struct Cli {
    /// Hide the parameter overlay
    #[arg(long = "no-ui", default_value = "false")]
    pub no_ui: bool,

    /// JSON settings file; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Icosphere subdivision level (0-8)
    #[arg(long)]
    pub tessellations: Option<i32>,

    /// Flame animation speed (0-10)
    #[arg(long)]
    pub speed: Option<f32>,

    /// Flame height (0.1-2)
    #[arg(long = "fire-height")]
    pub fire_height: Option<f32>,

    #[arg(long, value_enum)]
    pub shader: Option<Shading>,

    /// Shapes to draw, in order; repeat the flag for several
    #[arg(long = "shape", value_enum)]
    pub shapes: Vec<ShapeKind>,

    #[arg(long)]
    pub width: Option<u32>,

    #[arg(long)]
    pub height: Option<u32>,

    /// Directory holding the gradient textures
    #[arg(long = "texture-dir")]
    pub texture_dir: Option<PathBuf>,
}
