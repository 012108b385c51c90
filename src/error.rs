use thiserror::Error;

use crate::gpu::ShaderStage;

pub type Result<T> = std::result::Result<T, ViewerError>;

/// Rejected shape parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("tessellation level {level} is outside 0..={max}")]
    TessellationOutOfRange { level: i32, max: i32 },

    #[error("radius must be positive and finite, got {0}")]
    InvalidRadius(f32),
}

/// Compile or link failure while building a shader program
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShaderError {
    #[error("{stage} stage failed to compile: {message}")]
    Compile { stage: ShaderStage, message: String },

    #[error("program failed to link: {message}")]
    Link { message: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GpuError {
    #[error("upload failed for {label}: {message}")]
    Upload { label: String, message: String },

    #[error("{0} does not name a live GPU resource")]
    InvalidHandle(String),

    #[error("no program is active")]
    NoActiveProgram,

    #[error("surface error: {0}")]
    Surface(String),

    #[error("GPU initialisation failed: {0}")]
    Init(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CameraError {
    #[error("near plane must be > 0, got {0}")]
    NearPlane(f32),

    #[error("far plane {far} must be greater than near plane {near}")]
    FarPlane { near: f32, far: f32 },

    #[error("up vector is parallel to the view direction")]
    DegenerateUp,

    #[error("aspect ratio must be positive and finite, got {0}")]
    AspectRatio(f32),
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Camera(#[from] CameraError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_names_the_stage() {
        let err = ShaderError::Compile {
            stage: ShaderStage::Fragment,
            message: "unknown identifier `foo`".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("fragment"));
        assert!(text.contains("unknown identifier"));
    }

    #[test]
    fn viewer_error_wraps_sources() {
        let err: ViewerError = GeometryError::TessellationOutOfRange { level: -1, max: 8 }.into();
        assert!(matches!(err, ViewerError::Geometry(_)));
        assert_eq!(err.to_string(), "tessellation level -1 is outside 0..=8");
    }
}
