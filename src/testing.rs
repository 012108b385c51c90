//! A headless `GraphicsContext` that records every call.
//!
//! Used by the unit and integration tests; also handy for driving the control
//! loop without a window.

use std::collections::{HashMap, HashSet};

use crate::error::{GpuError, ShaderError};
use crate::gpu::uniforms::referenced_uniforms;
use crate::gpu::{
    BufferHandle, BufferKind, GraphicsContext, DEFAULT_MAX_TEXTURE_DIMENSION, MeshBindings, ProgramHandle, ShaderStage, StageHandle, Uniform,
    UniformBlock, UniformLocation, UniformValue,
};
use crate::texture::TextureImage;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateBuffer { handle: BufferHandle, kind: BufferKind, len: usize },
    ReleaseBuffer(BufferHandle),
    CompileStage(ShaderStage),
    LinkProgram(ProgramHandle),
    ReleaseProgram(ProgramHandle),
    UseProgram(ProgramHandle),
    SetUniform { program: ProgramHandle, uniform: Uniform, value: UniformValue },
    BindTexture { unit: u32, width: u32, height: u32 },
    Viewport { width: u32, height: u32 },
    Clear([f32; 4]),
    Draw { program: ProgramHandle, count: u32 },
}

struct FakeProgram {
    reads: HashSet<Uniform>,
    uniforms: UniformBlock,
}

#[derive(Default)]
pub struct RecordingContext {
    next_id: u64,
    buffers: HashMap<BufferHandle, (BufferKind, usize)>,
    stages: HashMap<StageHandle, Vec<Uniform>>,
    programs: HashMap<ProgramHandle, FakeProgram>,
    active: Option<ProgramHandle>,
    log: Vec<Call>,
    upload_budget: Option<usize>,
    compile_failure: Option<(ShaderStage, String)>,
    link_failure: Option<String>,
    max_texture_dimension: Option<u32>,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Let `n` more buffer uploads succeed, then fail every one after
    pub fn fail_buffer_uploads_after(&mut self, n: usize) {
        self.upload_budget = Some(n);
    }

    pub fn allow_buffer_uploads(&mut self) {
        self.upload_budget = None;
    }

    pub fn fail_compile(&mut self, stage: ShaderStage, message: &str) {
        self.compile_failure = Some((stage, message.to_string()));
    }

    /// Pretend the device only supports textures up to `max` texels per side
    pub fn limit_texture_dimension(&mut self, max: u32) {
        self.max_texture_dimension = Some(max);
    }

    pub fn fail_link(&mut self, message: &str) {
        self.link_failure = Some(message.to_string());
    }

    /// Register a linked program reading exactly `names`
    pub fn fake_program(&mut self, names: &[&str]) -> ProgramHandle {
        let handle = ProgramHandle(self.next_id());
        let reads = names.iter().filter_map(|n| Uniform::from_name(n)).collect();
        self.programs.insert(
            handle,
            FakeProgram {
                reads,
                uniforms: UniformBlock::default(),
            },
        );
        handle
    }

    pub fn log(&self) -> &[Call] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_stages(&self) -> usize {
        self.stages.len()
    }

    pub fn is_live(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains_key(&buffer)
    }

    pub fn buffer_len(&self, buffer: BufferHandle) -> Option<usize> {
        self.buffers.get(&buffer).map(|(_, len)| *len)
    }

    pub fn active_program(&self) -> Option<ProgramHandle> {
        self.active
    }

    pub fn uniforms(&self, program: ProgramHandle) -> Option<UniformBlock> {
        self.programs.get(&program).map(|p| p.uniforms)
    }

    pub fn buffers_created(&self) -> usize {
        self.log.iter().filter(|c| matches!(c, Call::CreateBuffer { .. })).count()
    }

    pub fn released_buffers(&self) -> Vec<BufferHandle> {
        self.log
            .iter()
            .filter_map(|c| match c {
                Call::ReleaseBuffer(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    /// Uniforms written since the log was last cleared, in call order
    pub fn uniform_writes(&self) -> Vec<Uniform> {
        self.log
            .iter()
            .filter_map(|c| match c {
                Call::SetUniform { uniform, .. } => Some(*uniform),
                _ => None,
            })
            .collect()
    }

    pub fn draws(&self) -> Vec<(ProgramHandle, u32)> {
        self.log
            .iter()
            .filter_map(|c| match c {
                Call::Draw { program, count } => Some((*program, *count)),
                _ => None,
            })
            .collect()
    }

    pub fn clears(&self) -> usize {
        self.log.iter().filter(|c| matches!(c, Call::Clear(_))).count()
    }
}

impl GraphicsContext for RecordingContext {
    fn create_buffer(&mut self, label: &str, kind: BufferKind, contents: &[u8]) -> Result<BufferHandle, GpuError> {
        if let Some(budget) = self.upload_budget.as_mut() {
            if *budget == 0 {
                return Err(GpuError::Upload {
                    label: label.to_string(),
                    message: "out of memory".to_string(),
                });
            }
            *budget -= 1;
        }

        let handle = BufferHandle(self.next_id());
        self.buffers.insert(handle, (kind, contents.len()));
        self.log.push(Call::CreateBuffer {
            handle,
            kind,
            len: contents.len(),
        });
        Ok(handle)
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.log.push(Call::ReleaseBuffer(buffer));
        }
    }

    fn compile_stage(&mut self, stage: ShaderStage, _label: &str, source: &str) -> Result<StageHandle, ShaderError> {
        if let Some((failing, message)) = &self.compile_failure {
            if *failing == stage {
                return Err(ShaderError::Compile {
                    stage,
                    message: message.clone(),
                });
            }
        }

        let handle = StageHandle(self.next_id());
        self.stages.insert(handle, referenced_uniforms(source));
        self.log.push(Call::CompileStage(stage));
        Ok(handle)
    }

    fn release_stage(&mut self, stage: StageHandle) {
        self.stages.remove(&stage);
    }

    fn link_program(&mut self, _label: &str, vertex: StageHandle, fragment: StageHandle) -> Result<ProgramHandle, ShaderError> {
        let stages = [vertex, fragment].map(|stage| (stage, self.stages.remove(&stage)));
        if let Some(message) = &self.link_failure {
            return Err(ShaderError::Link {
                message: message.clone(),
            });
        }

        let mut reads = HashSet::new();
        for (stage, uniforms) in stages {
            let uniforms = uniforms.ok_or_else(|| ShaderError::Link {
                message: format!("{stage} was never compiled"),
            })?;
            reads.extend(uniforms);
        }

        let handle = ProgramHandle(self.next_id());
        self.programs.insert(
            handle,
            FakeProgram {
                reads,
                uniforms: UniformBlock::default(),
            },
        );
        self.log.push(Call::LinkProgram(handle));
        Ok(handle)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let uniform = Uniform::from_name(name)?;
        self.programs
            .get(&program)
            .filter(|p| p.reads.contains(&uniform))
            .map(|_| uniform.location())
    }

    fn release_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program).is_some() {
            if self.active == Some(program) {
                self.active = None;
            }
            self.log.push(Call::ReleaseProgram(program));
        }
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), GpuError> {
        if !self.programs.contains_key(&program) {
            return Err(GpuError::InvalidHandle(program.to_string()));
        }
        self.active = Some(program);
        self.log.push(Call::UseProgram(program));
        Ok(())
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), GpuError> {
        let program = self.active.ok_or(GpuError::NoActiveProgram)?;
        let uniform = Uniform::ALL
            .into_iter()
            .find(|u| u.location() == location)
            .ok_or_else(|| GpuError::InvalidHandle(format!("uniform at offset {}", location.offset)))?;

        if let Some(fake) = self.programs.get_mut(&program) {
            value.write_into(&mut fake.uniforms, location);
        }
        self.log.push(Call::SetUniform { program, uniform, value });
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, image: &TextureImage) -> Result<(), GpuError> {
        image.check_upload(unit, self.max_texture_dimension.unwrap_or(DEFAULT_MAX_TEXTURE_DIMENSION))?;
        self.log.push(Call::BindTexture {
            unit,
            width: image.width,
            height: image.height,
        });
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.log.push(Call::Viewport { width, height });
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.log.push(Call::Clear(color));
    }

    fn draw_indexed(&mut self, mesh: &MeshBindings, count: u32) -> Result<(), GpuError> {
        let program = self.active.ok_or(GpuError::NoActiveProgram)?;
        for buffer in [mesh.index, mesh.position, mesh.normal] {
            if !self.buffers.contains_key(&buffer) {
                return Err(GpuError::InvalidHandle(buffer.to_string()));
            }
        }
        self.log.push(Call::Draw { program, count });
        Ok(())
    }
}
