//! `GraphicsContext` backed by a wgpu device and a window surface.
//!
//! Calls made during a tick are recorded; `present_with` turns the recorded
//! clear and draws into one render pass, lets the caller append an overlay,
//! and presents. Uniform values are latched per program when the frame is
//! encoded.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::error::{GpuError, ShaderError};
use crate::gpu::uniforms::referenced_uniforms;
use crate::gpu::{
    BufferHandle, BufferKind, GraphicsContext, MeshBindings, ProgramHandle, ShaderStage, StageHandle, Uniform,
    UniformBlock, UniformLocation, UniformValue, TEXTURE_UNITS,
};
use crate::texture::TextureImage;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

struct GpuBuffer {
    buffer: wgpu::Buffer,
    kind: BufferKind,
}

struct CompiledStage {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
    reads: Vec<Uniform>,
}

struct LinkedProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    reads: HashSet<Uniform>,
    block: UniformBlock,
    uniform_buffer: wgpu::Buffer,
    bind_group: Option<wgpu::BindGroup>,
}

struct TextureSlot {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct RecordedDraw {
    program: ProgramHandle,
    mesh: MeshBindings,
    count: u32,
}

pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    textures: Vec<TextureSlot>,
    next_id: u64,
    buffers: HashMap<BufferHandle, GpuBuffer>,
    stages: HashMap<StageHandle, CompiledStage>,
    programs: HashMap<ProgramHandle, LinkedProgram>,
    active: Option<ProgramHandle>,
    clear_color: Option<[f32; 4]>,
    draws: Vec<RecordedDraw>,
}

impl WgpuContext {
    pub async fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .map_err(|e| GpuError::Init(format!("Failed to create surface: {e}")))?;
        let adapter = Self::request_adapter(&instance, &surface).await?;
        let (device, queue) = Self::request_device(&adapter).await?;

        let config = Self::create_surface_config(&surface, &adapter, size.width.max(1), size.height.max(1))?;
        surface.configure(&device, &config);

        let depth_view = Self::create_depth_view(&device, config.width, config.height);
        let bind_group_layout = Self::create_bind_group_layout(&device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Viewer Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Gradient Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let placeholder = TextureImage::placeholder();
        let textures = (0..TEXTURE_UNITS)
            .map(|unit| Self::upload_texture(&device, &queue, unit, &placeholder))
            .collect();

        log::info!(
            "wgpu context ready: {} ({:?}), surface {}x{} {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            config.width,
            config.height,
            config.format
        );

        Ok(Self {
            device,
            queue,
            surface,
            config,
            depth_view,
            bind_group_layout,
            pipeline_layout,
            sampler,
            textures,
            next_id: 0,
            buffers: HashMap::new(),
            stages: HashMap::new(),
            programs: HashMap::new(),
            active: None,
            clear_color: None,
            draws: Vec::new(),
        })
    }

    async fn request_adapter(instance: &wgpu::Instance, surface: &wgpu::Surface<'_>) -> Result<wgpu::Adapter, GpuError> {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| GpuError::Init(format!("Failed to find appropriate adapter: {e}")))
    }

    async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), GpuError> {
        adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| GpuError::Init(format!("Failed to acquire device: {e}")))
    }

    fn create_surface_config(
        surface: &wgpu::Surface,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
    ) -> Result<wgpu::SurfaceConfiguration, GpuError> {
        let surface_caps = surface.get_capabilities(adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| GpuError::Init("Surface supports no formats".to_string()))?;

        Ok(wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        })
    }

    fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Viewer Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                texture_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }

    fn upload_texture(device: &wgpu::Device, queue: &wgpu::Queue, unit: u32, image: &TextureImage) -> TextureSlot {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("Texture Unit {unit}")),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            texture.as_image_copy(),
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        TextureSlot {
            _texture: texture,
            view,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Run `f` inside an error scope and return what it produced plus any error
    fn scoped<T>(&self, filter: wgpu::ErrorFilter, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(filter);
        let value = f(&self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error)
    }

    fn ensure_bind_groups(&mut self) {
        for program in self.programs.values_mut() {
            if program.bind_group.is_some() {
                continue;
            }
            program.bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{} Bind Group", program.label)),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: program.uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&self.textures[0].view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&self.textures[1].view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            }));
        }
    }

    fn validate_draws(&self) -> Result<(), GpuError> {
        for draw in &self.draws {
            if !self.programs.contains_key(&draw.program) {
                return Err(GpuError::InvalidHandle(draw.program.to_string()));
            }
            for buffer in [draw.mesh.index, draw.mesh.position, draw.mesh.normal] {
                if !self.buffers.contains_key(&buffer) {
                    return Err(GpuError::InvalidHandle(buffer.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Forget everything recorded for the current frame
    pub fn discard_frame(&mut self) {
        self.clear_color = None;
        self.draws.clear();
    }

    /// Encode the recorded frame, let `overlay` add its own passes, present
    ///
    /// Nothing is submitted if any recorded draw refers to a released resource.
    pub fn present_with<F>(&mut self, overlay: F) -> Result<(), GpuError>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        if let Err(e) = self.validate_draws() {
            self.discard_frame();
            return Err(e);
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                self.discard_frame();
                if matches!(e, wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) {
                    self.surface.configure(&self.device, &self.config);
                }
                return Err(GpuError::Surface(e.to_string()));
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.ensure_bind_groups();
        for program in self.programs.values() {
            self.queue
                .write_buffer(&program.uniform_buffer, 0, bytemuck::bytes_of(&program.block));
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        let [r, g, b, a] = self.clear_color.take().unwrap_or([0.0, 0.0, 0.0, 1.0]);
        let draws = std::mem::take(&mut self.draws);
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for draw in &draws {
                let (Some(program), Some(index), Some(position), Some(normal)) = (
                    self.programs.get(&draw.program),
                    self.buffers.get(&draw.mesh.index),
                    self.buffers.get(&draw.mesh.position),
                    self.buffers.get(&draw.mesh.normal),
                ) else {
                    continue;
                };
                let Some(bind_group) = program.bind_group.as_ref() else {
                    continue;
                };
                render_pass.set_pipeline(&program.pipeline);
                render_pass.set_bind_group(0, bind_group, &[]);
                render_pass.set_vertex_buffer(0, position.buffer.slice(..));
                render_pass.set_vertex_buffer(1, normal.buffer.slice(..));
                render_pass.set_index_buffer(index.buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.count, 0, 0..1);
            }
        }

        overlay(&self.device, &self.queue, &mut encoder, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl GraphicsContext for WgpuContext {
    fn create_buffer(&mut self, label: &str, kind: BufferKind, contents: &[u8]) -> Result<BufferHandle, GpuError> {
        let usage = match kind {
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
        } | wgpu::BufferUsages::COPY_DST;

        let (buffer, error) = self.scoped(wgpu::ErrorFilter::OutOfMemory, |device| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
        });
        if let Some(e) = error {
            return Err(GpuError::Upload {
                label: label.to_string(),
                message: e.to_string(),
            });
        }

        let handle = BufferHandle(self.next_id());
        self.buffers.insert(handle, GpuBuffer { buffer, kind });
        log::debug!("{} '{}' ({:?}, {} bytes)", handle, label, kind, contents.len());
        Ok(handle)
    }

    fn release_buffer(&mut self, buffer: BufferHandle) {
        if let Some(gpu) = self.buffers.remove(&buffer) {
            log::debug!("Released {} ({:?})", buffer, gpu.kind);
            gpu.buffer.destroy();
        }
    }

    fn compile_stage(&mut self, stage: ShaderStage, label: &str, source: &str) -> Result<StageHandle, ShaderError> {
        let (module, error) = self.scoped(wgpu::ErrorFilter::Validation, |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{label} {stage}")),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        });
        if let Some(e) = error {
            return Err(ShaderError::Compile {
                stage,
                message: e.to_string(),
            });
        }

        let handle = StageHandle(self.next_id());
        self.stages.insert(
            handle,
            CompiledStage {
                stage,
                module,
                reads: referenced_uniforms(source),
            },
        );
        Ok(handle)
    }

    fn release_stage(&mut self, stage: StageHandle) {
        self.stages.remove(&stage);
    }

    fn link_program(&mut self, label: &str, vertex: StageHandle, fragment: StageHandle) -> Result<ProgramHandle, ShaderError> {
        let vs = self.stages.remove(&vertex);
        let fs = self.stages.remove(&fragment);
        let (Some(vs), Some(fs)) = (vs, fs) else {
            return Err(ShaderError::Link {
                message: format!("{vertex} or {fragment} was never compiled"),
            });
        };
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err(ShaderError::Link {
                message: format!("expected vertex + fragment, got {} + {}", vs.stage, fs.stage),
            });
        }

        let attributes = [
            wgpu::vertex_attr_array![0 => Float32x4],
            wgpu::vertex_attr_array![1 => Float32x4],
        ];
        let vertex_buffers = [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes[0],
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes[1],
            },
        ];

        let format = self.config.format;
        let (pipeline, error) = self.scoped(wgpu::ErrorFilter::Validation, |device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vs.module,
                    entry_point: Some("vs_main"),
                    buffers: &vertex_buffers,
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fs.module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        });
        if let Some(e) = error {
            return Err(ShaderError::Link { message: e.to_string() });
        }

        let reads: HashSet<Uniform> = vs.reads.iter().chain(fs.reads.iter()).copied().collect();
        let block = UniformBlock::default();
        let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Uniforms")),
            contents: bytemuck::bytes_of(&block),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let handle = ProgramHandle(self.next_id());
        self.programs.insert(
            handle,
            LinkedProgram {
                label: label.to_string(),
                pipeline,
                reads,
                block,
                uniform_buffer,
                bind_group: None,
            },
        );
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
        if let Some(linked) = self.programs.remove(&program) {
            linked.uniform_buffer.destroy();
            if self.active == Some(program) {
                self.active = None;
            }
        }
    }

    fn use_program(&mut self, program: ProgramHandle) -> Result<(), GpuError> {
        if !self.programs.contains_key(&program) {
            return Err(GpuError::InvalidHandle(program.to_string()));
        }
        self.active = Some(program);
        Ok(())
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) -> Result<(), GpuError> {
        let active = self.active.ok_or(GpuError::NoActiveProgram)?;
        let program = self
            .programs
            .get_mut(&active)
            .ok_or_else(|| GpuError::InvalidHandle(active.to_string()))?;
        if value.write_into(&mut program.block, location) {
            Ok(())
        } else {
            Err(GpuError::InvalidHandle(format!(
                "uniform at offset {} (size {})",
                location.offset, location.size
            )))
        }
    }

    fn bind_texture(&mut self, unit: u32, image: &TextureImage) -> Result<(), GpuError> {
        image.check_upload(unit, self.device.limits().max_texture_dimension_2d)?;
        let (slot, error) = self.scoped(wgpu::ErrorFilter::Validation, |device| {
            Self::upload_texture(device, &self.queue, unit, image)
        });
        if let Some(e) = error {
            return Err(GpuError::Upload {
                label: format!("texture unit {unit}"),
                message: e.to_string(),
            });
        }
        self.textures[unit as usize] = slot;
        for program in self.programs.values_mut() {
            program.bind_group = None;
        }
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = Self::create_depth_view(&self.device, width, height);
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.clear_color = Some(color);
        self.draws.clear();
    }

    fn draw_indexed(&mut self, mesh: &MeshBindings, count: u32) -> Result<(), GpuError> {
        let program = self.active.ok_or(GpuError::NoActiveProgram)?;
        for buffer in [mesh.index, mesh.position, mesh.normal] {
            if !self.buffers.contains_key(&buffer) {
                return Err(GpuError::InvalidHandle(buffer.to_string()));
            }
        }
        self.draws.push(RecordedDraw {
            program,
            mesh: *mesh,
            count,
        });
        Ok(())
    }
}
