//! wgpu backend implementation
//!
//! Renders either to a window surface or, for tests and tools, to an
//! offscreen texture that can be copied back with [`WgpuBackend::read_target`].
//! Pass commands are buffered and replayed onto the open command encoder when
//! the pass ends, so handles only need resolving once per pass.

mod conversion;

use crate::backend::traits::*;
use crate::backend::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// Buffered render pass command
#[derive(Clone)]
enum RenderCommand {
    SetPipeline(RenderPipelineHandle),
    SetBindGroup { index: u32, bind_group: BindGroupHandle },
    SetVertexBuffer { slot: u32, buffer: BufferHandle, offset: u64 },
    SetIndexBuffer { buffer: BufferHandle, offset: u64, format: IndexFormat },
    Draw { vertices: std::ops::Range<u32>, instances: std::ops::Range<u32> },
    DrawIndexed { indices: std::ops::Range<u32>, base_vertex: i32, instances: std::ops::Range<u32> },
}

/// Buffered compute pass command
#[derive(Clone)]
enum ComputeCommand {
    SetPipeline(ComputePipelineHandle),
    SetBindGroup { index: u32, bind_group: BindGroupHandle },
    Dispatch { x: u32, y: u32, z: u32 },
}

struct PendingRenderPass {
    descriptor: RenderPassDescriptor,
    commands: Vec<RenderCommand>,
}

struct PendingComputePass {
    label: Option<String>,
    commands: Vec<ComputeCommand>,
}

/// Where frames end up
enum OutputTarget {
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        current: Option<wgpu::SurfaceTexture>,
    },
    Offscreen {
        texture: wgpu::Texture,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    },
}

/// wgpu backend implementation
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target: OutputTarget,
    /// Handle given out for the output image of the current frame
    output_view_id: u64,

    buffers: HashMap<u64, wgpu::Buffer>,
    textures: HashMap<u64, wgpu::Texture>,
    texture_views: HashMap<u64, wgpu::TextureView>,
    bind_group_layouts: HashMap<u64, wgpu::BindGroupLayout>,
    bind_groups: HashMap<u64, wgpu::BindGroup>,
    render_pipelines: HashMap<u64, wgpu::RenderPipeline>,
    compute_pipelines: HashMap<u64, wgpu::ComputePipeline>,
    next_id: u64,

    encoder: Option<wgpu::CommandEncoder>,
    pending_render_pass: Option<PendingRenderPass>,
    pending_compute_pass: Option<PendingComputePass>,
}

fn clamp_to_limit(width: u32, height: u32, max_size: u32) -> (u32, u32) {
    if width > max_size || height > max_size {
        let scale = (max_size as f32 / width as f32).min(max_size as f32 / height as f32);
        (
            ((width as f32 * scale) as u32).max(1),
            ((height as f32 * scale) as u32).max(1),
        )
    } else {
        (width.max(1), height.max(1))
    }
}

impl WgpuBackend {
    /// Create a backend presenting to `window`.
    pub fn new(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        pollster::block_on(Self::new_async(window, vsync))
    }

    pub async fn new_async(window: Arc<winit::window::Window>, vsync: bool) -> BackendResult<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| BackendError::SurfaceCreationFailed(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| BackendError::InitializationFailed("No suitable adapter found".into()))?;

        let (device, queue) = Self::request_device(&adapter).await?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| BackendError::SurfaceCreationFailed("Surface reports no formats".into()))?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let (width, height) = clamp_to_limit(
            size.width,
            size.height,
            device.limits().max_texture_dimension_2d,
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: if vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self::with_target(
            device,
            queue,
            OutputTarget::Surface {
                surface,
                config,
                current: None,
            },
        ))
    }

    /// Create a backend without a window. Frames render into an offscreen
    /// texture of the given size and format.
    pub fn new_headless(width: u32, height: u32, format: TextureFormat) -> BackendResult<Self> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
                backends: wgpu::Backends::all(),
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::HighPerformance,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok_or_else(|| {
                    BackendError::InitializationFailed("No suitable adapter found".into())
                })?;
            let (device, queue) = Self::request_device(&adapter).await?;
            let format = conversion::texture_format(format);
            let texture = Self::create_offscreen_texture(&device, width, height, format);
            Ok(Self::with_target(
                device,
                queue,
                OutputTarget::Offscreen {
                    texture,
                    format,
                    width,
                    height,
                },
            ))
        })
    }

    async fn request_device(adapter: &wgpu::Adapter) -> BackendResult<(wgpu::Device, wgpu::Queue)> {
        let info = adapter.get_info();
        log::info!("Selected GPU: {} ({:?} backend)", info.name, info.backend);

        adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Clustered Shading Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| BackendError::DeviceCreationFailed(e.to_string()))
    }

    fn create_offscreen_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Output"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    fn with_target(device: wgpu::Device, queue: wgpu::Queue, target: OutputTarget) -> Self {
        Self {
            device,
            queue,
            target,
            output_view_id: 0,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            texture_views: HashMap::new(),
            bind_group_layouts: HashMap::new(),
            bind_groups: HashMap::new(),
            render_pipelines: HashMap::new(),
            compute_pipelines: HashMap::new(),
            next_id: 1,
            encoder: None,
            pending_render_pass: None,
            pending_compute_pass: None,
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Run `create` inside validation and out-of-memory error scopes so
    /// creation failures come back as errors instead of reaching the
    /// device's uncaptured error handler.
    fn scoped<T>(&self, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        match validation.or(out_of_memory) {
            Some(error) => Err(error.to_string()),
            None => Ok(value),
        }
    }

    fn output_view(&self) -> Option<wgpu::TextureView> {
        match &self.target {
            OutputTarget::Surface { current, .. } => current
                .as_ref()
                .map(|frame| frame.texture.create_view(&wgpu::TextureViewDescriptor::default())),
            OutputTarget::Offscreen { texture, .. } => {
                Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
            }
        }
    }

    fn layouts(&self, handles: &[BindGroupLayoutHandle]) -> BackendResult<Vec<&wgpu::BindGroupLayout>> {
        handles
            .iter()
            .map(|h| {
                self.bind_group_layouts
                    .get(&h.0)
                    .ok_or(BackendError::InvalidHandle {
                        kind: "bind group layout",
                        id: h.0,
                    })
            })
            .collect()
    }

    /// Copy the offscreen output back to host memory, tightly packed rows.
    ///
    /// Blocks until the copy completes. Only available on headless backends.
    pub fn read_target(&mut self) -> BackendResult<Vec<u8>> {
        let OutputTarget::Offscreen {
            texture,
            format,
            width,
            height,
        } = &self.target
        else {
            return Err(BackendError::InvalidConfig(
                "read_target requires a headless backend".into(),
            ));
        };

        let bytes_per_pixel = conversion::texture_format_back(*format).bytes_per_pixel();
        let row_bytes = width * bytes_per_pixel;
        let padded_row_bytes = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Output Readback"),
            size: padded_row_bytes as u64 * *height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Output Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(*height),
                },
            },
            wgpu::Extent3d {
                width: *width,
                height: *height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let pending = PendingReadback::new();
        let completion = pending.clone();
        staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            completion.complete(
                result
                    .map(|()| Vec::new())
                    .map_err(|e| BackendError::ReadbackFailed(e.to_string())),
            );
        });
        self.device.poll(wgpu::Maintain::Wait);
        if let Some(Err(error)) = pending.try_take() {
            return Err(error);
        }

        let mapped = staging.slice(..).get_mapped_range();
        let mut pixels = Vec::with_capacity((row_bytes * *height) as usize);
        for row in mapped.chunks(padded_row_bytes as usize) {
            pixels.extend_from_slice(&row[..row_bytes as usize]);
        }
        drop(mapped);
        staging.unmap();
        Ok(pixels)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl GraphicsBackend for WgpuBackend {
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (width, height) = clamp_to_limit(width, height, self.device.limits().max_texture_dimension_2d);
        match &mut self.target {
            OutputTarget::Surface { surface, config, .. } => {
                config.width = width;
                config.height = height;
                surface.configure(&self.device, config);
            }
            OutputTarget::Offscreen {
                texture,
                format,
                width: current_width,
                height: current_height,
            } => {
                *texture = Self::create_offscreen_texture(&self.device, width, height, *format);
                *current_width = width;
                *current_height = height;
            }
        }
        log::debug!("Output resized to {}x{}", width, height);
    }

    fn surface_size(&self) -> (u32, u32) {
        match &self.target {
            OutputTarget::Surface { config, .. } => (config.width, config.height),
            OutputTarget::Offscreen { width, height, .. } => (*width, *height),
        }
    }

    fn output_format(&self) -> TextureFormat {
        match &self.target {
            OutputTarget::Surface { config, .. } => conversion::texture_format_back(config.format),
            OutputTarget::Offscreen { format, .. } => conversion::texture_format_back(*format),
        }
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        if let OutputTarget::Surface {
            surface,
            config,
            current,
        } = &mut self.target
        {
            let frame = surface.get_current_texture().map_err(|e| match e {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    log::warn!("Surface lost, reconfiguring");
                    surface.configure(&self.device, config);
                    BackendError::SurfaceLost
                }
                wgpu::SurfaceError::OutOfMemory => BackendError::OutOfMemory,
                _ => BackendError::AcquireImageFailed(e.to_string()),
            })?;
            *current = Some(frame);
        }

        self.output_view_id = self.allocate_id();
        self.encoder = Some(
            self.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Frame Encoder"),
                }),
        );

        let (width, height) = self.surface_size();
        Ok(FrameContext {
            output_view: TextureViewHandle(self.output_view_id),
            width,
            height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        let encoder = self.encoder.take().ok_or(BackendError::NoActiveFrame)?;
        self.queue.submit(std::iter::once(encoder.finish()));

        if let OutputTarget::Surface { current, .. } = &mut self.target {
            if let Some(frame) = current.take() {
                frame.present();
            }
        }
        Ok(())
    }

    fn begin_commands(&mut self, label: &str) {
        if self.encoder.is_none() {
            self.encoder = Some(
                self.device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) }),
            );
        }
    }

    fn submit_commands(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        let buffer = self
            .scoped(|device| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: desc.label.as_deref(),
                    size: desc.size,
                    usage: conversion::buffer_usage(desc.usage),
                    mapped_at_creation: false,
                })
            })
            .map_err(BackendError::BufferCreationFailed)?;

        let id = self.allocate_id();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        let buffer = self
            .scoped(|device| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: desc.label.as_deref(),
                    contents: data,
                    usage: conversion::buffer_usage(desc.usage),
                })
            })
            .map_err(BackendError::BufferCreationFailed)?;

        let id = self.allocate_id();
        self.buffers.insert(id, buffer);
        Ok(BufferHandle(id))
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        match self.buffers.get(&buffer.0) {
            Some(buf) => self.queue.write_buffer(buf, offset, data),
            None => log::warn!("write_buffer on unknown buffer {}", buffer.0),
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        let texture = self
            .scoped(|device| {
                device.create_texture(&wgpu::TextureDescriptor {
                    label: desc.label.as_deref(),
                    size: wgpu::Extent3d {
                        width: desc.width,
                        height: desc.height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: conversion::texture_format(desc.format),
                    usage: conversion::texture_usage(desc.usage),
                    view_formats: &[],
                })
            })
            .map_err(BackendError::TextureCreationFailed)?;

        let id = self.allocate_id();
        self.textures.insert(id, texture);
        Ok(TextureHandle(id))
    }

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        let view = self
            .textures
            .get(&texture.0)
            .ok_or(BackendError::InvalidHandle {
                kind: "texture",
                id: texture.0,
            })?
            .create_view(&wgpu::TextureViewDescriptor::default());

        let id = self.allocate_id();
        self.texture_views.insert(id, view);
        Ok(TextureViewHandle(id))
    }

    fn create_bind_group_layout(
        &mut self,
        label: &str,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        let wgpu_entries: Vec<wgpu::BindGroupLayoutEntry> = entries
            .iter()
            .map(|e| wgpu::BindGroupLayoutEntry {
                binding: e.binding,
                visibility: conversion::shader_stages(e.visibility),
                ty: conversion::binding_type(&e.ty),
                count: None,
            })
            .collect();

        let layout = self
            .scoped(|device| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(label),
                    entries: &wgpu_entries,
                })
            })
            .map_err(BackendError::BindGroupCreationFailed)?;

        let id = self.allocate_id();
        self.bind_group_layouts.insert(id, layout);
        Ok(BindGroupLayoutHandle(id))
    }

    fn create_bind_group(
        &mut self,
        label: &str,
        layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        let layout_ref = self
            .bind_group_layouts
            .get(&layout.0)
            .ok_or(BackendError::InvalidHandle {
                kind: "bind group layout",
                id: layout.0,
            })?;

        let wgpu_entries = entries
            .iter()
            .map(|(binding, entry)| {
                let resource = match entry {
                    BindGroupEntry::Buffer { buffer, offset, size } => {
                        let buf = self.buffers.get(&buffer.0).ok_or(BackendError::InvalidHandle {
                            kind: "buffer",
                            id: buffer.0,
                        })?;
                        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: buf,
                            offset: *offset,
                            size: size.and_then(std::num::NonZeroU64::new),
                        })
                    }
                    BindGroupEntry::Texture(view) => {
                        let v = self.texture_views.get(&view.0).ok_or(BackendError::InvalidHandle {
                            kind: "texture view",
                            id: view.0,
                        })?;
                        wgpu::BindingResource::TextureView(v)
                    }
                };
                Ok(wgpu::BindGroupEntry {
                    binding: *binding,
                    resource,
                })
            })
            .collect::<BackendResult<Vec<_>>>()?;

        let bind_group = self
            .scoped(|device| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(label),
                    layout: layout_ref,
                    entries: &wgpu_entries,
                })
            })
            .map_err(BackendError::BindGroupCreationFailed)?;

        let id = self.allocate_id();
        self.bind_groups.insert(id, bind_group);
        Ok(BindGroupHandle(id))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        let layouts = self.layouts(&desc.bind_group_layouts)?;

        let vertex_attrs: Vec<Vec<wgpu::VertexAttribute>> = desc
            .vertex_layouts
            .iter()
            .map(|layout| {
                layout
                    .attributes
                    .iter()
                    .map(|a| wgpu::VertexAttribute {
                        format: conversion::vertex_format(a.format),
                        offset: a.offset,
                        shader_location: a.location,
                    })
                    .collect()
            })
            .collect();

        let vertex_buffers: Vec<wgpu::VertexBufferLayout> = desc
            .vertex_layouts
            .iter()
            .zip(vertex_attrs.iter())
            .map(|(layout, attrs)| wgpu::VertexBufferLayout {
                array_stride: layout.array_stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let color_targets: Vec<Option<wgpu::ColorTargetState>> = desc
            .color_targets
            .iter()
            .map(|target| {
                Some(wgpu::ColorTargetState {
                    format: conversion::texture_format(target.format),
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let depth_stencil = desc.depth_stencil.as_ref().map(|ds| wgpu::DepthStencilState {
            format: conversion::texture_format(ds.format),
            depth_write_enabled: ds.depth_write_enabled,
            depth_compare: conversion::compare_function(ds.depth_compare),
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = self
            .scoped(|device| {
                let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: desc.label.as_deref(),
                    source: wgpu::ShaderSource::Wgsl(desc.shader.as_str().into()),
                });
                let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: desc.label.as_deref(),
                    bind_group_layouts: &layouts,
                    push_constant_ranges: &[],
                });
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: desc.label.as_deref(),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: "vs_main",
                        buffers: &vertex_buffers,
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    },
                    fragment: desc.fragment.then(|| wgpu::FragmentState {
                        module: &shader,
                        entry_point: "fs_main",
                        targets: &color_targets,
                        compilation_options: wgpu::PipelineCompilationOptions::default(),
                    }),
                    primitive: conversion::primitive_state(desc),
                    depth_stencil,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                })
            })
            .map_err(BackendError::PipelineCreationFailed)?;

        log::debug!("Created render pipeline {:?}", desc.label);
        let id = self.allocate_id();
        self.render_pipelines.insert(id, pipeline);
        Ok(RenderPipelineHandle(id))
    }

    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDescriptor,
    ) -> BackendResult<ComputePipelineHandle> {
        let layouts = self.layouts(&desc.bind_group_layouts)?;

        let pipeline = self
            .scoped(|device| {
                let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: desc.label.as_deref(),
                    source: wgpu::ShaderSource::Wgsl(desc.shader.as_str().into()),
                });
                let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: desc.label.as_deref(),
                    bind_group_layouts: &layouts,
                    push_constant_ranges: &[],
                });
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: desc.label.as_deref(),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: &desc.entry_point,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                })
            })
            .map_err(BackendError::PipelineCreationFailed)?;

        log::debug!("Created compute pipeline {:?}", desc.label);
        let id = self.allocate_id();
        self.compute_pipelines.insert(id, pipeline);
        Ok(ComputePipelineHandle(id))
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        self.pending_render_pass = Some(PendingRenderPass {
            descriptor: desc.clone(),
            commands: Vec::new(),
        });
    }

    fn end_render_pass(&mut self) {
        let Some(pending) = self.pending_render_pass.take() else {
            return;
        };
        let Some(mut encoder) = self.encoder.take() else {
            log::warn!("Render pass {:?} ended without an open command batch", pending.descriptor.label);
            return;
        };

        let output_view = self.output_view();
        let output_view_id = self.output_view_id;
        let resolve = |view: TextureViewHandle| {
            if view.0 == output_view_id {
                output_view.as_ref()
            } else {
                self.texture_views.get(&view.0)
            }
        };

        {
            let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = pending
                .descriptor
                .color_attachments
                .iter()
                .map(|att| {
                    resolve(att.view).map(|view| wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: conversion::color_load(&att.load_op),
                            store: conversion::store(att.store_op),
                        },
                    })
                })
                .collect();

            let depth_attachment = pending
                .descriptor
                .depth_stencil_attachment
                .as_ref()
                .and_then(|att| {
                    resolve(att.view).map(|view| wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: conversion::depth_load(&att.depth_load_op),
                            store: conversion::store(att.depth_store_op),
                        }),
                        stencil_ops: None,
                    })
                });

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: pending.descriptor.label.as_deref(),
                color_attachments: &color_attachments,
                depth_stencil_attachment: depth_attachment,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for cmd in &pending.commands {
                match cmd {
                    RenderCommand::SetPipeline(handle) => {
                        if let Some(pipeline) = self.render_pipelines.get(&handle.0) {
                            render_pass.set_pipeline(pipeline);
                        }
                    }
                    RenderCommand::SetBindGroup { index, bind_group } => {
                        if let Some(bg) = self.bind_groups.get(&bind_group.0) {
                            render_pass.set_bind_group(*index, bg, &[]);
                        }
                    }
                    RenderCommand::SetVertexBuffer { slot, buffer, offset } => {
                        if let Some(buf) = self.buffers.get(&buffer.0) {
                            render_pass.set_vertex_buffer(*slot, buf.slice(*offset..));
                        }
                    }
                    RenderCommand::SetIndexBuffer { buffer, offset, format } => {
                        if let Some(buf) = self.buffers.get(&buffer.0) {
                            render_pass.set_index_buffer(
                                buf.slice(*offset..),
                                conversion::index_format(*format),
                            );
                        }
                    }
                    RenderCommand::Draw { vertices, instances } => {
                        render_pass.draw(vertices.clone(), instances.clone());
                    }
                    RenderCommand::DrawIndexed {
                        indices,
                        base_vertex,
                        instances,
                    } => {
                        render_pass.draw_indexed(indices.clone(), *base_vertex, instances.clone());
                    }
                }
            }
        }

        self.encoder = Some(encoder);
    }

    fn begin_compute_pass(&mut self, label: Option<&str>) {
        self.pending_compute_pass = Some(PendingComputePass {
            label: label.map(|s| s.to_string()),
            commands: Vec::new(),
        });
    }

    fn end_compute_pass(&mut self) {
        let Some(pending) = self.pending_compute_pass.take() else {
            return;
        };
        let Some(encoder) = self.encoder.as_mut() else {
            log::warn!("Compute pass {:?} ended without an open command batch", pending.label);
            return;
        };

        let compute_pipelines = &self.compute_pipelines;
        let bind_groups = &self.bind_groups;

        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: pending.label.as_deref(),
            timestamp_writes: None,
        });

        for cmd in &pending.commands {
            match cmd {
                ComputeCommand::SetPipeline(handle) => {
                    if let Some(pipeline) = compute_pipelines.get(&handle.0) {
                        compute_pass.set_pipeline(pipeline);
                    }
                }
                ComputeCommand::SetBindGroup { index, bind_group } => {
                    if let Some(bg) = bind_groups.get(&bind_group.0) {
                        compute_pass.set_bind_group(*index, bg, &[]);
                    }
                }
                ComputeCommand::Dispatch { x, y, z } => {
                    compute_pass.dispatch_workgroups(*x, *y, *z);
                }
            }
        }
    }

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        if let Some(ref mut pending) = self.pending_render_pass {
            pending.commands.push(RenderCommand::SetPipeline(pipeline));
        }
    }

    fn set_compute_pipeline(&mut self, pipeline: ComputePipelineHandle) {
        if let Some(ref mut pending) = self.pending_compute_pass {
            pending.commands.push(ComputeCommand::SetPipeline(pipeline));
        }
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle) {
        if let Some(ref mut pending) = self.pending_render_pass {
            pending.commands.push(RenderCommand::SetBindGroup { index, bind_group });
        } else if let Some(ref mut pending) = self.pending_compute_pass {
            pending.commands.push(ComputeCommand::SetBindGroup { index, bind_group });
        }
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64) {
        if let Some(ref mut pending) = self.pending_render_pass {
            pending.commands.push(RenderCommand::SetVertexBuffer { slot, buffer, offset });
        }
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, offset: u64, format: IndexFormat) {
        if let Some(ref mut pending) = self.pending_render_pass {
            pending.commands.push(RenderCommand::SetIndexBuffer { buffer, offset, format });
        }
    }

    fn draw(&mut self, vertices: std::ops::Range<u32>, instances: std::ops::Range<u32>) {
        if let Some(ref mut pending) = self.pending_render_pass {
            pending.commands.push(RenderCommand::Draw { vertices, instances });
        }
    }

    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        base_vertex: i32,
        instances: std::ops::Range<u32>,
    ) {
        if let Some(ref mut pending) = self.pending_render_pass {
            pending.commands.push(RenderCommand::DrawIndexed {
                indices,
                base_vertex,
                instances,
            });
        }
    }

    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32) {
        if let Some(ref mut pending) = self.pending_compute_pass {
            pending.commands.push(ComputeCommand::Dispatch { x, y, z });
        }
    }

    fn read_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    ) -> BackendResult<PendingReadback> {
        let source = self.buffers.get(&buffer.0).ok_or(BackendError::InvalidHandle {
            kind: "buffer",
            id: buffer.0,
        })?;
        if size == 0 {
            return Ok(PendingReadback::ready(Vec::new()));
        }

        let staging = Arc::new(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_buffer_to_buffer(source, offset, &staging, 0, size);
        self.queue.submit(std::iter::once(encoder.finish()));

        let pending = PendingReadback::new();
        let completion = pending.clone();
        let mapped = Arc::clone(&staging);
        staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
            let outcome = result
                .map(|()| {
                    let bytes = mapped.slice(..).get_mapped_range().to_vec();
                    mapped.unmap();
                    bytes
                })
                .map_err(|e| BackendError::ReadbackFailed(e.to_string()));
            completion.complete(outcome);
        });

        Ok(pending)
    }

    fn poll(&mut self, wait: bool) {
        let maintain = if wait {
            wgpu::Maintain::Wait
        } else {
            wgpu::Maintain::Poll
        };
        self.device.poll(maintain);
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if let Some(tex) = self.textures.remove(&texture.0) {
            tex.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to_limit_keeps_aspect() {
        assert_eq!(clamp_to_limit(800, 600, 8192), (800, 600));
        assert_eq!(clamp_to_limit(0, 0, 8192), (1, 1));
        let (w, h) = clamp_to_limit(16384, 8192, 8192);
        assert_eq!((w, h), (8192, 4096));
    }
}
