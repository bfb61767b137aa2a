//! Core backend abstraction
//!
//! Every GPU-resident component in the crate talks to the device through
//! [`GraphicsBackend`]. Resources are referred to by small copyable handles;
//! the backend owns the real objects. The trait is object safe so passes and
//! stores can take `&mut dyn GraphicsBackend` regardless of which backend
//! the engine was built with.

use crate::backend::types::*;
use crate::render_graph::RenderGraphError;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to create surface: {0}")]
    SurfaceCreationFailed(String),
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("Failed to acquire next image: {0}")]
    AcquireImageFailed(String),
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Failed to create texture: {0}")]
    TextureCreationFailed(String),
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    #[error("Failed to create bind group: {0}")]
    BindGroupCreationFailed(String),
    #[error("Invalid {kind} handle {id}")]
    InvalidHandle { kind: &'static str, id: u64 },
    #[error("Buffer readback failed: {0}")]
    ReadbackFailed(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("No frame in flight")]
    NoActiveFrame,
    #[error("Surface lost")]
    SurfaceLost,
    #[error("Out of memory")]
    OutOfMemory,
    #[error("Device lost")]
    DeviceLost,
    #[error(transparent)]
    Graph(#[from] RenderGraphError),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub(crate) u64);

/// Handle to a texture view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureViewHandle(pub(crate) u64);

/// Handle to a render pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderPipelineHandle(pub(crate) u64);

/// Handle to a compute pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComputePipelineHandle(pub(crate) u64);

/// Handle to a bind group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupHandle(pub(crate) u64);

/// Handle to a bind group layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindGroupLayoutHandle(pub(crate) u64);

/// Bind group entry for creating bind groups
#[derive(Debug, Clone)]
pub enum BindGroupEntry {
    Buffer {
        buffer: BufferHandle,
        offset: u64,
        size: Option<u64>,
    },
    Texture(TextureViewHandle),
}

impl BindGroupEntry {
    /// Bind a whole buffer.
    pub fn buffer(buffer: BufferHandle) -> Self {
        Self::Buffer {
            buffer,
            offset: 0,
            size: None,
        }
    }
}

/// Bind group layout entry
#[derive(Debug, Clone)]
pub struct BindGroupLayoutEntry {
    pub binding: u32,
    pub visibility: ShaderStageFlags,
    pub ty: BindingType,
}

/// Binding type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingType {
    UniformBuffer,
    StorageBuffer { read_only: bool },
    Texture { sample_type: TextureSampleType },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSampleType {
    Float { filterable: bool },
}

/// Render pipeline descriptor
///
/// Both stages come from one WGSL module. The vertex entry point is
/// `vs_main`; the fragment entry point is `fs_main` when `fragment` is set.
#[derive(Debug, Clone)]
pub struct RenderPipelineDescriptor {
    pub label: Option<String>,
    pub shader: String,
    pub fragment: bool,
    pub vertex_layouts: Vec<VertexBufferLayout>,
    pub bind_group_layouts: Vec<BindGroupLayoutHandle>,
    pub primitive_topology: PrimitiveTopology,
    pub front_face: FrontFace,
    pub cull_mode: CullMode,
    pub depth_stencil: Option<DepthStencilState>,
    pub color_targets: Vec<ColorTargetState>,
}

#[derive(Debug, Clone)]
pub struct DepthStencilState {
    pub format: TextureFormat,
    pub depth_write_enabled: bool,
    pub depth_compare: CompareFunction,
}

#[derive(Debug, Clone)]
pub struct ColorTargetState {
    pub format: TextureFormat,
}

impl From<TextureFormat> for ColorTargetState {
    fn from(format: TextureFormat) -> Self {
        Self { format }
    }
}

/// Compute pipeline descriptor
#[derive(Debug, Clone)]
pub struct ComputePipelineDescriptor {
    pub label: Option<String>,
    pub shader: String,
    pub entry_point: String,
    pub bind_group_layouts: Vec<BindGroupLayoutHandle>,
}

/// Color attachment for render pass
#[derive(Debug, Clone)]
pub struct ColorAttachment {
    pub view: TextureViewHandle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOp {
    Clear([f32; 4]),
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    Discard,
}

/// Depth attachment for render pass
#[derive(Debug, Clone)]
pub struct DepthStencilAttachment {
    pub view: TextureViewHandle,
    pub depth_load_op: LoadOp,
    pub depth_store_op: StoreOp,
}

/// Render pass descriptor
#[derive(Debug, Clone)]
pub struct RenderPassDescriptor {
    pub label: Option<String>,
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
}

/// Frame context returned when beginning a frame
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub output_view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
}

/// Completion slot of an asynchronous buffer readback.
///
/// The backend fills the slot once the device has finished the copy and the
/// staging memory is mapped. Nothing on the frame path waits on it.
#[derive(Clone, Default)]
pub struct PendingReadback {
    slot: Arc<Mutex<Option<BackendResult<Vec<u8>>>>>,
}

impl PendingReadback {
    pub fn new() -> Self {
        Self::default()
    }

    /// A readback whose bytes are already available.
    pub fn ready(bytes: Vec<u8>) -> Self {
        let pending = Self::new();
        pending.complete(Ok(bytes));
        pending
    }

    /// Called by the backend when the mapping finishes.
    pub fn complete(&self, result: BackendResult<Vec<u8>>) {
        *self.slot.lock() = Some(result);
    }

    pub fn is_ready(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Take the result if the mapping has finished. Returns `None` while the
    /// copy is still in flight, and after the result has been taken.
    pub fn try_take(&self) -> Option<BackendResult<Vec<u8>>> {
        self.slot.lock().take()
    }
}

impl std::fmt::Debug for PendingReadback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReadback")
            .field("ready", &self.is_ready())
            .finish()
    }
}

/// Main graphics backend trait
pub trait GraphicsBackend {
    /// Resize the output target
    fn resize(&mut self, width: u32, height: u32);

    /// Get the actual output size (may be clamped by device limits)
    fn surface_size(&self) -> (u32, u32);

    /// Get the output format
    fn output_format(&self) -> TextureFormat;

    /// Acquire the output image and open the frame's command batch
    fn begin_frame(&mut self) -> BackendResult<FrameContext>;

    /// Submit the frame's command batch and present
    fn end_frame(&mut self) -> BackendResult<()>;

    /// Open a command batch outside of a frame
    fn begin_commands(&mut self, label: &str);

    /// Submit the batch opened with [`GraphicsBackend::begin_commands`]
    fn submit_commands(&mut self);

    // Resource creation

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle>;

    fn create_buffer_init(&mut self, desc: &BufferDescriptor, data: &[u8])
        -> BackendResult<BufferHandle>;

    /// Queue a buffer write. It is visible to every dispatch submitted after it.
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]);

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle>;

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle>;

    // Pipeline creation

    fn create_bind_group_layout(
        &mut self,
        label: &str,
        entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle>;

    fn create_bind_group(
        &mut self,
        label: &str,
        layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle>;

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle>;

    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDescriptor,
    ) -> BackendResult<ComputePipelineHandle>;

    // Command recording

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor);

    fn end_render_pass(&mut self);

    fn begin_compute_pass(&mut self, label: Option<&str>);

    fn end_compute_pass(&mut self);

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle);

    fn set_compute_pipeline(&mut self, pipeline: ComputePipelineHandle);

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle);

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, offset: u64);

    fn set_index_buffer(&mut self, buffer: BufferHandle, offset: u64, format: IndexFormat);

    fn draw(&mut self, vertices: std::ops::Range<u32>, instances: std::ops::Range<u32>);

    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        base_vertex: i32,
        instances: std::ops::Range<u32>,
    );

    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32);

    // Readback

    /// Copy `size` bytes of `buffer` starting at `offset` into host memory.
    ///
    /// The copy is submitted immediately in its own batch, so it observes
    /// every batch submitted before the call. The returned handle completes
    /// asynchronously; drive it with [`GraphicsBackend::poll`].
    fn read_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    ) -> BackendResult<PendingReadback>;

    /// Process device callbacks. With `wait` set, blocks until the queue is idle.
    fn poll(&mut self, wait: bool);

    // Resource cleanup

    fn destroy_texture(&mut self, texture: TextureHandle);
}

/// Index format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}
