//! Recording backend for testing without GPU hardware.
//!
//! Performs no device work. Every call is appended to a command log and
//! buffer writes are mirrored into host memory, so tests can check the order
//! in which dispatches are issued and what the host put into each buffer.

use crate::backend::traits::*;
use crate::backend::types::*;
use std::collections::HashMap;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginFrame,
    EndFrame,
    BeginCommands(String),
    SubmitCommands,
    WriteBuffer { buffer: BufferHandle, offset: u64, len: usize },
    BeginRenderPass { label: Option<String>, color_targets: usize, depth: bool },
    EndRenderPass,
    BeginComputePass(Option<String>),
    EndComputePass,
    SetRenderPipeline(RenderPipelineHandle),
    SetComputePipeline(ComputePipelineHandle),
    SetBindGroup { index: u32, bind_group: BindGroupHandle },
    SetVertexBuffer { slot: u32, buffer: BufferHandle },
    SetIndexBuffer(BufferHandle),
    Draw { vertices: std::ops::Range<u32>, instances: std::ops::Range<u32> },
    DrawIndexed { indices: std::ops::Range<u32>, instances: std::ops::Range<u32> },
    Dispatch { x: u32, y: u32, z: u32 },
    ReadBuffer { buffer: BufferHandle, offset: u64, size: u64 },
}

/// A pipeline as it was handed to the backend
#[derive(Debug, Clone)]
pub struct RecordedPipeline {
    pub label: Option<String>,
    pub shader: String,
    pub compute: bool,
}

/// Backend that records instead of rendering
#[derive(Debug)]
pub struct RecordingBackend {
    width: u32,
    height: u32,
    format: TextureFormat,
    next_id: u64,
    buffers: HashMap<u64, Vec<u8>>,
    textures: HashMap<u64, TextureDescriptor>,
    commands: Vec<RecordedCommand>,
    pipelines: Vec<RecordedPipeline>,
    in_frame: bool,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: TextureFormat::Bgra8Unorm,
            next_id: 1,
            buffers: HashMap::new(),
            textures: HashMap::new(),
            commands: Vec::new(),
            pipelines: Vec::new(),
            in_frame: false,
        }
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Every render and compute pipeline created so far, in creation order.
    pub fn pipelines(&self) -> &[RecordedPipeline] {
        &self.pipelines
    }

    /// Host mirror of a buffer's contents.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer.0).map(Vec::as_slice)
    }

    /// Overwrite a buffer's mirror, standing in for a device-side writer.
    pub fn set_buffer_contents(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        if let Some(mirror) = self.buffers.get_mut(&buffer.0) {
            let start = offset as usize;
            let end = (start + data.len()).min(mirror.len());
            if start < end {
                mirror[start..end].copy_from_slice(&data[..end - start]);
            }
        }
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GraphicsBackend for RecordingBackend {
    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.width = width;
            self.height = height;
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn output_format(&self) -> TextureFormat {
        self.format
    }

    fn begin_frame(&mut self) -> BackendResult<FrameContext> {
        self.in_frame = true;
        self.commands.push(RecordedCommand::BeginFrame);
        let output_view = TextureViewHandle(self.allocate_id());
        Ok(FrameContext {
            output_view,
            width: self.width,
            height: self.height,
        })
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        if !self.in_frame {
            return Err(BackendError::NoActiveFrame);
        }
        self.in_frame = false;
        self.commands.push(RecordedCommand::EndFrame);
        Ok(())
    }

    fn begin_commands(&mut self, label: &str) {
        log::trace!("RecordingBackend: begin commands {}", label);
        self.commands.push(RecordedCommand::BeginCommands(label.to_string()));
    }

    fn submit_commands(&mut self) {
        self.commands.push(RecordedCommand::SubmitCommands);
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> BackendResult<BufferHandle> {
        log::trace!(
            "RecordingBackend: creating buffer {:?} (size: {})",
            desc.label,
            desc.size
        );
        let id = self.allocate_id();
        self.buffers.insert(id, vec![0; desc.size as usize]);
        Ok(BufferHandle(id))
    }

    fn create_buffer_init(
        &mut self,
        desc: &BufferDescriptor,
        data: &[u8],
    ) -> BackendResult<BufferHandle> {
        let handle = self.create_buffer(desc)?;
        self.set_buffer_contents(handle, 0, data);
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) {
        self.set_buffer_contents(buffer, offset, data);
        self.commands.push(RecordedCommand::WriteBuffer {
            buffer,
            offset,
            len: data.len(),
        });
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> BackendResult<TextureHandle> {
        log::trace!(
            "RecordingBackend: creating texture {:?} ({}x{})",
            desc.label,
            desc.width,
            desc.height
        );
        let id = self.allocate_id();
        self.textures.insert(id, desc.clone());
        Ok(TextureHandle(id))
    }

    fn create_texture_view(&mut self, texture: TextureHandle) -> BackendResult<TextureViewHandle> {
        if !self.textures.contains_key(&texture.0) {
            return Err(BackendError::InvalidHandle {
                kind: "texture",
                id: texture.0,
            });
        }
        Ok(TextureViewHandle(self.allocate_id()))
    }

    fn create_bind_group_layout(
        &mut self,
        label: &str,
        _entries: &[BindGroupLayoutEntry],
    ) -> BackendResult<BindGroupLayoutHandle> {
        log::trace!("RecordingBackend: creating bind group layout {}", label);
        Ok(BindGroupLayoutHandle(self.allocate_id()))
    }

    fn create_bind_group(
        &mut self,
        label: &str,
        _layout: BindGroupLayoutHandle,
        entries: &[(u32, BindGroupEntry)],
    ) -> BackendResult<BindGroupHandle> {
        for (_, entry) in entries {
            if let BindGroupEntry::Buffer { buffer, .. } = entry {
                if !self.buffers.contains_key(&buffer.0) {
                    return Err(BackendError::InvalidHandle {
                        kind: "buffer",
                        id: buffer.0,
                    });
                }
            }
        }
        log::trace!("RecordingBackend: creating bind group {}", label);
        Ok(BindGroupHandle(self.allocate_id()))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &RenderPipelineDescriptor,
    ) -> BackendResult<RenderPipelineHandle> {
        self.pipelines.push(RecordedPipeline {
            label: desc.label.clone(),
            shader: desc.shader.clone(),
            compute: false,
        });
        Ok(RenderPipelineHandle(self.allocate_id()))
    }

    fn create_compute_pipeline(
        &mut self,
        desc: &ComputePipelineDescriptor,
    ) -> BackendResult<ComputePipelineHandle> {
        self.pipelines.push(RecordedPipeline {
            label: desc.label.clone(),
            shader: desc.shader.clone(),
            compute: true,
        });
        Ok(ComputePipelineHandle(self.allocate_id()))
    }

    fn begin_render_pass(&mut self, desc: &RenderPassDescriptor) {
        self.commands.push(RecordedCommand::BeginRenderPass {
            label: desc.label.clone(),
            color_targets: desc.color_attachments.len(),
            depth: desc.depth_stencil_attachment.is_some(),
        });
    }

    fn end_render_pass(&mut self) {
        self.commands.push(RecordedCommand::EndRenderPass);
    }

    fn begin_compute_pass(&mut self, label: Option<&str>) {
        self.commands
            .push(RecordedCommand::BeginComputePass(label.map(str::to_string)));
    }

    fn end_compute_pass(&mut self) {
        self.commands.push(RecordedCommand::EndComputePass);
    }

    fn set_render_pipeline(&mut self, pipeline: RenderPipelineHandle) {
        self.commands.push(RecordedCommand::SetRenderPipeline(pipeline));
    }

    fn set_compute_pipeline(&mut self, pipeline: ComputePipelineHandle) {
        self.commands.push(RecordedCommand::SetComputePipeline(pipeline));
    }

    fn set_bind_group(&mut self, index: u32, bind_group: BindGroupHandle) {
        self.commands
            .push(RecordedCommand::SetBindGroup { index, bind_group });
    }

    fn set_vertex_buffer(&mut self, slot: u32, buffer: BufferHandle, _offset: u64) {
        self.commands
            .push(RecordedCommand::SetVertexBuffer { slot, buffer });
    }

    fn set_index_buffer(&mut self, buffer: BufferHandle, _offset: u64, _format: IndexFormat) {
        self.commands.push(RecordedCommand::SetIndexBuffer(buffer));
    }

    fn draw(&mut self, vertices: std::ops::Range<u32>, instances: std::ops::Range<u32>) {
        self.commands
            .push(RecordedCommand::Draw { vertices, instances });
    }

    fn draw_indexed(
        &mut self,
        indices: std::ops::Range<u32>,
        _base_vertex: i32,
        instances: std::ops::Range<u32>,
    ) {
        self.commands
            .push(RecordedCommand::DrawIndexed { indices, instances });
    }

    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32) {
        log::trace!("RecordingBackend: dispatch {}x{}x{}", x, y, z);
        self.commands.push(RecordedCommand::Dispatch { x, y, z });
    }

    fn read_buffer(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        size: u64,
    ) -> BackendResult<PendingReadback> {
        let mirror = self.buffers.get(&buffer.0).ok_or(BackendError::InvalidHandle {
            kind: "buffer",
            id: buffer.0,
        })?;
        let start = offset as usize;
        let end = start + size as usize;
        let bytes = mirror
            .get(start..end)
            .ok_or_else(|| BackendError::ReadbackFailed(format!("range {}..{} out of bounds", start, end)))?
            .to_vec();
        self.commands
            .push(RecordedCommand::ReadBuffer { buffer, offset, size });
        Ok(PendingReadback::ready(bytes))
    }

    fn poll(&mut self, _wait: bool) {}

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_buffer_is_mirrored() {
        let mut backend = RecordingBackend::new(64, 64);
        let buffer = backend
            .create_buffer(&BufferDescriptor::new("test", 16, BufferUsage::STORAGE))
            .unwrap();
        backend.write_buffer(buffer, 4, &[1, 2, 3, 4]);

        let contents = backend.buffer_contents(buffer).unwrap();
        assert_eq!(&contents[..8], &[0, 0, 0, 0, 1, 2, 3, 4]);
        assert_eq!(
            backend.commands(),
            &[RecordedCommand::WriteBuffer {
                buffer,
                offset: 4,
                len: 4
            }]
        );
    }

    #[test]
    fn test_read_buffer_completes_immediately() {
        let mut backend = RecordingBackend::new(64, 64);
        let buffer = backend
            .create_buffer_init(
                &BufferDescriptor::new("test", 8, BufferUsage::STORAGE),
                &[9, 8, 7, 6, 5, 4, 3, 2],
            )
            .unwrap();
        let pending = backend.read_buffer(buffer, 2, 4).unwrap();
        assert!(pending.is_ready());
        assert_eq!(pending.try_take().unwrap().unwrap(), vec![7, 6, 5, 4]);
        assert!(backend.read_buffer(buffer, 4, 8).is_err());
    }

    #[test]
    fn test_end_frame_without_begin_fails() {
        let mut backend = RecordingBackend::new(64, 64);
        assert!(matches!(backend.end_frame(), Err(BackendError::NoActiveFrame)));
        backend.begin_frame().unwrap();
        assert!(backend.end_frame().is_ok());
    }
}
