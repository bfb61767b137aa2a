//! Virtual resources for the render graph

use crate::backend::*;

/// Unique identifier for a render graph resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u32);

/// Texture owned by the graph and allocated by the executor
#[derive(Debug, Clone)]
pub struct VirtualTexture {
    pub id: ResourceId,
    pub name: String,
    pub size: TextureSize,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl VirtualTexture {
    pub fn descriptor(&self, screen_width: u32, screen_height: u32) -> TextureDescriptor {
        let (width, height) = self.size.resolve(screen_width, screen_height);
        TextureDescriptor {
            label: Some(self.name.clone()),
            width,
            height,
            format: self.format,
            usage: self.usage,
        }
    }
}

/// Buffer owned outside the graph. Passes declare accesses to it so the
/// graph can order them.
#[derive(Debug, Clone)]
pub struct ImportedBuffer {
    pub id: ResourceId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub enum VirtualResource {
    Texture(VirtualTexture),
    Buffer(ImportedBuffer),
    /// Bound per frame, like the output image
    External { id: ResourceId, name: String },
}

impl VirtualResource {
    pub fn id(&self) -> ResourceId {
        match self {
            VirtualResource::Texture(t) => t.id,
            VirtualResource::Buffer(b) => b.id,
            VirtualResource::External { id, .. } => *id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VirtualResource::Texture(t) => &t.name,
            VirtualResource::Buffer(b) => &b.name,
            VirtualResource::External { name, .. } => name,
        }
    }
}

/// How a pass uses a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceUsage {
    TextureRead,
    RenderTarget,
    DepthStencilWrite,
    UniformBuffer,
    StorageBufferRead,
    StorageBufferWrite,
}

/// Resource access declaration for a pass
#[derive(Debug, Clone)]
pub struct ResourceAccess {
    pub resource: ResourceId,
    pub usage: ResourceUsage,
}

impl ResourceAccess {
    pub fn is_read(&self) -> bool {
        matches!(
            self.usage,
            ResourceUsage::TextureRead
                | ResourceUsage::UniformBuffer
                | ResourceUsage::StorageBufferRead
        )
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self.usage,
            ResourceUsage::RenderTarget
                | ResourceUsage::DepthStencilWrite
                | ResourceUsage::StorageBufferWrite
        )
    }
}

/// Texture dimensions, absolute or relative to the output size
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureSize {
    Absolute { width: u32, height: u32 },
    /// 1.0 = full output size
    Relative { width_scale: f32, height_scale: f32 },
}

impl Default for TextureSize {
    fn default() -> Self {
        TextureSize::Relative {
            width_scale: 1.0,
            height_scale: 1.0,
        }
    }
}

impl TextureSize {
    /// Resolved size, never smaller than one pixel
    pub fn resolve(&self, screen_width: u32, screen_height: u32) -> (u32, u32) {
        let (width, height) = match self {
            TextureSize::Absolute { width, height } => (*width, *height),
            TextureSize::Relative {
                width_scale,
                height_scale,
            } => (
                ((screen_width as f32) * width_scale) as u32,
                ((screen_height as f32) * height_scale) as u32,
            ),
        };
        (width.max(1), height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_size_resolve() {
        assert_eq!(TextureSize::default().resolve(640, 480), (640, 480));
        let half = TextureSize::Relative {
            width_scale: 0.5,
            height_scale: 0.5,
        };
        assert_eq!(half.resolve(640, 480), (320, 240));
        assert_eq!(half.resolve(1, 1), (1, 1));
        let fixed = TextureSize::Absolute {
            width: 16,
            height: 8,
        };
        assert_eq!(fixed.resolve(640, 480), (16, 8));
    }

    #[test]
    fn test_access_direction() {
        let read = ResourceAccess {
            resource: ResourceId(0),
            usage: ResourceUsage::StorageBufferRead,
        };
        let write = ResourceAccess {
            resource: ResourceId(0),
            usage: ResourceUsage::DepthStencilWrite,
        };
        assert!(read.is_read() && !read.is_write());
        assert!(write.is_write() && !write.is_read());
    }
}
