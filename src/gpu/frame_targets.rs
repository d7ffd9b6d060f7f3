//! Intermediate render targets.
//!
//! Two color textures in the surface format hold intermediate pass results
//! (ping-pong slots 0 and 1); one depth texture is written by the scene pass
//! and sampled by screen-space effects. All three match the physical surface
//! size and are recreated on resize.

/// Depth format written by the scene pass and read by SSAO.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A render-target texture and its default view.
pub struct RenderTarget {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
}

impl RenderTarget {
    /// Create a sampleable render-target texture.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        (width, height): (u32, u32),
        format: wgpu::TextureFormat,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// Ping-pong color targets plus the shared depth buffer.
pub struct FrameTargets {
    color: [RenderTarget; 2],
    depth: RenderTarget,
    format: wgpu::TextureFormat,
    size: (u32, u32),
}

impl FrameTargets {
    /// Allocate targets of `size` physical pixels.
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: (u32, u32),
    ) -> Self {
        Self {
            color: [
                RenderTarget::new(device, "Frame Color 0", size, format),
                RenderTarget::new(device, "Frame Color 1", size, format),
            ],
            depth: RenderTarget::new(device, "Frame Depth", size, DEPTH_FORMAT),
            format,
            size,
        }
    }

    /// Reallocate when the size changed. Returns whether it did.
    pub fn resize(&mut self, device: &wgpu::Device, size: (u32, u32)) -> bool {
        if size == self.size {
            return false;
        }
        *self = Self::new(device, self.format, size);
        true
    }

    /// View of ping-pong slot `slot % 2`.
    #[must_use]
    pub fn color_view(&self, slot: usize) -> &wgpu::TextureView {
        &self.color[slot % 2].view
    }

    /// View of the depth texture.
    #[must_use]
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    /// Color format (the surface format).
    #[must_use]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Size in physical pixels.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}
