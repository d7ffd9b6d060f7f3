//! Camera uniform buffer shared by the scene and screen-space passes.

use wgpu::util::DeviceExt;

use crate::camera::{Camera, CameraUniform};

/// Camera uniform buffer, its layout and bind group (group 0 in scene
/// shaders).
pub struct CameraBinding {
    /// Uniform buffer holding a [`CameraUniform`].
    pub buffer: wgpu::Buffer,
    /// Layout: one uniform buffer visible to vertex and fragment stages.
    pub layout: wgpu::BindGroupLayout,
    /// Bind group over [`buffer`](Self::buffer).
    pub bind_group: wgpu::BindGroup,
    uniform: CameraUniform,
}

impl CameraBinding {
    /// Create the buffer with an identity view-projection.
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform = CameraUniform::new();
        let buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Buffer"),
                contents: bytemuck::cast_slice(&[uniform]),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX
                        | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self {
            buffer,
            layout,
            bind_group,
            uniform,
        }
    }

    /// Upload the camera state for the next frame.
    pub fn update(&mut self, queue: &wgpu::Queue, camera: &Camera) {
        self.uniform.update_view_proj(camera);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
