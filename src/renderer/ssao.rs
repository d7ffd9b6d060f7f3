//! Screen-space ambient occlusion.
//!
//! Darkens pixels whose screen-space neighborhood is closer to the camera.
//! A fixed kernel of 2D offsets (denser near the center) is rotated per
//! pixel, scaled to `ssao_kernel_radius` pixels, and each neighbor whose
//! linearized depth is in front of the center by more than
//! `ssao_min_distance` and less than `ssao_max_distance` counts as an
//! occluder.

use rand::Rng;
use wgpu::util::DeviceExt;

use super::{GpuBackend, GpuFrame};
use crate::camera::Camera;
use crate::error::ViewerError;
use crate::gpu::pipeline_helpers::{
    create_screen_space_pipeline, depth_texture_2d, draw_fullscreen,
    filtering_sampler, linear_sampler, texture_2d, uniform_buffer,
};
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::options::PostProcessingOptions;
use crate::pipeline::{ChainLink, PassKind, RenderPass, Viewport};

/// Number of kernel samples; must match `KERNEL_SIZE` in `ssao.wgsl`.
pub const KERNEL_SIZE: usize = 32;

/// SSAO parameters uniform - must match WGSL struct
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SsaoParams {
    /// Surface size in physical pixels.
    pub screen_size: [f32; 2],
    /// Near clipping plane distance.
    pub near: f32,
    /// Far clipping plane distance.
    pub far: f32,
    /// Kernel radius in physical pixels.
    pub kernel_radius: f32,
    /// Minimum linear depth difference that counts as occlusion.
    pub min_distance: f32,
    /// Maximum linear depth difference that counts as occlusion.
    pub max_distance: f32,
    /// Padding for GPU alignment.
    pub _pad: f32,
    /// Sample offsets in the unit disk (xy used).
    pub kernel: [[f32; 4]; KERNEL_SIZE],
}

impl SsaoParams {
    /// Parameters for one frame. The kernel radius is given in logical
    /// pixels and scaled by the pixel ratio.
    #[must_use]
    pub fn new(
        camera: &Camera,
        viewport: Viewport,
        options: &PostProcessingOptions,
        kernel: [[f32; 4]; KERNEL_SIZE],
    ) -> Self {
        let (width, height) = viewport.physical_size();
        Self {
            screen_size: [width as f32, height as f32],
            near: camera.znear(),
            far: camera.zfar(),
            kernel_radius: options.ssao_kernel_radius * viewport.pixel_ratio,
            min_distance: options.ssao_min_distance,
            max_distance: options.ssao_max_distance,
            _pad: 0.0,
            kernel,
        }
    }
}

/// Random offsets in the unit disk, scaled so more samples fall close to
/// the center.
#[must_use]
pub fn generate_kernel() -> [[f32; 4]; KERNEL_SIZE] {
    let mut rng = rand::rng();
    let mut kernel = [[0.0f32; 4]; KERNEL_SIZE];

    for (i, sample) in kernel.iter_mut().enumerate() {
        let angle = rng.random::<f32>() * std::f32::consts::TAU;
        let length = rng.random::<f32>().sqrt();

        let mut scale = i as f32 / KERNEL_SIZE as f32;
        scale = 0.1 + scale * scale * 0.9;

        *sample = [
            angle.cos() * length * scale,
            angle.sin() * length * scale,
            0.0,
            0.0,
        ];
    }
    kernel
}

/// Ambient occlusion post effect.
pub struct SsaoPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params_buffer: wgpu::Buffer,
    kernel: [[f32; 4]; KERNEL_SIZE],
    options: PostProcessingOptions,
    viewport: Option<Viewport>,
}

impl SsaoPass {
    /// Stable pass name.
    pub const NAME: &'static str = "ssao";

    /// Build the pipeline and generate the sample kernel.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Shader`] if `ssao.wgsl` fails to compose.
    pub fn new(
        context: &RenderContext,
        composer: &mut ShaderComposer,
        options: &PostProcessingOptions,
    ) -> Result<Self, ViewerError> {
        let device = &context.device;
        let shader = composer.compose(
            device,
            "SSAO Shader",
            include_str!("../../assets/shaders/screen/ssao.wgsl"),
            "screen/ssao.wgsl",
        )?;
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("SSAO Bind Group Layout"),
                entries: &[
                    texture_2d(0),
                    filtering_sampler(1),
                    depth_texture_2d(2),
                    uniform_buffer(3),
                ],
            });
        let pipeline = create_screen_space_pipeline(
            device,
            "SSAO",
            &shader,
            context.format(),
            None,
            &[&bind_group_layout],
        );

        let kernel = generate_kernel();
        let params = SsaoParams {
            screen_size: [1.0, 1.0],
            near: 0.1,
            far: 1000.0,
            kernel_radius: options.ssao_kernel_radius,
            min_distance: options.ssao_min_distance,
            max_distance: options.ssao_max_distance,
            _pad: 0.0,
            kernel,
        };
        let params_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("SSAO Params Buffer"),
                contents: bytemuck::cast_slice(&[params]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        Ok(Self {
            pipeline,
            bind_group_layout,
            sampler: linear_sampler(device, "SSAO Sampler"),
            params_buffer,
            kernel,
            options: options.clone(),
            viewport: None,
        })
    }
}

impl RenderPass<GpuBackend> for SsaoPass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> PassKind {
        PassKind::PostEffect
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    fn render(
        &mut self,
        frame: &mut GpuFrame<'_>,
        link: ChainLink,
    ) -> Result<(), ViewerError> {
        let source = frame.source_view(link, Self::NAME)?;
        let target = frame.target_view(link);

        // near/far follow the camera, which auto-framing moves
        let params = SsaoParams::new(
            frame.camera,
            frame.viewport_or_targets(self.viewport),
            &self.options,
            self.kernel,
        );
        frame.context.queue.write_buffer(
            &self.params_buffer,
            0,
            bytemuck::cast_slice(&[params]),
        );

        let bind_group =
            frame
                .context
                .device
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("SSAO Bind Group"),
                    layout: &self.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(source),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&self.sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(
                                frame.targets.depth_view(),
                            ),
                        },
                        wgpu::BindGroupEntry {
                            binding: 3,
                            resource: self.params_buffer.as_entire_binding(),
                        },
                    ],
                });
        draw_fullscreen(frame.encoder, "SSAO Pass", target, &self.pipeline, &bind_group);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CameraOptions;

    #[test]
    fn params_match_wgsl_layout() {
        // 8 scalars then 32 vec4s
        assert_eq!(size_of::<SsaoParams>(), 32 + KERNEL_SIZE * 16);
    }

    #[test]
    fn kernel_stays_in_unit_disk_and_grows_outward() {
        let kernel = generate_kernel();
        for sample in &kernel {
            let length = sample[0].hypot(sample[1]);
            assert!(length <= 1.0 + 1e-6);
            assert_eq!(sample[2], 0.0);
        }
        // the first sample is scaled to at most 10% of the radius
        assert!(kernel[0][0].hypot(kernel[0][1]) <= 0.1 + 1e-6);
    }

    #[test]
    fn radius_scales_with_pixel_ratio() {
        let camera = Camera::new(&CameraOptions::default(), 1.0);
        let options = PostProcessingOptions::default();
        let params = SsaoParams::new(
            &camera,
            Viewport::new(400, 300, 2.0),
            &options,
            [[0.0; 4]; KERNEL_SIZE],
        );
        assert_eq!(params.screen_size, [800.0, 600.0]);
        assert_eq!(params.kernel_radius, options.ssao_kernel_radius * 2.0);
        assert_eq!(params.near, camera.znear());
        assert_eq!(params.far, camera.zfar());
        assert_eq!(params.min_distance, options.ssao_min_distance);
        assert_eq!(params.max_distance, options.ssao_max_distance);
    }
}
