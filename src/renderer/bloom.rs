//! Bloom post effect.
//!
//! Bright-pass extracts pixels above `bloom_threshold` into a half-resolution
//! texture, a separable Gaussian blur spreads them (tap spacing grows with
//! `bloom_radius`), and the composite adds the blurred glow back onto the
//! input scaled by `bloom_strength`.

use wgpu::util::DeviceExt;

use super::{GpuBackend, GpuFrame};
use crate::error::ViewerError;
use crate::gpu::frame_targets::RenderTarget;
use crate::gpu::pipeline_helpers::{
    create_screen_space_pipeline, draw_fullscreen, filtering_sampler,
    linear_sampler, texture_2d, uniform_buffer,
};
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::options::PostProcessingOptions;
use crate::pipeline::{ChainLink, PassKind, RenderPass, Viewport};

/// Format of the half-resolution glow textures.
const BLOOM_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Extra tap spacing, in texels, per unit of `bloom_radius`.
const RADIUS_SPREAD: f32 = 4.0;

/// Bloom parameters uniform - must match WGSL struct
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BloomParams {
    /// Luminance above which pixels glow.
    pub threshold: f32,
    /// Weight of the glow in the composite.
    pub strength: f32,
    /// Blur spread.
    pub radius: f32,
    /// Padding for GPU alignment.
    pub _pad: f32,
}

impl BloomParams {
    /// Parameters from the post-processing options.
    #[must_use]
    pub fn from_options(options: &PostProcessingOptions) -> Self {
        Self {
            threshold: options.bloom_threshold,
            strength: options.bloom_strength,
            radius: options.bloom_radius,
            _pad: 0.0,
        }
    }
}

/// Blur direction uniform - must match WGSL struct
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurParams {
    /// UV step between taps.
    pub direction: [f32; 2],
    /// Padding for GPU alignment.
    pub _pad: [f32; 2],
}

impl BlurParams {
    /// Horizontal step across a texture of `size` texels.
    #[must_use]
    pub fn horizontal(size: (u32, u32), radius: f32) -> Self {
        Self {
            direction: [spread(radius) / size.0.max(1) as f32, 0.0],
            _pad: [0.0; 2],
        }
    }

    /// Vertical step across a texture of `size` texels.
    #[must_use]
    pub fn vertical(size: (u32, u32), radius: f32) -> Self {
        Self {
            direction: [0.0, spread(radius) / size.1.max(1) as f32],
            _pad: [0.0; 2],
        }
    }
}

fn spread(radius: f32) -> f32 {
    1.0 + radius.max(0.0) * RADIUS_SPREAD
}

/// Half of `size`, at least one texel per side.
#[must_use]
pub fn half_size((width, height): (u32, u32)) -> (u32, u32) {
    ((width / 2).max(1), (height / 2).max(1))
}

/// Ping and pong glow textures at half resolution.
struct GlowTargets {
    ping: RenderTarget,
    pong: RenderTarget,
    size: (u32, u32),
}

impl GlowTargets {
    fn new(device: &wgpu::Device, size: (u32, u32)) -> Self {
        Self {
            ping: RenderTarget::new(device, "Bloom Ping", size, BLOOM_FORMAT),
            pong: RenderTarget::new(device, "Bloom Pong", size, BLOOM_FORMAT),
            size,
        }
    }
}

/// Bloom post effect.
pub struct BloomPass {
    threshold_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    single_input_layout: wgpu::BindGroupLayout,
    composite_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params_buffer: wgpu::Buffer,
    blur_h_buffer: wgpu::Buffer,
    blur_v_buffer: wgpu::Buffer,
    params: BloomParams,
    /// Allocated on first render and whenever the frame size changes.
    glow: Option<GlowTargets>,
    viewport: Option<Viewport>,
}

impl BloomPass {
    /// Stable pass name.
    pub const NAME: &'static str = "bloom";

    /// Build the three pipelines and their uniforms.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Shader`] if a bloom shader fails to compose.
    pub fn new(
        context: &RenderContext,
        composer: &mut ShaderComposer,
        options: &PostProcessingOptions,
    ) -> Result<Self, ViewerError> {
        let device = &context.device;
        let single_input_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Bloom Single Input Layout"),
                entries: &[texture_2d(0), filtering_sampler(1), uniform_buffer(2)],
            });
        let composite_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Bloom Composite Layout"),
                entries: &[
                    texture_2d(0),
                    filtering_sampler(1),
                    texture_2d(2),
                    uniform_buffer(3),
                ],
            });

        let threshold_shader = composer.compose(
            device,
            "Bloom Threshold Shader",
            include_str!("../../assets/shaders/screen/bloom_threshold.wgsl"),
            "screen/bloom_threshold.wgsl",
        )?;
        let blur_shader = composer.compose(
            device,
            "Bloom Blur Shader",
            include_str!("../../assets/shaders/screen/bloom_blur.wgsl"),
            "screen/bloom_blur.wgsl",
        )?;
        let composite_shader = composer.compose(
            device,
            "Bloom Composite Shader",
            include_str!("../../assets/shaders/screen/bloom_composite.wgsl"),
            "screen/bloom_composite.wgsl",
        )?;

        let threshold_pipeline = create_screen_space_pipeline(
            device,
            "Bloom Threshold",
            &threshold_shader,
            BLOOM_FORMAT,
            None,
            &[&single_input_layout],
        );
        let blur_pipeline = create_screen_space_pipeline(
            device,
            "Bloom Blur",
            &blur_shader,
            BLOOM_FORMAT,
            None,
            &[&single_input_layout],
        );
        let composite_pipeline = create_screen_space_pipeline(
            device,
            "Bloom Composite",
            &composite_shader,
            context.format(),
            None,
            &[&composite_layout],
        );

        let params = BloomParams::from_options(options);
        let params_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bloom Params Buffer"),
                contents: bytemuck::cast_slice(&[params]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let blur_buffer = |label| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&[BlurParams::horizontal((1, 1), 0.0)]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        };

        Ok(Self {
            threshold_pipeline,
            blur_pipeline,
            composite_pipeline,
            single_input_layout,
            composite_layout,
            sampler: linear_sampler(device, "Bloom Sampler"),
            params_buffer,
            blur_h_buffer: blur_buffer("Bloom Blur H Buffer"),
            blur_v_buffer: blur_buffer("Bloom Blur V Buffer"),
            params,
            glow: None,
            viewport: None,
        })
    }

    /// (Re)allocate the glow textures for a frame of `frame_size`.
    fn ensure_glow(&mut self, context: &RenderContext, frame_size: (u32, u32)) {
        let size = half_size(frame_size);
        if self.glow.as_ref().is_some_and(|glow| glow.size == size) {
            return;
        }
        log::debug!("allocating bloom targets at {}x{}", size.0, size.1);
        self.glow = Some(GlowTargets::new(&context.device, size));
        context.queue.write_buffer(
            &self.blur_h_buffer,
            0,
            bytemuck::cast_slice(&[BlurParams::horizontal(size, self.params.radius)]),
        );
        context.queue.write_buffer(
            &self.blur_v_buffer,
            0,
            bytemuck::cast_slice(&[BlurParams::vertical(size, self.params.radius)]),
        );
    }

    fn single_input_group(
        &self,
        device: &wgpu::Device,
        label: &str,
        input: &wgpu::TextureView,
        uniform: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.single_input_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        })
    }
}

impl RenderPass<GpuBackend> for BloomPass {
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
        self.ensure_glow(frame.context, frame.targets.size());
        let Some(glow) = self.glow.as_ref() else {
            return Err(ViewerError::Render {
                pass: Self::NAME,
                message: "bloom targets missing".to_owned(),
            });
        };
        let device = &frame.context.device;

        let threshold = self.single_input_group(
            device,
            "Bloom Threshold Bind Group",
            source,
            &self.params_buffer,
        );
        draw_fullscreen(
            frame.encoder,
            "Bloom Threshold",
            &glow.ping.view,
            &self.threshold_pipeline,
            &threshold,
        );

        let blur_h = self.single_input_group(
            device,
            "Bloom Blur H Bind Group",
            &glow.ping.view,
            &self.blur_h_buffer,
        );
        draw_fullscreen(
            frame.encoder,
            "Bloom Blur H",
            &glow.pong.view,
            &self.blur_pipeline,
            &blur_h,
        );

        let blur_v = self.single_input_group(
            device,
            "Bloom Blur V Bind Group",
            &glow.pong.view,
            &self.blur_v_buffer,
        );
        draw_fullscreen(
            frame.encoder,
            "Bloom Blur V",
            &glow.ping.view,
            &self.blur_pipeline,
            &blur_v,
        );

        let composite = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Composite Bind Group"),
            layout: &self.composite_layout,
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
                    resource: wgpu::BindingResource::TextureView(&glow.ping.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: self.params_buffer.as_entire_binding(),
                },
            ],
        });
        draw_fullscreen(
            frame.encoder,
            "Bloom Composite",
            target,
            &self.composite_pipeline,
            &composite,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_follow_options() {
        let options = PostProcessingOptions::default();
        let params = BloomParams::from_options(&options);
        assert_eq!(params.threshold, 0.85);
        assert_eq!(params.strength, 0.1);
        assert_eq!(params.radius, 0.4);
        assert_eq!(size_of::<BloomParams>(), 16);
        assert_eq!(size_of::<BlurParams>(), 16);
    }

    #[test]
    fn blur_steps_one_axis_and_widen_with_radius() {
        let h = BlurParams::horizontal((400, 300), 0.0);
        let v = BlurParams::vertical((400, 300), 0.0);
        assert_eq!(h.direction, [1.0 / 400.0, 0.0]);
        assert_eq!(v.direction, [0.0, 1.0 / 300.0]);

        let wide = BlurParams::horizontal((400, 300), 0.5);
        assert!(wide.direction[0] > h.direction[0]);
    }

    #[test]
    fn glow_is_half_resolution() {
        assert_eq!(half_size((1280, 721)), (640, 360));
        assert_eq!(half_size((1, 1)), (1, 1));
    }
}
