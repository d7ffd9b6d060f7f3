//! FXAA post-process pass: screen-space anti-aliasing.
//!
//! Reads the previous pass's color image and smooths jagged silhouette
//! edges along the local luminance gradient. Only the inverse physical
//! resolution depends on the surface size.

use wgpu::util::DeviceExt;

use super::{GpuBackend, GpuFrame};
use crate::error::ViewerError;
use crate::gpu::pipeline_helpers::{
    create_screen_space_pipeline, draw_fullscreen, filtering_sampler,
    linear_sampler, texture_2d, uniform_buffer,
};
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::pipeline::{ChainLink, PassKind, RenderPass, Viewport};

/// FXAA uniform - must match WGSL struct
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FxaaParams {
    /// `1 / (size * pixel_ratio)` per axis.
    pub inverse_resolution: [f32; 2],
    /// Padding for GPU alignment.
    pub _pad: [f32; 2],
}

impl FxaaParams {
    /// Parameters for a viewport.
    #[must_use]
    pub fn for_viewport(viewport: Viewport) -> Self {
        Self {
            inverse_resolution: viewport.inverse_resolution(),
            _pad: [0.0; 2],
        }
    }
}

/// Anti-aliasing post effect.
pub struct FxaaPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params_buffer: wgpu::Buffer,
    /// Last uploaded parameters; the buffer is rewritten only on change.
    uploaded: Option<FxaaParams>,
    viewport: Option<Viewport>,
}

impl FxaaPass {
    /// Stable pass name.
    pub const NAME: &'static str = "fxaa";

    /// Build the pipeline.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Shader`] if `fxaa.wgsl` fails to compose.
    pub fn new(
        context: &RenderContext,
        composer: &mut ShaderComposer,
    ) -> Result<Self, ViewerError> {
        let device = &context.device;
        let shader = composer.compose(
            device,
            "FXAA Shader",
            include_str!("../../assets/shaders/screen/fxaa.wgsl"),
            "screen/fxaa.wgsl",
        )?;
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("FXAA Bind Group Layout"),
                entries: &[texture_2d(0), filtering_sampler(1), uniform_buffer(2)],
            });
        let pipeline = create_screen_space_pipeline(
            device,
            "FXAA",
            &shader,
            context.format(),
            None,
            &[&bind_group_layout],
        );
        let params_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("FXAA Params Buffer"),
                contents: bytemuck::cast_slice(&[FxaaParams::for_viewport(
                    Viewport::new(1, 1, 1.0),
                )]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });

        Ok(Self {
            pipeline,
            bind_group_layout,
            sampler: linear_sampler(device, "FXAA Sampler"),
            params_buffer,
            uploaded: None,
            viewport: None,
        })
    }
}

impl RenderPass<GpuBackend> for FxaaPass {
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

        let params = FxaaParams::for_viewport(frame.viewport_or_targets(self.viewport));
        if self.uploaded != Some(params) {
            frame.context.queue.write_buffer(
                &self.params_buffer,
                0,
                bytemuck::cast_slice(&[params]),
            );
            self.uploaded = Some(params);
        }

        let bind_group =
            frame
                .context
                .device
                .create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("FXAA Bind Group"),
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
                            resource: self.params_buffer.as_entire_binding(),
                        },
                    ],
                });
        draw_fullscreen(frame.encoder, "FXAA Pass", target, &self.pipeline, &bind_group);
        Ok(())
    }
}
