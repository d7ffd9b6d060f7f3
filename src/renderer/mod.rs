//! wgpu implementation of the render pipeline.
//!
//! [`GpuRenderer`] owns the device context, the intermediate frame targets,
//! the camera uniform and a [`RenderPipeline`] over [`GpuBackend`]. The base
//! pass rasterizes a [`SceneGraph`]; post effects (SSAO, bloom, FXAA) are
//! fullscreen passes that ping-pong between the two color targets, with the
//! last active pass writing straight to the swapchain.

/// Bloom: bright-pass, separable blur and additive composite.
pub mod bloom;
/// FXAA edge smoothing.
pub mod fxaa;
/// Base pass that clears and draws the scene.
pub mod scene_pass;
/// Screen-space ambient occlusion.
pub mod ssao;

use crate::camera::{BoundingVolume, Camera};
use crate::error::ViewerError;
use crate::gpu::camera_binding::CameraBinding;
use crate::gpu::frame_targets::{FrameTargets, DEPTH_FORMAT};
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::options::{Options, PostEffectKind};
use crate::pipeline::{Backend, ChainLink, RenderPipeline, Viewport};
use crate::session::FrameRenderer;

pub use bloom::BloomPass;
pub use fxaa::FxaaPass;
pub use scene_pass::ScenePass;
pub use ssao::SsaoPass;

/// Formats and layouts a scene needs to build its pipelines.
pub struct SceneTargetInfo<'a> {
    /// Format of the color target the scene is drawn into.
    pub color_format: wgpu::TextureFormat,
    /// Format of the depth attachment.
    pub depth_format: wgpu::TextureFormat,
    /// Layout of the camera bind group (group 0).
    pub camera_layout: &'a wgpu::BindGroupLayout,
}

/// Drawable scene content.
pub trait SceneGraph {
    /// Bounding volume of everything drawn, or `None` when empty.
    fn bounds(&self) -> Option<BoundingVolume>;

    /// Create GPU resources. Called once before the first draw.
    ///
    /// # Errors
    ///
    /// Shader composition or resource creation failures.
    fn prepare(
        &mut self,
        context: &RenderContext,
        composer: &mut ShaderComposer,
        info: &SceneTargetInfo<'_>,
    ) -> Result<(), ViewerError>;

    /// Record draw calls into an open render pass with color and depth
    /// attachments. `camera` is bound at group 0 by the scene itself.
    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, camera: &wgpu::BindGroup);
}

/// Backend marker for wgpu passes.
pub struct GpuBackend;

impl Backend for GpuBackend {
    type Frame<'f> = GpuFrame<'f>;
}

/// Everything a pass needs while encoding one frame.
pub struct GpuFrame<'f> {
    /// Device and queue.
    pub context: &'f RenderContext,
    /// Encoder shared by every pass of the frame.
    pub encoder: &'f mut wgpu::CommandEncoder,
    /// Ping-pong color slots and the depth buffer.
    pub targets: &'f FrameTargets,
    /// Swapchain view written by the last pass.
    pub output: &'f wgpu::TextureView,
    /// Camera the frame is rendered from.
    pub camera: &'f Camera,
    /// Camera uniform bind group.
    pub camera_bind_group: &'f wgpu::BindGroup,
    /// Scene drawn by the base pass.
    pub scene: &'f dyn SceneGraph,
    /// Clear color.
    pub background: wgpu::Color,
}

impl<'f> GpuFrame<'f> {
    /// View a pass at `link` writes: its slot, or the swapchain when last.
    #[must_use]
    pub fn target_view(&self, link: ChainLink) -> &'f wgpu::TextureView {
        match link.target_slot() {
            Some(slot) => self.targets.color_view(slot),
            None => self.output,
        }
    }

    /// View holding the previous pass's output.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Render`] for the first pass, which has no input.
    pub fn source_view(
        &self,
        link: ChainLink,
        pass: &'static str,
    ) -> Result<&'f wgpu::TextureView, ViewerError> {
        let targets = self.targets;
        link.source_slot()
            .map(|slot| targets.color_view(slot))
            .ok_or_else(|| ViewerError::Render {
                pass,
                message: "post effect placed first in the chain".to_owned(),
            })
    }

    /// The viewport a pass last saw, or the target size at ratio 1.
    #[must_use]
    pub fn viewport_or_targets(&self, viewport: Option<Viewport>) -> Viewport {
        viewport.unwrap_or_else(|| {
            let (width, height) = self.targets.size();
            Viewport::from_physical(width, height, 1.0)
        })
    }
}

/// Renders a [`SceneGraph`] through the configured pass chain to a window
/// surface.
pub struct GpuRenderer {
    context: RenderContext,
    targets: FrameTargets,
    camera: CameraBinding,
    scene: Box<dyn SceneGraph>,
    pipeline: RenderPipeline<GpuBackend>,
    background: wgpu::Color,
}

impl GpuRenderer {
    /// Compose shaders, prepare the scene and build the pass chain from
    /// `options.post_processing.effects`.
    ///
    /// # Errors
    ///
    /// Shader failures, or [`ViewerError::InvalidPassConfiguration`] when
    /// the effect list names an effect twice.
    pub fn new(
        context: RenderContext,
        mut scene: Box<dyn SceneGraph>,
        options: &Options,
        viewport: Viewport,
    ) -> Result<Self, ViewerError> {
        let mut composer = ShaderComposer::new()?;
        let targets = FrameTargets::new(
            &context.device,
            context.format(),
            viewport.physical_size(),
        );
        let camera = CameraBinding::new(&context.device);
        scene.prepare(
            &context,
            &mut composer,
            &SceneTargetInfo {
                color_format: context.format(),
                depth_format: DEPTH_FORMAT,
                camera_layout: &camera.layout,
            },
        )?;

        let post = &options.post_processing;
        let mut builder = RenderPipeline::builder()
            .base(ScenePass::new())
            .effects_enabled(post.enabled);
        for kind in &post.effects {
            builder = match kind {
                PostEffectKind::Ssao => {
                    builder.effect(SsaoPass::new(&context, &mut composer, post)?)
                }
                PostEffectKind::Bloom => {
                    builder.effect(BloomPass::new(&context, &mut composer, post)?)
                }
                PostEffectKind::Fxaa => {
                    builder.effect(FxaaPass::new(&context, &mut composer)?)
                }
            };
        }
        let pipeline = builder.build()?;
        log::info!(
            "renderer ready: {} post effect(s), {}",
            post.effects.len(),
            if post.enabled { "enabled" } else { "disabled" }
        );

        Ok(Self {
            context,
            targets,
            camera,
            scene,
            pipeline,
            background: background_color(options.display.background),
        })
    }

    /// The device context.
    #[must_use]
    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    /// The pass chain.
    #[must_use]
    pub fn pipeline(&self) -> &RenderPipeline<GpuBackend> {
        &self.pipeline
    }

    /// Acquire the next swapchain texture. A lost or outdated surface is
    /// reconfigured and retried once; `None` skips the frame.
    fn acquire(&self) -> Result<Option<wgpu::SurfaceTexture>, ViewerError> {
        match self.context.get_next_frame() {
            Ok(texture) => Ok(Some(texture)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.context.reconfigure();
                match self.context.get_next_frame() {
                    Ok(texture) => Ok(Some(texture)),
                    Err(e) => {
                        log::warn!("skipping frame: {e}");
                        Ok(None)
                    }
                }
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timeout, skipping frame");
                Ok(None)
            }
            Err(e) => Err(ViewerError::Render {
                pass: "surface",
                message: e.to_string(),
            }),
        }
    }
}

impl FrameRenderer for GpuRenderer {
    fn resize(
        &mut self,
        viewport: Viewport,
        camera: &mut Camera,
    ) -> Result<bool, ViewerError> {
        if !self.pipeline.resize(viewport, camera)? {
            return Ok(false);
        }
        let (width, height) = viewport.physical_size();
        self.context.resize(width, height);
        if self.targets.resize(&self.context.device, (width, height)) {
            log::debug!("frame targets reallocated at {width}x{height}");
        }
        Ok(true)
    }

    fn set_post_effects_enabled(&mut self, enabled: bool) -> Result<bool, ViewerError> {
        self.pipeline.set_post_effects_enabled(enabled)
    }

    fn post_effects_enabled(&self) -> bool {
        self.pipeline.post_effects_enabled()
    }

    fn set_background(&mut self, rgb: [f32; 3]) {
        self.background = background_color(rgb);
    }

    fn scene_bounds(&self) -> Option<BoundingVolume> {
        self.scene.bounds()
    }

    fn render(&mut self, camera: &Camera) -> Result<(), ViewerError> {
        if self.pipeline.is_released() {
            return Err(ViewerError::InvalidPassConfiguration(
                "cannot render: pipeline has been released".to_owned(),
            ));
        }
        self.camera.update(&self.context.queue, camera);
        let Some(surface_texture) = self.acquire()? else {
            return Ok(());
        };
        let output = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.context.create_encoder();
        let mut frame = GpuFrame {
            context: &self.context,
            encoder: &mut encoder,
            targets: &self.targets,
            output: &output,
            camera,
            camera_bind_group: &self.camera.bind_group,
            scene: self.scene.as_ref(),
            background: self.background,
        };
        self.pipeline.render(&mut frame)?;

        self.context.submit(encoder);
        surface_texture.present();
        Ok(())
    }

    fn release(&mut self) {
        self.pipeline.release();
    }
}

fn background_color([r, g, b]: [f32; 3]) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(r),
        g: f64::from(g),
        b: f64::from(b),
        a: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_opaque() {
        let color = background_color([0.25, 0.5, 1.0]);
        assert_eq!((color.r, color.g, color.b, color.a), (0.25, 0.5, 1.0, 1.0));
    }
}
