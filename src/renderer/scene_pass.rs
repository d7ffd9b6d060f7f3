use super::{GpuBackend, GpuFrame};
use crate::error::ViewerError;
use crate::pipeline::{ChainLink, PassKind, RenderPass, Viewport};

/// Clears color and depth, then lets the scene record its draws.
///
/// Owns no size-dependent resources: it draws into whatever target the
/// chain hands it and the shared depth buffer.
#[derive(Debug, Default)]
pub struct ScenePass {
    viewport: Option<Viewport>,
}

impl ScenePass {
    /// Stable pass name.
    pub const NAME: &'static str = "scene";

    /// A scene pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderPass<GpuBackend> for ScenePass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> PassKind {
        PassKind::Base
    }

    fn is_size_dependent(&self) -> bool {
        false
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
        let target = frame.target_view(link);
        let depth = frame.targets.depth_view();
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(frame.background),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        frame.scene.draw(&mut pass, frame.camera_bind_group);
        Ok(())
    }
}
