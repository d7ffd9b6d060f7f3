//! Ordered multi-pass render pipeline.
//!
//! A pipeline holds one mandatory base pass and an ordered list of
//! post-effect passes fixed at construction. Post effects are switched on
//! and off as a block: the active chain is either `[base]` or
//! `[base, ...effects]`. Every configured pass is resized in lock-step,
//! whether or not it is currently active.
//!
//! The pipeline is generic over a [`Backend`], which names the per-frame
//! data handed to each pass. The wgpu backend lives in
//! [`crate::renderer`]; tests drive the same logic with a recording
//! backend.

use crate::camera::Camera;
use crate::error::ViewerError;

/// Family of per-frame data consumed by a pipeline's passes.
pub trait Backend: 'static {
    /// Frame data borrowed for the duration of one render.
    type Frame<'f>;
}

/// Role of a pass in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Rasterizes the scene into the first intermediate target.
    Base,
    /// Consumes the previous pass's output.
    PostEffect,
}

/// Surface dimensions in logical units plus the device pixel ratio.
///
/// The physical pixel size is stored separately so a window's exact inner
/// size survives fractional pixel ratios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in logical units.
    pub width: u32,
    /// Height in logical units.
    pub height: u32,
    /// Physical pixels per logical unit.
    pub pixel_ratio: f32,
    physical: (u32, u32),
}

/// Non-positive or non-finite ratios become 1.
fn sanitize_ratio(pixel_ratio: f32) -> f32 {
    if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio
    } else {
        1.0
    }
}

impl Viewport {
    /// Viewport of `width` x `height` logical units. Non-positive or
    /// non-finite pixel ratios are treated as 1. The physical size is the
    /// logical size scaled by the ratio and rounded.
    #[must_use]
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        let pixel_ratio = sanitize_ratio(pixel_ratio);
        let scale = |v: u32| (v as f32 * pixel_ratio).round() as u32;
        Self {
            width,
            height,
            pixel_ratio,
            physical: (scale(width), scale(height)),
        }
    }

    /// Viewport of an exact `width` x `height` physical pixel surface. The
    /// logical size is derived by dividing by the ratio and rounding.
    #[must_use]
    pub fn from_physical(width: u32, height: u32, pixel_ratio: f32) -> Self {
        let pixel_ratio = sanitize_ratio(pixel_ratio);
        let logical = |v: u32| {
            if v == 0 {
                0
            } else {
                ((v as f32 / pixel_ratio).round() as u32).max(1)
            }
        };
        Self {
            width: logical(width),
            height: logical(height),
            pixel_ratio,
            physical: (width, height),
        }
    }

    /// `true` when either dimension is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.physical.0 == 0 || self.physical.1 == 0
    }

    /// Width / height.
    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Size of the backing surface in physical pixels (at least 1x1).
    #[must_use]
    pub fn physical_size(&self) -> (u32, u32) {
        (self.physical.0.max(1), self.physical.1.max(1))
    }

    /// Size of one physical pixel in UV units.
    #[must_use]
    pub fn inverse_resolution(&self) -> [f32; 2] {
        let (width, height) = self.physical_size();
        [1.0 / width as f32, 1.0 / height as f32]
    }
}

/// Position of a pass in the active chain.
///
/// Intermediate results ping-pong between two slots: the pass at
/// `position` reads slot `(position - 1) % 2` and writes slot
/// `position % 2`, except the last pass, which writes the final surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainLink {
    /// Zero-based index in the active chain.
    pub position: usize,
    /// Number of active passes.
    pub len: usize,
}

impl ChainLink {
    /// First pass (the base pass).
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.position == 0
    }

    /// Last pass, writing to the final surface.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.position + 1 == self.len
    }

    /// Slot holding the previous pass's output.
    #[must_use]
    pub fn source_slot(&self) -> Option<usize> {
        self.position.checked_sub(1).map(|p| p % 2)
    }

    /// Slot this pass writes, or `None` for the final surface.
    #[must_use]
    pub fn target_slot(&self) -> Option<usize> {
        (!self.is_last()).then_some(self.position % 2)
    }
}

/// One stage of the pipeline.
pub trait RenderPass<B: Backend> {
    /// Stable identity, unique within a pipeline.
    fn name(&self) -> &'static str;

    /// Base or post-effect.
    fn kind(&self) -> PassKind;

    /// Whether [`resize`](Self::resize) must be called on surface changes.
    fn is_size_dependent(&self) -> bool {
        true
    }

    /// Adopt new surface dimensions. Mutates in place; resources are
    /// reallocated lazily by the pass.
    fn resize(&mut self, viewport: Viewport);

    /// Dimensions last passed to [`resize`](Self::resize).
    fn viewport(&self) -> Option<Viewport>;

    /// Encode this pass for one frame.
    ///
    /// # Errors
    ///
    /// Backend failures, reported as [`ViewerError::Render`].
    fn render(
        &mut self,
        frame: &mut B::Frame<'_>,
        link: ChainLink,
    ) -> Result<(), ViewerError>;
}

type BoxedPass<B> = Box<dyn RenderPass<B>>;

/// Base pass plus an ordered, block-toggled list of post effects.
pub struct RenderPipeline<B: Backend> {
    /// `None` once released.
    base: Option<BoxedPass<B>>,
    effects: Vec<BoxedPass<B>>,
    effects_enabled: bool,
    viewport: Option<Viewport>,
}

impl<B: Backend> RenderPipeline<B> {
    /// Start building a pipeline.
    #[must_use]
    pub fn builder() -> PipelineBuilder<B> {
        PipelineBuilder::new()
    }

    /// Whether the post-effect block is part of the active chain.
    #[must_use]
    pub fn post_effects_enabled(&self) -> bool {
        self.effects_enabled
    }

    /// `true` after [`release`](Self::release).
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.base.is_none()
    }

    /// Last viewport applied by [`resize`](Self::resize).
    #[must_use]
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Names of the passes that run on the next render, in order.
    #[must_use]
    pub fn active_pass_names(&self) -> Vec<&'static str> {
        self.active().map(|pass| pass.name()).collect()
    }

    /// Every configured pass, active or not, in construction order.
    pub fn passes(&self) -> impl Iterator<Item = &dyn RenderPass<B>> {
        self.base.iter().chain(&self.effects).map(AsRef::as_ref)
    }

    /// Switch the post-effect block on or off. Returns whether the active
    /// chain changed; requesting the current state is a no-op.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidPassConfiguration`] after release.
    pub fn set_post_effects_enabled(
        &mut self,
        enabled: bool,
    ) -> Result<bool, ViewerError> {
        self.ensure_live("toggle post effects")?;
        if self.effects_enabled == enabled {
            return Ok(false);
        }
        self.effects_enabled = enabled;
        log::info!(
            "{} post processing",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(true)
    }

    /// Propagate new surface dimensions to every size-dependent pass,
    /// including disabled effects, and to the camera's aspect ratio.
    /// Zero-sized viewports are ignored (returns `false`).
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidPassConfiguration`] after release.
    pub fn resize(
        &mut self,
        viewport: Viewport,
        camera: &mut Camera,
    ) -> Result<bool, ViewerError> {
        self.ensure_live("resize")?;
        if viewport.is_empty() {
            log::debug!(
                "ignoring empty viewport {}x{}",
                viewport.width,
                viewport.height
            );
            return Ok(false);
        }
        camera.set_viewport(viewport.width, viewport.height);
        for pass in self.base.iter_mut().chain(self.effects.iter_mut()) {
            if pass.is_size_dependent() {
                pass.resize(viewport);
            }
        }
        self.viewport = Some(viewport);
        Ok(true)
    }

    /// Run the active passes in order. Stops at the first failing pass.
    ///
    /// # Errors
    ///
    /// The failing pass's error, or
    /// [`ViewerError::InvalidPassConfiguration`] after release.
    pub fn render(&mut self, frame: &mut B::Frame<'_>) -> Result<(), ViewerError> {
        self.ensure_live("render")?;
        let active_effects = if self.effects_enabled {
            self.effects.len()
        } else {
            0
        };
        let len = 1 + active_effects;
        let passes = self
            .base
            .iter_mut()
            .chain(self.effects.iter_mut().take(active_effects));
        for (position, pass) in passes.enumerate() {
            log::trace!("pass {} ({}/{len})", pass.name(), position + 1);
            pass.render(frame, ChainLink { position, len })?;
        }
        Ok(())
    }

    /// Drop every pass and its backend resources now. The pipeline rejects
    /// all further use.
    pub fn release(&mut self) {
        if self.base.take().is_some() {
            self.effects.clear();
            log::debug!("render pipeline released");
        }
    }

    fn active(&self) -> impl Iterator<Item = &BoxedPass<B>> {
        let active_effects = if self.effects_enabled {
            self.effects.len()
        } else {
            0
        };
        self.base
            .iter()
            .chain(self.effects.iter().take(active_effects))
    }

    fn ensure_live(&self, operation: &str) -> Result<(), ViewerError> {
        if self.is_released() {
            return Err(ViewerError::InvalidPassConfiguration(format!(
                "cannot {operation}: pipeline has been released"
            )));
        }
        Ok(())
    }
}

/// Collects passes and validates the pipeline layout.
pub struct PipelineBuilder<B: Backend> {
    base: Option<BoxedPass<B>>,
    effects: Vec<BoxedPass<B>>,
    effects_enabled: bool,
}

impl<B: Backend> PipelineBuilder<B> {
    fn new() -> Self {
        Self {
            base: None,
            effects: Vec::new(),
            effects_enabled: true,
        }
    }

    /// Set the base pass.
    #[must_use]
    pub fn base(self, pass: impl RenderPass<B> + 'static) -> Self {
        self.base_boxed(Box::new(pass))
    }

    /// Set an already boxed base pass.
    #[must_use]
    pub fn base_boxed(mut self, pass: BoxedPass<B>) -> Self {
        self.base = Some(pass);
        self
    }

    /// Append a post effect. Effects run in the order they are added.
    #[must_use]
    pub fn effect(self, pass: impl RenderPass<B> + 'static) -> Self {
        self.effect_boxed(Box::new(pass))
    }

    /// Append an already boxed post effect.
    #[must_use]
    pub fn effect_boxed(mut self, pass: BoxedPass<B>) -> Self {
        self.effects.push(pass);
        self
    }

    /// Whether effects start enabled (default `true`).
    #[must_use]
    pub fn effects_enabled(mut self, enabled: bool) -> Self {
        self.effects_enabled = enabled;
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidPassConfiguration`] if the base pass is missing
    /// or not of kind [`PassKind::Base`], an effect is of kind
    /// [`PassKind::Base`], or two passes share a name.
    pub fn build(self) -> Result<RenderPipeline<B>, ViewerError> {
        let invalid = |msg: String| Err(ViewerError::InvalidPassConfiguration(msg));

        let Some(base) = self.base else {
            return invalid("pipeline has no base pass".to_owned());
        };
        if base.kind() != PassKind::Base {
            return invalid(format!("{} is not a base pass", base.name()));
        }
        let mut names = vec![base.name()];
        for effect in &self.effects {
            if effect.kind() != PassKind::PostEffect {
                return invalid(format!(
                    "{} cannot be used as a post effect",
                    effect.name()
                ));
            }
            if names.contains(&effect.name()) {
                return invalid(format!("duplicate pass {}", effect.name()));
            }
            names.push(effect.name());
        }
        log::debug!("render pipeline: {}", names.join(" -> "));

        Ok(RenderPipeline {
            base: Some(base),
            effects: self.effects,
            effects_enabled: self.effects_enabled,
            viewport: None,
        })
    }
}


#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::testing::{Trace, TracePass};
    use super::*;
    use crate::options::CameraOptions;

    fn ssao_bloom() -> RenderPipeline<Trace> {
        RenderPipeline::builder()
            .base(TracePass::base())
            .effect(TracePass::effect("ssao"))
            .effect(TracePass::effect("bloom"))
            .build()
            .unwrap()
    }

    #[test]
    fn disable_then_enable_restores_order() {
        let mut pipeline = ssao_bloom();
        assert_eq!(pipeline.active_pass_names(), ["base", "ssao", "bloom"]);

        assert!(pipeline.set_post_effects_enabled(false).unwrap());
        assert_eq!(pipeline.active_pass_names(), ["base"]);

        assert!(pipeline.set_post_effects_enabled(true).unwrap());
        assert_eq!(pipeline.active_pass_names(), ["base", "ssao", "bloom"]);
    }

    #[test]
    fn toggling_to_current_state_is_noop() {
        let mut pipeline = ssao_bloom();
        assert!(!pipeline.set_post_effects_enabled(true).unwrap());
        assert!(!pipeline.set_post_effects_enabled(true).unwrap());
        assert_eq!(pipeline.active_pass_names(), ["base", "ssao", "bloom"]);

        assert!(pipeline.set_post_effects_enabled(false).unwrap());
        assert!(!pipeline.set_post_effects_enabled(false).unwrap());
        assert_eq!(pipeline.active_pass_names(), ["base"]);
    }

    #[test]
    fn render_runs_active_chain_in_order() {
        let mut pipeline = ssao_bloom();
        let mut frame = Vec::new();
        pipeline.render(&mut frame).unwrap();
        assert_eq!(frame, ["base@0/3", "ssao@1/3", "bloom@2/3"]);

        let _ = pipeline.set_post_effects_enabled(false).unwrap();
        let mut frame = Vec::new();
        pipeline.render(&mut frame).unwrap();
        assert_eq!(frame, ["base@0/1"]);
    }

    #[test]
    fn failing_pass_stops_the_chain() {
        let mut failing = TracePass::effect("ssao");
        failing.fail = true;
        let mut pipeline = RenderPipeline::builder()
            .base(TracePass::base())
            .effect(failing)
            .effect(TracePass::effect("bloom"))
            .build()
            .unwrap();

        let mut frame = Vec::new();
        let err = pipeline.render(&mut frame).unwrap_err();
        assert!(matches!(err, ViewerError::Render { pass: "ssao", .. }));
        assert_eq!(frame, ["base@0/3"]);
    }

    #[test]
    fn resize_reaches_disabled_effects_and_camera() {
        let mut fixed = TracePass::effect("fixed");
        fixed.size_dependent = false;
        let mut pipeline = RenderPipeline::builder()
            .base(TracePass::base())
            .effect(TracePass::effect("ssao"))
            .effect(fixed)
            .effects_enabled(false)
            .build()
            .unwrap();
        let mut camera = Camera::new(&CameraOptions::default(), 1.0);

        let viewport = Viewport::new(800, 600, 2.0);
        assert!(pipeline.resize(viewport, &mut camera).unwrap());

        assert_eq!(camera.aspect(), 800.0 / 600.0);
        let sizes: Vec<_> = pipeline.passes().map(|p| p.viewport()).collect();
        assert_eq!(sizes, [Some(viewport), Some(viewport), None]);
        assert_eq!(pipeline.viewport(), Some(viewport));
    }

    #[test]
    fn empty_viewport_is_ignored() {
        let mut pipeline = ssao_bloom();
        let mut camera = Camera::new(&CameraOptions::default(), 1.5);
        assert!(!pipeline.resize(Viewport::new(0, 600, 1.0), &mut camera).unwrap());
        assert_eq!(camera.aspect(), 1.5);
        assert!(pipeline.passes().all(|p| p.viewport().is_none()));
    }

    #[test]
    fn builder_rejects_bad_layouts() {
        let missing_base = RenderPipeline::<Trace>::builder()
            .effect(TracePass::effect("ssao"))
            .build();
        assert!(matches!(
            missing_base,
            Err(ViewerError::InvalidPassConfiguration(_))
        ));

        let effect_as_base = RenderPipeline::builder()
            .base(TracePass::effect("ssao"))
            .build();
        assert!(effect_as_base.is_err());

        let base_as_effect = RenderPipeline::builder()
            .base(TracePass::base())
            .effect(TracePass::new("scene", PassKind::Base))
            .build();
        assert!(base_as_effect.is_err());

        let duplicate = RenderPipeline::builder()
            .base(TracePass::base())
            .effect(TracePass::effect("bloom"))
            .effect(TracePass::effect("bloom"))
            .build();
        assert!(duplicate.is_err());
    }

    #[test]
    fn release_drops_passes_and_rejects_use() {
        let drops = Rc::new(Cell::new(0));
        let mut base = TracePass::base();
        base.drops = drops.clone();
        let mut effect = TracePass::effect("fxaa");
        effect.drops = drops.clone();
        let mut pipeline = RenderPipeline::builder()
            .base(base)
            .effect(effect)
            .build()
            .unwrap();

        pipeline.release();
        assert_eq!(drops.get(), 2);
        assert!(pipeline.is_released());
        assert!(pipeline.active_pass_names().is_empty());

        assert!(matches!(
            pipeline.set_post_effects_enabled(false),
            Err(ViewerError::InvalidPassConfiguration(_))
        ));
        let mut camera = Camera::new(&CameraOptions::default(), 1.0);
        assert!(pipeline.resize(Viewport::new(10, 10, 1.0), &mut camera).is_err());
        assert!(pipeline.render(&mut Vec::new()).is_err());

        pipeline.release();
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn chain_link_slots_ping_pong() {
        let links: Vec<_> = (0..3).map(|position| ChainLink { position, len: 3 }).collect();
        assert!(links[0].is_first());
        assert!(!links[1].is_first());
        assert_eq!(links[0].source_slot(), None);
        assert_eq!(links[0].target_slot(), Some(0));
        assert_eq!(links[1].source_slot(), Some(0));
        assert_eq!(links[1].target_slot(), Some(1));
        assert_eq!(links[2].source_slot(), Some(1));
        assert_eq!(links[2].target_slot(), None);
        assert!(ChainLink { position: 0, len: 1 }.is_last());
    }

    #[test]
    fn viewport_scales_by_pixel_ratio() {
        let viewport = Viewport::new(400, 300, 2.0);
        assert_eq!(viewport.physical_size(), (800, 600));
        assert_eq!(viewport.inverse_resolution(), [1.0 / 800.0, 1.0 / 600.0]);
        assert_eq!(Viewport::new(10, 10, f32::NAN).pixel_ratio, 1.0);
    }

    #[test]
    fn fractional_ratio_keeps_exact_physical_size() {
        let viewport = Viewport::from_physical(1003, 601, 1.5);
        assert_eq!(viewport.physical_size(), (1003, 601));
        assert_eq!((viewport.width, viewport.height), (669, 401));
        assert_eq!(viewport.inverse_resolution(), [1.0 / 1003.0, 1.0 / 601.0]);
        // the logical round trip would land on 1004
        assert_eq!(Viewport::new(669, 401, 1.5).physical_size(), (1004, 602));
        assert!(Viewport::from_physical(1, 0, 2.0).is_empty());
        assert!(!Viewport::from_physical(1, 1, 3.0).is_empty());
    }
}
