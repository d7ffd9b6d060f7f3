//! The viewer session: one camera, orbit controller, renderer and frame
//! loop, owned and released together.
//!
//! All mutations (input, focus, toggles, resizes) only update state and
//! raise the dirty flag; rendering happens inside frame ticks.

use crate::camera::{frame_volume, BoundingVolume, Camera, OrbitController};
use crate::error::ViewerError;
use crate::input::{InputEvent, InputProcessor, ViewerCommand};
use crate::options::Options;
use crate::pipeline::Viewport;
use crate::scheduler::{
    FrameHandle, FrameScheduler, FrameSource, FrameTarget, ManualFrames,
    TickOutcome,
};

/// Session-facing rendering backend.
///
/// Implemented by [`GpuRenderer`](crate::renderer::GpuRenderer); anything
/// that can resize, toggle effects and draw the scene for a camera can
/// stand in for it.
pub trait FrameRenderer {
    /// Resize surfaces and passes, and update the camera aspect. Returns
    /// `false` when the viewport was ignored (zero-sized).
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidPassConfiguration`] after release.
    fn resize(
        &mut self,
        viewport: Viewport,
        camera: &mut Camera,
    ) -> Result<bool, ViewerError>;

    /// Switch the post-effect chain. Returns whether it changed.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidPassConfiguration`] after release.
    fn set_post_effects_enabled(&mut self, enabled: bool) -> Result<bool, ViewerError>;

    /// Whether the post-effect chain is active.
    fn post_effects_enabled(&self) -> bool;

    /// Set the clear color (linear RGB).
    fn set_background(&mut self, rgb: [f32; 3]);

    /// Bounding volume of the current scene, if it has any content.
    fn scene_bounds(&self) -> Option<BoundingVolume>;

    /// Render one frame from `camera`.
    ///
    /// # Errors
    ///
    /// Surface or pass failures.
    fn render(&mut self, camera: &Camera) -> Result<(), ViewerError>;

    /// Release GPU resources. Later calls fail or do nothing.
    fn release(&mut self);
}

/// Camera, controller and renderer: the state a frame tick drives.
struct SceneView<R> {
    camera: Camera,
    controller: OrbitController,
    renderer: R,
}

impl<R: FrameRenderer> FrameTarget for SceneView<R> {
    fn advance(&mut self, dt: f32) -> bool {
        let moved = self.controller.step(dt, &mut self.camera);
        self.controller.take_dirty() || moved
    }

    fn render_frame(&mut self) -> Result<(), ViewerError> {
        self.renderer.render(&self.camera)
    }
}

/// Handle to a running viewer.
///
/// Generic over the renderer and the host's frame source so the same
/// session logic drives the winit viewer and headless hosts.
pub struct ViewerSession<R: FrameRenderer, S: FrameSource> {
    view: SceneView<R>,
    scheduler: FrameScheduler<S>,
    input: InputProcessor,
    options: Options,
    viewport: Viewport,
    disposed: bool,
}

impl<R: FrameRenderer, S: FrameSource> ViewerSession<R, S> {
    /// Build a session around `renderer`. The first tick after
    /// [`start`](Self::start) renders.
    ///
    /// # Errors
    ///
    /// Renderer errors while applying the initial options and viewport.
    pub fn new(
        mut renderer: R,
        source: S,
        options: Options,
        viewport: Viewport,
    ) -> Result<Self, ViewerError> {
        let mut camera = Camera::new(&options.camera, viewport.aspect());
        let _ = renderer
            .set_post_effects_enabled(options.post_processing.enabled)?;
        renderer.set_background(options.display.background);
        let _ = renderer.resize(viewport, &mut camera)?;

        let mut controller = OrbitController::new(&options.camera, &camera);
        controller.set_viewport(viewport.physical_size().1);

        let mut scheduler =
            FrameScheduler::new(source, options.display.target_fps);
        scheduler.request_redraw();

        Ok(Self {
            view: SceneView {
                camera,
                controller,
                renderer,
            },
            scheduler,
            input: InputProcessor::from_options(&options),
            options,
            viewport,
            disposed: false,
        })
    }

    /// The camera.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.view.camera
    }

    /// The orbit controller.
    #[must_use]
    pub fn controller(&self) -> &OrbitController {
        &self.view.controller
    }

    /// The renderer.
    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.view.renderer
    }

    /// Mutable access to the renderer, e.g. to swap scene content.
    /// Call [`request_redraw`](Self::request_redraw) afterwards.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.view.renderer
    }

    /// The frame loop.
    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler<S> {
        &self.scheduler
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Last applied viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Fit `volume` into view. With `maintain_angle` the current viewing
    /// direction is kept. A degenerate volume is logged and leaves the view
    /// untouched (returns `false`).
    pub fn focus(&mut self, volume: &BoundingVolume, maintain_angle: bool) -> bool {
        let framing = match frame_volume(
            volume,
            &self.view.camera,
            maintain_angle,
            self.options.framing.direction(),
        ) {
            Ok(framing) => framing,
            Err(err) => {
                log::warn!("not focusing: {err}");
                return false;
            }
        };
        if let Err(err) =
            framing.apply(&mut self.view.camera, &mut self.view.controller)
        {
            log::warn!("not focusing: {err}");
            return false;
        }
        log::debug!(
            "focused {:?} at distance {:.3}",
            framing.target,
            framing.distance
        );
        self.scheduler.request_redraw();
        true
    }

    /// Fit the renderer's scene into view. Returns `false` for an empty or
    /// degenerate scene.
    pub fn focus_scene(&mut self, maintain_angle: bool) -> bool {
        let Some(volume) = self.view.renderer.scene_bounds() else {
            log::warn!("not focusing: scene has no bounds");
            return false;
        };
        self.focus(&volume, maintain_angle)
    }

    /// Enable or disable post-processing. Returns whether it changed.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidPassConfiguration`] once disposed.
    pub fn set_post_processing(&mut self, enabled: bool) -> Result<bool, ViewerError> {
        let changed = self.view.renderer.set_post_effects_enabled(enabled)?;
        if changed {
            self.scheduler.request_redraw();
        }
        Ok(changed)
    }

    /// Flip post-processing.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidPassConfiguration`] once disposed.
    pub fn toggle_post_processing(&mut self) -> Result<bool, ViewerError> {
        let enabled = !self.view.renderer.post_effects_enabled();
        self.set_post_processing(enabled)
    }

    /// Set the clear color (linear RGB).
    pub fn set_background_color(&mut self, rgb: [f32; 3]) {
        self.view.renderer.set_background(rgb);
        self.scheduler.request_redraw();
    }

    /// Apply new surface dimensions. Zero-sized viewports are ignored.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidPassConfiguration`] once disposed.
    pub fn resize(&mut self, viewport: Viewport) -> Result<(), ViewerError> {
        if self
            .view
            .renderer
            .resize(viewport, &mut self.view.camera)?
        {
            self.view
                .controller
                .set_viewport(viewport.physical_size().1);
            self.viewport = viewport;
            self.scheduler.request_redraw();
        }
        Ok(())
    }

    /// Replace the options: camera feel, key bindings, background, frame
    /// cap and post-processing state. The effect list itself is fixed when
    /// the renderer is built.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidPassConfiguration`] once disposed.
    pub fn apply_options(&mut self, options: Options) -> Result<(), ViewerError> {
        let view = &mut self.view;
        let _ = view
            .renderer
            .set_post_effects_enabled(options.post_processing.enabled)?;
        if !view.camera.set_fovy(options.camera.fovy) {
            log::warn!("ignoring fovy {}", options.camera.fovy);
        }
        view.controller.apply_options(&options.camera);
        view.renderer.set_background(options.display.background);
        self.scheduler.set_target_fps(options.display.target_fps);
        self.input.apply_options(&options);
        self.options = options;
        self.scheduler.request_redraw();
        Ok(())
    }

    /// Feed a raw input event through the input processor.
    ///
    /// # Errors
    ///
    /// Errors from the resulting command.
    pub fn handle_input(&mut self, event: InputEvent) -> Result<(), ViewerError> {
        match self.input.handle_event(event) {
            Some(command) => self.execute(command),
            None => Ok(()),
        }
    }

    /// Handle a key press by its code string (e.g. `"KeyF"`). Returns
    /// whether the key is bound.
    ///
    /// # Errors
    ///
    /// Errors from the bound command.
    pub fn handle_key(&mut self, key: &str) -> Result<bool, ViewerError> {
        let Some(command) = self.input.handle_key_press(key) else {
            return Ok(false);
        };
        self.execute(command)?;
        Ok(true)
    }

    /// Apply a command.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidPassConfiguration`] when toggling
    /// post-processing after disposal.
    pub fn execute(&mut self, command: ViewerCommand) -> Result<(), ViewerError> {
        log::trace!("{command:?}");
        match command {
            ViewerCommand::PointerDelta { delta, mode } => {
                self.view.controller.apply_pointer_delta(delta, mode);
            }
            ViewerCommand::FocusScene { maintain_angle } => {
                let _ = self.focus_scene(maintain_angle);
            }
            ViewerCommand::TogglePostProcessing => {
                let _ = self.toggle_post_processing()?;
            }
            ViewerCommand::ToggleAutoRotate => {
                let enabled = !self.view.controller.auto_rotate();
                self.view.controller.set_auto_rotate(enabled);
            }
            ViewerCommand::RequestRedraw => self.scheduler.request_redraw(),
        }
        Ok(())
    }

    /// Start the frame loop. Also restarts after a render failure.
    /// Ignored once disposed.
    pub fn start(&mut self) {
        if self.disposed {
            log::warn!("cannot start a disposed session");
            return;
        }
        self.scheduler.start();
    }

    /// Stop the frame loop; a tick already queued becomes a no-op.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    /// Render on the next tick.
    pub fn request_redraw(&mut self) {
        self.scheduler.request_redraw();
    }

    /// Handle a display-refresh callback.
    ///
    /// # Errors
    ///
    /// The render error that halted the loop.
    pub fn on_frame(&mut self, handle: FrameHandle) -> Result<TickOutcome, ViewerError> {
        self.scheduler.on_frame(handle, &mut self.view)
    }

    /// Stop the loop and release the renderer. Idempotent; also runs on
    /// drop.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.scheduler.stop();
        self.view.renderer.release();
        self.disposed = true;
        log::debug!("viewer session disposed");
    }
}

impl<R: FrameRenderer> ViewerSession<R, ManualFrames> {
    /// Deliver the oldest queued frame. Returns `None` when no frame is
    /// queued (the loop is stopped or halted).
    ///
    /// # Errors
    ///
    /// The render error that halted the loop.
    pub fn tick(&mut self) -> Result<Option<TickOutcome>, ViewerError> {
        match self.scheduler.source_mut().next_frame() {
            Some(handle) => self.on_frame(handle).map(Some),
            None => Ok(None),
        }
    }
}

impl<R: FrameRenderer, S: FrameSource> Drop for ViewerSession<R, S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use glam::{Vec2, Vec3};

    use super::*;
    use crate::camera::PointerMode;
    use crate::input::MouseButton;
    use crate::pipeline::testing::{Trace, TracePass};
    use crate::pipeline::RenderPipeline;

    /// Renderer backed by a recording pipeline.
    struct MockRenderer {
        pipeline: RenderPipeline<Trace>,
        bounds: Option<BoundingVolume>,
        background: [f32; 3],
        frames: Vec<Vec<String>>,
        eyes: Vec<Vec3>,
        released: Rc<Cell<bool>>,
        fail: bool,
    }

    impl MockRenderer {
        fn new() -> Self {
            let pipeline = RenderPipeline::builder()
                .base(TracePass::base())
                .effect(TracePass::effect("ssao"))
                .effect(TracePass::effect("bloom"))
                .build()
                .unwrap();
            Self {
                pipeline,
                bounds: Some(BoundingVolume::new(Vec3::splat(-1.0), Vec3::splat(1.0))),
                background: [0.0; 3],
                frames: Vec::new(),
                eyes: Vec::new(),
                released: Rc::new(Cell::new(false)),
                fail: false,
            }
        }
    }

    impl FrameRenderer for MockRenderer {
        fn resize(
            &mut self,
            viewport: Viewport,
            camera: &mut Camera,
        ) -> Result<bool, ViewerError> {
            self.pipeline.resize(viewport, camera)
        }

        fn set_post_effects_enabled(&mut self, enabled: bool) -> Result<bool, ViewerError> {
            self.pipeline.set_post_effects_enabled(enabled)
        }

        fn post_effects_enabled(&self) -> bool {
            self.pipeline.post_effects_enabled()
        }

        fn set_background(&mut self, rgb: [f32; 3]) {
            self.background = rgb;
        }

        fn scene_bounds(&self) -> Option<BoundingVolume> {
            self.bounds
        }

        fn render(&mut self, camera: &Camera) -> Result<(), ViewerError> {
            if self.fail {
                return Err(ViewerError::Render {
                    pass: "base",
                    message: "surface lost".to_owned(),
                });
            }
            let mut frame = Vec::new();
            self.pipeline.render(&mut frame)?;
            self.frames.push(frame);
            self.eyes.push(camera.eye);
            Ok(())
        }

        fn release(&mut self) {
            self.pipeline.release();
            self.released.set(true);
        }
    }

    type TestSession = ViewerSession<MockRenderer, ManualFrames>;

    fn session(options: Options) -> TestSession {
        ViewerSession::new(
            MockRenderer::new(),
            ManualFrames::new(),
            options,
            Viewport::new(800, 600, 1.0),
        )
        .unwrap()
    }

    fn settle(session: &mut TestSession) -> usize {
        let before = session.renderer().frames.len();
        for _ in 0..500 {
            if session.tick().unwrap() == Some(TickOutcome::Idle)
                && session.controller().is_settled()
            {
                break;
            }
        }
        session.renderer().frames.len() - before
    }

    #[test]
    fn first_tick_renders_then_idles() {
        let mut session = session(Options::default());
        assert_eq!(session.tick().unwrap(), None);

        session.start();
        assert_eq!(session.tick().unwrap(), Some(TickOutcome::Rendered));
        assert_eq!(session.tick().unwrap(), Some(TickOutcome::Idle));
        assert_eq!(session.renderer().frames, [["base@0/3", "ssao@1/3", "bloom@2/3"]]);
        assert!((session.camera().aspect() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn focus_frames_unit_cube() {
        let mut session = session(Options::default());
        session.start();
        assert!(session.focus_scene(false));
        assert_eq!(session.tick().unwrap(), Some(TickOutcome::Rendered));

        // production preset: 30 degree fov, default direction -Z
        let camera = session.camera();
        let fit_height = 2.0 / (2.0 * 15.0_f32.to_radians().tan());
        let expected = fit_height.max(fit_height / camera.aspect());
        assert!((camera.eye - Vec3::new(0.0, 0.0, expected)).length() < 1e-3);
        assert_eq!(camera.target, Vec3::ZERO);
        assert!((camera.znear() - expected / 100.0).abs() < 1e-5);
        assert!((session.controller().max_distance() - expected * 10.0).abs() < 1e-3);
    }

    #[test]
    fn degenerate_focus_leaves_view_alone() {
        let mut session = session(Options::default());
        session.start();
        let _ = session.tick().unwrap();
        let before = session.camera().clone();

        let point = BoundingVolume::new(Vec3::ONE, Vec3::ONE);
        assert!(!session.focus(&point, true));
        assert_eq!(session.camera(), &before);
        let huge = BoundingVolume::new(Vec3::splat(-5e36), Vec3::splat(5e36));
        assert!(!session.focus(&huge, false));
        assert_eq!(session.camera(), &before);
        assert_eq!(session.tick().unwrap(), Some(TickOutcome::Idle));

        session.renderer_mut().bounds = None;
        assert!(!session.focus_scene(true));
    }

    #[test]
    fn post_processing_toggle_renders_base_only() {
        let mut session = session(Options::default());
        session.start();
        let _ = session.tick().unwrap();

        assert!(session.handle_key("KeyP").unwrap());
        assert!(!session.renderer().post_effects_enabled());
        assert_eq!(session.tick().unwrap(), Some(TickOutcome::Rendered));
        assert_eq!(session.renderer().frames.last().unwrap(), &["base@0/1"]);

        assert!(!session.set_post_processing(false).unwrap());
        assert_eq!(session.tick().unwrap(), Some(TickOutcome::Idle));

        assert!(session.set_post_processing(true).unwrap());
        let _ = session.tick().unwrap();
        assert_eq!(
            session.renderer().frames.last().unwrap(),
            &["base@0/3", "ssao@1/3", "bloom@2/3"]
        );
    }

    #[test]
    fn options_can_start_with_effects_disabled() {
        let mut options = Options::default();
        options.post_processing.enabled = false;
        options.display.background = [0.1, 0.2, 0.3];
        let session = session(options);
        assert!(!session.renderer().post_effects_enabled());
        assert_eq!(session.renderer().background, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn drag_orbits_then_settles() {
        let mut session = session(Options::default());
        session.start();
        let _ = session.tick().unwrap();
        let start_eye = session.camera().eye;
        let distance = session.controller().distance();

        for event in [
            InputEvent::CursorMoved { x: 100.0, y: 100.0 },
            InputEvent::MouseButton {
                button: MouseButton::Left,
                pressed: true,
            },
            InputEvent::CursorMoved { x: 160.0, y: 100.0 },
            InputEvent::MouseButton {
                button: MouseButton::Left,
                pressed: false,
            },
        ] {
            session.handle_input(event).unwrap();
        }

        let renders = settle(&mut session);
        assert!(renders > 1, "damped motion spans several frames");
        let camera = session.camera();
        assert!((camera.eye - start_eye).length() > 1e-3);
        assert!(((camera.eye - camera.target).length() - distance).abs() < 1e-3);
        assert_eq!(session.tick().unwrap(), Some(TickOutcome::Idle));
    }

    #[test]
    fn focus_loss_mid_drag_stops_orbiting() {
        let mut session = session(Options::default());
        session.start();
        let _ = session.tick().unwrap();
        let start_eye = session.camera().eye;

        for event in [
            InputEvent::CursorMoved { x: 100.0, y: 100.0 },
            InputEvent::MouseButton {
                button: MouseButton::Left,
                pressed: true,
            },
            InputEvent::FocusLost,
            InputEvent::CursorMoved { x: 160.0, y: 100.0 },
        ] {
            session.handle_input(event).unwrap();
        }

        assert_eq!(settle(&mut session), 0);
        assert_eq!(session.camera().eye, start_eye);
    }

    #[test]
    fn undamped_preset_moves_in_one_frame() {
        let mut session = session(Options::test_scene());
        session.start();
        let _ = session.tick().unwrap();

        session
            .execute(ViewerCommand::PointerDelta {
                delta: Vec2::new(30.0, 0.0),
                mode: PointerMode::Rotate,
            })
            .unwrap();
        assert_eq!(settle(&mut session), 1);
    }

    #[test]
    fn resize_updates_camera_and_ignores_zero() {
        let mut session = session(Options::default());
        session.resize(Viewport::new(1000, 500, 2.0)).unwrap();
        assert_eq!(session.camera().aspect(), 2.0);
        assert_eq!(session.viewport(), Viewport::new(1000, 500, 2.0));

        session.resize(Viewport::new(1000, 0, 2.0)).unwrap();
        assert_eq!(session.camera().aspect(), 2.0);
        assert_eq!(session.viewport().height, 500);
    }

    #[test]
    fn stop_revokes_queued_tick() {
        let mut session = session(Options::default());
        session.start();
        session.stop();
        assert_eq!(session.tick().unwrap(), None);
        assert!(session.renderer().frames.is_empty());
    }

    #[test]
    fn render_failure_halts_loop() {
        let mut session = session(Options::default());
        session.renderer_mut().fail = true;
        session.start();
        assert!(session.tick().is_err());
        assert!(session.scheduler().is_halted());
        assert_eq!(session.tick().unwrap(), None);

        session.renderer_mut().fail = false;
        session.start();
        assert_eq!(session.tick().unwrap(), Some(TickOutcome::Rendered));
    }

    #[test]
    fn auto_rotate_key_toggles() {
        let mut session = session(Options::default());
        session.start();
        let _ = session.tick().unwrap();
        assert!(session.handle_key("KeyA").unwrap());
        assert!(session.controller().auto_rotate());
        assert!(!session.controller().is_settled());
        assert_eq!(session.tick().unwrap(), Some(TickOutcome::Rendered));

        assert!(session.handle_key("KeyA").unwrap());
        assert!(!session.controller().auto_rotate());
        assert!(!session.handle_key("KeyZ").unwrap());
    }

    #[test]
    fn dispose_releases_once_and_on_drop() {
        let mut session = session(Options::default());
        let released = session.renderer().released.clone();
        session.start();
        session.dispose();
        assert!(released.get());
        assert!(session.is_disposed());
        assert!(matches!(
            session.set_post_processing(false),
            Err(ViewerError::InvalidPassConfiguration(_))
        ));
        session.start();
        assert_eq!(session.tick().unwrap(), None);

        let fovy = session.camera().fovy();
        let mut options = Options::test_scene();
        options.display.background = [0.5; 3];
        assert!(session.apply_options(options).is_err());
        assert_eq!(session.camera().fovy(), fovy);
        assert_ne!(session.renderer().background, [0.5; 3]);
        assert_eq!(session.options(), &Options::default());

        let dropped = self::session(Options::default());
        let released = dropped.renderer().released.clone();
        drop(dropped);
        assert!(released.get());
    }
}
