//! Standalone viewer window backed by winit.
//!
//! ```no_run
//! # use orbview::viewer::Viewer;
//! # use orbview::options::Options;
//! Viewer::builder()
//!     .with_options(Options::test_scene())
//!     .build()
//!     .run()
//!     .unwrap();
//! ```

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

use crate::demo::DemoScene;
use crate::error::ViewerError;
use crate::gpu::render_context::RenderContext;
use crate::input::{InputEvent, MouseButton};
use crate::options::Options;
use crate::pipeline::Viewport;
use crate::renderer::{GpuRenderer, SceneGraph};
use crate::scheduler::{FrameHandle, FrameSource};
use crate::session::ViewerSession;

/// Session type driven by a winit window.
pub type WindowSession = ViewerSession<GpuRenderer, RedrawFrames>;

/// Frame source over winit redraw requests.
///
/// winit cannot revoke a redraw request, so a cancelled handle is simply
/// forgotten and the next `RedrawRequested` finds nothing to deliver.
pub struct RedrawFrames {
    window: Arc<Window>,
    next_id: u64,
    current: Option<FrameHandle>,
}

impl RedrawFrames {
    /// Source requesting redraws of `window`.
    #[must_use]
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next_id: 0,
            current: None,
        }
    }

    /// Handle to deliver on the next `RedrawRequested`, if any.
    #[must_use]
    pub fn current(&self) -> Option<FrameHandle> {
        self.current
    }
}

impl FrameSource for RedrawFrames {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle::new(self.next_id);
        self.current = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.current == Some(handle) {
            self.current = None;
        }
    }
}

/// Viewport of a window: its exact physical inner size and scale factor.
#[must_use]
pub fn window_viewport(window: &Window) -> Viewport {
    let inner = window.inner_size();
    Viewport::from_physical(inner.width, inner.height, window.scale_factor() as f32)
}

/// Create the GPU context, renderer and session for `window` at
/// `viewport`, frame the scene from the default direction and start the
/// frame loop.
///
/// # Errors
///
/// [`ViewerError::SurfaceUnavailable`] when no surface or device can be
/// created, or renderer construction failures.
pub async fn create_session(
    window: Arc<Window>,
    viewport: Viewport,
    scene: Box<dyn SceneGraph>,
    options: Options,
) -> Result<WindowSession, ViewerError> {
    let context =
        RenderContext::new(window.clone(), viewport.physical_size()).await?;
    let renderer = GpuRenderer::new(context, scene, &options, viewport)?;
    let mut session =
        ViewerSession::new(renderer, RedrawFrames::new(window), options, viewport)?;
    if !session.focus_scene(false) {
        log::info!("scene is empty, keeping the default camera");
    }
    session.start();
    Ok(session)
}

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    scene: Option<Box<dyn SceneGraph>>,
    options: Option<Options>,
    title: String,
}

impl ViewerBuilder {
    /// Create a builder with sensible defaults (title "orbview", demo
    /// scene, default options).
    fn new() -> Self {
        Self {
            scene: None,
            options: None,
            title: "orbview".into(),
        }
    }

    /// Set the scene to display.
    #[must_use]
    pub fn with_scene(mut self, scene: impl SceneGraph + 'static) -> Self {
        self.scene = Some(Box::new(scene));
        self
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            scene: self.scene,
            options: self.options,
            title: self.title,
        }
    }
}

/// A standalone window that displays a scene.
///
/// Construct via [`Viewer::builder`], then call [`run`](Self::run) to
/// enter the event loop.
pub struct Viewer {
    scene: Option<Box<dyn SceneGraph>>,
    options: Option<Options>,
    title: String,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Viewer`] if the event loop cannot be created or fails.
    pub fn run(self) -> Result<(), ViewerError> {
        let event_loop =
            EventLoop::new().map_err(|e| ViewerError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Wait);

        let mut app = ViewerApp {
            window: None,
            session: None,
            scene: self.scene,
            options: self.options,
            title: self.title,
        };

        event_loop
            .run_app(&mut app)
            .map_err(|e| ViewerError::Viewer(e.to_string()))
    }
}

/// Internal winit application handler.
struct ViewerApp {
    window: Option<Arc<Window>>,
    session: Option<WindowSession>,
    scene: Option<Box<dyn SceneGraph>>,
    options: Option<Options>,
    title: String,
}

impl ViewerApp {
    fn resize_to_window(&mut self) {
        let (Some(window), Some(session)) = (&self.window, &mut self.session)
        else {
            return;
        };
        if let Err(e) = session.resize(window_viewport(window)) {
            log::error!("resize failed: {e}");
        }
    }

    fn input(&mut self, event: InputEvent) {
        if let Some(session) = &mut self.session {
            if let Err(e) = session.handle_input(event) {
                log::error!("input error: {e}");
            }
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next());
        let attrs = if let Some(mon) = &monitor {
            let mon_size = mon.size();
            let scale = mon.scale_factor();
            let logical_w = (f64::from(mon_size.width) / scale * 0.75) as u32;
            let logical_h = (f64::from(mon_size.height) / scale * 0.75) as u32;
            Window::default_attributes()
                .with_title(&self.title)
                .with_inner_size(winit::dpi::LogicalSize::new(
                    logical_w, logical_h,
                ))
        } else {
            Window::default_attributes().with_title(&self.title)
        };

        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let scene = self
            .scene
            .take()
            .unwrap_or_else(|| Box::new(DemoScene::sample()));
        let options = self.options.take().unwrap_or_default();
        let viewport = window_viewport(&window);
        match pollster::block_on(create_session(
            window.clone(),
            viewport,
            scene,
            options,
        )) {
            Ok(session) => {
                self.window = Some(window);
                self.session = Some(session);
            }
            Err(e) => {
                log::error!("Failed to initialize viewer: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        if matches!(event, WindowEvent::CloseRequested) {
            if let Some(session) = &mut self.session {
                session.dispose();
            }
            event_loop.exit();
            return;
        }

        match event {
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                self.resize_to_window();
            }

            WindowEvent::RedrawRequested => {
                let Some(session) = &mut self.session else {
                    return;
                };
                let Some(handle) = session.scheduler().source().current() else {
                    return;
                };
                if let Err(e) = session.on_frame(handle) {
                    log::error!("render error: {e}");
                }
            }

            WindowEvent::MouseInput { button, state, .. } => {
                self.input(InputEvent::MouseButton {
                    button: MouseButton::from(button),
                    pressed: state == ElementState::Pressed,
                });
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.input(InputEvent::CursorMoved {
                    x: position.x as f32,
                    y: position.y as f32,
                });
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll_delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.01,
                };
                self.input(InputEvent::Scroll {
                    delta: scroll_delta,
                });
            }

            WindowEvent::Focused(false) => self.input(InputEvent::FocusLost),

            WindowEvent::ModifiersChanged(modifiers) => {
                self.input(InputEvent::ModifiersChanged {
                    shift: modifiers.state().shift_key(),
                });
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                let key_str = format!("{code:?}");
                if let Some(session) = &mut self.session {
                    match session.handle_key(&key_str) {
                        Ok(true) => log::debug!("key {key_str} handled"),
                        Ok(false) => {}
                        Err(e) => log::error!("key {key_str} failed: {e}"),
                    }
                }
            }

            _ => (),
        }
    }
}
