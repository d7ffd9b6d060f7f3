use glam::Vec2;

use crate::camera::PointerMode;

/// A discrete request to the viewer session.
///
/// Produced by the [`InputProcessor`](super::InputProcessor) or by the
/// host directly, and applied with
/// [`ViewerSession::execute`](crate::session::ViewerSession::execute).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerCommand {
    /// Feed a pointer delta to the orbit controller.
    PointerDelta {
        /// Pixels for rotate/pan, zoom units for zoom.
        delta: Vec2,
        /// How the delta moves the camera.
        mode: PointerMode,
    },
    /// Fit the scene's bounding volume into view.
    FocusScene {
        /// Keep the current viewing direction.
        maintain_angle: bool,
    },
    /// Switch the post-effect chain on or off.
    TogglePostProcessing,
    /// Start or stop turntable rotation.
    ToggleAutoRotate,
    /// Render on the next frame even if nothing moved.
    RequestRedraw,
}
