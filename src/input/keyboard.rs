use serde::{Deserialize, Serialize};

use super::command::ViewerCommand;

/// Viewer-level actions that can be bound to keys.
///
/// Serde serializes as `snake_case` strings so TOML presets stay readable:
/// ```toml
/// [keybindings.bindings]
/// focus_scene = "KeyF"
/// toggle_post_processing = "KeyP"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    /// Frame the scene, keeping the angle if configured to.
    FocusScene,
    /// Frame the scene from the default direction.
    ResetView,
    /// Switch the post-effect chain on or off.
    TogglePostProcessing,
    /// Start or stop turntable rotation.
    ToggleAutoRotate,
}

impl KeyAction {
    /// The command this action issues. `maintain_angle` applies to
    /// [`FocusScene`](Self::FocusScene).
    #[must_use]
    pub fn to_command(self, maintain_angle: bool) -> ViewerCommand {
        match self {
            Self::FocusScene => ViewerCommand::FocusScene { maintain_angle },
            Self::ResetView => ViewerCommand::FocusScene {
                maintain_angle: false,
            },
            Self::TogglePostProcessing => ViewerCommand::TogglePostProcessing,
            Self::ToggleAutoRotate => ViewerCommand::ToggleAutoRotate,
        }
    }
}
