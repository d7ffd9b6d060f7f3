use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Display", inline)]
#[serde(default)]
/// Background and frame pacing.
pub struct DisplayOptions {
    /// Clear color as linear RGB in `[0, 1]`.
    #[schemars(title = "Background")]
    pub background: [f32; 3],
    /// Render at most this many frames per second. Zero follows the
    /// display refresh.
    #[schemars(title = "Target FPS", range(min = 0, max = 240))]
    pub target_fps: u32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            background: [1.0, 1.0, 1.0],
            target_fps: 0,
        }
    }
}
