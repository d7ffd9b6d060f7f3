use glam::Vec3;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Framing", inline)]
#[serde(default)]
/// Auto-framing behavior.
pub struct FramingOptions {
    /// View direction used when framing without keeping the current angle.
    #[schemars(skip)]
    pub default_direction: [f32; 3],
    /// Whether the focus key keeps the current viewing angle.
    #[schemars(title = "Keep Angle On Focus")]
    pub maintain_angle: bool,
}

impl FramingOptions {
    /// [`default_direction`](Self::default_direction) as a vector.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        Vec3::from_array(self.default_direction)
    }
}

impl Default for FramingOptions {
    fn default() -> Self {
        Self {
            default_direction: [0.0, 0.0, -1.0],
            maintain_angle: true,
        }
    }
}
