use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Camera", inline)]
#[serde(default)]
/// Camera projection and orbit control parameters.
pub struct CameraOptions {
    /// Vertical field of view in degrees.
    #[schemars(title = "Field of View", range(min = 10.0, max = 120.0), extend("step" = 1.0))]
    pub fovy: f32,
    /// Initial near clipping plane distance. Auto-framing overrides it.
    #[schemars(skip)]
    pub znear: f32,
    /// Initial far clipping plane distance. Auto-framing overrides it.
    #[schemars(skip)]
    pub zfar: f32,
    /// Rotation sensitivity multiplier.
    #[schemars(title = "Rotate Speed", range(min = 0.1, max = 5.0), extend("step" = 0.1))]
    pub rotate_speed: f32,
    /// Pan sensitivity multiplier.
    #[schemars(title = "Pan Speed", range(min = 0.1, max = 5.0), extend("step" = 0.1))]
    pub pan_speed: f32,
    /// Zoom sensitivity multiplier.
    #[schemars(title = "Zoom Speed", range(min = 0.1, max = 10.0), extend("step" = 0.1))]
    pub zoom_speed: f32,
    /// Fraction of the pending motion applied per frame. Zero disables
    /// damping.
    #[schemars(title = "Damping", range(min = 0.0, max = 0.9), extend("step" = 0.01))]
    pub damping_factor: f32,
    /// Initial zoom-out limit. Auto-framing overrides it.
    #[schemars(skip)]
    pub max_distance: f32,
    /// Turntable speed in revolutions per minute.
    #[schemars(title = "Auto-Rotate Speed", range(min = 0.0, max = 30.0), extend("step" = 0.5))]
    pub auto_rotate_speed: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fovy: 30.0,
            znear: 0.1,
            zfar: 1000.0,
            rotate_speed: 1.5,
            pan_speed: 1.5,
            zoom_speed: 3.0,
            damping_factor: 0.1,
            max_distance: 1000.0,
            auto_rotate_speed: 2.0,
        }
    }
}
