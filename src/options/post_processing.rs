use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A post-processing effect that can follow the scene pass.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum PostEffectKind {
    /// Screen-space ambient occlusion.
    Ssao,
    /// Threshold bloom.
    Bloom,
    /// Fast approximate anti-aliasing.
    Fxaa,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Effects", inline)]
#[serde(default)]
/// Which post effects run, in order, and their parameters.
pub struct PostProcessingOptions {
    /// Whether the effect chain starts enabled.
    #[schemars(title = "Enabled")]
    pub enabled: bool,
    /// Effects applied after the scene pass, in order.
    #[schemars(skip)]
    pub effects: Vec<PostEffectKind>,
    /// SSAO sampling radius in pixels.
    #[schemars(title = "AO Radius", range(min = 1.0, max = 32.0), extend("step" = 1.0))]
    pub ssao_kernel_radius: f32,
    /// Linear-depth difference below which no occlusion is counted.
    #[schemars(skip)]
    pub ssao_min_distance: f32,
    /// Linear-depth difference above which no occlusion is counted.
    #[schemars(skip)]
    pub ssao_max_distance: f32,
    /// Bloom blend strength.
    #[schemars(title = "Bloom Strength", range(min = 0.0, max = 2.0), extend("step" = 0.05))]
    pub bloom_strength: f32,
    /// Bloom blur radius.
    #[schemars(title = "Bloom Radius", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub bloom_radius: f32,
    /// Luminance above which pixels bloom.
    #[schemars(title = "Bloom Threshold", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub bloom_threshold: f32,
}

impl Default for PostProcessingOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            effects: vec![PostEffectKind::Ssao, PostEffectKind::Bloom],
            ssao_kernel_radius: 16.0,
            ssao_min_distance: 0.005,
            ssao_max_distance: 0.1,
            bloom_strength: 0.1,
            bloom_radius: 0.4,
            bloom_threshold: 0.85,
        }
    }
}
