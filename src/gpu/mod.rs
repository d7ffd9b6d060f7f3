//! GPU resource management utilities.
//!
//! Provides wgpu device/surface initialization, the ping-pong frame
//! targets, the camera uniform binding, and shader composition.

/// Camera uniform buffer and its bind group.
pub mod camera_binding;
/// Intermediate color and depth textures shared by the passes.
pub mod frame_targets;
/// Shared wgpu boilerplate helpers for screen-space post-process pipelines.
pub mod pipeline_helpers;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
