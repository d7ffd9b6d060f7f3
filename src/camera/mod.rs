//! Camera system for 3D scene viewing.
//!
//! Provides a perspective camera, a damped orbit controller, and the
//! auto-framing computation that fits a bounding volume into view.

/// Damped orbit controller driving the camera from pointer input.
pub mod controller;
/// Core camera struct and GPU uniform types.
pub mod core;
/// Fit-to-volume camera placement.
pub mod framing;

pub use controller::{OrbitController, PointerMode};
pub use self::core::{Camera, CameraUniform};
pub use framing::{frame_volume, BoundingVolume, Framing};
