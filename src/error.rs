//! Crate-level error types.

use std::fmt;

use glam::Vec3;

use crate::gpu::render_context::RenderContextError;

/// Errors produced by the orbview crate.
#[derive(Debug)]
pub enum ViewerError {
    /// The backend could not acquire a drawable surface. Fatal to the
    /// session being created.
    SurfaceUnavailable(RenderContextError),
    /// A bounding volume with zero size or non-finite components was handed
    /// to the auto-framer.
    DegenerateVolume {
        /// Minimum corner of the rejected volume.
        min: Vec3,
        /// Maximum corner of the rejected volume.
        max: Vec3,
    },
    /// The render pipeline was misconfigured or used after release.
    InvalidPassConfiguration(String),
    /// A pass failed while executing a frame.
    Render {
        /// Name of the failing pass (or `"surface"` for presentation).
        pass: &'static str,
        /// Backend error description.
        message: String,
    },
    /// WGSL composition failure.
    Shader(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl fmt::Display for ViewerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SurfaceUnavailable(e) => {
                write!(f, "surface unavailable: {e}")
            }
            Self::DegenerateVolume { min, max } => {
                write!(f, "degenerate bounding volume: min {min}, max {max}")
            }
            Self::InvalidPassConfiguration(msg) => {
                write!(f, "invalid pass configuration: {msg}")
            }
            Self::Render { pass, message } => {
                write!(f, "render error in {pass} pass: {message}")
            }
            Self::Shader(msg) => write!(f, "shader error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for ViewerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SurfaceUnavailable(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for ViewerError {
    fn from(e: RenderContextError) -> Self {
        Self::SurfaceUnavailable(e)
    }
}

impl From<std::io::Error> for ViewerError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
