use glam::{Mat4, Vec3};

use crate::options::CameraOptions;

/// Perspective camera defined by eye position, target, and projection
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye (camera) position in world space.
    pub eye: Vec3,
    /// Look-at target position.
    pub target: Vec3,
    /// Up direction vector.
    pub up: Vec3,
    /// Viewport aspect ratio (width / height).
    aspect: f32,
    /// Vertical field of view in degrees.
    fovy: f32,
    /// Near clipping plane distance.
    znear: f32,
    /// Far clipping plane distance.
    zfar: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
/// GPU uniform buffer holding the view-projection matrix and camera metadata.
pub struct CameraUniform {
    /// Combined view-projection matrix.
    pub view_proj: [[f32; 4]; 4],
    /// Camera world-space position.
    pub position: [f32; 3],
    /// Viewport aspect ratio.
    pub aspect: f32,
    /// Camera forward direction for lighting.
    pub forward: [f32; 3],
    /// Vertical field of view in degrees.
    pub fovy: f32,
}

impl Camera {
    /// Camera looking at the origin from `+Z`, with projection parameters
    /// taken from `options`.
    #[must_use]
    pub fn new(options: &CameraOptions, aspect: f32) -> Self {
        let fovy = if options.fovy > 0.0 && options.fovy < 180.0 {
            options.fovy
        } else {
            log::warn!("fovy {} out of range, using 45", options.fovy);
            45.0
        };
        let (znear, zfar) =
            if options.znear > 0.0 && options.zfar > options.znear {
                (options.znear, options.zfar)
            } else {
                log::warn!(
                    "clip planes {}..{} invalid, using 0.1..1000",
                    options.znear,
                    options.zfar
                );
                (0.1, 1000.0)
            };
        Self {
            eye: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect: if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 },
            fovy,
            znear,
            zfar,
        }
    }

    /// Vertical field of view in degrees.
    #[must_use]
    pub fn fovy(&self) -> f32 {
        self.fovy
    }

    /// Vertical field of view in radians.
    #[must_use]
    pub fn fovy_radians(&self) -> f32 {
        self.fovy.to_radians()
    }

    /// Viewport aspect ratio (width / height).
    #[must_use]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Near clipping plane distance.
    #[must_use]
    pub fn znear(&self) -> f32 {
        self.znear
    }

    /// Far clipping plane distance.
    #[must_use]
    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    /// Set the aspect ratio from surface dimensions. Zero-sized surfaces are
    /// ignored so the projection never degenerates.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Set the clip planes. Returns `false` and leaves the planes untouched
    /// unless `0 < near < far` and both are finite.
    pub fn set_clip_planes(&mut self, near: f32, far: f32) -> bool {
        if !(near.is_finite() && far.is_finite() && near > 0.0 && near < far) {
            log::warn!("rejected clip planes {near}..{far}");
            return false;
        }
        self.znear = near;
        self.zfar = far;
        true
    }

    /// Set the vertical field of view in degrees. Returns `false` for values
    /// outside `(0, 180)`.
    pub fn set_fovy(&mut self, fovy: f32) -> bool {
        if !(fovy > 0.0 && fovy < 180.0) {
            return false;
        }
        self.fovy = fovy;
        true
    }

    /// Unit vector from the eye toward the target, or `None` when they
    /// coincide.
    #[must_use]
    pub fn forward(&self) -> Option<Vec3> {
        (self.target - self.eye).try_normalize()
    }

    /// View matrix (world → camera space).
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// Projection matrix.
    #[must_use]
    pub fn build_projection(&self) -> Mat4 {
        // perspective_rh already uses [0,1] depth range (wgpu/Vulkan
        // convention)
        Mat4::perspective_rh(
            self.fovy.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        )
    }

    /// Build the combined view-projection matrix.
    #[must_use]
    pub fn build_matrix(&self) -> Mat4 {
        self.build_projection() * self.view_matrix()
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraUniform {
    /// Create a new camera uniform with identity view-projection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            position: [0.0; 3],
            aspect: 1.0,
            forward: [0.0, 0.0, -1.0],
            fovy: 45.0,
        }
    }

    /// Update uniform fields from the given camera's current state.
    pub fn update_view_proj(&mut self, camera: &Camera) {
        self.view_proj = camera.build_matrix().to_cols_array_2d();
        self.position = camera.eye.to_array();
        self.aspect = camera.aspect;
        self.forward = camera.forward().unwrap_or(Vec3::NEG_Z).to_array();
        self.fovy = camera.fovy;
    }
}
