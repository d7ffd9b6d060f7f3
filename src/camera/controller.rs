use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::camera::core::Camera;
use crate::options::CameraOptions;

/// Velocity components below this magnitude are zeroed so damping settles.
pub const VELOCITY_EPSILON: f32 = 1e-5;

/// Keeps the polar angle off the poles, where the up vector degenerates.
const POLAR_MARGIN: f32 = 1e-4;

/// Shortest allowed distance, as a fraction of `max_distance`.
const MIN_DISTANCE_RATIO: f32 = 1e-6;

/// Log-distance change per unit of zoom input at `zoom_speed == 1`.
const ZOOM_SCALE: f32 = 0.05;

/// How a pointer delta is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerMode {
    /// Orbit around the target.
    Rotate,
    /// Translate the target in the view plane.
    Pan,
    /// Move toward (positive `y`) or away from the target.
    Zoom,
}

/// Pending motion, consumed by [`OrbitController::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Velocity {
    /// Radians around the world up axis.
    azimuth: f32,
    /// Radians away from the world up axis.
    polar: f32,
    /// Screen-height fractions.
    pan: Vec2,
    /// Log-distance units, positive zooms in.
    zoom: f32,
}

impl Velocity {
    fn magnitude(&self) -> f32 {
        self.azimuth
            .abs()
            .max(self.polar.abs())
            .max(self.pan.length())
            .max(self.zoom.abs())
    }

    fn scale(&mut self, factor: f32) {
        self.azimuth *= factor;
        self.polar *= factor;
        self.pan *= factor;
        self.zoom *= factor;
    }
}

/// Damped orbit controller.
///
/// Pointer input accumulates into a velocity; every [`step`](Self::step)
/// applies a `damping_factor` fraction of it to the spherical coordinates
/// around `target` and decays the rest, so motion eases out over a few
/// frames. The controller writes the resulting eye position into the
/// [`Camera`] and raises its dirty flag whenever the view actually moved.
#[derive(Debug, Clone)]
pub struct OrbitController {
    target: Vec3,
    /// Angle around +Y, zero facing +Z.
    azimuth: f32,
    /// Angle from +Y.
    polar: f32,
    distance: f32,
    velocity: Velocity,

    damping_factor: f32,
    rotate_speed: f32,
    pan_speed: f32,
    zoom_speed: f32,
    max_distance: f32,
    viewport_height: f32,

    auto_rotate: bool,
    /// Revolutions per minute.
    auto_rotate_speed: f32,

    needs_update: bool,
    dirty: bool,
}

impl OrbitController {
    /// Create a controller orbiting `camera.target`, starting from the
    /// camera's current eye position.
    #[must_use]
    pub fn new(options: &CameraOptions, camera: &Camera) -> Self {
        let mut controller = Self {
            target: camera.target,
            azimuth: 0.0,
            polar: PI / 2.0,
            distance: 1.0,
            velocity: Velocity::default(),
            damping_factor: 0.0,
            rotate_speed: 1.0,
            pan_speed: 1.0,
            zoom_speed: 1.0,
            max_distance: options.max_distance.max(f32::MIN_POSITIVE),
            viewport_height: 1.0,
            auto_rotate: false,
            auto_rotate_speed: 0.0,
            needs_update: false,
            dirty: false,
        };
        controller.apply_options(options);
        controller.sync_to_camera(camera);
        controller
    }

    /// Take speeds and damping from `options`. Out-of-range values are
    /// clamped rather than rejected.
    pub fn apply_options(&mut self, options: &CameraOptions) {
        self.damping_factor = if options.damping_factor.is_finite() {
            options.damping_factor.clamp(0.0, 0.99)
        } else {
            0.0
        };
        self.rotate_speed = options.rotate_speed.max(f32::EPSILON);
        self.pan_speed = options.pan_speed.max(f32::EPSILON);
        self.zoom_speed = options.zoom_speed.max(f32::EPSILON);
        self.auto_rotate_speed = options.auto_rotate_speed;
    }

    /// Orbit target.
    #[must_use]
    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Current eye-to-target distance.
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Upper bound for [`distance`](Self::distance).
    #[must_use]
    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    /// Fraction of the velocity applied per step (0 = undamped).
    #[must_use]
    pub fn damping_factor(&self) -> f32 {
        self.damping_factor
    }

    /// Whether turntable rotation is running.
    #[must_use]
    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    /// Largest pending velocity component.
    #[must_use]
    pub fn velocity_magnitude(&self) -> f32 {
        self.velocity.magnitude()
    }

    /// `true` once no motion is pending.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.velocity == Velocity::default() && !self.auto_rotate
    }

    /// Accumulate a pointer delta (pixels for rotate/pan, scroll units for
    /// zoom) into the velocity.
    pub fn apply_pointer_delta(&mut self, delta: Vec2, mode: PointerMode) {
        if !delta.is_finite() || delta == Vec2::ZERO {
            return;
        }
        match mode {
            PointerMode::Rotate => {
                let scale = TAU / self.viewport_height * self.rotate_speed;
                self.velocity.azimuth -= delta.x * scale;
                self.velocity.polar -= delta.y * scale;
            }
            PointerMode::Pan => {
                self.velocity.pan +=
                    delta / self.viewport_height * self.pan_speed;
            }
            PointerMode::Zoom => {
                self.velocity.zoom += delta.y * self.zoom_speed * ZOOM_SCALE;
            }
        }
    }

    /// Track the viewport height used to convert pixels into angles.
    pub fn set_viewport(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Move the orbit target. The camera follows on the next step.
    pub fn set_target(&mut self, target: Vec3) {
        if !target.is_finite() {
            log::warn!("ignoring non-finite orbit target {target}");
            return;
        }
        if target != self.target {
            self.target = target;
            self.needs_update = true;
            self.dirty = true;
        }
    }

    /// Set the zoom-out limit. Returns `false` for non-positive or
    /// non-finite limits.
    pub fn set_max_distance(&mut self, max_distance: f32) -> bool {
        if !(max_distance.is_finite() && max_distance > 0.0) {
            log::warn!("ignoring max distance {max_distance}");
            return false;
        }
        self.max_distance = max_distance;
        let clamped = self.clamp_distance(self.distance);
        if clamped != self.distance {
            self.distance = clamped;
            self.needs_update = true;
            self.dirty = true;
        }
        true
    }

    /// Start or stop turntable rotation.
    pub fn set_auto_rotate(&mut self, enabled: bool) {
        if self.auto_rotate != enabled {
            self.auto_rotate = enabled;
            self.dirty = true;
        }
    }

    /// Re-derive the spherical state from a camera placed programmatically.
    ///
    /// An eye coincident with the target falls back to the default forward
    /// axis (eye on `+Z` of the target).
    pub fn sync_to_camera(&mut self, camera: &Camera) {
        let offset = camera.eye - self.target;
        let distance = offset.length();
        if let Some(dir) = offset.try_normalize() {
            self.azimuth = dir.x.atan2(dir.z);
            self.polar = dir.y.clamp(-1.0, 1.0).acos();
        } else {
            self.azimuth = 0.0;
            self.polar = PI / 2.0;
        }
        self.polar = self.polar.clamp(POLAR_MARGIN, PI - POLAR_MARGIN);
        self.distance = self.clamp_distance(distance);
        self.velocity = Velocity::default();
        self.needs_update = true;
        self.dirty = true;
    }

    /// Advance the damping integration by one frame and write the result
    /// into `camera`. Returns `true` when the eye or target moved.
    pub fn step(&mut self, dt: f32, camera: &mut Camera) -> bool {
        let moving = self.velocity != Velocity::default();
        if !moving && !self.auto_rotate && !self.needs_update {
            return false;
        }

        let fraction = if self.damping_factor > 0.0 {
            self.damping_factor
        } else {
            1.0
        };

        if self.auto_rotate && dt > 0.0 {
            self.azimuth -= TAU / 60.0 * self.auto_rotate_speed * dt;
        }

        if moving {
            self.azimuth =
                (self.azimuth + self.velocity.azimuth * fraction) % TAU;
            self.polar = (self.polar + self.velocity.polar * fraction)
                .clamp(POLAR_MARGIN, PI - POLAR_MARGIN);

            let world_per_screen =
                2.0 * self.distance * (camera.fovy_radians() / 2.0).tan();
            let (right, up) = self.screen_axes();
            let pan = self.velocity.pan * fraction * world_per_screen;
            self.target += -right * pan.x + up * pan.y;

            self.distance = self.clamp_distance(
                self.distance * (-self.velocity.zoom * fraction).exp(),
            );

            self.velocity.scale(1.0 - fraction);
            if self.velocity.magnitude() < VELOCITY_EPSILON {
                self.velocity = Velocity::default();
            }
        }

        self.needs_update = false;
        self.write_camera(camera)
    }

    /// Clear and return the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Unit offset from the target toward the eye.
    fn direction(&self) -> Vec3 {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_azimuth, cos_azimuth) = self.azimuth.sin_cos();
        Vec3::new(
            sin_polar * sin_azimuth,
            cos_polar,
            sin_polar * cos_azimuth,
        )
    }

    /// Camera-space right and up axes in world space.
    fn screen_axes(&self) -> (Vec3, Vec3) {
        let back = self.direction();
        let right = Vec3::Y.cross(back).try_normalize().unwrap_or(Vec3::X);
        (right, back.cross(right))
    }

    fn clamp_distance(&self, distance: f32) -> f32 {
        let min = self.max_distance * MIN_DISTANCE_RATIO;
        if distance.is_finite() {
            distance.clamp(min, self.max_distance)
        } else {
            self.max_distance
        }
    }

    fn write_camera(&mut self, camera: &mut Camera) -> bool {
        let eye = self.target + self.direction() * self.distance;
        let changed = eye != camera.eye || self.target != camera.target;
        camera.eye = eye;
        camera.target = self.target;
        camera.up = Vec3::Y;
        if changed {
            self.dirty = true;
        }
        changed
    }
}
