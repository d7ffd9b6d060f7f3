//! Auto-framing: place the camera so a bounding volume fills the view.
//!
//! [`frame_volume`] is a pure function of the volume and the camera's
//! projection parameters; [`Framing::apply`] writes the result into the
//! camera and orbit controller.

use glam::Vec3;

use crate::camera::controller::OrbitController;
use crate::camera::core::Camera;
use crate::error::ViewerError;

/// Zoom-out headroom: `max_distance = distance * MAX_DISTANCE_FACTOR`.
pub const MAX_DISTANCE_FACTOR: f32 = 10.0;
/// Depth range scale: `near = distance / CLIP_RANGE_FACTOR`,
/// `far = distance * CLIP_RANGE_FACTOR`.
pub const CLIP_RANGE_FACTOR: f32 = 100.0;

/// Axis-aligned bounding volume supplied by the scene graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl BoundingVolume {
    /// Volume spanning `min..max`.
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest volume containing every point, or `None` for no points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(Self::new(first, first), |volume, p| {
            Self::new(volume.min.min(p), volume.max.max(p))
        }))
    }

    /// Smallest volume containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Extent along each axis.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Midpoint.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Largest extent.
    #[must_use]
    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// `true` when the volume has a non-finite corner or extent, or no
    /// positive extent.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        let size = self.size();
        !(self.min.is_finite() && self.max.is_finite() && size.is_finite())
            || !(size.max_element() > 0.0)
    }
}

/// Camera and controller state computed by [`frame_volume`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    /// Volume being framed.
    pub volume: BoundingVolume,
    /// New orbit target (volume center).
    pub target: Vec3,
    /// New eye position.
    pub eye: Vec3,
    /// Eye-to-target distance.
    pub distance: f32,
    /// New near clip plane.
    pub near: f32,
    /// New far clip plane.
    pub far: f32,
    /// New controller zoom-out limit.
    pub max_distance: f32,
}

/// Compute the framing that fits `volume` into `camera`'s field of view.
///
/// With `maintain_angle` the camera keeps its current viewing direction
/// (eye toward target); otherwise it looks along `default_direction`.
/// A zero-length direction of either kind falls back to `-Z`.
///
/// # Errors
///
/// [`ViewerError::DegenerateVolume`] when the volume has no positive extent,
/// contains non-finite values, or is too large or too small for the
/// resulting distance and clip planes to be representable.
pub fn frame_volume(
    volume: &BoundingVolume,
    camera: &Camera,
    maintain_angle: bool,
    default_direction: Vec3,
) -> Result<Framing, ViewerError> {
    if volume.is_degenerate() {
        return Err(ViewerError::DegenerateVolume {
            min: volume.min,
            max: volume.max,
        });
    }

    let max_dimension = volume.max_dimension();
    let fit_height = max_dimension / (2.0 * (camera.fovy_radians() / 2.0).tan());
    let fit_width = fit_height / camera.aspect();
    let distance = fit_height.max(fit_width);

    let direction = if maintain_angle {
        camera.forward()
    } else {
        default_direction.try_normalize()
    }
    .unwrap_or(Vec3::NEG_Z);

    let target = volume.center();
    let framing = Framing {
        volume: *volume,
        target,
        eye: target - direction * distance,
        distance,
        near: distance / CLIP_RANGE_FACTOR,
        far: distance * CLIP_RANGE_FACTOR,
        max_distance: distance * MAX_DISTANCE_FACTOR,
    };
    if !framing.is_representable() {
        return Err(framing.degenerate());
    }
    Ok(framing)
}

impl Framing {
    /// Every output is finite, distance and near are positive normal
    /// floats and `near < far`.
    fn is_representable(&self) -> bool {
        self.eye.is_finite()
            && self.distance.is_normal()
            && self.distance > 0.0
            && self.max_distance.is_finite()
            && self.far.is_finite()
            && self.near.is_normal()
            && self.near > 0.0
            && self.near < self.far
    }

    fn degenerate(&self) -> ViewerError {
        ViewerError::DegenerateVolume {
            min: self.volume.min,
            max: self.volume.max,
        }
    }

    /// Write the framing into the camera and controller. The controller
    /// raises its dirty flag.
    ///
    /// # Errors
    ///
    /// [`ViewerError::DegenerateVolume`] when the framing's distances or
    /// clip planes are unusable. The camera and controller are untouched.
    pub fn apply(
        &self,
        camera: &mut Camera,
        controller: &mut OrbitController,
    ) -> Result<(), ViewerError> {
        if !self.is_representable() {
            return Err(self.degenerate());
        }
        if !camera.set_clip_planes(self.near, self.far)
            || !controller.set_max_distance(self.max_distance)
        {
            return Err(self.degenerate());
        }
        controller.set_target(self.target);
        camera.target = self.target;
        camera.eye = self.eye;
        controller.sync_to_camera(camera);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CameraOptions;

    fn camera(fovy: f32, aspect: f32) -> Camera {
        let options = CameraOptions {
            fovy,
            ..CameraOptions::default()
        };
        Camera::new(&options, aspect)
    }

    fn unit_cube() -> BoundingVolume {
        BoundingVolume::new(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn unit_cube_at_thirty_degrees() {
        let framing =
            frame_volume(&unit_cube(), &camera(30.0, 1.0), false, Vec3::NEG_Z)
                .unwrap();
        let expected = 2.0 / (2.0 * 15.0_f32.to_radians().tan());
        assert!((expected - 3.732).abs() < 1e-3);
        assert!((framing.distance - expected).abs() < 1e-4);
        assert!((framing.near - expected / 100.0).abs() < 1e-6);
        assert!((framing.far - expected * 100.0).abs() < 1e-2);
        assert!((framing.max_distance - expected * 10.0).abs() < 1e-3);
        assert_eq!(framing.target, Vec3::ZERO);
        // default direction looks down -Z, so the eye sits on +Z
        assert!((framing.eye - Vec3::new(0.0, 0.0, expected)).length() < 1e-4);
    }

    #[test]
    fn narrow_aspect_backs_off_for_width() {
        let framing =
            frame_volume(&unit_cube(), &camera(30.0, 0.5), false, Vec3::NEG_Z)
                .unwrap();
        let fit_height = 2.0 / (2.0 * 15.0_f32.to_radians().tan());
        assert!((framing.distance - fit_height / 0.5).abs() < 1e-3);

        let wide =
            frame_volume(&unit_cube(), &camera(30.0, 2.0), false, Vec3::NEG_Z)
                .unwrap();
        assert!((wide.distance - fit_height).abs() < 1e-4);
    }

    #[test]
    fn positive_volumes_give_valid_clip_planes() {
        let volumes = [
            BoundingVolume::new(Vec3::ZERO, Vec3::new(1e-4, 0.0, 0.0)),
            BoundingVolume::new(Vec3::splat(-5e4), Vec3::splat(5e4)),
            BoundingVolume::new(Vec3::new(3.0, -2.0, 7.0), Vec3::new(3.5, 9.0, 7.1)),
        ];
        for volume in &volumes {
            for fovy in [10.0, 45.0, 120.0] {
                let framing =
                    frame_volume(volume, &camera(fovy, 1.5), true, Vec3::NEG_Z)
                        .unwrap();
                assert!(framing.distance > 0.0);
                assert!(framing.near < framing.far);
            }
        }
    }

    #[test]
    fn maintain_angle_keeps_view_direction() {
        let mut cam = camera(45.0, 1.0);
        cam.eye = Vec3::new(4.0, 3.0, -2.0);
        cam.target = Vec3::new(1.0, 1.0, 1.0);
        let before = (cam.target - cam.eye).normalize();

        let volume = BoundingVolume::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(12.0, 3.0, 1.0));
        let framing = frame_volume(&volume, &cam, true, Vec3::NEG_Z).unwrap();
        let after = (framing.target - framing.eye).normalize();
        assert!((after - before).length() < 1e-5);
    }

    #[test]
    fn apply_preserves_angle_through_controller() {
        let options = CameraOptions::default();
        let mut cam = Camera::new(&options, 1.0);
        cam.eye = Vec3::new(5.0, 5.0, 5.0);
        let mut controller = OrbitController::new(&options, &cam);
        let before = cam.forward().unwrap();

        let framing = frame_volume(&unit_cube(), &cam, true, Vec3::NEG_Z).unwrap();
        framing.apply(&mut cam, &mut controller).unwrap();
        let _ = controller.step(0.016, &mut cam);

        let after = cam.forward().unwrap();
        assert!((after - before).length() < 1e-4);
        assert!((controller.distance() - framing.distance).abs() < 1e-4);
        assert_eq!(controller.max_distance(), framing.max_distance);
        assert_eq!(cam.znear(), framing.near);
        assert_eq!(cam.zfar(), framing.far);
        assert!(controller.take_dirty());
    }

    #[test]
    fn coincident_camera_uses_fallback_direction() {
        let mut cam = camera(45.0, 1.0);
        cam.eye = cam.target;
        let framing = frame_volume(&unit_cube(), &cam, true, Vec3::NEG_Z).unwrap();
        assert!(framing.eye.is_finite());
        assert!(framing.eye.z > 0.0);
    }

    #[test]
    fn custom_default_direction() {
        let framing =
            frame_volume(&unit_cube(), &camera(45.0, 1.0), false, Vec3::new(0.0, -2.0, 0.0))
                .unwrap();
        // looking down, so the eye is above the center
        assert!(framing.eye.y > 0.0);
        assert!(framing.eye.x.abs() < 1e-6);
    }

    #[test]
    fn degenerate_volumes_are_rejected() {
        let cam = camera(45.0, 1.0);
        let flat_point = BoundingVolume::new(Vec3::ONE, Vec3::ONE);
        let nan = BoundingVolume::new(Vec3::ZERO, Vec3::new(f32::NAN, 1.0, 1.0));
        let inverted = BoundingVolume::new(Vec3::ONE, Vec3::ZERO);
        for volume in [flat_point, nan, inverted] {
            assert!(matches!(
                frame_volume(&volume, &cam, false, Vec3::NEG_Z),
                Err(ViewerError::DegenerateVolume { .. })
            ));
        }
    }

    #[test]
    fn extreme_scales_are_rejected() {
        let cam = camera(30.0, 1.0);
        let huge = BoundingVolume::new(Vec3::splat(-5e36), Vec3::splat(5e36));
        let overflowing = BoundingVolume::new(Vec3::splat(-f32::MAX), Vec3::splat(f32::MAX));
        let subnormal = BoundingVolume::new(Vec3::ZERO, Vec3::splat(1e-40));
        for volume in [huge, overflowing, subnormal] {
            assert!(matches!(
                frame_volume(&volume, &cam, false, Vec3::NEG_Z),
                Err(ViewerError::DegenerateVolume { .. })
            ));
        }
        assert!(overflowing.is_degenerate());
    }

    #[test]
    fn unusable_framing_leaves_camera_untouched() {
        let options = CameraOptions::default();
        let mut cam = Camera::new(&options, 1.0);
        let mut controller = OrbitController::new(&options, &cam);
        let mut framing =
            frame_volume(&unit_cube(), &cam, false, Vec3::NEG_Z).unwrap();
        framing.far = f32::INFINITY;

        let (eye, near, far) = (cam.eye, cam.znear(), cam.zfar());
        let max_distance = controller.max_distance();
        assert!(framing.apply(&mut cam, &mut controller).is_err());
        assert_eq!((cam.eye, cam.znear(), cam.zfar()), (eye, near, far));
        assert_eq!(controller.max_distance(), max_distance);
    }

    #[test]
    fn volume_from_points() {
        let volume = BoundingVolume::from_points([
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(-2.0, 4.0, 1.0),
        ])
        .unwrap();
        assert_eq!(volume.min, Vec3::new(-2.0, -1.0, 0.0));
        assert_eq!(volume.max, Vec3::new(1.0, 4.0, 1.0));
        assert_eq!(volume.max_dimension(), 5.0);
        assert!(BoundingVolume::from_points([]).is_none());
    }
}
