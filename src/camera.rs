//! The camera every render object reads its view and projection from.

use std::f32::consts::TAU;

use glam::{Mat4, Quat, Vec3};

use crate::config::CameraConfig;

/// Shared camera state. The frame loop advances it once per tick before any
/// render object updates.
pub trait CameraController {
    fn update_projection(&mut self, width: u32, height: u32);
    fn set_view(&mut self, eye: Vec3, center: Vec3, up: Vec3);
    /// Starts moving the eye back and forth between the `far` and `near`
    /// distances from the center.
    fn start_zoom_loop(&mut self, far: f32, near: f32);
    fn add_orbit_offset(&mut self, degrees: f32);
    fn update(&mut self, dt: f32);

    fn view(&self) -> Mat4;
    fn projection(&self) -> Mat4;
    fn eye(&self) -> Vec3;

    fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ZoomLoop {
    far: f32,
    near: f32,
    /// Seconds into the current cycle.
    phase: f32,
}

/// Looks at a fixed center from an eye that can be orbited around the
/// center's Y axis and zoomed in and out on a cosine cycle.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    eye: Vec3,
    center: Vec3,
    up: Vec3,
    yaw_degrees: f32,
    zoom: Option<ZoomLoop>,
    zoom_period: f32,
    fov_degrees: f32,
    near: f32,
    far: f32,
    projection: Mat4,
}

impl OrbitCamera {
    pub fn new(config: &CameraConfig) -> OrbitCamera {
        OrbitCamera {
            eye: Vec3::from(config.eye),
            center: Vec3::from(config.center),
            up: Vec3::from(config.up),
            yaw_degrees: 0.0,
            zoom: None,
            zoom_period: config.zoom_period.max(f32::EPSILON),
            fov_degrees: config.fov_degrees,
            near: config.near,
            far: config.far,
            projection: Mat4::IDENTITY,
        }
    }

    pub fn yaw_degrees(&self) -> f32 {
        self.yaw_degrees
    }

    /// Current eye distance from the center.
    pub fn distance(&self) -> f32 {
        match self.zoom {
            Some(zoom) => {
                // 1 at the start of the cycle, 0 halfway through.
                let t = 0.5 * (1.0 + (TAU * zoom.phase / self.zoom_period).cos());
                zoom.near + (zoom.far - zoom.near) * t
            }
            None => (self.eye - self.center).length(),
        }
    }
}

impl CameraController for OrbitCamera {
    fn update_projection(&mut self, width: u32, height: u32) {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        self.projection =
            Mat4::perspective_rh_gl(self.fov_degrees.to_radians(), aspect, self.near, self.far);
    }

    fn set_view(&mut self, eye: Vec3, center: Vec3, up: Vec3) {
        self.eye = eye;
        self.center = center;
        self.up = up;
        self.zoom = None;
    }

    fn start_zoom_loop(&mut self, far: f32, near: f32) {
        self.zoom = Some(ZoomLoop {
            far,
            near,
            phase: 0.0,
        });
    }

    fn add_orbit_offset(&mut self, degrees: f32) {
        self.yaw_degrees = (self.yaw_degrees + degrees) % 360.0;
    }

    fn update(&mut self, dt: f32) {
        if let Some(zoom) = &mut self.zoom {
            zoom.phase = (zoom.phase + dt) % self.zoom_period;
        }
    }

    fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.center, self.up)
    }

    fn projection(&self) -> Mat4 {
        self.projection
    }

    fn eye(&self) -> Vec3 {
        let offset = self.eye - self.center;
        let direction = offset.try_normalize().unwrap_or(Vec3::Z);
        let yaw = Quat::from_rotation_y(self.yaw_degrees.to_radians());
        self.center + yaw * direction * self.distance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&CameraConfig::default())
    }

    #[test]
    fn eye_follows_set_view_until_zoom_starts() {
        let mut camera = camera();
        camera.set_view(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO, Vec3::Y);
        assert!((camera.eye() - Vec3::new(0.0, 0.0, 6.0)).length() < 1e-5);

        camera.start_zoom_loop(20.0, 10.0);
        assert!((camera.distance() - 20.0).abs() < 1e-4);
        camera.update(15.0);
        assert!((camera.distance() - 10.0).abs() < 1e-4);
        camera.update(15.0);
        assert!((camera.distance() - 20.0).abs() < 1e-4);
    }

    #[test]
    fn set_view_stops_the_zoom_loop() {
        let mut camera = camera();
        camera.start_zoom_loop(20.0, 10.0);
        camera.update(7.0);
        camera.set_view(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO, Vec3::Y);
        assert!((camera.distance() - 6.0).abs() < 1e-5);
    }

    #[test]
    fn orbit_offset_rotates_around_y() {
        let mut camera = camera();
        camera.set_view(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO, Vec3::Y);
        camera.add_orbit_offset(90.0);
        let eye = camera.eye();
        assert!((eye - Vec3::new(6.0, 0.0, 0.0)).length() < 1e-4);
        camera.add_orbit_offset(270.0);
        assert!(camera.yaw_degrees().abs() < 1e-4);
    }

    #[test]
    fn projection_uses_the_aspect_ratio() {
        let mut camera = camera();
        camera.update_projection(200, 100);
        let projection = camera.projection();
        // x scale is y scale divided by the aspect ratio.
        assert!((projection.x_axis.x * 2.0 - projection.y_axis.y).abs() < 1e-5);
        assert_eq!(camera.view_projection(), projection * camera.view());
    }
}
