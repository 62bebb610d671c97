use std::f32::consts::TAU;

use glam::{Quat, Vec3};

use crate::assets::{generate_sphere_preset, SphereDetail};
use crate::camera::CameraController;
use crate::error::RendererError;
use crate::renderer::gpu::{Gpu, GpuMesh, Program, Texture, Uniform, VertexStreams};
use crate::renderer::textures::TextureLibrary;
use crate::scene::{
    set_matrices, FrameContext, RenderObject, Transform, LIT_FRAGMENT_SHADER, LIT_VERTEX_SHADER,
};

/// Cycles per second of the optional scale oscillation.
const SCALE_OSCILLATION_FREQUENCY: f32 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct OrbiterParams {
    /// Ellipse radii of the orbit. Either being zero keeps the body at
    /// `center`.
    pub orbit_radius_x: f32,
    pub orbit_radius_z: f32,
    pub center: Vec3,
    /// Radians per second.
    pub orbit_speed: f32,
    /// How much the body grows towards the near side of its orbit, as a
    /// fraction of its scale.
    pub scale_amplitude: f32,
    pub instance_scale: f32,
    /// Degrees per second around the body's own Y axis.
    pub spin_speed: f32,
    /// Used when there is no texture. Its alpha applies either way.
    pub color: [f32; 4],
    pub texture: Option<String>,
    /// Smallest fraction of full size the body shrinks to while pulsing,
    /// or `None` for a constant size.
    pub scale_oscillation: Option<f32>,
    pub emissive: bool,
    pub detail: SphereDetail,
}

impl Default for OrbiterParams {
    fn default() -> Self {
        OrbiterParams {
            orbit_radius_x: 0.0,
            orbit_radius_z: 0.0,
            center: Vec3::ZERO,
            orbit_speed: 0.0,
            scale_amplitude: 0.0,
            instance_scale: 1.0,
            spin_speed: 0.0,
            color: [1.0, 1.0, 1.0, 1.0],
            texture: None,
            scale_oscillation: None,
            emissive: false,
            detail: SphereDetail::Optimized,
        }
    }
}

/// A sphere on an elliptical orbit, spinning and optionally pulsing.
pub struct Orbiter {
    params: OrbiterParams,
    transform: Transform,
    orbit_angle: f32,
    spin_degrees: f32,
    elapsed: f32,
    texture: Option<Texture>,
    resources: Option<(Program, GpuMesh)>,
}

impl Orbiter {
    pub fn new(
        gpu: &mut dyn Gpu,
        textures: &mut dyn TextureLibrary,
        params: OrbiterParams,
    ) -> Result<Orbiter, RendererError> {
        let sphere = generate_sphere_preset(1.0, params.detail)?;
        let program = gpu.create_program(LIT_VERTEX_SHADER, LIT_FRAGMENT_SHADER)?;
        let mesh = gpu.upload_mesh(
            VertexStreams {
                positions: &sphere.positions,
                normals: Some(&sphere.normals),
                uvs: Some(&sphere.uvs),
            },
            &sphere.indices,
        );
        let texture = params
            .texture
            .as_deref()
            .and_then(|name| textures.texture(gpu, name));
        let mut orbiter = Orbiter {
            params,
            transform: Transform::default(),
            orbit_angle: 0.0,
            spin_degrees: 0.0,
            elapsed: 0.0,
            texture,
            resources: Some((program, mesh)),
        };
        orbiter.update_transform();
        Ok(orbiter)
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    fn orbits(&self) -> bool {
        self.params.orbit_radius_x > 0.0 && self.params.orbit_radius_z > 0.0
    }

    fn update_transform(&mut self) {
        let params = &self.params;
        let oscillation = match params.scale_oscillation {
            Some(minimum) => {
                let wave = 0.5 + 0.5 * (self.elapsed * SCALE_OSCILLATION_FREQUENCY * TAU).sin();
                minimum + (1.0 - minimum) * wave
            }
            None => 1.0,
        };
        let (offset, depth_scale) = if self.orbits() {
            let x = params.orbit_radius_x * self.orbit_angle.cos();
            let z = params.orbit_radius_z * self.orbit_angle.sin();
            (
                Vec3::new(x, 0.0, z),
                1.0 + params.scale_amplitude * (z / params.orbit_radius_z),
            )
        } else {
            (Vec3::ZERO, 1.0)
        };
        self.transform = Transform {
            translation: params.center + offset,
            rotation: Quat::from_rotation_y(self.spin_degrees.to_radians()),
            scale: Vec3::splat(params.instance_scale * depth_scale * oscillation),
        };
    }
}

impl RenderObject for Orbiter {
    fn update(&mut self, dt: f32, _camera: &dyn CameraController) {
        self.elapsed += dt;
        self.spin_degrees = (self.spin_degrees + dt * self.params.spin_speed) % 360.0;
        if self.orbits() && self.params.orbit_speed > 0.0 {
            self.orbit_angle = (self.orbit_angle + dt * self.params.orbit_speed) % TAU;
        }
        self.update_transform();
    }

    fn draw(&self, gpu: &mut dyn Gpu, frame: &FrameContext) {
        let Some((program, mesh)) = &self.resources else {
            return;
        };
        gpu.use_program(*program);
        set_matrices(gpu, *program, self.transform.matrix(), frame);
        gpu.set_uniform(*program, "u_color", Uniform::Vec4(self.params.color));
        gpu.set_uniform(
            *program,
            "u_emissive",
            Uniform::Float(if self.params.emissive { 1.0 } else { 0.0 }),
        );
        gpu.set_uniform(
            *program,
            "u_use_texture",
            Uniform::Int(self.texture.is_some() as i32),
        );
        gpu.set_uniform(*program, "u_texture", Uniform::Int(0));
        gpu.bind_texture(0, self.texture);
        gpu.draw_elements(mesh, 0, mesh.index_count);
    }

    fn release(&mut self, gpu: &mut dyn Gpu) {
        // The texture belongs to the texture library.
        if let Some((program, mesh)) = self.resources.take() {
            gpu.delete_mesh(&mesh);
            gpu.delete_program(program);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera;
    use crate::config::CameraConfig;
    use crate::renderer::recording::{Call, RecordingGpu};
    use crate::scene::tests::{frame, NoTextures};

    fn orbiter(gpu: &mut RecordingGpu, params: OrbiterParams) -> Orbiter {
        Orbiter::new(gpu, &mut NoTextures::default(), params).unwrap()
    }

    #[test]
    fn follows_an_elliptical_orbit() {
        let mut gpu = RecordingGpu::new();
        let camera = OrbitCamera::new(&CameraConfig::default());
        let mut body = orbiter(
            &mut gpu,
            OrbiterParams {
                orbit_radius_x: 4.0,
                orbit_radius_z: 2.0,
                orbit_speed: std::f32::consts::FRAC_PI_2,
                ..OrbiterParams::default()
            },
        );
        assert!((body.transform().translation - Vec3::new(4.0, 0.0, 0.0)).length() < 1e-5);

        // A quarter turn puts the body at the far end of the z radius.
        body.update(1.0, &camera);
        assert!((body.transform().translation - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn scale_pulses_with_orbit_depth() {
        let mut gpu = RecordingGpu::new();
        let camera = OrbitCamera::new(&CameraConfig::default());
        let mut body = orbiter(
            &mut gpu,
            OrbiterParams {
                orbit_radius_x: 1.0,
                orbit_radius_z: 1.0,
                orbit_speed: std::f32::consts::FRAC_PI_2,
                scale_amplitude: 0.5,
                instance_scale: 2.0,
                ..OrbiterParams::default()
            },
        );
        assert!((body.transform().scale.x - 2.0).abs() < 1e-5);
        body.update(1.0, &camera);
        assert!((body.transform().scale.x - 3.0).abs() < 1e-5);
        body.update(2.0, &camera);
        assert!((body.transform().scale.x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn oscillation_stays_between_minimum_and_full_size() {
        let mut gpu = RecordingGpu::new();
        let camera = OrbitCamera::new(&CameraConfig::default());
        let mut body = orbiter(
            &mut gpu,
            OrbiterParams {
                scale_oscillation: Some(0.5),
                ..OrbiterParams::default()
            },
        );
        for _ in 0..50 {
            body.update(0.1, &camera);
            let scale = body.transform().scale.x;
            assert!((0.5 - 1e-5..=1.0 + 1e-5).contains(&scale));
        }
        // A quarter period in, the wave peaks.
        let mut body = orbiter(
            &mut gpu,
            OrbiterParams {
                scale_oscillation: Some(0.5),
                ..OrbiterParams::default()
            },
        );
        body.update(1.25, &camera);
        assert!((body.transform().scale.x - 1.0).abs() < 1e-4);
    }

    #[test]
    fn spin_wraps_and_stationary_bodies_stay_put() {
        let mut gpu = RecordingGpu::new();
        let camera = OrbitCamera::new(&CameraConfig::default());
        let mut body = orbiter(
            &mut gpu,
            OrbiterParams {
                spin_speed: 90.0,
                orbit_speed: 1.0,
                ..OrbiterParams::default()
            },
        );
        body.update(5.0, &camera);
        assert!((body.spin_degrees - 90.0).abs() < 1e-4);
        assert_eq!(body.orbit_angle, 0.0);
        assert_eq!(body.transform().translation, Vec3::ZERO);
    }

    #[test]
    fn untextured_body_uses_its_color() {
        let mut gpu = RecordingGpu::new();
        let body = orbiter(
            &mut gpu,
            OrbiterParams {
                color: [0.1, 0.2, 0.3, 0.5],
                texture: Some("missing.png".to_string()),
                ..OrbiterParams::default()
            },
        );
        gpu.take_calls();
        body.draw(&mut gpu, &frame());
        let (program, _) = body.resources.as_ref().unwrap();
        assert!(gpu.calls.contains(&Call::SetUniform(
            *program,
            "u_use_texture".to_string(),
            Uniform::Int(0)
        )));
        assert!(gpu.calls.contains(&Call::SetUniform(
            *program,
            "u_color".to_string(),
            Uniform::Vec4([0.1, 0.2, 0.3, 0.5])
        )));
        assert!(gpu.calls.contains(&Call::BindTexture(0, None)));
    }

    #[test]
    fn release_twice_is_harmless() {
        let mut gpu = RecordingGpu::new();
        let mut body = orbiter(&mut gpu, OrbiterParams::default());
        body.release(&mut gpu);
        body.release(&mut gpu);
        assert_eq!(gpu.live_count(), 0);
        assert_eq!(gpu.invalid_deletes, 0);
        gpu.take_calls();
        body.draw(&mut gpu, &frame());
        assert!(gpu.calls.is_empty());
    }
}
