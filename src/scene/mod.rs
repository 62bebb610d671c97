//! Scenes are ordered lists of render objects, built from a scene name.

use glam::{Mat4, Quat, Vec3};

use crate::assets::SphereDetail;
use crate::camera::CameraController;
use crate::error::RendererError;
use crate::renderer::gpu::{Gpu, Program, Uniform};
use crate::renderer::textures::TextureLibrary;

mod background;
mod model;
mod orbiter;

pub use background::Background;
pub use model::{Model, STATION_MTL, STATION_OBJ};
pub use orbiter::{Orbiter, OrbiterParams};

/// Scene names [`SceneComposer`] can build.
pub const SCENE_NAMES: [&str; 2] = ["cosmic-battle", "universe"];

pub fn is_known_scene(name: &str) -> bool {
    SCENE_NAMES.contains(&name)
}

/// What every object needs to draw one frame. Built by the frame loop after
/// the camera has been updated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    pub view: Mat4,
    pub projection: Mat4,
    pub eye: Vec3,
    pub width: u32,
    pub height: u32,
}

impl FrameContext {
    pub fn from_camera(camera: &dyn CameraController, width: u32, height: u32) -> FrameContext {
        FrameContext {
            view: camera.view(),
            projection: camera.projection(),
            eye: camera.eye(),
            width,
            height,
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Placement of an object in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Transform {
        Transform {
            translation,
            ..Transform::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Something updated and drawn every frame.
pub trait RenderObject {
    /// Advances the object by `dt` seconds. The camera has already been
    /// updated for this frame.
    fn update(&mut self, dt: f32, camera: &dyn CameraController);
    fn draw(&self, gpu: &mut dyn Gpu, frame: &FrameContext);
    /// Frees the object's GPU resources. Drawing afterwards does nothing.
    fn release(&mut self, gpu: &mut dyn Gpu);
}

// Shading shared by the spheres and models: a diffuse term lit from the
// sun at the origin, blended towards unlit by `u_emissive`.
pub(crate) const LIT_VERTEX_SHADER: &str = r#"#version 300 es
layout(location = 0) in vec3 POSITION;
layout(location = 1) in vec3 NORMAL;
layout(location = 2) in vec2 TEXCOORD;
uniform mat4 u_mvp;
uniform mat4 u_model;
out vec3 v_world;
out vec3 v_normal;
out vec2 v_uv;
void main() {
    vec4 world = u_model * vec4(POSITION, 1.0);
    v_world = world.xyz;
    v_normal = mat3(u_model) * NORMAL;
    v_uv = TEXCOORD;
    gl_Position = u_mvp * vec4(POSITION, 1.0);
}
"#;

pub(crate) const LIT_FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;
in vec3 v_world;
in vec3 v_normal;
in vec2 v_uv;
out vec4 FRAG_COLOR;
uniform vec4 u_color;
uniform sampler2D u_texture;
uniform int u_use_texture;
uniform float u_emissive;
void main() {
    vec4 base = u_use_texture == 1
        ? vec4(texture(u_texture, v_uv).rgb, u_color.a)
        : u_color;
    vec3 to_sun = -v_world;
    float lit = length(v_normal) > 0.0 && length(to_sun) > 0.0
        ? max(dot(normalize(v_normal), normalize(to_sun)), 0.0)
        : 1.0;
    float light = mix(0.2 + 0.8 * lit, 1.0, u_emissive);
    FRAG_COLOR = vec4(base.rgb * light, base.a);
}
"#;

pub(crate) fn set_matrices(gpu: &mut dyn Gpu, program: Program, model: Mat4, frame: &FrameContext) {
    let mvp = frame.view_projection() * model;
    gpu.set_uniform(program, "u_mvp", Uniform::Mat4(mvp.to_cols_array()));
    gpu.set_uniform(program, "u_model", Uniform::Mat4(model.to_cols_array()));
}

/// Owns the objects of the active scene, in draw order.
pub struct SceneComposer {
    name: String,
    objects: Vec<Box<dyn RenderObject>>,
}

impl SceneComposer {
    /// A composer for `name` with nothing built yet.
    pub fn new(name: impl Into<String>) -> SceneComposer {
        SceneComposer {
            name: name.into(),
            objects: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn push(&mut self, object: Box<dyn RenderObject>) {
        self.objects.push(object);
    }

    /// Releases the current objects and builds the scene named `name`. An
    /// unknown name is rejected before anything is torn down. If building
    /// fails the composer is left empty.
    pub fn activate(
        &mut self,
        name: &str,
        gpu: &mut dyn Gpu,
        textures: &mut dyn TextureLibrary,
    ) -> Result<(), RendererError> {
        if !is_known_scene(name) {
            return Err(RendererError::UnknownScene(name.to_string()));
        }
        self.release(gpu);
        self.name = name.to_string();

        let mut objects = Vec::new();
        match compose(name, gpu, textures, &mut objects) {
            Ok(()) => {
                log::info!("Scene {name:?} built with {} objects", objects.len());
                self.objects = objects;
                Ok(())
            }
            Err(err) => {
                for object in &mut objects {
                    object.release(gpu);
                }
                Err(err)
            }
        }
    }

    /// Updates every object, then the caller draws; objects are never
    /// updated and drawn interleaved.
    pub fn update(&mut self, dt: f32, camera: &dyn CameraController) {
        for object in &mut self.objects {
            object.update(dt, camera);
        }
    }

    pub fn draw(&self, gpu: &mut dyn Gpu, frame: &FrameContext) {
        for object in &self.objects {
            object.draw(gpu, frame);
        }
    }

    pub fn release(&mut self, gpu: &mut dyn Gpu) {
        if self.objects.is_empty() {
            return;
        }
        for object in &mut self.objects {
            object.release(gpu);
        }
        self.objects.clear();
        log::info!("Scene {:?} torn down", self.name);
    }
}

fn compose(
    name: &str,
    gpu: &mut dyn Gpu,
    textures: &mut dyn TextureLibrary,
    objects: &mut Vec<Box<dyn RenderObject>>,
) -> Result<(), RendererError> {
    objects.push(Box::new(Background::new(gpu)?));
    match name {
        "cosmic-battle" => {
            let sun = OrbiterParams {
                instance_scale: 1.2,
                spin_speed: 10.0,
                color: [1.0, 0.8, 0.3, 1.0],
                texture: Some("sun.png".to_string()),
                scale_oscillation: Some(0.9),
                emissive: true,
                detail: SphereDetail::Medium,
                ..OrbiterParams::default()
            };
            let earth = OrbiterParams {
                orbit_radius_x: 3.5,
                orbit_radius_z: 3.0,
                orbit_speed: 0.4,
                scale_amplitude: 0.15,
                instance_scale: 0.4,
                spin_speed: 30.0,
                color: [0.2, 0.45, 1.0, 1.0],
                texture: Some("earth.png".to_string()),
                ..OrbiterParams::default()
            };
            let mars = OrbiterParams {
                orbit_radius_x: 5.0,
                orbit_radius_z: 4.2,
                orbit_speed: 0.25,
                scale_amplitude: 0.1,
                instance_scale: 0.3,
                spin_speed: 20.0,
                color: [0.85, 0.35, 0.2, 1.0],
                texture: Some("mars.png".to_string()),
                ..OrbiterParams::default()
            };
            for params in [sun, earth, mars] {
                objects.push(Box::new(Orbiter::new(gpu, textures, params)?));
            }
            let placement = Transform::from_translation(Vec3::new(-2.5, 1.2, 0.0));
            objects.push(Box::new(Model::from_sources(
                gpu,
                textures,
                STATION_OBJ,
                STATION_MTL,
                placement,
                12.0,
            )?));
        }
        "universe" => {
            let planet = OrbiterParams {
                spin_speed: 8.0,
                color: [0.4, 0.6, 0.9, 1.0],
                texture: Some("planet.png".to_string()),
                detail: SphereDetail::High,
                ..OrbiterParams::default()
            };
            let moon = OrbiterParams {
                orbit_radius_x: 2.2,
                orbit_radius_z: 2.2,
                orbit_speed: 0.6,
                scale_amplitude: 0.1,
                instance_scale: 0.27,
                spin_speed: 15.0,
                color: [0.7, 0.7, 0.7, 1.0],
                texture: Some("moon.png".to_string()),
                ..OrbiterParams::default()
            };
            for params in [planet, moon] {
                objects.push(Box::new(Orbiter::new(gpu, textures, params)?));
            }
        }
        _ => return Err(RendererError::UnknownScene(name.to_string())),
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::camera::OrbitCamera;
    use crate::config::CameraConfig;
    use crate::renderer::gpu::Texture;
    use crate::renderer::recording::{Call, RecordingGpu};

    /// Textures that never exist.
    #[derive(Default)]
    pub(crate) struct NoTextures {
        pub lookups: Vec<String>,
    }

    impl TextureLibrary for NoTextures {
        fn initialize(&mut self, _gpu: &mut dyn Gpu) -> bool {
            false
        }

        fn texture(&mut self, _gpu: &mut dyn Gpu, name: &str) -> Option<Texture> {
            self.lookups.push(name.to_string());
            None
        }

        fn release(&mut self, _gpu: &mut dyn Gpu) {}
    }

    pub(crate) fn frame() -> FrameContext {
        let mut camera = OrbitCamera::new(&CameraConfig::default());
        camera.update_projection(640, 480);
        FrameContext::from_camera(&camera, 640, 480)
    }

    #[test]
    fn builds_both_scenes_and_releases_everything() -> Result<(), RendererError> {
        let mut gpu = RecordingGpu::new();
        let mut textures = NoTextures::default();
        let mut composer = SceneComposer::new("cosmic-battle");

        composer.activate("cosmic-battle", &mut gpu, &mut textures)?;
        assert_eq!(composer.len(), 5);
        assert!(textures.lookups.contains(&"earth.png".to_string()));

        composer.activate("universe", &mut gpu, &mut textures)?;
        assert_eq!(composer.name(), "universe");
        assert_eq!(composer.len(), 3);

        composer.release(&mut gpu);
        assert!(composer.is_empty());
        assert_eq!(gpu.live_count(), 0);
        assert_eq!(gpu.invalid_deletes, 0);
        Ok(())
    }

    #[test]
    fn unknown_scene_keeps_the_current_one() -> Result<(), RendererError> {
        let mut gpu = RecordingGpu::new();
        let mut textures = NoTextures::default();
        let mut composer = SceneComposer::new("universe");
        composer.activate("universe", &mut gpu, &mut textures)?;
        let live = gpu.live_count();

        let err = composer.activate("nowhere", &mut gpu, &mut textures);
        assert!(matches!(err, Err(RendererError::UnknownScene(name)) if name == "nowhere"));
        assert_eq!(composer.name(), "universe");
        assert_eq!(composer.len(), 3);
        assert_eq!(gpu.live_count(), live);
        Ok(())
    }

    #[test]
    fn failed_build_frees_partial_scene() {
        let mut gpu = RecordingGpu::new();
        // Background and sun get programs, the first planet does not.
        gpu.program_budget = Some(2);
        let mut textures = NoTextures::default();
        let mut composer = SceneComposer::new("cosmic-battle");
        let result = composer.activate("cosmic-battle", &mut gpu, &mut textures);
        assert!(matches!(result, Err(RendererError::Resource(_))));
        assert!(composer.is_empty());
        assert_eq!(gpu.live_count(), 0);
    }

    #[test]
    fn draws_every_object_in_order() -> Result<(), RendererError> {
        let mut gpu = RecordingGpu::new();
        let mut textures = NoTextures::default();
        let mut composer = SceneComposer::new("universe");
        composer.activate("universe", &mut gpu, &mut textures)?;
        gpu.take_calls();

        composer.draw(&mut gpu, &frame());
        let programs: Vec<Program> = gpu
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::UseProgram(program) => Some(*program),
                _ => None,
            })
            .collect();
        assert_eq!(programs.len(), 3);
        assert_eq!(gpu.draw_count(), 3);
        Ok(())
    }

    #[test]
    fn transform_matrix_applies_scale_then_rotation_then_translation() {
        let transform = Transform {
            translation: Vec3::new(1.0, 0.0, 0.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        let point = transform.matrix().transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((point - Vec3::new(1.0, 0.0, -2.0)).length() < 1e-5);
    }
}
