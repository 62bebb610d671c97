use glam::Vec2;

use crate::camera::CameraController;
use crate::error::RendererError;
use crate::renderer::gpu::{
    upload_fullscreen_quad, Gpu, GpuMesh, Program, Uniform, FULLSCREEN_VERTEX_SHADER,
};
use crate::scene::{FrameContext, RenderObject};

const NEBULA_FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;
in vec2 uv;
out vec4 FRAG_COLOR;
uniform float u_time;
uniform vec2 u_resolution;
uniform vec2 u_offset;

float hash(vec2 p) {
    return fract(sin(dot(p, vec2(127.1, 311.7))) * 43758.5453);
}

float noise(vec2 p) {
    vec2 i = floor(p);
    vec2 f = fract(p);
    f = f * f * (3.0 - 2.0 * f);
    return mix(mix(hash(i), hash(i + vec2(1.0, 0.0)), f.x),
               mix(hash(i + vec2(0.0, 1.0)), hash(i + vec2(1.0, 1.0)), f.x), f.y);
}

float fbm(vec2 p) {
    float value = 0.0;
    float amplitude = 0.5;
    for (int i = 0; i < 5; i++) {
        value += amplitude * noise(p);
        p *= 2.0;
        amplitude *= 0.5;
    }
    return value;
}

void main() {
    float aspect = u_resolution.x / max(u_resolution.y, 1.0);
    vec2 p = (uv - 0.5) * vec2(aspect, 1.0) * 3.0 + u_offset;
    float cloud = fbm(p + vec2(u_time * 0.02, u_time * 0.01));
    vec3 color = mix(vec3(0.02, 0.0, 0.06), vec3(0.35, 0.1, 0.5), cloud * cloud);
    color += vec3(0.1, 0.2, 0.45) * pow(fbm(p * 1.7 - u_time * 0.015), 3.0);
    vec2 cell = floor(p * 60.0);
    float star = step(0.995, hash(cell));
    float twinkle = 0.6 + 0.4 * sin(u_time * 3.0 + hash(cell + 7.0) * 6.2831);
    FRAG_COLOR = vec4(color + vec3(star * twinkle), 1.0);
}
"#;

/// How far the nebula drifts per radian of camera orbit.
const PARALLAX: f32 = 0.15;

/// An animated nebula covering the whole screen, drawn behind everything.
pub struct Background {
    elapsed: f32,
    offset: Vec2,
    resources: Option<(Program, GpuMesh)>,
}

impl Background {
    pub fn new(gpu: &mut dyn Gpu) -> Result<Background, RendererError> {
        let program = gpu.create_program(FULLSCREEN_VERTEX_SHADER, NEBULA_FRAGMENT_SHADER)?;
        let quad = upload_fullscreen_quad(gpu);
        Ok(Background {
            elapsed: 0.0,
            offset: Vec2::ZERO,
            resources: Some((program, quad)),
        })
    }
}

impl RenderObject for Background {
    fn update(&mut self, dt: f32, camera: &dyn CameraController) {
        self.elapsed += dt;
        let eye = camera.eye();
        self.offset = Vec2::new(eye.x.atan2(eye.z), eye.y.atan2(eye.z.hypot(eye.x))) * PARALLAX;
    }

    fn draw(&self, gpu: &mut dyn Gpu, frame: &FrameContext) {
        let Some((program, quad)) = &self.resources else {
            return;
        };
        gpu.set_depth_write(false);
        gpu.use_program(*program);
        gpu.set_uniform(*program, "u_time", Uniform::Float(self.elapsed));
        gpu.set_uniform(
            *program,
            "u_resolution",
            Uniform::Vec2([frame.width as f32, frame.height as f32]),
        );
        gpu.set_uniform(*program, "u_offset", Uniform::Vec2(self.offset.to_array()));
        gpu.draw_elements(quad, 0, quad.index_count);
        gpu.set_depth_write(true);
    }

    fn release(&mut self, gpu: &mut dyn Gpu) {
        if let Some((program, quad)) = self.resources.take() {
            gpu.delete_mesh(&quad);
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
    use crate::scene::tests::frame;

    #[test]
    fn draws_without_depth_writes() -> Result<(), RendererError> {
        let mut gpu = RecordingGpu::new();
        let background = Background::new(&mut gpu)?;
        gpu.take_calls();
        background.draw(&mut gpu, &frame());
        let calls = gpu.take_calls();
        assert_eq!(calls.first(), Some(&Call::DepthWrite(false)));
        assert_eq!(calls.last(), Some(&Call::DepthWrite(true)));
        assert_eq!(
            calls
                .iter()
                .filter(|call| matches!(call, Call::DrawElements { index_count: 6, .. }))
                .count(),
            1
        );
        Ok(())
    }

    #[test]
    fn time_accumulates_and_follows_the_camera() -> Result<(), RendererError> {
        let mut gpu = RecordingGpu::new();
        let mut camera = OrbitCamera::new(&CameraConfig::default());
        let mut background = Background::new(&mut gpu)?;
        background.update(0.5, &camera);
        background.update(0.25, &camera);
        assert_eq!(background.elapsed, 0.75);
        assert!(background.offset.length() < 1e-6);

        camera.add_orbit_offset(90.0);
        background.update(0.0, &camera);
        let expected = std::f32::consts::FRAC_PI_2 * PARALLAX;
        assert!((background.offset.x - expected).abs() < 1e-4);
        Ok(())
    }
}
