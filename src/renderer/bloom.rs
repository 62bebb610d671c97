//! Bloom: the frame is captured offscreen, its bright parts are extracted at
//! reduced resolution, blurred, and added back on top before tone mapping.

use crate::config::BloomConfig;
use crate::error::ResourceError;
use crate::renderer::gpu::{
    upload_fullscreen_quad, Gpu, GpuMesh, Program, RenderTarget, Uniform,
    FULLSCREEN_VERTEX_SHADER,
};

/// Center tap first, then the taps at distance 1..=4 on both sides.
pub const GAUSSIAN_WEIGHTS: [f32; 5] = [0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216];

const BRIGHT_PASS_FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;
in vec2 uv;
out vec4 FRAG_COLOR;
uniform sampler2D u_scene;
uniform float u_threshold;
void main() {
    vec3 color = texture(u_scene, uv).rgb;
    float luminance = dot(color, vec3(0.2126, 0.7152, 0.0722));
    FRAG_COLOR = luminance > u_threshold
        ? vec4(color * (luminance - u_threshold), 1.0)
        : vec4(0.0, 0.0, 0.0, 1.0);
}
"#;

const COMPOSITE_FRAGMENT_SHADER: &str = r#"#version 300 es
precision mediump float;
in vec2 uv;
out vec4 FRAG_COLOR;
uniform sampler2D u_scene;
uniform sampler2D u_bloom;
uniform float u_intensity;
void main() {
    vec3 color = texture(u_scene, uv).rgb + texture(u_bloom, uv).rgb * u_intensity;
    FRAG_COLOR = vec4(color / (vec3(1.0) + color), 1.0);
}
"#;

fn blur_fragment_shader() -> String {
    let [w0, w1, w2, w3, w4] = GAUSSIAN_WEIGHTS;
    format!(
        r#"#version 300 es
precision mediump float;
in vec2 uv;
out vec4 FRAG_COLOR;
uniform sampler2D u_image;
// One texel along the blur axis.
uniform vec2 u_direction;
const float WEIGHTS[5] = float[](float({w0}), float({w1}), float({w2}), float({w3}), float({w4}));
void main() {{
    vec3 result = texture(u_image, uv).rgb * WEIGHTS[0];
    for (int i = 1; i < 5; i++) {{
        vec2 offset = u_direction * float(i);
        result += texture(u_image, uv + offset).rgb * WEIGHTS[i];
        result += texture(u_image, uv - offset).rgb * WEIGHTS[i];
    }}
    FRAG_COLOR = vec4(result, 1.0);
}}
"#
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BloomState {
    Uninitialized,
    Ready,
    Capturing,
}

/// GPU objects of an initialized pipeline.
#[derive(Debug)]
struct Pipeline {
    scene: RenderTarget,
    bright: RenderTarget,
    blur: [RenderTarget; 2],
    bright_pass: Program,
    blur_pass: Program,
    composite: Program,
    quad: GpuMesh,
}

/// Handles created so far, so a failed initialization can free them.
#[derive(Default)]
struct Created {
    targets: Vec<RenderTarget>,
    programs: Vec<Program>,
    quad: Option<GpuMesh>,
}

impl Created {
    fn target(&mut self, target: RenderTarget) -> RenderTarget {
        self.targets.push(target.clone());
        target
    }

    fn program(&mut self, program: Program) -> Program {
        self.programs.push(program);
        program
    }

    fn release(self, gpu: &mut dyn Gpu) {
        for target in &self.targets {
            gpu.delete_render_target(target);
        }
        for program in self.programs {
            gpu.delete_program(program);
        }
        if let Some(quad) = &self.quad {
            gpu.delete_mesh(quad);
        }
    }
}

impl Pipeline {
    fn create(
        gpu: &mut dyn Gpu,
        width: u32,
        height: u32,
        downsample: u32,
    ) -> Result<Pipeline, ResourceError> {
        let mut created = Created::default();
        let result = Pipeline::create_tracked(gpu, width, height, downsample, &mut created);
        if result.is_err() {
            created.release(gpu);
        }
        result
    }

    fn create_tracked(
        gpu: &mut dyn Gpu,
        width: u32,
        height: u32,
        downsample: u32,
        created: &mut Created,
    ) -> Result<Pipeline, ResourceError> {
        let downsample = downsample.max(1);
        let (small_width, small_height) = ((width / downsample).max(1), (height / downsample).max(1));

        let scene = created.target(gpu.create_render_target(width, height, true)?);
        let bright = created.target(gpu.create_render_target(small_width, small_height, false)?);
        let blur = [
            created.target(gpu.create_render_target(small_width, small_height, false)?),
            created.target(gpu.create_render_target(small_width, small_height, false)?),
        ];
        let bright_pass = created.program(
            gpu.create_program(FULLSCREEN_VERTEX_SHADER, BRIGHT_PASS_FRAGMENT_SHADER)?,
        );
        let blur_pass =
            created.program(gpu.create_program(FULLSCREEN_VERTEX_SHADER, &blur_fragment_shader())?);
        let composite = created.program(
            gpu.create_program(FULLSCREEN_VERTEX_SHADER, COMPOSITE_FRAGMENT_SHADER)?,
        );
        let quad = upload_fullscreen_quad(gpu);
        created.quad = Some(quad.clone());

        Ok(Pipeline {
            scene,
            bright,
            blur,
            bright_pass,
            blur_pass,
            composite,
            quad,
        })
    }

    fn release(self, gpu: &mut dyn Gpu) {
        for target in [&self.scene, &self.bright, &self.blur[0], &self.blur[1]] {
            gpu.delete_render_target(target);
        }
        for program in [self.bright_pass, self.blur_pass, self.composite] {
            gpu.delete_program(program);
        }
        gpu.delete_mesh(&self.quad);
    }
}

pub struct BloomPostProcess {
    config: BloomConfig,
    enabled: bool,
    capturing: bool,
    width: u32,
    height: u32,
    pipeline: Option<Pipeline>,
}

impl BloomPostProcess {
    pub fn new(config: &BloomConfig) -> BloomPostProcess {
        BloomPostProcess {
            config: config.clone(),
            enabled: config.enabled,
            capturing: false,
            width: 0,
            height: 0,
            pipeline: None,
        }
    }

    pub fn state(&self) -> BloomState {
        match (&self.pipeline, self.capturing) {
            (None, _) => BloomState::Uninitialized,
            (Some(_), false) => BloomState::Ready,
            (Some(_), true) => BloomState::Capturing,
        }
    }

    /// Whether frames are actually being post-processed.
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.pipeline.is_some()
    }

    /// Takes effect from the next [`BloomPostProcess::begin_capture`].
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::info!("Bloom {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Allocates the offscreen targets and programs for a `width` x `height`
    /// screen, replacing any existing ones. A zero size only records the
    /// size. On failure everything created so far is freed and the effect
    /// disables itself.
    pub fn initialize(
        &mut self,
        gpu: &mut dyn Gpu,
        width: u32,
        height: u32,
    ) -> Result<(), ResourceError> {
        self.release_pipeline(gpu);
        self.width = width;
        self.height = height;
        if width == 0 || height == 0 {
            return Ok(());
        }
        match Pipeline::create(gpu, width, height, self.config.downsample) {
            Ok(pipeline) => {
                log::info!(
                    "Bloom initialized at {width}x{height} (1/{} for blur)",
                    self.config.downsample.max(1)
                );
                self.pipeline = Some(pipeline);
                Ok(())
            }
            Err(err) => {
                log::error!("Bloom disabled, could not create its resources: {err}");
                self.enabled = false;
                Err(err)
            }
        }
    }

    /// Reallocates for a new screen size, whether or not the effect is
    /// enabled. Keeps the current resources if the size did not change.
    pub fn resize(
        &mut self,
        gpu: &mut dyn Gpu,
        width: u32,
        height: u32,
    ) -> Result<(), ResourceError> {
        if (width, height) == (self.width, self.height) && self.pipeline.is_some() {
            return Ok(());
        }
        self.initialize(gpu, width, height)
    }

    /// Redirects subsequent draws offscreen. Returns false, leaving draws on
    /// the default target, if the effect is off or not initialized.
    pub fn begin_capture(&mut self, gpu: &mut dyn Gpu) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(pipeline) = &self.pipeline else {
            return false;
        };
        gpu.bind_render_target(Some(&pipeline.scene));
        gpu.viewport(self.width, self.height);
        gpu.clear();
        self.capturing = true;
        true
    }

    /// Runs the bright, blur and composite passes over the captured frame and
    /// writes the result to the default target. Does nothing unless a capture
    /// is active.
    pub fn end_capture_and_apply(&mut self, gpu: &mut dyn Gpu) {
        if !self.capturing {
            return;
        }
        self.capturing = false;
        let Some(pipeline) = &self.pipeline else {
            return;
        };

        gpu.set_depth_test(false);
        gpu.set_blend(false);

        let (small_width, small_height) = (pipeline.bright.width, pipeline.bright.height);
        gpu.bind_render_target(Some(&pipeline.bright));
        gpu.viewport(small_width, small_height);
        gpu.use_program(pipeline.bright_pass);
        gpu.bind_texture(0, Some(pipeline.scene.color));
        gpu.set_uniform(pipeline.bright_pass, "u_scene", Uniform::Int(0));
        gpu.set_uniform(
            pipeline.bright_pass,
            "u_threshold",
            Uniform::Float(self.config.threshold),
        );
        gpu.draw_elements(&pipeline.quad, 0, pipeline.quad.index_count);

        gpu.use_program(pipeline.blur_pass);
        gpu.set_uniform(pipeline.blur_pass, "u_image", Uniform::Int(0));
        let mut source = pipeline.bright.color;
        for pass in 0..self.config.blur_iterations * 2 {
            let horizontal = pass % 2 == 0;
            let (target, direction) = if horizontal {
                (&pipeline.blur[0], [1.0 / small_width as f32, 0.0])
            } else {
                (&pipeline.blur[1], [0.0, 1.0 / small_height as f32])
            };
            gpu.bind_render_target(Some(target));
            gpu.bind_texture(0, Some(source));
            gpu.set_uniform(pipeline.blur_pass, "u_direction", Uniform::Vec2(direction));
            gpu.draw_elements(&pipeline.quad, 0, pipeline.quad.index_count);
            source = target.color;
        }

        gpu.bind_render_target(None);
        gpu.viewport(self.width, self.height);
        gpu.use_program(pipeline.composite);
        gpu.bind_texture(0, Some(pipeline.scene.color));
        gpu.bind_texture(1, Some(source));
        gpu.set_uniform(pipeline.composite, "u_scene", Uniform::Int(0));
        gpu.set_uniform(pipeline.composite, "u_bloom", Uniform::Int(1));
        gpu.set_uniform(
            pipeline.composite,
            "u_intensity",
            Uniform::Float(self.config.intensity),
        );
        gpu.draw_elements(&pipeline.quad, 0, pipeline.quad.index_count);
        gpu.bind_texture(1, None);
        gpu.bind_texture(0, None);

        gpu.set_depth_test(true);
        gpu.set_blend(true);
    }

    /// Frees every GPU resource. Safe to call repeatedly and on a pipeline
    /// that never finished initializing.
    pub fn release(&mut self, gpu: &mut dyn Gpu) {
        self.release_pipeline(gpu);
        self.width = 0;
        self.height = 0;
    }

    fn release_pipeline(&mut self, gpu: &mut dyn Gpu) {
        self.capturing = false;
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.release(gpu);
            log::info!("Bloom resources released");
        }
    }
}
