use std::time::Instant;

use glam::Vec3;

use crate::camera::{CameraController, OrbitCamera};
use crate::config::RendererConfig;
use crate::error::RendererError;
use crate::scene::{is_known_scene, FrameContext, SceneComposer};

pub mod bloom;
pub mod gl;
pub mod gpu;
#[cfg(test)]
pub(crate) mod recording;
pub mod textures;

use bloom::BloomPostProcess;
use gpu::Gpu;
use textures::{FileTextureLibrary, TextureLibrary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No surface yet.
    Uninitialized,
    /// The scene is built; the next frame starts the clock.
    SceneReady,
    Running,
    Paused,
    /// Terminal.
    Disposed,
}

/// The frame loop. The host calls the `on_*` methods from the thread that
/// owns the GPU context, in the order the surface events happen.
pub struct Renderer<G: Gpu> {
    gpu: G,
    config: RendererConfig,
    state: LoopState,
    camera: Box<dyn CameraController>,
    textures: Box<dyn TextureLibrary>,
    scene: SceneComposer,
    bloom: BloomPostProcess,
    width: u32,
    height: u32,
    last_tick: Option<Instant>,
}

impl<G: Gpu> Renderer<G> {
    /// A renderer with an [`OrbitCamera`] and textures loaded from
    /// `config.assets_dir`.
    pub fn new(gpu: G, config: RendererConfig) -> Renderer<G> {
        let camera = Box::new(OrbitCamera::new(&config.camera));
        let textures = Box::new(FileTextureLibrary::new(config.assets_dir.clone()));
        Renderer::with_collaborators(gpu, config, camera, textures)
    }

    pub fn with_collaborators(
        gpu: G,
        config: RendererConfig,
        camera: Box<dyn CameraController>,
        textures: Box<dyn TextureLibrary>,
    ) -> Renderer<G> {
        Renderer {
            gpu,
            scene: SceneComposer::new(config.initial_scene.clone()),
            bloom: BloomPostProcess::new(&config.bloom),
            config,
            state: LoopState::Uninitialized,
            camera,
            textures,
            width: 0,
            height: 0,
            last_tick: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn gpu(&self) -> &G {
        &self.gpu
    }

    pub fn camera(&self) -> &dyn CameraController {
        self.camera.as_ref()
    }

    pub fn active_scene(&self) -> &str {
        self.scene.name()
    }

    pub fn scene(&self) -> &SceneComposer {
        &self.scene
    }

    /// Sets up a fresh GPU context and builds the active scene. Anything
    /// left from an earlier context is released first. If the scene fails to
    /// build, the error is returned but the loop still becomes ready and
    /// renders an empty scene.
    pub fn on_surface_created(&mut self) -> Result<(), RendererError> {
        if self.state == LoopState::Disposed {
            return Err(RendererError::Disposed);
        }
        self.release_gpu_resources();
        self.gpu.setup_default_state(self.config.clear_color);
        self.textures.initialize(&mut self.gpu);
        self.state = LoopState::SceneReady;
        self.last_tick = None;
        log::info!("Surface created");

        let name = self.scene.name().to_string();
        if let Err(err) = self
            .scene
            .activate(&name, &mut self.gpu, self.textures.as_mut())
        {
            log::warn!("Could not build scene {name:?}, rendering an empty one: {err}");
            return Err(err);
        }
        Ok(())
    }

    /// Applies a new surface size: viewport, projection, a reset camera view
    /// and bloom targets. Non-positive sizes, and sizes reported before the
    /// surface exists, are ignored.
    pub fn on_surface_changed(&mut self, width: i32, height: i32) -> Result<(), RendererError> {
        match self.state {
            LoopState::Disposed => return Err(RendererError::Disposed),
            LoopState::Uninitialized => {
                log::warn!("Ignoring surface size {width}x{height}, no surface yet");
                return Ok(());
            }
            _ => {}
        }
        if width <= 0 || height <= 0 {
            log::warn!("Ignoring surface size {width}x{height}");
            return Ok(());
        }
        let (width, height) = (width as u32, height as u32);
        self.width = width;
        self.height = height;
        self.gpu.viewport(width, height);

        let camera = &self.config.camera;
        self.camera.update_projection(width, height);
        self.camera.set_view(
            Vec3::from(camera.eye),
            Vec3::from(camera.center),
            Vec3::from(camera.up),
        );
        self.camera.start_zoom_loop(camera.zoom_far, camera.zoom_near);

        // Failures are logged by the effect, which then stays off.
        let _ = self.bloom.resize(&mut self.gpu, width, height);
        log::info!("Surface changed to {width}x{height}");
        Ok(())
    }

    pub fn on_draw_frame(&mut self) -> Result<(), RendererError> {
        self.on_draw_frame_at(Instant::now())
    }

    /// Runs one tick as if it happened at `now`.
    pub fn on_draw_frame_at(&mut self, now: Instant) -> Result<(), RendererError> {
        let dt = match self.state {
            LoopState::Disposed => return Err(RendererError::Disposed),
            LoopState::Uninitialized | LoopState::Paused => return Ok(()),
            LoopState::SceneReady => {
                self.state = LoopState::Running;
                0.0
            }
            LoopState::Running => self
                .last_tick
                .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32()),
        };
        self.last_tick = Some(now);

        self.camera.update(dt);
        self.scene.update(dt, self.camera.as_ref());
        let frame = FrameContext::from_camera(self.camera.as_ref(), self.width, self.height);

        if !self.bloom.begin_capture(&mut self.gpu) {
            self.gpu.bind_render_target(None);
            self.gpu.clear();
        }
        self.scene.draw(&mut self.gpu, &frame);
        self.bloom.end_capture_and_apply(&mut self.gpu);
        Ok(())
    }

    pub fn pause(&mut self) {
        if matches!(self.state, LoopState::SceneReady | LoopState::Running) {
            self.state = LoopState::Paused;
            log::info!("Paused");
        }
    }

    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    /// Resumes with `now` as the time of the last tick, so the pause does
    /// not count towards the next frame's delta.
    pub fn resume_at(&mut self, now: Instant) {
        if self.state == LoopState::Paused {
            self.state = LoopState::Running;
            self.last_tick = Some(now);
            log::info!("Resumed");
        }
    }

    /// Switches to the scene named `name`, tearing down the current one.
    /// Before the surface exists only the name is recorded.
    pub fn set_active_scene(&mut self, name: &str) -> Result<(), RendererError> {
        match self.state {
            LoopState::Disposed => return Err(RendererError::Disposed),
            _ if !is_known_scene(name) => {
                log::warn!("Unknown scene {name:?}, keeping {:?}", self.scene.name());
                return Err(RendererError::UnknownScene(name.to_string()));
            }
            _ if name == self.scene.name() => return Ok(()),
            LoopState::Uninitialized => {
                self.scene = SceneComposer::new(name);
                return Ok(());
            }
            _ => {}
        }
        self.scene
            .activate(name, &mut self.gpu, self.textures.as_mut())
    }

    pub fn adjust_camera_yaw(&mut self, delta_degrees: f32) {
        self.camera.add_orbit_offset(delta_degrees);
    }

    pub fn set_bloom_enabled(&mut self, enabled: bool) {
        self.bloom.set_enabled(enabled);
    }

    pub fn is_bloom_enabled(&self) -> bool {
        self.bloom.is_enabled()
    }

    /// Releases every GPU resource. No frames are accepted afterwards.
    pub fn dispose(&mut self) {
        if self.state == LoopState::Disposed {
            return;
        }
        self.release_gpu_resources();
        self.state = LoopState::Disposed;
        log::info!("Renderer disposed");
    }

    fn release_gpu_resources(&mut self) {
        self.scene.release(&mut self.gpu);
        self.bloom.release(&mut self.gpu);
        self.textures.release(&mut self.gpu);
    }
}

impl<G: Gpu> Drop for Renderer<G> {
    fn drop(&mut self) {
        self.dispose();
    }
}
