use std::error::Error;
use std::ffi::c_void;
use std::fmt::Display;
use std::path::Path;

use anyhow::Context;
use sdl2::event::{Event, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::video::GLProfile;

use backdrop::renderer::gl::GlesGpu;
use backdrop::{Renderer, RendererConfig};

const CONFIG_PATH: &str = "backdrop.toml";
const YAW_STEP_DEGREES: f32 = 5.0;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = if Path::new(CONFIG_PATH).exists() {
        RendererConfig::load(CONFIG_PATH).with_context(|| format!("loading {CONFIG_PATH}"))?
    } else {
        log::info!("No {CONFIG_PATH}, using the default configuration");
        RendererConfig::default()
    };

    let sdl_context = sdl2::init().map_err(SdlErr)?;
    let video_subsystem = sdl_context.video().map_err(SdlErr)?;
    let gl_attr = video_subsystem.gl_attr();
    gl_attr.set_context_profile(GLProfile::GLES);
    gl_attr.set_context_version(3, 0);
    gl_attr.set_depth_size(16);
    // Tone mapping happens in the shaders, the framebuffer stays linear.
    gl_attr.set_framebuffer_srgb_compatible(false);
    let window = video_subsystem
        .window(env!("CARGO_PKG_NAME"), 948, 533)
        .resizable()
        .opengl()
        .build()?;
    let _gl_context = window.gl_create_context().map_err(SdlErr)?;
    video_subsystem.gl_set_swap_interval(1).map_err(SdlErr)?;
    let mut event_pump = sdl_context.event_pump().map_err(SdlErr)?;

    let gpu = GlesGpu::load(|s| video_subsystem.gl_get_proc_address(s) as *const c_void);
    let mut renderer = Renderer::new(gpu, config);
    if let Err(err) = renderer.on_surface_created() {
        log::error!("{err}");
    }
    let (width, height) = window.drawable_size();
    renderer.on_surface_changed(width as i32, height as i32)?;

    'running: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'running,
                Event::Window { win_event, .. } => match win_event {
                    WindowEvent::SizeChanged(..) => {
                        let (w, h) = window.drawable_size();
                        renderer.on_surface_changed(w as i32, h as i32)?;
                    }
                    WindowEvent::FocusLost | WindowEvent::Minimized => renderer.pause(),
                    WindowEvent::FocusGained | WindowEvent::Restored => renderer.resume(),
                    _ => {}
                },
                Event::KeyDown {
                    keycode: Some(keycode),
                    ..
                } => match keycode {
                    Keycode::Left => renderer.adjust_camera_yaw(-YAW_STEP_DEGREES),
                    Keycode::Right => renderer.adjust_camera_yaw(YAW_STEP_DEGREES),
                    Keycode::B => {
                        let enabled = !renderer.is_bloom_enabled();
                        renderer.set_bloom_enabled(enabled);
                    }
                    Keycode::Num1 => switch_scene(&mut renderer, "cosmic-battle"),
                    Keycode::Num2 => switch_scene(&mut renderer, "universe"),
                    _ => {}
                },
                _ => {}
            }
        }

        renderer.on_draw_frame()?;
        window.gl_swap_window();
    }

    renderer.dispose();
    Ok(())
}

fn switch_scene(renderer: &mut Renderer<GlesGpu>, name: &str) {
    if let Err(err) = renderer.set_active_scene(name) {
        log::error!("Switching to {name:?} failed: {err}");
    }
}

#[derive(Debug)]
pub struct SdlErr(String);
impl Display for SdlErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sdl error: {}", self.0)
    }
}
impl Error for SdlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}
