//! Real-time renderer for an animated space backdrop: a frame loop over
//! polymorphic scene objects, a bloom post-process, procedural spheres and an
//! `.obj`/`.mtl` loader that groups geometry by material.

pub mod assets;
pub mod camera;
pub mod config;
pub mod error;
pub mod renderer;
pub mod scene;

pub use config::RendererConfig;
pub use error::RendererError;
pub use renderer::{LoopState, Renderer};
