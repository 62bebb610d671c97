//! The device interface everything above the GL layer draws through.
//!
//! Handles are plain ids. Whoever creates a resource owns it and must hand it
//! back to the matching `delete_*` call; nothing is freed implicitly.

use crate::error::ResourceError;

/// Vertex attribute locations shared by every shader.
pub const ATTR_LOC_POSITION: u32 = 0;
pub const ATTR_LOC_NORMAL: u32 = 1;
pub const ATTR_LOC_TEXCOORD: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Program(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Texture(pub u32);

/// An offscreen framebuffer with a sampleable color attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub framebuffer: u32,
    pub color: Texture,
    /// Depth renderbuffer, if one was requested.
    pub depth: Option<u32>,
    pub width: u32,
    pub height: u32,
}

/// Vertex and index buffers bound together in a vertex array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuMesh {
    pub vertex_array: u32,
    pub buffers: Vec<u32>,
    pub index_count: usize,
}

/// Borrowed attribute arrays for [`Gpu::upload_mesh`], one entry per vertex.
#[derive(Debug, Clone, Copy, Default)]
pub struct VertexStreams<'a> {
    pub positions: &'a [f32],
    pub normals: Option<&'a [f32]>,
    pub uvs: Option<&'a [f32]>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

pub trait Gpu {
    /// Depth testing on, standard alpha blending, the given clear color.
    fn setup_default_state(&mut self, clear_color: [f32; 4]);
    fn viewport(&mut self, width: u32, height: u32);
    /// Clears color and depth of the bound target.
    fn clear(&mut self);
    fn set_depth_test(&mut self, enabled: bool);
    fn set_depth_write(&mut self, enabled: bool);
    fn set_blend(&mut self, enabled: bool);

    fn create_program(&mut self, vertex: &str, fragment: &str) -> Result<Program, ResourceError>;
    fn delete_program(&mut self, program: Program);
    fn use_program(&mut self, program: Program);
    /// Sets a uniform of `program`, which must be in use. Unknown names are
    /// ignored, like the GL does for optimized-out uniforms.
    fn set_uniform(&mut self, program: Program, name: &str, value: Uniform);

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        with_depth: bool,
    ) -> Result<RenderTarget, ResourceError>;
    fn delete_render_target(&mut self, target: &RenderTarget);
    /// `None` binds the default (presentation) target.
    fn bind_render_target(&mut self, target: Option<&RenderTarget>);

    fn create_texture_rgba(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Texture, ResourceError>;
    fn delete_texture(&mut self, texture: Texture);
    fn bind_texture(&mut self, unit: u32, texture: Option<Texture>);

    fn upload_mesh(&mut self, streams: VertexStreams, indices: &[u32]) -> GpuMesh;
    fn delete_mesh(&mut self, mesh: &GpuMesh);
    /// Draws `index_count` indices starting at `first_index` as triangles.
    fn draw_elements(&mut self, mesh: &GpuMesh, first_index: usize, index_count: usize);
}

/// Uploads a quad covering clip space, for fullscreen passes.
pub fn upload_fullscreen_quad(gpu: &mut dyn Gpu) -> GpuMesh {
    const POSITIONS: [f32; 12] = [
        -1.0, -1.0, 0.0, //
        1.0, -1.0, 0.0, //
        1.0, 1.0, 0.0, //
        -1.0, 1.0, 0.0,
    ];
    const UVS: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
    let streams = VertexStreams {
        positions: &POSITIONS,
        normals: None,
        uvs: Some(&UVS),
    };
    gpu.upload_mesh(streams, &[0, 1, 2, 0, 2, 3])
}

/// Vertex shader for fullscreen passes: passes the quad's UVs through.
pub const FULLSCREEN_VERTEX_SHADER: &str = r#"#version 300 es
layout(location = 0) in vec3 POSITION;
layout(location = 2) in vec2 TEXCOORD;
out vec2 uv;
void main() {
    uv = TEXCOORD;
    gl_Position = vec4(POSITION.xy, 0.0, 1.0);
}
"#;
