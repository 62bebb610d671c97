//! A [`Gpu`] that records calls instead of issuing them.

use std::collections::BTreeSet;

use crate::error::ResourceError;
use crate::renderer::gpu::{Gpu, GpuMesh, Program, RenderTarget, Texture, Uniform, VertexStreams};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetupDefaultState([f32; 4]),
    Viewport(u32, u32),
    Clear,
    DepthTest(bool),
    DepthWrite(bool),
    Blend(bool),
    CreateProgram(Program),
    DeleteProgram(Program),
    UseProgram(Program),
    SetUniform(Program, String, Uniform),
    CreateRenderTarget { framebuffer: u32, width: u32, height: u32 },
    DeleteRenderTarget(u32),
    /// Framebuffer id, `None` for the default target.
    BindRenderTarget(Option<u32>),
    CreateTexture(Texture),
    DeleteTexture(Texture),
    BindTexture(u32, Option<Texture>),
    UploadMesh { vertex_array: u32, index_count: usize },
    DeleteMesh(u32),
    DrawElements { vertex_array: u32, first_index: usize, index_count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Resource {
    Program(u32),
    Framebuffer(u32),
    Renderbuffer(u32),
    Texture(u32),
    VertexArray(u32),
}

#[derive(Debug, Default)]
pub struct RecordingGpu {
    pub calls: Vec<Call>,
    live: BTreeSet<Resource>,
    next_handle: u32,
    /// Deletes of handles that were not live.
    pub invalid_deletes: usize,
    /// Successful program creations left before they start failing.
    pub program_budget: Option<usize>,
    /// Successful render target creations left before they start failing.
    pub render_target_budget: Option<usize>,
}

impl RecordingGpu {
    pub fn new() -> RecordingGpu {
        RecordingGpu::default()
    }

    pub fn live_resources(&self) -> &BTreeSet<Resource> {
        &self.live
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn draw_count(&self) -> usize {
        self.count(|call| matches!(call, Call::DrawElements { .. }))
    }

    pub fn take_calls(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }

    fn handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn create(&mut self, resource: impl Fn(u32) -> Resource) -> u32 {
        let handle = self.handle();
        self.live.insert(resource(handle));
        handle
    }

    fn delete(&mut self, resource: Resource) {
        if !self.live.remove(&resource) {
            self.invalid_deletes += 1;
        }
    }

    fn spend(budget: &mut Option<usize>) -> bool {
        match budget {
            Some(0) => false,
            Some(left) => {
                *left -= 1;
                true
            }
            None => true,
        }
    }
}

impl Gpu for RecordingGpu {
    fn setup_default_state(&mut self, clear_color: [f32; 4]) {
        self.calls.push(Call::SetupDefaultState(clear_color));
    }

    fn viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::Viewport(width, height));
    }

    fn clear(&mut self) {
        self.calls.push(Call::Clear);
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(Call::DepthTest(enabled));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.calls.push(Call::DepthWrite(enabled));
    }

    fn set_blend(&mut self, enabled: bool) {
        self.calls.push(Call::Blend(enabled));
    }

    fn create_program(&mut self, _vertex: &str, _fragment: &str) -> Result<Program, ResourceError> {
        if !Self::spend(&mut self.program_budget) {
            return Err(ResourceError::ProgramLink("refused by test".to_string()));
        }
        let program = Program(self.create(Resource::Program));
        self.calls.push(Call::CreateProgram(program));
        Ok(program)
    }

    fn delete_program(&mut self, program: Program) {
        self.delete(Resource::Program(program.0));
        self.calls.push(Call::DeleteProgram(program));
    }

    fn use_program(&mut self, program: Program) {
        self.calls.push(Call::UseProgram(program));
    }

    fn set_uniform(&mut self, program: Program, name: &str, value: Uniform) {
        self.calls
            .push(Call::SetUniform(program, name.to_string(), value));
    }

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        with_depth: bool,
    ) -> Result<RenderTarget, ResourceError> {
        if !Self::spend(&mut self.render_target_budget) {
            return Err(ResourceError::IncompleteFramebuffer(0x8CD6));
        }
        let framebuffer = self.create(Resource::Framebuffer);
        let color = Texture(self.create(Resource::Texture));
        let depth = with_depth.then(|| self.create(Resource::Renderbuffer));
        self.calls.push(Call::CreateRenderTarget {
            framebuffer,
            width,
            height,
        });
        Ok(RenderTarget {
            framebuffer,
            color,
            depth,
            width,
            height,
        })
    }

    fn delete_render_target(&mut self, target: &RenderTarget) {
        self.delete(Resource::Framebuffer(target.framebuffer));
        self.delete(Resource::Texture(target.color.0));
        if let Some(depth) = target.depth {
            self.delete(Resource::Renderbuffer(depth));
        }
        self.calls.push(Call::DeleteRenderTarget(target.framebuffer));
    }

    fn bind_render_target(&mut self, target: Option<&RenderTarget>) {
        self.calls
            .push(Call::BindRenderTarget(target.map(|target| target.framebuffer)));
    }

    fn create_texture_rgba(
        &mut self,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Texture, ResourceError> {
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(ResourceError::Texture {
                name: String::new(),
                reason: "pixel count mismatch".to_string(),
            });
        }
        let texture = Texture(self.create(Resource::Texture));
        self.calls.push(Call::CreateTexture(texture));
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: Texture) {
        self.delete(Resource::Texture(texture.0));
        self.calls.push(Call::DeleteTexture(texture));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<Texture>) {
        self.calls.push(Call::BindTexture(unit, texture));
    }

    fn upload_mesh(&mut self, _streams: VertexStreams, indices: &[u32]) -> GpuMesh {
        let vertex_array = self.create(Resource::VertexArray);
        self.calls.push(Call::UploadMesh {
            vertex_array,
            index_count: indices.len(),
        });
        GpuMesh {
            vertex_array,
            buffers: Vec::new(),
            index_count: indices.len(),
        }
    }

    fn delete_mesh(&mut self, mesh: &GpuMesh) {
        self.delete(Resource::VertexArray(mesh.vertex_array));
        self.calls.push(Call::DeleteMesh(mesh.vertex_array));
    }

    fn draw_elements(&mut self, mesh: &GpuMesh, first_index: usize, index_count: usize) {
        self.calls.push(Call::DrawElements {
            vertex_array: mesh.vertex_array,
            first_index,
            index_count,
        });
    }
}
