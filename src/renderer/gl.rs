#![allow(clippy::all, non_upper_case_globals, non_snake_case, dead_code)]

use std::collections::HashMap;
use std::ffi::{c_void, CString};
use std::ptr;

use crate::error::ResourceError;
use crate::renderer::gpu::{
    Gpu, GpuMesh, Program, RenderTarget, Texture, Uniform, VertexStreams, ATTR_LOC_NORMAL,
    ATTR_LOC_POSITION, ATTR_LOC_TEXCOORD,
};

include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

/// Runs a GL call, and in debug builds panics if it raised an error.
macro_rules! call {
    ($expr:expr) => {{
        let result = unsafe { $expr };
        if cfg!(debug_assertions) {
            let error = unsafe { $crate::renderer::gl::GetError() };
            if error != $crate::renderer::gl::NO_ERROR {
                let error_number_stringified;
                let error_name = match error {
                    $crate::renderer::gl::INVALID_ENUM => "INVALID_ENUM",
                    $crate::renderer::gl::INVALID_VALUE => "INVALID_VALUE",
                    $crate::renderer::gl::INVALID_OPERATION => "INVALID_OPERATION",
                    $crate::renderer::gl::OUT_OF_MEMORY => "OUT_OF_MEMORY",
                    $crate::renderer::gl::INVALID_FRAMEBUFFER_OPERATION => {
                        "INVALID_FRAMEBUFFER_OPERATION"
                    }
                    _ => {
                        error_number_stringified = format!("{error}");
                        &error_number_stringified
                    }
                };
                panic!(
                    "OpenGL error {error_name} at {}:{}:{}",
                    file!(),
                    line!(),
                    column!(),
                );
            }
        }
        result
    }};
}
pub(crate) use call;

pub fn create_shader(shader_type: types::GLenum, source: &str) -> Result<types::GLuint, ResourceError> {
    let stage = if shader_type == VERTEX_SHADER {
        "vertex"
    } else {
        "fragment"
    };
    let shader = call!(CreateShader(shader_type));
    let sources = [source.as_bytes().as_ptr() as *const types::GLchar];
    let source_lens = [source.len() as types::GLint];
    call!(ShaderSource(shader, 1, sources.as_ptr(), source_lens.as_ptr()));
    call!(CompileShader(shader));
    let mut compile_status = 0;
    call!(GetShaderiv(shader, COMPILE_STATUS, &mut compile_status));
    if compile_status == FALSE as i32 {
        let mut info_log = [0u8; 4096];
        let mut length = 0;
        call!(GetShaderInfoLog(
            shader,
            info_log.len() as i32,
            &mut length,
            info_log.as_mut_ptr() as *mut types::GLchar,
        ));
        call!(DeleteShader(shader));
        let log = String::from_utf8_lossy(&info_log[..length.max(0) as usize]).into_owned();
        return Err(ResourceError::ShaderCompile { stage, log });
    }
    Ok(shader)
}

pub fn create_program(shaders: &[types::GLuint]) -> Result<types::GLuint, ResourceError> {
    let program = call!(CreateProgram());
    for &shader in shaders {
        call!(AttachShader(program, shader));
    }
    call!(LinkProgram(program));
    let mut link_status = 0;
    call!(GetProgramiv(program, LINK_STATUS, &mut link_status));
    if link_status == FALSE as i32 {
        let mut info_log = [0u8; 4096];
        let mut length = 0;
        call!(GetProgramInfoLog(
            program,
            info_log.len() as i32,
            &mut length,
            info_log.as_mut_ptr() as *mut types::GLchar,
        ));
        call!(DeleteProgram(program));
        let log = String::from_utf8_lossy(&info_log[..length.max(0) as usize]).into_owned();
        return Err(ResourceError::ProgramLink(log));
    }
    Ok(program)
}

pub fn get_uniform_location(program: types::GLuint, name: &str) -> Option<types::GLint> {
    let name = CString::new(name).ok()?;
    let location = call!(GetUniformLocation(program, name.as_ptr()));
    (location != -1).then_some(location)
}

pub fn buffer_data<T: bytemuck::Pod>(target: types::GLenum, data: &[T], usage: types::GLenum) {
    let data: &[u8] = bytemuck::cast_slice(data);
    call!(BufferData(
        target,
        data.len() as isize,
        data.as_ptr() as *const c_void,
        usage,
    ));
}

fn set_texture_parameters(filter: types::GLenum, wrap: types::GLenum) {
    call!(TexParameteri(TEXTURE_2D, TEXTURE_MIN_FILTER, filter as i32));
    call!(TexParameteri(TEXTURE_2D, TEXTURE_MAG_FILTER, filter as i32));
    call!(TexParameteri(TEXTURE_2D, TEXTURE_WRAP_S, wrap as i32));
    call!(TexParameteri(TEXTURE_2D, TEXTURE_WRAP_T, wrap as i32));
}

/// [`Gpu`] over the GLES 3.0 context that is current on this thread.
#[derive(Default)]
pub struct GlesGpu {
    uniform_locations: HashMap<(u32, String), Option<types::GLint>>,
}

impl GlesGpu {
    /// Loads the GL function pointers through `loader`. The context they
    /// belong to must stay current for the lifetime of the returned value.
    pub fn load<F>(loader: F) -> GlesGpu
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        load_with(loader);
        GlesGpu::default()
    }

    fn uniform_location(&mut self, program: Program, name: &str) -> Option<types::GLint> {
        if let Some(&location) = self.uniform_locations.get(&(program.0, name.to_string())) {
            return location;
        }
        let location = get_uniform_location(program.0, name);
        self.uniform_locations
            .insert((program.0, name.to_string()), location);
        location
    }

    fn upload_stream(&mut self, location: u32, components: i32, data: &[f32]) -> types::GLuint {
        let mut buffer = 0;
        call!(GenBuffers(1, &mut buffer));
        call!(BindBuffer(ARRAY_BUFFER, buffer));
        buffer_data(ARRAY_BUFFER, data, STATIC_DRAW);
        call!(EnableVertexAttribArray(location));
        call!(VertexAttribPointer(
            location,
            components,
            FLOAT,
            FALSE,
            0,
            ptr::null(),
        ));
        buffer
    }
}

impl Gpu for GlesGpu {
    fn setup_default_state(&mut self, [r, g, b, a]: [f32; 4]) {
        call!(Enable(DEPTH_TEST));
        call!(DepthFunc(LEQUAL));
        call!(Enable(BLEND));
        call!(BlendFunc(SRC_ALPHA, ONE_MINUS_SRC_ALPHA));
        call!(ClearColor(r, g, b, a));
    }

    fn viewport(&mut self, width: u32, height: u32) {
        call!(Viewport(0, 0, width as i32, height as i32));
    }

    fn clear(&mut self) {
        call!(Clear(COLOR_BUFFER_BIT | DEPTH_BUFFER_BIT));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        if enabled {
            call!(Enable(DEPTH_TEST));
        } else {
            call!(Disable(DEPTH_TEST));
        }
    }

    fn set_depth_write(&mut self, enabled: bool) {
        call!(DepthMask(if enabled { TRUE } else { FALSE }));
    }

    fn set_blend(&mut self, enabled: bool) {
        if enabled {
            call!(Enable(BLEND));
            call!(BlendFunc(SRC_ALPHA, ONE_MINUS_SRC_ALPHA));
        } else {
            call!(Disable(BLEND));
        }
    }

    fn create_program(&mut self, vertex: &str, fragment: &str) -> Result<Program, ResourceError> {
        let vertex_shader = create_shader(VERTEX_SHADER, vertex)?;
        let fragment_shader = match create_shader(FRAGMENT_SHADER, fragment) {
            Ok(shader) => shader,
            Err(err) => {
                call!(DeleteShader(vertex_shader));
                return Err(err);
            }
        };
        let program = create_program(&[vertex_shader, fragment_shader]);
        call!(DeleteShader(vertex_shader));
        call!(DeleteShader(fragment_shader));
        program.map(Program)
    }

    fn delete_program(&mut self, program: Program) {
        self.uniform_locations.retain(|(id, _), _| *id != program.0);
        call!(DeleteProgram(program.0));
    }

    fn use_program(&mut self, program: Program) {
        call!(UseProgram(program.0));
    }

    fn set_uniform(&mut self, program: Program, name: &str, value: Uniform) {
        let Some(location) = self.uniform_location(program, name) else {
            return;
        };
        match value {
            Uniform::Int(v) => call!(Uniform1i(location, v)),
            Uniform::Float(v) => call!(Uniform1f(location, v)),
            Uniform::Vec2(v) => call!(Uniform2fv(location, 1, v.as_ptr())),
            Uniform::Vec3(v) => call!(Uniform3fv(location, 1, v.as_ptr())),
            Uniform::Vec4(v) => call!(Uniform4fv(location, 1, v.as_ptr())),
            Uniform::Mat4(v) => call!(UniformMatrix4fv(location, 1, FALSE, v.as_ptr())),
        }
    }

    fn create_render_target(
        &mut self,
        width: u32,
        height: u32,
        with_depth: bool,
    ) -> Result<RenderTarget, ResourceError> {
        let (w, h) = (width as i32, height as i32);
        let mut framebuffer = 0;
        call!(GenFramebuffers(1, &mut framebuffer));
        call!(BindFramebuffer(FRAMEBUFFER, framebuffer));

        let mut color = 0;
        call!(GenTextures(1, &mut color));
        call!(BindTexture(TEXTURE_2D, color));
        call!(TexImage2D(
            TEXTURE_2D,
            0,
            RGBA8 as i32,
            w,
            h,
            0,
            RGBA,
            UNSIGNED_BYTE,
            ptr::null(),
        ));
        set_texture_parameters(LINEAR, CLAMP_TO_EDGE);
        call!(FramebufferTexture2D(
            FRAMEBUFFER,
            COLOR_ATTACHMENT0,
            TEXTURE_2D,
            color,
            0
        ));

        let depth = with_depth.then(|| {
            let mut renderbuffer = 0;
            call!(GenRenderbuffers(1, &mut renderbuffer));
            call!(BindRenderbuffer(RENDERBUFFER, renderbuffer));
            call!(RenderbufferStorage(RENDERBUFFER, DEPTH_COMPONENT16, w, h));
            call!(FramebufferRenderbuffer(
                FRAMEBUFFER,
                DEPTH_ATTACHMENT,
                RENDERBUFFER,
                renderbuffer
            ));
            renderbuffer
        });

        let status = call!(CheckFramebufferStatus(FRAMEBUFFER));
        call!(BindFramebuffer(FRAMEBUFFER, 0));
        call!(BindTexture(TEXTURE_2D, 0));
        let target = RenderTarget {
            framebuffer,
            color: Texture(color),
            depth,
            width,
            height,
        };
        if status != FRAMEBUFFER_COMPLETE {
            self.delete_render_target(&target);
            return Err(ResourceError::IncompleteFramebuffer(status));
        }
        Ok(target)
    }

    fn delete_render_target(&mut self, target: &RenderTarget) {
        call!(DeleteFramebuffers(1, &target.framebuffer));
        call!(DeleteTextures(1, &target.color.0));
        if let Some(depth) = &target.depth {
            call!(DeleteRenderbuffers(1, depth));
        }
    }

    fn bind_render_target(&mut self, target: Option<&RenderTarget>) {
        let framebuffer = target.map_or(0, |target| target.framebuffer);
        call!(BindFramebuffer(FRAMEBUFFER, framebuffer));
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
                reason: format!("expected {width}x{height} RGBA pixels, got {} bytes", pixels.len()),
            });
        }
        let mut texture = 0;
        call!(GenTextures(1, &mut texture));
        call!(BindTexture(TEXTURE_2D, texture));
        call!(PixelStorei(UNPACK_ALIGNMENT, 1));
        call!(TexImage2D(
            TEXTURE_2D,
            0,
            RGBA8 as i32,
            width as i32,
            height as i32,
            0,
            RGBA,
            UNSIGNED_BYTE,
            pixels.as_ptr() as *const c_void,
        ));
        call!(GenerateMipmap(TEXTURE_2D));
        call!(TexParameteri(
            TEXTURE_2D,
            TEXTURE_MIN_FILTER,
            LINEAR_MIPMAP_LINEAR as i32
        ));
        call!(TexParameteri(TEXTURE_2D, TEXTURE_MAG_FILTER, LINEAR as i32));
        call!(TexParameteri(TEXTURE_2D, TEXTURE_WRAP_S, REPEAT as i32));
        call!(TexParameteri(TEXTURE_2D, TEXTURE_WRAP_T, CLAMP_TO_EDGE as i32));
        call!(BindTexture(TEXTURE_2D, 0));
        Ok(Texture(texture))
    }

    fn delete_texture(&mut self, texture: Texture) {
        call!(DeleteTextures(1, &texture.0));
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<Texture>) {
        call!(ActiveTexture(TEXTURE0 + unit));
        call!(BindTexture(TEXTURE_2D, texture.map_or(0, |texture| texture.0)));
    }

    fn upload_mesh(&mut self, streams: VertexStreams, indices: &[u32]) -> GpuMesh {
        let mut vertex_array = 0;
        call!(GenVertexArrays(1, &mut vertex_array));
        call!(BindVertexArray(vertex_array));

        let mut buffers = vec![self.upload_stream(ATTR_LOC_POSITION, 3, streams.positions)];
        if let Some(normals) = streams.normals {
            buffers.push(self.upload_stream(ATTR_LOC_NORMAL, 3, normals));
        }
        if let Some(uvs) = streams.uvs {
            buffers.push(self.upload_stream(ATTR_LOC_TEXCOORD, 2, uvs));
        }

        let mut index_buffer = 0;
        call!(GenBuffers(1, &mut index_buffer));
        call!(BindBuffer(ELEMENT_ARRAY_BUFFER, index_buffer));
        buffer_data(ELEMENT_ARRAY_BUFFER, indices, STATIC_DRAW);
        buffers.push(index_buffer);

        call!(BindVertexArray(0));
        call!(BindBuffer(ARRAY_BUFFER, 0));
        GpuMesh {
            vertex_array,
            buffers,
            index_count: indices.len(),
        }
    }

    fn delete_mesh(&mut self, mesh: &GpuMesh) {
        call!(DeleteVertexArrays(1, &mesh.vertex_array));
        call!(DeleteBuffers(mesh.buffers.len() as i32, mesh.buffers.as_ptr()));
    }

    fn draw_elements(&mut self, mesh: &GpuMesh, first_index: usize, index_count: usize) {
        if index_count == 0 {
            return;
        }
        let offset = first_index * std::mem::size_of::<u32>();
        call!(BindVertexArray(mesh.vertex_array));
        call!(DrawElements(
            TRIANGLES,
            index_count as i32,
            UNSIGNED_INT,
            offset as *const c_void,
        ));
        call!(BindVertexArray(0));
    }
}
