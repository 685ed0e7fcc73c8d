//! OpenGL device over `glow`
//!
//! Every GL entry point is `unsafe`: callers must guarantee the context the
//! functions were loaded from is current on this thread. The window layer
//! only builds a [`GlDevice`] right after making its context current, and
//! the engine never switches threads.

use super::{
    log_debug_message, ActiveVariable, BufferId, ClearFlags, DataType, DebugMessage, DebugSeverity,
    DeviceError, GlslType, GraphicsDevice, PixelFormat, ProgramId, ShaderId, ShaderStage,
    TextureFilter, TextureId, TextureUpload, TextureWrap, UniformLocation, UniformValue,
    VertexArrayId, VertexAttribPointer,
};
use glow::HasContext;
use std::num::NonZeroU32;

/// Graphics device backed by a loaded OpenGL context
pub struct GlDevice {
    gl: glow::Context,
}

impl GlDevice {
    /// Wrap a loaded context
    ///
    /// With `debug` set and driver support present, debug output is enabled
    /// and routed through [`log_debug_message`]. Depth testing is switched on.
    pub fn new(mut gl: glow::Context, debug: bool) -> Self {
        unsafe {
            if debug && gl.supports_debug() {
                gl.enable(glow::DEBUG_OUTPUT);
                gl.enable(glow::DEBUG_OUTPUT_SYNCHRONOUS);
                gl.debug_message_callback(|source, kind, id, severity, message| {
                    log_debug_message(&DebugMessage {
                        source,
                        kind,
                        id,
                        severity: severity_from_gl(severity),
                        message: message.to_string(),
                    });
                });
                log::info!("GL debug output enabled");
            }
            gl.enable(glow::DEPTH_TEST);
        }
        Self { gl }
    }

    /// The wrapped context
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn severity_from_gl(severity: u32) -> DebugSeverity {
    match severity {
        glow::DEBUG_SEVERITY_HIGH => DebugSeverity::High,
        glow::DEBUG_SEVERITY_MEDIUM => DebugSeverity::Medium,
        glow::DEBUG_SEVERITY_LOW => DebugSeverity::Low,
        _ => DebugSeverity::Notification,
    }
}

fn stage_to_gl(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

fn data_type_to_gl(data_type: DataType) -> u32 {
    match data_type {
        DataType::Byte => glow::BYTE,
        DataType::UnsignedByte => glow::UNSIGNED_BYTE,
        DataType::Short => glow::SHORT,
        DataType::UnsignedShort => glow::UNSIGNED_SHORT,
        DataType::Int => glow::INT,
        DataType::UnsignedInt => glow::UNSIGNED_INT,
        DataType::Float => glow::FLOAT,
        DataType::Double => glow::DOUBLE,
    }
}

fn format_to_gl(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Red => glow::RED,
        PixelFormat::Rg => glow::RG,
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::Rgba => glow::RGBA,
    }
}

fn wrap_to_gl(wrap: TextureWrap) -> i32 {
    (match wrap {
        TextureWrap::Repeat => glow::REPEAT,
        TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        TextureWrap::MirroredRepeat => glow::MIRRORED_REPEAT,
    }) as i32
}

fn filters_to_gl(filter: TextureFilter, mipmaps: bool) -> (i32, i32) {
    let (min, mag) = match (filter, mipmaps) {
        (TextureFilter::Linear, true) => (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR),
        (TextureFilter::Linear, false) => (glow::LINEAR, glow::LINEAR),
        (TextureFilter::Nearest, true) => (glow::NEAREST_MIPMAP_NEAREST, glow::NEAREST),
        (TextureFilter::Nearest, false) => (glow::NEAREST, glow::NEAREST),
    };
    (min as i32, mag as i32)
}

fn glsl_type_from_gl(ty: u32) -> GlslType {
    match ty {
        glow::FLOAT => GlslType::Float,
        glow::FLOAT_VEC2 => GlslType::Vec2,
        glow::FLOAT_VEC3 => GlslType::Vec3,
        glow::FLOAT_VEC4 => GlslType::Vec4,
        glow::DOUBLE => GlslType::Double,
        glow::INT => GlslType::Int,
        glow::INT_VEC2 => GlslType::IVec2,
        glow::INT_VEC3 => GlslType::IVec3,
        glow::INT_VEC4 => GlslType::IVec4,
        glow::UNSIGNED_INT => GlslType::UInt,
        glow::UNSIGNED_INT_VEC2 => GlslType::UVec2,
        glow::UNSIGNED_INT_VEC3 => GlslType::UVec3,
        glow::UNSIGNED_INT_VEC4 => GlslType::UVec4,
        glow::BOOL => GlslType::Bool,
        glow::BOOL_VEC2 => GlslType::BVec2,
        glow::BOOL_VEC3 => GlslType::BVec3,
        glow::BOOL_VEC4 => GlslType::BVec4,
        glow::FLOAT_MAT2 => GlslType::Mat2,
        glow::FLOAT_MAT3 => GlslType::Mat3,
        glow::FLOAT_MAT4 => GlslType::Mat4,
        glow::SAMPLER_2D => GlslType::Sampler2D,
        glow::SAMPLER_CUBE => GlslType::SamplerCube,
        other => GlslType::Other(other),
    }
}

fn creation_failed(kind: &'static str) -> impl FnOnce(String) -> DeviceError {
    move |reason| DeviceError::CreationFailed { kind, reason }
}

fn native_shader(id: ShaderId) -> Option<glow::NativeShader> {
    NonZeroU32::new(id.0).map(glow::NativeShader)
}

fn native_program(id: ProgramId) -> Option<glow::NativeProgram> {
    NonZeroU32::new(id.0).map(glow::NativeProgram)
}

fn native_buffer(id: BufferId) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(id.0).map(glow::NativeBuffer)
}

fn native_vertex_array(id: VertexArrayId) -> Option<glow::NativeVertexArray> {
    NonZeroU32::new(id.0).map(glow::NativeVertexArray)
}

fn native_texture(id: TextureId) -> Option<glow::NativeTexture> {
    NonZeroU32::new(id.0).map(glow::NativeTexture)
}

impl GraphicsDevice for GlDevice {
    fn backend_name(&self) -> &'static str {
        "opengl"
    }

    fn clear_color(&self, color: [f32; 4]) {
        unsafe { self.gl.clear_color(color[0], color[1], color[2], color[3]) }
    }

    fn clear(&self, flags: ClearFlags) {
        let mut mask = 0;
        if flags.contains(ClearFlags::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::STENCIL) {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        unsafe { self.gl.clear(mask) }
    }

    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn set_depth_test(&self, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
        }
    }

    fn get_error(&self) -> Option<u32> {
        match unsafe { self.gl.get_error() } {
            glow::NO_ERROR => None,
            code => Some(code),
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId, DeviceError> {
        unsafe { self.gl.create_shader(stage_to_gl(stage)) }
            .map(|shader| ShaderId(shader.0.get()))
            .map_err(creation_failed("shader"))
    }

    fn compile_shader(&self, shader: ShaderId, source: &str) -> Result<(), String> {
        let native = native_shader(shader).ok_or("null shader handle")?;
        unsafe {
            self.gl.shader_source(native, source);
            self.gl.compile_shader(native);
            if self.gl.get_shader_compile_status(native) {
                Ok(())
            } else {
                Err(self.gl.get_shader_info_log(native))
            }
        }
    }

    fn delete_shader(&self, shader: ShaderId) {
        if let Some(native) = native_shader(shader) {
            unsafe { self.gl.delete_shader(native) }
        }
    }

    fn create_program(&self) -> Result<ProgramId, DeviceError> {
        unsafe { self.gl.create_program() }
            .map(|program| ProgramId(program.0.get()))
            .map_err(creation_failed("program"))
    }

    fn link_program(&self, program: ProgramId, stages: &[ShaderId]) -> Result<(), String> {
        let native = native_program(program).ok_or("null program handle")?;
        let shaders: Vec<_> = stages.iter().filter_map(|id| native_shader(*id)).collect();
        unsafe {
            for shader in &shaders {
                self.gl.attach_shader(native, *shader);
            }
            self.gl.link_program(native);
            for shader in &shaders {
                self.gl.detach_shader(native, *shader);
            }
            if self.gl.get_program_link_status(native) {
                Ok(())
            } else {
                Err(self.gl.get_program_info_log(native))
            }
        }
    }

    fn delete_program(&self, program: ProgramId) {
        if let Some(native) = native_program(program) {
            unsafe { self.gl.delete_program(native) }
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        unsafe { self.gl.use_program(program.and_then(native_program)) }
    }

    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveVariable> {
        let Some(native) = native_program(program) else {
            return Vec::new();
        };
        unsafe {
            (0..self.gl.get_active_attributes(native))
                .filter_map(|index| self.gl.get_active_attribute(native, index))
                .map(|attribute| ActiveVariable {
                    name: attribute.name,
                    ty: glsl_type_from_gl(attribute.atype),
                    size: attribute.size,
                })
                .collect()
        }
    }

    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveVariable> {
        let Some(native) = native_program(program) else {
            return Vec::new();
        };
        unsafe {
            (0..self.gl.get_active_uniforms(native))
                .filter_map(|index| self.gl.get_active_uniform(native, index))
                .map(|uniform| ActiveVariable {
                    name: uniform.name,
                    ty: glsl_type_from_gl(uniform.utype),
                    size: uniform.size,
                })
                .collect()
        }
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let native = native_program(program)?;
        unsafe { self.gl.get_attrib_location(native, name) }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let native = native_program(program)?;
        unsafe { self.gl.get_uniform_location(native, name) }.map(|location| UniformLocation(location.0 as i32))
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let native = glow::NativeUniformLocation(location.0 as u32);
        let location = Some(&native);
        unsafe {
            match *value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(location, v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(location, v),
                UniformValue::Vec2([x, y]) => self.gl.uniform_2_f32(location, x, y),
                UniformValue::Vec3([x, y, z]) => self.gl.uniform_3_f32(location, x, y, z),
                UniformValue::Vec4([x, y, z, w]) => self.gl.uniform_4_f32(location, x, y, z, w),
                UniformValue::Mat4(ref m) => self.gl.uniform_matrix_4_f32_slice(location, false, m),
            }
        }
    }

    fn create_buffer(&self) -> Result<BufferId, DeviceError> {
        unsafe { self.gl.create_buffer() }
            .map(|buffer| BufferId(buffer.0.get()))
            .map_err(creation_failed("buffer"))
    }

    fn bind_vertex_buffer(&self, buffer: Option<BufferId>) {
        unsafe { self.gl.bind_buffer(glow::ARRAY_BUFFER, buffer.and_then(native_buffer)) }
    }

    fn upload_vertex_data(&self, buffer: BufferId, data: &[u8]) {
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, native_buffer(buffer));
            self.gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, glow::STATIC_DRAW);
        }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        if let Some(native) = native_buffer(buffer) {
            unsafe { self.gl.delete_buffer(native) }
        }
    }

    fn create_vertex_array(&self) -> Result<VertexArrayId, DeviceError> {
        unsafe { self.gl.create_vertex_array() }
            .map(|vao| VertexArrayId(vao.0.get()))
            .map_err(creation_failed("vertex array"))
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayId>) {
        unsafe { self.gl.bind_vertex_array(vao.and_then(native_vertex_array)) }
    }

    fn delete_vertex_array(&self, vao: VertexArrayId) {
        if let Some(native) = native_vertex_array(vao) {
            unsafe { self.gl.delete_vertex_array(native) }
        }
    }

    fn vertex_attrib_pointer(&self, pointer: &VertexAttribPointer) {
        let ty = data_type_to_gl(pointer.data_type);
        unsafe {
            if pointer.data_type.is_integer() && !pointer.normalized {
                self.gl.vertex_attrib_pointer_i32(
                    pointer.location,
                    pointer.components,
                    ty,
                    pointer.stride,
                    pointer.offset,
                );
            } else {
                self.gl.vertex_attrib_pointer_f32(
                    pointer.location,
                    pointer.components,
                    ty,
                    pointer.normalized,
                    pointer.stride,
                    pointer.offset,
                );
            }
        }
    }

    fn enable_vertex_attrib(&self, location: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(location) }
    }

    fn draw_triangles(&self, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(glow::TRIANGLES, first, count) }
    }

    fn create_texture(&self) -> Result<TextureId, DeviceError> {
        unsafe { self.gl.create_texture() }
            .map(|texture| TextureId(texture.0.get()))
            .map_err(creation_failed("texture"))
    }

    fn upload_texture_2d(&self, texture: TextureId, upload: &TextureUpload<'_>) {
        let format = format_to_gl(upload.format);
        let wrap = wrap_to_gl(upload.wrap);
        let (min_filter, mag_filter) = filters_to_gl(upload.filter, upload.generate_mipmaps);
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, native_texture(texture));
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, min_filter);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mag_filter);
            // Rows of 1- and 3-channel images are not 4-byte aligned
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                format as i32,
                upload.width as i32,
                upload.height as i32,
                0,
                format,
                glow::UNSIGNED_BYTE,
                Some(upload.pixels),
            );
            if upload.generate_mipmaps {
                self.gl.generate_mipmap(glow::TEXTURE_2D);
            }
        }
    }

    fn active_texture_unit(&self, slot: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + slot) }
    }

    fn bind_texture_2d(&self, texture: Option<TextureId>) {
        unsafe { self.gl.bind_texture(glow::TEXTURE_2D, texture.and_then(native_texture)) }
    }

    fn delete_texture(&self, texture: TextureId) {
        if let Some(native) = native_texture(texture) {
            unsafe { self.gl.delete_texture(native) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity_from_gl(glow::DEBUG_SEVERITY_HIGH), DebugSeverity::High);
        assert_eq!(severity_from_gl(glow::DEBUG_SEVERITY_NOTIFICATION), DebugSeverity::Notification);
    }

    #[test]
    fn test_type_mapping() {
        assert_eq!(glsl_type_from_gl(glow::FLOAT_VEC3), GlslType::Vec3);
        assert_eq!(glsl_type_from_gl(glow::SAMPLER_2D), GlslType::Sampler2D);
        assert_eq!(glsl_type_from_gl(0xDEAD), GlslType::Other(0xDEAD));
        assert_eq!(data_type_to_gl(DataType::Float), glow::FLOAT);
        assert_eq!(format_to_gl(PixelFormat::Rgb), glow::RGB);
    }

    #[test]
    fn test_filters_follow_mipmapping() {
        assert_eq!(
            filters_to_gl(TextureFilter::Linear, true),
            (glow::LINEAR_MIPMAP_LINEAR as i32, glow::LINEAR as i32)
        );
        assert_eq!(wrap_to_gl(TextureWrap::Repeat), glow::REPEAT as i32);
    }

    #[test]
    fn test_null_handles_have_no_native_object() {
        assert!(native_program(ProgramId(0)).is_none());
        assert!(native_buffer(BufferId(7)).is_some());
    }
}
