//! # GPU Device Boundary
//!
//! Immediate-mode graphics calls keyed by small integer handles. Resource
//! wrappers ([`Shader`](crate::render::Shader), [`Texture`](crate::render::Texture),
//! [`Primitive`](crate::render::Primitive)) only ever talk to a
//! [`GraphicsDevice`], so the same code drives a real OpenGL context through
//! [`GlDevice`] or the call-recording [`HeadlessDevice`].
//!
//! A device only exists once a window has made its context current, which is
//! what makes "GPU call before context" unrepresentable.

mod gl;
mod headless;
mod reflect;

pub use gl::GlDevice;
pub use headless::{DeviceCall, HeadlessDevice, TextureInfo};

use bitflags::bitflags;
use std::rc::Rc;
use thiserror::Error;

/// Shared handle to the active device
pub type DeviceRef = Rc<dyn GraphicsDevice>;

macro_rules! handle {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);
    };
}

handle!(
    /// Compiled shader stage
    ShaderId
);
handle!(
    /// Linked shader program
    ProgramId
);
handle!(
    /// Vertex buffer object
    BufferId
);
handle!(
    /// Vertex array object
    VertexArrayId
);
handle!(
    /// 2D texture object
    TextureId
);

/// Location of a uniform inside the program it was queried from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Device errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The driver refused to allocate an object
    #[error("failed to create {kind}: {reason}")]
    CreationFailed {
        /// Object kind
        kind: &'static str,
        /// Driver message
        reason: String,
    },
}

/// Shader pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl ShaderStage {
    /// Stage name used in logs
    pub fn label(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }
}

/// Scalar component type of a vertex attribute or GLSL variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Signed 8-bit
    Byte,
    /// Unsigned 8-bit
    UnsignedByte,
    /// Signed 16-bit
    Short,
    /// Unsigned 16-bit
    UnsignedShort,
    /// Signed 32-bit
    Int,
    /// Unsigned 32-bit
    UnsignedInt,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
}

impl DataType {
    /// Size of one component in bytes
    pub fn size_bytes(self) -> usize {
        match self {
            Self::Byte | Self::UnsignedByte => 1,
            Self::Short | Self::UnsignedShort => 2,
            Self::Int | Self::UnsignedInt | Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// Integer types must be fed through the integer attribute path
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::Float | Self::Double)
    }
}

/// Type of an active program variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlslType {
    /// `float`
    Float,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `double`
    Double,
    /// `int`
    Int,
    /// `ivec2`
    IVec2,
    /// `ivec3`
    IVec3,
    /// `ivec4`
    IVec4,
    /// `uint`
    UInt,
    /// `uvec2`
    UVec2,
    /// `uvec3`
    UVec3,
    /// `uvec4`
    UVec4,
    /// `bool`
    Bool,
    /// `bvec2`
    BVec2,
    /// `bvec3`
    BVec3,
    /// `bvec4`
    BVec4,
    /// `mat2`
    Mat2,
    /// `mat3`
    Mat3,
    /// `mat4`
    Mat4,
    /// `sampler2D`
    Sampler2D,
    /// `samplerCube`
    SamplerCube,
    /// Anything else, with the raw GL enum
    Other(u32),
}

impl GlslType {
    /// Parse a GLSL type keyword
    pub fn from_glsl_name(name: &str) -> Option<Self> {
        Some(match name {
            "float" => Self::Float,
            "vec2" => Self::Vec2,
            "vec3" => Self::Vec3,
            "vec4" => Self::Vec4,
            "double" => Self::Double,
            "int" => Self::Int,
            "ivec2" => Self::IVec2,
            "ivec3" => Self::IVec3,
            "ivec4" => Self::IVec4,
            "uint" => Self::UInt,
            "uvec2" => Self::UVec2,
            "uvec3" => Self::UVec3,
            "uvec4" => Self::UVec4,
            "bool" => Self::Bool,
            "bvec2" => Self::BVec2,
            "bvec3" => Self::BVec3,
            "bvec4" => Self::BVec4,
            "mat2" => Self::Mat2,
            "mat3" => Self::Mat3,
            "mat4" => Self::Mat4,
            "sampler2D" => Self::Sampler2D,
            "samplerCube" => Self::SamplerCube,
            _ => return None,
        })
    }

    /// Number of scalar components
    pub fn components(self) -> i32 {
        match self {
            Self::Float | Self::Double | Self::Int | Self::UInt | Self::Bool => 1,
            Self::Vec2 | Self::IVec2 | Self::UVec2 | Self::BVec2 => 2,
            Self::Vec3 | Self::IVec3 | Self::UVec3 | Self::BVec3 => 3,
            Self::Vec4 | Self::IVec4 | Self::UVec4 | Self::BVec4 | Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
            Self::Sampler2D | Self::SamplerCube | Self::Other(_) => 1,
        }
    }

    /// Scalar type of each component
    pub fn base_type(self) -> DataType {
        match self {
            Self::Float | Self::Vec2 | Self::Vec3 | Self::Vec4 => DataType::Float,
            Self::Mat2 | Self::Mat3 | Self::Mat4 => DataType::Float,
            Self::Double => DataType::Double,
            Self::Int | Self::IVec2 | Self::IVec3 | Self::IVec4 => DataType::Int,
            Self::Bool | Self::BVec2 | Self::BVec3 | Self::BVec4 => DataType::Int,
            Self::Sampler2D | Self::SamplerCube | Self::Other(_) => DataType::Int,
            Self::UInt | Self::UVec2 | Self::UVec3 | Self::UVec4 => DataType::UnsignedInt,
        }
    }

    /// Bytes one value of this type occupies in a vertex
    pub fn size_bytes(self) -> usize {
        self.components() as usize * self.base_type().size_bytes()
    }
}

/// An active attribute or uniform reported by a linked program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveVariable {
    /// Name as the driver reports it (`arr[0]` for arrays)
    pub name: String,
    /// Variable type
    pub ty: GlslType,
    /// Array length, 1 for non-arrays
    pub size: i32,
}

/// Value for a uniform upload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// `int`, `bool` or sampler unit
    Int(i32),
    /// `float`
    Float(f32),
    /// `vec2`
    Vec2([f32; 2]),
    /// `vec3`
    Vec3([f32; 3]),
    /// `vec4`
    Vec4([f32; 4]),
    /// `mat4`, column-major
    Mat4([f32; 16]),
}

/// One `glVertexAttribPointer` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribPointer {
    /// Attribute location
    pub location: u32,
    /// Components per vertex
    pub components: i32,
    /// Component type
    pub data_type: DataType,
    /// Normalize fixed-point values
    pub normalized: bool,
    /// Bytes between consecutive vertices
    pub stride: i32,
    /// Byte offset of the first component
    pub offset: i32,
}

/// Pixel layout of uploaded texture data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One channel
    Red,
    /// Two channels
    Rg,
    /// Three channels
    Rgb,
    /// Four channels
    Rgba,
}

impl PixelFormat {
    /// Format for a channel count, if supported
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(Self::Red),
            2 => Some(Self::Rg),
            3 => Some(Self::Rgb),
            4 => Some(Self::Rgba),
            _ => None,
        }
    }

    /// Channels per pixel
    pub fn channels(self) -> usize {
        match self {
            Self::Red => 1,
            Self::Rg => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// Texture coordinate wrapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    /// Tile
    Repeat,
    /// Clamp to the edge texel
    ClampToEdge,
    /// Tile mirrored
    MirroredRepeat,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    /// Bilinear
    Linear,
    /// Point sampling
    Nearest,
}

/// Everything needed to fill a 2D texture
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel layout of `pixels`
    pub format: PixelFormat,
    /// Tightly packed 8-bit pixel rows
    pub pixels: &'a [u8],
    /// Wrap mode on both axes
    pub wrap: TextureWrap,
    /// Min and mag filter
    pub filter: TextureFilter,
    /// Build the mipmap chain after upload
    pub generate_mipmaps: bool,
}

bitflags! {
    /// Buffers cleared by [`GraphicsDevice::clear`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        /// Color buffer
        const COLOR = 0b001;
        /// Depth buffer
        const DEPTH = 0b010;
        /// Stencil buffer
        const STENCIL = 0b100;
    }
}

/// Immediate-mode graphics device
///
/// Methods take `&self`; implementations keep whatever interior state they
/// need. Deleting an object the device does not know is a no-op.
pub trait GraphicsDevice {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    /// Set the color used by [`GraphicsDevice::clear`]
    fn clear_color(&self, color: [f32; 4]);
    /// Clear the selected buffers of the current framebuffer
    fn clear(&self, flags: ClearFlags);
    /// Set the viewport rectangle
    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32);
    /// Toggle depth testing
    fn set_depth_test(&self, enabled: bool);
    /// Pop the oldest pending error code
    fn get_error(&self) -> Option<u32>;

    /// Allocate a shader stage object
    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId, DeviceError>;
    /// Compile source into a stage; `Err` carries the info log
    fn compile_shader(&self, shader: ShaderId, source: &str) -> Result<(), String>;
    /// Release a stage object
    fn delete_shader(&self, shader: ShaderId);
    /// Allocate a program object
    fn create_program(&self) -> Result<ProgramId, DeviceError>;
    /// Attach stages, link, detach; `Err` carries the info log
    fn link_program(&self, program: ProgramId, stages: &[ShaderId]) -> Result<(), String>;
    /// Release a program
    fn delete_program(&self, program: ProgramId);
    /// Make a program current, or none
    fn use_program(&self, program: Option<ProgramId>);
    /// Active vertex inputs of a linked program
    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveVariable>;
    /// Active uniforms of a linked program
    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveVariable>;
    /// Location of a vertex input
    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    /// Location of a uniform
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    /// Upload a uniform value to the current program
    fn set_uniform(&self, location: UniformLocation, value: &UniformValue);

    /// Allocate a buffer object
    fn create_buffer(&self) -> Result<BufferId, DeviceError>;
    /// Bind a buffer to the vertex-array target
    fn bind_vertex_buffer(&self, buffer: Option<BufferId>);
    /// Bind `buffer` and fill it with static vertex data
    fn upload_vertex_data(&self, buffer: BufferId, data: &[u8]);
    /// Release a buffer
    fn delete_buffer(&self, buffer: BufferId);
    /// Allocate a vertex array object
    fn create_vertex_array(&self) -> Result<VertexArrayId, DeviceError>;
    /// Bind a vertex array, or none
    fn bind_vertex_array(&self, vao: Option<VertexArrayId>);
    /// Release a vertex array
    fn delete_vertex_array(&self, vao: VertexArrayId);
    /// Describe one attribute stream of the bound buffer
    fn vertex_attrib_pointer(&self, pointer: &VertexAttribPointer);
    /// Enable an attribute location on the bound vertex array
    fn enable_vertex_attrib(&self, location: u32);
    /// Draw non-indexed triangles from the bound vertex array
    fn draw_triangles(&self, first: i32, count: i32);

    /// Allocate a texture object
    fn create_texture(&self) -> Result<TextureId, DeviceError>;
    /// Bind `texture` and upload pixels with sampling state
    fn upload_texture_2d(&self, texture: TextureId, upload: &TextureUpload<'_>);
    /// Select the texture unit later binds apply to
    fn active_texture_unit(&self, slot: u32);
    /// Bind a 2D texture to the active unit
    fn bind_texture_2d(&self, texture: Option<TextureId>);
    /// Release a texture
    fn delete_texture(&self, texture: TextureId);
}

/// Clear color and depth to an opaque color
pub fn clear_screen(device: &dyn GraphicsDevice, r: f32, g: f32, b: f32) {
    device.clear_color([r, g, b, 1.0]);
    device.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
}

/// Drain and log every pending device error; returns how many were found
pub fn check_error(device: &dyn GraphicsDevice, label: &str) -> usize {
    let mut count = 0;
    while let Some(code) = device.get_error() {
        log::error!("[{}] GL error 0x{:04X} after {}", device.backend_name(), code, label);
        count += 1;
    }
    count
}

/// Severity attached to driver debug output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugSeverity {
    /// Informational chatter
    Notification,
    /// Minor issue
    Low,
    /// Significant issue
    Medium,
    /// Error or undefined behaviour
    High,
}

/// One message from the driver's debug output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugMessage {
    /// Raw source enum
    pub source: u32,
    /// Raw type enum
    pub kind: u32,
    /// Driver message id
    pub id: u32,
    /// Severity
    pub severity: DebugSeverity,
    /// Text
    pub message: String,
}

/// Route a driver message to the log; notifications are dropped
///
/// Returns whether the message was logged.
pub fn log_debug_message(message: &DebugMessage) -> bool {
    let level = match message.severity {
        DebugSeverity::Notification => return false,
        DebugSeverity::Low => log::Level::Info,
        DebugSeverity::Medium => log::Level::Warn,
        DebugSeverity::High => log::Level::Error,
    };
    log::log!(
        level,
        "GL debug [source 0x{:X}, type 0x{:X}, id {}]: {}",
        message.source,
        message.kind,
        message.id,
        message.message
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_type_tables() {
        assert_eq!(GlslType::Vec3.components(), 3);
        assert_eq!(GlslType::Vec3.size_bytes(), 12);
        assert_eq!(GlslType::Vec2.size_bytes(), 8);
        assert_eq!(GlslType::IVec4.base_type(), DataType::Int);
        assert_eq!(GlslType::UVec2.base_type(), DataType::UnsignedInt);
        assert_eq!(GlslType::Mat4.components(), 16);
        assert_eq!(DataType::Short.size_bytes(), 2);
        assert_eq!(DataType::UnsignedByte.size_bytes(), 1);
        assert!(DataType::Int.is_integer());
        assert!(!DataType::Float.is_integer());
    }

    #[test]
    fn test_glsl_type_names() {
        assert_eq!(GlslType::from_glsl_name("sampler2D"), Some(GlslType::Sampler2D));
        assert_eq!(GlslType::from_glsl_name("mat4"), Some(GlslType::Mat4));
        assert_eq!(GlslType::from_glsl_name("Material"), None);
    }

    #[test]
    fn test_pixel_format_from_channels() {
        assert_eq!(PixelFormat::from_channels(3), Some(PixelFormat::Rgb));
        assert_eq!(PixelFormat::from_channels(4), Some(PixelFormat::Rgba));
        assert_eq!(PixelFormat::from_channels(5), None);
    }

    #[test]
    fn test_notifications_are_filtered() {
        let mut message = DebugMessage {
            source: 0x8246,
            kind: 0x824C,
            id: 7,
            severity: DebugSeverity::Notification,
            message: "buffer detailed info".into(),
        };
        assert!(!log_debug_message(&message));
        message.severity = DebugSeverity::High;
        assert!(log_debug_message(&message));
    }

    #[test]
    fn test_check_error_drains_queue() {
        let device = HeadlessDevice::new();
        device.inject_error(0x0502);
        device.inject_error(0x0500);
        assert_eq!(check_error(&device, "draw"), 2);
        assert_eq!(check_error(&device, "draw"), 0);
    }

    #[test]
    fn test_clear_screen_clears_color_and_depth() {
        let device = HeadlessDevice::new();
        clear_screen(&device, 0.1, 0.2, 0.3);
        assert_eq!(
            device.calls(),
            vec![
                DeviceCall::ClearColor([0.1, 0.2, 0.3, 1.0]),
                DeviceCall::Clear(ClearFlags::COLOR | ClearFlags::DEPTH),
            ]
        );
    }
}
