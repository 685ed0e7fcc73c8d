//! # Shader Programs
//!
//! A [`Shader`] is named after its source pair: `name.vs` and `name.fs`,
//! read through a [`ShaderSource`]. After a successful load the program's
//! active uniforms and attributes are cached by name, so setters and
//! attribute binding never query the driver.
//!
//! Setting an unknown uniform or binding an unknown attribute is a
//! programming error and panics. Use [`Shader::has_uniform`] and
//! [`Shader::has_attribute`] when a name is optional.

use crate::assets::{AssetError, ShaderSource};
use crate::foundation::math::{Mat4, Mat4Ext, Vec2, Vec3, Vec4};
use crate::render::device::{
    DataType, DeviceError, DeviceRef, ProgramId, ShaderId, ShaderStage, UniformLocation,
    UniformValue, VertexAttribPointer,
};
use std::collections::HashMap;
use thiserror::Error;

/// Shader errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// A source file could not be read
    #[error("shader source {file} unavailable: {source}")]
    MissingSource {
        /// File that failed
        file: String,
        /// Underlying asset error
        source: AssetError,
    },

    /// The device refused to allocate an object
    #[error("shader object allocation failed: {0}")]
    Device(#[from] DeviceError),

    /// A stage did not compile
    #[error("{stage} shader {name} failed to compile: {log}")]
    Compile {
        /// Shader name
        name: String,
        /// Stage label
        stage: &'static str,
        /// Driver info log
        log: String,
    },

    /// The program did not link
    #[error("shader {name} failed to link: {log}")]
    Link {
        /// Shader name
        name: String,
        /// Driver info log
        log: String,
    },

    /// `compile` was called before any source was loaded
    #[error("shader {0} has no source loaded")]
    NotLoaded(String),
}

/// Cached layout of one active vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Attribute location
    pub location: u32,
    /// Scalar components
    pub components: i32,
    /// Component type
    pub data_type: DataType,
    /// Fixed-point normalization flag
    pub normalized: bool,
    /// Bytes one value occupies in a vertex
    pub size_bytes: usize,
}

/// Linked GPU program with cached uniform and attribute lookups
pub struct Shader {
    device: DeviceRef,
    name: String,
    vertex_source: Option<String>,
    fragment_source: Option<String>,
    program: Option<ProgramId>,
    uniforms: HashMap<String, UniformLocation>,
    attributes: HashMap<String, AttributeInfo>,
    total_stride: usize,
}

impl Shader {
    /// Create an unloaded shader named `name`
    pub fn new(device: DeviceRef, name: impl Into<String>) -> Self {
        Self {
            device,
            name: name.into(),
            vertex_source: None,
            fragment_source: None,
            program: None,
            uniforms: HashMap::new(),
            attributes: HashMap::new(),
            total_stride: 0,
        }
    }

    /// Shader name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vertex source file name
    pub fn vertex_file(&self) -> String {
        format!("{}.vs", self.name)
    }

    /// Fragment source file name
    pub fn fragment_file(&self) -> String {
        format!("{}.fs", self.name)
    }

    /// Read both sources and build the program
    ///
    /// If either file is missing nothing is changed: the previous program,
    /// if any, stays in place.
    pub fn load(&mut self, sources: &dyn ShaderSource) -> Result<(), ShaderError> {
        let read = |file: String| {
            sources.read(&file).map_err(|source| {
                log::error!("Failed to read shader source {}: {}", file, source);
                ShaderError::MissingSource { file, source }
            })
        };
        let vertex = read(self.vertex_file())?;
        let fragment = read(self.fragment_file())?;

        self.vertex_source = Some(vertex);
        self.fragment_source = Some(fragment);
        self.compile()
    }

    /// Compile and link the loaded sources, replacing any previous program
    ///
    /// On failure every intermediate object is released and the previous
    /// program stays in place.
    pub fn compile(&mut self) -> Result<(), ShaderError> {
        let (Some(vertex), Some(fragment)) = (&self.vertex_source, &self.fragment_source) else {
            return Err(ShaderError::NotLoaded(self.name.clone()));
        };

        let vs = self.compile_stage(ShaderStage::Vertex, vertex)?;
        let fs = match self.compile_stage(ShaderStage::Fragment, fragment) {
            Ok(fs) => fs,
            Err(e) => {
                self.device.delete_shader(vs);
                return Err(e);
            }
        };

        let linked = self.device.create_program().map_err(ShaderError::from).and_then(|program| {
            self.device
                .link_program(program, &[vs, fs])
                .map(|()| program)
                .map_err(|log| {
                    self.device.delete_program(program);
                    ShaderError::Link {
                        name: self.name.clone(),
                        log,
                    }
                })
        });
        self.device.delete_shader(vs);
        self.device.delete_shader(fs);

        let program = linked.map_err(|e| {
            log::error!("{}", e);
            e
        })?;

        self.destroy();
        self.program = Some(program);
        self.cache_attributes(program);
        self.cache_uniforms(program);
        log::info!(
            "Shader {} linked: {} attributes, {} uniforms, stride {}",
            self.name,
            self.attributes.len(),
            self.uniforms.len(),
            self.total_stride
        );
        Ok(())
    }

    fn compile_stage(&self, stage: ShaderStage, source: &str) -> Result<ShaderId, ShaderError> {
        let id = self.device.create_shader(stage)?;
        if let Err(log) = self.device.compile_shader(id, source) {
            self.device.delete_shader(id);
            let error = ShaderError::Compile {
                name: self.name.clone(),
                stage: stage.label(),
                log,
            };
            log::error!("{}", error);
            return Err(error);
        }
        Ok(id)
    }

    fn cache_attributes(&mut self, program: ProgramId) {
        self.attributes.clear();
        self.total_stride = 0;
        for attribute in self.device.active_attributes(program) {
            // Built-ins such as gl_VertexID have no location
            let Some(location) = self.device.attribute_location(program, &attribute.name) else {
                continue;
            };
            let size = attribute.size.max(1);
            let info = AttributeInfo {
                location,
                components: attribute.ty.components() * size,
                data_type: attribute.ty.base_type(),
                normalized: false,
                size_bytes: attribute.ty.size_bytes() * size as usize,
            };
            log::debug!("Shader {} attribute {} -> {:?}", self.name, attribute.name, info);
            self.total_stride += info.size_bytes;
            self.attributes.insert(attribute.name, info);
        }
    }

    fn cache_uniforms(&mut self, program: ProgramId) {
        self.uniforms.clear();
        for uniform in self.device.active_uniforms(program) {
            match uniform.name.strip_suffix("[0]") {
                Some(base) => {
                    for k in 0..uniform.size.max(1) {
                        let element = format!("{base}[{k}]");
                        if let Some(location) = self.device.uniform_location(program, &element) {
                            if k == 0 {
                                self.uniforms.insert(base.to_string(), location);
                            }
                            self.uniforms.insert(element, location);
                        }
                    }
                }
                None => {
                    if let Some(location) = self.device.uniform_location(program, &uniform.name) {
                        log::debug!("Shader {} uniform {} -> {}", self.name, uniform.name, location.0);
                        self.uniforms.insert(uniform.name, location);
                    }
                }
            }
        }
    }

    /// Make this program current
    ///
    /// # Panics
    /// If the shader has not been loaded successfully.
    pub fn bind(&self) {
        let program = self.require_program();
        self.device.use_program(Some(program));
    }

    /// Release the program; safe to call repeatedly
    pub fn destroy(&mut self) {
        if let Some(program) = self.program.take() {
            self.device.delete_program(program);
            self.uniforms.clear();
            self.attributes.clear();
            self.total_stride = 0;
            log::debug!("Shader {} destroyed", self.name);
        }
    }

    /// Linked program, absent until a successful load
    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    /// A program is linked
    pub fn is_loaded(&self) -> bool {
        self.program.is_some()
    }

    fn require_program(&self) -> ProgramId {
        match self.program {
            Some(program) => program,
            None => panic!("shader '{}' used before a successful load", self.name),
        }
    }

    /// Program has an active uniform with this name
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Cached location of a uniform
    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    /// Program has an active attribute with this name
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Cached layout of an attribute
    pub fn attribute(&self, name: &str) -> Option<&AttributeInfo> {
        self.attributes.get(name)
    }

    /// Sum of the byte sizes of every active attribute
    pub fn total_stride(&self) -> usize {
        self.total_stride
    }

    fn location(&self, name: &str) -> UniformLocation {
        match self.uniforms.get(name) {
            Some(location) => *location,
            None => panic!("shader '{}' has no active uniform '{}'", self.name, name),
        }
    }

    fn set(&self, name: &str, value: UniformValue) {
        self.device.set_uniform(self.location(name), &value);
    }

    /// Upload a `bool` uniform; the program must be bound
    pub fn set_bool(&self, name: &str, value: bool) {
        self.set(name, UniformValue::Int(i32::from(value)));
    }

    /// Upload an `int` or sampler uniform
    pub fn set_int(&self, name: &str, value: i32) {
        self.set(name, UniformValue::Int(value));
    }

    /// Upload a `float` uniform
    pub fn set_float(&self, name: &str, value: f32) {
        self.set(name, UniformValue::Float(value));
    }

    /// Upload a `vec2` uniform
    pub fn set_vec2(&self, name: &str, value: &Vec2) {
        self.set(name, UniformValue::Vec2([value.x, value.y]));
    }

    /// Upload a `vec3` uniform
    pub fn set_vec3(&self, name: &str, value: &Vec3) {
        self.set(name, UniformValue::Vec3([value.x, value.y, value.z]));
    }

    /// Upload a `vec4` uniform
    pub fn set_vec4(&self, name: &str, value: &Vec4) {
        self.set(name, UniformValue::Vec4([value.x, value.y, value.z, value.w]));
    }

    /// Upload a `mat4` uniform
    pub fn set_mat4(&self, name: &str, value: &Mat4) {
        self.set(name, UniformValue::Mat4(value.to_column_array()));
    }

    /// Point an attribute at the bound buffer using this program's total stride
    ///
    /// # Arguments
    /// * `name` - Active attribute name
    /// * `offset` - Byte offset of the attribute in a vertex
    /// * `normalized` - Normalize fixed-point data
    pub fn bind_attribute(&self, name: &str, offset: usize, normalized: bool) {
        self.bind_attribute_strided(name, offset, self.total_stride, normalized);
    }

    /// Point an attribute at the bound buffer with an explicit stride, then enable it
    ///
    /// # Panics
    /// If the program has no active attribute called `name`.
    pub fn bind_attribute_strided(&self, name: &str, offset: usize, stride: usize, normalized: bool) {
        let Some(info) = self.attributes.get(name) else {
            panic!("shader '{}' has no active attribute '{}'", self.name, name);
        };
        self.device.vertex_attrib_pointer(&VertexAttribPointer {
            location: info.location,
            components: info.components,
            data_type: info.data_type,
            normalized: normalized || info.normalized,
            stride: stride as i32,
            offset: offset as i32,
        });
        self.device.enable_vertex_attrib(info.location);
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.name)
            .field("program", &self.program)
            .field("total_stride", &self.total_stride)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::assets::MemorySource;
    use crate::render::device::{DeviceCall, HeadlessDevice};
    use std::rc::Rc;

    pub(crate) const LIGHTING_VS: &str = r"#version 460 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aNormal;
layout (location = 2) in vec2 aTexCoord;
uniform mat4 model;
uniform mat4 view;
uniform mat4 projection;
out vec2 TexCoord;
void main() {
    TexCoord = aTexCoord;
    gl_Position = projection * view * model * vec4(aPos + aNormal * 0.0, 1.0);
}
";

    pub(crate) const LIGHTING_FS: &str = r"#version 460 core
struct Material { sampler2D diffuse; sampler2D specular; float shininess; };
struct Light { vec3 position; vec3 ambient; vec3 diffuse; vec3 specular; };
uniform Material material;
uniform Light light;
uniform vec3 viewPos;
uniform bool useSpecular;
uniform vec2 uvScale;
uniform vec4 tint;
in vec2 TexCoord;
out vec4 FragColor;
void main() { FragColor = texture(material.diffuse, TexCoord) * tint; }
";

    pub(crate) fn lighting_sources() -> MemorySource {
        MemorySource::new().with_shader("lighting", LIGHTING_VS, LIGHTING_FS)
    }

    fn loaded(device: &Rc<HeadlessDevice>) -> Shader {
        let mut shader = Shader::new(device.clone(), "lighting");
        shader.load(&lighting_sources()).unwrap();
        shader
    }

    #[test]
    fn test_file_names() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = Shader::new(device, "basic");
        assert_eq!(shader.vertex_file(), "basic.vs");
        assert_eq!(shader.fragment_file(), "basic.fs");
        assert!(!shader.is_loaded());
    }

    #[test]
    fn test_load_caches_attributes_and_stride() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = loaded(&device);
        assert!(shader.is_loaded());
        assert_eq!(shader.total_stride(), 12 + 12 + 8);
        let tex = shader.attribute("aTexCoord").unwrap();
        assert_eq!((tex.location, tex.components, tex.data_type), (2, 2, DataType::Float));
        assert!(shader.has_uniform("material.shininess"));
        assert!(shader.has_uniform("light.position"));
        assert!(!shader.has_uniform("missing"));
        // Stage objects are released once linked
        assert_eq!(device.live_shaders(), 0);
        assert_eq!(device.live_programs(), 1);
    }

    #[test]
    fn test_missing_source_leaves_handle_absent() {
        let device = Rc::new(HeadlessDevice::new());
        let mut shader = Shader::new(device.clone(), "lighting");
        let sources = MemorySource::new().with_file("lighting.vs", LIGHTING_VS);
        let err = shader.load(&sources).unwrap_err();
        assert!(matches!(err, ShaderError::MissingSource { ref file, .. } if file == "lighting.fs"));
        assert!(shader.program().is_none());
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_compile_error_releases_stages() {
        let device = Rc::new(HeadlessDevice::new());
        let mut shader = Shader::new(device.clone(), "broken");
        let sources = MemorySource::new().with_shader("broken", LIGHTING_VS, "#error bad fragment\n");
        let err = shader.load(&sources).unwrap_err();
        assert!(matches!(err, ShaderError::Compile { stage: "fragment", .. }));
        assert!(shader.program().is_none());
        assert_eq!(device.live_shaders(), 0);
        assert_eq!(device.live_programs(), 0);
    }

    #[test]
    fn test_allocation_failure_keeps_previous_program() {
        let device = Rc::new(HeadlessDevice::new());
        let mut shader = Shader::new(device.clone(), "lighting");
        shader.load(&lighting_sources()).unwrap();
        let old = shader.program();
        device.fail_allocations(true);
        assert!(matches!(shader.compile(), Err(ShaderError::Device(_))));
        device.fail_allocations(false);
        // Previous program survives a failed rebuild
        assert_eq!(shader.program(), old);
    }

    #[test]
    fn test_link_error_releases_program_and_stages() {
        let device = Rc::new(HeadlessDevice::new());
        device.fail_links(true);
        let mut shader = Shader::new(device.clone(), "lighting");
        let err = shader.load(&lighting_sources()).unwrap_err();
        assert!(matches!(err, ShaderError::Link { ref name, .. } if name == "lighting"));
        assert_eq!(shader.program(), None);
        assert_eq!(device.live_programs(), 0);
        assert_eq!(device.live_shaders(), 0);
    }

    #[test]
    fn test_link_error_keeps_previous_program() {
        let device = Rc::new(HeadlessDevice::new());
        let mut shader = loaded(&device);
        let old = shader.program();
        device.fail_links(true);
        assert!(matches!(shader.compile(), Err(ShaderError::Link { .. })));
        assert_eq!(shader.program(), old);
        assert_eq!(device.live_programs(), 1);
        assert_eq!(device.live_shaders(), 0);
        assert!(device.is_live_program(old.unwrap()));
    }

    #[test]
    fn test_reload_replaces_program() {
        let device = Rc::new(HeadlessDevice::new());
        let mut shader = loaded(&device);
        let first = shader.program().unwrap();
        shader.load(&lighting_sources()).unwrap();
        assert_ne!(shader.program(), Some(first));
        assert!(!device.is_live_program(first));
        assert_eq!(device.live_programs(), 1);
    }

    #[test]
    fn test_setters_upload_values() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = loaded(&device);
        let program = shader.program().unwrap();
        shader.bind();
        shader.set_float("material.shininess", 32.0);
        shader.set_bool("useSpecular", true);
        shader.set_int("material.diffuse", 0);
        shader.set_vec2("uvScale", &Vec2::new(2.0, 3.0));
        shader.set_vec3("viewPos", &Vec3::new(1.0, 2.0, 3.0));
        shader.set_vec4("tint", &Vec4::new(1.0, 0.5, 0.25, 1.0));
        shader.set_mat4("model", &Mat4::new_translation(&Vec3::new(4.0, 5.0, 6.0)));
        assert_eq!(device.uniform_value(program, "material.shininess"), Some(UniformValue::Float(32.0)));
        assert_eq!(device.uniform_value(program, "useSpecular"), Some(UniformValue::Int(1)));
        assert_eq!(device.uniform_value(program, "uvScale"), Some(UniformValue::Vec2([2.0, 3.0])));
        assert_eq!(device.uniform_value(program, "viewPos"), Some(UniformValue::Vec3([1.0, 2.0, 3.0])));
        assert_eq!(device.uniform_value(program, "tint"), Some(UniformValue::Vec4([1.0, 0.5, 0.25, 1.0])));
        match device.uniform_value(program, "model") {
            Some(UniformValue::Mat4(m)) => assert_eq!(&m[12..15], &[4.0, 5.0, 6.0]),
            other => panic!("unexpected model upload {:?}", other),
        }
    }

    #[test]
    #[should_panic(expected = "no active uniform 'nonexistent'")]
    fn test_unknown_uniform_fails_fast() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = loaded(&device);
        shader.bind();
        shader.set_float("nonexistent", 1.0);
    }

    #[test]
    #[should_panic(expected = "no active attribute 'aColor'")]
    fn test_unknown_attribute_fails_fast() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = loaded(&device);
        shader.bind_attribute("aColor", 0, false);
    }

    #[test]
    #[should_panic(expected = "used before a successful load")]
    fn test_bind_before_load_fails_fast() {
        let device = Rc::new(HeadlessDevice::new());
        Shader::new(device, "lighting").bind();
    }

    #[test]
    fn test_bind_attribute_uses_total_stride_and_enables() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = loaded(&device);
        device.clear_calls();
        shader.bind_attribute("aNormal", 12, false);
        assert_eq!(
            device.calls(),
            vec![
                DeviceCall::VertexAttribPointer(VertexAttribPointer {
                    location: 1,
                    components: 3,
                    data_type: DataType::Float,
                    normalized: false,
                    stride: 32,
                    offset: 12,
                }),
                DeviceCall::EnableVertexAttrib(1),
            ]
        );
    }

    #[test]
    fn test_destroy_is_idempotent_and_drop_releases() {
        let device = Rc::new(HeadlessDevice::new());
        let mut shader = loaded(&device);
        shader.destroy();
        shader.destroy();
        assert!(shader.program().is_none());
        assert_eq!(device.live_programs(), 0);

        let shader = loaded(&device);
        assert_eq!(device.live_programs(), 1);
        drop(shader);
        assert_eq!(device.live_programs(), 0);
    }
}
