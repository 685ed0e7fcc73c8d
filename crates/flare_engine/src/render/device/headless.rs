//! Call-recording device for tests and headless runs

use super::reflect::{self, Reflection};
use super::{
    ActiveVariable, BufferId, ClearFlags, DeviceError, GlslType, GraphicsDevice, PixelFormat,
    ProgramId, ShaderId, ShaderStage, TextureFilter, TextureId, TextureUpload, TextureWrap,
    UniformLocation, UniformValue, VertexArrayId, VertexAttribPointer,
};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

const GL_INVALID_OPERATION: u32 = 0x0502;

/// A call observed by [`HeadlessDevice`]
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    /// `clear_color`
    ClearColor([f32; 4]),
    /// `clear`
    Clear(ClearFlags),
    /// `set_viewport`
    Viewport {
        /// Left
        x: i32,
        /// Bottom
        y: i32,
        /// Width
        width: i32,
        /// Height
        height: i32,
    },
    /// `set_depth_test`
    DepthTest(bool),
    /// `create_shader`
    CreateShader(ShaderId, ShaderStage),
    /// `compile_shader`
    CompileShader(ShaderId),
    /// `delete_shader`
    DeleteShader(ShaderId),
    /// `create_program`
    CreateProgram(ProgramId),
    /// `link_program`
    LinkProgram(ProgramId),
    /// `delete_program`
    DeleteProgram(ProgramId),
    /// `use_program`
    UseProgram(Option<ProgramId>),
    /// `set_uniform`
    SetUniform {
        /// Program current at the time
        program: Option<ProgramId>,
        /// Target location
        location: UniformLocation,
        /// Uploaded value
        value: UniformValue,
    },
    /// `create_buffer`
    CreateBuffer(BufferId),
    /// `bind_vertex_buffer`
    BindVertexBuffer(Option<BufferId>),
    /// `upload_vertex_data`
    UploadVertexData {
        /// Target buffer
        buffer: BufferId,
        /// Byte count
        bytes: usize,
    },
    /// `delete_buffer`
    DeleteBuffer(BufferId),
    /// `create_vertex_array`
    CreateVertexArray(VertexArrayId),
    /// `bind_vertex_array`
    BindVertexArray(Option<VertexArrayId>),
    /// `delete_vertex_array`
    DeleteVertexArray(VertexArrayId),
    /// `vertex_attrib_pointer`
    VertexAttribPointer(VertexAttribPointer),
    /// `enable_vertex_attrib`
    EnableVertexAttrib(u32),
    /// `draw_triangles`
    DrawTriangles {
        /// First vertex
        first: i32,
        /// Vertex count
        count: i32,
    },
    /// `create_texture`
    CreateTexture(TextureId),
    /// `upload_texture_2d`
    UploadTexture(TextureId, TextureInfo),
    /// `active_texture_unit`
    ActiveTextureUnit(u32),
    /// `bind_texture_2d`
    BindTexture(Option<TextureId>),
    /// `delete_texture`
    DeleteTexture(TextureId),
}

/// What a texture upload stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel layout
    pub format: PixelFormat,
    /// Wrap mode
    pub wrap: TextureWrap,
    /// Filter
    pub filter: TextureFilter,
    /// Mipmaps generated
    pub mipmaps: bool,
    /// Bytes uploaded
    pub bytes: usize,
}

struct ShaderObject {
    stage: ShaderStage,
    reflection: Option<Reflection>,
}

#[derive(Default)]
struct ProgramObject {
    linked: bool,
    attributes: Vec<(ActiveVariable, u32)>,
    uniforms: Vec<ActiveVariable>,
    locations: HashMap<String, i32>,
    values: HashMap<i32, UniformValue>,
}

#[derive(Default)]
struct VertexArrayObject {
    pointers: HashMap<u32, (VertexAttribPointer, Option<BufferId>)>,
    enabled: Vec<u32>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    shaders: HashMap<ShaderId, ShaderObject>,
    programs: HashMap<ProgramId, ProgramObject>,
    buffers: HashMap<BufferId, usize>,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayObject>,
    textures: HashMap<TextureId, Option<TextureInfo>>,
    bound_program: Option<ProgramId>,
    bound_vertex_array: Option<VertexArrayId>,
    bound_buffer: Option<BufferId>,
    active_unit: u32,
    unit_bindings: HashMap<u32, TextureId>,
    errors: VecDeque<u32>,
    calls: Vec<DeviceCall>,
    fail_allocations: bool,
    fail_links: bool,
}

impl State {
    fn allocate(&mut self, kind: &'static str) -> Result<u32, DeviceError> {
        if self.fail_allocations {
            return Err(DeviceError::CreationFailed {
                kind,
                reason: "allocation disabled".to_string(),
            });
        }
        self.next_id += 1;
        Ok(self.next_id)
    }
}

/// Graphics device that keeps object tables in memory and records every call
///
/// Shader sources are scanned for their declarations, so linked programs
/// report the attributes and uniforms a driver would (struct and array
/// uniforms flattened). Compilation fails on sources without `main` or with
/// an `#error` directive.
#[derive(Default)]
pub struct HeadlessDevice {
    state: RefCell<State>,
}

impl HeadlessDevice {
    /// Create an empty device
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error code for [`GraphicsDevice::get_error`]
    pub fn inject_error(&self, code: u32) {
        self.state.borrow_mut().errors.push_back(code);
    }

    /// Make every later `create_*` call fail, or succeed again
    pub fn fail_allocations(&self, fail: bool) {
        self.state.borrow_mut().fail_allocations = fail;
    }

    /// Make every later `link_program` call fail with a link log, or succeed again
    pub fn fail_links(&self, fail: bool) {
        self.state.borrow_mut().fail_links = fail;
    }

    /// Every call recorded so far
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.borrow().calls.clone()
    }

    /// Forget recorded calls; object tables are untouched
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Vertex counts of every draw, in order
    pub fn draw_calls(&self) -> Vec<i32> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::DrawTriangles { count, .. } => Some(*count),
                _ => None,
            })
            .collect()
    }

    /// Number of shader stage objects alive
    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    /// Number of programs alive
    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    /// Whether a program is alive
    pub fn is_live_program(&self, program: ProgramId) -> bool {
        self.state.borrow().programs.contains_key(&program)
    }

    /// Buffers alive, sorted
    pub fn live_buffers(&self) -> Vec<BufferId> {
        let mut ids: Vec<_> = self.state.borrow().buffers.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Size in bytes of a live buffer's data
    pub fn buffer_size(&self, buffer: BufferId) -> Option<usize> {
        self.state.borrow().buffers.get(&buffer).copied()
    }

    /// Vertex arrays alive, sorted
    pub fn live_vertex_arrays(&self) -> Vec<VertexArrayId> {
        let mut ids: Vec<_> = self.state.borrow().vertex_arrays.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Textures alive, sorted
    pub fn live_textures(&self) -> Vec<TextureId> {
        let mut ids: Vec<_> = self.state.borrow().textures.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Upload stored for a texture
    pub fn texture_info(&self, texture: TextureId) -> Option<TextureInfo> {
        self.state.borrow().textures.get(&texture).copied().flatten()
    }

    /// Texture bound to a unit
    pub fn bound_texture(&self, slot: u32) -> Option<TextureId> {
        self.state.borrow().unit_bindings.get(&slot).copied()
    }

    /// Program currently in use
    pub fn bound_program(&self) -> Option<ProgramId> {
        self.state.borrow().bound_program
    }

    /// Last value uploaded to a named uniform of a program
    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let state = self.state.borrow();
        let object = state.programs.get(&program)?;
        let location = object.locations.get(name)?;
        object.values.get(location).copied()
    }

    /// Enabled attribute streams of a vertex array with the buffer each reads, by location
    pub fn enabled_attributes(&self, vao: VertexArrayId) -> Vec<(VertexAttribPointer, Option<BufferId>)> {
        let state = self.state.borrow();
        let Some(object) = state.vertex_arrays.get(&vao) else {
            return Vec::new();
        };
        let mut out: Vec<_> = object
            .enabled
            .iter()
            .filter_map(|location| object.pointers.get(location).copied())
            .collect();
        out.sort_by_key(|(pointer, _)| pointer.location);
        out
    }

    fn record(&self, call: DeviceCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn backend_name(&self) -> &'static str {
        "headless"
    }

    fn clear_color(&self, color: [f32; 4]) {
        self.record(DeviceCall::ClearColor(color));
    }

    fn clear(&self, flags: ClearFlags) {
        self.record(DeviceCall::Clear(flags));
    }

    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(DeviceCall::Viewport { x, y, width, height });
    }

    fn set_depth_test(&self, enabled: bool) {
        self.record(DeviceCall::DepthTest(enabled));
    }

    fn get_error(&self) -> Option<u32> {
        self.state.borrow_mut().errors.pop_front()
    }

    fn create_shader(&self, stage: ShaderStage) -> Result<ShaderId, DeviceError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let id = ShaderId(state.allocate("shader")?);
        state.shaders.insert(id, ShaderObject { stage, reflection: None });
        state.calls.push(DeviceCall::CreateShader(id, stage));
        Ok(id)
    }

    fn compile_shader(&self, shader: ShaderId, source: &str) -> Result<(), String> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DeviceCall::CompileShader(shader));
        let object = state
            .shaders
            .get_mut(&shader)
            .ok_or_else(|| format!("unknown shader object {}", shader.0))?;
        object.reflection = None;
        if let Some(message) = reflect::error_directive(source) {
            return Err(format!("ERROR: 0:1: '#error' : {message}"));
        }
        if !reflect::has_main(source) {
            return Err("ERROR: 0:1: 'main' : function not defined".to_string());
        }
        object.reflection = Some(reflect::reflect(source, object.stage));
        Ok(())
    }

    fn delete_shader(&self, shader: ShaderId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.shaders.remove(&shader);
        state.calls.push(DeviceCall::DeleteShader(shader));
    }

    fn create_program(&self) -> Result<ProgramId, DeviceError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let id = ProgramId(state.allocate("program")?);
        state.programs.insert(id, ProgramObject::default());
        state.calls.push(DeviceCall::CreateProgram(id));
        Ok(id)
    }

    fn link_program(&self, program: ProgramId, stages: &[ShaderId]) -> Result<(), String> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.calls.push(DeviceCall::LinkProgram(program));
        if state.fail_links {
            return Err("error: linking disabled".to_string());
        }

        let mut vertex = None;
        let mut fragment = None;
        for id in stages {
            let object = state
                .shaders
                .get(id)
                .ok_or_else(|| format!("error: shader object {} does not exist", id.0))?;
            let reflection = object
                .reflection
                .as_ref()
                .ok_or_else(|| format!("error: {} shader {} is not compiled", object.stage.label(), id.0))?;
            match object.stage {
                ShaderStage::Vertex => vertex = Some(reflection.clone()),
                ShaderStage::Fragment => fragment = Some(reflection.clone()),
            }
        }
        let vertex = vertex.ok_or("error: no vertex shader attached")?;
        let fragment = fragment.ok_or("error: no fragment shader attached")?;

        let mut attributes = Vec::new();
        let mut taken: Vec<u32> = vertex.inputs.iter().filter_map(|d| d.location).collect();
        for decl in &vertex.inputs {
            let Some(ty) = GlslType::from_glsl_name(&decl.ty) else {
                continue;
            };
            let location = decl.location.unwrap_or_else(|| {
                let free = (0..).find(|l| !taken.contains(l)).unwrap_or(0);
                taken.push(free);
                free
            });
            attributes.push((
                ActiveVariable {
                    name: decl.name.clone(),
                    ty,
                    size: decl.array_len.map_or(1, |n| n as i32),
                },
                location,
            ));
        }

        let mut uniforms: Vec<ActiveVariable> = Vec::new();
        let mut locations = HashMap::new();
        let mut next_location = 0i32;
        for stage in [&vertex, &fragment] {
            for flat in reflect::flatten_uniforms(&stage.uniforms, &stage.structs) {
                if uniforms.iter().any(|u| u.name == flat.name) {
                    continue;
                }
                if let Some(base) = flat.name.strip_suffix("[0]") {
                    locations.insert(base.to_string(), next_location);
                    for k in 0..flat.size {
                        locations.insert(format!("{base}[{k}]"), next_location + k);
                    }
                } else {
                    locations.insert(flat.name.clone(), next_location);
                }
                next_location += flat.size;
                uniforms.push(ActiveVariable {
                    name: flat.name,
                    ty: flat.ty,
                    size: flat.size,
                });
            }
        }

        let object = state
            .programs
            .get_mut(&program)
            .ok_or_else(|| format!("error: program object {} does not exist", program.0))?;
        *object = ProgramObject {
            linked: true,
            attributes,
            uniforms,
            locations,
            values: HashMap::new(),
        };
        Ok(())
    }

    fn delete_program(&self, program: ProgramId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.programs.remove(&program);
        if state.bound_program == Some(program) {
            state.bound_program = None;
        }
        state.calls.push(DeviceCall::DeleteProgram(program));
    }

    fn use_program(&self, program: Option<ProgramId>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let linked = program.map_or(true, |p| state.programs.get(&p).is_some_and(|o| o.linked));
        if linked {
            state.bound_program = program;
        } else {
            state.errors.push_back(GL_INVALID_OPERATION);
        }
        state.calls.push(DeviceCall::UseProgram(program));
    }

    fn active_attributes(&self, program: ProgramId) -> Vec<ActiveVariable> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|o| o.attributes.iter().map(|(v, _)| v.clone()).collect())
            .unwrap_or_default()
    }

    fn active_uniforms(&self, program: ProgramId) -> Vec<ActiveVariable> {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|o| o.uniforms.clone())
            .unwrap_or_default()
    }

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let state = self.state.borrow();
        let object = state.programs.get(&program)?;
        object
            .attributes
            .iter()
            .find(|(v, _)| v.name == name)
            .map(|(_, location)| *location)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let state = self.state.borrow();
        state
            .programs
            .get(&program)?
            .locations
            .get(name)
            .map(|l| UniformLocation(*l))
    }

    fn set_uniform(&self, location: UniformLocation, value: &UniformValue) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let program = state.bound_program;
        match program.and_then(|p| state.programs.get_mut(&p)) {
            Some(object) => {
                object.values.insert(location.0, *value);
            }
            None => state.errors.push_back(GL_INVALID_OPERATION),
        }
        state.calls.push(DeviceCall::SetUniform {
            program,
            location,
            value: *value,
        });
    }

    fn create_buffer(&self) -> Result<BufferId, DeviceError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let id = BufferId(state.allocate("buffer")?);
        state.buffers.insert(id, 0);
        state.calls.push(DeviceCall::CreateBuffer(id));
        Ok(id)
    }

    fn bind_vertex_buffer(&self, buffer: Option<BufferId>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.bound_buffer = buffer;
        state.calls.push(DeviceCall::BindVertexBuffer(buffer));
    }

    fn upload_vertex_data(&self, buffer: BufferId, data: &[u8]) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.bound_buffer = Some(buffer);
        match state.buffers.get_mut(&buffer) {
            Some(size) => *size = data.len(),
            None => state.errors.push_back(GL_INVALID_OPERATION),
        }
        state.calls.push(DeviceCall::UploadVertexData {
            buffer,
            bytes: data.len(),
        });
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.buffers.remove(&buffer);
        if state.bound_buffer == Some(buffer) {
            state.bound_buffer = None;
        }
        state.calls.push(DeviceCall::DeleteBuffer(buffer));
    }

    fn create_vertex_array(&self) -> Result<VertexArrayId, DeviceError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let id = VertexArrayId(state.allocate("vertex array")?);
        state.vertex_arrays.insert(id, VertexArrayObject::default());
        state.calls.push(DeviceCall::CreateVertexArray(id));
        Ok(id)
    }

    fn bind_vertex_array(&self, vao: Option<VertexArrayId>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.bound_vertex_array = vao;
        state.calls.push(DeviceCall::BindVertexArray(vao));
    }

    fn delete_vertex_array(&self, vao: VertexArrayId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.vertex_arrays.remove(&vao);
        if state.bound_vertex_array == Some(vao) {
            state.bound_vertex_array = None;
        }
        state.calls.push(DeviceCall::DeleteVertexArray(vao));
    }

    fn vertex_attrib_pointer(&self, pointer: &VertexAttribPointer) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let buffer = state.bound_buffer;
        match state.bound_vertex_array.and_then(|v| state.vertex_arrays.get_mut(&v)) {
            Some(object) => {
                object.pointers.insert(pointer.location, (*pointer, buffer));
            }
            None => state.errors.push_back(GL_INVALID_OPERATION),
        }
        state.calls.push(DeviceCall::VertexAttribPointer(*pointer));
    }

    fn enable_vertex_attrib(&self, location: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        match state.bound_vertex_array.and_then(|v| state.vertex_arrays.get_mut(&v)) {
            Some(object) => {
                if !object.enabled.contains(&location) {
                    object.enabled.push(location);
                }
            }
            None => state.errors.push_back(GL_INVALID_OPERATION),
        }
        state.calls.push(DeviceCall::EnableVertexAttrib(location));
    }

    fn draw_triangles(&self, first: i32, count: i32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.bound_vertex_array.is_none() || state.bound_program.is_none() {
            state.errors.push_back(GL_INVALID_OPERATION);
        }
        state.calls.push(DeviceCall::DrawTriangles { first, count });
    }

    fn create_texture(&self) -> Result<TextureId, DeviceError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let id = TextureId(state.allocate("texture")?);
        state.textures.insert(id, None);
        state.calls.push(DeviceCall::CreateTexture(id));
        Ok(id)
    }

    fn upload_texture_2d(&self, texture: TextureId, upload: &TextureUpload<'_>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let info = TextureInfo {
            width: upload.width,
            height: upload.height,
            format: upload.format,
            wrap: upload.wrap,
            filter: upload.filter,
            mipmaps: upload.generate_mipmaps,
            bytes: upload.pixels.len(),
        };
        let unit = state.active_unit;
        match state.textures.get_mut(&texture) {
            Some(slot) => *slot = Some(info),
            None => state.errors.push_back(GL_INVALID_OPERATION),
        }
        state.unit_bindings.insert(unit, texture);
        state.calls.push(DeviceCall::UploadTexture(texture, info));
    }

    fn active_texture_unit(&self, slot: u32) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.active_unit = slot;
        state.calls.push(DeviceCall::ActiveTextureUnit(slot));
    }

    fn bind_texture_2d(&self, texture: Option<TextureId>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let unit = state.active_unit;
        match texture {
            Some(id) => state.unit_bindings.insert(unit, id),
            None => state.unit_bindings.remove(&unit),
        };
        state.calls.push(DeviceCall::BindTexture(texture));
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.textures.remove(&texture);
        state.unit_bindings.retain(|_, bound| *bound != texture);
        state.calls.push(DeviceCall::DeleteTexture(texture));
    }
}
