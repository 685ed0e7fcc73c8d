//! # Primitives
//!
//! A [`Primitive`] is a non-indexed triangle list living in one vertex
//! buffer, described at runtime by a [`VertexLayout`]: an ordered list of
//! semantics, each with a component count and byte offset inside an
//! interleaved vertex.
//!
//! ## Buffer ownership
//!
//! A primitive either owns its vertex buffer or borrows the buffer of
//! another, already created primitive ([`VertexBuffer::Shared`]). Borrowing
//! is how a small indicator mesh reuses the position data of a larger one
//! without a second upload. Only the owner deletes the buffer; a borrower's
//! [`Primitive::destroy`] releases its vertex array and nothing else, so the
//! owner must outlive every borrower.
//!
//! ## Attribute binding
//!
//! Attributes are matched to shader inputs by name (`aPos`, `aNormal`,
//! `aTexCoord`). Inputs the shader compiler stripped are skipped. Pointers
//! always use the stride and offsets of the buffer being read, which for a
//! borrower is the owner's layout.

use crate::render::device::{BufferId, DeviceError, DeviceRef, VertexArrayId};
use crate::render::shader::Shader;
use thiserror::Error;

/// Primitive errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// The device refused to allocate a buffer or vertex array
    #[error("primitive allocation failed: {0}")]
    Device(#[from] DeviceError),

    /// Vertex data does not divide into whole vertices
    #[error("{len} floats do not form whole vertices of {floats_per_vertex} floats")]
    InvalidVertexData {
        /// Floats supplied
        len: usize,
        /// Floats per vertex of the layout
        floats_per_vertex: usize,
    },

    /// Tried to borrow the buffer of a primitive that has none
    #[error("source primitive has no vertex buffer")]
    SourceNotCreated,

    /// The borrowed buffer lacks a semantic this primitive needs
    #[error("shared buffer has no compatible {0:?} attribute")]
    IncompatibleLayout(VertexSemantic),
}

/// Meaning of one interleaved vertex field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
    /// Object-space position, `vec3`
    Position,
    /// Surface normal, `vec3`
    Normal,
    /// Texture coordinates, `vec2`
    TexCoords,
}

impl VertexSemantic {
    /// Shader input this semantic feeds
    pub fn attribute_name(self) -> &'static str {
        match self {
            Self::Position => "aPos",
            Self::Normal => "aNormal",
            Self::TexCoords => "aTexCoord",
        }
    }

    /// Float components per vertex
    pub fn components(self) -> usize {
        match self {
            Self::Position | Self::Normal => 3,
            Self::TexCoords => 2,
        }
    }
}

/// One field of a vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// What the field holds
    pub semantic: VertexSemantic,
    /// Float components
    pub components: usize,
    /// Byte offset inside a vertex
    pub offset: usize,
}

/// Runtime description of an interleaved `f32` vertex
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    stride: usize,
}

impl VertexLayout {
    /// Pack semantics tightly in the given order
    pub fn new(semantics: &[VertexSemantic]) -> Self {
        let mut offset = 0;
        let attributes = semantics
            .iter()
            .map(|&semantic| {
                let attribute = VertexAttribute {
                    semantic,
                    components: semantic.components(),
                    offset,
                };
                offset += semantic.components() * std::mem::size_of::<f32>();
                attribute
            })
            .collect();
        Self { attributes, stride: offset }
    }

    /// Position only
    pub fn position() -> Self {
        Self::new(&[VertexSemantic::Position])
    }

    /// Position then texture coordinates
    pub fn position_tex_coords() -> Self {
        Self::new(&[VertexSemantic::Position, VertexSemantic::TexCoords])
    }

    /// Position then normal
    pub fn position_normal() -> Self {
        Self::new(&[VertexSemantic::Position, VertexSemantic::Normal])
    }

    /// Position, normal, texture coordinates
    pub fn position_normal_tex_coords() -> Self {
        Self::new(&[
            VertexSemantic::Position,
            VertexSemantic::Normal,
            VertexSemantic::TexCoords,
        ])
    }

    /// Fields in memory order
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Field holding a semantic
    pub fn attribute(&self, semantic: VertexSemantic) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.semantic == semantic)
    }

    /// Layout has a field for the semantic
    pub fn contains(&self, semantic: VertexSemantic) -> bool {
        self.attribute(semantic).is_some()
    }

    /// Bytes per vertex
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Floats per vertex
    pub fn floats_per_vertex(&self) -> usize {
        self.stride / std::mem::size_of::<f32>()
    }
}

/// Vertex buffer a primitive reads, tagged with who releases it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexBuffer {
    /// Uploaded and released by this primitive
    Owned(BufferId),
    /// Borrowed from another primitive, never released here
    Shared(BufferId),
}

impl VertexBuffer {
    /// Device handle
    pub fn id(self) -> BufferId {
        match self {
            Self::Owned(id) | Self::Shared(id) => id,
        }
    }

    /// This primitive releases the buffer
    pub fn is_owned(self) -> bool {
        matches!(self, Self::Owned(_))
    }
}

type CubeVertex = ([f32; 3], [f32; 2]);

// Unit-cube corners and texture coordinates, two triangles per face
const CUBE_FACES: [([f32; 3], [CubeVertex; 6]); 6] = [
    (
        [0.0, 0.0, -1.0],
        [
            ([-1.0, -1.0, -1.0], [0.0, 0.0]),
            ([1.0, -1.0, -1.0], [1.0, 0.0]),
            ([1.0, 1.0, -1.0], [1.0, 1.0]),
            ([1.0, 1.0, -1.0], [1.0, 1.0]),
            ([-1.0, 1.0, -1.0], [0.0, 1.0]),
            ([-1.0, -1.0, -1.0], [0.0, 0.0]),
        ],
    ),
    (
        [0.0, 0.0, 1.0],
        [
            ([-1.0, -1.0, 1.0], [0.0, 0.0]),
            ([1.0, -1.0, 1.0], [1.0, 0.0]),
            ([1.0, 1.0, 1.0], [1.0, 1.0]),
            ([1.0, 1.0, 1.0], [1.0, 1.0]),
            ([-1.0, 1.0, 1.0], [0.0, 1.0]),
            ([-1.0, -1.0, 1.0], [0.0, 0.0]),
        ],
    ),
    (
        [-1.0, 0.0, 0.0],
        [
            ([-1.0, 1.0, 1.0], [1.0, 0.0]),
            ([-1.0, 1.0, -1.0], [1.0, 1.0]),
            ([-1.0, -1.0, -1.0], [0.0, 1.0]),
            ([-1.0, -1.0, -1.0], [0.0, 1.0]),
            ([-1.0, -1.0, 1.0], [0.0, 0.0]),
            ([-1.0, 1.0, 1.0], [1.0, 0.0]),
        ],
    ),
    (
        [1.0, 0.0, 0.0],
        [
            ([1.0, 1.0, 1.0], [1.0, 0.0]),
            ([1.0, 1.0, -1.0], [1.0, 1.0]),
            ([1.0, -1.0, -1.0], [0.0, 1.0]),
            ([1.0, -1.0, -1.0], [0.0, 1.0]),
            ([1.0, -1.0, 1.0], [0.0, 0.0]),
            ([1.0, 1.0, 1.0], [1.0, 0.0]),
        ],
    ),
    (
        [0.0, -1.0, 0.0],
        [
            ([-1.0, -1.0, -1.0], [0.0, 1.0]),
            ([1.0, -1.0, -1.0], [1.0, 1.0]),
            ([1.0, -1.0, 1.0], [1.0, 0.0]),
            ([1.0, -1.0, 1.0], [1.0, 0.0]),
            ([-1.0, -1.0, 1.0], [0.0, 0.0]),
            ([-1.0, -1.0, -1.0], [0.0, 1.0]),
        ],
    ),
    (
        [0.0, 1.0, 0.0],
        [
            ([-1.0, 1.0, -1.0], [0.0, 1.0]),
            ([1.0, 1.0, -1.0], [1.0, 1.0]),
            ([1.0, 1.0, 1.0], [1.0, 0.0]),
            ([1.0, 1.0, 1.0], [1.0, 0.0]),
            ([-1.0, 1.0, 1.0], [0.0, 0.0]),
            ([-1.0, 1.0, -1.0], [0.0, 1.0]),
        ],
    ),
];

/// Vertices in a generated cube
pub const CUBE_VERTEX_COUNT: usize = 36;

/// Triangle-list mesh with its vertex array and buffer
pub struct Primitive {
    device: DeviceRef,
    layout: VertexLayout,
    vertices: Vec<f32>,
    vertex_count: usize,
    vao: Option<VertexArrayId>,
    buffer: Option<VertexBuffer>,
    // Layout of the buffer actually read; the owner's when shared
    buffer_layout: VertexLayout,
}

impl Primitive {
    /// Wrap interleaved vertex data described by `layout`
    ///
    /// Nothing touches the device until [`Primitive::create`]. An empty
    /// vertex list is valid for a primitive that will only borrow.
    pub fn new(device: DeviceRef, layout: VertexLayout, vertices: Vec<f32>) -> Result<Self, PrimitiveError> {
        let floats_per_vertex = layout.floats_per_vertex();
        if floats_per_vertex == 0 || vertices.len() % floats_per_vertex != 0 {
            return Err(PrimitiveError::InvalidVertexData {
                len: vertices.len(),
                floats_per_vertex,
            });
        }
        let vertex_count = vertices.len() / floats_per_vertex;
        Ok(Self {
            device,
            buffer_layout: layout.clone(),
            layout,
            vertices,
            vertex_count,
            vao: None,
            buffer: None,
        })
    }

    /// Axis-aligned cube of edge `size` centred on the origin
    ///
    /// Emits 36 vertices (two triangles per face) with the fields `layout`
    /// asks for. Normals point out of each face.
    pub fn cube(device: DeviceRef, size: f32, layout: VertexLayout) -> Self {
        let half = size / 2.0;
        let mut vertices = Vec::with_capacity(CUBE_VERTEX_COUNT * layout.floats_per_vertex());
        for (normal, corners) in &CUBE_FACES {
            for (corner, uv) in corners {
                for attribute in layout.attributes() {
                    match attribute.semantic {
                        VertexSemantic::Position => vertices.extend(corner.iter().map(|c| c * half)),
                        VertexSemantic::Normal => vertices.extend_from_slice(normal),
                        VertexSemantic::TexCoords => vertices.extend_from_slice(uv),
                    }
                }
            }
        }
        Self {
            device,
            buffer_layout: layout.clone(),
            layout,
            vertices,
            vertex_count: CUBE_VERTEX_COUNT,
            vao: None,
            buffer: None,
        }
    }

    /// Upload the vertex data into an owned buffer and bind the attributes
    /// `shader` consumes
    ///
    /// Recreating releases the previous device objects first. The vertex
    /// array stays bound afterwards.
    pub fn create(&mut self, shader: &Shader) -> Result<(), PrimitiveError> {
        self.destroy();

        let vao = self.device.create_vertex_array()?;
        let vbo = match self.device.create_buffer() {
            Ok(vbo) => vbo,
            Err(e) => {
                self.device.delete_vertex_array(vao);
                return Err(e.into());
            }
        };
        self.device.bind_vertex_array(Some(vao));
        self.device.upload_vertex_data(vbo, bytemuck::cast_slice(&self.vertices));

        self.vao = Some(vao);
        self.buffer = Some(VertexBuffer::Owned(vbo));
        self.buffer_layout = self.layout.clone();
        self.bind_vertex_attributes(shader);

        log::debug!(
            "Primitive created: vao {} vbo {} ({} vertices, stride {})",
            vao.0,
            vbo.0,
            self.vertex_count,
            self.layout.stride()
        );
        Ok(())
    }

    /// Create a vertex array that reads `source`'s buffer
    ///
    /// Every semantic of this primitive's layout must exist in the source
    /// layout with the same component count. The draw count becomes the
    /// source's vertex count.
    pub fn create_shared(&mut self, shader: &Shader, source: &Primitive) -> Result<(), PrimitiveError> {
        let Some(buffer) = source.buffer else {
            return Err(PrimitiveError::SourceNotCreated);
        };
        for attribute in self.layout.attributes() {
            match source.buffer_layout.attribute(attribute.semantic) {
                Some(other) if other.components == attribute.components => {}
                _ => return Err(PrimitiveError::IncompatibleLayout(attribute.semantic)),
            }
        }

        self.destroy();

        let vao = self.device.create_vertex_array()?;
        self.device.bind_vertex_array(Some(vao));
        self.device.bind_vertex_buffer(Some(buffer.id()));

        self.vao = Some(vao);
        self.buffer = Some(VertexBuffer::Shared(buffer.id()));
        self.buffer_layout = source.buffer_layout.clone();
        self.vertex_count = source.vertex_count;
        self.bind_vertex_attributes(shader);

        log::debug!("Primitive created: vao {} sharing vbo {}", vao.0, buffer.id().0);
        Ok(())
    }

    /// Point each field of this layout that `shader` consumes at the bound
    /// buffer, using the buffer's stride
    ///
    /// The vertex array and buffer must be bound.
    pub fn bind_vertex_attributes(&self, shader: &Shader) {
        let stride = self.buffer_layout.stride();
        for attribute in self.layout.attributes() {
            let name = attribute.semantic.attribute_name();
            let Some(field) = self.buffer_layout.attribute(attribute.semantic) else {
                continue;
            };
            if shader.has_attribute(name) {
                shader.bind_attribute_strided(name, field.offset, stride, false);
            } else {
                log::debug!("Shader {} does not consume {}, skipped", shader.name(), name);
            }
        }
    }

    /// Bind the vertex array
    ///
    /// # Panics
    /// If the primitive has not been created.
    pub fn bind(&self) {
        self.device.bind_vertex_array(Some(self.require_vao()));
    }

    /// Draw every vertex as a triangle list, rebinding the vertex array
    /// first when `also_bind` is set
    ///
    /// # Panics
    /// If the primitive has not been created.
    pub fn draw(&self, also_bind: bool) {
        let vao = self.require_vao();
        if also_bind {
            self.device.bind_vertex_array(Some(vao));
        }
        self.device.draw_triangles(0, self.vertex_count as i32);
    }

    /// Release the vertex array and, when owned, the buffer; safe to call
    /// repeatedly
    pub fn destroy(&mut self) {
        if let Some(vao) = self.vao.take() {
            self.device.delete_vertex_array(vao);
        }
        if let Some(buffer) = self.buffer.take() {
            if let VertexBuffer::Owned(vbo) = buffer {
                self.device.delete_buffer(vbo);
            }
            log::debug!("Primitive destroyed");
        }
    }

    fn require_vao(&self) -> VertexArrayId {
        match self.vao {
            Some(vao) => vao,
            None => panic!("primitive drawn before create"),
        }
    }

    /// Layout of this primitive's vertices
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// Interleaved vertex data
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Vertices drawn per call
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Vertex array, absent until created
    pub fn vao(&self) -> Option<VertexArrayId> {
        self.vao
    }

    /// Buffer read by this primitive
    pub fn buffer(&self) -> Option<VertexBuffer> {
        self.buffer
    }

    /// Device objects exist
    pub fn is_created(&self) -> bool {
        self.vao.is_some()
    }
}

impl Drop for Primitive {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Primitive")
            .field("layout", &self.layout)
            .field("vertex_count", &self.vertex_count)
            .field("vao", &self.vao)
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}
