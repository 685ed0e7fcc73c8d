//! A primitive drawn with a material at a transform

use crate::foundation::math::Mat4;
use crate::render::material::{bind_material, Material};
use crate::render::primitive::Primitive;
use crate::render::shader::Shader;

/// Primitive, material and model matrix for one visual object
///
/// Borrows the primitive and any textures; destroying an item never
/// releases them.
#[derive(Debug, Clone, Copy)]
pub struct RenderItem<'a> {
    primitive: &'a Primitive,
    material: Material<'a>,
    model: Mat4,
}

impl<'a> RenderItem<'a> {
    /// Item at the identity transform
    pub fn new(primitive: &'a Primitive, material: Material<'a>) -> Self {
        Self {
            primitive,
            material,
            model: Mat4::identity(),
        }
    }

    /// Replace the model matrix
    pub fn set_model(&mut self, model: Mat4) {
        self.model = model;
    }

    /// Builder form of [`RenderItem::set_model`]
    pub fn with_model(mut self, model: Mat4) -> Self {
        self.model = model;
        self
    }

    /// Model matrix
    pub fn model(&self) -> &Mat4 {
        &self.model
    }

    /// Material
    pub fn material(&self) -> &Material<'a> {
        &self.material
    }

    /// Replace the material
    pub fn set_material(&mut self, material: Material<'a>) {
        self.material = material;
    }

    /// Primitive drawn
    pub fn primitive(&self) -> &'a Primitive {
        self.primitive
    }

    /// Bind `shader` and the material, upload `model` when the program
    /// uses it, then draw the primitive
    ///
    /// # Panics
    /// If the shader is not loaded or the primitive not created.
    pub fn draw(&self, shader: &Shader) {
        shader.bind();
        bind_material(shader, &self.material);
        if shader.has_uniform("model") {
            shader.set_mat4("model", &self.model);
        }
        self.primitive.draw(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{ImageData, MemoryImageSource};
    use crate::foundation::math::Vec3;
    use crate::render::device::{DeviceCall, HeadlessDevice, UniformValue};
    use crate::render::primitive::VertexLayout;
    use crate::render::shader::tests::lighting_sources;
    use crate::render::texture::Texture;
    use std::rc::Rc;

    #[test]
    fn test_draw_binds_material_then_draws() {
        let device = Rc::new(HeadlessDevice::new());
        let mut shader = Shader::new(device.clone(), "lighting");
        shader.load(&lighting_sources()).unwrap();
        let images = MemoryImageSource::new()
            .with_image("diffuse.png", ImageData::solid_color(1, 1, [255, 255, 255, 255]))
            .with_image("specular.png", ImageData::solid_color(1, 1, [0, 0, 0, 255]));
        let mut diffuse = Texture::new(device.clone(), "diffuse.png");
        diffuse.load(&images, true).unwrap();
        let mut specular = Texture::new(device.clone(), "specular.png");
        specular.load(&images, true).unwrap();
        let mut cube = Primitive::cube(device.clone(), 1.0, VertexLayout::position_normal_tex_coords());
        cube.create(&shader).unwrap();

        let model = Mat4::new_translation(&Vec3::new(1.0, 0.0, 0.0));
        let item = RenderItem::new(&cube, Material::textured(&diffuse, &specular, 64.0)).with_model(model);
        device.clear_calls();
        item.draw(&shader);

        let program = shader.program().unwrap();
        let Some(UniformValue::Mat4(uploaded)) = device.uniform_value(program, "model") else {
            panic!("model not uploaded");
        };
        assert_eq!(uploaded[12], 1.0);
        assert_eq!(device.draw_calls(), vec![36]);
        // Textures are bound before the draw
        let calls = device.calls();
        let bind = calls.iter().position(|c| matches!(c, DeviceCall::BindTexture(_))).unwrap();
        let draw = calls.iter().position(|c| matches!(c, DeviceCall::DrawTriangles { .. })).unwrap();
        assert!(bind < draw);
    }

    #[test]
    fn test_dropping_item_keeps_primitive() {
        let device = Rc::new(HeadlessDevice::new());
        let mut shader = Shader::new(device.clone(), "lighting");
        shader.load(&lighting_sources()).unwrap();
        let mut cube = Primitive::cube(device.clone(), 1.0, VertexLayout::position());
        cube.create(&shader).unwrap();
        {
            let _item = RenderItem::new(&cube, Material::Color(Default::default()));
        }
        assert!(cube.is_created());
        assert_eq!(device.live_vertex_arrays().len(), 1);
    }
}
