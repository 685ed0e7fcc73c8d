//! Surface materials and their shader binding

use crate::foundation::math::Vec3;
use crate::render::shader::Shader;
use crate::render::texture::Texture;

/// Texture unit the diffuse map is bound to
pub const DIFFUSE_SLOT: u32 = 0;
/// Texture unit the specular map is bound to
pub const SPECULAR_SLOT: u32 = 1;

/// Phong coefficients without textures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMaterial {
    /// Ambient reflectance
    pub ambient: Vec3,
    /// Diffuse reflectance
    pub diffuse: Vec3,
    /// Specular reflectance
    pub specular: Vec3,
    /// Specular exponent
    pub shininess: f32,
}

impl ColorMaterial {
    /// Material reflecting `color` everywhere with a faint ambient term
    pub fn solid(color: Vec3, shininess: f32) -> Self {
        Self {
            ambient: color * 0.1,
            diffuse: color,
            specular: Vec3::new(0.5, 0.5, 0.5),
            shininess,
        }
    }
}

impl Default for ColorMaterial {
    fn default() -> Self {
        Self::solid(Vec3::new(1.0, 1.0, 1.0), 32.0)
    }
}

/// What a surface looks like
///
/// Textured materials borrow their maps; the textures must outlive every
/// render item using them.
#[derive(Debug, Clone, Copy)]
pub enum Material<'a> {
    /// Diffuse and specular maps
    Textured {
        /// Diffuse map, unit 0
        diffuse: &'a Texture,
        /// Specular map, unit 1
        specular: &'a Texture,
        /// Specular exponent
        shininess: f32,
    },
    /// Plain coefficients
    Color(ColorMaterial),
}

impl<'a> Material<'a> {
    /// Textured material
    pub fn textured(diffuse: &'a Texture, specular: &'a Texture, shininess: f32) -> Self {
        Self::Textured {
            diffuse,
            specular,
            shininess,
        }
    }

    /// Specular exponent
    pub fn shininess(&self) -> f32 {
        match self {
            Self::Textured { shininess, .. } => *shininess,
            Self::Color(color) => color.shininess,
        }
    }
}

impl From<ColorMaterial> for Material<'_> {
    fn from(color: ColorMaterial) -> Self {
        Self::Color(color)
    }
}

/// Push a material into `shader`'s `material` uniform struct
///
/// Textured materials bind the diffuse map to unit 0 and the specular map
/// to unit 1, then bind the shader and set `material.shininess`. The sampler
/// uniforms are pointed at those units when the program declares them. A
/// textured material whose maps are not loaded is skipped entirely.
///
/// Color materials bind the shader and set the four coefficient uniforms.
pub fn bind_material(shader: &Shader, material: &Material<'_>) {
    match material {
        Material::Textured {
            diffuse,
            specular,
            shininess,
        } => {
            if !diffuse.is_loaded() || !specular.is_loaded() {
                log::debug!("Material skipped: {} or {} not loaded", diffuse.name(), specular.name());
                return;
            }
            diffuse.bind(DIFFUSE_SLOT);
            specular.bind(SPECULAR_SLOT);
            shader.bind();
            if shader.has_uniform("material.diffuse") {
                shader.set_int("material.diffuse", DIFFUSE_SLOT as i32);
            }
            if shader.has_uniform("material.specular") {
                shader.set_int("material.specular", SPECULAR_SLOT as i32);
            }
            shader.set_float("material.shininess", *shininess);
        }
        Material::Color(color) => {
            shader.bind();
            shader.set_vec3("material.ambient", &color.ambient);
            shader.set_vec3("material.diffuse", &color.diffuse);
            shader.set_vec3("material.specular", &color.specular);
            shader.set_float("material.shininess", color.shininess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{ImageData, MemoryImageSource, MemorySource};
    use crate::render::device::{HeadlessDevice, UniformValue};
    use crate::render::shader::tests::lighting_sources;
    use std::rc::Rc;

    const COLOR_VS: &str = "#version 460 core\nlayout (location = 0) in vec3 aPos;\nvoid main() { gl_Position = vec4(aPos, 1.0); }\n";
    const COLOR_FS: &str = "#version 460 core\nstruct Material { vec3 ambient; vec3 diffuse; vec3 specular; float shininess; };\nuniform Material material;\nout vec4 FragColor;\nvoid main() { FragColor = vec4(material.diffuse, 1.0); }\n";

    fn texture(device: &Rc<HeadlessDevice>, name: &str) -> Texture {
        let images = MemoryImageSource::new().with_image(name, ImageData::solid_color(2, 2, [255, 0, 0, 255]));
        let mut texture = Texture::new(device.clone(), name);
        texture.load(&images, true).unwrap();
        texture
    }

    #[test]
    fn test_textured_binds_units_and_shininess() {
        let device = Rc::new(HeadlessDevice::new());
        let mut shader = Shader::new(device.clone(), "lighting");
        shader.load(&lighting_sources()).unwrap();
        let diffuse = texture(&device, "container.png");
        let specular = texture(&device, "container_specular.png");

        bind_material(&shader, &Material::textured(&diffuse, &specular, 32.0));

        let program = shader.program().unwrap();
        assert_eq!(device.bound_texture(0), diffuse.id());
        assert_eq!(device.bound_texture(1), specular.id());
        assert_eq!(device.bound_program(), Some(program));
        assert_eq!(device.uniform_value(program, "material.shininess"), Some(UniformValue::Float(32.0)));
        assert_eq!(device.uniform_value(program, "material.specular"), Some(UniformValue::Int(1)));
    }

    #[test]
    fn test_unloaded_maps_skip_binding() {
        let device = Rc::new(HeadlessDevice::new());
        let mut shader = Shader::new(device.clone(), "lighting");
        shader.load(&lighting_sources()).unwrap();
        let diffuse = texture(&device, "container.png");
        let specular = Texture::new(device.clone(), "missing.png");
        device.clear_calls();

        bind_material(&shader, &Material::textured(&diffuse, &specular, 32.0));
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_color_material_sets_coefficients() {
        let device = Rc::new(HeadlessDevice::new());
        let mut shader = Shader::new(device.clone(), "color");
        shader
            .load(&MemorySource::new().with_shader("color", COLOR_VS, COLOR_FS))
            .unwrap();
        let material: Material<'_> = ColorMaterial::solid(Vec3::new(1.0, 0.5, 0.25), 8.0).into();

        bind_material(&shader, &material);

        let program = shader.program().unwrap();
        assert_eq!(
            device.uniform_value(program, "material.diffuse"),
            Some(UniformValue::Vec3([1.0, 0.5, 0.25]))
        );
        assert_eq!(device.uniform_value(program, "material.shininess"), Some(UniformValue::Float(8.0)));
        assert_eq!(material.shininess(), 8.0);
    }
}
