//! Light sources and their shader binding
//!
//! Each light type fills a uniform struct of a fixed name: `light`,
//! `dir_light`, `point_lights[i]` or `spot_light`. The shader must be bound
//! and must declare every field written; a missing field panics like any
//! other unknown uniform.

use crate::foundation::math::{utils::deg_to_rad, Vec3};
use crate::render::shader::Shader;

/// Phong light intensities shared by every light type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightColor {
    /// Ambient intensity
    pub ambient: Vec3,
    /// Diffuse intensity
    pub diffuse: Vec3,
    /// Specular intensity
    pub specular: Vec3,
}

impl LightColor {
    /// Intensities derived from one color
    pub fn from_color(color: Vec3) -> Self {
        Self {
            ambient: color * 0.2,
            diffuse: color * 0.5,
            specular: color,
        }
    }
}

impl Default for LightColor {
    fn default() -> Self {
        Self::from_color(Vec3::new(1.0, 1.0, 1.0))
    }
}

/// Positional light without attenuation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// World position
    pub position: Vec3,
    /// Intensities
    pub color: LightColor,
}

/// Light arriving from one direction everywhere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels
    pub direction: Vec3,
    /// Intensities
    pub color: LightColor,
}

/// Distance attenuation `1 / (constant + linear d + quadratic d²)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    /// Constant term, normally 1
    pub constant: f32,
    /// Linear term
    pub linear: f32,
    /// Quadratic term
    pub quadratic: f32,
}

impl Attenuation {
    /// Attenuation with a constant term of 1
    pub fn new(linear: f32, quadratic: f32) -> Self {
        Self {
            constant: 1.0,
            linear,
            quadratic,
        }
    }
}

impl Default for Attenuation {
    // Covers roughly 50 units
    fn default() -> Self {
        Self::new(0.09, 0.032)
    }
}

/// Attenuated light radiating in every direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// World position
    pub position: Vec3,
    /// Falloff
    pub attenuation: Attenuation,
    /// Intensities
    pub color: LightColor,
}

/// Attenuated cone of light
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    /// World position
    pub position: Vec3,
    /// Cone axis
    pub direction: Vec3,
    /// Falloff
    pub attenuation: Attenuation,
    /// Inner cone half-angle, degrees
    pub cutoff: f32,
    /// Outer cone half-angle, degrees
    pub outer_cutoff: f32,
    /// Intensities
    pub color: LightColor,
}

fn set_color(shader: &Shader, prefix: &str, color: &LightColor) {
    shader.set_vec3(&format!("{prefix}.ambient"), &color.ambient);
    shader.set_vec3(&format!("{prefix}.diffuse"), &color.diffuse);
    shader.set_vec3(&format!("{prefix}.specular"), &color.specular);
}

fn set_attenuation(shader: &Shader, prefix: &str, attenuation: &Attenuation) {
    shader.set_float(&format!("{prefix}.constant"), attenuation.constant);
    shader.set_float(&format!("{prefix}.linear"), attenuation.linear);
    shader.set_float(&format!("{prefix}.quadratic"), attenuation.quadratic);
}

/// Fill the `light` struct
pub fn bind_light(shader: &Shader, light: &Light) {
    shader.set_vec3("light.position", &light.position);
    set_color(shader, "light", &light.color);
}

/// Fill the `dir_light` struct
pub fn bind_directional_light(shader: &Shader, light: &DirectionalLight) {
    shader.set_vec3("dir_light.direction", &light.direction);
    set_color(shader, "dir_light", &light.color);
}

/// Fill element `index` of the `point_lights` array
pub fn bind_point_light(shader: &Shader, light: &PointLight, index: usize) {
    let prefix = format!("point_lights[{index}]");
    shader.set_vec3(&format!("{prefix}.position"), &light.position);
    set_attenuation(shader, &prefix, &light.attenuation);
    set_color(shader, &prefix, &light.color);
}

/// Fill the `spot_light` struct
///
/// Cutoffs are uploaded as cosines so the fragment stage compares them
/// directly against a dot product.
pub fn bind_spot_light(shader: &Shader, light: &SpotLight) {
    shader.set_vec3("spot_light.position", &light.position);
    shader.set_vec3("spot_light.direction", &light.direction);
    set_attenuation(shader, "spot_light", &light.attenuation);
    shader.set_float("spot_light.cutoff", deg_to_rad(light.cutoff).cos());
    shader.set_float("spot_light.outer_cutoff", deg_to_rad(light.outer_cutoff).cos());
    set_color(shader, "spot_light", &light.color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemorySource;
    use crate::render::device::{HeadlessDevice, UniformValue};
    use approx::assert_relative_eq;
    use std::rc::Rc;

    const VS: &str = "#version 460 core\nlayout (location = 0) in vec3 aPos;\nvoid main() { gl_Position = vec4(aPos, 1.0); }\n";
    const FS: &str = r"#version 460 core
struct Light { vec3 position; vec3 ambient; vec3 diffuse; vec3 specular; };
struct DirLight { vec3 direction; vec3 ambient; vec3 diffuse; vec3 specular; };
struct PointLight {
    vec3 position;
    float constant; float linear; float quadratic;
    vec3 ambient; vec3 diffuse; vec3 specular;
};
struct SpotLight {
    vec3 position; vec3 direction;
    float constant; float linear; float quadratic;
    float cutoff; float outer_cutoff;
    vec3 ambient; vec3 diffuse; vec3 specular;
};
#define NR_POINT_LIGHTS 2
uniform Light light;
uniform DirLight dir_light;
uniform PointLight point_lights[2];
uniform SpotLight spot_light;
out vec4 FragColor;
void main() { FragColor = vec4(light.ambient + dir_light.ambient, 1.0); }
";

    fn bound(device: &Rc<HeadlessDevice>) -> Shader {
        let mut shader = Shader::new(device.clone(), "lights");
        shader.load(&MemorySource::new().with_shader("lights", VS, FS)).unwrap();
        shader.bind();
        shader
    }

    #[test]
    fn test_point_light_fills_indexed_element() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = bound(&device);
        let light = PointLight {
            position: Vec3::new(1.0, 2.0, 3.0),
            attenuation: Attenuation::default(),
            color: LightColor::default(),
        };
        bind_point_light(&shader, &light, 1);

        let program = shader.program().unwrap();
        assert_eq!(
            device.uniform_value(program, "point_lights[1].position"),
            Some(UniformValue::Vec3([1.0, 2.0, 3.0]))
        );
        assert_eq!(device.uniform_value(program, "point_lights[1].constant"), Some(UniformValue::Float(1.0)));
        assert_eq!(device.uniform_value(program, "point_lights[0].position"), None);
    }

    #[test]
    fn test_spot_light_uploads_cosines() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = bound(&device);
        let light = SpotLight {
            position: Vec3::zeros(),
            direction: Vec3::new(0.0, 0.0, -1.0),
            attenuation: Attenuation::default(),
            cutoff: 60.0,
            outer_cutoff: 90.0,
            color: LightColor::default(),
        };
        bind_spot_light(&shader, &light);

        let program = shader.program().unwrap();
        let Some(UniformValue::Float(inner)) = device.uniform_value(program, "spot_light.cutoff") else {
            panic!("cutoff not set");
        };
        let Some(UniformValue::Float(outer)) = device.uniform_value(program, "spot_light.outer_cutoff") else {
            panic!("outer cutoff not set");
        };
        assert_relative_eq!(inner, 0.5, epsilon = 1e-6);
        assert_relative_eq!(outer, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_basic_and_directional_lights() {
        let device = Rc::new(HeadlessDevice::new());
        let shader = bound(&device);
        bind_light(
            &shader,
            &Light {
                position: Vec3::new(1.2, 1.0, 2.0),
                color: LightColor::from_color(Vec3::new(1.0, 1.0, 1.0)),
            },
        );
        bind_directional_light(
            &shader,
            &DirectionalLight {
                direction: Vec3::new(-0.2, -1.0, -0.3),
                color: LightColor::default(),
            },
        );

        let program = shader.program().unwrap();
        assert_eq!(
            device.uniform_value(program, "light.ambient"),
            Some(UniformValue::Vec3([0.2, 0.2, 0.2]))
        );
        assert_eq!(
            device.uniform_value(program, "dir_light.direction"),
            Some(UniformValue::Vec3([-0.2, -1.0, -0.3]))
        );
    }
}
