//! Sandbox demo application
//!
//! A textured, lit cube and a small cube marking the light, which borrows
//! the first cube's vertex buffer. WASD flies the camera, the mouse turns
//! it, the wheel zooms. Tab toggles cursor capture, Escape quits.
//!
//! Settings are read from `sandbox.toml` next to the binary's working
//! directory when present.

use flare_engine::assets::{ImageData, MemoryImageSource};
use flare_engine::config::Config;
use flare_engine::core::AssetConfig;
use flare_engine::foundation::logging;
use flare_engine::prelude::*;
use flare_engine::render::{bind_light, Light};

const DIFFUSE_MAP: &str = "container2.png";
const SPECULAR_MAP: &str = "container2_specular.png";
const LIGHT_ORBIT_RADIUS: f32 = 1.6;

/// GPU objects, created once a context exists
struct Scene {
    lighting: Shader,
    light_shader: Shader,
    cube: Primitive,
    light_cube: Primitive,
    diffuse: Texture,
    specular: Texture,
}

impl Scene {
    fn load(ctx: &FrameContext<'_>) -> Result<Self, AppError> {
        let device = ctx.device().clone();
        let shaders = ctx.shader_source();
        let images = ctx.image_source();

        let mut lighting = Shader::new(device.clone(), "lighting");
        lighting.load(&shaders)?;
        let mut light_shader = Shader::new(device.clone(), "light_cube");
        light_shader.load(&shaders)?;

        let mut cube = Primitive::cube(device.clone(), 1.0, VertexLayout::position_normal_tex_coords());
        cube.create(&lighting)?;
        let mut light_cube = Primitive::new(device.clone(), VertexLayout::position(), Vec::new())?;
        light_cube.create_shared(&light_shader, &cube)?;

        let diffuse = load_texture(&device, DIFFUSE_MAP, &images, [200, 140, 80, 255])?;
        let specular = load_texture(&device, SPECULAR_MAP, &images, [128, 128, 128, 255])?;

        Ok(Self {
            lighting,
            light_shader,
            cube,
            light_cube,
            diffuse,
            specular,
        })
    }
}

/// Load a texture from disk, or a flat color when the file is unusable
fn load_texture(device: &DeviceRef, name: &str, images: &dyn ImageSource, fallback: [u8; 4]) -> Result<Texture, AppError> {
    let mut texture = Texture::new(device.clone(), name);
    if let Err(e) = texture.load(images, true) {
        log::warn!("{}; using a flat color instead", e);
        let flat = MemoryImageSource::new().with_image(name, ImageData::solid_color(1, 1, fallback));
        texture.load(&flat, false)?;
    }
    Ok(texture)
}

struct Sandbox {
    scene: Option<Scene>,
    light: Light,
    cube_angle: f32,
}

impl Sandbox {
    fn new() -> Self {
        Self {
            scene: None,
            light: Light {
                position: Vec3::new(LIGHT_ORBIT_RADIUS, 1.0, 0.0),
                color: LightColor::from_color(Vec3::new(1.0, 1.0, 1.0)),
            },
            cube_angle: 0.0,
        }
    }
}

impl Application for Sandbox {
    fn initialize(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), AppError> {
        log::info!("Loading sandbox scene...");
        self.scene = Some(Scene::load(ctx)?);
        ctx.set_cursor_locked(true);
        Ok(())
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>, delta_time: f32) -> Result<(), AppError> {
        if ctx.input().was_down(Key::Escape) {
            log::info!("Escape released, exiting");
            ctx.exit_now();
        }
        if ctx.input().was_up(Key::Tab) {
            let locked = !ctx.input().is_cursor_locked();
            ctx.set_cursor_locked(locked);
        }

        let moves = [
            (Key::W, CameraMovement::Forward),
            (Key::S, CameraMovement::Backward),
            (Key::A, CameraMovement::Left),
            (Key::D, CameraMovement::Right),
        ];
        for (key, movement) in moves {
            if ctx.input().is_down(key) {
                ctx.camera_mut().process_keyboard(movement, delta_time);
            }
        }

        let time = ctx.time();
        self.light.position = Vec3::new(
            LIGHT_ORBIT_RADIUS * time.cos(),
            1.0,
            LIGHT_ORBIT_RADIUS * time.sin(),
        );
        self.cube_angle += 0.3 * delta_time;
        Ok(())
    }

    fn render(&mut self, ctx: &mut FrameContext<'_>, _delta_time: f32) -> Result<(), AppError> {
        clear_screen(ctx.device().as_ref(), 0.08, 0.08, 0.1);
        let Some(scene) = &self.scene else {
            return Ok(());
        };
        let camera = ctx.camera();
        let view = camera.view_matrix();
        let projection = camera.projection();

        scene.lighting.bind();
        scene.lighting.set_mat4("view", &view);
        scene.lighting.set_mat4("projection", &projection);
        scene.lighting.set_vec3("viewPos", &camera.position());
        bind_light(&scene.lighting, &self.light);

        let material = Material::textured(&scene.diffuse, &scene.specular, 32.0);
        let model = Mat4::new_rotation(Vec3::new(0.5, 1.0, 0.0).normalize() * self.cube_angle);
        RenderItem::new(&scene.cube, material).with_model(model).draw(&scene.lighting);

        let light_model = Mat4::new_translation(&self.light.position) * Mat4::new_scaling(0.2);
        scene.light_shader.bind();
        scene.light_shader.set_mat4("model", &light_model);
        scene.light_shader.set_mat4("view", &view);
        scene.light_shader.set_mat4("projection", &projection);
        scene.light_shader.set_vec3("lightColor", &self.light.color.specular);
        scene.light_cube.draw(true);
        Ok(())
    }

    fn cleanup(&mut self, _ctx: &mut FrameContext<'_>) -> Result<(), AppError> {
        // Borrowers go before the buffer owner
        if let Some(mut scene) = self.scene.take() {
            scene.light_cube.destroy();
            scene.cube.destroy();
        }
        log::info!("Sandbox scene released");
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let assets_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/");
    let mut config = EngineConfig::load_or_default("sandbox.toml")?;
    if config.assets == AssetConfig::default() {
        config = config.with_assets(
            AssetConfig::default()
                .with_shader_path(format!("{}shaders/", assets_dir))
                .with_texture_path(format!("{}textures/", assets_dir)),
        );
    }

    let platform = GlfwPlatform::new(&config.context, &config.window);
    let window = config.window.clone();
    let mut engine = Engine::new(config, Box::new(platform));
    engine.init(Camera::at(Vec3::new(0.0, 0.5, 4.0)), Sandbox::new())?;
    engine.create_window(&window.title, window.width, window.height)?;

    engine.run()?;
    engine.shutdown();
    Ok(())
}
