//! # Rendering System
//!
//! GPU resource wrappers over a single immediate-mode graphics context.
//!
//! ## Architecture
//!
//! - **Device**: the [`GraphicsDevice`](device::GraphicsDevice) boundary every wrapper calls through
//! - **Shader / Texture / Primitive**: owning wrappers with explicit load, bind and destroy
//! - **Material / Light**: values pushed into a shader's uniform structs
//! - **RenderItem**: a borrowed primitive plus material and transform
//! - **Camera**: free-fly view and projection state
//!
//! ## Ordering
//!
//! Wrappers are only usable after a window has made its context current,
//! because the device handle they take only exists from that point on.
//! Every wrapper releases its objects on drop; releasing twice is a no-op.

pub mod camera;
pub mod device;
pub mod light;
pub mod material;
pub mod primitive;
pub mod render_item;
pub mod shader;
pub mod texture;

pub use camera::{Camera, CameraMovement};
pub use device::{clear_screen, DeviceRef, GraphicsDevice};
pub use light::{
    bind_directional_light, bind_light, bind_point_light, bind_spot_light, Attenuation,
    DirectionalLight, Light, LightColor, PointLight, SpotLight,
};
pub use material::{bind_material, ColorMaterial, Material};
pub use primitive::{Primitive, PrimitiveError, VertexBuffer, VertexLayout, VertexSemantic};
pub use render_item::RenderItem;
pub use shader::{Shader, ShaderError};
pub use texture::{Texture, TextureError};
