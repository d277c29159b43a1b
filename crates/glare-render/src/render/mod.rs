//! GPU resources and the renderer that draws with them.
//!
//! Conventions:
//! - World space is +Y up; UV space is +V down with (0, 0) at the top-left.
//! - Depth is reversed: near is 1, far is 0, cleared to 0.
//! - Pipelines share one bind layout: group 0 holds the camera and model
//!   constants, group 1 a texture and its sampler.

pub mod buffer;
pub mod layout;
pub mod mesh;
pub mod mesh_builder;
pub mod renderer;
pub mod resources;
pub mod sampler;
pub mod shader;
pub mod sprite;
pub mod surface;
pub mod texture;
pub mod vertex;

pub use buffer::{
    BufferUsage, ConstantBuffer, IndexBuffer, IndexT, MemoryUsage, RenderBuffer, VertexBuffer,
    INDEX_FORMAT,
};
pub use layout::{BufferLayout, LayoutAttribute, LayoutRegistry, VertexFormat};
pub use mesh::Mesh;
pub use renderer::{CameraConstants, ModelConstants, Renderer, RendererConfig};
pub use resources::ResourceManager;
pub use sampler::{SamplerCache, TextureFilter};
pub use shader::{
    BlendMode, CompareOp, CullMode, DepthMode, DirtyFlags, FillMode, RasterMode, Shader,
    ShaderStage, ShaderStageKind,
};
pub use sprite::{AnimFrame, AnimSource, PlaybackMode, Sprite, SpriteAnim, SpriteAnimClip, SpriteSheet};
pub use surface::Surface;
pub use texture::{ImageOwnership, Texture2D, TextureUsage};
pub use vertex::{SuperVertex, Vertex, VertexPcu};
