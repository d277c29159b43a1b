//! glare: the rendering resource layer.
//!
//! Vertex layouts, GPU buffers, textures, samplers, shaders with lazily
//! rebuilt pipeline state, meshes and their builders, sprite sheets and
//! frame animation, and a small immediate-mode renderer driving them on wgpu.

pub mod coords;
pub mod core;
pub mod desc;
pub mod device;
pub mod logging;
pub mod render;
pub mod time;
pub mod window;
