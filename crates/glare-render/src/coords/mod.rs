//! Math and color types shared by the resource layer.
//!
//! World space is right-handed 2D with +X right and +Y up. UV space has its
//! origin at the top-left of a texture with +V down.

mod aabb2;
mod color;
mod obb2;
mod vec2;

pub use aabb2::Aabb2;
pub use color::{Rgba, Rgba8};
pub use obb2::Obb2;
pub use vec2::{IVec2, Vec2, Vec3};
