use bytemuck::{Pod, Zeroable};
use std::mem::offset_of;

use crate::coords::{Rgba, Vec2, Vec3};

use super::layout::{LayoutAttribute, VertexFormat};

/// Layout-agnostic vertex used by mesh-building code.
///
/// It is packed into a shader-specific format by the mesh's layout at upload
/// time.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct SuperVertex {
    pub position: Vec3,
    pub color: Rgba,
    pub uv: Vec2,
}

impl SuperVertex {
    #[inline]
    pub const fn new(position: Vec3, color: Rgba, uv: Vec2) -> Self {
        Self {
            position,
            color,
            uv,
        }
    }
}

/// A packed vertex format with a static attribute list.
pub trait Vertex: Pod {
    /// Attributes in shader-location order, terminated by [`LayoutAttribute::END`].
    const ATTRIBUTES: &'static [LayoutAttribute];

    fn from_super_vertex(v: &SuperVertex) -> Self;
}

/// Position, color, uv.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct VertexPcu {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

impl Vertex for VertexPcu {
    const ATTRIBUTES: &'static [LayoutAttribute] = &[
        LayoutAttribute::new("POSITION", VertexFormat::Float3, offset_of!(VertexPcu, position)),
        LayoutAttribute::new("COLOR", VertexFormat::Float4, offset_of!(VertexPcu, color)),
        LayoutAttribute::new("TEXCOORD", VertexFormat::Float2, offset_of!(VertexPcu, uv)),
        LayoutAttribute::END,
    ];

    fn from_super_vertex(v: &SuperVertex) -> Self {
        Self {
            position: v.position.to_array(),
            color: v.color.to_array(),
            uv: [v.uv.x, v.uv.y],
        }
    }
}
