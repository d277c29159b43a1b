use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use super::vertex::{SuperVertex, Vertex};

/// Attribute component format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    /// Sentinel format of [`LayoutAttribute::END`].
    Null,
    Float,
    Float2,
    Float3,
    Float4,
}

impl VertexFormat {
    /// Byte size of one attribute of this format.
    pub const fn size(self) -> usize {
        match self {
            VertexFormat::Null => 0,
            VertexFormat::Float => 4,
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
        }
    }

    pub fn to_wgpu(self) -> Option<wgpu::VertexFormat> {
        match self {
            VertexFormat::Null => None,
            VertexFormat::Float => Some(wgpu::VertexFormat::Float32),
            VertexFormat::Float2 => Some(wgpu::VertexFormat::Float32x2),
            VertexFormat::Float3 => Some(wgpu::VertexFormat::Float32x3),
            VertexFormat::Float4 => Some(wgpu::VertexFormat::Float32x4),
        }
    }
}

/// One field of a packed vertex: semantic name, format and byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutAttribute {
    pub name: &'static str,
    pub format: VertexFormat,
    pub offset: usize,
}

impl LayoutAttribute {
    /// Terminates a static attribute list.
    pub const END: LayoutAttribute = LayoutAttribute::new("", VertexFormat::Null, 0);

    pub const fn new(name: &'static str, format: VertexFormat, offset: usize) -> Self {
        Self {
            name,
            format,
            offset,
        }
    }

    pub fn is_end(&self) -> bool {
        self.format == VertexFormat::Null
    }
}

/// Packs a run of super-vertices into a native vertex format.
pub type SuperVertexCopier = fn(&[SuperVertex], &mut Vec<u8>);

/// Describes one packed vertex format.
#[derive(Debug)]
pub struct BufferLayout {
    attributes: Vec<LayoutAttribute>,
    stride: usize,
    copy_fn: SuperVertexCopier,
    wgpu_attributes: Vec<wgpu::VertexAttribute>,
}

impl BufferLayout {
    /// Builds a layout from a static list, reading up to (not including) the
    /// [`LayoutAttribute::END`] sentinel.
    pub fn from_attributes(list: &[LayoutAttribute], copy_fn: SuperVertexCopier) -> Self {
        let attributes: Vec<LayoutAttribute> =
            list.iter().take_while(|a| !a.is_end()).copied().collect();

        let stride = attributes.iter().map(|a| a.format.size()).sum();

        let wgpu_attributes = attributes
            .iter()
            .enumerate()
            .filter_map(|(location, a)| {
                a.format.to_wgpu().map(|format| wgpu::VertexAttribute {
                    format,
                    offset: a.offset as u64,
                    shader_location: location as u32,
                })
            })
            .collect();

        Self {
            attributes,
            stride,
            copy_fn,
            wgpu_attributes,
        }
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn attribute(&self, index: usize) -> Option<&LayoutAttribute> {
        self.attributes.get(index)
    }

    pub fn attributes(&self) -> &[LayoutAttribute] {
        &self.attributes
    }

    /// Packs `verts` into this layout's native format.
    pub fn copy_from_super_vertex(&self, verts: &[SuperVertex]) -> Vec<u8> {
        let mut out = Vec::with_capacity(verts.len() * self.stride);
        (self.copy_fn)(verts, &mut out);
        out
    }

    /// Shader locations follow attribute order.
    pub fn vertex_buffer_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.wgpu_attributes,
        }
    }
}

fn copy_as<T: Vertex>(src: &[SuperVertex], dst: &mut Vec<u8>) {
    let packed: Vec<T> = src.iter().map(T::from_super_vertex).collect();
    dst.extend_from_slice(bytemuck::cast_slice(&packed));
}

/// Layouts keyed by vertex type; each is built once and shared.
#[derive(Debug, Default)]
pub struct LayoutRegistry {
    layouts: HashMap<TypeId, Arc<BufferLayout>>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the layout of `T`, building it on first request.
    pub fn acquire_layout_of<T: Vertex + 'static>(&mut self) -> Arc<BufferLayout> {
        self.layouts
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                let layout = BufferLayout::from_attributes(T::ATTRIBUTES, copy_as::<T>);
                debug_assert_eq!(
                    layout.stride(),
                    std::mem::size_of::<T>(),
                    "attribute list of {} does not cover the whole vertex",
                    std::any::type_name::<T>()
                );
                log::debug!(
                    "buffer layout for {}: {} attributes, stride {}",
                    std::any::type_name::<T>(),
                    layout.attribute_count(),
                    layout.stride()
                );
                Arc::new(layout)
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
