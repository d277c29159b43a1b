use std::sync::Arc;

use crate::device::GpuDevice;

use super::buffer::{IndexBuffer, IndexT, VertexBuffer};
use super::layout::BufferLayout;
use super::vertex::SuperVertex;

/// CPU geometry plus its lazily synchronized GPU buffers.
///
/// Builders append to `verts`/`indices` and raise the dirty flags;
/// [`Mesh::update_gpu_mesh`] re-uploads whatever is stale.
#[derive(Debug)]
pub struct Mesh {
    pub verts: Vec<SuperVertex>,
    pub indices: Vec<IndexT>,
    /// Template for appended vertices; builders copy its color.
    pub builder_brush: SuperVertex,

    layout: Option<Arc<BufferLayout>>,
    gpu_vbo: Option<VertexBuffer>,
    gpu_ibo: Option<IndexBuffer>,
    using_ibo: bool,

    pub(crate) vertex_dirty: bool,
    pub(crate) indices_dirty: bool,
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Mesh {
    /// An empty indexed mesh without a layout.
    pub fn new() -> Self {
        Self {
            verts: Vec::new(),
            indices: Vec::new(),
            builder_brush: SuperVertex::default(),
            layout: None,
            gpu_vbo: None,
            gpu_ibo: None,
            using_ibo: true,
            vertex_dirty: false,
            indices_dirty: false,
        }
    }

    pub fn with_layout(layout: Arc<BufferLayout>) -> Self {
        Self {
            layout: Some(layout),
            ..Self::new()
        }
    }

    pub fn layout(&self) -> Option<&Arc<BufferLayout>> {
        self.layout.as_ref()
    }

    /// Changing the layout forces a vertex re-upload.
    pub fn set_layout(&mut self, layout: Arc<BufferLayout>) {
        self.layout = Some(layout);
        self.vertex_dirty = true;
    }

    pub fn is_indexed(&self) -> bool {
        self.using_ibo
    }

    pub fn set_indexed(&mut self, indexed: bool) {
        if indexed != self.using_ibo {
            self.using_ibo = indexed;
            self.indices_dirty = indexed;
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.verts.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Indices for indexed meshes, vertices otherwise.
    pub fn element_count(&self) -> usize {
        if self.using_ibo {
            self.indices.len()
        } else {
            self.verts.len()
        }
    }

    pub fn is_vertex_dirty(&self) -> bool {
        self.vertex_dirty
    }

    pub fn is_indices_dirty(&self) -> bool {
        self.indices_dirty
    }

    pub fn mark_dirty(&mut self) {
        self.vertex_dirty = true;
        self.indices_dirty = true;
    }

    /// Drops all CPU geometry. The GPU buffers are replaced on next upload.
    pub fn clear(&mut self) {
        self.verts.clear();
        self.indices.clear();
        self.mark_dirty();
    }

    pub fn vertex_buffer(&self) -> Option<&VertexBuffer> {
        self.gpu_vbo.as_ref()
    }

    pub fn index_buffer(&self) -> Option<&IndexBuffer> {
        self.gpu_ibo.as_ref()
    }

    /// Re-uploads stale geometry as new immutable buffers.
    ///
    /// An empty vertex or index list releases the corresponding buffer.
    ///
    /// # Panics
    /// When the mesh has no layout.
    pub fn update_gpu_mesh(&mut self, device: &dyn GpuDevice) {
        let Some(layout) = self.layout.clone() else {
            panic!("mesh has no buffer layout; set one before uploading");
        };

        if self.vertex_dirty {
            self.gpu_vbo = None;
            if !self.verts.is_empty() {
                let bytes = layout.copy_from_super_vertex(&self.verts);
                let mut vbo = VertexBuffer::new("glare mesh vbo");
                if vbo.create_immutable_buffer(device, &bytes, self.verts.len(), layout) {
                    self.gpu_vbo = Some(vbo);
                }
            }
            self.vertex_dirty = false;
        }

        if self.using_ibo && self.indices_dirty {
            self.gpu_ibo = None;
            if !self.indices.is_empty() {
                let mut ibo = IndexBuffer::new("glare mesh ibo");
                if ibo.create_immutable_buffer(device, &self.indices) {
                    self.gpu_ibo = Some(ibo);
                }
            }
            self.indices_dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use crate::render::layout::LayoutRegistry;
    use crate::render::vertex::VertexPcu;

    fn mesh() -> Mesh {
        Mesh::with_layout(LayoutRegistry::new().acquire_layout_of::<VertexPcu>())
    }

    #[test]
    #[should_panic(expected = "no buffer layout")]
    fn upload_without_layout_panics() {
        let device = HeadlessDevice::new();
        Mesh::new().update_gpu_mesh(&device);
    }

    #[test]
    fn upload_clears_both_flags() {
        let device = HeadlessDevice::new();
        let mut m = mesh();
        m.verts.extend([SuperVertex::default(); 3]);
        m.indices.extend([0, 1, 2]);
        m.mark_dirty();

        m.update_gpu_mesh(&device);
        assert!(!m.is_vertex_dirty());
        assert!(!m.is_indices_dirty());
        assert_eq!(m.vertex_buffer().map(|b| b.count()), Some(3));
        assert_eq!(m.index_buffer().map(|b| b.count()), Some(3));
        assert!(m.vertex_buffer().is_some_and(|b| b.is_immutable()));
    }

    #[test]
    fn clean_mesh_does_not_reupload() {
        let device = HeadlessDevice::new();
        let mut m = mesh();
        m.verts.push(SuperVertex::default());
        m.indices.push(0);
        m.mark_dirty();

        m.update_gpu_mesh(&device);
        m.update_gpu_mesh(&device);
        assert_eq!(device.stats().buffers_created, 2);
    }

    #[test]
    fn non_indexed_mesh_skips_index_buffer() {
        let device = HeadlessDevice::new();
        let mut m = mesh();
        m.set_indexed(false);
        m.verts.extend([SuperVertex::default(); 3]);
        m.mark_dirty();

        m.update_gpu_mesh(&device);
        assert!(m.index_buffer().is_none());
        assert_eq!(m.element_count(), 3);
        assert_eq!(device.stats().buffers_created, 1);
    }

    #[test]
    fn vertex_upload_packs_through_layout() {
        let device = HeadlessDevice::new();
        let mut m = mesh();
        m.verts.extend([SuperVertex::default(); 4]);
        m.mark_dirty();
        m.update_gpu_mesh(&device);
        assert_eq!(m.vertex_buffer().map(|b| b.byte_size()), Some(4 * 36));
    }

    #[test]
    fn clear_releases_buffers_on_next_upload() {
        let device = HeadlessDevice::new();
        let mut m = mesh();
        m.verts.push(SuperVertex::default());
        m.indices.push(0);
        m.mark_dirty();
        m.update_gpu_mesh(&device);

        m.clear();
        m.update_gpu_mesh(&device);
        assert!(m.vertex_buffer().is_none());
        assert!(m.index_buffer().is_none());
    }
}
