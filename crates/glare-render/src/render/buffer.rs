use std::ops::Deref;
use std::sync::Arc;

use crate::device::{GpuBuffer, GpuDevice};

use super::layout::BufferLayout;

/// Bind point of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Constant,
}

/// CPU/GPU access pattern of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryUsage {
    /// GPU read/write, updated through copies.
    GpuOnly,
    /// Content fixed at creation.
    Immutable,
    /// Frequently re-uploaded from the CPU.
    Dynamic,
    /// CPU-visible transfer source.
    Staging,
}

/// Index element type.
#[cfg(not(feature = "index-u16"))]
pub type IndexT = u32;
#[cfg(feature = "index-u16")]
pub type IndexT = u16;

/// Index format matching [`IndexT`].
#[cfg(not(feature = "index-u16"))]
pub const INDEX_FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint32;
#[cfg(feature = "index-u16")]
pub const INDEX_FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint16;

fn wgpu_usages(usage: BufferUsage, memory: MemoryUsage) -> wgpu::BufferUsages {
    let bind = match usage {
        BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
        BufferUsage::Index => wgpu::BufferUsages::INDEX,
        BufferUsage::Constant => wgpu::BufferUsages::UNIFORM,
    };
    match memory {
        MemoryUsage::Immutable => bind,
        MemoryUsage::GpuOnly | MemoryUsage::Dynamic => bind | wgpu::BufferUsages::COPY_DST,
        MemoryUsage::Staging => bind | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
    }
}

/// A GPU buffer plus the metadata needed to reuse or regrow it.
#[derive(Debug)]
pub struct RenderBuffer {
    label: &'static str,
    handle: Option<GpuBuffer>,
    byte_size: usize,
    element_size: usize,
    usage: BufferUsage,
    memory: MemoryUsage,
    generation: u64,
}

impl RenderBuffer {
    pub fn new(label: &'static str, usage: BufferUsage) -> Self {
        Self {
            label,
            handle: None,
            byte_size: 0,
            element_size: 0,
            usage,
            memory: MemoryUsage::Dynamic,
            generation: 0,
        }
    }

    /// Allocates a new GPU buffer of `byte_size` bytes, replacing any previous
    /// one, and uploads `data` when given.
    ///
    /// Returns false for a zero size.
    ///
    /// # Panics
    /// When `memory` is [`MemoryUsage::Immutable`]; immutable buffers are only
    /// made through [`VertexBuffer::create_immutable_buffer`] and
    /// [`IndexBuffer::create_immutable_buffer`].
    pub fn create(
        &mut self,
        device: &dyn GpuDevice,
        data: Option<&[u8]>,
        byte_size: usize,
        element_size: usize,
        usage: BufferUsage,
        memory: MemoryUsage,
    ) -> bool {
        assert!(
            memory != MemoryUsage::Immutable,
            "{}: immutable buffers must come from create_immutable_buffer",
            self.label
        );
        self.allocate(device, data, byte_size, element_size, usage, memory)
    }

    fn allocate(
        &mut self,
        device: &dyn GpuDevice,
        data: Option<&[u8]>,
        byte_size: usize,
        element_size: usize,
        usage: BufferUsage,
        memory: MemoryUsage,
    ) -> bool {
        if byte_size == 0 {
            return false;
        }
        if let Some(data) = data {
            assert!(
                data.len() == byte_size,
                "{}: initial data is {} bytes, buffer is {byte_size}",
                self.label,
                data.len()
            );
        }

        self.handle = None;
        self.handle = Some(device.create_buffer(
            self.label,
            byte_size as u64,
            wgpu_usages(usage, memory),
            data,
        ));

        self.byte_size = byte_size;
        self.element_size = element_size;
        self.usage = usage;
        self.memory = memory;
        self.generation += 1;

        log::debug!(
            "{}: created {byte_size} bytes ({usage:?}, {memory:?}), generation {}",
            self.label,
            self.generation
        );
        true
    }

    /// Writes `data` into the existing allocation.
    ///
    /// Returns false for empty data or when nothing is allocated yet.
    ///
    /// # Panics
    /// On immutable buffers, and when `data` is larger than the allocation.
    pub fn buffer(&mut self, device: &dyn GpuDevice, data: &[u8]) -> bool {
        if data.is_empty() {
            return false;
        }
        assert!(
            self.memory != MemoryUsage::Immutable,
            "{}: cannot re-upload into an immutable buffer",
            self.label
        );
        assert!(
            data.len() <= self.byte_size,
            "{}: {} bytes do not fit a {}-byte buffer",
            self.label,
            data.len(),
            self.byte_size
        );

        let Some(handle) = &self.handle else {
            log::warn!("{}: buffer() before create(); nothing written", self.label);
            return false;
        };

        device.write_buffer(handle, data);
        true
    }

    pub fn handle(&self) -> Option<&GpuBuffer> {
        self.handle.as_ref()
    }

    pub fn is_created(&self) -> bool {
        self.handle.is_some()
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn memory(&self) -> MemoryUsage {
        self.memory
    }

    pub fn is_immutable(&self) -> bool {
        self.memory == MemoryUsage::Immutable
    }

    /// Increments on every (re)creation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Releases the GPU allocation.
    pub fn release(&mut self) {
        self.handle = None;
        self.byte_size = 0;
    }
}

// ── constant buffer ──────────────────────────────────────────────────────

/// Uniform buffer that grows to fit whatever is written into it.
#[derive(Debug)]
pub struct ConstantBuffer {
    raw: RenderBuffer,
}

impl ConstantBuffer {
    pub fn new(label: &'static str) -> Self {
        Self {
            raw: RenderBuffer::new(label, BufferUsage::Constant),
        }
    }

    /// Uploads `data`, recreating the buffer as dynamic when it is too small or
    /// immutable.
    pub fn buffer(&mut self, device: &dyn GpuDevice, data: &[u8]) -> bool {
        if data.is_empty() {
            return false;
        }
        if data.len() > self.raw.byte_size || self.raw.is_immutable() || !self.raw.is_created() {
            return self.raw.create(
                device,
                Some(data),
                data.len(),
                data.len(),
                BufferUsage::Constant,
                MemoryUsage::Dynamic,
            );
        }
        self.raw.buffer(device, data)
    }
}

impl Deref for ConstantBuffer {
    type Target = RenderBuffer;
    fn deref(&self) -> &RenderBuffer {
        &self.raw
    }
}

// ── vertex buffer ────────────────────────────────────────────────────────

/// Vertex buffer tagged with the layout of its contents.
#[derive(Debug)]
pub struct VertexBuffer {
    raw: RenderBuffer,
    layout: Option<Arc<BufferLayout>>,
    count: usize,
}

impl VertexBuffer {
    pub fn new(label: &'static str) -> Self {
        Self {
            raw: RenderBuffer::new(label, BufferUsage::Vertex),
            layout: None,
            count: 0,
        }
    }

    pub fn set_layout(&mut self, layout: Arc<BufferLayout>) {
        self.layout = Some(layout);
    }

    pub fn layout(&self) -> Option<&Arc<BufferLayout>> {
        self.layout.as_ref()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Uploads `count` packed vertices from `data`, growing the buffer when
    /// needed.
    ///
    /// # Panics
    /// Without a layout, or when `data` holds fewer than `count` vertices.
    pub fn buffer(&mut self, device: &dyn GpuDevice, data: &[u8], count: usize) -> bool {
        let stride = self.stride();
        let size = count * stride;
        if size == 0 {
            return false;
        }
        assert!(
            data.len() >= size,
            "{} vertices need {size} bytes, got {}",
            count,
            data.len()
        );

        let data = &data[..size];
        let ok = if size > self.raw.byte_size || self.raw.is_immutable() || !self.raw.is_created() {
            self.raw.create(
                device,
                Some(data),
                size,
                stride,
                BufferUsage::Vertex,
                MemoryUsage::Dynamic,
            )
        } else {
            self.raw.buffer(device, data)
        };

        if ok {
            self.count = count;
        }
        ok
    }

    /// Creates an immutable buffer holding `count` vertices of `layout`.
    pub fn create_immutable_buffer(
        &mut self,
        device: &dyn GpuDevice,
        data: &[u8],
        count: usize,
        layout: Arc<BufferLayout>,
    ) -> bool {
        let stride = layout.stride();
        let size = count * stride;
        assert!(data.len() >= size, "{count} vertices need {size} bytes, got {}", data.len());

        self.layout = Some(layout);
        let ok = self.raw.allocate(
            device,
            Some(&data[..size]),
            size,
            stride,
            BufferUsage::Vertex,
            MemoryUsage::Immutable,
        );
        if ok {
            self.count = count;
        }
        ok
    }

    fn stride(&self) -> usize {
        match &self.layout {
            Some(layout) => layout.stride(),
            None => panic!("{}: vertex buffer has no layout", self.raw.label),
        }
    }
}

impl Deref for VertexBuffer {
    type Target = RenderBuffer;
    fn deref(&self) -> &RenderBuffer {
        &self.raw
    }
}

// ── index buffer ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct IndexBuffer {
    raw: RenderBuffer,
    count: usize,
}

impl IndexBuffer {
    pub fn new(label: &'static str) -> Self {
        Self {
            raw: RenderBuffer::new(label, BufferUsage::Index),
            count: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Uploads `indices`, growing the buffer when needed.
    pub fn buffer(&mut self, device: &dyn GpuDevice, indices: &[IndexT]) -> bool {
        let data: &[u8] = bytemuck::cast_slice(indices);
        if data.is_empty() {
            return false;
        }

        let ok = if data.len() > self.raw.byte_size
            || self.raw.is_immutable()
            || !self.raw.is_created()
        {
            self.raw.create(
                device,
                Some(data),
                data.len(),
                size_of::<IndexT>(),
                BufferUsage::Index,
                MemoryUsage::Dynamic,
            )
        } else {
            self.raw.buffer(device, data)
        };

        if ok {
            self.count = indices.len();
        }
        ok
    }

    pub fn create_immutable_buffer(&mut self, device: &dyn GpuDevice, indices: &[IndexT]) -> bool {
        let data: &[u8] = bytemuck::cast_slice(indices);
        let ok = self.raw.allocate(
            device,
            Some(data),
            data.len(),
            size_of::<IndexT>(),
            BufferUsage::Index,
            MemoryUsage::Immutable,
        );
        if ok {
            self.count = indices.len();
        }
        ok
    }
}

impl Deref for IndexBuffer {
    type Target = RenderBuffer;
    fn deref(&self) -> &RenderBuffer {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use crate::render::layout::LayoutRegistry;
    use crate::render::vertex::VertexPcu;

    fn pcu_layout() -> Arc<BufferLayout> {
        LayoutRegistry::new().acquire_layout_of::<VertexPcu>()
    }

    // ── render buffer ─────────────────────────────────────────────────────

    #[test]
    fn create_reports_false_for_empty_data() {
        let device = HeadlessDevice::new();
        let mut rb = RenderBuffer::new("test", BufferUsage::Constant);
        assert!(!rb.create(&device, None, 0, 0, BufferUsage::Constant, MemoryUsage::Dynamic));
        assert!(!rb.is_created());
        assert_eq!(device.stats().buffers_created, 0);
    }

    #[test]
    #[should_panic(expected = "create_immutable_buffer")]
    fn create_rejects_immutable_memory() {
        let device = HeadlessDevice::new();
        let mut rb = RenderBuffer::new("test", BufferUsage::Vertex);
        rb.create(&device, Some(&[0; 4]), 4, 4, BufferUsage::Vertex, MemoryUsage::Immutable);
    }

    #[test]
    #[should_panic(expected = "immutable")]
    fn buffer_into_immutable_panics_even_when_it_fits() {
        let device = HeadlessDevice::new();
        let mut rb = RenderBuffer::new("test", BufferUsage::Vertex);
        rb.allocate(&device, Some(&[0; 64]), 64, 4, BufferUsage::Vertex, MemoryUsage::Immutable);
        rb.buffer(&device, &[1; 4]);
    }

    #[test]
    #[should_panic(expected = "do not fit")]
    fn buffer_past_allocation_panics() {
        let device = HeadlessDevice::new();
        let mut rb = RenderBuffer::new("test", BufferUsage::Constant);
        rb.create(&device, None, 16, 16, BufferUsage::Constant, MemoryUsage::Dynamic);
        rb.buffer(&device, &[0; 32]);
    }

    #[test]
    fn recreate_bumps_generation() {
        let device = HeadlessDevice::new();
        let mut rb = RenderBuffer::new("test", BufferUsage::Constant);
        rb.create(&device, None, 16, 16, BufferUsage::Constant, MemoryUsage::Dynamic);
        rb.create(&device, None, 32, 16, BufferUsage::Constant, MemoryUsage::Dynamic);
        assert_eq!(rb.generation(), 2);
        assert_eq!(rb.byte_size(), 32);
    }

    // ── constant buffer ───────────────────────────────────────────────────

    #[test]
    fn constant_buffer_reuses_allocation_when_it_fits() {
        let device = HeadlessDevice::new();
        let mut cb = ConstantBuffer::new("camera");
        assert!(cb.buffer(&device, &[0; 64]));
        assert!(cb.buffer(&device, &[1; 48]));

        let stats = device.stats();
        assert_eq!(stats.buffers_created, 1);
        assert_eq!(stats.buffer_writes, 1);
        assert_eq!(cb.generation(), 1);
    }

    #[test]
    fn constant_buffer_grows() {
        let device = HeadlessDevice::new();
        let mut cb = ConstantBuffer::new("model");
        cb.buffer(&device, &[0; 16]);
        cb.buffer(&device, &[0; 80]);
        assert!(cb.byte_size() >= 80);
        assert_eq!(device.stats().buffers_created, 2);
        assert_eq!(cb.memory(), MemoryUsage::Dynamic);
    }

    // ── vertex buffer ─────────────────────────────────────────────────────

    #[test]
    fn dynamic_vertex_buffer_grows_to_fit() {
        let device = HeadlessDevice::new();
        let mut vb = VertexBuffer::new("vbo");
        vb.set_layout(pcu_layout());

        assert!(vb.buffer(&device, &[0; 36 * 2], 2));
        assert!(vb.buffer(&device, &[0; 36 * 10], 10));
        assert!(vb.byte_size() >= 36 * 10);
        assert_eq!(vb.count(), 10);
    }

    #[test]
    fn immutable_vertex_buffer_is_recreated_dynamic_on_upload() {
        let device = HeadlessDevice::new();
        let mut vb = VertexBuffer::new("vbo");
        assert!(vb.create_immutable_buffer(&device, &[0; 36 * 3], 3, pcu_layout()));
        assert!(vb.is_immutable());

        assert!(vb.buffer(&device, &[0; 36], 1));
        assert!(!vb.is_immutable());
        assert_eq!(device.stats().buffers_created, 2);
    }

    #[test]
    #[should_panic(expected = "no layout")]
    fn vertex_buffer_without_layout_panics() {
        let device = HeadlessDevice::new();
        VertexBuffer::new("vbo").buffer(&device, &[0; 36], 1);
    }

    // ── index buffer ──────────────────────────────────────────────────────

    #[test]
    fn index_buffer_counts_indices() {
        let device = HeadlessDevice::new();
        let mut ib = IndexBuffer::new("ibo");
        assert!(ib.create_immutable_buffer(&device, &[0, 2, 1, 1, 2, 3]));
        assert_eq!(ib.count(), 6);
        assert_eq!(ib.element_size(), size_of::<IndexT>());
        assert_eq!(ib.byte_size(), 6 * size_of::<IndexT>());
    }

    #[test]
    fn empty_index_upload_is_rejected() {
        let device = HeadlessDevice::new();
        let mut ib = IndexBuffer::new("ibo");
        assert!(!ib.buffer(&device, &[]));
        assert!(!ib.create_immutable_buffer(&device, &[]));
    }
}
