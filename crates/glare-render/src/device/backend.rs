use anyhow::Result;

/// GPU buffer handle.
#[derive(Debug, Clone)]
pub enum GpuBuffer {
    Wgpu(wgpu::Buffer),
    /// Allocation recorded by [`super::HeadlessDevice`]; no memory behind it.
    Headless { size: u64 },
}

impl GpuBuffer {
    /// Allocated size in bytes (may exceed the requested size by copy alignment).
    pub fn size(&self) -> u64 {
        match self {
            GpuBuffer::Wgpu(b) => b.size(),
            GpuBuffer::Headless { size } => *size,
        }
    }

    pub fn as_wgpu(&self) -> Option<&wgpu::Buffer> {
        match self {
            GpuBuffer::Wgpu(b) => Some(b),
            GpuBuffer::Headless { .. } => None,
        }
    }
}

/// Texture description kept by headless images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessImage {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

/// GPU image (texture) handle.
#[derive(Debug, Clone)]
pub enum GpuImage {
    Wgpu(wgpu::Texture),
    Headless(HeadlessImage),
}

impl GpuImage {
    pub fn width(&self) -> u32 {
        match self {
            GpuImage::Wgpu(t) => t.width(),
            GpuImage::Headless(h) => h.width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            GpuImage::Wgpu(t) => t.height(),
            GpuImage::Headless(h) => h.height,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            GpuImage::Wgpu(t) => t.format(),
            GpuImage::Headless(h) => h.format,
        }
    }

    pub fn usage(&self) -> wgpu::TextureUsages {
        match self {
            GpuImage::Wgpu(t) => t.usage(),
            GpuImage::Headless(h) => h.usage,
        }
    }

    pub fn as_wgpu(&self) -> Option<&wgpu::Texture> {
        match self {
            GpuImage::Wgpu(t) => Some(t),
            GpuImage::Headless(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum GpuView {
    Wgpu(wgpu::TextureView),
    Headless,
}

impl GpuView {
    pub fn as_wgpu(&self) -> Option<&wgpu::TextureView> {
        match self {
            GpuView::Wgpu(v) => Some(v),
            GpuView::Headless => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum GpuSampler {
    Wgpu(wgpu::Sampler),
    Headless { filter: wgpu::FilterMode },
}

impl GpuSampler {
    pub fn as_wgpu(&self) -> Option<&wgpu::Sampler> {
        match self {
            GpuSampler::Wgpu(s) => Some(s),
            GpuSampler::Headless { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum GpuShaderModule {
    Wgpu(wgpu::ShaderModule),
    Headless,
}

#[derive(Debug, Clone)]
pub enum GpuPipeline {
    Wgpu(wgpu::RenderPipeline),
    Headless,
}

impl GpuPipeline {
    pub fn as_wgpu(&self) -> Option<&wgpu::RenderPipeline> {
        match self {
            GpuPipeline::Wgpu(p) => Some(p),
            GpuPipeline::Headless => None,
        }
    }
}

/// Everything needed to build one render pipeline.
///
/// The bind group layout is fixed by the device: group 0 carries the camera
/// and model constants, group 1 a texture and its sampler.
pub struct PipelineDesc<'a> {
    pub label: &'a str,
    pub vertex_module: &'a GpuShaderModule,
    pub vertex_entry: &'a str,
    pub pixel_module: &'a GpuShaderModule,
    pub pixel_entry: &'a str,
    pub vertex_layout: wgpu::VertexBufferLayout<'a>,
    pub blend: wgpu::BlendState,
    pub primitive: wgpu::PrimitiveState,
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    pub color_format: wgpu::TextureFormat,
}

/// Resource-creation seam between the resource layer and a GPU.
///
/// [`super::Gpu`] forwards to wgpu; [`super::HeadlessDevice`] records calls
/// without hardware.
pub trait GpuDevice {
    /// Creates a buffer of at least `size` bytes, initialized from `contents`
    /// when given.
    fn create_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
        contents: Option<&[u8]>,
    ) -> GpuBuffer;

    /// Writes `data` at offset zero of `buffer`.
    fn write_buffer(&self, buffer: &GpuBuffer, data: &[u8]);

    /// Creates a single-mip 2D texture, uploading tightly packed `texels`
    /// when given.
    fn create_texture(
        &self,
        desc: &wgpu::TextureDescriptor<'_>,
        texels: Option<&[u8]>,
    ) -> GpuImage;

    fn create_view(&self, image: &GpuImage, aspect: wgpu::TextureAspect) -> GpuView;

    fn create_sampler(&self, desc: &wgpu::SamplerDescriptor<'_>) -> GpuSampler;

    /// Creates a module from WGSL that already passed validation.
    fn create_shader_module(&self, label: &str, source: &str) -> GpuShaderModule;

    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<GpuPipeline>;

    /// Optional features enabled on the device.
    fn features(&self) -> wgpu::Features;
}

/// Rounds `size` up to wgpu's copy alignment.
pub(crate) fn align_to_copy(size: u64) -> u64 {
    let align = wgpu::COPY_BUFFER_ALIGNMENT;
    size.div_ceil(align) * align
}
