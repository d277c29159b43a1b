use std::cell::Cell;

use anyhow::Result;

use super::backend::{
    align_to_copy, GpuBuffer, GpuDevice, GpuImage, GpuPipeline, GpuSampler, GpuShaderModule,
    GpuView, HeadlessImage, PipelineDesc,
};

/// Creation and upload counters of a [`HeadlessDevice`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    pub buffers_created: usize,
    pub buffer_writes: usize,
    pub bytes_written: usize,
    pub textures_created: usize,
    pub texels_uploaded: usize,
    pub views_created: usize,
    pub samplers_created: usize,
    pub shader_modules_created: usize,
    pub pipelines_created: usize,
}

/// GPU device without hardware.
///
/// Resources are descriptions only; every call is counted so that callers can
/// check how often the resource layer really touches the GPU.
#[derive(Debug)]
pub struct HeadlessDevice {
    features: wgpu::Features,
    stats: Cell<HeadlessStats>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::with_features(
            wgpu::Features::POLYGON_MODE_LINE
                | wgpu::Features::DEPTH_CLIP_CONTROL
                | wgpu::Features::FLOAT32_FILTERABLE,
        )
    }

    pub fn with_features(features: wgpu::Features) -> Self {
        Self {
            features,
            stats: Cell::new(HeadlessStats::default()),
        }
    }

    pub fn stats(&self) -> HeadlessStats {
        self.stats.get()
    }

    fn record(&self, f: impl FnOnce(&mut HeadlessStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
        contents: Option<&[u8]>,
    ) -> GpuBuffer {
        let size = align_to_copy(size.max(contents.map_or(0, |c| c.len() as u64)));
        log::trace!("headless: buffer '{label}' ({size} bytes, {usage:?})");
        self.record(|s| {
            s.buffers_created += 1;
            s.bytes_written += contents.map_or(0, <[u8]>::len);
        });
        GpuBuffer::Headless { size }
    }

    fn write_buffer(&self, buffer: &GpuBuffer, data: &[u8]) {
        assert!(
            data.len() as u64 <= buffer.size(),
            "write of {} bytes overruns a {}-byte buffer",
            data.len(),
            buffer.size()
        );
        self.record(|s| {
            s.buffer_writes += 1;
            s.bytes_written += data.len();
        });
    }

    fn create_texture(
        &self,
        desc: &wgpu::TextureDescriptor<'_>,
        texels: Option<&[u8]>,
    ) -> GpuImage {
        log::trace!(
            "headless: texture {:?} {}x{} {:?}",
            desc.label,
            desc.size.width,
            desc.size.height,
            desc.format
        );
        self.record(|s| {
            s.textures_created += 1;
            s.texels_uploaded += texels.map_or(0, <[u8]>::len);
        });
        GpuImage::Headless(HeadlessImage {
            width: desc.size.width,
            height: desc.size.height,
            format: desc.format,
            usage: desc.usage,
        })
    }

    fn create_view(&self, _image: &GpuImage, _aspect: wgpu::TextureAspect) -> GpuView {
        self.record(|s| s.views_created += 1);
        GpuView::Headless
    }

    fn create_sampler(&self, desc: &wgpu::SamplerDescriptor<'_>) -> GpuSampler {
        self.record(|s| s.samplers_created += 1);
        GpuSampler::Headless {
            filter: desc.mag_filter,
        }
    }

    fn create_shader_module(&self, label: &str, _source: &str) -> GpuShaderModule {
        log::trace!("headless: shader module '{label}'");
        self.record(|s| s.shader_modules_created += 1);
        GpuShaderModule::Headless
    }

    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<GpuPipeline> {
        anyhow::ensure!(
            desc.vertex_layout.array_stride > 0,
            "pipeline '{}' has an empty vertex layout",
            desc.label
        );
        self.record(|s| s.pipelines_created += 1);
        Ok(GpuPipeline::Headless)
    }

    fn features(&self) -> wgpu::Features {
        self.features
    }
}
