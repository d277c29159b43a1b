use anyhow::{Context, Result};
use wgpu::util::DeviceExt;
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;

use super::backend::{
    align_to_copy, GpuBuffer, GpuDevice, GpuImage, GpuPipeline, GpuSampler, GpuShaderModule,
    GpuView, PipelineDesc,
};
use super::surface::{
    apply_resize, choose_alpha_mode, choose_present_mode, choose_surface_format,
    choose_surface_usage, recover_from_error, ClientWindow,
};
use super::{GpuFrame, GpuInit, SurfaceErrorAction};

/// Bind group layouts shared by every pipeline.
pub struct StandardLayouts {
    /// Group 0: camera constants (binding 0), model constants (binding 1).
    pub constants: wgpu::BindGroupLayout,
    /// Group 1: texture (binding 0), sampler (binding 1).
    pub material: wgpu::BindGroupLayout,
    pipeline: wgpu::PipelineLayout,
}

impl StandardLayouts {
    fn new(device: &wgpu::Device) -> Self {
        let uniform = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let constants = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glare constants bgl"),
            entries: &[uniform(0), uniform(1)],
        });

        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glare material bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("glare pipeline layout"),
            bind_group_layouts: &[&constants, &material],
            immediate_size: 0,
        });

        Self {
            constants,
            material,
            pipeline,
        }
    }
}

/// The wgpu device and the swapchain of one window.
///
/// Resources are created through its [`GpuDevice`] impl; frames are acquired
/// with [`Gpu::begin_frame`] and handed back to [`Gpu::submit`].
pub struct Gpu<'w> {
    /// Kept alive for the lifetime of the surface.
    _instance: wgpu::Instance,

    /// Borrows the window for `'w`.
    surface: wgpu::Surface<'w>,

    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    config: wgpu::SurfaceConfiguration,

    /// Physical pixels; may be zero while minimized.
    size: PhysicalSize<u32>,

    layouts: StandardLayouts,
}

impl<'w> Gpu<'w> {
    /// Picks an adapter that can present to `window` and configures its
    /// swapchain at the window's current size.
    pub async fn new<W: ClientWindow>(window: &'w W, init: GpuInit) -> Result<Self> {
        let (width, height) = window.client_resolution();
        anyhow::ensure!(width > 0 && height > 0, "window has zero size");
        let size = PhysicalSize::new(width, height);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let features = init.required_features | (adapter.features() & init.optional_features);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("glare device"),
                required_features: features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = choose_surface_format(&surface_caps, init.prefer_srgb)
            .context("no supported surface formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: choose_surface_usage(&surface_caps),
            format,
            width: size.width,
            height: size.height,
            present_mode: choose_present_mode(&surface_caps, init.present_mode),
            alpha_mode: choose_alpha_mode(&surface_caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        surface.configure(&device, &config);

        let layouts = StandardLayouts::new(&device);

        log::debug!(
            "gpu ready: {} ({:?}), surface {:?} {}x{}, features {:?}",
            adapter.get_info().name,
            adapter.get_info().backend,
            format,
            size.width,
            size.height,
            features,
        );

        Ok(Gpu {
            _instance: instance,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
            layouts,
        })
    }

    /// Swapchain format; also the format of off-screen frame targets.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// True when swapchain images accept texture copies.
    pub fn surface_accepts_copies(&self) -> bool {
        self.config.usage.contains(wgpu::TextureUsages::COPY_DST)
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn layouts(&self) -> &StandardLayouts {
        &self.layouts
    }

    /// A zero-area size is recorded but the swapchain keeps its old
    /// configuration until the window has pixels again.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            new_size,
        );
    }

    /// Next swapchain image plus a fresh encoder.
    pub fn begin_frame(&self) -> std::result::Result<GpuFrame, SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let encoder = self.create_encoder("glare frame encoder");

        Ok(GpuFrame {
            surface_texture,
            encoder,
        })
    }

    pub fn create_encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    /// Submits finished command buffers without presenting.
    pub fn submit_commands(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Submits the recorded commands for the given frame and presents it.
    pub fn submit(&self, frame: GpuFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
    }

    /// Reconfigures the swapchain when that can fix `err`.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        recover_from_error(&self.surface, &self.device, &self.config, self.size, err)
    }
}

impl GpuDevice for Gpu<'_> {
    fn create_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
        contents: Option<&[u8]>,
    ) -> GpuBuffer {
        let size = align_to_copy(size.max(contents.map_or(0, |c| c.len() as u64)));

        let buffer = match contents {
            Some(data) => {
                let padded;
                let bytes = if data.len() as u64 == size {
                    data
                } else {
                    padded = pad_to(data, size as usize);
                    padded.as_slice()
                };
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(label),
                        contents: bytes,
                        usage,
                    })
            }
            None => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            }),
        };

        GpuBuffer::Wgpu(buffer)
    }

    fn write_buffer(&self, buffer: &GpuBuffer, data: &[u8]) {
        let Some(buffer) = buffer.as_wgpu() else {
            log::warn!("write_buffer: headless buffer passed to a wgpu device; ignored");
            return;
        };

        let aligned = align_to_copy(data.len() as u64) as usize;
        if aligned == data.len() {
            self.queue.write_buffer(buffer, 0, data);
        } else {
            self.queue.write_buffer(buffer, 0, &pad_to(data, aligned));
        }
    }

    fn create_texture(
        &self,
        desc: &wgpu::TextureDescriptor<'_>,
        texels: Option<&[u8]>,
    ) -> GpuImage {
        let texture = match texels {
            Some(data) => self.device.create_texture_with_data(
                &self.queue,
                desc,
                wgpu::util::TextureDataOrder::LayerMajor,
                data,
            ),
            None => self.device.create_texture(desc),
        };
        GpuImage::Wgpu(texture)
    }

    fn create_view(&self, image: &GpuImage, aspect: wgpu::TextureAspect) -> GpuView {
        match image {
            GpuImage::Wgpu(t) => GpuView::Wgpu(t.create_view(&wgpu::TextureViewDescriptor {
                aspect,
                ..Default::default()
            })),
            GpuImage::Headless(_) => GpuView::Headless,
        }
    }

    fn create_sampler(&self, desc: &wgpu::SamplerDescriptor<'_>) -> GpuSampler {
        GpuSampler::Wgpu(self.device.create_sampler(desc))
    }

    fn create_shader_module(&self, label: &str, source: &str) -> GpuShaderModule {
        GpuShaderModule::Wgpu(self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        }))
    }

    fn create_pipeline(&self, desc: &PipelineDesc<'_>) -> Result<GpuPipeline> {
        let (GpuShaderModule::Wgpu(vs), GpuShaderModule::Wgpu(ps)) =
            (desc.vertex_module, desc.pixel_module)
        else {
            anyhow::bail!("pipeline '{}' references modules from another device", desc.label);
        };

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: Some(&self.layouts.pipeline),

                vertex: wgpu::VertexState {
                    module: vs,
                    entry_point: Some(desc.vertex_entry),
                    compilation_options: Default::default(),
                    buffers: std::slice::from_ref(&desc.vertex_layout),
                },

                fragment: Some(wgpu::FragmentState {
                    module: ps,
                    entry_point: Some(desc.pixel_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.color_format,
                        blend: Some(desc.blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: desc.primitive,
                depth_stencil: desc.depth_stencil.clone(),
                multisample: wgpu::MultisampleState::default(),

                multiview_mask: None,
                cache: None,
            });

        Ok(GpuPipeline::Wgpu(pipeline))
    }

    fn features(&self) -> wgpu::Features {
        self.device.features()
    }
}

fn pad_to(data: &[u8], len: usize) -> Vec<u8> {
    let mut padded = Vec::with_capacity(len);
    padded.extend_from_slice(data);
    padded.resize(len, 0);
    padded
}
