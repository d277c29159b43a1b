/// How [`super::Gpu`] picks its adapter, device and surface configuration.
#[derive(Debug, Clone)]
pub struct GpuInit {
    pub power_preference: wgpu::PowerPreference,
    /// Prefer an sRGB swapchain format.
    pub prefer_srgb: bool,
    /// Falls back to FIFO when the surface lacks it.
    pub present_mode: wgpu::PresentMode,
    /// Ignored when the surface does not support it.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,
    /// Device creation fails without these.
    pub required_features: wgpu::Features,
    /// Enabled when the adapter has them. Wireframe fill, unclipped depth and
    /// filterable float textures degrade when they are missing.
    pub optional_features: wgpu::Features,
    pub required_limits: wgpu::Limits,
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            optional_features: wgpu::Features::POLYGON_MODE_LINE
                | wgpu::Features::DEPTH_CLIP_CONTROL
                | wgpu::Features::FLOAT32_FILTERABLE,
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
