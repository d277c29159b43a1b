use std::cell::OnceCell;

use crate::device::{GpuDevice, GpuSampler};

/// Minification/magnification filter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFilter {
    #[default]
    MinPointMagPoint,
    MinPointMagLinear,
    MinLinearMagPoint,
    MinLinearMagLinear,
}

/// The two shared samplers, each created on first request and kept until
/// the cache is dropped.
///
/// Address mode is repeat on u and v, clamp on w.
#[derive(Debug, Default)]
pub struct SamplerCache {
    point: OnceCell<GpuSampler>,
    linear: OnceCell<GpuSampler>,
}

impl SamplerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mixed min/mag filters are not implemented separately and resolve to
    /// the point sampler.
    pub fn get(&self, device: &dyn GpuDevice, filter: TextureFilter) -> &GpuSampler {
        match filter {
            TextureFilter::MinLinearMagLinear => self.linear(device),
            TextureFilter::MinPointMagPoint
            | TextureFilter::MinPointMagLinear
            | TextureFilter::MinLinearMagPoint => self.point(device),
        }
    }

    pub fn point(&self, device: &dyn GpuDevice) -> &GpuSampler {
        self.point
            .get_or_init(|| create(device, "glare point sampler", wgpu::FilterMode::Nearest))
    }

    pub fn linear(&self, device: &dyn GpuDevice) -> &GpuSampler {
        self.linear
            .get_or_init(|| create(device, "glare linear sampler", wgpu::FilterMode::Linear))
    }
}

fn create(device: &dyn GpuDevice, label: &str, filter: wgpu::FilterMode) -> GpuSampler {
    log::debug!("creating {label}");
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: match filter {
            wgpu::FilterMode::Linear => wgpu::MipmapFilterMode::Linear,
            wgpu::FilterMode::Nearest => wgpu::MipmapFilterMode::Nearest,
        },
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;

    fn filter_of(s: &GpuSampler) -> wgpu::FilterMode {
        match s {
            GpuSampler::Headless { filter } => *filter,
            GpuSampler::Wgpu(_) => unreachable!(),
        }
    }

    #[test]
    fn samplers_are_created_once() {
        let device = HeadlessDevice::new();
        let cache = SamplerCache::new();
        for _ in 0..3 {
            cache.get(&device, TextureFilter::MinLinearMagLinear);
            cache.get(&device, TextureFilter::MinPointMagPoint);
        }
        assert_eq!(device.stats().samplers_created, 2);
    }

    #[test]
    fn asymmetric_filters_fall_back_to_point() {
        let device = HeadlessDevice::new();
        let cache = SamplerCache::new();
        let a = filter_of(cache.get(&device, TextureFilter::MinPointMagLinear));
        let b = filter_of(cache.get(&device, TextureFilter::MinLinearMagPoint));
        assert_eq!(a, wgpu::FilterMode::Nearest);
        assert_eq!(b, wgpu::FilterMode::Nearest);
        assert_eq!(device.stats().samplers_created, 1);
    }

    #[test]
    fn linear_filter_is_linear() {
        let device = HeadlessDevice::new();
        let cache = SamplerCache::new();
        let s = cache.get(&device, TextureFilter::MinLinearMagLinear);
        assert_eq!(filter_of(s), wgpu::FilterMode::Linear);
    }
}
