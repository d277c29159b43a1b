use std::cell::OnceCell;

use anyhow::Result;
use bitflags::bitflags;

use crate::coords::{IVec2, Rgba8};
use crate::device::{GpuDevice, GpuImage, GpuView};

use super::buffer::MemoryUsage;
use super::surface::Surface;

bitflags! {
    /// How a texture may be bound.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextureUsage: u8 {
        const SHADER_RESOURCE = 1 << 0;
        const RENDER_TARGET = 1 << 1;
        const DEPTH_STENCIL = 1 << 2;
    }
}

impl TextureUsage {
    fn to_wgpu(self, memory: MemoryUsage) -> wgpu::TextureUsages {
        let mut usages = wgpu::TextureUsages::empty();
        if self.contains(Self::SHADER_RESOURCE) {
            usages |= wgpu::TextureUsages::TEXTURE_BINDING;
        }
        if self.intersects(Self::RENDER_TARGET | Self::DEPTH_STENCIL) {
            usages |= wgpu::TextureUsages::RENDER_ATTACHMENT;
        }
        match memory {
            // Upload destination only.
            MemoryUsage::Immutable => usages | wgpu::TextureUsages::COPY_DST,
            _ => usages | wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC,
        }
    }

    fn from_wgpu(usages: wgpu::TextureUsages, format: wgpu::TextureFormat) -> Self {
        let mut usage = Self::empty();
        usage.set(
            Self::SHADER_RESOURCE,
            usages.contains(wgpu::TextureUsages::TEXTURE_BINDING),
        );
        if usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
            usage |= if format.is_depth_stencil_format() {
                Self::DEPTH_STENCIL
            } else {
                Self::RENDER_TARGET
            };
        }
        usage
    }
}

/// Whether a texture created its image or wraps one owned elsewhere
/// (a swapchain image).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOwnership {
    Owned,
    Borrowed,
}

/// A 2D GPU texture with a lazily created view.
#[derive(Debug)]
pub struct Texture2D {
    name: String,
    image: Option<GpuImage>,
    ownership: ImageOwnership,
    view: OnceCell<GpuView>,
    memory: MemoryUsage,
    usage: TextureUsage,
}

impl Texture2D {
    /// A texture declared without an image; its view stays `None`.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: None,
            ownership: ImageOwnership::Owned,
            view: OnceCell::new(),
            memory: MemoryUsage::GpuOnly,
            usage: TextureUsage::empty(),
        }
    }

    /// Wraps an image owned elsewhere without copying it.
    pub fn wrap(name: impl Into<String>, image: GpuImage) -> Self {
        let usage = TextureUsage::from_wgpu(image.usage(), image.format());
        Self {
            name: name.into(),
            image: Some(image),
            ownership: ImageOwnership::Borrowed,
            view: OnceCell::new(),
            memory: MemoryUsage::GpuOnly,
            usage,
        }
    }

    /// A GPU-only target. Depth formats become depth-stencil resources,
    /// everything else a render target; both are also shader resources.
    pub fn render_target(
        device: &dyn GpuDevice,
        name: impl Into<String>,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let name = name.into();
        let usage = if format.is_depth_stencil_format() {
            TextureUsage::DEPTH_STENCIL | TextureUsage::SHADER_RESOURCE
        } else {
            TextureUsage::SHADER_RESOURCE | TextureUsage::RENDER_TARGET
        };
        let memory = MemoryUsage::GpuOnly;

        let image = device.create_texture(
            &texture_desc(&name, width, height, format, usage.to_wgpu(memory)),
            None,
        );
        log::debug!("texture '{name}': {width}x{height} {format:?} target");

        Self {
            name,
            image: Some(image),
            ownership: ImageOwnership::Owned,
            view: OnceCell::new(),
            memory,
            usage,
        }
    }

    /// A target with the size and format of `other`.
    pub fn new_matching(
        device: &dyn GpuDevice,
        name: impl Into<String>,
        other: &Texture2D,
    ) -> Result<Self> {
        let Some(image) = other.image() else {
            anyhow::bail!("texture '{}' has no image to match", other.name);
        };
        Ok(Self::render_target(
            device,
            name,
            image.width(),
            image.height(),
            image.format(),
        ))
    }

    /// Uploads a surface as an immutable shader resource.
    ///
    /// Texels are linear UNORM on every path. A 4-channel raw buffer uploads
    /// as is; anything else uploads the float texels, as `Rgba32Float` when
    /// the device can filter it and quantized to `Rgba8Unorm` otherwise.
    pub fn from_surface(device: &dyn GpuDevice, name: impl Into<String>, surface: &Surface) -> Self {
        let name = name.into();
        let (width, height) = (surface.width(), surface.height());
        let usage = TextureUsage::SHADER_RESOURCE;
        let memory = MemoryUsage::Immutable;

        let (format, texels): (wgpu::TextureFormat, Vec<u8>) = match surface.raw() {
            Some((raw, 4)) => (wgpu::TextureFormat::Rgba8Unorm, raw.to_vec()),
            _ if device.features().contains(wgpu::Features::FLOAT32_FILTERABLE) => (
                wgpu::TextureFormat::Rgba32Float,
                bytemuck::cast_slice(surface.texels()).to_vec(),
            ),
            _ => {
                log::debug!("texture '{name}': float texels quantized, device cannot filter f32");
                let quantized: Vec<u8> = surface
                    .texels()
                    .iter()
                    .flat_map(|t| {
                        let c = Rgba8::from(*t);
                        [c.r, c.g, c.b, c.a]
                    })
                    .collect();
                (wgpu::TextureFormat::Rgba8Unorm, quantized)
            }
        };

        let image = device.create_texture(
            &texture_desc(&name, width, height, format, usage.to_wgpu(memory)),
            Some(&texels),
        );
        log::debug!("texture '{name}': {width}x{height} {format:?} from surface");

        Self {
            name,
            image: Some(image),
            ownership: ImageOwnership::Owned,
            view: OnceCell::new(),
            memory,
            usage,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn image(&self) -> Option<&GpuImage> {
        self.image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn ownership(&self) -> ImageOwnership {
        self.ownership
    }

    pub fn memory(&self) -> MemoryUsage {
        self.memory
    }

    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    pub fn is_immutable(&self) -> bool {
        self.memory == MemoryUsage::Immutable
    }

    /// Pixel size; zero without an image.
    pub fn size(&self) -> IVec2 {
        self.image.as_ref().map_or(IVec2::default(), |i| {
            IVec2::new(i.width() as i32, i.height() as i32)
        })
    }

    pub fn format(&self) -> Option<wgpu::TextureFormat> {
        self.image.as_ref().map(GpuImage::format)
    }

    /// The view over the whole image, created on first use.
    pub fn view_handle(&self, device: &dyn GpuDevice) -> Option<&GpuView> {
        let image = self.image.as_ref()?;
        Some(
            self.view
                .get_or_init(|| device.create_view(image, wgpu::TextureAspect::All)),
        )
    }
}

fn texture_desc<'a>(
    label: &'a str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    usage: wgpu::TextureUsages,
) -> wgpu::TextureDescriptor<'a> {
    wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rgba;
    use crate::device::HeadlessDevice;

    #[test]
    fn procedural_surface_uploads_float_texels() {
        let device = HeadlessDevice::new();
        let tex = Texture2D::from_surface(&device, "p", &Surface::new(2, 2, Rgba::RED));
        assert_eq!(tex.format(), Some(wgpu::TextureFormat::Rgba32Float));
        assert!(tex.is_immutable());
        assert_eq!(device.stats().texels_uploaded, 2 * 2 * 16);
    }

    #[test]
    fn float_texels_are_quantized_without_filterable_f32() {
        let device = HeadlessDevice::with_features(wgpu::Features::empty());
        let tex = Texture2D::from_surface(&device, "p", &Surface::new(2, 2, Rgba::RED));
        assert_eq!(tex.format(), Some(wgpu::TextureFormat::Rgba8Unorm));
        assert_eq!(device.stats().texels_uploaded, 2 * 2 * 4);
    }

    #[test]
    fn decoded_rgba_surface_uploads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.png");
        Surface::new(3, 1, Rgba::LIME).write_png(&path).unwrap();

        let device = HeadlessDevice::new();
        let surface = Surface::load(&path, false).unwrap();
        let tex = Texture2D::from_surface(&device, "t", &surface);
        assert_eq!(tex.format(), Some(wgpu::TextureFormat::Rgba8Unorm));
        assert_eq!(tex.size(), IVec2::new(3, 1));
    }

    #[test]
    fn every_upload_path_samples_linearly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.png");
        let device = HeadlessDevice::new();
        let quantizing = HeadlessDevice::with_features(wgpu::Features::empty());

        let mut surface = Surface::new(1, 1, Rgba::new(0.5, 0.5, 0.5, 1.0));
        let before = Texture2D::from_surface(&device, "before", &surface);
        surface.write_png(&path).unwrap();
        let after = Texture2D::from_surface(&device, "after", &surface);
        let loaded = Texture2D::from_surface(&device, "loaded", &Surface::load(&path, false).unwrap());
        let quantized = Texture2D::from_surface(&quantizing, "quantized", &surface);

        for tex in [&before, &after, &loaded, &quantized] {
            let format = tex.format().unwrap();
            assert!(!format.is_srgb(), "{} uploaded as {format:?}", tex.name());
        }
        assert_eq!(after.format(), loaded.format());
    }

    #[test]
    fn matching_depth_texture_is_depth_stencil() {
        let device = HeadlessDevice::new();
        let depth =
            Texture2D::render_target(&device, "d", 8, 4, wgpu::TextureFormat::Depth32Float);
        let copy = Texture2D::new_matching(&device, "d2", &depth).unwrap();
        assert_eq!(copy.usage(), TextureUsage::DEPTH_STENCIL | TextureUsage::SHADER_RESOURCE);
        assert_eq!(copy.memory(), MemoryUsage::GpuOnly);
        assert_eq!(copy.size(), IVec2::new(8, 4));
    }

    #[test]
    fn matching_color_texture_is_render_target() {
        let device = HeadlessDevice::new();
        let color =
            Texture2D::render_target(&device, "c", 8, 4, wgpu::TextureFormat::Bgra8UnormSrgb);
        let copy = Texture2D::new_matching(&device, "c2", &color).unwrap();
        assert!(copy.usage().contains(TextureUsage::RENDER_TARGET));
        assert!(copy.usage().contains(TextureUsage::SHADER_RESOURCE));
        assert_eq!(copy.format(), Some(wgpu::TextureFormat::Bgra8UnormSrgb));
    }

    #[test]
    fn matching_an_empty_texture_fails() {
        let device = HeadlessDevice::new();
        assert!(Texture2D::new_matching(&device, "x", &Texture2D::empty("e")).is_err());
    }

    #[test]
    fn view_is_created_once() {
        let device = HeadlessDevice::new();
        let tex = Texture2D::render_target(&device, "c", 4, 4, wgpu::TextureFormat::Rgba8Unorm);
        assert!(tex.view_handle(&device).is_some());
        assert!(tex.view_handle(&device).is_some());
        assert_eq!(device.stats().views_created, 1);
    }

    #[test]
    fn empty_texture_has_no_view() {
        let device = HeadlessDevice::new();
        assert!(Texture2D::empty("later").view_handle(&device).is_none());
        assert_eq!(device.stats().views_created, 0);
    }

    #[test]
    fn wrapped_image_is_borrowed() {
        let device = HeadlessDevice::new();
        let owner = Texture2D::render_target(&device, "o", 2, 2, wgpu::TextureFormat::Rgba8Unorm);
        let wrapped = Texture2D::wrap("w", owner.image().unwrap().clone());
        assert_eq!(wrapped.ownership(), ImageOwnership::Borrowed);
        assert!(wrapped.usage().contains(TextureUsage::RENDER_TARGET));
        assert_eq!(device.stats().textures_created, 1);
    }
}
