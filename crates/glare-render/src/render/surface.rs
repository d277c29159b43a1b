use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::coords::{IVec2, Rgba, Rgba8};

/// CPU-side image: normalized float texels plus, for decoded files, the raw
/// 8-bit buffer.
///
/// Texels are stored row-major from the top row down.
#[derive(Debug, Clone)]
pub struct Surface {
    path: Option<PathBuf>,
    width: u32,
    height: u32,
    texels: Vec<Rgba>,
    raw: Option<Vec<u8>>,
    raw_channels: u8,
}

impl Surface {
    /// A `width × height` surface filled with `color`.
    pub fn new(width: u32, height: u32, color: Rgba) -> Self {
        Self {
            path: None,
            width,
            height,
            texels: vec![color; (width * height) as usize],
            raw: None,
            raw_channels: 0,
        }
    }

    /// A surface from row-major texels.
    pub fn from_texels(width: u32, height: u32, texels: &[Rgba]) -> Result<Self> {
        anyhow::ensure!(
            texels.len() == (width * height) as usize,
            "{} texels given for a {width}x{height} surface",
            texels.len()
        );
        Ok(Self {
            texels: texels.to_vec(),
            ..Self::new(width, height, Rgba::WHITE)
        })
    }

    /// Decodes an image file. Gray and gray-alpha images are expanded to RGB
    /// and RGBA; `flip_v` mirrors the rows.
    pub fn load(path: impl AsRef<Path>, flip_v: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut image = image::open(path)
            .with_context(|| format!("failed to decode image {}", path.display()))?;
        if flip_v {
            image = image.flipv();
        }

        let (width, height) = (image.width(), image.height());
        anyhow::ensure!(width > 0 && height > 0, "image {} is empty", path.display());

        let (raw, channels) = if image.color().has_alpha() {
            (image.to_rgba8().into_raw(), 4u8)
        } else {
            (image.to_rgb8().into_raw(), 3u8)
        };

        let texels = raw
            .chunks_exact(channels as usize)
            .map(|px| {
                let a = if channels == 4 { px[3] } else { u8::MAX };
                Rgba::from(Rgba8::new(px[0], px[1], px[2], a))
            })
            .collect();

        log::debug!(
            "surface {}: {width}x{height}, {channels} channels",
            path.display()
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            width,
            height,
            texels,
            raw: Some(raw),
            raw_channels: channels,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> IVec2 {
        IVec2::new(self.width as i32, self.height as i32)
    }

    pub fn texels(&self) -> &[Rgba] {
        &self.texels
    }

    /// Direct texel access. The raw buffer, if any, is dropped because it can
    /// no longer be kept in sync.
    pub fn texels_mut(&mut self) -> &mut [Rgba] {
        self.raw = None;
        self.raw_channels = 0;
        &mut self.texels
    }

    /// Raw 8-bit buffer and its channel count.
    pub fn raw(&self) -> Option<(&[u8], u8)> {
        self.raw.as_deref().map(|r| (r, self.raw_channels))
    }

    fn index_of(&self, coord: IVec2) -> usize {
        assert!(
            coord.x >= 0
                && coord.y >= 0
                && (coord.x as u32) < self.width
                && (coord.y as u32) < self.height,
            "texel {coord:?} outside a {}x{} surface",
            self.width,
            self.height
        );
        coord.y as usize * self.width as usize + coord.x as usize
    }

    pub fn texel(&self, coord: IVec2) -> Rgba {
        self.texels[self.index_of(coord)]
    }

    /// Sets one texel, keeping the raw buffer in lock-step.
    pub fn set_texel(&mut self, coord: IVec2, color: Rgba) {
        let index = self.index_of(coord);
        self.texels[index] = color;

        let channels = self.raw_channels as usize;
        if let Some(raw) = self.raw.as_mut() {
            let c = Rgba8::from(color);
            let px = &mut raw[index * channels..(index + 1) * channels];
            px.copy_from_slice(&[c.r, c.g, c.b, c.a][..channels]);
        }
    }

    /// Writes a 4-channel PNG, building the raw buffer from the float texels
    /// first when the surface has none.
    pub fn write_png(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.raw.is_none() {
            self.raw = Some(quantize(&self.texels));
            self.raw_channels = 4;
        }

        let rgba = self.rgba8_bytes();
        image::save_buffer(path, &rgba, self.width, self.height, image::ColorType::Rgba8)
            .with_context(|| format!("failed to write png {}", path.display()))
    }

    /// 4-channel copy of the raw buffer (expanded from RGB when needed).
    fn rgba8_bytes(&self) -> Vec<u8> {
        match (&self.raw, self.raw_channels) {
            (Some(raw), 4) => raw.clone(),
            (Some(raw), 3) => raw
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
                .collect(),
            _ => quantize(&self.texels),
        }
    }
}

fn quantize(texels: &[Rgba]) -> Vec<u8> {
    texels
        .iter()
        .flat_map(|t| {
            let c = Rgba8::from(*t);
            [c.r, c.g, c.b, c.a]
        })
        .collect()
}
