use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::coords::IVec2;
use crate::desc::DescNode;
use crate::device::GpuDevice;

use super::layout::{BufferLayout, LayoutRegistry};
use super::sprite::{SpriteAnim, SpriteSheet, TextureSource};
use super::surface::Surface;
use super::texture::Texture2D;
use super::vertex::Vertex;

/// String-keyed caches for everything loaded from disk.
///
/// Entries live until the matching `clear_*` call; handles given out earlier
/// stay valid because they are reference counted.
#[derive(Debug, Default)]
pub struct ResourceManager {
    layouts: LayoutRegistry,
    surfaces: HashMap<String, Surface>,
    textures: HashMap<String, Rc<Texture2D>>,
    sprite_sheets: HashMap<String, Rc<SpriteSheet>>,
    sprite_anims: HashMap<String, SpriteAnim>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire_layout_of<T: Vertex + 'static>(&mut self) -> Arc<BufferLayout> {
        self.layouts.acquire_layout_of::<T>()
    }

    pub fn layouts(&self) -> &LayoutRegistry {
        &self.layouts
    }

    // ── surfaces ──────────────────────────────────────────────────────────

    /// The surface cached under `id`, decoding `path` on first use.
    pub fn load_surface(
        &mut self,
        id: &str,
        path: impl AsRef<Path>,
        flip_v: bool,
    ) -> Result<&Surface> {
        match self.surfaces.entry(id.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(Surface::load(path, flip_v)?)),
        }
    }

    pub fn surface(&self, id: &str) -> Option<&Surface> {
        self.surfaces.get(id)
    }

    pub fn surface_mut(&mut self, id: &str) -> Option<&mut Surface> {
        self.surfaces.get_mut(id)
    }

    pub fn clear_surfaces(&mut self) {
        self.surfaces.clear();
    }

    // ── textures ──────────────────────────────────────────────────────────

    /// The texture cached under `id`, uploading the image at `path` on first use.
    pub fn load_texture2d_from_file(
        &mut self,
        device: &dyn GpuDevice,
        id: &str,
        path: impl AsRef<Path>,
    ) -> Result<Rc<Texture2D>> {
        if let Some(texture) = self.textures.get(id) {
            return Ok(Rc::clone(texture));
        }

        let surface = Surface::load(path, false)?;
        let texture = Texture2D::from_surface(device, id, &surface);
        Ok(self.register_texture(id, texture))
    }

    /// Adds (or replaces) a texture under `id`.
    pub fn register_texture(&mut self, id: &str, texture: Texture2D) -> Rc<Texture2D> {
        let texture = Rc::new(texture);
        self.textures.insert(id.to_string(), Rc::clone(&texture));
        texture
    }

    /// Unknown ids are reported and yield `None`.
    pub fn texture(&self, id: &str) -> Option<Rc<Texture2D>> {
        let found = self.textures.get(id).cloned();
        if found.is_none() {
            log::warn!("texture '{id}' is not loaded");
        }
        found
    }

    pub fn clear_textures(&mut self) {
        self.textures.clear();
    }

    // ── sprite sheets ─────────────────────────────────────────────────────

    /// A regular `layout` grid over `texture`, cached under `id`.
    pub fn load_sprite_sheet_from_texture(
        &mut self,
        id: &str,
        texture: Rc<Texture2D>,
        layout: IVec2,
    ) -> Rc<SpriteSheet> {
        let sheet = SpriteSheet::regular(texture, layout);
        self.sprite_sheets.insert(id.to_string(), Rc::clone(&sheet));
        sheet
    }

    /// An irregular sheet from a description file, cached under `id`.
    /// Relative `src` paths resolve against the description's directory.
    pub fn load_sprite_sheet_from_desc(
        &mut self,
        device: &dyn GpuDevice,
        id: &str,
        path: impl AsRef<Path>,
    ) -> Result<Rc<SpriteSheet>> {
        if let Some(sheet) = self.sprite_sheets.get(id) {
            return Ok(Rc::clone(sheet));
        }

        let path = path.as_ref();
        let desc = DescNode::load(path)?;
        let base_dir = path.parent().unwrap_or(Path::new(""));

        let mut loader = TextureLoader {
            resources: self,
            device,
        };
        let sheet = SpriteSheet::from_desc(&desc, base_dir, &mut loader)
            .with_context(|| format!("failed to load sprite sheet {}", path.display()))?;

        self.sprite_sheets.insert(id.to_string(), Rc::clone(&sheet));
        Ok(sheet)
    }

    pub fn sprite_sheet(&self, id: &str) -> Result<Rc<SpriteSheet>> {
        self.sprite_sheets
            .get(id)
            .cloned()
            .with_context(|| format!("sprite sheet '{id}' is not loaded"))
    }

    pub fn clear_sprite_sheets(&mut self) {
        self.sprite_sheets.clear();
    }

    // ── sprite animations ─────────────────────────────────────────────────

    /// Loads an animation description whose sheet is already cached.
    pub fn load_sprite_anim_from_desc(&mut self, id: &str, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let desc = DescNode::load(path)?;
        let anim = SpriteAnim::from_desc(&desc, |sheet| self.sprite_sheet(sheet))
            .with_context(|| format!("failed to load animation {}", path.display()))?;

        log::debug!("animation '{id}': {} clips", anim.clip_count());
        self.sprite_anims.insert(id.to_string(), anim);
        Ok(())
    }

    /// An independent copy of the animation cached under `id`.
    pub fn sprite_anim_copy(&self, id: &str) -> Result<SpriteAnim> {
        self.sprite_anims
            .get(id)
            .cloned()
            .with_context(|| format!("animation '{id}' is not loaded"))
    }

    pub fn clear_sprite_anims(&mut self) {
        self.sprite_anims.clear();
    }

    pub fn clear(&mut self) {
        self.clear_sprite_anims();
        self.clear_sprite_sheets();
        self.clear_textures();
        self.clear_surfaces();
    }
}

struct TextureLoader<'a> {
    resources: &'a mut ResourceManager,
    device: &'a dyn GpuDevice,
}

impl TextureSource for TextureLoader<'_> {
    fn find_texture(&self, id: &str) -> Option<Rc<Texture2D>> {
        self.resources.textures.get(id).cloned()
    }

    fn load_texture(&mut self, id: &str, path: &Path) -> Result<Rc<Texture2D>> {
        self.resources
            .load_texture2d_from_file(self.device, id, path)
    }
}
