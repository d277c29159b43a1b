use std::path::Path;
use std::rc::{Rc, Weak};

use anyhow::{Context, Result};

use crate::coords::{Aabb2, IVec2, Vec2};
use crate::desc::DescNode;
use crate::render::texture::Texture2D;

/// A UV sub-rectangle of a sheet's texture.
///
/// UV space has +V pointing down, so `bottom_left.y > top_right.y`.
#[derive(Debug, Clone, Default)]
pub struct Sprite {
    sheet: Weak<SpriteSheet>,
    bottom_left: Vec2,
    top_right: Vec2,
}

impl Sprite {
    pub fn bottom_left(&self) -> Vec2 {
        self.bottom_left
    }

    pub fn top_right(&self) -> Vec2 {
        self.top_right
    }

    /// UVs in `[top-left, top-right, bottom-left, bottom-right]` order.
    pub fn uvs(&self) -> [Vec2; 4] {
        let (bl, tr) = (self.bottom_left, self.top_right);
        [
            Vec2::new(bl.x, tr.y),
            tr,
            bl,
            Vec2::new(tr.x, bl.y),
        ]
    }

    /// UV rectangle with `min` at the top-left.
    pub fn uv_box(&self) -> Aabb2 {
        Aabb2::new(
            Vec2::new(self.bottom_left.x, self.top_right.y),
            Vec2::new(self.top_right.x, self.bottom_left.y),
        )
    }

    pub fn sheet(&self) -> Option<Rc<SpriteSheet>> {
        self.sheet.upgrade()
    }

    /// The sheet's texture, while the sheet is alive.
    pub fn texture(&self) -> Option<Rc<Texture2D>> {
        self.sheet.upgrade().map(|s| Rc::clone(&s.texture))
    }
}

/// Where irregular sheets find their texture.
pub trait TextureSource {
    /// A texture already registered under `id`.
    fn find_texture(&self, id: &str) -> Option<Rc<Texture2D>>;

    /// Loads `path` and registers it under `id`.
    fn load_texture(&mut self, id: &str, path: &Path) -> Result<Rc<Texture2D>>;
}

/// One texture divided into sprites.
#[derive(Debug)]
pub struct SpriteSheet {
    texture: Rc<Texture2D>,
    /// Columns × rows of a regular sheet; zero for irregular ones.
    layout: IVec2,
    sprites: Vec<Sprite>,
}

impl SpriteSheet {
    /// A regular `cols × rows` grid, numbered row-major from the top-left.
    pub fn regular(texture: Rc<Texture2D>, layout: IVec2) -> Rc<SpriteSheet> {
        let (cols, rows) = (layout.x.max(0) as usize, layout.y.max(0) as usize);
        let stride = Vec2::new(1.0 / cols as f32, 1.0 / rows as f32);

        Rc::new_cyclic(|weak| {
            let sprites = (0..cols * rows)
                .map(|i| {
                    let (x, y) = ((i % cols) as f32, (i / cols) as f32);
                    let bottom_left = Vec2::new(x * stride.x, (y + 1.0) * stride.y);
                    Sprite {
                        sheet: weak.clone(),
                        bottom_left,
                        top_right: Vec2::new(bottom_left.x + stride.x, bottom_left.y - stride.y),
                    }
                })
                .collect();

            SpriteSheet {
                texture,
                layout,
                sprites,
            }
        })
    }

    /// An irregular sheet from a `<spritesheet id=".." src="..">` description
    /// listing `<sprite index="i" bl="x,y" tr="x,y"/>` rectangles in pixels.
    ///
    /// The texture is looked up by `id` and loaded from `src` (relative to
    /// `base_dir`) when not registered yet.
    pub fn from_desc(
        desc: &DescNode,
        base_dir: &Path,
        textures: &mut dyn TextureSource,
    ) -> Result<Rc<SpriteSheet>> {
        let id = desc.attr_str("id", "");
        let texture = match textures.find_texture(&id) {
            Some(texture) => texture,
            None => {
                let src = desc.attr("src").with_context(|| {
                    format!("sprite sheet '{id}': no loaded texture and no src image")
                })?;
                textures.load_texture(&id, &base_dir.join(src))?
            }
        };

        let size = texture.size().to_vec2();
        anyhow::ensure!(
            size.x > 0.0 && size.y > 0.0,
            "sprite sheet '{id}': texture has no image"
        );
        let inv_size = Vec2::new(1.0 / size.x, 1.0 / size.y);

        let entries: Vec<&DescNode> = desc.children("sprite").collect();
        let count = entries.len();

        let mut placed = vec![false; count];
        let mut rects = vec![(Vec2::ZERO, Vec2::ZERO); count];
        for entry in entries {
            let index = entry.attr_u32("index", u32::MAX) as usize;
            anyhow::ensure!(
                index < count,
                "sprite sheet '{id}': sprite index {index} outside 0..{count}"
            );
            let bl = entry.attr_vec2("bl", Vec2::ZERO).scaled(inv_size);
            let tr = entry.attr_vec2("tr", Vec2::ZERO).scaled(inv_size);
            rects[index] = (bl, tr);
            placed[index] = true;
        }

        let unfilled: Vec<usize> = (0..count).filter(|&i| !placed[i]).collect();
        if !unfilled.is_empty() {
            log::warn!("sprite sheet '{id}': no rectangle for sprites {unfilled:?}");
        }

        log::debug!("sprite sheet '{id}': {count} sprites");

        Ok(Rc::new_cyclic(|weak| SpriteSheet {
            texture,
            layout: IVec2::default(),
            sprites: rects
                .into_iter()
                .map(|(bottom_left, top_right)| Sprite {
                    sheet: weak.clone(),
                    bottom_left,
                    top_right,
                })
                .collect(),
        }))
    }

    pub fn texture(&self) -> &Rc<Texture2D> {
        &self.texture
    }

    pub fn layout(&self) -> IVec2 {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn sprite(&self, index: usize) -> Option<&Sprite> {
        self.sprites.get(index)
    }

    /// Sprite at grid `coord` of a regular sheet.
    pub fn sprite_at(&self, coord: IVec2) -> Option<&Sprite> {
        if coord.x < 0 || coord.y < 0 || coord.x >= self.layout.x {
            return None;
        }
        let index = coord.y.checked_mul(self.layout.x)?.checked_add(coord.x)?;
        self.sprite(usize::try_from(index).ok()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use std::collections::HashMap;

    fn texture(w: u32, h: u32) -> Rc<Texture2D> {
        let device = HeadlessDevice::new();
        Rc::new(Texture2D::render_target(&device, "sheet", w, h, wgpu::TextureFormat::Rgba8Unorm))
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
    }

    #[derive(Default)]
    struct Textures {
        known: HashMap<String, Rc<Texture2D>>,
        loads: Vec<String>,
    }

    impl TextureSource for Textures {
        fn find_texture(&self, id: &str) -> Option<Rc<Texture2D>> {
            self.known.get(id).cloned()
        }

        fn load_texture(&mut self, id: &str, path: &Path) -> Result<Rc<Texture2D>> {
            self.loads.push(path.display().to_string());
            let t = texture(64, 32);
            self.known.insert(id.to_string(), Rc::clone(&t));
            Ok(t)
        }
    }

    // ── regular ───────────────────────────────────────────────────────────

    #[test]
    fn regular_sheet_is_row_major() {
        let sheet = SpriteSheet::regular(texture(64, 64), IVec2::new(4, 2));
        assert_eq!(sheet.len(), 8);

        // index 5 → column 1, row 1
        let s = sheet.sprite(5).unwrap();
        assert!(close(s.bottom_left(), Vec2::new(0.25, 1.0)));
        assert!(close(s.top_right(), Vec2::new(0.5, 0.5)));
    }

    #[test]
    fn sprites_tile_the_unit_square() {
        let sheet = SpriteSheet::regular(texture(30, 20), IVec2::new(3, 2));
        let mut area = 0.0;
        for i in 0..sheet.len() {
            let b = sheet.sprite(i).unwrap().uv_box();
            assert!(b.min.x >= 0.0 && b.max.x <= 1.0 + 1e-6);
            assert!(b.min.y >= 0.0 && b.max.y <= 1.0 + 1e-6);
            area += b.size().x * b.size().y;
        }
        assert!((area - 1.0).abs() < 1e-5);
    }

    #[test]
    fn uvs_are_in_corner_order() {
        let sheet = SpriteSheet::regular(texture(8, 8), IVec2::new(2, 2));
        let [tl, tr, bl, br] = sheet.sprite(0).unwrap().uvs();
        assert!(close(tl, Vec2::new(0.0, 0.0)));
        assert!(close(tr, Vec2::new(0.5, 0.0)));
        assert!(close(bl, Vec2::new(0.0, 0.5)));
        assert!(close(br, Vec2::new(0.5, 0.5)));
    }

    #[test]
    fn sprite_at_uses_grid_coordinates() {
        let sheet = SpriteSheet::regular(texture(8, 8), IVec2::new(4, 3));
        let a = sheet.sprite_at(IVec2::new(2, 1)).unwrap().bottom_left();
        let b = sheet.sprite(6).unwrap().bottom_left();
        assert_eq!(a, b);
        assert!(sheet.sprite_at(IVec2::new(4, 0)).is_none());
    }

    #[test]
    fn sprite_at_rejects_rows_past_the_sheet() {
        let sheet = SpriteSheet::regular(texture(8, 8), IVec2::new(4, 3));
        assert!(sheet.sprite_at(IVec2::new(0, 3)).is_none());
        assert!(sheet.sprite_at(IVec2::new(1, -1)).is_none());
        assert!(sheet.sprite_at(IVec2::new(3, i32::MAX)).is_none());
    }

    #[test]
    fn sprite_reaches_texture_through_sheet() {
        let sheet = SpriteSheet::regular(texture(8, 8), IVec2::new(1, 1));
        let sprite = sheet.sprite(0).unwrap().clone();
        assert!(sprite.texture().is_some());
        drop(sheet);
        assert!(sprite.texture().is_none());
    }

    // ── irregular ─────────────────────────────────────────────────────────

    const DESC: &str = r#"
        <spritesheet id="hero" src="hero.png">
            <sprite index="1" bl="32,32" tr="64,0"/>
            <sprite index="0" bl="0,32" tr="32,0"/>
        </spritesheet>"#;

    #[test]
    fn irregular_sheet_divides_by_texture_size() {
        let mut textures = Textures::default();
        textures.known.insert("hero".into(), texture(64, 32));
        let sheet =
            SpriteSheet::from_desc(&DescNode::parse(DESC).unwrap(), Path::new("."), &mut textures)
                .unwrap();

        assert_eq!(sheet.len(), 2);
        let s = sheet.sprite(1).unwrap();
        assert!(close(s.bottom_left(), Vec2::new(0.5, 1.0)));
        assert!(close(s.top_right(), Vec2::new(1.0, 0.0)));
        assert!(textures.loads.is_empty());
    }

    #[test]
    fn missing_texture_is_loaded_from_src() {
        let mut textures = Textures::default();
        SpriteSheet::from_desc(&DescNode::parse(DESC).unwrap(), Path::new("art"), &mut textures)
            .unwrap();
        assert_eq!(textures.loads.len(), 1);
        assert!(textures.loads[0].ends_with("hero.png"));
        assert!(textures.known.contains_key("hero"));
    }

    #[test]
    fn no_texture_and_no_src_fails() {
        let desc = DescNode::parse(r#"<spritesheet id="x"><sprite index="0"/></spritesheet>"#)
            .unwrap();
        let result = SpriteSheet::from_desc(&desc, Path::new("."), &mut Textures::default());
        assert!(result.is_err());
    }

    #[test]
    fn index_out_of_range_fails() {
        let desc = DescNode::parse(
            r#"<spritesheet id="t"><sprite index="3" bl="0,1" tr="1,0"/></spritesheet>"#,
        )
        .unwrap();
        let mut textures = Textures::default();
        textures.known.insert("t".into(), texture(4, 4));
        assert!(SpriteSheet::from_desc(&desc, Path::new("."), &mut textures).is_err());
    }

    #[test]
    fn unfilled_slots_keep_default_uvs() {
        let desc = DescNode::parse(
            r#"<spritesheet id="t">
                 <sprite index="0" bl="0,4" tr="4,0"/>
                 <sprite index="0" bl="0,2" tr="2,0"/>
               </spritesheet>"#,
        )
        .unwrap();
        let mut textures = Textures::default();
        textures.known.insert("t".into(), texture(4, 4));
        let sheet = SpriteSheet::from_desc(&desc, Path::new("."), &mut textures).unwrap();

        assert_eq!(sheet.len(), 2);
        assert_eq!(sheet.sprite(1).unwrap().bottom_left(), Vec2::ZERO);
        assert_eq!(sheet.sprite(1).unwrap().top_right(), Vec2::ZERO);
    }
}
