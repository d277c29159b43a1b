//! Sprites, sprite sheets and frame animation.

mod anim;
mod sheet;

pub use anim::{AnimFrame, AnimSource, PlaybackMode, SpriteAnim, SpriteAnimClip};
pub use sheet::{Sprite, SpriteSheet, TextureSource};
