use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::coords::Vec2;
use crate::desc::DescNode;
use crate::render::texture::Texture2D;

use super::sheet::{Sprite, SpriteSheet};

/// What a clip does when it runs off either end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    /// Stop on the last frame and pause.
    Once,
    #[default]
    Loop,
    /// Bounce between the first and last frames.
    PingPong,
}

impl PlaybackMode {
    /// Parses `once`, `loop` or `pingpong`; anything else loops.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Self::Once,
            "pingpong" | "ping_pong" => Self::PingPong,
            "loop" => Self::Loop,
            other => {
                log::warn!("unknown playback mode '{other}', looping");
                Self::Loop
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnimFrame {
    pub sprite: Sprite,
    /// Seconds this frame stays on screen.
    pub duration: f32,
}

/// A sequence of timed frames with a playback cursor.
#[derive(Debug, Clone)]
pub struct SpriteAnimClip {
    frames: Vec<AnimFrame>,
    mode: PlaybackMode,
    start_paused: bool,

    current: usize,
    remaining: f32,
    paused: bool,
    forward: bool,
}

impl SpriteAnimClip {
    pub fn new(frames: Vec<AnimFrame>, mode: PlaybackMode, paused: bool) -> Self {
        let remaining = frames.first().map_or(0.0, |f| f.duration);
        Self {
            frames,
            mode,
            start_paused: paused,
            current: 0,
            remaining,
            paused,
            forward: true,
        }
    }

    pub fn frames(&self) -> &[AnimFrame] {
        &self.frames
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn current_frame(&self) -> usize {
        self.current
    }

    /// Time left on the current frame.
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    /// Back to the first frame, playing forward, with the initial pause state.
    pub fn reset(&mut self) {
        self.current = 0;
        self.forward = true;
        self.paused = self.start_paused;
        self.remaining = self.frames.first().map_or(0.0, |f| f.duration);
    }

    pub fn advance_time(&mut self, mut dt: f32) {
        if self.frames.is_empty() {
            return;
        }

        while !self.paused && dt > 0.0 {
            if dt < self.remaining {
                self.remaining -= dt;
                return;
            }
            dt -= self.remaining;
            self.step();
            self.remaining = self.frames[self.current].duration;

            // a zero-length frame would spin forever
            if self.remaining <= 0.0 {
                return;
            }
        }
    }

    fn step(&mut self) {
        let last = self.frames.len() - 1;
        match self.mode {
            PlaybackMode::Once => {
                let at_end = if self.forward {
                    self.current == last
                } else {
                    self.current == 0
                };
                if at_end {
                    self.paused = true;
                } else if self.forward {
                    self.current += 1;
                } else {
                    self.current -= 1;
                }
            }
            PlaybackMode::Loop => {
                self.current = if self.forward {
                    (self.current + 1) % self.frames.len()
                } else {
                    (self.current + last) % self.frames.len()
                };
            }
            PlaybackMode::PingPong => {
                if self.forward {
                    if self.current == last {
                        self.forward = false;
                        self.current = last.saturating_sub(1);
                    } else {
                        self.current += 1;
                    }
                } else if self.current == 0 {
                    self.forward = true;
                    self.current = last.min(1);
                } else {
                    self.current -= 1;
                }
            }
        }
    }

    pub fn current_sprite(&self) -> Option<&Sprite> {
        self.frames.get(self.current).map(|f| &f.sprite)
    }

    /// UVs of the frame on screen; the full texture for an empty clip.
    pub fn current_frame_uvs(&self) -> [Vec2; 4] {
        match self.current_sprite() {
            Some(sprite) => sprite.uvs(),
            None => full_uvs(),
        }
    }
}

fn full_uvs() -> [Vec2; 4] {
    [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, 1.0),
        Vec2::new(1.0, 1.0),
    ]
}

/// Named clips over one sprite sheet. Cloning gives an independent cursor.
#[derive(Debug, Clone)]
pub struct SpriteAnim {
    sheet: Rc<SpriteSheet>,
    clips: HashMap<String, SpriteAnimClip>,
    current_clip_id: String,
}

impl SpriteAnim {
    pub fn new(sheet: Rc<SpriteSheet>) -> Self {
        Self {
            sheet,
            clips: HashMap::new(),
            current_clip_id: String::new(),
        }
    }

    /// Builds an animation from
    ///
    /// ```xml
    /// <anim sheet="hero" default="walk">
    ///   <clip id="walk" mode="loop" paused="false">
    ///     <frame index="0" duration="0.1"/>
    ///   </clip>
    /// </anim>
    /// ```
    ///
    /// `find_sheet` resolves the `sheet` id.
    pub fn from_desc(
        desc: &DescNode,
        find_sheet: impl FnOnce(&str) -> Result<Rc<SpriteSheet>>,
    ) -> Result<Self> {
        let sheet_id = desc.attr("sheet").context("animation has no sheet attribute")?;
        let sheet = find_sheet(sheet_id)?;
        let mut anim = SpriteAnim::new(Rc::clone(&sheet));
        let mut first = None;

        for clip in desc.children("clip") {
            let id = clip.attr("id").context("animation clip has no id")?;
            let frames = clip
                .children("frame")
                .map(|frame| {
                    let index = frame.attr_u32("index", 0) as usize;
                    let sprite = sheet.sprite(index).with_context(|| {
                        format!("clip '{id}': sprite {index} not in sheet '{sheet_id}'")
                    })?;
                    Ok(AnimFrame {
                        sprite: sprite.clone(),
                        duration: frame.attr_f32("duration", 0.0),
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            if frames.is_empty() {
                log::warn!("clip '{id}' has no frames");
            }

            let mode = PlaybackMode::parse(&clip.attr_str("mode", "loop"));
            let paused = clip.attr_bool("paused", false);
            anim.add_clip(id, SpriteAnimClip::new(frames, mode, paused));
            first.get_or_insert_with(|| id.to_string());
        }

        let default = desc.attr("default").map(str::to_string).or(first);
        if let Some(id) = default {
            if !anim.set_current_clip(&id) {
                log::warn!("default clip '{id}' is not defined");
            }
        }

        Ok(anim)
    }

    pub fn add_clip(&mut self, id: impl Into<String>, clip: SpriteAnimClip) {
        self.clips.insert(id.into(), clip);
    }

    pub fn clip(&self, id: &str) -> Option<&SpriteAnimClip> {
        self.clips.get(id)
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn current_clip_id(&self) -> &str {
        &self.current_clip_id
    }

    pub fn current_clip(&self) -> Option<&SpriteAnimClip> {
        self.clips.get(&self.current_clip_id)
    }

    fn current_clip_mut(&mut self) -> Option<&mut SpriteAnimClip> {
        self.clips.get_mut(&self.current_clip_id)
    }

    /// Switches clips, restarting the new one. Returns false for an unknown id.
    pub fn set_current_clip(&mut self, id: &str) -> bool {
        let Some(clip) = self.clips.get_mut(id) else {
            return false;
        };
        if self.current_clip_id != id {
            clip.reset();
            self.current_clip_id = id.to_string();
        }
        true
    }

    pub fn advance_time(&mut self, dt: f32) {
        if let Some(clip) = self.current_clip_mut() {
            clip.advance_time(dt);
        }
    }

    pub fn reset(&mut self) {
        if let Some(clip) = self.current_clip_mut() {
            clip.reset();
        }
    }

    pub fn pause(&mut self) {
        if let Some(clip) = self.current_clip_mut() {
            clip.pause();
        }
    }

    pub fn unpause(&mut self) {
        if let Some(clip) = self.current_clip_mut() {
            clip.unpause();
        }
    }

    pub fn sheet(&self) -> &Rc<SpriteSheet> {
        &self.sheet
    }

    pub fn texture(&self) -> &Rc<Texture2D> {
        self.sheet.texture()
    }

    pub fn current_frame_uvs(&self) -> [Vec2; 4] {
        self.current_clip()
            .map_or_else(full_uvs, SpriteAnimClip::current_frame_uvs)
    }
}

/// Either a single sprite or an animation, behind one query surface.
#[derive(Debug, Clone)]
pub enum AnimSource {
    Static(Sprite),
    Clip(SpriteAnim),
}

impl AnimSource {
    pub fn advance_time(&mut self, dt: f32) {
        if let AnimSource::Clip(anim) = self {
            anim.advance_time(dt);
        }
    }

    pub fn reset(&mut self) {
        if let AnimSource::Clip(anim) = self {
            anim.reset();
        }
    }

    pub fn pause(&mut self) {
        if let AnimSource::Clip(anim) = self {
            anim.pause();
        }
    }

    pub fn unpause(&mut self) {
        if let AnimSource::Clip(anim) = self {
            anim.unpause();
        }
    }

    /// A static sprite accepts any clip id.
    pub fn set_current_clip(&mut self, id: &str) -> bool {
        match self {
            AnimSource::Static(_) => true,
            AnimSource::Clip(anim) => anim.set_current_clip(id),
        }
    }

    pub fn texture(&self) -> Option<Rc<Texture2D>> {
        match self {
            AnimSource::Static(sprite) => sprite.texture(),
            AnimSource::Clip(anim) => Some(Rc::clone(anim.texture())),
        }
    }

    pub fn current_frame_uvs(&self) -> [Vec2; 4] {
        match self {
            AnimSource::Static(sprite) => sprite.uvs(),
            AnimSource::Clip(anim) => anim.current_frame_uvs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::IVec2;
    use crate::device::HeadlessDevice;

    fn sheet(count: i32) -> Rc<SpriteSheet> {
        let device = HeadlessDevice::new();
        let texture =
            Texture2D::render_target(&device, "anim", 16, 16, wgpu::TextureFormat::Rgba8Unorm);
        SpriteSheet::regular(Rc::new(texture), IVec2::new(count, 1))
    }

    fn clip(sheet: &SpriteSheet, durations: &[f32], mode: PlaybackMode) -> SpriteAnimClip {
        let frames = durations
            .iter()
            .enumerate()
            .map(|(i, &duration)| AnimFrame {
                sprite: sheet.sprite(i).unwrap().clone(),
                duration,
            })
            .collect();
        SpriteAnimClip::new(frames, mode, false)
    }

    fn visit(clip: &mut SpriteAnimClip, steps: usize) -> Vec<usize> {
        (0..steps)
            .map(|_| {
                clip.advance_time(1.0);
                clip.current_frame()
            })
            .collect()
    }

    // ── playback ──────────────────────────────────────────────────────────

    #[test]
    fn mode_parses_with_loop_fallback() {
        assert_eq!(PlaybackMode::parse("once"), PlaybackMode::Once);
        assert_eq!(PlaybackMode::parse("PingPong"), PlaybackMode::PingPong);
        assert_eq!(PlaybackMode::parse("loop"), PlaybackMode::Loop);
        assert_eq!(PlaybackMode::parse("bogus"), PlaybackMode::Loop);
    }

    #[test]
    fn partial_step_only_consumes_time() {
        let s = sheet(3);
        let mut c = clip(&s, &[1.0, 1.0, 1.0], PlaybackMode::Loop);
        c.advance_time(0.25);
        assert_eq!(c.current_frame(), 0);
        assert!((c.remaining() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn loop_step_of_one_and_a_half_frames() {
        let s = sheet(2);
        let mut c = clip(&s, &[1.0, 1.0], PlaybackMode::Loop);
        c.advance_time(1.5);
        assert_eq!(c.current_frame(), 1);
        assert!((c.remaining() - 0.5).abs() < 1e-6);
        assert!(!c.is_paused());
    }

    #[test]
    fn once_overshoot_pauses_on_last_frame() {
        let s = sheet(3);
        let mut c = clip(&s, &[1.0, 1.0, 1.0], PlaybackMode::Once);
        c.advance_time(5.0);
        assert_eq!(c.current_frame(), 2);
        assert!(c.is_paused());
    }

    #[test]
    fn loop_wraps() {
        let s = sheet(3);
        let mut c = clip(&s, &[1.0; 3], PlaybackMode::Loop);
        assert_eq!(visit(&mut c, 4), [1, 2, 0, 1]);
    }

    #[test]
    fn large_step_crosses_several_frames() {
        let s = sheet(3);
        let mut c = clip(&s, &[0.5, 1.0, 2.0], PlaybackMode::Loop);
        c.advance_time(1.75);
        assert_eq!(c.current_frame(), 2);
        assert!((c.remaining() - 1.75).abs() < 1e-6);
    }

    #[test]
    fn once_stops_on_last_frame() {
        let s = sheet(3);
        let mut c = clip(&s, &[1.0; 3], PlaybackMode::Once);
        assert_eq!(visit(&mut c, 4), [1, 2, 2, 2]);
        assert!(c.is_paused());

        c.reset();
        assert!(!c.is_paused());
        assert_eq!(c.current_frame(), 0);
    }

    #[test]
    fn ping_pong_reverses_inside_the_ends() {
        let s = sheet(3);
        let mut c = clip(&s, &[1.0; 3], PlaybackMode::PingPong);
        assert_eq!(visit(&mut c, 6), [1, 2, 1, 0, 1, 2]);
    }

    #[test]
    fn paused_clip_holds_its_frame() {
        let s = sheet(2);
        let mut c = clip(&s, &[1.0; 2], PlaybackMode::Loop);
        c.pause();
        c.advance_time(5.0);
        assert_eq!(c.current_frame(), 0);
        c.unpause();
        c.advance_time(1.0);
        assert_eq!(c.current_frame(), 1);
    }

    #[test]
    fn zero_length_frame_terminates() {
        let s = sheet(2);
        let mut c = clip(&s, &[0.0, 0.0], PlaybackMode::Loop);
        c.advance_time(10.0);
        assert_eq!(c.current_frame(), 1);
    }

    #[test]
    fn empty_clip_is_inert() {
        let mut c = SpriteAnimClip::new(Vec::new(), PlaybackMode::PingPong, false);
        c.advance_time(3.0);
        assert_eq!(c.current_frame(), 0);
        assert_eq!(c.current_frame_uvs(), full_uvs());
    }

    // ── anim ──────────────────────────────────────────────────────────────

    const DESC: &str = r#"
        <anim sheet="hero">
            <clip id="idle" mode="once" paused="true">
                <frame index="0" duration="0.5"/>
            </clip>
            <clip id="walk" mode="pingpong">
                <frame index="1" duration="0.1"/>
                <frame index="2" duration="0.1"/>
            </clip>
        </anim>"#;

    fn anim() -> SpriteAnim {
        let s = sheet(3);
        SpriteAnim::from_desc(&DescNode::parse(DESC).unwrap(), |id| {
            assert_eq!(id, "hero");
            Ok(Rc::clone(&s))
        })
        .unwrap()
    }

    #[test]
    fn desc_builds_clips_and_selects_first() {
        let a = anim();
        assert_eq!(a.clip_count(), 2);
        assert_eq!(a.current_clip_id(), "idle");
        assert!(a.current_clip().unwrap().is_paused());
        assert_eq!(a.clip("walk").unwrap().mode(), PlaybackMode::PingPong);
    }

    #[test]
    fn unknown_clip_is_rejected() {
        let mut a = anim();
        assert!(!a.set_current_clip("run"));
        assert_eq!(a.current_clip_id(), "idle");
    }

    #[test]
    fn uvs_follow_the_current_frame() {
        let mut a = anim();
        assert!(a.set_current_clip("walk"));
        let first = a.current_frame_uvs();
        a.advance_time(0.1);
        assert_ne!(a.current_frame_uvs(), first);
        assert_eq!(a.current_frame_uvs(), a.sheet().sprite(2).unwrap().uvs());
    }

    #[test]
    fn copies_advance_independently() {
        let mut a = anim();
        a.set_current_clip("walk");
        let b = a.clone();
        a.advance_time(0.1);
        assert_eq!(a.current_clip().unwrap().current_frame(), 1);
        assert_eq!(b.current_clip().unwrap().current_frame(), 0);
    }

    #[test]
    fn frame_outside_sheet_fails() {
        let s = sheet(1);
        let desc = DescNode::parse(
            r#"<anim sheet="s"><clip id="c"><frame index="4"/></clip></anim>"#,
        )
        .unwrap();
        assert!(SpriteAnim::from_desc(&desc, |_| Ok(Rc::clone(&s))).is_err());
    }

    #[test]
    fn static_source_ignores_time() {
        let s = sheet(2);
        let sprite = s.sprite(1).unwrap().clone();
        let mut source = AnimSource::Static(sprite.clone());
        source.advance_time(1.0);
        assert!(source.set_current_clip("anything"));
        assert_eq!(source.current_frame_uvs(), sprite.uvs());
        assert!(source.texture().is_some());
    }
}
