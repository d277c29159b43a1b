use super::aabb2::Aabb2;
use super::vec2::Vec2;

/// Oriented box: a center, a unit "right" axis and half extents along
/// right/up.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Obb2 {
    pub center: Vec2,
    pub right: Vec2,
    pub half_extents: Vec2,
}

impl Obb2 {
    #[inline]
    pub fn new(center: Vec2, right: Vec2, half_extents: Vec2) -> Self {
        Self {
            center,
            right: right.normalized(),
            half_extents,
        }
    }

    /// Box rotated by `radians` around its center.
    #[inline]
    pub fn rotated(center: Vec2, half_extents: Vec2, radians: f32) -> Self {
        Self::new(center, Vec2::from_angle(radians), half_extents)
    }

    #[inline]
    pub fn up(self) -> Vec2 {
        self.right.rotated_90()
    }

    /// Corners in `[top-left, top-right, bottom-left, bottom-right]` order.
    pub fn corners(self) -> [Vec2; 4] {
        let r = self.right * self.half_extents.x;
        let u = self.up() * self.half_extents.y;
        [
            self.center - r + u,
            self.center + r + u,
            self.center - r - u,
            self.center + r - u,
        ]
    }
}

impl From<Aabb2> for Obb2 {
    fn from(b: Aabb2) -> Self {
        Obb2::new(b.center(), Vec2::new(1.0, 0.0), b.size() * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_aligned_corners_match_aabb() {
        let b = Aabb2::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 4.0));
        assert_eq!(Obb2::from(b).corners(), b.corners());
    }

    #[test]
    fn quarter_turn_swaps_extents() {
        let o = Obb2::rotated(Vec2::ZERO, Vec2::new(2.0, 1.0), core::f32::consts::FRAC_PI_2);
        let [tl, ..] = o.corners();
        // right axis is +Y, up axis is -X
        assert!((tl.x - -1.0).abs() < 1e-5);
        assert!((tl.y - -2.0).abs() < 1e-5);
    }
}
