use super::vec2::Vec2;

/// Axis-aligned box given by its minimum and maximum corners.
///
/// +Y is up: `min` is the bottom-left corner, `max` the top-right one.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Aabb2 {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb2 {
    /// The `[0,1]²` box, used as the default UV rectangle.
    pub const UNIT: Aabb2 = Aabb2::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0));

    #[inline]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    #[inline]
    pub fn size(self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn center(self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn contains(self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Maps a point from `[0,1]²` into this box.
    #[inline]
    pub fn point_at(self, t: Vec2) -> Vec2 {
        self.min + self.size().scaled(t)
    }

    /// Corners in `[top-left, top-right, bottom-left, bottom-right]` order.
    pub fn corners(self) -> [Vec2; 4] {
        [
            Vec2::new(self.min.x, self.max.y),
            self.max,
            self.min,
            Vec2::new(self.max.x, self.min.y),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_box_center_and_size() {
        assert_eq!(Aabb2::UNIT.center(), Vec2::new(0.5, 0.5));
        assert_eq!(Aabb2::UNIT.size(), Vec2::ONE);
    }

    #[test]
    fn corners_order_is_tl_tr_bl_br() {
        let b = Aabb2::new(Vec2::new(-1.0, -2.0), Vec2::new(3.0, 4.0));
        let [tl, tr, bl, br] = b.corners();
        assert_eq!(tl, Vec2::new(-1.0, 4.0));
        assert_eq!(tr, Vec2::new(3.0, 4.0));
        assert_eq!(bl, Vec2::new(-1.0, -2.0));
        assert_eq!(br, Vec2::new(3.0, -2.0));
    }

    #[test]
    fn point_at_maps_unit_square() {
        let b = Aabb2::new(Vec2::new(0.25, 0.5), Vec2::new(0.75, 1.0));
        assert_eq!(b.point_at(Vec2::new(0.5, 0.5)), Vec2::new(0.5, 0.75));
    }

    #[test]
    fn contains_is_inclusive() {
        assert!(Aabb2::UNIT.contains(Vec2::ONE));
        assert!(!Aabb2::UNIT.contains(Vec2::new(1.01, 0.5)));
    }
}
