//! Shape builders appending to a [`Mesh`].
//!
//! Quads take corners in `[top-left, top-right, bottom-left, bottom-right]`
//! order and are split into triangles `(0,2,1)` and `(1,2,3)`, which is
//! counter-clockwise in a +Y-up world. Every builder copies the mesh's brush
//! color into the new vertices and marks both dirty flags.

use std::f32::consts::TAU;

use crate::coords::{Aabb2, Obb2, Vec2, Vec3};

use super::buffer::IndexT;
use super::mesh::Mesh;
use super::vertex::SuperVertex;

/// UVs of a whole texture in corner order.
pub const DEFAULT_QUAD_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
];

const QUAD_TRIANGLES: [[usize; 3]; 2] = [[0, 2, 1], [1, 2, 3]];

/// Converts a vertex position in `verts` to an index.
///
/// # Panics
/// When the position does not fit the index type (above 65535 with
/// `index-u16`).
fn vertex_index(position: usize) -> IndexT {
    match IndexT::try_from(position) {
        Ok(index) => index,
        Err(_) => panic!(
            "vertex {position} does not fit in a {}-bit index; split the mesh",
            IndexT::BITS
        ),
    }
}

/// Appends one brush-colored vertex and returns its index.
///
/// # Panics
/// When the new vertex cannot be addressed by the index type.
pub fn add_vertex(mesh: &mut Mesh, position: Vec3, uv: Vec2) -> IndexT {
    let index = vertex_index(mesh.verts.len());
    mesh.verts.push(SuperVertex {
        position,
        uv,
        ..mesh.builder_brush
    });
    mesh.vertex_dirty = true;
    index
}

/// Appends one triangle. Out-of-range indices are reported in debug builds
/// and appended anyway.
pub fn add_triangle_indices(mesh: &mut Mesh, a: IndexT, b: IndexT, c: IndexT) {
    if cfg!(debug_assertions) {
        let count = mesh.verts.len();
        for i in [a, b, c] {
            if i as usize >= count {
                log::warn!("triangle index {i} out of range ({count} vertices)");
            }
        }
    }
    mesh.indices.extend_from_slice(&[a, b, c]);
    mesh.indices_dirty = true;
}

/// Appends `points` and the given triangles over them. Non-indexed meshes
/// get the triangles expanded into vertices.
fn add_triangles(mesh: &mut Mesh, points: &[(Vec2, Vec2)], triangles: &[[usize; 3]]) {
    if mesh.is_indexed() {
        let base = mesh.verts.len();
        for &(pos, uv) in points {
            add_vertex(mesh, pos.into(), uv);
        }
        for tri in triangles {
            add_triangle_indices(
                mesh,
                vertex_index(base + tri[0]),
                vertex_index(base + tri[1]),
                vertex_index(base + tri[2]),
            );
        }
    } else {
        for tri in triangles {
            for &corner in tri {
                let (pos, uv) = points[corner];
                add_vertex(mesh, pos.into(), uv);
            }
        }
    }
    mesh.mark_dirty();
}

fn add_quad(mesh: &mut Mesh, corners: [Vec2; 4], uvs: [Vec2; 4]) {
    let points: [(Vec2, Vec2); 4] = std::array::from_fn(|i| (corners[i], uvs[i]));
    add_triangles(mesh, &points, &QUAD_TRIANGLES);
}

/// Oriented box. `uvs` are in corner order; `None` maps the whole texture.
pub fn add_obb2(mesh: &mut Mesh, obb: &Obb2, uvs: Option<[Vec2; 4]>) {
    add_quad(mesh, obb.corners(), uvs.unwrap_or(DEFAULT_QUAD_UVS));
}

/// Axis-aligned box. `uvs` are in corner order; `None` maps the whole texture.
pub fn add_aabb2(mesh: &mut Mesh, aabb: &Aabb2, uvs: Option<[Vec2; 4]>) {
    add_quad(mesh, aabb.corners(), uvs.unwrap_or(DEFAULT_QUAD_UVS));
}

/// Point on the unit circle mapped into `uv_box`, +V pointing down.
fn circle_uv(uv_box: &Aabb2, dir: Vec2, scale: f32) -> Vec2 {
    uv_box.point_at(Vec2::new(0.5 + 0.5 * dir.x * scale, 0.5 - 0.5 * dir.y * scale))
}

/// Filled disk: a center vertex fanned to `slices` ring points. The circle's
/// bounding square maps onto `uv_box` with +V pointing down, so the top of
/// the disk samples the top edge of `uv_box`.
pub fn add_disk(mesh: &mut Mesh, center: Vec2, radius: f32, slices: u32, uv_box: &Aabb2) {
    if slices < 3 {
        log::warn!("add_disk: {slices} slices cannot form a disk");
        return;
    }
    let slices = slices as usize;

    let mut points = Vec::with_capacity(slices + 1);
    points.push((center, uv_box.center()));
    for i in 0..slices {
        let dir = Vec2::from_angle(i as f32 / slices as f32 * TAU);
        points.push((center + dir * radius, circle_uv(uv_box, dir, 1.0)));
    }

    let triangles: Vec<[usize; 3]> = (1..=slices)
        .map(|i| [0, i, if i == slices { 1 } else { i + 1 }])
        .collect();

    add_triangles(mesh, &points, &triangles);
}

/// Annulus between `inner` and `outer` radii, split into `slices` segments.
pub fn add_ring(
    mesh: &mut Mesh,
    center: Vec2,
    inner: f32,
    outer: f32,
    slices: u32,
    uv_box: &Aabb2,
) {
    if slices < 3 || outer <= 0.0 {
        log::warn!("add_ring: degenerate ring ({slices} slices, outer radius {outer})");
        return;
    }
    let slices = slices as usize;
    let inner_scale = inner / outer;

    // Even points are on the outer edge, odd points on the inner one.
    let mut points = Vec::with_capacity(slices * 2);
    for i in 0..slices {
        let dir = Vec2::from_angle(i as f32 / slices as f32 * TAU);
        points.push((center + dir * outer, circle_uv(uv_box, dir, 1.0)));
        points.push((center + dir * inner, circle_uv(uv_box, dir, inner_scale)));
    }

    let mut triangles = Vec::with_capacity(slices * 2);
    for i in 0..slices {
        let next = (i + 1) % slices;
        let (o, n_o) = (2 * i, 2 * next);
        let (ii, n_i) = (2 * i + 1, 2 * next + 1);
        triangles.push([o, n_o, ii]);
        triangles.push([ii, n_o, n_i]);
    }

    add_triangles(mesh, &points, &triangles);
}

/// Thick segment from `from` to `to`.
pub fn add_line2(mesh: &mut Mesh, from: Vec2, to: Vec2, thickness: f32) {
    let delta = to - from;
    let length = delta.length();
    if length <= 0.0 {
        return;
    }
    let obb = Obb2::new(
        (from + to) * 0.5,
        delta,
        Vec2::new(length * 0.5, thickness * 0.5),
    );
    add_obb2(mesh, &obb, None);
}

/// `x_step × y_step` quads tiling the box from `bottom_left` to `top_right`.
/// The whole grid maps once onto the texture.
pub fn add_grid2(mesh: &mut Mesh, bottom_left: Vec2, top_right: Vec2, x_step: u32, y_step: u32) {
    if x_step == 0 || y_step == 0 {
        return;
    }
    let area = Aabb2::new(bottom_left, top_right);
    let (xs, ys) = (x_step as f32, y_step as f32);

    for y in 0..y_step {
        for x in 0..x_step {
            let (fx, fy) = (x as f32, y as f32);
            let cell = Aabb2::new(
                area.point_at(Vec2::new(fx / xs, fy / ys)),
                area.point_at(Vec2::new((fx + 1.0) / xs, (fy + 1.0) / ys)),
            );
            let (u0, u1) = (fx / xs, (fx + 1.0) / xs);
            let (v_top, v_bottom) = (1.0 - (fy + 1.0) / ys, 1.0 - fy / ys);
            let uvs = [
                Vec2::new(u0, v_top),
                Vec2::new(u1, v_top),
                Vec2::new(u0, v_bottom),
                Vec2::new(u1, v_bottom),
            ];
            add_aabb2(mesh, &cell, Some(uvs));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Rgba;

    fn signed_area(mesh: &Mesh, tri: &[IndexT]) -> f32 {
        let p = |i: IndexT| mesh.verts[i as usize].position.xy();
        let (a, b, c) = (p(tri[0]), p(tri[1]), p(tri[2]));
        let (ab, ac) = (b - a, c - a);
        ab.x * ac.y - ab.y * ac.x
    }

    // ── quads ─────────────────────────────────────────────────────────────

    #[test]
    fn aabb_appends_four_vertices_and_two_triangles() {
        let mut m = Mesh::new();
        add_aabb2(&mut m, &Aabb2::UNIT, None);
        assert_eq!(m.vertex_count(), 4);
        assert_eq!(m.indices, vec![0, 2, 1, 1, 2, 3]);
        assert!(m.is_vertex_dirty() && m.is_indices_dirty());
    }

    #[test]
    fn aabb_uses_default_uvs_in_corner_order() {
        let mut m = Mesh::new();
        add_aabb2(&mut m, &Aabb2::UNIT, None);
        let uvs: Vec<Vec2> = m.verts.iter().map(|v| v.uv).collect();
        assert_eq!(uvs, DEFAULT_QUAD_UVS.to_vec());
    }

    #[test]
    fn quads_wind_counter_clockwise() {
        let mut m = Mesh::new();
        add_obb2(&mut m, &Obb2::rotated(Vec2::ZERO, Vec2::new(2.0, 1.0), 0.7), None);
        for tri in m.indices.chunks(3) {
            assert!(signed_area(&m, tri) > 0.0);
        }
    }

    #[test]
    fn quad_indices_come_in_sixes_within_vertex_range() {
        let boxes = [
            Aabb2::UNIT,
            Aabb2::new(Vec2::new(-3.0, -1.0), Vec2::new(2.0, 5.0)),
            Aabb2::from_center(Vec2::new(10.0, -4.0), Vec2::new(0.25, 7.0)),
        ];
        let mut m = Mesh::new();
        for (n, aabb) in boxes.iter().cycle().take(7).enumerate() {
            add_aabb2(&mut m, aabb, None);
            assert_eq!(m.index_count(), (n + 1) * 6);
            assert_eq!(m.index_count() % 6, 0);
            assert!(m.indices.iter().all(|&i| (i as usize) < m.vertex_count()));
        }
    }

    #[test]
    fn second_quad_offsets_indices() {
        let mut m = Mesh::new();
        add_aabb2(&mut m, &Aabb2::UNIT, None);
        add_aabb2(&mut m, &Aabb2::UNIT, None);
        assert_eq!(&m.indices[6..], &[4, 6, 5, 5, 6, 7]);
    }

    #[test]
    fn vertices_inherit_brush_color() {
        let mut m = Mesh::new();
        m.builder_brush.color = Rgba::RED;
        add_aabb2(&mut m, &Aabb2::UNIT, None);
        assert!(m.verts.iter().all(|v| v.color == Rgba::RED));
    }

    #[test]
    fn non_indexed_mesh_expands_triangles() {
        let mut m = Mesh::new();
        m.set_indexed(false);
        add_aabb2(&mut m, &Aabb2::UNIT, None);
        assert_eq!(m.vertex_count(), 6);
        assert!(m.indices.is_empty());
    }

    // ── round shapes ──────────────────────────────────────────────────────

    #[test]
    fn disk_fans_from_center_and_wraps() {
        let mut m = Mesh::new();
        add_disk(&mut m, Vec2::ZERO, 1.0, 8, &Aabb2::UNIT);
        assert_eq!(m.vertex_count(), 9);
        assert_eq!(m.index_count(), 8 * 3);
        assert_eq!(&m.indices[m.index_count() - 3..], &[0, 8, 1]);
        assert_eq!(m.verts[0].uv, Vec2::new(0.5, 0.5));
        for tri in m.indices.chunks(3) {
            assert!(signed_area(&m, tri) > 0.0);
        }
    }

    #[test]
    fn disk_uv_stays_inside_uv_box() {
        let uv_box = Aabb2::new(Vec2::new(0.5, 0.0), Vec2::new(1.0, 0.5));
        let mut m = Mesh::new();
        add_disk(&mut m, Vec2::ZERO, 3.0, 16, &uv_box);
        for v in &m.verts {
            assert!(v.uv.x >= 0.5 - 1e-6 && v.uv.x <= 1.0 + 1e-6);
            assert!(v.uv.y >= -1e-6 && v.uv.y <= 0.5 + 1e-6);
        }
    }

    #[test]
    fn degenerate_disk_adds_nothing() {
        let mut m = Mesh::new();
        add_disk(&mut m, Vec2::ZERO, 1.0, 2, &Aabb2::UNIT);
        assert_eq!(m.vertex_count(), 0);
    }

    #[test]
    fn ring_triangles_are_counter_clockwise() {
        let mut m = Mesh::new();
        add_ring(&mut m, Vec2::new(1.0, 1.0), 0.5, 1.0, 12, &Aabb2::UNIT);
        assert_eq!(m.vertex_count(), 24);
        assert_eq!(m.index_count(), 12 * 6);
        for tri in m.indices.chunks(3) {
            assert!(signed_area(&m, tri) > 0.0);
        }
    }

    // ── lines and grids ───────────────────────────────────────────────────

    #[test]
    fn line_has_requested_thickness() {
        let mut m = Mesh::new();
        add_line2(&mut m, Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0), 2.0);
        let tl = m.verts[0].position;
        let bl = m.verts[2].position;
        assert!((tl.y - 1.0).abs() < 1e-5);
        assert!((bl.y + 1.0).abs() < 1e-5);
        assert!((tl.x - 0.0).abs() < 1e-5);
    }

    #[test]
    fn zero_length_line_is_skipped() {
        let mut m = Mesh::new();
        add_line2(&mut m, Vec2::ONE, Vec2::ONE, 1.0);
        assert_eq!(m.vertex_count(), 0);
    }

    #[test]
    fn grid_tiles_cells() {
        let mut m = Mesh::new();
        add_grid2(&mut m, Vec2::ZERO, Vec2::new(4.0, 2.0), 4, 2);
        assert_eq!(m.vertex_count(), 4 * 2 * 4);
        assert_eq!(m.index_count(), 4 * 2 * 6);
        // first cell is the bottom-left one and samples the bottom-left of the texture
        assert_eq!(m.verts[2].position, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(m.verts[2].uv, Vec2::new(0.0, 1.0));
    }

    // ── index width ───────────────────────────────────────────────────────

    #[cfg(not(feature = "index-u16"))]
    #[test]
    fn wide_indices_address_past_u16() {
        let mut m = Mesh::new();
        m.verts.resize(65_536, SuperVertex::default());
        assert_eq!(add_vertex(&mut m, Vec3::ZERO, Vec2::ZERO), 65_536);
    }

    #[cfg(feature = "index-u16")]
    #[test]
    #[should_panic(expected = "does not fit in a 16-bit index")]
    fn narrow_indices_reject_vertex_65536() {
        let mut m = Mesh::new();
        m.verts.resize(65_536, SuperVertex::default());
        add_vertex(&mut m, Vec3::ZERO, Vec2::ZERO);
    }

    #[cfg(feature = "index-u16")]
    #[test]
    #[should_panic(expected = "does not fit in a 16-bit index")]
    fn narrow_indices_reject_quad_past_limit() {
        let mut m = Mesh::new();
        m.verts.resize(65_534, SuperVertex::default());
        add_aabb2(&mut m, &Aabb2::UNIT, None);
    }

    #[test]
    fn out_of_range_triangle_is_still_appended() {
        let mut m = Mesh::new();
        add_triangle_indices(&mut m, 0, 1, 7);
        assert_eq!(m.indices, vec![0, 1, 7]);
        assert!(m.is_indices_dirty());
    }
}
