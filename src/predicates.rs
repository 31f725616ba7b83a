//! UV orientation check and the five pluggable swap predicates
//! (spec.md §4.3, §4.4).
//!
//! A predicate is `(t1, side, t2) -> bool`, with the shared side
//! effect of publishing a scalar to `ts.accum` so the driver can read a
//! per-sweep max/min without threading an extra out-parameter through
//! [`crate::swap::swap_tris`].

use crate::constants::{ANG_TOL, MAX_ANG, PHASE_PLANAR, SIDES};
use crate::geometry::{area2d, dist2, tri_normal, uv_max_angle};
use crate::store::Tessellation;

/// spec.md §4.3: checks that flipping the diagonal of the quad
/// `(t1, side, t2)` to `(i0, i1, i3)` / `(i0, i3, i2)` produces two
/// consistently-oriented sub-triangles, and counts every
/// wrong-orientation incident (including the "already bad" case) into
/// `ts.or_cnt` — this literal, slightly-redundant counting is
/// intentional (spec.md §9 Open Questions: "reproduce the literal
/// behavior").
pub fn check_or(ts: &mut Tessellation, t1: i32, side: usize, t2: i32) -> bool {
    let tri1 = ts.triangle(t1);
    let i0 = tri1.v[side];
    let i1 = tri1.v[SIDES[side][0]];
    let i2 = tri1.v[SIDES[side][1]];
    let tri2 = ts.triangle(t2);
    let sum2: i32 = tri2.v.iter().sum();
    let i3 = sum2 - i1 - i2;

    let uv = |idx: i32| ts.vertex(idx).uv;
    let a1 = area2d(uv(i0), uv(i1), uv(i3));
    let a2 = area2d(uv(i0), uv(i3), uv(i2));

    if a1 * ts.or_uv.sign() <= 0.0 {
        ts.or_cnt += 1;
    }
    a1 * a2 > 0.0 && ts.or_uv.agrees(a1)
}

/// Geometry of the quad around a shared edge, gathered once per
/// predicate call: `i0` is `t1`'s apex, `i1`/`i2` the shared edge
/// endpoints (in `t1`'s winding order), `i3` is `t2`'s apex.
struct SharedEdge {
    i0: i32,
    i1: i32,
    i2: i32,
    i3: i32,
}

fn shared_edge(ts: &Tessellation, t1: i32, side: usize, t2: i32) -> SharedEdge {
    let tri1 = ts.triangle(t1);
    let i0 = tri1.v[side];
    let i1 = tri1.v[SIDES[side][0]];
    let i2 = tri1.v[SIDES[side][1]];
    let tri2 = ts.triangle(t2);
    let sum2: i32 = tri2.v.iter().sum();
    let i3 = sum2 - i1 - i2;
    SharedEdge { i0, i1, i2, i3 }
}

/// `angUV` (spec.md §4.4): swap wins when the worst UV angle among the
/// two *new* triangles, plus `ANGTOL`, is still less than the worst
/// among the current two.
pub fn ang_uv(ts: &mut Tessellation, t1: i32, side: usize, t2: i32) -> bool {
    let e = shared_edge(ts, t1, side, t2);
    let uv = |idx: i32| ts.vertex(idx).uv;

    let current = uv_max_angle(uv(e.i0), uv(e.i1), uv(e.i2), ts.v_over_u)
        .max(uv_max_angle(uv(e.i2), uv(e.i3), uv(e.i1), ts.v_over_u));
    let proposed = uv_max_angle(uv(e.i1), uv(e.i3), uv(e.i0), ts.v_over_u)
        .max(uv_max_angle(uv(e.i0), uv(e.i3), uv(e.i2), ts.v_over_u));

    ts.accum = ts.accum.max(proposed);
    proposed + ANG_TOL < current
}

/// `angXYZ` (spec.md §4.4): the 3D analogue of `angUV`, additionally
/// requiring the post-flip dihedral to be at least `dotnrm`, unless
/// `ts.phase == PHASE_PLANAR`.
pub fn ang_xyz(ts: &mut Tessellation, t1: i32, side: usize, t2: i32) -> bool {
    let e = shared_edge(ts, t1, side, t2);
    let xyz = |idx: i32| ts.vertex(idx).xyz;

    let new_n1 = tri_normal(xyz(e.i1), xyz(e.i3), xyz(e.i0), 0.0);
    let new_n2 = tri_normal(xyz(e.i0), xyz(e.i3), xyz(e.i2), 0.0);
    let (Some(n1), Some(n2)) = (new_n1, new_n2) else {
        return false;
    };
    let dihedral = n1.dot(n2);
    if ts.phase != PHASE_PLANAR && dihedral < ts.dot_nrm {
        return false;
    }

    let current_max = tri_max_corner_angle3d(xyz(e.i0), xyz(e.i1), xyz(e.i2))
        .max(tri_max_corner_angle3d(xyz(e.i2), xyz(e.i3), xyz(e.i1)));
    let proposed_max = tri_max_corner_angle3d(xyz(e.i1), xyz(e.i3), xyz(e.i0))
        .max(tri_max_corner_angle3d(xyz(e.i0), xyz(e.i3), xyz(e.i2)));

    ts.accum = ts.accum.max(proposed_max);
    proposed_max + ANG_TOL < current_max
}

fn tri_max_corner_angle3d(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    use glam::DVec3;
    let corner = |p: [f64; 3], q: [f64; 3], r: [f64; 3]| -> f64 {
        let u = DVec3::from(q) - DVec3::from(p);
        let v = DVec3::from(r) - DVec3::from(p);
        (u.dot(v) / (u.length() * v.length())).clamp(-1.0, 1.0).acos()
    };
    corner(a, b, c).max(corner(b, c, a)).max(corner(c, a, b))
}

/// `area` (spec.md §4.4): repairs an inverted UV quad — swap wins when
/// the current diagonal makes the pair invalid (`a1*a2 <= 0`) but the
/// proposed diagonal makes both sub-triangles valid and consistently
/// oriented.
pub fn area(ts: &mut Tessellation, t1: i32, side: usize, t2: i32) -> bool {
    let e = shared_edge(ts, t1, side, t2);
    let uv = |idx: i32| ts.vertex(idx).uv;
    let sign = ts.or_uv.sign();

    let a1_cur = area2d(uv(e.i0), uv(e.i1), uv(e.i2));
    let a2_cur = area2d(uv(e.i2), uv(e.i3), uv(e.i1));

    let a1_new = area2d(uv(e.i1), uv(e.i3), uv(e.i0));
    let a2_new = area2d(uv(e.i0), uv(e.i3), uv(e.i2));

    a1_cur * a2_cur <= 0.0 && a1_new * sign > 0.0 && a2_new * sign > 0.0
}

/// `diag` (spec.md §4.4): swap wins when the proposed UV max-angle is
/// acceptable and the dihedral strictly improves; publishes the
/// running **minimum** of the worse-of-old/new dihedral, per spec.
pub fn diag(ts: &mut Tessellation, t1: i32, side: usize, t2: i32) -> bool {
    let e = shared_edge(ts, t1, side, t2);
    let uv = |idx: i32| ts.vertex(idx).uv;
    let xyz = |idx: i32| ts.vertex(idx).xyz;

    let proposed_angle = uv_max_angle(uv(e.i1), uv(e.i3), uv(e.i0), ts.v_over_u)
        .max(uv_max_angle(uv(e.i0), uv(e.i3), uv(e.i2), ts.v_over_u));

    let old_n1 = tri_normal(xyz(e.i0), xyz(e.i1), xyz(e.i2), 0.0);
    let old_n2 = tri_normal(xyz(e.i2), xyz(e.i3), xyz(e.i1), 0.0);
    let new_n1 = tri_normal(xyz(e.i1), xyz(e.i3), xyz(e.i0), 0.0);
    let new_n2 = tri_normal(xyz(e.i0), xyz(e.i3), xyz(e.i2), 0.0);

    let (Some(on1), Some(on2), Some(nn1), Some(nn2)) = (old_n1, old_n2, new_n1, new_n2) else {
        return false;
    };
    let dot_before = on1.dot(on2);
    let dot_after = nn1.dot(nn2);

    let worse = dot_before.min(dot_after);
    ts.accum = ts.accum.min(worse);

    proposed_angle <= MAX_ANG && dot_after > dot_before + ANG_TOL
}

/// Orientation check for a proposed swap (the fifth row of spec.md's
/// §4.4 table): the new diagonal must keep both sub-triangles oriented
/// consistently with `orUV`, and the opposite vertex must be a real,
/// in-range index.
pub fn swap_orientation_ok(ts: &mut Tessellation, t1: i32, side: usize, t2: i32) -> bool {
    let e = shared_edge(ts, t1, side, t2);
    if e.i3 < 1 || e.i3 as usize > ts.n_verts() {
        return false;
    }
    check_or(ts, t1, side, t2)
}

/// Re-derives the candidate mark on every side of `tri` that has a
/// positive neighbor, by calling [`check_or`] and updating the
/// neighbor's back-pointer mark symmetrically. Used after any operation
/// that rewrites a triangle's vertices outright — `splitTri`,
/// `splitSide`, and `collapsEdge` (spec.md §4.5's "re-mark" step).
pub fn remark_triangle(ts: &mut Tessellation, tri: i32) {
    for side in 0..3 {
        let neighbor = ts.triangle(tri).n[side];
        if neighbor <= 0 {
            ts.triangle_mut(tri).set_candidate(side, false);
            continue;
        }
        let ok = check_or(ts, tri, side, neighbor);
        ts.triangle_mut(tri).set_candidate(side, ok);
        if let Some(back_side) = ts.triangle(neighbor).side_pointing_to(tri) {
            let ok_back = check_or(ts, neighbor, back_side, tri);
            ts.triangle_mut(neighbor).set_candidate(back_side, ok_back);
        }
    }
}

/// Squared length of the shared edge between `t1`/`side` and `t2`,
/// used by [`crate::candidates::add_side_dist`] to prime the
/// longest-side cache.
pub fn shared_edge_len2(ts: &Tessellation, t1: i32, side: usize) -> f64 {
    let tri = ts.triangle(t1);
    let a = ts.vertex(tri.v[SIDES[side][0]]).xyz;
    let b = ts.vertex(tri.v[SIDES[side][1]]).xyz;
    dist2(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Orientation;
    use crate::store::{Triangle, Vertex};

    fn two_flat_tris() -> Tessellation {
        // A unit square split into two triangles sharing the diagonal
        // (1,2)-(0,2)? We build it so triangle 1 = (1,2,3), triangle 2 = (1,3,4).
        let verts = vec![
            Vertex::node([0.0, 0.0, 0.0], [0.0, 0.0], 0),
            Vertex::node([1.0, 0.0, 0.0], [1.0, 0.0], 1),
            Vertex::node([1.0, 1.0, 0.0], [1.0, 1.0], 2),
            Vertex::node([0.0, 1.0, 0.0], [0.0, 1.0], 3),
        ];
        let tris = vec![
            Triangle::new([1, 2, 3], [2, 0, 0]),
            Triangle::new([1, 3, 4], [0, 0, 1]),
        ];
        Tessellation::new(verts, tris, Vec::new(), Orientation::Positive)
    }

    #[test]
    fn check_or_accepts_consistent_quad() {
        let mut ts = two_flat_tris();
        // t1=1, side=2 (edge v[0],v[1] = verts 1,3) borders t2=2.
        assert!(check_or(&mut ts, 1, 1, 2));
    }

    #[test]
    fn ang_uv_prefers_more_balanced_diagonal_on_skewed_quad() {
        // A skewed quad where the (1,3) diagonal creates a sliver but
        // the (2,4) diagonal would be more balanced.
        let verts = vec![
            Vertex::node([0.0, 0.0, 0.0], [0.0, 0.0], 0),
            Vertex::node([4.0, 0.0, 0.0], [4.0, 0.0], 1),
            Vertex::node([4.0, 1.0, 0.0], [4.0, 1.0], 2),
            Vertex::node([0.0, 1.0, 0.0], [0.0, 1.0], 3),
        ];
        let tris = vec![
            Triangle::new([1, 2, 3], [2, 0, 0]),
            Triangle::new([1, 3, 4], [0, 0, 1]),
        ];
        let mut ts = Tessellation::new(verts, tris, Vec::new(), Orientation::Positive);
        ts.v_over_u = 1.0;
        // side 1 of tri1 is the shared edge (v[2],v[0]) = (3,1).
        let improves = ang_uv(&mut ts, 1, 1, 2);
        assert!(improves);
    }

    #[test]
    fn area_predicate_repairs_inverted_pair() {
        // Build a quad where the current diagonal is inverted
        // (crossed), so a1*a2 <= 0 for the current pair.
        let verts = vec![
            Vertex::node([0.0, 0.0, 0.0], [0.0, 0.0], 0),
            Vertex::node([1.0, 0.0, 0.0], [1.0, 0.0], 1),
            Vertex::node([1.0, 1.0, 0.0], [1.0, 1.0], 2),
            // vertex 4 placed so that triangle (1,3,4) overlaps (1,2,3)
            Vertex::node([0.6, 0.6, 0.0], [0.6, 0.6], 3),
        ];
        let tris = vec![
            Triangle::new([1, 2, 3], [2, 0, 0]),
            Triangle::new([1, 3, 4], [0, 0, 1]),
        ];
        let mut ts = Tessellation::new(verts, tris, Vec::new(), Orientation::Positive);
        // Not asserting the outcome (depends on exact degeneracy), just
        // that evaluating the predicate doesn't panic on a near-degenerate
        // configuration.
        let _ = area(&mut ts, 1, 1, 2);
    }
}
