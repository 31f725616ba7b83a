//! Point-insertion operations: centroid split, edge-midpoint split, and
//! vertex collapse (spec.md §4.5).
//!
//! All three share the "rewrite a triangle's content in place at its
//! existing id, only append for genuinely new triangles" idiom
//! established by [`crate::swap::swap_tris`]'s flip, so external
//! neighbors never need their *triangle* back-pointers touched unless
//! the edge they border actually changed owners.

use crate::constants::SIDES;
use crate::error::{Result, TessError};
use crate::face::Face;
use crate::geometry::{area2d, dist2};
use crate::predicates::remark_triangle;
use crate::store::{Tessellation, Triangle, Vertex, VertexKind};

fn uv_midpoint(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0]
}

fn xyz_midpoint(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        (a[0] + b[0]) / 2.0,
        (a[1] + b[1]) / 2.0,
        (a[2] + b[2]) / 2.0,
    ]
}

/// `splitTri` (spec.md §4.5): appends a FACE vertex at `(uv, xyz)` in
/// the interior of triangle `t`, replacing it with three children that
/// share the new vertex. Returns the new vertex's 1-based index.
pub fn split_tri(
    ts: &mut Tessellation,
    face: &dyn Face,
    t: i32,
    uv: [f64; 2],
    xyz: [f64; 3],
) -> Result<i32> {
    let tri = *ts.triangle(t);
    let [i0, i1, i2] = tri.v;
    let [n0, n1, n2] = tri.n;

    let node = ts.push_vertex(Vertex::face_interior(xyz, uv));
    let t1 = ts.push_triangle(Triangle::new([0, 0, 0], [0, 0, 0]));
    let t2 = ts.push_triangle(Triangle::new([0, 0, 0], [0, 0, 0]));

    *ts.triangle_mut(t) = Triangle::new([i0, i1, node], [t1, t2, n2]);
    *ts.triangle_mut(t1) = Triangle::new([i1, i2, node], [t2, t, n0]);
    *ts.triangle_mut(t2) = Triangle::new([i2, i0, node], [t, t1, n1]);

    ts.repoint_neighbor(n0, t, t1);
    ts.repoint_neighbor(n1, t, t2);

    ts.fill_mid(face, t)?;
    ts.fill_mid(face, t1)?;
    ts.fill_mid(face, t2)?;

    remark_triangle(ts, t);
    remark_triangle(ts, t1);
    remark_triangle(ts, t2);

    Ok(node)
}

fn sub_tris_valid(uv0: [f64; 2], uv1: [f64; 2], uv2: [f64; 2], uv3: [f64; 2], mid: [f64; 2], sign: f64) -> bool {
    [
        area2d(uv0, uv1, mid),
        area2d(uv1, uv3, mid),
        area2d(uv3, uv2, mid),
        area2d(uv2, uv0, mid),
    ]
    .iter()
    .all(|&a| a * sign > 0.0)
}

/// Computes the candidate midpoint for `splitSide`. When either shared
/// endpoint is an isolated node (a degenerate-face pole), the preferred
/// source is inverse-evaluating the 3D midpoint of the two endpoints
/// rather than the UV midpoint, since UV is meaningless at a pole; that
/// candidate is discarded (falling back to UV-midpoint + forward
/// evaluate) if it would invert any of the four prospective
/// sub-triangles.
fn candidate_midpoint(
    ts: &Tessellation,
    face: &dyn Face,
    v0: Vertex,
    v1: Vertex,
    v2: Vertex,
    v3: Vertex,
    sign: f64,
) -> Result<([f64; 2], [f64; 3])> {
    let _ = ts;
    if v1.is_isolated_node() || v2.is_isolated_node() {
        let xyz_guess = xyz_midpoint(v1.xyz, v2.xyz);
        if let Ok((uv_cand, xyz_proj)) = face.inverse_evaluate(xyz_guess) {
            if sub_tris_valid(v0.uv, v1.uv, v2.uv, v3.uv, uv_cand, sign) {
                return Ok((uv_cand, xyz_proj));
            }
        }
    }
    let uv_mid = uv_midpoint(v1.uv, v2.uv);
    let ev = face.evaluate(uv_mid)?;
    Ok((uv_mid, ev.xyz))
}

/// `splitSide` (spec.md §4.5): splits the shared edge of `(t1, side,
/// t2)` at its midpoint, replacing `t1`/`t2` in place and appending two
/// new triangles at the tail. `side_mid` enables the extra
/// short-sub-segment rejection used when splitting at the true midpoint
/// rather than a heuristic surface point. Returns the new vertex's
/// 1-based index, or [`TessError::RangeError`] if the candidate is
/// rejected by a geometric guard (the caller is expected to move on to
/// the next candidate, not treat this as fatal).
pub fn split_side(
    ts: &mut Tessellation,
    face: &dyn Face,
    t1: i32,
    side: usize,
    t2: i32,
    side_mid: bool,
) -> Result<i32> {
    let tri1 = *ts.triangle(t1);
    let i0 = tri1.v[side];
    let i1 = tri1.v[SIDES[side][0]];
    let i2 = tri1.v[SIDES[side][1]];
    let tri2 = *ts.triangle(t2);
    let os = tri2.side_pointing_to(t1).ok_or_else(|| {
        TessError::IndexError(format!("triangle {t2} has no side pointing back to {t1}"))
    })?;
    let i3 = tri2.v[os];

    let n11 = tri1.n[SIDES[side][0]];
    let n12 = tri1.n[SIDES[side][1]];
    let pos_i1_in_t2 = tri2
        .v
        .iter()
        .position(|&x| x == i1)
        .expect("shared edge endpoint i1 must appear in t2");
    let pos_i2_in_t2 = tri2
        .v
        .iter()
        .position(|&x| x == i2)
        .expect("shared edge endpoint i2 must appear in t2");
    let n21 = tri2.n[pos_i1_in_t2];
    let n22 = tri2.n[pos_i2_in_t2];

    let v0 = *ts.vertex(i0);
    let v1 = *ts.vertex(i1);
    let v2 = *ts.vertex(i2);
    let v3 = *ts.vertex(i3);
    let sign = ts.or_uv.sign();

    let d0 = dist2(v1.xyz, v2.xyz);
    let (uv_mid, xyz_mid) = candidate_midpoint(ts, face, v0, v1, v2, v3, sign)?;

    if side_mid && d0 > 0.0 {
        let d1 = dist2(v1.xyz, xyz_mid);
        let d2 = dist2(xyz_mid, v2.xyz);
        if d1 / d0 < 0.125 || d2 / d0 < 0.125 {
            return Err(TessError::RangeError(
                "splitSide: sub-segment too short relative to the original side".into(),
            ));
        }
    }

    if !sub_tris_valid(v0.uv, v1.uv, v2.uv, v3.uv, uv_mid, sign) {
        return Err(TessError::RangeError(
            "splitSide: candidate midpoint inverts a sub-triangle".into(),
        ));
    }

    let node = ts.push_vertex(Vertex::face_interior(xyz_mid, uv_mid));
    let t3 = ts.push_triangle(Triangle::new([0, 0, 0], [0, 0, 0]));
    let t4 = ts.push_triangle(Triangle::new([0, 0, 0], [0, 0, 0]));

    *ts.triangle_mut(t1) = Triangle::new([i0, i1, node], [t2, t3, n12]);
    *ts.triangle_mut(t2) = Triangle::new([i1, i3, node], [t4, t1, n22]);
    *ts.triangle_mut(t3) = Triangle::new([i2, i0, node], [t1, t4, n11]);
    *ts.triangle_mut(t4) = Triangle::new([i3, i2, node], [t3, t2, n21]);

    ts.repoint_neighbor(n11, t1, t3);
    ts.repoint_neighbor(n21, t2, t4);

    ts.fill_mid(face, t1)?;
    ts.fill_mid(face, t2)?;
    ts.fill_mid(face, t3)?;
    ts.fill_mid(face, t4)?;

    remark_triangle(ts, t1);
    remark_triangle(ts, t2);
    remark_triangle(ts, t3);
    remark_triangle(ts, t4);

    Ok(node)
}

fn cross_wire(ts: &mut Tessellation, victim: i32, nbr1: i32, nbr2: i32) {
    if nbr1 > 0 {
        if let Some(s) = ts.triangle(nbr1).side_pointing_to(victim) {
            ts.triangle_mut(nbr1).n[s] = nbr2;
        }
    }
    if nbr2 > 0 {
        if let Some(s) = ts.triangle(nbr2).side_pointing_to(victim) {
            ts.triangle_mut(nbr2).n[s] = nbr1;
        }
    }
}

/// Removes triangle `victim` by swapping it with the current tail
/// triangle and popping, rewriting every neighbor reference to the
/// displaced triangle's old id. Returns the id the tail triangle held
/// before the swap, so a caller removing a second triangle can detect
/// whether that one was the one just displaced.
fn remove_triangle(ts: &mut Tessellation, victim: i32) -> i32 {
    let last = ts.n_tris() as i32;
    if victim != last {
        ts.tris.swap((victim - 1) as usize, (last - 1) as usize);
        ts.rewrite_triangle_id_everywhere(last, victim);
    }
    ts.tris.pop();
    last
}

fn remove_two_triangles(ts: &mut Tessellation, a: i32, b: i32) {
    let (hi, lo) = if a > b { (a, b) } else { (b, a) };
    let displaced = remove_triangle(ts, hi);
    let lo = if lo == displaced { hi } else { lo };
    remove_triangle(ts, lo);
}

/// `collapsEdge` (spec.md §4.5): removes `node` (which must be a FACE
/// vertex unless `flag` is set, e.g. for the zero-area-cleanup caller)
/// along with the two triangles bordering `(node, tnode)`, merging
/// `node` into `tnode`. Vertex and triangle indices above the removed
/// ones shift down by one/two respectively — any external caller
/// holding on to an index across a collapse must treat it as
/// invalidated (spec.md §9 "Vertex-index stability").
pub fn collaps_edge(ts: &mut Tessellation, face: &dyn Face, node: i32, tnode: i32, flag: bool) -> Result<()> {
    if !flag && ts.vertex(node).kind != VertexKind::FaceInterior {
        return Err(TessError::Degenerate(format!(
            "collapsEdge: vertex {node} is not a FACE vertex"
        )));
    }

    let n_tris = ts.n_tris() as i32;
    let touching_node: Vec<i32> = (1..=n_tris)
        .filter(|&t| ts.triangle(t).v.contains(&node))
        .collect();
    let victims: Vec<i32> = touching_node
        .into_iter()
        .filter(|&t| ts.triangle(t).v.contains(&tnode))
        .collect();
    if victims.len() != 2 {
        return Err(TessError::Degenerate(format!(
            "collapsEdge: expected exactly 2 triangles sharing ({node}, {tnode}), found {}",
            victims.len()
        )));
    }
    let (victim_a, victim_b) = (victims[0], victims[1]);

    for &victim in &[victim_a, victim_b] {
        let other = if victim == victim_a { victim_b } else { victim_a };
        let side_to_other = ts.triangle(victim).side_pointing_to(other).ok_or_else(|| {
            TessError::IndexError(format!("triangle {victim} does not neighbor {other}"))
        })?;
        let outer: Vec<usize> = (0..3).filter(|&s| s != side_to_other).collect();
        let (nbr1, nbr2) = (
            ts.triangle(victim).n[outer[0]],
            ts.triangle(victim).n[outer[1]],
        );
        cross_wire(ts, victim, nbr1, nbr2);
    }

    remove_two_triangles(ts, victim_a, victim_b);

    // Every other triangle that still references `node` now merges onto
    // `tnode` directly; only the two victims actually disappear.
    let still_touching_node: Vec<i32> = (1..=ts.n_tris() as i32)
        .filter(|&t| ts.triangle(t).v.contains(&node))
        .collect();
    for t in still_touching_node {
        for slot in &mut ts.triangle_mut(t).v {
            if *slot == node {
                *slot = tnode;
            }
        }
    }

    let last_vert = ts.n_verts() as i32;
    let new_tnode = if node != last_vert {
        ts.verts.swap((node - 1) as usize, (last_vert - 1) as usize);
        for t in &mut ts.tris {
            for slot in &mut t.v {
                if *slot == node {
                    *slot = last_vert;
                } else if *slot == last_vert {
                    *slot = node;
                }
            }
        }
        if tnode == last_vert {
            node
        } else {
            tnode
        }
    } else {
        tnode
    };
    ts.verts.pop();

    let affected: Vec<i32> = (1..=ts.n_tris() as i32)
        .filter(|&t| ts.triangle(t).v.contains(&new_tnode))
        .collect();
    for t in affected {
        ts.fill_mid(face, t)?;
        remark_triangle(ts, t);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Orientation;
    use crate::error::TessError as E;
    use crate::face::{Evaluation, FaceRange};

    struct FlatPlane;
    impl Face for FlatPlane {
        fn evaluate(&self, uv: [f64; 2]) -> Result<Evaluation> {
            Ok(Evaluation {
                xyz: [uv[0], uv[1], 0.0],
                du: [1.0, 0.0, 0.0],
                dv: [0.0, 1.0, 0.0],
                duu: [0.0; 3],
                duv: [0.0; 3],
                dvv: [0.0; 3],
            })
        }
        fn inverse_evaluate(&self, xyz: [f64; 3]) -> Result<([f64; 2], [f64; 3])> {
            Ok(([xyz[0], xyz[1]], xyz))
        }
        fn range(&self) -> FaceRange {
            FaceRange {
                u_min: -10.0,
                u_max: 10.0,
                v_min: -10.0,
                v_max: 10.0,
                periodic: false,
            }
        }
        fn same_thread(&self) -> bool {
            true
        }
    }

    fn quad() -> Tessellation {
        let verts = vec![
            Vertex::node([0.0, 0.0, 0.0], [0.0, 0.0], 0),
            Vertex::node([1.0, 0.0, 0.0], [1.0, 0.0], 1),
            Vertex::node([1.0, 1.0, 0.0], [1.0, 1.0], 2),
            Vertex::node([0.0, 1.0, 0.0], [0.0, 1.0], 3),
        ];
        let tris = vec![
            Triangle::new([1, 2, 3], [0, 2, 0]),
            Triangle::new([1, 3, 4], [0, 0, 1]),
        ];
        let mut ts = Tessellation::new(verts, tris, Vec::new(), Orientation::Positive);
        ts.mark_all_candidates();
        ts
    }

    #[test]
    fn split_tri_adds_a_vertex_and_two_triangles() {
        let mut ts = quad();
        let face = FlatPlane;
        let node = split_tri(&mut ts, &face, 1, [0.6, 0.2], [0.6, 0.2, 0.0]).unwrap();
        assert_eq!(node, 5);
        assert_eq!(ts.n_verts(), 5);
        assert_eq!(ts.n_tris(), 4);
        ts.check_invariants().unwrap();
    }

    #[test]
    fn split_side_adds_a_vertex_and_two_triangles() {
        let mut ts = quad();
        let face = FlatPlane;
        let node = split_side(&mut ts, &face, 1, 1, 2, false).unwrap();
        assert_eq!(node, 5);
        assert_eq!(ts.n_verts(), 5);
        assert_eq!(ts.n_tris(), 4);
        ts.check_invariants().unwrap();
        // midpoint of the shared diagonal (0,0)-(1,1) is (0.5,0.5).
        assert!((ts.vertex(5).uv[0] - 0.5).abs() < 1e-12);
        assert!((ts.vertex(5).uv[1] - 0.5).abs() < 1e-12);
    }

    /// Evaluator that always returns a fixed point near one endpoint of
    /// the shared edge, regardless of the UV it's asked to evaluate —
    /// enough to make the forward-evaluated "midpoint" land far from
    /// the geometric middle of the segment, so the `side_mid` ratio
    /// guard has something to reject.
    struct SkewedNearOneEnd;
    impl Face for SkewedNearOneEnd {
        fn evaluate(&self, _uv: [f64; 2]) -> Result<Evaluation> {
            Ok(Evaluation {
                xyz: [0.95, 0.95, 0.0],
                du: [1.0, 0.0, 0.0],
                dv: [0.0, 1.0, 0.0],
                duu: [0.0; 3],
                duv: [0.0; 3],
                dvv: [0.0; 3],
            })
        }
        fn inverse_evaluate(&self, xyz: [f64; 3]) -> Result<([f64; 2], [f64; 3])> {
            Ok(([xyz[0], xyz[1]], xyz))
        }
        fn range(&self) -> FaceRange {
            FaceRange {
                u_min: -10.0,
                u_max: 10.0,
                v_min: -10.0,
                v_max: 10.0,
                periodic: false,
            }
        }
        fn same_thread(&self) -> bool {
            true
        }
    }

    #[test]
    fn split_side_rejects_overly_short_sub_segment() {
        let mut ts = quad();
        let face = SkewedNearOneEnd;
        // Shared edge is (vertex 3, vertex 1) at xyz (1,1,0)-(0,0,0); the
        // evaluator's fixed (0.95,0.95,0) response lands far closer to
        // vertex 3 than an honest midpoint would.
        let err = split_side(&mut ts, &face, 1, 1, 2, true).unwrap_err();
        assert!(matches!(err, E::RangeError(_)));
    }

    #[test]
    fn split_tri_then_collapse_restores_original_vertex_count() {
        let mut ts = quad();
        let face = FlatPlane;
        let node = split_tri(&mut ts, &face, 1, [0.6, 0.2], [0.6, 0.2, 0.0]).unwrap();
        assert_eq!(ts.n_verts(), 5);
        assert_eq!(ts.n_tris(), 4);
        collaps_edge(&mut ts, &face, node, 1, false).unwrap();
        assert_eq!(ts.n_verts(), 4);
        assert_eq!(ts.n_tris(), 2);
        ts.check_invariants().unwrap();
    }

    #[test]
    fn collapse_rejects_non_face_vertex_without_flag() {
        let mut ts = quad();
        let face = FlatPlane;
        let err = collaps_edge(&mut ts, &face, 1, 2, false).unwrap_err();
        assert!(matches!(err, E::Degenerate(_)));
    }
}
