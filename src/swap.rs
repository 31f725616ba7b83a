//! The edge-flip swap engine (spec.md §4.4): repeatedly sweeps every
//! candidate side, applying a caller-supplied predicate, until a sweep
//! produces no flips or the sweep cap is hit.

use crate::constants::{MAX_SWAP_SWEEPS, PHASE_TO_BE_FILLED, SIDES};
use crate::error::Result;
use crate::face::Face;
use crate::midpoint_hash::MidpointHash;
use crate::store::{CloseState, Tessellation, Triangle};

/// Runs `predicate` to a fixed point over every marked side, flipping
/// the diagonal whenever it returns `true`. `start_accum` seeds
/// `ts.accum` at the top of every sweep (predicates publish into it;
/// the driver reads it back after the final sweep). When
/// `ts.phase == PHASE_TO_BE_FILLED`, a triangle's current cached `mid`
/// is promoted into `hash` immediately before the flip overwrites it,
/// so a later `fillMid` miss can still find the pre-flip value.
///
/// Returns the `accum` produced by one final read-only sweep over the
/// fixed point, for the driver to report.
pub fn swap_tris(
    ts: &mut Tessellation,
    face: &dyn Face,
    predicate: impl Fn(&mut Tessellation, i32, usize, i32) -> bool,
    start_accum: f64,
    mut hash: Option<&mut MidpointHash>,
) -> Result<f64> {
    for t in &mut ts.tris {
        t.hit = 0;
    }

    for _sweep in 0..MAX_SWAP_SWEEPS {
        ts.accum = start_accum;
        for t in &mut ts.tris {
            t.count = 0;
        }

        let n_tris = ts.n_tris() as i32;
        let mut any_swap = false;

        for t1 in 1..=n_tris {
            for side in 0..3 {
                if !ts.triangle(t1).is_candidate(side) {
                    continue;
                }
                let t2 = ts.triangle(t1).n[side];
                if t2 <= t1 {
                    // Boundary side, or the shared edge already visited
                    // from the other triangle this sweep.
                    continue;
                }
                if ts.triangle(t1).hit == 1 && ts.triangle(t2).hit == 1 {
                    continue;
                }

                if !predicate(ts, t1, side, t2) {
                    continue;
                }

                ts.triangle_mut(t1).count += 1;
                ts.triangle_mut(t2).count += 1;

                if ts.phase == PHASE_TO_BE_FILLED {
                    if let Some(h) = hash.as_deref_mut() {
                        promote_mid(ts, h, t1);
                        promote_mid(ts, h, t2);
                    }
                }

                flip(ts, t1, side, t2)?;
                ts.fill_mid(face, t1)?;
                ts.fill_mid(face, t2)?;
                any_swap = true;
            }
        }

        for t in &mut ts.tris {
            if t.count == 0 {
                t.hit = 1;
            }
        }

        if !any_swap {
            break;
        }
    }

    // Final read-only sweep: re-evaluate every still-marked side purely
    // to let the predicate publish its last `accum` value, without
    // performing any further flips.
    ts.accum = start_accum;
    let n_tris = ts.n_tris() as i32;
    for t1 in 1..=n_tris {
        for side in 0..3 {
            if !ts.triangle(t1).is_candidate(side) {
                continue;
            }
            let t2 = ts.triangle(t1).n[side];
            if t2 <= t1 {
                continue;
            }
            predicate(ts, t1, side, t2);
        }
    }

    Ok(ts.accum)
}

fn promote_mid(ts: &Tessellation, hash: &mut MidpointHash, tri_1based: i32) {
    let t = ts.triangle(tri_1based);
    hash.add(
        t.v[0],
        t.v[1],
        t.v[2],
        t.close == CloseState::Close,
        t.mid,
    );
}

/// Rewrites the quad `(t1, side, t2)` across its other diagonal, per
/// spec.md §4.4 "Flip". Labeling `i0` = `t1`'s apex, `i1`/`i2` the
/// shared-edge endpoints in `t1`'s winding order, `i3` = `t2`'s apex:
/// `t1` becomes `(i1, i3, i0)`, `t2` becomes `(i2, i0, i3)`, each
/// picking up the other's outer neighbors on the two sides that aren't
/// the new shared diagonal.
fn flip(ts: &mut Tessellation, t1: i32, side: usize, t2: i32) -> Result<()> {
    let tri1 = *ts.triangle(t1);
    let tri2 = *ts.triangle(t2);

    let i0 = tri1.v[side];
    let i1 = tri1.v[SIDES[side][0]];
    let i2 = tri1.v[SIDES[side][1]];

    let os = tri2.side_pointing_to(t1).ok_or_else(|| {
        crate::error::TessError::IndexError(format!(
            "triangle {t2} has no side pointing back to {t1}"
        ))
    })?;
    let i3 = tri2.v[os];

    // t1's other two neighbors, opposite i1 and i2 respectively.
    let n11 = tri1.n[SIDES[side][0]];
    let n12 = tri1.n[SIDES[side][1]];

    // t2's other two neighbors, located by where i1/i2 actually sit in
    // t2's winding (opposite each, rather than assumed by position).
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

    *ts.triangle_mut(t1) = Triangle::new([i1, i3, i0], [t2, n12, n22]);
    *ts.triangle_mut(t2) = Triangle::new([i2, i0, i3], [t1, n21, n11]);

    // Edge (i1,i3) moves from t2 to t1, and edge (i0,i2) moves from t1
    // to t2, even though neither triangle moves in the array — their
    // outer neighbors on those two edges still point at the old owner.
    ts.repoint_neighbor(n22, t2, t1);
    ts.repoint_neighbor(n11, t1, t2);

    reset_marks_around_flip(ts, t1, t2);

    Ok(())
}

/// Re-derives the candidate marks on the four outer sides touched by a
/// flip, plus the fresh internal diagonal, by re-running `checkOr`
/// (spec.md §4.4: "call `checkOr` ... to reset the candidate mark bits
/// on both sides").
fn reset_marks_around_flip(ts: &mut Tessellation, t1: i32, t2: i32) {
    for &(owner, owner_side) in &[(t1, 1usize), (t1, 2usize), (t2, 1usize), (t2, 2usize)] {
        let neighbor = ts.triangle(owner).n[owner_side];
        if neighbor <= 0 {
            ts.triangle_mut(owner).set_candidate(owner_side, false);
            continue;
        }
        let ok = crate::predicates::check_or(ts, owner, owner_side, neighbor);
        ts.triangle_mut(owner).set_candidate(owner_side, ok);
        if let Some(back_side) = ts.triangle(neighbor).side_pointing_to(owner) {
            let ok_back = crate::predicates::check_or(ts, neighbor, back_side, owner);
            ts.triangle_mut(neighbor).set_candidate(back_side, ok_back);
        }
    }
    ts.triangle_mut(t1).set_candidate(0, true);
    ts.triangle_mut(t2).set_candidate(0, true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Orientation;
    use crate::error::TessError;
    use crate::face::{Evaluation, FaceRange};
    use crate::store::Vertex;

    /// Flat unit-square evaluator: `z = 0` everywhere, so `fillMid`
    /// never hits the extrapolation branch inside this module's tests.
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

    fn skewed_quad() -> Tessellation {
        // Same fixture as predicates::tests::ang_uv_prefers_more_balanced_diagonal_on_skewed_quad:
        // the (1,3) diagonal is a sliver, (2,4) is balanced.
        let verts = vec![
            Vertex::node([0.0, 0.0, 0.0], [0.0, 0.0], 0),
            Vertex::node([4.0, 0.0, 0.0], [4.0, 0.0], 1),
            Vertex::node([4.0, 1.0, 0.0], [4.0, 1.0], 2),
            Vertex::node([0.0, 1.0, 0.0], [0.0, 1.0], 3),
        ];
        let tris = vec![
            // Side 1 is the shared edge (v[2], v[0]) = (3, 1); the other
            // two sides of each triangle are open boundary.
            Triangle::new([1, 2, 3], [0, 2, 0]),
            Triangle::new([1, 3, 4], [0, 0, 1]),
        ];
        let mut ts = Tessellation::new(verts, tris, Vec::new(), Orientation::Positive);
        ts.v_over_u = 1.0;
        ts.mark_all_candidates();
        ts
    }

    #[test]
    fn flip_rewrites_vertices_and_neighbors_of_a_lone_pair() {
        let mut ts = skewed_quad();
        // side 1 of tri1 is the shared edge (v[2],v[0]) = (3,1), neighbor tri2.
        flip(&mut ts, 1, 1, 2).unwrap();
        // New diagonal connects the old apexes (2) and (4): t1 = (2,4,3)-ish
        // up to the (i1,i3,i0) ordering, t2 the complementary half.
        let t1 = ts.triangle(1);
        let t2 = ts.triangle(2);
        let verts1: std::collections::BTreeSet<i32> = t1.v.iter().copied().collect();
        let verts2: std::collections::BTreeSet<i32> = t2.v.iter().copied().collect();
        assert!(verts1.contains(&2) && verts1.contains(&4));
        assert!(verts2.contains(&2) && verts2.contains(&4));
        assert!(t1.n.contains(&2));
        assert!(t2.n.contains(&1));
        ts.check_invariants().unwrap();
    }

    #[test]
    fn swap_tris_converges_and_improves_balance_on_skewed_quad() {
        let mut ts = skewed_quad();
        let face = FlatPlane;
        let accum = swap_tris(&mut ts, &face, crate::predicates::ang_uv, 0.0, None).unwrap();
        assert!(accum.is_finite());
        ts.check_invariants().unwrap();
        // The sliver diagonal should have been flipped away.
        let t1 = ts.triangle(1);
        let t2 = ts.triangle(2);
        let has_23_diag = t1.v.contains(&2) && t1.v.contains(&4) || t2.v.contains(&2) && t2.v.contains(&4);
        assert!(has_23_diag);
    }

    #[test]
    fn swap_tris_with_no_candidates_is_a_no_op() {
        let mut ts = skewed_quad();
        for t in &mut ts.tris {
            t.mark = 0;
        }
        let face = FlatPlane;
        let before = ts.tris.clone();
        swap_tris(&mut ts, &face, crate::predicates::ang_uv, 0.0, None).unwrap();
        assert_eq!(ts.tris, before);
    }

    #[test]
    fn flip_on_nonexistent_back_pointer_errors() {
        let mut ts = skewed_quad();
        ts.triangle_mut(2).n[2] = 0; // sever tri2's back-pointer to tri1
        let err = flip(&mut ts, 1, 1, 2).unwrap_err();
        assert!(matches!(err, TessError::IndexError(_)));
    }
}
