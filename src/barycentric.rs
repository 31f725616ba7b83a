//! Barycentric locator over the frozen frame triangulation, plus
//! `bary_tess` for locating a UV point in the *current*
//! (post-refinement) triangulation.
//!
//! `bary_frame` walks every non-frame vertex once, right after
//! refinement, and records `(frame_tri_index, w0, w1)` so a downstream
//! consumer can reproject the vertex onto a perturbed re-evaluation of
//! the frame without re-running any of the refinement machinery.

use crate::error::{Result, TessError};
use crate::geometry::{in_tri_exact, normalize_weights, Containment};
use crate::store::Tessellation;

/// One vertex's location relative to the frozen `frame`: which frame
/// triangle contains it (1-based), and its first two barycentric
/// weights (the third is `1 - w0 - w1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaryRecord {
    pub frame_tri: i32,
    pub w0: f64,
    pub w1: f64,
}

fn frame_tri_uv(ts: &Tessellation, frame_tri_0based: usize) -> ([f64; 2], [f64; 2], [f64; 2]) {
    let [i0, i1, i2] = ts.frame[frame_tri_0based];
    (ts.vertex(i0).uv, ts.vertex(i1).uv, ts.vertex(i2).uv)
}

/// Populates [`Tessellation::bary`] for every vertex past
/// `n_frame_verts`, locating each one's `uv` in the frozen `frame`.
/// Frame vertices themselves (indices `1..=n_frame_verts`)
/// get no record (`None`): their own `uv` is definitionally their
/// answer and callers outside the frame are the ones that need one.
///
/// When no frame triangle exactly contains a vertex's `uv` (it sits a
/// hair outside due to floating point, or the frame is convex-hull-open
/// at a patch boundary), the frame triangle with the largest minimum
/// weight — the "least-negative" cell — is recorded instead, and the
/// vertex count of this fallback is logged at `warn`.
pub fn bary_frame(ts: &mut Tessellation) -> Result<()> {
    let n_frame_verts = ts.n_frame_verts;
    let n_verts = ts.n_verts();
    let mut records: Vec<Option<BaryRecord>> = vec![None; n_verts];
    let mut fallback_count = 0usize;

    for vi in (n_frame_verts + 1)..=n_verts {
        let uv = ts.vertex(vi as i32).uv;
        let mut best: Option<(usize, [f64; 3], f64)> = None;

        for (fi, _) in ts.frame.iter().enumerate() {
            let (t0, t1, t2) = frame_tri_uv(ts, fi);
            let (containment, mut w) = in_tri_exact(t0, t1, t2, uv);
            if containment == Containment::Degenerate {
                continue;
            }
            normalize_weights(&mut w);
            let min_w = w[0].min(w[1]).min(w[2]);

            if containment == Containment::Inside {
                best = Some((fi, w, min_w));
                break;
            }
            if best.map_or(true, |(_, _, bw)| min_w > bw) {
                best = Some((fi, w, min_w));
            }
        }

        let Some((fi, w, min_w)) = best else {
            return Err(TessError::NotFound(uv[0], uv[1]));
        };
        if min_w < 0.0 {
            fallback_count += 1;
        }
        records[vi - 1] = Some(BaryRecord {
            frame_tri: (fi + 1) as i32,
            w0: w[0],
            w1: w[1],
        });
    }

    if fallback_count > 0 {
        log::warn!(
            "bary_frame: {fallback_count} vertex(es) fell back to their least-negative frame cell"
        );
    }

    ts.bary = records;
    Ok(())
}

/// Locates `uv` in the *current* (post-refinement) triangulation by
/// exhaustive exact-sign scan, returning the 1-based triangle index (or
/// `0` if none contains it) and its barycentric weights. Unlike
/// `bary_frame`, this does not consult the frozen frame — it is meant
/// for ad hoc post-refinement queries against the live mesh.
#[must_use]
pub fn bary_tess(ts: &Tessellation, uv: [f64; 2]) -> (i32, [f64; 3]) {
    for t in 1..=ts.n_tris() as i32 {
        let tri = ts.triangle(t);
        let (t0, t1, t2) = (
            ts.vertex(tri.v[0]).uv,
            ts.vertex(tri.v[1]).uv,
            ts.vertex(tri.v[2]).uv,
        );
        let (containment, mut w) = in_tri_exact(t0, t1, t2, uv);
        if containment == Containment::Inside {
            normalize_weights(&mut w);
            return (t, w);
        }
    }
    (0, [0.0; 3])
}

/// Reconstructs a frame-relative vertex's `uv` from its [`BaryRecord`],
/// for round-trip testing.
#[must_use]
pub fn reconstruct_uv(ts: &Tessellation, record: BaryRecord) -> [f64; 2] {
    let (t0, t1, t2) = frame_tri_uv(ts, (record.frame_tri - 1) as usize);
    let w2 = 1.0 - record.w0 - record.w1;
    [
        record.w0 * t0[0] + record.w1 * t1[0] + w2 * t2[0],
        record.w0 * t0[1] + record.w1 * t1[1] + w2 * t2[1],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Orientation;
    use crate::store::{Triangle, Vertex};

    fn quad_with_centroid() -> Tessellation {
        let verts = vec![
            Vertex::node([0.0, 0.0, 0.0], [0.0, 0.0], 0),
            Vertex::node([1.0, 0.0, 0.0], [1.0, 0.0], 1),
            Vertex::node([1.0, 1.0, 0.0], [1.0, 1.0], 2),
            Vertex::node([0.0, 1.0, 0.0], [0.0, 1.0], 3),
            // non-frame: the centroid of triangle 1 = (1,2,3).
            Vertex::face_interior([2.0 / 3.0, 1.0 / 3.0, 0.0], [2.0 / 3.0, 1.0 / 3.0]),
        ];
        let tris = vec![
            Triangle::new([1, 2, 3], [0, 2, 0]),
            Triangle::new([1, 3, 4], [0, 0, 1]),
        ];
        let mut ts = Tessellation::new(verts, tris, Vec::new(), Orientation::Positive);
        ts.snapshot_frame();
        ts.n_frame_verts = 4;
        ts
    }

    #[test]
    fn bary_frame_locates_interior_vertex_in_its_frame_triangle() {
        let mut ts = quad_with_centroid();
        bary_frame(&mut ts).unwrap();
        let record = ts.bary[4].expect("vertex 5 should have a record");
        assert_eq!(record.frame_tri, 1);
        let w2 = 1.0 - record.w0 - record.w1;
        assert!(w2 > 0.0 && record.w0 > 0.0 && record.w1 > 0.0);
    }

    #[test]
    fn bary_frame_round_trips_uv_within_tolerance() {
        let mut ts = quad_with_centroid();
        bary_frame(&mut ts).unwrap();
        let record = ts.bary[4].unwrap();
        let reconstructed = reconstruct_uv(&ts, record);
        let original = ts.vertex(5).uv;
        assert!((reconstructed[0] - original[0]).abs() < 1e-12);
        assert!((reconstructed[1] - original[1]).abs() < 1e-12);
    }

    #[test]
    fn bary_frame_leaves_frame_vertices_unrecorded() {
        let mut ts = quad_with_centroid();
        bary_frame(&mut ts).unwrap();
        assert!(ts.bary[0].is_none());
        assert!(ts.bary[3].is_none());
    }

    #[test]
    fn bary_tess_locates_point_in_live_triangulation() {
        let ts = quad_with_centroid();
        let (t, w) = bary_tess(&ts, [0.5, 0.2]);
        assert_eq!(t, 1);
        assert!((w[0] + w[1] + w[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn bary_tess_returns_zero_outside_mesh() {
        let ts = quad_with_centroid();
        let (t, _) = bary_tess(&ts, [10.0, 10.0]);
        assert_eq!(t, 0);
    }
}
