//! The refinement driver: a single entry point, [`tessellate`], that
//! runs a fixed phase sequence over a [`Tessellation`] — alternating
//! candidate-selection (insertion) with the swap engine, in a fixed
//! order, until the mesh satisfies chord, normal-agreement, and
//! max-edge-length tolerances (or a cap fires).

use glam::DVec3;

use crate::barycentric::bary_frame;
use crate::candidates::{add_facet_dist, add_facet_norm, add_side_dist, break_tri, split_inter};
use crate::cleanup::{validate_quad_override, zero_area_cleanup};
use crate::constants::{CHUNK, MAX_ANG, MAX_OR_CNT, PHASE_NORMAL, PHASE_PLANAR, PHASE_TO_BE_FILLED};
use crate::error::{Result, TessError};
use crate::face::{require_same_thread, Face};
use crate::geometry::{area2d, dist2, tri_normal};
use crate::midpoint_hash::MidpointHash;
use crate::predicates::{ang_uv, ang_xyz, diag};
use crate::store::{CloseState, Tessellation};
use crate::swap::swap_tris;

/// Runs the full refinement pipeline over `ts`, driven by `face`.
/// `t_id` is an opaque caller identifier (the owning face's tessellation
/// id) used only for log correlation — the engine itself is agnostic to
/// it.
///
/// Guards entry with [`Face::same_thread`], then:
/// initializes the scalar tolerances from the boundary loop, marks
/// every interior edge a swap candidate, snapshots the frame, runs
/// either the planar or general phase sequence, and finishes with
/// zero-area cleanup, the quad-override sanity check, and the
/// frame-relative barycentric locator.
pub fn tessellate(face: &dyn Face, ts: &mut Tessellation, t_id: i32) -> Result<()> {
    require_same_thread(face)?;
    let out_level = face.out_level();
    if out_level > 0 {
        log::trace!("tessellate[{t_id}]: n_verts={} n_tris={}", ts.n_verts(), ts.n_tris());
    }
    log::debug!("tessellate[{t_id}]: starting");

    initialize(ts, face)?;
    ts.mark_all_candidates();
    ts.snapshot_frame();

    if ts.planar {
        log::debug!("tessellate[{t_id}]: planar branch");
        run_planar(ts, face)?;
    } else {
        log::debug!("tessellate[{t_id}]: general branch");
        run_general(ts, face, t_id)?;
    }

    if ts.or_cnt >= MAX_OR_CNT {
        log::warn!(
            "tessellate[{t_id}]: or_cnt={} crossed MAXORCNT, further insertion was aborted",
            ts.or_cnt
        );
    }

    zero_area_cleanup(ts, face)?;
    validate_quad_override(ts)?;
    bary_frame(ts)?;

    #[cfg(debug_assertions)]
    ts.check_invariants()?;

    log::info!(
        "tessellate[{t_id}]: done, n_verts={} n_tris={} or_cnt={}",
        ts.n_verts(),
        ts.n_tris(),
        ts.or_cnt
    );
    Ok(())
}

/// Derives `devia2`, `eps2`, `edist2`, and `v_over_u` from the boundary
/// loop already present in `ts` before any refinement has run (every
/// vertex at this point is boundary `Node`/`EdgeInterior`, the initial
/// constrained triangulation's own output).
fn initialize(ts: &mut Tessellation, face: &dyn Face) -> Result<()> {
    let mut devia2 = 0.0f64;
    let mut sum_du = 0.0f64;
    let mut sum_dv = 0.0f64;

    for vi in 1..=ts.n_verts() as i32 {
        let v = *ts.vertex(vi);
        match face.evaluate(v.uv) {
            Ok(ev) => {
                devia2 = devia2.max(dist2(ev.xyz, v.xyz));
                sum_du += DVec3::from(ev.du).length();
                sum_dv += DVec3::from(ev.dv).length();
            }
            Err(TessError::Extrapolation(u, vv)) => {
                log::warn!("initialize: boundary vertex evaluator extrapolated at ({u}, {vv})");
            }
            Err(e) => return Err(e),
        }
    }
    ts.v_over_u = if sum_du > 0.0 { sum_dv / sum_du } else { 1.0 };

    let mut sum_len2 = 0.0f64;
    let mut min_len2 = f64::INFINITY;
    for seg in &ts.segs {
        let a = ts.vertex(seg.v[0]).xyz;
        let b = ts.vertex(seg.v[1]).xyz;
        let len2 = dist2(a, b);
        sum_len2 += len2;
        min_len2 = min_len2.min(len2);
    }
    let edist2 = if ts.segs.is_empty() { 0.0 } else { sum_len2 / ts.segs.len() as f64 };
    let mut eps2 = if ts.segs.is_empty() { 0.0 } else { min_len2 / 4.0 };

    // Scaled down by a fixed 256 rather than driven off any sampled
    // quantity, so a single outlier evaluation near a seam can't blow
    // up the deviation floor for the entire boundary.
    devia2 /= 256.0;

    let minlen2 = ts.min_len * ts.min_len;
    eps2 = eps2.max(devia2).max(minlen2);
    devia2 = devia2.max(minlen2);

    ts.devia2 = devia2;
    ts.eps2 = eps2;
    ts.edist2 = edist2;
    Ok(())
}

/// Count of triangles whose signed UV area disagrees with `ts.or_uv`;
/// used by the `bad_start` detection below and the planar-branch
/// "produced inversions" heuristic.
fn count_bad_orientation(ts: &Tessellation) -> usize {
    (1..=ts.n_tris() as i32)
        .filter(|&t| {
            let tri = ts.triangle(t);
            let uv0 = ts.vertex(tri.v[0]).uv;
            let uv1 = ts.vertex(tri.v[1]).uv;
            let uv2 = ts.vertex(tri.v[2]).uv;
            !ts.or_uv.agrees(area2d(uv0, uv1, uv2))
        })
        .count()
}

/// Per-vertex unit normal, averaged from every incident triangle's
/// facet normal.
fn compute_vertex_normals(ts: &Tessellation) -> Vec<DVec3> {
    let mut acc = vec![DVec3::ZERO; ts.n_verts()];
    for t in 1..=ts.n_tris() as i32 {
        let tri = ts.triangle(t);
        let xyz = |i: i32| ts.vertex(i).xyz;
        if let Some(n) = tri_normal(xyz(tri.v[0]), xyz(tri.v[1]), xyz(tri.v[2]), 0.0) {
            for &vi in &tri.v {
                acc[(vi - 1) as usize] += n;
            }
        }
    }
    for n in &mut acc {
        if n.length_squared() > 0.0 {
            *n = n.normalize();
        }
    }
    acc
}

/// Planar-mode refinement: a single [`ang_xyz`] swap, then
/// [`add_side_dist`]/`ang_xyz`-swap bursts until no split remains or the
/// vertex cap is met. There's no separate scratch-priming routine here —
/// that job is folded into `add_side_dist`/`break_tri` themselves — so
/// the early-break heuristic is: stop once a split burst increases the
/// count of wrong-orientation triangles (see [`count_bad_orientation`]).
fn run_planar(ts: &mut Tessellation, face: &dyn Face) -> Result<()> {
    ts.phase = PHASE_PLANAR;
    swap_tris(ts, face, ang_xyz, 0.0, None)?;

    if ts.max_len > 0.0 {
        let maxlen2 = ts.max_len * ts.max_len;
        let mut iter = 0i32;
        loop {
            if let Some(cap) = ts.max_pts_cap() {
                if ts.n_verts() >= cap {
                    break;
                }
            }
            iter += 4;
            let before_bad = count_bad_orientation(ts);
            let split = add_side_dist(ts, face, iter, maxlen2, false)?;
            if split == 0 {
                break;
            }
            swap_tris(ts, face, ang_xyz, 0.0, None)?;
            if count_bad_orientation(ts) > before_bad {
                log::warn!("tessellate: planar branch detected new inversions, stopping early");
                break;
            }
        }
    }
    ts.phase = PHASE_NORMAL;
    Ok(())
}

/// Maximum-edge-length refinement: an `add_side_dist` burst/swap loop
/// against the given squared length threshold (a coarse `4*maxlen^2`
/// pass runs before the fine `maxlen^2, side_mid = true` pass). `iter`
/// grows each burst so `add_side_dist`'s own `2*split > iter` cap keeps
/// interleaving splits with swap passes rather than exhausting every
/// long side in one call.
fn run_maxlen_phase(ts: &mut Tessellation, face: &dyn Face, maxlen2: f64, side_mid: bool) -> Result<()> {
    let mut iter = 0i32;
    loop {
        if let Some(cap) = ts.max_pts_cap() {
            if ts.n_verts() >= cap {
                break;
            }
        }
        iter += 4;
        let split = add_side_dist(ts, face, iter, maxlen2, side_mid)?;
        if split == 0 {
            break;
        }
        let ang_accum = swap_tris(ts, face, ang_uv, 0.0, None)?;
        let diag_accum = swap_tris(ts, face, diag, 1.0, None)?;
        if ang_accum > MAX_ANG && diag_accum < 0.0 {
            break;
        }
    }
    Ok(())
}

/// Repeated `break_tri` (insertion mode given by `mode`) plus both swaps,
/// stopping once the `diag` accumulator shows the mesh is either
/// well-conditioned (`> 0.866`) or in a state no local swap can help
/// (`<= -1`).
fn run_break_tri_phase(ts: &mut Tessellation, face: &dyn Face, mode: i32) -> Result<()> {
    loop {
        let n = break_tri(ts, face, None, mode)?;
        if n == 0 {
            break;
        }
        swap_tris(ts, face, ang_uv, 0.0, None)?;
        let diag_accum = swap_tris(ts, face, diag, 1.0, None)?;
        if diag_accum > 0.866 || diag_accum <= -1.0 {
            break;
        }
    }
    Ok(())
}

/// As [`run_break_tri_phase`] with `mode = 0` (midpoint-mismatch
/// insertion), with a fresh midpoint hash created and destroyed around
/// every `break_tri` call so the candidate-centroid cache never
/// survives past the burst that populated it.
fn run_break_tri_phase_hashed(ts: &mut Tessellation, face: &dyn Face) -> Result<()> {
    loop {
        let mut hash = MidpointHash::create(CHUNK as u32);
        let n = break_tri(ts, face, Some(&mut hash), 0)?;
        drop(hash);
        if n == 0 {
            break;
        }
        swap_tris(ts, face, ang_uv, 0.0, None)?;
        let diag_accum = swap_tris(ts, face, diag, 1.0, None)?;
        if diag_accum > 0.866 || diag_accum <= -1.0 {
            break;
        }
    }
    Ok(())
}

/// Plain (non-normal-driven) `split_inter` plus both swaps, stopping
/// once the running total of splits exceeds three times the triangle
/// count the mesh entered refinement with.
fn run_split_inter_plain_phase(ts: &mut Tessellation, face: &dyn Face, initial_n_tris: usize) -> Result<()> {
    let mut total = 0usize;
    loop {
        let n = split_inter(ts, face, false, None, 0)?;
        total += n;
        if n == 0 {
            break;
        }
        swap_tris(ts, face, ang_uv, 0.0, None)?;
        swap_tris(ts, face, diag, 1.0, None)?;
        if total > 3 * initial_n_tris {
            break;
        }
    }
    Ok(())
}

/// `split_inter` driven by per-vertex normals (antipodal-normal
/// detection), re-derived once up front and updated in place by
/// `split_inter` as new vertices are inserted. Stops once a burst
/// inserts nothing or the vertex count reaches six times what
/// refinement started with.
fn run_antipodal_normal_phase(ts: &mut Tessellation, face: &dyn Face, initial_n_verts: usize) -> Result<()> {
    let mut aux = compute_vertex_normals(ts);
    loop {
        if ts.n_verts() >= 6 * initial_n_verts {
            break;
        }
        let n = split_inter(ts, face, false, Some(&mut aux), 6 * ts.n_verts() as i32)?;
        swap_tris(ts, face, ang_uv, 0.0, None)?;
        swap_tris(ts, face, diag, 1.0, None)?;
        if n == 0 {
            break;
        }
    }
    Ok(())
}

/// Shared shape of the two facet-driven refinement passes: prime every
/// triangle's cached midpoint, then loop a facet-driven candidate
/// routine (`add_facet_norm` or `add_facet_dist`) followed by a hashed
/// swap burst that reconciles each triangle's cached midpoint from the
/// hash (promoting the pre-flip value when present, recomputing
/// otherwise). A stall counter tracks lack of forward progress
/// (`accum` not improving while `split` keeps growing) and stops the
/// phase once it exceeds 6, or once the vertex cap is hit.
fn run_facet_driven_phase(
    ts: &mut Tessellation,
    face: &dyn Face,
    mut candidate_fn: impl FnMut(&mut Tessellation, &dyn Face) -> Result<usize>,
) -> Result<()> {
    for t in 1..=ts.n_tris() as i32 {
        ts.fill_mid(face, t)?;
    }

    let mut last_accum = f64::NEG_INFINITY;
    let mut last_split = 0usize;
    let mut stall = 0u32;

    loop {
        if let Some(cap) = ts.max_pts_cap() {
            if ts.n_verts() >= cap {
                break;
            }
        }
        let split = candidate_fn(ts, face)?;
        if split == 0 {
            break;
        }

        let mut hash = MidpointHash::create(CHUNK as u32);
        ts.phase = PHASE_TO_BE_FILLED;
        swap_tris(ts, face, ang_uv, 0.0, Some(&mut hash))?;
        swap_tris(ts, face, diag, 1.0, Some(&mut hash))?;
        ts.phase = PHASE_NORMAL;

        for t in 1..=ts.n_tris() as i32 {
            let tri = *ts.triangle(t);
            if let Some(v) = hash.find(tri.v[0], tri.v[1], tri.v[2]) {
                ts.triangle_mut(t).mid = v.xyz;
                ts.triangle_mut(t).close = if v.close { CloseState::Close } else { CloseState::NotClose };
            } else {
                ts.fill_mid(face, t)?;
            }
        }
        drop(hash);

        let accum = ts.accum;
        if accum <= last_accum && split > last_split {
            stall += 1;
        } else {
            stall = 0;
        }
        last_accum = accum;
        last_split = split;
        if stall > 6 {
            break;
        }
    }
    Ok(())
}

/// General (non-planar) refinement, run strictly in the order below;
/// each phase only runs while `or_cnt < MAX_OR_CNT`.
fn run_general(ts: &mut Tessellation, face: &dyn Face, t_id: i32) -> Result<()> {
    let initial_n_tris = ts.n_tris();
    let initial_n_verts = ts.n_verts();

    // 1. Pre-swap.
    swap_tris(ts, face, ang_uv, 0.0, None)?;
    swap_tris(ts, face, diag, 1.0, None)?;

    // 2. Phase X: antipodal normals.
    if ts.or_cnt < MAX_OR_CNT {
        run_antipodal_normal_phase(ts, face, initial_n_verts)?;
    }

    // 3. Phase 0: coarse maxlen pass.
    if ts.or_cnt < MAX_OR_CNT && ts.max_len > 0.0 {
        run_maxlen_phase(ts, face, 4.0 * ts.max_len * ts.max_len, false)?;
    }

    // 4. Phase A: inverted-neighbor insertion.
    if ts.or_cnt < MAX_OR_CNT {
        run_break_tri_phase(ts, face, -1)?;
    }

    // 5. Phase B: interior-antipodal split without normals.
    if ts.or_cnt < MAX_OR_CNT {
        run_split_inter_plain_phase(ts, face, initial_n_tris)?;
    }

    // 6. Phase C: midpoint-mismatch insertion.
    if ts.or_cnt < MAX_OR_CNT {
        run_break_tri_phase_hashed(ts, face)?;
    }

    // When the mesh is large enough and exactly one triangle has the
    // wrong UV orientation, continue but skip Phase D rather than
    // treating it as fatal.
    let mut bad_start = false;
    if !ts.planar && ts.n_tris() >= 16 {
        let bad = count_bad_orientation(ts);
        if bad == 1 {
            bad_start = true;
            log::warn!("tessellate[{t_id}]: badStart mode engaged ({bad} mis-oriented triangle), skipping Phase D");
        }
    }

    // 7. Phase D: fine maxlen pass.
    if ts.or_cnt < MAX_OR_CNT && ts.max_len > 0.0 && !bad_start {
        run_maxlen_phase(ts, face, ts.max_len * ts.max_len, true)?;
    }

    // 8. Phase 1: dihedral-driven.
    if ts.or_cnt < MAX_OR_CNT {
        run_facet_driven_phase(ts, face, add_facet_norm)?;
    }

    // 9. Phase 2: chord-driven.
    if ts.or_cnt < MAX_OR_CNT && ts.chord > 0.0 {
        run_facet_driven_phase(ts, face, add_facet_dist)?;
    }

    // 10. Phase 3: final swap.
    if ts.or_cnt < MAX_OR_CNT {
        swap_tris(ts, face, ang_uv, 0.0, None)?;
        swap_tris(ts, face, diag, 1.0, None)?;
    }

    if ts.n_tris() > 2 * initial_n_tris {
        swap_tris(ts, face, ang_xyz, 0.0, None)?;
    }

    Ok(())
}
