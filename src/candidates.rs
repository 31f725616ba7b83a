//! Candidate selection heuristics that drive point insertion:
//! `break_tri`, `add_facet_norm`, `add_facet_dist`, `add_side_dist`, and
//! `split_inter`. Each scans the mesh for triangles failing some
//! geometric quality test and calls into [`crate::insert`] to fix the
//! worst offender, one (or several, for `break_tri`) at a time.

use std::collections::{HashSet, VecDeque};

use crate::constants::{CUT_ANG, DEV_ANG, FLOOD_DEPTH, SIDES};
use crate::error::Result;
use crate::face::Face;
use crate::geometry::{area2d, dist2, tri_area3d, tri_normal, uv_max_angle};
use crate::insert::{split_side, split_tri};
use crate::midpoint_hash::MidpointHash;
use crate::store::{CloseState, Tessellation, VertexKind};
use glam::DVec3;

fn interior_neighbor_count(ts: &Tessellation, t: i32) -> usize {
    ts.triangle(t).n.iter().filter(|&&n| n > 0).count()
}

fn all_sides_exceed(ts: &Tessellation, t: i32, threshold2: f64) -> bool {
    let tri = ts.triangle(t);
    SIDES.iter().all(|s| {
        let a = ts.vertex(tri.v[s[0]]).xyz;
        let b = ts.vertex(tri.v[s[1]]).xyz;
        dist2(a, b) > threshold2
    })
}

fn uv_max_angle_of(ts: &Tessellation, t: i32) -> f64 {
    let tri = ts.triangle(t);
    let uv = |i: i32| ts.vertex(i).uv;
    uv_max_angle(uv(tri.v[0]), uv(tri.v[1]), uv(tri.v[2]), ts.v_over_u)
}

fn tri_area3d_of(ts: &Tessellation, t: i32) -> f64 {
    let tri = ts.triangle(t);
    let xyz = |i: i32| ts.vertex(i).xyz;
    tri_area3d(xyz(tri.v[0]), xyz(tri.v[1]), xyz(tri.v[2]))
}

/// BFS over positive neighbor links, collecting every triangle within
/// `depth` hops of `start` (inclusive). Used to mark a freshly-inserted
/// region ineligible for a second pick within the same `breakTri` call.
fn flood_ring(ts: &Tessellation, start: i32, depth: i32) -> HashSet<i32> {
    let mut seen = HashSet::new();
    seen.insert(start);
    let mut frontier = VecDeque::new();
    frontier.push_back((start, 0));
    while let Some((t, d)) = frontier.pop_front() {
        if d >= depth {
            continue;
        }
        for &n in &ts.triangle(t).n {
            if n > 0 && seen.insert(n) {
                frontier.push_back((n, d + 1));
            }
        }
    }
    seen
}

/// Exact-sign-with-fuzz inclusion test: `p` counts as inside `(t0,t1,t2)`
/// only when every normalized barycentric weight exceeds `fuzz`.
fn strictly_inside(t0: [f64; 2], t1: [f64; 2], t2: [f64; 2], p: [f64; 2], fuzz: f64) -> bool {
    let mut w = [area2d(t1, t2, p), area2d(t2, t0, p), area2d(t0, t1, p)];
    crate::geometry::normalize_weights(&mut w);
    w.iter().all(|&x| x > fuzz)
}

/// Dot of the sub-triangle normal `(a, b, candidate)` against the base
/// triangle's own normal, for each of the three edges of `(v0, v1,
/// v2)`. `None` in a slot means that sub-triangle (or the base itself)
/// is degenerate.
fn corner_dihedrals(
    v0: [f64; 3],
    v1: [f64; 3],
    v2: [f64; 3],
    candidate: [f64; 3],
) -> Option<[Option<f64>; 3]> {
    let base = tri_normal(v0, v1, v2, 0.0)?;
    let edges = [(v0, v1), (v1, v2), (v2, v0)];
    let mut out = [None; 3];
    for (i, &(a, b)) in edges.iter().enumerate() {
        out[i] = tri_normal(a, b, candidate, 0.0).map(|n| n.dot(base));
    }
    Some(out)
}

/// `breakTri(mode)` (spec.md §4.7): centroid insertion into the worst
/// eligible triangle, repeated until no triangle remains eligible this
/// call. Returns the number of insertions performed.
pub fn break_tri(
    ts: &mut Tessellation,
    face: &dyn Face,
    mut hash: Option<&mut MidpointHash>,
    mode: i32,
) -> Result<usize> {
    let mut excluded: HashSet<i32> = HashSet::new();
    let mut inserted = 0usize;

    loop {
        let n_tris = ts.n_tris() as i32;
        let mut best: Option<(i32, f64)> = None;

        for t in 1..=n_tris {
            if excluded.contains(&t) {
                continue;
            }
            if interior_neighbor_count(ts, t) < 2 {
                continue;
            }
            if uv_max_angle_of(ts, t) > CUT_ANG {
                continue;
            }
            if !all_sides_exceed(ts, t, ts.eps2) {
                continue;
            }
            if mode == -1 {
                let own_area = tri_area3d_of(ts, t);
                let tri = *ts.triangle(t);
                let own_normal = {
                    let xyz = |i: i32| ts.vertex(i).xyz;
                    tri_normal(xyz(tri.v[0]), xyz(tri.v[1]), xyz(tri.v[2]), 0.0)
                };
                let mut min_dihedral = f64::INFINITY;
                let mut min_nbr_area = f64::INFINITY;
                for &n in tri.n.iter().filter(|&&n| n > 0) {
                    min_nbr_area = min_nbr_area.min(tri_area3d_of(ts, n));
                    let nbr = *ts.triangle(n);
                    let xyz = |i: i32| ts.vertex(i).xyz;
                    if let (Some(a), Some(b)) = (
                        own_normal,
                        tri_normal(xyz(nbr.v[0]), xyz(nbr.v[1]), xyz(nbr.v[2]), 0.0),
                    ) {
                        min_dihedral = min_dihedral.min(a.dot(b));
                    }
                }
                let qualifies = min_dihedral <= -0.9 || min_nbr_area <= 0.001 * own_area;
                if !qualifies {
                    continue;
                }
            }

            let area = tri_area3d_of(ts, t);
            if best.map_or(true, |(_, a)| area > a) {
                best = Some((t, area));
            }
        }

        let Some((t, _)) = best else { break };
        let uv = ts.centroid_uv(t);

        let mut candidate = face.evaluate(uv)?.xyz;
        if mode == 0 {
            let tri = *ts.triangle(t);
            let cached = hash
                .as_deref()
                .and_then(|h| h.find(tri.v[0], tri.v[1], tri.v[2]));
            if let Some(c) = cached {
                candidate = c.xyz;
            } else {
                let any_isolated = tri.v.iter().any(|&v| ts.vertex(v).is_isolated_node());
                if any_isolated {
                    if let Ok((_, proj)) = face.inverse_evaluate(candidate) {
                        candidate = proj;
                    }
                }
                if let Some(h) = hash.as_deref_mut() {
                    h.add(tri.v[0], tri.v[1], tri.v[2], false, candidate);
                }
            }
        }

        let tri = *ts.triangle(t);
        let uv0 = ts.vertex(tri.v[0]).uv;
        let uv1 = ts.vertex(tri.v[1]).uv;
        let uv2 = ts.vertex(tri.v[2]).uv;
        if !strictly_inside(uv0, uv1, uv2, uv, 1.0e-4) {
            excluded.insert(t);
            continue;
        }

        let xyz0 = ts.vertex(tri.v[0]).xyz;
        let xyz1 = ts.vertex(tri.v[1]).xyz;
        let xyz2 = ts.vertex(tri.v[2]).xyz;
        let dihedrals_ok = corner_dihedrals(xyz0, xyz1, xyz2, candidate)
            .map(|ds| ds.iter().all(|d| d.map_or(false, |v| v >= -0.98)))
            .unwrap_or(false);
        if !dihedrals_ok {
            excluded.insert(t);
            continue;
        }

        if close_edge(ts, t, candidate, 4) {
            excluded.insert(t);
            continue;
        }

        split_tri(ts, face, t, uv, candidate)?;
        inserted += 1;
        for ring in flood_ring(ts, t, FLOOD_DEPTH) {
            excluded.insert(ring);
        }
    }

    Ok(inserted)
}

/// Dihedral-driven insertion: splits any triangle whose cached midpoint
/// implies too sharp a fold against a close neighbor. Returns the
/// number of triangles split.
pub fn add_facet_norm(ts: &mut Tessellation, face: &dyn Face) -> Result<usize> {
    let mut split = 0usize;
    let mut t = 1i32;
    while t <= ts.n_tris() as i32 {
        if ts.triangle(t).close != CloseState::NotClose {
            t += 1;
            continue;
        }
        if interior_neighbor_count(ts, t) < 2 || uv_max_angle_of(ts, t) > CUT_ANG {
            t += 1;
            continue;
        }
        let tri = *ts.triangle(t);
        let mid = tri.mid;
        let close_to_vertex = tri
            .v
            .iter()
            .any(|&v| dist2(ts.vertex(v).xyz, mid) < 1.0e-3 * ts.edist2);
        if close_to_vertex {
            t += 1;
            continue;
        }

        let own_area = tri_area3d_of(ts, t);
        let mut min_dihedral = f64::INFINITY;
        for (side, &s) in SIDES.iter().enumerate() {
            let n = tri.n[side];
            if n <= 0 {
                continue;
            }
            if ts.triangle(n).close != CloseState::Close && tri_area3d_of(ts, n) > own_area {
                continue;
            }
            let a = ts.vertex(tri.v[s[0]]).xyz;
            let b = ts.vertex(tri.v[s[1]]).xyz;
            let apex = ts.vertex(tri.v[side]).xyz;
            let other_apex_idx = ts
                .triangle(n)
                .v
                .iter()
                .copied()
                .find(|v| *v != tri.v[s[0]] && *v != tri.v[s[1]])
                .unwrap_or(tri.v[side]);
            let other_apex = ts.vertex(other_apex_idx).xyz;
            if let (Some(n1), Some(n2)) = (
                tri_normal(a, b, apex, 0.0),
                tri_normal(b, a, other_apex, 0.0),
            ) {
                min_dihedral = min_dihedral.min(n1.dot(n2));
            }
        }

        if min_dihedral < ts.dot_nrm - crate::constants::ANG_TOL {
            split_tri(ts, face, t, ts.centroid_uv(t), mid)?;
            split += 1;
        }
        t += 1;
    }
    Ok(split)
}

/// Chord-deviation-driven insertion: splits any triangle whose cached
/// midpoint sits too far from the facet it's supposed to approximate.
/// Returns the number of triangles split.
///
/// The rejection tests below read oddly next to [`add_facet_norm`]'s
/// (e.g. "reject if inside" rather than "reject if outside") — the two
/// routines share a shape but were never meant to share a rejection
/// polarity.
pub fn add_facet_dist(ts: &mut Tessellation, face: &dyn Face) -> Result<usize> {
    let mut split = 0usize;
    let mut t = 1i32;
    while t <= ts.n_tris() as i32 {
        if ts.triangle(t).close != CloseState::NotClose {
            t += 1;
            continue;
        }
        if uv_max_angle_of(ts, t) > DEV_ANG {
            t += 1;
            continue;
        }
        let tri = *ts.triangle(t);
        let threshold = (ts.chord * ts.chord).max(ts.edist2);
        let centroid_uv = ts.centroid_uv(t);
        let centroid_xyz = match face.evaluate(centroid_uv) {
            Ok(ev) => ev.xyz,
            Err(_) => {
                t += 1;
                continue;
            }
        };
        if dist2(centroid_xyz, tri.mid) < threshold {
            t += 1;
            continue;
        }
        let any_short_side = SIDES.iter().any(|s| {
            let a = ts.vertex(tri.v[s[0]]).xyz;
            let b = ts.vertex(tri.v[s[1]]).xyz;
            dist2(a, b) <= threshold
        });
        if any_short_side {
            t += 1;
            continue;
        }

        let uv0 = ts.vertex(tri.v[0]).uv;
        let uv1 = ts.vertex(tri.v[1]).uv;
        let uv2 = ts.vertex(tri.v[2]).uv;
        if strictly_inside(uv0, uv1, uv2, centroid_uv, 0.1) {
            t += 1;
            continue;
        }
        let xyz0 = ts.vertex(tri.v[0]).xyz;
        let xyz1 = ts.vertex(tri.v[1]).xyz;
        let xyz2 = ts.vertex(tri.v[2]).xyz;
        let dihedrals_ok = corner_dihedrals(xyz0, xyz1, xyz2, tri.mid)
            .map(|ds| ds.iter().all(|d| d.map_or(false, |v| v >= 0.0)))
            .unwrap_or(false);
        if !dihedrals_ok {
            t += 1;
            continue;
        }

        split_tri(ts, face, t, centroid_uv, tri.mid)?;
        split += 1;
        t += 1;
    }
    Ok(split)
}

/// Longest-side splitting: repeatedly bisects the longest over-length
/// interior edge, capped at `2*split > iter` so a caller can interleave
/// bursts of splits with swap passes. Returns the number of splits
/// performed.
pub fn add_side_dist(
    ts: &mut Tessellation,
    face: &dyn Face,
    iter: i32,
    maxlen2: f64,
    side_mid: bool,
) -> Result<usize> {
    let mindist = maxlen2.max(ts.devia2);
    let mut split = 0usize;
    let mut frozen: HashSet<i32> = HashSet::new();

    loop {
        if 2 * split as i32 > iter {
            break;
        }
        let n_tris = ts.n_tris() as i32;
        let mut best: Option<(i32, usize, i32, f64, f64)> = None;

        for t1 in 1..=n_tris {
            if frozen.contains(&t1) {
                continue;
            }
            let tri = *ts.triangle(t1);
            let touches_non_face = tri
                .v
                .iter()
                .any(|&v| ts.vertex(v).kind != VertexKind::FaceInterior);
            let threshold = if touches_non_face {
                mindist.max(ts.edist2).max(ts.eps2)
            } else {
                mindist
            };

            for (side, &s) in SIDES.iter().enumerate() {
                let t2 = tri.n[side];
                if t2 <= t1 {
                    continue;
                }
                let len2 = dist2(ts.vertex(tri.v[s[0]]).xyz, ts.vertex(tri.v[s[1]]).xyz);
                if len2 <= threshold {
                    continue;
                }
                if best.map_or(true, |(_, _, _, best_len, _)| len2 > best_len) {
                    best = Some((t1, side, t2, len2, threshold));
                }
            }
        }

        let Some((t1, side, t2, _, _)) = best else { break };

        if ts.phase == 3 {
            let uv_mid = ts.centroid_uv(t1);
            let xyz_mid = match face.evaluate(uv_mid) {
                Ok(ev) => ev.xyz,
                Err(_) => {
                    frozen.insert(t1);
                    continue;
                }
            };
            if close2_edge(ts, t1, xyz_mid, 6) {
                frozen.insert(t1);
                continue;
            }
        }

        match split_side(ts, face, t1, side, t2, side_mid) {
            Ok(_) => split += 1,
            Err(crate::error::TessError::RangeError(_)) => {
                frozen.insert(t1);
            }
            Err(e) => return Err(e),
        }

        if let Some(cap) = ts.max_pts_cap() {
            if ts.n_verts() >= cap {
                break;
            }
        }
    }
    Ok(split)
}

/// Anti-parallel-normal interior-edge splitting. `aux` holds a running
/// per-vertex unit-normal
/// table (indexed the same as `ts.verts`); pass `None` for the
/// "normals not yet available" variant. Returns the number of splits.
pub fn split_inter(
    ts: &mut Tessellation,
    face: &dyn Face,
    side_mid: bool,
    mut aux: Option<&mut Vec<DVec3>>,
    cnt: i32,
) -> Result<usize> {
    let mut split = 0usize;
    let mut frozen: HashSet<i32> = HashSet::new();

    loop {
        if cnt > 0 && split as i32 >= cnt {
            break;
        }
        let n_tris = ts.n_tris() as i32;
        let mut best: Option<(i32, usize, i32, f64)> = None;

        for t1 in 1..=n_tris {
            if frozen.contains(&t1) {
                continue;
            }
            let tri = *ts.triangle(t1);
            for (side, &s) in SIDES.iter().enumerate() {
                let t2 = tri.n[side];
                if t2 <= 0 {
                    continue;
                }
                let (v0, v1) = (tri.v[s[0]], tri.v[s[1]]);
                let antiparallel = match aux.as_deref() {
                    Some(normals) => {
                        let n0 = normals.get((v0 - 1) as usize).copied();
                        let n1 = normals.get((v1 - 1) as usize).copied();
                        matches!((n0, n1), (Some(a), Some(b)) if a.dot(b) <= -1.0e-5)
                    }
                    None => {
                        ts.vertex(v0).kind != VertexKind::FaceInterior
                            && ts.vertex(v1).kind != VertexKind::FaceInterior
                    }
                };
                if !antiparallel {
                    continue;
                }
                let len2 = dist2(ts.vertex(v0).xyz, ts.vertex(v1).xyz);
                if best.map_or(true, |(_, _, _, best_len)| len2 > best_len) {
                    best = Some((t1, side, t2, len2));
                }
            }
        }

        let Some((t1, side, t2, _)) = best else { break };
        let uv_mid = {
            let tri = ts.triangle(t1);
            let s = SIDES[side];
            let a = ts.vertex(tri.v[s[0]]).uv;
            let b = ts.vertex(tri.v[s[1]]).uv;
            [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0]
        };
        let ev = match face.evaluate(uv_mid) {
            Ok(ev) => ev,
            Err(_) => {
                frozen.insert(t1);
                continue;
            }
        };

        let tri1 = *ts.triangle(t1);
        let apex1 = tri1.v[side];
        let os = ts.triangle(t2).side_pointing_to(t1);
        let dihedral_ok = if let Some(os) = os {
            let apex2 = ts.triangle(t2).v[os];
            let s = SIDES[side];
            let a = ts.vertex(tri1.v[s[0]]).xyz;
            let b = ts.vertex(tri1.v[s[1]]).xyz;
            let n1 = tri_normal(a, b, ts.vertex(apex1).xyz, 0.0);
            let n2 = tri_normal(b, a, ts.vertex(apex2).xyz, 0.0);
            let nn1 = tri_normal(a, ev.xyz, ts.vertex(apex1).xyz, 0.0);
            let nn2 = tri_normal(ev.xyz, b, ts.vertex(apex1).xyz, 0.0);
            matches!((n1, n2, nn1, nn2), (Some(_), Some(_), Some(x), Some(y)) if x.dot(y) > 0.1)
        } else {
            false
        };
        if !dihedral_ok {
            frozen.insert(t1);
            continue;
        }

        let node = match split_side(ts, face, t1, side, t2, side_mid) {
            Ok(n) => n,
            Err(crate::error::TessError::RangeError(_)) => {
                frozen.insert(t1);
                continue;
            }
            Err(e) => return Err(e),
        };
        split += 1;
        for ring in flood_ring(ts, t1, FLOOD_DEPTH) {
            frozen.insert(ring);
        }
        if let Some(normals) = aux.as_deref_mut() {
            let new_normal = tri_normal(
                ts.vertex(tri1.v[SIDES[side][0]]).xyz,
                ts.vertex(tri1.v[SIDES[side][1]]).xyz,
                ev.xyz,
                0.0,
            )
            .unwrap_or(DVec3::Z);
            while normals.len() < node as usize {
                normals.push(DVec3::Z);
            }
            normals[(node - 1) as usize] = new_normal;
        }
    }
    Ok(split)
}

fn ray_intersect_ratio(pt0: DVec3, pt1: DVec3, pt2: DVec3) -> f64 {
    let raw_dx = pt1 - pt0;
    let d = raw_dx.length();
    if d == 0.0 {
        return 100.0;
    }
    let dx = raw_dx / d;
    let dp_raw = pt2 - pt0;
    let dist0 = dp_raw.length();
    let dp = if dist0 != 0.0 { dp_raw / dist0 } else { dp_raw };
    let t = dist0 * dx.dot(dp) / d;
    let px = pt0 + raw_dx * t - pt2;
    px.length() / d
}

fn get_intersect_dist2(pt0: DVec3, pt1: DVec3, pt2: DVec3) -> f64 {
    let x0 = pt0 - pt2;
    let x1 = pt1 - pt2;
    let mut n2 = x0.cross(x1);
    let n2len2 = n2.dot(n2);
    if n2len2 == 0.0 {
        return 1.0e20;
    }
    n2 /= n2len2.sqrt();
    let x1len2 = x1.dot(x1);
    if x1len2 == 0.0 {
        return 1.0e20;
    }
    let n0 = x1 / x1len2.sqrt();
    let n1 = n0.cross(n2);

    let proj = |p: DVec3| (n0.dot(p), n1.dot(p));
    let (x0u, x0v) = proj(pt0);
    let (x1u, x1v) = proj(pt1);
    let (x2u, x2v) = proj(pt2);

    let angle = (x1v - x0v).atan2(x1u - x0u);
    let (cosan, sinan) = (angle.cos(), angle.sin());
    let len = ((x1v - x0v).powi(2) + (x1u - x0u).powi(2)).sqrt();
    let dist = ((x2v - x0v) * cosan - (x2u - x0u) * sinan) / len;
    if !(-0.01..=1.01).contains(&dist) {
        return 1.0e40;
    }
    let proj_pt = pt0 + (pt1 - pt0) * dist;
    proj_pt.distance_squared(pt2)
}

/// Walks up to 4 neighbor-hops looking for a boundary side that is
/// either a degenerate same-node-index seam, or whose ray-distance
/// ratio to `xyz` is below `0.125`.
pub fn close_edge(ts: &Tessellation, t0: i32, xyz: [f64; 3], depth: i32) -> bool {
    if depth <= 0 {
        return false;
    }
    let tri = ts.triangle(t0);
    for (side, &s) in SIDES.iter().enumerate() {
        let n = tri.n[side];
        let (i1, i2) = (tri.v[s[0]], tri.v[s[1]]);
        if n <= 0 {
            let (v1, v2) = (ts.vertex(i1), ts.vertex(i2));
            if v1.kind == VertexKind::Node
                && v2.kind == VertexKind::Node
                && v1.edge_param_index == v2.edge_param_index
            {
                return true;
            }
            let ratio = ray_intersect_ratio(DVec3::from(v1.xyz), DVec3::from(v2.xyz), DVec3::from(xyz));
            if ratio < 0.125 {
                return true;
            }
        } else if close_edge(ts, n, xyz, depth - 1) {
            return true;
        }
    }
    false
}

/// Walks up to 6 neighbor-hops looking for a boundary side within
/// `ts.edist2` of `xyz` (by squared clamped-segment projection).
pub fn close2_edge(ts: &Tessellation, t0: i32, xyz: [f64; 3], depth: i32) -> bool {
    if depth <= 0 {
        return false;
    }
    let tri = ts.triangle(t0);
    for (side, &s) in SIDES.iter().enumerate() {
        let n = tri.n[side];
        let (i1, i2) = (tri.v[s[0]], tri.v[s[1]]);
        if n <= 0 {
            let a = ts.vertex(i1).xyz;
            let b = ts.vertex(i2).xyz;
            let d = get_intersect_dist2(DVec3::from(a), DVec3::from(b), DVec3::from(xyz));
            if d < ts.edist2 {
                return true;
            }
        } else if close2_edge(ts, n, xyz, depth - 1) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Orientation;
    use crate::face::{Evaluation, FaceRange};
    use crate::store::{Triangle, Vertex};

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
        ts.edist2 = 1.0e-6;
        ts.eps2 = 1.0e-8;
        ts
    }

    #[test]
    fn break_tri_is_a_no_op_when_no_triangle_has_two_interior_neighbors() {
        // The quad's two triangles each have only one interior neighbor
        // (the shared diagonal); breakTri's >=2 requirement excludes both.
        let mut ts = quad();
        let face = FlatPlane;
        let n = break_tri(&mut ts, &face, None, 0).unwrap();
        assert_eq!(n, 0);
        assert_eq!(ts.n_tris(), 2);
    }

    #[test]
    fn add_side_dist_splits_the_longest_side_first() {
        // Stretch the quad so the diagonal (shared side) is by far the
        // longest edge in the mesh, then drive addSideDist with a very
        // small maxlen^2 so every side qualifies.
        let mut ts = quad();
        ts.verts[1].xyz = [5.0, 0.0, 0.0];
        ts.verts[1].uv = [5.0, 0.0];
        let face = FlatPlane;
        let n = add_side_dist(&mut ts, &face, 10, 1.0e-6, false).unwrap();
        assert!(n >= 1);
        ts.check_invariants().unwrap();
    }

    #[test]
    fn close_edge_flags_a_point_near_a_boundary_segment() {
        let ts = quad();
        // Triangle 1's side 2 (v[0],v[1]) = (1,2) is open boundary,
        // running along y=0 from x=0 to x=1. A point essentially on
        // that segment should register as close.
        let near_boundary = [0.5, 1.0e-4, 0.0];
        assert!(close_edge(&ts, 1, near_boundary, 4));
    }

    #[test]
    fn close_edge_does_not_flag_a_distant_point() {
        let ts = quad();
        assert!(!close_edge(&ts, 1, [0.5, 0.5, 100.0], 4));
    }

    #[test]
    fn close2_edge_flags_a_point_within_edist() {
        let mut ts = quad();
        ts.edist2 = 1.0;
        assert!(close2_edge(&ts, 1, [0.5, 0.0, 0.0], 6));
    }
}
