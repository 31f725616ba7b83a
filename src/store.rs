//! The triangulation store: dynamic vertex/triangle arrays with O(1)
//! neighbor navigation (spec.md §2 item 3, §3).
//!
//! Vertex and neighbor-triangle indices are kept **1-based** throughout
//! this crate, exactly as the original C uses them, because the
//! invariants in spec.md §3 ("nonpositive = no neighbor", "the
//! moved-from triangle id must be rewritten everywhere") are stated in
//! terms of that convention; re-basing to 0-based indices internally
//! would require re-deriving every boundary condition from scratch and
//! risks silently changing their meaning. `0` or negative values in a
//! neighbor slot mean "no neighbor" (open boundary); in the initial
//! triangulation phase a negative value also carries a paired boundary
//! segment id, which this crate preserves through the frame snapshot
//! without interpreting it further (that encoding belongs to the
//! initial constrained triangulation, out of scope per spec.md §1).

use crate::config::Orientation;
use crate::constants::SIDES;
use crate::error::{Result, TessError};
use crate::face::Face;

/// Classification of a vertex's provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    /// A boundary-loop corner vertex.
    Node,
    /// Inserted on (or sampled along) a boundary edge.
    EdgeInterior,
    /// Inserted in the face interior by the refinement engine.
    FaceInterior,
}

/// A single mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub xyz: [f64; 3],
    pub uv: [f64; 2],
    pub kind: VertexKind,
    /// Owning boundary edge id, or `-1` for an isolated node (e.g. a
    /// degenerate-face pole) or for a face-interior vertex.
    pub edge_id: i32,
    /// Rank along the owning edge, meaningful only when `edge_id >= 0`.
    pub edge_param_index: i32,
}

impl Vertex {
    #[must_use]
    pub fn node(xyz: [f64; 3], uv: [f64; 2], edge_id: i32) -> Self {
        Self {
            xyz,
            uv,
            kind: VertexKind::Node,
            edge_id,
            edge_param_index: 0,
        }
    }

    #[must_use]
    pub fn edge_interior(xyz: [f64; 3], uv: [f64; 2], edge_id: i32, index: i32) -> Self {
        Self {
            xyz,
            uv,
            kind: VertexKind::EdgeInterior,
            edge_id,
            edge_param_index: index,
        }
    }

    #[must_use]
    pub fn face_interior(xyz: [f64; 3], uv: [f64; 2]) -> Self {
        Self {
            xyz,
            uv,
            kind: VertexKind::FaceInterior,
            edge_id: -1,
            edge_param_index: -1,
        }
    }

    #[must_use]
    pub fn is_isolated_node(&self) -> bool {
        self.kind == VertexKind::Node && self.edge_id == -1
    }
}

/// Tri-state "is this triangle's cached midpoint close to the
/// boundary" flag, matching the original's `NOTFILLED`/`TOBEFILLED`
/// sentinel encoding (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseState {
    NotFilled,
    Pending,
    NotClose,
    Close,
}

impl Default for CloseState {
    fn default() -> Self {
        CloseState::NotFilled
    }
}

/// A single mesh triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// 1-based vertex indices.
    pub v: [i32; 3],
    /// 1-based neighbor triangle indices; `<= 0` means no neighbor on
    /// that side (a boundary edge).
    pub n: [i32; 3],
    /// Bit `s` set means side `s` is a swap candidate.
    pub mark: u8,
    /// Cached surface midpoint (world space).
    pub mid: [f64; 3],
    /// Scratch area field, repurposed by several candidate heuristics.
    pub area: f64,
    pub close: CloseState,
    /// Scratch "frozen this pass" flag used by the swap engine and by
    /// candidate selection's flood-fill exclusion.
    pub hit: i32,
    /// Scratch counter (e.g. swaps this triangle participated in).
    pub count: i32,
}

impl Triangle {
    #[must_use]
    pub fn new(v: [i32; 3], n: [i32; 3]) -> Self {
        Self {
            v,
            n,
            mark: 0b111,
            mid: [0.0; 3],
            area: 0.0,
            close: CloseState::NotFilled,
            hit: 0,
            count: 0,
        }
    }

    #[must_use]
    pub fn is_candidate(&self, side: usize) -> bool {
        self.mark & (1 << side) != 0
    }

    pub fn set_candidate(&mut self, side: usize, candidate: bool) {
        if candidate {
            self.mark |= 1 << side;
        } else {
            self.mark &= !(1 << side);
        }
    }

    /// Returns the side index (0..3) whose neighbor slot equals
    /// `neighbor_1based`, if any.
    #[must_use]
    pub fn side_pointing_to(&self, neighbor_1based: i32) -> Option<usize> {
        self.n.iter().position(|&x| x == neighbor_1based)
    }
}

/// A boundary-loop edge segment, carried through from the initial
/// constrained triangulation (out of scope to construct; in scope to
/// read, for the `devia2`/`edist2`/`eps2` accumulation in
/// [`crate::driver`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// 1-based endpoint vertex indices.
    pub v: [i32; 2],
}

/// The refinement engine's working set: vertex/triangle arrays, the
/// frozen frame snapshot, and the scalar state accumulated during
/// initialization and carried between phases (spec.md §3 `TriStruct`).
#[derive(Debug, Clone)]
pub struct Tessellation {
    pub verts: Vec<Vertex>,
    pub tris: Vec<Triangle>,
    /// Immutable snapshot of post-boundary triangle vertex-triples,
    /// taken once at the start of refinement. Never mutated again.
    pub frame: Vec<[i32; 3]>,
    pub n_frame_verts: usize,
    pub segs: Vec<Segment>,

    pub max_len: f64,
    pub chord: f64,
    pub dot_nrm: f64,
    pub min_len: f64,
    pub v_over_u: f64,
    pub eps2: f64,
    pub devia2: f64,
    pub edist2: f64,
    pub or_uv: Orientation,
    pub or_cnt: u32,
    pub max_pts: i32,
    pub planar: bool,
    /// Scratch phase sentinel read by [`crate::predicates`] and
    /// [`crate::swap`] (see `PHASE_*` constants).
    pub phase: i32,
    /// Running accumulator a swap predicate publishes during a sweep
    /// (spec.md §4.4).
    pub accum: f64,
    /// Quad-patch override flag (TFI); the engine only reads it to
    /// gate [`crate::cleanup::validate_quad_override`] — building quad
    /// overrides is out of scope per spec.md §1.
    pub tfi: bool,

    /// Per-vertex barycentric-in-frame record, populated by
    /// [`crate::barycentric::bary_frame`].
    pub bary: Vec<Option<crate::barycentric::BaryRecord>>,
}

impl Tessellation {
    /// Builds a tessellation from an already-triangulated boundary
    /// loop. `or_uv` is the face's UV orientation sign (spec.md §4
    /// GLOSSARY); `segs` are the boundary edge segments used during
    /// initialization to compute `eps2`/`edist2`.
    #[must_use]
    pub fn new(verts: Vec<Vertex>, tris: Vec<Triangle>, segs: Vec<Segment>, or_uv: Orientation) -> Self {
        Self {
            verts,
            tris,
            frame: Vec::new(),
            n_frame_verts: 0,
            segs,
            max_len: 0.0,
            chord: 0.0,
            dot_nrm: 0.0,
            min_len: 0.0,
            v_over_u: 1.0,
            eps2: 0.0,
            devia2: 0.0,
            edist2: 0.0,
            or_uv,
            or_cnt: 0,
            max_pts: 0,
            planar: false,
            phase: crate::constants::PHASE_NORMAL,
            accum: 0.0,
            tfi: false,
            bary: Vec::new(),
        }
    }

    #[must_use]
    pub fn n_verts(&self) -> usize {
        self.verts.len()
    }

    #[must_use]
    pub fn n_tris(&self) -> usize {
        self.tris.len()
    }

    #[must_use]
    pub fn vertex(&self, idx_1based: i32) -> &Vertex {
        &self.verts[(idx_1based - 1) as usize]
    }

    #[must_use]
    pub fn triangle(&self, idx_1based: i32) -> &Triangle {
        &self.tris[(idx_1based - 1) as usize]
    }

    pub fn triangle_mut(&mut self, idx_1based: i32) -> &mut Triangle {
        &mut self.tris[(idx_1based - 1) as usize]
    }

    /// Interior-vertex cap implied by `max_pts`, mirroring
    /// [`crate::config::TessConfig::vertex_cap`] but read off the live
    /// tessellation's own `max_pts`/`n_frame_verts` rather than the
    /// caller-supplied config, since `n_frame_verts` isn't known until
    /// [`Tessellation::snapshot_frame`] has run.
    #[must_use]
    pub fn max_pts_cap(&self) -> Option<usize> {
        if self.max_pts > 0 {
            Some(self.max_pts as usize)
        } else if self.max_pts < 0 {
            Some(self.n_frame_verts + (-self.max_pts as usize).saturating_sub(2))
        } else {
            None
        }
    }

    /// Appends a new vertex, returning its 1-based index.
    pub fn push_vertex(&mut self, v: Vertex) -> i32 {
        self.verts.push(v);
        self.verts.len() as i32
    }

    /// Appends a new triangle, returning its 1-based index.
    pub fn push_triangle(&mut self, t: Triangle) -> i32 {
        self.tris.push(t);
        self.tris.len() as i32
    }

    /// Marks every side of every triangle as a swap candidate. Called
    /// once at the start of refinement (spec.md §4.8).
    pub fn mark_all_candidates(&mut self) {
        for t in &mut self.tris {
            t.mark = 0b111;
        }
    }

    /// Snapshots the current triangle vertex-triples as the immutable
    /// `frame`, and freezes `n_frame_verts` at the current vertex count.
    /// Must be called before any `collapse_edge` (spec.md "Design notes").
    pub fn snapshot_frame(&mut self) {
        self.frame = self.tris.iter().map(|t| t.v).collect();
        self.n_frame_verts = self.verts.len();
    }

    /// spec.md §4.2: any operation that changes where a triangle lives
    /// in `tris`, or changes a triangle `t`'s neighbor pointers, must
    /// walk every affected neighbor `n` and rewrite its back-pointer.
    /// This finds the side of `neighbor_1based` that points at
    /// `old_id` and rewrites it to `new_id`. No-op if `neighbor_1based`
    /// is not a real (positive) triangle reference.
    pub fn repoint_neighbor(&mut self, neighbor_1based: i32, old_id: i32, new_id: i32) {
        if neighbor_1based <= 0 {
            return;
        }
        let t = self.triangle_mut(neighbor_1based);
        if let Some(side) = t.side_pointing_to(old_id) {
            t.n[side] = new_id;
        }
    }

    /// spec.md §4.2: when a triangle is physically moved from index
    /// `old_id` (1-based) to `new_id` (1-based), every triangle in the
    /// array whose neighbor slot equals `old_id` must be rewritten to
    /// `new_id`, and vice versa is handled by the caller swapping the
    /// storage itself. This is the "rewrite everywhere" half.
    pub fn rewrite_triangle_id_everywhere(&mut self, old_id: i32, new_id: i32) {
        for t in &mut self.tris {
            for slot in &mut t.n {
                if *slot == old_id {
                    *slot = new_id;
                }
            }
        }
    }

    /// UV centroid of a triangle's three corners.
    #[must_use]
    pub fn centroid_uv(&self, tri_1based: i32) -> [f64; 2] {
        let t = self.triangle(tri_1based);
        let (a, b, c) = (
            self.vertex(t.v[0]).uv,
            self.vertex(t.v[1]).uv,
            self.vertex(t.v[2]).uv,
        );
        [(a[0] + b[0] + c[0]) / 3.0, (a[1] + b[1] + c[1]) / 3.0]
    }

    /// Refreshes a triangle's cached `mid` by evaluating `face` at the
    /// triangle's current UV centroid (`fillMid`, spec.md §4.4/§4.5). An
    /// evaluator that extrapolates at the centroid is logged and the
    /// stale `mid` is left in place rather than treated as fatal — the
    /// cache is a heuristic input to candidate selection, not a
    /// correctness-load-bearing value.
    pub fn fill_mid(&mut self, face: &dyn Face, tri_1based: i32) -> Result<()> {
        let uv = self.centroid_uv(tri_1based);
        match face.evaluate(uv) {
            Ok(ev) => {
                self.triangle_mut(tri_1based).mid = ev.xyz;
                Ok(())
            }
            Err(TessError::Extrapolation(u, v)) => {
                log::warn!("fill_mid: face evaluator extrapolated at ({u}, {v}), keeping stale mid");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Debug-only internal consistency check (spec.md §8 property 1),
    /// promoted from the original's `#ifdef DEBUG` `EG_checkTess`.
    /// Verifies, for every triangle/side with a positive neighbor, that
    /// the neighbor has exactly one side pointing back and that the two
    /// unordered shared-endpoint pairs agree.
    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) -> Result<()> {
        for (i, t) in self.tris.iter().enumerate() {
            let self_id = (i + 1) as i32;
            for side in 0..3 {
                let n = t.n[side];
                if n <= 0 {
                    continue;
                }
                if n as usize > self.tris.len() {
                    return Err(TessError::IndexError(format!(
                        "triangle {self_id} side {side} neighbor {n} out of range"
                    )));
                }
                let neighbor = &self.tris[(n - 1) as usize];
                let back_sides: Vec<usize> = (0..3)
                    .filter(|&s| neighbor.n[s] == self_id)
                    .collect();
                if back_sides.len() != 1 {
                    return Err(TessError::IndexError(format!(
                        "triangle {self_id} side {side} -> {n}, but {n} has {} back-pointers to {self_id}",
                        back_sides.len()
                    )));
                }
                let back_side = back_sides[0];
                let (e0, e1) = (t.v[SIDES[side][0]], t.v[SIDES[side][1]]);
                let (f0, f1) = (
                    neighbor.v[SIDES[back_side][0]],
                    neighbor.v[SIDES[back_side][1]],
                );
                let matches = (e0 == f0 && e1 == f1) || (e0 == f1 && e1 == f0);
                if !matches {
                    return Err(TessError::IndexError(format!(
                        "triangle {self_id} side {side} endpoints ({e0},{e1}) don't match neighbor {n} side {back_side} endpoints ({f0},{f1})"
                    )));
                }
            }
            for &vi in &t.v {
                if vi < 1 || vi as usize > self.verts.len() {
                    return Err(TessError::IndexError(format!(
                        "triangle {self_id} vertex index {vi} out of range"
                    )));
                }
            }
        }
        Ok(())
    }
}
