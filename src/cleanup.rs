//! Post-refinement adjunct validation: zero-area triangle removal and
//! the quad-override sanity check.
//!
//! Building a quad-to-triangle template is out of scope for this
//! engine; this module only validates the flag a caller may have
//! already set, the same boundary the rest of the crate draws around
//! the initial constrained triangulation.

use crate::constants::SIDES;
use crate::error::{Result, TessError};
use crate::face::Face;
use crate::geometry::tri_area3d;
use crate::insert::collaps_edge;
use crate::store::Tessellation;

/// Removes every triangle whose three vertices are exactly coplanar
/// with zero 3D area *and* whose degenerate side sits on a
/// parametrically-identified edge (both endpoints share `(kind,
/// edge_param_index)` — e.g. the two parameter-space copies of a
/// degenerate pole) with a UV span under `1e-4 · paramRange` in both
/// directions. Returns the number of collapses performed.
pub fn zero_area_cleanup(ts: &mut Tessellation, face: &dyn Face) -> Result<usize> {
    let range = face.range();
    let tol_u = 1.0e-4 * range.u_span();
    let tol_v = 1.0e-4 * range.v_span();

    let mut collapsed = 0usize;
    let mut i = 1i32;
    while i <= ts.n_tris() as i32 {
        let tri = *ts.triangle(i);
        let a = ts.vertex(tri.v[0]).xyz;
        let b = ts.vertex(tri.v[1]).xyz;
        let c = ts.vertex(tri.v[2]).xyz;

        if tri_area3d(a, b, c) != 0.0 {
            i += 1;
            continue;
        }

        let degenerate_side = (0..3).find_map(|side| {
            let e0 = tri.v[SIDES[side][0]];
            let e1 = tri.v[SIDES[side][1]];
            let v0 = ts.vertex(e0);
            let v1 = ts.vertex(e1);
            (v0.kind == v1.kind && v0.edge_param_index == v1.edge_param_index).then_some((e0, e1))
        });

        let Some((e0, e1)) = degenerate_side else {
            i += 1;
            continue;
        };

        let uv0 = ts.vertex(e0).uv;
        let uv1 = ts.vertex(e1).uv;
        if (uv0[0] - uv1[0]).abs() >= tol_u || (uv0[1] - uv1[1]).abs() >= tol_v {
            i += 1;
            continue;
        }

        // Strict `<` is the only sensible reading of "within tolerance".
        match collaps_edge(ts, face, e0, e1, true) {
            Ok(()) => {
                collapsed += 1;
                // A different triangle now occupies slot `i`; don't advance.
            }
            Err(TessError::Degenerate(_)) => i += 1,
            Err(e) => return Err(e),
        }
    }

    Ok(collapsed)
}

/// Sanity-checks a quad-patch override flag. Building the quad-to-tri
/// template itself is out of scope; what remains in scope is
/// confirming the face wasn't left in a state the flag can't describe —
/// a transfinite-interpolation quad split always yields an even
/// triangle count (two triangles per quad cell).
pub fn validate_quad_override(ts: &Tessellation) -> Result<()> {
    if ts.tfi && ts.n_tris() % 2 != 0 {
        return Err(TessError::Degenerate(
            "quad override set but triangle count is odd".into(),
        ));
    }
    Ok(())
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
                u_min: 0.0,
                u_max: 1.0,
                v_min: 0.0,
                v_max: 1.0,
                periodic: false,
            }
        }
        fn same_thread(&self) -> bool {
            true
        }
    }

    /// A degenerate "pole" fixture: a sliver triangle whose two
    /// boundary vertices are both the `edge_id = -1` isolated node
    /// (same `(kind, edge_param_index)` pair, `uv` nearly coincident),
    /// attached to a normal neighbor.
    fn pole_fixture() -> Tessellation {
        let verts = vec![
            Vertex::node([0.0, 0.0, 1.0], [0.0, 0.0], -1), // pole, copy A
            Vertex::node([1.0, 0.0, 0.0], [1.0, 0.0], 0),
            Vertex::node([0.0, 0.0, 1.0], [0.0, 1.0e-6], -1), // pole, copy B
            Vertex::node([1.0, 1.0, 0.0], [1.0, 1.0], 2),
        ];
        let tris = vec![
            Triangle::new([1, 2, 3], [0, 2, 0]),
            Triangle::new([2, 4, 3], [0, 0, 1]),
        ];
        Tessellation::new(verts, tris, Vec::new(), Orientation::Positive)
    }

    #[test]
    fn zero_area_cleanup_is_a_no_op_on_a_healthy_mesh() {
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
        let face = FlatPlane;
        let n = zero_area_cleanup(&mut ts, &face).unwrap();
        assert_eq!(n, 0);
        assert_eq!(ts.n_tris(), 2);
    }

    #[test]
    fn validate_quad_override_accepts_even_triangle_count() {
        let mut ts = pole_fixture();
        ts.tfi = true;
        validate_quad_override(&ts).unwrap();
    }

    #[test]
    fn validate_quad_override_rejects_odd_triangle_count() {
        let verts = vec![
            Vertex::node([0.0, 0.0, 0.0], [0.0, 0.0], 0),
            Vertex::node([1.0, 0.0, 0.0], [1.0, 0.0], 1),
            Vertex::node([0.0, 1.0, 0.0], [0.0, 1.0], 2),
        ];
        let tris = vec![Triangle::new([1, 2, 3], [0, 0, 0])];
        let mut ts = Tessellation::new(verts, tris, Vec::new(), Orientation::Positive);
        ts.tfi = true;
        assert!(validate_quad_override(&ts).is_err());
    }
}
