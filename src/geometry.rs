//! 2D/3D vector algebra primitives used throughout the refinement engine.
//!
//! All geometry here is double precision (`f64`), matching the
//! surface-evaluator contract in [`crate::face::Face`]; this crate never
//! downcasts to `f32`.

use glam::{DVec2, DVec3};

/// Signed area of the 2D triangle `(a, b, c)`, doubled (no `/2`).
///
/// Positive when `a, b, c` wind counter-clockwise. This is the `AREA2D`
/// macro from the original implementation, kept as a free function
/// rather than folded into a method so predicates can call it directly
/// on raw `[f64; 2]` uv pairs without constructing a `DVec2` at every
/// call site.
#[must_use]
pub fn area2d(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (a[0] - c[0]) * (b[1] - c[1]) - (a[1] - c[1]) * (b[0] - c[0])
}

/// Result of an exact-sign barycentric containment test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// `p` is (non-strictly) inside the triangle; signs agree.
    Inside,
    /// All three signed sub-areas are zero; the triangle is degenerate.
    Degenerate,
    /// `p` is strictly outside.
    Outside,
}

/// Exact-sign barycentric inclusion test (`orienTri`-based `inTriExact`,
/// spec.md §4.9).
///
/// Computes the three oriented sub-triangle signed areas of `p` against
/// each edge of `(t0, t1, t2)`. Returns [`Containment::Inside`] if all
/// three signs agree, or agree up to some being exactly zero;
/// [`Containment::Degenerate`] if all three are zero;
/// [`Containment::Outside`] otherwise. `w` is filled with the three
/// unnormalized weights (caller normalizes by their sum when finite).
#[must_use]
pub fn in_tri_exact(t0: [f64; 2], t1: [f64; 2], t2: [f64; 2], p: [f64; 2]) -> (Containment, [f64; 3]) {
    let w = [
        area2d(t1, t2, p),
        area2d(t2, t0, p),
        area2d(t0, t1, p),
    ];

    let pos = w.iter().any(|&x| x > 0.0);
    let neg = w.iter().any(|&x| x < 0.0);

    let containment = if !pos && !neg {
        Containment::Degenerate
    } else if pos && neg {
        Containment::Outside
    } else {
        Containment::Inside
    };
    (containment, w)
}

/// Normalizes a 3-weight barycentric tuple by its sum, in place. No-op
/// if the sum is zero.
pub fn normalize_weights(w: &mut [f64; 3]) {
    let sum = w[0] + w[1] + w[2];
    if sum != 0.0 {
        w[0] /= sum;
        w[1] /= sum;
        w[2] /= sum;
    }
}

/// Squared 3D distance between two points.
#[must_use]
pub fn dist2(a: [f64; 3], b: [f64; 3]) -> f64 {
    DVec3::from(a).distance_squared(DVec3::from(b))
}

/// Unit normal of the 3D triangle `(a, b, c)`, or `None` if degenerate
/// (cross product magnitude below `eps`).
#[must_use]
pub fn tri_normal(a: [f64; 3], b: [f64; 3], c: [f64; 3], eps: f64) -> Option<DVec3> {
    let ab = DVec3::from(b) - DVec3::from(a);
    let ac = DVec3::from(c) - DVec3::from(a);
    let n = ab.cross(ac);
    let len = n.length();
    if len <= eps {
        None
    } else {
        Some(n / len)
    }
}

/// 3D area of the triangle `(a, b, c)` (not doubled).
#[must_use]
pub fn tri_area3d(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    let ab = DVec3::from(b) - DVec3::from(a);
    let ac = DVec3::from(c) - DVec3::from(a);
    0.5 * ab.cross(ac).length()
}

/// UV "angle" of a triangle corner, with the V axis pre-scaled by
/// `v_over_u` so that a non-isotropic parameterization doesn't bias the
/// angle-based swap predicates (spec.md §4.4: "angle measured in UV
/// with V-axis pre-scaled by `VoverU`").
#[must_use]
pub fn uv_corner_angle(prev: [f64; 2], corner: [f64; 2], next: [f64; 2], v_over_u: f64) -> f64 {
    let scale = |p: [f64; 2]| DVec2::new(p[0], p[1] * v_over_u);
    let a = scale(prev) - scale(corner);
    let b = scale(next) - scale(corner);
    let cos_theta = (a.dot(b) / (a.length() * b.length())).clamp(-1.0, 1.0);
    cos_theta.acos()
}

/// Maximum of the three UV corner angles of a triangle.
#[must_use]
pub fn uv_max_angle(uv0: [f64; 2], uv1: [f64; 2], uv2: [f64; 2], v_over_u: f64) -> f64 {
    let a0 = uv_corner_angle(uv2, uv0, uv1, v_over_u);
    let a1 = uv_corner_angle(uv0, uv1, uv2, v_over_u);
    let a2 = uv_corner_angle(uv1, uv2, uv0, v_over_u);
    a0.max(a1).max(a2)
}

/// Squared distance from point `p` to the closest point on segment
/// `(a, b)`, computed in the 2D frame the caller supplies (used for the
/// triangle-local "close to edge" checks of spec.md's `closeEdge`).
#[must_use]
pub fn point_segment_dist2(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f64::EPSILON {
        return p.distance_squared(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    let proj = a + ab * t;
    p.distance_squared(proj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn area2d_antisymmetric_under_swap() {
        let a = [0.0, 0.0];
        let b = [1.0, 0.0];
        let c = [0.0, 1.0];
        assert!(area2d(a, b, c) > 0.0);
        assert!((area2d(a, b, c) + area2d(a, c, b)).abs() < 1e-12);
    }

    #[test]
    fn in_tri_exact_centroid_is_inside() {
        let t0 = [0.0, 0.0];
        let t1 = [1.0, 0.0];
        let t2 = [0.0, 1.0];
        let centroid = [(t0[0] + t1[0] + t2[0]) / 3.0, (t0[1] + t1[1] + t2[1]) / 3.0];
        let (c, mut w) = in_tri_exact(t0, t1, t2, centroid);
        assert_eq!(c, Containment::Inside);
        normalize_weights(&mut w);
        assert!((w[0] + w[1] + w[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn in_tri_exact_outside_point() {
        let t0 = [0.0, 0.0];
        let t1 = [1.0, 0.0];
        let t2 = [0.0, 1.0];
        let (c, _) = in_tri_exact(t0, t1, t2, [5.0, 5.0]);
        assert_eq!(c, Containment::Outside);
    }

    #[test]
    fn in_tri_exact_degenerate_collinear() {
        let (c, _) = in_tri_exact([0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [1.0, 0.0]);
        assert_eq!(c, Containment::Degenerate);
    }

    proptest! {
        #[test]
        fn area2d_swap_negates(ax in -10.0..10.0f64, ay in -10.0..10.0f64,
                                bx in -10.0..10.0f64, by in -10.0..10.0f64,
                                cx in -10.0..10.0f64, cy in -10.0..10.0f64) {
            let a = [ax, ay];
            let b = [bx, by];
            let c = [cx, cy];
            let forward = area2d(a, b, c);
            let swapped = area2d(a, c, b);
            prop_assert!((forward + swapped).abs() < 1e-9);
        }

        #[test]
        fn barycentric_reconstructs_point(
            t0 in (-5.0..5.0f64, -5.0..5.0f64),
            t1 in (-5.0..5.0f64, -5.0..5.0f64),
            t2 in (-5.0..5.0f64, -5.0..5.0f64),
            w0 in 0.01..0.98f64,
            w1 in 0.01..0.98f64,
        ) {
            let w1 = w1.min(0.98 - w0);
            let w2 = 1.0 - w0 - w1;
            prop_assume!(w2 > 0.0);
            let t0 = [t0.0, t0.1];
            let t1 = [t1.0, t1.1];
            let t2 = [t2.0, t2.1];
            // skip near-degenerate triangles
            prop_assume!(area2d(t0, t1, t2).abs() > 1e-3);
            let p = [
                w0 * t0[0] + w1 * t1[0] + w2 * t2[0],
                w0 * t0[1] + w1 * t1[1] + w2 * t2[1],
            ];
            let (containment, mut w) = in_tri_exact(t0, t1, t2, p);
            prop_assert_ne!(containment, Containment::Outside);
            normalize_weights(&mut w);
            let reconstructed = [
                w[0] * t0[0] + w[1] * t1[0] + w[2] * t2[0],
                w[0] * t0[1] + w[1] * t1[1] + w[2] * t2[1],
            ];
            prop_assert!((reconstructed[0] - p[0]).abs() < 1e-6);
            prop_assert!((reconstructed[1] - p[1]).abs() < 1e-6);
        }
    }
}
