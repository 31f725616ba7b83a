//! Refinement configuration.

use serde::{Deserialize, Serialize};

/// UV orientation sign: whether the face's parameterization agrees
/// with the surface normal convention its consumers expect.
///
/// An idiomatic tightening of the original's raw `int orUV ∈ {+1,-1}`
/// — `as i32` recovers the literal sign used by the area/orientation
/// formulas in [`crate::predicates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Positive,
    Negative,
}

impl Orientation {
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Orientation::Positive => 1.0,
            Orientation::Negative => -1.0,
        }
    }

    #[must_use]
    pub fn agrees(self, signed_value: f64) -> bool {
        signed_value * self.sign() > 0.0
    }
}

impl From<Orientation> for i32 {
    fn from(o: Orientation) -> i32 {
        match o {
            Orientation::Positive => 1,
            Orientation::Negative => -1,
        }
    }
}

/// Tunables a caller sets before invoking [`crate::driver::tessellate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TessConfig {
    /// Maximum allowed chord (centroid-to-surface) deviation. `0`
    /// disables chord-driven refinement (Phase 2).
    pub chord: f64,
    /// Maximum allowed triangle side length. `0` disables
    /// maxlen-driven refinement (Phases 0/D).
    pub maxlen: f64,
    /// Floor under `eps2`/`devia2` so degenerate boundary segments
    /// don't produce a zero refinement threshold.
    pub minlen: f64,
    /// Minimum acceptable dot product between adjacent facet normals.
    pub dotnrm: f64,
    /// Vertex cap. Positive caps total vertices; negative caps
    /// interior vertices to `|max_pts| - 2`.
    pub max_pts: i32,
    /// Planar-mode shortcut: skips the general ten-phase sequence in
    /// favor of a single swap pass plus longest-side splitting.
    pub planar: bool,
    /// Face UV orientation.
    pub or_uv: Orientation,
}

impl Default for TessConfig {
    fn default() -> Self {
        Self {
            chord: 0.0,
            maxlen: 0.0,
            minlen: 0.0,
            dotnrm: 0.2,
            max_pts: 0,
            planar: false,
            or_uv: Orientation::Positive,
        }
    }
}

impl TessConfig {
    /// Interior-vertex cap implied by `max_pts`, or `None` if uncapped.
    #[must_use]
    pub fn vertex_cap(&self, n_frame_verts: usize) -> Option<usize> {
        if self.max_pts > 0 {
            Some(self.max_pts as usize)
        } else if self.max_pts < 0 {
            Some(n_frame_verts + (-self.max_pts as usize).saturating_sub(2))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_sign_round_trips() {
        assert_eq!(i32::from(Orientation::Positive), 1);
        assert_eq!(i32::from(Orientation::Negative), -1);
    }

    #[test]
    fn vertex_cap_positive_is_absolute() {
        let cfg = TessConfig {
            max_pts: 50,
            ..Default::default()
        };
        assert_eq!(cfg.vertex_cap(10), Some(50));
    }

    #[test]
    fn vertex_cap_negative_is_relative_to_frame() {
        let cfg = TessConfig {
            max_pts: -12,
            ..Default::default()
        };
        assert_eq!(cfg.vertex_cap(10), Some(20));
    }

    #[test]
    fn vertex_cap_zero_is_uncapped() {
        let cfg = TessConfig::default();
        assert_eq!(cfg.vertex_cap(10), None);
    }
}
