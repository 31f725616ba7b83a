//! Crate-wide control constants.
//!
//! These are fixed by the refinement algorithm itself, not tunable
//! configuration — see [`crate::config::TessConfig`] for the knobs a
//! caller is expected to set.

/// Flood-fill depth used to mark a neighborhood ineligible after an
/// insertion so nearby candidates aren't immediately re-picked.
pub const FLOOD_DEPTH: i32 = 6;

/// Angle tolerance used by the swap predicates (radians).
pub const ANG_TOL: f64 = 1.0e-6;

/// Chord-deviation candidate UV-angle cutoff (radians).
pub const DEV_ANG: f64 = 2.65;

/// `breakTri` / `addFacetNorm` UV-angle cutoff (radians).
pub const CUT_ANG: f64 = 3.10;

/// Maximum acceptable UV angle in a triangle before it is excluded from
/// further candidate selection (radians).
pub const MAX_ANG: f64 = 3.13;

/// Once `or_cnt` exceeds this many wrong-orientation incidents, the
/// driver aborts further insertion phases.
pub const MAX_OR_CNT: u32 = 500;

/// Default chunk size used when growing the midpoint hash table.
pub const CHUNK: usize = 256;

/// Maximum number of sweeps a single `swap_tris` call will run before
/// giving up.
pub const MAX_SWAP_SWEEPS: u32 = 200;

/// Table of primes just below `2^n` for `n = 7..31`, used to size the
/// midpoint hash table. Kept as a literal table rather than computed
/// so hash bucket sizing and collision behavior are reproducible and
/// easy to reason about in tests.
pub const PRIME_TABLE: [u32; 25] = [
    127, 251, 509, 1021, 2039, 4093, 8191, 16381, 32749, 65521, 131_071, 262_139, 524_287,
    1_048_573, 2_097_143, 4_194_301, 8_388_593, 16_777_213, 33_554_393, 67_108_859, 134_217_689,
    268_435_399, 536_870_909, 1_073_741_789, 2_147_483_647,
];

/// Side-to-vertex-endpoint table: `SIDES[s]` gives the indices (into a
/// triangle's `v` array) of the two endpoints of side `s`, where side
/// `s` is the edge opposite vertex `s`.
pub const SIDES: [[usize; 2]; 3] = [[1, 2], [2, 0], [0, 1]];

/// Scratch `phase` sentinel: ordinary operation, no special-casing.
pub const PHASE_NORMAL: i32 = 0;

/// Scratch `phase` sentinel: a midpoint about to be flipped away
/// should be promoted into the hash before the swap mutates it.
pub const PHASE_TO_BE_FILLED: i32 = -2;

/// Scratch `phase` sentinel: planar-mode refinement, which skips the
/// dihedral guard in the `ang_xyz` swap predicate.
pub const PHASE_PLANAR: i32 = -3;
