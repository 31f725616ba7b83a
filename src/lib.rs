//! Incremental surface triangulation refinement for a single parametric
//! B-rep face.
//!
//! Given an already-triangulated boundary loop (a [`store::Tessellation`]
//! built from boundary [`store::Vertex`]/[`store::Triangle`]/
//! [`store::Segment`] data) and a [`face::Face`] implementation the
//! caller supplies to evaluate the underlying surface, [`driver::tessellate`]
//! refines the interior by a fixed sequence of edge-flip and
//! point-insertion phases until the mesh satisfies chord-deviation,
//! facet-normal-agreement, and max-edge-length tolerances carried in
//! [`config::TessConfig`].
//!
//! The engine never constructs the initial boundary triangulation or a
//! concrete CAD-kernel face — those live on the other side of the
//! [`face::Face`] trait seam.

// Documentation lints: the predicate/candidate modules implement a
// dense numerical algorithm where every function already carries a
// doc comment describing its geometric meaning; exhaustive `# Panics`/
// `# Errors` sections would be noise on top of that.
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod barycentric;
pub mod candidates;
pub mod cleanup;
pub mod config;
pub mod constants;
pub mod driver;
pub mod error;
pub mod face;
pub mod geometry;
pub mod insert;
pub mod midpoint_hash;
pub mod predicates;
pub mod store;
pub mod swap;

pub use barycentric::{bary_frame, bary_tess, reconstruct_uv, BaryRecord};
pub use config::{Orientation, TessConfig};
pub use driver::tessellate;
pub use error::{Result, TessError};
pub use face::{Evaluation, Face, FaceRange};
pub use geometry::{in_tri_exact, Containment};
pub use store::{Segment, Tessellation, Triangle, Vertex, VertexKind};
