//! # meshlap
//!
//! Discrete Laplacians for triangle meshes and graphs, and the two applications
//! built on them: harmonic disk parameterization and spectral partitioning.
//!
//! ## The Core Idea
//!
//! A Laplacian turns unstructured topology (a face list, an edge list) into a
//! sparse operator whose rows sum to zero. Everything downstream, from a
//! boundary-value solve to an eigensolve, inherits any indexing or row-sum
//! mistake made during assembly.
//!
//! ## Key Functions
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`dense_laplacian`] | Dense `nv × nv` combinatorial or cotangent Laplacian |
//! | [`partitioned_laplacian`] | Sparse `L_ii` / `L_ib` blocks for a boundary-first mesh |
//! | [`graph_laplacian`] | CSR `L = D - A` from a sorted COO adjacency |
//! | [`parameterize_disk`] | Harmonic map of a disk-like mesh onto the unit disk |
//! | [`spectral_partition`] | Sign-split of the eigenvector nearest a shift |
//!
//! ## Quick Start
//!
//! ```rust
//! use meshlap::{dense_laplacian, DenseScheme, Mesh};
//!
//! let mesh = Mesh::from_one_based(
//!     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!     &[[1, 2, 3]],
//! )
//! .unwrap();
//!
//! let lap = dense_laplacian(DenseScheme::Combinatorial, &mesh).unwrap();
//! assert_eq!(lap[[0, 0]], 2.0);
//! assert_eq!(lap[[0, 1]], -1.0);
//! ```
//!
//! ## Weighting Schemes
//!
//! ```text
//! Combinatorial (Kirchhoff):   L[i,j] = -1 for every mesh edge
//!   - Ignores geometry
//!   - Shared edges are set, not counted
//!
//! Cotangent:   L[i,j] = -1/2 Σ cot(angle opposite edge ij)
//!   - Geometry-aware, symmetric
//!   - Undefined on zero-area triangles
//! ```
//!
//! ## Boundary-First Ordering
//!
//! The sparse builder assumes the first `nb` vertices are the boundary. Use
//! [`Mesh::reorder_boundary_first`] to establish that before building blocks.
//!
//! ## What Can Go Wrong
//!
//! 1. **Degenerate triangles**: cotangent weights divide by triangle area; a
//!    zero-area face is reported as [`Error::DegenerateGeometry`].
//! 2. **Unsorted adjacency**: row sums are computed by a single scan, so the COO
//!    input must be sorted by (row, col). Violations are [`Error::UnsortedInput`].
//! 3. **Holes**: the disk map needs exactly one boundary loop.
//! 4. **Trivial eigenvector**: shift-invert near `shift` returns the constant
//!    vector, which partitions nothing. Pick `mu0` above the smallest eigenvalue.
//!
//! ## References
//!
//! - Pinkall & Polthier (1993). "Computing discrete minimal surfaces and their conjugates"
//! - Floater (1997). "Parametrization and smooth approximation of surface triangulations"
//! - Fiedler (1973). "Algebraic connectivity of graphs"

use thiserror::Error;

pub mod dense;
pub mod geometry;
pub mod graph;
pub mod harmonic;
pub mod mesh;
pub mod sparse;
pub mod spectral;

pub use dense::{dense_laplacian, DenseScheme};
pub use graph::{graph_laplacian, EdgeList};
pub use harmonic::{map_boundary, parameterize_disk, DiskMap, HarmonicSystem, LinearSolver};
pub use mesh::{Mesh, Reordered};
pub use sparse::{
    partitioned_laplacian, NnzCounts, PartitionedBuilder, PartitionedLaplacian, SparseScheme,
};
pub use spectral::{
    spectral_partition, DenseShiftInvert, EigenPair, Partition, PartitionConfig,
    ShiftInvertEigensolver,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("degenerate triangle at face {face}: zero area")]
    DegenerateGeometry { face: usize },

    #[error("internal inconsistency in {block}: sized {expected} entries, filled {actual}")]
    InternalInconsistency {
        block: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("adjacency is not sorted by (row, col) at entry {position}")]
    UnsortedInput { position: usize },

    #[error("unsupported weighting scheme: {0}")]
    UnsupportedScheme(&'static str),

    #[error("invalid face {face}: {reason}")]
    InvalidFace { face: usize, reason: String },

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("boundary loop of {n_boundary} vertices has zero perimeter")]
    DegenerateBoundary { n_boundary: usize },

    #[error("mesh has no boundary")]
    NoBoundary,

    #[error("boundary is not a single manifold loop (at vertex {vertex})")]
    NonManifoldBoundary { vertex: usize },

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("eigenvalue {value} is the trivial one; move mu0 away from the shift")]
    TrivialEigenpair { value: f64 },

    #[error("solver error: {0}")]
    Solver(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
pub(crate) fn test_init() {
    use std::sync::Once;

    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("debug");
        let _ = env_logger::Builder::from_env(env).is_test(true).try_init();
    });
}
