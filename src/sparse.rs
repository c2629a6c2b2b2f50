//! Sparse interior/boundary Laplacian blocks.
//!
//! For a mesh whose first `nb` vertices are the boundary, the harmonic system
//! only needs the interior rows of the Laplacian, split by column:
//!
//! ```text
//! [ L_ii  L_ib ] [ u_i ]  =  0
//!                [ u_b ]
//! ```
//!
//! so `L_ii u_i = -L_ib u_b`. Boundary rows are never stored.
//!
//! Assembly is two-phase: [`PartitionedBuilder::reserve_counts`] classifies every
//! directed face edge and returns exact entry counts, then
//! [`PartitionedBuilder::fill`] writes into buffers of exactly that size and
//! checks that it emitted what was reserved.

use crate::mesh::Mesh;
use crate::{Error, Result};
use log::{debug, trace};
use sprs::TriMat;

/// Edge weighting for the partitioned builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SparseScheme {
    /// Unit weights per directed face edge.
    Simple,
    /// Cotangent weights. Not implemented for the partitioned blocks; use
    /// [`crate::dense_laplacian`] with [`crate::DenseScheme::Cotangent`].
    Cotangent,
}

/// Entry counts predicted by the sizing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NnzCounts {
    /// `L_ii` entries, including the `nv - nb` diagonal slots.
    pub interior: usize,
    /// `L_ib` entries.
    pub boundary: usize,
}

/// The interior rows of a mesh Laplacian, split into interior and boundary columns.
///
/// Indices are local: row/column `i` of `interior` and row `i` of `boundary` refer
/// to vertex `nb + i`; column `j` of `boundary` is boundary vertex `j`.
#[derive(Debug)]
pub struct PartitionedLaplacian {
    /// `L_ii`, shape `(nv - nb) × (nv - nb)`.
    pub interior: TriMat<f64>,
    /// `L_ib`, shape `(nv - nb) × nb`.
    pub boundary: TriMat<f64>,
    n_boundary: usize,
}

impl PartitionedLaplacian {
    pub fn n_boundary(&self) -> usize {
        self.n_boundary
    }

    pub fn n_interior(&self) -> usize {
        self.interior.rows()
    }

    /// Row sums of the combined `[L_ii L_ib]` system; all zero for a valid build.
    pub fn interior_row_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_interior()];
        for (&v, (r, _)) in self.interior.triplet_iter() {
            sums[r] += v;
        }
        for (&v, (r, _)) in self.boundary.triplet_iter() {
            sums[r] += v;
        }
        sums
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeClass {
    Interior,
    Boundary,
    Skip,
}

/// Classify the directed edge `row → col`. Boundary rows are not stored.
#[inline]
fn classify(row: usize, col: usize, nb: usize) -> EdgeClass {
    match (row >= nb, col >= nb) {
        (true, true) => EdgeClass::Interior,
        (true, false) => EdgeClass::Boundary,
        (false, _) => EdgeClass::Skip,
    }
}

/// Directed edges `x→y`, `y→z`, `z→x` of every face, in ascending face order.
fn directed_edges(mesh: &Mesh) -> impl Iterator<Item = (usize, usize)> + '_ {
    mesh.faces()
        .iter()
        .flat_map(|f| (0..3).map(move |k| (f[k], f[(k + 1) % 3])))
}

/// Two-phase builder for [`PartitionedLaplacian`].
#[derive(Debug)]
pub struct PartitionedBuilder<'a> {
    mesh: &'a Mesh,
    n_boundary: usize,
}

impl<'a> PartitionedBuilder<'a> {
    /// The first `n_boundary` vertices of `mesh` must be its boundary; this is
    /// relied upon, not checked. See [`Mesh::reorder_boundary_first`].
    pub fn new(scheme: SparseScheme, mesh: &'a Mesh, n_boundary: usize) -> Result<Self> {
        if scheme == SparseScheme::Cotangent {
            return Err(Error::UnsupportedScheme(
                "cotangent weights for partitioned sparse blocks",
            ));
        }
        if n_boundary > mesh.n_vertices() {
            return Err(Error::DimensionMismatch(format!(
                "{} boundary vertices for a mesh of {}",
                n_boundary,
                mesh.n_vertices()
            )));
        }
        Ok(Self { mesh, n_boundary })
    }

    /// Sizing pass: exact entry counts for both blocks.
    pub fn reserve_counts(&self) -> NnzCounts {
        let nb = self.n_boundary;
        let mut counts = NnzCounts {
            interior: self.mesh.n_vertices() - nb,
            boundary: 0,
        };
        for (row, col) in directed_edges(self.mesh) {
            match classify(row, col, nb) {
                EdgeClass::Interior => counts.interior += 1,
                EdgeClass::Boundary => counts.boundary += 1,
                EdgeClass::Skip => {}
            }
        }
        trace!("reserved {:?}", counts);
        counts
    }

    /// Fill pass.
    ///
    /// Each interior→interior edge adds a `-1` to `L_ii`, each interior→boundary
    /// edge a `-1` to `L_ib`, and both add `+1` to the row's diagonal, so every
    /// diagonal ends up as the row's number of outgoing directed edges.
    pub fn fill(&self, counts: NnzCounts) -> Result<PartitionedLaplacian> {
        let nb = self.n_boundary;
        let ni = self.mesh.n_vertices() - nb;

        // The first `ni` interior slots are the diagonal.
        let mut ii_rows: Vec<usize> = Vec::with_capacity(counts.interior);
        let mut ii_cols: Vec<usize> = Vec::with_capacity(counts.interior);
        let mut ii_vals: Vec<f64> = Vec::with_capacity(counts.interior);
        ii_rows.extend(0..ni);
        ii_cols.extend(0..ni);
        ii_vals.resize(ni, 0.0);

        let mut ib_rows: Vec<usize> = Vec::with_capacity(counts.boundary);
        let mut ib_cols: Vec<usize> = Vec::with_capacity(counts.boundary);
        let mut ib_vals: Vec<f64> = Vec::with_capacity(counts.boundary);

        for (row, col) in directed_edges(self.mesh) {
            match classify(row, col, nb) {
                EdgeClass::Interior => {
                    ii_rows.push(row - nb);
                    ii_cols.push(col - nb);
                    ii_vals.push(-1.0);
                    ii_vals[row - nb] += 1.0;
                }
                EdgeClass::Boundary => {
                    ib_rows.push(row - nb);
                    ib_cols.push(col);
                    ib_vals.push(-1.0);
                    ii_vals[row - nb] += 1.0;
                }
                EdgeClass::Skip => {}
            }
        }

        if ib_vals.len() != counts.boundary {
            return Err(Error::InternalInconsistency {
                block: "L_ib",
                expected: counts.boundary,
                actual: ib_vals.len(),
            });
        }
        if ii_vals.len() != counts.interior {
            return Err(Error::InternalInconsistency {
                block: "L_ii",
                expected: counts.interior,
                actual: ii_vals.len(),
            });
        }

        debug!(
            "partitioned Laplacian: {} interior, {} boundary, nnz(L_ii)={}, nnz(L_ib)={}",
            ni,
            nb,
            ii_vals.len(),
            ib_vals.len()
        );

        Ok(PartitionedLaplacian {
            interior: TriMat::from_triplets((ni, ni), ii_rows, ii_cols, ii_vals),
            boundary: TriMat::from_triplets((ni, nb), ib_rows, ib_cols, ib_vals),
            n_boundary: nb,
        })
    }
}

/// Build `L_ii` and `L_ib` for a boundary-first mesh in one call.
///
/// # Errors
///
/// - [`Error::UnsupportedScheme`] for [`SparseScheme::Cotangent`].
/// - [`Error::DimensionMismatch`] if `n_boundary > nv`.
/// - [`Error::InternalInconsistency`] if the fill pass disagrees with the sizing pass.
///
/// # Example
///
/// ```rust
/// use meshlap::{partitioned_laplacian, Mesh, SparseScheme};
///
/// let r = Mesh::grid(3, 3).unwrap().reorder_boundary_first().unwrap();
/// let lap = partitioned_laplacian(SparseScheme::Simple, &r.mesh, r.n_boundary).unwrap();
/// assert_eq!(lap.n_interior(), 1);
/// assert!(lap.interior_row_sums().iter().all(|s| *s == 0.0));
/// ```
pub fn partitioned_laplacian(
    scheme: SparseScheme,
    mesh: &Mesh,
    n_boundary: usize,
) -> Result<PartitionedLaplacian> {
    let builder = PartitionedBuilder::new(scheme, mesh, n_boundary)?;
    let counts = builder.reserve_counts();
    builder.fill(counts)
}
