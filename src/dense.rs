//! Dense `nv × nv` mesh Laplacians.

use crate::geometry::{cotangent, row_sum, sub};
use crate::mesh::Mesh;
use crate::Result;
use log::debug;
use ndarray::{Array2, Axis};

#[cfg(feature = "parallel")]
use ndarray::parallel::prelude::*;

/// Edge weighting for the dense builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenseScheme {
    /// Unit weights. Edges shared by two faces are set, not counted.
    Combinatorial,
    /// Half-cotangent weights of the angles opposite each edge.
    Cotangent,
}

/// Build the dense Laplacian of `mesh`.
///
/// Faces are visited in ascending index, which fixes the floating-point
/// accumulation order of the cotangent scheme.
///
/// # Properties
///
/// - Every row sums to zero: the diagonal is set from the off-diagonal row sum
///   in a final pass.
/// - `Combinatorial`: off-diagonal entries are 0 or -1.
/// - `Cotangent`: symmetric.
///
/// # Errors
///
/// [`crate::Error::DegenerateGeometry`] if a cotangent face has zero area.
///
/// # Example
///
/// ```rust
/// use meshlap::{dense_laplacian, DenseScheme, Mesh};
///
/// let mesh = Mesh::grid(3, 3).unwrap();
/// let lap = dense_laplacian(DenseScheme::Cotangent, &mesh).unwrap();
/// assert!(lap.row(4).sum().abs() < 1e-12);
/// ```
pub fn dense_laplacian(scheme: DenseScheme, mesh: &Mesh) -> Result<Array2<f64>> {
    let nv = mesh.n_vertices();
    let mut l = Array2::<f64>::zeros((nv, nv));

    match scheme {
        DenseScheme::Combinatorial => {
            for &[x, y, z] in mesh.faces() {
                l[[x, y]] = -1.0;
                l[[y, z]] = -1.0;
                l[[z, x]] = -1.0;
                l[[y, x]] = -1.0;
                l[[z, y]] = -1.0;
                l[[x, z]] = -1.0;
            }
        }
        DenseScheme::Cotangent => {
            let v = mesh.vertices();
            for (f, &[x, y, z]) in mesh.faces().iter().enumerate() {
                let v_ki = sub(&v[x], &v[z]);
                let v_kj = sub(&v[y], &v[z]);
                let v_ij = sub(&v[y], &v[x]);

                // Edge (x, y) is opposite z.
                l[[x, y]] += -0.5 * cotangent(&v_ki, &v_kj, f)?;
                l[[y, x]] = l[[x, y]];
                // Edge (y, z) is opposite x; v_ij and v_ki point away from and into x.
                l[[y, z]] += 0.5 * cotangent(&v_ij, &v_ki, f)?;
                l[[z, y]] = l[[y, z]];
                // Edge (z, x) is opposite y.
                l[[z, x]] += -0.5 * cotangent(&v_kj, &v_ij, f)?;
                l[[x, z]] = l[[z, x]];
            }
        }
    }

    fix_diagonal(&mut l);

    debug!(
        "dense {:?} Laplacian: {} vertices, {} faces",
        scheme,
        nv,
        mesh.n_faces()
    );
    Ok(l)
}

/// `L[i,i] = -Σ_{j≠i} L[i,j]`. Faces never repeat a vertex, so the diagonal is
/// still zero here.
#[cfg(not(feature = "parallel"))]
fn fix_diagonal(l: &mut Array2<f64>) {
    for (i, mut row) in l.axis_iter_mut(Axis(0)).enumerate() {
        let sum = row_sum(row.view());
        row[i] = -sum;
    }
}

#[cfg(feature = "parallel")]
fn fix_diagonal(l: &mut Array2<f64>) {
    l.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(i, mut row)| {
            let sum = row_sum(row.view());
            row[i] = -sum;
        });
}
