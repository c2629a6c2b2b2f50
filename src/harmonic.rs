//! Harmonic disk parameterization.
//!
//! Boundary vertices are pinned to the unit circle by arc length; interior
//! vertices solve `L_ii u_i = -L_ib u_b` once per coordinate. The linear solve is
//! supplied by the caller through [`LinearSolver`].

use crate::geometry::{dot, sub};
use crate::mesh::Mesh;
use crate::sparse::{partitioned_laplacian, PartitionedLaplacian, SparseScheme};
use crate::{Error, Result};
use log::{debug, info};
use ndarray::{s, Array2, ArrayView2};
use sprs::CsMat;
use std::f64::consts::PI;

/// A sparse linear solver for `A x = b`.
pub trait LinearSolver {
    fn solve(&self, a: &CsMat<f64>, b: &[f64]) -> Result<Vec<f64>>;
}

/// Place the boundary loop `0..n_boundary` on the unit circle.
///
/// Vertex `k` goes to angle `2π s_k / S`, where `s_k` is the arc length from
/// vertex 0 along the loop and `S` the perimeter. Returns an `n_boundary × 2` array.
pub fn map_boundary(mesh: &Mesh, n_boundary: usize) -> Result<Array2<f64>> {
    if n_boundary < 3 || n_boundary > mesh.n_vertices() {
        return Err(Error::DimensionMismatch(format!(
            "boundary loop needs 3..={} vertices, got {}",
            mesh.n_vertices(),
            n_boundary
        )));
    }
    let v = &mesh.vertices()[..n_boundary];

    let dist = |a: &[f64; 3], b: &[f64; 3]| {
        let d = sub(a, b);
        dot(&d, &d).sqrt()
    };

    let mut arc = vec![0.0; n_boundary];
    for k in 1..n_boundary {
        arc[k] = arc[k - 1] + dist(&v[k], &v[k - 1]);
    }
    let perimeter = arc[n_boundary - 1] + dist(&v[0], &v[n_boundary - 1]);
    if !(perimeter > 0.0) {
        return Err(Error::DegenerateBoundary { n_boundary });
    }

    let mut uv = Array2::<f64>::zeros((n_boundary, 2));
    for (k, mut row) in uv.rows_mut().into_iter().enumerate() {
        let theta = 2.0 * PI * arc[k] / perimeter;
        row[0] = theta.cos();
        row[1] = theta.sin();
    }
    Ok(uv)
}

/// The interior system `L_ii U_i = -L_ib U_b` for both texture coordinates.
#[derive(Debug, Clone)]
pub struct HarmonicSystem {
    interior: CsMat<f64>,
    rhs: Array2<f64>,
    boundary_uv: Array2<f64>,
}

impl HarmonicSystem {
    /// Combine the partitioned blocks with fixed boundary coordinates
    /// (`n_boundary × 2`).
    pub fn assemble(lap: &PartitionedLaplacian, boundary_uv: Array2<f64>) -> Result<Self> {
        let nb = lap.n_boundary();
        if boundary_uv.dim() != (nb, 2) {
            return Err(Error::DimensionMismatch(format!(
                "boundary coordinates are {:?}, expected ({nb}, 2)",
                boundary_uv.dim()
            )));
        }

        let mut rhs = Array2::<f64>::zeros((lap.n_interior(), 2));
        for (&w, (i, j)) in lap.boundary.triplet_iter() {
            rhs[[i, 0]] -= w * boundary_uv[[j, 0]];
            rhs[[i, 1]] -= w * boundary_uv[[j, 1]];
        }

        Ok(Self {
            interior: lap.interior.to_csr(),
            rhs,
            boundary_uv,
        })
    }

    pub fn interior(&self) -> &CsMat<f64> {
        &self.interior
    }

    /// `-L_ib U_b`, one column per coordinate.
    pub fn rhs(&self) -> ArrayView2<'_, f64> {
        self.rhs.view()
    }

    /// Solve both coordinates and return all `nv × 2` coordinates, boundary first.
    pub fn solve<S: LinearSolver + ?Sized>(&self, solver: &S) -> Result<Array2<f64>> {
        let nb = self.boundary_uv.nrows();
        let ni = self.rhs.nrows();
        let mut uv = Array2::<f64>::zeros((nb + ni, 2));
        uv.slice_mut(s![..nb, ..]).assign(&self.boundary_uv);

        for c in 0..2 {
            let b = self.rhs.column(c).to_vec();
            let x = solver.solve(&self.interior, &b)?;
            if x.len() != ni {
                return Err(Error::Solver(format!(
                    "solution has {} entries, expected {}",
                    x.len(),
                    ni
                )));
            }
            for (i, xi) in x.into_iter().enumerate() {
                uv[[nb + i, c]] = xi;
            }
        }
        Ok(uv)
    }
}

/// Result of [`parameterize_disk`].
#[derive(Debug, Clone)]
pub struct DiskMap {
    /// The input mesh, reordered boundary-first.
    pub mesh: Mesh,
    pub n_boundary: usize,
    /// `permutation[new] = old`.
    pub permutation: Vec<usize>,
    /// Disk coordinates in the reordered vertex order.
    pub uv: Array2<f64>,
}

impl DiskMap {
    /// Disk coordinates indexed by the original vertex ids.
    pub fn uv_by_original(&self) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros(self.uv.dim());
        for (new, &old) in self.permutation.iter().enumerate() {
            out.row_mut(old).assign(&self.uv.row(new));
        }
        out
    }
}

/// Map a disk-like mesh harmonically onto the unit disk.
///
/// Steps: detect and reorder the boundary loop, pin it to the circle, build the
/// partitioned Laplacian, and solve the interior with `solver`.
pub fn parameterize_disk<S: LinearSolver + ?Sized>(
    mesh: &Mesh,
    scheme: SparseScheme,
    solver: &S,
) -> Result<DiskMap> {
    info!(
        "parameterizing mesh with {} vertices, {} faces",
        mesh.n_vertices(),
        mesh.n_faces()
    );
    let reordered = mesh.reorder_boundary_first()?;
    let nb = reordered.n_boundary;
    let boundary_uv = map_boundary(&reordered.mesh, nb)?;

    let uv = if nb == reordered.mesh.n_vertices() {
        debug!("no interior vertices; boundary map is the whole map");
        boundary_uv
    } else {
        let lap = partitioned_laplacian(scheme, &reordered.mesh, nb)?;
        HarmonicSystem::assemble(&lap, boundary_uv)?.solve(solver)?
    };

    info!("harmonic map done: {} boundary, {} interior", nb, uv.nrows() - nb);
    Ok(DiskMap {
        mesh: reordered.mesh,
        n_boundary: nb,
        permutation: reordered.permutation,
        uv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::fixtures::{jittered_grid, triangle};

    /// Gaussian elimination with partial pivoting on the densified matrix.
    struct DenseLu;

    impl LinearSolver for DenseLu {
        fn solve(&self, a: &CsMat<f64>, b: &[f64]) -> Result<Vec<f64>> {
            let n = b.len();
            let mut m = vec![vec![0.0; n + 1]; n];
            for (i, row) in a.outer_iterator().enumerate() {
                for (j, &v) in row.iter() {
                    m[i][j] += v;
                }
                m[i][n] = b[i];
            }
            for col in 0..n {
                let pivot = (col..n)
                    .max_by(|&x, &y| m[x][col].abs().total_cmp(&m[y][col].abs()))
                    .unwrap();
                if m[pivot][col].abs() < 1e-14 {
                    return Err(Error::Solver("singular matrix".into()));
                }
                m.swap(col, pivot);
                for r in col + 1..n {
                    let f = m[r][col] / m[col][col];
                    for k in col..=n {
                        let p = m[col][k];
                        m[r][k] -= f * p;
                    }
                }
            }
            let mut x = vec![0.0; n];
            for i in (0..n).rev() {
                let tail: f64 = (i + 1..n).map(|k| m[i][k] * x[k]).sum();
                x[i] = (m[i][n] - tail) / m[i][i];
            }
            Ok(x)
        }
    }

    struct Truncating;

    impl LinearSolver for Truncating {
        fn solve(&self, _a: &CsMat<f64>, b: &[f64]) -> Result<Vec<f64>> {
            Ok(b[..b.len().saturating_sub(1)].to_vec())
        }
    }

    #[test]
    fn test_map_boundary_square_hits_quarter_turns() {
        let mesh = Mesh::grid(2, 2).unwrap().reorder_boundary_first().unwrap().mesh;
        let uv = map_boundary(&mesh, 4).unwrap();
        let expected = [[1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]];
        for (k, e) in expected.iter().enumerate() {
            assert!((uv[[k, 0]] - e[0]).abs() < 1e-12);
            assert!((uv[[k, 1]] - e[1]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_map_boundary_rejects_short_loops() {
        assert!(matches!(
            map_boundary(&triangle(), 2),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_map_boundary_collapsed_loop() {
        let mesh = Mesh::new(vec![[1.0, 2.0, 3.0]; 3], vec![[0, 1, 2]]).unwrap();
        assert!(matches!(
            map_boundary(&mesh, 3),
            Err(Error::DegenerateBoundary { n_boundary: 3 })
        ));
    }

    #[test]
    fn test_centre_of_symmetric_grid_maps_to_origin() {
        crate::test_init();
        let mesh = Mesh::grid(3, 3).unwrap();
        let map = parameterize_disk(&mesh, SparseScheme::Simple, &DenseLu).unwrap();
        assert_eq!(map.n_boundary, 8);
        let centre = map.uv.row(8);
        assert!(centre[0].abs() < 1e-12 && centre[1].abs() < 1e-12);

        // In original numbering the centre is vertex 4.
        let by_original = map.uv_by_original();
        assert_eq!(by_original.row(4), centre);
        assert_eq!(by_original.row(0), map.uv.row(0));
    }

    #[test]
    fn test_interior_lands_strictly_inside_disk() {
        let mesh = jittered_grid(6, 5, &[[0.1, -0.15, 0.4], [-0.2, 0.05, -0.3]]);
        let map = parameterize_disk(&mesh, SparseScheme::Simple, &DenseLu).unwrap();
        for k in 0..map.n_boundary {
            let r = map.uv[[k, 0]].hypot(map.uv[[k, 1]]);
            assert!((r - 1.0).abs() < 1e-12);
        }
        for k in map.n_boundary..map.uv.nrows() {
            let r = map.uv[[k, 0]].hypot(map.uv[[k, 1]]);
            assert!(r < 1.0, "interior vertex {k} at radius {r}");
        }
    }

    #[test]
    fn test_interior_rows_are_neighbour_averages() {
        let mesh = Mesh::grid(4, 4).unwrap();
        let map = parameterize_disk(&mesh, SparseScheme::Simple, &DenseLu).unwrap();
        let lap = partitioned_laplacian(SparseScheme::Simple, &map.mesh, map.n_boundary).unwrap();

        // [L_ii L_ib] applied to the full solution vanishes on every interior row.
        let nb = map.n_boundary;
        let mut residual = Array2::<f64>::zeros((lap.n_interior(), 2));
        for (&w, (i, j)) in lap.interior.triplet_iter() {
            for c in 0..2 {
                residual[[i, c]] += w * map.uv[[nb + j, c]];
            }
        }
        for (&w, (i, j)) in lap.boundary.triplet_iter() {
            for c in 0..2 {
                residual[[i, c]] += w * map.uv[[j, c]];
            }
        }
        assert!(residual.iter().all(|r| r.abs() < 1e-10));
    }

    #[test]
    fn test_triangle_has_no_interior() {
        let map = parameterize_disk(&triangle(), SparseScheme::Simple, &DenseLu).unwrap();
        assert_eq!(map.uv.dim(), (3, 2));
        assert_eq!(map.n_boundary, 3);
    }

    #[test]
    fn test_solver_output_length_is_checked() {
        let mesh = Mesh::grid(4, 4).unwrap();
        let err = parameterize_disk(&mesh, SparseScheme::Simple, &Truncating).unwrap_err();
        assert!(matches!(err, Error::Solver(_)));
    }

    #[test]
    fn test_cotangent_scheme_propagates_unsupported() {
        let mesh = Mesh::grid(3, 3).unwrap();
        let err = parameterize_disk(&mesh, SparseScheme::Cotangent, &DenseLu).unwrap_err();
        assert!(matches!(err, Error::UnsupportedScheme(_)));
    }

    #[test]
    fn test_assemble_checks_boundary_shape() {
        let r = Mesh::grid(3, 3).unwrap().reorder_boundary_first().unwrap();
        let lap = partitioned_laplacian(SparseScheme::Simple, &r.mesh, r.n_boundary).unwrap();
        let err = HarmonicSystem::assemble(&lap, Array2::zeros((3, 2))).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch(_)));

        let sys = HarmonicSystem::assemble(&lap, Array2::ones((8, 2))).unwrap();
        // Six boundary neighbours at (1, 1): rhs = -(-1) * 6.
        assert_eq!(sys.rhs()[[0, 0]], 6.0);
        assert_eq!(sys.interior().nnz(), 1);
    }
}
