//! Spectral graph partitioning.
//!
//! The eigensolve is a seam: anything implementing [`ShiftInvertEigensolver`]
//! can drive [`spectral_partition`]. [`DenseShiftInvert`] is a deterministic,
//! dependency-free reference for small graphs.

use crate::graph::{graph_laplacian, EdgeList};
use crate::{Error, Result};
use log::{debug, info, trace};
use ndarray::Array2;
use sprs::CsMat;

/// One eigenvalue and its unit eigenvector.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenPair {
    pub value: f64,
    pub vector: Vec<f64>,
}

/// Finds the eigenpair of a symmetric sparse matrix whose eigenvalue is closest
/// to a target shift `mu0`.
pub trait ShiftInvertEigensolver {
    fn eigenpair_near(&self, a: &CsMat<f64>, mu0: f64) -> Result<EigenPair>;
}

/// Dense Jacobi eigensolver standing in for shift-invert on small matrices.
///
/// Computes the full spectrum and returns the eigenvalue nearest `mu0`, which is
/// what shift-invert iteration converges to.
#[derive(Debug, Clone)]
pub struct DenseShiftInvert {
    /// Stop when the largest off-diagonal magnitude falls below this.
    pub tol: f64,
    /// Maximum number of cyclic sweeps; each visits every off-diagonal pair once.
    pub max_sweeps: usize,
    /// Refuse matrices larger than this; the dense path is O(n^3).
    pub max_n: usize,
}

impl Default for DenseShiftInvert {
    fn default() -> Self {
        Self {
            tol: 1e-10,
            max_sweeps: 50,
            max_n: 256,
        }
    }
}

fn off_diagonal_max(d: &Array2<f64>) -> f64 {
    let n = d.nrows();
    (0..n)
        .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
        .fold(0.0f64, |acc, (i, j)| acc.max(d[[i, j]].abs()))
}

/// Apply the Jacobi rotation that zeroes `d[p, q]`, accumulating it into `v`.
fn rotate(d: &mut Array2<f64>, v: &mut Array2<f64>, p: usize, q: usize) {
    let n = d.nrows();
    let app = d[[p, p]];
    let aqq = d[[q, q]];
    let apq = d[[p, q]];

    let tau = (aqq - app) / (2.0 * apq);
    let t = tau.signum() / (tau.abs() + (1.0 + tau * tau).sqrt());
    let c = 1.0 / (1.0 + t * t).sqrt();
    let s = t * c;

    for i in (0..n).filter(|&i| i != p && i != q) {
        let dip = d[[i, p]];
        let diq = d[[i, q]];
        d[[i, p]] = c * dip - s * diq;
        d[[p, i]] = d[[i, p]];
        d[[i, q]] = s * dip + c * diq;
        d[[q, i]] = d[[i, q]];
    }
    d[[p, p]] = app - t * apq;
    d[[q, q]] = aqq + t * apq;
    d[[p, q]] = 0.0;
    d[[q, p]] = 0.0;

    for i in 0..n {
        let vip = v[[i, p]];
        let viq = v[[i, q]];
        v[[i, p]] = c * vip - s * viq;
        v[[i, q]] = s * vip + c * viq;
    }
}

/// Cyclic Jacobi eigenvalue algorithm for symmetric matrices.
///
/// A sweep rotates away every upper off-diagonal entry in row order. Returns
/// `(eigenvalues, eigenvectors)` with eigenvectors as columns, or `None` if an
/// off-diagonal entry is still above `tol` after `max_sweeps` sweeps.
fn jacobi_eigh(a: &Array2<f64>, tol: f64, max_sweeps: usize) -> Option<(Vec<f64>, Array2<f64>)> {
    let n = a.nrows();
    let mut d = a.to_owned();
    let mut v = Array2::<f64>::eye(n);

    for sweep in 0..max_sweeps {
        if off_diagonal_max(&d) <= tol {
            trace!("jacobi converged after {sweep} sweeps");
            return Some((d.diag().to_vec(), v));
        }
        for p in 0..n {
            for q in (p + 1)..n {
                if d[[p, q]] != 0.0 {
                    rotate(&mut d, &mut v, p, q);
                }
            }
        }
    }
    (off_diagonal_max(&d) <= tol).then(|| (d.diag().to_vec(), v))
}

impl ShiftInvertEigensolver for DenseShiftInvert {
    fn eigenpair_near(&self, a: &CsMat<f64>, mu0: f64) -> Result<EigenPair> {
        let (n, m) = a.shape();
        if n != m {
            return Err(Error::DimensionMismatch(format!("matrix is not square: {n} x {m}")));
        }
        if n == 0 || n > self.max_n {
            return Err(Error::DimensionMismatch(format!(
                "dense eigensolve supports 1..={} rows, got {n}",
                self.max_n
            )));
        }

        let mut dense = Array2::<f64>::zeros((n, n));
        for (&v, (i, j)) in a.iter() {
            dense[[i, j]] += v;
        }
        if let Some((i, j)) = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| (i, j)))
            .find(|&(i, j)| (dense[[i, j]] - dense[[j, i]]).abs() > self.tol)
        {
            return Err(Error::Solver(format!("matrix is not symmetric at ({i}, {j})")));
        }

        let (eigvals, eigvecs) =
            jacobi_eigh(&dense, self.tol, self.max_sweeps).ok_or_else(|| {
                Error::Solver(format!(
                    "jacobi did not converge to {} within {} sweeps",
                    self.tol, self.max_sweeps
                ))
            })?;
        trace!("eigenvalues: {:?}", eigvals);

        let idx = (0..n)
            .min_by(|&i, &j| (eigvals[i] - mu0).abs().total_cmp(&(eigvals[j] - mu0).abs()))
            .ok_or_else(|| Error::Solver("empty spectrum".to_string()))?;

        let mut vector = eigvecs.column(idx).to_vec();
        let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
        if !(norm > 0.0) {
            return Err(Error::Solver("zero eigenvector".to_string()));
        }
        // Sign convention: the first clearly nonzero component is positive.
        let flip = vector
            .iter()
            .find(|x| x.abs() > 1e-8 * norm)
            .is_some_and(|&x| x < 0.0);
        let scale = if flip { -1.0 / norm } else { 1.0 / norm };
        vector.iter_mut().for_each(|x| *x *= scale);

        Ok(EigenPair {
            value: eigvals[idx],
            vector,
        })
    }
}

/// Configuration for [`spectral_partition`].
#[derive(Debug, Clone)]
pub struct PartitionConfig {
    /// Target eigenvalue for the shift-invert solve.
    ///
    /// Must sit closer to the Fiedler value than to `shift`, otherwise the solver
    /// returns the constant vector.
    pub mu0: f64,
    /// Added to every diagonal entry of the Laplacian.
    pub shift: f64,
    /// An eigenvalue within this distance of `shift` is treated as the trivial one.
    pub trivial_tol: f64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            mu0: 0.005,
            shift: 0.0,
            trivial_tol: 1e-8,
        }
    }
}

/// Two-way split of a graph's vertices.
#[derive(Debug, Clone)]
pub struct Partition {
    pub eigenvalue: f64,
    pub vector: Vec<f64>,
    /// `true` where the eigenvector component is positive.
    pub sides: Vec<bool>,
}

impl Partition {
    /// Number of (non-loop) edges whose endpoints land on different sides.
    pub fn cut_size(&self, edges: &EdgeList) -> usize {
        edges
            .edges()
            .iter()
            .filter(|&&(u, v, _)| u != v && self.sides[u] != self.sides[v])
            .count()
    }

    /// `(positive, non-positive)` side sizes.
    pub fn side_sizes(&self) -> (usize, usize) {
        let pos = self.sides.iter().filter(|&&s| s).count();
        (pos, self.sides.len() - pos)
    }
}

/// Bisect a graph by the sign of the eigenvector nearest `cfg.mu0`.
///
/// # Example
///
/// ```rust
/// use meshlap::{spectral_partition, DenseShiftInvert, EdgeList, PartitionConfig};
///
/// // Path 0 - 1 - 2 - 3: the Fiedler value is 2 - √2.
/// let g = EdgeList::new(4, vec![(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]).unwrap();
/// let cfg = PartitionConfig { mu0: 0.5, ..Default::default() };
/// let p = spectral_partition(&g, &cfg, &DenseShiftInvert::default()).unwrap();
/// assert_eq!(p.sides, vec![true, true, false, false]);
/// ```
pub fn spectral_partition<S: ShiftInvertEigensolver + ?Sized>(
    edges: &EdgeList,
    cfg: &PartitionConfig,
    solver: &S,
) -> Result<Partition> {
    info!(
        "spectral partition: {} vertices, {} edges, mu0={}, shift={}",
        edges.n(),
        edges.edges().len(),
        cfg.mu0,
        cfg.shift
    );
    let lap = graph_laplacian(&edges.adjacency(), edges.n(), cfg.shift)?;
    let pair = solver.eigenpair_near(&lap, cfg.mu0)?;

    if pair.vector.len() != edges.n() {
        return Err(Error::Solver(format!(
            "eigenvector has {} entries, expected {}",
            pair.vector.len(),
            edges.n()
        )));
    }
    if (pair.value - cfg.shift).abs() <= cfg.trivial_tol {
        return Err(Error::TrivialEigenpair { value: pair.value });
    }

    let sides: Vec<bool> = pair.vector.iter().map(|&x| x > 0.0).collect();
    let partition = Partition {
        eigenvalue: pair.value,
        vector: pair.vector,
        sides,
    };
    debug!(
        "eigenvalue {} splits {:?}",
        partition.eigenvalue,
        partition.side_sizes()
    );
    Ok(partition)
}
