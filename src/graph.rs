//! Graph Laplacians from edge lists.
//!
//! The pipeline is edge list → symmetric COO adjacency (sorted by row, then
//! column) → `L = D - A` in CSR form. Format conversion and the sparse
//! subtraction are delegated to `sprs`.

use crate::{Error, Result};
use log::{debug, trace};
use sprs::{CsMat, TriMat};

/// An undirected weighted edge list over vertices `0..n`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeList {
    n: usize,
    edges: Vec<(usize, usize, f64)>,
}

impl EdgeList {
    /// Wrap 0-based edges `(u, v, w)` over `n` vertices.
    pub fn new(n: usize, edges: Vec<(usize, usize, f64)>) -> Result<Self> {
        if let Some(&(u, v, _)) = edges.iter().find(|&&(u, v, _)| u >= n || v >= n) {
            return Err(Error::DimensionMismatch(format!(
                "edge index out of bounds: u={}, v={}, n={}",
                u, v, n
            )));
        }
        if let Some(&(u, v, w)) = edges.iter().find(|&&(_, _, w)| !w.is_finite()) {
            return Err(Error::DimensionMismatch(format!(
                "edge ({u}, {v}) has non-finite weight {w}"
            )));
        }
        Ok(Self { n, edges })
    }

    /// Parse a whitespace-separated edge list.
    ///
    /// The first line is a header and is skipped. Every other non-blank line is
    /// `u v [w]` with 1-based vertex ids; `w` defaults to `1.0`. The vertex count
    /// is the largest id seen.
    ///
    /// ```rust
    /// use meshlap::EdgeList;
    ///
    /// let g = EdgeList::parse("% u v\n1 2\n2 3 0.5\n").unwrap();
    /// assert_eq!(g.n(), 3);
    /// assert_eq!(g.edges(), &[(0, 1, 1.0), (1, 2, 0.5)]);
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut edges = Vec::new();
        let mut n = 0usize;

        for (idx, raw) in text.lines().enumerate().skip(1) {
            let line = idx + 1;
            let fields: Vec<&str> = raw.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 2 || fields.len() > 3 {
                return Err(Error::Parse {
                    line,
                    message: format!("expected `u v [w]`, got {} fields", fields.len()),
                });
            }
            let u = parse_id(fields[0], line)?;
            let v = parse_id(fields[1], line)?;
            let w = match fields.get(2) {
                Some(s) => parse_weight(s, line)?,
                None => 1.0,
            };
            n = n.max(u + 1).max(v + 1);
            edges.push((u, v, w));
        }

        debug!("parsed edge list: {} vertices, {} edges", n, edges.len());
        Ok(Self { n, edges })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn edges(&self) -> &[(usize, usize, f64)] {
        &self.edges
    }

    /// Symmetric adjacency in COO form, sorted by (row, col).
    ///
    /// Each edge `(u, v, w)` inserts both `(u, v)` and `(v, u)` with weight `w`.
    /// Self-loops are skipped. If several edges target the same `(row, col)`, the
    /// **maximum** weight is kept.
    pub fn adjacency(&self) -> TriMat<f64> {
        let mut entries: Vec<(usize, usize, f64)> = Vec::with_capacity(self.edges.len() * 2);
        for &(u, v, w) in &self.edges {
            if u == v {
                continue;
            }
            entries.push((u, v, w));
            entries.push((v, u, w));
        }

        entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut dedup: Vec<(usize, usize, f64)> = Vec::with_capacity(entries.len());
        for (r, c, w) in entries {
            if let Some((pr, pc, pw)) = dedup.last_mut() {
                if *pr == r && *pc == c {
                    if w > *pw {
                        *pw = w;
                    }
                    continue;
                }
            }
            dedup.push((r, c, w));
        }

        let mut adj = TriMat::with_capacity((self.n, self.n), dedup.len());
        for (r, c, w) in dedup {
            adj.add_triplet(r, c, w);
        }
        adj
    }
}

fn parse_weight(s: &str, line: usize) -> Result<f64> {
    let w = s.parse::<f64>().map_err(|e| Error::Parse {
        line,
        message: format!("bad weight {s:?}: {e}"),
    })?;
    if !w.is_finite() {
        return Err(Error::Parse {
            line,
            message: format!("weight {s:?} is not finite"),
        });
    }
    Ok(w)
}

fn parse_id(field: &str, line: usize) -> Result<usize> {
    let id: usize = field.parse().map_err(|e| Error::Parse {
        line,
        message: format!("bad vertex id {field:?}: {e}"),
    })?;
    id.checked_sub(1).ok_or_else(|| Error::Parse {
        line,
        message: "vertex ids are 1-based".to_string(),
    })
}

/// First position where `(row, col)` decreases, if any.
fn first_unsorted(adjacency: &TriMat<f64>) -> Option<usize> {
    let rows = adjacency.row_inds();
    let cols = adjacency.col_inds();
    (1..rows.len()).find(|&i| (rows[i], cols[i]) < (rows[i - 1], cols[i - 1]))
}

/// Per-row sums of a row-sorted COO matrix, plus `shift`.
///
/// One scan; a run of equal row indices is flushed when the row changes. Runs
/// are keyed by their row index, so rows with no entries keep `shift`.
fn shifted_row_sums(adjacency: &TriMat<f64>, n: usize, shift: f64) -> Vec<f64> {
    let mut sums = vec![shift; n];
    let mut run: Option<(usize, f64)> = None;
    for (&row, &val) in adjacency.row_inds().iter().zip(adjacency.data()) {
        run = match run {
            Some((r, acc)) if r == row => Some((r, acc + val)),
            Some((r, acc)) => {
                sums[r] += acc;
                Some((row, val))
            }
            None => Some((row, val)),
        };
    }
    if let Some((r, acc)) = run {
        sums[r] += acc;
    }
    sums
}

/// Graph Laplacian `L = D - A` in CSR form, with `D[i,i] = Σ_j A[i,j] + shift`.
///
/// `shift` regularizes the diagonal uniformly; every eigenvalue of `L` moves up by
/// exactly `shift`.
///
/// # Errors
///
/// - [`Error::DimensionMismatch`] if `adjacency` is not `n × n`.
/// - [`Error::UnsortedInput`] if the triplets are not sorted by (row, col).
///   Nothing is sorted implicitly: a scan over unsorted rows would silently
///   produce wrong degrees.
///
/// # Example
///
/// ```rust
/// use meshlap::{graph_laplacian, EdgeList};
///
/// // Path graph: 0 -- 1 -- 2
/// let g = EdgeList::new(3, vec![(0, 1, 1.0), (1, 2, 1.0)]).unwrap();
/// let lap = graph_laplacian(&g.adjacency(), g.n(), 0.0).unwrap();
/// assert_eq!(lap.get(1, 1), Some(&2.0));
/// assert_eq!(lap.get(0, 1), Some(&-1.0));
/// ```
pub fn graph_laplacian(adjacency: &TriMat<f64>, n: usize, shift: f64) -> Result<CsMat<f64>> {
    if adjacency.shape() != (n, n) {
        return Err(Error::DimensionMismatch(format!(
            "adjacency is {:?}, expected ({n}, {n})",
            adjacency.shape()
        )));
    }
    if let Some(position) = first_unsorted(adjacency) {
        return Err(Error::UnsortedInput { position });
    }

    let degrees = shifted_row_sums(adjacency, n, shift);
    trace!("degrees: {:?}", degrees);

    let diag = TriMat::from_triplets((n, n), (0..n).collect(), (0..n).collect(), degrees);
    let d: CsMat<f64> = diag.to_csr();
    let a: CsMat<f64> = adjacency.to_csr();
    let lap = &d - &a;

    debug!(
        "graph Laplacian: n={}, nnz(A)={}, nnz(L)={}, shift={}",
        n,
        a.nnz(),
        lap.nnz(),
        shift
    );
    Ok(lap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dense_of(m: &CsMat<f64>) -> Vec<Vec<f64>> {
        let mut out = vec![vec![0.0; m.cols()]; m.rows()];
        for (i, row) in m.outer_iterator().enumerate() {
            for (j, &v) in row.iter() {
                out[i][j] += v;
            }
        }
        out
    }

    #[test]
    fn test_laplacian_is_degree_minus_adjacency() {
        crate::test_init();
        // 0 -- 1 -- 2, plus a heavier 0 -- 2 edge.
        let g = EdgeList::new(3, vec![(0, 1, 1.0), (1, 2, 1.0), (0, 2, 2.0)]).unwrap();
        let adj = g.adjacency();
        let lap = dense_of(&graph_laplacian(&adj, 3, 0.0).unwrap());

        let mut a = vec![vec![0.0; 3]; 3];
        for (&v, (r, c)) in adj.triplet_iter() {
            a[r][c] += v;
        }
        for i in 0..3 {
            let degree: f64 = a[i].iter().sum();
            for j in 0..3 {
                let d = if i == j { degree } else { 0.0 };
                assert_eq!(lap[i][j], d - a[i][j], "L[{i}][{j}]");
            }
        }
        assert_eq!(lap[0][0], 3.0);
        assert_eq!(lap[1][1], 2.0);
        assert_eq!(lap[0][2], -2.0);
    }

    #[test]
    fn test_shift_moves_only_the_diagonal() {
        let g = EdgeList::new(4, vec![(0, 1, 1.0), (1, 2, 0.5), (2, 3, 2.0)]).unwrap();
        let adj = g.adjacency();
        let base = dense_of(&graph_laplacian(&adj, 4, 0.0).unwrap());
        let shifted = dense_of(&graph_laplacian(&adj, 4, 0.25).unwrap());
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { base[i][j] + 0.25 } else { base[i][j] };
                assert_eq!(shifted[i][j], expected);
            }
        }
    }

    #[test]
    fn test_empty_row_keeps_its_own_degree() {
        // Vertex 1 is isolated; its row has no adjacency entries.
        let g = EdgeList::new(3, vec![(0, 2, 1.0)]).unwrap();
        let lap = dense_of(&graph_laplacian(&g.adjacency(), 3, 0.5).unwrap());
        assert_eq!(lap[0][0], 1.5);
        assert_eq!(lap[1][1], 0.5);
        assert_eq!(lap[2][2], 1.5);
    }

    #[test]
    fn test_unsorted_adjacency_is_rejected() {
        let mut adj = TriMat::new((3, 3));
        adj.add_triplet(0, 1, 1.0);
        adj.add_triplet(1, 0, 1.0);
        adj.add_triplet(0, 2, 1.0);
        let err = graph_laplacian(&adj, 3, 0.0).unwrap_err();
        assert!(matches!(err, Error::UnsortedInput { position: 2 }));

        // Within a row, columns must ascend too.
        let mut adj = TriMat::new((2, 2));
        adj.add_triplet(0, 1, 1.0);
        adj.add_triplet(0, 0, 1.0);
        assert!(matches!(
            graph_laplacian(&adj, 2, 0.0),
            Err(Error::UnsortedInput { position: 1 })
        ));
    }

    #[test]
    fn test_shape_mismatch() {
        let adj = TriMat::<f64>::new((3, 3));
        assert!(matches!(
            graph_laplacian(&adj, 4, 0.0),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_adjacency_symmetric_sorted_deduplicated() {
        let g = EdgeList::new(3, vec![(1, 0, 0.5), (0, 1, 2.0), (2, 2, 9.0), (2, 1, 1.0)]).unwrap();
        let adj = g.adjacency();
        let triplets: Vec<(usize, usize, f64)> =
            adj.triplet_iter().map(|(&v, (r, c))| (r, c, v)).collect();
        assert_eq!(
            triplets,
            vec![(0, 1, 2.0), (1, 0, 2.0), (1, 2, 1.0), (2, 1, 1.0)]
        );
        assert_eq!(first_unsorted(&adj), None);
    }

    #[test]
    fn test_edge_list_rejects_out_of_range() {
        assert!(matches!(
            EdgeList::new(2, vec![(0, 2, 1.0)]),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_parse_skips_header_and_blank_lines() {
        let g = EdgeList::parse("source target\n1 2\n\n3 1 4.5\n  2 3  \n").unwrap();
        assert_eq!(g.n(), 3);
        assert_eq!(g.edges(), &[(0, 1, 1.0), (2, 0, 4.5), (1, 2, 1.0)]);
    }

    #[test]
    fn test_parse_errors_report_line() {
        let err = EdgeList::parse("header\n1 2\n1 x\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 3, .. }));

        let err = EdgeList::parse("header\n0 1\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));

        let err = EdgeList::parse("header\n1 2 3 4\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));
    }

    #[test]
    fn test_non_finite_weights_are_rejected() {
        for w in ["NaN", "nan", "inf", "-inf"] {
            let text = format!("header\n1 2\n2 3 {w}\n");
            let err = EdgeList::parse(&text).unwrap_err();
            assert!(matches!(err, Error::Parse { line: 3, .. }), "{w}: {err}");
        }
        assert!(matches!(
            EdgeList::new(2, vec![(0, 1, f64::NAN)]),
            Err(Error::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_parse_header_only_is_empty_graph() {
        let g = EdgeList::parse("only a header\n").unwrap();
        assert_eq!(g.n(), 0);
        let lap = graph_laplacian(&g.adjacency(), 0, 0.0).unwrap();
        assert_eq!(lap.nnz(), 0);
    }

    proptest! {
        #[test]
        fn prop_rows_sum_to_shift_and_symmetric(
            n in 2usize..20,
            raw in prop::collection::vec((0usize..20, 0usize..20, 0.1f64..3.0), 0..60),
            shift in 0.0f64..1.0,
        ) {
            let edges: Vec<_> = raw.into_iter().map(|(u, v, w)| (u % n, v % n, w)).collect();
            let g = EdgeList::new(n, edges).unwrap();
            let lap = dense_of(&graph_laplacian(&g.adjacency(), n, shift).unwrap());
            for i in 0..n {
                let s: f64 = lap[i].iter().sum();
                prop_assert!((s - shift).abs() <= 1e-9, "row {} sums to {}", i, s);
                for j in 0..n {
                    prop_assert_eq!(lap[i][j], lap[j][i]);
                }
            }
        }
    }
}
