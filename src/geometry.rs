//! Small 3-vector kernels used by cotangent weighting.

use crate::{Error, Result};
use ndarray::ArrayView1;

/// Relative threshold below which a triangle is treated as having zero area.
pub const DEGENERATE_TOL: f64 = 1e-12;

/// Inner product of two 3-vectors.
#[inline]
pub fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Euclidean norm of `a × b`, i.e. twice the area of the triangle spanned by `a` and `b`.
#[inline]
pub fn cross_norm(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let z = [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ];
    dot(&z, &z).sqrt()
}

/// Component-wise `a - b`.
#[inline]
pub fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Sum of a (possibly strided) 1-D view.
///
/// The stride lives in the view, so the same kernel sums a row or a column of a
/// dense matrix.
#[inline]
pub fn row_sum(values: ArrayView1<'_, f64>) -> f64 {
    values.iter().sum()
}

/// Cotangent of the angle between `a` and `b`.
///
/// `face` is only used to label the error when the two vectors are (nearly)
/// parallel or one of them is zero.
pub fn cotangent(a: &[f64; 3], b: &[f64; 3], face: usize) -> Result<f64> {
    let area2 = cross_norm(a, b);
    let scale = dot(a, a).sqrt() * dot(b, b).sqrt();
    if !(area2 > DEGENERATE_TOL * scale) {
        return Err(Error::DegenerateGeometry { face });
    }
    Ok(dot(a, b) / area2)
}
