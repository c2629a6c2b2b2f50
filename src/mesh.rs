//! Triangle meshes: index normalization, boundary detection, boundary-first reordering.
//!
//! Face indices are 0-based everywhere inside this crate. The external 1-based
//! layout is converted once, in [`Mesh::from_one_based`] or
//! [`Mesh::from_column_major`], and never carried further.

use crate::{Error, Result};
use log::{debug, trace};
use std::collections::{BTreeMap, HashMap};

/// An immutable triangle mesh with validated, 0-based faces.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<[f64; 3]>,
    faces: Vec<[usize; 3]>,
}

/// A mesh reordered so that its boundary loop occupies indices `0..n_boundary`.
#[derive(Debug, Clone)]
pub struct Reordered {
    pub mesh: Mesh,
    pub n_boundary: usize,
    /// `permutation[new] = old`.
    pub permutation: Vec<usize>,
}

impl Mesh {
    /// Build a mesh from 0-based faces.
    ///
    /// Every index must be `< vertices.len()` and no face may repeat a vertex.
    pub fn new(vertices: Vec<[f64; 3]>, faces: Vec<[usize; 3]>) -> Result<Self> {
        let nv = vertices.len();
        for (f, face) in faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&v| v >= nv) {
                return Err(Error::InvalidFace {
                    face: f,
                    reason: format!("vertex index {bad} out of range for {nv} vertices"),
                });
            }
            if face[0] == face[1] || face[1] == face[2] || face[2] == face[0] {
                return Err(Error::InvalidFace {
                    face: f,
                    reason: format!("repeated vertex in {face:?}"),
                });
            }
        }
        Ok(Self { vertices, faces })
    }

    /// Build a mesh from faces using 1-based vertex ids.
    pub fn from_one_based(vertices: Vec<[f64; 3]>, faces: &[[usize; 3]]) -> Result<Self> {
        let mut normalized = Vec::with_capacity(faces.len());
        for (f, face) in faces.iter().enumerate() {
            let mut out = [0usize; 3];
            for (slot, &v) in out.iter_mut().zip(face) {
                *slot = v.checked_sub(1).ok_or_else(|| Error::InvalidFace {
                    face: f,
                    reason: "vertex id 0 in 1-based face list".to_string(),
                })?;
            }
            normalized.push(out);
        }
        Self::new(vertices, normalized)
    }

    /// Build a mesh from the column-major arrays a mesh reader hands over.
    ///
    /// `v[k * nv + i]` is coordinate `k` of vertex `i`; `f[k * nf + i]` is the
    /// 1-based vertex id at corner `k` of face `i`.
    pub fn from_column_major(nv: usize, nf: usize, v: &[f64], f: &[usize]) -> Result<Self> {
        if v.len() != 3 * nv {
            return Err(Error::DimensionMismatch(format!(
                "expected {} vertex coordinates, got {}",
                3 * nv,
                v.len()
            )));
        }
        if f.len() != 3 * nf {
            return Err(Error::DimensionMismatch(format!(
                "expected {} face indices, got {}",
                3 * nf,
                f.len()
            )));
        }
        let vertices = (0..nv)
            .map(|i| [v[i], v[nv + i], v[2 * nv + i]])
            .collect();
        let faces: Vec<[usize; 3]> = (0..nf)
            .map(|i| [f[i], f[nf + i], f[2 * nf + i]])
            .collect();
        Self::from_one_based(vertices, &faces)
    }

    /// A flat `nx × ny` grid on the unit-spaced lattice, two counter-clockwise
    /// triangles per cell. Vertex `(i, j)` has index `j * nx + i`.
    pub fn grid(nx: usize, ny: usize) -> Result<Self> {
        if nx < 2 || ny < 2 {
            return Err(Error::DimensionMismatch(format!(
                "grid needs at least 2x2 vertices, got {nx}x{ny}"
            )));
        }
        let mut vertices = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                vertices.push([i as f64, j as f64, 0.0]);
            }
        }
        let mut faces = Vec::with_capacity(2 * (nx - 1) * (ny - 1));
        for j in 0..ny - 1 {
            for i in 0..nx - 1 {
                let a = j * nx + i;
                let b = a + 1;
                let c = a + nx;
                let d = c + 1;
                faces.push([a, b, d]);
                faces.push([a, d, c]);
            }
        }
        Self::new(vertices, faces)
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Ordered boundary loop.
    ///
    /// Boundary edges are the undirected edges used by exactly one face; each keeps
    /// the direction it has in that face. The walk starts at the smallest boundary
    /// vertex. Only single-loop (disk-like) boundaries are accepted.
    pub fn boundary_loop(&self) -> Result<Vec<usize>> {
        let mut uses: HashMap<(usize, usize), usize> = HashMap::new();
        for face in &self.faces {
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                *uses.entry((a.min(b), a.max(b))).or_insert(0) += 1;
            }
        }

        let mut next: BTreeMap<usize, usize> = BTreeMap::new();
        for face in &self.faces {
            for k in 0..3 {
                let (a, b) = (face[k], face[(k + 1) % 3]);
                if uses[&(a.min(b), a.max(b))] != 1 {
                    continue;
                }
                if next.insert(a, b).is_some() {
                    return Err(Error::NonManifoldBoundary { vertex: a });
                }
            }
        }

        let Some((&start, _)) = next.iter().next() else {
            return Err(Error::NoBoundary);
        };

        let mut boundary = Vec::with_capacity(next.len());
        let mut cur = start;
        loop {
            boundary.push(cur);
            cur = *next
                .get(&cur)
                .ok_or(Error::NonManifoldBoundary { vertex: cur })?;
            if cur == start {
                break;
            }
            if boundary.len() > next.len() {
                return Err(Error::NonManifoldBoundary { vertex: cur });
            }
        }

        if boundary.len() != next.len() {
            // A second loop (a hole) or a pinched boundary.
            let mut on_loop = vec![false; self.n_vertices()];
            for &v in &boundary {
                on_loop[v] = true;
            }
            let vertex = next
                .keys()
                .copied()
                .find(|&v| !on_loop[v])
                .unwrap_or(start);
            return Err(Error::NonManifoldBoundary { vertex });
        }

        trace!("boundary loop of {} vertices from {}", boundary.len(), start);
        Ok(boundary)
    }

    /// Reorder vertices so the boundary loop comes first, followed by the interior
    /// vertices in ascending original index.
    pub fn reorder_boundary_first(&self) -> Result<Reordered> {
        let boundary = self.boundary_loop()?;
        let nv = self.n_vertices();

        let mut is_boundary = vec![false; nv];
        for &v in &boundary {
            is_boundary[v] = true;
        }
        let mut permutation = boundary.clone();
        permutation.extend((0..nv).filter(|&v| !is_boundary[v]));

        let mesh = self.permuted(&permutation)?;
        debug!(
            "reordered mesh: {} boundary, {} interior vertices",
            boundary.len(),
            nv - boundary.len()
        );
        Ok(Reordered {
            mesh,
            n_boundary: boundary.len(),
            permutation,
        })
    }

    /// Apply `permutation[new] = old` to vertices and remap the faces.
    pub fn permuted(&self, permutation: &[usize]) -> Result<Mesh> {
        let nv = self.n_vertices();
        if permutation.len() != nv {
            return Err(Error::DimensionMismatch(format!(
                "permutation of length {} for {} vertices",
                permutation.len(),
                nv
            )));
        }
        let mut old_to_new = vec![usize::MAX; nv];
        for (new, &old) in permutation.iter().enumerate() {
            if old >= nv || old_to_new[old] != usize::MAX {
                return Err(Error::DimensionMismatch(format!(
                    "not a permutation: index {old} at position {new}"
                )));
            }
            old_to_new[old] = new;
        }
        let vertices = permutation.iter().map(|&old| self.vertices[old]).collect();
        let faces = self
            .faces
            .iter()
            .map(|f| [old_to_new[f[0]], old_to_new[f[1]], old_to_new[f[2]]])
            .collect();
        Mesh::new(vertices, faces)
    }
}
