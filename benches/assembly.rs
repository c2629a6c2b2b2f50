//! Assembly scaling: dense vs partitioned mesh Laplacians, and graph Laplacians.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use meshlap::{
    dense_laplacian, graph_laplacian, partitioned_laplacian, DenseScheme, EdgeList, Mesh,
    SparseScheme,
};

fn bench_mesh_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh_laplacian_assembly");

    // Dense storage is O(n^2); keep the grids small enough that it still fits.
    for side in [8usize, 16, 32, 48] {
        let mesh = Mesh::grid(side, side).unwrap();
        let reordered = mesh.reorder_boundary_first().unwrap();
        let n = mesh.n_vertices();

        group.bench_with_input(BenchmarkId::new("dense_cotangent", n), &n, |b, _| {
            b.iter(|| black_box(dense_laplacian(DenseScheme::Cotangent, black_box(&mesh))).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("partitioned_simple", n), &n, |b, _| {
            b.iter(|| {
                black_box(partitioned_laplacian(
                    SparseScheme::Simple,
                    black_box(&reordered.mesh),
                    reordered.n_boundary,
                ))
                .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_graph_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_laplacian_assembly");

    for n in [1_000usize, 10_000, 100_000] {
        // Ring plus chords, so every row has a few entries.
        let mut edges = Vec::with_capacity(2 * n);
        for i in 0..n {
            edges.push((i, (i + 1) % n, 1.0));
            edges.push((i, (i * 7 + 3) % n, 0.5));
        }
        let g = EdgeList::new(n, edges).unwrap();
        let adj = g.adjacency();

        group.bench_with_input(BenchmarkId::new("d_minus_a", n), &n, |b, _| {
            b.iter(|| black_box(graph_laplacian(black_box(&adj), n, 0.0)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_mesh_assembly, bench_graph_assembly);
criterion_main!(benches);
