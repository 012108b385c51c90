use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fire_viewer::geometry::{cube, icosphere, ShapeParams};
use fire_viewer::mesh::MeshBuffer;
use fire_viewer::testing::RecordingContext;
use glam::Vec3;

/// Benchmark: icosphere generation per subdivision level
fn bench_icosphere_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("icosphere");

    for level in [0, 2, 4, 5, 6] {
        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, &level| {
            b.iter(|| black_box(icosphere(black_box(Vec3::ZERO), 1.0, level)))
        });
    }

    group.finish();
}

/// Benchmark: the regeneration path a tessellation change takes
fn bench_regenerate_and_upload(c: &mut Criterion) {
    let mut ctx = RecordingContext::new();
    let params = ShapeParams::Icosphere {
        center: Vec3::ZERO,
        radius: 1.0,
        tessellations: 5,
    };

    c.bench_function("regenerate_level_5", |b| {
        b.iter(|| {
            let mesh = MeshBuffer::new(black_box(params)).unwrap().create(&mut ctx).unwrap();
            mesh.release(&mut ctx);
        })
    });
}

/// Benchmark: fixed-table primitive for comparison
fn bench_cube(c: &mut Criterion) {
    c.bench_function("cube", |b| b.iter(|| black_box(cube(black_box(Vec3::ZERO)))));
}

criterion_group!(benches, bench_icosphere_levels, bench_regenerate_and_upload, bench_cube);
criterion_main!(benches);
