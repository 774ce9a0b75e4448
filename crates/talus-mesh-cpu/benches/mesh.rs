use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use talus_mesh_cpu::build_chunk_mesh;
use talus_world::{ChunkCoord, HeightField, TerrainConfig};

fn bench_build_chunk(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_chunk");
    let hf = HeightField::new(&TerrainConfig::default());
    for quality in [8usize, 16, 32] {
        group.bench_function(format!("q{quality}"), |b| {
            b.iter(|| {
                let mesh = build_chunk_mesh(&hf, black_box(ChunkCoord::new(0, 0)), quality);
                black_box(mesh.vertex_count())
            })
        });
    }
    group.finish();
}

fn bench_height_sampling(c: &mut Criterion) {
    let hf = HeightField::new(&TerrainConfig::default());
    c.bench_function("height_at_bilerp", |b| {
        b.iter(|| black_box(hf.height_at_bilerp(black_box(12.3), black_box(-48.9))))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_build_chunk, bench_height_sampling
}
criterion_main!(benches);
