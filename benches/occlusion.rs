/// Benchmark suite for occlusion primitives
/// Hi-Z clear, visibility queries, front-to-back sort and both raster paths.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{Vec3, Vec4};
use occlusion_culler::rendering::sort_front_to_back;
use occlusion_culler::{
    Camera, CullerConfig, HiZBuffer, OcclusionTarget, Occluder, Rasterizer, Scene,
};

fn wall(half: f32, z: f32) -> Occluder {
    let vertices = [
        Vec4::new(-half, -half, z, 1.0),
        Vec4::new(half, -half, z, 1.0),
        Vec4::new(half, half, z, 1.0),
        Vec4::new(-half, half, z, 1.0),
    ];
    Occluder::bake(&vertices, Vec3::splat(-100.0), Vec3::splat(100.0)).unwrap()
}

fn prepared_rasterizer(config: &CullerConfig) -> Rasterizer {
    let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, config);
    let mut rasterizer = Rasterizer::new(config).unwrap();
    rasterizer.clear();
    rasterizer.set_view_projection(&camera.view_projection_matrix());
    rasterizer
}

fn bench_hiz_clear(c: &mut Criterion) {
    c.bench_function("hiz_clear", |b| {
        let mut hiz = HiZBuffer::new(1280, 720);
        b.iter(|| {
            hiz.clear();
            black_box(&hiz);
        });
    });
}

fn bench_query_visibility(c: &mut Criterion) {
    let config = CullerConfig::default();
    let mut group = c.benchmark_group("query_visibility");

    let empty = prepared_rasterizer(&config);
    group.bench_function("empty_buffer", |b| {
        b.iter(|| {
            black_box(empty.query_visibility(
                black_box(Vec3::new(-1.0, -1.0, -21.0)),
                black_box(Vec3::new(1.0, 1.0, -19.0)),
            ))
        });
    });

    let mut occluded = prepared_rasterizer(&config);
    occluded.rasterize_unclipped(&wall(12.0, -10.0));
    group.bench_function("behind_wall", |b| {
        b.iter(|| {
            black_box(occluded.query_visibility(
                black_box(Vec3::new(-1.0, -1.0, -21.0)),
                black_box(Vec3::new(1.0, 1.0, -19.0)),
            ))
        });
    });

    group.finish();
}

fn bench_rasterize_paths(c: &mut Criterion) {
    let config = CullerConfig::default();
    let occluder = wall(3.0, -10.0);
    let mut group = c.benchmark_group("rasterize_wall");

    group.bench_function("unclipped", |b| {
        let mut rasterizer = prepared_rasterizer(&config);
        b.iter(|| {
            rasterizer.clear();
            black_box(rasterizer.rasterize_unclipped(black_box(&occluder)))
        });
    });

    group.bench_function("clipped", |b| {
        let mut rasterizer = prepared_rasterizer(&config);
        b.iter(|| {
            rasterizer.clear();
            black_box(rasterizer.rasterize_clipped(black_box(&occluder)))
        });
    });

    group.finish();
}

fn bench_sort_front_to_back(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_front_to_back");

    for max_quads in [512, 64] {
        let config = CullerConfig {
            max_quads_per_batch: max_quads,
            max_batches: 128,
            ..CullerConfig::default()
        };
        let scene = Scene::procedural_city(1, 12, &config).unwrap();
        let mut order = Vec::new();

        group.bench_with_input(
            BenchmarkId::from_parameter(scene.occluders().len()),
            &scene,
            |b, scene| {
                b.iter(|| {
                    sort_front_to_back(black_box(Vec3::new(5.0, 10.0, 80.0)), scene.occluders(), &mut order);
                    black_box(&order);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_hiz_clear,
    bench_query_visibility,
    bench_rasterize_paths,
    bench_sort_front_to_back,
);
criterion_main!(benches);
