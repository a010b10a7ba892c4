/// Load-time scene building and whole-scene frames
use std::fs;

use glam::{Vec3, Vec4};
use occlusion_culler::*;

fn small_config() -> CullerConfig {
    CullerConfig {
        width: 256,
        height: 144,
        ..CullerConfig::default()
    }
}

/// Two unit squares far apart, as a raw indexed mesh
fn two_squares() -> (Vec<u32>, Vec<Vec4>) {
    let mut vertices = Vec::new();
    for x in [0.0, 50.0] {
        vertices.extend_from_slice(&[
            Vec4::new(x, 0.0, 0.0, 1.0),
            Vec4::new(x + 1.0, 0.0, 0.0, 1.0),
            Vec4::new(x + 1.0, 1.0, 0.0, 1.0),
            Vec4::new(x, 1.0, 0.0, 1.0),
        ]);
    }
    let indices = vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7];
    (indices, vertices)
}

#[test]
fn from_mesh_bakes_every_quad() {
    let (indices, vertices) = two_squares();
    let scene = Scene::from_mesh(&indices, &vertices, &small_config()).unwrap();

    assert_eq!(scene.total_triangles(), 4);
    assert_eq!(scene.occluders().len(), 1);
    assert_eq!(scene.bounds().min, Vec3::ZERO);
    assert_eq!(scene.bounds().max, Vec3::new(51.0, 1.0, 0.0));
    assert_eq!(scene.quad_count() % QUAD_PACKET_SIZE, 0);
}

#[test]
fn small_batches_split_distant_geometry() {
    let (indices, vertices) = two_squares();
    // Decomposition pads to 8 quads, seven of them at the first square.
    let config = CullerConfig {
        max_quads_per_batch: 7,
        max_batches: 2,
        ..small_config()
    };
    let scene = Scene::from_mesh(&indices, &vertices, &config).unwrap();

    assert_eq!(scene.occluders().len(), 2);
    let mut centers: Vec<f32> = scene.occluders().iter().map(|o| o.center().x).collect();
    centers.sort_by(f32::total_cmp);
    assert_eq!(centers, vec![0.5, 50.5]);
    for occluder in scene.occluders() {
        assert_eq!(occluder.vertices().len() % 4, 0);
        for v in occluder.vertices() {
            assert!(occluder.bounds().contains(v.truncate()));
        }
    }
}

#[test]
fn too_few_batches_is_an_error() {
    let (indices, vertices) = two_squares();
    let config = CullerConfig {
        max_quads_per_batch: 2,
        max_batches: 2,
        ..small_config()
    };
    assert!(matches!(
        Scene::from_mesh(&indices, &vertices, &config),
        Err(OcclusionError::BatchCapacity { .. })
    ));
}

#[test]
fn malformed_mesh_is_an_error() {
    let (_, vertices) = two_squares();
    assert!(matches!(
        Scene::from_mesh(&[0, 1, 99], &vertices, &small_config()),
        Err(OcclusionError::InvalidMesh(_))
    ));
}

#[test]
fn load_round_trips_binary_buffers() {
    let (indices, vertices) = two_squares();
    let dir = std::env::temp_dir().join(format!("occlusion_culler_it_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let raw: Vec<[f32; 4]> = vertices.iter().map(|v| v.to_array()).collect();
    fs::write(dir.join("VertexBuffer.bin"), bytemuck::cast_slice::<_, u8>(&raw)).unwrap();
    fs::write(dir.join("IndexBuffer.bin"), bytemuck::cast_slice::<_, u8>(&indices)).unwrap();

    let loaded = Scene::load(&dir, &small_config()).unwrap();
    let built = Scene::from_mesh(&indices, &vertices, &small_config()).unwrap();
    fs::remove_dir_all(&dir).unwrap();

    assert_eq!(loaded.total_triangles(), built.total_triangles());
    assert_eq!(loaded.bounds(), built.bounds());
    assert_eq!(loaded.occluders()[0].vertices(), built.occluders()[0].vertices());
}

#[test]
fn truncated_vertex_file_is_an_error() {
    let dir = std::env::temp_dir().join(format!("occlusion_culler_bad_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("VertexBuffer.bin"), [0u8; 10]).unwrap();
    fs::write(dir.join("IndexBuffer.bin"), [0u8; 12]).unwrap();

    let result = Scene::load(&dir, &small_config());
    fs::remove_dir_all(&dir).unwrap();
    assert!(matches!(result, Err(OcclusionError::InvalidMesh(_))));
}

#[test]
fn city_frame_accounts_for_every_batch() {
    let config = CullerConfig {
        max_quads_per_batch: 64,
        max_batches: 32,
        ..small_config()
    };
    let scene = Scene::procedural_city(3, 8, &config).unwrap();
    let camera = Camera::new(
        Vec3::new(0.0, 8.0, 60.0),
        Vec3::new(0.0, -0.1, -1.0),
        Vec3::Y,
        &config,
    );
    let mut pipeline = FramePipeline::new(Rasterizer::new(&config).unwrap());
    let stats = pipeline.render_frame(&scene, &camera);

    assert_eq!(
        stats.batches_rasterized + stats.batches_culled,
        scene.occluders().len()
    );
    assert_eq!(
        stats.quads_need_clip + stats.quads_no_clip + stats.quads_depth_failed,
        scene.quad_count()
    );
    assert!(scene.occluders().len() > 1);
    assert!(stats.batches_rasterized > 0);

    let mut image = DepthImage::new(config.width, config.height);
    pipeline.read_back(&mut image).unwrap();
    let (near, far) = image.written_range().unwrap();
    assert!(near > 0.0 && near <= far);

    let mut pixels = vec![0u32; config.width * config.height];
    image.tonemap(&mut pixels).unwrap();
    assert!(pixels.iter().all(|p| p >> 24 == 0xFF));
}
