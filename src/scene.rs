/// Scene of baked occluder batches
/// Built once at load time: decompose → batch → bake
use std::fs;
use std::path::Path;
use std::time::Instant;

use glam::{Vec3, Vec4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::CullerConfig;
use crate::error::{OcclusionError, Result};
use crate::occluder::{decompose, generate_batches, Aabb, Occluder};
use crate::perf_scope;

pub const INDEX_BUFFER_FILE: &str = "IndexBuffer.bin";
pub const VERTEX_BUFFER_FILE: &str = "VertexBuffer.bin";

/// Read-only collection of occluder batches shared by every frame
pub struct Scene {
    occluders: Vec<Occluder>,
    total_triangles: usize,
    bounds: Aabb,
}

impl Scene {
    /// Wrap already baked occluders
    pub fn from_occluders(occluders: Vec<Occluder>, total_triangles: usize) -> Self {
        let bounds = occluders
            .iter()
            .fold(Aabb::EMPTY, |acc, o| acc.union(&o.bounds()));
        Self {
            occluders,
            total_triangles,
            bounds,
        }
    }

    /// Build occluders from an indexed triangle mesh
    pub fn from_mesh(indices: &[u32], vertices: &[Vec4], config: &CullerConfig) -> Result<Self> {
        let start = Instant::now();
        let total_triangles = indices.len() / 3;

        let quad_indices = {
            perf_scope!("quad_decomposition");
            decompose(indices, vertices)?
        };
        let quad_count = quad_indices.len() / 4;

        let quad_corners = |q: usize| {
            let i = &quad_indices[q * 4..q * 4 + 4];
            [
                vertices[i[0] as usize],
                vertices[i[1] as usize],
                vertices[i[2] as usize],
                vertices[i[3] as usize],
            ]
        };

        let quad_aabbs: Vec<Aabb> = (0..quad_count)
            .into_par_iter()
            .map(|q| Aabb::from_points(quad_corners(q).map(|v| v.truncate())))
            .collect();

        let batches = {
            perf_scope!("batch_assignment");
            generate_batches(&quad_aabbs, config.max_quads_per_batch, config.max_batches)?
        };

        let reference = Aabb::from_points(vertices.iter().map(|v| v.truncate()));

        let occluders = batches
            .par_iter()
            .map(|batch| {
                let batch_vertices: Vec<Vec4> =
                    batch.iter().flat_map(|&q| quad_corners(q)).collect();
                Occluder::bake(&batch_vertices, reference.min, reference.max)
            })
            .collect::<Result<Vec<_>>>()?;

        log::info!(
            "baked {} triangles into {} quads, {} occluders in {:.2}ms",
            total_triangles,
            quad_count,
            occluders.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self::from_occluders(occluders, total_triangles))
    }

    /// Load `IndexBuffer.bin` (native u32) and `VertexBuffer.bin`
    /// (native 4×f32 per vertex) from `dir`.
    pub fn load(dir: impl AsRef<Path>, config: &CullerConfig) -> Result<Self> {
        let dir = dir.as_ref();
        let indices: Vec<u32> = read_pod_file(&dir.join(INDEX_BUFFER_FILE))?;
        let vertices: Vec<[f32; 4]> = read_pod_file(&dir.join(VERTEX_BUFFER_FILE))?;
        let vertices: Vec<Vec4> = vertices.into_iter().map(Vec4::from_array).collect();

        log::info!(
            "loaded {} indices, {} vertices from {}",
            indices.len(),
            vertices.len(),
            dir.display()
        );
        Self::from_mesh(&indices, &vertices, config)
    }

    /// Deterministic city block: a ground plane plus a grid of box
    /// buildings with random footprints and heights.
    pub fn procedural_city(seed: u64, grid: usize, config: &CullerConfig) -> Result<Self> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        const CELL: f32 = 10.0;
        let half_extent = grid as f32 * CELL * 0.5;

        push_box(
            &mut vertices,
            &mut indices,
            Vec3::new(-half_extent, -1.0, -half_extent),
            Vec3::new(half_extent, 0.0, half_extent),
        );

        for gz in 0..grid {
            for gx in 0..grid {
                let cell_min = Vec3::new(
                    gx as f32 * CELL - half_extent,
                    0.0,
                    gz as f32 * CELL - half_extent,
                );
                let footprint = Vec3::new(rng.gen_range(3.0..8.0), 0.0, rng.gen_range(3.0..8.0));
                let offset = Vec3::new(
                    rng.gen_range(0.5..(CELL - footprint.x).max(0.6)),
                    0.0,
                    rng.gen_range(0.5..(CELL - footprint.z).max(0.6)),
                );
                let height = rng.gen_range(2.0..25.0);

                let min = cell_min + offset;
                let max = min + footprint + Vec3::Y * height;
                push_box(&mut vertices, &mut indices, min, max);
            }
        }

        Self::from_mesh(&indices, &vertices, config)
    }

    #[inline]
    pub fn occluders(&self) -> &[Occluder] {
        &self.occluders
    }

    /// Triangle count of the source mesh
    #[inline]
    pub fn total_triangles(&self) -> usize {
        self.total_triangles
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn quad_count(&self) -> usize {
        self.occluders.iter().map(Occluder::quad_count).sum()
    }
}

fn read_pod_file<T: bytemuck::Pod>(path: &Path) -> Result<Vec<T>> {
    let bytes = fs::read(path).map_err(|source| OcclusionError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let size = std::mem::size_of::<T>();
    if bytes.len() % size != 0 {
        return Err(OcclusionError::InvalidMesh(format!(
            "{} is {} bytes, not a multiple of {}",
            path.display(),
            bytes.len(),
            size
        )));
    }

    // Copy into a properly aligned buffer.
    let mut out = vec![T::zeroed(); bytes.len() / size];
    bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(&bytes);
    Ok(out)
}

/// Append an axis-aligned box with outward-facing, counter-clockwise faces.
fn push_box(vertices: &mut Vec<Vec4>, indices: &mut Vec<u32>, min: Vec3, max: Vec3) {
    let base = vertices.len() as u32;
    for i in 0..8 {
        vertices.push(Vec4::new(
            if i & 1 == 0 { min.x } else { max.x },
            if i & 2 == 0 { min.y } else { max.y },
            if i & 4 == 0 { min.z } else { max.z },
            1.0,
        ));
    }

    // Corner bits: x = 1, y = 2, z = 4
    const FACES: [[u32; 4]; 6] = [
        [0, 4, 6, 2], // -X
        [1, 3, 7, 5], // +X
        [0, 1, 5, 4], // -Y
        [2, 6, 7, 3], // +Y
        [0, 2, 3, 1], // -Z
        [4, 5, 7, 6], // +Z
    ];
    for [a, b, c, d] in FACES {
        indices.extend_from_slice(&[base + a, base + b, base + c, base + a, base + c, base + d]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_faces_point_outward() {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        push_box(&mut vertices, &mut indices, Vec3::ZERO, Vec3::ONE);

        let center = Vec3::splat(0.5);
        for tri in indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| vertices[i as usize].truncate());
            let normal = (b - a).cross(c - a);
            let face_center = (a + b + c) / 3.0;
            assert!(normal.dot(face_center - center) > 0.0);
        }
    }

    #[test]
    fn box_becomes_six_quads() {
        let mut vertices = Vec::new();
        let mut indices = Vec::new();
        push_box(&mut vertices, &mut indices, Vec3::ZERO, Vec3::ONE);

        let quads = decompose(&indices, &vertices).unwrap();
        let real_quads: Vec<&[u32]> = quads.chunks_exact(4).take(6).collect();
        for q in &real_quads {
            let mut distinct = q.to_vec();
            distinct.sort_unstable();
            distinct.dedup();
            assert_eq!(distinct.len(), 4, "face should merge into a full quad");
        }
    }

    #[test]
    fn from_mesh_respects_batch_limits() {
        let config = CullerConfig {
            max_quads_per_batch: 64,
            max_batches: 32,
            ..CullerConfig::default()
        };
        let scene = Scene::procedural_city(7, 6, &config).unwrap();

        assert_eq!(scene.total_triangles(), (6 * 6 + 1) * 12);
        assert!(scene.occluders().len() <= 32);
        for occluder in scene.occluders() {
            // Batch limit plus packet padding.
            assert!(occluder.quad_count() <= 64 + 7);
            assert!(scene.bounds().contains(occluder.center()));
        }
    }

    #[test]
    fn procedural_city_is_deterministic() {
        let config = CullerConfig::default();
        let a = Scene::procedural_city(42, 4, &config).unwrap();
        let b = Scene::procedural_city(42, 4, &config).unwrap();

        assert_eq!(a.occluders().len(), b.occluders().len());
        for (oa, ob) in a.occluders().iter().zip(b.occluders()) {
            assert_eq!(oa.vertices(), ob.vertices());
        }
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = std::env::temp_dir().join("occlusion_culler_missing_scene");
        assert!(matches!(
            Scene::load(&dir, &CullerConfig::default()),
            Err(OcclusionError::Io { .. })
        ));
    }

    #[test]
    fn load_reads_binary_buffers() {
        let dir = std::env::temp_dir().join(format!("occlusion_culler_scene_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let vertices: [[f32; 4]; 4] = [
            [0.0, 0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0, 1.0],
            [1.0, 1.0, 0.0, 1.0],
            [0.0, 1.0, 0.0, 1.0],
        ];
        let indices: [u32; 6] = [0, 1, 2, 0, 2, 3];
        fs::write(dir.join(VERTEX_BUFFER_FILE), bytemuck::cast_slice::<_, u8>(&vertices)).unwrap();
        fs::write(dir.join(INDEX_BUFFER_FILE), bytemuck::cast_slice::<_, u8>(&indices)).unwrap();

        let scene = Scene::load(&dir, &CullerConfig::default()).unwrap();
        assert_eq!(scene.total_triangles(), 2);
        assert_eq!(scene.occluders().len(), 1);
        assert_eq!(scene.bounds().max, Vec3::new(1.0, 1.0, 0.0));

        fs::remove_dir_all(&dir).unwrap();
    }
}
