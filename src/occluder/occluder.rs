/// Baked occluder batch
///
/// An immutable, camera-independent set of quads plus its world-space
/// bounds. Built once at load time and shared read-only by every frame.
use glam::{Vec3, Vec4};

use super::{Aabb, QUAD_PACKET_SIZE};
use crate::error::{OcclusionError, Result};

#[derive(Debug, Clone)]
pub struct Occluder {
    /// Quad corners in winding order, 4 per quad, w = 1
    vertices: Vec<Vec4>,
    /// Two triangles per quad (0,1,2 / 0,2,3), local to `vertices`
    triangle_indices: Vec<u32>,
    bounds: Aabb,
    center: Vec3,
    packet_count: usize,
}

impl Occluder {
    /// Bake a batch of quad vertices.
    ///
    /// `ref_min`/`ref_max` bound the whole scene; every vertex must lie
    /// inside them. The quad list is padded with copies of its first quad so
    /// it fills whole packets of [`QUAD_PACKET_SIZE`] quads.
    pub fn bake(vertices: &[Vec4], ref_min: Vec3, ref_max: Vec3) -> Result<Self> {
        if vertices.is_empty() || vertices.len() % 4 != 0 {
            return Err(OcclusionError::InvalidOccluder(format!(
                "vertex count {} is not a positive multiple of 4",
                vertices.len()
            )));
        }

        let reference = Aabb::new(ref_min, ref_max)?;
        // Allow for rounding in how the reference box was accumulated.
        let slack = reference.extent().max_element().max(1.0) * 1e-5;
        let reference = reference.expanded(slack);

        let mut bounds = Aabb::EMPTY;
        for v in vertices {
            let p = v.truncate();
            if !p.is_finite() {
                return Err(OcclusionError::InvalidOccluder(format!(
                    "non-finite vertex {:?}",
                    v
                )));
            }
            if !reference.contains(p) {
                return Err(OcclusionError::InvalidOccluder(format!(
                    "vertex {:?} lies outside the reference bounds",
                    p
                )));
            }
            bounds.include(p);
        }

        let mut baked: Vec<Vec4> = vertices.iter().map(|v| v.truncate().extend(1.0)).collect();
        let first_quad = [baked[0], baked[1], baked[2], baked[3]];
        while (baked.len() / 4) % QUAD_PACKET_SIZE != 0 {
            baked.extend_from_slice(&first_quad);
        }

        let quad_count = baked.len() / 4;
        let triangle_indices = (0..quad_count as u32)
            .flat_map(|q| {
                let base = q * 4;
                [base, base + 1, base + 2, base, base + 2, base + 3]
            })
            .collect();

        Ok(Self {
            vertices: baked,
            triangle_indices,
            center: bounds.center(),
            bounds,
            packet_count: quad_count / QUAD_PACKET_SIZE,
        })
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec4] {
        &self.vertices
    }

    /// Static triangle index list over `vertices()`. The quad rasterizer does
    /// not read it; it is kept for triangle-based consumers such as reference
    /// validation renderers.
    #[inline]
    pub fn triangle_indices(&self) -> &[u32] {
        &self.triangle_indices
    }

    #[inline]
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    #[inline]
    pub fn packet_count(&self) -> usize {
        self.packet_count
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    #[inline]
    pub fn bounds_min(&self) -> Vec3 {
        self.bounds.min
    }

    #[inline]
    pub fn bounds_max(&self) -> Vec3 {
        self.bounds.max
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        self.center
    }
}
