/// Triangle list → quad list conversion
/// Edge-sharing, coplanar triangles with a convex outline merge into one quad.
/// Everything else becomes a degenerate quad `(a, b, c, c)`, which rasterizes
/// exactly like the original triangle.
use std::collections::HashMap;

use glam::{Vec3, Vec4};

use super::QUAD_PACKET_SIZE;
use crate::error::{OcclusionError, Result};

/// Minimum cosine between the normals of two triangles merged into a quad.
const PLANARITY_COS: f32 = 0.999;

/// Decompose an indexed triangle list into quad indices (4 per quad).
///
/// The result is padded by repeating the first quad so the quad count is a
/// multiple of [`QUAD_PACKET_SIZE`].
pub fn decompose(indices: &[u32], vertices: &[Vec4]) -> Result<Vec<u32>> {
    if indices.len() % 3 != 0 {
        return Err(OcclusionError::InvalidMesh(format!(
            "index count {} is not a multiple of 3",
            indices.len()
        )));
    }
    if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        return Err(OcclusionError::InvalidMesh(format!(
            "index {} out of range for {} vertices",
            bad,
            vertices.len()
        )));
    }

    let triangles: Vec<[u32; 3]> = indices
        .chunks_exact(3)
        .map(|t| [t[0], t[1], t[2]])
        .collect();
    let position = |i: u32| vertices[i as usize].truncate();

    // Directed edge -> (triangle, local edge index)
    let mut edges: HashMap<(u32, u32), (usize, usize)> = HashMap::with_capacity(indices.len());
    for (t, tri) in triangles.iter().enumerate() {
        for e in 0..3 {
            edges.entry((tri[e], tri[(e + 1) % 3])).or_insert((t, e));
        }
    }

    let mut paired = vec![false; triangles.len()];
    let mut quads = Vec::with_capacity(indices.len() / 3 * 4 + QUAD_PACKET_SIZE * 4);

    for (t, tri) in triangles.iter().enumerate() {
        if paired[t] {
            continue;
        }
        paired[t] = true;

        let mut merged = None;
        for e in 0..3 {
            let a = tri[e];
            let b = tri[(e + 1) % 3];
            let Some(&(other, other_edge)) = edges.get(&(b, a)) else {
                continue;
            };
            if paired[other] {
                continue;
            }

            // Vertex of the neighbour that is not on the shared edge.
            let opposite = triangles[other][(other_edge + 2) % 3];
            let apex = tri[(e + 2) % 3];
            let quad = [apex, a, opposite, b];

            if is_planar_convex_quad(quad.map(position)) {
                paired[other] = true;
                merged = Some(quad);
                break;
            }
        }

        let quad = merged.unwrap_or([tri[0], tri[1], tri[2], tri[2]]);
        quads.extend_from_slice(&quad);
    }

    pad_to_packets(&mut quads);
    Ok(quads)
}

/// Repeat the first quad until the quad count fills whole packets.
fn pad_to_packets(quads: &mut Vec<u32>) {
    if quads.is_empty() {
        return;
    }
    let first = [quads[0], quads[1], quads[2], quads[3]];
    while quads.len() % (QUAD_PACKET_SIZE * 4) != 0 {
        quads.extend_from_slice(&first);
    }
}

/// True when `q` (in winding order) is planar, convex and non-degenerate.
fn is_planar_convex_quad(q: [Vec3; 4]) -> bool {
    let n0 = (q[1] - q[0]).cross(q[2] - q[0]);
    let n1 = (q[2] - q[0]).cross(q[3] - q[0]);
    let (len0, len1) = (n0.length(), n1.length());
    if len0 <= f32::EPSILON || len1 <= f32::EPSILON {
        return false;
    }
    if n0.dot(n1) < PLANARITY_COS * len0 * len1 {
        return false;
    }

    // Every corner must turn the same way as the face normal.
    let normal = n0 + n1;
    (0..4).all(|i| {
        let prev = q[(i + 3) % 4];
        let curr = q[i];
        let next = q[(i + 1) % 4];
        (curr - prev).cross(next - curr).dot(normal) > 0.0
    })
}
