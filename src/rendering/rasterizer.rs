/// Software depth rasterizer for occluder batches
/// Answers conservative visibility queries against what it has rasterized so far
use glam::{Mat4, Vec2, Vec3, Vec4};

use super::depth_image::DepthImage;
use super::hiz_buffer::HiZBuffer;
use crate::camera::Frustum;
use crate::config::CullerConfig;
use crate::count_call;
use crate::error::{OcclusionError, Result};
use crate::occluder::Occluder;
#[cfg(feature = "profiling")]
use crate::perf::FUNCTION_COUNTERS;

// A quad clipped against 5 planes gains at most one vertex per plane.
// We use 16 to be safe and aligned.
const MAX_POLY_VERTS: usize = 16;

/// Result of a visibility query against the current depth state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Fully occluded or outside the frustum; skip the occluder
    Culled,
    /// Visible, and every corner projects safely inside the guard band
    Visible,
    /// Visible, but straddles the near plane or the guard band
    VisibleNeedsClipping,
}

impl Visibility {
    #[inline]
    pub fn is_visible(self) -> bool {
        self != Visibility::Culled
    }

    /// Only meaningful when visible
    #[inline]
    pub fn needs_clipping(self) -> bool {
        self == Visibility::VisibleNeedsClipping
    }
}

/// The depth-buffer contract driven by the frame pipeline.
///
/// Queries must observe every write made by earlier rasterize calls since the
/// last `clear`.
pub trait OcclusionTarget {
    /// Reset to "no geometry written"
    fn clear(&mut self);
    fn set_view_projection(&mut self, view_proj: &Mat4);
    fn query_visibility(&self, bounds_min: Vec3, bounds_max: Vec3) -> Visibility;
    /// Clip-capable path. Returns the number of quads processed.
    fn rasterize_clipped(&mut self, occluder: &Occluder) -> usize;
    /// Fast path; only valid when the query reported no clipping needed.
    /// Returns the number of quads processed.
    fn rasterize_unclipped(&mut self, occluder: &Occluder) -> usize;
    fn read_back(&self, image: &mut DepthImage) -> Result<()>;
}

pub struct Rasterizer {
    pub backface_culling: bool,
    /// Largest |x/w|, |y/w| the unclipped path accepts
    pub guard_band: f32,
    hiz: HiZBuffer,
    view_proj: Mat4,
    frustum: Frustum,
    /// Clip-space planes (dot with a clip position >= 0 is inside) for the
    /// clipped path: near, then the four guard-band sides.
    clip_planes: [Vec4; 5],
    // Scratch buffer for clip-space positions so each vertex is transformed
    // once per batch rather than per triangle.
    clip_space_positions: Vec<Vec4>,
}

impl Rasterizer {
    pub fn new(config: &CullerConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(OcclusionError::InvalidResolution {
                width: config.width,
                height: config.height,
            });
        }

        let guard_band = config.guard_band.max(1.0);
        Ok(Self {
            backface_culling: config.backface_culling,
            guard_band,
            hiz: HiZBuffer::new(config.width, config.height),
            view_proj: Mat4::IDENTITY,
            frustum: Frustum::from_view_projection(&Mat4::IDENTITY),
            clip_planes: Self::clip_planes(guard_band),
            clip_space_positions: Vec::new(),
        })
    }

    fn clip_planes(guard_band: f32) -> [Vec4; 5] {
        [
            Vec4::new(0.0, 0.0, 1.0, 0.0),
            Vec4::new(1.0, 0.0, 0.0, guard_band),
            Vec4::new(-1.0, 0.0, 0.0, guard_band),
            Vec4::new(0.0, 1.0, 0.0, guard_band),
            Vec4::new(0.0, -1.0, 0.0, guard_band),
        ]
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.hiz.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.hiz.height()
    }

    /// A depth image sized for this rasterizer
    pub fn depth_image(&self) -> DepthImage {
        DepthImage::new(self.width(), self.height())
    }

    #[inline]
    fn ndc_to_screen(ndc: Vec2, width: f32, height: f32) -> Vec2 {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * width,
            (1.0 - ndc.y) * 0.5 * height, // Flip Y for screen coordinates
        )
    }

    #[inline]
    fn inside_guard_band(&self, clip: Vec4) -> bool {
        let limit = self.guard_band * clip.w;
        clip.x.abs() <= limit && clip.y.abs() <= limit
    }

    fn transform_occluder(&mut self, occluder: &Occluder) {
        let view_proj = self.view_proj;
        self.clip_space_positions.clear();
        self.clip_space_positions
            .extend(occluder.vertices().iter().map(|&v| view_proj * v));
    }

    /// Clip a convex polygon against the near and guard-band planes.
    /// Returns the number of output vertices written to `output`.
    fn clip_polygon(
        planes: &[Vec4; 5],
        input: &[Vec4],
        output: &mut [Vec4; MAX_POLY_VERTS],
    ) -> usize {
        let mut scratch = [Vec4::ZERO; MAX_POLY_VERTS];
        output[..input.len()].copy_from_slice(input);
        let mut len = input.len();

        for plane in planes {
            if len == 0 {
                break;
            }
            scratch[..len].copy_from_slice(&output[..len]);

            let mut out_len = 0usize;
            let mut prev = scratch[len - 1];
            let mut prev_dist = plane.dot(prev);

            for &curr in &scratch[..len] {
                let curr_dist = plane.dot(curr);
                let prev_inside = prev_dist >= 0.0;
                let curr_inside = curr_dist >= 0.0;

                if prev_inside != curr_inside {
                    let t = prev_dist / (prev_dist - curr_dist);
                    output[out_len] = prev + (curr - prev) * t;
                    out_len += 1;
                }
                if curr_inside {
                    output[out_len] = curr;
                    out_len += 1;
                }

                prev = curr;
                prev_dist = curr_dist;
            }
            len = out_len;
        }

        len
    }

    /// Fill one triangle whose vertices are all in front of the camera and
    /// inside the guard band. Writes view-space w, nearest wins.
    ///
    /// Vertices are snapped to a sub-pixel grid and edges are evaluated in
    /// integers with a top-left rule, so a pixel centre on an edge shared by
    /// two triangles is written exactly once.
    fn fill_triangle(&mut self, p0: Vec4, p1: Vec4, p2: Vec4) {
        count_call!(FUNCTION_COUNTERS.triangles_processed);

        let width = self.hiz.width() as f32;
        let height = self.hiz.height() as f32;

        let mut inv_w = [1.0 / p0.w, 1.0 / p1.w, 1.0 / p2.w];
        let mut v = [
            FixedPoint::snap(Self::ndc_to_screen(p0.truncate().truncate() * inv_w[0], width, height)),
            FixedPoint::snap(Self::ndc_to_screen(p1.truncate().truncate() * inv_w[1], width, height)),
            FixedPoint::snap(Self::ndc_to_screen(p2.truncate().truncate() * inv_w[2], width, height)),
        ];

        let area = edge_function(v[0], v[1], v[2]);
        if area == 0 {
            count_call!(FUNCTION_COUNTERS.triangles_culled);
            return;
        }
        // Front faces (counter-clockwise in NDC) have positive area here.
        if area < 0 {
            if self.backface_culling {
                count_call!(FUNCTION_COUNTERS.triangles_culled);
                return;
            }
            v.swap(1, 2);
            inv_w.swap(1, 2);
        }
        let inv_area = 1.0 / area.abs() as f32;

        let min_x = (v[0].x.min(v[1].x).min(v[2].x) >> SUBPIXEL_BITS).max(0);
        let min_y = (v[0].y.min(v[1].y).min(v[2].y) >> SUBPIXEL_BITS).max(0);
        let max_x = (v[0].x.max(v[1].x).max(v[2].x) >> SUBPIXEL_BITS).min(self.hiz.width() as i64 - 1);
        let max_y = (v[0].y.max(v[1].y).max(v[2].y) >> SUBPIXEL_BITS).min(self.hiz.height() as i64 - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let origin = FixedPoint::pixel_centre(min_x, min_y);
        let edges = [
            Edge::new(v[1], v[2], origin),
            Edge::new(v[2], v[0], origin),
            Edge::new(v[0], v[1], origin),
        ];

        let mut row = edges.map(|e| e.value);
        let mut touched = false;
        for y in min_y..=max_y {
            let mut w = row;
            for x in min_x..=max_x {
                if (w[0] | w[1] | w[2]) >= 0 {
                    count_call!(FUNCTION_COUNTERS.pixels_tested);
                    // 1/w is affine in screen space.
                    let b = w.map(|e| e as f32 * inv_area);
                    let depth = 1.0 / (b[0] * inv_w[0] + b[1] * inv_w[1] + b[2] * inv_w[2]);
                    if self.hiz.write(x as usize, y as usize, depth) {
                        count_call!(FUNCTION_COUNTERS.pixels_written);
                        touched = true;
                    }
                }
                for (value, edge) in w.iter_mut().zip(&edges) {
                    *value += edge.step_x;
                }
            }
            for (value, edge) in row.iter_mut().zip(&edges) {
                *value += edge.step_y;
            }
        }

        if touched {
            self.hiz
                .update_region(min_x as i32, min_y as i32, max_x as i32, max_y as i32);
        }
    }

    #[inline]
    fn fill_quad(&mut self, q: [Vec4; 4]) {
        self.fill_triangle(q[0], q[1], q[2]);
        self.fill_triangle(q[0], q[2], q[3]);
    }
}

impl OcclusionTarget for Rasterizer {
    fn clear(&mut self) {
        count_call!(FUNCTION_COUNTERS.depth_clear_calls);
        self.hiz.clear();
    }

    fn set_view_projection(&mut self, view_proj: &Mat4) {
        self.view_proj = *view_proj;
        self.frustum = Frustum::from_view_projection(view_proj);
    }

    fn query_visibility(&self, bounds_min: Vec3, bounds_max: Vec3) -> Visibility {
        count_call!(FUNCTION_COUNTERS.query_calls);

        if !self.frustum.intersects_aabb(bounds_min, bounds_max) {
            count_call!(FUNCTION_COUNTERS.query_frustum_rejected);
            return Visibility::Culled;
        }

        let width = self.hiz.width() as f32;
        let height = self.hiz.height() as f32;

        let mut needs_clipping = false;
        let mut near_w = f32::INFINITY;
        let mut screen_min = Vec2::splat(f32::INFINITY);
        let mut screen_max = Vec2::splat(f32::NEG_INFINITY);

        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { bounds_min.x } else { bounds_max.x },
                if i & 2 == 0 { bounds_min.y } else { bounds_max.y },
                if i & 4 == 0 { bounds_min.z } else { bounds_max.z },
            );
            let clip = self.view_proj * corner.extend(1.0);

            // In front of the near plane: cannot project, cannot depth test.
            if clip.z < 0.0 || clip.w <= 0.0 {
                count_call!(FUNCTION_COUNTERS.query_needs_clipping);
                return Visibility::VisibleNeedsClipping;
            }
            if !self.inside_guard_band(clip) {
                needs_clipping = true;
            }

            near_w = near_w.min(clip.w);
            let screen = Self::ndc_to_screen(clip.truncate().truncate() / clip.w, width, height);
            screen_min = screen_min.min(screen);
            screen_max = screen_max.max(screen);
        }

        // Clamp before the integer cast; far outside the screen is all the same.
        let lo = Vec2::splat(-1.0);
        let hi = Vec2::new(width, height);
        let screen_min = screen_min.clamp(lo, hi).floor();
        let screen_max = screen_max.clamp(lo, hi).floor();

        if self.hiz.is_occluded(
            screen_min.x as i32,
            screen_min.y as i32,
            screen_max.x as i32,
            screen_max.y as i32,
            near_w,
        ) {
            count_call!(FUNCTION_COUNTERS.query_depth_rejected);
            return Visibility::Culled;
        }

        if needs_clipping {
            count_call!(FUNCTION_COUNTERS.query_needs_clipping);
            Visibility::VisibleNeedsClipping
        } else {
            Visibility::Visible
        }
    }

    fn rasterize_clipped(&mut self, occluder: &Occluder) -> usize {
        count_call!(FUNCTION_COUNTERS.rasterize_clipped_calls);
        self.transform_occluder(occluder);

        let positions = std::mem::take(&mut self.clip_space_positions);
        let planes = self.clip_planes;
        let mut clipped = [Vec4::ZERO; MAX_POLY_VERTS];

        for quad in positions.chunks_exact(4) {
            let clipped_len = Self::clip_polygon(&planes, quad, &mut clipped);
            if clipped_len < 3 {
                continue;
            }
            for i in 1..(clipped_len - 1) {
                self.fill_triangle(clipped[0], clipped[i], clipped[i + 1]);
            }
        }

        self.clip_space_positions = positions;
        occluder.quad_count()
    }

    fn rasterize_unclipped(&mut self, occluder: &Occluder) -> usize {
        count_call!(FUNCTION_COUNTERS.rasterize_unclipped_calls);
        self.transform_occluder(occluder);

        let positions = std::mem::take(&mut self.clip_space_positions);
        for quad in positions.chunks_exact(4) {
            debug_assert!(quad.iter().all(|p| p.w > 0.0 && p.z >= 0.0));
            self.fill_quad([quad[0], quad[1], quad[2], quad[3]]);
        }
        self.clip_space_positions = positions;

        occluder.quad_count()
    }

    fn read_back(&self, image: &mut DepthImage) -> Result<()> {
        image.copy_from_hiz(&self.hiz)
    }
}

/// Screen positions are snapped to 1/256 of a pixel
const SUBPIXEL_BITS: u32 = 8;
const SUBPIXEL_ONE: i64 = 1 << SUBPIXEL_BITS;

/// Screen position on the sub-pixel grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FixedPoint {
    x: i64,
    y: i64,
}

impl FixedPoint {
    #[inline]
    fn snap(screen: Vec2) -> Self {
        let scale = SUBPIXEL_ONE as f32;
        Self {
            x: (screen.x * scale).round() as i64,
            y: (screen.y * scale).round() as i64,
        }
    }

    #[inline]
    fn pixel_centre(x: i64, y: i64) -> Self {
        Self {
            x: x * SUBPIXEL_ONE + SUBPIXEL_ONE / 2,
            y: y * SUBPIXEL_ONE + SUBPIXEL_ONE / 2,
        }
    }
}

/// Edge function: twice the signed area of (a, b, c), in sub-pixel units
#[inline]
fn edge_function(a: FixedPoint, b: FixedPoint, c: FixedPoint) -> i64 {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}

/// Edge a → b of a positive-area triangle, stepped one pixel at a time
#[derive(Debug, Clone, Copy)]
struct Edge {
    /// Edge function at the starting pixel centre, biased so that only
    /// top and left edges own the centres lying exactly on them
    value: i64,
    step_x: i64,
    step_y: i64,
}

impl Edge {
    fn new(a: FixedPoint, b: FixedPoint, origin: FixedPoint) -> Self {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        // Screen y points down: left edges run downwards, top edges run left.
        let top_left = dy > 0 || (dy == 0 && dx < 0);
        Self {
            value: edge_function(a, b, origin) - i64::from(!top_left),
            step_x: dy * SUBPIXEL_ONE,
            step_y: -dx * SUBPIXEL_ONE,
        }
    }
}
