/// Per-frame occlusion pipeline
/// clear → sort front-to-back → {query → rasterize or skip}* → readback
use std::fmt;
use std::time::{Duration, Instant};

use crate::camera::Camera;
use crate::error::Result;
use crate::perf::FrameTimer;
use crate::rendering::{sort_front_to_back, DepthImage, Rasterizer, Visibility};
use crate::scene::Scene;

pub use crate::rendering::OcclusionTarget;

/// Where the pipeline is within the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// No frame rendered yet
    Idle,
    Cleared,
    Sorted,
    Rasterizing,
    ReadBack,
    Presented,
}

/// Diagnostics for one frame. Quad counts include packet padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub total_triangles: usize,
    pub quads_need_clip: usize,
    pub quads_no_clip: usize,
    /// Quads of batches rejected by the visibility query
    pub quads_depth_failed: usize,
    pub batches_rasterized: usize,
    pub batches_culled: usize,
    pub raster_time: Duration,
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tris: {} | Clip: {} | NoClip: {} | Culled: {} | Batches: {}/{}",
            self.total_triangles,
            self.quads_need_clip,
            self.quads_no_clip,
            self.quads_depth_failed,
            self.batches_rasterized,
            self.batches_rasterized + self.batches_culled
        )
    }
}

/// Owns the depth target for the lifetime of the program; the scene and
/// camera are passed in per frame.
pub struct FramePipeline<T: OcclusionTarget = Rasterizer> {
    target: T,
    order: Vec<usize>,
    phase: FramePhase,
    timer: FrameTimer,
    last_stats: FrameStats,
}

impl<T: OcclusionTarget> FramePipeline<T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            order: Vec::new(),
            phase: FramePhase::Idle,
            timer: FrameTimer::default(),
            last_stats: FrameStats::default(),
        }
    }

    /// Run the clear, sort and rasterize steps for one frame.
    ///
    /// Batches are processed strictly in front-to-back order: the query for
    /// a batch runs only after every nearer batch has been rasterized or
    /// skipped.
    pub fn render_frame(&mut self, scene: &Scene, camera: &Camera) -> FrameStats {
        self.target.clear();
        self.target.set_view_projection(&camera.view_projection_matrix());
        self.phase = FramePhase::Cleared;

        let occluders = scene.occluders();
        sort_front_to_back(camera.position, occluders, &mut self.order);
        self.phase = FramePhase::Sorted;

        let mut stats = FrameStats {
            total_triangles: scene.total_triangles(),
            ..FrameStats::default()
        };

        self.phase = FramePhase::Rasterizing;
        // Only the query/rasterize loop is timed.
        let start = Instant::now();
        for &index in &self.order {
            let occluder = &occluders[index];
            match self
                .target
                .query_visibility(occluder.bounds_min(), occluder.bounds_max())
            {
                Visibility::VisibleNeedsClipping => {
                    stats.quads_need_clip += self.target.rasterize_clipped(occluder);
                    stats.batches_rasterized += 1;
                }
                Visibility::Visible => {
                    stats.quads_no_clip += self.target.rasterize_unclipped(occluder);
                    stats.batches_rasterized += 1;
                }
                Visibility::Culled => {
                    stats.quads_depth_failed += occluder.quad_count();
                    stats.batches_culled += 1;
                }
            }
        }

        stats.raster_time = start.elapsed();
        self.timer.record(stats.raster_time);
        self.last_stats = stats;

        log::debug!(
            "frame: {} ({:.3}ms, avg {:.3}ms)",
            stats,
            stats.raster_time.as_secs_f64() * 1000.0,
            self.timer.average_ms()
        );

        stats
    }

    /// Copy the accumulated depth into `image`.
    pub fn read_back(&mut self, image: &mut DepthImage) -> Result<()> {
        self.target.read_back(image)?;
        self.phase = FramePhase::ReadBack;
        Ok(())
    }

    /// Record that the read-back image has been handed to presentation.
    pub fn mark_presented(&mut self) {
        self.phase = FramePhase::Presented;
    }

    #[inline]
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    #[inline]
    pub fn target(&self) -> &T {
        &self.target
    }

    #[inline]
    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    /// Front-to-back order used by the last frame
    #[inline]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    #[inline]
    pub fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    #[inline]
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }
}
