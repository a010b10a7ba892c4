/// Instrumentation for the culling hot path
/// Call counting is compiled in only with the `profiling` feature
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe performance counters for function call tracking
pub struct FunctionCounters {
    // Visibility queries
    pub query_calls: AtomicU64,
    pub query_frustum_rejected: AtomicU64,
    pub query_depth_rejected: AtomicU64,
    pub query_needs_clipping: AtomicU64,

    // Rasterization
    pub rasterize_clipped_calls: AtomicU64,
    pub rasterize_unclipped_calls: AtomicU64,
    pub triangles_processed: AtomicU64,
    pub triangles_culled: AtomicU64,
    pub pixels_tested: AtomicU64,
    pub pixels_written: AtomicU64,

    // Depth buffer
    pub depth_clear_calls: AtomicU64,
}

impl FunctionCounters {
    pub const fn new() -> Self {
        Self {
            query_calls: AtomicU64::new(0),
            query_frustum_rejected: AtomicU64::new(0),
            query_depth_rejected: AtomicU64::new(0),
            query_needs_clipping: AtomicU64::new(0),
            rasterize_clipped_calls: AtomicU64::new(0),
            rasterize_unclipped_calls: AtomicU64::new(0),
            triangles_processed: AtomicU64::new(0),
            triangles_culled: AtomicU64::new(0),
            pixels_tested: AtomicU64::new(0),
            pixels_written: AtomicU64::new(0),
            depth_clear_calls: AtomicU64::new(0),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        for counter in self.all() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    fn all(&self) -> [&AtomicU64; 11] {
        [
            &self.query_calls,
            &self.query_frustum_rejected,
            &self.query_depth_rejected,
            &self.query_needs_clipping,
            &self.rasterize_clipped_calls,
            &self.rasterize_unclipped_calls,
            &self.triangles_processed,
            &self.triangles_culled,
            &self.pixels_tested,
            &self.pixels_written,
            &self.depth_clear_calls,
        ]
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            query_calls: self.query_calls.load(Ordering::Relaxed),
            query_frustum_rejected: self.query_frustum_rejected.load(Ordering::Relaxed),
            query_depth_rejected: self.query_depth_rejected.load(Ordering::Relaxed),
            query_needs_clipping: self.query_needs_clipping.load(Ordering::Relaxed),
            rasterize_clipped_calls: self.rasterize_clipped_calls.load(Ordering::Relaxed),
            rasterize_unclipped_calls: self.rasterize_unclipped_calls.load(Ordering::Relaxed),
            triangles_processed: self.triangles_processed.load(Ordering::Relaxed),
            triangles_culled: self.triangles_culled.load(Ordering::Relaxed),
            pixels_tested: self.pixels_tested.load(Ordering::Relaxed),
            pixels_written: self.pixels_written.load(Ordering::Relaxed),
            depth_clear_calls: self.depth_clear_calls.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterSnapshot {
    pub query_calls: u64,
    pub query_frustum_rejected: u64,
    pub query_depth_rejected: u64,
    pub query_needs_clipping: u64,
    pub rasterize_clipped_calls: u64,
    pub rasterize_unclipped_calls: u64,
    pub triangles_processed: u64,
    pub triangles_culled: u64,
    pub pixels_tested: u64,
    pub pixels_written: u64,
    pub depth_clear_calls: u64,
}

impl CounterSnapshot {
    /// Print formatted report
    pub fn print_report(&self) {
        println!("\n=== Performance Counters Report ===");
        println!("\nVisibility Queries:");
        println!("  query calls:                {:12}", self.query_calls);
        println!("  frustum rejected:           {:12}", self.query_frustum_rejected);
        println!("  depth rejected:             {:12}", self.query_depth_rejected);
        println!("  needing clipping:           {:12}", self.query_needs_clipping);

        println!("\nRasterization:");
        println!("  clipped path calls:         {:12}", self.rasterize_clipped_calls);
        println!("  unclipped path calls:       {:12}", self.rasterize_unclipped_calls);
        println!("  triangles processed:        {:12}", self.triangles_processed);
        println!("  triangles culled:           {:12}", self.triangles_culled);

        println!("\nPixel Operations:");
        println!("  pixels tested:              {:12}", self.pixels_tested);
        println!("  pixels written:             {:12}", self.pixels_written);
        if self.pixels_tested > 0 {
            let pass_rate = (self.pixels_written as f64 / self.pixels_tested as f64) * 100.0;
            println!("  depth test pass rate:       {:11.2}%", pass_rate);
        }

        println!("\nDepth Buffer:");
        println!("  clear calls:                {:12}", self.depth_clear_calls);
        println!();
    }
}

/// Global function counters instance
pub static FUNCTION_COUNTERS: FunctionCounters = FunctionCounters::new();

/// Macro for incrementing a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}
