/// Performance measurement utilities
/// Frame timing plus function counters for the culling hot path
pub mod profiling;

pub use profiling::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};

use std::time::{Duration, Instant};

/// Scoped timer that logs its lifetime on drop
pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        log::debug!("[PERF] {}: {}μs", self.name, self.elapsed().as_micros());
    }
}

/// Exponential moving average of per-frame raster time.
#[derive(Debug, Clone, Copy)]
pub struct FrameTimer {
    alpha: f32,
    average_ms: Option<f32>,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ALPHA)
    }
}

impl FrameTimer {
    pub const DEFAULT_ALPHA: f32 = 0.0035;

    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            average_ms: None,
        }
    }

    /// Fold one frame's time into the average. The first sample seeds it.
    pub fn record(&mut self, frame: Duration) -> f32 {
        let ms = frame.as_secs_f32() * 1000.0;
        let avg = match self.average_ms {
            Some(avg) => ms * self.alpha + avg * (1.0 - self.alpha),
            None => ms,
        };
        self.average_ms = Some(avg);
        avg
    }

    pub fn average_ms(&self) -> f32 {
        self.average_ms.unwrap_or(0.0)
    }

    /// Frames per second implied by the average raster time.
    pub fn fps(&self) -> u32 {
        match self.average_ms {
            Some(avg) if avg > 0.0 => (1000.0 / avg) as u32,
            _ => 0,
        }
    }
}

/// Macro for easy performance measurement
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}
