/// Occlusion Culler - software hierarchical-depth occlusion culling
/// Load-time occluder baking plus a per-frame front-to-back culling pipeline
pub mod camera;
pub mod config;
pub mod error;
pub mod occluder;
pub mod perf;
pub mod pipeline;
pub mod rendering;
pub mod scene;

pub use camera::{Camera, CameraController, Frustum};
pub use config::CullerConfig;
pub use error::{OcclusionError, Result};
pub use occluder::{Aabb, Occluder, QUAD_PACKET_SIZE};
pub use perf::{CounterSnapshot, FrameTimer, FunctionCounters, FUNCTION_COUNTERS};
pub use pipeline::{FramePhase, FramePipeline, FrameStats};
pub use rendering::{DepthImage, HiZBuffer, OcclusionTarget, Rasterizer, Visibility};
pub use scene::Scene;
