/// Occluder geometry: quad decomposition, batch assignment and baking
/// Runs once at load time; the baked batches are read-only afterwards
pub mod aabb;
pub mod batching;
pub mod occluder;
pub mod quad_decomposition;

pub use aabb::Aabb;
pub use batching::generate_batches;
pub use occluder::Occluder;
pub use quad_decomposition::decompose;

/// Number of quads the rasterizer processes together. Quad counts are
/// padded to a multiple of this (32 indices).
pub const QUAD_PACKET_SIZE: usize = 8;
