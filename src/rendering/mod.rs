/// Software occlusion pipeline pieces
/// Conservative depth rasterization, visibility queries and depth readback
pub mod culling;
pub mod depth_image;
pub mod hiz_buffer;
pub mod rasterizer;

pub use culling::sort_front_to_back;
pub use depth_image::DepthImage;
pub use hiz_buffer::{HiZBuffer, HIZ_BLOCK_SIZE};
pub use rasterizer::{OcclusionTarget, Rasterizer, Visibility};
