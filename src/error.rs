/// Error type for load-time construction of the culling structures.
/// The per-frame path never produces these: a query answering "not visible"
/// is an ordinary result, not a failure.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcclusionError {
    #[error("invalid depth buffer resolution {width}x{height}")]
    InvalidResolution { width: usize, height: usize },

    #[error("invalid occluder: {0}")]
    InvalidOccluder(String),

    #[error("invalid bounding box: min {min:?} is not <= max {max:?}")]
    InvalidBounds { min: [f32; 3], max: [f32; 3] },

    #[error("invalid mesh: {0}")]
    InvalidMesh(String),

    #[error(
        "{quads} quads do not fit in {max_batches} batches of at most {max_quads_per_batch} quads"
    )]
    BatchCapacity {
        quads: usize,
        max_quads_per_batch: usize,
        max_batches: usize,
    },

    #[error("depth image holds {actual} pixels, expected {expected}")]
    ImageSizeMismatch { expected: usize, actual: usize },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, OcclusionError>;
