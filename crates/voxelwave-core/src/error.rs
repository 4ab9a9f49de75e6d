//! Error types for voxelwave-core.

use thiserror::Error;

/// The main error type for voxelwave operations.
#[derive(Error, Debug)]
pub enum VoxelWaveError {
    /// Focal length must be strictly positive.
    #[error("focal length must be positive, got {0}")]
    InvalidFocalLength(f32),

    /// Near clip plane must be strictly positive.
    #[error("near clip plane must be positive, got {0}")]
    InvalidNearPlane(f32),

    /// Far clip plane must lie beyond the near plane.
    #[error("far clip plane {far} must exceed near plane {near}")]
    InvalidClipRange { near: f32, far: f32 },

    /// Image plane dimensions must be positive.
    #[error("image plane must have positive dimensions, got {width}x{height}")]
    InvalidImagePlane { width: f32, height: f32 },

    /// The depth range collapses to nothing.
    #[error("depth range is empty: min {min} >= max {max}")]
    EmptyDepthRange { min: f32, max: f32 },

    /// The block grid must contain at least one cell per axis.
    #[error("block grid must be at least 1x1, got {x}x{y}")]
    InvalidGrid { x: u32, y: u32 },

    /// A parameter value had an unexpected type.
    #[error("parameter '{param}' has the wrong type (expected {expected})")]
    ParamType {
        param: &'static str,
        expected: &'static str,
    },

    /// The host did not supply a required parameter.
    #[error("parameter '{0}' is not provided by the host")]
    ParamMissing(&'static str),

    /// Pixel buffer is too small for the declared dimensions.
    #[error("image buffer too small: need {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    /// Row stride is smaller than one packed row.
    #[error("row stride {stride} is smaller than a packed row of {row} bytes")]
    BadStride { stride: usize, row: usize },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for voxelwave operations.
pub type Result<T> = std::result::Result<T, VoxelWaveError>;
