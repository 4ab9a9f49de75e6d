//! Error types for voxelwave-render.

use thiserror::Error;

/// Errors raised while acquiring a device or executing the GPU pipeline.
#[derive(Error, Debug)]
pub enum RenderError {
    /// No suitable GPU adapter was found.
    #[error("failed to find a suitable GPU adapter")]
    AdapterCreationFailed,

    /// Device creation failed.
    #[error("failed to create GPU device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Readback buffer mapping failed.
    #[error("failed to map readback buffer")]
    BufferMapFailed,

    /// The input images do not match the declared frame dimensions.
    #[error("render target mismatch: {0}")]
    TargetMismatch(String),

    /// An invariant from the CPU side was violated.
    #[error(transparent)]
    Core(#[from] voxelwave_core::VoxelWaveError),
}

/// A specialized Result type for render operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
