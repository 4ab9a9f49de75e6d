//! GPU pipeline for the voxel wave effect.
//!
//! Two-stage pipeline on a headless wgpu device: a compute pass unprojects
//! the depth image into a grid of voxels and applies wave displacement, then
//! a raster pass draws each voxel as a camera-facing billboard into an
//! offscreen RGBA32F target that is read back into the host's frame buffer.

#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod compute;
pub mod context;
pub mod engine;
pub mod error;
pub mod raster;
mod textures;

pub use context::{ContextRegistry, RenderContext, RenderStatus};
pub use engine::GpuContext;
pub use error::{RenderError, RenderResult};
